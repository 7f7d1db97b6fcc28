use crate::capability::Capability;
use crate::config::LedgerConfig;
use crate::ledger::action::Action;
use crate::ledger::expectation::{ExpectationHandle, Times};
use crate::ledger::matcher::{ArgMatcher, Matcher};
use crate::ledger::Ledger;
use crate::substitute::Substitute;
use crate::Result;

pub struct SubstituteBuilder {
    name: String,
    capabilities: Vec<Capability>,
    config: LedgerConfig,
}

impl SubstituteBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Vec::new(),
            config: LedgerConfig::default(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn try_build(self) -> Result<Substitute> {
        let mut ledger = Ledger::with_config(self.name, self.config);
        for capability in self.capabilities {
            ledger.declare(capability)?;
        }
        Ok(Substitute::from_ledger(ledger))
    }

    /// Build the substitute, panicking if a capability is declared twice.
    #[track_caller]
    pub fn build(self) -> Substitute {
        match self.try_build() {
            Ok(substitute) => substitute,
            Err(err) => panic!("{}", err),
        }
    }
}

/// Fluent registration of one expectation on a [`Substitute`].
///
/// Defaults: any arguments, exactly one call, no actions.
#[must_use = "an expectation is only registered by `will`, `try_will` or `register`"]
pub struct ExpectationBuilder<'s> {
    substitute: &'s Substitute,
    capability: String,
    matcher: Matcher,
    times: Times,
}

impl<'s> ExpectationBuilder<'s> {
    pub(crate) fn new(substitute: &'s Substitute, capability: &str) -> Self {
        Self {
            substitute,
            capability: capability.to_string(),
            matcher: Matcher::Any,
            times: Times::default(),
        }
    }

    pub fn with(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// One matcher per declared parameter.
    pub fn with_args(self, matchers: impl IntoIterator<Item = ArgMatcher>) -> Self {
        self.with(Matcher::args(matchers))
    }

    pub fn times(mut self, times: Times) -> Self {
        self.times = times;
        self
    }

    pub fn try_will(self, actions: Vec<Action>) -> Result<ExpectationHandle> {
        let ExpectationBuilder {
            substitute,
            capability,
            matcher,
            times,
        } = self;
        substitute.with_ledger(|ledger| ledger.expect(&capability, matcher, times, actions))
    }

    /// Register the expectation with `actions`, panicking if it is rejected.
    #[track_caller]
    pub fn will(self, actions: Vec<Action>) -> ExpectationHandle {
        match self.try_will(actions) {
            Ok(handle) => handle,
            Err(err) => panic!("{}", err),
        }
    }

    /// Register the expectation without actions.
    #[track_caller]
    pub fn register(self) -> ExpectationHandle {
        self.will(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_capability_fails_build() {
        let result = SubstituteBuilder::new("Twice")
            .with_capability(Capability::new("send"))
            .with_capability(Capability::new("send"))
            .try_build();
        assert_eq!(result.unwrap_err().kind(), "duplicate_capability");
    }

    #[test]
    fn test_try_will_surfaces_registration_error() {
        let sub = SubstituteBuilder::new("MockX")
            .with_capability(Capability::new("increment_using_addr").pointer())
            .build();
        let err = sub
            .expect("increment_using_addr")
            .with_args([ArgMatcher::Any, ArgMatcher::Any])
            .try_will(Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), "matcher_arity");
    }

    #[test]
    fn test_config_is_passed_to_ledger() {
        let sub = SubstituteBuilder::new("Loose")
            .with_capability(Capability::new("send"))
            .with_config(LedgerConfig {
                verify_on_drop: false,
                record_calls: true,
            })
            .build();
        sub.expect("send").register();
        assert!(!sub.with_ledger(|ledger| ledger.config().verify_on_drop));
    }
}
