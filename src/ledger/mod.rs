//! The call-expectation ledger behind every substitute.
//!
//! Expectations are kept in registration order. A dispatched call is served
//! by the first expectation for its capability whose matcher accepts the
//! arguments and whose call budget is not yet spent; its actions then run in
//! list order against the caller's arguments.

pub mod action;
pub mod expectation;
pub mod matcher;
pub mod payload;

use crate::args::Arg;
use crate::capability::Capability;
use crate::config::LedgerConfig;
use crate::logging;
use crate::{LedgerError, Result};
use action::{Action, Applied};
use expectation::{Expectation, ExpectationHandle, Times};
use matcher::Matcher;
use serde::Serialize;
use std::any::{type_name, Any};
use std::collections::HashMap;

/// One dispatched call, matched or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    pub capability: String,
    pub arguments: usize,
    /// The expectation that served the call.
    pub expectation: Option<ExpectationHandle>,
    /// Side-effect actions that completed.
    pub effects: usize,
    pub returned: bool,
}

impl CallRecord {
    fn unmatched(capability: &str, arguments: usize) -> Self {
        Self {
            capability: capability.to_string(),
            arguments,
            expectation: None,
            effects: 0,
            returned: false,
        }
    }

    pub fn matched(&self) -> bool {
        self.expectation.is_some()
    }
}

/// Result of a successful dispatch.
#[derive(Debug)]
pub struct Outcome {
    capability: String,
    expectation: ExpectationHandle,
    effects: usize,
    value: Option<Box<dyn Any>>,
}

impl Outcome {
    pub fn expectation(&self) -> ExpectationHandle {
        self.expectation
    }

    /// Number of side effects applied before the call returned.
    pub fn effects(&self) -> usize {
        self.effects
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the returned value if it is an `R`.
    pub fn value_ref<R: Any>(&self) -> Option<&R> {
        self.value.as_ref().and_then(|v| v.downcast_ref::<R>())
    }

    /// Take the returned value.
    pub fn returned<R: Any>(self) -> Result<R> {
        let value = self.value.ok_or_else(|| LedgerError::MissingReturn {
            capability: self.capability.clone(),
        })?;
        value
            .downcast::<R>()
            .map(|boxed| *boxed)
            .map_err(|_| LedgerError::ReturnTypeMismatch {
                capability: self.capability,
                expected: type_name::<R>(),
            })
    }
}

struct CapabilityEntry {
    declaration: Capability,
    expectations: Vec<usize>,
}

/// Expectations, actions and call log for one substitute.
pub struct Ledger {
    substitute: String,
    config: LedgerConfig,
    capabilities: HashMap<String, CapabilityEntry>,
    expectations: Vec<Expectation>,
    calls: Vec<CallRecord>,
    /// Expectations already reported by `verify`; drop checks only the rest.
    verified_upto: usize,
}

impl Ledger {
    pub fn new(substitute: impl Into<String>) -> Self {
        Self::with_config(substitute, LedgerConfig::default())
    }

    pub fn with_config(substitute: impl Into<String>, config: LedgerConfig) -> Self {
        Self {
            substitute: substitute.into(),
            config,
            capabilities: HashMap::new(),
            expectations: Vec::new(),
            calls: Vec::new(),
            verified_upto: 0,
        }
    }

    /// Name of the substitute this ledger belongs to.
    pub fn substitute(&self) -> &str {
        &self.substitute
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn declare(&mut self, capability: Capability) -> Result<()> {
        if self.capabilities.contains_key(capability.name()) {
            return Err(LedgerError::DuplicateCapability {
                substitute: self.substitute.clone(),
                capability: capability.name().to_string(),
            });
        }
        logging::log_capability_declared(&self.substitute, capability.name(), capability.arity());
        self.capabilities.insert(
            capability.name().to_string(),
            CapabilityEntry {
                declaration: capability,
                expectations: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn capability(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name).map(|entry| &entry.declaration)
    }

    fn entry(&self, capability: &str) -> Result<&CapabilityEntry> {
        self.capabilities
            .get(capability)
            .ok_or_else(|| LedgerError::UnknownCapability {
                substitute: self.substitute.clone(),
                capability: capability.to_string(),
            })
    }

    /// Store a new expectation with no actions.
    pub fn register(
        &mut self,
        capability: &str,
        matcher: Matcher,
        times: Times,
    ) -> Result<ExpectationHandle> {
        let entry = self.entry(capability)?;
        if let Times::Between(lo, hi) = times {
            if lo > hi {
                return Err(LedgerError::InvalidTimes {
                    capability: capability.to_string(),
                    times,
                });
            }
        }
        if let Some(actual) = matcher.arity() {
            if actual != entry.declaration.arity() {
                return Err(LedgerError::MatcherArity {
                    capability: capability.to_string(),
                    expected: entry.declaration.arity(),
                    actual,
                });
            }
        }
        // First-registered-wins: an unbounded expectation accepting a
        // superset of the new matcher would serve every call meant for it.
        for &id in &entry.expectations {
            let existing = &self.expectations[id];
            if existing.times.is_unbounded() && existing.matcher.covers(&matcher) {
                return Err(LedgerError::DuplicateUnboundedExpectation {
                    substitute: self.substitute.clone(),
                    capability: capability.to_string(),
                    shadowed_by: id,
                });
            }
        }

        let id = self.expectations.len();
        self.expectations
            .push(Expectation::new(capability.to_string(), matcher, times));
        if let Some(entry) = self.capabilities.get_mut(capability) {
            entry.expectations.push(id);
        }
        logging::log_expectation_registered(&self.substitute, capability, id, &times);
        Ok(ExpectationHandle(id))
    }

    /// Replace the action list of a registered expectation.
    pub fn attach_actions(&mut self, handle: ExpectationHandle, actions: Vec<Action>) -> Result<()> {
        let expectation =
            self.expectations
                .get_mut(handle.0)
                .ok_or_else(|| LedgerError::UnknownExpectation {
                    substitute: self.substitute.clone(),
                    expectation: handle.0,
                })?;
        let entry = self
            .capabilities
            .get(&expectation.capability)
            .ok_or_else(|| LedgerError::UnknownCapability {
                substitute: self.substitute.clone(),
                capability: expectation.capability.clone(),
            })?;
        Action::validate_list(&entry.declaration, &actions)?;
        logging::log_actions_attached(&self.substitute, handle.0, actions.len());
        expectation.actions = actions;
        Ok(())
    }

    /// Register an expectation together with its actions.
    ///
    /// Nothing is registered when the action list is invalid.
    pub fn expect(
        &mut self,
        capability: &str,
        matcher: Matcher,
        times: Times,
        actions: Vec<Action>,
    ) -> Result<ExpectationHandle> {
        Action::validate_list(&self.entry(capability)?.declaration, &actions)?;
        let handle = self.register(capability, matcher, times)?;
        self.attach_actions(handle, actions)?;
        Ok(handle)
    }

    /// Serve a call: pick the expectation, run its actions, count the call.
    pub fn dispatch(&mut self, capability: &str, args: &mut [Arg<'_>]) -> Result<Outcome> {
        let selected = match self.select(capability, args) {
            Ok(selected) => selected,
            Err(err) => {
                self.record(CallRecord::unmatched(capability, args.len()));
                return Err(err);
            }
        };

        let handle = ExpectationHandle(selected);
        let expectation = &mut self.expectations[selected];
        expectation.calls += 1;
        let (effects, result) = run_actions(&expectation.actions, capability, args);

        self.record(CallRecord {
            capability: capability.to_string(),
            arguments: args.len(),
            expectation: Some(handle),
            effects,
            returned: matches!(result, Ok(Some(_))),
        });

        match result {
            Ok(value) => {
                logging::log_dispatch(&self.substitute, capability, selected, effects);
                Ok(Outcome {
                    capability: capability.to_string(),
                    expectation: handle,
                    effects,
                    value,
                })
            }
            Err(err) => {
                logging::log_action_failed(&self.substitute, capability, &err);
                Err(err)
            }
        }
    }

    fn select(&self, capability: &str, args: &[Arg<'_>]) -> Result<usize> {
        let unexpected = || LedgerError::UnexpectedCall {
            substitute: self.substitute.clone(),
            capability: capability.to_string(),
            arguments: args.len(),
        };

        let Some(entry) = self.capabilities.get(capability) else {
            logging::log_unexpected_call(&self.substitute, capability, args.len());
            return Err(unexpected());
        };
        check_arguments(&entry.declaration, args)?;

        let mut exhausted = None;
        for &id in &entry.expectations {
            let expectation = &self.expectations[id];
            if !expectation.matcher.accepts(args) {
                continue;
            }
            if expectation.is_saturated() {
                exhausted.get_or_insert(id);
                continue;
            }
            return Ok(id);
        }

        match exhausted {
            Some(id) => {
                let expectation = &self.expectations[id];
                logging::log_call_count_exceeded(&self.substitute, capability, id);
                Err(LedgerError::CallCountExceeded {
                    substitute: self.substitute.clone(),
                    capability: capability.to_string(),
                    expectation: id,
                    times: expectation.times,
                    calls: expectation.calls + 1,
                })
            }
            None => {
                logging::log_unexpected_call(&self.substitute, capability, args.len());
                Err(unexpected())
            }
        }
    }

    fn record(&mut self, call: CallRecord) {
        if self.config.record_calls {
            self.calls.push(call);
        }
    }

    /// Calls made so far, in order. Empty when call recording is disabled.
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Recorded calls to `capability`, matched or not.
    pub fn call_count(&self, capability: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| call.capability == capability)
            .count()
    }

    /// Calls served so far by one expectation.
    pub fn expectation_calls(&self, handle: ExpectationHandle) -> Option<usize> {
        self.expectations.get(handle.0).map(|e| e.calls)
    }

    /// Every expectation whose required call count was not met.
    pub fn unsatisfied(&self) -> Vec<LedgerError> {
        self.unsatisfied_from(0)
    }

    fn unsatisfied_from(&self, start: usize) -> Vec<LedgerError> {
        self.expectations
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, expectation)| !expectation.is_satisfied())
            .map(|(id, expectation)| LedgerError::UnsatisfiedExpectation {
                substitute: self.substitute.clone(),
                capability: expectation.capability.clone(),
                expectation: id,
                times: expectation.times,
                calls: expectation.calls,
            })
            .collect()
    }

    /// Check call counts now instead of on drop.
    ///
    /// Expectations registered afterwards are still checked on drop.
    pub fn verify(&mut self) -> Result<()> {
        self.verified_upto = self.expectations.len();
        let unsatisfied = self.unsatisfied();
        logging::log_verification(&self.substitute, self.expectations.len(), unsatisfied.len());
        match unsatisfied.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Ledger {
    fn drop(&mut self) {
        if !self.config.verify_on_drop || std::thread::panicking() {
            return;
        }
        // A satisfied count cannot regress, so earlier verdicts stand.
        let unsatisfied = self.unsatisfied_from(self.verified_upto);
        logging::log_verification(&self.substitute, self.expectations.len(), unsatisfied.len());
        if !unsatisfied.is_empty() {
            let report: Vec<String> = unsatisfied.iter().map(ToString::to_string).collect();
            panic!("{}", report.join("\n"));
        }
    }
}

fn check_arguments(declaration: &Capability, args: &[Arg<'_>]) -> Result<()> {
    if args.len() != declaration.arity() {
        return Err(LedgerError::ArityMismatch {
            capability: declaration.name().to_string(),
            expected: declaration.arity(),
            actual: args.len(),
        });
    }
    for (index, (declared, arg)) in declaration.params().iter().zip(args).enumerate() {
        if *declared != arg.kind() {
            return Err(LedgerError::ParamKindMismatch {
                capability: declaration.name().to_string(),
                index,
                declared: *declared,
                actual: arg.kind(),
            });
        }
    }
    Ok(())
}

/// Apply `actions` in order. Returns the number of completed side effects
/// alongside the returned value or the first failure.
fn run_actions(
    actions: &[Action],
    capability: &str,
    args: &mut [Arg<'_>],
) -> (usize, Result<Option<Box<dyn Any>>>) {
    let mut effects = 0;
    let mut value = None;
    for action in actions {
        match action.apply(capability, args) {
            Ok(Applied::Effect) => effects += 1,
            Ok(Applied::Value(returned)) => value = Some(returned),
            Err(err) => return (effects, Err(err)),
        }
    }
    (effects, Ok(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::matcher::ArgMatcher;

    fn ledger() -> Ledger {
        let mut ledger = Ledger::with_config(
            "MockX",
            LedgerConfig {
                verify_on_drop: false,
                ..LedgerConfig::default()
            },
        );
        ledger
            .declare(Capability::new("increment_using_addr").pointer())
            .unwrap();
        ledger
            .declare(Capability::new("set_return_value").returns())
            .unwrap();
        ledger
    }

    #[test]
    fn test_declare_twice_fails() {
        let mut ledger = ledger();
        let err = ledger
            .declare(Capability::new("set_return_value"))
            .unwrap_err();
        assert_eq!(err.kind(), "duplicate_capability");
    }

    #[test]
    fn test_register_unknown_capability() {
        let mut ledger = ledger();
        let err = ledger
            .register("missing", Matcher::any(), Times::once())
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_capability");
    }

    #[test]
    fn test_register_checks_matcher_arity() {
        let mut ledger = ledger();
        let err = ledger
            .register(
                "increment_using_addr",
                Matcher::args([ArgMatcher::Any, ArgMatcher::Any]),
                Times::once(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::MatcherArity {
                capability: "increment_using_addr".into(),
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_unbounded_wildcard_shadows_later_registration() {
        let mut ledger = ledger();
        let first = ledger
            .register("increment_using_addr", Matcher::any(), Times::Any)
            .unwrap();
        let err = ledger
            .register(
                "increment_using_addr",
                Matcher::args([ArgMatcher::eq(1i32)]),
                Times::once(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::DuplicateUnboundedExpectation {
                substitute: "MockX".into(),
                capability: "increment_using_addr".into(),
                shadowed_by: first.index(),
            }
        );
    }

    #[test]
    fn test_bounded_wildcard_does_not_block_registration() {
        let mut ledger = ledger();
        ledger
            .register("increment_using_addr", Matcher::any(), Times::once())
            .unwrap();
        assert!(ledger
            .register("increment_using_addr", Matcher::any(), Times::Any)
            .is_ok());
    }

    #[test]
    fn test_first_registered_wins_then_falls_through_when_spent() {
        let mut ledger = ledger();
        let first = ledger
            .expect(
                "set_return_value",
                Matcher::any(),
                Times::once(),
                vec![Action::returning(1i32)],
            )
            .unwrap();
        let second = ledger
            .expect(
                "set_return_value",
                Matcher::any(),
                Times::once(),
                vec![Action::returning(2i32)],
            )
            .unwrap();

        let outcome = ledger.dispatch("set_return_value", &mut []).unwrap();
        assert_eq!(outcome.expectation(), first);
        assert_eq!(outcome.returned::<i32>().unwrap(), 1);

        let outcome = ledger.dispatch("set_return_value", &mut []).unwrap();
        assert_eq!(outcome.expectation(), second);
        assert_eq!(outcome.returned::<i32>().unwrap(), 2);

        let err = ledger.dispatch("set_return_value", &mut []).unwrap_err();
        assert_eq!(err.kind(), "call_count_exceeded");
    }

    #[test]
    fn test_invalid_actions_register_nothing() {
        let mut ledger = ledger();
        let err = ledger
            .expect(
                "increment_using_addr",
                Matcher::any(),
                Times::once(),
                vec![Action::returning(1i32)],
            )
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_action");
        assert!(ledger.unsatisfied().is_empty());
    }

    #[test]
    fn test_attach_actions_to_foreign_handle() {
        let mut ledger = ledger();
        let err = ledger
            .attach_actions(ExpectationHandle(7), Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_expectation");
    }

    #[test]
    fn test_dispatch_rejects_wrong_argument_kind() {
        let mut ledger = ledger();
        ledger
            .register("increment_using_addr", Matcher::any(), Times::once())
            .unwrap();
        let mut value = 1i32;
        let err = ledger
            .dispatch("increment_using_addr", &mut [Arg::reference(&mut value)])
            .unwrap_err();
        assert_eq!(err.kind(), "param_kind_mismatch");
    }

    #[test]
    fn test_call_log_records_matched_and_unmatched_calls() {
        let mut ledger = ledger();
        ledger
            .expect(
                "increment_using_addr",
                Matcher::any(),
                Times::once(),
                vec![Action::write_through_pointer(0, 10i32)],
            )
            .unwrap();
        let mut value = 9i32;
        ledger
            .dispatch("increment_using_addr", &mut [Arg::pointer(&mut value)])
            .unwrap();
        assert!(ledger.dispatch("set_return_value", &mut []).is_err());

        let calls = ledger.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].matched());
        assert_eq!(calls[0].effects, 1);
        assert!(!calls[1].matched());
        assert_eq!(ledger.call_count("increment_using_addr"), 1);
    }

    #[test]
    fn test_recording_can_be_disabled() {
        let mut ledger = Ledger::with_config(
            "Quiet",
            LedgerConfig {
                verify_on_drop: false,
                record_calls: false,
            },
        );
        ledger.declare(Capability::new("send")).unwrap();
        ledger.register("send", Matcher::any(), Times::Any).unwrap();
        ledger.dispatch("send", &mut []).unwrap();
        assert!(ledger.calls().is_empty());
    }

    #[test]
    fn test_missing_and_mistyped_return() {
        let mut ledger = ledger();
        ledger
            .register("set_return_value", Matcher::any(), Times::AtLeast(1))
            .unwrap();
        let outcome = ledger.dispatch("set_return_value", &mut []).unwrap();
        assert_eq!(outcome.returned::<i32>().unwrap_err().kind(), "missing_return");

        let mut ledger = ledger_with_return(5u8);
        let outcome = ledger.dispatch("set_return_value", &mut []).unwrap();
        assert_eq!(
            outcome.returned::<i32>().unwrap_err().kind(),
            "return_type_mismatch"
        );
    }

    fn ledger_with_return(value: u8) -> Ledger {
        let mut ledger = ledger();
        ledger
            .expect(
                "set_return_value",
                Matcher::any(),
                Times::once(),
                vec![Action::returning(value)],
            )
            .unwrap();
        ledger
    }

    #[test]
    fn test_verify_reports_first_unsatisfied() {
        let mut ledger = ledger();
        ledger
            .register("set_return_value", Matcher::any(), Times::Exactly(2))
            .unwrap();
        ledger
            .register("increment_using_addr", Matcher::any(), Times::once())
            .unwrap();
        assert_eq!(ledger.unsatisfied().len(), 2);
        let err = ledger.verify().unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnsatisfiedExpectation {
                substitute: "MockX".into(),
                capability: "set_return_value".into(),
                expectation: 0,
                times: Times::Exactly(2),
                calls: 0,
            }
        );
    }

    #[test]
    #[should_panic(expected = "expected exactly 1 call")]
    fn test_drop_panics_on_unsatisfied_expectation() {
        let mut ledger = Ledger::new("Strict");
        ledger.declare(Capability::new("send")).unwrap();
        ledger.register("send", Matcher::any(), Times::once()).unwrap();
    }

    #[test]
    fn test_register_rejects_inverted_between() {
        let mut ledger = ledger();
        let err = ledger
            .register("set_return_value", Matcher::any(), Times::Between(3, 1))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_times");
        assert!(ledger.unsatisfied().is_empty());
        ledger
            .register("set_return_value", Matcher::any(), Times::Between(2, 2))
            .unwrap();
    }

    #[test]
    #[should_panic(expected = "`send` expectation #1 expected exactly 1 call, got 0")]
    fn test_drop_checks_expectations_registered_after_verify() {
        let mut ledger = Ledger::new("Strict");
        ledger.declare(Capability::new("ping")).unwrap();
        ledger.declare(Capability::new("send")).unwrap();
        ledger.register("ping", Matcher::any(), Times::once()).unwrap();
        ledger.dispatch("ping", &mut []).unwrap();
        ledger.verify().unwrap();
        ledger.register("send", Matcher::any(), Times::once()).unwrap();
    }

    #[test]
    fn test_drop_does_not_repeat_failures_reported_by_verify() {
        let mut ledger = Ledger::new("Strict");
        ledger.declare(Capability::new("ping")).unwrap();
        ledger.register("ping", Matcher::any(), Times::once()).unwrap();
        assert_eq!(ledger.verify().unwrap_err().kind(), "unsatisfied_expectation");
        ledger.register("ping", Matcher::any(), Times::AtMost(1)).unwrap();
    }
}
