use super::action::Action;
use super::matcher::Matcher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many calls an expectation requires and allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Times {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    /// Inclusive on both ends.
    Between(usize, usize),
    /// Zero or more calls.
    Any,
}

impl Times {
    pub fn once() -> Self {
        Times::Exactly(1)
    }

    pub fn never() -> Self {
        Times::Exactly(0)
    }

    /// Fewest calls that satisfy the expectation.
    pub fn lower(&self) -> usize {
        match *self {
            Times::Exactly(n) | Times::AtLeast(n) | Times::Between(n, _) => n,
            Times::AtMost(_) | Times::Any => 0,
        }
    }

    /// Most calls allowed, or `None` when unbounded.
    pub fn upper(&self) -> Option<usize> {
        match *self {
            Times::Exactly(n) | Times::AtMost(n) | Times::Between(_, n) => Some(n),
            Times::AtLeast(_) | Times::Any => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.upper().is_none()
    }

    /// No further call fits in the budget.
    pub fn is_saturated(&self, calls: usize) -> bool {
        self.upper().is_some_and(|upper| calls >= upper)
    }

    pub fn is_satisfied(&self, calls: usize) -> bool {
        calls >= self.lower() && self.upper().map_or(true, |upper| calls <= upper)
    }
}

impl Default for Times {
    fn default() -> Self {
        Times::once()
    }
}

fn calls(n: usize) -> &'static str {
    if n == 1 {
        "call"
    } else {
        "calls"
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Times::Exactly(n) => write!(f, "exactly {} {}", n, calls(n)),
            Times::AtLeast(n) => write!(f, "at least {} {}", n, calls(n)),
            Times::AtMost(n) => write!(f, "at most {} {}", n, calls(n)),
            Times::Between(lo, hi) => write!(f, "between {} and {} calls", lo, hi),
            Times::Any => f.write_str("any number of calls"),
        }
    }
}

/// Identifies an expectation within the ledger that registered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ExpectationHandle(pub(crate) usize);

impl ExpectationHandle {
    /// Registration index, counted across all capabilities of the ledger.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ExpectationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) struct Expectation {
    pub(crate) capability: String,
    pub(crate) matcher: Matcher,
    pub(crate) times: Times,
    pub(crate) actions: Vec<Action>,
    pub(crate) calls: usize,
}

impl Expectation {
    pub(crate) fn new(capability: String, matcher: Matcher, times: Times) -> Self {
        Self {
            capability,
            matcher,
            times,
            actions: Vec::new(),
            calls: 0,
        }
    }

    pub(crate) fn is_saturated(&self) -> bool {
        self.times.is_saturated(self.calls)
    }

    pub(crate) fn is_satisfied(&self) -> bool {
        self.times.is_satisfied(self.calls)
    }
}
