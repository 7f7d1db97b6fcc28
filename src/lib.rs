pub mod args;
pub mod builder;
pub mod capability;
pub mod capture;
pub mod cli;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod scenario;
pub mod substitute;
pub mod ui;

use miette::Diagnostic;

pub use args::Arg;
pub use builder::{ExpectationBuilder, SubstituteBuilder};
pub use capability::{Capability, ParamKind};
pub use capture::Capture;
pub use ledger::action::Action;
pub use ledger::expectation::{ExpectationHandle, Times};
pub use ledger::matcher::{ArgMatcher, Matcher};
pub use ledger::{CallRecord, Ledger, Outcome};
pub use substitute::Substitute;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures raised while declaring, registering, dispatching or verifying.
///
/// Every variant is a test-authoring defect: nothing here is meant to be
/// recovered from at runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum LedgerError {
    #[error("{substitute}: unexpected call to `{capability}` with {arguments} argument(s)")]
    #[diagnostic(
        code(stubledger::unexpected_call),
        help("Register an expectation for this capability whose matcher accepts these arguments before exercising the substitute.")
    )]
    UnexpectedCall {
        substitute: String,
        capability: String,
        arguments: usize,
    },

    #[error("{substitute}: `{capability}` expectation #{expectation} allows {times} but received call {calls}")]
    #[diagnostic(
        code(stubledger::call_count_exceeded),
        help("Raise the expectation's call budget with `times(..)` or register another expectation for the extra calls.")
    )]
    CallCountExceeded {
        substitute: String,
        capability: String,
        expectation: usize,
        times: Times,
        calls: usize,
    },

    #[error("{substitute}: `{capability}` expectation #{expectation} expected {times}, got {calls}")]
    #[diagnostic(
        code(stubledger::unsatisfied_expectation),
        help("The code under test never reached this collaborator call often enough.")
    )]
    UnsatisfiedExpectation {
        substitute: String,
        capability: String,
        expectation: usize,
        times: Times,
        calls: usize,
    },

    #[error("{substitute}: new `{capability}` expectation is shadowed by unbounded expectation #{shadowed_by}")]
    #[diagnostic(
        code(stubledger::duplicate_unbounded_expectation),
        help("Matching is first-registered-wins. Give the earlier expectation an upper bound or a narrower matcher.")
    )]
    DuplicateUnboundedExpectation {
        substitute: String,
        capability: String,
        shadowed_by: usize,
    },

    #[error("{substitute}: capability `{capability}` was never declared")]
    #[diagnostic(
        code(stubledger::unknown_capability),
        help("Declare the capability with `with_capability(..)` when building the substitute.")
    )]
    UnknownCapability {
        substitute: String,
        capability: String,
    },

    #[error("{substitute}: capability `{capability}` is already declared")]
    #[diagnostic(code(stubledger::duplicate_capability))]
    DuplicateCapability {
        substitute: String,
        capability: String,
    },

    #[error("{substitute}: expectation #{expectation} does not belong to this ledger")]
    #[diagnostic(code(stubledger::unknown_expectation))]
    UnknownExpectation {
        substitute: String,
        expectation: usize,
    },

    #[error("`{capability}` takes {expected} argument(s) but the matcher lists {actual}")]
    #[diagnostic(
        code(stubledger::matcher_arity),
        help("Supply one argument matcher per declared parameter, or use `Matcher::any()`.")
    )]
    MatcherArity {
        capability: String,
        expected: usize,
        actual: usize,
    },

    #[error("`{capability}` expectation requires {times}, which no call count satisfies")]
    #[diagnostic(
        code(stubledger::invalid_times),
        help("The lower bound of `between` must not exceed the upper bound.")
    )]
    InvalidTimes { capability: String, times: Times },

    #[error("invalid action for `{capability}`: {reason}")]
    #[diagnostic(code(stubledger::invalid_action))]
    InvalidAction { capability: String, reason: String },

    #[error("`{capability}` takes {expected} argument(s) but was called with {actual}")]
    #[diagnostic(code(stubledger::arity_mismatch))]
    ArityMismatch {
        capability: String,
        expected: usize,
        actual: usize,
    },

    #[error("`{capability}` argument {index} is declared as {declared} but was passed as {actual}")]
    #[diagnostic(code(stubledger::param_kind_mismatch))]
    ParamKindMismatch {
        capability: String,
        index: usize,
        declared: ParamKind,
        actual: ParamKind,
    },

    #[error("`{capability}` argument {index} is null")]
    #[diagnostic(
        code(stubledger::null_argument),
        help("Writes and copies need a non-null destination. Match with `ArgMatcher::NotNull` to reject null calls earlier.")
    )]
    NullArgument { capability: String, index: usize },

    #[error("`{capability}` argument {index} does not hold a `{expected}`")]
    #[diagnostic(code(stubledger::type_mismatch))]
    TypeMismatch {
        capability: String,
        index: usize,
        expected: &'static str,
    },

    #[error("`{capability}` argument {index} holds {capacity} element(s) but the copy needs {needed}")]
    #[diagnostic(
        code(stubledger::buffer_overflow_risk),
        help("The destination buffer must be at least as long as the copied range. Nothing was copied.")
    )]
    BufferOverflowRisk {
        capability: String,
        index: usize,
        needed: usize,
        capacity: usize,
    },

    #[error("`{capability}` argument {index} is already borrowed")]
    #[diagnostic(code(stubledger::argument_borrowed))]
    ArgumentBorrowed { capability: String, index: usize },

    #[error("`{capability}` returned nothing")]
    #[diagnostic(
        code(stubledger::missing_return),
        help("Add an `Action::returning(..)` as the last action of the expectation.")
    )]
    MissingReturn { capability: String },

    #[error("`{capability}` returned a value that is not a `{expected}`")]
    #[diagnostic(code(stubledger::return_type_mismatch))]
    ReturnTypeMismatch {
        capability: String,
        expected: &'static str,
    },
}

impl LedgerError {
    /// Stable snake_case name of the error kind, as used by scenario files.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::UnexpectedCall { .. } => "unexpected_call",
            LedgerError::CallCountExceeded { .. } => "call_count_exceeded",
            LedgerError::UnsatisfiedExpectation { .. } => "unsatisfied_expectation",
            LedgerError::DuplicateUnboundedExpectation { .. } => {
                "duplicate_unbounded_expectation"
            }
            LedgerError::UnknownCapability { .. } => "unknown_capability",
            LedgerError::DuplicateCapability { .. } => "duplicate_capability",
            LedgerError::UnknownExpectation { .. } => "unknown_expectation",
            LedgerError::MatcherArity { .. } => "matcher_arity",
            LedgerError::InvalidTimes { .. } => "invalid_times",
            LedgerError::InvalidAction { .. } => "invalid_action",
            LedgerError::ArityMismatch { .. } => "arity_mismatch",
            LedgerError::ParamKindMismatch { .. } => "param_kind_mismatch",
            LedgerError::NullArgument { .. } => "null_argument",
            LedgerError::TypeMismatch { .. } => "type_mismatch",
            LedgerError::BufferOverflowRisk { .. } => "buffer_overflow_risk",
            LedgerError::ArgumentBorrowed { .. } => "argument_borrowed",
            LedgerError::MissingReturn { .. } => "missing_return",
            LedgerError::ReturnTypeMismatch { .. } => "return_type_mismatch",
        }
    }
}

/// Failures of the scenario runner and command-line tool.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ToolError {
    #[error("File operation failed: {0}")]
    #[diagnostic(
        code(stubledger::file_error),
        help("Check if you have necessary permissions and that the path exists.")
    )]
    FileError(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(stubledger::config_error),
        help("See `.stubledger.toml`: only the [ledger] and [output] sections are recognised.")
    )]
    ConfigError(String),

    #[error("Invalid scenario: {0}")]
    #[diagnostic(
        code(stubledger::invalid_scenario),
        help("Scenario values are integers, booleans, strings or byte arrays; `$name` refers to a [cells] entry.")
    )]
    InvalidScenario(String),

    #[error("Scenario failed: {0}")]
    #[diagnostic(code(stubledger::scenario_failed))]
    ScenarioFailed(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ledger(#[from] LedgerError),
}
