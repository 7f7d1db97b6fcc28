//! Scripted scenarios: a TOML file declares capabilities, registers
//! expectations, and lists calls to dispatch against the resulting ledger.
//!
//! Scenario values are 64-bit integers, booleans, strings and byte arrays.
//! A few strings are reserved: `"_"` (any, in patterns), `"null"` (a null
//! pointer or buffer), `"!null"` (any non-null, in patterns) and `"$name"`
//! (the shared cell `name` declared under `[cells]`).
//!
//! `"$name"` is only meaningful in call `args`. A cell passed to a `value`
//! parameter is read when the call is made. Patterns (expectation `args` and
//! call `after`) compare literal values and reject `$`-prefixed strings.

use crate::args::Arg;
use crate::capability::{Capability, ParamKind};
use crate::config::LedgerConfig;
use crate::ledger::action::Action;
use crate::ledger::expectation::Times;
use crate::ledger::matcher::{ArgMatcher, Matcher};
use crate::ledger::{CallRecord, Ledger, Outcome};
use crate::logging;
use crate::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// Named storage that several arguments may alias
    #[serde(default)]
    pub cells: BTreeMap<String, Value>,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub expectations: Vec<ExpectationSpec>,
    #[serde(default)]
    pub calls: Vec<CallSpec>,
    /// Cell values required once every call has run
    #[serde(default)]
    pub expect_cells: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationSpec {
    pub capability: String,
    /// One pattern per parameter; omitted means any arguments
    #[serde(default)]
    pub args: Option<Vec<Value>>,
    #[serde(default)]
    pub times: Times,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionSpec {
    WriteThroughPointer { index: usize, value: Value },
    WriteThroughReference { index: usize, value: Value },
    CopyRange { index: usize, source: Vec<u8> },
    Return { value: Value },
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallSpec {
    pub capability: String,
    #[serde(default)]
    pub args: Vec<Value>,
    /// Required result
    #[serde(default)]
    pub returns: Option<Value>,
    /// Required error kind, e.g. `unexpected_call`
    #[serde(default)]
    pub error: Option<String>,
    /// Patterns for the argument values after the call
    #[serde(default)]
    pub after: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub capability: String,
    pub passed: bool,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    pub cell: String,
    pub expected: Value,
    pub actual: Value,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepReport>,
    pub cells: Vec<CellReport>,
    pub unsatisfied: Vec<String>,
    pub calls: Vec<CallRecord>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.failures() == 0
    }

    /// Failed steps, failed cell checks and unsatisfied expectations.
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed).count()
            + self.cells.iter().filter(|c| !c.passed).count()
            + self.unsatisfied.len()
    }
}

/// Counts reported by `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioSummary {
    pub capabilities: usize,
    pub expectations: usize,
    pub calls: usize,
}

fn invalid(message: impl Into<String>) -> ToolError {
    ToolError::InvalidScenario(message.into())
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Int(i64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
}

macro_rules! each_scalar {
    ($scalar:expr, $v:ident => $body:expr) => {
        match $scalar {
            Scalar::Int($v) => $body,
            Scalar::Bool($v) => $body,
            Scalar::Text($v) => $body,
            Scalar::Bytes($v) => $body,
        }
    };
}

impl Scalar {
    fn parse(value: &Value) -> Result<Self, ToolError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .ok_or_else(|| invalid(format!("{} is not a 64-bit integer", n))),
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Scalar::Bytes)
                .ok_or_else(|| invalid(format!("{} is not a byte array", value))),
            other => Err(invalid(format!("unsupported value {}", other))),
        }
    }

    /// The returned value, if it has one of the scenario types.
    fn from_outcome(outcome: &Outcome) -> Option<Self> {
        if let Some(v) = outcome.value_ref::<i64>() {
            return Some(Scalar::Int(*v));
        }
        if let Some(v) = outcome.value_ref::<bool>() {
            return Some(Scalar::Bool(*v));
        }
        if let Some(v) = outcome.value_ref::<String>() {
            return Some(Scalar::Text(v.clone()));
        }
        outcome.value_ref::<Vec<u8>>().cloned().map(Scalar::Bytes)
    }

    fn to_json(&self) -> Value {
        match self {
            Scalar::Int(v) => Value::from(*v),
            Scalar::Bool(v) => Value::from(*v),
            Scalar::Text(v) => Value::from(v.as_str()),
            Scalar::Bytes(v) => Value::from(v.clone()),
        }
    }

    fn matcher(self) -> ArgMatcher {
        each_scalar!(self, v => ArgMatcher::eq(v))
    }

    fn write_through_pointer(self, index: usize) -> Action {
        each_scalar!(self, v => Action::write_through_pointer(index, v))
    }

    fn write_through_reference(self, index: usize) -> Action {
        each_scalar!(self, v => Action::write_through_reference(index, v))
    }

    fn returning(self) -> Action {
        each_scalar!(self, v => Action::returning(v))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn render(value: Option<&Scalar>) -> String {
    value.map_or_else(|| "null".to_string(), ToString::to_string)
}

enum Pattern {
    Any,
    Null,
    NotNull,
    Value(Scalar),
}

impl Pattern {
    fn parse(value: &Value) -> Result<Self, ToolError> {
        match value.as_str() {
            Some("_") => Ok(Pattern::Any),
            Some("null") => Ok(Pattern::Null),
            Some("!null") => Ok(Pattern::NotNull),
            Some(s) if s.starts_with('$') => Err(invalid(format!(
                "pattern `{}` names a cell; patterns only compare literal values",
                s
            ))),
            _ => Scalar::parse(value).map(Pattern::Value),
        }
    }

    fn into_matcher(self) -> ArgMatcher {
        match self {
            Pattern::Any => ArgMatcher::Any,
            Pattern::Null => ArgMatcher::IsNull,
            Pattern::NotNull => ArgMatcher::NotNull,
            Pattern::Value(scalar) => scalar.matcher(),
        }
    }

    fn accepts(&self, actual: Option<&Scalar>) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Null => actual.is_none(),
            Pattern::NotNull => actual.is_some(),
            Pattern::Value(expected) => actual == Some(expected),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str("_"),
            Pattern::Null => f.write_str("null"),
            Pattern::NotNull => f.write_str("!null"),
            Pattern::Value(scalar) => scalar.fmt(f),
        }
    }
}

/// Storage behind a `$name` argument.
enum SharedCell {
    Int(RefCell<i64>),
    Bool(RefCell<bool>),
    Text(RefCell<String>),
}

impl SharedCell {
    fn new(name: &str, scalar: Scalar) -> Result<Self, ToolError> {
        match scalar {
            Scalar::Int(v) => Ok(SharedCell::Int(RefCell::new(v))),
            Scalar::Bool(v) => Ok(SharedCell::Bool(RefCell::new(v))),
            Scalar::Text(v) => Ok(SharedCell::Text(RefCell::new(v))),
            Scalar::Bytes(_) => Err(invalid(format!(
                "cell `{}` holds a byte array; cells hold integers, booleans or strings",
                name
            ))),
        }
    }

    fn current(&self) -> Scalar {
        match self {
            SharedCell::Int(c) => Scalar::Int(*c.borrow()),
            SharedCell::Bool(c) => Scalar::Bool(*c.borrow()),
            SharedCell::Text(c) => Scalar::Text(c.borrow().clone()),
        }
    }

    fn pointer(&self) -> Arg<'_> {
        match self {
            SharedCell::Int(c) => Arg::shared_pointer(c),
            SharedCell::Bool(c) => Arg::shared_pointer(c),
            SharedCell::Text(c) => Arg::shared_pointer(c),
        }
    }

    fn reference(&self) -> Arg<'_> {
        match self {
            SharedCell::Int(c) => Arg::shared_reference(c),
            SharedCell::Bool(c) => Arg::shared_reference(c),
            SharedCell::Text(c) => Arg::shared_reference(c),
        }
    }
}

type Cells = BTreeMap<String, SharedCell>;

/// One scripted argument, before it is bound to a parameter.
enum Bound<'c> {
    Owned(Scalar),
    Null,
    Named(&'c SharedCell),
}

impl<'c> Bound<'c> {
    fn parse(value: &Value, cells: &'c Cells) -> Result<Self, ToolError> {
        if let Some(s) = value.as_str() {
            if s == "null" {
                return Ok(Bound::Null);
            }
            if let Some(name) = s.strip_prefix('$') {
                return cells
                    .get(name)
                    .map(Bound::Named)
                    .ok_or_else(|| invalid(format!("unknown cell `{}`", name)));
            }
        }
        Scalar::parse(value).map(Bound::Owned)
    }

    /// Parameter kind used when the capability does not declare one.
    fn natural_kind(&self) -> ParamKind {
        match self {
            Bound::Owned(Scalar::Bytes(_)) => ParamKind::Buffer,
            Bound::Owned(_) => ParamKind::Value,
            Bound::Null | Bound::Named(_) => ParamKind::Pointer,
        }
    }

    fn bind<'a>(&'a mut self, kind: ParamKind, index: usize) -> Result<Arg<'a>, ToolError>
    where
        'c: 'a,
    {
        let arg = match (kind, self) {
            (ParamKind::Value, Bound::Owned(scalar)) => each_scalar!(scalar, v => Arg::value(&*v)),
            (ParamKind::Pointer, Bound::Owned(Scalar::Bytes(_)))
            | (ParamKind::Reference, Bound::Owned(Scalar::Bytes(_))) => {
                return Err(invalid(format!(
                    "argument {} is a byte array but the parameter is a {}",
                    index, kind
                )))
            }
            (ParamKind::Pointer, Bound::Owned(scalar)) => each_scalar!(scalar, v => Arg::pointer(v)),
            (ParamKind::Reference, Bound::Owned(scalar)) => {
                each_scalar!(scalar, v => Arg::reference(v))
            }
            (ParamKind::Pointer, Bound::Named(cell)) => cell.pointer(),
            (ParamKind::Reference, Bound::Named(cell)) => cell.reference(),
            (ParamKind::Pointer, Bound::Null) => Arg::null_pointer::<i64>(),
            (ParamKind::Buffer, Bound::Owned(Scalar::Bytes(bytes))) => Arg::buffer(bytes.as_mut_slice()),
            (ParamKind::Buffer, Bound::Null) => Arg::null_buffer::<u8>(),
            (kind, _) => {
                return Err(invalid(format!(
                    "argument {} cannot bind a {} parameter",
                    index, kind
                )))
            }
        };
        Ok(arg)
    }

    fn current(&self) -> Option<Scalar> {
        match self {
            Bound::Owned(scalar) => Some(scalar.clone()),
            Bound::Null => None,
            Bound::Named(cell) => Some(cell.current()),
        }
    }
}

impl ActionSpec {
    fn to_action(&self) -> Result<Action, ToolError> {
        let action = match self {
            ActionSpec::WriteThroughPointer { index, value } => {
                Scalar::parse(value)?.write_through_pointer(*index)
            }
            ActionSpec::WriteThroughReference { index, value } => {
                Scalar::parse(value)?.write_through_reference(*index)
            }
            ActionSpec::CopyRange { index, source } => Action::copy_range(*index, source),
            ActionSpec::Return { value } => Scalar::parse(value)?.returning(),
        };
        Ok(action)
    }
}

impl ExpectationSpec {
    fn matcher(&self) -> Result<Matcher, ToolError> {
        let Some(patterns) = &self.args else {
            return Ok(Matcher::any());
        };
        let matchers = patterns
            .iter()
            .map(|p| Pattern::parse(p).map(Pattern::into_matcher))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Matcher::Args(matchers))
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ToolError> {
        logging::log_loading_scenario(&path.to_string_lossy());
        let content = fs::read_to_string(path).map_err(|e| {
            ToolError::FileError(format!("Failed to read scenario file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ToolError> {
        toml::from_str(content)
            .map_err(|e| invalid(format!("Failed to parse scenario TOML: {}", e)))
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("scenario")
    }

    fn cells(&self) -> Result<Cells, ToolError> {
        self.cells
            .iter()
            .map(|(name, value)| {
                let cell = SharedCell::new(name, Scalar::parse(value)?)?;
                Ok((name.clone(), cell))
            })
            .collect()
    }

    /// Declare the capabilities and register the expectations.
    ///
    /// The runner verifies explicitly, so drop-time verification is off.
    pub fn ledger(&self, config: LedgerConfig) -> Result<Ledger, ToolError> {
        let mut ledger = Ledger::with_config(
            self.name(),
            LedgerConfig {
                verify_on_drop: false,
                ..config
            },
        );
        for capability in &self.capabilities {
            ledger.declare(capability.clone())?;
        }
        for spec in &self.expectations {
            let actions = spec
                .actions
                .iter()
                .map(ActionSpec::to_action)
                .collect::<Result<Vec<_>, _>>()?;
            ledger.expect(&spec.capability, spec.matcher()?, spec.times, actions)?;
        }
        Ok(ledger)
    }

    /// Validate everything `run` would use without dispatching any call.
    pub fn check(&self, config: LedgerConfig) -> Result<ScenarioSummary, ToolError> {
        let cells = self.cells()?;
        let ledger = self.ledger(config)?;
        for call in &self.calls {
            let (mut bound, kinds) = prepare_args(&ledger, &cells, call)?;
            for (i, (b, kind)) in bound.iter_mut().zip(&kinds).enumerate() {
                b.bind(*kind, i)?;
            }
            for pattern in call.after.iter().flatten() {
                Pattern::parse(pattern)?;
            }
            if let Some(returns) = &call.returns {
                Scalar::parse(returns)?;
            }
        }
        for value in self.expect_cells.values() {
            Scalar::parse(value)?;
        }
        Ok(ScenarioSummary {
            capabilities: self.capabilities.len(),
            expectations: self.expectations.len(),
            calls: self.calls.len(),
        })
    }

    pub fn run(&self, config: LedgerConfig) -> Result<ScenarioReport, ToolError> {
        let cells = self.cells()?;
        let mut ledger = self.ledger(config)?;
        logging::log_scenario_loaded(self.name(), self.expectations.len(), self.calls.len());

        let mut steps = Vec::with_capacity(self.calls.len());
        for (i, call) in self.calls.iter().enumerate() {
            let step = run_call(&mut ledger, &cells, i + 1, call)?;
            logging::log_scenario_step(step.step, &step.capability, step.passed);
            steps.push(step);
        }

        let mut cell_reports = Vec::with_capacity(self.expect_cells.len());
        for (name, expected) in &self.expect_cells {
            let wanted = Scalar::parse(expected)?;
            let actual = cells.get(name).map(SharedCell::current);
            cell_reports.push(CellReport {
                cell: name.clone(),
                expected: expected.clone(),
                passed: actual.as_ref() == Some(&wanted),
                actual: actual.map_or(Value::Null, |a| a.to_json()),
            });
        }

        let unsatisfied = ledger.unsatisfied().iter().map(ToString::to_string).collect();
        let report = ScenarioReport {
            name: self.name().to_string(),
            steps,
            cells: cell_reports,
            unsatisfied,
            calls: ledger.calls().to_vec(),
        };
        logging::log_scenario_complete(&report.name, report.passed(), report.failures());
        Ok(report)
    }
}

/// Parse a call's arguments and pick the kind each one binds as.
///
/// Cells passed to `value` parameters are replaced by their current value.
fn prepare_args<'c>(
    ledger: &Ledger,
    cells: &'c Cells,
    call: &CallSpec,
) -> Result<(Vec<Bound<'c>>, Vec<ParamKind>), ToolError> {
    let declared: Vec<ParamKind> = ledger
        .capability(&call.capability)
        .map(|c| c.params().to_vec())
        .unwrap_or_default();
    let mut bound = call
        .args
        .iter()
        .map(|value| Bound::parse(value, cells))
        .collect::<Result<Vec<_>, _>>()?;
    let kinds: Vec<ParamKind> = bound
        .iter()
        .enumerate()
        .map(|(i, b)| declared.get(i).copied().unwrap_or_else(|| b.natural_kind()))
        .collect();
    for (b, kind) in bound.iter_mut().zip(&kinds) {
        if *kind != ParamKind::Value {
            continue;
        }
        if let Bound::Named(cell) = *b {
            *b = Bound::Owned(cell.current());
        }
    }
    Ok((bound, kinds))
}

fn run_call(
    ledger: &mut Ledger,
    cells: &Cells,
    step: usize,
    call: &CallSpec,
) -> Result<StepReport, ToolError> {
    let (mut bound, kinds) = prepare_args(ledger, cells, call)?;

    let result = {
        let mut args = bound
            .iter_mut()
            .zip(&kinds)
            .enumerate()
            .map(|(i, (b, kind))| b.bind(*kind, i))
            .collect::<Result<Vec<_>, _>>()?;
        ledger.dispatch(&call.capability, &mut args)
    };

    let mut failures = Vec::new();
    match (&result, call.error.as_deref()) {
        (Ok(_), Some(kind)) => {
            failures.push(format!("expected `{}` error, call succeeded", kind));
        }
        (Err(err), Some(kind)) if err.kind() != kind => {
            failures.push(format!("expected `{}` error, got `{}`: {}", kind, err.kind(), err));
        }
        (Err(err), None) => failures.push(err.to_string()),
        _ => {}
    }

    if let (Ok(outcome), Some(expected)) = (&result, &call.returns) {
        let expected = Scalar::parse(expected)?;
        let actual = Scalar::from_outcome(outcome);
        if actual.as_ref() != Some(&expected) {
            failures.push(format!(
                "expected return {}, got {}",
                expected,
                render(actual.as_ref())
            ));
        }
    }

    for (index, pattern) in call.after.iter().flatten().enumerate() {
        let pattern = Pattern::parse(pattern)?;
        let actual = bound.get(index).and_then(Bound::current);
        if !pattern.accepts(actual.as_ref()) {
            failures.push(format!(
                "argument {} expected {}, got {}",
                index,
                pattern,
                render(actual.as_ref())
            ));
        }
    }

    Ok(StepReport {
        step,
        capability: call.capability.clone(),
        passed: failures.is_empty(),
        failures,
    })
}
