use serde::{Deserialize, Serialize};
use std::fmt;

/// How a parameter is passed to a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Read-only input.
    Value,
    /// Nullable, writable single cell.
    Pointer,
    /// Non-null, writable single cell.
    Reference,
    /// Nullable, writable run of elements.
    Buffer,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Value => "value",
            ParamKind::Pointer => "pointer",
            ParamKind::Reference => "reference",
            ParamKind::Buffer => "buffer",
        };
        f.write_str(name)
    }
}

/// A named operation with a fixed parameter list, as seen by the ledger.
///
/// ```
/// use stubledger::{Capability, ParamKind};
///
/// let do_all = Capability::new("do_all").pointer().reference().buffer().returns();
/// assert_eq!(do_all.arity(), 3);
/// assert_eq!(do_all.param_kind(2), Some(ParamKind::Buffer));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    name: String,
    #[serde(default)]
    params: Vec<ParamKind>,
    #[serde(default)]
    returns: bool,
}

impl Capability {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: false,
        }
    }

    /// Append a parameter of the given kind.
    pub fn param(mut self, kind: ParamKind) -> Self {
        self.params.push(kind);
        self
    }

    pub fn value(self) -> Self {
        self.param(ParamKind::Value)
    }

    pub fn pointer(self) -> Self {
        self.param(ParamKind::Pointer)
    }

    pub fn reference(self) -> Self {
        self.param(ParamKind::Reference)
    }

    pub fn buffer(self) -> Self {
        self.param(ParamKind::Buffer)
    }

    /// Mark the capability as producing a value.
    pub fn returns(mut self) -> Self {
        self.returns = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    /// Kind of the parameter at `index`, if it exists.
    pub fn param_kind(&self, index: usize) -> Option<ParamKind> {
        self.params.get(index).copied()
    }

    pub fn has_return(&self) -> bool {
        self.returns
    }
}
