use super::payload::Stored;
use crate::args::{AccessError, Arg};
use crate::capability::{Capability, ParamKind};
use crate::capture::{Capture, CaptureSlot};
use crate::LedgerError;
use std::any::Any;
use std::fmt;

/// One side effect (or the result) of a matched call.
#[derive(Debug)]
pub enum Action {
    /// `*args[index] = value` for a pointer argument.
    WriteThroughPointer { index: usize, value: Stored },
    /// `args[index] = value` for a reference argument.
    WriteThroughReference { index: usize, value: Stored },
    /// Copy the whole source range into the front of a buffer argument.
    CopyRange { index: usize, source: Stored },
    /// Copy the argument's current value (or pointee) into a [`Capture`].
    Capture { index: usize, sink: CaptureSlot },
    /// The call's result. Terminal.
    Return(Stored),
}

/// What applying one action produced.
pub(crate) enum Applied {
    Effect,
    Value(Box<dyn Any>),
}

impl Action {
    pub fn write_through_pointer<T: Any + Clone + PartialEq + fmt::Debug>(
        index: usize,
        value: T,
    ) -> Self {
        Action::WriteThroughPointer {
            index,
            value: Stored::new(value),
        }
    }

    pub fn write_through_reference<T: Any + Clone + PartialEq + fmt::Debug>(
        index: usize,
        value: T,
    ) -> Self {
        Action::WriteThroughReference {
            index,
            value: Stored::new(value),
        }
    }

    /// Copy `source` (the `[begin, end)` range) into the buffer at `index`.
    pub fn copy_range<T: Any + Clone + PartialEq + fmt::Debug>(index: usize, source: &[T]) -> Self {
        Action::CopyRange {
            index,
            source: Stored::new(source.to_vec()),
        }
    }

    pub fn capture<T: Any + Clone + fmt::Debug>(index: usize, capture: &Capture<T>) -> Self {
        Action::Capture {
            index,
            sink: CaptureSlot::new(capture),
        }
    }

    pub fn returning<T: Any + Clone + PartialEq + fmt::Debug>(value: T) -> Self {
        Action::Return(Stored::new(value))
    }

    /// The argument this action touches, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Action::WriteThroughPointer { index, .. }
            | Action::WriteThroughReference { index, .. }
            | Action::CopyRange { index, .. }
            | Action::Capture { index, .. } => Some(*index),
            Action::Return(_) => None,
        }
    }

    /// Type the action reads or writes.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::WriteThroughPointer { value, .. }
            | Action::WriteThroughReference { value, .. }
            | Action::Return(value) => value.type_name(),
            Action::CopyRange { source, .. } => source.type_name(),
            Action::Capture { sink, .. } => sink.type_name(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Action::WriteThroughPointer { .. } => "write_through_pointer",
            Action::WriteThroughReference { .. } => "write_through_reference",
            Action::CopyRange { .. } => "copy_range",
            Action::Capture { .. } => "capture",
            Action::Return(_) => "return",
        }
    }

    fn required_kind(&self) -> Option<ParamKind> {
        match self {
            Action::WriteThroughPointer { .. } => Some(ParamKind::Pointer),
            Action::WriteThroughReference { .. } => Some(ParamKind::Reference),
            Action::CopyRange { .. } => Some(ParamKind::Buffer),
            Action::Capture { .. } | Action::Return(_) => None,
        }
    }

    /// Check an action list against the capability it will run on.
    pub(crate) fn validate_list(capability: &Capability, actions: &[Action]) -> Result<(), LedgerError> {
        let invalid = |reason: String| LedgerError::InvalidAction {
            capability: capability.name().to_string(),
            reason,
        };

        for (position, action) in actions.iter().enumerate() {
            if let Action::Return(_) = action {
                if !capability.has_return() {
                    return Err(invalid("`return` on a capability without a result".into()));
                }
                if position + 1 != actions.len() {
                    return Err(invalid(format!(
                        "`return` at position {} must be the last action",
                        position
                    )));
                }
                continue;
            }

            let Some(index) = action.index() else {
                continue;
            };
            let Some(declared) = capability.param_kind(index) else {
                return Err(invalid(format!(
                    "`{}` targets argument {} but the capability takes {}",
                    action.name(),
                    index,
                    capability.arity()
                )));
            };
            if let Some(required) = action.required_kind() {
                if declared != required {
                    return Err(invalid(format!(
                        "`{}` needs a {} argument but argument {} is a {}",
                        action.name(),
                        required,
                        index,
                        declared
                    )));
                }
            }
        }
        Ok(())
    }

    /// Run the action against the call's arguments.
    pub(crate) fn apply(&self, capability: &str, args: &mut [Arg<'_>]) -> Result<Applied, LedgerError> {
        let fail = |index: usize, err: AccessError| access_error(capability, index, self.type_name(), err);

        match self {
            Action::WriteThroughPointer { index, value }
            | Action::WriteThroughReference { index, value } => {
                let arg = argument(capability, args, *index)?;
                value.write_to(arg).map_err(|e| fail(*index, e))?;
                Ok(Applied::Effect)
            }
            Action::CopyRange { index, source } => {
                let arg = argument(capability, args, *index)?;
                arg.copy_from(source.as_any()).map_err(|e| fail(*index, e))?;
                Ok(Applied::Effect)
            }
            Action::Capture { index, sink } => {
                let arg = argument(capability, args, *index)?;
                sink.record(arg).map_err(|e| fail(*index, e))?;
                Ok(Applied::Effect)
            }
            Action::Return(value) => Ok(Applied::Value(value.fresh())),
        }
    }
}

fn argument<'s, 'a>(
    capability: &str,
    args: &'s mut [Arg<'a>],
    index: usize,
) -> Result<&'s mut Arg<'a>, LedgerError> {
    let arity = args.len();
    args.get_mut(index).ok_or_else(|| LedgerError::ArityMismatch {
        capability: capability.to_string(),
        expected: index + 1,
        actual: arity,
    })
}

fn access_error(capability: &str, index: usize, expected: &'static str, err: AccessError) -> LedgerError {
    let capability = capability.to_string();
    match err {
        AccessError::Null => LedgerError::NullArgument { capability, index },
        AccessError::WrongType => LedgerError::TypeMismatch {
            capability,
            index,
            expected,
        },
        AccessError::Borrowed => LedgerError::ArgumentBorrowed { capability, index },
        AccessError::Overflow { needed, capacity } => LedgerError::BufferOverflowRisk {
            capability,
            index,
            needed,
            capacity,
        },
    }
}
