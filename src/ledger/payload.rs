use crate::args::{AccessError, Arg};
use std::any::{type_name, Any};
use std::fmt;

trait Payload: fmt::Debug {
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn fresh(&self) -> Box<dyn Any>;
    fn equals_arg(&self, arg: &Arg<'_>) -> Result<bool, AccessError>;
    fn write_to(&self, arg: &mut Arg<'_>) -> Result<(), AccessError>;
    fn same_as(&self, other: &dyn Any) -> bool;
}

struct Typed<T>(T);

impl<T: fmt::Debug> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<T: Any + Clone + PartialEq + fmt::Debug> Payload for Typed<T> {
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }

    fn fresh(&self) -> Box<dyn Any> {
        Box::new(self.0.clone())
    }

    fn equals_arg(&self, arg: &Arg<'_>) -> Result<bool, AccessError> {
        arg.read::<T, _>(|actual| *actual == self.0)
    }

    fn write_to(&self, arg: &mut Arg<'_>) -> Result<(), AccessError> {
        arg.write(self.0.clone())
    }

    fn same_as(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| *other == self.0)
    }
}

/// A type-erased value held by a matcher or an action.
pub struct Stored(Box<dyn Payload>);

impl Stored {
    pub fn new<T: Any + Clone + PartialEq + fmt::Debug>(value: T) -> Self {
        Self(Box::new(Typed(value)))
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    /// Borrow the stored value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub(crate) fn as_any(&self) -> &dyn Any {
        self.0.as_any()
    }

    /// A new owned copy of the value.
    pub(crate) fn fresh(&self) -> Box<dyn Any> {
        self.0.fresh()
    }

    pub(crate) fn equals_arg(&self, arg: &Arg<'_>) -> Result<bool, AccessError> {
        self.0.equals_arg(arg)
    }

    pub(crate) fn write_to(&self, arg: &mut Arg<'_>) -> Result<(), AccessError> {
        self.0.write_to(arg)
    }

    /// Both values have the same type and compare equal.
    pub(crate) fn same_as(&self, other: &Stored) -> bool {
        self.0.same_as(other.as_any())
    }
}

impl fmt::Debug for Stored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}
