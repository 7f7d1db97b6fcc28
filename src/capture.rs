use crate::args::{AccessError, Arg};
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A test-owned cell that receives a copy of an argument during a call.
///
/// Clones share the same cell: keep one in the test and hand the other to
/// [`Action::capture`](crate::Action::capture).
pub struct Capture<T> {
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Capture<T> {
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
        }
    }

    pub fn is_set(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Remove and return the captured value.
    pub fn take(&self) -> Option<T> {
        self.slot.borrow_mut().take()
    }
}

impl<T: Clone> Capture<T> {
    /// The most recently captured value.
    pub fn get(&self) -> Option<T> {
        self.slot.borrow().clone()
    }
}

impl<T> Clone for Capture<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> Default for Capture<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Capture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capture").field(&self.slot.borrow()).finish()
    }
}

/// Type-erased side of a [`Capture`] held by an action.
trait CaptureSink: fmt::Debug {
    fn type_name(&self) -> &'static str;
    fn record(&self, arg: &Arg<'_>) -> Result<(), AccessError>;
}

impl<T: Any + Clone + fmt::Debug> CaptureSink for Capture<T> {
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn record(&self, arg: &Arg<'_>) -> Result<(), AccessError> {
        let value = arg.read::<T, _>(T::clone)?;
        *self.slot.borrow_mut() = Some(value);
        Ok(())
    }
}

/// A [`Capture`] of any type, as stored in [`Action::Capture`](crate::Action::Capture).
#[derive(Debug)]
pub struct CaptureSlot(Box<dyn CaptureSink>);

impl CaptureSlot {
    pub fn new<T: Any + Clone + fmt::Debug>(capture: &Capture<T>) -> Self {
        Self(Box::new(capture.clone()))
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    pub(crate) fn record(&self, arg: &Arg<'_>) -> Result<(), AccessError> {
        self.0.record(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_one_cell() {
        let capture = Capture::<i32>::new();
        let slot = CaptureSlot::new(&capture);
        let value = 42;
        slot.record(&Arg::value(&value)).unwrap();
        assert_eq!(capture.get(), Some(42));
        assert_eq!(capture.take(), Some(42));
        assert!(!capture.is_set());
    }

    #[test]
    fn test_records_pointee_of_pointer() {
        let capture = Capture::<u16>::new();
        let mut value = 7u16;
        capture.record(&Arg::pointer(&mut value)).unwrap();
        assert_eq!(capture.get(), Some(7));
    }
}
