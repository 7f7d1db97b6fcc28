//! Runtime bindings for the arguments of a dispatched call.
//!
//! A substitute wraps each parameter of its trait method in an [`Arg`] before
//! handing the call to the ledger. Writable arguments are type-erased
//! borrows, so actions can overwrite them in place and the caller observes
//! the result as soon as the call returns.
//!
//! Storage that must be reachable through two arguments at once (the same
//! variable passed as both pointer and reference) is bound through a shared
//! `&RefCell<T>`; later writes then overwrite earlier ones exactly as they
//! would through aliased pointers.

use crate::capability::ParamKind;
use std::any::{type_name, Any};
use std::cell::RefCell;

/// Why an argument could not be read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AccessError {
    Null,
    WrongType,
    Borrowed,
    Overflow { needed: usize, capacity: usize },
}

/// A single writable cell.
enum Target<'a> {
    Unique(&'a mut dyn Any),
    /// Always a `RefCell<T>`.
    Shared(&'a dyn Any),
}

impl Target<'_> {
    fn read<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, AccessError> {
        match self {
            Target::Unique(any) => any.downcast_ref::<T>().map(f).ok_or(AccessError::WrongType),
            Target::Shared(any) => {
                let cell = any
                    .downcast_ref::<RefCell<T>>()
                    .ok_or(AccessError::WrongType)?;
                let value = cell.try_borrow().map_err(|_| AccessError::Borrowed)?;
                Ok(f(&*value))
            }
        }
    }

    fn write<T: Any>(&mut self, value: T) -> Result<(), AccessError> {
        match self {
            Target::Unique(any) => {
                let slot = any.downcast_mut::<T>().ok_or(AccessError::WrongType)?;
                *slot = value;
                Ok(())
            }
            Target::Shared(any) => {
                let cell = any
                    .downcast_ref::<RefCell<T>>()
                    .ok_or(AccessError::WrongType)?;
                let mut slot = cell.try_borrow_mut().map_err(|_| AccessError::Borrowed)?;
                *slot = value;
                Ok(())
            }
        }
    }
}

/// Type-erased destination of a range copy.
trait BufferSink {
    fn capacity(&self) -> usize;
    /// Owned copy of the current contents, as a `Vec<T>`.
    fn snapshot(&self) -> Box<dyn Any>;
    /// Copy a `Vec<T>` into the front of the buffer.
    fn copy_from(&mut self, source: &dyn Any) -> Result<usize, AccessError>;
}

impl<T: Any + Clone> BufferSink for &mut [T] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn snapshot(&self) -> Box<dyn Any> {
        Box::new(self.to_vec())
    }

    fn copy_from(&mut self, source: &dyn Any) -> Result<usize, AccessError> {
        let source = source
            .downcast_ref::<Vec<T>>()
            .ok_or(AccessError::WrongType)?;
        let dest: &mut [T] = self;
        // Oversized copies are refused whole rather than truncated.
        if source.len() > dest.len() {
            return Err(AccessError::Overflow {
                needed: source.len(),
                capacity: dest.len(),
            });
        }
        dest[..source.len()].clone_from_slice(source);
        Ok(source.len())
    }
}

enum Slot<'a> {
    Value(&'a dyn Any),
    Pointer(Option<Target<'a>>),
    Reference(Target<'a>),
    Buffer(Option<Box<dyn BufferSink + 'a>>),
}

/// One argument of a dispatched call.
pub struct Arg<'a> {
    slot: Slot<'a>,
    type_name: &'static str,
}

impl<'a> Arg<'a> {
    /// A read-only input.
    pub fn value<T: Any>(value: &'a T) -> Self {
        Self {
            slot: Slot::Value(value),
            type_name: type_name::<T>(),
        }
    }

    /// A non-null pointer to `target`.
    pub fn pointer<T: Any>(target: &'a mut T) -> Self {
        Self::pointer_opt(Some(target))
    }

    /// A pointer that may be null.
    pub fn pointer_opt<T: Any>(target: Option<&'a mut T>) -> Self {
        Self {
            slot: Slot::Pointer(target.map(|t| Target::Unique(t as &mut dyn Any))),
            type_name: type_name::<T>(),
        }
    }

    pub fn null_pointer<T: Any>() -> Self {
        Self::pointer_opt::<T>(None)
    }

    /// A pointer to storage that other arguments of the same call may alias.
    pub fn shared_pointer<T: Any>(cell: &'a RefCell<T>) -> Self {
        Self {
            slot: Slot::Pointer(Some(Target::Shared(cell))),
            type_name: type_name::<T>(),
        }
    }

    pub fn reference<T: Any>(target: &'a mut T) -> Self {
        Self {
            slot: Slot::Reference(Target::Unique(target)),
            type_name: type_name::<T>(),
        }
    }

    /// A reference to storage that other arguments of the same call may alias.
    pub fn shared_reference<T: Any>(cell: &'a RefCell<T>) -> Self {
        Self {
            slot: Slot::Reference(Target::Shared(cell)),
            type_name: type_name::<T>(),
        }
    }

    /// A pointer to the first element of `buffer`.
    pub fn buffer<T: Any + Clone>(buffer: &'a mut [T]) -> Self {
        Self::buffer_opt(Some(buffer))
    }

    pub fn buffer_opt<T: Any + Clone>(buffer: Option<&'a mut [T]>) -> Self {
        Self {
            slot: Slot::Buffer(buffer.map(|b| Box::new(b) as Box<dyn BufferSink + 'a>)),
            type_name: type_name::<[T]>(),
        }
    }

    pub fn null_buffer<T: Any + Clone>() -> Self {
        Self::buffer_opt::<T>(None)
    }

    pub fn kind(&self) -> ParamKind {
        match self.slot {
            Slot::Value(_) => ParamKind::Value,
            Slot::Pointer(_) => ParamKind::Pointer,
            Slot::Reference(_) => ParamKind::Reference,
            Slot::Buffer(_) => ParamKind::Buffer,
        }
    }

    /// Name of the bound type (`[T]` for buffers).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_null(&self) -> bool {
        matches!(self.slot, Slot::Pointer(None) | Slot::Buffer(None))
    }

    /// Number of elements the buffer can hold; `None` for other kinds or null.
    pub fn capacity(&self) -> Option<usize> {
        match &self.slot {
            Slot::Buffer(Some(sink)) => Some(sink.capacity()),
            _ => None,
        }
    }

    /// Read the argument as a `T` (the pointee for pointers and references,
    /// a `Vec<E>` snapshot for buffers of `E`).
    pub(crate) fn read<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, AccessError> {
        match &self.slot {
            Slot::Value(any) => any.downcast_ref::<T>().map(f).ok_or(AccessError::WrongType),
            Slot::Pointer(Some(target)) | Slot::Reference(target) => target.read(f),
            Slot::Buffer(Some(sink)) => {
                let snapshot = sink.snapshot();
                snapshot
                    .downcast_ref::<T>()
                    .map(f)
                    .ok_or(AccessError::WrongType)
            }
            Slot::Pointer(None) | Slot::Buffer(None) => Err(AccessError::Null),
        }
    }

    /// Overwrite the cell behind a pointer or reference.
    pub(crate) fn write<T: Any>(&mut self, value: T) -> Result<(), AccessError> {
        match &mut self.slot {
            Slot::Pointer(Some(target)) | Slot::Reference(target) => target.write(value),
            Slot::Pointer(None) => Err(AccessError::Null),
            Slot::Value(_) | Slot::Buffer(_) => Err(AccessError::WrongType),
        }
    }

    /// Copy a `Vec<T>` into the front of a buffer.
    pub(crate) fn copy_from(&mut self, source: &dyn Any) -> Result<usize, AccessError> {
        match &mut self.slot {
            Slot::Buffer(Some(sink)) => sink.copy_from(source),
            Slot::Buffer(None) => Err(AccessError::Null),
            _ => Err(AccessError::WrongType),
        }
    }
}

impl std::fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arg")
            .field("kind", &self.kind())
            .field("type", &self.type_name)
            .field("null", &self.is_null())
            .finish()
    }
}
