use crate::args::Arg;
use crate::builder::{ExpectationBuilder, SubstituteBuilder};
use crate::capability::Capability;
use crate::ledger::{CallRecord, Ledger, Outcome};
use crate::{LedgerError, Result};
use std::any::Any;
use std::cell::RefCell;

/// Stand-in collaborator state for a hand-written trait implementation.
///
/// Implement the collaborator trait on a struct holding a `Substitute` and
/// forward every method to [`call`](Substitute::call) or
/// [`call_returning`](Substitute::call_returning):
///
/// ```
/// use stubledger::{Action, Arg, Capability, Substitute, Times};
///
/// trait Counter {
///     fn bump(&self, value: &mut i32);
/// }
///
/// struct MockCounter(Substitute);
///
/// impl Counter for MockCounter {
///     fn bump(&self, value: &mut i32) {
///         self.0.call("bump", &mut [Arg::pointer(value)]);
///     }
/// }
///
/// let mock = MockCounter(
///     Substitute::builder("MockCounter")
///         .with_capability(Capability::new("bump").pointer())
///         .build(),
/// );
/// mock.0
///     .expect("bump")
///     .times(Times::once())
///     .will(vec![Action::write_through_pointer(0, 10)]);
///
/// let mut value = 9;
/// mock.bump(&mut value);
/// assert_eq!(value, 10);
/// ```
///
/// Every failure panics with the ledger error, failing the enclosing test.
/// The ledger is verified when the substitute is dropped.
pub struct Substitute {
    ledger: RefCell<Ledger>,
}

impl Substitute {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_ledger(Ledger::new(name))
    }

    pub fn builder(name: impl Into<String>) -> SubstituteBuilder {
        SubstituteBuilder::new(name)
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: RefCell::new(ledger),
        }
    }

    pub fn name(&self) -> String {
        self.ledger.borrow().substitute().to_string()
    }

    pub fn declare(&self, capability: Capability) -> Result<()> {
        self.ledger.borrow_mut().declare(capability)
    }

    /// Start an expectation on `capability`.
    pub fn expect(&self, capability: &str) -> ExpectationBuilder<'_> {
        ExpectationBuilder::new(self, capability)
    }

    /// Dispatch a call and hand back the ledger's verdict.
    pub fn try_call(&self, capability: &str, args: &mut [Arg<'_>]) -> Result<Outcome> {
        self.ledger.borrow_mut().dispatch(capability, args)
    }

    /// Dispatch a call whose result is ignored.
    #[track_caller]
    pub fn call(&self, capability: &str, args: &mut [Arg<'_>]) {
        let result = self.try_call(capability, args);
        if let Err(err) = result {
            fail(err);
        }
    }

    /// Dispatch a call and return the value produced by its `Return` action.
    #[track_caller]
    pub fn call_returning<R: Any>(&self, capability: &str, args: &mut [Arg<'_>]) -> R {
        let result = self
            .try_call(capability, args)
            .and_then(|outcome| outcome.returned::<R>());
        match result {
            Ok(value) => value,
            Err(err) => fail(err),
        }
    }

    /// Check call counts now; drop-time verification is then skipped.
    pub fn verify(&self) -> Result<()> {
        self.ledger.borrow_mut().verify()
    }

    pub fn unsatisfied(&self) -> Vec<LedgerError> {
        self.ledger.borrow().unsatisfied()
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.ledger.borrow().calls().to_vec()
    }

    pub fn call_count(&self, capability: &str) -> usize {
        self.ledger.borrow().call_count(capability)
    }

    /// Run `f` with exclusive access to the ledger.
    ///
    /// Panics if called from inside a matcher predicate of the same substitute.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(&mut self.ledger.borrow_mut())
    }
}

impl std::fmt::Debug for Substitute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ledger.try_borrow() {
            Ok(ledger) => f
                .debug_struct("Substitute")
                .field("name", &ledger.substitute())
                .field("calls", &ledger.calls().len())
                .finish(),
            Err(_) => f.write_str("Substitute { <in dispatch> }"),
        }
    }
}

#[track_caller]
fn fail(err: LedgerError) -> ! {
    panic!("{}", err)
}
