use super::payload::Stored;
use crate::args::Arg;
use std::any::Any;
use std::fmt;

type Predicate = Box<dyn Fn(&Arg<'_>) -> bool>;

fn predicate(f: impl Fn(&Arg<'_>) -> bool + 'static) -> Predicate {
    Box::new(f)
}

/// Condition on one argument of a call.
///
/// Pointer and reference arguments are compared by pointee; buffers compare
/// their full contents against a `Vec<T>`.
pub enum ArgMatcher {
    Any,
    Eq(Stored),
    IsNull,
    NotNull,
    Predicate(Predicate),
}

impl ArgMatcher {
    pub fn eq<T: Any + Clone + PartialEq + fmt::Debug>(value: T) -> Self {
        ArgMatcher::Eq(Stored::new(value))
    }

    /// Accept the argument when it reads as a `T` and `f` holds for it.
    pub fn when<T: Any>(f: impl Fn(&T) -> bool + 'static) -> Self {
        ArgMatcher::Predicate(predicate(move |arg| arg.read::<T, _>(&f).unwrap_or(false)))
    }

    fn accepts(&self, arg: &Arg<'_>) -> bool {
        match self {
            ArgMatcher::Any => true,
            ArgMatcher::Eq(expected) => expected.equals_arg(arg).unwrap_or(false),
            ArgMatcher::IsNull => arg.is_null(),
            ArgMatcher::NotNull => !arg.is_null(),
            ArgMatcher::Predicate(f) => f(arg),
        }
    }

    /// Everything `other` accepts, `self` accepts too.
    ///
    /// Predicates are opaque, so they never cover and are never covered
    /// (except by `Any`).
    fn covers(&self, other: &ArgMatcher) -> bool {
        match (self, other) {
            (ArgMatcher::Any, _) => true,
            (ArgMatcher::Eq(a), ArgMatcher::Eq(b)) => a.same_as(b),
            (ArgMatcher::IsNull, ArgMatcher::IsNull) => true,
            (ArgMatcher::NotNull, ArgMatcher::NotNull | ArgMatcher::Eq(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgMatcher::Any => f.write_str("_"),
            ArgMatcher::Eq(value) => write!(f, "eq({:?})", value),
            ArgMatcher::IsNull => f.write_str("null"),
            ArgMatcher::NotNull => f.write_str("!null"),
            ArgMatcher::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

/// Input pattern of an expectation.
#[derive(Debug)]
pub enum Matcher {
    /// Accept any arguments.
    Any,
    /// One matcher per declared parameter.
    Args(Vec<ArgMatcher>),
}

impl Matcher {
    pub fn any() -> Self {
        Matcher::Any
    }

    pub fn args(matchers: impl IntoIterator<Item = ArgMatcher>) -> Self {
        Matcher::Args(matchers.into_iter().collect())
    }

    /// Number of per-argument matchers, if any.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Matcher::Any => None,
            Matcher::Args(matchers) => Some(matchers.len()),
        }
    }

    pub(crate) fn accepts(&self, args: &[Arg<'_>]) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Args(matchers) => {
                matchers.len() == args.len()
                    && matchers.iter().zip(args).all(|(m, arg)| m.accepts(arg))
            }
        }
    }

    pub(crate) fn covers(&self, other: &Matcher) -> bool {
        match (self, other) {
            (Matcher::Any, _) => true,
            (Matcher::Args(mine), Matcher::Any) => {
                mine.iter().all(|m| matches!(m, ArgMatcher::Any))
            }
            (Matcher::Args(mine), Matcher::Args(theirs)) => {
                mine.len() == theirs.len()
                    && mine.iter().zip(theirs).all(|(a, b)| a.covers(b))
            }
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_compares_pointee() {
        let mut value = 9i32;
        let args = [Arg::pointer(&mut value)];
        assert!(Matcher::args([ArgMatcher::eq(9i32)]).accepts(&args));
        assert!(!Matcher::args([ArgMatcher::eq(10i32)]).accepts(&args));
    }

    #[test]
    fn test_eq_never_accepts_null_or_other_types() {
        let args = [Arg::null_pointer::<i32>()];
        assert!(!Matcher::args([ArgMatcher::eq(0i32)]).accepts(&args));
        assert!(Matcher::args([ArgMatcher::IsNull]).accepts(&args));

        let value = 1u8;
        let args = [Arg::value(&value)];
        assert!(!Matcher::args([ArgMatcher::eq(1i32)]).accepts(&args));
    }

    #[test]
    fn test_predicate_reads_typed_value() {
        let value = 12u32;
        let args = [Arg::value(&value)];
        assert!(Matcher::args([ArgMatcher::when(|v: &u32| *v > 10)]).accepts(&args));
        assert!(!Matcher::args([ArgMatcher::when(|v: &u32| *v > 20)]).accepts(&args));
    }

    #[test]
    fn test_wrong_length_never_accepts() {
        let value = 1i32;
        let args = [Arg::value(&value)];
        assert!(!Matcher::args([]).accepts(&args));
        assert!(Matcher::any().accepts(&args));
    }

    #[test]
    fn test_covers() {
        let wildcard = Matcher::args([ArgMatcher::Any, ArgMatcher::Any]);
        let narrow = Matcher::args([ArgMatcher::eq(1i32), ArgMatcher::NotNull]);
        assert!(wildcard.covers(&narrow));
        assert!(wildcard.covers(&Matcher::any()));
        assert!(!narrow.covers(&wildcard));
        assert!(Matcher::args([ArgMatcher::NotNull]).covers(&Matcher::args([ArgMatcher::eq(3)])));
        assert!(!Matcher::args([ArgMatcher::when(|_: &i32| true)])
            .covers(&Matcher::args([ArgMatcher::when(|_: &i32| true)])));
    }
}
