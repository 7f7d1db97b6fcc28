use proptest::prelude::*;
use stubledger::{Action, Arg, Capability, Matcher, Times};

use crate::utils::ledger_with;

proptest! {
    #[test]
    fn test_pointer_write_is_observed(initial in any::<i64>(), written in any::<i64>()) {
        let mut ledger = ledger_with([Capability::new("set").pointer()]);
        ledger
            .expect("set", Matcher::any(), Times::once(), vec![Action::write_through_pointer(0, written)])
            .unwrap();

        let mut target = initial;
        ledger.dispatch("set", &mut [Arg::pointer(&mut target)]).unwrap();
        prop_assert_eq!(target, written);
    }

    #[test]
    fn test_reference_write_is_observed(written in ".*") {
        let mut ledger = ledger_with([Capability::new("set").reference()]);
        ledger
            .expect("set", Matcher::any(), Times::once(), vec![Action::write_through_reference(0, written.clone())])
            .unwrap();

        let mut target = String::new();
        ledger.dispatch("set", &mut [Arg::reference(&mut target)]).unwrap();
        prop_assert_eq!(target, written);
    }

    #[test]
    fn test_copy_range_fills_prefix(
        source in prop::collection::vec(any::<u8>(), 0..64),
        slack in 0usize..16,
        fill in any::<u8>(),
    ) {
        let mut ledger = ledger_with([Capability::new("set_buffer").buffer()]);
        ledger
            .expect("set_buffer", Matcher::any(), Times::once(), vec![Action::copy_range(0, &source)])
            .unwrap();

        let mut buffer = vec![fill; source.len() + slack];
        ledger.dispatch("set_buffer", &mut [Arg::buffer(&mut buffer)]).unwrap();
        prop_assert_eq!(&buffer[..source.len()], &source[..]);
        prop_assert!(buffer[source.len()..].iter().all(|&b| b == fill));
    }

    #[test]
    fn test_oversized_copy_never_writes(
        source in prop::collection::vec(any::<u8>(), 1..64),
        fill in any::<u8>(),
    ) {
        let mut ledger = ledger_with([Capability::new("set_buffer").buffer()]);
        ledger
            .expect("set_buffer", Matcher::any(), Times::once(), vec![Action::copy_range(0, &source)])
            .unwrap();

        let mut buffer = vec![fill; source.len() - 1];
        let err = ledger.dispatch("set_buffer", &mut [Arg::buffer(&mut buffer)]).unwrap_err();
        prop_assert_eq!(err.kind(), "buffer_overflow_risk");
        prop_assert!(buffer.iter().all(|&b| b == fill));
    }

    #[test]
    fn test_return_value_round_trips(value in any::<u32>()) {
        let mut ledger = ledger_with([Capability::new("get").returns()]);
        ledger
            .expect("get", Matcher::any(), Times::once(), vec![Action::returning(value)])
            .unwrap();

        let outcome = ledger.dispatch("get", &mut []).unwrap();
        prop_assert_eq!(outcome.returned::<u32>().unwrap(), value);
    }
}
