use proptest::prelude::*;
use stubledger::{Capability, Matcher, Times};

use crate::utils::ledger_with;

fn times() -> impl Strategy<Value = Times> {
    prop_oneof![
        (0usize..5).prop_map(Times::Exactly),
        (0usize..5).prop_map(Times::AtLeast),
        (0usize..5).prop_map(Times::AtMost),
        (0usize..5, 0usize..5).prop_map(|(a, b)| Times::Between(a.min(b), a.max(b))),
        Just(Times::Any),
    ]
}

proptest! {
    #[test]
    fn test_calls_succeed_until_budget_is_spent(times in times(), attempts in 0usize..8) {
        let mut ledger = ledger_with([Capability::new("ping")]);
        let handle = ledger.expect("ping", Matcher::any(), times, vec![]).unwrap();

        let mut served = 0;
        for _ in 0..attempts {
            match ledger.dispatch("ping", &mut []) {
                Ok(_) => served += 1,
                Err(err) => prop_assert_eq!(err.kind(), "call_count_exceeded"),
            }
        }

        let cap = times.upper().unwrap_or(usize::MAX);
        prop_assert_eq!(served, attempts.min(cap));
        prop_assert_eq!(ledger.expectation_calls(handle), Some(served));
        prop_assert_eq!(ledger.call_count("ping"), attempts);
        prop_assert_eq!(ledger.verify().is_ok(), times.is_satisfied(served));
    }
}
