use stubledger::config::LedgerConfig;
use stubledger::{Capability, Ledger};

/// A ledger that leaves verification to the property body.
pub fn ledger_with(capabilities: impl IntoIterator<Item = Capability>) -> Ledger {
    let mut ledger = Ledger::with_config(
        "Prop",
        LedgerConfig {
            verify_on_drop: false,
            record_calls: true,
        },
    );
    for capability in capabilities {
        ledger.declare(capability).unwrap();
    }
    ledger
}
