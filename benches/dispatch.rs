use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stubledger::config::LedgerConfig;
use stubledger::{Action, Arg, ArgMatcher, Capability, Ledger, Matcher, Times};

fn ledger(record_calls: bool) -> Ledger {
    let mut ledger = Ledger::with_config(
        "Bench",
        LedgerConfig {
            verify_on_drop: false,
            record_calls,
        },
    );
    ledger
        .declare(
            Capability::new("do_all")
                .pointer()
                .reference()
                .buffer()
                .returns(),
        )
        .unwrap();
    ledger
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let source: Vec<u8> = (0..64).collect();

    group.bench_function("do_all", |b| {
        let mut ledger = ledger(false);
        ledger
            .expect(
                "do_all",
                Matcher::any(),
                Times::Any,
                vec![
                    Action::write_through_pointer(0, 10i32),
                    Action::write_through_reference(1, 11i32),
                    Action::copy_range(2, &source),
                    Action::returning(10i32),
                ],
            )
            .unwrap();
        b.iter(|| {
            let mut a = 0i32;
            let mut r = 0i32;
            let mut buffer = [0u8; 64];
            let outcome = ledger
                .dispatch(
                    black_box("do_all"),
                    &mut [
                        Arg::pointer(&mut a),
                        Arg::reference(&mut r),
                        Arg::buffer(&mut buffer),
                    ],
                )
                .unwrap();
            black_box(outcome.returned::<i32>().unwrap());
        })
    });

    group.bench_function("first_match_of_32", |b| {
        let mut ledger = ledger(false);
        for i in 0..32 {
            ledger
                .expect(
                    "do_all",
                    Matcher::args([ArgMatcher::eq(i), ArgMatcher::Any, ArgMatcher::Any]),
                    Times::Any,
                    vec![Action::returning(i)],
                )
                .unwrap();
        }
        b.iter(|| {
            let mut a = 31i32;
            let mut r = 0i32;
            let mut buffer = [0u8; 4];
            let outcome = ledger
                .dispatch(
                    "do_all",
                    &mut [
                        Arg::pointer(&mut a),
                        Arg::reference(&mut r),
                        Arg::buffer(&mut buffer),
                    ],
                )
                .unwrap();
            black_box(outcome.effects());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
