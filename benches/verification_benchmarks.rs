use criterion::{Criterion, criterion_group, criterion_main};
use instantswap::app::{DEFAULT_HISTORY_LIMIT, verify_by_address_history};
use instantswap::domain::{Amount, Transaction, TxOutput, TxVerifyRequest, status};
use instantswap::test_utils::MockExplorer;
use std::hint::black_box;

fn bench_status_mapping(c: &mut Criterion) {
    let inputs = ["finished", "WAITING", " confirming ", "verifying"];

    c.bench_function("map_status_changenow", |b| {
        b.iter(|| {
            for input in inputs {
                black_box(status::CHANGENOW.map_status(black_box(input)));
            }
        })
    });
}

fn bench_history_scan(c: &mut Criterion) {
    // Matching payment sits at the end of a full page
    let mut history: Vec<Transaction> = (0..DEFAULT_HISTORY_LIMIT - 1)
        .map(|i| Transaction {
            hash: format!("other-{}", i),
            confirmations: 6,
            outputs: vec![TxOutput {
                addresses: vec![format!("addr-{}", i)],
                value: Amount::from_atoms(1_000_000),
                ..Default::default()
            }],
            ..Default::default()
        })
        .collect();
    history.push(Transaction {
        hash: "target".to_string(),
        confirmations: 6,
        outputs: vec![TxOutput {
            addresses: vec!["deposit".to_string()],
            value: Amount::from_atoms(50_000_000),
            ..Default::default()
        }],
        ..Default::default()
    });

    let explorer = MockExplorer::new().with_history(history);
    let request = TxVerifyRequest::new("deposit", 0.5, 1);
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("verify_by_address_history", |b| {
        b.to_async(&runtime).iter(|| async {
            let _ = black_box(
                verify_by_address_history(&explorer, black_box(&request), DEFAULT_HISTORY_LIMIT)
                    .await,
            );
        })
    });
}

criterion_group!(benches, bench_status_mapping, bench_history_scan);
criterion_main!(benches);
