use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::SolEvent;

use rosetta_stable_token::blockchain::{decode_transfer_logs, EthLog, LogEventParser};
use rosetta_stable_token::models::{Currency, RawTransferLog};
use rosetta_stable_token::token::IStableToken;

fn address(seed: u64) -> Address {
    Address::from_word(B256::from(U256::from(seed + 1)))
}

/// A transfer followed by two fee logs per transaction, with a mint every tenth.
fn block_logs(transactions: u64) -> Vec<RawTransferLog> {
    let mut logs = Vec::new();
    for tx in 0..transactions {
        let hash = B256::from(U256::from(tx + 1));
        let payer = address(tx);
        let mut push = |from: Address, to: Address, value: u64| {
            let log_index = logs.len() as u64;
            logs.push(RawTransferLog {
                transaction_hash: hash,
                log_index,
                from,
                to,
                value: U256::from(value),
                removed: false,
            })
        };

        if tx % 10 == 0 {
            push(Address::ZERO, payer, 1_000_000);
        }
        push(payer, address(tx + 1000), 250_000);
        push(payer, address(9_999), 1_200);
        push(payer, address(8_888), 300);
    }
    logs
}

fn encoded_logs(raw: &[RawTransferLog]) -> Vec<EthLog> {
    raw.iter()
        .map(|log| EthLog {
            address: address(0xcafe),
            topics: vec![
                IStableToken::Transfer::SIGNATURE_HASH,
                log.from.into_word(),
                log.to.into_word(),
            ],
            data: Bytes::from(log.value.to_be_bytes::<32>().to_vec()),
            transaction_hash: log.transaction_hash,
            log_index: U64::from(log.log_index),
            removed: false,
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let parser = LogEventParser::new(Currency::new("cUSD", 18));
    let mut group = c.benchmark_group("log_event_parser");

    for size in [1u64, 50, 500].iter() {
        let logs = block_logs(*size);
        group.bench_with_input(BenchmarkId::new("parse", size), &logs, |b, logs| {
            b.iter(|| parser.parse(black_box(logs)));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_log_decode");

    for size in [50u64, 500].iter() {
        let logs = encoded_logs(&block_logs(*size));
        group.bench_with_input(BenchmarkId::new("decode", size), &logs, |b, logs| {
            b.iter(|| decode_transfer_logs(black_box(logs)));
        });
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(50);
    targets = bench_parse, bench_decode
);
criterion_main!(benches);
