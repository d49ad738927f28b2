use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    Amount, Currency, Operation, OperationIdentifier, OperationStatus, OperationType, RawTransferLog,
    Transaction, TransactionIdentifier,
};
use crate::token::IStableToken;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogDecodeError {
    #[error("Expected 3 topics, got {0}")]
    TopicCount(usize),
    #[error("Log topic {0} is not the Transfer event signature")]
    UnexpectedSignature(B256),
    #[error("Expected 32 bytes of value data, got {0}")]
    DataLength(usize),
}

/// A log entry as the node reports it. Fields the gateway does not read are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EthLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub transaction_hash: B256,
    pub log_index: U64,
    #[serde(default)]
    pub removed: bool,
}

/// Decode a Transfer event log into its sender, recipient and value.
pub fn decode_transfer_log(log: &EthLog) -> Result<RawTransferLog, LogDecodeError> {
    if log.topics.len() != 3 {
        return Err(LogDecodeError::TopicCount(log.topics.len()));
    }
    if log.topics[0] != IStableToken::Transfer::SIGNATURE_HASH {
        return Err(LogDecodeError::UnexpectedSignature(log.topics[0]));
    }
    if log.data.len() != 32 {
        return Err(LogDecodeError::DataLength(log.data.len()));
    }

    Ok(RawTransferLog {
        transaction_hash: log.transaction_hash,
        log_index: log.log_index.to::<u64>(),
        from: address_from_topic(&log.topics[1]),
        to: address_from_topic(&log.topics[2]),
        value: U256::from_be_slice(&log.data),
        removed: log.removed,
    })
}

pub fn decode_transfer_logs(logs: &[EthLog]) -> Result<Vec<RawTransferLog>, LogDecodeError> {
    logs.iter().map(decode_transfer_log).collect()
}

/// Indexed address parameters are left-padded to 32 bytes.
fn address_from_topic(topic: &B256) -> Address {
    Address::from_slice(&topic[12..])
}

/// Operations derived for one transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub hash: B256,
    pub operations: Vec<Operation>,
}

impl From<ParsedTransaction> for Transaction {
    fn from(parsed: ParsedTransaction) -> Self {
        Transaction::new(TransactionIdentifier::from_hash(&parsed.hash), parsed.operations)
    }
}

/// Parsing state for the transaction currently being read.
///
/// `position` counts every log seen for the hash, including skipped null transfers,
/// and decides between `transfer` and `fee`. `group` holds the identifiers of the
/// related-operation group the next grouped operation joins.
#[derive(Debug)]
struct TransactionAccumulator {
    hash: B256,
    position: usize,
    operations: Vec<Operation>,
    group: Vec<OperationIdentifier>,
}

impl TransactionAccumulator {
    fn new(hash: B256) -> Self {
        Self {
            hash,
            position: 0,
            operations: Vec::new(),
            group: Vec::new(),
        }
    }

    fn apply(mut self, log: &RawTransferLog, currency: &Currency) -> Self {
        let position = self.position;
        self.position += 1;

        if log.is_null_transfer() {
            return self;
        }

        let status = if log.removed {
            OperationStatus::Failed
        } else {
            OperationStatus::Success
        };

        let op_type = if log.to.is_zero() {
            OperationType::Burn
        } else if log.from.is_zero() {
            OperationType::Mint
        } else if position == 0 {
            OperationType::Transfer
        } else {
            OperationType::Fee
        };

        if op_type.is_standalone() || position == 1 {
            self.group.clear();
        }

        if !log.from.is_zero() {
            self.push(op_type, status, &log.from, Amount::debit(log.value, currency));
        }
        if !log.to.is_zero() {
            self.push(op_type, status, &log.to, Amount::credit(log.value, currency));
        }

        self
    }

    fn push(&mut self, op_type: OperationType, status: OperationStatus, account: &Address, amount: Amount) {
        let index = self.operations.len() as i64;
        let related = if op_type.is_standalone() {
            Vec::new()
        } else {
            let related = self.group.clone();
            self.group.push(OperationIdentifier::new(index));
            related
        };

        self.operations
            .push(Operation::atomic(index, op_type, Some(status), account, amount, related));
    }

    fn finish(self) -> ParsedTransaction {
        ParsedTransaction {
            hash: self.hash,
            operations: self.operations,
        }
    }
}

/// Turns a block's ordered Transfer logs into per-transaction operation lists.
#[derive(Debug, Clone)]
pub struct LogEventParser {
    currency: Currency,
}

impl LogEventParser {
    pub fn new(currency: Currency) -> Self {
        Self { currency }
    }

    /// One entry per run of consecutive logs sharing a hash, in first-seen order.
    pub fn parse(&self, logs: &[RawTransferLog]) -> Vec<ParsedTransaction> {
        let mut parsed = Vec::new();
        let mut current: Option<TransactionAccumulator> = None;

        for log in logs {
            let accumulator = match current.take() {
                Some(acc) if acc.hash == log.transaction_hash => acc,
                Some(acc) => {
                    parsed.push(acc.finish());
                    TransactionAccumulator::new(log.transaction_hash)
                }
                None => TransactionAccumulator::new(log.transaction_hash),
            };
            current = Some(accumulator.apply(log, &self.currency));
        }

        if let Some(acc) = current {
            parsed.push(acc.finish());
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};
    use serde_json::json;

    const ALICE: Address = address!("1111111111111111111111111111111111111111");
    const BOB: Address = address!("2222222222222222222222222222222222222222");
    const CAROL: Address = address!("3333333333333333333333333333333333333333");
    const TX_A: B256 = b256!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const TX_B: B256 = b256!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    fn parser() -> LogEventParser {
        LogEventParser::new(Currency::new("cUSD", 18))
    }

    fn transfer(hash: B256, log_index: u64, from: Address, to: Address, value: u64) -> RawTransferLog {
        RawTransferLog {
            transaction_hash: hash,
            log_index,
            from,
            to,
            value: U256::from(value),
            removed: false,
        }
    }

    fn related(op: &Operation) -> Vec<i64> {
        op.related_operations.iter().map(|id| id.index).collect()
    }

    fn amount(op: &Operation) -> &str {
        op.amount.as_ref().map(|a| a.value.as_str()).unwrap_or_default()
    }

    #[test]
    fn test_single_transfer_produces_debit_and_credit() {
        let parsed = parser().parse(&[transfer(TX_A, 0, ALICE, BOB, 500)]);

        assert_eq!(parsed.len(), 1);
        let ops = &parsed[0].operations;
        assert_eq!(ops.len(), 2);

        assert_eq!(ops[0].op_type, OperationType::Transfer);
        assert_eq!(ops[0].index(), 0);
        assert_eq!(amount(&ops[0]), "-500");
        assert_eq!(ops[0].account, Some(crate::models::AccountIdentifier::from_address(&ALICE)));
        assert!(related(&ops[0]).is_empty());

        assert_eq!(ops[1].index(), 1);
        assert_eq!(amount(&ops[1]), "500");
        assert_eq!(related(&ops[1]), vec![0]);
        assert_eq!(ops[1].status, Some(OperationStatus::Success));
    }

    #[test]
    fn test_mint_is_standalone_credit() {
        let parsed = parser().parse(&[transfer(TX_A, 0, Address::ZERO, BOB, 77)]);
        let ops = &parsed[0].operations;

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op_type, OperationType::Mint);
        assert_eq!(amount(&ops[0]), "77");
        assert!(related(&ops[0]).is_empty());
    }

    #[test]
    fn test_burn_is_standalone_debit() {
        let parsed = parser().parse(&[transfer(TX_A, 0, ALICE, Address::ZERO, 9)]);
        let ops = &parsed[0].operations;

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op_type, OperationType::Burn);
        assert_eq!(amount(&ops[0]), "-9");
        assert!(related(&ops[0]).is_empty());
    }

    #[test]
    fn test_null_transfer_is_skipped() {
        let parsed = parser().parse(&[transfer(TX_A, 0, Address::ZERO, Address::ZERO, 1)]);
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].operations.is_empty());
    }

    #[test]
    fn test_second_log_is_fee_in_new_group() {
        let parsed = parser().parse(&[
            transfer(TX_A, 0, ALICE, BOB, 100),
            transfer(TX_A, 1, ALICE, CAROL, 3),
            transfer(TX_A, 2, ALICE, CAROL, 2),
        ]);
        let ops = &parsed[0].operations;
        assert_eq!(ops.len(), 6);

        let types: Vec<OperationType> = ops.iter().map(|op| op.op_type).collect();
        assert_eq!(
            types,
            vec![
                OperationType::Transfer,
                OperationType::Transfer,
                OperationType::Fee,
                OperationType::Fee,
                OperationType::Fee,
                OperationType::Fee,
            ]
        );

        assert_eq!(related(&ops[1]), vec![0]);
        // Position 1 starts a fresh group; later fees keep extending it.
        assert!(related(&ops[2]).is_empty());
        assert_eq!(related(&ops[3]), vec![2]);
        assert_eq!(related(&ops[4]), vec![2, 3]);
        assert_eq!(related(&ops[5]), vec![2, 3, 4]);

        let indices: Vec<i64> = ops.iter().map(Operation::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_mint_between_transfers_clears_group() {
        let parsed = parser().parse(&[
            transfer(TX_A, 0, ALICE, BOB, 10),
            transfer(TX_A, 1, Address::ZERO, CAROL, 4),
            transfer(TX_A, 2, BOB, CAROL, 1),
        ]);
        let ops = &parsed[0].operations;

        assert_eq!(ops[2].op_type, OperationType::Mint);
        assert!(related(&ops[2]).is_empty());
        assert_eq!(ops[3].op_type, OperationType::Fee);
        assert!(related(&ops[3]).is_empty());
        assert_eq!(related(&ops[4]), vec![3]);
    }

    #[test]
    fn test_skipped_log_still_advances_position() {
        let parsed = parser().parse(&[
            transfer(TX_A, 0, Address::ZERO, Address::ZERO, 1),
            transfer(TX_A, 1, ALICE, BOB, 10),
        ]);
        let ops = &parsed[0].operations;

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].op_type, OperationType::Fee);
        assert_eq!(ops[0].index(), 0);
    }

    #[test]
    fn test_transactions_split_by_hash_in_first_seen_order() {
        let parsed = parser().parse(&[
            transfer(TX_B, 0, ALICE, BOB, 1),
            transfer(TX_B, 1, BOB, CAROL, 1),
            transfer(TX_A, 0, CAROL, ALICE, 2),
        ]);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].hash, TX_B);
        assert_eq!(parsed[0].operations.len(), 4);
        assert_eq!(parsed[1].hash, TX_A);
        assert_eq!(parsed[1].operations[0].index(), 0);
        assert_eq!(parsed[1].operations[0].op_type, OperationType::Transfer);
    }

    #[test]
    fn test_removed_log_is_failed() {
        let mut log = transfer(TX_A, 0, ALICE, BOB, 5);
        log.removed = true;
        let parsed = parser().parse(&[log]);

        assert!(parsed[0]
            .operations
            .iter()
            .all(|op| op.status == Some(OperationStatus::Failed)));
    }

    #[test]
    fn test_grouped_amounts_net_to_zero() {
        let parsed = parser().parse(&[
            transfer(TX_A, 0, ALICE, BOB, 1_000_000),
            transfer(TX_A, 1, ALICE, CAROL, 21_000),
        ]);
        let total: i128 = parsed[0]
            .operations
            .iter()
            .map(|op| amount(op).parse::<i128>().unwrap())
            .sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(parser().parse(&[]).is_empty());
    }

    fn eth_log(topics: Vec<B256>, data: &str) -> EthLog {
        serde_json::from_value(json!({
            "address": "0x765de816845861e75a25fca122bb6898b8b1282a",
            "topics": topics,
            "data": data,
            "blockNumber": "0xbb8",
            "transactionHash": TX_A,
            "transactionIndex": "0x0",
            "blockHash": B256::ZERO,
            "logIndex": "0x3",
            "removed": false
        }))
        .expect("log fixture should deserialize")
    }

    fn topic(address: Address) -> B256 {
        address.into_word()
    }

    #[test]
    fn test_decode_transfer_log() {
        let log = eth_log(
            vec![IStableToken::Transfer::SIGNATURE_HASH, topic(ALICE), topic(BOB)],
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
        );

        let decoded = decode_transfer_log(&log).unwrap();
        assert_eq!(decoded.from, ALICE);
        assert_eq!(decoded.to, BOB);
        assert_eq!(decoded.value, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(decoded.log_index, 3);
        assert_eq!(decoded.transaction_hash, TX_A);
        assert!(!decoded.removed);
    }

    #[test]
    fn test_decode_rejects_malformed_logs() {
        let value = "0x0000000000000000000000000000000000000000000000000000000000000001";

        let missing_topic = eth_log(vec![IStableToken::Transfer::SIGNATURE_HASH, topic(ALICE)], value);
        assert_eq!(decode_transfer_log(&missing_topic), Err(LogDecodeError::TopicCount(2)));

        let wrong_event = eth_log(vec![B256::ZERO, topic(ALICE), topic(BOB)], value);
        assert!(matches!(
            decode_transfer_log(&wrong_event),
            Err(LogDecodeError::UnexpectedSignature(_))
        ));

        let short_data = eth_log(
            vec![IStableToken::Transfer::SIGNATURE_HASH, topic(ALICE), topic(BOB)],
            "0x01",
        );
        assert_eq!(decode_transfer_log(&short_data), Err(LogDecodeError::DataLength(1)));
    }
}
