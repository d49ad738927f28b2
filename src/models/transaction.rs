use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use super::operation::Operation;

/// A decoded token Transfer event, in the order the node reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransferLog {
    pub transaction_hash: B256,
    pub log_index: u64,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub removed: bool,
}

impl RawTransferLog {
    pub fn is_null_transfer(&self) -> bool {
        self.from.is_zero() && self.to.is_zero()
    }
}

/// The minimal transfer a client wants to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferIntent {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionIdentifier {
    pub hash: String,
}

impl TransactionIdentifier {
    pub fn from_hash(hash: &B256) -> Self {
        Self {
            hash: hash.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub transaction_identifier: TransactionIdentifier,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Transaction {
    pub fn new(transaction_identifier: TransactionIdentifier, operations: Vec<Operation>) -> Self {
        Self {
            transaction_identifier,
            operations,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockIdentifier {
    pub index: i64,
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartialBlockIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub block_identifier: BlockIdentifier,
    pub parent_block_identifier: BlockIdentifier,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Block {
    pub fn height(&self) -> i64 {
        self.block_identifier.index
    }

    pub fn find_transaction(&self, hash: &str) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| tx.transaction_identifier.hash.eq_ignore_ascii_case(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_block() -> Block {
        serde_json::from_value(json!({
            "block_identifier": { "index": 3000, "hash": "0xaa" },
            "parent_block_identifier": { "index": 2999, "hash": "0xbb" },
            "timestamp": 1588000000000i64,
            "transactions": [
                {
                    "transaction_identifier": { "hash": "0xABCDEF" },
                    "operations": []
                }
            ]
        }))
        .expect("block fixture should deserialize")
    }

    #[test]
    fn test_block_deserialization() {
        let block = sample_block();
        assert_eq!(block.height(), 3000);
        assert_eq!(block.parent_block_identifier.hash, "0xbb");
        assert_eq!(block.transactions.len(), 1);
        assert!(block.metadata.is_none());
    }

    #[test]
    fn test_find_transaction_ignores_hex_case() {
        let block = sample_block();
        assert!(block.find_transaction("0xabcdef").is_some());
        assert!(block.find_transaction("0x123456").is_none());
    }

    #[test]
    fn test_partial_block_identifier_omits_missing_fields() {
        let partial = PartialBlockIdentifier {
            index: Some(7),
            hash: None,
        };
        assert_eq!(serde_json::to_string(&partial).unwrap(), r#"{"index":7}"#);

        let empty: PartialBlockIdentifier = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, PartialBlockIdentifier::default());
    }

    #[test]
    fn test_null_transfer_detection() {
        let log = RawTransferLog {
            transaction_hash: B256::ZERO,
            log_index: 0,
            from: Address::ZERO,
            to: Address::ZERO,
            value: U256::from(1u64),
            removed: false,
        };
        assert!(log.is_null_transfer());

        let mint = RawTransferLog {
            to: Address::repeat_byte(0x01),
            ..log
        };
        assert!(!mint.is_null_transfer());
    }
}
