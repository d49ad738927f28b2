//! Request and response bodies of the endpoints the gateway itself answers.
//! Forwarded endpoints are relayed as raw JSON and have no types here.

use serde::{Deserialize, Serialize};

use super::operation::{AccountIdentifier, Amount, Currency, Operation};
use super::transaction::{Block, BlockIdentifier, PartialBlockIdentifier, Transaction, TransactionIdentifier};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkIdentifier {
    pub blockchain: String,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_network_identifier: Option<serde_json::Value>,
}

impl NetworkIdentifier {
    pub fn new(blockchain: &str, network: &str) -> Self {
        Self {
            blockchain: blockchain.to_string(),
            network: network.to_string(),
            sub_network_identifier: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockRequest {
    pub network_identifier: NetworkIdentifier,
    pub block_identifier: PartialBlockIdentifier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_transactions: Option<Vec<TransactionIdentifier>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockTransactionRequest {
    pub network_identifier: NetworkIdentifier,
    pub block_identifier: BlockIdentifier,
    pub transaction_identifier: TransactionIdentifier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockTransactionResponse {
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallRequest {
    pub network_identifier: NetworkIdentifier,
    pub method: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallResponse {
    pub result: serde_json::Value,
    #[serde(default)]
    pub idempotent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionPreprocessRequest {
    pub network_identifier: NetworkIdentifier,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionPreprocessResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionPayloadsRequest {
    pub network_identifier: NetworkIdentifier,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    Ecdsa,
    EcdsaRecovery,
    Ed25519,
    Schnorr1,
    SchnorrPoseidon,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SigningPayload {
    pub account_identifier: AccountIdentifier,
    pub hex_bytes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<SignatureType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionPayloadsResponse {
    pub unsigned_transaction: String,
    pub payloads: Vec<SigningPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionParseRequest {
    pub network_identifier: NetworkIdentifier,
    pub signed: bool,
    pub transaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionParseResponse {
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub account_identifier_signers: Vec<AccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountBalanceRequest {
    pub network_identifier: NetworkIdentifier,
    pub account_identifier: AccountIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_identifier: Option<PartialBlockIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currencies: Option<Vec<Currency>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountBalanceResponse {
    pub block_identifier: BlockIdentifier,
    pub balances: Vec<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signature_type_wire_name() {
        let json = serde_json::to_string(&SignatureType::EcdsaRecovery).unwrap();
        assert_eq!(json, "\"ecdsa_recovery\"");
    }

    #[test]
    fn test_block_response_without_other_transactions() {
        let response: BlockResponse = serde_json::from_value(json!({
            "block": {
                "block_identifier": { "index": 1, "hash": "0x01" },
                "parent_block_identifier": { "index": 0, "hash": "0x00" },
                "timestamp": 0
            },
            "other_transactions": [{ "hash": "0xff" }]
        }))
        .unwrap();
        assert_eq!(response.other_transactions.as_ref().map(Vec::len), Some(1));

        let cleared = BlockResponse {
            other_transactions: None,
            ..response
        };
        let value = serde_json::to_value(&cleared).unwrap();
        assert!(value.get("other_transactions").is_none());
        assert_eq!(value["block"]["transactions"], json!([]));
    }

    #[test]
    fn test_parse_response_omits_empty_signers() {
        let response = ConstructionParseResponse {
            operations: Vec::new(),
            account_identifier_signers: Vec::new(),
            metadata: None,
        };
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "operations": [] }));
    }
}
