use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Transfer,
    Fee,
    Mint,
    Burn,
}

impl OperationType {
    pub const ALL: [OperationType; 4] = [
        OperationType::Transfer,
        OperationType::Fee,
        OperationType::Mint,
        OperationType::Burn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Transfer => "transfer",
            OperationType::Fee => "fee",
            OperationType::Mint => "mint",
            OperationType::Burn => "burn",
        }
    }

    /// Mints and burns never join a related-operation group.
    pub fn is_standalone(&self) -> bool {
        matches!(self, OperationType::Mint | OperationType::Burn)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Failed,
}

impl OperationStatus {
    pub const ALL: [OperationStatus; 2] = [OperationStatus::Success, OperationStatus::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "success",
            OperationStatus::Failed => "failed",
        }
    }

    pub fn successful(&self) -> bool {
        matches!(self, OperationStatus::Success)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Currency {
    pub fn new(symbol: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            metadata: None,
        }
    }
}

/// Signed integer amount in the token's smallest unit, as a decimal string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Amount {
    pub value: String,
    pub currency: Currency,
}

impl Amount {
    pub fn credit(value: U256, currency: &Currency) -> Self {
        Self {
            value: value.to_string(),
            currency: currency.clone(),
        }
    }

    pub fn debit(value: U256, currency: &Currency) -> Self {
        let value = if value.is_zero() {
            "0".to_string()
        } else {
            format!("-{}", value)
        };
        Self {
            value,
            currency: currency.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountIdentifier {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_account: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AccountIdentifier {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            sub_account: None,
            metadata: None,
        }
    }

    /// Checksummed form of an on-chain address.
    pub fn from_address(address: &Address) -> Self {
        Self::new(&address.to_checksum(None))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationIdentifier {
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_index: Option<i64>,
}

impl OperationIdentifier {
    pub fn new(index: i64) -> Self {
        Self {
            index,
            network_index: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_operations: Vec<OperationIdentifier>,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Operation {
    /// A single balance change on one account.
    pub fn atomic(
        index: i64,
        op_type: OperationType,
        status: Option<OperationStatus>,
        account: &Address,
        amount: Amount,
        related_operations: Vec<OperationIdentifier>,
    ) -> Self {
        Self {
            operation_identifier: OperationIdentifier::new(index),
            related_operations,
            op_type,
            status,
            account: Some(AccountIdentifier::from_address(account)),
            amount: Some(amount),
            metadata: None,
        }
    }

    pub fn index(&self) -> i64 {
        self.operation_identifier.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    fn cusd() -> Currency {
        Currency::new("cUSD", 18)
    }

    #[test]
    fn test_operation_serialization_matches_wire_shape() {
        let op = Operation::atomic(
            1,
            OperationType::Transfer,
            Some(OperationStatus::Success),
            &address!("f977814e90da44bfa03b6295a0616a897441acec"),
            Amount::credit(U256::from(1000u64), &cusd()),
            vec![OperationIdentifier::new(0)],
        );

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            json!({
                "operation_identifier": { "index": 1 },
                "related_operations": [{ "index": 0 }],
                "type": "transfer",
                "status": "success",
                "account": { "address": "0xF977814e90dA44bFA03b6295A0616a897441aceC" },
                "amount": { "value": "1000", "currency": { "symbol": "cUSD", "decimals": 18 } }
            })
        );
    }

    #[test]
    fn test_empty_related_operations_are_omitted() {
        let op = Operation::atomic(
            0,
            OperationType::Mint,
            Some(OperationStatus::Success),
            &Address::repeat_byte(0x11),
            Amount::credit(U256::from(5u64), &cusd()),
            Vec::new(),
        );

        let value = serde_json::to_value(&op).unwrap();
        assert!(value.get("related_operations").is_none());
    }

    #[test]
    fn test_debit_amount_formatting() {
        assert_eq!(Amount::debit(U256::from(42u64), &cusd()).value, "-42");
        assert_eq!(Amount::debit(U256::ZERO, &cusd()).value, "0");
        assert_eq!(Amount::credit(U256::from(42u64), &cusd()).value, "42");
    }

    #[test]
    fn test_operation_type_deserialization() {
        let op_type: OperationType = serde_json::from_str("\"fee\"").unwrap();
        assert_eq!(op_type, OperationType::Fee);
        assert!(serde_json::from_str::<OperationType>("\"stake\"").is_err());
        assert!(OperationType::Burn.is_standalone());
        assert!(!OperationType::Fee.is_standalone());
    }
}
