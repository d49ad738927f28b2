use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_primitives::{hex, keccak256, Address, Bytes, Signature, TxKind, B256, U256};
use alloy_rlp::{Decodable, Encodable, Header, RlpDecodable, RlpEncodable};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    AccountIdentifier, Amount, Currency, Operation, OperationIdentifier, OperationType, SignatureType,
    SigningPayload, TransferIntent,
};
use crate::token::IStableToken;

const EIP155_V_OFFSET: u64 = 35;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("wrong destination: expected {expected}, found {found}")]
    WrongDestination { expected: Address, found: Address },

    #[error("unrecognized method")]
    UnrecognizedMethod,

    #[error("undecodable arguments: {0}")]
    UndecodableArguments(String),

    #[error("invalid transaction encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("serialization failed: {0}")]
    Serialization(serde_json::Error),
}

/// Nonce, gas, fee and chain parameters supplied by `/construction/metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMetadata {
    pub nonce: u64,
    pub gas: u64,
    pub gas_price: U256,
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_fee_recipient: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_fee: Option<U256>,
}

impl TxMetadata {
    pub fn from_value(value: Option<&serde_json::Value>) -> Result<Self, CodecError> {
        let value = value.ok_or_else(|| CodecError::InvalidMetadata("metadata is required".to_string()))?;
        serde_json::from_value(value.clone()).map_err(|e| CodecError::InvalidMetadata(e.to_string()))
    }
}

/// A Celo legacy transaction plus its sender. `signature` is empty until signed,
/// otherwise 65 bytes of `r || s || v` with `v` in {27, 28}.
///
/// Without any of the fee currency and gateway fields the transaction is
/// Ethereum-compatible and hashes as a plain EIP-155 legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEnvelope {
    pub from: Address,
    pub to: Address,
    pub chain_id: u64,
    pub gas: u64,
    pub gas_price: U256,
    pub nonce: u64,
    pub data: Bytes,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_fee_recipient: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_fee: Option<U256>,
    #[serde(default)]
    pub signature: Bytes,
}

/// Node JSON form of a signed transaction, as returned by `/construction/combine`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedTransactionJson {
    nonce: U256,
    gas_price: U256,
    gas: U256,
    #[serde(default)]
    fee_currency: Option<Address>,
    #[serde(default)]
    gateway_fee_recipient: Option<Address>,
    #[serde(default)]
    gateway_fee: Option<U256>,
    #[serde(default)]
    to: Option<Address>,
    value: U256,
    input: Bytes,
    v: U256,
    r: U256,
    s: U256,
    #[serde(default)]
    eth_compatible: Option<bool>,
}

impl SignedTransactionJson {
    /// Celo fee fields after applying `ethCompatible`. A zero gateway fee is the same as none
    /// unless the node marks the transaction as using the Celo layout.
    fn fee_fields(&self) -> Result<(Option<Address>, Option<Address>, Option<U256>), CodecError> {
        let gateway_fee = self.gateway_fee.filter(|fee| !fee.is_zero());
        let has_fee_fields = self.fee_currency.is_some() || self.gateway_fee_recipient.is_some() || gateway_fee.is_some();
        match self.eth_compatible {
            Some(true) if has_fee_fields => Err(CodecError::InvalidEncoding(
                "eth-compatible transaction carries Celo fee fields".to_string(),
            )),
            Some(true) => Ok((None, None, None)),
            Some(false) => Ok((
                self.fee_currency,
                self.gateway_fee_recipient,
                Some(gateway_fee.unwrap_or_default()),
            )),
            None => Ok((self.fee_currency, self.gateway_fee_recipient, gateway_fee)),
        }
    }
}

/// Wire layout of a signed Ethereum-compatible legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
struct SignedLegacyTransaction {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    input: Bytes,
    v: u64,
    r: U256,
    s: U256,
}

fn quantity_u64(field: &str, value: U256) -> Result<u64, CodecError> {
    u64::try_from(value).map_err(|_| CodecError::InvalidEncoding(format!("{} {} out of range", field, value)))
}

/// Split an EIP-155 `v` into chain id and y-parity.
fn eip155_parts(v: u64) -> Result<(u64, bool), CodecError> {
    match v.checked_sub(EIP155_V_OFFSET) {
        Some(offset) => Ok((offset / 2, offset % 2 == 1)),
        None => Err(CodecError::InvalidSignature(format!("v = {} is not an EIP-155 signature", v))),
    }
}

fn encode_optional_address(address: Option<&Address>, out: &mut Vec<u8>) {
    match address {
        Some(address) => address.encode(out),
        None => Bytes::new().encode(out),
    }
}

impl TransactionEnvelope {
    /// Opaque string handed to the client between payloads and combine.
    pub fn to_transport(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Serialization)
    }

    pub fn from_transport(transport: &str) -> Result<Self, CodecError> {
        serde_json::from_str(transport).map_err(|e| CodecError::InvalidEncoding(e.to_string()))
    }

    pub fn has_celo_fee_fields(&self) -> bool {
        self.fee_currency.is_some() || self.gateway_fee_recipient.is_some() || self.gateway_fee.is_some()
    }

    fn gas_price_u128(&self) -> Result<u128, CodecError> {
        u128::try_from(self.gas_price)
            .map_err(|_| CodecError::InvalidMetadata(format!("gas price {} out of range", self.gas_price)))
    }

    fn legacy(&self) -> Result<TxLegacy, CodecError> {
        Ok(TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price_u128()?,
            gas_limit: self.gas,
            to: TxKind::Call(self.to),
            value: self.value,
            input: self.data.clone(),
        })
    }

    /// RLP of `[nonce, gasPrice, gas, feeCurrency, gatewayFeeRecipient, gatewayFee,
    /// to, value, data, chainId, 0, 0]`. Absent addresses encode as the empty string.
    fn celo_signing_preimage(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        self.nonce.encode(&mut payload);
        self.gas_price.encode(&mut payload);
        self.gas.encode(&mut payload);
        encode_optional_address(self.fee_currency.as_ref(), &mut payload);
        encode_optional_address(self.gateway_fee_recipient.as_ref(), &mut payload);
        self.gateway_fee.unwrap_or_default().encode(&mut payload);
        self.to.encode(&mut payload);
        self.value.encode(&mut payload);
        self.data.encode(&mut payload);
        self.chain_id.encode(&mut payload);
        0u8.encode(&mut payload);
        0u8.encode(&mut payload);

        let mut preimage = Vec::with_capacity(payload.len() + 9);
        Header {
            list: true,
            payload_length: payload.len(),
        }
        .encode(&mut preimage);
        preimage.extend_from_slice(&payload);
        preimage
    }

    /// EIP-155 pre-signature hash, over the Celo field layout when fee fields are set.
    pub fn signing_hash(&self) -> Result<B256, CodecError> {
        if self.has_celo_fee_fields() {
            Ok(keccak256(self.celo_signing_preimage()))
        } else {
            Ok(self.legacy()?.signature_hash())
        }
    }

    fn with_recovered_sender(mut self, signature: Signature) -> Result<Self, CodecError> {
        self.signature = Bytes::from(signature.as_bytes().to_vec());
        let hash = self.signing_hash()?;
        self.from = signature
            .recover_address_from_prehash(&hash)
            .map_err(|e| CodecError::InvalidSignature(e.to_string()))?;
        Ok(self)
    }

    /// Decode a signed transaction and recover its sender. The node JSON object is
    /// the primary form; a hex RLP Ethereum-compatible legacy transaction is also accepted.
    pub fn decode_signed(raw: &str) -> Result<Self, CodecError> {
        let raw = raw.trim();
        if raw.starts_with('{') {
            Self::decode_signed_json(raw)
        } else {
            Self::decode_signed_rlp(raw)
        }
    }

    fn decode_signed_json(raw: &str) -> Result<Self, CodecError> {
        let signed: SignedTransactionJson =
            serde_json::from_str(raw).map_err(|e| CodecError::InvalidEncoding(e.to_string()))?;

        let v = u64::try_from(signed.v)
            .map_err(|_| CodecError::InvalidSignature(format!("v = {} out of range", signed.v)))?;
        let (chain_id, parity) = eip155_parts(v)?;
        let to = signed
            .to
            .ok_or_else(|| CodecError::InvalidEncoding("contract creation is not a transfer".to_string()))?;
        let (fee_currency, gateway_fee_recipient, gateway_fee) = signed.fee_fields()?;

        let envelope = TransactionEnvelope {
            from: Address::ZERO,
            to,
            chain_id,
            gas: quantity_u64("gas", signed.gas)?,
            gas_price: signed.gas_price,
            nonce: quantity_u64("nonce", signed.nonce)?,
            data: signed.input,
            value: signed.value,
            fee_currency,
            gateway_fee_recipient,
            gateway_fee,
            signature: Bytes::new(),
        };
        envelope.with_recovered_sender(Signature::new(signed.r, signed.s, parity))
    }

    fn decode_signed_rlp(raw: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(raw.trim_matches('"')).map_err(|e| CodecError::InvalidEncoding(e.to_string()))?;
        let mut buf = bytes.as_slice();
        let signed = SignedLegacyTransaction::decode(&mut buf)
            .map_err(|e| CodecError::InvalidEncoding(e.to_string()))?;
        if !buf.is_empty() {
            return Err(CodecError::InvalidEncoding(format!("{} trailing bytes", buf.len())));
        }

        let (chain_id, parity) = eip155_parts(signed.v)?;
        let envelope = TransactionEnvelope {
            from: Address::ZERO,
            to: signed.to,
            chain_id,
            gas: signed.gas_limit,
            gas_price: U256::from(signed.gas_price),
            nonce: signed.nonce,
            data: signed.input,
            value: signed.value,
            fee_currency: None,
            gateway_fee_recipient: None,
            gateway_fee: None,
            signature: Bytes::new(),
        };
        envelope.with_recovered_sender(Signature::new(signed.r, signed.s, parity))
    }
}

/// Result of decoding a transaction back into a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransfer {
    pub intent: TransferIntent,
    pub signer: Option<Address>,
}

/// Encodes transfer intents as token contract calls and decodes them back.
#[derive(Debug, Clone)]
pub struct TransactionCodec {
    contract: Address,
    currency: Currency,
}

impl TransactionCodec {
    pub fn new(contract: Address, currency: Currency) -> Self {
        Self { contract, currency }
    }

    pub fn build(
        &self,
        intent: &TransferIntent,
        metadata: &TxMetadata,
    ) -> Result<(TransactionEnvelope, SigningPayload), CodecError> {
        let data = IStableToken::transferCall {
            to: intent.to,
            value: intent.value,
        }
        .abi_encode();

        let envelope = TransactionEnvelope {
            from: intent.from,
            to: self.contract,
            chain_id: metadata.chain_id,
            gas: metadata.gas,
            gas_price: metadata.gas_price,
            nonce: metadata.nonce,
            data: Bytes::from(data),
            value: U256::ZERO,
            fee_currency: metadata.fee_currency,
            gateway_fee_recipient: metadata.gateway_fee_recipient,
            gateway_fee: metadata.gateway_fee,
            signature: Bytes::new(),
        };

        let payload = SigningPayload {
            account_identifier: AccountIdentifier::from_address(&intent.from),
            hex_bytes: hex::encode(envelope.signing_hash()?),
            signature_type: Some(SignatureType::EcdsaRecovery),
        };

        Ok((envelope, payload))
    }

    pub fn parse(&self, transaction: &str, signed: bool) -> Result<ParsedTransfer, CodecError> {
        let envelope = if signed {
            TransactionEnvelope::decode_signed(transaction)?
        } else {
            TransactionEnvelope::from_transport(transaction)?
        };

        if envelope.to != self.contract {
            return Err(CodecError::WrongDestination {
                expected: self.contract,
                found: envelope.to,
            });
        }

        let (selector, arguments) = match envelope.data.len() {
            n if n >= 4 => envelope.data.split_at(4),
            _ => return Err(CodecError::UnrecognizedMethod),
        };
        if selector != IStableToken::transferCall::SELECTOR {
            return Err(CodecError::UnrecognizedMethod);
        }
        let call = IStableToken::transferCall::abi_decode_raw(arguments)
            .map_err(|e| CodecError::UndecodableArguments(e.to_string()))?;

        Ok(ParsedTransfer {
            intent: TransferIntent {
                from: envelope.from,
                to: call.to,
                value: call.value,
            },
            signer: signed.then_some(envelope.from),
        })
    }

    /// Debit on the sender, then the credit that references it.
    pub fn canonical_operations(&self, intent: &TransferIntent) -> Vec<Operation> {
        vec![
            Operation::atomic(
                0,
                OperationType::Transfer,
                None,
                &intent.from,
                Amount::debit(intent.value, &self.currency),
                Vec::new(),
            ),
            Operation::atomic(
                1,
                OperationType::Transfer,
                None,
                &intent.to,
                Amount::credit(intent.value, &self.currency),
                vec![OperationIdentifier::new(0)],
            ),
        ]
    }
}
