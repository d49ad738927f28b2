use std::sync::Arc;

use serde_json::json;

use crate::error::Result;
use crate::logging::MetricsLogger;
use crate::models::{
    AccountIdentifier, ConstructionParseRequest, ConstructionParseResponse, ConstructionPayloadsRequest,
    ConstructionPayloadsResponse, ConstructionPreprocessRequest, ConstructionPreprocessResponse,
    NetworkIdentifier,
};
use crate::token::{TokenRegistry, TRANSFER_METHOD};

use super::codec::{TransactionCodec, TxMetadata};
use super::matcher::parse_transfer;

/// The construction endpoints the gateway answers itself.
#[derive(Clone)]
pub struct ConstructionService {
    registry: Arc<TokenRegistry>,
}

impl ConstructionService {
    pub fn new(registry: Arc<TokenRegistry>) -> Self {
        Self { registry }
    }

    fn codec(&self, network_identifier: &NetworkIdentifier) -> Result<TransactionCodec> {
        let gate = self.registry.gate(network_identifier)?;
        Ok(TransactionCodec::new(gate.contract_address, self.registry.currency().clone()))
    }

    /// Options for the upstream metadata endpoint, which estimates gas for the call.
    pub fn preprocess(&self, request: &ConstructionPreprocessRequest) -> Result<ConstructionPreprocessResponse> {
        self.registry.gate(&request.network_identifier)?;
        let intent = parse_transfer(&request.operations, self.registry.currency())?;

        MetricsLogger::log_construction("preprocess", &request.network_identifier.network, None);
        Ok(ConstructionPreprocessResponse {
            options: Some(json!({
                "from": intent.from.to_checksum(None),
                "method": TRANSFER_METHOD,
                "args": [intent.to.to_checksum(None), intent.value.to_string()],
            })),
        })
    }

    pub fn payloads(&self, request: &ConstructionPayloadsRequest) -> Result<ConstructionPayloadsResponse> {
        let codec = self.codec(&request.network_identifier)?;
        let metadata = TxMetadata::from_value(request.metadata.as_ref())?;
        let intent = parse_transfer(&request.operations, self.registry.currency())?;

        let (envelope, payload) = codec.build(&intent, &metadata)?;

        MetricsLogger::log_construction("payloads", &request.network_identifier.network, None);
        Ok(ConstructionPayloadsResponse {
            unsigned_transaction: envelope.to_transport()?,
            payloads: vec![payload],
        })
    }

    pub fn parse(&self, request: &ConstructionParseRequest) -> Result<ConstructionParseResponse> {
        let codec = self.codec(&request.network_identifier)?;
        let parsed = codec.parse(&request.transaction, request.signed)?;

        MetricsLogger::log_construction("parse", &request.network_identifier.network, Some(request.signed));
        Ok(ConstructionParseResponse {
            operations: codec.canonical_operations(&parsed.intent),
            account_identifier_signers: parsed
                .signer
                .iter()
                .map(AccountIdentifier::from_address)
                .collect(),
            metadata: None,
        })
    }
}
