use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result, ValidationError};
use crate::logging::LogContext;
use crate::models::{AccountBalanceRequest, AccountBalanceResponse, Amount, BlockIdentifier, CallRequest};
use crate::token::{TokenRegistry, BALANCE_OF_METHOD};

use super::chain_client::ChainClient;

pub const CALL_METHOD: &str = "celo_call";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallParams {
    method: &'static str,
    args: [String; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    block_number: Option<String>,
}

/// Contract call output: the block it ran against and the ABI-encoded return data.
#[derive(Debug, Deserialize)]
struct CallResult {
    block_identifier: BlockIdentifier,
    raw: Bytes,
}

/// Token balances read through the token's `balanceOf`.
pub struct AccountService {
    client: Arc<dyn ChainClient>,
    registry: Arc<TokenRegistry>,
}

impl AccountService {
    pub fn new(client: Arc<dyn ChainClient>, registry: Arc<TokenRegistry>) -> Self {
        Self { client, registry }
    }

    pub async fn balance(&self, request: &AccountBalanceRequest) -> Result<AccountBalanceResponse> {
        self.registry.gate(&request.network_identifier)?;

        let owner = request
            .account_identifier
            .address
            .parse::<Address>()
            .map_err(|_| ValidationError::InvalidAddress(request.account_identifier.address.clone()))?;

        let block_number = match &request.block_identifier {
            None => None,
            Some(block) => match block.index {
                Some(index) => Some(index.to_string()),
                None => {
                    LogContext::new("account_service", "balance")
                        .with_network(&request.network_identifier.network)
                        .with_address(&request.account_identifier.address)
                        .warn("Block index is required when passing a block identifier");
                    return Err(ValidationError::MissingBlockIndex.into());
                }
            },
        };

        let params = CallParams {
            method: BALANCE_OF_METHOD,
            args: [owner.to_checksum(None)],
            block_number,
        };
        let call = CallRequest {
            network_identifier: request.network_identifier.clone(),
            method: CALL_METHOD.to_string(),
            parameters: serde_json::to_value(&params)
                .map_err(|e| GatewayError::Internal(format!("balance call params: {}", e)))?,
        };

        let response = self.client.call(&call).await?;
        let result: CallResult = serde_json::from_value(response.result).map_err(|e| {
            GatewayError::Validation(ValidationError::UpstreamResult(format!("{}: {}", CALL_METHOD, e)))
        })?;

        if let Some(requested) = request.block_identifier.as_ref().and_then(|b| b.hash.as_ref()) {
            if *requested != result.block_identifier.hash {
                LogContext::new("account_service", "balance")
                    .with_network(&request.network_identifier.network)
                    .with_metadata("requested_hash", serde_json::json!(requested))
                    .with_metadata("returned_hash", serde_json::json!(result.block_identifier.hash))
                    .error("Mismatch between requested and returned block hash");
                return Err(GatewayError::Internal("block hash mismatch".to_string()));
            }
        }

        let balance = U256::try_from_be_slice(&result.raw).ok_or_else(|| {
            GatewayError::Validation(ValidationError::UpstreamResult(format!(
                "balance of {} bytes does not fit 256 bits",
                result.raw.len()
            )))
        })?;

        Ok(AccountBalanceResponse {
            block_identifier: result.block_identifier,
            balances: vec![Amount::credit(balance, self.registry.currency())],
            metadata: None,
        })
    }
}
