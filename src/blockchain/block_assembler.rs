use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{GatewayError, Result, ValidationError};
use crate::logging::{LogContext, MetricsLogger};
use crate::models::{
    BlockRequest, BlockResponse, BlockTransactionRequest, BlockTransactionResponse, CallRequest,
    NetworkIdentifier, PartialBlockIdentifier, RawTransferLog, Transaction,
};
use crate::token::{TokenRegistry, TRANSFER_EVENT};

use super::chain_client::ChainClient;
use super::log_parser::{decode_transfer_logs, EthLog, LogEventParser};

pub const GET_LOGS_METHOD: &str = "celo_getLogs";

/// Parameters of the filtered log query. Heights are decimal strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallLogsParams {
    event: &'static str,
    from_block: String,
    to_block: String,
}

#[derive(Debug, Deserialize)]
struct CallLogsResult {
    #[serde(default)]
    logs: Vec<EthLog>,
}

/// Builds block and block-transaction responses carrying token operations only.
pub struct BlockAssembler {
    client: Arc<dyn ChainClient>,
    registry: Arc<TokenRegistry>,
    parser: LogEventParser,
}

impl BlockAssembler {
    pub fn new(client: Arc<dyn ChainClient>, registry: Arc<TokenRegistry>) -> Self {
        let parser = LogEventParser::new(registry.currency().clone());
        Self {
            client,
            registry,
            parser,
        }
    }

    pub async fn block(&self, request: &BlockRequest) -> Result<BlockResponse> {
        let gate = self.registry.gate(&request.network_identifier)?;
        let mut response = self.client.block(request).await?;

        let Some(block) = response.block.as_mut() else {
            return Ok(response);
        };
        response.other_transactions = None;
        let height = block.height();
        let context = LogContext::new("block_assembler", "block")
            .with_network(&request.network_identifier.network)
            .with_block_index(height);

        if !gate.is_active_at(height) {
            context.debug("Block predates token activation");
            block.transactions = Vec::new();
            return Ok(response);
        }

        let logs = self.transfer_logs(&request.network_identifier, height).await?;
        block.transactions = self
            .parser
            .parse(&logs)
            .into_iter()
            .map(Transaction::from)
            .collect();

        let operation_count = block.transactions.iter().map(|tx| tx.operations.len()).sum();
        MetricsLogger::log_block_assembled(
            &request.network_identifier.network,
            height,
            block.transactions.len(),
            operation_count,
        );

        Ok(response)
    }

    /// A transaction without token operations in the block comes back empty, not as an error.
    pub async fn block_transaction(&self, request: &BlockTransactionRequest) -> Result<BlockTransactionResponse> {
        let block_request = BlockRequest {
            network_identifier: request.network_identifier.clone(),
            block_identifier: PartialBlockIdentifier {
                index: Some(request.block_identifier.index),
                hash: Some(request.block_identifier.hash.clone()),
            },
        };
        let response = self.block(&block_request).await?;

        let hash = &request.transaction_identifier.hash;
        let transaction = response
            .block
            .as_ref()
            .and_then(|block| block.find_transaction(hash))
            .cloned()
            .unwrap_or_else(|| {
                LogContext::new("block_assembler", "block_transaction")
                    .with_network(&request.network_identifier.network)
                    .with_block_index(request.block_identifier.index)
                    .with_transaction_hash(hash)
                    .debug("Transaction carries no token operations");
                Transaction::new(request.transaction_identifier.clone(), Vec::new())
            });

        Ok(BlockTransactionResponse { transaction })
    }

    async fn transfer_logs(&self, network_identifier: &NetworkIdentifier, height: i64) -> Result<Vec<RawTransferLog>> {
        let params = CallLogsParams {
            event: TRANSFER_EVENT,
            from_block: height.to_string(),
            to_block: height.to_string(),
        };
        let call = CallRequest {
            network_identifier: network_identifier.clone(),
            method: GET_LOGS_METHOD.to_string(),
            parameters: serde_json::to_value(&params)
                .map_err(|e| GatewayError::Internal(format!("log query params: {}", e)))?,
        };

        let response = self.client.call(&call).await?;
        let result: CallLogsResult = serde_json::from_value(response.result).map_err(|e| {
            GatewayError::Validation(ValidationError::UpstreamResult(format!("{}: {}", GET_LOGS_METHOD, e)))
        })?;

        LogContext::new("block_assembler", "transfer_logs")
            .with_network(&network_identifier.network)
            .with_block_index(height)
            .with_metadata("log_count", json!(result.logs.len()))
            .trace("Fetched transfer logs");

        Ok(decode_transfer_logs(&result.logs)?)
    }
}
