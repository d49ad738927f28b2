use std::collections::HashMap;

use alloy_primitives::Address;
use alloy_sol_types::sol;
use serde_json::json;

use crate::config::AppConfig;
use crate::error::{ConfigError, GatewayError, Result, ValidationError};
use crate::logging::{ErrorLogger, LogContext};
use crate::models::{Currency, NetworkIdentifier};

sol! {
    /// The slice of the stable token's ABI the gateway speaks.
    interface IStableToken {
        function transfer(address to, uint256 value) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

/// Upstream method names understood by the core service.
pub const TRANSFER_EVENT: &str = "StableToken.Transfer";
pub const TRANSFER_METHOD: &str = "StableToken.transfer";
pub const BALANCE_OF_METHOD: &str = "StableToken.balanceOf";

/// Where the contract lives on one network, and from which height it exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationGate {
    pub network: String,
    pub threshold_block_height: i64,
    pub contract_address: Address,
}

impl ActivationGate {
    pub fn is_active_at(&self, height: i64) -> bool {
        height >= self.threshold_block_height
    }
}

/// Immutable table of activation gates plus the served currency.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    gates: HashMap<String, ActivationGate>,
    currency: Currency,
}

impl TokenRegistry {
    pub fn new(gates: Vec<ActivationGate>, currency: Currency) -> Self {
        let gates = gates
            .into_iter()
            .map(|gate| (gate.network.clone(), gate))
            .collect();
        Self { gates, currency }
    }

    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, ConfigError> {
        let mut gates = Vec::with_capacity(config.networks.len());
        for network in &config.networks {
            let contract_address = network.contract_address.parse::<Address>().map_err(|_| {
                ConfigError::InvalidValue {
                    key: format!("networks.{}.contract_address", network.network),
                    value: network.contract_address.clone(),
                }
            })?;
            gates.push(ActivationGate {
                network: network.network.clone(),
                threshold_block_height: network.threshold_block_height,
                contract_address,
            });
        }

        Ok(Self::new(
            gates,
            Currency::new(&config.token.symbol, config.token.decimals),
        ))
    }

    /// Look up the gate for a network. Unknown networks are a client error.
    pub fn gate(&self, network_identifier: &NetworkIdentifier) -> Result<&ActivationGate> {
        match self.gates.get(&network_identifier.network) {
            Some(gate) => Ok(gate),
            None => {
                let error = GatewayError::Validation(ValidationError::UnknownNetwork(
                    network_identifier.network.clone(),
                ));
                let context = LogContext::new("token_registry", "gate")
                    .with_network(&network_identifier.network)
                    .with_metadata("blockchain", json!(network_identifier.blockchain));
                ErrorLogger::log_error(&error, Some(context));
                Err(error)
            }
        }
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.gates.keys().map(String::as_str)
    }
}
