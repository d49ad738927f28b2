use async_trait::async_trait;
use serde_json::{json, Value};

use crate::blockchain::RosettaClient;
use crate::error::{ErrorKind, Result};
use crate::models::{OperationStatus, OperationType};

pub const MIDDLEWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Endpoints relayed verbatim to the core service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughEndpoint {
    NetworkList,
    NetworkStatus,
    NetworkOptions,
    Mempool,
    MempoolTransaction,
    ConstructionDerive,
    ConstructionMetadata,
    ConstructionCombine,
    ConstructionHash,
    ConstructionSubmit,
}

impl PassthroughEndpoint {
    pub const ALL: [PassthroughEndpoint; 10] = [
        PassthroughEndpoint::NetworkList,
        PassthroughEndpoint::NetworkStatus,
        PassthroughEndpoint::NetworkOptions,
        PassthroughEndpoint::Mempool,
        PassthroughEndpoint::MempoolTransaction,
        PassthroughEndpoint::ConstructionDerive,
        PassthroughEndpoint::ConstructionMetadata,
        PassthroughEndpoint::ConstructionCombine,
        PassthroughEndpoint::ConstructionHash,
        PassthroughEndpoint::ConstructionSubmit,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            PassthroughEndpoint::NetworkList => "/network/list",
            PassthroughEndpoint::NetworkStatus => "/network/status",
            PassthroughEndpoint::NetworkOptions => "/network/options",
            PassthroughEndpoint::Mempool => "/mempool",
            PassthroughEndpoint::MempoolTransaction => "/mempool/transaction",
            PassthroughEndpoint::ConstructionDerive => "/construction/derive",
            PassthroughEndpoint::ConstructionMetadata => "/construction/metadata",
            PassthroughEndpoint::ConstructionCombine => "/construction/combine",
            PassthroughEndpoint::ConstructionHash => "/construction/hash",
            PassthroughEndpoint::ConstructionSubmit => "/construction/submit",
        }
    }
}

/// Delegation to the core service for endpoints the gateway does not interpret.
#[async_trait]
pub trait Passthrough: Send + Sync {
    async fn forward(&self, endpoint: PassthroughEndpoint, body: Value) -> Result<Value>;
}

#[async_trait]
impl Passthrough for RosettaClient {
    async fn forward(&self, endpoint: PassthroughEndpoint, body: Value) -> Result<Value> {
        self.relay(endpoint.path(), &body).await
    }
}

/// Replace the upstream `allow` section and middleware version with the gateway's own.
pub fn override_network_options(mut options: Value) -> Value {
    let statuses: Vec<Value> = OperationStatus::ALL
        .iter()
        .map(|status| json!({ "status": status.as_str(), "successful": status.successful() }))
        .collect();
    let types: Vec<&str> = OperationType::ALL.iter().map(OperationType::as_str).collect();
    let errors: Vec<Value> = ErrorKind::ALL
        .iter()
        .map(|kind| json!(kind.body()))
        .collect();

    let Some(object) = options.as_object_mut() else {
        return options;
    };

    let version = object.entry("version").or_insert_with(|| json!({}));
    if let Some(version) = version.as_object_mut() {
        version.insert("middleware_version".to_string(), json!(MIDDLEWARE_VERSION));
    }

    object.insert(
        "allow".to_string(),
        json!({
            "operation_statuses": statuses,
            "operation_types": types,
            "errors": errors,
            "historical_balance_lookup": true,
        }),
    );
    options
}
