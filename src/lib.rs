pub mod api;
pub mod blockchain;
pub mod config;
pub mod construction;
pub mod error;
pub mod logging;
pub mod models;
pub mod token;

pub use blockchain::{AccountService, BlockAssembler, ChainClient, LogEventParser, RosettaClient};
pub use construction::{match_operations, ConstructionService, OperationShape, TransactionCodec};
pub use error::{ErrorKind, GatewayError, Result};
pub use logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
pub use config::{AppConfig, LoggingConfig, NetworkConfig, ServerConfig, TokenConfig, UpstreamConfig};
pub use token::{ActivationGate, TokenRegistry};
