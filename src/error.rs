use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::construction::{CodecError, MatchError};
use crate::blockchain::LogDecodeError;

/// Main error type for the gateway. Every request either succeeds or lands in exactly
/// one of these kinds.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unclear intent: {0}")]
    UnclearIntent(String),

    #[error("Upstream client error: {0}")]
    Client(#[from] ClientError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Client-input faults. Never retried.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Block index is required when a block identifier is given")]
    MissingBlockIndex,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Operations do not match the transfer shape: {0}")]
    OperationMismatch(MatchError),

    #[error("Invalid transaction: {0}")]
    Transaction(CodecError),

    #[error("Invalid transfer log: {0}")]
    TransferLog(#[from] LogDecodeError),

    #[error("Invalid upstream result: {0}")]
    UpstreamResult(String),
}

/// Failures talking to the upstream node service.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("upstream returned error {}: {}", .0.code, .0.message)]
    Upstream(ErrorBody),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Error object returned on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub retriable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// The error kinds a caller can observe, each with a stable numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    ClientError,
    Internal,
    UnclearIntent,
    Unimplemented,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Validation,
        ErrorKind::ClientError,
        ErrorKind::Internal,
        ErrorKind::UnclearIntent,
        ErrorKind::Unimplemented,
    ];

    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::Validation => 1,
            ErrorKind::ClientError => 2,
            ErrorKind::Internal => 3,
            ErrorKind::UnclearIntent => 4,
            ErrorKind::Unimplemented => 5,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation error",
            ErrorKind::ClientError => "Upstream client error",
            ErrorKind::Internal => "Internal error",
            ErrorKind::UnclearIntent => "Unclear intent",
            ErrorKind::Unimplemented => "Endpoint not implemented",
        }
    }

    pub fn retriable(&self) -> bool {
        matches!(self, ErrorKind::ClientError)
    }

    /// Bare error object for this kind, as advertised by `/network/options`.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.message().to_string(),
            retriable: self.retriable(),
            details: None,
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Local bugs and broken configuration
    Critical,
    /// Upstream unavailable
    High,
    /// Upstream rejected the request
    Medium,
    /// Bad client input
    Low,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::UnclearIntent(_) => ErrorKind::UnclearIntent,
            GatewayError::Client(_) => ErrorKind::ClientError,
            GatewayError::Internal(_) | GatewayError::Config(_) => ErrorKind::Internal,
            GatewayError::Unimplemented(_) => ErrorKind::Unimplemented,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GatewayError::Internal(_) | GatewayError::Config(_) => ErrorSeverity::Critical,
            GatewayError::Client(ClientError::Upstream(_)) => ErrorSeverity::Medium,
            GatewayError::Client(_) => ErrorSeverity::High,
            GatewayError::Validation(_)
            | GatewayError::UnclearIntent(_)
            | GatewayError::Unimplemented(_) => ErrorSeverity::Low,
        }
    }

    /// Wire representation. Upstream error objects pass through unmodified and
    /// internal failures stay opaque.
    pub fn to_body(&self) -> ErrorBody {
        if let GatewayError::Client(ClientError::Upstream(body)) = self {
            return body.clone();
        }

        let mut body = self.kind().body();
        match self {
            GatewayError::Internal(_) | GatewayError::Config(_) => {}
            GatewayError::Client(_) => {
                body.details = Some(json!({ "error": self.to_string() }));
            }
            _ => {
                body.retriable = false;
                body.details = Some(json!({ "error": self.to_string() }));
            }
        }
        body
    }
}

impl From<MatchError> for GatewayError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Ambiguous { .. } => GatewayError::UnclearIntent(err.to_string()),
            other => GatewayError::Validation(ValidationError::OperationMismatch(other)),
        }
    }
}

impl From<CodecError> for GatewayError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Serialization(e) => GatewayError::Internal(format!("serialization failed: {}", e)),
            other => GatewayError::Validation(ValidationError::Transaction(other)),
        }
    }
}

impl From<LogDecodeError> for GatewayError {
    fn from(err: LogDecodeError) -> Self {
        GatewayError::Validation(ValidationError::TransferLog(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes_are_distinct() {
        let mut codes: Vec<i32> = ErrorKind::ALL.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn test_error_severity() {
        let critical = GatewayError::Internal("boom".to_string());
        assert_eq!(critical.severity(), ErrorSeverity::Critical);

        let high = GatewayError::Client(ClientError::Timeout { seconds: 30 });
        assert_eq!(high.severity(), ErrorSeverity::High);

        let low = GatewayError::Validation(ValidationError::InvalidAddress("0x123".to_string()));
        assert_eq!(low.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_upstream_error_passes_through_unmodified() {
        let upstream = ErrorBody {
            code: 14,
            message: "Block not found".to_string(),
            retriable: true,
            details: Some(json!({ "index": 12 })),
        };
        let error = GatewayError::Client(ClientError::Upstream(upstream.clone()));

        assert_eq!(error.kind(), ErrorKind::ClientError);
        assert_eq!(error.to_body(), upstream);
    }

    #[test]
    fn test_internal_error_is_opaque() {
        let error = GatewayError::Internal("secret detail".to_string());
        let body = error.to_body();

        assert_eq!(body.code, ErrorKind::Internal.code());
        assert!(body.details.is_none());
        assert!(!body.retriable);
    }

    #[test]
    fn test_validation_body_carries_description() {
        let error = GatewayError::Validation(ValidationError::UnknownNetwork("1234".to_string()));
        let body = error.to_body();

        assert_eq!(body.code, 1);
        assert_eq!(body.message, "Validation error");
        assert!(body.details.unwrap()["error"].as_str().unwrap().contains("1234"));
    }

    #[test]
    fn test_ambiguous_match_is_unclear_intent() {
        let error: GatewayError = MatchError::Ambiguous { role: 0, candidates: 2 }.into();
        assert_eq!(error.kind(), ErrorKind::UnclearIntent);

        let error: GatewayError = MatchError::NotFound { role: 1 }.into();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_codec_serialization_failure_is_internal() {
        let json_error = serde_json::from_str::<u8>("not json").unwrap_err();
        let error: GatewayError = CodecError::Serialization(json_error).into();
        assert_eq!(error.kind(), ErrorKind::Internal);

        let error: GatewayError = CodecError::UnrecognizedMethod.into();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_error_body_serialization_omits_empty_details() {
        let body = ErrorKind::Unimplemented.body();
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"code":5,"message":"Endpoint not implemented","retriable":false}"#);
    }
}
