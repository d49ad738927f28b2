use log::{info, warn, error, debug, trace, LevelFilter};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, GatewayError};

/// Structured logging context for the gateway
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_network(self, network: &str) -> Self {
        self.with_metadata("network", json!(network))
    }

    pub fn with_block_index(self, index: i64) -> Self {
        self.with_metadata("block_index", json!(index))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_error_code(self, error_code: i32) -> Self {
        self.with_metadata("error_code", json!(error_code))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let mut log_entry = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

/// Times one operation and logs its outcome
pub struct PerformanceMonitor {
    start_time: Instant,
    operation: String,
    metadata: HashMap<String, Value>,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            start_time: Instant::now(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    fn context(self) -> (LogContext, u64) {
        let duration = self.start_time.elapsed().as_millis() as u64;
        let mut context = LogContext::new("performance", &self.operation)
            .with_duration_ms(duration);
        for (key, value) in self.metadata {
            context = context.with_metadata(&key, value);
        }
        (context, duration)
    }

    pub fn finish(self) -> u64 {
        let (context, duration) = self.context();
        context.debug(&format!("Operation completed in {}ms", duration));
        duration
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: std::fmt::Display,
    {
        let (context, duration) = self.context();
        match result {
            Ok(_) => {
                context.debug(&format!("Operation completed successfully in {}ms", duration));
            }
            Err(e) => {
                context
                    .with_metadata("error", json!(e.to_string()))
                    .warn(&format!("Operation failed after {}ms: {}", duration, e));
            }
        }
        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &GatewayError, context: Option<LogContext>) {
        let severity = error.severity();
        let kind = error.kind();

        let log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_error_code(kind.code())
            .with_metadata("error_kind", json!(format!("{:?}", kind)))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("retriable", json!(kind.retriable()));

        let message = format!("Error occurred: {}", error);

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium => log_context.warn(&message),
            ErrorSeverity::Low => log_context.info(&message),
        }
    }
}

/// Gateway metrics, emitted as structured log lines
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_upstream_call(endpoint: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "upstream_call")
            .with_metadata("endpoint", json!(endpoint))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.debug(&format!("Upstream call {} completed in {}ms", endpoint, duration_ms));
        } else {
            context.warn(&format!("Upstream call {} failed after {}ms", endpoint, duration_ms));
        }
    }

    pub fn log_block_assembled(network: &str, block_index: i64, transaction_count: usize, operation_count: usize) {
        let context = LogContext::new("metrics", "block_assembled")
            .with_network(network)
            .with_block_index(block_index)
            .with_metadata("transaction_count", json!(transaction_count))
            .with_metadata("operation_count", json!(operation_count));

        context.info(&format!(
            "Block {} assembled with {} token transactions",
            block_index, transaction_count
        ));
    }

    pub fn log_construction(endpoint: &str, network: &str, signed: Option<bool>) {
        let mut context = LogContext::new("metrics", "construction")
            .with_metadata("endpoint", json!(endpoint))
            .with_network(network);
        if let Some(signed) = signed {
            context = context.with_metadata("signed", json!(signed));
        }

        context.debug(&format!("Construction {} served", endpoint));
    }
}

fn level_filter(level: &str) -> LevelFilter {
    match level {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize structured logging. `RUST_LOG` still refines the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pretty = config.format == "pretty";

    env_logger::Builder::new()
        .filter_level(level_filter(&config.level))
        .parse_default_env()
        .format(move |buf, record| {
            use std::io::Write;

            let line = record.args().to_string();
            match serde_json::from_str::<Value>(&line) {
                Ok(json_value) if pretty => writeln!(buf, "{}", serde_json::to_string_pretty(&json_value)?),
                Ok(_) => writeln!(buf, "{}", line),
                Err(_) if pretty => writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    line
                ),
                Err(_) => writeln!(
                    buf,
                    "{}",
                    json!({
                        "timestamp": chrono::Utc::now().to_rfc3339(),
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "message": line,
                    })
                ),
            }
        })
        .try_init()?;

    info!("Structured logging initialized");
    Ok(())
}
