use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    error_handling::HandleErrorLayer,
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{post, MethodRouter},
    BoxError, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::cors::CorsLayer;

use crate::blockchain::{AccountService, BlockAssembler, ChainClient};
use crate::config::ServerConfig;
use crate::construction::ConstructionService;
use crate::error::{ClientError, GatewayError, ValidationError};
use crate::logging::{ErrorLogger, LogContext};
use crate::models::{
    AccountBalanceRequest, AccountBalanceResponse, BlockRequest, BlockResponse, BlockTransactionRequest,
    BlockTransactionResponse, ConstructionParseRequest, ConstructionParseResponse, ConstructionPayloadsRequest,
    ConstructionPayloadsResponse, ConstructionPreprocessRequest, ConstructionPreprocessResponse,
};
use crate::token::TokenRegistry;

use super::passthrough::{override_network_options, Passthrough, PassthroughEndpoint};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Malformed request: {0}")]
    Rejection(#[from] JsonRejection),
    #[error("Server error: {0}")]
    Server(String),
}

impl ApiError {
    fn into_gateway(self) -> GatewayError {
        match self {
            ApiError::Gateway(error) => error,
            ApiError::Rejection(rejection) => {
                GatewayError::Validation(ValidationError::InvalidRequest(rejection.body_text()))
            }
            ApiError::Server(message) => GatewayError::Internal(message),
        }
    }
}

// Rosetta clients expect every failure as a 500 carrying the error object.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.into_gateway();
        ErrorLogger::log_error(&error, Some(LogContext::new("api", "respond")));
        (StatusCode::INTERNAL_SERVER_ERROR, Json(error.to_body())).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub assembler: Arc<BlockAssembler>,
    pub construction: Arc<ConstructionService>,
    pub accounts: Arc<AccountService>,
    pub passthrough: Arc<dyn Passthrough>,
}

impl AppState {
    pub fn new(
        client: Arc<dyn ChainClient>,
        passthrough: Arc<dyn Passthrough>,
        registry: Arc<TokenRegistry>,
    ) -> Self {
        Self {
            assembler: Arc::new(BlockAssembler::new(client.clone(), registry.clone())),
            construction: Arc::new(ConstructionService::new(registry.clone())),
            accounts: Arc::new(AccountService::new(client, registry)),
            passthrough,
        }
    }
}

pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let timeout_seconds = request_timeout.as_secs();
    Router::new()
        .route("/network/list", passthrough(PassthroughEndpoint::NetworkList))
        .route("/network/status", passthrough(PassthroughEndpoint::NetworkStatus))
        .route("/network/options", post(network_options))
        .route("/block", post(block))
        .route("/block/transaction", post(block_transaction))
        .route("/account/balance", post(account_balance))
        .route("/account/coins", unimplemented("/account/coins"))
        .route("/mempool", passthrough(PassthroughEndpoint::Mempool))
        .route("/mempool/transaction", passthrough(PassthroughEndpoint::MempoolTransaction))
        .route("/construction/derive", passthrough(PassthroughEndpoint::ConstructionDerive))
        .route("/construction/preprocess", post(construction_preprocess))
        .route("/construction/metadata", passthrough(PassthroughEndpoint::ConstructionMetadata))
        .route("/construction/payloads", post(construction_payloads))
        .route("/construction/combine", passthrough(PassthroughEndpoint::ConstructionCombine))
        .route("/construction/parse", post(construction_parse))
        .route("/construction/hash", passthrough(PassthroughEndpoint::ConstructionHash))
        .route("/construction/submit", passthrough(PassthroughEndpoint::ConstructionSubmit))
        .route("/events/blocks", unimplemented("/events/blocks"))
        .route("/search/transactions", unimplemented("/search/transactions"))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_requests))
                .layer(HandleErrorLayer::new(move |error: BoxError| async move {
                    middleware_error(error, timeout_seconds)
                }))
                .timeout(request_timeout)
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// HTTP API server
pub struct ApiServer {
    state: AppState,
    addr: String,
    request_timeout: Duration,
}

impl ApiServer {
    pub fn new(state: AppState, config: &ServerConfig) -> Self {
        Self {
            state,
            addr: format!("{}:{}", config.host, config.port),
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
        }
    }

    /// Serve until ctrl-c.
    pub async fn start(self) -> Result<(), ApiError> {
        let app = create_router(self.state, self.request_timeout);

        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| ApiError::Server(format!("Failed to bind to {}: {}", self.addr, e)))?;

        LogContext::new("api_server", "start")
            .with_metadata("addr", json!(self.addr))
            .with_metadata("request_timeout_seconds", json!(self.request_timeout.as_secs()))
            .info("HTTP API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Server(format!("Server error: {}", e)))?;

        log::info!("HTTP API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    log::info!("Shutdown signal received");
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    LogContext::new("http", "request")
        .with_metadata("method", json!(method.as_str()))
        .with_metadata("path", json!(path))
        .with_metadata("status", json!(response.status().as_u16()))
        .with_duration_ms(started.elapsed().as_millis() as u64)
        .debug("Handled request");
    response
}

/// A request that outlives the deadline is an upstream timeout, retriable like any client error.
fn middleware_error(error: BoxError, seconds: u64) -> ApiError {
    if error.is::<Elapsed>() {
        ApiError::Gateway(GatewayError::Client(ClientError::Timeout { seconds }))
    } else {
        ApiError::Server(error.to_string())
    }
}

fn passthrough(endpoint: PassthroughEndpoint) -> MethodRouter<AppState> {
    post(
        move |State(state): State<AppState>, payload: Result<Json<Value>, JsonRejection>| async move {
            let Json(body) = payload?;
            let response = state.passthrough.forward(endpoint, body).await?;
            Ok::<_, ApiError>(Json(response))
        },
    )
}

fn unimplemented(path: &'static str) -> MethodRouter<AppState> {
    post(move || async move { Err::<Json<Value>, _>(ApiError::from(GatewayError::Unimplemented(path.to_string()))) })
}

/// POST /network/options - upstream options with this gateway's allow section
pub async fn network_options(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    let options = state
        .passthrough
        .forward(PassthroughEndpoint::NetworkOptions, body)
        .await?;
    Ok(Json(override_network_options(options)))
}

/// POST /block
pub async fn block(
    State(state): State<AppState>,
    payload: Result<Json<BlockRequest>, JsonRejection>,
) -> ApiResult<BlockResponse> {
    let Json(request) = payload?;
    Ok(Json(state.assembler.block(&request).await?))
}

/// POST /block/transaction
pub async fn block_transaction(
    State(state): State<AppState>,
    payload: Result<Json<BlockTransactionRequest>, JsonRejection>,
) -> ApiResult<BlockTransactionResponse> {
    let Json(request) = payload?;
    Ok(Json(state.assembler.block_transaction(&request).await?))
}

/// POST /account/balance
pub async fn account_balance(
    State(state): State<AppState>,
    payload: Result<Json<AccountBalanceRequest>, JsonRejection>,
) -> ApiResult<AccountBalanceResponse> {
    let Json(request) = payload?;
    Ok(Json(state.accounts.balance(&request).await?))
}

pub async fn construction_preprocess(
    State(state): State<AppState>,
    payload: Result<Json<ConstructionPreprocessRequest>, JsonRejection>,
) -> ApiResult<ConstructionPreprocessResponse> {
    let Json(request) = payload?;
    Ok(Json(state.construction.preprocess(&request)?))
}

pub async fn construction_payloads(
    State(state): State<AppState>,
    payload: Result<Json<ConstructionPayloadsRequest>, JsonRejection>,
) -> ApiResult<ConstructionPayloadsResponse> {
    let Json(request) = payload?;
    Ok(Json(state.construction.payloads(&request)?))
}

pub async fn construction_parse(
    State(state): State<AppState>,
    payload: Result<Json<ConstructionParseRequest>, JsonRejection>,
) -> ApiResult<ConstructionParseResponse> {
    let Json(request) = payload?;
    Ok(Json(state.construction.parse(&request)?))
}
