//! # Server Configuration
//!
//! Router assembly and startup for the internal Salt Edge proxy.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;
use crate::telemetry;
use crate::upstream::{UpstreamApi, UpstreamClient};

/// Prefix every proxied route lives under
pub const API_PREFIX: &str = "/api/saltedge";

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub upstream: Arc<dyn UpstreamApi>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, upstream: Arc<dyn UpstreamApi>) -> Self {
        Self { config, upstream }
    }

    /// State backed by the real adapter described by `config`
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, crate::config::ConfigError> {
        let upstream = UpstreamClient::from_config(&config)?;
        Ok(Self::new(config, Arc::new(upstream)))
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route("/connect", post(handlers::connect::create_connect_session))
        .route("/accounts", get(handlers::accounts::list_accounts))
        .route("/connections", get(handlers::connections::list_connections))
        .route("/transactions", get(handlers::transactions::list_transactions))
        .route("/status", get(handlers::status::get_status))
        .route(
            "/{*path}",
            get(handlers::passthrough::forward_get).post(handlers::passthrough::forward_post),
        )
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest(API_PREFIX, api_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(telemetry::trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Starts the server with the given configuration and serves until `shutdown` fires
pub async fn run_server(
    config: AppConfig,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let config = Arc::new(config);
    let state = AppState::from_config(config.clone())?;
    if !state.upstream.has_credentials() {
        tracing::warn!("Salt Edge credentials are not configured; upstream calls will fail");
    }
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %listener.local_addr()?,
        profile = %config.profile,
        api_version = %config.saltedge_api_version,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::create_customer,
        crate::handlers::connect::create_connect_session,
        crate::handlers::accounts::list_accounts,
        crate::handlers::connections::list_connections,
        crate::handlers::transactions::list_transactions,
        crate::handlers::status::get_status,
        crate::handlers::passthrough::forward_get,
        crate::handlers::passthrough::forward_post,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::Customer,
            crate::models::CustomerList,
            crate::models::CustomerEnvelope,
            crate::models::Account,
            crate::models::AccountExtra,
            crate::models::AccountList,
            crate::models::Connection,
            crate::models::ConnectionState,
            crate::models::ConnectionList,
            crate::models::Transaction,
            crate::models::TransactionList,
            crate::models::ConnectSession,
            crate::models::ConnectSessionEnvelope,
            crate::models::StatusReport,
            crate::handlers::HealthResponse,
            crate::handlers::customers::CreateCustomerRequest,
            crate::handlers::connect::ConnectRequest,
            crate::error::ApiError,
        )
    ),
    tags(
        (name = "root", description = "Service information"),
        (name = "customers", description = "Salt Edge customers"),
        (name = "connect", description = "Bank-linking sessions"),
        (name = "accounts", description = "Linked accounts"),
        (name = "connections", description = "Bank connections"),
        (name = "transactions", description = "Account transactions"),
        (name = "status", description = "Credential status"),
        (name = "passthrough", description = "Any other Salt Edge path"),
    ),
    info(
        title = "VerifyGlobal Salt Edge Proxy",
        description = "Internal proxy that injects Salt Edge service credentials server-side",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
