//! itemstream-api: item CRUD over HTTP
//!
//! ## Architecture
//! ```text
//! [HTTP client] --> [itemstream-api] --> [table] --(change feed)--> [itemstream-processor]
//! ```
//!
//! ## Configuration
//! - ITEMSTREAM_CONFIG: YAML config file (optional)
//! - ITEMSTREAM__SERVER__PORT: listen port (default: 3000)
//! - DYNAMODB_TABLE: DynamoDB table name (selects the `dynamo` backend)
//! - ITEMSTREAM_LOG / LOG_LEVEL: log filter

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use itemstream::api::{ApiRequest, ApiResponse, ItemsApi};
use itemstream::config::Config;
use itemstream::storage::init_storage;
use itemstream::store::EntityStore;
use itemstream::utils::bootstrap::init_tracing;
use itemstream::utils::clock::SystemClock;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;
    let table = init_storage(&config.storage).await?;
    let store = EntityStore::new(table, Arc::new(SystemClock))
        .with_default_limit(config.list.default_limit);
    let api = Arc::new(ItemsApi::new(
        store,
        config.environment.clone(),
        config.api_version.clone(),
    ));

    let app = Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(api);

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        environment = %config.environment,
        "itemstream-api started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn handle(
    State(api): State<Arc<ItemsApi>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let mut request = ApiRequest::new(method.as_str(), uri.path());
    request.query_parameters = query;
    if !body.is_empty() {
        request.body = Some(body);
    }

    into_http(api.handle(&request).await)
}

fn into_http(response: ApiResponse) -> Response {
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }

    (status, headers, Body::from(response.body.to_string())).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
