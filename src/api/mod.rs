//! Inbound request surface.
//!
//! Maps `{method, path, pathParameters, queryParameters, body}` requests
//! onto [`EntityStore`] operations and renders `{statusCode, headers, body}`
//! responses. The HTTP binary adapts real requests into [`ApiRequest`].

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tracing::{debug, error, info};

use crate::store::{EntityStore, EntityType, ItemPatch, NewItem, StoreError};

/// Headers attached to every response.
pub const DEFAULT_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "application/json"),
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Headers",
        "Content-Type,X-Amz-Date,Authorization,X-Api-Key",
    ),
    ("Access-Control-Allow-Methods", "GET,POST,PUT,DELETE,OPTIONS"),
];

/// An inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    #[serde(alias = "httpMethod")]
    pub method: String,
    pub path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub path_parameters: HashMap<String, String>,
    #[serde(default, alias = "queryStringParameters", deserialize_with = "null_as_empty")]
    pub query_parameters: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A rendered response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: IndexMap<String, String>,
    pub body: Json,
}

impl ApiResponse {
    pub fn new(status_code: u16, body: Json) -> Self {
        let headers = DEFAULT_HEADERS
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// `{error, message}` body.
    pub fn error(status_code: u16, error: &str, message: impl Into<String>) -> Self {
        Self::new(
            status_code,
            json!({"error": error, "message": message.into()}),
        )
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::error(400, "Bad request", message)
    }
}

impl From<StoreError> for ApiResponse {
    fn from(err: StoreError) -> Self {
        if err.is_client_error() {
            info!(error = %err, "Request rejected");
        } else {
            error!(error = %err, "Request failed");
        }
        ApiResponse::error(err.status_code(), err.error_label(), err.to_string())
    }
}

/// Resolved route of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    ListItems,
    CreateItem,
    GetItem(String),
    UpdateItem(String),
    DeleteItem(String),
    NotFound,
}

impl Route {
    pub fn resolve(request: &ApiRequest) -> Self {
        let method = request.method.to_ascii_uppercase();
        let path = request.path.as_str();

        match (method.as_str(), path) {
            ("GET", "/health") => Route::Health,
            ("GET", "/items") => Route::ListItems,
            ("POST", "/items") => Route::CreateItem,
            (method, path) if path.starts_with("/items/") => {
                let id = request
                    .path_parameters
                    .get("id")
                    .cloned()
                    .unwrap_or_else(|| path["/items/".len()..].to_string());
                match method {
                    "GET" => Route::GetItem(id),
                    "PUT" => Route::UpdateItem(id),
                    "DELETE" => Route::DeleteItem(id),
                    _ => Route::NotFound,
                }
            }
            _ => Route::NotFound,
        }
    }
}

/// Item endpoints over an entity store.
#[derive(Debug, Clone)]
pub struct ItemsApi {
    store: EntityStore,
    environment: String,
    version: String,
}

impl ItemsApi {
    pub fn new(store: EntityStore, environment: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            store,
            environment: environment.into(),
            version: version.into(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub async fn handle(&self, request: &ApiRequest) -> ApiResponse {
        debug!(method = %request.method, path = %request.path, "Received request");

        let result = match Route::resolve(request) {
            Route::Health => return self.health().await,
            Route::ListItems => self.list(request).await,
            Route::CreateItem => self.create(request).await,
            Route::GetItem(id) => self.get(&id).await,
            Route::UpdateItem(id) => self.update(&id, request).await,
            Route::DeleteItem(id) => self.delete(&id).await,
            Route::NotFound => {
                return ApiResponse::error(
                    404,
                    "Not found",
                    format!("Route not found: {} {}", request.method, request.path),
                )
            }
        };

        result.unwrap_or_else(|response| response)
    }

    async fn health(&self) -> ApiResponse {
        match self.store.table().health().await {
            Ok(()) => ApiResponse::new(
                200,
                json!({
                    "status": "healthy",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "environment": self.environment,
                    "version": self.version,
                }),
            ),
            Err(e) => {
                error!(error = %e, "Health check failed");
                ApiResponse::new(503, json!({"status": "unhealthy", "error": e.to_string()}))
            }
        }
    }

    async fn list(&self, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        let limit = match request.query_parameters.get("limit") {
            None => None,
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                ApiResponse::bad_request(format!("limit must be a positive integer, got {raw:?}"))
            })?),
        };

        let listing = self.store.list(EntityType::Item, limit).await?;
        info!(count = listing.count, "Retrieved items");
        Ok(ApiResponse::new(200, json!({"items": listing.items, "count": listing.count})))
    }

    async fn get(&self, id: &str) -> Result<ApiResponse, ApiResponse> {
        let item = self.store.get(id).await?;
        Ok(ApiResponse::new(200, json!({ "item": item })))
    }

    async fn create(&self, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        let fields: NewItem = parse_body(request)?;
        let item = self.store.create(fields).await?;
        Ok(ApiResponse::new(
            201,
            json!({"message": "Item created successfully", "item": item}),
        ))
    }

    async fn update(&self, id: &str, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        let patch: ItemPatch = parse_body(request)?;
        let item = self.store.update(id, patch).await?;
        Ok(ApiResponse::new(
            200,
            json!({"message": "Item updated successfully", "item": item}),
        ))
    }

    async fn delete(&self, id: &str) -> Result<ApiResponse, ApiResponse> {
        self.store.delete(id).await?;
        Ok(ApiResponse::new(
            200,
            json!({"message": "Item deleted successfully"}),
        ))
    }
}

/// Parse a JSON object body; a missing body reads as `{}`.
fn parse_body<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> Result<T, ApiResponse> {
    let raw = request.body.as_deref().unwrap_or("{}");
    let value: Json = serde_json::from_str(raw).map_err(|_| ApiResponse::bad_request("Invalid JSON"))?;
    if !value.is_object() {
        return Err(ApiResponse::bad_request("Request body must be a JSON object"));
    }
    serde_json::from_value(value).map_err(|e| ApiResponse::bad_request(e.to_string()))
}
