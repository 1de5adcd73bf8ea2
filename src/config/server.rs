//! Server and request-surface configuration types.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::store::DEFAULT_LIST_LIMIT;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Listing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Page size when a request carries no `limit`.
    pub default_limit: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIST_LIMIT,
        }
    }
}
