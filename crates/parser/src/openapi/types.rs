//! OpenAPI 3.x type definitions
//!
//! Simplified representation focusing on proxy generation. Schemas and
//! components are kept as raw values.

use crate::types::{Info, Paths, SpecExtensions};
use serde::Deserialize;
use serde_yaml::Value;
use spec2proxy_common::SecurityRequirement;

/// OpenAPI document root
#[derive(Debug, Clone, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version (e.g., "3.0.3")
    pub openapi: String,

    /// API metadata
    pub info: Info,

    /// Servers, first one wins
    #[serde(default)]
    pub servers: Vec<Server>,

    /// API paths (endpoints)
    #[serde(default)]
    pub paths: Paths,

    /// Reusable components
    #[serde(default)]
    pub components: Option<Value>,

    /// Top-level security requirements
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,

    #[serde(flatten)]
    pub extensions: SpecExtensions,
}

/// Server information
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    /// Server URL, absolute or relative
    pub url: String,

    /// Server description
    #[serde(default)]
    pub description: Option<String>,
}

impl OpenApiDocument {
    /// URL of the first server, if any
    pub fn first_server_url(&self) -> Option<&str> {
        self.servers.first().map(|s| s.url.as_str())
    }
}
