//! Swagger 2.0 type definitions

use crate::types::{Info, Paths, SpecExtensions};
use serde::Deserialize;
use spec2proxy_common::SecurityRequirement;

/// Swagger document root
#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerDocument {
    /// Always "2.0" once loaded
    pub swagger: String,

    pub info: Info,

    /// Backend host, optionally with a port
    #[serde(default)]
    pub host: Option<String>,

    #[serde(rename = "basePath")]
    #[serde(default)]
    pub base_path: Option<String>,

    /// Transfer protocols, first one wins
    #[serde(default)]
    pub schemes: Vec<String>,

    #[serde(default)]
    pub paths: Paths,

    #[serde(default)]
    pub security: Vec<SecurityRequirement>,

    #[serde(flatten)]
    pub extensions: SpecExtensions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_swagger_document() {
        let doc: SwaggerDocument = serde_yaml::from_str(
            r#"
swagger: "2.0"
info:
  title: Legacy Orders
  version: "1"
host: orders.example.com
basePath: /api
schemes: [http, https]
paths:
  /orders:
    get:
      operationId: listOrders
"#,
        )
        .unwrap();

        assert_eq!(doc.host.as_deref(), Some("orders.example.com"));
        assert_eq!(doc.base_path.as_deref(), Some("/api"));
        assert_eq!(doc.schemes, vec!["http", "https"]);
        assert_eq!(doc.paths.items.len(), 1);
    }
}
