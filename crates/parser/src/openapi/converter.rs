//! Converts an OpenAPI 3.x document to the proxy model

use super::types::OpenApiDocument;
use crate::transform::{assemble, ProxyParts, PLACEHOLDER_TARGET_URL};
use spec2proxy_common::{ApiProxy, HttpTargetConnection, Result, SslInfo};
use tracing::warn;
use url::{ParseError, Url};

/// Convert an OpenAPI 3.x document to a proxy with one proxy and one target endpoint
pub fn convert_openapi_to_proxy(doc: &OpenApiDocument) -> Result<ApiProxy> {
    let (base_path, connection) = server_endpoints(doc.first_server_url());

    assemble(ProxyParts {
        info: &doc.info,
        root_extensions: &doc.extensions,
        paths: &doc.paths,
        security: &doc.security,
        base_path,
        connection,
    })
}

/// Base path and backend connection derived from the first server URL.
///
/// Never fails: a missing or unusable URL falls back to `/` and the
/// placeholder backend.
fn server_endpoints(server_url: Option<&str>) -> (String, HttpTargetConnection) {
    let Some(raw) = server_url else {
        return ("/".to_string(), placeholder_connection());
    };

    match Url::parse(raw) {
        Ok(url) => {
            let connection = HttpTargetConnection {
                url: raw.to_string(),
                ssl_info: SslInfo::for_scheme(Some(url.scheme())),
                properties: Vec::new(),
            };
            (non_empty_path(url.path()), connection)
        }
        Err(ParseError::RelativeUrlWithoutBase) => {
            let base_path = Url::parse(PLACEHOLDER_TARGET_URL)
                .and_then(|base| base.join(raw))
                .map(|joined| non_empty_path(joined.path()))
                .unwrap_or_else(|e| {
                    warn!("Ignoring relative server URL '{}': {}", raw, e);
                    "/".to_string()
                });
            (base_path, placeholder_connection())
        }
        Err(e) => {
            warn!(
                "Server URL '{}' could not be parsed ({}), using {}",
                raw, e, PLACEHOLDER_TARGET_URL
            );
            ("/".to_string(), placeholder_connection())
        }
    }
}

fn placeholder_connection() -> HttpTargetConnection {
    HttpTargetConnection {
        url: PLACEHOLDER_TARGET_URL.to_string(),
        ssl_info: SslInfo::for_scheme(Some("https")),
        properties: Vec::new(),
    }
}

fn non_empty_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_server_url() {
        let (base_path, connection) = server_endpoints(Some("https://api.example.com/v1"));
        assert_eq!(base_path, "/v1");
        assert_eq!(connection.url, "https://api.example.com/v1");
        assert!(connection.ssl_info.enabled);
    }

    #[test]
    fn test_http_server_disables_tls() {
        let (base_path, connection) = server_endpoints(Some("http://localhost:8080"));
        assert_eq!(base_path, "/");
        assert!(!connection.ssl_info.enabled);
        assert!(!connection.ssl_info.ignore_validation_errors);
    }

    #[test]
    fn test_relative_server_url_keeps_path_only() {
        let (base_path, connection) = server_endpoints(Some("/v2/store"));
        assert_eq!(base_path, "/v2/store");
        assert_eq!(connection.url, PLACEHOLDER_TARGET_URL);
        assert!(connection.ssl_info.enabled);
    }

    #[test]
    fn test_unparsable_server_url_degrades() {
        let (base_path, connection) = server_endpoints(Some("https://exa mple.com/v1"));
        assert_eq!(base_path, "/");
        assert_eq!(connection.url, PLACEHOLDER_TARGET_URL);
    }

    #[test]
    fn test_no_server() {
        let (base_path, connection) = server_endpoints(None);
        assert_eq!(base_path, "/");
        assert_eq!(connection.url, PLACEHOLDER_TARGET_URL);
        assert!(connection.ssl_info.enabled);
    }
}
