//! Converts a Swagger 2.0 document to the proxy model

use super::types::SwaggerDocument;
use crate::transform::{assemble, ProxyParts};
use spec2proxy_common::{ApiProxy, HttpTargetConnection, Result, SslInfo};

const DEFAULT_HOST: &str = "mocktarget.apigee.net";
const DEFAULT_SCHEME: &str = "https";

/// Convert a Swagger 2.0 document to a proxy with one proxy and one target endpoint
pub fn convert_swagger_to_proxy(doc: &SwaggerDocument) -> Result<ApiProxy> {
    let scheme = doc
        .schemes
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_SCHEME);
    let host = doc.host.as_deref().unwrap_or(DEFAULT_HOST);
    let base_path = doc.base_path.as_deref().unwrap_or_default();

    let connection = HttpTargetConnection {
        url: format!("{scheme}://{host}{base_path}"),
        ssl_info: SslInfo::for_scheme(Some(scheme)),
        properties: Vec::new(),
    };

    assemble(ProxyParts {
        info: &doc.info,
        root_extensions: &doc.extensions,
        paths: &doc.paths,
        security: &doc.security,
        base_path: if base_path.is_empty() {
            "/".to_string()
        } else {
            base_path.to_string()
        },
        connection,
    })
}
