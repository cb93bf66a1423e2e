//! Spec model to proxy model transformation
//!
//! Both document versions share the flow-building rules below; only the way
//! the base path and the backend connection are derived differs.

use crate::spec_model::SpecModel;
use crate::types::{Info, Paths, SpecExtensions};
use regex::Regex;
use spec2proxy_common::{
    ApiProxy, ConditionalFlow, Extension, ExtensionMap, GeneratorError, HttpTargetConnection,
    ProxyEndpoint, Result, RouteRule, SecurityRequirement, TargetEndpoint, DEFAULT_ENDPOINT,
};
use std::sync::LazyLock;
use tracing::debug;

/// Backend used when the spec does not name a usable one
pub const PLACEHOLDER_TARGET_URL: &str = "https://mocktarget.apigee.net";

static PATH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("static regex should not panic"));

/// Build the proxy model for a spec model
pub fn transform(model: &SpecModel) -> Result<ApiProxy> {
    match model {
        SpecModel::OpenApi3(doc) => crate::openapi::convert_openapi_to_proxy(doc),
        SpecModel::Swagger2(doc) => crate::swagger::convert_swagger_to_proxy(doc),
    }
}

/// URL and filesystem safe slug; non-ASCII letters are transliterated
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// Replace every `{param}` segment of a path template with `*`
pub fn gateway_path(path: &str) -> String {
    PATH_PARAM.replace_all(path, "*").into_owned()
}

/// Gateway condition matching one path template and HTTP verb
pub fn flow_condition(path: &str, verb: &str) -> String {
    format!(
        "(proxy.pathsuffix MatchesPath \"{}\") and (request.verb = \"{}\")",
        gateway_path(path),
        verb.to_ascii_uppercase()
    )
}

/// Fold extension layers into one map, later layers overriding earlier ones
pub fn merge_extensions(layers: &[&SpecExtensions]) -> ExtensionMap {
    let mut merged = ExtensionMap::new();
    for layer in layers {
        for (name, value) in layer.iter() {
            merged.insert(name.clone(), Extension::new(name.clone(), value.clone()));
        }
    }
    merged
}

/// One conditional flow per (path, operation), in declaration order
pub(crate) fn build_flows(paths: &Paths) -> Vec<ConditionalFlow> {
    let mut flows = Vec::new();
    for (path, item) in &paths.items {
        for (verb, operation) in &item.operations {
            let name = match operation.operation_id.as_deref() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => slugify(&format!("{verb}-{path}")),
            };

            let mut flow = ConditionalFlow::new(name, flow_condition(path, verb));
            flow.description = operation
                .description
                .clone()
                .or_else(|| operation.summary.clone());
            flow.security = operation.security.clone().unwrap_or_default();
            flow.extensions = merge_extensions(&[&item.extensions, &operation.extensions]);

            debug!("Flow {} → {}", flow.name, flow.condition);
            flows.push(flow);
        }
    }
    flows
}

/// Everything the version-specific converters derive before assembly
pub(crate) struct ProxyParts<'a> {
    pub info: &'a Info,
    pub root_extensions: &'a SpecExtensions,
    pub paths: &'a Paths,
    pub security: &'a [SecurityRequirement],
    pub base_path: String,
    pub connection: HttpTargetConnection,
}

/// Assemble the single-endpoint proxy shared by every document version
pub(crate) fn assemble(parts: ProxyParts<'_>) -> Result<ApiProxy> {
    let name = slugify(&parts.info.title);
    if name.is_empty() {
        return Err(GeneratorError::Transform(format!(
            "cannot derive a proxy name from title '{}'",
            parts.info.title
        )));
    }

    let mut proxy = ApiProxy::new(name, parts.info.title.clone());
    proxy.description = parts.info.description.clone();
    proxy.extensions = merge_extensions(&[parts.root_extensions, &parts.info.extensions]);

    let mut endpoint = ProxyEndpoint::new(DEFAULT_ENDPOINT, parts.base_path);
    endpoint.flows = build_flows(parts.paths);
    endpoint.security = parts.security.to_vec();
    endpoint.extensions = merge_extensions(&[&parts.paths.extensions]);
    endpoint.route_rules.push(RouteRule {
        name: DEFAULT_ENDPOINT.to_string(),
        condition: "true".to_string(),
        target_endpoint: DEFAULT_ENDPOINT.to_string(),
    });

    debug!(
        "Proxy {} at {} with {} flows, target {}",
        proxy.name,
        endpoint.base_path,
        endpoint.flows.len(),
        parts.connection.url
    );

    proxy.proxy_endpoints.push(endpoint);
    proxy
        .target_endpoints
        .push(TargetEndpoint::new(DEFAULT_ENDPOINT, parts.connection));

    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Pet Store"), "pet-store");
        assert_eq!(slugify("  Hello, World!! API v2 "), "hello-world-api-v2");
        assert_eq!(slugify("get-/pets/{id}"), "get-pets-id");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_slugify_transliterates() {
        assert_eq!(slugify("Café Orders"), "cafe-orders");
        assert_eq!(slugify("Ünïcode"), "unicode");

        let cjk = slugify("宠物商店");
        assert!(!cjk.is_empty());
        assert!(cjk
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn test_gateway_path_replaces_any_param_name() {
        assert_eq!(gateway_path("/pets/{id}"), "/pets/*");
        assert_eq!(
            gateway_path("/users/{userId}/orders/{order_id}"),
            "/users/*/orders/*"
        );
        assert_eq!(gateway_path("/static"), "/static");
    }

    #[test]
    fn test_flow_condition() {
        assert_eq!(
            flow_condition("/pets/{id}", "get"),
            "(proxy.pathsuffix MatchesPath \"/pets/*\") and (request.verb = \"GET\")"
        );
    }

    #[test]
    fn test_merge_extensions_later_layer_wins() {
        let mut root = SpecExtensions::default();
        root.insert("x-owner", serde_yaml::Value::String("root".into()));
        root.insert("x-root-only", serde_yaml::Value::Bool(true));
        let mut info = SpecExtensions::default();
        info.insert("x-owner", serde_yaml::Value::String("info".into()));

        let merged = merge_extensions(&[&root, &info]);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged["x-owner"].value,
            serde_yaml::Value::String("info".into())
        );
    }
}
