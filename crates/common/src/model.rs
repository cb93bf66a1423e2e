//! Gateway proxy model
//!
//! The intermediate representation produced by the transformation engine,
//! rewritten by proxy-model plugins and consumed by the bundle generator.

use crate::policy::Policy;
use crate::{GeneratorError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name given to the single proxy and target endpoint built from a spec
pub const DEFAULT_ENDPOINT: &str = "default";

/// One security requirement object, passed through verbatim from the spec
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Extensions keyed by name
pub type ExtensionMap = BTreeMap<String, Extension>;

/// A vendor extension (`x-...`) carried over from the spec
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extension {
    pub name: String,
    pub value: serde_yaml::Value,
}

impl Extension {
    pub fn new(name: impl Into<String>, value: serde_yaml::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Root of the gateway proxy model
#[derive(Debug, Clone, Serialize)]
pub struct ApiProxy {
    /// URL and filesystem safe identifier
    pub name: String,

    pub display_name: String,

    pub description: Option<String>,

    /// Milliseconds since the Unix epoch
    pub created_at: i64,

    /// Milliseconds since the Unix epoch
    pub last_modified: i64,

    #[serde(skip)]
    pub policies: Vec<Policy>,

    pub proxy_endpoints: Vec<ProxyEndpoint>,

    pub target_endpoints: Vec<TargetEndpoint>,

    pub resources: Vec<Resource>,

    #[serde(skip)]
    pub extensions: ExtensionMap,
}

impl ApiProxy {
    /// Create an empty proxy; both timestamps are set to the current time
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: None,
            created_at: now,
            last_modified: now,
            policies: Vec::new(),
            proxy_endpoints: Vec::new(),
            target_endpoints: Vec::new(),
            resources: Vec::new(),
            extensions: ExtensionMap::new(),
        }
    }

    /// Append a policy, keeping policy names non-empty and unique
    pub fn add_policy(&mut self, policy: Policy) -> Result<()> {
        if policy.name().is_empty() {
            return Err(GeneratorError::Generation(
                "policy name must not be empty".to_string(),
            ));
        }
        if self.policy(policy.name()).is_some() {
            return Err(GeneratorError::DuplicatePolicy(policy.name().to_string()));
        }
        self.policies.push(policy);
        Ok(())
    }

    /// Look a policy up by name
    pub fn policy(&self, name: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name() == name)
    }

    /// Check the model invariants that plugins may have broken
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(GeneratorError::Generation(
                "proxy name must not be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for policy in &self.policies {
            if policy.name().is_empty() {
                return Err(GeneratorError::Generation(
                    "policy name must not be empty".to_string(),
                ));
            }
            if !seen.insert(policy.name()) {
                return Err(GeneratorError::DuplicatePolicy(policy.name().to_string()));
            }
        }

        Ok(())
    }

    /// The first proxy endpoint, which receives extension-driven flows
    pub fn default_proxy_endpoint_mut(&mut self) -> Option<&mut ProxyEndpoint> {
        self.proxy_endpoints.first_mut()
    }
}

/// Inbound side of the proxy
#[derive(Debug, Clone, Serialize)]
pub struct ProxyEndpoint {
    pub name: String,
    pub base_path: String,
    pub pre_flow: UnconditionalFlow,
    pub flows: Vec<ConditionalFlow>,
    pub post_flow: UnconditionalFlow,
    pub route_rules: Vec<RouteRule>,
    pub security: Vec<SecurityRequirement>,
    #[serde(skip)]
    pub extensions: ExtensionMap,
}

impl ProxyEndpoint {
    pub fn new(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            pre_flow: UnconditionalFlow::pre_flow(),
            flows: Vec::new(),
            post_flow: UnconditionalFlow::post_flow(),
            route_rules: Vec::new(),
            security: Vec::new(),
            extensions: ExtensionMap::new(),
        }
    }
}

/// Outbound side of the proxy
#[derive(Debug, Clone, Serialize)]
pub struct TargetEndpoint {
    pub name: String,
    pub description: Option<String>,
    pub pre_flow: UnconditionalFlow,
    pub flows: Vec<ConditionalFlow>,
    pub post_flow: UnconditionalFlow,
    pub connection: HttpTargetConnection,
    #[serde(skip)]
    pub extensions: ExtensionMap,
}

impl TargetEndpoint {
    pub fn new(name: impl Into<String>, connection: HttpTargetConnection) -> Self {
        Self {
            name: name.into(),
            description: None,
            pre_flow: UnconditionalFlow::pre_flow(),
            flows: Vec::new(),
            post_flow: UnconditionalFlow::post_flow(),
            connection,
            extensions: ExtensionMap::new(),
        }
    }
}

/// HTTP connection to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpTargetConnection {
    pub url: String,
    pub ssl_info: SslInfo,
    pub properties: Vec<Property>,
}

/// TLS settings of a target connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SslInfo {
    pub enabled: bool,
    pub enforce: bool,
    pub client_auth_enabled: bool,
    pub ignore_validation_errors: bool,
    pub key_store: Option<String>,
    pub key_alias: Option<String>,
    pub trust_store: Option<String>,
}

impl SslInfo {
    /// TLS settings for a backend reached with the given URL scheme.
    ///
    /// Only plain `http` disables TLS. Everything else, including an unknown
    /// scheme, gets TLS without certificate validation or mutual auth.
    pub fn for_scheme(scheme: Option<&str>) -> Self {
        if scheme == Some("http") {
            return Self::default();
        }
        Self {
            enabled: true,
            enforce: false,
            client_auth_enabled: false,
            ignore_validation_errors: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// Links a proxy endpoint to a target endpoint by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRule {
    pub name: String,
    pub condition: String,
    pub target_endpoint: String,
}

/// A flow gated by a condition evaluated by the gateway
#[derive(Debug, Clone, Serialize)]
pub struct ConditionalFlow {
    pub name: String,
    pub description: Option<String>,
    pub condition: String,
    pub request: Vec<Step>,
    pub response: Vec<Step>,
    pub security: Vec<SecurityRequirement>,
    #[serde(skip)]
    pub extensions: ExtensionMap,
}

impl ConditionalFlow {
    pub fn new(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            condition: condition.into(),
            request: Vec::new(),
            response: Vec::new(),
            security: Vec::new(),
            extensions: ExtensionMap::new(),
        }
    }
}

/// PreFlow or PostFlow of an endpoint
#[derive(Debug, Clone, Serialize)]
pub struct UnconditionalFlow {
    pub name: String,
    pub description: Option<String>,
    pub request: Vec<Step>,
    pub response: Vec<Step>,
    #[serde(skip)]
    pub extensions: ExtensionMap,
}

impl UnconditionalFlow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            request: Vec::new(),
            response: Vec::new(),
            extensions: ExtensionMap::new(),
        }
    }

    pub fn pre_flow() -> Self {
        Self::new("PreFlow")
    }

    pub fn post_flow() -> Self {
        Self::new("PostFlow")
    }
}

/// A policy invocation inside a flow; order is execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Condition", default)]
    pub condition: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, condition: Option<&str>) -> Self {
        Self {
            name: name.into(),
            condition: condition.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub resource_type: String,
    pub resource_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raise_fault(name: &str) -> Policy {
        let tree: serde_yaml::Value = serde_yaml::from_str(&format!(
            "RaiseFault:\n  .name: {name}\n  FaultResponse:\n    Set:\n      StatusCode: 404\n"
        ))
        .unwrap();
        Policy::from_value(tree).unwrap()
    }

    #[test]
    fn test_new_proxy_has_equal_timestamps() {
        let proxy = ApiProxy::new("pet-store", "Pet Store");
        assert_eq!(proxy.created_at, proxy.last_modified);
        assert!(proxy.created_at > 0);
    }

    #[test]
    fn test_add_policy_rejects_duplicates() {
        let mut proxy = ApiProxy::new("pet-store", "Pet Store");
        proxy.add_policy(raise_fault("RF-1")).unwrap();

        let err = proxy.add_policy(raise_fault("RF-1")).unwrap_err();
        assert!(matches!(err, GeneratorError::DuplicatePolicy(name) if name == "RF-1"));
        assert_eq!(proxy.policies.len(), 1);
    }

    #[test]
    fn test_validate_catches_duplicates_pushed_directly() {
        let mut proxy = ApiProxy::new("pet-store", "Pet Store");
        proxy.policies.push(raise_fault("RF-1"));
        proxy.policies.push(raise_fault("RF-1"));

        assert!(matches!(
            proxy.validate(),
            Err(GeneratorError::DuplicatePolicy(_))
        ));
    }

    #[test]
    fn test_ssl_info_for_scheme() {
        assert!(!SslInfo::for_scheme(Some("http")).enabled);

        let https = SslInfo::for_scheme(Some("https"));
        assert!(https.enabled);
        assert!(https.ignore_validation_errors);
        assert!(!https.enforce);
        assert!(!https.client_auth_enabled);

        assert!(SslInfo::for_scheme(None).enabled);
        assert!(SslInfo::for_scheme(Some("HTTP")).enabled);
    }

    #[test]
    fn test_step_deserializes_from_extension_form() {
        let step: Step =
            serde_yaml::from_str("Name: VerifyKey\nCondition: request.verb = \"GET\"\n").unwrap();
        assert_eq!(step.name, "VerifyKey");
        assert_eq!(step.condition.as_deref(), Some("request.verb = \"GET\""));
    }
}
