//! Policy model
//!
//! A policy is authored as a plain structured document whose single top-level
//! key names the policy type:
//!
//! ```yaml
//! FlowCallout:
//!   .name: FC-Callout
//!   .continueOnError: true
//!   SharedFlowBundle: FC-Callout
//!   Parameters:
//!     - Parameter:
//!         .name: param1
//!         .value: Literal
//! ```
//!
//! Keys starting with `.` end up as XML attributes once the policy is rendered.
//! Types listed in the catalog are checked against their serde shape; keys the
//! shape does not name are carried along untouched. Every other type is
//! carried as an opaque tree.

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Errors raised while resolving a policy document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("could not unmarshal empty policy")]
    Empty,

    #[error("policy must have exactly one top-level key, found {0}")]
    MultipleRoots(usize),

    #[error("could not find policy type {0}")]
    UnknownType(String),

    #[error("malformed {0} policy, missing '.name' field")]
    MissingName(String),

    #[error("malformed {kind} policy: {reason}")]
    Malformed { kind: String, reason: String },
}

/// A named unit of gateway behavior
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    name: String,
    body: PolicyBody,
}

/// Underlying value of a policy
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyBody {
    /// Policy type outside the catalog, kept as authored
    Opaque(Value),

    /// Policy type from the catalog
    Typed(TypedPolicy),
}

impl Policy {
    /// Resolve a policy document.
    ///
    /// The document must be a mapping with a single policy-type key whose
    /// content carries a non-empty `.name`. Catalog types are validated
    /// against their typed shape.
    pub fn from_value(value: Value) -> Result<Self, PolicyError> {
        let (kind, name) = {
            let (kind, content) = split_root(&value)?;
            (kind.to_string(), policy_name(kind, content)?)
        };

        let body = if TypedPolicy::is_known(&kind) {
            PolicyBody::Typed(TypedPolicy::from_value(&value)?)
        } else {
            PolicyBody::Opaque(value)
        };

        Ok(Self { name, body })
    }

    pub fn from_typed(typed: TypedPolicy) -> Self {
        Self {
            name: typed.name().to_string(),
            body: PolicyBody::Typed(typed),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &PolicyBody {
        &self.body
    }

    /// Policy type, i.e. the top-level key of the document
    pub fn kind(&self) -> &str {
        match &self.body {
            PolicyBody::Typed(typed) => typed.kind(),
            PolicyBody::Opaque(value) => split_root(value).map(|(kind, _)| kind).unwrap_or(""),
        }
    }

    /// Structured document to hand to the markup codec
    pub fn to_tree(&self) -> Result<Value, PolicyError> {
        match &self.body {
            PolicyBody::Opaque(value) => Ok(value.clone()),
            PolicyBody::Typed(typed) => typed.to_tree(),
        }
    }
}

/// Policy types with a known shape
#[derive(Debug, Clone, PartialEq)]
pub enum TypedPolicy {
    FlowCallout(FlowCallout),
    RaiseFault(RaiseFault),
}

impl TypedPolicy {
    /// Policy-type keys of the catalog
    pub const KNOWN_TYPES: &'static [&'static str] = &["FlowCallout", "RaiseFault"];

    pub fn is_known(kind: &str) -> bool {
        Self::KNOWN_TYPES.contains(&kind)
    }

    /// Strict resolution: the type key must be in the catalog
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        let (kind, content) = split_root(value)?;
        if !Self::is_known(kind) {
            return Err(PolicyError::UnknownType(kind.to_string()));
        }
        policy_name(kind, content)?;

        let content = Value::Mapping(content.clone());
        let malformed = |e: serde_yaml::Error| PolicyError::Malformed {
            kind: kind.to_string(),
            reason: e.to_string(),
        };

        match kind {
            "FlowCallout" => serde_yaml::from_value(content)
                .map(TypedPolicy::FlowCallout)
                .map_err(malformed),
            "RaiseFault" => serde_yaml::from_value(content)
                .map(TypedPolicy::RaiseFault)
                .map_err(malformed),
            other => Err(PolicyError::UnknownType(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TypedPolicy::FlowCallout(_) => "FlowCallout",
            TypedPolicy::RaiseFault(_) => "RaiseFault",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypedPolicy::FlowCallout(p) => &p.name,
            TypedPolicy::RaiseFault(p) => &p.name,
        }
    }

    pub fn to_tree(&self) -> Result<Value, PolicyError> {
        let content = match self {
            TypedPolicy::FlowCallout(p) => serde_yaml::to_value(p),
            TypedPolicy::RaiseFault(p) => serde_yaml::to_value(p),
        }
        .map_err(|e| PolicyError::Malformed {
            kind: self.kind().to_string(),
            reason: e.to_string(),
        })?;

        let mut root = Mapping::new();
        root.insert(Value::String(self.kind().to_string()), content);
        Ok(Value::Mapping(root))
    }
}

/// Invokes a shared flow bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCallout {
    #[serde(rename = ".name")]
    pub name: String,

    #[serde(
        rename = ".enabled",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub enabled: Option<bool>,

    #[serde(
        rename = ".continueOnError",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub continue_on_error: Option<bool>,

    #[serde(rename = "DisplayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(rename = "SharedFlowBundle")]
    pub shared_flow_bundle: String,

    #[serde(rename = "Parameters", default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<FlowCalloutParameter>,

    /// Keys outside the known shape (`.async`, `.@text`...), kept as authored
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCalloutParameter {
    #[serde(rename = "Parameter")]
    pub parameter: ParameterAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAttributes {
    #[serde(rename = ".name")]
    pub name: String,

    #[serde(rename = ".value", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = ".ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// Stops processing and answers with a fault response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaiseFault {
    #[serde(rename = ".name")]
    pub name: String,

    #[serde(
        rename = ".enabled",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub enabled: Option<bool>,

    #[serde(
        rename = ".continueOnError",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub continue_on_error: Option<bool>,

    #[serde(rename = "DisplayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(
        rename = "IgnoreUnresolvedVariables",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub ignore_unresolved_variables: Option<bool>,

    #[serde(
        rename = "ShortFaultReason",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub short_fault_reason: Option<bool>,

    /// Free-form `FaultResponse` body (Set, Copy, Remove, AssignVariable...)
    #[serde(rename = "FaultResponse", default, skip_serializing_if = "Option::is_none")]
    pub fault_response: Option<Value>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl RaiseFault {
    /// A RaiseFault answering with a bare status code
    pub fn with_status(name: impl Into<String>, status_code: u16) -> Self {
        let mut set = Mapping::new();
        set.insert(
            Value::String("StatusCode".to_string()),
            Value::String(status_code.to_string()),
        );
        let mut fault_response = Mapping::new();
        fault_response.insert(Value::String("Set".to_string()), Value::Mapping(set));

        Self {
            name: name.into(),
            enabled: None,
            continue_on_error: None,
            display_name: None,
            ignore_unresolved_variables: Some(true),
            short_fault_reason: None,
            fault_response: Some(Value::Mapping(fault_response)),
            extra: Mapping::new(),
        }
    }
}

fn split_root(value: &Value) -> Result<(&str, &Mapping), PolicyError> {
    let root = match value {
        Value::Mapping(root) => root,
        Value::Tagged(tagged) => return split_root(&tagged.value),
        Value::Null => return Err(PolicyError::Empty),
        _ => {
            return Err(PolicyError::Malformed {
                kind: "unknown".to_string(),
                reason: "policy must be a mapping".to_string(),
            })
        }
    };

    let mut entries = root.iter();
    let (key, content) = match (entries.next(), root.len()) {
        (None, _) => return Err(PolicyError::Empty),
        (Some(entry), 1) => entry,
        (Some(_), n) => return Err(PolicyError::MultipleRoots(n)),
    };

    let kind = key.as_str().ok_or_else(|| PolicyError::Malformed {
        kind: "unknown".to_string(),
        reason: "policy type must be a string".to_string(),
    })?;

    match content {
        Value::Mapping(content) => Ok((kind, content)),
        _ => Err(PolicyError::Malformed {
            kind: kind.to_string(),
            reason: "policy content must be a mapping".to_string(),
        }),
    }
}

fn policy_name(kind: &str, content: &Mapping) -> Result<String, PolicyError> {
    match content.get(".name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(PolicyError::MissingName(kind.to_string())),
    }
}

/// Accepts YAML booleans as well as `"true"` / `"false"` strings
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean, found {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_catalog_type_becomes_typed() {
        let policy = Policy::from_value(yaml(
            r#"
FlowCallout:
  .name: FC-Callout
  .continueOnError: "true"
  SharedFlowBundle: shared-auth
  Parameters:
    - Parameter:
        .name: param1
        .value: Literal
"#,
        ))
        .unwrap();

        assert_eq!(policy.name(), "FC-Callout");
        assert_eq!(policy.kind(), "FlowCallout");
        match policy.body() {
            PolicyBody::Typed(TypedPolicy::FlowCallout(fc)) => {
                assert_eq!(fc.shared_flow_bundle, "shared-auth");
                assert_eq!(fc.continue_on_error, Some(true));
                assert_eq!(fc.parameters[0].parameter.value.as_deref(), Some("Literal"));
            }
            other => panic!("expected typed FlowCallout, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_stays_opaque() {
        let tree = yaml("SpikeArrest:\n  .name: SA-1\n  Rate: 30ps\n");
        let policy = Policy::from_value(tree.clone()).unwrap();

        assert_eq!(policy.name(), "SA-1");
        assert_eq!(policy.kind(), "SpikeArrest");
        assert_eq!(policy.body(), &PolicyBody::Opaque(tree.clone()));
        assert_eq!(policy.to_tree().unwrap(), tree);
    }

    #[test]
    fn test_missing_name_fails() {
        let err = Policy::from_value(yaml("SpikeArrest:\n  Rate: 30ps\n")).unwrap_err();
        assert_eq!(err, PolicyError::MissingName("SpikeArrest".to_string()));

        let err = Policy::from_value(yaml("RaiseFault:\n  .name: ''\n")).unwrap_err();
        assert_eq!(err, PolicyError::MissingName("RaiseFault".to_string()));
    }

    #[test]
    fn test_strict_resolution_rejects_unknown_type() {
        let err = TypedPolicy::from_value(&yaml("Bogus:\n  .name: B-1\n")).unwrap_err();
        assert_eq!(err, PolicyError::UnknownType("Bogus".to_string()));
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        let err = Policy::from_value(yaml("FlowCallout:\n  .name: FC\n")).unwrap_err();
        assert!(matches!(err, PolicyError::Malformed { kind, .. } if kind == "FlowCallout"));

        let err = Policy::from_value(yaml("RaiseFault:\n  .name: RF\n  .enabled: maybe\n"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::Malformed { kind, .. } if kind == "RaiseFault"));
    }

    #[test]
    fn test_extra_attributes_are_kept() {
        let policy = Policy::from_value(yaml(
            r#"
RaiseFault:
  .name: RF-1
  .async: false
  FaultResponse:
    Set:
      StatusCode: 403
"#,
        ))
        .unwrap();

        assert_eq!(policy.kind(), "RaiseFault");
        let tree = policy.to_tree().unwrap();
        assert_eq!(tree["RaiseFault"][".async"], Value::Bool(false));
        assert_eq!(
            tree["RaiseFault"]["FaultResponse"]["Set"]["StatusCode"],
            Value::Number(403.into())
        );
    }

    #[test]
    fn test_literal_parameter_text_is_kept() {
        let policy = Policy::from_value(yaml(
            r#"
FlowCallout:
  .name: FC-Callout
  SharedFlowBundle: shared-auth
  Parameters:
    - Parameter:
        .name: p1
        .@text: Literal
"#,
        ))
        .unwrap();

        match policy.body() {
            PolicyBody::Typed(TypedPolicy::FlowCallout(fc)) => {
                let parameter = &fc.parameters[0].parameter;
                assert_eq!(parameter.name, "p1");
                assert_eq!(parameter.value, None);
                assert_eq!(
                    parameter.extra.get(".@text"),
                    Some(&Value::String("Literal".into()))
                );
            }
            other => panic!("expected typed FlowCallout, got {other:?}"),
        }

        let tree = policy.to_tree().unwrap();
        assert_eq!(
            tree["FlowCallout"]["Parameters"][0]["Parameter"][".@text"],
            Value::String("Literal".into())
        );
    }

    #[test]
    fn test_empty_and_multi_root_documents() {
        assert_eq!(
            Policy::from_value(Value::Mapping(Mapping::new())).unwrap_err(),
            PolicyError::Empty
        );
        assert_eq!(
            Policy::from_value(yaml("A:\n  .name: a\nB:\n  .name: b\n")).unwrap_err(),
            PolicyError::MultipleRoots(2)
        );
    }

    #[test]
    fn test_typed_tree_keeps_attribute_keys() {
        let policy = Policy::from_typed(TypedPolicy::RaiseFault(RaiseFault::with_status(
            "RF-HTTP404",
            404,
        )));
        let tree = policy.to_tree().unwrap();

        assert_eq!(tree["RaiseFault"][".name"], Value::String("RF-HTTP404".into()));
        assert_eq!(tree["RaiseFault"]["IgnoreUnresolvedVariables"], Value::Bool(true));
        assert_eq!(
            tree["RaiseFault"]["FaultResponse"]["Set"]["StatusCode"],
            Value::String("404".into())
        );
    }
}
