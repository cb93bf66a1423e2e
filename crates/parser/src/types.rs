//! Document types shared by OpenAPI 3 and Swagger 2
//!
//! Simplified representation focusing on what the proxy model needs. Paths
//! and operations keep their declaration order.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use spec2proxy_common::SecurityRequirement;

/// HTTP methods recognised as operations inside a path item
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// `x-` keys of a spec object, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecExtensions(IndexMap<String, Value>);

impl SpecExtensions {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for SpecExtensions {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter(|(key, _)| is_extension_key(key))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for SpecExtensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = IndexMap::<String, Value>::deserialize(deserializer)?;
        Ok(fields.into_iter().collect())
    }
}

pub(crate) fn is_extension_key(key: &str) -> bool {
    key.starts_with("x-")
}

/// API information
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,

    /// API version
    #[serde(default)]
    pub version: Option<String>,

    /// API description
    #[serde(default)]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extensions: SpecExtensions,
}

/// The `paths` object
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "IndexMap<String, Value>")]
pub struct Paths {
    /// Path items keyed by path template, in declaration order
    pub items: IndexMap<String, PathItem>,

    pub extensions: SpecExtensions,
}

impl TryFrom<IndexMap<String, Value>> for Paths {
    type Error = String;

    fn try_from(fields: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        let mut paths = Paths::default();
        for (key, value) in fields {
            if is_extension_key(&key) {
                paths.extensions.insert(key, value);
                continue;
            }
            let item: PathItem = serde_yaml::from_value(value)
                .map_err(|e| format!("invalid path item '{key}': {e}"))?;
            paths.items.insert(key, item);
        }
        Ok(paths)
    }
}

/// Operations and metadata of a single path
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "IndexMap<String, Value>")]
pub struct PathItem {
    pub summary: Option<String>,

    pub description: Option<String>,

    /// Path-level parameters, kept as authored
    pub parameters: Vec<Value>,

    /// Operations keyed by lower-case HTTP method, in declaration order
    pub operations: IndexMap<String, Operation>,

    pub extensions: SpecExtensions,
}

impl TryFrom<IndexMap<String, Value>> for PathItem {
    type Error = String;

    fn try_from(fields: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        let mut item = PathItem::default();
        for (key, value) in fields {
            let method = key.to_ascii_lowercase();
            if HTTP_METHODS.contains(&method.as_str()) {
                let operation: Operation = serde_yaml::from_value(value)
                    .map_err(|e| format!("invalid {method} operation: {e}"))?;
                item.operations.insert(method, operation);
            } else if is_extension_key(&key) {
                item.extensions.insert(key, value);
            } else {
                match key.as_str() {
                    "summary" => item.summary = value.as_str().map(str::to_string),
                    "description" => item.description = value.as_str().map(str::to_string),
                    "parameters" => {
                        item.parameters = serde_yaml::from_value(value)
                            .map_err(|e| format!("invalid parameters: {e}"))?
                    }
                    _ => {}
                }
            }
        }
        Ok(item)
    }
}

/// HTTP operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    /// Operation ID (unique identifier)
    #[serde(rename = "operationId")]
    #[serde(default)]
    pub operation_id: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Operation-level security requirements, verbatim
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,

    #[serde(flatten)]
    pub extensions: SpecExtensions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_item_keeps_operation_order() {
        let item: PathItem = serde_yaml::from_str(
            r#"
summary: Pets
post:
  operationId: createPet
get:
  operationId: listPets
x-owner: team-a
delete:
  operationId: deletePets
"#,
        )
        .unwrap();

        let methods: Vec<&str> = item.operations.keys().map(String::as_str).collect();
        assert_eq!(methods, vec!["post", "get", "delete"]);
        assert_eq!(item.summary.as_deref(), Some("Pets"));
        assert_eq!(item.extensions.len(), 1);
    }

    #[test]
    fn test_operation_extensions_only_keep_x_keys() {
        let op: Operation = serde_yaml::from_str(
            r#"
operationId: getPet
responses:
  "200":
    description: OK
x-visibility:
  Extent: internal
"#,
        )
        .unwrap();

        assert_eq!(op.operation_id.as_deref(), Some("getPet"));
        assert_eq!(op.extensions.len(), 1);
        assert!(op.extensions.get("x-visibility").is_some());
    }

    #[test]
    fn test_paths_split_extensions() {
        let paths: Paths = serde_yaml::from_str(
            r#"
/pets:
  get:
    operationId: listPets
x-paths-note: hello
/pets/{id}:
  get:
    operationId: getPet
"#,
        )
        .unwrap();

        let keys: Vec<&str> = paths.items.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/pets", "/pets/{id}"]);
        assert_eq!(
            paths.extensions.get("x-paths-note"),
            Some(&Value::String("hello".into()))
        );
    }
}
