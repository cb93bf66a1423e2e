//! `$ref` resolution against local YAML/JSON files
//!
//! A reference node is a mapping whose only entry is `$ref: <file>#<pointer>`.
//! Resolution replaces such nodes in place with the single node the pointer
//! selects, recursing until no reference is left.

use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const REF_KEY: &str = "$ref";
const WILDCARD: &str = "*";

/// Errors raised while resolving a reference
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("malformed reference '{location}': {reason}")]
    Malformed { location: String, reason: String },

    #[error(
        "reference '{0}' has no file part; references into the same document are not supported"
    )]
    SelfReference(String),

    #[error("failed to read referenced file {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse referenced file {}: {source}", .path.display())]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid pointer '{pointer}' in reference '{location}'")]
    InvalidPointer { location: String, pointer: String },

    #[error("reference '{0}' did not match any node")]
    NotFound(String),

    #[error("reference '{location}' matched {count} nodes, expected exactly one")]
    Ambiguous { location: String, count: usize },

    #[error("circular reference: {}", .0.join(" -> "))]
    Circular(Vec<String>),
}

/// Result type for reference resolution
pub type Result<T> = std::result::Result<T, ReferenceError>;

/// Resolves references relative to a base directory, caching every file it
/// loads for the lifetime of the resolver
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    base_dir: PathBuf,
    documents: HashMap<PathBuf, Value>,
}

impl ReferenceResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            documents: HashMap::new(),
        }
    }

    /// Resolver for references found in the spec file at `spec_path`
    pub fn for_spec_file(spec_path: &Path) -> Self {
        let base_dir = spec_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of files loaded so far
    pub fn cached_files(&self) -> usize {
        self.documents.len()
    }

    /// Replace every reference inside `node` with its target, in place
    pub fn resolve(&mut self, node: &mut Value) -> Result<()> {
        let mut active = Vec::new();
        self.resolve_node(node, &mut active)
    }

    /// Resolved copy of `node`
    pub fn resolved(&mut self, node: &Value) -> Result<Value> {
        let mut copy = node.clone();
        self.resolve(&mut copy)?;
        Ok(copy)
    }

    /// The node a `<file>#<pointer>` location selects, without resolving
    /// references inside it
    pub fn lookup(&mut self, location: &str) -> Result<Value> {
        let (file, pointer) = split_location(location)?;
        let segments = parse_pointer(location, pointer)?;
        let document = self.load(file)?;

        let matches = query(document, &segments);
        match matches.as_slice() {
            [] => Err(ReferenceError::NotFound(location.to_string())),
            [only] => Ok((*only).clone()),
            _ => Err(ReferenceError::Ambiguous {
                location: location.to_string(),
                count: matches.len(),
            }),
        }
    }

    fn resolve_node(&mut self, node: &mut Value, active: &mut Vec<String>) -> Result<()> {
        if let Some(location) = reference_location(node)? {
            let location = location.to_string();
            if active.contains(&location) {
                let mut chain = active.clone();
                chain.push(location);
                return Err(ReferenceError::Circular(chain));
            }

            let mut target = self.lookup(&location)?;
            active.push(location);
            self.resolve_node(&mut target, active)?;
            active.pop();
            *node = target;
            return Ok(());
        }

        match node {
            Value::Mapping(mapping) => {
                for value in mapping.values_mut() {
                    self.resolve_node(value, active)?;
                }
            }
            Value::Sequence(items) => {
                for item in items {
                    self.resolve_node(item, active)?;
                }
            }
            Value::Tagged(tagged) => self.resolve_node(&mut tagged.value, active)?,
            _ => {}
        }
        Ok(())
    }

    fn load(&mut self, file: &str) -> Result<&Value> {
        let path = self.base_dir.join(file);
        if !self.documents.contains_key(&path) {
            let text = fs::read_to_string(&path).map_err(|source| ReferenceError::ReadFile {
                path: path.clone(),
                source,
            })?;
            let document: Value =
                serde_yaml::from_str(&text).map_err(|source| ReferenceError::ParseFile {
                    path: path.clone(),
                    source,
                })?;
            debug!("Loaded referenced file {}", path.display());
            self.documents.insert(path.clone(), document);
        }
        self.documents
            .get(&path)
            .ok_or_else(|| ReferenceError::NotFound(file.to_string()))
    }
}

/// The `$ref` target if `node` is a reference node; a lone `$ref` whose
/// value is not a string is malformed
pub fn reference_location(node: &Value) -> Result<Option<&str>> {
    let Value::Mapping(mapping) = node else {
        return Ok(None);
    };
    if mapping.len() != 1 {
        return Ok(None);
    }
    match mapping.get(REF_KEY) {
        None => Ok(None),
        Some(Value::String(location)) => Ok(Some(location.as_str())),
        Some(other) => Err(ReferenceError::Malformed {
            location: serde_yaml::to_string(other)
                .map(|text| text.trim_end().to_string())
                .unwrap_or_default(),
            reason: "reference must be a string".to_string(),
        }),
    }
}

fn split_location(location: &str) -> Result<(&str, &str)> {
    let mut parts = location.split('#');
    let (Some(file), Some(pointer), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ReferenceError::Malformed {
            location: location.to_string(),
            reason: "expected exactly one '#' separating file and pointer".to_string(),
        });
    };
    if file.is_empty() {
        return Err(ReferenceError::SelfReference(location.to_string()));
    }
    Ok((file, pointer))
}

fn parse_pointer(location: &str, pointer: &str) -> Result<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let invalid = || ReferenceError::InvalidPointer {
        location: location.to_string(),
        pointer: pointer.to_string(),
    };

    let rest = pointer.strip_prefix('/').ok_or_else(invalid)?;
    rest.split('/')
        .map(|segment| {
            if segment.is_empty() {
                Err(invalid())
            } else {
                Ok(segment.replace("~1", "/").replace("~0", "~"))
            }
        })
        .collect()
}

fn query<'a>(document: &'a Value, segments: &[String]) -> Vec<&'a Value> {
    let mut current = vec![document];
    for segment in segments {
        current = current
            .into_iter()
            .flat_map(|node| children(node, segment))
            .collect();
        if current.is_empty() {
            break;
        }
    }
    current
}

fn children<'a>(node: &'a Value, segment: &str) -> Vec<&'a Value> {
    match node {
        Value::Mapping(mapping) if segment == WILDCARD => mapping.values().collect(),
        Value::Sequence(items) if segment == WILDCARD => items.iter().collect(),
        Value::Mapping(mapping) => mapping
            .iter()
            .filter(|(key, _)| key_matches(key, segment))
            .map(|(_, value)| value)
            .collect(),
        Value::Sequence(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .into_iter()
            .collect(),
        Value::Tagged(tagged) => children(&tagged.value, segment),
        _ => Vec::new(),
    }
}

/// YAML keys may be numbers or booleans (`200:`), compare their text form
fn key_matches(key: &Value, segment: &str) -> bool {
    match key {
        Value::String(s) => s == segment,
        Value::Number(n) => n.to_string() == segment,
        Value::Bool(b) => b.to_string() == segment,
        _ => false,
    }
}
