//! Spec model loading and validation
//!
//! Reads an OpenAPI 3.x or Swagger 2.0 document from YAML or JSON (JSON is
//! parsed as YAML) and checks the invariants the transformation relies on.

use crate::openapi::OpenApiDocument;
use crate::swagger::SwaggerDocument;
use crate::types::{Info, Paths, SpecExtensions};
use serde_yaml::{Mapping, Value};
use spec2proxy_common::{GeneratorError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A parsed API description
#[derive(Debug, Clone)]
pub enum SpecModel {
    OpenApi3(OpenApiDocument),
    Swagger2(SwaggerDocument),
}

impl SpecModel {
    /// Load and validate a spec from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            GeneratorError::Parse(format!(
                "Failed to read spec file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    /// Parse and validate a spec from YAML or JSON text
    pub fn parse(text: &str) -> Result<Self> {
        let root: Value = serde_yaml::from_str(text)
            .map_err(|e| GeneratorError::Parse(format!("Failed to parse spec: {}", e)))?;
        let Value::Mapping(mut root) = root else {
            return Err(GeneratorError::Parse(
                "spec root must be a mapping".to_string(),
            ));
        };

        normalize_scalar(&mut root, "openapi");
        normalize_scalar(&mut root, "swagger");
        if let Some(Value::Mapping(info)) = root.get_mut("info") {
            normalize_scalar(info, "version");
        }

        let openapi = root.get("openapi").and_then(Value::as_str).map(str::to_string);
        let swagger = root.get("swagger").and_then(Value::as_str).map(str::to_string);

        let model = match (openapi.as_deref(), swagger.as_deref()) {
            (Some(version), _) if version.starts_with("3.") => {
                let doc = serde_yaml::from_value(Value::Mapping(root)).map_err(|e| {
                    GeneratorError::Parse(format!("Invalid OpenAPI {} document: {}", version, e))
                })?;
                SpecModel::OpenApi3(doc)
            }
            (None, Some("2.0")) => {
                let doc = serde_yaml::from_value(Value::Mapping(root)).map_err(|e| {
                    GeneratorError::Parse(format!("Invalid Swagger 2.0 document: {}", e))
                })?;
                SpecModel::Swagger2(doc)
            }
            (Some(version), _) | (None, Some(version)) => {
                return Err(GeneratorError::Parse(format!(
                    "OpenAPI spec version {} is not supported",
                    version
                )))
            }
            (None, None) => {
                return Err(GeneratorError::Parse(
                    "OpenAPI spec version is missing".to_string(),
                ))
            }
        };

        model.validate()?;
        debug!(
            "Loaded {} spec '{}' with {} paths",
            model.version(),
            model.info().title,
            model.paths().items.len()
        );
        Ok(model)
    }

    /// Collect every independent problem with the document
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.info().title.trim().is_empty() {
            errors.push("info.title must not be empty".to_string());
        }

        let mut operation_ids = HashSet::new();
        for (path, item) in &self.paths().items {
            if !path.starts_with('/') {
                errors.push(format!("path '{}' must start with '/'", path));
            }
            for (method, operation) in &item.operations {
                if let Some(id) = &operation.operation_id {
                    if !operation_ids.insert(id.as_str()) {
                        errors.push(format!(
                            "duplicate operationId '{}' ({} {})",
                            id,
                            method.to_ascii_uppercase(),
                            path
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GeneratorError::SpecModel(errors))
        }
    }

    /// Declared spec version, e.g. "3.0.3" or "2.0"
    pub fn version(&self) -> &str {
        match self {
            SpecModel::OpenApi3(doc) => &doc.openapi,
            SpecModel::Swagger2(doc) => &doc.swagger,
        }
    }

    pub fn info(&self) -> &Info {
        match self {
            SpecModel::OpenApi3(doc) => &doc.info,
            SpecModel::Swagger2(doc) => &doc.info,
        }
    }

    pub fn paths(&self) -> &Paths {
        match self {
            SpecModel::OpenApi3(doc) => &doc.paths,
            SpecModel::Swagger2(doc) => &doc.paths,
        }
    }

    pub fn paths_mut(&mut self) -> &mut Paths {
        match self {
            SpecModel::OpenApi3(doc) => &mut doc.paths,
            SpecModel::Swagger2(doc) => &mut doc.paths,
        }
    }

    /// Root-level `x-` keys
    pub fn extensions(&self) -> &SpecExtensions {
        match self {
            SpecModel::OpenApi3(doc) => &doc.extensions,
            SpecModel::Swagger2(doc) => &doc.extensions,
        }
    }

    /// Every extension map in the document: root, info, paths, then each
    /// path item followed by its operations
    pub fn extension_maps_mut(&mut self) -> Vec<&mut SpecExtensions> {
        match self {
            SpecModel::OpenApi3(doc) => {
                collect_extension_maps(&mut doc.extensions, &mut doc.info, &mut doc.paths)
            }
            SpecModel::Swagger2(doc) => {
                collect_extension_maps(&mut doc.extensions, &mut doc.info, &mut doc.paths)
            }
        }
    }
}

fn collect_extension_maps<'a>(
    root: &'a mut SpecExtensions,
    info: &'a mut Info,
    paths: &'a mut Paths,
) -> Vec<&'a mut SpecExtensions> {
    let mut maps = vec![root, &mut info.extensions, &mut paths.extensions];
    for item in paths.items.values_mut() {
        maps.push(&mut item.extensions);
        for operation in item.operations.values_mut() {
            maps.push(&mut operation.extensions);
        }
    }
    maps
}

/// Version fields are often written unquoted (`swagger: 2.0`)
fn normalize_scalar(mapping: &mut Mapping, key: &str) {
    if let Some(value) = mapping.get_mut(key) {
        let text = match value {
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return,
        };
        *value = Value::String(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_openapi3() {
        let model = SpecModel::parse("openapi: 3.0.3\ninfo: {title: Pet Store, version: 1.0}\n")
            .unwrap();
        assert!(matches!(model, SpecModel::OpenApi3(_)));
        assert_eq!(model.version(), "3.0.3");
        assert_eq!(model.info().version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_detects_numeric_swagger_version() {
        let model = SpecModel::parse("swagger: 2.0\ninfo: {title: Orders}\n").unwrap();
        assert!(matches!(model, SpecModel::Swagger2(_)));
        assert_eq!(model.version(), "2.0");
    }

    #[test]
    fn test_parses_json() {
        let model = SpecModel::parse(
            r#"{"openapi": "3.1.0", "info": {"title": "Json API"}, "paths": {"/a": {"get": {}}}}"#,
        )
        .unwrap();
        assert_eq!(model.paths().items.len(), 1);
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let err = SpecModel::parse("openapi: 4.0.0\ninfo: {title: Future}\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error: OpenAPI spec version 4.0.0 is not supported"
        );

        let err = SpecModel::parse("swagger: \"1.2\"\ninfo: {title: Old}\n").unwrap_err();
        assert!(err.to_string().contains("1.2 is not supported"));
    }

    #[test]
    fn test_rejects_non_mapping_root() {
        assert!(matches!(
            SpecModel::parse("- just\n- a list\n"),
            Err(GeneratorError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let err = SpecModel::parse(
            r#"
openapi: 3.0.0
info:
  title: "  "
paths:
  pets:
    get:
      operationId: listPets
  /pets/{id}:
    get:
      operationId: listPets
"#,
        )
        .unwrap_err();

        let errors = match err {
            GeneratorError::SpecModel(errors) => errors,
            other => panic!("expected a spec model error, got {other:?}"),
        };
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], "info.title must not be empty");
        assert_eq!(errors[1], "path 'pets' must start with '/'");
        assert!(errors[2].starts_with("duplicate operationId 'listPets'"));
    }

    #[test]
    fn test_extension_maps_mut_visits_every_level() {
        let mut model = SpecModel::parse(
            r#"
openapi: 3.0.0
info: {title: Pets, x-a: 1}
x-b: 2
paths:
  x-c: 3
  /pets:
    x-d: 4
    get:
      x-e: 5
    post: {}
"#,
        )
        .unwrap();

        let maps = model.extension_maps_mut();
        assert_eq!(maps.len(), 6);
        let total: usize = maps.iter().map(|m| m.len()).sum();
        assert_eq!(total, 5);
    }
}
