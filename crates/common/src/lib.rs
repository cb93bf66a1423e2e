//! Common types and utilities for spec2proxy
//!
//! This crate contains the gateway proxy model, the policy model and the
//! error types shared by the parser, generator, plugins and CLI components.

pub mod model;
pub mod policy;

pub use model::{
    ApiProxy, ConditionalFlow, Extension, ExtensionMap, HttpTargetConnection, Property,
    ProxyEndpoint, Resource, RouteRule, SecurityRequirement, SslInfo, Step, TargetEndpoint,
    UnconditionalFlow, DEFAULT_ENDPOINT,
};
pub use policy::{FlowCallout, Policy, PolicyBody, PolicyError, RaiseFault, TypedPolicy};

use thiserror::Error;

/// Errors that can occur while building and generating a proxy bundle
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Parse error: {0}")]
    Parse(String),

    /// Every independent problem found while building the spec model
    #[error("{}", spec_model_message(.0))]
    SpecModel(Vec<String>),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Duplicate policy name: {0}")]
    DuplicatePolicy(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn spec_model_message(errors: &[String]) -> String {
    match errors {
        [] => "Spec model error".to_string(),
        [only] => format!("Spec model error: {only}"),
        [first, rest @ ..] => format!(
            "Spec model error: {first} (and {} more)",
            rest.len()
        ),
    }
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_model_error_reports_first_and_count() {
        let err = GeneratorError::SpecModel(vec![
            "duplicate operationId 'getPet'".to_string(),
            "path 'pets' must start with '/'".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Spec model error: duplicate operationId 'getPet' (and 1 more)"
        );
    }

    #[test]
    fn test_policy_error_is_transparent() {
        let err: GeneratorError = PolicyError::UnknownType("Bogus".to_string()).into();
        assert_eq!(err.to_string(), "could not find policy type Bogus");
    }
}
