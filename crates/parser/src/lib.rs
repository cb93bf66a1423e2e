//! Spec model, reference resolution and proxy model transformation
//!
//! This crate turns an OpenAPI 3.x or Swagger 2.0 description into the
//! gateway proxy model (`ApiProxy`).
//!
//! ## Transformation Strategy
//!
//! One proxy endpoint and one target endpoint, both named `default`:
//! - Proxy name is the slug of `info.title`
//! - Base path and backend URL come from the first server (or `host`/`basePath`)
//! - Every (path, operation) pair becomes a conditional flow, in declaration order
//! - Vendor extensions are carried over for plugins to act on

pub mod openapi;
pub mod reference;
pub mod spec_model;
pub mod swagger;
mod transform;
mod types;

pub use reference::{reference_location, ReferenceError, ReferenceResolver};
pub use spec_model::SpecModel;
pub use transform::{
    flow_condition, gateway_path, merge_extensions, slugify, transform, PLACEHOLDER_TARGET_URL,
};
pub use types::{Info, Operation, PathItem, Paths, SpecExtensions, HTTP_METHODS};
