//! OpenAPI 3.x document model and proxy conversion
//!
//! ## Usage
//! ```rust,ignore
//! use spec2proxy_parser::{transform, SpecModel};
//!
//! let model = SpecModel::from_file("petstore.yaml")?;
//! let proxy = transform(&model)?;
//! ```

mod converter;
mod types;

pub use converter::convert_openapi_to_proxy;
pub use types::*;
