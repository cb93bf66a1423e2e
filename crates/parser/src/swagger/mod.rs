//! Swagger 2.0 document model and proxy conversion

mod converter;
mod types;

pub use converter::convert_swagger_to_proxy;
pub use types::*;
