//! Plugin pipeline for spec2proxy
//!
//! Plugins rewrite the spec model before transformation and the proxy model
//! before generation. A run names the plugins to apply, in order; the same
//! list is used at both checkpoints.
//!
//! # Example
//!
//! ```no_run
//! use spec2proxy_plugins::{parse_plugin_list, PluginContext, PluginPipeline, PluginRegistry};
//! use spec2proxy_parser::{transform, SpecModel};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let spec_path = Path::new("petstore.yaml");
//! let names = parse_plugin_list("apigee_policies,catch_all");
//!
//! let mut pipeline = PluginPipeline::new(
//!     PluginRegistry::with_builtins(),
//!     PluginContext::for_spec_file(spec_path),
//! );
//! let mut model = SpecModel::from_file(spec_path)?;
//! pipeline.process_spec_model(&names, &mut model)?;
//!
//! let mut proxy = transform(&model)?;
//! pipeline.process_proxy_model(&names, &mut proxy)?;
//! # Ok(())
//! # }
//! ```

pub mod apigee_policies;
pub mod catch_all;
pub mod pipeline;
pub mod registry;
pub mod traits;
pub mod visibility;

pub use apigee_policies::ApigeePoliciesPlugin;
pub use catch_all::CatchAllPlugin;
pub use pipeline::{parse_plugin_list, PluginError, PluginPipeline};
pub use registry::PluginRegistry;
pub use traits::{Checkpoint, Plugin, PluginContext, ProxyModelHook, SpecModelHook};
pub use visibility::VisibilityPlugin;
