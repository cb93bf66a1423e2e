//! Plugin capability traits and per-run context

use spec2proxy_common::ApiProxy;
use spec2proxy_parser::{ReferenceResolver, SpecModel};
use std::fmt;
use std::path::Path;

/// Points of the pipeline where plugins run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// After the spec is loaded, before transformation
    SpecModel,

    /// After transformation, before generation
    ProxyModel,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::SpecModel => write!(f, "spec-model"),
            Checkpoint::ProxyModel => write!(f, "proxy-model"),
        }
    }
}

/// State shared by every plugin during one run
#[derive(Debug, Default)]
pub struct PluginContext {
    resolver: ReferenceResolver,
}

impl PluginContext {
    pub fn new(resolver: ReferenceResolver) -> Self {
        Self { resolver }
    }

    /// Context resolving references relative to the spec file's directory
    pub fn for_spec_file(spec_path: &Path) -> Self {
        Self::new(ReferenceResolver::for_spec_file(spec_path))
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut ReferenceResolver {
        &mut self.resolver
    }
}

/// Rewrites the spec model before transformation
#[cfg_attr(test, mockall::automock)]
pub trait SpecModelHook {
    fn process_spec_model(
        &self,
        ctx: &mut PluginContext,
        model: &mut SpecModel,
    ) -> anyhow::Result<()>;
}

/// Rewrites the proxy model before generation
#[cfg_attr(test, mockall::automock)]
pub trait ProxyModelHook {
    fn process_proxy_model(
        &self,
        ctx: &mut PluginContext,
        proxy: &mut ApiProxy,
    ) -> anyhow::Result<()>;
}

/// A named processor exposing any subset of the checkpoint hooks
pub trait Plugin {
    /// Unique name used in plugin lists
    fn name(&self) -> &str;

    fn spec_model_hook(&self) -> Option<&dyn SpecModelHook> {
        None
    }

    fn proxy_model_hook(&self) -> Option<&dyn ProxyModelHook> {
        None
    }
}
