//! Runs named plugins at a checkpoint

use crate::registry::PluginRegistry;
use crate::traits::{Checkpoint, PluginContext};
use spec2proxy_common::ApiProxy;
use spec2proxy_parser::SpecModel;
use thiserror::Error;
use tracing::debug;

/// Errors raised while running plugins
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin {0} not found")]
    NotRegistered(String),

    #[error("plugin {0} is already registered")]
    AlreadyRegistered(String),

    #[error("plugin {plugin} has no {checkpoint} hook")]
    MissingCapability {
        plugin: String,
        checkpoint: Checkpoint,
    },

    #[error("plugin {plugin} failed at the {checkpoint} checkpoint")]
    Failed {
        plugin: String,
        checkpoint: Checkpoint,
        #[source]
        source: anyhow::Error,
    },
}

/// Split a comma-separated plugin list, skipping empty entries
pub fn parse_plugin_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// A registry plus the context shared by the plugins of one run
pub struct PluginPipeline {
    registry: PluginRegistry,
    context: PluginContext,
}

impl PluginPipeline {
    pub fn new(registry: PluginRegistry, context: PluginContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut PluginContext {
        &mut self.context
    }

    /// Run the spec-model hook of every named plugin, in order
    pub fn process_spec_model(
        &mut self,
        names: &[String],
        model: &mut SpecModel,
    ) -> Result<(), PluginError> {
        let checkpoint = Checkpoint::SpecModel;
        for name in names {
            let plugin = self
                .registry
                .get(name)
                .ok_or_else(|| PluginError::NotRegistered(name.clone()))?;
            let hook = plugin
                .spec_model_hook()
                .ok_or_else(|| PluginError::MissingCapability {
                    plugin: name.clone(),
                    checkpoint,
                })?;

            debug!("Running plugin {} at the {} checkpoint", name, checkpoint);
            hook.process_spec_model(&mut self.context, model)
                .map_err(|source| PluginError::Failed {
                    plugin: name.clone(),
                    checkpoint,
                    source,
                })?;
        }
        Ok(())
    }

    /// Run the proxy-model hook of every named plugin, in order
    pub fn process_proxy_model(
        &mut self,
        names: &[String],
        proxy: &mut ApiProxy,
    ) -> Result<(), PluginError> {
        let checkpoint = Checkpoint::ProxyModel;
        for name in names {
            let plugin = self
                .registry
                .get(name)
                .ok_or_else(|| PluginError::NotRegistered(name.clone()))?;
            let hook = plugin
                .proxy_model_hook()
                .ok_or_else(|| PluginError::MissingCapability {
                    plugin: name.clone(),
                    checkpoint,
                })?;

            debug!("Running plugin {} at the {} checkpoint", name, checkpoint);
            hook.process_proxy_model(&mut self.context, proxy)
                .map_err(|source| PluginError::Failed {
                    plugin: name.clone(),
                    checkpoint,
                    source,
                })?;
        }
        Ok(())
    }
}
