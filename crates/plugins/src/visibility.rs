//! Drops operations marked internal with `x-visibility`

use crate::traits::{Plugin, PluginContext, ProxyModelHook, SpecModelHook};
use serde_yaml::Value;
use spec2proxy_common::ApiProxy;
use spec2proxy_parser::SpecModel;
use tracing::info;

pub const NAME: &str = "visibility";

const VISIBILITY: &str = "x-visibility";
const EXTENT: &str = "extent";
const INTERNAL: &str = "internal";

pub struct VisibilityPlugin;

/// True when an `x-visibility` value has `Extent: internal`, ignoring case
pub fn is_internal(value: &Value) -> bool {
    let Value::Mapping(mapping) = value else {
        return false;
    };
    mapping.iter().any(|(key, extent)| {
        matches!(key, Value::String(k) if k.eq_ignore_ascii_case(EXTENT))
            && matches!(extent, Value::String(e) if e.eq_ignore_ascii_case(INTERNAL))
    })
}

impl SpecModelHook for VisibilityPlugin {
    fn process_spec_model(
        &self,
        _ctx: &mut PluginContext,
        model: &mut SpecModel,
    ) -> anyhow::Result<()> {
        for (path, item) in model.paths_mut().items.iter_mut() {
            let inherited = item.extensions.get(VISIBILITY).is_some_and(is_internal);
            item.operations.retain(|verb, operation| {
                let internal = match operation.extensions.get(VISIBILITY) {
                    Some(value) => is_internal(value),
                    None => inherited,
                };
                if internal {
                    info!("Removing internal operation: {} {}", verb.to_uppercase(), path);
                }
                !internal
            });
        }
        Ok(())
    }
}

impl ProxyModelHook for VisibilityPlugin {
    fn process_proxy_model(
        &self,
        _ctx: &mut PluginContext,
        proxy: &mut ApiProxy,
    ) -> anyhow::Result<()> {
        for endpoint in &mut proxy.proxy_endpoints {
            endpoint.flows.retain(|flow| {
                let internal = flow
                    .extensions
                    .get(VISIBILITY)
                    .is_some_and(|extension| is_internal(&extension.value));
                if internal {
                    info!("Removing internal operation: {}", flow.name);
                }
                !internal
            });
        }
        Ok(())
    }
}

impl Plugin for VisibilityPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn spec_model_hook(&self) -> Option<&dyn SpecModelHook> {
        Some(self)
    }

    fn proxy_model_hook(&self) -> Option<&dyn ProxyModelHook> {
        Some(self)
    }
}
