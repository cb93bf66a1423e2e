//! Answers unmatched requests with HTTP 404

use crate::traits::{Plugin, PluginContext, ProxyModelHook, SpecModelHook};
use spec2proxy_common::{ApiProxy, ConditionalFlow, Policy, RaiseFault, Step, TypedPolicy};
use spec2proxy_parser::SpecModel;
use tracing::debug;

pub const NAME: &str = "catch_all";

pub const POLICY_NAME: &str = "RF-HTTP404";
pub const FLOW_NAME: &str = "catch-all";

pub struct CatchAllPlugin;

impl SpecModelHook for CatchAllPlugin {
    fn process_spec_model(
        &self,
        _ctx: &mut PluginContext,
        _model: &mut SpecModel,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

impl ProxyModelHook for CatchAllPlugin {
    fn process_proxy_model(
        &self,
        _ctx: &mut PluginContext,
        proxy: &mut ApiProxy,
    ) -> anyhow::Result<()> {
        if proxy.proxy_endpoints.is_empty() {
            debug!("No proxy endpoint, skipping {}", FLOW_NAME);
            return Ok(());
        }

        proxy.add_policy(Policy::from_typed(TypedPolicy::RaiseFault(
            RaiseFault::with_status(POLICY_NAME, 404),
        )))?;

        let mut flow = ConditionalFlow::new(FLOW_NAME, "true");
        flow.description = Some("Responds HTTP 404".to_string());
        flow.request.push(Step::new(POLICY_NAME, Some("true")));

        if let Some(endpoint) = proxy.default_proxy_endpoint_mut() {
            endpoint.flows.push(flow);
        }
        Ok(())
    }
}

impl Plugin for CatchAllPlugin {
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
