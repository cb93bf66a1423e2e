//! Apigee policy extensions
//!
//! Reads policies and flow steps declared in the spec through the
//! `x-Apigee-Policies`, `x-Apigee-PreFlow`, `x-Apigee-PostFlow` and
//! `x-Apigee-Flow` extensions and applies them to the proxy model.

use crate::traits::{Plugin, PluginContext, ProxyModelHook, SpecModelHook};
use anyhow::{bail, Context};
use serde::Deserialize;
use serde_yaml::Value;
use spec2proxy_common::{ApiProxy, ExtensionMap, Policy, Step};
use spec2proxy_parser::SpecModel;
use tracing::debug;

pub const NAME: &str = "apigee_policies";

/// Prefix shared by every extension this plugin reads
const EXTENSION_PREFIX: &str = "x-Apigee-";

const POLICIES: &str = "x-Apigee-Policies";
const PRE_FLOW: &str = "x-Apigee-PreFlow";
const POST_FLOW: &str = "x-Apigee-PostFlow";
const FLOW: &str = "x-Apigee-Flow";

pub struct ApigeePoliciesPlugin;

/// `- Step: {Name, Condition}` as written in the extensions
#[derive(Debug, Deserialize)]
struct StepEntry {
    #[serde(rename = "Step")]
    step: Step,
}

/// Flow fields an extension may override; absent fields are left alone
#[derive(Debug, Default, Deserialize)]
struct FlowOverride {
    #[serde(rename = "Description")]
    description: Option<String>,

    #[serde(rename = "Condition")]
    condition: Option<String>,

    #[serde(rename = "Request")]
    request: Option<Vec<StepEntry>>,

    #[serde(rename = "Response")]
    response: Option<Vec<StepEntry>>,
}

fn steps(entries: Vec<StepEntry>) -> Vec<Step> {
    entries.into_iter().map(|entry| entry.step).collect()
}

/// Resolve and decode one extension, if present
fn decode<T: serde::de::DeserializeOwned>(
    ctx: &mut PluginContext,
    extensions: &ExtensionMap,
    name: &str,
) -> anyhow::Result<Option<T>> {
    let Some(extension) = extensions.get(name) else {
        return Ok(None);
    };

    let value = ctx
        .resolver_mut()
        .resolved(&extension.value)
        .with_context(|| format!("failed to resolve references in {name}"))?;
    let decoded =
        serde_yaml::from_value(value).with_context(|| format!("{name} is not well formed"))?;
    Ok(Some(decoded))
}

fn add_policies(ctx: &mut PluginContext, proxy: &mut ApiProxy) -> anyhow::Result<()> {
    let Some(trees) = decode::<Vec<Value>>(ctx, &proxy.extensions, POLICIES)? else {
        return Ok(());
    };

    for tree in trees {
        let policy =
            Policy::from_value(tree).with_context(|| format!("invalid entry in {POLICIES}"))?;
        debug!("Adding policy {} ({})", policy.name(), policy.kind());
        proxy.add_policy(policy)?;
    }
    Ok(())
}

fn apply_endpoint_flows(ctx: &mut PluginContext, proxy: &mut ApiProxy) -> anyhow::Result<()> {
    let pre_flow = decode::<FlowOverride>(ctx, &proxy.extensions, PRE_FLOW)?;
    let post_flow = decode::<FlowOverride>(ctx, &proxy.extensions, POST_FLOW)?;
    if pre_flow.is_none() && post_flow.is_none() {
        return Ok(());
    }

    let Some(endpoint) = proxy.default_proxy_endpoint_mut() else {
        bail!("{PRE_FLOW} and {POST_FLOW} need a proxy endpoint");
    };

    for (flow, overrides) in [
        (&mut endpoint.pre_flow, pre_flow),
        (&mut endpoint.post_flow, post_flow),
    ] {
        let Some(overrides) = overrides else {
            continue;
        };
        if let Some(description) = overrides.description {
            flow.description = Some(description);
        }
        if let Some(request) = overrides.request {
            flow.request = steps(request);
        }
        if let Some(response) = overrides.response {
            flow.response = steps(response);
        }
    }
    Ok(())
}

fn apply_conditional_flows(ctx: &mut PluginContext, proxy: &mut ApiProxy) -> anyhow::Result<()> {
    for endpoint in &mut proxy.proxy_endpoints {
        for flow in &mut endpoint.flows {
            let overrides = decode::<FlowOverride>(ctx, &flow.extensions, FLOW)
                .with_context(|| format!("flow {}", flow.name))?;
            let Some(overrides) = overrides else {
                continue;
            };

            if let Some(description) = overrides.description {
                flow.description = Some(description);
            }
            if let Some(condition) = overrides.condition {
                flow.condition = condition;
            }
            if let Some(request) = overrides.request {
                flow.request = steps(request);
            }
            if let Some(response) = overrides.response {
                flow.response = steps(response);
            }
        }
    }
    Ok(())
}

impl SpecModelHook for ApigeePoliciesPlugin {
    fn process_spec_model(
        &self,
        ctx: &mut PluginContext,
        model: &mut SpecModel,
    ) -> anyhow::Result<()> {
        for extensions in model.extension_maps_mut() {
            for (name, value) in extensions.iter_mut() {
                if !name.starts_with(EXTENSION_PREFIX) {
                    continue;
                }
                ctx.resolver_mut()
                    .resolve(value)
                    .with_context(|| format!("failed to resolve references in {name}"))?;
            }
        }
        Ok(())
    }
}

impl ProxyModelHook for ApigeePoliciesPlugin {
    fn process_proxy_model(
        &self,
        ctx: &mut PluginContext,
        proxy: &mut ApiProxy,
    ) -> anyhow::Result<()> {
        add_policies(ctx, proxy)?;
        apply_endpoint_flows(ctx, proxy)?;
        apply_conditional_flows(ctx, proxy)
    }
}

impl Plugin for ApigeePoliciesPlugin {
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
