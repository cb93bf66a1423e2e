//! Plugin registry

use crate::apigee_policies::ApigeePoliciesPlugin;
use crate::catch_all::CatchAllPlugin;
use crate::pipeline::PluginError;
use crate::traits::Plugin;
use crate::visibility::VisibilityPlugin;
use tracing::debug;

/// Plugins keyed by unique name, in registration order
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in plugin
    pub fn with_builtins() -> Self {
        let builtins: Vec<Box<dyn Plugin>> = vec![
            Box::new(ApigeePoliciesPlugin),
            Box::new(VisibilityPlugin),
            Box::new(CatchAllPlugin),
        ];
        Self { plugins: builtins }
    }

    /// Register a plugin under its name
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), PluginError> {
        if self.get(plugin.name()).is_some() {
            return Err(PluginError::AlreadyRegistered(plugin.name().to_string()));
        }
        debug!("Registered plugin {}", plugin.name());
        self.plugins.push(plugin);
        Ok(())
    }

    /// Look up a plugin by name
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Registered plugin names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = PluginRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["apigee_policies", "visibility", "catch_all"]
        );
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(Named("custom"))).unwrap();

        let err = registry.register(Box::new(Named("custom"))).unwrap_err();
        assert!(matches!(err, PluginError::AlreadyRegistered(name) if name == "custom"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_unknown_plugin() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.get("missing").is_none());
        assert!(registry.get("visibility").is_some());
    }
}
