//! Module registry, populated from an explicit registration list at start-up.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{ModuleError, RegistryError};
use crate::module::AnalysisModule;
use crate::modules;

/// All analysis modules known to an engine.
///
/// Names are unique: a second module with an already-registered name is
/// rejected. Iteration is by ascending priority, ties in registration order.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn AnalysisModule>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in module not listed in
    /// `config.modules.disabled`.
    pub fn builtin(config: &Config) -> Self {
        let mut registry = Self::new();
        for factory in modules::builtin_factories() {
            registry.register_with(|| factory(config));
        }
        registry.retain(|name| !config.modules.disabled.iter().any(|d| d == name));
        tracing::debug!("{} analysis module(s) registered", registry.len());
        registry
    }

    /// Add a module.
    pub fn register(&mut self, module: Arc<dyn AnalysisModule>) -> Result<(), RegistryError> {
        if self.contains(module.name()) {
            return Err(RegistryError::DuplicateName(module.name().to_string()));
        }
        tracing::debug!(
            "Module registered: {} (priority {})",
            module.name(),
            module.priority()
        );
        // Stable insertion keeps ties in registration order.
        let pos = self
            .modules
            .partition_point(|m| m.priority() <= module.priority());
        self.modules.insert(pos, module);
        Ok(())
    }

    /// Build a module with a fallible constructor and register it.
    ///
    /// Construction and registration failures are logged and swallowed so one
    /// broken module never keeps the others out.
    pub fn register_with<F>(&mut self, factory: F) -> bool
    where
        F: FnOnce() -> Result<Arc<dyn AnalysisModule>, ModuleError>,
    {
        let result = factory()
            .map_err(RegistryError::from)
            .and_then(|module| self.register(module));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Skipping analysis module: {e}");
                false
            }
        }
    }

    /// Modules in execution order.
    pub fn all(&self) -> &[Arc<dyn AnalysisModule>] {
        &self.modules
    }

    /// Module names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name() == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.modules.retain(|m| keep(m.name()));
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::module::{ModuleInput, DEFAULT_PRIORITY};
    use crate::types::{AnalysisOutcome, ModuleOutput};

    pub(crate) struct Named {
        pub name: &'static str,
        pub priority: Option<i32>,
    }

    impl AnalysisModule for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority.unwrap_or(DEFAULT_PRIORITY)
        }

        fn process(&self, _input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
            Ok(AnalysisOutcome::new().into())
        }
    }

    fn named(name: &'static str, priority: Option<i32>) -> Arc<dyn AnalysisModule> {
        Arc::new(Named { name, priority })
    }

    #[test]
    fn test_sorted_by_priority() {
        let mut registry = ModuleRegistry::new();
        registry.register(named("A", Some(10))).unwrap();
        registry.register(named("B", Some(5))).unwrap();
        registry.register(named("C", None)).unwrap();
        registry.register(named("D", Some(-1))).unwrap();
        assert_eq!(registry.names(), vec!["D", "B", "A", "C"]);
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let mut registry = ModuleRegistry::new();
        registry.register(named("first", None)).unwrap();
        registry.register(named("x", Some(1))).unwrap();
        registry.register(named("second", None)).unwrap();
        registry.register(named("y", Some(1))).unwrap();
        assert_eq!(registry.names(), vec!["x", "y", "first", "second"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ModuleRegistry::new();
        registry.register(named("A", Some(1))).unwrap();
        let err = registry.register(named("A", Some(2))).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "A"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failed_construction_does_not_block_others() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.register_with(|| Ok(named("A", None))));
        assert!(!registry.register_with(|| Err(ModuleError::Construction("boom".into()))));
        assert!(registry.register_with(|| Ok(named("B", None))));
        assert_eq!(registry.names(), vec!["A", "B"]);
    }

    #[test]
    fn test_builtin_registry_is_populated_and_unique() {
        let registry = ModuleRegistry::builtin(&Config::default());
        assert!(!registry.is_empty());
        let mut names = registry.names();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(registry.contains(crate::modules::texture::TEXTURE_MODULE_NAME));
    }

    #[test]
    fn test_builtin_respects_disabled_list() {
        let mut config = Config::default();
        config
            .modules
            .disabled
            .push(crate::modules::texture::TEXTURE_MODULE_NAME.to_string());
        let registry = ModuleRegistry::builtin(&config);
        assert!(!registry.contains(crate::modules::texture::TEXTURE_MODULE_NAME));
    }

    #[test]
    fn test_builtin_order_follows_priorities() {
        let registry = ModuleRegistry::builtin(&Config::default());
        let priorities: Vec<i32> = registry.all().iter().map(|m| m.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
    }
}
