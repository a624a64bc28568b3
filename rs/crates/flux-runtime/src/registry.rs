//! Component registry: kind → factory.
//!
//! Built once at startup, then frozen behind an `Arc` inside the runtime,
//! so lookups are lock-free and safe from any thread.

use std::collections::HashMap;

use crate::component::{Component, Erased, ErasedComponent};
use crate::error::{FluxError, Result};

/// Creates zero values and restores snapshots for one kind.
#[derive(Clone, Copy)]
pub struct Factory {
    kind: &'static str,
    create: fn() -> Box<dyn ErasedComponent>,
    restore: fn(serde_json::Value) -> std::result::Result<Box<dyn ErasedComponent>, serde_json::Error>,
}

impl Factory {
    fn of<C: Component>() -> Self {
        fn create<C: Component>() -> Box<dyn ErasedComponent> {
            Box::new(Erased(C::default()))
        }
        fn restore<C: Component>(
            state: serde_json::Value,
        ) -> std::result::Result<Box<dyn ErasedComponent>, serde_json::Error> {
            Ok(Box::new(Erased(serde_json::from_value::<C>(state)?)))
        }

        Factory {
            kind: C::KIND,
            create: create::<C>,
            restore: restore::<C>,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub(crate) fn create(&self) -> Box<dyn ErasedComponent> {
        (self.create)()
    }

    pub(crate) fn restore(
        &self,
        state: serde_json::Value,
    ) -> std::result::Result<Box<dyn ErasedComponent>, serde_json::Error> {
        (self.restore)(state)
    }
}

#[derive(Default)]
pub struct Registry {
    factories: HashMap<&'static str, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `C` under `C::KIND`. A kind can only be registered once.
    pub fn register<C: Component>(&mut self) -> Result<()> {
        if self.factories.contains_key(C::KIND) {
            return Err(FluxError::KindConflict(C::KIND.to_string()));
        }
        self.factories.insert(C::KIND, Factory::of::<C>());
        Ok(())
    }

    pub fn lookup(&self, kind: &str) -> Result<Factory> {
        self.factories
            .get(kind)
            .copied()
            .ok_or_else(|| FluxError::UnknownKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Counter;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry.register::<Counter>().unwrap();

        let factory = registry.lookup("test_counter").unwrap();
        assert_eq!(factory.kind(), "test_counter");
        assert_eq!(registry.kinds(), vec!["test_counter"]);
    }

    #[test]
    fn test_duplicate_kind_conflicts() {
        let mut registry = Registry::new();
        registry.register::<Counter>().unwrap();
        let err = registry.register::<Counter>().unwrap_err();
        assert!(matches!(err, FluxError::KindConflict(kind) if kind == "test_counter"));
    }

    #[test]
    fn test_unknown_kind() {
        let registry = Registry::new();
        assert!(matches!(registry.lookup("nope"), Err(FluxError::UnknownKind(_))));
    }

    #[test]
    fn test_factory_roundtrips_state() {
        let mut registry = Registry::new();
        registry.register::<Counter>().unwrap();
        let factory = registry.lookup("test_counter").unwrap();

        let zero = factory.create().snapshot().unwrap();
        assert_eq!(zero["count"], 0);

        let restored = factory
            .restore(serde_json::json!({ "count": 7, "mounts": 1, "label": "x" }))
            .unwrap();
        assert_eq!(restored.snapshot().unwrap()["count"], 7);
    }
}
