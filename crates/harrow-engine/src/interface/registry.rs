use std::collections::BTreeMap;
use std::sync::Arc;

use super::TestInterface;
use super::atf::AtfInterface;
use super::plain::PlainInterface;
use super::tap::TapInterface;
use crate::error::EngineError;

/// Test interfaces by name.
#[derive(Clone)]
pub struct InterfaceRegistry {
    interfaces: BTreeMap<String, Arc<dyn TestInterface>>,
}

impl InterfaceRegistry {
    /// A registry with no interfaces at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            interfaces: BTreeMap::new(),
        }
    }

    /// A registry holding `atf`, `plain` and `tap`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut interfaces: BTreeMap<String, Arc<dyn TestInterface>> = BTreeMap::new();
        interfaces.insert("atf".to_string(), Arc::new(AtfInterface));
        interfaces.insert("plain".to_string(), Arc::new(PlainInterface));
        interfaces.insert("tap".to_string(), Arc::new(TapInterface));
        Self { interfaces }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        interface: Arc<dyn TestInterface>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        if self.interfaces.contains_key(&name) {
            return Err(EngineError::DuplicateInterface(name));
        }
        tracing::debug!(%name, "registered test interface");
        self.interfaces.insert(name, interface);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn TestInterface>, EngineError> {
        self.interfaces
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownInterface(name.to_string()))
    }

    pub fn ensure_valid(&self, name: &str) -> Result<(), EngineError> {
        self.get(name).map(|_| ())
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.interfaces.keys().cloned().collect()
    }
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for InterfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceRegistry")
            .field("names", &self.names())
            .finish()
    }
}
