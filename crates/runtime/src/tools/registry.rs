//! Session-wide tool catalog.

use super::{ToolError, ToolTransport};
use crate::model::ToolSpec;
use crate::{Error, Result};
use tracing::{info, warn};

/// The tools a session may call, fetched once from the tool host.
///
/// Read-only after construction; names are unique.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    /// Query the host's catalog. Any failure is a connection error.
    pub async fn discover<T: ToolTransport>(transport: &T) -> Result<Self> {
        let specs = transport.list_tools().await.map_err(|e| match e {
            ToolError::Connection(msg) => Error::Connection(msg),
            other => Error::Connection(format!("tool catalog unavailable: {other}")),
        })?;
        let registry = Self::from_specs(specs);
        info!(tools = ?registry.names(), "discovered tools");
        Ok(registry)
    }

    /// Build a registry from known specs. Later duplicates of a name are dropped.
    pub fn from_specs(specs: impl IntoIterator<Item = ToolSpec>) -> Self {
        let mut unique: Vec<ToolSpec> = Vec::new();
        for spec in specs {
            if unique.iter().any(|s| s.name == spec.name) {
                warn!(tool = %spec.name, "duplicate tool name ignored");
                continue;
            }
            unique.push(spec);
        }
        Self { specs: unique }
    }

    /// All descriptors, in catalog order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, spec};

    #[tokio::test]
    async fn discover_caches_catalog() {
        let transport = FakeTransport::new(vec![spec("calculate"), spec("ask_ai")]);
        let registry = ToolRegistry::discover(&transport).await.unwrap();

        assert_eq!(registry.names(), ["calculate", "ask_ai"]);
        assert!(registry.contains("ask_ai"));
        assert!(!registry.contains("echo"));
        assert_eq!(transport.list_count(), 1);
    }

    #[tokio::test]
    async fn discover_failure_is_connection_error() {
        let transport = FakeTransport::new(vec![]).fail_listing();
        let err = ToolRegistry::discover(&transport).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn duplicate_names_keep_first() {
        let mut second = spec("calculate");
        second.description = "shadow".into();
        let registry = ToolRegistry::from_specs(vec![spec("calculate"), second]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("calculate").unwrap().description, "calculate tool");
    }

    #[test]
    fn empty_registry() {
        let registry = ToolRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.specs().is_empty());
    }
}
