//! Exchange registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use sync_core::{error::SyncError, traits::ExchangeAdapter};

/// Adapters keyed by their lowercase id.
#[derive(Default, Clone)]
pub struct ExchangeRegistry {
    adapters: BTreeMap<String, Arc<dyn ExchangeAdapter>>,
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under its id, replacing any previous adapter.
    pub fn register(&mut self, adapter: Arc<dyn ExchangeAdapter>) {
        self.adapters.insert(adapter.id().to_lowercase(), adapter);
    }

    /// Look up an adapter. Unknown ids are [`SyncError::AdapterUnavailable`].
    pub fn get(&self, id: &str) -> Result<Arc<dyn ExchangeAdapter>, SyncError> {
        self.adapters
            .get(&id.to_lowercase())
            .cloned()
            .ok_or_else(|| SyncError::AdapterUnavailable(id.to_string()))
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn ExchangeAdapter>> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
