//! Process-wide keyed instance registry
//!
//! Memoizes expensive per-chain singletons (node pools, wallets) behind a
//! string key so independent subsystems share one instance per endpoint set.

use lazy_static::lazy_static;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

lazy_static! {
    static ref INSTANCES: InstanceRegistry = InstanceRegistry::new();
}

/// Registry mapping string keys to lazily constructed instances
pub struct InstanceRegistry {
    state: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Return the instance stored under `key`, constructing it with
    /// `factory` on first use.
    ///
    /// The factory runs under the registry lock, so it must not block on
    /// other registry calls. A key reused with a different type gets a
    /// fresh instance which replaces the stored one.
    pub fn get_or_create<T, F>(&self, key: &str, factory: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Arc<T>,
    {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(existing) = state.get(key) {
            if let Ok(typed) = existing.clone().downcast::<T>() {
                return typed;
            }
        }
        debug!("Creating new registry instance for key {}", key);
        let created = factory();
        state.insert(key.to_string(), created.clone());
        created
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch-or-create against the process-wide registry
pub fn instance<T, F>(key: &str, factory: F) -> Arc<T>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> Arc<T>,
{
    INSTANCES.get_or_create(key, factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_factory_runs_once_per_key() {
        let registry = InstanceRegistry::new();
        let calls = AtomicUsize::new(0);

        let first = registry.get_or_create("chain-2", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Arc::new(String::from("pool"))
        });
        let second = registry.get_or_create("chain-2", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Arc::new(String::from("other"))
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_distinct_keys_get_distinct_instances() {
        let registry = InstanceRegistry::new();
        let a = registry.get_or_create("chain-2", || Arc::new(2u64));
        let b = registry.get_or_create("chain-6", || Arc::new(6u64));
        assert_eq!((*a, *b), (2, 6));
    }
}
