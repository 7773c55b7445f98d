use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// Controller-Scoped Stores
// ============================================================================
//
// Collaborator state that lives exactly as long as one controller: option
// lists for the filter dropdowns, remembered lookups and the like. The
// controller owns them through `Arc<dyn ScopedStore>` and calls `reset()` on
// teardown and whenever it resets its filter to defaults.
//
// ============================================================================

/// Trait for stores whose contents must not outlive the controller using them.
pub trait ScopedStore: Send + Sync {
    /// Name used in logs.
    fn store_name(&self) -> &str;

    /// Drop everything cached so far.
    fn reset(&self);
}

/// Keyed cache of label lookups (provider names, service titles, ...).
pub struct LookupCache {
    name: String,
    entries: RwLock<HashMap<String, String>>,
}

impl LookupCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: impl Into<String>, label: impl Into<String>) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key.into(), label.into());
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key.into(), label.into());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScopedStore for LookupCache {
    fn store_name(&self) -> &str {
        &self.name
    }

    fn reset(&self) {
        let cleared = match self.entries.write() {
            Ok(mut entries) => {
                let count = entries.len();
                entries.clear();
                count
            }
            Err(poisoned) => {
                let mut entries = poisoned.into_inner();
                let count = entries.len();
                entries.clear();
                count
            }
        };
        tracing::debug!(store = %self.name, cleared, "Scoped store reset");
    }
}
