use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rulecheck_core::{CachePolicy, Fingerprint};
use tracing::debug;

use super::module::Module;

struct CacheEntry {
    fingerprint: Fingerprint,
    module: Arc<Module>,
}

/// Path-keyed store of loaded modules.
///
/// Entries are only ever replaced when the policy says they are stale or the
/// caller invalidates them explicitly. No lock is held while a module is being
/// decoded; [`insert`](Self::insert) keeps whichever current entry got there
/// first so concurrent loads of one path still share a single instance.
pub struct ModuleCache {
    policy: CachePolicy,
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
}

impl ModuleCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Cached module for `path`, if still current.
    ///
    /// Under [`CachePolicy::Pinned`] any entry is current and `fingerprint` is
    /// ignored. Under [`CachePolicy::Fingerprint`] the entry must match it.
    pub fn lookup(&self, path: &Path, fingerprint: Option<Fingerprint>) -> Option<Arc<Module>> {
        let entries = self.entries.read().expect("module cache lock poisoned");
        let entry = entries.get(path)?;
        match (self.policy, fingerprint) {
            (CachePolicy::Pinned, _) => Some(Arc::clone(&entry.module)),
            (CachePolicy::Fingerprint, Some(fp)) if fp == entry.fingerprint => {
                Some(Arc::clone(&entry.module))
            }
            (CachePolicy::Fingerprint, Some(_)) => {
                debug!(path = %path.display(), "cached module is stale");
                None
            }
            (CachePolicy::Fingerprint, None) => None,
        }
    }

    /// Entry for `path` regardless of policy.
    pub fn get(&self, path: &Path) -> Option<Arc<Module>> {
        self.entries
            .read()
            .expect("module cache lock poisoned")
            .get(path)
            .map(|entry| Arc::clone(&entry.module))
    }

    /// Store `module` under `path` and return the instance callers should use.
    pub fn insert(&self, path: PathBuf, fingerprint: Fingerprint, module: Module) -> Arc<Module> {
        let mut entries = self.entries.write().expect("module cache lock poisoned");

        if let Some(existing) = entries.get(&path) {
            let current = match self.policy {
                CachePolicy::Pinned => true,
                CachePolicy::Fingerprint => existing.fingerprint == fingerprint,
            };
            if current {
                return Arc::clone(&existing.module);
            }
        }

        let module = Arc::new(module);
        entries.insert(
            path,
            CacheEntry {
                fingerprint,
                module: Arc::clone(&module),
            },
        );
        module
    }

    /// Drop the entry for `path`. Returns whether one existed.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries
            .write()
            .expect("module cache lock poisoned")
            .remove(path)
            .is_some()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .expect("module cache lock poisoned")
            .clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries
            .read()
            .expect("module cache lock poisoned")
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("module cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
