use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use super::error::Probe;
use super::resolver::{DirectoryResolver, HostResolver, Resolution, Resolve};

/// Resolution scopes currently open, keyed by correlation id.
#[derive(Debug, Default)]
pub(crate) struct ScopeRegistry {
    active: Mutex<HashMap<Uuid, PathBuf>>,
}

impl ScopeRegistry {
    pub(crate) fn open(
        &self,
        base_dir: &Path,
        host: HostResolver,
        extension: &str,
    ) -> ResolutionScope<'_> {
        let id = Uuid::new_v4();
        self.active
            .lock()
            .expect("scope registry lock poisoned")
            .insert(id, base_dir.to_path_buf());
        debug!(correlation = %id, base_dir = %base_dir.display(), "opened resolution scope");

        ResolutionScope {
            registry: self,
            id,
            resolvers: vec![
                Box::new(host),
                Box::new(DirectoryResolver::new(base_dir, extension)),
            ],
            base_dir: base_dir.to_path_buf(),
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<PathBuf> {
        self.active
            .lock()
            .expect("scope registry lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    fn close(&self, id: &Uuid) {
        self.active
            .lock()
            .expect("scope registry lock poisoned")
            .remove(id);
    }
}

/// Dependency resolution for one validation call.
///
/// Resolvers are consulted in order: host-provided modules first, then the
/// base directory. The scope deregisters itself when dropped, whatever path
/// the call took out.
pub struct ResolutionScope<'a> {
    registry: &'a ScopeRegistry,
    id: Uuid,
    base_dir: PathBuf,
    resolvers: Vec<Box<dyn Resolve>>,
}

impl ResolutionScope<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// First non-declining answer, or every probe that was attempted.
    pub fn resolve(&self, name: &str) -> Result<Resolution, Vec<Probe>> {
        let mut probes = Vec::new();
        for resolver in &self.resolvers {
            match resolver.resolve(name) {
                Resolution::Declined(probe) => probes.push(probe),
                found => return Ok(found),
            }
        }
        Err(probes)
    }
}

impl Drop for ResolutionScope<'_> {
    fn drop(&mut self) {
        self.registry.close(&self.id);
        debug!(correlation = %self.id, "closed resolution scope");
    }
}
