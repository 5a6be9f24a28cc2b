//! Core [`ModuleLoader`]: in-memory image loading, caching, and linking.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rulecheck_core::{codec, CachePolicy, Config, Fingerprint, ModuleImage};
use tracing::{debug, info, warn};

use super::cache::ModuleCache;
use super::error::{
    DependencyResolutionFailure, LoadError, Probe, ProbeOutcome, ResolutionFailure,
};
use super::module::Module;
use super::resolver::{HostResolver, Resolution};
use super::scope::{ResolutionScope, ScopeRegistry};

static NEXT_LOAD_ID: AtomicU64 = AtomicU64::new(1);

/// Loads module images and links their references.
///
/// Every top-level load runs inside a [`ResolutionScope`] bound to the
/// directory of the requested image; dependencies are looked up there (after
/// host-provided modules) and go through the same cache as top-level loads.
pub struct ModuleLoader {
    extension: String,
    host_modules: Vec<String>,
    cache: ModuleCache,
    scopes: ScopeRegistry,
    loads: AtomicU64,
}

impl ModuleLoader {
    pub fn new(config: &Config) -> Self {
        Self {
            extension: config.binary_extension.clone(),
            host_modules: config.host_modules.clone(),
            cache: ModuleCache::new(config.cache_policy),
            scopes: ScopeRegistry::default(),
            loads: AtomicU64::new(0),
        }
    }

    /// Treat references to `name` as satisfied by the host process.
    pub fn with_host_module(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.host_modules.contains(&name) {
            self.host_modules.push(name);
        }
        self
    }

    /// Open a resolution scope for `base_dir`. Released when the guard drops.
    pub fn open_scope(&self, base_dir: &Path) -> ResolutionScope<'_> {
        let host = HostResolver::new(self.host_modules.iter().cloned());
        self.scopes.open(base_dir, host, &self.extension)
    }

    /// Canonicalize `path` and open a scope for the directory containing it.
    pub fn scope_for(&self, path: &Path) -> Result<(PathBuf, ResolutionScope<'_>), LoadError> {
        let path = canonical(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("/")).to_path_buf();
        let scope = self.open_scope(&base_dir);
        Ok((path, scope))
    }

    /// Load `path` inside a scope of its own.
    pub fn load(&self, path: &Path) -> Result<Arc<Module>, LoadError> {
        let (path, scope) = self.scope_for(path)?;
        self.load_in(&scope, &path)
    }

    /// Load `path`, resolving its references through `scope`.
    pub fn load_in(&self, scope: &ResolutionScope<'_>, path: &Path) -> Result<Arc<Module>, LoadError> {
        let path = canonical(path)?;
        match self.fetch(&path)? {
            Fetched::Cached(module) => Ok(module),
            Fetched::Decoded { fingerprint, image } => self.link(scope, path, fingerprint, image),
        }
    }

    /// Load `path` only if `wanted` accepts its decoded image.
    ///
    /// References are linked after the check, so an image that is turned
    /// away never has its dependencies resolved and is not cached.
    pub fn load_if(
        &self,
        scope: &ResolutionScope<'_>,
        path: &Path,
        wanted: impl FnOnce(&ModuleImage) -> bool,
    ) -> Result<Option<Arc<Module>>, LoadError> {
        let path = canonical(path)?;
        match self.fetch(&path)? {
            Fetched::Cached(module) => Ok(wanted(module.image()).then_some(module)),
            Fetched::Decoded { fingerprint, image } => {
                if !wanted(&image) {
                    debug!(module = %image.name, "module not wanted, skipping link");
                    return Ok(None);
                }
                self.link(scope, path, fingerprint, image).map(Some)
            }
        }
    }

    /// Current cached module for `path`, or its freshly decoded image.
    fn fetch(&self, path: &Path) -> Result<Fetched, LoadError> {
        if let Some(module) = self.cache.lookup(path, None) {
            debug!(module = %module.name(), load_id = module.load_id(), "module cache hit");
            return Ok(Fetched::Cached(module));
        }

        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fingerprint = codec::fingerprint(&bytes);
        if let Some(module) = self.current(path, fingerprint) {
            debug!(module = %module.name(), load_id = module.load_id(), "module cache hit");
            return Ok(Fetched::Cached(module));
        }

        let image = codec::decode(&bytes).map_err(|source| LoadError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Fetched::Decoded { fingerprint, image })
    }

    /// Cached module for `path` if it matches `fingerprint` and, under
    /// [`CachePolicy::Fingerprint`], none of its dependencies were rebuilt.
    fn current(&self, path: &Path, fingerprint: Fingerprint) -> Option<Arc<Module>> {
        let module = self.cache.lookup(path, Some(fingerprint))?;
        if self.cache.policy() == CachePolicy::Fingerprint && !dependencies_current(&module) {
            debug!(module = %module.name(), "cached module has rebuilt dependencies");
            self.cache.invalidate(path);
            return None;
        }
        Some(module)
    }

    fn link(
        &self,
        scope: &ResolutionScope<'_>,
        path: PathBuf,
        fingerprint: Fingerprint,
        image: ModuleImage,
    ) -> Result<Arc<Module>, LoadError> {
        let mut linker = Linker::new(self, scope, &image.name);
        let (dependencies, hosted) = linker.link(&image);
        if !linker.failures.is_empty() {
            let failure = DependencyResolutionFailure {
                module: image.name.clone(),
                path,
                failures: linker.failures,
            };
            warn!(
                module = %failure.module,
                missing = ?failure.missing().collect::<Vec<_>>(),
                "module has unresolved dependencies"
            );
            return Err(failure.into());
        }

        let module = self.build(path.clone(), fingerprint, image, dependencies, hosted);
        info!(
            module = %module.name(),
            path = %path.display(),
            load_id = module.load_id(),
            fingerprint = %fingerprint,
            "loaded module"
        );
        Ok(self.cache.insert(path, fingerprint, module))
    }

    fn build(
        &self,
        path: PathBuf,
        fingerprint: Fingerprint,
        image: ModuleImage,
        dependencies: Vec<Arc<Module>>,
        hosted: Vec<String>,
    ) -> Module {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let load_id = NEXT_LOAD_ID.fetch_add(1, Ordering::Relaxed);
        Module::new(path, fingerprint, image, dependencies, hosted, load_id)
    }

    /// Forget the cached module for `path` and the dependencies it linked,
    /// so the next load decodes all of them again.
    pub fn invalidate(&self, path: &Path) -> bool {
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let Some(module) = self.cache.get(&path) else {
            return false;
        };

        let mut paths = Vec::new();
        dependency_paths(&module, &mut paths);
        for dependency in &paths {
            self.cache.invalidate(dependency);
        }
        let removed = self.cache.invalidate(&path);
        debug!(
            path = %path.display(),
            dependencies = paths.len(),
            "invalidated cached module"
        );
        removed
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Number of images decoded by this loader (cache hits excluded).
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Base directories of the resolution scopes currently open.
    pub fn active_scopes(&self) -> Vec<PathBuf> {
        self.scopes.snapshot()
    }
}

enum Fetched {
    Cached(Arc<Module>),
    Decoded {
        fingerprint: Fingerprint,
        image: ModuleImage,
    },
}

/// Whether every image `module` was linked against is unchanged on disk.
fn dependencies_current(module: &Module) -> bool {
    module.dependencies().iter().all(|dependency| {
        let unchanged = fs::read(dependency.path())
            .map(|bytes| codec::fingerprint(&bytes) == dependency.fingerprint())
            .unwrap_or(false);
        unchanged && dependencies_current(dependency)
    })
}

fn dependency_paths(module: &Module, paths: &mut Vec<PathBuf>) {
    for dependency in module.dependencies() {
        if !paths.iter().any(|p| p == dependency.path()) {
            paths.push(dependency.path().to_path_buf());
            dependency_paths(dependency, paths);
        }
    }
}

fn canonical(path: &Path) -> Result<PathBuf, LoadError> {
    fs::canonicalize(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Transitive reference resolution for one top-level load.
///
/// Collects every unresolved reference instead of stopping at the first, so
/// the final failure lists all of them.
struct Linker<'l> {
    loader: &'l ModuleLoader,
    scope: &'l ResolutionScope<'l>,
    /// Modules currently being linked; a reference back into this chain is a
    /// cycle and is not followed.
    stack: Vec<String>,
    failures: Vec<ResolutionFailure>,
}

impl<'l> Linker<'l> {
    fn new(loader: &'l ModuleLoader, scope: &'l ResolutionScope<'l>, root: &str) -> Self {
        Self {
            loader,
            scope,
            stack: vec![root.to_string()],
            failures: Vec::new(),
        }
    }

    fn link(&mut self, image: &ModuleImage) -> (Vec<Arc<Module>>, Vec<String>) {
        let mut dependencies = Vec::new();
        let mut hosted = Vec::new();

        for reference in &image.references {
            let name = reference.name.as_str();
            if self.stack.iter().any(|s| s == name) {
                debug!(module = %image.name, reference = %name, "skipping cyclic reference");
                continue;
            }

            match self.scope.resolve(name) {
                Ok(Resolution::Host) => hosted.push(name.to_string()),
                Ok(Resolution::Image { path, bytes }) => {
                    if let Some(module) = self.load_dependency(name, &image.name, path, bytes) {
                        dependencies.push(module);
                    }
                }
                Ok(Resolution::Declined(probe)) => self.fail(name, &image.name, vec![probe]),
                Err(probes) => self.fail(name, &image.name, probes),
            }
        }

        (dependencies, hosted)
    }

    fn load_dependency(
        &mut self,
        name: &str,
        requested_by: &str,
        path: PathBuf,
        bytes: Vec<u8>,
    ) -> Option<Arc<Module>> {
        let fingerprint = codec::fingerprint(&bytes);
        if let Some(module) = self.loader.current(&path, fingerprint) {
            return Some(module);
        }

        let probe = |outcome| Probe {
            resolver: "directory",
            location: path.display().to_string(),
            outcome,
        };

        let image = match codec::decode(&bytes) {
            Ok(image) => image,
            Err(e) => {
                let probes = vec![probe(ProbeOutcome::Malformed(e.to_string()))];
                self.fail(name, requested_by, probes);
                return None;
            }
        };
        if image.name != name {
            let probes = vec![probe(ProbeOutcome::NameMismatch {
                found: image.name.clone(),
            })];
            self.fail(name, requested_by, probes);
            return None;
        }

        let failures_before = self.failures.len();
        self.stack.push(name.to_string());
        let (dependencies, hosted) = self.link(&image);
        self.stack.pop();
        if self.failures.len() > failures_before {
            return None;
        }

        let module = self.loader.build(path.clone(), fingerprint, image, dependencies, hosted);
        debug!(
            module = %name,
            requested_by = %requested_by,
            load_id = module.load_id(),
            "linked dependency"
        );
        Some(self.loader.cache.insert(path, fingerprint, module))
    }

    fn fail(&mut self, name: &str, requested_by: &str, probes: Vec<Probe>) {
        warn!(module = %name, requested_by = %requested_by, "dependency not resolved");
        self.failures.push(ResolutionFailure {
            name: name.to_string(),
            requested_by: requested_by.to_string(),
            probes,
        });
    }
}
