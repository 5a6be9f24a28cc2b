use std::path::{Path, PathBuf};
use std::sync::Arc;

use rulecheck_core::{Fingerprint, ModuleImage, ModuleRef, TypeDef};

/// A loaded, linked module.
///
/// Immutable once built; shared as `Arc<Module>` between the cache and every
/// module that links against it.
#[derive(Debug)]
pub struct Module {
    path: PathBuf,
    fingerprint: Fingerprint,
    image: ModuleImage,
    dependencies: Vec<Arc<Module>>,
    host_references: Vec<String>,
    load_id: u64,
}

impl Module {
    pub(crate) fn new(
        path: PathBuf,
        fingerprint: Fingerprint,
        image: ModuleImage,
        dependencies: Vec<Arc<Module>>,
        host_references: Vec<String>,
        load_id: u64,
    ) -> Self {
        Self {
            path,
            fingerprint,
            image,
            dependencies,
            host_references,
            load_id,
        }
    }

    /// Absolute path the image was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fingerprint of the image bytes this module was decoded from.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn name(&self) -> &str {
        &self.image.name
    }

    pub fn image(&self) -> &ModuleImage {
        &self.image
    }

    pub fn types(&self) -> &[TypeDef] {
        &self.image.types
    }

    pub fn references(&self) -> &[ModuleRef] {
        &self.image.references
    }

    pub fn references_module(&self, name: &str) -> bool {
        self.image.references_module(name)
    }

    /// Modules linked from image files, in reference order.
    pub fn dependencies(&self) -> &[Arc<Module>] {
        &self.dependencies
    }

    /// References satisfied by the host process.
    pub fn host_references(&self) -> &[String] {
        &self.host_references
    }

    /// Process-unique id assigned when the image was decoded. A cache hit
    /// returns the same id; a reload gets a new one.
    pub fn load_id(&self) -> u64 {
        self.load_id
    }

    /// Find a type in this module, then in linked dependencies (depth first).
    pub fn find_type(&self, name: &str) -> Option<&TypeDef> {
        self.image.find_type(name).or_else(|| {
            self.dependencies
                .iter()
                .find_map(|dep| dep.find_type(name))
        })
    }
}
