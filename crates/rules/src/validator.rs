//! The validation entry point: load a module, compile its rules.

use std::path::Path;
use std::sync::Arc;

use rulecheck_core::Config;
use tracing::{debug, info, warn};

use crate::compiler::{self, CompilationError, RuleSite, RuleSubsystem};
use crate::error::ValidateError;
use crate::loader::{LoadError, Module, ModuleLoader, ResolutionScope};

/// Validates module images against one rule subsystem.
///
/// Holds the module cache, so keep one `Validator` alive across builds to
/// avoid reloading unchanged modules.
pub struct Validator {
    loader: ModuleLoader,
    subsystem: Arc<dyn RuleSubsystem>,
}

impl Validator {
    /// The subsystem's own module is treated as host-provided.
    pub fn new(config: &Config, subsystem: Arc<dyn RuleSubsystem>) -> Self {
        let loader = ModuleLoader::new(config).with_host_module(subsystem.module_name());
        Self { loader, subsystem }
    }

    /// Validate the module image at `path`.
    ///
    /// Returns one message per rule that failed to compile, in discovery
    /// order; an empty list means every rule compiled. Unresolvable
    /// dependencies and faults outside the rule subsystem are returned as
    /// errors instead.
    pub fn validate(&self, path: &Path) -> Result<Vec<String>, ValidateError> {
        Ok(self
            .check(path)?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    /// Like [`validate`](Self::validate), keeping the structured errors.
    pub fn check(&self, path: &Path) -> Result<Vec<CompilationError>, ValidateError> {
        let (path, scope) = self.loader.scope_for(path)?;
        let correlation = scope.id();
        debug!(correlation = %correlation, path = %path.display(), "validating module");

        let Some(module) = self.relevant(&scope, &path)? else {
            debug!(correlation = %correlation, "module does not reference the rule subsystem");
            return Ok(Vec::new());
        };
        let errors = compiler::compile_module(&module, self.subsystem.as_ref())?;

        if errors.is_empty() {
            info!(correlation = %correlation, module = %module.name(), "all rules compiled");
        } else {
            warn!(
                correlation = %correlation,
                module = %module.name(),
                count = errors.len(),
                "rules failed to compile"
            );
        }
        Ok(errors)
    }

    /// Rule annotations found in the module at `path`, without compiling them.
    pub fn rule_sites(&self, path: &Path) -> Result<Vec<RuleSite>, ValidateError> {
        let (path, scope) = self.loader.scope_for(path)?;
        Ok(match self.relevant(&scope, &path)? {
            Some(module) => compiler::rule_sites(&module, self.subsystem.as_ref()),
            None => Vec::new(),
        })
    }

    /// Load `path` if it references the subsystem's module. Dependencies of
    /// a module that does not are never resolved.
    fn relevant(
        &self,
        scope: &ResolutionScope<'_>,
        path: &Path,
    ) -> Result<Option<Arc<Module>>, LoadError> {
        let subsystem = self.subsystem.module_name();
        self.loader
            .load_if(scope, path, |image| image.references_module(subsystem))
    }

    /// Drop the cached module for `path`, e.g. after a rebuild.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.loader.invalidate(path)
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    pub fn subsystem(&self) -> &dyn RuleSubsystem {
        self.subsystem.as_ref()
    }
}
