//! Error types for module loading and dependency resolution.

use std::fmt;
use std::path::PathBuf;

use rulecheck_core::CoreError;

/// Errors that can occur while loading a module image.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The requested image could not be read.
    #[error("failed to read module image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested image could not be decoded.
    #[error("failed to decode module image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    /// One or more referenced modules could not be resolved.
    #[error(transparent)]
    Unresolved(#[from] DependencyResolutionFailure),
}

/// Why a single probe did not produce a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    NotFound,
    Unreadable(String),
    Malformed(String),
    NameMismatch { found: String },
    /// The reference is not a plain module name.
    InvalidName,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
            Self::Malformed(e) => write!(f, "malformed image: {e}"),
            Self::NameMismatch { found } => {
                write!(f, "image declares module '{found}' instead")
            }
            Self::InvalidName => write!(f, "not a plain module name"),
        }
    }
}

/// One attempted location for a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Which resolver made the attempt (`host`, `directory`).
    pub resolver: &'static str,
    pub location: String,
    pub outcome: ProbeOutcome,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.resolver, self.location, self.outcome)
    }
}

/// A single reference that could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// Name of the missing module.
    pub name: String,
    /// Module whose reference triggered the resolution.
    pub requested_by: String,
    pub probes: Vec<Probe>,
}

impl ResolutionFailure {
    pub fn message(&self) -> String {
        format!(
            "Could not load module '{}' referenced by '{}' or one of its dependencies.",
            self.name, self.requested_by
        )
    }

    /// Probe log, one attempted location per line. `None` when nothing was probed.
    pub fn trace(&self) -> Option<String> {
        if self.probes.is_empty() {
            return None;
        }
        let lines: Vec<String> = self.probes.iter().map(|p| format!("  {p}")).collect();
        Some(lines.join("\n"))
    }
}

/// Fatal failure: the module could be read but not linked.
///
/// Aggregates every unresolved reference reachable from the module, each with
/// the locations that were probed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyResolutionFailure {
    pub module: String,
    pub path: PathBuf,
    pub failures: Vec<ResolutionFailure>,
}

impl DependencyResolutionFailure {
    pub fn message(&self) -> String {
        format!(
            "Unable to load one or more of the requested types of module '{}' ({}).",
            self.module,
            self.path.display()
        )
    }

    /// Names of the modules that could not be resolved, in discovery order.
    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.name.as_str())
    }
}

impl fmt::Display for DependencyResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message())?;
        writeln!(f)?;
        write!(f, "Loader failures:")?;
        for failure in &self.failures {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "{}", failure.message())?;
            if let Some(trace) = failure.trace() {
                writeln!(f)?;
                writeln!(f, "Probe log:")?;
                write!(f, "{trace}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for DependencyResolutionFailure {}
