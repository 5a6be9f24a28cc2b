use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::{Probe, ProbeOutcome};

/// Outcome of asking one resolver for a module.
#[derive(Debug)]
pub enum Resolution {
    /// Provided by the host process; nothing to load.
    Host,
    /// Image bytes read from `path`.
    Image { path: PathBuf, bytes: Vec<u8> },
    /// This resolver cannot provide the module.
    Declined(Probe),
}

/// A source of dependency modules, consulted in order until one answers.
pub trait Resolve: Send + Sync {
    fn resolve(&self, name: &str) -> Resolution;
}

/// Satisfies references to modules the host process already provides.
#[derive(Debug, Clone, Default)]
pub struct HostResolver {
    names: HashSet<String>,
}

impl HostResolver {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Resolve for HostResolver {
    fn resolve(&self, name: &str) -> Resolution {
        if self.names.contains(name) {
            Resolution::Host
        } else {
            Resolution::Declined(Probe {
                resolver: "host",
                location: "host modules".to_string(),
                outcome: ProbeOutcome::NotFound,
            })
        }
    }
}

/// Looks for `<base_dir>/<name>.<extension>` and nowhere else.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    base_dir: PathBuf,
    extension: String,
}

impl DirectoryResolver {
    pub fn new(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Image path for `name`, or `None` if `name` is not a single plain file
    /// name and would leave `base_dir`.
    pub fn candidate(&self, name: &str) -> Option<PathBuf> {
        plain_name(name).then(|| self.base_dir.join(format!("{}.{}", name, self.extension)))
    }
}

fn plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}

impl Resolve for DirectoryResolver {
    fn resolve(&self, name: &str) -> Resolution {
        let Some(path) = self.candidate(name) else {
            warn!(module = %name, "refusing to resolve module name outside the scope directory");
            return Resolution::Declined(Probe {
                resolver: "directory",
                location: self.base_dir.display().to_string(),
                outcome: ProbeOutcome::InvalidName,
            });
        };
        let declined = |outcome| {
            Resolution::Declined(Probe {
                resolver: "directory",
                location: path.display().to_string(),
                outcome,
            })
        };

        match fs::read(&path) {
            Ok(bytes) => {
                debug!(module = %name, path = %path.display(), "resolved dependency image");
                // Keep cache keys consistent with top-level loads.
                let path = fs::canonicalize(&path).unwrap_or(path);
                Resolution::Image { path, bytes }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => declined(ProbeOutcome::NotFound),
            Err(e) => declined(ProbeOutcome::Unreadable(e.to_string())),
        }
    }
}
