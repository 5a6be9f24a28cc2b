//! Reflective rule compilation.
//!
//! Walks every type and field of a loaded [`Module`], picks out annotations
//! carrying the rule subsystem's base marker, and asks the subsystem to
//! compile each one against its declaring type. Rule failures are collected
//! in discovery order; any other fault aborts the walk.

mod context;

#[cfg(test)]
mod tests;

use std::error::Error as StdError;
use std::fmt;

use rulecheck_core::{Annotation, FieldDef, TypeDef};
use tracing::{debug, info};

use crate::error::ValidateError;
use crate::loader::Module;

pub use context::{DeclaringType, Member};

// ── Capability traits ───────────────────────────────────────────────

/// A rule-expression language, as seen by the engine.
///
/// Modules opt in by referencing [`module_name`](Self::module_name); fields
/// opt in by carrying annotations whose base is [`marker`](Self::marker).
pub trait RuleSubsystem: Send + Sync {
    /// Module name user modules reference to use this subsystem.
    fn module_name(&self) -> &str;

    /// Base marker name identifying rule annotations.
    fn marker(&self) -> &str;

    /// Attach the compile capability to a marked annotation. `None` means the
    /// annotation carries the marker but the subsystem has no rule by that name.
    fn bind<'a>(&'a self, annotation: &'a Annotation) -> Option<Box<dyn RuleAttribute + 'a>>;
}

/// One bound rule annotation.
pub trait RuleAttribute {
    fn name(&self) -> &str;

    fn expression(&self) -> &str;

    /// Statically check the expression against its declaring type.
    fn compile(&self, declaring: &DeclaringType<'_>) -> Result<(), AttributeFault>;
}

// ── Faults ──────────────────────────────────────────────────────────

/// Category of a rule compile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleErrorKind {
    Syntax,
    UnresolvedSymbol,
    Arity,
    TypeMismatch,
    Other,
}

/// A rule expression failed to compile. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RuleError {
    pub kind: RuleErrorKind,
    pub message: String,
    /// 1-based column in the expression, when known.
    pub column: Option<usize>,
}

impl RuleError {
    pub fn new(kind: RuleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            column: None,
        }
    }

    pub fn at(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

/// What a [`RuleAttribute::compile`] call can fail with.
///
/// Only [`AttributeFault::Rule`] is turned into a reported error; anything
/// else means the attribute itself is broken and propagates.
#[derive(Debug, thiserror::Error)]
pub enum AttributeFault {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("{0}")]
    Unclassified(Box<dyn StdError + Send + Sync>),
}

// ── Results ─────────────────────────────────────────────────────────

/// A rule that failed to compile, with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationError {
    pub type_name: String,
    pub field: String,
    pub attribute: String,
    pub expression: String,
    pub error: RuleError,
}

impl CompilationError {
    pub fn message(&self) -> &str {
        &self.error.message
    }
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} [{}(\"{}\")]: {}",
            self.type_name, self.field, self.attribute, self.expression, self.error.message
        )
    }
}

/// A rule annotation discovered in a module, compiled or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSite {
    pub type_name: String,
    pub field: String,
    pub attribute: String,
    pub expression: Option<String>,
}

// ── Public API ──────────────────────────────────────────────────────

/// Every marked annotation in `module`, in type, field, annotation order.
fn candidates<'a>(
    module: &'a Module,
    marker: &'a str,
) -> impl Iterator<Item = (&'a TypeDef, &'a FieldDef, &'a Annotation)> + 'a {
    module.types().iter().flat_map(move |ty| {
        ty.fields.iter().flat_map(move |field| {
            field
                .annotations
                .iter()
                .filter(move |a| a.has_base(marker))
                .map(move |a| (ty, field, a))
        })
    })
}

/// Whether `module` opts into `subsystem` at all.
pub fn is_relevant(module: &Module, subsystem: &dyn RuleSubsystem) -> bool {
    module.references_module(subsystem.module_name())
}

/// List the rule annotations `subsystem` would compile in `module`.
pub fn rule_sites(module: &Module, subsystem: &dyn RuleSubsystem) -> Vec<RuleSite> {
    if !is_relevant(module, subsystem) {
        return Vec::new();
    }
    candidates(module, subsystem.marker())
        .map(|(ty, field, annotation)| RuleSite {
            type_name: ty.name.clone(),
            field: field.name.clone(),
            attribute: annotation.name.clone(),
            expression: annotation.args.first().cloned(),
        })
        .collect()
}

/// Compile every rule annotation in `module`.
///
/// Returns the rule errors in discovery order. Faults other than rule errors
/// stop the walk and are returned as [`ValidateError::Unclassified`].
pub fn compile_module(
    module: &Module,
    subsystem: &dyn RuleSubsystem,
) -> Result<Vec<CompilationError>, ValidateError> {
    if !is_relevant(module, subsystem) {
        debug!(
            module = %module.name(),
            subsystem = %subsystem.module_name(),
            "module does not reference rule subsystem, skipping"
        );
        return Ok(Vec::new());
    }

    let mut errors = Vec::new();
    let mut compiled = 0usize;

    for (ty, field, annotation) in candidates(module, subsystem.marker()) {
        let unclassified = |source: Box<dyn StdError + Send + Sync>| ValidateError::Unclassified {
            type_name: ty.name.clone(),
            field: field.name.clone(),
            attribute: annotation.name.clone(),
            source,
        };

        let attribute = subsystem.bind(annotation).ok_or_else(|| {
            unclassified(
                format!(
                    "annotation '{}' derives from '{}' but exposes no compile capability",
                    annotation.name,
                    subsystem.marker()
                )
                .into(),
            )
        })?;

        let declaring = DeclaringType::new(module, ty);
        compiled += 1;
        match attribute.compile(&declaring) {
            Ok(()) => {
                debug!(ty = %ty.name, field = %field.name, attribute = %attribute.name(), "rule compiled");
            }
            Err(AttributeFault::Rule(error)) => {
                debug!(ty = %ty.name, field = %field.name, error = %error, "rule failed to compile");
                errors.push(CompilationError {
                    type_name: ty.name.clone(),
                    field: field.name.clone(),
                    attribute: attribute.name().to_string(),
                    expression: attribute.expression().to_string(),
                    error,
                });
            }
            Err(AttributeFault::Unclassified(source)) => return Err(unclassified(source)),
        }
    }

    info!(
        module = %module.name(),
        compiled,
        failed = errors.len(),
        "compiled rule annotations"
    );
    Ok(errors)
}
