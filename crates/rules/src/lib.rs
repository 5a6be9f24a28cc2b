//! Build-time rule validation engine.
//!
//! This crate provides:
//! - Isolated loading of module images from in-memory buffers, cached by path
//! - Per-call dependency resolution scoped to the validated module's directory
//! - Reflective enumeration of rule annotations and dispatch to a rule subsystem
//! - Classification of compile failures into reported errors and fatal faults

pub mod compiler;
pub mod error;
pub mod loader;
pub mod validator;

pub use compiler::{
    AttributeFault, CompilationError, DeclaringType, Member, RuleAttribute, RuleError,
    RuleErrorKind, RuleSite, RuleSubsystem,
};
pub use error::ValidateError;
pub use loader::{DependencyResolutionFailure, LoadError, Module, ModuleLoader};
pub use validator::Validator;
