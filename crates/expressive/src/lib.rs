//! Expressive rule annotations.
//!
//! A small boolean expression dialect used by `AssertThat` and `RequiredIf`
//! annotations. Expressions may reference fields and methods of their
//! declaring type, enum variants from the module graph, and functions from a
//! [`Toolchain`]. Compiling an expression parses it, resolves every symbol and
//! checks operand types; nothing is evaluated.

pub mod analyzer;
pub mod lexer;
pub mod parser;
pub mod toolchain;
pub mod types;

use rulecheck_core::Annotation;
use rulecheck_rules::{AttributeFault, DeclaringType, RuleAttribute, RuleError, RuleSubsystem};
use tracing::debug;

pub use analyzer::Analyzer;
pub use parser::{parse, Expr};
pub use toolchain::{Function, Toolchain};
pub use types::Ty;

/// Module name user modules reference to opt into expressive rules.
pub const MODULE_NAME: &str = "Expressive";

/// Base marker carried by every expressive rule annotation.
pub const MARKER: &str = "ExpressiveAttribute";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The field's value must satisfy the expression.
    AssertThat,
    /// The field is required when the expression holds.
    RequiredIf,
}

impl RuleKind {
    /// Accepts the short name and the `...Attribute` form.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.strip_suffix("Attribute").unwrap_or(name) {
            "AssertThat" => Some(RuleKind::AssertThat),
            "RequiredIf" => Some(RuleKind::RequiredIf),
            _ => None,
        }
    }
}

/// The expressive rule subsystem.
#[derive(Debug, Clone, Default)]
pub struct ExpressiveRules {
    toolchain: Toolchain,
}

impl ExpressiveRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_toolchain(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Parse and check one expression against `declaring`.
    pub fn compile_expression(
        &self,
        expression: &str,
        declaring: &DeclaringType<'_>,
    ) -> Result<(), RuleError> {
        let expr = parse(expression)?;
        Analyzer::new(*declaring, &self.toolchain).check(&expr)
    }
}

impl RuleSubsystem for ExpressiveRules {
    fn module_name(&self) -> &str {
        MODULE_NAME
    }

    fn marker(&self) -> &str {
        MARKER
    }

    fn bind<'a>(&'a self, annotation: &'a Annotation) -> Option<Box<dyn RuleAttribute + 'a>> {
        let kind = RuleKind::from_name(&annotation.name)?;
        Some(Box::new(ExpressiveAttribute {
            kind,
            annotation,
            rules: self,
        }))
    }
}

struct ExpressiveAttribute<'a> {
    kind: RuleKind,
    annotation: &'a Annotation,
    rules: &'a ExpressiveRules,
}

impl RuleAttribute for ExpressiveAttribute<'_> {
    fn name(&self) -> &str {
        &self.annotation.name
    }

    fn expression(&self) -> &str {
        self.annotation.args.first().map(String::as_str).unwrap_or("")
    }

    fn compile(&self, declaring: &DeclaringType<'_>) -> Result<(), AttributeFault> {
        let Some(expression) = self.annotation.args.first() else {
            return Err(AttributeFault::Unclassified(
                format!("'{}' annotation carries no expression argument", self.annotation.name)
                    .into(),
            ));
        };
        debug!(kind = ?self.kind, ty = %declaring.name(), expression = %expression, "compiling expression");
        self.rules.compile_expression(expression, declaring)?;
        Ok(())
    }
}
