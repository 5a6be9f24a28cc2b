use rulecheck_core::{FieldDef, MethodDef, TypeDef};

use crate::loader::Module;

/// The type a rule annotation is declared on, with access to the rest of its
/// module. Rule expressions may refer to sibling fields, methods, and other
/// types, so compilation gets this rather than just the field.
#[derive(Debug, Clone, Copy)]
pub struct DeclaringType<'a> {
    module: &'a Module,
    ty: &'a TypeDef,
}

/// A named member of a type.
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    Field(&'a FieldDef),
    Method(&'a MethodDef),
}

impl<'a> DeclaringType<'a> {
    pub fn new(module: &'a Module, ty: &'a TypeDef) -> Self {
        Self { module, ty }
    }

    pub fn ty(&self) -> &'a TypeDef {
        self.ty
    }

    pub fn name(&self) -> &'a str {
        &self.ty.name
    }

    pub fn module(&self) -> &'a Module {
        self.module
    }

    pub fn field(&self, name: &str) -> Option<&'a FieldDef> {
        self.ty.field(name)
    }

    pub fn method(&self, name: &str) -> Option<&'a MethodDef> {
        self.ty.method(name)
    }

    /// Fields shadow methods of the same name.
    pub fn member(&self, name: &str) -> Option<Member<'a>> {
        self.field(name)
            .map(Member::Field)
            .or_else(|| self.method(name).map(Member::Method))
    }

    /// Look a type up in the declaring module and its linked dependencies.
    pub fn lookup_type(&self, name: &str) -> Option<&'a TypeDef> {
        self.module.find_type(name)
    }

    /// Re-root at another type of the same module graph.
    pub fn with_type(&self, ty: &'a TypeDef) -> Self {
        Self {
            module: self.module,
            ty,
        }
    }
}
