use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Serialized description of one compiled module.
///
/// This is what a module image file carries after its header: the module's
/// own name, the names of the modules it links against, and its declared
/// types in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleImage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub references: Vec<ModuleRef>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

impl ModuleImage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            references: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Add a reference to another module by name.
    pub fn reference(mut self, name: impl Into<String>) -> Self {
        self.references.push(ModuleRef {
            name: name.into(),
            version: None,
        });
        self
    }

    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.types.push(ty);
        self
    }

    /// Whether this module declares a reference to `name`.
    pub fn references_module(&self, name: &str) -> bool {
        self.references.iter().any(|r| r.name == name)
    }

    /// Find a declared type by simple or namespace-qualified name.
    pub fn find_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.matches_name(name))
    }

    /// Parse a YAML module description.
    pub fn from_manifest(content: &str) -> Result<Self> {
        let image: Self = serde_yaml::from_str(content)?;
        Ok(image)
    }
}

/// A reference from one module to another, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    /// Enum members, in declaration order. Empty for classes.
    #[serde(default)]
    pub variants: Vec<String>,
}

impl TypeDef {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            kind: TypeKind::Class,
            fields: Vec::new(),
            methods: Vec::new(),
            variants: Vec::new(),
        }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: TypeKind::Enum,
            variants: variants.into_iter().map(Into::into).collect(),
            ..Self::class(name)
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// `Namespace.Name`, or just `Name` when no namespace is declared.
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns, self.name),
            _ => self.name.clone(),
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.full_name() == name
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.iter().any(|v| v == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Declared type name; nullable types carry a trailing `?`.
    pub ty: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    #[serde(default = "default_return_type")]
    pub returns: String,
}

fn default_return_type() -> String {
    "void".to_string()
}

impl MethodDef {
    pub fn new(name: impl Into<String>, returns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: returns.into(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push(ParamDef {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub ty: String,
}

/// A declarative annotation attached to a field.
///
/// `base` names the annotation's immediate base marker. Rule subsystems
/// recognise their own annotations by it; anything else attached to a field
/// (display hints, serializer options) leaves it unset or names another base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            args: Vec::new(),
        }
    }

    pub fn based_on(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn has_base(&self, marker: &str) -> bool {
        self.base.as_deref() == Some(marker)
    }
}
