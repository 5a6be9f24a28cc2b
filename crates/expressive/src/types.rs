use std::fmt;

use rulecheck_rules::DeclaringType;

/// Static type of a sub-expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Bool,
    Number,
    String,
    Date,
    TimeSpan,
    Enum(String),
    Object(String),
    Null,
    /// Declared with a type name the module graph doesn't describe. Checks
    /// involving it are skipped.
    Unknown,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Bool => write!(f, "bool"),
            Ty::Number => write!(f, "number"),
            Ty::String => write!(f, "string"),
            Ty::Date => write!(f, "date"),
            Ty::TimeSpan => write!(f, "timespan"),
            Ty::Enum(name) | Ty::Object(name) => write!(f, "{name}"),
            Ty::Null => write!(f, "null"),
            Ty::Unknown => write!(f, "unknown"),
        }
    }
}

impl Ty {
    /// Map a declared type name from a module image. A trailing `?` marks a
    /// nullable type and is ignored.
    pub fn from_declared(name: &str, declaring: &DeclaringType<'_>) -> Ty {
        let name = name.trim().trim_end_matches('?');
        match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => return Ty::Bool,
            "byte" | "sbyte" | "short" | "ushort" | "int" | "uint" | "long" | "ulong"
            | "float" | "double" | "decimal" | "int16" | "int32" | "int64" | "single"
            | "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "f32" | "f64"
            | "number" => return Ty::Number,
            "string" | "char" => return Ty::String,
            "datetime" | "datetimeoffset" | "date" => return Ty::Date,
            "timespan" | "duration" => return Ty::TimeSpan,
            _ => {}
        }
        match declaring.lookup_type(name) {
            Some(ty) if ty.is_enum() => Ty::Enum(ty.name.clone()),
            Some(ty) => Ty::Object(ty.name.clone()),
            None => Ty::Unknown,
        }
    }

    pub fn is_boolish(&self) -> bool {
        matches!(self, Ty::Bool | Ty::Null | Ty::Unknown)
    }

    /// Whether a value of type `other` may be compared for equality with, or
    /// passed where `self` is expected.
    pub fn accepts(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (Ty::Null, _) | (_, Ty::Null) => true,
            (a, b) => a == b,
        }
    }

    /// Whether `<`, `<=`, `>` and `>=` apply between the two.
    pub fn orders_with(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (Ty::Number, Ty::Number)
            | (Ty::String, Ty::String)
            | (Ty::Date, Ty::Date)
            | (Ty::TimeSpan, Ty::TimeSpan) => true,
            (Ty::Enum(a), Ty::Enum(b)) => a == b,
            _ => false,
        }
    }
}
