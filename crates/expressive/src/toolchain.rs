//! Functions callable from any rule expression.

use std::collections::HashMap;

use crate::types::Ty;

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Ty>,
    pub returns: Ty,
}

/// Registry of built-in and user-supplied functions, keyed by name.
///
/// Methods declared on the rule's own type take precedence over toolchain
/// functions with the same name.
#[derive(Debug, Clone)]
pub struct Toolchain {
    functions: HashMap<String, Function>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Toolchain {
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        Self::empty()
            .with_function("Now", [], Ty::Date)
            .with_function("Today", [], Ty::Date)
            .with_function("Length", [Ty::String], Ty::Number)
            .with_function("Trim", [Ty::String], Ty::String)
            .with_function("Concat", [Ty::String, Ty::String], Ty::String)
            .with_function("CompareOrdinal", [Ty::String, Ty::String], Ty::Number)
            .with_function("IsNullOrWhiteSpace", [Ty::String], Ty::Bool)
            .with_function("IsEmail", [Ty::String], Ty::Bool)
            .with_function("IsRegexMatch", [Ty::String, Ty::String], Ty::Bool)
    }

    /// Register a function, replacing any existing one of the same name.
    pub fn with_function<P>(mut self, name: &str, params: P, returns: Ty) -> Self
    where
        P: IntoIterator<Item = Ty>,
    {
        self.functions.insert(
            name.to_string(),
            Function {
                name: name.to_string(),
                params: params.into_iter().collect(),
                returns,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let tools = Toolchain::builtin();
        assert_eq!(tools.len(), 9);
        let today = tools.get("Today").unwrap();
        assert!(today.params.is_empty());
        assert_eq!(today.returns, Ty::Date);
        assert!(tools.get("IsDigitChain").is_none());
    }

    #[test]
    fn registering_replaces_same_name() {
        let tools = Toolchain::builtin()
            .with_function("IsDigitChain", [Ty::String], Ty::Bool)
            .with_function("Length", [Ty::String, Ty::Number], Ty::Number);
        assert_eq!(tools.len(), 10);
        assert_eq!(tools.get("Length").unwrap().params.len(), 2);
        assert!(tools.get("IsDigitChain").is_some());
    }
}
