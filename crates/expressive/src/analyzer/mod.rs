//! Static checking of a parsed expression against its declaring type.

use rulecheck_core::TypeDef;
use rulecheck_rules::{DeclaringType, Member, RuleError, RuleErrorKind};

use crate::lexer::error_at;
use crate::parser::{BinOp, Expr, Literal, UnaryOp};
use crate::toolchain::Toolchain;
use crate::types::Ty;


pub struct Analyzer<'a> {
    declaring: DeclaringType<'a>,
    toolchain: &'a Toolchain,
}

impl<'a> Analyzer<'a> {
    pub fn new(declaring: DeclaringType<'a>, toolchain: &'a Toolchain) -> Self {
        Self {
            declaring,
            toolchain,
        }
    }

    /// Resolve every symbol and check that the whole expression is boolean.
    pub fn check(&self, expr: &Expr) -> Result<(), RuleError> {
        let ty = self.infer(expr)?;
        if !ty.is_boolish() {
            return Err(error_at(
                RuleErrorKind::TypeMismatch,
                expr.column(),
                format!("expression must evaluate to bool, found '{ty}'"),
            ));
        }
        Ok(())
    }

    pub fn infer(&self, expr: &Expr) -> Result<Ty, RuleError> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Bool(_) => Ty::Bool,
                Literal::Number(_) => Ty::Number,
                Literal::Str(_) => Ty::String,
                Literal::Null => Ty::Null,
            }),
            Expr::Ident { name, column } => self.identifier(name, *column),
            Expr::Member {
                target,
                name,
                column,
            } => self.member(target, name, *column),
            Expr::Call { name, args, column } => self.call(name, args, *column),
            Expr::Unary {
                op,
                operand,
                column,
            } => self.unary(*op, operand, *column),
            Expr::Binary {
                op,
                left,
                right,
                column,
            } => self.binary(*op, left, right, *column),
        }
    }

    fn declared(&self, ty: &str) -> Ty {
        Ty::from_declared(ty, &self.declaring)
    }

    fn identifier(&self, name: &str, column: usize) -> Result<Ty, RuleError> {
        match self.declaring.member(name) {
            Some(Member::Field(field)) => Ok(self.declared(&field.ty)),
            Some(Member::Method(_)) => Err(error_at(
                RuleErrorKind::TypeMismatch,
                column,
                format!("method '{name}' must be called"),
            )),
            None if self.declaring.lookup_type(name).is_some() => Err(error_at(
                RuleErrorKind::TypeMismatch,
                column,
                format!("type '{name}' cannot be used as a value"),
            )),
            None => Err(error_at(
                RuleErrorKind::UnresolvedSymbol,
                column,
                format!("Identifier '{name}' not known"),
            )),
        }
    }

    /// A dotted path naming a type, unless its head is a member of the
    /// declaring type.
    fn static_type(&self, expr: &Expr) -> Option<&'a TypeDef> {
        let path = expr.dotted()?;
        let head = path.split('.').next()?;
        if self.declaring.member(head).is_some() {
            return None;
        }
        self.declaring.lookup_type(&path)
    }

    fn member(&self, target: &Expr, name: &str, column: usize) -> Result<Ty, RuleError> {
        if let Some(ty) = self.static_type(target) {
            if ty.is_enum() && ty.has_variant(name) {
                return Ok(Ty::Enum(ty.name.clone()));
            }
            let what = if ty.is_enum() { "Enum" } else { "Type" };
            return Err(error_at(
                RuleErrorKind::UnresolvedSymbol,
                column,
                format!("{what} '{}' has no member '{name}'", ty.name),
            ));
        }

        match self.infer(target)? {
            Ty::Object(owner) => self
                .declaring
                .lookup_type(&owner)
                .and_then(|ty| ty.field(name))
                .map(|field| self.declared(&field.ty))
                .ok_or_else(|| {
                    error_at(
                        RuleErrorKind::UnresolvedSymbol,
                        column,
                        format!("'{owner}' has no member '{name}'"),
                    )
                }),
            // `Score Score` declares a field named after its enum type.
            Ty::Enum(owner) if target.dotted().as_deref() == Some(owner.as_str()) => self
                .declaring
                .lookup_type(&owner)
                .filter(|ty| ty.has_variant(name))
                .map(|_| Ty::Enum(owner.clone()))
                .ok_or_else(|| {
                    error_at(
                        RuleErrorKind::UnresolvedSymbol,
                        column,
                        format!("Enum '{owner}' has no member '{name}'"),
                    )
                }),
            Ty::String if name == "Length" => Ok(Ty::Number),
            Ty::Unknown => Ok(Ty::Unknown),
            other => Err(error_at(
                RuleErrorKind::UnresolvedSymbol,
                column,
                format!("'{other}' has no member '{name}'"),
            )),
        }
    }

    fn call(&self, name: &str, args: &[Expr], column: usize) -> Result<Ty, RuleError> {
        let (params, returns) = if let Some(method) = self.declaring.method(name) {
            (
                method.params.iter().map(|p| self.declared(&p.ty)).collect::<Vec<_>>(),
                self.declared(&method.returns),
            )
        } else if let Some(function) = self.toolchain.get(name) {
            (function.params.clone(), function.returns.clone())
        } else {
            return Err(error_at(
                RuleErrorKind::UnresolvedSymbol,
                column,
                format!("Function '{name}' not known"),
            ));
        };

        if args.len() != params.len() {
            let plural = if params.len() == 1 { "" } else { "s" };
            return Err(error_at(
                RuleErrorKind::Arity,
                column,
                format!(
                    "Function '{name}' accepts {} argument{plural}, {} given",
                    params.len(),
                    args.len()
                ),
            ));
        }

        for (index, (arg, expected)) in args.iter().zip(&params).enumerate() {
            let actual = self.infer(arg)?;
            if !expected.accepts(&actual) {
                return Err(error_at(
                    RuleErrorKind::TypeMismatch,
                    arg.column(),
                    format!(
                        "argument {} of '{name}' expects '{expected}', found '{actual}'",
                        index + 1
                    ),
                ));
            }
        }
        Ok(returns)
    }

    fn unary(&self, op: UnaryOp, operand: &Expr, column: usize) -> Result<Ty, RuleError> {
        let ty = self.infer(operand)?;
        let result = match (op, &ty) {
            (UnaryOp::Not, t) if t.is_boolish() => Some(Ty::Bool),
            (UnaryOp::Neg, Ty::Number) => Some(Ty::Number),
            (UnaryOp::Neg, Ty::TimeSpan) => Some(Ty::TimeSpan),
            (UnaryOp::Neg, Ty::Unknown) => Some(Ty::Unknown),
            _ => None,
        };
        result.ok_or_else(|| {
            let symbol = match op {
                UnaryOp::Not => "!",
                UnaryOp::Neg => "-",
            };
            error_at(
                RuleErrorKind::TypeMismatch,
                column,
                format!("operator '{symbol}' cannot be applied to operand of type '{ty}'"),
            )
        })
    }

    fn binary(&self, op: BinOp, left: &Expr, right: &Expr, column: usize) -> Result<Ty, RuleError> {
        let l = self.infer(left)?;
        let r = self.infer(right)?;

        let result = match op {
            BinOp::Or | BinOp::And => (l.is_boolish() && r.is_boolish()).then_some(Ty::Bool),
            BinOp::Eq | BinOp::Ne => l.accepts(&r).then_some(Ty::Bool),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                l.orders_with(&r).then_some(Ty::Bool)
            }
            BinOp::Add => match (&l, &r) {
                (Ty::Unknown, _) | (_, Ty::Unknown) => Some(Ty::Unknown),
                (Ty::String, _) | (_, Ty::String) => Some(Ty::String),
                (Ty::Number, Ty::Number) => Some(Ty::Number),
                (Ty::Date, Ty::TimeSpan) | (Ty::TimeSpan, Ty::Date) => Some(Ty::Date),
                (Ty::TimeSpan, Ty::TimeSpan) => Some(Ty::TimeSpan),
                _ => None,
            },
            BinOp::Sub => match (&l, &r) {
                (Ty::Unknown, _) | (_, Ty::Unknown) => Some(Ty::Unknown),
                (Ty::Number, Ty::Number) => Some(Ty::Number),
                (Ty::Date, Ty::TimeSpan) => Some(Ty::Date),
                (Ty::Date, Ty::Date) | (Ty::TimeSpan, Ty::TimeSpan) => Some(Ty::TimeSpan),
                _ => None,
            },
            BinOp::Mul | BinOp::Div | BinOp::Mod => match (&l, &r) {
                (Ty::Number, Ty::Number) => Some(Ty::Number),
                (Ty::Number | Ty::Unknown, Ty::Number | Ty::Unknown) => Some(Ty::Unknown),
                _ => None,
            },
        };

        result.ok_or_else(|| {
            error_at(
                RuleErrorKind::TypeMismatch,
                column,
                format!(
                    "operator '{}' cannot be applied to operands of type '{l}' and '{r}'",
                    op.symbol()
                ),
            )
        })
    }
}
