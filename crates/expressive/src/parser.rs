use rulecheck_rules::RuleError;

use crate::lexer::{syntax_error, tokenize, Spanned, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Str(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }
}

/// Parsed rule expression. Every node carries the column it starts at.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        column: usize,
    },
    Ident {
        name: String,
        column: usize,
    },
    Member {
        target: Box<Expr>,
        name: String,
        column: usize,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        column: usize,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        column: usize,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        column: usize,
    },
}

impl Expr {
    pub fn column(&self) -> usize {
        match self {
            Expr::Literal { column, .. }
            | Expr::Ident { column, .. }
            | Expr::Member { column, .. }
            | Expr::Call { column, .. }
            | Expr::Unary { column, .. }
            | Expr::Binary { column, .. } => *column,
        }
    }

    /// `A.B.C` as a dotted path, if the expression is only identifiers and
    /// member access.
    pub fn dotted(&self) -> Option<String> {
        match self {
            Expr::Ident { name, .. } => Some(name.clone()),
            Expr::Member { target, name, .. } => Some(format!("{}.{name}", target.dotted()?)),
            _ => None,
        }
    }
}

/// Parse a complete rule expression.
pub fn parse(input: &str) -> Result<Expr, RuleError> {
    if input.trim().is_empty() {
        return Err(syntax_error(1, "empty expression"));
    }
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_or()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Deepest expression tree the parser builds. Analysis walks the tree
/// recursively, so input nested beyond this is rejected as a syntax error.
pub const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn current(&self) -> &Spanned {
        // The lexer always terminates with Eof, and `advance` never moves past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let token = self.current().clone();
        if token.token != Token::Eof {
            self.position += 1;
        }
        token
    }

    fn consume(&mut self, expected: Token) -> Result<Spanned, RuleError> {
        let current = self.current();
        if current.token != expected {
            return Err(syntax_error(
                current.column,
                format!("expected '{expected}', found '{}'", current.token),
            ));
        }
        Ok(self.advance())
    }

    fn expect_end(&self) -> Result<(), RuleError> {
        let current = self.current();
        if current.token != Token::Eof {
            return Err(syntax_error(
                current.column,
                format!("unexpected '{}' after complete expression", current.token),
            ));
        }
        Ok(())
    }

    fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            column: left.column(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Count one more level of nesting at `column`. Callers restore `depth`
    /// once the nested node is built; on error the parse is abandoned.
    fn nest(&mut self, column: usize) -> Result<(), RuleError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(syntax_error(column, "expression nested too deeply"));
        }
        Ok(())
    }

    /// `operand (op operand)*`, folded to the left.
    fn left_assoc(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, RuleError>,
        operator: fn(&Token) -> Option<BinOp>,
    ) -> Result<Expr, RuleError> {
        let depth = self.depth;
        let mut left = operand(self)?;
        while let Some(op) = operator(&self.current().token) {
            let column = self.advance().column;
            self.nest(column)?;
            let right = operand(self)?;
            left = Self::binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, RuleError> {
        self.left_assoc(Self::parse_and, |token| match token {
            Token::Or => Some(BinOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Expr, RuleError> {
        self.left_assoc(Self::parse_equality, |token| match token {
            Token::And => Some(BinOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, RuleError> {
        self.left_assoc(Self::parse_comparison, |token| match token {
            Token::Eq => Some(BinOp::Eq),
            Token::Ne => Some(BinOp::Ne),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr, RuleError> {
        self.left_assoc(Self::parse_add_sub, |token| match token {
            Token::Lt => Some(BinOp::Lt),
            Token::Le => Some(BinOp::Le),
            Token::Gt => Some(BinOp::Gt),
            Token::Ge => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn parse_add_sub(&mut self) -> Result<Expr, RuleError> {
        self.left_assoc(Self::parse_mul_div, |token| match token {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_mul_div(&mut self) -> Result<Expr, RuleError> {
        self.left_assoc(Self::parse_unary, |token| match token {
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, RuleError> {
        let op = match self.current().token {
            Token::Not => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let column = self.advance().column;
        self.nest(column)?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            column,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, RuleError> {
        let depth = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().token {
                Token::Dot => {
                    let dot = self.advance().column;
                    self.nest(dot)?;
                    let Spanned { token, column } = self.advance();
                    let name = match token {
                        Token::Ident(name) => name,
                        other => {
                            return Err(syntax_error(
                                column,
                                format!("expected member name after '.', found '{other}'"),
                            ))
                        }
                    };
                    expr = Expr::Member {
                        column: expr.column(),
                        target: Box::new(expr),
                        name,
                    };
                }
                Token::LParen => {
                    return Err(syntax_error(
                        self.current().column,
                        "only functions called by name can be invoked",
                    ));
                }
                _ => break,
            }
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, RuleError> {
        let Spanned { token, column } = self.advance();
        match token {
            Token::Number(n) => Ok(Expr::Literal {
                value: Literal::Number(n),
                column,
            }),
            Token::Str(s) => Ok(Expr::Literal {
                value: Literal::Str(s),
                column,
            }),
            Token::True => Ok(Expr::Literal {
                value: Literal::Bool(true),
                column,
            }),
            Token::False => Ok(Expr::Literal {
                value: Literal::Bool(false),
                column,
            }),
            Token::Null => Ok(Expr::Literal {
                value: Literal::Null,
                column,
            }),
            Token::LParen => {
                self.nest(column)?;
                let expr = self.parse_or()?;
                self.consume(Token::RParen)?;
                self.depth -= 1;
                Ok(expr)
            }
            Token::Ident(name) => {
                if self.current().token == Token::LParen {
                    self.advance();
                    self.nest(column)?;
                    let args = self.parse_args()?;
                    self.depth -= 1;
                    Ok(Expr::Call { name, args, column })
                } else {
                    Ok(Expr::Ident { name, column })
                }
            }
            other => Err(syntax_error(column, format!("unexpected '{other}'"))),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, RuleError> {
        let mut args = Vec::new();
        if self.current().token == Token::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            match self.current().token {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => {
                    let current = self.current();
                    return Err(syntax_error(
                        current.column,
                        format!("expected ',' or ')', found '{}'", current.token),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rulecheck_rules::RuleErrorKind;

    use super::*;

    fn ident(name: &str, column: usize) -> Expr {
        Expr::Ident {
            name: name.to_string(),
            column,
        }
    }

    #[test]
    fn parses_enum_comparison() {
        let expr = parse("Level == Score.High").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinOp::Eq,
                left: Box::new(ident("Level", 1)),
                right: Box::new(Expr::Member {
                    target: Box::new(ident("Score", 10)),
                    name: "High".to_string(),
                    column: 10,
                }),
                column: 1,
            }
        );
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let Expr::Binary { op, right, .. } = parse("1 + 2 * 3").unwrap() else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let Expr::Binary { op, right, .. } = parse("a || b && c").unwrap() else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinOp::Or);
        assert!(matches!(*right, Expr::Binary { op: BinOp::And, .. }));
    }

    #[test]
    fn parses_calls_with_nested_arguments() {
        let expr = parse("AddYears(Today(), 1, 2)").unwrap();
        let Expr::Call { name, args, column } = expr else {
            panic!("expected call");
        };
        assert_eq!(name, "AddYears");
        assert_eq!(column, 1);
        assert_eq!(args.len(), 3);
        assert!(matches!(&args[0], Expr::Call { name, args, .. } if name == "Today" && args.is_empty()));
    }

    #[test]
    fn parses_unary_and_parentheses() {
        let expr = parse("!(a == -1)").unwrap();
        let Expr::Unary { op, operand, .. } = expr else {
            panic!("expected unary");
        };
        assert_eq!(op, UnaryOp::Not);
        assert!(matches!(*operand, Expr::Binary { op: BinOp::Eq, .. }));
    }

    #[test]
    fn dotted_path_for_member_chains() {
        let expr = parse("Sample.Score.High").unwrap();
        assert_eq!(expr.dotted().as_deref(), Some("Sample.Score.High"));
        assert_eq!(parse("Length(x)").unwrap().dotted(), None);
    }

    #[test]
    fn reports_missing_closing_paren() {
        let err = parse("Length(Name").unwrap_err();
        assert_eq!(err.kind, RuleErrorKind::Syntax);
        assert!(err.message.contains("expected ',' or ')'"), "{}", err.message);
    }

    #[test]
    fn reports_trailing_tokens() {
        let err = parse("a == b c").unwrap_err();
        assert_eq!(err.column, Some(8));
        assert!(err.message.contains("after complete expression"));
    }

    #[test]
    fn rejects_empty_expression() {
        let err = parse("   ").unwrap_err();
        assert!(err.message.contains("empty expression"));
    }

    #[test]
    fn moderate_nesting_parses() {
        let parens = format!("{}a{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&parens).unwrap(), ident("a", 101));
        assert!(parse(&format!("{}a", "!".repeat(100))).is_ok());
        assert!(parse(&vec!["1"; 100].join(" + ")).is_ok());
    }

    fn assert_too_deep(input: &str) {
        let err = parse(input).unwrap_err();
        assert_eq!(err.kind, RuleErrorKind::Syntax);
        assert!(err.message.contains("nested too deeply"), "{}", err.message);
    }

    #[test]
    fn rejects_deeply_nested_parentheses() {
        assert_too_deep(&format!("{}a{}", "(".repeat(1000), ")".repeat(1000)));
    }

    #[test]
    fn rejects_deeply_nested_unary_operators() {
        assert_too_deep(&format!("{}a", "!".repeat(1000)));
        assert_too_deep(&format!("{}1", "-".repeat(1000)));
    }

    #[test]
    fn rejects_long_operator_and_member_chains() {
        assert_too_deep(&vec!["1"; 1000].join(" + "));
        assert_too_deep(&vec!["a"; 1000].join(" && "));
        assert_too_deep(&vec!["a"; 1000].join("."));
    }

    #[test]
    fn rejects_deeply_nested_calls() {
        let calls = format!("{}x{}", "Length(".repeat(1000), ")".repeat(1000));
        assert_too_deep(&calls);
    }

    #[test]
    fn depth_error_points_at_opening_token() {
        let err = parse(&format!("{}a{}", "(".repeat(200), ")".repeat(200))).unwrap_err();
        assert_eq!(err.column, Some(MAX_DEPTH + 1));
    }

    #[test]
    fn rejects_calls_on_members() {
        let err = parse("Name.Trim()").unwrap_err();
        assert_eq!(err.kind, RuleErrorKind::Syntax);
        assert_eq!(err.column, Some(10));
    }
}
