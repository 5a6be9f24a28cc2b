use std::fmt::{Display, Error, Formatter};

use rulecheck_rules::{RuleError, RuleErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Dot,
    Eof,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Eof => write!(f, "end of expression"),
        }
    }
}

/// A token and the 1-based column it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub column: usize,
}

pub(crate) fn error_at(kind: RuleErrorKind, column: usize, message: impl Display) -> RuleError {
    RuleError::new(kind, format!("Parse error at column {column}: {message}.")).at(column)
}

pub(crate) fn syntax_error(column: usize, message: impl Display) -> RuleError {
    error_at(RuleErrorKind::Syntax, column, message)
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, RuleError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let column = pos + 1;

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            let token = match word.as_str() {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                _ => Token::Ident(word),
            };
            tokens.push(Spanned { token, column });
            continue;
        }

        if c.is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| syntax_error(column, format!("invalid number '{text}'")))?;
            tokens.push(Spanned {
                token: Token::Number(value),
                column,
            });
            continue;
        }

        if c == '\'' || c == '"' {
            let start = pos + 1;
            pos = start;
            while pos < chars.len() && chars[pos] != c {
                pos += 1;
            }
            if pos >= chars.len() {
                return Err(syntax_error(column, "unterminated string literal"));
            }
            let text: String = chars[start..pos].iter().collect();
            pos += 1;
            tokens.push(Spanned {
                token: Token::Str(text),
                column,
            });
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('!', _) => (Token::Not, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            ('=', _) => return Err(syntax_error(column, "unexpected '=' (did you mean '=='?)")),
            ('&', _) => return Err(syntax_error(column, "unexpected '&' (did you mean '&&'?)")),
            ('|', _) => return Err(syntax_error(column, "unexpected '|' (did you mean '||'?)")),
            (other, _) => return Err(syntax_error(column, format!("unexpected character '{other}'"))),
        };
        tokens.push(Spanned { token, column });
        pos += width;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        column: chars.len() + 1,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn tokenizes_comparison_with_member_access() {
        assert_eq!(
            kinds("Level == Score.High"),
            vec![
                Token::Ident("Level".to_string()),
                Token::Eq,
                Token::Ident("Score".to_string()),
                Token::Dot,
                Token::Ident("High".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn records_columns() {
        let tokens = tokenize("a >= 10").unwrap();
        let columns: Vec<_> = tokens.iter().map(|t| t.column).collect();
        assert_eq!(columns, vec![1, 3, 6, 8]);
    }

    #[test]
    fn reads_both_string_quotes_and_keywords() {
        assert_eq!(
            kinds("'a' != \"b\" || !true && null"),
            vec![
                Token::Str("a".to_string()),
                Token::Ne,
                Token::Str("b".to_string()),
                Token::Or,
                Token::Not,
                Token::True,
                Token::And,
                Token::Null,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn single_equals_is_a_syntax_error() {
        let err = tokenize("GoAbroad = true").unwrap_err();
        assert_eq!(err.kind, RuleErrorKind::Syntax);
        assert_eq!(err.column, Some(10));
        assert!(err.message.contains("did you mean '=='"));
    }

    #[test]
    fn unterminated_string_is_a_syntax_error() {
        let err = tokenize("Name == 'abc").unwrap_err();
        assert!(err.message.contains("unterminated string"));
        assert_eq!(err.column, Some(9));
    }
}
