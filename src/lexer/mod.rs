//! Lexer for the Oberon-0 subset.
//!
//! Transforms source text into a stream of positioned [`Token`]s, ending in a
//! synthetic [`TokenKind::Eof`]. Whitespace and `(* ... *)` comments are
//! skipped; comments do not nest.

mod token;
mod tokens;

pub use token::*;
pub use tokens::*;

use once_cell::sync::Lazy;
use std::{collections::HashMap, error::Error, fmt::Display};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("MODULE", TokenKind::Module);
    m.insert("BEGIN", TokenKind::Begin);
    m.insert("END", TokenKind::End);
    m.insert("VAR", TokenKind::Var);
    m.insert("CONST", TokenKind::Const);
    m.insert("PROCEDURE", TokenKind::Procedure);
    m.insert("IF", TokenKind::If);
    m.insert("THEN", TokenKind::Then);
    m.insert("ELSE", TokenKind::Else);
    m.insert("WHILE", TokenKind::While);
    m.insert("DO", TokenKind::Do);
    m.insert("FOR", TokenKind::For);
    m.insert("TO", TokenKind::To);
    m.insert("RETURN", TokenKind::Return);
    m.insert("ARRAY", TokenKind::Array);
    m.insert("OF", TokenKind::Of);
    m.insert("INTEGER", TokenKind::IntegerType);
    m.insert("REAL", TokenKind::RealType);
    m.insert("STRING", TokenKind::StringType);
    m.insert("DIV", TokenKind::Div);
    m.insert("MOD", TokenKind::Mod);
    m.insert("AND", TokenKind::And);
    m.insert("OR", TokenKind::Or);
    m
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

pub type LexResult<T> = Result<T, LexError>;

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, col) = self.position;
        write!(f, "{} at {line}:{col}", self.message)
    }
}

impl Error for LexError {}

pub struct Lexer<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    position: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            tokens: vec![],
            position: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn rest(&self) -> &str {
        &self.input[self.position..]
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl ToString, position: Position) -> LexError {
        LexError {
            message: message.to_string(),
            position,
        }
    }

    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        loop {
            self.eat_whitespace_and_comments()?;

            let Some(next) = self.peek() else {
                break;
            };

            match next {
                'a'..='z' | 'A'..='Z' | '_' => self.lex_alphanumeric(),
                '0'..='9' => self.lex_numeric()?,
                '"' => self.lex_string()?,
                _ => self.lex_special()?,
            }
        }

        self.tokens.push(Token {
            kind: TokenKind::Eof,
            position: (self.line, self.col),
        });

        Ok(self.tokens)
    }

    fn eat_whitespace_and_comments(&mut self) -> LexResult<()> {
        loop {
            if self
                .peek()
                .map(|item| item.is_whitespace())
                .unwrap_or(false)
            {
                self.bump();
                continue;
            }

            if self.rest().starts_with("(*") {
                let position = (self.line, self.col);
                self.bump();
                self.bump();

                loop {
                    if self.rest().starts_with("*)") {
                        self.bump();
                        self.bump();
                        break;
                    }
                    if self.bump().is_none() {
                        return Err(self.error("unterminated comment", position));
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    fn lex_alphanumeric(&mut self) {
        let position = (self.line, self.col);
        let mut read = String::new();

        while let Some(next) = self.peek() {
            if !next.is_ascii_alphanumeric() && next != '_' {
                break;
            }
            read.push(next);
            self.bump();
        }

        let kind = match KEYWORDS.get(read.as_str()) {
            Some(keyword) => keyword.clone(),
            None => TokenKind::Ident(read),
        };

        self.tokens.push(Token { kind, position });
    }

    fn lex_numeric(&mut self) -> LexResult<()> {
        let position = (self.line, self.col);
        let mut read = String::new();

        while let Some(next) = self.peek() {
            if !next.is_ascii_digit() {
                break;
            }
            read.push(next);
            self.bump();
        }

        // A '.' directly followed by a digit continues a real literal; a lone
        // '.' belongs to the surrounding syntax (e.g. the trailing 'END M.').
        let mut is_real = false;
        let mut after_dot = self.rest().chars();
        if after_dot.next() == Some('.') && after_dot.next().map(|c| c.is_ascii_digit()) == Some(true)
        {
            is_real = true;
            read.push('.');
            self.bump();
            while let Some(next) = self.peek() {
                if !next.is_ascii_digit() {
                    break;
                }
                read.push(next);
                self.bump();
            }
        }

        let kind = if is_real {
            let value = read
                .parse::<f64>()
                .map_err(|_| self.error(format!("invalid real literal '{read}'"), position))?;
            TokenKind::Real(value)
        } else {
            let value = read.parse::<i32>().map_err(|_| {
                self.error(format!("integer literal '{read}' out of range"), position)
            })?;
            TokenKind::Int(value)
        };

        self.tokens.push(Token { kind, position });
        Ok(())
    }

    fn lex_string(&mut self) -> LexResult<()> {
        let position = (self.line, self.col);
        self.bump();

        let mut read = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some(next) => read.push(next),
                None => return Err(self.error("unterminated string", position)),
            }
        }

        self.tokens.push(Token {
            kind: TokenKind::Str(read),
            position,
        });
        Ok(())
    }

    fn lex_special(&mut self) -> LexResult<()> {
        let position = (self.line, self.col);
        let Some(next) = self.bump() else {
            return Ok(());
        };

        let kind = match next {
            ':' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '=' => TokenKind::Eq,
            '#' => TokenKind::Hash,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            other => return Err(self.error(format!("invalid character '{other}'"), position)),
        };

        self.tokens.push(Token { kind, position });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .lex()
            .expect("lexing failed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_lex_identifier() {
        let lexer = Lexer::new("total");

        assert_eq!(
            Ok(vec![
                Token {
                    kind: TokenKind::Ident("total".into()),
                    position: (1, 1),
                },
                Token {
                    kind: TokenKind::Eof,
                    position: (1, 6),
                },
            ]),
            lexer.lex()
        );
    }

    #[test]
    fn test_lex_keywords_are_case_sensitive() {
        assert_eq!(
            vec![
                TokenKind::Module,
                TokenKind::Ident("Module".into()),
                TokenKind::Eof,
            ],
            kinds("MODULE Module")
        );
    }

    #[test]
    fn test_lex_numeric() {
        assert_eq!(vec![TokenKind::Int(1337), TokenKind::Eof], kinds("1337"));
        assert_eq!(vec![TokenKind::Real(3.25), TokenKind::Eof], kinds("3.25"));
    }

    #[test]
    fn test_lex_integer_followed_by_dot() {
        // the '.' terminates the module, it does not start a real literal
        assert_eq!(
            vec![TokenKind::Int(1), TokenKind::Dot, TokenKind::Eof],
            kinds("1.")
        );
    }

    #[test]
    fn test_lex_integer_overflow() {
        let result = Lexer::new("2147483648").lex();
        assert_eq!(
            Err(LexError {
                message: "integer literal '2147483648' out of range".into(),
                position: (1, 1),
            }),
            result
        );
    }

    #[test]
    fn test_lex_string() {
        assert_eq!(
            vec![TokenKind::Str("Hello, World!".into()), TokenKind::Eof],
            kinds("\"Hello, World!\"")
        );
    }

    #[test]
    fn test_lex_unterminated_string() {
        let result = Lexer::new("\"abc").lex();
        assert_eq!(
            Err(LexError {
                message: "unterminated string".into(),
                position: (1, 1),
            }),
            result
        );
    }

    #[test]
    fn test_lex_longest_match_operators() {
        assert_eq!(
            vec![
                TokenKind::Assign,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Colon,
                TokenKind::Eof,
            ],
            kinds(":= <= >= < > :")
        );
    }

    #[test]
    fn test_lex_skips_comments() {
        assert_eq!(
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ],
            kinds("a (* comment\nover two lines *) b")
        );
    }

    #[test]
    fn test_lex_unterminated_comment() {
        let result = Lexer::new("a (* no end").lex();
        assert_eq!(
            Err(LexError {
                message: "unterminated comment".into(),
                position: (1, 3),
            }),
            result
        );
    }

    #[test]
    fn test_lex_positions() {
        let tokens = Lexer::new("a := 1;\nb := 2;").lex().expect("lexing failed");
        let positions = tokens
            .iter()
            .map(|token| token.position)
            .collect::<Vec<_>>();

        assert_eq!(
            vec![
                (1, 1),
                (1, 3),
                (1, 6),
                (1, 7),
                (2, 1),
                (2, 3),
                (2, 6),
                (2, 7),
                (2, 8),
            ],
            positions
        );
    }
}
