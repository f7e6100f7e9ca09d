//! Splits an XPath 1.0 expression into tokens.
//!
//! The lexer applies the disambiguation rules of XPath 1.0 §3.7: whether `*`
//! and `and`/`or`/`div`/`mod` are operators depends on the preceding token,
//! and a name followed by `(` or `::` is a function name, node-type keyword
//! or axis name.

use crate::error::XPathError;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, digit0, digit1, satisfy};
use nom::combinator::{opt, recognize};
use nom::sequence::{delimited, pair, preceded};
use nom::{IResult, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Multiply,
    And,
    Or,
    Div,
    Mod,
    Number,
    /// String literal; the token text excludes the quotes.
    Literal,
    /// A name test: `name`, `prefix:name`, `prefix:*` or `*`.
    Name,
    /// Variable reference; the token text excludes the `$`.
    Variable,
    FunctionName,
    NodeType,
    AxisName,
    Eof,
}

impl TokenKind {
    /// Tokens after which `*` and operator names are read as operators is
    /// everything except these.
    fn precedes_operand(self) -> bool {
        matches!(
            self,
            TokenKind::At
                | TokenKind::ColonColon
                | TokenKind::LeftParen
                | TokenKind::LeftBracket
                | TokenKind::Comma
                | TokenKind::Slash
                | TokenKind::DoubleSlash
                | TokenKind::Pipe
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Equal
                | TokenKind::NotEqual
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
                | TokenKind::Multiply
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Div
                | TokenKind::Mod
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
    /// Byte offset of the token's first character in the source.
    pub offset: usize,
}

pub(crate) fn is_xpath_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')
}

// --- Recognizers ---

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_name_start), take_while(is_name_char))).parse(input)
}

/// `ncname`, `prefix:ncname` or `prefix:*`. Never consumes the first colon of `::`.
fn name_test(input: &str) -> IResult<&str, &str> {
    recognize(pair(nc_name, opt(pair(char(':'), alt((nc_name, tag("*"))))))).parse(input)
}

fn qname(input: &str) -> IResult<&str, &str> {
    recognize(pair(nc_name, opt(pair(char(':'), nc_name)))).parse(input)
}

/// `digits ('.' digits?)?` or `'.' digits`, without sign or exponent.
pub(crate) fn number_literal(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ))
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))
    .parse(input)
}

fn variable_reference(input: &str) -> IResult<&str, &str> {
    preceded(char('$'), qname).parse(input)
}

fn operator_name(name: &str) -> Option<TokenKind> {
    match name {
        "and" => Some(TokenKind::And),
        "or" => Some(TokenKind::Or),
        "div" => Some(TokenKind::Div),
        "mod" => Some(TokenKind::Mod),
        _ => None,
    }
}

pub struct Lexer<'s> {
    source: &'s str,
    pos: usize,
    previous: Option<TokenKind>,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Lexer {
            source,
            pos: 0,
            previous: None,
        }
    }

    fn in_operator_position(&self) -> bool {
        self.previous.is_some_and(|k| !k.precedes_operand())
    }

    fn token(&mut self, kind: TokenKind, offset: usize, text: &'s str, consumed: usize) -> Token<'s> {
        self.pos = offset + consumed;
        self.previous = Some(kind);
        Token { kind, text, offset }
    }

    /// Produces the next token. Once the input is exhausted every call returns
    /// an `Eof` token at the end offset.
    pub fn next_token(&mut self) -> Result<Token<'s>, XPathError> {
        let rest = &self.source[self.pos..];
        let rest = rest.trim_start_matches(is_xpath_whitespace);
        let start = self.source.len() - rest.len();
        self.pos = start;

        let Some(c) = rest.chars().next() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                text: "",
                offset: start,
            });
        };

        let single = |kind| (kind, 1usize);
        let (kind, len) = match c {
            '(' => single(TokenKind::LeftParen),
            ')' => single(TokenKind::RightParen),
            '[' => single(TokenKind::LeftBracket),
            ']' => single(TokenKind::RightBracket),
            ',' => single(TokenKind::Comma),
            '@' => single(TokenKind::At),
            '|' => single(TokenKind::Pipe),
            '+' => single(TokenKind::Plus),
            '-' => single(TokenKind::Minus),
            '=' => single(TokenKind::Equal),
            '/' if rest.starts_with("//") => (TokenKind::DoubleSlash, 2),
            '/' => single(TokenKind::Slash),
            '<' if rest.starts_with("<=") => (TokenKind::LessEqual, 2),
            '<' => single(TokenKind::Less),
            '>' if rest.starts_with(">=") => (TokenKind::GreaterEqual, 2),
            '>' => single(TokenKind::Greater),
            '!' if rest.starts_with("!=") => (TokenKind::NotEqual, 2),
            ':' if rest.starts_with("::") => (TokenKind::ColonColon, 2),
            '.' if rest.starts_with("..") => (TokenKind::DotDot, 2),
            '.' if !rest[1..].starts_with(|d: char| d.is_ascii_digit()) => single(TokenKind::Dot),
            '*' if self.in_operator_position() => single(TokenKind::Multiply),
            '*' => single(TokenKind::Name),
            '"' | '\'' => {
                let (_, content) = string_literal(rest)
                    .map_err(|_| XPathError::UnterminatedLiteral { offset: start })?;
                return Ok(self.token(TokenKind::Literal, start, content, content.len() + 2));
            }
            '$' => {
                let (_, name) = variable_reference(rest).map_err(|_| XPathError::Lexical {
                    found: c.to_string(),
                    offset: start,
                })?;
                return Ok(self.token(TokenKind::Variable, start, name, name.len() + 1));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let (remaining, _) = number_literal(rest).map_err(|_| XPathError::Lexical {
                    found: c.to_string(),
                    offset: start,
                })?;
                (TokenKind::Number, rest.len() - remaining.len())
            }
            c if is_name_start(c) => return self.name_token(rest, start),
            other => {
                return Err(XPathError::Lexical {
                    found: other.to_string(),
                    offset: start,
                });
            }
        };
        Ok(self.token(kind, start, &rest[..len], len))
    }

    fn name_token(&mut self, rest: &'s str, start: usize) -> Result<Token<'s>, XPathError> {
        let (after, name) = name_test(rest).map_err(|_| XPathError::Lexical {
            found: rest.chars().take(1).collect(),
            offset: start,
        })?;

        if self.in_operator_position() {
            if let Some(kind) = operator_name(name) {
                return Ok(self.token(kind, start, name, name.len()));
            }
        }

        let lookahead = after.trim_start_matches(is_xpath_whitespace);
        let kind = if lookahead.starts_with("::") && !name.contains(':') {
            TokenKind::AxisName
        } else if lookahead.starts_with('(') && !name.ends_with('*') {
            match name {
                "node" | "text" | "comment" => TokenKind::NodeType,
                _ => TokenKind::FunctionName,
            }
        } else {
            TokenKind::Name
        };
        Ok(self.token(kind, start, name, name.len()))
    }
}
