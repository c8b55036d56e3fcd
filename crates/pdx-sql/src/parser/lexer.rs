//! SQL tokenizer.
//!
//! Positions are byte offsets into the whole input, not the statement, so
//! errors point at the right place in multi-statement text.

use std::fmt;

use super::{ParseError, ParseResult};

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    // Keywords
    Select,
    From,
    Where,
    As,
    And,
    Or,
    Not,
    Is,
    Null,
    Like,
    True,
    False,
    // Names and literals
    Ident(String),
    QuotedIdent(String),
    Str(String),
    Integer(i64),
    Decimal(String),
    // Symbols
    Star,
    Comma,
    Dot,
    LParen,
    RParen,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Minus,
    Eof,
}

impl TokenKind {
    fn keyword(word: &str) -> Option<Self> {
        Some(match word.to_ascii_uppercase().as_str() {
            "SELECT" => TokenKind::Select,
            "FROM" => TokenKind::From,
            "WHERE" => TokenKind::Where,
            "AS" => TokenKind::As,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "IS" => TokenKind::Is,
            "NULL" => TokenKind::Null,
            "LIKE" => TokenKind::Like,
            "TRUE" => TokenKind::True,
            "FALSE" => TokenKind::False,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Select => write!(f, "SELECT"),
            TokenKind::From => write!(f, "FROM"),
            TokenKind::Where => write!(f, "WHERE"),
            TokenKind::As => write!(f, "AS"),
            TokenKind::And => write!(f, "AND"),
            TokenKind::Or => write!(f, "OR"),
            TokenKind::Not => write!(f, "NOT"),
            TokenKind::Is => write!(f, "IS"),
            TokenKind::Null => write!(f, "NULL"),
            TokenKind::Like => write!(f, "LIKE"),
            TokenKind::True => write!(f, "TRUE"),
            TokenKind::False => write!(f, "FALSE"),
            TokenKind::Ident(name) => write!(f, "identifier {}", name),
            TokenKind::QuotedIdent(name) => write!(f, "identifier \"{}\"", name),
            TokenKind::Str(s) => write!(f, "string '{}'", s),
            TokenKind::Integer(n) => write!(f, "number {}", n),
            TokenKind::Decimal(s) => write!(f, "number {}", s),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::NotEq => write!(f, "'<>'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::LtEq => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::GtEq => write!(f, "'>='"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

/// Tokenizes `text`, which starts at byte `base` of the full input.
///
/// The returned list always ends with an `Eof` token positioned just past
/// the text.
pub(crate) fn tokenize(text: &str, base: usize) -> ParseResult<Vec<Token>> {
    let mut lexer = Lexer {
        text,
        base,
        chars: text.char_indices().peekable(),
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: base + text.len(),
    });
    Ok(tokens)
}

struct Lexer<'a> {
    text: &'a str,
    base: usize,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn next_token(&mut self) -> ParseResult<Option<Token>> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some((start, c)) = self.chars.next() else {
            return Ok(None);
        };
        let pos = self.base + start;

        let kind = match c {
            '*' => TokenKind::Star,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '-' => TokenKind::Minus,
            '=' => TokenKind::Eq,
            '!' if self.chars.next_if(|(_, c)| *c == '=').is_some() => TokenKind::NotEq,
            '<' => {
                if self.chars.next_if(|(_, c)| *c == '=').is_some() {
                    TokenKind::LtEq
                } else if self.chars.next_if(|(_, c)| *c == '>').is_some() {
                    TokenKind::NotEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.chars.next_if(|(_, c)| *c == '=').is_some() {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '\'' => TokenKind::Str(self.quoted('\'', pos)?),
            '"' => TokenKind::QuotedIdent(self.quoted('"', pos)?),
            c if c.is_ascii_digit() => self.number(start)?,
            c if c.is_alphabetic() || c == '_' => {
                let end = self.take_word(start);
                let word = &self.text[start..end];
                TokenKind::keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()))
            }
            other => {
                return Err(ParseError::UnexpectedCharacter {
                    character: other,
                    position: pos,
                })
            }
        };
        Ok(Some(Token { kind, pos }))
    }

    /// Reads up to the closing `quote`; a doubled quote stands for itself.
    fn quoted(&mut self, quote: char, pos: usize) -> ParseResult<String> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => {
                    if self.chars.next_if(|(_, c)| *c == quote).is_some() {
                        out.push(quote);
                    } else {
                        return Ok(out);
                    }
                }
                Some((_, c)) => out.push(c),
                None => return Err(ParseError::UnterminatedQuote { position: pos }),
            }
        }
    }

    fn number(&mut self, start: usize) -> ParseResult<TokenKind> {
        let mut end = self.take_digits(start + 1);
        let mut decimal = false;

        // a dot only belongs to the number when a digit follows it
        if let Some(&(dot, '.')) = self.chars.peek() {
            if self.text[dot + 1..].starts_with(|c: char| c.is_ascii_digit()) {
                self.chars.next();
                end = self.take_digits(dot + 1);
                decimal = true;
            }
        }
        // trailing letters make the whole run a bad literal, e.g. `12ab`
        if self
            .chars
            .peek()
            .is_some_and(|(_, c)| c.is_alphanumeric() || *c == '_')
        {
            end = self.take_word(end);
        }

        let literal = &self.text[start..end];
        let invalid = || ParseError::InvalidNumber {
            literal: literal.to_string(),
            position: self.base + start,
        };
        if literal.contains(|c: char| !(c.is_ascii_digit() || c == '.')) {
            return Err(invalid());
        }
        if decimal {
            Ok(TokenKind::Decimal(literal.to_string()))
        } else {
            literal.parse().map(TokenKind::Integer).map_err(|_| invalid())
        }
    }

    fn take_digits(&mut self, mut end: usize) -> usize {
        while let Some((i, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit()) {
            end = i + c.len_utf8();
        }
        end
    }

    /// Consumes the rest of a word that began at `start`, returning its end.
    fn take_word(&mut self, start: usize) -> usize {
        let mut end = start + self.text[start..].chars().next().map_or(0, char::len_utf8);
        while let Some((i, c)) = self
            .chars
            .next_if(|(_, c)| c.is_alphanumeric() || *c == '_')
        {
            end = i + c.len_utf8();
        }
        end
    }
}
