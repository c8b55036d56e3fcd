//! SQL parser.
//!
//! Input is split into statements on `;` outside quotes. A statement whose
//! first word is `SELECT` is tokenized and parsed into a [`SelectStatement`];
//! anything else becomes an [`OpaqueStatement`] carrying its raw text.
//!
//! # Supported SQL
//!
//! ```text
//! SELECT item [, item ...] FROM table [[AS] alias] [, ...] [WHERE predicate]
//!
//! item      := * | table.* | expr [[AS] alias]
//! predicate := predicate OR predicate | predicate AND predicate | NOT predicate
//!            | primary (= | <> | != | < | <= | > | >=) primary
//!            | primary [NOT] LIKE primary | primary IS [NOT] NULL | primary
//! primary   := literal | column | table.column | ( predicate ) | -number
//! ```
//!
//! # Usage
//!
//! ```
//! use pdx_sql::parser::{Parser, Statement};
//!
//! let statements = Parser::parse("SELECT Name, City FROM customer WHERE State = 'HI'").unwrap();
//! assert!(matches!(statements[0], Statement::Select(_)));
//! ```

use std::str::FromStr;

use pdx_common::ErrorCode;
use rust_decimal::Decimal;
use thiserror::Error;

mod expr;
mod lexer;
mod statement;

pub use expr::*;
pub use statement::*;

use lexer::{Token, TokenKind};

/// Errors that can occur during SQL parsing.
///
/// Every position is a byte offset into the full input text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ParseError {
    /// A string or quoted identifier is never closed.
    #[error("unterminated quote starting at position {position}")]
    UnterminatedQuote { position: usize },

    /// A character that starts no token.
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },

    /// A token that does not fit the grammar.
    #[error("expected {expected} but found {found} at position {position}")]
    UnexpectedToken {
        found: String,
        expected: String,
        position: usize,
    },

    /// The statement ends early.
    #[error("expected {expected} but the statement ended at position {position}")]
    UnexpectedEnd { expected: String, position: usize },

    /// Nothing but whitespace between terminators.
    #[error("empty statement at position {position}")]
    EmptyStatement { position: usize },

    /// A number that cannot be represented.
    #[error("invalid number '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },
}

impl ParseError {
    /// Byte offset of the error in the input.
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnterminatedQuote { position }
            | ParseError::UnexpectedCharacter { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEnd { position, .. }
            | ParseError::EmptyStatement { position }
            | ParseError::InvalidNumber { position, .. } => *position,
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::UnterminatedQuote { .. } => ErrorCode::UnterminatedQuote,
            ParseError::UnexpectedCharacter { .. }
            | ParseError::UnexpectedToken { .. }
            | ParseError::UnexpectedEnd { .. } => ErrorCode::SyntaxError,
            ParseError::EmptyStatement { .. } => ErrorCode::EmptyStatement,
            ParseError::InvalidNumber { .. } => ErrorCode::InvalidLiteral,
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// SQL parser.
///
/// Parsing is pure: the same text always yields equal trees.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parses `;`-separated SQL text into statements.
    ///
    /// A trailing terminator is allowed. Any error fails the whole call.
    pub fn parse(sql: &str) -> ParseResult<Vec<Statement>> {
        let segments = split_statements(sql)?;
        let count = segments.len();
        let mut statements = Vec::with_capacity(count);

        for (i, (offset, text)) in segments.into_iter().enumerate() {
            if text.trim().is_empty() {
                // a trailing terminator leaves one empty segment behind
                if i + 1 == count && i > 0 {
                    continue;
                }
                return Err(ParseError::EmptyStatement { position: offset });
            }
            statements.push(Self::parse_statement(text, offset)?);
        }
        Ok(statements)
    }

    fn parse_statement(text: &str, offset: usize) -> ParseResult<Statement> {
        let trimmed = text.trim();
        let word: String = trimmed
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();

        if word.eq_ignore_ascii_case("SELECT") {
            let tokens = lexer::tokenize(text, offset)?;
            let mut parser = Parser { tokens, pos: 0 };
            return parser.parse_select().map(Statement::Select);
        }

        let keyword = if word.is_empty() {
            trimmed.split_whitespace().next().unwrap_or_default()
        } else {
            word.as_str()
        };
        Ok(Statement::Other(OpaqueStatement {
            kind: StatementKind::from_keyword(keyword),
            text: trimmed.to_string(),
        }))
    }

    fn parse_select(&mut self) -> ParseResult<SelectStatement> {
        self.expect(TokenKind::Select, "SELECT")?;

        let mut items = vec![self.parse_select_item()?];
        while self.consume(&TokenKind::Comma) {
            items.push(self.parse_select_item()?);
        }

        self.expect(TokenKind::From, "FROM")?;
        let mut from = vec![self.parse_table_ref()?];
        while self.consume(&TokenKind::Comma) {
            from.push(self.parse_table_ref()?);
        }

        let selection = if self.consume(&TokenKind::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect(TokenKind::Eof, "end of statement")?;
        Ok(SelectStatement {
            items,
            from,
            selection,
        })
    }

    fn parse_select_item(&mut self) -> ParseResult<SelectItem> {
        if self.consume(&TokenKind::Star) {
            return Ok(SelectItem::Wildcard);
        }
        if let Some(name) = self.peek_name() {
            if self.peek_at(1) == &TokenKind::Dot && self.peek_at(2) == &TokenKind::Star {
                self.pos += 3;
                return Ok(SelectItem::QualifiedWildcard(name));
            }
        }

        let expr = self.parse_expr()?;
        let alias = if self.consume(&TokenKind::As) {
            Some(self.parse_alias()?)
        } else {
            match self.peek() {
                TokenKind::Ident(_) | TokenKind::QuotedIdent(_) | TokenKind::Str(_) => {
                    Some(self.parse_alias()?)
                }
                _ => None,
            }
        };
        Ok(SelectItem::Expr { expr, alias })
    }

    fn parse_alias(&mut self) -> ParseResult<String> {
        match self.peek().clone() {
            TokenKind::Ident(name) | TokenKind::QuotedIdent(name) | TokenKind::Str(name) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("alias")),
        }
    }

    fn parse_table_ref(&mut self) -> ParseResult<TableRef> {
        let mut name = self.parse_name("table name")?;
        // unquoted `customer.db`
        while self.peek() == &TokenKind::Dot {
            if let TokenKind::Ident(part) = self.peek_at(1).clone() {
                self.pos += 2;
                name.push('.');
                name.push_str(&part);
            } else {
                break;
            }
        }

        let alias = if self.consume(&TokenKind::As) {
            Some(self.parse_name("alias")?)
        } else if self.peek_name().is_some() {
            Some(self.parse_name("alias")?)
        } else {
            None
        };
        Ok(TableRef { name, alias })
    }

    fn parse_name(&mut self, expected: &str) -> ParseResult<String> {
        match self.peek_name() {
            Some(name) => {
                self.pos += 1;
                Ok(name)
            }
            None => Err(self.unexpected(expected)),
        }
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.consume(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not()?;
        while self.consume(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.consume(&TokenKind::Not) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_primary()?;

        let op = match self.peek() {
            TokenKind::Eq => BinaryOperator::Eq,
            TokenKind::NotEq => BinaryOperator::NotEq,
            TokenKind::Lt => BinaryOperator::Lt,
            TokenKind::LtEq => BinaryOperator::LtEq,
            TokenKind::Gt => BinaryOperator::Gt,
            TokenKind::GtEq => BinaryOperator::GtEq,
            TokenKind::Like => return self.parse_like(left, false),
            TokenKind::Not if self.peek_at(1) == &TokenKind::Like => {
                self.pos += 1;
                return self.parse_like(left, true);
            }
            TokenKind::Is => {
                self.pos += 1;
                let negated = self.consume(&TokenKind::Not);
                self.expect(TokenKind::Null, "NULL")?;
                return Ok(Expr::IsNull {
                    expr: Box::new(left),
                    negated,
                });
            }
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_primary()?;
        Ok(Expr::binary(left, op, right))
    }

    fn parse_like(&mut self, left: Expr, negated: bool) -> ParseResult<Expr> {
        self.expect(TokenKind::Like, "LIKE")?;
        let pattern = self.parse_primary()?;
        Ok(Expr::Like {
            expr: Box::new(left),
            pattern: Box::new(pattern),
            negated,
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        let literal = match token.kind.clone() {
            TokenKind::Null => Literal::Null,
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Str(s) => Literal::String(s),
            TokenKind::Integer(_) | TokenKind::Decimal(_) => self.number(&token, false)?,
            TokenKind::Minus => {
                self.pos += 1;
                let number = self.current().clone();
                match &number.kind {
                    TokenKind::Integer(_) | TokenKind::Decimal(_) => {
                        self.number(&number, true)?
                    }
                    _ => return Err(self.unexpected("number")),
                }
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok(Expr::Nested(Box::new(inner)));
            }
            TokenKind::Ident(name) | TokenKind::QuotedIdent(name) => {
                self.pos += 1;
                if self.peek() == &TokenKind::Dot {
                    if let TokenKind::Ident(column) | TokenKind::QuotedIdent(column) =
                        self.peek_at(1).clone()
                    {
                        self.pos += 2;
                        return Ok(Expr::qualified_column(name, column));
                    }
                    self.pos += 1;
                    return Err(self.unexpected("column name"));
                }
                return Ok(Expr::column(name));
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.pos += 1;
        Ok(Expr::Literal(literal))
    }

    fn number(&self, token: &Token, negative: bool) -> ParseResult<Literal> {
        let invalid = |literal: String| ParseError::InvalidNumber {
            literal,
            position: token.pos,
        };
        match &token.kind {
            TokenKind::Integer(n) if negative => n
                .checked_neg()
                .map(Literal::Integer)
                .ok_or_else(|| invalid(format!("-{}", n))),
            TokenKind::Integer(n) => Ok(Literal::Integer(*n)),
            TokenKind::Decimal(s) => {
                let value = Decimal::from_str(s).map_err(|_| invalid(s.clone()))?;
                Ok(Literal::Decimal(if negative { -value } else { value }))
            }
            _ => Err(self.unexpected("number")),
        }
    }

    fn current(&self) -> &Token {
        // the token list always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        let index = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn peek_name(&self) -> Option<String> {
        match self.peek() {
            TokenKind::Ident(name) | TokenKind::QuotedIdent(name) => Some(name.clone()),
            _ => None,
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<()> {
        if self.consume(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        match &token.kind {
            TokenKind::Eof => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
                position: token.pos,
            },
            found => ParseError::UnexpectedToken {
                found: found.to_string(),
                expected: expected.to_string(),
                position: token.pos,
            },
        }
    }
}

/// Splits `sql` on semicolons outside quotes.
///
/// Returns each segment with its byte offset. Fails if a quote is never
/// closed.
fn split_statements(sql: &str) -> ParseResult<Vec<(usize, &str)>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<(char, usize)> = None;

    for (i, c) in sql.char_indices() {
        match (quote, c) {
            (Some((q, _)), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some((c, i)),
            (None, ';') => {
                segments.push((start, &sql[start..i]));
                start = i + 1;
            }
            (None, _) => {}
        }
    }
    if let Some((_, position)) = quote {
        return Err(ParseError::UnterminatedQuote { position });
    }
    segments.push((start, &sql[start..]));
    Ok(segments)
}
