//! DQL Parser.
//!
//! Parses tokenized DQL into a [`Request`].

use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use graphlet_common::types::{Uid, Value, ValueKind};
use graphlet_common::utils::error::{Error, QueryError, QueryErrorKind, Result};

/// DQL parser.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        Self {
            tokens,
            position: 0,
            source,
        }
    }

    /// Parses the source into a request.
    ///
    /// # Errors
    ///
    /// Returns a syntax error describing the first unexpected token.
    pub fn parse(&mut self) -> Result<Request> {
        self.expect(&TokenKind::LBrace)?;
        let mut blocks = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.error("Unexpected end of input, expected '}'"));
            }
            blocks.push(self.parse_block()?);
        }
        self.expect(&TokenKind::RBrace)?;
        if !self.is_at_end() {
            return Err(self.error("Unexpected input after request"));
        }
        if blocks.is_empty() {
            return Err(self.error("Request has no blocks"));
        }
        Ok(Request { blocks })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let name = self.parse_identifier()?;
        if name == "schema" {
            return self.parse_schema_block().map(Block::Schema);
        }

        self.expect(&TokenKind::LParen)?;
        let mut block = QueryBlock {
            name,
            root: Function::Uid(Vec::new()),
            first: None,
            offset: None,
            after: None,
            order: Vec::new(),
            filter: None,
            normalize: false,
            selection: Vec::new(),
        };
        let mut has_root = false;
        loop {
            let arg = self.parse_identifier()?;
            self.expect(&TokenKind::Colon)?;
            match arg.as_str() {
                "func" => {
                    block.root = self.parse_function()?;
                    has_root = true;
                }
                "first" => block.first = Some(self.parse_count()?),
                "offset" => block.offset = Some(self.parse_count()?),
                "after" => block.after = Some(self.parse_uid()?),
                "orderasc" | "orderdesc" => block.order.push(OrderKey {
                    predicate: self.parse_identifier()?,
                    descending: arg == "orderdesc",
                }),
                other => return Err(self.error(&format!("Unknown block argument '{other}'"))),
            }
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        if !has_root {
            return Err(self.error("Block requires a func argument"));
        }

        while self.check(&TokenKind::At) {
            self.advance();
            let directive = self.parse_identifier()?;
            if directive == "normalize" {
                block.normalize = true;
                continue;
            }
            if directive != "filter" {
                return Err(self.error(&format!("Unsupported directive '@{directive}'")));
            }
            self.expect(&TokenKind::LParen)?;
            let filter = self.parse_or()?;
            self.expect(&TokenKind::RParen)?;
            block.filter = Some(match block.filter.take() {
                Some(existing) => FilterExpr::And(Box::new(existing), Box::new(filter)),
                None => filter,
            });
        }

        block.selection = self.parse_selection_set()?;
        Ok(Block::Query(block))
    }

    fn parse_schema_block(&mut self) -> Result<SchemaBlock> {
        let mut block = SchemaBlock::default();
        if self.check(&TokenKind::LParen) {
            self.advance();
            let arg = self.parse_identifier()?;
            if arg != "pred" {
                return Err(self.error(&format!("Unknown schema argument '{arg}'")));
            }
            self.expect(&TokenKind::Colon)?;
            if self.check(&TokenKind::LBracket) {
                self.advance();
                while !self.check(&TokenKind::RBracket) {
                    block.predicates.push(self.parse_identifier()?);
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    }
                }
                self.expect(&TokenKind::RBracket)?;
            } else {
                block.predicates.push(self.parse_identifier()?);
            }
            self.expect(&TokenKind::RParen)?;
        }
        self.expect(&TokenKind::LBrace)?;
        while !self.check(&TokenKind::RBrace) {
            block.fields.push(self.parse_identifier()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(block)
    }

    fn parse_selection_set(&mut self) -> Result<Vec<Selection>> {
        self.expect(&TokenKind::LBrace)?;
        let mut selection = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.error("Unexpected end of input in selection"));
            }
            selection.push(self.parse_selection()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(selection)
    }

    fn parse_optional_children(&mut self) -> Result<Option<Vec<Selection>>> {
        if self.check(&TokenKind::LBrace) {
            self.parse_selection_set().map(Some)
        } else {
            Ok(None)
        }
    }

    fn parse_selection(&mut self) -> Result<Selection> {
        if self.check(&TokenKind::Tilde) {
            return self.parse_reverse(None);
        }
        let name = self.parse_identifier()?;

        if self.check(&TokenKind::Colon) {
            self.advance();
            if self.check(&TokenKind::Tilde) {
                return self.parse_reverse(Some(name));
            }
            let target = self.parse_identifier()?;
            return Ok(Selection::Predicate {
                alias: Some(name),
                name: target,
                children: self.parse_optional_children()?,
            });
        }

        match name.as_str() {
            "uid" => Ok(Selection::Uid),
            "expand" => {
                self.expect(&TokenKind::LParen)?;
                let what = self.parse_identifier()?;
                if what != "_all_" {
                    return Err(self.error(&format!("Unsupported expand({what})")));
                }
                self.expect(&TokenKind::RParen)?;
                Ok(Selection::ExpandAll {
                    children: self.parse_optional_children()?,
                })
            }
            _ => Ok(Selection::Predicate {
                alias: None,
                name,
                children: self.parse_optional_children()?,
            }),
        }
    }

    fn parse_reverse(&mut self, alias: Option<String>) -> Result<Selection> {
        self.expect(&TokenKind::Tilde)?;
        let predicate = self.parse_identifier()?;
        let children = self.parse_optional_children()?.unwrap_or_else(|| vec![Selection::Uid]);
        Ok(Selection::Reverse {
            alias,
            predicate,
            children,
        })
    }

    fn parse_or(&mut self) -> Result<FilterExpr> {
        let mut left = self.parse_and()?;
        while self.check_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr> {
        let mut left = self.parse_unary()?;
        while self.check_keyword("and") {
            self.advance();
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FilterExpr> {
        if self.check_keyword("not") {
            self.advance();
            return Ok(FilterExpr::Not(Box::new(self.parse_unary()?)));
        }
        if self.check(&TokenKind::LParen) {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(inner);
        }
        self.parse_function().map(FilterExpr::Func)
    }

    fn parse_function(&mut self) -> Result<Function> {
        let name = self.parse_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let function = match name.as_str() {
            "uid" => {
                let mut uids = vec![self.parse_uid()?];
                while self.check(&TokenKind::Comma) {
                    self.advance();
                    uids.push(self.parse_uid()?);
                }
                Function::Uid(uids)
            }
            "type" => Function::Type(self.parse_string_or_identifier()?),
            "has" => Function::Has(self.parse_identifier()?),
            "allofterms" | "anyofterms" => {
                let predicate = self.parse_identifier()?;
                self.expect(&TokenKind::Comma)?;
                Function::Terms {
                    all: name == "allofterms",
                    predicate,
                    text: self.parse_string()?,
                }
            }
            "alloftext" | "anyoftext" => {
                let predicate = self.parse_identifier()?;
                self.expect(&TokenKind::Comma)?;
                Function::Text {
                    all: name == "alloftext",
                    predicate,
                    text: self.parse_string()?,
                }
            }
            "regexp" => {
                let predicate = self.parse_identifier()?;
                self.expect(&TokenKind::Comma)?;
                match self.advance_token()?.kind {
                    TokenKind::Regex { pattern, flags } => Function::Regexp {
                        predicate,
                        pattern,
                        flags,
                    },
                    _ => return Err(self.error("Expected /pattern/ in regexp")),
                }
            }
            "similar_to" => {
                let predicate = self.parse_identifier()?;
                self.expect(&TokenKind::Comma)?;
                let k = self.parse_count()?;
                self.expect(&TokenKind::Comma)?;
                let vector = self.parse_vector()?;
                Function::SimilarTo {
                    predicate,
                    k,
                    vector,
                }
            }
            other => match CompareOp::from_name(other) {
                Some(op) => {
                    let predicate = self.parse_identifier()?;
                    self.expect(&TokenKind::Comma)?;
                    Function::Compare {
                        op,
                        predicate,
                        value: self.parse_literal()?,
                    }
                }
                None => return Err(self.error(&format!("Unknown function '{other}'"))),
            },
        };
        self.expect(&TokenKind::RParen)?;
        Ok(function)
    }

    fn parse_vector(&mut self) -> Result<Vec<f32>> {
        if self.check(&TokenKind::LBracket) {
            self.advance();
            let mut vector = Vec::new();
            while !self.check(&TokenKind::RBracket) {
                vector.push(match self.advance_token()?.kind {
                    TokenKind::Float(f) => f as f32,
                    TokenKind::Integer(i) => i as f32,
                    _ => return Err(self.error("Expected number in vector")),
                });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                }
            }
            self.expect(&TokenKind::RBracket)?;
            return Ok(vector);
        }
        let text = self.parse_string()?;
        match Value::String(text).convert(ValueKind::Vector)? {
            Value::Vector(vector) => Ok(vector),
            _ => Err(self.error("Expected vector literal")),
        }
    }

    fn parse_literal(&mut self) -> Result<Value> {
        let token = self.advance_token()?;
        Ok(match token.kind {
            TokenKind::String(s) => Value::String(s),
            TokenKind::Integer(i) => Value::Int(i),
            TokenKind::Float(f) => Value::Float(f),
            TokenKind::Hex(h) => Value::Uid(Uid::new(h)),
            TokenKind::Identifier(id) if id == "true" => Value::Bool(true),
            TokenKind::Identifier(id) if id == "false" => Value::Bool(false),
            other => return Err(self.error(&format!("Expected literal, found {other:?}"))),
        })
    }

    fn parse_uid(&mut self) -> Result<Uid> {
        match self.advance_token()?.kind {
            TokenKind::Hex(h) => Ok(Uid::new(h)),
            TokenKind::Integer(i) if i >= 0 => Ok(Uid::new(i as u64)),
            TokenKind::String(s) => s.parse().map_err(|_| self.error("Invalid uid")),
            other => Err(self.error(&format!("Expected uid, found {other:?}"))),
        }
    }

    fn parse_count(&mut self) -> Result<usize> {
        match self.advance_token()?.kind {
            TokenKind::Integer(i) if i >= 0 => Ok(i as usize),
            other => Err(self.error(&format!("Expected non-negative integer, found {other:?}"))),
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        match self.advance_token()?.kind {
            TokenKind::String(s) => Ok(s),
            other => Err(self.error(&format!("Expected string, found {other:?}"))),
        }
    }

    fn parse_string_or_identifier(&mut self) -> Result<String> {
        match self.advance_token()?.kind {
            TokenKind::String(s) | TokenKind::Identifier(s) => Ok(s),
            other => Err(self.error(&format!("Expected name, found {other:?}"))),
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        match self.advance_token()?.kind {
            TokenKind::Identifier(s) => Ok(s),
            other => Err(self.error(&format!("Expected identifier, found {other:?}"))),
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(self.current_kind(), Some(TokenKind::Identifier(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn current_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.position).map(|t| &t.kind)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn advance_token(&mut self) -> Result<Token> {
        self.advance()
            .cloned()
            .ok_or_else(|| self.error("Unexpected end of input"))
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        let token = self.advance_token()?;
        if &token.kind == kind {
            Ok(token)
        } else {
            Err(self.error(&format!("Expected {:?}, found {:?}", kind, token.kind)))
        }
    }

    fn error(&self, message: &str) -> Error {
        let position = self
            .tokens
            .get(self.position.saturating_sub(1))
            .map_or(self.source.len(), |t| t.position);
        Error::Query(QueryError::new(QueryErrorKind::Syntax, message).with_position(position))
    }
}

/// Parses DQL text.
///
/// # Errors
///
/// Returns a syntax error for malformed input.
pub fn parse(source: &str) -> Result<Request> {
    Parser::new(source).parse()
}
