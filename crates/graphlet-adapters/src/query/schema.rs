//! Schema-language parser.
//!
//! Reads predicate definitions in the line format the engine reports back:
//!
//! ```text
//! User.name: string @index(exact, term) @upsert @unique .
//! User.tags: [string] .
//! Doc.vec: float32vector @index(hnsw(metric:"cosine")) .
//! Branch.proj: uid @reverse .
//! name: string @index(term) @lang .
//! type User { User.name User.tags }
//! ```
//!
//! `type` blocks are accepted and ignored: entity types are carried by the
//! `dgraph.type` predicate, not by the schema. So is `@count`, since no
//! count index is kept.

use super::dql::{Lexer, Token, TokenKind};
use graphlet_common::types::{SchemaUpdate, Tokenizer, ValueKind, VectorMetric};
use graphlet_common::utils::error::{Error, QueryError, QueryErrorKind, Result};

/// Parses schema text into predicate definitions.
///
/// # Errors
///
/// Returns a syntax error for unknown types, tokenizers, directives, or
/// malformed lines.
pub fn parse_schema(source: &str) -> Result<Vec<SchemaUpdate>> {
    SchemaParser {
        tokens: Lexer::new(source).tokenize(),
        position: 0,
        source_len: source.len(),
    }
    .parse()
}

struct SchemaParser {
    tokens: Vec<Token>,
    position: usize,
    source_len: usize,
}

impl SchemaParser {
    fn parse(&mut self) -> Result<Vec<SchemaUpdate>> {
        let mut updates = Vec::new();
        while !self.is_at_end() {
            if self.at_type_block() {
                self.skip_type_block()?;
                continue;
            }
            updates.push(self.parse_line()?);
        }
        Ok(updates)
    }

    fn at_type_block(&self) -> bool {
        matches!(self.kind_at(0), Some(TokenKind::Identifier(s)) if s == "type")
            && matches!(self.kind_at(1), Some(TokenKind::Identifier(_)))
            && matches!(self.kind_at(2), Some(TokenKind::LBrace))
    }

    fn skip_type_block(&mut self) -> Result<()> {
        self.position += 3;
        loop {
            match self.advance()?.kind {
                TokenKind::RBrace => return Ok(()),
                TokenKind::Identifier(_) => {}
                other => return Err(self.error(&format!("Unexpected {other:?} in type block"))),
            }
        }
    }

    fn parse_line(&mut self) -> Result<SchemaUpdate> {
        let predicate = self.identifier()?;
        self.expect(&TokenKind::Colon)?;

        let list = self.check(&TokenKind::LBracket);
        if list {
            self.position += 1;
        }
        let type_name = self.identifier()?;
        let kind = ValueKind::from_schema_name(&type_name)
            .ok_or_else(|| self.error(&format!("Unknown type '{type_name}'")))?;
        if list {
            self.expect(&TokenKind::RBracket)?;
        }

        let mut update = SchemaUpdate::new(predicate, kind);
        if list {
            update = update.with_list();
        }

        while self.check(&TokenKind::At) {
            self.position += 1;
            let directive = self.identifier()?;
            update = match directive.as_str() {
                "index" => self.parse_index(update)?,
                "reverse" => update.with_reverse(),
                "lang" => update.with_lang(),
                "count" => update,
                "unique" => update.with_unique(),
                "upsert" => {
                    update.upsert = true;
                    update
                }
                other => return Err(self.error(&format!("Unknown directive '@{other}'"))),
            };
        }
        self.expect(&TokenKind::Dot)?;
        Ok(update)
    }

    fn parse_index(&mut self, mut update: SchemaUpdate) -> Result<SchemaUpdate> {
        self.expect(&TokenKind::LParen)?;
        loop {
            let name = self.identifier()?;
            if name == "hnsw" {
                update = update.with_vector_index(self.parse_hnsw()?);
            } else {
                let tokenizer = Tokenizer::from_name(&name)
                    .ok_or_else(|| self.error(&format!("Unknown tokenizer '{name}'")))?;
                update = update.with_tokenizer(tokenizer);
            }
            if self.check(&TokenKind::Comma) {
                self.position += 1;
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(update)
    }

    /// Reads `(metric:"cosine", ...)`; options other than `metric` are
    /// accepted and ignored.
    fn parse_hnsw(&mut self) -> Result<VectorMetric> {
        let mut metric = VectorMetric::Euclidean;
        self.expect(&TokenKind::LParen)?;
        while !self.check(&TokenKind::RParen) {
            let option = self.identifier()?;
            self.expect(&TokenKind::Colon)?;
            let TokenKind::String(value) = self.advance()?.kind else {
                return Err(self.error("Expected quoted hnsw option value"));
            };
            if option == "metric" {
                metric = VectorMetric::from_name(&value)
                    .ok_or_else(|| self.error(&format!("Unknown metric '{value}'")))?;
            }
            if self.check(&TokenKind::Comma) {
                self.position += 1;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(metric)
    }

    fn identifier(&mut self) -> Result<String> {
        match self.advance()?.kind {
            TokenKind::Identifier(name) => Ok(name),
            other => Err(self.error(&format!("Expected name, found {other:?}"))),
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        let token = self.advance()?;
        if &token.kind == kind {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {:?}, found {:?}", kind, token.kind)))
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.kind_at(0) == Some(kind)
    }

    fn kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + offset).map(|t| &t.kind)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn advance(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or_else(|| self.error("Unexpected end of schema"))?;
        self.position += 1;
        Ok(token)
    }

    fn error(&self, message: &str) -> Error {
        let position = self
            .tokens
            .get(self.position.saturating_sub(1))
            .map_or(self.source_len, |t| t.position);
        Error::Query(QueryError::new(QueryErrorKind::Syntax, message).with_position(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let updates = parse_schema(
            r#"
            User.name: string @index(exact, term) @unique .
            User.tags: [string] .
            Doc.vec: float32vector @index(hnsw(metric:"cosine", exponent:"4")) .
            Branch.proj: uid @reverse .
            "#,
        )
        .unwrap();
        assert_eq!(updates.len(), 4);

        assert_eq!(updates[0].predicate, "User.name");
        assert!(updates[0].has_tokenizer(Tokenizer::Exact));
        assert!(updates[0].has_tokenizer(Tokenizer::Term));
        assert!(updates[0].unique && updates[0].upsert);

        assert!(updates[1].list);
        assert_eq!(updates[2].vector_index, Some(VectorMetric::Cosine));
        assert_eq!(updates[3].kind, ValueKind::Uid);
        assert!(updates[3].reverse);
    }

    #[test]
    fn test_display_parses_back() {
        let update = SchemaUpdate::new("Doc.vec", ValueKind::Vector)
            .with_vector_index(VectorMetric::DotProduct);
        let parsed = parse_schema(&update.to_string()).unwrap();
        assert_eq!(parsed, vec![update]);
    }

    #[test]
    fn test_type_blocks_are_skipped() {
        let updates = parse_schema("type User { User.name User.age }\nUser.age: int .").unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].kind, ValueKind::Int);
    }

    #[test]
    fn test_errors() {
        assert!(parse_schema("a: strng .").is_err());
        assert!(parse_schema("a: string @index(nope) .").is_err());
        assert!(parse_schema("a: string").is_err());
        assert!(parse_schema("a: string @noconflict .").is_err());
    }

    #[test]
    fn test_lang_and_count_directives() {
        let updates = parse_schema(
            "director.film: [uid] @reverse @count .\n\
             name: string @index(hash, term, trigram, fulltext) @lang .",
        )
        .unwrap();
        assert!(updates[0].reverse && updates[0].list);
        assert!(!updates[0].lang);
        assert!(updates[1].lang);
        assert!(updates[1].has_tokenizer(Tokenizer::Fulltext));
        assert_eq!(parse_schema(&updates[1].to_string()).unwrap()[0], updates[1]);
    }
}
