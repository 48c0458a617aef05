//! N-Quad reader for bulk loads.
//!
//! One statement per line:
//!
//! ```text
//! <0x1f> <name> "Marc Caro"@en .
//! _:film <director.film> <12534504120601169429> .
//! _:film <year> "1991"^^<xs:int> .
//! ```
//!
//! Node labels other than `0x` ids (blank nodes and plain numeric ids) are
//! returned as-is; the loader maps them to freshly leased uids. A trailing
//! graph label is accepted and ignored. Facets are not supported.

use graphlet_common::types::{Uid, Value, ValueKind};
use graphlet_common::utils::error::{Error, QueryError, QueryErrorKind, Result};

/// Subject or object node of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// An existing entity, written `<0x..>`.
    Uid(Uid),
    /// A label to be mapped to a new entity: `_:name` or `<12345>`.
    Label(String),
}

/// Object of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// An edge to another node.
    Node(Node),
    /// A typed literal.
    Value(Value),
}

/// One parsed statement. Language tags are folded into the predicate
/// (`name@en`).
#[derive(Debug, Clone, PartialEq)]
pub struct NQuad {
    /// Subject node.
    pub subject: Node,
    /// Predicate name.
    pub predicate: String,
    /// Edge target or literal.
    pub object: Object,
}

/// Parses N-Quad text. Blank lines and `#` comments are skipped.
///
/// # Errors
///
/// Returns a syntax error naming the line for malformed statements and
/// literals that do not convert to their declared type.
pub fn parse_nquads(source: &str) -> Result<Vec<NQuad>> {
    let mut quads = Vec::new();
    let mut offset = 0;
    for (index, line) in source.lines().enumerate() {
        let start = offset;
        offset += line.len() + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let quad = LineParser { rest: trimmed }.parse().map_err(|message| {
            Error::Query(
                QueryError::new(QueryErrorKind::Syntax, format!("line {}: {message}", index + 1))
                    .with_position(start),
            )
        })?;
        quads.push(quad);
    }
    Ok(quads)
}

struct LineParser<'a> {
    rest: &'a str,
}

impl<'a> LineParser<'a> {
    fn parse(mut self) -> std::result::Result<NQuad, String> {
        let subject = self.node()?;
        let predicate = self.iri()?.to_string();
        if predicate.is_empty() {
            return Err("empty predicate".into());
        }
        self.skip_space();
        let (predicate, object) = if self.rest.starts_with('"') {
            let (tag, value) = self.literal()?;
            match tag {
                Some(tag) => (format!("{predicate}@{tag}"), Object::Value(value)),
                None => (predicate, Object::Value(value)),
            }
        } else {
            (predicate, Object::Node(self.node()?))
        };
        self.skip_space();
        if self.rest.starts_with('<') || self.rest.starts_with("_:") {
            self.node()?;
            self.skip_space();
        }
        if self.rest.starts_with('(') {
            return Err("facets are not supported".into());
        }
        if self.rest != "." {
            return Err(format!("expected '.' at end of statement, found '{}'", self.rest));
        }
        Ok(NQuad {
            subject,
            predicate,
            object,
        })
    }

    fn node(&mut self) -> std::result::Result<Node, String> {
        self.skip_space();
        if let Some(rest) = self.rest.strip_prefix("_:") {
            let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
            if len == 0 {
                return Err("empty blank node label".into());
            }
            self.rest = &rest[len..];
            return Ok(Node::Label(format!("_:{}", &rest[..len])));
        }
        let iri = self.iri()?;
        if let Some(hex) = iri.strip_prefix("0x").or_else(|| iri.strip_prefix("0X")) {
            let raw = u64::from_str_radix(hex, 16).map_err(|_| format!("invalid uid <{iri}>"))?;
            if raw == 0 {
                return Err("uid 0x0 is not a valid node".into());
            }
            return Ok(Node::Uid(Uid::new(raw)));
        }
        if iri.is_empty() {
            return Err("empty node id".into());
        }
        Ok(Node::Label(iri.to_string()))
    }

    fn iri(&mut self) -> std::result::Result<&'a str, String> {
        self.skip_space();
        let Some(rest) = self.rest.strip_prefix('<') else {
            return Err(format!("expected '<', found '{}'", self.rest));
        };
        let end = rest.find('>').ok_or("unterminated '<'")?;
        self.rest = &rest[end + 1..];
        Ok(rest[..end].trim())
    }

    fn literal(&mut self) -> std::result::Result<(Option<String>, Value), String> {
        let source = self.rest;
        let mut text = String::new();
        let mut chars = source[1..].char_indices();
        let end = loop {
            match chars.next() {
                Some((i, '"')) => break i + 2,
                Some((_, '\\')) => match chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, 'r')) => text.push('\r'),
                    Some((_, c @ ('"' | '\\'))) => text.push(c),
                    Some((_, 'u')) => {
                        let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                        let c = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| format!("invalid escape \\u{hex}"))?;
                        text.push(c);
                    }
                    other => {
                        return Err(format!("invalid escape {:?}", other.map(|(_, c)| c)));
                    }
                },
                Some((_, c)) => text.push(c),
                None => return Err("unterminated string literal".into()),
            }
        };
        self.rest = &source[end..];

        if let Some(rest) = self.rest.strip_prefix('@') {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                .unwrap_or(rest.len());
            if len == 0 {
                return Err("empty language tag".into());
            }
            self.rest = &rest[len..];
            return Ok((Some(rest[..len].to_string()), Value::String(text)));
        }
        if let Some(rest) = self.rest.strip_prefix("^^") {
            self.rest = rest;
            let datatype = self.iri()?;
            let kind = datatype_kind(datatype)
                .ok_or_else(|| format!("unsupported datatype <{datatype}>"))?;
            let value = Value::String(text)
                .convert(kind)
                .map_err(|e| format!("literal of type <{datatype}>: {e}"))?;
            return Ok((None, value));
        }
        Ok((None, Value::String(text)))
    }

    fn skip_space(&mut self) {
        self.rest = self.rest.trim_start();
    }
}

/// Maps `xs:int` and `http://www.w3.org/2001/XMLSchema#int` alike.
fn datatype_kind(datatype: &str) -> Option<ValueKind> {
    let name = datatype
        .rsplit_once(['#', ':'])
        .map_or(datatype, |(_, name)| name);
    Some(match name {
        "string" => ValueKind::String,
        "int" | "integer" | "long" => ValueKind::Int,
        "float" | "double" | "decimal" => ValueKind::Float,
        "boolean" => ValueKind::Bool,
        "dateTime" | "date" => ValueKind::DateTime,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statements() {
        let quads = parse_nquads(
            r#"
            # films
            <12534504120601169429> <name> "Marc Caro"@en .
            _:film <director.film> <0x2a> .
            _:film <year> "1991"^^<xs:int> .
            _:film <rating> "7.5"^^<http://www.w3.org/2001/XMLSchema#double> <graph> .
            _:film <note> "a \"b\"\n" .
            "#,
        )
        .unwrap();
        assert_eq!(quads.len(), 5);

        assert_eq!(quads[0].subject, Node::Label("12534504120601169429".into()));
        assert_eq!(quads[0].predicate, "name@en");
        assert_eq!(quads[0].object, Object::Value(Value::String("Marc Caro".into())));

        assert_eq!(quads[1].subject, Node::Label("_:film".into()));
        assert_eq!(quads[1].object, Object::Node(Node::Uid(Uid::new(0x2a))));

        assert_eq!(quads[2].object, Object::Value(Value::Int(1991)));
        assert_eq!(quads[3].object, Object::Value(Value::Float(7.5)));
        assert_eq!(quads[4].object, Object::Value(Value::String("a \"b\"\n".into())));
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = parse_nquads("<a> <b> \"c\" .\n<a> <b> \"c\"").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        assert!(parse_nquads("<a> <b> \"x\"^^<xs:int> .").is_err());
        assert!(parse_nquads("<a> <b> \"x\"^^<xs:geo> .").is_err());
        assert!(parse_nquads("<a> <b> <0x0> .").is_err());
        assert!(parse_nquads("<a> <b> \"c\" (since=2020) .").is_err());
        assert!(parse_nquads("<a> <b> \"unterminated .").is_err());
    }
}
