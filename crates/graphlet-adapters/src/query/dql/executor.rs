//! DQL evaluation over a namespace snapshot.
//!
//! The executor walks a parsed [`Request`] against one [`NamespaceStore`] at
//! a fixed read timestamp and renders the result as JSON: one array per
//! block, keyed by block name.

use std::cell::RefCell;
use std::cmp::Ordering;

use graphlet_common::types::{TYPE_PREDICATE, Timestamp, Tokenizer, Uid, Value};
use graphlet_common::utils::error::{Error, QueryError, QueryErrorKind, Result};
use graphlet_common::utils::hash::{FxHashMap, FxHashSet};
use graphlet_core::graph::NamespaceStore;
use graphlet_core::index::{tokenizer, vector};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value as Json};

use super::ast::*;

/// Default cap on the rows one `@normalize` block may produce.
pub const DEFAULT_NORMALIZE_LIMIT: usize = 10_000;

/// Evaluates requests against one namespace at one timestamp.
pub struct Executor<'a> {
    ns: &'a NamespaceStore,
    read_ts: Timestamp,
    normalize_limit: usize,
    regex_cache: RefCell<FxHashMap<String, Regex>>,
    nearest_cache: RefCell<FxHashMap<String, FxHashSet<Uid>>>,
}

impl<'a> Executor<'a> {
    /// Creates an executor reading `ns` as of `read_ts`.
    #[must_use]
    pub fn new(ns: &'a NamespaceStore, read_ts: Timestamp) -> Self {
        Self {
            ns,
            read_ts,
            normalize_limit: DEFAULT_NORMALIZE_LIMIT,
            regex_cache: RefCell::new(FxHashMap::default()),
            nearest_cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Sets the cap on rows produced by a `@normalize` block.
    #[must_use]
    pub fn with_normalize_limit(mut self, limit: usize) -> Self {
        self.normalize_limit = limit;
        self
    }

    /// Evaluates every block of the request.
    ///
    /// # Errors
    ///
    /// Returns a query error for missing indexes, literals that do not fit
    /// the predicate type, invalid regular expressions, and `@normalize`
    /// blocks that flatten into more rows than the limit.
    pub fn execute(&self, request: &Request) -> Result<Json> {
        let mut out = Map::new();
        for block in &request.blocks {
            match block {
                Block::Query(query) => {
                    let rendered = self.execute_block(query)?;
                    out.insert(query.name.clone(), rendered);
                }
                Block::Schema(schema) => {
                    out.insert("schema".to_string(), self.execute_schema(schema));
                }
            }
        }
        Ok(Json::Object(out))
    }

    fn execute_block(&self, block: &QueryBlock) -> Result<Json> {
        let mut uids = self.root_candidates(&block.root)?;

        if let Some(filter) = &block.filter {
            let mut kept = Vec::with_capacity(uids.len());
            for uid in uids {
                if self.matches(filter, uid)? {
                    kept.push(uid);
                }
            }
            uids = kept;
        }

        if !block.order.is_empty() {
            self.sort(&mut uids, &block.order);
        }
        if let Some(after) = block.after {
            uids.retain(|uid| *uid > after);
        }
        let uids: Vec<Uid> = uids
            .into_iter()
            .skip(block.offset.unwrap_or(0))
            .take(block.first.unwrap_or(usize::MAX))
            .collect();

        let mut nodes = Vec::with_capacity(uids.len());
        for uid in uids {
            let node = self.render_node(uid, &block.selection)?;
            if !node.is_empty() {
                nodes.push(node);
            }
        }
        if block.normalize {
            return self.normalize(block, &nodes).map(Json::Array);
        }
        Ok(Json::Array(nodes.into_iter().map(Json::Object).collect()))
    }

    fn normalize(&self, block: &QueryBlock, nodes: &[Map<String, Json>]) -> Result<Vec<Json>> {
        let limit = self.normalize_limit;
        let exceeded = || {
            query_error(
                QueryErrorKind::LimitExceeded,
                format!("normalized block {} has more than {limit} rows", block.name),
            )
        };
        let mut rows = Vec::new();
        for node in nodes {
            let flat = flatten(node, &block.selection, limit).ok_or_else(exceeded)?;
            rows.extend(flat.into_iter().filter(|row| !row.is_empty()).map(Json::Object));
            if rows.len() > limit {
                return Err(exceeded());
            }
        }
        Ok(rows)
    }

    /// Returns the entities selected by a root function, in result order.
    fn root_candidates(&self, root: &Function) -> Result<Vec<Uid>> {
        match root {
            Function::Uid(list) => {
                let mut uids = list.clone();
                uids.sort_unstable();
                uids.dedup();
                uids.retain(|uid| self.ns.exists(*uid, self.read_ts));
                Ok(uids)
            }
            Function::SimilarTo {
                predicate,
                k,
                vector,
            } => self.nearest(predicate, *k, vector),
            Function::Type(_) => self.scan_matching(TYPE_PREDICATE, root),
            Function::Has(predicate)
            | Function::Compare { predicate, .. }
            | Function::Terms { predicate, .. }
            | Function::Text { predicate, .. }
            | Function::Regexp { predicate, .. } => self.scan_matching(predicate, root),
        }
    }

    fn scan_matching(&self, predicate: &str, function: &Function) -> Result<Vec<Uid>> {
        let mut result = Vec::new();
        for (uid, _) in self.ns.scan(predicate, self.read_ts) {
            if self.eval(function, uid)? {
                result.push(uid);
            }
        }
        Ok(result)
    }

    fn matches(&self, filter: &FilterExpr, uid: Uid) -> Result<bool> {
        Ok(match filter {
            FilterExpr::And(left, right) => self.matches(left, uid)? && self.matches(right, uid)?,
            FilterExpr::Or(left, right) => self.matches(left, uid)? || self.matches(right, uid)?,
            FilterExpr::Not(inner) => !self.matches(inner, uid)?,
            FilterExpr::Func(function) => self.eval(function, uid)?,
        })
    }

    fn eval(&self, function: &Function, uid: Uid) -> Result<bool> {
        let ts = self.read_ts;
        Ok(match function {
            Function::Uid(list) => list.contains(&uid),
            Function::Type(type_name) => self
                .ns
                .values(TYPE_PREDICATE, uid, ts)
                .is_some_and(|types| types.iter().any(|t| t.as_str() == Some(type_name))),
            Function::Has(predicate) => self.ns.values(predicate, uid, ts).is_some(),
            Function::Compare {
                op,
                predicate,
                value,
            } => {
                let Some(schema) = self.ns.predicate(predicate) else {
                    return Ok(false);
                };
                let literal = value.convert(schema.kind).map_err(|e| {
                    query_error(
                        QueryErrorKind::Semantic,
                        format!("invalid literal for {predicate}: {e}"),
                    )
                })?;
                self.ns
                    .values(predicate, uid, ts)
                    .unwrap_or_default()
                    .iter()
                    .any(|stored| compare(stored, *op, &literal))
            }
            Function::Terms {
                all,
                predicate,
                text,
            } => {
                self.require_tokenizer(predicate, Tokenizer::Term, "term")?;
                let needles = tokenizer::terms(text);
                self.any_string(predicate, uid, |s| {
                    let hay = tokenizer::terms(s);
                    if *all {
                        tokenizer::contains_all(&hay, &needles)
                    } else {
                        tokenizer::contains_any(&hay, &needles)
                    }
                })
            }
            Function::Text {
                all,
                predicate,
                text,
            } => {
                self.require_tokenizer(predicate, Tokenizer::Fulltext, "fulltext")?;
                let needles = tokenizer::fulltext(text);
                self.any_string(predicate, uid, |s| {
                    let hay = tokenizer::fulltext(s);
                    if *all {
                        tokenizer::contains_all(&hay, &needles)
                    } else {
                        tokenizer::contains_any(&hay, &needles)
                    }
                })
            }
            Function::Regexp {
                predicate,
                pattern,
                flags,
            } => {
                self.require_tokenizer(predicate, Tokenizer::Trigram, "trigram")?;
                let regex = self.regex(pattern, flags)?;
                self.any_string(predicate, uid, |s| regex.is_match(s))
            }
            Function::SimilarTo {
                predicate,
                k,
                vector,
            } => {
                let key = format!("{predicate}/{k}/{vector:?}");
                if let Some(set) = self.nearest_cache.borrow().get(&key) {
                    return Ok(set.contains(&uid));
                }
                let set: FxHashSet<Uid> = self.nearest(predicate, *k, vector)?.into_iter().collect();
                let hit = set.contains(&uid);
                self.nearest_cache.borrow_mut().insert(key, set);
                hit
            }
        })
    }

    fn any_string(&self, predicate: &str, uid: Uid, test: impl Fn(&str) -> bool) -> bool {
        self.ns
            .values(predicate, uid, self.read_ts)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .any(test)
    }

    fn require_tokenizer(&self, predicate: &str, tokenizer: Tokenizer, name: &str) -> Result<()> {
        match self.ns.predicate(predicate) {
            Some(schema) if schema.has_tokenizer(tokenizer) => Ok(()),
            _ => Err(query_error(
                QueryErrorKind::MissingIndex,
                format!("attribute {predicate} is not indexed with tokenizer {name}"),
            )),
        }
    }

    fn regex(&self, pattern: &str, flags: &str) -> Result<Regex> {
        let key = format!("{flags}/{pattern}");
        if let Some(regex) = self.regex_cache.borrow().get(&key) {
            return Ok(regex.clone());
        }
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .build()
            .map_err(|e| query_error(QueryErrorKind::Semantic, format!("invalid regexp: {e}")))?;
        self.regex_cache.borrow_mut().insert(key, regex.clone());
        Ok(regex)
    }

    fn nearest(&self, predicate: &str, k: usize, probe: &[f32]) -> Result<Vec<Uid>> {
        let Some(metric) = self.ns.predicate(predicate).and_then(|s| s.vector_index) else {
            return Err(query_error(
                QueryErrorKind::MissingIndex,
                format!("attribute {predicate} has no vector index"),
            ));
        };
        let rows = self.ns.scan(predicate, self.read_ts);
        let candidates = rows.iter().filter_map(|(uid, values)| match values.first() {
            Some(Value::Vector(v)) => Some((*uid, v.as_slice())),
            _ => None,
        });
        Ok(vector::nearest(candidates, probe, k, metric)
            .into_iter()
            .map(|(uid, _)| uid)
            .collect())
    }

    fn sort(&self, uids: &mut [Uid], keys: &[OrderKey]) {
        let sort_values: FxHashMap<Uid, Vec<Option<Value>>> = uids
            .iter()
            .map(|uid| {
                let values = keys
                    .iter()
                    .map(|key| {
                        self.ns
                            .values(&key.predicate, *uid, self.read_ts)
                            .and_then(|v| v.into_iter().next())
                    })
                    .collect();
                (*uid, values)
            })
            .collect();

        uids.sort_by(|a, b| {
            let (va, vb) = (&sort_values[a], &sort_values[b]);
            for (i, key) in keys.iter().enumerate() {
                let ord = match (&va[i], &vb[i]) {
                    (Some(x), Some(y)) => {
                        let ord = x.compare(y).unwrap_or(Ordering::Equal);
                        if key.descending { ord.reverse() } else { ord }
                    }
                    // Entities without the key sort last either way.
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    fn render_node(&self, uid: Uid, selection: &[Selection]) -> Result<Map<String, Json>> {
        let mut node = Map::new();
        for item in selection {
            match item {
                Selection::Uid => {
                    node.insert("uid".to_string(), Json::String(uid.to_string()));
                }
                Selection::Predicate {
                    alias,
                    name,
                    children,
                } => {
                    if let Some(values) = self.ns.values(name, uid, self.read_ts) {
                        let key = alias.clone().unwrap_or_else(|| name.clone());
                        let rendered = self.render_values(name, &values, children.as_deref())?;
                        node.insert(key, rendered);
                    }
                }
                Selection::ExpandAll { children } => {
                    for (name, values) in self.ns.predicates_of(uid, self.read_ts) {
                        if name == TYPE_PREDICATE || node.contains_key(&name) {
                            continue;
                        }
                        let rendered = self.render_values(&name, &values, children.as_deref())?;
                        node.insert(name, rendered);
                    }
                }
                Selection::Reverse {
                    alias,
                    predicate,
                    children,
                } => {
                    if let Some(schema) = self.ns.predicate(predicate) {
                        if !schema.reverse {
                            return Err(query_error(
                                QueryErrorKind::Semantic,
                                format!("predicate {predicate} doesn't have reverse edge"),
                            ));
                        }
                    }
                    let mut rendered = Vec::new();
                    for source in self.ns.reverse(predicate, uid, self.read_ts) {
                        let child = self.render_node(source, children)?;
                        if !child.is_empty() {
                            rendered.push(Json::Object(child));
                        }
                    }
                    if !rendered.is_empty() {
                        let key = alias.clone().unwrap_or_else(|| format!("~{predicate}"));
                        node.insert(key, Json::Array(rendered));
                    }
                }
            }
        }
        Ok(node)
    }

    fn render_values(
        &self,
        predicate: &str,
        values: &[Value],
        children: Option<&[Selection]>,
    ) -> Result<Json> {
        let list = self.ns.predicate(predicate).is_some_and(|s| s.list);
        let mut rendered = Vec::with_capacity(values.len());
        for value in values {
            rendered.push(match (value, children) {
                (Value::Uid(target), Some(children)) => {
                    Json::Object(self.render_node(*target, children)?)
                }
                (other, _) => other.to_json(),
            });
        }
        Ok(if list {
            Json::Array(rendered)
        } else {
            rendered.into_iter().next().unwrap_or(Json::Null)
        })
    }

    fn execute_schema(&self, block: &SchemaBlock) -> Json {
        let wants = |field: &str| block.fields.is_empty() || block.fields.iter().any(|f| f == field);
        let entries = self
            .ns
            .schema()
            .into_iter()
            .filter(|s| block.predicates.is_empty() || block.predicates.contains(&s.predicate))
            .map(|s| {
                let mut entry = Map::new();
                entry.insert("predicate".to_string(), Json::String(s.predicate.clone()));
                if wants("type") {
                    entry.insert("type".to_string(), Json::String(s.kind.to_string()));
                }
                if wants("index") && s.is_indexed() {
                    entry.insert("index".to_string(), Json::Bool(true));
                }
                if wants("tokenizer") && !s.tokenizers.is_empty() {
                    let names = s.tokenizers.iter().map(|t| Json::from(t.name())).collect();
                    entry.insert("tokenizer".to_string(), Json::Array(names));
                }
                if wants("list") && s.list {
                    entry.insert("list".to_string(), Json::Bool(true));
                }
                if wants("reverse") && s.reverse {
                    entry.insert("reverse".to_string(), Json::Bool(true));
                }
                if wants("upsert") && s.upsert {
                    entry.insert("upsert".to_string(), Json::Bool(true));
                }
                if wants("unique") && s.unique {
                    entry.insert("unique".to_string(), Json::Bool(true));
                }
                Json::Object(entry)
            })
            .collect();
        Json::Array(entries)
    }
}

fn compare(stored: &Value, op: CompareOp, literal: &Value) -> bool {
    match op {
        CompareOp::Eq => stored == literal || stored.compare(literal) == Some(Ordering::Equal),
        CompareOp::Lt => stored.compare(literal) == Some(Ordering::Less),
        CompareOp::Le => matches!(
            stored.compare(literal),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => stored.compare(literal) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            stored.compare(literal),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

/// Lifts aliased fields of `node` and its nested edges into flat rows, one
/// per combination of nested children. Returns `None` past `limit` rows.
fn flatten(
    node: &Map<String, Json>,
    selection: &[Selection],
    limit: usize,
) -> Option<Vec<Map<String, Json>>> {
    let mut rows = vec![Map::new()];
    for item in selection {
        let (key, aliased, children) = match item {
            Selection::Predicate {
                alias,
                name,
                children,
            } => (
                alias.clone().unwrap_or_else(|| name.clone()),
                alias.is_some(),
                children.as_deref(),
            ),
            Selection::Reverse {
                alias,
                predicate,
                children,
            } => (
                alias.clone().unwrap_or_else(|| format!("~{predicate}")),
                alias.is_some(),
                Some(children.as_slice()),
            ),
            Selection::Uid | Selection::ExpandAll { .. } => continue,
        };
        let Some(value) = node.get(&key) else {
            continue;
        };

        let Some(children) = children else {
            if aliased {
                for row in &mut rows {
                    row.insert(key.clone(), value.clone());
                }
            }
            continue;
        };
        let objects: Vec<&Map<String, Json>> = match value {
            Json::Object(object) => vec![object],
            Json::Array(items) => items.iter().filter_map(Json::as_object).collect(),
            _ => Vec::new(),
        };
        let mut nested = Vec::new();
        for object in objects {
            nested.extend(flatten(object, children, limit)?);
        }
        nested.retain(|row| !row.is_empty());
        if nested.is_empty() {
            continue;
        }

        let mut product = Vec::new();
        for row in &rows {
            for child in &nested {
                let mut merged = row.clone();
                merged.extend(child.clone());
                product.push(merged);
                if product.len() > limit {
                    return None;
                }
            }
        }
        rows = product;
    }
    Some(rows)
}

fn query_error(kind: QueryErrorKind, message: String) -> Error {
    Error::Query(QueryError::new(kind, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::dql::parse;
    use graphlet_common::types::{
        Mutation, NamespaceId, SchemaUpdate, Triple, ValueKind, VectorMetric,
    };

    fn ts(v: u64) -> Timestamp {
        Timestamp::new(v)
    }

    fn users() -> NamespaceStore {
        let ns = NamespaceStore::new(NamespaceId::DEFAULT);
        ns.alter_schema(&[
            SchemaUpdate::new("User.name", ValueKind::String)
                .with_tokenizer(Tokenizer::Exact)
                .with_tokenizer(Tokenizer::Term)
                .with_tokenizer(Tokenizer::Trigram),
            SchemaUpdate::new("User.age", ValueKind::Int).with_tokenizer(Tokenizer::Int),
            SchemaUpdate::new("User.bio", ValueKind::String).with_tokenizer(Tokenizer::Fulltext),
            SchemaUpdate::new("User.manager", ValueKind::Uid).with_reverse(),
        ])
        .unwrap();

        let mut mutation = Mutation::new();
        let rows = [("A", 10), ("B", 20), ("C", 30), ("D", 40), ("E", 50)];
        for (i, (name, age)) in rows.iter().enumerate() {
            let uid = Uid::new(i as u64 + 2);
            mutation.set.push(Triple::new(uid, TYPE_PREDICATE, "User"));
            mutation.set.push(Triple::new(uid, "User.name", *name));
            mutation.set.push(Triple::new(uid, "User.age", *age as i64));
        }
        mutation
            .set
            .push(Triple::new(Uid::new(2), "User.bio", "Enjoys running marathons"));
        mutation
            .set
            .push(Triple::new(Uid::new(3), "User.manager", Uid::new(2)));
        mutation
            .set
            .push(Triple::new(Uid::new(4), "User.manager", Uid::new(2)));
        let prepared = ns.prepare(&mutation).unwrap();
        ns.apply(&prepared, ts(5)).unwrap();
        ns
    }

    fn run(ns: &NamespaceStore, query: &str) -> Result<Json> {
        Executor::new(ns, ts(5)).execute(&parse(query)?)
    }

    fn names(result: &Json, block: &str) -> Vec<String> {
        result[block]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["User.name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_uid_root_renders_fields() {
        let ns = users();
        let result = run(&ns, "{ obj(func: uid(0x2)) { uid expand(_all_) dgraph.type } }").unwrap();
        let node = &result["obj"][0];
        assert_eq!(node["uid"], "0x2");
        assert_eq!(node["User.name"], "A");
        assert_eq!(node["User.age"], 10);
        assert_eq!(node["dgraph.type"], serde_json::json!(["User"]));
    }

    #[test]
    fn test_missing_uid_is_empty() {
        let ns = users();
        let result = run(&ns, "{ obj(func: uid(0x99)) { uid } }").unwrap();
        assert_eq!(result["obj"], serde_json::json!([]));
    }

    #[test]
    fn test_filter_converts_literal() {
        let ns = users();
        let result = run(
            &ns,
            r#"{ objs(func: type("User")) @filter(ge(User.age, "20")) { User.name } }"#,
        )
        .unwrap();
        assert_eq!(names(&result, "objs"), vec!["B", "C", "D", "E"]);
    }

    #[test]
    fn test_pagination_and_sorting() {
        let ns = users();
        let result = run(
            &ns,
            r#"{ objs(func: type("User"), first: 3, offset: 1, orderdesc: User.age) { User.name } }"#,
        )
        .unwrap();
        assert_eq!(names(&result, "objs"), vec!["D", "C", "B"]);

        let after = run(&ns, r#"{ objs(func: type("User"), after: 0x4) { User.name } }"#).unwrap();
        assert_eq!(names(&after, "objs"), vec!["D", "E"]);
    }

    #[test]
    fn test_logical_filters() {
        let ns = users();
        let result = run(
            &ns,
            r#"{ q(func: type("User")) @filter(lt(User.age, 25) OR NOT le(User.age, 40)) { User.name } }"#,
        )
        .unwrap();
        assert_eq!(names(&result, "q"), vec!["A", "B", "E"]);
    }

    #[test]
    fn test_term_text_and_regexp() {
        let ns = users();
        let terms = run(&ns, r#"{ q(func: anyofterms(User.name, "a z")) { User.name } }"#).unwrap();
        assert_eq!(names(&terms, "q"), vec!["A"]);

        let text = run(&ns, r#"{ q(func: alloftext(User.bio, "marathon run")) { User.name } }"#).unwrap();
        assert_eq!(names(&text, "q"), vec!["A"]);

        let regex = run(&ns, r#"{ q(func: regexp(User.name, /^[b-c]$/i)) { User.name } }"#).unwrap();
        assert_eq!(names(&regex, "q"), vec!["B", "C"]);
    }

    #[test]
    fn test_missing_index_is_an_error() {
        let ns = users();
        let err = run(&ns, r#"{ q(func: anyoftext(User.name, "a")) { uid } }"#).unwrap_err();
        assert!(matches!(
            err,
            Error::Query(QueryError { kind: QueryErrorKind::MissingIndex, .. })
        ));
    }

    #[test]
    fn test_reverse_edges() {
        let ns = users();
        let result = run(
            &ns,
            "{ obj(func: uid(0x2)) { uid reports: ~User.manager { User.name } } }",
        )
        .unwrap();
        assert_eq!(
            result["obj"][0]["reports"],
            serde_json::json!([{ "User.name": "B" }, { "User.name": "C" }])
        );

        let forward = run(&ns, "{ obj(func: uid(0x3)) { User.manager { User.name } } }").unwrap();
        assert_eq!(forward["obj"][0]["User.manager"]["User.name"], "A");
    }

    #[test]
    fn test_similar_to_orders_by_distance() {
        let ns = NamespaceStore::new(NamespaceId::DEFAULT);
        ns.alter_schema(&[SchemaUpdate::new("Doc.vec", ValueKind::Vector)
            .with_vector_index(VectorMetric::Cosine)])
            .unwrap();
        let mutation = Mutation {
            set: vec![
                Triple::new(Uid::new(2), "Doc.vec", vec![0.0_f32, 1.0]),
                Triple::new(Uid::new(3), "Doc.vec", vec![1.0_f32, 0.0]),
                Triple::new(Uid::new(4), "Doc.vec", vec![0.9_f32, 0.1]),
            ],
            del: Vec::new(),
        };
        ns.apply(&ns.prepare(&mutation).unwrap(), ts(5)).unwrap();

        let result = run(&ns, r#"{ q(func: similar_to(Doc.vec, 2, "[1.0, 0.0]")) { uid } }"#).unwrap();
        assert_eq!(result["q"], serde_json::json!([{ "uid": "0x3" }, { "uid": "0x4" }]));

        let filtered = run(
            &ns,
            r#"{ q(func: has(Doc.vec)) @filter(similar_to(Doc.vec, 1, "[0.0, 1.0]")) { uid } }"#,
        )
        .unwrap();
        assert_eq!(filtered["q"], serde_json::json!([{ "uid": "0x2" }]));
    }

    #[test]
    fn test_normalize_flattens_aliased_fields() {
        let ns = users();
        let result = run(
            &ns,
            "{ q(func: has(User.manager)) @normalize { uid name: User.name User.age User.manager { boss: User.name } } }",
        )
        .unwrap();
        assert_eq!(
            result["q"],
            serde_json::json!([{ "name": "B", "boss": "A" }, { "name": "C", "boss": "A" }])
        );

        let fanned = run(
            &ns,
            "{ q(func: uid(0x2)) @normalize { boss: User.name ~User.manager { report: User.name } } }",
        )
        .unwrap();
        assert_eq!(
            fanned["q"],
            serde_json::json!([{ "boss": "A", "report": "B" }, { "boss": "A", "report": "C" }])
        );
    }

    #[test]
    fn test_normalize_limit_only_applies_to_normalize() {
        let ns = users();
        let executor = Executor::new(&ns, ts(5)).with_normalize_limit(2);
        let plain = executor
            .execute(&parse(r#"{ q(func: type("User")) { uid } }"#).unwrap())
            .unwrap();
        assert_eq!(plain["q"].as_array().map(Vec::len), Some(5));

        let err = executor
            .execute(&parse(r#"{ q(func: type("User")) @normalize { n: User.name } }"#).unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("limit exceeded"));

        let fanned = Executor::new(&ns, ts(5))
            .with_normalize_limit(1)
            .execute(
                &parse("{ q(func: uid(0x2)) @normalize { ~User.manager { r: User.name } } }").unwrap(),
            )
            .unwrap_err();
        assert!(fanned.to_string().contains("limit exceeded"));
    }

    #[test]
    fn test_schema_block() {
        let ns = users();
        let result = run(&ns, "{ schema(pred: [User.age]) { type index } }").unwrap();
        assert_eq!(
            result["schema"],
            serde_json::json!([{ "predicate": "User.age", "type": "int", "index": true }])
        );
    }

    #[test]
    fn test_snapshot_isolation() {
        let ns = users();
        let result = Executor::new(&ns, ts(4))
            .execute(&parse(r#"{ q(func: type("User")) { uid } }"#).unwrap())
            .unwrap();
        assert_eq!(result["q"], serde_json::json!([]));
    }
}
