//! Query text construction.
//!
//! Pure functions from lookups, filter trees, pagination and sorting to
//! query text the engine evaluates. Three result shapes are produced:
//!
//! - the single-object shape used by `get`, which selects every predicate,
//!   expands one level of nested edges and reads declared reverse edges;
//! - the same shape over a type scan, used by `query`;
//! - the unstructured shape used by the raw API, which expands predicates
//!   without type information.

use std::fmt::Write as _;

use graphlet_common::types::{TYPE_PREDICATE, Uid, Value};
use graphlet_common::utils::error::{Result, ValidationError};

use crate::schema::ReverseEdge;

/// Block name of single-object queries.
pub const OBJ_BLOCK: &str = "obj";

/// Block name of multi-object queries.
pub const OBJS_BLOCK: &str = "objs";

/// An ad hoc unique lookup key: a declared field name and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainedField {
    /// Field name (declared name for typed lookups, predicate for raw).
    pub key: String,
    /// Value to match.
    pub value: Value,
}

impl ConstrainedField {
    /// Creates a lookup key.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// How to find one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// By entity id.
    Uid(Uid),
    /// By an indexed field.
    Field(ConstrainedField),
}

impl From<Uid> for Lookup {
    fn from(uid: Uid) -> Self {
        Self::Uid(uid)
    }
}

impl From<ConstrainedField> for Lookup {
    fn from(field: ConstrainedField) -> Self {
        Self::Field(field)
    }
}

impl TryFrom<Vec<ConstrainedField>> for Lookup {
    type Error = graphlet_common::Error;

    /// Accepts exactly one key.
    fn try_from(mut fields: Vec<ConstrainedField>) -> Result<Self> {
        match fields.len() {
            1 => Ok(Self::Field(fields.remove(0))),
            n => Err(ValidationError::AmbiguousUniqueKey(n).into()),
        }
    }
}

/// Scalar predicates of a filter leaf.
///
/// Comparison values are converted to the predicate's declared type by the
/// engine, so `Value::from("20")` and `Value::Int(20)` compare the same
/// against an int field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringPredicate {
    /// `eq`
    pub equals: Option<Value>,
    /// `lt`
    pub less_than: Option<Value>,
    /// `le`
    pub less_or_equal: Option<Value>,
    /// `gt`
    pub greater_than: Option<Value>,
    /// `ge`
    pub greater_or_equal: Option<Value>,
    /// `allofterms`
    pub all_of_terms: Vec<String>,
    /// `anyofterms`
    pub any_of_terms: Vec<String>,
    /// `alloftext`
    pub all_of_text: Vec<String>,
    /// `anyoftext`
    pub any_of_text: Vec<String>,
    /// `regexp`; either a bare pattern or `/pattern/flags`.
    pub regexp: Option<String>,
}

/// Vector-similarity predicate of a filter leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorPredicate {
    /// Probe vector; empty means unset.
    pub similar_to: Vec<f32>,
    /// Number of nearest neighbours to keep.
    pub top_k: usize,
}

/// A recursive predicate tree.
///
/// A node is either logical (`and`, `or`, `not`) or a leaf naming one
/// field and one predicate. Logical operators take precedence over a
/// leaf on the same node, in the order `and`, `or`, `not`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Declared field name the leaf applies to.
    pub field: String,
    /// Scalar predicate.
    pub string: StringPredicate,
    /// Vector predicate.
    pub vector: VectorPredicate,
    /// Conjunction of children.
    pub and: Vec<Filter>,
    /// Disjunction of children.
    pub or: Vec<Filter>,
    /// Negated child.
    pub not: Option<Box<Filter>>,
}

impl Filter {
    fn leaf(field: impl Into<String>, string: StringPredicate) -> Self {
        Self {
            field: field.into(),
            string,
            ..Self::default()
        }
    }

    /// `field == value`
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, StringPredicate {
            equals: Some(value.into()),
            ..StringPredicate::default()
        })
    }

    /// `field < value`
    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, StringPredicate {
            less_than: Some(value.into()),
            ..StringPredicate::default()
        })
    }

    /// `field <= value`
    #[must_use]
    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, StringPredicate {
            less_or_equal: Some(value.into()),
            ..StringPredicate::default()
        })
    }

    /// `field > value`
    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, StringPredicate {
            greater_than: Some(value.into()),
            ..StringPredicate::default()
        })
    }

    /// `field >= value`
    #[must_use]
    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, StringPredicate {
            greater_or_equal: Some(value.into()),
            ..StringPredicate::default()
        })
    }

    /// Every term must appear. Needs a `term` index.
    #[must_use]
    pub fn all_of_terms<S: Into<String>>(
        field: impl Into<String>,
        terms: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::leaf(field, StringPredicate {
            all_of_terms: terms.into_iter().map(Into::into).collect(),
            ..StringPredicate::default()
        })
    }

    /// Any term must appear. Needs a `term` index.
    #[must_use]
    pub fn any_of_terms<S: Into<String>>(
        field: impl Into<String>,
        terms: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::leaf(field, StringPredicate {
            any_of_terms: terms.into_iter().map(Into::into).collect(),
            ..StringPredicate::default()
        })
    }

    /// Every word must appear after stemming. Needs a `fulltext` index.
    #[must_use]
    pub fn all_of_text<S: Into<String>>(
        field: impl Into<String>,
        words: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::leaf(field, StringPredicate {
            all_of_text: words.into_iter().map(Into::into).collect(),
            ..StringPredicate::default()
        })
    }

    /// Any word must appear after stemming. Needs a `fulltext` index.
    #[must_use]
    pub fn any_of_text<S: Into<String>>(
        field: impl Into<String>,
        words: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::leaf(field, StringPredicate {
            any_of_text: words.into_iter().map(Into::into).collect(),
            ..StringPredicate::default()
        })
    }

    /// Regular-expression match. Needs a `trigram` index.
    #[must_use]
    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::leaf(field, StringPredicate {
            regexp: Some(pattern.into()),
            ..StringPredicate::default()
        })
    }

    /// The `top_k` entities nearest to `vector`. Needs a `vector` index.
    #[must_use]
    pub fn similar_to(field: impl Into<String>, vector: Vec<f32>, top_k: usize) -> Self {
        Self {
            field: field.into(),
            vector: VectorPredicate {
                similar_to: vector,
                top_k,
            },
            ..Self::default()
        }
    }

    /// All children must match.
    #[must_use]
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            and: filters.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Any child must match.
    #[must_use]
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            or: filters.into_iter().collect(),
            ..Self::default()
        }
    }

    /// The child must not match.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Self {
            not: Some(Box::new(filter)),
            ..Self::default()
        }
    }

    fn is_logical(&self) -> bool {
        !self.and.is_empty() || !self.or.is_empty() || self.not.is_some()
    }

    fn is_top_k(&self) -> bool {
        !self.is_logical() && !self.vector.similar_to.is_empty()
    }
}

/// Result window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of results; 0 means unbounded.
    pub limit: usize,
    /// Number of results to skip; takes precedence over `after`.
    pub offset: usize,
    /// Cursor: only entities with a larger id.
    pub after: Option<Uid>,
}

impl Pagination {
    /// A `limit`/`offset` window.
    #[must_use]
    pub const fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            after: None,
        }
    }

    /// Sets the cursor.
    #[must_use]
    pub const fn with_after(mut self, after: Uid) -> Self {
        self.after = Some(after);
        self
    }
}

/// Result order: at most one ascending and one descending key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sorting {
    /// Ascending key, by declared field name.
    pub asc_field: Option<String>,
    /// Descending key, by declared field name.
    pub desc_field: Option<String>,
    /// Whether the descending key sorts first.
    pub desc_first: bool,
}

impl Sorting {
    /// Ascending by `field`.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            asc_field: Some(field.into()),
            ..Self::default()
        }
    }

    /// Descending by `field`.
    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            desc_field: Some(field.into()),
            desc_first: true,
            ..Self::default()
        }
    }

    /// Adds a descending key after the ascending one.
    #[must_use]
    pub fn then_desc(mut self, field: impl Into<String>) -> Self {
        self.desc_field = Some(field.into());
        self.desc_first = false;
        self
    }

    /// Adds an ascending key after the descending one.
    #[must_use]
    pub fn then_asc(mut self, field: impl Into<String>) -> Self {
        self.asc_field = Some(field.into());
        self.desc_first = true;
        self
    }
}

/// Filter, pagination and sorting of a typed query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    /// Predicate tree.
    pub filter: Option<Filter>,
    /// Result window.
    pub pagination: Option<Pagination>,
    /// Result order.
    pub sorting: Option<Sorting>,
}

impl QueryParams {
    /// No filter, window or order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the result window.
    #[must_use]
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Sets the result order.
    #[must_use]
    pub fn with_sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = Some(sorting);
        self
    }
}

/// Renders a value as a query literal.
///
/// Strings and other text-like values are quoted, numbers and booleans are
/// bare, entity ids are hex.
#[must_use]
pub fn literal(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) if v.is_finite() => format!("{v:?}"),
        Value::Bool(v) => v.to_string(),
        Value::Uid(uid) => uid.to_string(),
        Value::String(s) => quote(s),
        Value::Vector(v) => quote(&vector_text(v)),
        other => quote(&other.to_string()),
    }
}

fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn vector_text(vector: &[f32]) -> String {
    let items: Vec<String> = vector.iter().map(f32::to_string).collect();
    format!("[{}]", items.join(","))
}

/// `uid(0x..)`
#[must_use]
pub fn uid_func(uid: Uid) -> String {
    format!("uid({uid})")
}

/// `eq(pred, literal)`
#[must_use]
pub fn eq_func(predicate: &str, value: &Value) -> String {
    format!("eq({predicate}, {})", literal(value))
}

/// Builds the single-object query for `get`.
#[must_use]
pub fn object_query(func: &str, reverse: &[ReverseEdge]) -> String {
    format!(
        "{{\n  {OBJ_BLOCK}(func: {func}) {{\n{}  }}\n}}",
        typed_selection(reverse)
    )
}

/// Builds the unstructured single-object query used by the raw API.
#[must_use]
pub fn unstructured_query(func: &str) -> String {
    format!(
        "{{\n  {OBJ_BLOCK}(func: {func}) {{\n    uid\n    expand(_all_) {{\n      uid\n      expand(_all_)\n    }}\n  }}\n}}"
    )
}

/// Builds a query that only resolves the id of the matching entity.
#[must_use]
pub fn uid_query(func: &str) -> String {
    format!("{{\n  {OBJ_BLOCK}(func: {func}, first: 1) {{\n    uid\n  }}\n}}")
}

/// Builds the multi-object query for `query`.
///
/// A vector-similarity leaf at the top of the filter becomes the root so
/// results come back nearest first; otherwise the root scans the type.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidFilter`] for a malformed filter tree.
pub fn objects_query(
    type_name: &str,
    params: &QueryParams,
    reverse: &[ReverseEdge],
) -> Result<String> {
    let type_func = format!("type({})", quote(type_name));
    let (root, filter) = match &params.filter {
        Some(filter) if filter.is_top_k() => {
            let root = leaf_clause(type_name, filter)?.unwrap_or_else(|| type_func.clone());
            (root, Some(type_func))
        }
        Some(filter) => (type_func, filter_clause(type_name, filter)?),
        None => (type_func, None),
    };

    let mut args = root;
    if let Some(pagination) = &params.pagination {
        args.push_str(&pagination_clause(pagination));
    }
    if let Some(sorting) = &params.sorting {
        args.push_str(&sorting_clause(type_name, sorting));
    }
    let filter = filter.map_or_else(String::new, |f| format!(" @filter({f})"));

    Ok(format!(
        "{{\n  {OBJS_BLOCK}(func: {args}){filter} {{\n{}  }}\n}}",
        typed_selection(reverse)
    ))
}

fn typed_selection(reverse: &[ReverseEdge]) -> String {
    let mut selection = format!(
        "    uid\n    expand(_all_) {{\n      uid\n      expand(_all_)\n      {TYPE_PREDICATE}\n    }}\n    {TYPE_PREDICATE}\n"
    );
    for edge in reverse {
        let _ = writeln!(
            selection,
            "    {}: ~{} {{\n      uid\n      expand(_all_)\n      {TYPE_PREDICATE}\n    }}",
            edge.key, edge.predicate
        );
    }
    selection
}

/// Renders a filter tree, or `None` for an empty filter.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidFilter`] when a node sets more than one
/// leaf predicate or a leaf names no field.
pub fn filter_clause(type_name: &str, filter: &Filter) -> Result<Option<String>> {
    if !filter.and.is_empty() {
        return join(type_name, &filter.and, " AND ");
    }
    if !filter.or.is_empty() {
        return join(type_name, &filter.or, " OR ");
    }
    if let Some(inner) = &filter.not {
        return Ok(filter_clause(type_name, inner)?.map(|clause| format!("NOT ({clause})")));
    }
    leaf_clause(type_name, filter)
}

fn join(type_name: &str, children: &[Filter], op: &str) -> Result<Option<String>> {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        if let Some(clause) = filter_clause(type_name, child)? {
            parts.push(clause);
        }
    }
    Ok(match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(format!("({})", parts.join(op))),
    })
}

fn leaf_clause(type_name: &str, filter: &Filter) -> Result<Option<String>> {
    let s = &filter.string;
    let set = [
        s.equals.is_some(),
        !s.all_of_terms.is_empty(),
        !s.any_of_terms.is_empty(),
        !s.all_of_text.is_empty(),
        !s.any_of_text.is_empty(),
        s.regexp.is_some(),
        s.less_than.is_some(),
        s.less_or_equal.is_some(),
        s.greater_than.is_some(),
        s.greater_or_equal.is_some(),
        !filter.vector.similar_to.is_empty(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if set == 0 {
        return Ok(None);
    }
    if set > 1 {
        return Err(ValidationError::InvalidFilter(format!(
            "more than one predicate set on field {}",
            filter.field
        ))
        .into());
    }
    if filter.field.is_empty() {
        return Err(ValidationError::InvalidFilter("predicate without a field".to_string()).into());
    }

    let predicate = format!("{type_name}.{}", filter.field);
    let compare = |op: &str, value: &Value| format!("{op}({predicate}, {})", literal(value));
    let words = |op: &str, words: &[String]| format!("{op}({predicate}, {})", quote(&words.join(" ")));

    let clause = if let Some(value) = &s.equals {
        compare("eq", value)
    } else if !s.all_of_terms.is_empty() {
        words("allofterms", &s.all_of_terms)
    } else if !s.any_of_terms.is_empty() {
        words("anyofterms", &s.any_of_terms)
    } else if !s.all_of_text.is_empty() {
        words("alloftext", &s.all_of_text)
    } else if !s.any_of_text.is_empty() {
        words("anyoftext", &s.any_of_text)
    } else if let Some(pattern) = &s.regexp {
        format!("regexp({predicate}, {})", regex_literal(pattern))
    } else if let Some(value) = &s.less_than {
        compare("lt", value)
    } else if let Some(value) = &s.less_or_equal {
        compare("le", value)
    } else if let Some(value) = &s.greater_than {
        compare("gt", value)
    } else if let Some(value) = &s.greater_or_equal {
        compare("ge", value)
    } else {
        format!(
            "similar_to({predicate}, {}, {})",
            filter.vector.top_k,
            quote(&vector_text(&filter.vector.similar_to))
        )
    };
    Ok(Some(clause))
}

fn regex_literal(pattern: &str) -> String {
    if pattern.starts_with('/') && pattern[1..].contains('/') {
        pattern.to_string()
    } else {
        format!("/{}/", pattern.replace('/', "\\/"))
    }
}

/// Renders `, first: N`, `, offset: N` and `, after: 0x..`. An offset
/// suppresses the cursor.
#[must_use]
pub fn pagination_clause(pagination: &Pagination) -> String {
    let mut clause = String::new();
    if pagination.limit > 0 {
        let _ = write!(clause, ", first: {}", pagination.limit);
    }
    if pagination.offset > 0 {
        let _ = write!(clause, ", offset: {}", pagination.offset);
    } else if let Some(after) = pagination.after {
        let _ = write!(clause, ", after: {after}");
    }
    clause
}

/// Renders the sort keys in `desc_first` order; empty when no key is set.
#[must_use]
pub fn sorting_clause(type_name: &str, sorting: &Sorting) -> String {
    let asc = sorting.asc_field.as_ref().map(|f| ("orderasc", f));
    let desc = sorting.desc_field.as_ref().map(|f| ("orderdesc", f));
    let (first, second) = if sorting.desc_first {
        (desc, asc)
    } else {
        (asc, desc)
    };
    let mut clause = String::new();
    for (op, field) in first.into_iter().chain(second) {
        let _ = write!(clause, ", {op}: {type_name}.{field}");
    }
    clause
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_object;
    use crate::object::Object;
    use graphlet_adapters::query::dql;

    graph_object! {
        #[derive(Debug, Clone, Default)]
        struct Branch {
            #[index(exact)]
            name: String,
        }
    }

    #[test]
    fn test_lookup_needs_one_key() {
        let one = Lookup::try_from(vec![ConstrainedField::new("name", "a")]).unwrap();
        assert_eq!(one, Lookup::Field(ConstrainedField::new("name", "a")));
        let err = Lookup::try_from(vec![
            ConstrainedField::new("name", "a"),
            ConstrainedField::new("email", "b"),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "expected 1 argument, got 2");
    }

    #[test]
    fn test_uid_query_parses() {
        let text = uid_query(&eq_func("Branch.name", &Value::from("main")));
        assert!(text.contains("first: 1"));
        dql::parse(&text).unwrap();
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal(&Value::Int(-4)), "-4");
        assert_eq!(literal(&Value::Float(2.0)), "2.0");
        assert_eq!(literal(&Value::Bool(true)), "true");
        assert_eq!(literal(&Value::Uid(Uid::new(26))), "0x1a");
        assert_eq!(literal(&Value::from("say \"hi\"")), r#""say \"hi\"""#);
        assert_eq!(literal(&Value::Vector(vec![0.5, 1.0])), r#""[0.5,1]""#);
    }

    #[test]
    fn test_leaf_precedence_and_conflicts() {
        let clause = filter_clause("User", &Filter::ge("age", "20")).unwrap();
        assert_eq!(clause.as_deref(), Some(r#"ge(User.age, "20")"#));

        let mut both = Filter::eq("name", "A");
        both.string.greater_than = Some(Value::Int(3));
        assert!(matches!(
            filter_clause("User", &both),
            Err(graphlet_common::Error::Validation(ValidationError::InvalidFilter(_)))
        ));

        // A logical operator wins over a leaf on the same node.
        let mut logical = Filter::eq("name", "A");
        logical.not = Some(Box::new(Filter::lt("age", 30)));
        assert_eq!(
            filter_clause("User", &logical).unwrap().as_deref(),
            Some("NOT (lt(User.age, 30))")
        );

        assert_eq!(filter_clause("User", &Filter::default()).unwrap(), None);
        assert!(filter_clause("User", &Filter::eq("", "x")).is_err());
    }

    #[test]
    fn test_logical_nesting() {
        let filter = Filter::or([
            Filter::and([Filter::ge("age", 20), Filter::le("age", 40)]),
            Filter::all_of_terms("name", ["big", "cat"]),
            Filter::default(),
        ]);
        assert_eq!(
            filter_clause("User", &filter).unwrap().as_deref(),
            Some(r#"((ge(User.age, 20) AND le(User.age, 40)) OR allofterms(User.name, "big cat"))"#)
        );
        assert_eq!(
            filter_clause("User", &Filter::and([Filter::eq("name", "A")]))
                .unwrap()
                .as_deref(),
            Some(r#"eq(User.name, "A")"#)
        );
    }

    #[test]
    fn test_regexp_forms() {
        let bare = filter_clause("Doc", &Filter::regexp("text", "^a/b")).unwrap();
        assert_eq!(bare.as_deref(), Some(r"regexp(Doc.text, /^a\/b/)"));
        let flagged = filter_clause("Doc", &Filter::regexp("text", "/^ab/i")).unwrap();
        assert_eq!(flagged.as_deref(), Some("regexp(Doc.text, /^ab/i)"));
    }

    #[test]
    fn test_pagination_and_sorting() {
        assert_eq!(pagination_clause(&Pagination::new(3, 1)), ", first: 3, offset: 1");
        assert_eq!(
            pagination_clause(&Pagination::new(0, 0).with_after(Uid::new(16))),
            ", after: 0x10"
        );
        assert_eq!(
            pagination_clause(&Pagination::new(2, 4).with_after(Uid::new(16))),
            ", first: 2, offset: 4"
        );
        assert_eq!(pagination_clause(&Pagination::default()), "");

        assert_eq!(sorting_clause("User", &Sorting::asc("age")), ", orderasc: User.age");
        assert_eq!(
            sorting_clause("User", &Sorting::asc("age").then_desc("name")),
            ", orderasc: User.age, orderdesc: User.name"
        );
        assert_eq!(
            sorting_clause("User", &Sorting::desc("name").then_asc("age")),
            ", orderdesc: User.name, orderasc: User.age"
        );
        assert_eq!(sorting_clause("User", &Sorting::default()), "");
    }

    #[test]
    fn test_generated_queries_parse() {
        let reverse = [ReverseEdge {
            key: "Project.branches".to_string(),
            predicate: "Branch.proj".to_string(),
            target: Branch::descriptor(),
        }];
        let queries = [
            object_query(&uid_func(Uid::new(2)), &reverse),
            object_query(&eq_func("User.clerk_id", &Value::from("123")), &[]),
            unstructured_query(&uid_func(Uid::new(7))),
            objects_query("User", &QueryParams::new(), &[]).unwrap(),
            objects_query(
                "User",
                &QueryParams::new()
                    .with_filter(Filter::not(Filter::ge("age", "20")))
                    .with_pagination(Pagination::new(3, 1))
                    .with_sorting(Sorting::asc("age").then_desc("name")),
                &reverse,
            )
            .unwrap(),
            objects_query(
                "Doc",
                &QueryParams::new().with_filter(Filter::similar_to("vec", vec![0.1, -0.2], 5)),
                &[],
            )
            .unwrap(),
        ];
        for query in &queries {
            dql::parse(query).unwrap_or_else(|e| panic!("{e}\n{query}"));
        }
    }

    #[test]
    fn test_top_k_becomes_root() {
        let query = objects_query(
            "Doc",
            &QueryParams::new().with_filter(Filter::similar_to("vec", vec![1.0, 0.5], 2)),
            &[],
        )
        .unwrap();
        assert!(query.contains(r#"objs(func: similar_to(Doc.vec, 2, "[1,0.5]")) @filter(type("Doc"))"#));

        let nested = objects_query(
            "Doc",
            &QueryParams::new().with_filter(Filter::not(Filter::similar_to("vec", vec![1.0], 2))),
            &[],
        )
        .unwrap();
        assert!(nested.contains(r#"objs(func: type("Doc")) @filter(NOT (similar_to(Doc.vec, 2, "[1]")))"#));
    }
}
