//! Query construction and filtering API for document stores.
//!
//! A read is described as an ordered list of [`Stage`]s (filter, sort, skip, limit,
//! projection) collected by a [`QueryBuilder`]. Nothing touches the store while stages
//! are added; [`QueryBuilder::build`] compiles the list into a single [`Query`] which a
//! backend executes in one request.
//!
//! The store evaluates a query as a declarative pipeline, so the order in which stages
//! are added never changes the result: filtering always happens first, then sorting,
//! then skip/limit, and the projection only shapes the documents that come out.
//!
//! ```ignore
//! use personlayer_core::query::{Filter, Projection, QueryBuilder, SortDirection};
//!
//! let query = QueryBuilder::new()
//!     .select(Projection::exclude(["age"]))
//!     .limit(2)
//!     .sort("name", SortDirection::Asc)
//!     .filter(Filter::eq("favoriteFoods", "burritos"))
//!     .build()?;
//! ```
//!
//! # Filters
//!
//! [`Filter`] builds the predicates the layer needs: `eq`, `ne`, `exists`,
//! `not_exists` and `and`, plus [`Expr::not`] for negation. `eq` against an array
//! field matches when any element equals the value, the same way the store treats
//! `{ favoriteFoods: "pizza" }`.

use bson::Bson;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Comparison applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal, or for an array field, holding an equal element.
    Eq,
    /// The negation of `Eq`. A missing field satisfies it.
    Ne,
}

/// Filter predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Every child must match. An empty list matches everything.
    And(Vec<Expr>),
    /// Inverts the child.
    Not(Box<Expr>),
    /// Field presence (`true`) or absence (`false`).
    Exists(String, bool),
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    pub fn field(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Self {
        Expr::Field {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Conjunction with `other`, flattening into an existing `And`.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Constructors for [`Expr`].
///
/// ```ignore
/// use personlayer_core::query::Filter;
///
/// let expr = Filter::eq("favoriteFoods", "burritos").and(Filter::exists("age"));
/// ```
pub struct Filter;

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::Ne, value)
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }
}

/// The set of fields kept in (or dropped from) each result document.
///
/// Inclusion and exclusion cannot be mixed within one query. The document
/// identifier is always returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Return only these fields.
    Include(Vec<String>),
    /// Return every field except these.
    Exclude(Vec<String>),
}

impl Projection {
    /// Keeps only the named fields.
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Include(fields.into_iter().map(Into::into).collect())
    }

    /// Drops the named fields.
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Exclude(fields.into_iter().map(Into::into).collect())
    }

    /// Parses the store's space-separated selection string, where a leading `-`
    /// excludes a field: `"-age"`, `"name favoriteFoods"`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] for an empty string or one that
    /// mixes included and excluded fields.
    pub fn parse(text: &str) -> DocumentStoreResult<Self> {
        let mut included = Vec::new();
        let mut excluded = Vec::new();

        for token in text.split_whitespace() {
            match token.strip_prefix('-') {
                Some("") => {
                    return Err(DocumentStoreError::InvalidQuery(
                        "projection has a bare '-'".to_string(),
                    ));
                }
                Some(field) => excluded.push(field.to_string()),
                None => included.push(token.to_string()),
            }
        }

        match (included.is_empty(), excluded.is_empty()) {
            (true, true) => Err(DocumentStoreError::InvalidQuery("empty projection".to_string())),
            (false, true) => Ok(Projection::Include(included)),
            (true, false) => Ok(Projection::Exclude(excluded)),
            (false, false) => Err(DocumentStoreError::InvalidQuery(format!(
                "projection '{text}' mixes inclusion and exclusion"
            ))),
        }
    }

    /// Returns the fields named by this projection.
    pub fn fields(&self) -> &[String] {
        match self {
            Projection::Include(fields) | Projection::Exclude(fields) => fields,
        }
    }

    /// Returns `true` if this projection drops fields rather than keeping them.
    pub fn is_exclusion(&self) -> bool {
        matches!(self, Projection::Exclude(_))
    }

    fn merge(self, other: Projection) -> DocumentStoreResult<Projection> {
        match (self, other) {
            (Projection::Include(mut left), Projection::Include(right)) => {
                extend_unique(&mut left, right);
                Ok(Projection::Include(left))
            }
            (Projection::Exclude(mut left), Projection::Exclude(right)) => {
                extend_unique(&mut left, right);
                Ok(Projection::Exclude(left))
            }
            (left, right) => match left.fields().iter().find(|field| right.fields().contains(field)) {
                Some(field) => Err(DocumentStoreError::InvalidQuery(format!(
                    "field '{field}' is both included and excluded"
                ))),
                None => Err(DocumentStoreError::InvalidQuery(
                    "cannot mix inclusion and exclusion projections".to_string(),
                )),
            },
        }
    }
}

fn extend_unique(fields: &mut Vec<String>, more: Vec<String>) {
    for field in more {
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
}

/// A compiled query, ready to be sent to a backend in one request.
///
/// Backends evaluate the parts in a fixed order: `filter`, `sort`, `offset`,
/// `limit`, then `projection`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression. `None` matches every document.
    pub filter: Option<Expr>,
    /// Sort keys, primary key first.
    pub sort: Vec<Sort>,
    /// Number of documents to skip after sorting.
    pub offset: Option<usize>,
    /// Maximum number of documents to return. `Some(0)` is unbounded.
    pub limit: Option<usize>,
    /// Fields to keep or drop from each result.
    pub projection: Option<Projection>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query::default()
    }

    /// Returns the effective result cap, treating a limit of zero as unbounded.
    pub fn max_results(&self) -> Option<usize> {
        self.limit.filter(|limit| *limit > 0)
    }
}

/// One step of a query pipeline, recorded in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Filter(Expr),
    Sort(Sort),
    Skip(usize),
    Limit(usize),
    Select(Projection),
}

/// Immutable, chainable list of query stages.
///
/// Every stage method consumes the builder and returns a new one with the stage
/// appended, so a partially built pipeline can be cloned and extended in
/// different directions.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    stages: Vec<Stage>,
}

impl QueryBuilder {
    /// Creates a new query builder with no stages.
    pub fn new() -> Self {
        QueryBuilder { stages: Vec::new() }
    }

    /// Adds a filter stage. Multiple filters must all match.
    pub fn filter(self, filter: Expr) -> Self {
        self.push(Stage::Filter(filter))
    }

    /// Adds a sort key. Keys added earlier take precedence; re-sorting on a field
    /// already present replaces its direction.
    pub fn sort(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.push(Stage::Sort(Sort { field: field.into(), direction }))
    }

    /// Sets the number of documents to skip. The last call wins.
    pub fn skip(self, offset: usize) -> Self {
        self.push(Stage::Skip(offset))
    }

    /// Sets the maximum number of documents to return. The last call wins.
    pub fn limit(self, limit: usize) -> Self {
        self.push(Stage::Limit(limit))
    }

    /// Adds a projection. Projections of the same kind are merged.
    pub fn select(self, projection: Projection) -> Self {
        self.push(Stage::Select(projection))
    }

    /// Returns the stages recorded so far, in call order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Compiles the recorded stages into a single [`Query`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] if the projections conflict.
    pub fn build(self) -> DocumentStoreResult<Query> {
        let mut query = Query::new();
        let mut filters = Vec::new();

        for stage in self.stages {
            match stage {
                Stage::Filter(expr) => filters.push(expr),
                Stage::Sort(sort) => match query.sort.iter_mut().find(|s| s.field == sort.field) {
                    Some(existing) => existing.direction = sort.direction,
                    None => query.sort.push(sort),
                },
                Stage::Skip(offset) => query.offset = Some(offset),
                Stage::Limit(limit) => query.limit = Some(limit),
                Stage::Select(projection) => {
                    query.projection = Some(match query.projection.take() {
                        Some(current) => current.merge(projection)?,
                        None => projection,
                    });
                }
            }
        }

        query.filter = match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Expr::And(filters)),
        };

        Ok(query)
    }

    fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_does_not_change_the_compiled_query() {
        let in_order = QueryBuilder::new()
            .filter(Filter::eq("favoriteFoods", "burritos"))
            .sort("name", SortDirection::Asc)
            .limit(2)
            .select(Projection::exclude(["age"]))
            .build()
            .unwrap();

        let shuffled = QueryBuilder::new()
            .select(Projection::exclude(["age"]))
            .limit(2)
            .sort("name", SortDirection::Asc)
            .filter(Filter::eq("favoriteFoods", "burritos"))
            .build()
            .unwrap();

        assert_eq!(in_order, shuffled);
        assert_eq!(in_order.limit, Some(2));
        assert_eq!(in_order.sort.len(), 1);
    }

    #[test]
    fn builder_records_stages_without_compiling() {
        let builder = QueryBuilder::new().limit(5).sort("age", SortDirection::Desc);

        assert_eq!(
            builder.stages(),
            &[
                Stage::Limit(5),
                Stage::Sort(Sort { field: "age".into(), direction: SortDirection::Desc }),
            ]
        );
    }

    #[test]
    fn cloned_builders_extend_independently() {
        let base = QueryBuilder::new().filter(Filter::eq("name", "Amy"));
        let limited = base.clone().limit(1);

        assert_eq!(base.stages().len(), 1);
        assert_eq!(limited.stages().len(), 2);
    }

    #[test]
    fn multiple_filters_are_combined_with_and() {
        let query = QueryBuilder::new()
            .filter(Filter::eq("name", "Amy"))
            .filter(Filter::ne("age", 18))
            .build()
            .unwrap();

        assert_eq!(
            query.filter,
            Some(Expr::And(vec![Filter::eq("name", "Amy"), Filter::ne("age", 18)]))
        );
    }

    #[test]
    fn and_flattens_into_one_conjunction() {
        let expr = Filter::eq("name", "Amy").and(Filter::exists("age")).and(Filter::ne("age", 3).not());

        assert_eq!(
            expr,
            Filter::and([
                Filter::eq("name", "Amy"),
                Filter::exists("age"),
                Expr::Not(Box::new(Filter::ne("age", 3))),
            ])
        );
    }

    #[test]
    fn empty_builder_has_no_filter() {
        let query = QueryBuilder::new().build().unwrap();

        assert_eq!(query, Query::new());
        assert_eq!(query.max_results(), None);
    }

    #[test]
    fn sort_keys_accumulate_and_resort_replaces_direction() {
        let query = QueryBuilder::new()
            .sort("name", SortDirection::Asc)
            .sort("age", SortDirection::Desc)
            .sort("name", SortDirection::Desc)
            .build()
            .unwrap();

        assert_eq!(
            query.sort,
            vec![
                Sort { field: "name".into(), direction: SortDirection::Desc },
                Sort { field: "age".into(), direction: SortDirection::Desc },
            ]
        );
    }

    #[test]
    fn last_limit_wins_and_zero_is_unbounded() {
        let query = QueryBuilder::new().limit(3).limit(0).build().unwrap();

        assert_eq!(query.limit, Some(0));
        assert_eq!(query.max_results(), None);
    }

    #[test]
    fn projections_of_the_same_kind_merge() {
        let query = QueryBuilder::new()
            .select(Projection::exclude(["age"]))
            .select(Projection::exclude(["favoriteFoods", "age"]))
            .build()
            .unwrap();

        assert_eq!(query.projection, Some(Projection::exclude(["age", "favoriteFoods"])));
    }

    #[test]
    fn conflicting_projections_are_rejected() {
        let same_field = QueryBuilder::new()
            .select(Projection::include(["age"]))
            .select(Projection::exclude(["age"]))
            .build();
        assert!(matches!(same_field, Err(DocumentStoreError::InvalidQuery(msg)) if msg.contains("age")));

        let mixed = QueryBuilder::new()
            .select(Projection::include(["name"]))
            .select(Projection::exclude(["age"]))
            .build();
        assert!(matches!(mixed, Err(DocumentStoreError::InvalidQuery(_))));
    }

    #[test]
    fn parses_selection_strings() {
        assert_eq!(Projection::parse("-age").unwrap(), Projection::exclude(["age"]));
        assert_eq!(
            Projection::parse("name  favoriteFoods").unwrap(),
            Projection::include(["name", "favoriteFoods"])
        );
        assert!(Projection::parse("").is_err());
        assert!(Projection::parse("-").is_err());
        assert!(Projection::parse("name -age").is_err());
    }
}
