//! Query pipeline evaluation for in-memory documents.
//!
//! This module provides the evaluation engine for filter expressions, the sort
//! order used for `sort` stages, projection and update application.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime};

use personlayer_core::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Projection, QueryVisitor, Sort, SortDirection},
    update::{Update, UpdateOp},
};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64. Types without a meaningful comparison
/// collapse to `Null`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Binary(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Binary(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of this value's type in the store's cross-type sort order.
    /// Null (and missing) sorts first.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Binary(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order used by sort stages.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.sort_cmp(y))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Binary(a), Comparable::Binary(b)) => a.cmp(b),
            _ => self
                .partial_cmp(other)
                .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank())),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Equality with array-membership semantics: a scalar matches an array that holds it.
fn matches_eq(field_value: &Bson, value: &Bson) -> bool {
    let left = Comparable::from(field_value);
    let right = Comparable::from(value);

    if left == right {
        return true;
    }

    match left {
        Comparable::Array(items) => items.iter().any(|item| item == &right),
        _ => false,
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns whether `document` satisfies `filter`. A `None` filter matches everything.
    pub fn matches(document: &'a Document, filter: Option<&Expr>) -> DocumentStoreResult<bool> {
        match filter {
            Some(expr) => DocumentEvaluator::new(document).evaluate(expr),
            None => Ok(true),
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.document.contains_key(field) == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let matched = self
            .document
            .get(field)
            .is_some_and(|field_value| matches_eq(field_value, value));

        Ok(match op {
            FieldOp::Eq => matched,
            FieldOp::Ne => !matched,
        })
    }
}

/// Orders two documents by a list of sort keys. Missing fields compare as null.
pub(crate) fn compare_documents(left: &Document, right: &Document, keys: &[Sort]) -> Ordering {
    for key in keys {
        let a = left.get(&key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let b = right.get(&key.field).map(Comparable::from).unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => a.sort_cmp(&b),
            SortDirection::Desc => b.sort_cmp(&a),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Shapes a result document. The identifier is always kept.
pub(crate) fn project(document: Document, projection: Option<&Projection>) -> Document {
    match projection {
        None => document,
        Some(Projection::Include(fields)) => document
            .into_iter()
            .filter(|(key, _)| key == ID_FIELD || fields.contains(key))
            .collect(),
        Some(Projection::Exclude(fields)) => document
            .into_iter()
            .filter(|(key, _)| key == ID_FIELD || !fields.contains(key))
            .collect(),
    }
}

/// Applies `update` to `document` in place.
///
/// Validation runs over every operation before anything is written, so a failed
/// update leaves the document untouched.
pub(crate) fn apply_update(document: &mut Document, update: &Update) -> DocumentStoreResult<()> {
    let mut updated = document.clone();

    for op in update.ops() {
        match op {
            UpdateOp::Set(field, _) | UpdateOp::Push(field, _) if field == ID_FIELD => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "field '{ID_FIELD}' is immutable"
                )));
            }
            UpdateOp::Set(field, value) => {
                updated.insert(field.clone(), value.clone());
            }
            UpdateOp::Push(field, value) => match updated.get_mut(field) {
                Some(Bson::Array(items)) => items.push(value.clone()),
                None => {
                    updated.insert(field.clone(), Bson::Array(vec![value.clone()]));
                }
                Some(other) => {
                    return Err(DocumentStoreError::InvalidDocument(format!(
                        "cannot push to '{field}': holds {:?}, not an array",
                        other.element_type()
                    )));
                }
            },
        }
    }

    *document = updated;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use personlayer_core::query::Filter;

    #[test]
    fn eq_matches_array_membership() {
        let document = doc! { "name": "Amy", "favoriteFoods": ["burritos", "tacos"] };

        assert!(DocumentEvaluator::matches(&document, Some(&Filter::eq("favoriteFoods", "tacos"))).unwrap());
        assert!(!DocumentEvaluator::matches(&document, Some(&Filter::eq("favoriteFoods", "sushi"))).unwrap());
        assert!(DocumentEvaluator::matches(&document, Some(&Filter::eq("name", "Amy"))).unwrap());
        assert!(DocumentEvaluator::matches(&document, None).unwrap());
    }

    #[test]
    fn missing_fields_only_satisfy_negative_operators() {
        let document = doc! { "name": "Amy" };

        assert!(!DocumentEvaluator::matches(&document, Some(&Filter::eq("age", 3))).unwrap());
        assert!(DocumentEvaluator::matches(&document, Some(&Filter::ne("age", 3))).unwrap());
        assert!(DocumentEvaluator::matches(&document, Some(&Filter::not_exists("age"))).unwrap());
    }

    #[test]
    fn ne_rejects_array_members_and_equal_scalars() {
        let document = doc! { "name": "Amy", "favoriteFoods": ["burritos", "tacos"] };

        assert!(!DocumentEvaluator::matches(&document, Some(&Filter::ne("favoriteFoods", "tacos"))).unwrap());
        assert!(DocumentEvaluator::matches(&document, Some(&Filter::ne("favoriteFoods", "sushi"))).unwrap());
        assert!(!DocumentEvaluator::matches(&document, Some(&Filter::ne("name", "Amy"))).unwrap());
    }

    #[test]
    fn logical_operators_combine_predicates() {
        let document = doc! { "name": "Amy", "age": 30 };
        let amy_with_age = Filter::and([Filter::eq("name", "Amy"), Filter::exists("age")]);

        assert!(DocumentEvaluator::matches(&document, Some(&amy_with_age)).unwrap());
        assert!(!DocumentEvaluator::matches(&document, Some(&amy_with_age.clone().not())).unwrap());
        assert!(!DocumentEvaluator::matches(&document, Some(&amy_with_age.and(Filter::eq("age", 31)))).unwrap());
        assert!(DocumentEvaluator::matches(&document, Some(&Expr::And(Vec::new()))).unwrap());
        assert!(!DocumentEvaluator::matches(&document, Some(&Filter::not_exists("age"))).unwrap());
    }

    #[test]
    fn missing_sort_field_orders_first_ascending() {
        let with_age = doc! { "name": "A", "age": 1 };
        let without_age = doc! { "name": "B" };
        let keys = [Sort { field: "age".into(), direction: SortDirection::Asc }];

        assert_eq!(compare_documents(&without_age, &with_age, &keys), Ordering::Less);
    }

    #[test]
    fn secondary_sort_key_breaks_ties() {
        let a = doc! { "age": 30, "name": "Bob" };
        let b = doc! { "age": 30, "name": "Amy" };
        let keys = [
            Sort { field: "age".into(), direction: SortDirection::Desc },
            Sort { field: "name".into(), direction: SortDirection::Asc },
        ];

        assert_eq!(compare_documents(&a, &b, &keys), Ordering::Greater);
    }

    #[test]
    fn projection_keeps_the_identifier() {
        let document = doc! { "id": "x", "name": "Amy", "age": 30 };

        let excluded = project(document.clone(), Some(&Projection::exclude(["age", "id"])));
        assert_eq!(excluded, doc! { "id": "x", "name": "Amy" });

        let included = project(document, Some(&Projection::include(["age"])));
        assert_eq!(included, doc! { "id": "x", "age": 30 });
    }

    #[test]
    fn update_is_all_or_nothing() {
        let mut document = doc! { "name": "Amy", "age": 3 };
        let update = Update::new().set("age", 4).push("name", "x");

        assert!(apply_update(&mut document, &update).is_err());
        assert_eq!(document, doc! { "name": "Amy", "age": 3 });

        apply_update(&mut document, &Update::new().set("age", 4).push("favoriteFoods", "pie")).unwrap();
        assert_eq!(document, doc! { "name": "Amy", "age": 4, "favoriteFoods": ["pie"] });
    }
}
