//! Translation of the query pipeline and updates into MongoDB syntax.

use bson::{Bson, Document, Uuid, doc};

use personlayer_core::{
    document::ID_FIELD,
    error::DocumentStoreError,
    query::{Expr, FieldOp, Projection, QueryVisitor, Sort, SortDirection},
    update::{Update, UpdateOp},
};

/// Name of MongoDB's primary key field, which holds the document identifier.
pub(crate) const MONGO_ID_FIELD: &str = "_id";

/// Maps a layer field name onto the stored field name.
pub(crate) fn stored_field(field: &str) -> &str {
    if field == ID_FIELD { MONGO_ID_FIELD } else { field }
}

/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            stored_field(field): { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let operator = match op {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
        };

        Ok(doc! { stored_field(field): { operator: value } })
    }
}

/// Builds the filter document for an optional expression. `None` matches everything.
pub(crate) fn filter_document(filter: Option<&Expr>) -> Result<Document, DocumentStoreError> {
    match filter {
        Some(expr) => MongoQueryTranslator.visit_expr(expr),
        None => Ok(doc! {}),
    }
}

/// Matches exactly the documents with the given identifiers.
pub(crate) fn ids_filter(ids: &[Uuid]) -> Document {
    doc! {
        MONGO_ID_FIELD: { "$in": ids.iter().copied().map(Bson::from).collect::<Vec<_>>() },
    }
}

pub(crate) fn sort_document(keys: &[Sort]) -> Document {
    keys.iter()
        .map(|key| {
            let direction = match key.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            };
            (stored_field(&key.field).to_string(), Bson::Int32(direction))
        })
        .collect()
}

/// MongoDB returns `_id` unless told otherwise, which matches the layer's rule
/// that the identifier is always kept, so `id` is never listed.
pub(crate) fn projection_document(projection: &Projection) -> Document {
    let flag = if projection.is_exclusion() { 0 } else { 1 };

    projection
        .fields()
        .iter()
        .filter(|field| field.as_str() != ID_FIELD)
        .map(|field| (field.clone(), Bson::Int32(flag)))
        .collect()
}

pub(crate) fn update_document(update: &Update) -> Result<Document, DocumentStoreError> {
    let mut set = Document::new();
    let mut push = Document::new();

    for op in update.ops() {
        match op {
            UpdateOp::Set(field, _) | UpdateOp::Push(field, _) if field == ID_FIELD => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "field '{ID_FIELD}' is immutable"
                )));
            }
            UpdateOp::Set(field, value) => {
                set.insert(field.clone(), value.clone());
            }
            UpdateOp::Push(field, value) => {
                push.insert(field.clone(), value.clone());
            }
        }
    }

    let mut update = Document::new();
    if !set.is_empty() {
        update.insert("$set", set);
    }
    if !push.is_empty() {
        update.insert("$push", push);
    }

    Ok(update)
}
