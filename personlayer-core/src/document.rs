//! Core traits for document representation and serialization.
//!
//! Stored documents are plain serde types. The store owns identifier assignment:
//! values are written without an `id` and read back with the one the backend chose.

use bson::{Bson, Document as BsonDocument, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Name of the identifier field every stored document carries.
pub const ID_FIELD: &str = "id";

/// Core trait that all documents read from a document store must implement.
///
/// # Example
///
/// ```ignore
/// use personlayer_core::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Pet {
///     pub id: Uuid,
///     pub name: String,
/// }
///
/// impl Document for Pet {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "pets"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's store-assigned identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Converts any serializable value into a BSON document.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] if the value does not serialize
/// to a BSON document (for example a bare string or number).
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> DocumentStoreResult<BsonDocument> {
    match serialize_to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Extension trait providing BSON conversion for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON document for storage.
    fn to_document(&self) -> DocumentStoreResult<BsonDocument>;

    /// Creates a document from a stored BSON document.
    fn from_document(document: BsonDocument) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_document(&self) -> DocumentStoreResult<BsonDocument> {
        to_document(self)
    }

    fn from_document(document: BsonDocument) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }
}
