//! Field-level update descriptions applied atomically by a backend.

use bson::Bson;

/// One modification applied to a matched document.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Overwrites (or creates) a field.
    Set(String, Bson),
    /// Appends a value to an array field, creating the array if the field is absent.
    Push(String, Bson),
}

/// An ordered set of modifications, applied in order to a single document.
///
/// ```ignore
/// use personlayer_core::update::Update;
///
/// let update = Update::new().set("age", 20).push("favoriteFoods", "tacos");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Update::default()
    }

    /// Sets `field` to `value`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    /// Appends `value` to the array stored in `field`.
    pub fn push(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Push(field.into(), value.into()));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }
}
