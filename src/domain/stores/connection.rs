use crate::domain::query::{OrderKey, Predicate};
use crate::domain::schema::{ModelDescriptor, Row, UniqueDescriptor, Value};
use crate::domain::stores::StoreResult;

/// `field = value` in an update.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: usize,
    pub value: Value,
}

impl Assignment {
    pub fn new(field: usize, value: impl Into<Value>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub predicate: Predicate,
    pub order: Vec<OrderKey>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn filtered(predicate: Predicate) -> Self {
        Self {
            predicate,
            order: Vec::new(),
            offset: 0,
            limit: None,
        }
    }
}

/// Row-level operations a backend runs inside one transaction.
///
/// Rows are full rows aligned with the descriptor. Backends enforce unique
/// and foreign-key constraints and cascade deletes; every other rule is
/// checked by the engine before or after calling in.
pub trait Connection: Send {
    fn select(&mut self, model: &'static ModelDescriptor, query: &SelectQuery) -> StoreResult<Vec<Row>>;

    fn count(&mut self, model: &'static ModelDescriptor, predicate: &Predicate) -> StoreResult<i64>;

    /// `None` when `skip_duplicates` is set and a unique constraint already
    /// holds the row.
    fn insert(
        &mut self,
        model: &'static ModelDescriptor,
        row: Row,
        skip_duplicates: bool,
    ) -> StoreResult<Option<Row>>;

    /// Returns the rows as they are after the update.
    fn update(
        &mut self,
        model: &'static ModelDescriptor,
        predicate: &Predicate,
        assignments: &[Assignment],
    ) -> StoreResult<Vec<Row>>;

    /// Returns the deleted rows.
    fn delete(&mut self, model: &'static ModelDescriptor, predicate: &Predicate) -> StoreResult<Vec<Row>>;

    /// Inserts `row`, or applies `assignments` to the row already holding
    /// its values for `conflict`.
    fn upsert(
        &mut self,
        model: &'static ModelDescriptor,
        conflict: &'static UniqueDescriptor,
        row: Row,
        assignments: &[Assignment],
    ) -> StoreResult<Row>;

    fn execute_raw(&mut self, sql: &str) -> StoreResult<usize>;
}
