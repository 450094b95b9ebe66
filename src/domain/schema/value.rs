use chrono::{DateTime, SubsecRound, Utc};
use std::cmp::Ordering;

use crate::domain::schema::{FieldDescriptor, ModelDescriptor};
use crate::domain::stores::StoreError;

/// A single column value, independent of the backend that stores it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    DateTime(DateTime<Utc>),
}

/// One row, aligned with `ModelDescriptor::fields`.
pub type Row = Vec<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    DateTime,
    Enum(&'static [&'static str]),
}

impl FieldKind {
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Enum(_))
    }

    /// Whether a non-null `value` may be stored in a field of this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldKind::Text, Value::Text(_)) => true,
            (FieldKind::Int, Value::Int(v)) => i32::try_from(*v).is_ok(),
            (FieldKind::DateTime, Value::DateTime(_)) => true,
            (FieldKind::Enum(variants), Value::Text(s)) => variants.contains(&s.as_str()),
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FieldKind::Text => "text".to_string(),
            FieldKind::Int => "32-bit integer".to_string(),
            FieldKind::DateTime => "datetime".to_string(),
            FieldKind::Enum(variants) => format!("one of {}", variants.join("|")),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Int(_) => "integer",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Storage precision is microseconds; both backends keep rows in this form.
    pub fn normalized(self) -> Value {
        match self {
            Value::DateTime(dt) => Value::DateTime(dt.trunc_subsecs(6)),
            other => other,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Text(_) => 1,
            Value::DateTime(_) => 2,
            Value::Null => 3,
        }
    }
}

// Null sorts after every value, matching Postgres' default for ascending order.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Reads a row field by field, in descriptor order.
pub struct RowReader {
    model: &'static ModelDescriptor,
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl RowReader {
    pub fn new(model: &'static ModelDescriptor, row: Row) -> Result<Self, StoreError> {
        if row.len() != model.fields.len() {
            return Err(StoreError::Unknown(format!(
                "{} row has {} values, expected {}",
                model.name,
                row.len(),
                model.fields.len()
            )));
        }
        Ok(Self {
            model,
            values: row.into_iter(),
            position: 0,
        })
    }

    fn next_value(&mut self) -> Result<(&'static FieldDescriptor, Value), StoreError> {
        let field = self.model.fields.get(self.position).ok_or_else(|| {
            StoreError::Unknown(format!("read past the end of a {} row", self.model.name))
        })?;
        let value = self.values.next().unwrap_or(Value::Null);
        self.position += 1;
        Ok((field, value))
    }

    fn mismatch(&self, field: &FieldDescriptor, value: &Value) -> StoreError {
        StoreError::Unknown(format!(
            "{}.{} holds {}, expected {}",
            self.model.name,
            field.name,
            value.kind_name(),
            field.kind.describe()
        ))
    }

    pub fn opt_text(&mut self) -> Result<Option<String>, StoreError> {
        match self.next_value()? {
            (_, Value::Null) => Ok(None),
            (_, Value::Text(s)) => Ok(Some(s)),
            (field, other) => Err(self.mismatch(field, &other)),
        }
    }

    pub fn text(&mut self) -> Result<String, StoreError> {
        let model = self.model;
        let field = model.fields.get(self.position);
        self.opt_text()?.ok_or_else(|| null_in_required(model, field))
    }

    pub fn opt_int(&mut self) -> Result<Option<i32>, StoreError> {
        match self.next_value()? {
            (_, Value::Null) => Ok(None),
            (field, Value::Int(v)) => i32::try_from(v)
                .map(Some)
                .map_err(|_| self.mismatch(field, &Value::Int(v))),
            (field, other) => Err(self.mismatch(field, &other)),
        }
    }

    pub fn int(&mut self) -> Result<i32, StoreError> {
        let model = self.model;
        let field = model.fields.get(self.position);
        self.opt_int()?.ok_or_else(|| null_in_required(model, field))
    }

    pub fn opt_datetime(&mut self) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self.next_value()? {
            (_, Value::Null) => Ok(None),
            (_, Value::DateTime(dt)) => Ok(Some(dt)),
            (field, other) => Err(self.mismatch(field, &other)),
        }
    }

    pub fn datetime(&mut self) -> Result<DateTime<Utc>, StoreError> {
        let model = self.model;
        let field = model.fields.get(self.position);
        self.opt_datetime()?
            .ok_or_else(|| null_in_required(model, field))
    }
}

fn null_in_required(model: &ModelDescriptor, field: Option<&FieldDescriptor>) -> StoreError {
    StoreError::Unknown(format!(
        "{}.{} is null but the field is required",
        model.name,
        field.map(|f| f.name).unwrap_or("?")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_null_sorts_last() {
        let mut values = vec![Value::Null, Value::Int(3), Value::Int(-1)];
        values.sort();
        assert_eq!(values, vec![Value::Int(-1), Value::Int(3), Value::Null]);
    }

    #[test]
    fn test_text_orders_by_bytes() {
        assert!(Value::from("Zebra") < Value::from("apple"));
        assert!(Value::from("a") < Value::from("ab"));
    }

    #[test]
    fn test_enum_kind_rejects_unknown_variant() {
        let kind = FieldKind::Enum(&["PENDING", "SUCCESS"]);
        assert!(kind.accepts(&Value::from("PENDING")));
        assert!(!kind.accepts(&Value::from("pending")));
        assert!(!kind.accepts(&Value::Int(1)));
    }

    #[test]
    fn test_int_kind_is_32_bit() {
        assert!(FieldKind::Int.accepts(&Value::Int(i64::from(i32::MAX))));
        assert!(!FieldKind::Int.accepts(&Value::Int(i64::from(i32::MAX) + 1)));
    }

    #[test]
    fn test_normalized_truncates_to_micros() {
        let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        match Value::from(dt).normalized() {
            Value::DateTime(v) => assert_eq!(v.timestamp_subsec_nanos(), 123_456_000),
            other => panic!("unexpected {:?}", other),
        }
    }
}
