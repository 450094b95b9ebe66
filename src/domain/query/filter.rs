use std::marker::PhantomData;

use crate::domain::schema::{Entity, FieldKind, ModelDescriptor, ModelField, Relation, RelationDescriptor, Value};
use crate::domain::stores::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }
}

/// How a relation filter quantifies over related rows. For a to-one relation
/// `Some` reads as "is" and `None` as "is not".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    Every,
    None,
}

/// Untyped filter tree evaluated by the backends.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        field: usize,
        op: CompareOp,
        value: Value,
        insensitive: bool,
    },
    In {
        field: usize,
        values: Vec<Value>,
        negated: bool,
    },
    IsNull {
        field: usize,
        negated: bool,
    },
    Relation {
        relation: RelationDescriptor,
        quantifier: Quantifier,
        predicate: Box<Predicate>,
    },
}

impl Predicate {
    pub fn always() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn never() -> Self {
        Predicate::Or(Vec::new())
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::And(parts) if parts.is_empty())
    }

    pub fn compare(field: usize, op: CompareOp, value: Value) -> Self {
        match (op, &value) {
            (CompareOp::Eq, Value::Null) => Predicate::IsNull {
                field,
                negated: false,
            },
            (CompareOp::Ne, Value::Null) => Predicate::IsNull {
                field,
                negated: true,
            },
            _ => Predicate::Compare {
                field,
                op,
                value,
                insensitive: false,
            },
        }
    }

    pub fn equals(field: usize, value: Value) -> Self {
        Predicate::compare(field, CompareOp::Eq, value)
    }

    /// Conjunction that drops trivially-true parts.
    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Predicate::And(flat)
        }
    }

    pub fn any(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Predicate::Or(flat)
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    fn set_insensitive(&mut self) {
        match self {
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter_mut().for_each(Predicate::set_insensitive)
            }
            Predicate::Not(inner) => inner.set_insensitive(),
            Predicate::Compare { insensitive, .. } => *insensitive = true,
            _ => {}
        }
    }

    /// Fields of `model` referenced outside relation subfilters.
    pub fn local_fields(&self, out: &mut Vec<usize>) {
        match self {
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().for_each(|p| p.local_fields(out))
            }
            Predicate::Not(inner) => inner.local_fields(out),
            Predicate::Compare { field, .. }
            | Predicate::In { field, .. }
            | Predicate::IsNull { field, .. } => out.push(*field),
            Predicate::Relation { .. } => {}
        }
    }

    pub fn has_relation(&self) -> bool {
        match self {
            Predicate::And(parts) | Predicate::Or(parts) => parts.iter().any(Predicate::has_relation),
            Predicate::Not(inner) => inner.has_relation(),
            Predicate::Relation { .. } => true,
            _ => false,
        }
    }

    /// Checks every value against the kind of the field it is compared with.
    pub fn validate(&self, model: &'static ModelDescriptor) -> StoreResult<()> {
        match self {
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().try_for_each(|p| p.validate(model))
            }
            Predicate::Not(inner) => inner.validate(model),
            Predicate::Compare {
                field,
                op,
                value,
                insensitive,
            } => {
                let descriptor = field_descriptor(model, *field)?;
                if value.is_null() {
                    return Err(StoreError::validation(format!(
                        "{}.{}: comparisons with null must use is_null",
                        model.name, descriptor.name
                    )));
                }
                if op.is_pattern() && descriptor.kind != FieldKind::Text {
                    return Err(StoreError::validation(format!(
                        "{}.{}: {:?} requires a text field",
                        model.name, descriptor.name, op
                    )));
                }
                if *insensitive && !descriptor.kind.is_textual() {
                    return Err(StoreError::validation(format!(
                        "{}.{}: case-insensitive mode requires a text field",
                        model.name, descriptor.name
                    )));
                }
                check_value(model, *field, value)
            }
            Predicate::In { field, values, .. } => values
                .iter()
                .try_for_each(|value| {
                    if value.is_null() {
                        let name = field_descriptor(model, *field)?.name;
                        return Err(StoreError::validation(format!(
                            "{}.{}: in-list values cannot be null",
                            model.name, name
                        )));
                    }
                    check_value(model, *field, value)
                }),
            Predicate::IsNull { field, .. } => field_descriptor(model, *field).map(|_| ()),
            Predicate::Relation {
                relation,
                predicate,
                ..
            } => {
                if relation.source != model.id {
                    return Err(StoreError::validation(format!(
                        "relation `{}` does not start at {}",
                        relation.name, model.name
                    )));
                }
                predicate.validate(relation.target.descriptor())
            }
        }
    }
}

fn field_descriptor(
    model: &'static ModelDescriptor,
    field: usize,
) -> StoreResult<&'static crate::domain::schema::FieldDescriptor> {
    model.fields.get(field).ok_or_else(|| {
        StoreError::validation(format!("{} has no field #{}", model.name, field))
    })
}

/// Rejects a value that a field of this kind cannot hold.
pub fn check_value(model: &'static ModelDescriptor, field: usize, value: &Value) -> StoreResult<()> {
    let descriptor = field_descriptor(model, field)?;
    if descriptor.kind.accepts(value) {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "{}.{} expects {}, got {:?}",
            model.name,
            descriptor.name,
            descriptor.kind.describe(),
            value
        )))
    }
}

/// Typed filter over the rows of `E`.
pub struct Filter<E> {
    predicate: Predicate,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for Filter<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for Filter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Filter").field(&self.predicate).finish()
    }
}

impl<E: Entity> Default for Filter<E> {
    fn default() -> Self {
        Self::all()
    }
}

impl<E: Entity> Filter<E> {
    fn wrap(predicate: Predicate) -> Self {
        Self {
            predicate,
            _marker: PhantomData,
        }
    }

    pub fn all() -> Self {
        Self::wrap(Predicate::always())
    }

    pub fn compare(field: E::Field, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::wrap(Predicate::compare(field.index(), op, value.into()))
    }

    pub fn equals(field: E::Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn not_equals(field: E::Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn lt(field: E::Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn lte(field: E::Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    pub fn gt(field: E::Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: E::Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn contains(field: E::Field, needle: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::Contains, Value::Text(needle.into()))
    }

    pub fn starts_with(field: E::Field, prefix: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::StartsWith, Value::Text(prefix.into()))
    }

    pub fn ends_with(field: E::Field, suffix: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::EndsWith, Value::Text(suffix.into()))
    }

    pub fn in_list<V: Into<Value>>(field: E::Field, values: impl IntoIterator<Item = V>) -> Self {
        Self::wrap(Predicate::In {
            field: field.index(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        })
    }

    pub fn not_in<V: Into<Value>>(field: E::Field, values: impl IntoIterator<Item = V>) -> Self {
        Self::wrap(Predicate::In {
            field: field.index(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        })
    }

    pub fn is_null(field: E::Field) -> Self {
        Self::wrap(Predicate::IsNull {
            field: field.index(),
            negated: false,
        })
    }

    pub fn is_not_null(field: E::Field) -> Self {
        Self::wrap(Predicate::IsNull {
            field: field.index(),
            negated: true,
        })
    }

    /// Switches every comparison in this filter to case-insensitive matching.
    pub fn case_insensitive(mut self) -> Self {
        self.predicate.set_insensitive();
        self
    }

    pub fn and(self, other: Filter<E>) -> Self {
        Self::wrap(Predicate::all([self.predicate, other.predicate]))
    }

    pub fn or(self, other: Filter<E>) -> Self {
        Self::wrap(Predicate::any([self.predicate, other.predicate]))
    }

    pub fn negate(self) -> Self {
        Self::wrap(self.predicate.negate())
    }

    pub fn all_of(filters: impl IntoIterator<Item = Filter<E>>) -> Self {
        Self::wrap(Predicate::all(filters.into_iter().map(|f| f.predicate)))
    }

    pub fn any_of(filters: impl IntoIterator<Item = Filter<E>>) -> Self {
        Self::wrap(Predicate::any(filters.into_iter().map(|f| f.predicate)))
    }

    fn related<T: Entity>(relation: Relation<E, T>, quantifier: Quantifier, filter: Filter<T>) -> Self {
        Self::wrap(Predicate::Relation {
            relation: *relation.descriptor(),
            quantifier,
            predicate: Box::new(filter.predicate),
        })
    }

    /// At least one related row matches.
    pub fn some<T: Entity>(relation: Relation<E, T>, filter: Filter<T>) -> Self {
        Self::related(relation, Quantifier::Some, filter)
    }

    /// Every related row matches (vacuously true without related rows).
    pub fn every<T: Entity>(relation: Relation<E, T>, filter: Filter<T>) -> Self {
        Self::related(relation, Quantifier::Every, filter)
    }

    /// No related row matches.
    pub fn none<T: Entity>(relation: Relation<E, T>, filter: Filter<T>) -> Self {
        Self::related(relation, Quantifier::None, filter)
    }

    /// The related parent row exists and matches.
    pub fn is<T: Entity>(relation: Relation<E, T>, filter: Filter<T>) -> Self {
        Self::related(relation, Quantifier::Some, filter)
    }

    /// There is no related parent row matching.
    pub fn is_not<T: Entity>(relation: Relation<E, T>, filter: Filter<T>) -> Self {
        Self::related(relation, Quantifier::None, filter)
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn into_predicate(self) -> Predicate {
        self.predicate
    }
}
