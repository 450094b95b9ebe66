//! Row-level evaluation of predicates and sort keys.
//!
//! Uses SQL three-valued logic so that the in-memory backend agrees with
//! Postgres: a comparison against a null column is unknown, and only rows
//! whose predicate is definitely true are kept.

use std::cmp::Ordering;

use crate::domain::query::{CompareOp, NullsOrder, OrderKey, Predicate, Quantifier, SortOrder};
use crate::domain::schema::{RelationDescriptor, Row, Value};

/// Resolves the rows on the far side of a relation.
pub trait RelatedRows {
    /// Rows of `relation.target` whose `relation.remote` field equals `key`.
    fn related(&self, relation: &RelationDescriptor, key: &Value) -> Vec<&Row>;
}

/// For predicates known to contain no relation filters.
pub struct NoRelations;

impl RelatedRows for NoRelations {
    fn related(&self, _relation: &RelationDescriptor, _key: &Value) -> Vec<&Row> {
        Vec::new()
    }
}

pub fn matches(predicate: &Predicate, row: &Row, related: &dyn RelatedRows) -> bool {
    evaluate(predicate, row, related) == Some(true)
}

/// `None` is SQL's unknown.
pub fn evaluate(predicate: &Predicate, row: &Row, related: &dyn RelatedRows) -> Option<bool> {
    match predicate {
        Predicate::And(parts) => {
            let mut unknown = false;
            for part in parts {
                match evaluate(part, row, related) {
                    Some(false) => return Some(false),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            if unknown { None } else { Some(true) }
        }
        Predicate::Or(parts) => {
            let mut unknown = false;
            for part in parts {
                match evaluate(part, row, related) {
                    Some(true) => return Some(true),
                    None => unknown = true,
                    Some(false) => {}
                }
            }
            if unknown { None } else { Some(false) }
        }
        Predicate::Not(inner) => evaluate(inner, row, related).map(|v| !v),
        Predicate::Compare {
            field,
            op,
            value,
            insensitive,
        } => {
            let current = row.get(*field)?;
            compare(current, *op, value, *insensitive)
        }
        Predicate::In {
            field,
            values,
            negated,
        } => {
            let current = row.get(*field)?;
            if current.is_null() {
                return None;
            }
            Some(values.contains(current) != *negated)
        }
        Predicate::IsNull { field, negated } => {
            let current = row.get(*field)?;
            Some(current.is_null() != *negated)
        }
        Predicate::Relation {
            relation,
            quantifier,
            predicate,
        } => {
            let key = row.get(relation.local)?;
            let rows = if key.is_null() {
                Vec::new()
            } else {
                related.related(relation, key)
            };
            let mut hits = rows.iter().map(|r| matches(predicate, r, related));
            Some(match quantifier {
                Quantifier::Some => hits.any(|hit| hit),
                Quantifier::None => !hits.any(|hit| hit),
                Quantifier::Every => hits.all(|hit| hit),
            })
        }
    }
}

fn compare(current: &Value, op: CompareOp, expected: &Value, insensitive: bool) -> Option<bool> {
    if current.is_null() || expected.is_null() {
        return None;
    }

    if let (Value::Text(a), Value::Text(b)) = (current, expected) {
        let (a, b) = if insensitive {
            (a.to_lowercase(), b.to_lowercase())
        } else {
            (a.clone(), b.clone())
        };
        match op {
            CompareOp::Contains => return Some(a.contains(&b)),
            CompareOp::StartsWith => return Some(a.starts_with(&b)),
            CompareOp::EndsWith => return Some(a.ends_with(&b)),
            _ => return Some(ordering_holds(op, a.as_bytes().cmp(b.as_bytes()))),
        }
    }

    if op.is_pattern() || std::mem::discriminant(current) != std::mem::discriminant(expected) {
        return None;
    }
    Some(ordering_holds(op, current.cmp(expected)))
}

fn ordering_holds(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => false,
    }
}

/// Orders two rows by `keys`, honouring explicit null placement.
pub fn compare_rows(a: &Row, b: &Row, keys: &[OrderKey]) -> Ordering {
    for key in keys {
        let (va, vb) = (&a[key.field], &b[key.field]);
        let ordering = match (va.is_null(), vb.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => match key.nulls {
                NullsOrder::First => Ordering::Less,
                NullsOrder::Last => Ordering::Greater,
            },
            (false, true) => match key.nulls {
                NullsOrder::First => Ordering::Greater,
                NullsOrder::Last => Ordering::Less,
            },
            (false, false) => match key.direction {
                SortOrder::Asc => va.cmp(vb),
                SortOrder::Desc => vb.cmp(va),
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: Vec<Value>) -> Row {
        values
    }

    #[test]
    fn test_not_over_null_is_unknown() {
        let r = row(vec![Value::Text("a".into()), Value::Null]);
        let ne = Predicate::compare(1, CompareOp::Ne, Value::from("x"));
        assert_eq!(evaluate(&ne, &r, &NoRelations), None);
        assert!(!matches(&ne.clone().negate(), &r, &NoRelations));
        assert!(!matches(&ne, &r, &NoRelations));
    }

    #[test]
    fn test_or_with_unknown_and_true_is_true() {
        let r = row(vec![Value::Null]);
        let p = Predicate::any([
            Predicate::compare(0, CompareOp::Gt, Value::Int(1)),
            Predicate::IsNull {
                field: 0,
                negated: false,
            },
        ]);
        assert!(matches(&p, &r, &NoRelations));
    }

    #[test]
    fn test_case_insensitive_contains() {
        let r = row(vec![Value::from("README.md")]);
        let p = Predicate::Compare {
            field: 0,
            op: CompareOp::Contains,
            value: Value::from("readme"),
            insensitive: true,
        };
        assert!(matches(&p, &r, &NoRelations));
    }

    #[test]
    fn test_empty_and_or() {
        let r = row(vec![]);
        assert!(matches(&Predicate::always(), &r, &NoRelations));
        assert!(!matches(&Predicate::never(), &r, &NoRelations));
    }

    #[test]
    fn test_compare_rows_nulls_placement() {
        let a = row(vec![Value::Null]);
        let b = row(vec![Value::Int(1)]);
        let asc = [OrderKey::ascending(0)];
        assert_eq!(compare_rows(&a, &b, &asc), Ordering::Greater);
        let desc = [asc[0].reversed()];
        assert_eq!(compare_rows(&a, &b, &desc), Ordering::Less);
        let asc_nulls_first = [OrderKey {
            field: 0,
            direction: SortOrder::Asc,
            nulls: NullsOrder::First,
        }];
        assert_eq!(compare_rows(&a, &b, &asc_nulls_first), Ordering::Less);
    }
}
