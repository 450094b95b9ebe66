use std::collections::{BTreeMap, HashMap};

use crate::domain::query::Predicate;
use crate::domain::query::eval::{RelatedRows, compare_rows, matches};
use crate::domain::schema::{
    ModelDescriptor, ModelId, OnDelete, RelationDescriptor, Row, UniqueDescriptor, Value,
};
use crate::domain::stores::{
    Assignment, ConstraintKind, Connection, SelectQuery, StoreError, StoreResult,
};

/// Every table of the in-memory store, keyed by primary key. `BTreeMap`
/// iteration gives the default primary-key order for free.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    rows: HashMap<ModelId, BTreeMap<String, Row>>,
}

impl Tables {
    pub fn len(&self, model: ModelId) -> usize {
        self.rows.get(&model).map(BTreeMap::len).unwrap_or(0)
    }

    fn table(&self, model: ModelId) -> impl Iterator<Item = (&String, &Row)> {
        self.rows.get(&model).into_iter().flat_map(|table| table.iter())
    }

    fn table_mut(&mut self, model: ModelId) -> &mut BTreeMap<String, Row> {
        self.rows.entry(model).or_default()
    }

    fn matching_keys(&self, model: &'static ModelDescriptor, predicate: &Predicate) -> Vec<String> {
        self.table(model.id)
            .filter(|(_, row)| matches(predicate, row, self))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// First unique constraint `row` collides with, ignoring the row stored
    /// under `own_key`. Null values never collide.
    fn unique_conflict(
        &self,
        model: &'static ModelDescriptor,
        row: &Row,
        own_key: Option<&str>,
    ) -> Option<&'static UniqueDescriptor> {
        model.unique.iter().find(|unique| {
            if unique.fields.iter().any(|f| row[*f].is_null()) {
                return false;
            }
            self.table(model.id).any(|(key, other)| {
                Some(key.as_str()) != own_key && unique.fields.iter().all(|f| other[*f] == row[*f])
            })
        })
    }

    fn check_unique(&self, model: &'static ModelDescriptor, row: &Row, own_key: Option<&str>) -> StoreResult<()> {
        match self.unique_conflict(model, row, own_key) {
            Some(unique) => Err(StoreError::constraint(
                ConstraintKind::Unique,
                unique.name,
                format!(
                    "a {} with the same {} already exists",
                    model.name,
                    describe_fields(model, unique)
                ),
            )),
            None => Ok(()),
        }
    }

    /// `own_key` is the key the row is about to be stored under, so a row may
    /// reference itself.
    fn check_foreign_keys(
        &self,
        model: &'static ModelDescriptor,
        row: &Row,
        own_key: &str,
    ) -> StoreResult<()> {
        for fk in model.foreign_keys {
            let Value::Text(key) = &row[fk.field] else {
                continue;
            };
            let exists = (fk.target == model.id && key == own_key)
                || self
                    .rows
                    .get(&fk.target)
                    .is_some_and(|table| table.contains_key(key));
            if !exists {
                return Err(StoreError::constraint(
                    ConstraintKind::ForeignKey,
                    fk.name,
                    format!(
                        "{}.{} references a missing {} `{}`",
                        model.name,
                        model.field(fk.field).name,
                        fk.target.descriptor().name,
                        key
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Rejects a primary-key change while other rows still point at the old key.
    fn check_not_referenced(&self, model: &'static ModelDescriptor, key: &str) -> StoreResult<()> {
        let old = Value::Text(key.to_string());
        for (referencing, fk) in model.referencing_keys() {
            if self.table(referencing.id).any(|(_, row)| row[fk.field] == old) {
                return Err(StoreError::constraint(
                    ConstraintKind::ForeignKey,
                    fk.name,
                    format!(
                        "{} `{}` is still referenced from {}",
                        model.name, key, referencing.name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn update_row(
        &mut self,
        model: &'static ModelDescriptor,
        key: &str,
        assignments: &[Assignment],
    ) -> StoreResult<Row> {
        let mut row = self
            .table_mut(model.id)
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::Unknown(format!("{} `{}` vanished during update", model.name, key)))?;
        for assignment in assignments {
            row[assignment.field] = assignment.value.clone();
        }
        let new_key = model.key_of(&row)?;
        if new_key != key {
            self.check_not_referenced(model, key)?;
        }
        self.check_unique(model, &row, Some(key))?;
        self.check_foreign_keys(model, &row, &new_key)?;

        let table = self.table_mut(model.id);
        table.remove(key);
        table.insert(new_key, row.clone());
        Ok(row)
    }

    fn delete_row(&mut self, model: &'static ModelDescriptor, key: &str) -> StoreResult<Option<Row>> {
        let Some(row) = self.table_mut(model.id).remove(key) else {
            return Ok(None);
        };
        let target = Value::Text(key.to_string());
        for (referencing, fk) in model.referencing_keys() {
            let dependants: Vec<String> = self
                .table(referencing.id)
                .filter(|(_, other)| other[fk.field] == target)
                .map(|(k, _)| k.clone())
                .collect();
            if dependants.is_empty() {
                continue;
            }
            match fk.on_delete {
                OnDelete::Cascade => {
                    for dependant in dependants {
                        self.delete_row(referencing, &dependant)?;
                    }
                }
                OnDelete::SetNull => {
                    let table = self.table_mut(referencing.id);
                    for dependant in dependants {
                        if let Some(other) = table.get_mut(&dependant) {
                            other[fk.field] = Value::Null;
                        }
                    }
                }
                OnDelete::Restrict => {
                    return Err(StoreError::constraint(
                        ConstraintKind::ForeignKey,
                        fk.name,
                        format!(
                            "{} `{}` is still referenced from {}",
                            model.name, key, referencing.name
                        ),
                    ));
                }
            }
        }
        Ok(Some(row))
    }
}

fn describe_fields(model: &'static ModelDescriptor, unique: &UniqueDescriptor) -> String {
    unique
        .fields
        .iter()
        .map(|f| model.field(*f).name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl RelatedRows for Tables {
    fn related(&self, relation: &RelationDescriptor, key: &Value) -> Vec<&Row> {
        let target = relation.target.descriptor();
        if relation.remote == target.primary_key {
            let Value::Text(key) = key else {
                return Vec::new();
            };
            return self
                .rows
                .get(&relation.target)
                .and_then(|table| table.get(key))
                .into_iter()
                .collect();
        }
        self.table(relation.target)
            .map(|(_, row)| row)
            .filter(|row| row[relation.remote] == *key)
            .collect()
    }
}

impl Connection for Tables {
    fn select(&mut self, model: &'static ModelDescriptor, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        let mut rows: Vec<&Row> = self
            .table(model.id)
            .map(|(_, row)| row)
            .filter(|row| matches(&query.predicate, row, &*self))
            .collect();
        if !query.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &query.order));
        }
        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn count(&mut self, model: &'static ModelDescriptor, predicate: &Predicate) -> StoreResult<i64> {
        Ok(self.matching_keys(model, predicate).len() as i64)
    }

    fn insert(
        &mut self,
        model: &'static ModelDescriptor,
        row: Row,
        skip_duplicates: bool,
    ) -> StoreResult<Option<Row>> {
        if self.unique_conflict(model, &row, None).is_some() && skip_duplicates {
            return Ok(None);
        }
        self.check_unique(model, &row, None)?;
        let key = model.key_of(&row)?;
        self.check_foreign_keys(model, &row, &key)?;
        self.table_mut(model.id).insert(key, row.clone());
        Ok(Some(row))
    }

    fn update(
        &mut self,
        model: &'static ModelDescriptor,
        predicate: &Predicate,
        assignments: &[Assignment],
    ) -> StoreResult<Vec<Row>> {
        let keys = self.matching_keys(model, predicate);
        keys.iter()
            .map(|key| self.update_row(model, key, assignments))
            .collect()
    }

    fn delete(&mut self, model: &'static ModelDescriptor, predicate: &Predicate) -> StoreResult<Vec<Row>> {
        let keys = self.matching_keys(model, predicate);
        let mut deleted = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(row) = self.delete_row(model, &key)? {
                deleted.push(row);
            }
        }
        Ok(deleted)
    }

    fn upsert(
        &mut self,
        model: &'static ModelDescriptor,
        conflict: &'static UniqueDescriptor,
        row: Row,
        assignments: &[Assignment],
    ) -> StoreResult<Row> {
        let existing = self
            .table(model.id)
            .find(|(_, other)| {
                conflict
                    .fields
                    .iter()
                    .all(|f| !row[*f].is_null() && other[*f] == row[*f])
            })
            .map(|(key, _)| key.clone());
        match existing {
            Some(key) => self.update_row(model, &key, assignments),
            None => self.insert(model, row, false)?.ok_or_else(|| {
                StoreError::Unknown(format!("upsert into {} inserted no row", model.name))
            }),
        }
    }

    fn execute_raw(&mut self, _sql: &str) -> StoreResult<usize> {
        Err(StoreError::validation(
            "the memory backend cannot execute raw SQL",
        ))
    }
}
