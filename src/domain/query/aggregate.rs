use std::collections::BTreeMap;

use serde_json::{json, Map};

use crate::domain::query::{FindManyArgs, Filter, OrderBy};
use crate::domain::schema::{Entity, FieldKind, ModelDescriptor, ModelField, Row, Value};
use crate::domain::stores::{StoreError, StoreResult};

/// Which aggregates to compute. Sum and average apply to integer fields.
#[derive(Debug, Clone)]
pub struct AggregateSelection<E: Entity> {
    pub count_all: bool,
    pub count: Vec<E::Field>,
    pub min: Vec<E::Field>,
    pub max: Vec<E::Field>,
    pub sum: Vec<E::Field>,
    pub avg: Vec<E::Field>,
}

impl<E: Entity> Default for AggregateSelection<E> {
    fn default() -> Self {
        Self {
            count_all: false,
            count: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
            sum: Vec::new(),
            avg: Vec::new(),
        }
    }
}

impl<E: Entity> AggregateSelection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_all(mut self) -> Self {
        self.count_all = true;
        self
    }

    /// Counts non-null values of `field`.
    pub fn count(mut self, field: E::Field) -> Self {
        self.count.push(field);
        self
    }

    pub fn min(mut self, field: E::Field) -> Self {
        self.min.push(field);
        self
    }

    pub fn max(mut self, field: E::Field) -> Self {
        self.max.push(field);
        self
    }

    pub fn sum(mut self, field: E::Field) -> Self {
        self.sum.push(field);
        self
    }

    pub fn avg(mut self, field: E::Field) -> Self {
        self.avg.push(field);
        self
    }

    pub fn lower(&self) -> StoreResult<Aggregates> {
        let model = E::model();
        let numeric = |fields: &[E::Field], op: &str| -> StoreResult<Vec<usize>> {
            fields
                .iter()
                .map(|field| {
                    let descriptor = model.field(field.index());
                    if descriptor.kind == FieldKind::Int {
                        Ok(field.index())
                    } else {
                        Err(StoreError::validation(format!(
                            "{} is only available for integer fields, {}.{} is {}",
                            op,
                            model.name,
                            descriptor.name,
                            descriptor.kind.describe()
                        )))
                    }
                })
                .collect()
        };
        Ok(Aggregates {
            count_all: self.count_all,
            count: self.count.iter().map(|f| f.index()).collect(),
            min: self.min.iter().map(|f| f.index()).collect(),
            max: self.max.iter().map(|f| f.index()).collect(),
            sum: numeric(&self.sum, "_sum")?,
            avg: numeric(&self.avg, "_avg")?,
        })
    }
}

/// Untyped form of `AggregateSelection`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub count_all: bool,
    pub count: Vec<usize>,
    pub min: Vec<usize>,
    pub max: Vec<usize>,
    pub sum: Vec<usize>,
    pub avg: Vec<usize>,
}

impl Aggregates {
    pub fn compute(&self, rows: &[Row]) -> AggregateResult {
        let present = |field: usize| rows.iter().map(move |row| &row[field]).filter(|v| !v.is_null());

        let mut result = AggregateResult {
            count_all: self.count_all.then_some(rows.len() as i64),
            ..Default::default()
        };
        for &field in &self.count {
            result.count.insert(field, present(field).count() as i64);
        }
        for &field in &self.min {
            result
                .min
                .insert(field, present(field).min().cloned().unwrap_or(Value::Null));
        }
        for &field in &self.max {
            result
                .max
                .insert(field, present(field).max().cloned().unwrap_or(Value::Null));
        }
        for &field in &self.sum {
            let values: Vec<i64> = present(field).filter_map(Value::as_int).collect();
            let sum = if values.is_empty() {
                Value::Null
            } else {
                Value::Int(values.iter().sum())
            };
            result.sum.insert(field, sum);
        }
        for &field in &self.avg {
            let values: Vec<i64> = present(field).filter_map(Value::as_int).collect();
            let avg = if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64)
            };
            result.avg.insert(field, avg);
        }
        result
    }
}

/// Aggregates keyed by field index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    pub count_all: Option<i64>,
    pub count: BTreeMap<usize, i64>,
    pub min: BTreeMap<usize, Value>,
    pub max: BTreeMap<usize, Value>,
    pub sum: BTreeMap<usize, Value>,
    pub avg: BTreeMap<usize, Option<f64>>,
}

impl AggregateResult {
    pub fn count_of(&self, field: impl ModelField) -> i64 {
        self.count.get(&field.index()).copied().unwrap_or(0)
    }

    pub fn min_of(&self, field: impl ModelField) -> Value {
        self.min.get(&field.index()).cloned().unwrap_or(Value::Null)
    }

    pub fn max_of(&self, field: impl ModelField) -> Value {
        self.max.get(&field.index()).cloned().unwrap_or(Value::Null)
    }

    pub fn sum_of(&self, field: impl ModelField) -> Option<i64> {
        self.sum.get(&field.index()).and_then(Value::as_int)
    }

    pub fn avg_of(&self, field: impl ModelField) -> Option<f64> {
        self.avg.get(&field.index()).copied().flatten()
    }

    /// `{ "_count": {..}, "_min": {..}, .. }` with schema field names.
    pub fn to_json(&self, model: &ModelDescriptor) -> serde_json::Value {
        let name = |field: &usize| model.field(*field).name.to_string();
        let mut out = Map::new();

        if self.count_all.is_some() || !self.count.is_empty() {
            let mut count = Map::new();
            if let Some(all) = self.count_all {
                count.insert("_all".to_string(), json!(all));
            }
            for (field, n) in &self.count {
                count.insert(name(field), json!(n));
            }
            out.insert("_count".to_string(), count.into());
        }
        let sections = [("_min", &self.min), ("_max", &self.max), ("_sum", &self.sum)];
        for (key, values) in sections {
            if !values.is_empty() {
                let section: Map<String, serde_json::Value> =
                    values.iter().map(|(f, v)| (name(f), v.to_json())).collect();
                out.insert(key.to_string(), section.into());
            }
        }
        if !self.avg.is_empty() {
            let section: Map<String, serde_json::Value> =
                self.avg.iter().map(|(f, v)| (name(f), json!(v))).collect();
            out.insert("_avg".to_string(), section.into());
        }
        out.into()
    }
}

/// Options of `aggregate`: the rows are chosen as by `find_many`.
#[derive(Debug, Clone)]
pub struct AggregateArgs<E: Entity> {
    pub query: FindManyArgs<E>,
    pub select: AggregateSelection<E>,
}

impl<E: Entity> AggregateArgs<E> {
    pub fn new(select: AggregateSelection<E>) -> Self {
        Self {
            query: FindManyArgs::default(),
            select,
        }
    }

    pub fn query(mut self, query: FindManyArgs<E>) -> Self {
        self.query = query;
        self
    }
}

/// Options of `group_by`. `having` and `order_by` may only reference fields
/// listed in `by`; `skip` and `take` require an `order_by`.
#[derive(Debug, Clone)]
pub struct GroupByArgs<E: Entity> {
    pub by: Vec<E::Field>,
    pub filter: Option<Filter<E>>,
    pub having: Option<Filter<E>>,
    pub order_by: Vec<OrderBy<E>>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub select: AggregateSelection<E>,
}

impl<E: Entity> GroupByArgs<E> {
    pub fn new(by: impl IntoIterator<Item = E::Field>) -> Self {
        Self {
            by: by.into_iter().collect(),
            filter: None,
            having: None,
            order_by: Vec::new(),
            skip: None,
            take: None,
            select: AggregateSelection::default(),
        }
    }

    pub fn filter(mut self, filter: Filter<E>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn having(mut self, having: Filter<E>) -> Self {
        self.having = Some(having);
        self
    }

    pub fn order_by(mut self, order: OrderBy<E>) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn aggregates(mut self, select: AggregateSelection<E>) -> Self {
        self.select = select;
        self
    }
}

/// One group: the `by` values and the aggregates over its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub by: Vec<usize>,
    pub key: Vec<Value>,
    pub aggregates: AggregateResult,
}

impl Group {
    pub fn value(&self, field: impl ModelField) -> Option<&Value> {
        let index = field.index();
        self.by
            .iter()
            .position(|f| *f == index)
            .and_then(|pos| self.key.get(pos))
    }

    pub fn to_json(&self, model: &ModelDescriptor) -> serde_json::Value {
        let mut out = match self.aggregates.to_json(model) {
            serde_json::Value::Object(map) => map,
            _ => Map::new(),
        };
        for (field, value) in self.by.iter().zip(&self.key) {
            out.insert(model.field(*field).name.to_string(), value.to_json());
        }
        out.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Repository, RepositoryField};

    fn rows() -> Vec<Row> {
        vec![
            vec![Value::Int(2), Value::from("b")],
            vec![Value::Null, Value::from("a")],
            vec![Value::Int(4), Value::Null],
        ]
    }

    #[test]
    fn test_compute_skips_nulls() {
        let aggregates = Aggregates {
            count_all: true,
            count: vec![0, 1],
            min: vec![1],
            max: vec![0],
            sum: vec![0],
            avg: vec![0],
        };
        let result = aggregates.compute(&rows());
        assert_eq!(result.count_all, Some(3));
        assert_eq!(result.count[&0], 2);
        assert_eq!(result.count[&1], 2);
        assert_eq!(result.min[&1], Value::from("a"));
        assert_eq!(result.max[&0], Value::Int(4));
        assert_eq!(result.sum[&0], Value::Int(6));
        assert_eq!(result.avg[&0], Some(3.0));
    }

    #[test]
    fn test_compute_over_no_rows() {
        let aggregates = Aggregates {
            count_all: true,
            sum: vec![0],
            avg: vec![0],
            min: vec![0],
            ..Default::default()
        };
        let result = aggregates.compute(&[]);
        assert_eq!(result.count_all, Some(0));
        assert_eq!(result.sum[&0], Value::Null);
        assert_eq!(result.avg[&0], None);
        assert_eq!(result.min[&0], Value::Null);
    }

    #[test]
    fn test_sum_requires_integer_field() {
        let selection = AggregateSelection::<Repository>::new().sum(RepositoryField::Name);
        assert!(matches!(selection.lower(), Err(StoreError::Validation(_))));

        let selection = AggregateSelection::<Repository>::new()
            .sum(RepositoryField::GithubId)
            .avg(RepositoryField::GithubId)
            .min(RepositoryField::Name);
        assert!(selection.lower().is_ok());
    }

    #[test]
    fn test_to_json_uses_field_names() {
        let aggregates = Aggregates {
            count_all: true,
            max: vec![RepositoryField::GithubId.index()],
            ..Default::default()
        };
        let row = |id: i64| {
            let mut row = vec![Value::Null; Repository::model().fields.len()];
            row[RepositoryField::GithubId.index()] = Value::Int(id);
            row
        };
        let result = aggregates.compute(&[row(1), row(9)]);
        let json = result.to_json(Repository::model());
        assert_eq!(json["_count"]["_all"], 2);
        assert_eq!(json["_max"]["githubId"], 9);
    }
}
