//! Query semantics shared by every backend.
//!
//! Backends only store and filter rows. Everything a caller can observe on
//! top of that (cursor pagination, distinct, aggregation, grouping, default
//! values, same-repository and acyclic checks) is implemented here once.

use chrono::{DateTime, SubsecRound, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use tracing::debug;

use crate::domain::query::eval::{compare_rows, matches, NoRelations};
use crate::domain::query::{
    check_value, row_to_json, AggregateArgs, AggregateResult, CompareOp, Filter, FindManyArgs, Group,
    GroupByArgs, NullsOrder, OrderKey, Predicate, Projection, SortOrder,
};
use crate::domain::schema::{Entity, ModelDescriptor, ModelField, Relation, Row, UniqueKey, Value};
use crate::domain::stores::{Assignment, ConstraintKind, Connection, SelectQuery, StoreError, StoreResult};

/// `find_many` arguments with the entity type erased.
#[derive(Debug, Clone)]
struct Lowered {
    predicate: Predicate,
    order: Vec<OrderKey>,
    cursor: Option<Predicate>,
    take: Option<i64>,
    skip: usize,
    distinct: Vec<usize>,
}

static LAST_TIMESTAMP_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Timestamp for a `createdAt` / `updatedAt` write, at microsecond
/// precision. Strictly increasing within the process, so rows written in one
/// transaction keep their insertion order under `createdAt` ordering.
pub fn next_timestamp() -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6).timestamp_micros();
    let mut last = LAST_TIMESTAMP_MICROS.load(AtomicOrdering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_TIMESTAMP_MICROS.compare_exchange_weak(
            last,
            next,
            AtomicOrdering::Relaxed,
            AtomicOrdering::Relaxed,
        ) {
            Ok(_) => {
                return DateTime::<Utc>::from_timestamp_micros(next)
                    .unwrap_or_else(|| Utc::now().trunc_subsecs(6));
            }
            Err(current) => last = current,
        }
    }
}

/// One open transaction. All reads and writes made through a `Tx` commit or
/// roll back together.
pub struct Tx<'c> {
    conn: &'c mut dyn Connection,
}

impl<'c> Tx<'c> {
    pub fn new(conn: &'c mut dyn Connection) -> Self {
        Self { conn }
    }

    pub fn find_unique<E: Entity>(&mut self, key: &E::Unique) -> StoreResult<Option<E>> {
        let model = E::model();
        let predicate = unique_predicate(model, key)?;
        let query = SelectQuery {
            predicate,
            order: vec![OrderKey::ascending(model.primary_key)],
            offset: 0,
            limit: Some(2),
        };
        let mut rows = self.conn.select(model, &query)?;
        debug!("{}.find_unique({:?}) -> {} row(s)", model.name, key, rows.len());
        match rows.len() {
            0 => Ok(None),
            1 => E::from_row(rows.remove(0)).map(Some),
            n => Err(StoreError::Unknown(format!(
                "unique lookup on {} `{}` matched {} rows",
                model.name,
                key.constraint().name,
                n
            ))),
        }
    }

    pub fn find_unique_or_throw<E: Entity>(&mut self, key: &E::Unique) -> StoreResult<E> {
        self.find_unique::<E>(key)?.ok_or_else(|| StoreError::NotFound {
            model: E::model().name,
            detail: format!("no record matches {:?}", key),
        })
    }

    pub fn find_first<E: Entity>(&mut self, args: FindManyArgs<E>) -> StoreResult<Option<E>> {
        let mut args = args;
        args.take = Some(match args.take {
            Some(take) if take < 0 => -1,
            _ => 1,
        });
        Ok(self.find_many(args)?.into_iter().next())
    }

    pub fn find_first_or_throw<E: Entity>(&mut self, args: FindManyArgs<E>) -> StoreResult<E> {
        self.find_first(args)?.ok_or_else(|| StoreError::NotFound {
            model: E::model().name,
            detail: "no record matches the query".to_string(),
        })
    }

    pub fn find_many<E: Entity>(&mut self, args: FindManyArgs<E>) -> StoreResult<Vec<E>> {
        let model = E::model();
        let lowered = lower_args(model, args)?;
        self.select_rows(model, lowered)?
            .into_iter()
            .map(E::from_row)
            .collect()
    }

    /// Rows shaped by `projection`: either a subset of scalar fields, or the
    /// full row with related rows attached under the relation's name.
    pub fn find_many_projected<E: Entity>(
        &mut self,
        args: FindManyArgs<E>,
        projection: Projection<E>,
    ) -> StoreResult<Vec<serde_json::Value>> {
        projection.validate()?;
        let model = E::model();
        let lowered = lower_args(model, args)?;
        let rows = self.select_rows(model, lowered)?;
        let selected = projection.selected_fields();

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut object = row_to_json(model, &row, &selected);
            for include in projection.includes() {
                let relation = include.relation;
                let target = relation.target.descriptor();
                let key = &row[relation.local];
                let related = if key.is_null() {
                    Vec::new()
                } else {
                    let mut parts = vec![Predicate::equals(relation.remote, key.clone())];
                    parts.extend(include.filter.clone());
                    let query = SelectQuery {
                        predicate: Predicate::all(parts),
                        order: vec![OrderKey::ascending(target.primary_key)],
                        offset: 0,
                        limit: if relation.to_many { None } else { Some(1) },
                    };
                    self.conn.select(target, &query)?
                };
                let value = if relation.to_many {
                    serde_json::Value::Array(
                        related
                            .iter()
                            .map(|r| row_to_json(target, r, &[]).into())
                            .collect(),
                    )
                } else {
                    related
                        .first()
                        .map(|r| row_to_json(target, r, &[]).into())
                        .unwrap_or(serde_json::Value::Null)
                };
                object.insert(relation.name.to_string(), value);
            }
            out.push(object.into());
        }
        Ok(out)
    }

    /// The parent on the far side of a to-one relation.
    pub fn related_one<E: Entity, T: Entity>(
        &mut self,
        entity: &E,
        relation: Relation<E, T>,
    ) -> StoreResult<Option<T>> {
        let relation = relation.descriptor();
        let key = entity.to_row().swap_remove(relation.local);
        if key.is_null() {
            return Ok(None);
        }
        let query = SelectQuery {
            predicate: Predicate::equals(relation.remote, key),
            order: vec![OrderKey::ascending(T::model().primary_key)],
            offset: 0,
            limit: Some(1),
        };
        let mut rows = self.conn.select(T::model(), &query)?;
        if rows.is_empty() {
            Ok(None)
        } else {
            T::from_row(rows.remove(0)).map(Some)
        }
    }

    /// The rows on the far side of a to-many relation, with `find_many`
    /// arguments scoped to `entity`.
    pub fn related_many<E: Entity, T: Entity>(
        &mut self,
        entity: &E,
        relation: Relation<E, T>,
        args: FindManyArgs<T>,
    ) -> StoreResult<Vec<T>> {
        let relation = relation.descriptor();
        let key = entity.to_row().swap_remove(relation.local);
        if key.is_null() {
            return Ok(Vec::new());
        }
        let model = T::model();
        let mut lowered = lower_args(model, args)?;
        lowered.predicate = Predicate::all([
            Predicate::equals(relation.remote, key),
            lowered.predicate,
        ]);
        self.select_rows(model, lowered)?
            .into_iter()
            .map(T::from_row)
            .collect()
    }

    pub fn count<E: Entity>(&mut self, filter: Option<Filter<E>>) -> StoreResult<i64> {
        let model = E::model();
        let predicate = lower_filter(model, filter)?;
        let count = self.conn.count(model, &predicate)?;
        debug!("{}.count -> {}", model.name, count);
        Ok(count)
    }

    pub fn aggregate<E: Entity>(&mut self, args: AggregateArgs<E>) -> StoreResult<AggregateResult> {
        let model = E::model();
        let aggregates = args.select.lower()?;
        let lowered = lower_args(model, args.query)?;
        let rows = self.select_rows(model, lowered)?;
        Ok(aggregates.compute(&rows))
    }

    pub fn group_by<E: Entity>(&mut self, args: GroupByArgs<E>) -> StoreResult<Vec<Group>> {
        let model = E::model();
        let by: Vec<usize> = args.by.iter().map(|f| f.index()).collect();
        if by.is_empty() {
            return Err(StoreError::validation("group_by requires at least one `by` field"));
        }
        let order: Vec<OrderKey> = args.order_by.iter().map(|o| o.key()).collect();
        if let Some(key) = order.iter().find(|key| !by.contains(&key.field)) {
            return Err(StoreError::validation(format!(
                "{}.{} is ordered by but not listed in `by`",
                model.name,
                model.field(key.field).name
            )));
        }
        let having = match args.having {
            Some(having) => {
                let predicate = having.into_predicate();
                predicate.validate(model)?;
                if predicate.has_relation() {
                    return Err(StoreError::validation(
                        "having cannot filter across relations",
                    ));
                }
                let mut fields = Vec::new();
                predicate.local_fields(&mut fields);
                if let Some(field) = fields.iter().find(|f| !by.contains(f)) {
                    return Err(StoreError::validation(format!(
                        "{}.{} is used in having but not listed in `by`",
                        model.name,
                        model.field(*field).name
                    )));
                }
                Some(predicate)
            }
            None => None,
        };
        if (args.skip.is_some() || args.take.is_some()) && order.is_empty() {
            return Err(StoreError::validation(
                "group_by with skip or take requires order_by",
            ));
        }
        let skip = non_negative_skip(args.skip)?;
        let aggregates = args.select.lower()?;

        let predicate = lower_filter(model, args.filter)?;
        let rows = self.conn.select(
            model,
            &SelectQuery {
                predicate,
                order: vec![OrderKey::ascending(model.primary_key)],
                offset: 0,
                limit: None,
            },
        )?;

        let mut buckets: BTreeMap<Vec<Value>, Vec<Row>> = BTreeMap::new();
        for row in rows {
            let key = by.iter().map(|f| row[*f].clone()).collect();
            buckets.entry(key).or_default().push(row);
        }

        let mut groups: Vec<(Vec<Value>, Vec<Row>)> = buckets
            .into_iter()
            .filter(|(_, rows)| match &having {
                Some(having) => matches(having, &rows[0], &NoRelations),
                None => true,
            })
            .collect();
        if !order.is_empty() {
            groups.sort_by(|(_, a), (_, b)| compare_rows(&a[0], &b[0], &order));
        }

        let groups = paginate(groups, skip, args.take);
        debug!("{}.group_by -> {} group(s)", model.name, groups.len());
        Ok(groups
            .into_iter()
            .map(|(key, rows)| Group {
                by: by.clone(),
                key,
                aggregates: aggregates.compute(&rows),
            })
            .collect())
    }

    pub fn create<E: Entity>(&mut self, data: E::Create) -> StoreResult<E> {
        let model = E::model();
        let row = self.prepare_row::<E>(data)?;
        let inserted = self
            .conn
            .insert(model, row, false)?
            .ok_or_else(|| StoreError::Unknown(format!("insert into {} returned no row", model.name)))?;
        self.check_references(model, &inserted)?;
        debug!("{}.create -> {}", model.name, model.key_of(&inserted)?);
        E::from_row(inserted)
    }

    /// Returns the number of rows inserted. With `skip_duplicates`, rows that
    /// collide with an existing unique value are skipped silently.
    pub fn create_many<E: Entity>(
        &mut self,
        data: Vec<E::Create>,
        skip_duplicates: bool,
    ) -> StoreResult<i64> {
        let model = E::model();
        let mut inserted = 0;
        for item in data {
            let row = self.prepare_row::<E>(item)?;
            if let Some(row) = self.conn.insert(model, row, skip_duplicates)? {
                self.check_references(model, &row)?;
                inserted += 1;
            }
        }
        debug!("{}.create_many -> {}", model.name, inserted);
        Ok(inserted)
    }

    pub fn update<E: Entity>(&mut self, key: &E::Unique, data: E::Update) -> StoreResult<E> {
        let model = E::model();
        let predicate = unique_predicate(model, key)?;
        let assignments = self.prepare_assignments(model, E::assignments(data))?;
        let mut rows = self.apply_update(model, &predicate, &assignments)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound {
                model: model.name,
                detail: format!("no record to update matches {:?}", key),
            });
        }
        E::from_row(rows.remove(0))
    }

    pub fn update_many<E: Entity>(&mut self, filter: Option<Filter<E>>, data: E::Update) -> StoreResult<i64> {
        let model = E::model();
        let predicate = lower_filter(model, filter)?;
        let assignments = self.prepare_assignments(model, E::assignments(data))?;
        let rows = self.apply_update(model, &predicate, &assignments)?;
        debug!("{}.update_many -> {}", model.name, rows.len());
        Ok(rows.len() as i64)
    }

    /// Creates the row addressed by `key`, or updates it if it exists. The
    /// key's values are written into the created row.
    pub fn upsert<E: Entity>(&mut self, key: &E::Unique, create: E::Create, update: E::Update) -> StoreResult<E> {
        let model = E::model();
        unique_predicate(model, key)?;
        let entity = E::from_create(create, next_timestamp());
        let mut row = entity.to_row();
        for (field, value) in key.constraint().fields.iter().zip(key.values()) {
            row[*field] = value;
        }
        let row = normalize(row);
        check_row(model, &row)?;
        let assignments = self.prepare_assignments(model, E::assignments(update))?;

        let row = self.conn.upsert(model, key.constraint(), row, &assignments)?;
        self.check_references(model, &row)?;
        self.check_referencing_scopes(model, &row, &assignments)?;
        debug!("{}.upsert -> {}", model.name, model.key_of(&row)?);
        E::from_row(row)
    }

    pub fn delete<E: Entity>(&mut self, key: &E::Unique) -> StoreResult<E> {
        let model = E::model();
        let predicate = unique_predicate(model, key)?;
        let mut rows = self.conn.delete(model, &predicate)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound {
                model: model.name,
                detail: format!("no record to delete matches {:?}", key),
            });
        }
        debug!("{}.delete -> {}", model.name, model.key_of(&rows[0])?);
        E::from_row(rows.remove(0))
    }

    pub fn delete_many<E: Entity>(&mut self, filter: Option<Filter<E>>) -> StoreResult<i64> {
        let model = E::model();
        let predicate = lower_filter(model, filter)?;
        let rows = self.conn.delete(model, &predicate)?;
        debug!("{}.delete_many -> {}", model.name, rows.len());
        Ok(rows.len() as i64)
    }

    pub fn execute_raw(&mut self, sql: &str) -> StoreResult<usize> {
        self.conn.execute_raw(sql)
    }

    fn select_rows(&mut self, model: &'static ModelDescriptor, lowered: Lowered) -> StoreResult<Vec<Row>> {
        let backwards = lowered.take.is_some_and(|take| take < 0);
        let order: Vec<OrderKey> = if backwards {
            lowered.order.iter().map(|key| key.reversed()).collect()
        } else {
            lowered.order
        };

        let mut predicate = lowered.predicate;
        if let Some(cursor) = lowered.cursor {
            let found = self.conn.select(
                model,
                &SelectQuery {
                    predicate: cursor,
                    order: Vec::new(),
                    offset: 0,
                    limit: Some(1),
                },
            )?;
            match found.first() {
                Some(cursor_row) => {
                    predicate = Predicate::all([predicate, at_or_after(&order, cursor_row)]);
                }
                None => return Ok(Vec::new()),
            }
        }

        let limit = lowered.take.map(|take| take.unsigned_abs() as usize);
        let mut rows = if lowered.distinct.is_empty() {
            self.conn.select(
                model,
                &SelectQuery {
                    predicate,
                    order,
                    offset: lowered.skip,
                    limit,
                },
            )?
        } else {
            let all = self.conn.select(
                model,
                &SelectQuery {
                    predicate,
                    order,
                    offset: 0,
                    limit: None,
                },
            )?;
            let mut seen = HashSet::new();
            let unique: Vec<Row> = all
                .into_iter()
                .filter(|row| {
                    let key: Vec<Value> = lowered.distinct.iter().map(|f| row[*f].clone()).collect();
                    seen.insert(key)
                })
                .collect();
            unique
                .into_iter()
                .skip(lowered.skip)
                .take(limit.unwrap_or(usize::MAX))
                .collect()
        };

        if backwards {
            rows.reverse();
        }
        debug!("{}.find_many -> {} row(s)", model.name, rows.len());
        Ok(rows)
    }

    fn prepare_row<E: Entity>(&self, data: E::Create) -> StoreResult<Row> {
        let row = normalize(E::from_create(data, next_timestamp()).to_row());
        check_row(E::model(), &row)?;
        Ok(row)
    }

    fn prepare_assignments(
        &self,
        model: &'static ModelDescriptor,
        assignments: Vec<Assignment>,
    ) -> StoreResult<Vec<Assignment>> {
        let mut out = Vec::with_capacity(assignments.len() + 1);
        for assignment in assignments {
            let descriptor = model.field(assignment.field);
            if assignment.value.is_null() && !descriptor.nullable {
                return Err(StoreError::validation(format!(
                    "{}.{} is required and cannot be set to null",
                    model.name, descriptor.name
                )));
            }
            check_value(model, assignment.field, &assignment.value)?;
            out.push(Assignment {
                field: assignment.field,
                value: assignment.value.normalized(),
            });
        }
        if let Some(updated_at) = model.updated_at {
            if !out.iter().any(|a| a.field == updated_at) {
                out.push(Assignment::new(updated_at, next_timestamp()));
            }
        }
        Ok(out)
    }

    fn apply_update(
        &mut self,
        model: &'static ModelDescriptor,
        predicate: &Predicate,
        assignments: &[Assignment],
    ) -> StoreResult<Vec<Row>> {
        let rows = if assignments.is_empty() {
            self.conn.select(model, &SelectQuery::filtered(predicate.clone()))?
        } else {
            self.conn.update(model, predicate, assignments)?
        };
        let touches_references = model.foreign_keys.iter().any(|fk| {
            assignments.iter().any(|a| {
                a.field == fk.field || fk.scope.as_ref().is_some_and(|scope| scope.local == a.field)
            })
        });
        for row in &rows {
            if touches_references {
                self.check_references(model, row)?;
            }
            self.check_referencing_scopes(model, row, assignments)?;
        }
        Ok(rows)
    }

    /// Same-repository and acyclic checks on the row's own foreign keys.
    fn check_references(&mut self, model: &'static ModelDescriptor, row: &Row) -> StoreResult<()> {
        for fk in model.foreign_keys {
            let value = &row[fk.field];
            if value.is_null() || (fk.scope.is_none() && fk.acyclic.is_none()) {
                continue;
            }
            let target = fk.target.descriptor();

            if let Some(scope) = &fk.scope {
                if let Some(parent) = self.load_by_key(target, value)? {
                    if parent[scope.remote] != row[scope.local] {
                        return Err(StoreError::constraint(
                            ConstraintKind::SameScope,
                            scope.name,
                            format!(
                                "{}.{} must reference a {} in the same repository",
                                model.name,
                                model.field(fk.field).name,
                                target.name
                            ),
                        ));
                    }
                }
            }

            if let Some(name) = fk.acyclic {
                let mut visited = HashSet::new();
                visited.insert(row[model.primary_key].clone());
                let mut current = value.clone();
                loop {
                    if !visited.insert(current.clone()) {
                        return Err(StoreError::constraint(
                            ConstraintKind::Acyclic,
                            name,
                            format!(
                                "{} {:?} would become its own ancestor",
                                model.name, row[model.primary_key]
                            ),
                        ));
                    }
                    match self.load_by_key(target, &current)? {
                        Some(parent) if !parent[fk.field].is_null() => {
                            current = parent[fk.field].clone();
                        }
                        _ => break,
                    }
                }
            }
        }
        Ok(())
    }

    /// When a scope field of a referenced row changes, every row pointing at
    /// it must still agree.
    fn check_referencing_scopes(
        &mut self,
        model: &'static ModelDescriptor,
        row: &Row,
        assignments: &[Assignment],
    ) -> StoreResult<()> {
        for (referencing, fk) in model.referencing_keys() {
            let Some(scope) = &fk.scope else { continue };
            if !assignments.iter().any(|a| a.field == scope.remote) {
                continue;
            }
            let predicate = Predicate::all([
                Predicate::equals(fk.field, row[model.primary_key].clone()),
                Predicate::compare(scope.local, CompareOp::Ne, row[scope.remote].clone()),
            ]);
            if self.conn.count(referencing, &predicate)? > 0 {
                return Err(StoreError::constraint(
                    ConstraintKind::SameScope,
                    scope.name,
                    format!(
                        "{} rows referencing this {} belong to another repository",
                        referencing.name, model.name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn load_by_key(&mut self, model: &'static ModelDescriptor, key: &Value) -> StoreResult<Option<Row>> {
        let mut rows = self.conn.select(
            model,
            &SelectQuery {
                predicate: Predicate::equals(model.primary_key, key.clone()),
                order: Vec::new(),
                offset: 0,
                limit: Some(1),
            },
        )?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }
}

fn unique_predicate<U: UniqueKey>(model: &'static ModelDescriptor, key: &U) -> StoreResult<Predicate> {
    let fields = key.constraint().fields;
    let values = key.values();
    let mut parts = Vec::with_capacity(fields.len());
    for (field, value) in fields.iter().zip(values) {
        if value.is_null() {
            return Err(StoreError::validation(format!(
                "{}.{}: unique lookups need a value",
                model.name,
                model.field(*field).name
            )));
        }
        check_value(model, *field, &value)?;
        parts.push(Predicate::equals(*field, value.normalized()));
    }
    Ok(Predicate::all(parts))
}

fn lower_filter<E: Entity>(model: &'static ModelDescriptor, filter: Option<Filter<E>>) -> StoreResult<Predicate> {
    let predicate = filter.map(Filter::into_predicate).unwrap_or_else(Predicate::always);
    predicate.validate(model)?;
    Ok(predicate)
}

fn lower_args<E: Entity>(model: &'static ModelDescriptor, args: FindManyArgs<E>) -> StoreResult<Lowered> {
    let predicate = lower_filter(model, args.filter)?;
    let mut order: Vec<OrderKey> = args.order_by.iter().map(|o| o.key()).collect();
    if !order.iter().any(|key| key.field == model.primary_key) {
        order.push(OrderKey::ascending(model.primary_key));
    }
    let cursor = args
        .cursor
        .as_ref()
        .map(|key| unique_predicate(model, key))
        .transpose()?;
    Ok(Lowered {
        predicate,
        order,
        cursor,
        take: args.take,
        skip: non_negative_skip(args.skip)?,
        distinct: args.distinct.iter().map(|f| f.index()).collect(),
    })
}

fn non_negative_skip(skip: Option<i64>) -> StoreResult<usize> {
    match skip {
        None => Ok(0),
        Some(skip) => usize::try_from(skip)
            .map_err(|_| StoreError::validation(format!("skip must not be negative, got {}", skip))),
    }
}

fn paginate<T>(items: Vec<T>, skip: usize, take: Option<i64>) -> Vec<T> {
    match take {
        Some(take) if take < 0 => {
            let keep = take.unsigned_abs() as usize;
            let end = items.len().saturating_sub(skip);
            let start = end.saturating_sub(keep);
            items.into_iter().take(end).skip(start).collect()
        }
        Some(take) => items.into_iter().skip(skip).take(take as usize).collect(),
        None => items.into_iter().skip(skip).collect(),
    }
}

fn normalize(row: Row) -> Row {
    row.into_iter().map(Value::normalized).collect()
}

fn check_row(model: &'static ModelDescriptor, row: &Row) -> StoreResult<()> {
    for (index, field) in model.fields.iter().enumerate() {
        let value = &row[index];
        if value.is_null() && !field.nullable {
            return Err(StoreError::validation(format!(
                "{}.{} is required",
                model.name, field.name
            )));
        }
        check_value(model, index, value)?;
    }
    Ok(())
}

/// Rows at or after `cursor` under `order`, cursor row included.
///
/// `order` must end in a unique key so that the final all-equal branch only
/// matches the cursor row itself.
fn at_or_after(order: &[OrderKey], cursor: &Row) -> Predicate {
    let mut alternatives = Vec::new();
    let mut equal_prefix: Vec<Predicate> = Vec::new();
    for key in order {
        let value = cursor[key.field].clone();
        if let Some(after) = strictly_after(key, &value) {
            let mut branch = equal_prefix.clone();
            branch.push(after);
            alternatives.push(Predicate::all(branch));
        }
        equal_prefix.push(Predicate::equals(key.field, value));
    }
    alternatives.push(Predicate::all(equal_prefix));
    Predicate::any(alternatives)
}

fn strictly_after(key: &OrderKey, value: &Value) -> Option<Predicate> {
    if value.is_null() {
        return match key.nulls {
            NullsOrder::First => Some(Predicate::IsNull {
                field: key.field,
                negated: true,
            }),
            NullsOrder::Last => None,
        };
    }
    let op = match key.direction {
        SortOrder::Asc => CompareOp::Gt,
        SortOrder::Desc => CompareOp::Lt,
    };
    let beyond = Predicate::compare(key.field, op, value.clone());
    Some(match key.nulls {
        NullsOrder::Last => Predicate::any([
            beyond,
            Predicate::IsNull {
                field: key.field,
                negated: false,
            },
        ]),
        NullsOrder::First => beyond,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_or_after_single_key() {
        let order = [OrderKey::ascending(0)];
        let cursor = vec![Value::from("b")];
        let predicate = at_or_after(&order, &cursor);
        let rows = [
            vec![Value::from("a")],
            vec![Value::from("b")],
            vec![Value::from("c")],
        ];
        let kept: Vec<bool> = rows
            .iter()
            .map(|r| matches(&predicate, r, &NoRelations))
            .collect();
        assert_eq!(kept, vec![false, true, true]);
    }

    #[test]
    fn test_at_or_after_with_null_cursor_value() {
        // order: score desc (nulls first), id asc
        let order = [
            OrderKey {
                field: 0,
                direction: SortOrder::Desc,
                nulls: NullsOrder::First,
            },
            OrderKey::ascending(1),
        ];
        let cursor = vec![Value::Null, Value::from("k2")];
        let predicate = at_or_after(&order, &cursor);
        let rows = [
            vec![Value::Null, Value::from("k1")],
            vec![Value::Null, Value::from("k2")],
            vec![Value::Null, Value::from("k3")],
            vec![Value::Int(5), Value::from("k0")],
        ];
        let kept: Vec<bool> = rows
            .iter()
            .map(|r| matches(&predicate, r, &NoRelations))
            .collect();
        assert_eq!(kept, vec![false, true, true, true]);
    }

    #[test]
    fn test_at_or_after_nulls_last() {
        let order = [OrderKey::ascending(0), OrderKey::ascending(1)];
        let cursor = vec![Value::Int(3), Value::from("b")];
        let predicate = at_or_after(&order, &cursor);
        let rows = [
            vec![Value::Int(2), Value::from("z")],
            vec![Value::Int(3), Value::from("a")],
            vec![Value::Int(3), Value::from("b")],
            vec![Value::Int(4), Value::from("a")],
            vec![Value::Null, Value::from("a")],
        ];
        let kept: Vec<bool> = rows
            .iter()
            .map(|r| matches(&predicate, r, &NoRelations))
            .collect();
        assert_eq!(kept, vec![false, false, true, true, true]);
    }

    #[test]
    fn test_paginate_negative_take() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(paginate(items.clone(), 0, Some(-2)), vec![4, 5]);
        assert_eq!(paginate(items.clone(), 1, Some(-2)), vec![3, 4]);
        assert_eq!(paginate(items.clone(), 1, Some(2)), vec![2, 3]);
        assert_eq!(paginate(items, 4, None), vec![5]);
    }

    #[test]
    fn test_negative_skip_is_rejected() {
        assert!(matches!(
            non_negative_skip(Some(-1)),
            Err(StoreError::Validation(_))
        ));
        assert_eq!(non_negative_skip(None).unwrap(), 0);
    }

    #[test]
    fn test_next_timestamp_strictly_increases() {
        let stamps: Vec<DateTime<Utc>> = (0..1000).map(|_| next_timestamp()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(stamps.iter().all(|stamp| stamp.timestamp_subsec_nanos() % 1000 == 0));
    }
}
