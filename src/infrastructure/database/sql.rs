//! Renders row-level operations as Postgres statements.
//!
//! Values always travel as positional binds (`$1`, `$2`, ...); only
//! identifiers from the static model descriptors are spliced into the text.
//! Text columns are declared with the "C" collation so results match the byte
//! order used by the in-memory backend. Ordering and range comparisons repeat
//! the collation explicitly; equality relies on the column's own.

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{Integer, Nullable, Text, Timestamptz};

use crate::domain::query::{CompareOp, NullsOrder, OrderKey, Predicate, Quantifier, SortOrder};
use crate::domain::schema::{FieldKind, ModelDescriptor, Row, UniqueDescriptor, Value};
use crate::domain::stores::{Assignment, SelectQuery, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Text(Option<String>),
    Int(Option<i32>),
    DateTime(Option<DateTime<Utc>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Bind>,
}

impl Statement {
    pub fn into_query(self) -> BoxedSqlQuery<'static, Pg, SqlQuery> {
        let mut query = diesel::sql_query(self.sql).into_boxed::<Pg>();
        for bind in self.binds {
            query = match bind {
                Bind::Text(value) => query.bind::<Nullable<Text>, _>(value),
                Bind::Int(value) => query.bind::<Nullable<Integer>, _>(value),
                Bind::DateTime(value) => query.bind::<Nullable<Timestamptz>, _>(value),
            };
        }
        query
    }
}

pub fn select(model: &'static ModelDescriptor, query: &SelectQuery) -> StoreResult<Statement> {
    let mut b = Builder::new();
    let alias = b.alias();
    b.push(&format!(
        "SELECT {alias}.* FROM {} AS {alias} WHERE ",
        quote(model.table)
    ));
    b.predicate(model, &alias, &query.predicate)?;
    b.order_by(model, &alias, &query.order);
    if let Some(limit) = query.limit {
        b.push(&format!(" LIMIT {}", limit));
    }
    if query.offset > 0 {
        b.push(&format!(" OFFSET {}", query.offset));
    }
    Ok(b.finish())
}

pub fn count(model: &'static ModelDescriptor, predicate: &Predicate) -> StoreResult<Statement> {
    let mut b = Builder::new();
    let alias = b.alias();
    b.push(&format!(
        "SELECT COUNT(*) AS count FROM {} AS {alias} WHERE ",
        quote(model.table)
    ));
    b.predicate(model, &alias, predicate)?;
    Ok(b.finish())
}

pub fn insert(model: &'static ModelDescriptor, row: &Row, skip_duplicates: bool) -> StoreResult<Statement> {
    let mut b = Builder::new();
    let alias = b.alias();
    b.insert_values(model, &alias, row)?;
    if skip_duplicates {
        b.push(" ON CONFLICT DO NOTHING");
    }
    b.push(&format!(" RETURNING {alias}.*"));
    Ok(b.finish())
}

pub fn update(
    model: &'static ModelDescriptor,
    predicate: &Predicate,
    assignments: &[Assignment],
) -> StoreResult<Statement> {
    if assignments.is_empty() {
        return Err(StoreError::Unknown(format!(
            "update of {} without assignments",
            model.name
        )));
    }
    let mut b = Builder::new();
    let alias = b.alias();
    b.push(&format!("UPDATE {} AS {alias} SET ", quote(model.table)));
    b.assignments(model, assignments)?;
    b.push(" WHERE ");
    b.predicate(model, &alias, predicate)?;
    b.push(&format!(" RETURNING {alias}.*"));
    Ok(b.finish())
}

pub fn delete(model: &'static ModelDescriptor, predicate: &Predicate) -> StoreResult<Statement> {
    let mut b = Builder::new();
    let alias = b.alias();
    b.push(&format!("DELETE FROM {} AS {alias} WHERE ", quote(model.table)));
    b.predicate(model, &alias, predicate)?;
    b.push(&format!(" RETURNING {alias}.*"));
    Ok(b.finish())
}

pub fn upsert(
    model: &'static ModelDescriptor,
    conflict: &'static UniqueDescriptor,
    row: &Row,
    assignments: &[Assignment],
) -> StoreResult<Statement> {
    let mut b = Builder::new();
    let alias = b.alias();
    b.insert_values(model, &alias, row)?;
    let target: Vec<String> = conflict
        .fields
        .iter()
        .map(|f| quote(model.field(*f).column))
        .collect();
    b.push(&format!(" ON CONFLICT ({}) DO UPDATE SET ", target.join(", ")));
    if assignments.is_empty() {
        // DO NOTHING would not return the existing row.
        let first = quote(model.field(conflict.fields[0]).column);
        b.push(&format!("{first} = EXCLUDED.{first}"));
    } else {
        b.assignments(model, assignments)?;
    }
    b.push(&format!(" RETURNING {alias}.*"));
    Ok(b.finish())
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `LIKE` pattern for `op`, with the wildcard characters in `needle` escaped.
fn like_pattern(op: CompareOp, needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    match op {
        CompareOp::StartsWith => format!("{}%", escaped),
        CompareOp::EndsWith => format!("%{}", escaped),
        _ => format!("%{}%", escaped),
    }
}

fn to_bind(kind: FieldKind, value: &Value) -> StoreResult<Bind> {
    match (kind, value) {
        (FieldKind::Text | FieldKind::Enum(_), Value::Text(s)) => Ok(Bind::Text(Some(s.clone()))),
        (FieldKind::Text | FieldKind::Enum(_), Value::Null) => Ok(Bind::Text(None)),
        (FieldKind::Int, Value::Int(v)) => i32::try_from(*v)
            .map(|v| Bind::Int(Some(v)))
            .map_err(|_| StoreError::validation(format!("{} does not fit in a 32-bit integer", v))),
        (FieldKind::Int, Value::Null) => Ok(Bind::Int(None)),
        (FieldKind::DateTime, Value::DateTime(dt)) => Ok(Bind::DateTime(Some(*dt))),
        (FieldKind::DateTime, Value::Null) => Ok(Bind::DateTime(None)),
        (kind, value) => Err(StoreError::validation(format!(
            "cannot bind {} to a {} column",
            value.kind_name(),
            kind.describe()
        ))),
    }
}

struct Builder {
    sql: String,
    binds: Vec<Bind>,
    aliases: usize,
}

impl Builder {
    fn new() -> Self {
        Self {
            sql: String::new(),
            binds: Vec::new(),
            aliases: 0,
        }
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            binds: self.binds,
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn alias(&mut self) -> String {
        let alias = format!("t{}", self.aliases);
        self.aliases += 1;
        alias
    }

    fn bind(&mut self, bind: Bind) {
        self.binds.push(bind);
        let placeholder = format!("${}", self.binds.len());
        self.push(&placeholder);
    }

    fn bind_value(&mut self, kind: FieldKind, value: &Value) -> StoreResult<()> {
        let bind = to_bind(kind, value)?;
        self.bind(bind);
        Ok(())
    }

    fn insert_values(&mut self, model: &'static ModelDescriptor, alias: &str, row: &Row) -> StoreResult<()> {
        let columns: Vec<String> = model.fields.iter().map(|f| quote(f.column)).collect();
        self.push(&format!(
            "INSERT INTO {} AS {alias} ({}) VALUES (",
            quote(model.table),
            columns.join(", ")
        ));
        for (index, field) in model.fields.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            let value = row.get(index).unwrap_or(&Value::Null);
            self.bind_value(field.kind, value)?;
        }
        self.push(")");
        Ok(())
    }

    fn assignments(&mut self, model: &'static ModelDescriptor, assignments: &[Assignment]) -> StoreResult<()> {
        for (index, assignment) in assignments.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            let field = model.field(assignment.field);
            self.push(&format!("{} = ", quote(field.column)));
            self.bind_value(field.kind, &assignment.value)?;
        }
        Ok(())
    }

    fn order_by(&mut self, model: &'static ModelDescriptor, alias: &str, order: &[OrderKey]) {
        if order.is_empty() {
            return;
        }
        let keys: Vec<String> = order
            .iter()
            .map(|key| {
                let field = model.field(key.field);
                let collate = if field.kind.is_textual() { " COLLATE \"C\"" } else { "" };
                let direction = match key.direction {
                    SortOrder::Asc => "ASC",
                    SortOrder::Desc => "DESC",
                };
                let nulls = match key.nulls {
                    NullsOrder::First => "NULLS FIRST",
                    NullsOrder::Last => "NULLS LAST",
                };
                format!("{alias}.{}{collate} {direction} {nulls}", quote(field.column))
            })
            .collect();
        self.push(&format!(" ORDER BY {}", keys.join(", ")));
    }

    fn predicate(&mut self, model: &'static ModelDescriptor, alias: &str, predicate: &Predicate) -> StoreResult<()> {
        match predicate {
            Predicate::And(parts) => self.junction(model, alias, parts, " AND ", "TRUE"),
            Predicate::Or(parts) => self.junction(model, alias, parts, " OR ", "FALSE"),
            Predicate::Not(inner) => {
                self.push("(NOT ");
                self.predicate(model, alias, inner)?;
                self.push(")");
                Ok(())
            }
            Predicate::Compare {
                field,
                op,
                value,
                insensitive,
            } => self.compare(model, alias, *field, *op, value, *insensitive),
            Predicate::In {
                field,
                values,
                negated,
            } => {
                if values.is_empty() {
                    self.push(if *negated { "TRUE" } else { "FALSE" });
                    return Ok(());
                }
                let descriptor = model.field(*field);
                self.push(&format!(
                    "{alias}.{} {}IN (",
                    quote(descriptor.column),
                    if *negated { "NOT " } else { "" }
                ));
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.bind_value(descriptor.kind, value)?;
                }
                self.push(")");
                Ok(())
            }
            Predicate::IsNull { field, negated } => {
                self.push(&format!(
                    "{alias}.{} IS {}NULL",
                    quote(model.field(*field).column),
                    if *negated { "NOT " } else { "" }
                ));
                Ok(())
            }
            Predicate::Relation {
                relation,
                quantifier,
                predicate,
            } => {
                let target = relation.target.descriptor();
                let inner = self.alias();
                self.push(&format!(
                    "{}EXISTS (SELECT 1 FROM {} AS {inner} WHERE {inner}.{} = {alias}.{} AND ",
                    if *quantifier == Quantifier::Some { "" } else { "NOT " },
                    quote(target.table),
                    quote(target.field(relation.remote).column),
                    quote(model.field(relation.local).column),
                ));
                if *quantifier == Quantifier::Every {
                    self.push("NOT COALESCE(");
                    self.predicate(target, &inner, predicate)?;
                    self.push(", FALSE)");
                } else {
                    self.push("(");
                    self.predicate(target, &inner, predicate)?;
                    self.push(")");
                }
                self.push(")");
                Ok(())
            }
        }
    }

    fn junction(
        &mut self,
        model: &'static ModelDescriptor,
        alias: &str,
        parts: &[Predicate],
        separator: &str,
        empty: &str,
    ) -> StoreResult<()> {
        if parts.is_empty() {
            self.push(empty);
            return Ok(());
        }
        self.push("(");
        for (index, part) in parts.iter().enumerate() {
            if index > 0 {
                self.push(separator);
            }
            self.predicate(model, alias, part)?;
        }
        self.push(")");
        Ok(())
    }

    fn compare(
        &mut self,
        model: &'static ModelDescriptor,
        alias: &str,
        field: usize,
        op: CompareOp,
        value: &Value,
        insensitive: bool,
    ) -> StoreResult<()> {
        let descriptor = model.field(field);
        let column = format!("{alias}.{}", quote(descriptor.column));
        let column = if insensitive { format!("lower({})", column) } else { column };

        if op.is_pattern() {
            let needle = value.as_text().ok_or_else(|| {
                StoreError::validation(format!("{}: pattern must be text", descriptor.name))
            })?;
            self.push(&format!("{column} LIKE "));
            let pattern = Bind::Text(Some(like_pattern(op, needle)));
            if insensitive {
                self.push("lower(");
                self.bind(pattern);
                self.push(")");
            } else {
                self.bind(pattern);
            }
            self.push(" ESCAPE '\\'");
            return Ok(());
        }

        let operator = match op {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            _ => ">=",
        };
        // Equality needs no collation: the columns are declared "C".
        let ranged = !matches!(op, CompareOp::Eq | CompareOp::Ne);
        let collate = if ranged && descriptor.kind.is_textual() { " COLLATE \"C\"" } else { "" };
        self.push(&format!("{column}{collate} {operator} "));
        if insensitive {
            self.push("lower(");
            self.bind_value(descriptor.kind, value)?;
            self.push(")");
        } else {
            self.bind_value(descriptor.kind, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::directory::DIRECTORY_MODEL;
    use crate::domain::entities::file::FILE_MODEL;
    use crate::domain::entities::repository::REPOSITORY_MODEL;
    use crate::domain::entities::user::USER_MODEL;
    use crate::domain::entities::{
        Directory, DirectoryField, File, FileField, LogField, Repository, RepositoryField,
        RepositoryUnique, UserField,
    };
    use crate::domain::query::Filter;
    use crate::domain::schema::{ModelField, UniqueKey};

    #[test]
    fn test_select_with_order_and_pagination() {
        let query = SelectQuery {
            predicate: Predicate::equals(RepositoryField::UserId.index(), Value::from("u1")),
            order: vec![
                OrderKey::ascending(RepositoryField::Name.index()).reversed(),
                OrderKey::ascending(RepositoryField::Id.index()),
            ],
            offset: 20,
            limit: Some(10),
        };
        let statement = select(&REPOSITORY_MODEL, &query).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT t0.* FROM \"repositories\" AS t0 WHERE t0.\"user_id\" = $1 \
             ORDER BY t0.\"name\" COLLATE \"C\" DESC NULLS FIRST, t0.\"id\" COLLATE \"C\" ASC NULLS LAST \
             LIMIT 10 OFFSET 20"
        );
        assert_eq!(statement.binds, vec![Bind::Text(Some("u1".to_string()))]);
    }

    #[test]
    fn test_empty_junctions_and_lists() {
        let predicate = Predicate::all([
            Predicate::any(Vec::<Predicate>::new()),
            Predicate::In {
                field: UserField::Email.index(),
                values: Vec::new(),
                negated: true,
            },
        ]);
        let statement = count(&USER_MODEL, &predicate).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) AS count FROM \"users\" AS t0 WHERE (FALSE AND TRUE)"
        );
        assert!(statement.binds.is_empty());
    }

    #[test]
    fn test_case_insensitive_contains_escapes_wildcards() {
        let filter = Filter::<File>::contains(FileField::Name, "50%_off")
            .case_insensitive();
        let statement = count(&FILE_MODEL, &filter.into_predicate()).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) AS count FROM \"files\" AS t0 WHERE lower(t0.\"name\") LIKE lower($1) ESCAPE '\\'"
        );
        assert_eq!(statement.binds, vec![Bind::Text(Some("%50\\%\\_off%".to_string()))]);
    }

    #[test]
    fn test_relation_quantifiers_render_subqueries() {
        let filter = Filter::<Repository>::every(
            Repository::DIRECTORIES,
            Filter::<Directory>::is_not_null(DirectoryField::Summary),
        );
        let statement = count(&REPOSITORY_MODEL, &filter.into_predicate()).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) AS count FROM \"repositories\" AS t0 WHERE NOT EXISTS \
             (SELECT 1 FROM \"directories\" AS t1 WHERE t1.\"repository_id\" = t0.\"id\" \
             AND NOT COALESCE(t1.\"summary\" IS NOT NULL, FALSE))"
        );

        let filter = Filter::<Repository>::some(
            Repository::LOGS,
            Filter::equals(LogField::Status, "FAILED"),
        );
        let statement = count(&REPOSITORY_MODEL, &filter.into_predicate()).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) AS count FROM \"repositories\" AS t0 WHERE EXISTS \
             (SELECT 1 FROM \"logs\" AS t1 WHERE t1.\"repository_id\" = t0.\"id\" \
             AND (t1.\"status\" = $1))"
        );
    }

    #[test]
    fn test_update_numbers_binds_in_order() {
        let statement = update(
            &REPOSITORY_MODEL,
            &Predicate::equals(RepositoryField::Id.index(), Value::from("r1")),
            &[
                Assignment::new(RepositoryField::Status.index(), "PROCESSING"),
                Assignment::new(RepositoryField::GithubId.index(), 7),
            ],
        )
        .unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE \"repositories\" AS t0 SET \"status\" = $1, \"github_id\" = $2 \
             WHERE t0.\"id\" = $3 RETURNING t0.*"
        );
        assert_eq!(
            statement.binds,
            vec![
                Bind::Text(Some("PROCESSING".to_string())),
                Bind::Int(Some(7)),
                Bind::Text(Some("r1".to_string())),
            ]
        );
    }

    #[test]
    fn test_insert_skip_duplicates_and_nulls() {
        let row: Row = vec![
            Value::from("u1"),
            Value::Null,
            Value::from("a@example.com"),
            Value::Null,
            Value::Null,
            Value::DateTime(Utc::now()),
            Value::DateTime(Utc::now()),
        ];
        let statement = insert(&USER_MODEL, &row, true).unwrap();
        assert!(statement.sql.starts_with(
            "INSERT INTO \"users\" AS t0 (\"id\", \"name\", \"email\", \"email_verified\", \"image\", \"created_at\", \"updated_at\") VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ));
        assert!(statement.sql.ends_with(" ON CONFLICT DO NOTHING RETURNING t0.*"));
        assert_eq!(statement.binds[1], Bind::Text(None));
        assert_eq!(statement.binds[3], Bind::DateTime(None));
    }

    #[test]
    fn test_upsert_targets_the_key_columns() {
        let key = RepositoryUnique::Id("r1".to_string());
        let row: Row = vec![Value::Null; REPOSITORY_MODEL.fields.len()];
        let sql = upsert(&REPOSITORY_MODEL, key.constraint(), &row, &[]).unwrap().sql;
        assert!(sql.contains(" ON CONFLICT (\"id\") DO UPDATE SET \"id\" = EXCLUDED.\"id\" RETURNING t0.*"));
    }

    #[test]
    fn test_bind_rejects_mismatched_kind() {
        let predicate = Predicate::equals(RepositoryField::GithubId.index(), Value::from("seven"));
        assert!(matches!(
            count(&REPOSITORY_MODEL, &predicate),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_returns_rows() {
        let statement = delete(&DIRECTORY_MODEL, &Predicate::always()).unwrap();
        assert_eq!(
            statement.sql,
            "DELETE FROM \"directories\" AS t0 WHERE TRUE RETURNING t0.*"
        );
    }

    #[test]
    fn test_collation_only_on_ranges_and_ordering() {
        let predicate = Predicate::all([
            Predicate::equals(FileField::RepositoryId.index(), Value::from("r1")),
            Predicate::compare(FileField::Path.index(), CompareOp::Gt, Value::from("src/")),
        ]);
        let query = SelectQuery {
            predicate,
            order: vec![OrderKey::ascending(FileField::Path.index())],
            offset: 0,
            limit: None,
        };
        let statement = select(&FILE_MODEL, &query).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT t0.* FROM \"files\" AS t0 WHERE (t0.\"repository_id\" = $1 \
             AND t0.\"path\" COLLATE \"C\" > $2) ORDER BY t0.\"path\" COLLATE \"C\" ASC NULLS LAST"
        );
    }

    #[test]
    fn test_migration_declares_text_columns_with_c_collation() {
        let up = include_str!("../../../migrations/2025-01-01-000000_create_core_tables/up.sql");
        for line in up.lines().map(str::trim) {
            let is_text_column = line.split_whitespace().nth(1).is_some_and(|kind| {
                kind.starts_with("TEXT") || kind.starts_with("VARCHAR")
            });
            if is_text_column {
                assert!(line.contains("COLLATE \"C\""), "missing collation: {}", line);
            }
        }
        assert!(up.contains("id TEXT COLLATE \"C\" NOT NULL"));
    }
}
