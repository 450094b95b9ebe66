use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::query_dsl::LoadQuery;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::domain::query::Predicate;
use crate::domain::schema::{ModelDescriptor, ModelId, Row, UniqueDescriptor};
use crate::domain::stores::{Assignment, Connection, SelectQuery, StoreError, StoreResult};
use crate::infrastructure::database::models::{
    AccountModel, CountModel, DirectoryModel, FileModel, LogModel, RepositoryModel, SessionModel,
    UserModel, VerificationTokenModel,
};
use crate::infrastructure::database::sql::{self, Statement};

/// A `Connection` over one Postgres connection with an open transaction.
pub struct PgSession<'a> {
    conn: &'a mut PgConnection,
    started: Instant,
    timeout: Duration,
}

impl<'a> PgSession<'a> {
    pub fn new(conn: &'a mut PgConnection, started: Instant, timeout: Duration) -> Self {
        Self {
            conn,
            started,
            timeout,
        }
    }

    pub fn check_deadline(&self) -> StoreResult<()> {
        let elapsed = self.started.elapsed();
        if elapsed > self.timeout {
            return Err(StoreError::Transaction(format!(
                "transaction ran for {:?}, longer than its {:?} timeout",
                elapsed, self.timeout
            )));
        }
        Ok(())
    }

    fn load(&mut self, model: &'static ModelDescriptor, statement: Statement) -> StoreResult<Vec<Row>> {
        self.check_deadline()?;
        debug!("{}", statement.sql);
        let query = statement.into_query();
        match model.id {
            ModelId::User => load_as::<UserModel>(self.conn, query),
            ModelId::Account => load_as::<AccountModel>(self.conn, query),
            ModelId::Session => load_as::<SessionModel>(self.conn, query),
            ModelId::VerificationToken => load_as::<VerificationTokenModel>(self.conn, query),
            ModelId::Repository => load_as::<RepositoryModel>(self.conn, query),
            ModelId::Directory => load_as::<DirectoryModel>(self.conn, query),
            ModelId::File => load_as::<FileModel>(self.conn, query),
            ModelId::Log => load_as::<LogModel>(self.conn, query),
        }
    }
}

fn load_as<M>(conn: &mut PgConnection, query: BoxedSqlQuery<'static, Pg, SqlQuery>) -> StoreResult<Vec<Row>>
where
    M: Into<Row>,
    BoxedSqlQuery<'static, Pg, SqlQuery>: LoadQuery<'static, PgConnection, M>,
{
    let records: Vec<M> = query.load::<M>(conn)?;
    Ok(records.into_iter().map(Into::into).collect())
}

impl Connection for PgSession<'_> {
    fn select(&mut self, model: &'static ModelDescriptor, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        let statement = sql::select(model, query)?;
        self.load(model, statement)
    }

    fn count(&mut self, model: &'static ModelDescriptor, predicate: &Predicate) -> StoreResult<i64> {
        self.check_deadline()?;
        let statement = sql::count(model, predicate)?;
        debug!("{}", statement.sql);
        let result: CountModel = statement.into_query().get_result(self.conn)?;
        Ok(result.count)
    }

    fn insert(
        &mut self,
        model: &'static ModelDescriptor,
        row: Row,
        skip_duplicates: bool,
    ) -> StoreResult<Option<Row>> {
        let statement = sql::insert(model, &row, skip_duplicates)?;
        Ok(self.load(model, statement)?.into_iter().next())
    }

    fn update(
        &mut self,
        model: &'static ModelDescriptor,
        predicate: &Predicate,
        assignments: &[Assignment],
    ) -> StoreResult<Vec<Row>> {
        let statement = sql::update(model, predicate, assignments)?;
        self.load(model, statement)
    }

    fn delete(&mut self, model: &'static ModelDescriptor, predicate: &Predicate) -> StoreResult<Vec<Row>> {
        let statement = sql::delete(model, predicate)?;
        self.load(model, statement)
    }

    fn upsert(
        &mut self,
        model: &'static ModelDescriptor,
        conflict: &'static UniqueDescriptor,
        row: Row,
        assignments: &[Assignment],
    ) -> StoreResult<Row> {
        let statement = sql::upsert(model, conflict, &row, assignments)?;
        self.load(model, statement)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Unknown(format!("upsert into {} returned no row", model.name)))
    }

    fn execute_raw(&mut self, sql: &str) -> StoreResult<usize> {
        self.check_deadline()?;
        debug!("raw: {}", sql);
        Ok(diesel::sql_query(sql).execute(self.conn)?)
    }
}
