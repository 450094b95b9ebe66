use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::entities::{Account, Directory, File, Log, Repository, Session, User, VerificationToken};
use crate::domain::query::{AggregateArgs, AggregateResult, Filter, FindManyArgs, Group, GroupByArgs, Projection};
use crate::domain::schema::{Entity, Relation};
use crate::domain::stores::{Backend, Connection, StoreError, StoreResult, TransactionOptions, Tx, UnitOfWork};

/// Handle on a storage backend. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
    defaults: TransactionOptions,
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>, defaults: TransactionOptions) -> Self {
        Self { backend, defaults }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn defaults(&self) -> TransactionOptions {
        self.defaults
    }

    /// Runs `work` in one transaction: it commits if `work` returns `Ok` and
    /// rolls back otherwise.
    pub async fn transaction<T, F>(&self, options: TransactionOptions, work: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tx<'_>) -> StoreResult<T> + Send + 'static,
    {
        let unit: UnitOfWork = Box::new(move |conn: &mut dyn Connection| {
            let mut tx = Tx::new(conn);
            work(&mut tx).map(|value| Box::new(value) as Box<dyn Any + Send>)
        });
        let result = self.backend.transaction(options, unit).await?;
        result
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| StoreError::Unknown("transaction returned an unexpected type".to_string()))
    }

    /// `transaction` with the store's default options.
    pub async fn run<T, F>(&self, work: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tx<'_>) -> StoreResult<T> + Send + 'static,
    {
        self.transaction(self.defaults, work).await
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.backend.ping().await
    }

    /// Runs a raw SQL statement and returns the number of affected rows.
    pub async fn execute_raw(&self, sql: impl Into<String>) -> StoreResult<usize> {
        if !self.backend.supports_raw_sql() {
            return Err(StoreError::validation(format!(
                "the {} backend cannot execute raw SQL",
                self.backend.name()
            )));
        }
        let sql = sql.into();
        self.run(move |tx| tx.execute_raw(&sql)).await
    }

    pub fn entity<E: Entity>(&self) -> EntityStore<E> {
        EntityStore {
            store: self.clone(),
            _marker: PhantomData,
        }
    }

    pub fn users(&self) -> EntityStore<User> {
        self.entity()
    }

    pub fn accounts(&self) -> EntityStore<Account> {
        self.entity()
    }

    pub fn sessions(&self) -> EntityStore<Session> {
        self.entity()
    }

    pub fn verification_tokens(&self) -> EntityStore<VerificationToken> {
        self.entity()
    }

    pub fn repositories(&self) -> EntityStore<Repository> {
        self.entity()
    }

    pub fn directories(&self) -> EntityStore<Directory> {
        self.entity()
    }

    pub fn files(&self) -> EntityStore<File> {
        self.entity()
    }

    pub fn logs(&self) -> EntityStore<Log> {
        self.entity()
    }
}

/// Per-entity accessor. Every call runs in its own transaction.
pub struct EntityStore<E> {
    store: Store,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub async fn find_unique(&self, key: E::Unique) -> StoreResult<Option<E>> {
        self.store.run(move |tx| tx.find_unique::<E>(&key)).await
    }

    pub async fn find_unique_or_throw(&self, key: E::Unique) -> StoreResult<E> {
        self.store.run(move |tx| tx.find_unique_or_throw::<E>(&key)).await
    }

    pub async fn find_first(&self, args: FindManyArgs<E>) -> StoreResult<Option<E>> {
        self.store.run(move |tx| tx.find_first(args)).await
    }

    pub async fn find_first_or_throw(&self, args: FindManyArgs<E>) -> StoreResult<E> {
        self.store.run(move |tx| tx.find_first_or_throw(args)).await
    }

    pub async fn find_many(&self, args: FindManyArgs<E>) -> StoreResult<Vec<E>> {
        self.store.run(move |tx| tx.find_many(args)).await
    }

    pub async fn find_many_projected(
        &self,
        args: FindManyArgs<E>,
        projection: Projection<E>,
    ) -> StoreResult<Vec<serde_json::Value>> {
        self.store
            .run(move |tx| tx.find_many_projected(args, projection))
            .await
    }

    pub async fn create(&self, data: E::Create) -> StoreResult<E> {
        self.store.run(move |tx| tx.create::<E>(data)).await
    }

    pub async fn create_many(&self, data: Vec<E::Create>, skip_duplicates: bool) -> StoreResult<i64> {
        self.store
            .run(move |tx| tx.create_many::<E>(data, skip_duplicates))
            .await
    }

    pub async fn update(&self, key: E::Unique, data: E::Update) -> StoreResult<E> {
        self.store.run(move |tx| tx.update::<E>(&key, data)).await
    }

    pub async fn update_many(&self, filter: Option<Filter<E>>, data: E::Update) -> StoreResult<i64> {
        self.store.run(move |tx| tx.update_many(filter, data)).await
    }

    pub async fn upsert(&self, key: E::Unique, create: E::Create, update: E::Update) -> StoreResult<E> {
        self.store
            .run(move |tx| tx.upsert::<E>(&key, create, update))
            .await
    }

    pub async fn delete(&self, key: E::Unique) -> StoreResult<E> {
        self.store.run(move |tx| tx.delete::<E>(&key)).await
    }

    pub async fn delete_many(&self, filter: Option<Filter<E>>) -> StoreResult<i64> {
        self.store.run(move |tx| tx.delete_many(filter)).await
    }

    pub async fn count(&self, filter: Option<Filter<E>>) -> StoreResult<i64> {
        self.store.run(move |tx| tx.count(filter)).await
    }

    pub async fn aggregate(&self, args: AggregateArgs<E>) -> StoreResult<AggregateResult> {
        self.store.run(move |tx| tx.aggregate(args)).await
    }

    pub async fn group_by(&self, args: GroupByArgs<E>) -> StoreResult<Vec<Group>> {
        self.store.run(move |tx| tx.group_by(args)).await
    }

    pub async fn related_one<T: Entity>(&self, entity: E, relation: Relation<E, T>) -> StoreResult<Option<T>> {
        self.store
            .run(move |tx| tx.related_one(&entity, relation))
            .await
    }

    pub async fn related_many<T: Entity>(
        &self,
        entity: E,
        relation: Relation<E, T>,
        args: FindManyArgs<T>,
    ) -> StoreResult<Vec<T>> {
        self.store
            .run(move |tx| tx.related_many(&entity, relation, args))
            .await
    }
}
