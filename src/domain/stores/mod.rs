pub mod backend;
pub mod connection;
pub mod engine;
pub mod error;
pub mod store;

pub use backend::{Backend, IsolationLevel, TransactionOptions, UnitOfWork};
pub use connection::{Assignment, Connection, SelectQuery};
pub use engine::Tx;
pub use error::{ConstraintKind, StoreError, StoreResult};
pub use store::{EntityStore, Store};
