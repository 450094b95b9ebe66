pub mod auth_models;
pub mod ingest_models;

pub use auth_models::*;
pub use ingest_models::*;

use diesel::prelude::*;
use diesel::sql_types::BigInt;

/// Result row of a `SELECT COUNT(*) AS count` statement.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub struct CountModel {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}
