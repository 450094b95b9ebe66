pub mod container;
pub mod database;
pub mod memory;

pub use container::AppContainer;
pub use database::PostgresBackend;
pub use memory::MemoryBackend;
