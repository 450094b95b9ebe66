//! In-memory implementation of the store contract, used by the test suite
//! and when `STORE_BACKEND=memory`.

pub mod backend;
pub mod tables;


pub use backend::MemoryBackend;
pub use tables::Tables;
