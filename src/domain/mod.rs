pub mod entities;
pub mod query;
pub mod schema;
pub mod stores;
pub mod value_objects;
