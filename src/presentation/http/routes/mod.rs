pub mod file_routes;
pub mod health_routes;
pub mod repository_routes;

pub use file_routes::*;
pub use health_routes::*;
pub use repository_routes::*;
