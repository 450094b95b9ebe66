pub mod repository_status;

pub use repository_status::RepositoryStatus;
