pub mod auth_adapter;
pub mod directory_tree;
pub mod ingestion;

pub use auth_adapter::{AuthAdapter, SessionAndUser};
pub use directory_tree::{DirectoryNode, DirectoryTreeService, RepositoryTree};
pub use ingestion::IngestionService;
