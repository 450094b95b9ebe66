pub mod delete_repository;
pub mod get_file;
pub mod get_repository;
pub mod get_repository_tree;
pub mod list_repositories;
pub mod list_repository_files;
pub mod list_repository_logs;
pub mod register_repository;
pub mod update_repository_status;

pub use delete_repository::DeleteRepositoryUseCase;
pub use get_file::GetFileUseCase;
pub use get_repository::GetRepositoryUseCase;
pub use get_repository_tree::GetRepositoryTreeUseCase;
pub use list_repositories::ListRepositoriesUseCase;
pub use list_repository_files::ListRepositoryFilesUseCase;
pub use list_repository_logs::ListRepositoryLogsUseCase;
pub use register_repository::RegisterRepositoryUseCase;
pub use update_repository_status::UpdateRepositoryStatusUseCase;
