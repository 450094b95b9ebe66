use thiserror::Error;
use tracing::info;

use crate::domain::entities::{Repository, RepositoryUnique};
use crate::domain::stores::{Store, StoreError};

#[derive(Debug, Error)]
pub enum DeleteRepositoryError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),
    #[error(transparent)]
    Store(StoreError),
}

#[derive(Debug, Clone)]
pub struct DeleteRepositoryRequest {
    pub repository_id: String,
}

#[derive(Debug, Clone)]
pub struct DeleteRepositoryResponse {
    pub repository: Repository,
}

pub struct DeleteRepositoryUseCase {
    store: Store,
}

impl DeleteRepositoryUseCase {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Deletes the repository with its directories, files and logs.
    pub async fn execute(
        &self,
        request: DeleteRepositoryRequest,
    ) -> Result<DeleteRepositoryResponse, DeleteRepositoryError> {
        let repository = self
            .store
            .repositories()
            .delete(RepositoryUnique::Id(request.repository_id.clone()))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    DeleteRepositoryError::RepositoryNotFound(request.repository_id.clone())
                } else {
                    DeleteRepositoryError::Store(e)
                }
            })?;

        info!("Deleted repository {}", repository.id);
        Ok(DeleteRepositoryResponse { repository })
    }
}
