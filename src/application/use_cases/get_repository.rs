use thiserror::Error;

use crate::domain::entities::{
    Directory, DirectoryField, File, FileField, Repository, RepositoryUnique,
};
use crate::domain::query::Filter;
use crate::domain::stores::{Store, StoreError};

#[derive(Debug, Error)]
pub enum GetRepositoryError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct GetRepositoryRequest {
    pub repository_id: String,
}

#[derive(Debug, Clone)]
pub struct GetRepositoryResponse {
    pub repository: Repository,
    pub file_count: i64,
    pub directory_count: i64,
}

pub struct GetRepositoryUseCase {
    store: Store,
}

impl GetRepositoryUseCase {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        request: GetRepositoryRequest,
    ) -> Result<GetRepositoryResponse, GetRepositoryError> {
        let key = RepositoryUnique::Id(request.repository_id.clone());
        let found = self
            .store
            .run(move |tx| {
                let Some(repository) = tx.find_unique::<Repository>(&key)? else {
                    return Ok(None);
                };
                let file_count = tx.count(Some(Filter::<File>::equals(
                    FileField::RepositoryId,
                    repository.id.as_str(),
                )))?;
                let directory_count = tx.count(Some(Filter::<Directory>::equals(
                    DirectoryField::RepositoryId,
                    repository.id.as_str(),
                )))?;
                Ok(Some(GetRepositoryResponse {
                    repository,
                    file_count,
                    directory_count,
                }))
            })
            .await?;

        found.ok_or(GetRepositoryError::RepositoryNotFound(request.repository_id))
    }
}
