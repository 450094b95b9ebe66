use thiserror::Error;

use crate::domain::entities::{File, FileField, Repository, RepositoryUnique};
use crate::domain::query::{Filter, FindManyArgs, OrderBy};
use crate::domain::stores::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ListRepositoryFilesError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ListRepositoryFilesRequest {
    pub repository_id: String,
    /// Only files directly inside this directory.
    pub directory_id: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ListRepositoryFilesResponse {
    pub files: Vec<File>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

pub struct ListRepositoryFilesUseCase {
    store: Store,
}

impl ListRepositoryFilesUseCase {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        request: ListRepositoryFilesRequest,
    ) -> Result<ListRepositoryFilesResponse, ListRepositoryFilesError> {
        if request.skip < 0 {
            return Err(ListRepositoryFilesError::ValidationError(
                "Skip cannot be negative".to_string(),
            ));
        }

        if request.limit <= 0 || request.limit > 1000 {
            return Err(ListRepositoryFilesError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let repository_id = request.repository_id.clone();
        let directory_id = request.directory_id.clone();
        let (skip, limit) = (request.skip, request.limit);
        let listed = self
            .store
            .run(move |tx| {
                let key = RepositoryUnique::Id(repository_id.clone());
                if tx.find_unique::<Repository>(&key)?.is_none() {
                    return Ok(None);
                }
                let mut filter = Filter::<File>::equals(FileField::RepositoryId, repository_id);
                if let Some(directory_id) = directory_id {
                    filter = filter.and(Filter::equals(FileField::DirectoryId, directory_id));
                }
                let files = tx.find_many::<File>(
                    FindManyArgs::new()
                        .filter(filter.clone())
                        .order_by(OrderBy::asc(FileField::Path))
                        .skip(skip)
                        .take(limit),
                )?;
                let total_count = tx.count(Some(filter))?;
                Ok(Some((files, total_count)))
            })
            .await?;

        let (files, total_count) =
            listed.ok_or(ListRepositoryFilesError::RepositoryNotFound(request.repository_id))?;

        Ok(ListRepositoryFilesResponse {
            files,
            total_count,
            skip: request.skip,
            limit: request.limit,
        })
    }
}
