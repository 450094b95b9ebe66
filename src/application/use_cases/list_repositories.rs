use thiserror::Error;

use crate::domain::entities::{Repository, RepositoryField};
use crate::domain::query::{Filter, FindManyArgs, OrderBy};
use crate::domain::stores::{Store, StoreError};
use crate::domain::value_objects::RepositoryStatus;

#[derive(Debug, Error)]
pub enum ListRepositoriesError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct ListRepositoriesRequest {
    pub user_id: Option<String>,
    pub status: Option<RepositoryStatus>,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ListRepositoriesResponse {
    pub repositories: Vec<Repository>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

pub struct ListRepositoriesUseCase {
    store: Store,
}

impl ListRepositoriesUseCase {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn execute(
        &self,
        request: ListRepositoriesRequest,
    ) -> Result<ListRepositoriesResponse, ListRepositoriesError> {
        if request.skip < 0 {
            return Err(ListRepositoriesError::ValidationError(
                "Skip cannot be negative".to_string(),
            ));
        }

        if request.limit <= 0 || request.limit > 1000 {
            return Err(ListRepositoriesError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let mut filter = Filter::<Repository>::all();
        if let Some(user_id) = &request.user_id {
            filter = filter.and(Filter::equals(RepositoryField::UserId, user_id.as_str()));
        }
        if let Some(status) = request.status {
            filter = filter.and(Filter::equals(RepositoryField::Status, status));
        }

        let (skip, limit) = (request.skip, request.limit);
        let (repositories, total_count) = self
            .store
            .run(move |tx| {
                let repositories = tx.find_many::<Repository>(
                    FindManyArgs::new()
                        .filter(filter.clone())
                        .order_by(OrderBy::desc(RepositoryField::CreatedAt))
                        .skip(skip)
                        .take(limit),
                )?;
                let total_count = tx.count(Some(filter))?;
                Ok((repositories, total_count))
            })
            .await?;

        Ok(ListRepositoriesResponse {
            repositories,
            total_count,
            skip: request.skip,
            limit: request.limit,
        })
    }
}
