use thiserror::Error;

use crate::domain::entities::{Log, LogField, Repository, RepositoryUnique};
use crate::domain::query::{FindManyArgs, OrderBy};
use crate::domain::stores::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ListRepositoryLogsError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ListRepositoryLogsRequest {
    pub repository_id: String,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ListRepositoryLogsResponse {
    pub logs: Vec<Log>,
    pub skip: i64,
    pub limit: i64,
}

pub struct ListRepositoryLogsUseCase {
    store: Store,
}

impl ListRepositoryLogsUseCase {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn execute(
        &self,
        request: ListRepositoryLogsRequest,
    ) -> Result<ListRepositoryLogsResponse, ListRepositoryLogsError> {
        if request.skip < 0 {
            return Err(ListRepositoryLogsError::ValidationError(
                "Skip cannot be negative".to_string(),
            ));
        }

        if request.limit <= 0 || request.limit > 1000 {
            return Err(ListRepositoryLogsError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let key = RepositoryUnique::Id(request.repository_id.clone());
        let (skip, limit) = (request.skip, request.limit);
        let logs = self
            .store
            .run(move |tx| {
                let Some(repository) = tx.find_unique::<Repository>(&key)? else {
                    return Ok(None);
                };
                let logs = tx.related_many(
                    &repository,
                    Repository::LOGS,
                    FindManyArgs::new()
                        .order_by(OrderBy::desc(LogField::CreatedAt))
                        .skip(skip)
                        .take(limit),
                )?;
                Ok(Some(logs))
            })
            .await?
            .ok_or(ListRepositoryLogsError::RepositoryNotFound(request.repository_id))?;

        Ok(ListRepositoryLogsResponse {
            logs,
            skip: request.skip,
            limit: request.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::application::services::IngestionService;
    use crate::domain::entities::{CreateRepository, CreateUser};
    use crate::domain::stores::TransactionOptions;
    use crate::infrastructure::memory::MemoryBackend;

    fn request(repository_id: &str) -> ListRepositoryLogsRequest {
        ListRepositoryLogsRequest {
            repository_id: repository_id.to_string(),
            skip: 0,
            limit: 20,
        }
    }

    #[tokio::test]
    async fn test_retry_trail_is_newest_first() {
        let store = Store::new(Arc::new(MemoryBackend::new()), TransactionOptions::default());
        let user = store
            .users()
            .create(CreateUser {
                email: "ada@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let ingestion = IngestionService::new(store.clone());
        let use_case = ListRepositoryLogsUseCase::new(store.clone());

        for run in 0..40 {
            let repository = ingestion
                .register_repository(CreateRepository {
                    name: format!("engine-{}", run),
                    owner: "octo".to_string(),
                    url: "https://github.com/octo/engine".to_string(),
                    user_id: user.id.clone(),
                    avatar_url: "https://avatars.example.com/octo.png".to_string(),
                    github_id: run,
                    ..Default::default()
                })
                .await
                .unwrap();
            ingestion.start(&repository.id).await.unwrap();
            ingestion.fail(&repository.id, "boom").await.unwrap();
            ingestion.start(&repository.id).await.unwrap();

            let response = use_case.execute(request(&repository.id)).await.unwrap();
            let messages: Vec<&str> = response.logs.iter().map(|log| log.message.as_str()).collect();
            assert_eq!(
                messages,
                vec![
                    "processing started",
                    "retry requested",
                    "boom",
                    "processing started",
                    "registered"
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_missing_repository_and_bad_paging() {
        let store = Store::new(Arc::new(MemoryBackend::new()), TransactionOptions::default());
        let use_case = ListRepositoryLogsUseCase::new(store);

        assert!(matches!(
            use_case.execute(request("missing")).await,
            Err(ListRepositoryLogsError::RepositoryNotFound(_))
        ));
        let mut bad = request("missing");
        bad.limit = 0;
        assert!(matches!(
            use_case.execute(bad).await,
            Err(ListRepositoryLogsError::ValidationError(_))
        ));
    }
}
