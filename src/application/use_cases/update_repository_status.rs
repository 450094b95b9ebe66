use std::sync::Arc;
use thiserror::Error;

use crate::application::services::IngestionService;
use crate::domain::entities::Repository;
use crate::domain::stores::StoreError;
use crate::domain::value_objects::RepositoryStatus;

#[derive(Debug, Error)]
pub enum UpdateRepositoryStatusError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for UpdateRepositoryStatusError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { detail, .. } => UpdateRepositoryStatusError::RepositoryNotFound(detail),
            StoreError::Validation(message) => UpdateRepositoryStatusError::InvalidTransition(message),
            other => UpdateRepositoryStatusError::Store(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateRepositoryStatusRequest {
    pub repository_id: String,
    pub status: RepositoryStatus,
    pub message: Option<String>,
    /// Stored when the repository reaches SUCCESS.
    pub overview: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateRepositoryStatusResponse {
    pub repository: Repository,
}

pub struct UpdateRepositoryStatusUseCase {
    ingestion: Arc<IngestionService>,
}

impl UpdateRepositoryStatusUseCase {
    pub fn new(ingestion: Arc<IngestionService>) -> Self {
        Self { ingestion }
    }

    pub async fn execute(
        &self,
        request: UpdateRepositoryStatusRequest,
    ) -> Result<UpdateRepositoryStatusResponse, UpdateRepositoryStatusError> {
        let id = request.repository_id.as_str();
        let repository = match request.status {
            RepositoryStatus::Processing => self.ingestion.start(id).await?,
            RepositoryStatus::Success => self.ingestion.complete(id, request.overview).await?,
            RepositoryStatus::Failed => {
                let message = request
                    .message
                    .unwrap_or_else(|| "ingestion failed".to_string());
                self.ingestion.fail(id, &message).await?
            }
            RepositoryStatus::Pending => {
                self.ingestion
                    .set_status(id, RepositoryStatus::Pending, request.message)
                    .await?
            }
        };

        Ok(UpdateRepositoryStatusResponse { repository })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CreateRepository, CreateUser};
    use crate::domain::stores::{Store, TransactionOptions};
    use crate::infrastructure::memory::MemoryBackend;

    async fn setup() -> (UpdateRepositoryStatusUseCase, Repository) {
        let store = Store::new(Arc::new(MemoryBackend::new()), TransactionOptions::default());
        let user = store
            .users()
            .create(CreateUser {
                email: "ada@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let ingestion = Arc::new(IngestionService::new(store));
        let repository = ingestion
            .register_repository(CreateRepository {
                name: "engine".to_string(),
                user_id: user.id,
                ..Default::default()
            })
            .await
            .unwrap();
        (UpdateRepositoryStatusUseCase::new(ingestion), repository)
    }

    fn request(repository: &Repository, status: RepositoryStatus) -> UpdateRepositoryStatusRequest {
        UpdateRepositoryStatusRequest {
            repository_id: repository.id.clone(),
            status,
            message: None,
            overview: Some("overview".to_string()),
        }
    }

    #[tokio::test]
    async fn test_status_walk() {
        let (use_case, repository) = setup().await;

        let processing = use_case
            .execute(request(&repository, RepositoryStatus::Processing))
            .await
            .unwrap();
        assert_eq!(processing.repository.status, RepositoryStatus::Processing);

        let done = use_case
            .execute(request(&repository, RepositoryStatus::Success))
            .await
            .unwrap();
        assert_eq!(done.repository.overview.as_deref(), Some("overview"));

        assert!(matches!(
            use_case
                .execute(request(&repository, RepositoryStatus::Pending))
                .await,
            Err(UpdateRepositoryStatusError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_repository() {
        let (use_case, mut repository) = setup().await;
        repository.id = "missing".to_string();
        assert!(matches!(
            use_case
                .execute(request(&repository, RepositoryStatus::Failed))
                .await,
            Err(UpdateRepositoryStatusError::RepositoryNotFound(_))
        ));
    }
}
