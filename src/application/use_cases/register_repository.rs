use regex::Regex;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use url::Url;

use crate::application::services::IngestionService;
use crate::domain::entities::{CreateRepository, Repository};
use crate::domain::stores::{ConstraintKind, StoreError};

#[derive(Debug, Error)]
pub enum RegisterRepositoryError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RegisterRepositoryError {
    fn from(error: StoreError) -> Self {
        match error.violated_constraint() {
            Some((ConstraintKind::ForeignKey, "repositories_user_id_fkey")) => {
                RegisterRepositoryError::UserNotFound(error.to_string())
            }
            _ => RegisterRepositoryError::Store(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterRepositoryRequest {
    pub name: String,
    pub owner: String,
    pub url: String,
    pub user_id: String,
    pub avatar_url: String,
    pub github_id: i32,
}

#[derive(Debug, Clone)]
pub struct RegisterRepositoryResponse {
    pub repository: Repository,
}

pub struct RegisterRepositoryUseCase {
    ingestion: Arc<IngestionService>,
}

impl RegisterRepositoryUseCase {
    pub fn new(ingestion: Arc<IngestionService>) -> Self {
        Self { ingestion }
    }

    pub async fn execute(
        &self,
        request: RegisterRepositoryRequest,
    ) -> Result<RegisterRepositoryResponse, RegisterRepositoryError> {
        if request.user_id.trim().is_empty() {
            return Err(RegisterRepositoryError::ValidationError(
                "user_id cannot be empty".to_string(),
            ));
        }
        check_github_name("owner", &request.owner)?;
        check_github_name("name", &request.name)?;
        check_http_url("url", &request.url)?;
        check_http_url("avatar_url", &request.avatar_url)?;

        let repository = self
            .ingestion
            .register_repository(CreateRepository {
                id: None,
                name: request.name,
                owner: request.owner,
                url: request.url,
                user_id: request.user_id,
                avatar_url: request.avatar_url,
                github_id: request.github_id,
                status: None,
                overview: None,
            })
            .await?;

        Ok(RegisterRepositoryResponse { repository })
    }
}

/// Owner and repository names as GitHub accepts them.
static GITHUB_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").ok());

fn check_github_name(field: &str, value: &str) -> Result<(), RegisterRepositoryError> {
    if GITHUB_NAME.as_ref().is_some_and(|re| re.is_match(value)) {
        Ok(())
    } else {
        Err(RegisterRepositoryError::ValidationError(format!(
            "{} must be a GitHub name, got {:?}",
            field, value
        )))
    }
}

fn check_http_url(field: &str, value: &str) -> Result<(), RegisterRepositoryError> {
    let parsed = Url::parse(value).map_err(|e| {
        RegisterRepositoryError::ValidationError(format!("{} is not a valid URL: {}", field, e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(RegisterRepositoryError::ValidationError(format!(
            "{} must use http or https, got {}",
            field, scheme
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::CreateUser;
    use crate::domain::stores::{Store, TransactionOptions};
    use crate::domain::value_objects::RepositoryStatus;
    use crate::infrastructure::memory::MemoryBackend;

    fn request(user_id: &str) -> RegisterRepositoryRequest {
        RegisterRepositoryRequest {
            name: "engine".to_string(),
            owner: "octo".to_string(),
            url: "https://github.com/octo/engine".to_string(),
            user_id: user_id.to_string(),
            avatar_url: "https://avatars.example.com/octo.png".to_string(),
            github_id: 7,
        }
    }

    fn use_case() -> (Store, RegisterRepositoryUseCase) {
        let store = Store::new(Arc::new(MemoryBackend::new()), TransactionOptions::default());
        let ingestion = Arc::new(IngestionService::new(store.clone()));
        (store, RegisterRepositoryUseCase::new(ingestion))
    }

    #[tokio::test]
    async fn test_registers_pending_repository() {
        let (store, use_case) = use_case();
        let user = store
            .users()
            .create(CreateUser {
                email: "ada@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let response = use_case.execute(request(&user.id)).await.unwrap();
        assert_eq!(response.repository.status, RepositoryStatus::Pending);
        assert_eq!(store.logs().count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (_, use_case) = use_case();

        let mut bad_url = request("u1");
        bad_url.url = "ftp://example.com/repo".to_string();
        assert!(matches!(
            use_case.execute(bad_url).await,
            Err(RegisterRepositoryError::ValidationError(_))
        ));

        let mut blank_name = request("u1");
        blank_name.name = "  ".to_string();
        assert!(matches!(
            use_case.execute(blank_name).await,
            Err(RegisterRepositoryError::ValidationError(_))
        ));

        let mut slashed_owner = request("u1");
        slashed_owner.owner = "octo/engine".to_string();
        assert!(matches!(
            use_case.execute(slashed_owner).await,
            Err(RegisterRepositoryError::ValidationError(_))
        ));

        assert!(matches!(
            use_case.execute(request("nobody")).await,
            Err(RegisterRepositoryError::UserNotFound(_))
        ));
    }
}
