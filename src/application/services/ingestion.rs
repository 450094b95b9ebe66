use tracing::{info, warn};

use crate::domain::entities::{
    CreateDirectory, CreateFile, CreateLog, CreateRepository, Directory, File, FileUnique, Log,
    Repository, RepositoryUnique, UpdateFile, UpdateRepository,
};
use crate::domain::stores::{Store, StoreError, StoreResult, Tx};
use crate::domain::value_objects::RepositoryStatus;

/// Drives a repository through PENDING → PROCESSING → SUCCESS | FAILED and
/// records what the crawler finds on the way. Every status change appends a
/// `Log` carrying the new status in the same transaction.
#[derive(Clone)]
pub struct IngestionService {
    store: Store,
}

impl IngestionService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn register_repository(&self, mut data: CreateRepository) -> StoreResult<Repository> {
        data.status = Some(RepositoryStatus::Pending);
        let repository = self
            .store
            .run(move |tx| {
                let repository = tx.create::<Repository>(data)?;
                append_log(tx, &repository.id, RepositoryStatus::Pending, "registered")?;
                Ok(repository)
            })
            .await?;
        info!("Registered repository {} ({})", repository.full_name(), repository.id);
        Ok(repository)
    }

    /// Moves a pending repository to PROCESSING. A failed repository is
    /// first put back to PENDING as a retry.
    pub async fn start(&self, repository_id: &str) -> StoreResult<Repository> {
        let id = repository_id.to_string();
        let repository = self
            .store
            .run(move |tx| {
                let current = tx.find_unique_or_throw::<Repository>(&RepositoryUnique::Id(id.clone()))?;
                if current.status == RepositoryStatus::Failed {
                    transition(tx, &id, RepositoryStatus::Pending, "retry requested", None)?;
                }
                transition(tx, &id, RepositoryStatus::Processing, "processing started", None)
            })
            .await?;
        info!("Started ingestion of repository {}", repository.id);
        Ok(repository)
    }

    /// Explicit status change, with `message` as the log entry.
    pub async fn set_status(
        &self,
        repository_id: &str,
        status: RepositoryStatus,
        message: Option<String>,
    ) -> StoreResult<Repository> {
        let id = repository_id.to_string();
        let message = message.unwrap_or_else(|| format!("status changed to {}", status));
        self.store
            .run(move |tx| transition(tx, &id, status, &message, None))
            .await
    }

    pub async fn record_directory(&self, data: CreateDirectory) -> StoreResult<Directory> {
        self.store.directories().create(data).await
    }

    pub async fn record_file(&self, data: CreateFile) -> StoreResult<File> {
        self.store.files().create(data).await
    }

    /// Stores the analysis results for a file. `None` leaves a field as is.
    pub async fn annotate_file(
        &self,
        file_id: &str,
        analysis: Option<String>,
        short_summary: Option<String>,
    ) -> StoreResult<File> {
        self.store
            .files()
            .update(
                FileUnique::Id(file_id.to_string()),
                UpdateFile {
                    analysis: analysis.map(Some),
                    short_summary: short_summary.map(Some),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn complete(&self, repository_id: &str, overview: Option<String>) -> StoreResult<Repository> {
        let id = repository_id.to_string();
        let repository = self
            .store
            .run(move |tx| transition(tx, &id, RepositoryStatus::Success, "completed", overview))
            .await?;
        info!("Repository {} ingested", repository.id);
        Ok(repository)
    }

    pub async fn fail(&self, repository_id: &str, message: &str) -> StoreResult<Repository> {
        let id = repository_id.to_string();
        let message = message.to_string();
        let repository = self
            .store
            .run(move |tx| transition(tx, &id, RepositoryStatus::Failed, &message, None))
            .await?;
        warn!("Repository {} failed", repository.id);
        Ok(repository)
    }
}

fn transition(
    tx: &mut Tx<'_>,
    repository_id: &str,
    to: RepositoryStatus,
    message: &str,
    overview: Option<String>,
) -> StoreResult<Repository> {
    let key = RepositoryUnique::Id(repository_id.to_string());
    let current = tx.find_unique_or_throw::<Repository>(&key)?;
    if !current.status.can_transition_to(&to) {
        return Err(StoreError::validation(format!(
            "repository {} cannot move from {} to {}",
            repository_id, current.status, to
        )));
    }
    let repository = tx.update::<Repository>(
        &key,
        UpdateRepository {
            status: Some(to),
            overview: overview.map(Some),
            ..Default::default()
        },
    )?;
    append_log(tx, repository_id, to, message)?;
    Ok(repository)
}

fn append_log(tx: &mut Tx<'_>, repository_id: &str, status: RepositoryStatus, message: &str) -> StoreResult<Log> {
    tx.create::<Log>(CreateLog {
        id: None,
        repository_id: repository_id.to_string(),
        message: message.to_string(),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::entities::{CreateUser, LogField};
    use crate::domain::query::{FindManyArgs, OrderBy};
    use crate::domain::stores::TransactionOptions;
    use crate::infrastructure::memory::MemoryBackend;

    async fn setup() -> (Store, IngestionService, Repository) {
        let store = Store::new(Arc::new(MemoryBackend::new()), TransactionOptions::default());
        let user = store
            .users()
            .create(CreateUser {
                email: "ada@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let service = IngestionService::new(store.clone());
        let repository = service
            .register_repository(CreateRepository {
                name: "engine".to_string(),
                owner: "octo".to_string(),
                url: "https://github.com/octo/engine".to_string(),
                user_id: user.id,
                avatar_url: "https://avatars.example.com/octo.png".to_string(),
                github_id: 7,
                status: Some(RepositoryStatus::Success),
                ..Default::default()
            })
            .await
            .unwrap();
        (store, service, repository)
    }

    /// The repository's logs, newest first.
    async fn trail(store: &Store, repository: &Repository) -> Vec<(RepositoryStatus, String)> {
        store
            .repositories()
            .related_many(
                repository.clone(),
                Repository::LOGS,
                FindManyArgs::new().order_by(OrderBy::desc(LogField::CreatedAt)),
            )
            .await
            .unwrap()
            .into_iter()
            .map(|log| (log.status, log.message))
            .collect()
    }

    async fn log_statuses(store: &Store, repository: &Repository) -> Vec<RepositoryStatus> {
        trail(store, repository).await.into_iter().map(|(status, _)| status).collect()
    }

    #[tokio::test]
    async fn test_happy_path_logs_every_transition() {
        let (store, service, repository) = setup().await;
        assert_eq!(repository.status, RepositoryStatus::Pending);

        service.start(&repository.id).await.unwrap();
        let src = service
            .record_directory(CreateDirectory {
                path: "src".to_string(),
                repository_id: repository.id.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        let file = service
            .record_file(CreateFile {
                path: "src/lib.rs".to_string(),
                name: "lib.rs".to_string(),
                repository_id: repository.id.clone(),
                directory_id: Some(src.id.clone()),
                content: Some("pub fn run() {}".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let annotated = service
            .annotate_file(&file.id, Some("entry point".to_string()), None)
            .await
            .unwrap();
        assert_eq!(annotated.analysis.as_deref(), Some("entry point"));
        assert!(annotated.short_summary.is_none());

        let done = service
            .complete(&repository.id, Some("A small engine".to_string()))
            .await
            .unwrap();
        assert_eq!(done.status, RepositoryStatus::Success);
        assert_eq!(done.overview.as_deref(), Some("A small engine"));

        assert_eq!(
            log_statuses(&store, &repository).await,
            vec![
                RepositoryStatus::Success,
                RepositoryStatus::Processing,
                RepositoryStatus::Pending
            ]
        );
    }

    #[tokio::test]
    async fn test_illegal_transition_is_rejected_without_log() {
        let (store, service, repository) = setup().await;

        let err = service.complete(&repository.id, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(log_statuses(&store, &repository).await, vec![RepositoryStatus::Pending]);

        let missing = service.start("missing").await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_repository_can_be_retried() {
        let (store, service, repository) = setup().await;
        service.start(&repository.id).await.unwrap();
        let failed = service.fail(&repository.id, "clone timed out").await.unwrap();
        assert_eq!(failed.status, RepositoryStatus::Failed);

        let restarted = service.start(&repository.id).await.unwrap();
        assert_eq!(restarted.status, RepositoryStatus::Processing);

        let messages: Vec<String> = trail(&store, &repository)
            .await
            .into_iter()
            .map(|(_, message)| message)
            .collect();
        assert_eq!(
            messages,
            vec![
                "processing started",
                "retry requested",
                "clone timed out",
                "processing started",
                "registered"
            ]
        );
        assert_eq!(
            log_statuses(&store, &repository).await,
            vec![
                RepositoryStatus::Processing,
                RepositoryStatus::Pending,
                RepositoryStatus::Failed,
                RepositoryStatus::Processing,
                RepositoryStatus::Pending
            ]
        );
    }
}
