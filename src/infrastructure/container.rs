use std::sync::Arc;
use tracing::info;

use crate::{
    application::{
        services::{AuthAdapter, DirectoryTreeService, IngestionService},
        use_cases::{
            DeleteRepositoryUseCase, GetFileUseCase, GetRepositoryTreeUseCase, GetRepositoryUseCase,
            ListRepositoriesUseCase, ListRepositoryFilesUseCase, ListRepositoryLogsUseCase,
            RegisterRepositoryUseCase, UpdateRepositoryStatusUseCase,
        },
    },
    config::{AppConfig, BackendKind, ConfigError},
    domain::stores::{Backend, Store, StoreError},
    infrastructure::{
        database::{PoolSettings, PostgresBackend},
        memory::MemoryBackend,
    },
    presentation::http::{
        HttpServer,
        handlers::{FileHandler, RepositoryHandler},
    },
};

pub struct AppContainer {
    pub config: AppConfig,
    pub store: Store,

    // Application Services
    pub ingestion_service: Arc<IngestionService>,
    pub tree_service: Arc<DirectoryTreeService>,
    pub auth_adapter: Arc<AuthAdapter>,

    // Use Cases
    pub register_repository_use_case: Arc<RegisterRepositoryUseCase>,
    pub list_repositories_use_case: Arc<ListRepositoriesUseCase>,
    pub get_repository_use_case: Arc<GetRepositoryUseCase>,
    pub delete_repository_use_case: Arc<DeleteRepositoryUseCase>,
    pub update_repository_status_use_case: Arc<UpdateRepositoryStatusUseCase>,
    pub list_repository_logs_use_case: Arc<ListRepositoryLogsUseCase>,
    pub get_repository_tree_use_case: Arc<GetRepositoryTreeUseCase>,
    pub list_repository_files_use_case: Arc<ListRepositoryFilesUseCase>,
    pub get_file_use_case: Arc<GetFileUseCase>,

    // HTTP Handlers
    pub repository_handler: Arc<RepositoryHandler>,
    pub file_handler: Arc<FileHandler>,
}

impl AppContainer {
    pub async fn new(config: AppConfig) -> Result<Self, StoreError> {
        let backend = create_backend(&config).await?;
        let store = Store::new(backend, config.transaction);
        Ok(Self::with_store(config, store))
    }

    /// Wires every service, use case and handler on top of `store`.
    pub fn with_store(config: AppConfig, store: Store) -> Self {
        // Create application services
        let ingestion_service = Arc::new(IngestionService::new(store.clone()));
        let tree_service = Arc::new(DirectoryTreeService::new(store.clone()));
        let auth_adapter = Arc::new(AuthAdapter::new(store.clone()));

        // Create use cases
        let register_repository_use_case =
            Arc::new(RegisterRepositoryUseCase::new(ingestion_service.clone()));
        let list_repositories_use_case = Arc::new(ListRepositoriesUseCase::new(store.clone()));
        let get_repository_use_case = Arc::new(GetRepositoryUseCase::new(store.clone()));
        let delete_repository_use_case = Arc::new(DeleteRepositoryUseCase::new(store.clone()));
        let update_repository_status_use_case =
            Arc::new(UpdateRepositoryStatusUseCase::new(ingestion_service.clone()));
        let list_repository_logs_use_case = Arc::new(ListRepositoryLogsUseCase::new(store.clone()));
        let get_repository_tree_use_case =
            Arc::new(GetRepositoryTreeUseCase::new(tree_service.clone()));
        let list_repository_files_use_case =
            Arc::new(ListRepositoryFilesUseCase::new(store.clone()));
        let get_file_use_case = Arc::new(GetFileUseCase::new(store.clone()));

        // Create HTTP handlers
        let repository_handler = Arc::new(RepositoryHandler::new(
            register_repository_use_case.clone(),
            list_repositories_use_case.clone(),
            get_repository_use_case.clone(),
            delete_repository_use_case.clone(),
            update_repository_status_use_case.clone(),
            list_repository_logs_use_case.clone(),
            get_repository_tree_use_case.clone(),
            list_repository_files_use_case.clone(),
        ));
        let file_handler = Arc::new(FileHandler::new(get_file_use_case.clone()));

        Self {
            config,
            store,
            ingestion_service,
            tree_service,
            auth_adapter,
            register_repository_use_case,
            list_repositories_use_case,
            get_repository_use_case,
            delete_repository_use_case,
            update_repository_status_use_case,
            list_repository_logs_use_case,
            get_repository_tree_use_case,
            list_repository_files_use_case,
            get_file_use_case,
            repository_handler,
            file_handler,
        }
    }

    pub fn http_server(&self) -> HttpServer {
        HttpServer::new(
            self.repository_handler.clone(),
            self.file_handler.clone(),
            self.store.clone(),
            Some(self.config.port),
        )
    }
}

async fn create_backend(config: &AppConfig) -> Result<Arc<dyn Backend>, StoreError> {
    match config.backend {
        BackendKind::Memory => {
            info!("Using the in-memory store");
            Ok(Arc::new(MemoryBackend::new()))
        }
        BackendKind::Postgres => {
            let database_url = config
                .database_url
                .clone()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let settings = PoolSettings {
                max_size: config.pool_size,
                min_idle: config.min_idle,
                ..PoolSettings::new(database_url)
            };
            let migrate = config.run_migrations;
            let backend = tokio::task::spawn_blocking(move || PostgresBackend::connect(&settings, migrate))
                .await
                .map_err(|e| StoreError::Initialization(format!("backend setup task failed: {}", e)))??;
            info!("Using the postgres store");
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_container() {
        let config = AppConfig::from_lookup(|name| match name {
            "STORE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap();
        let container = AppContainer::new(config).await.unwrap();
        assert_eq!(container.store.backend_name(), "memory");
        container.store.ping().await.unwrap();
    }
}
