use std::sync::Arc;
use thiserror::Error;

use crate::application::services::{DirectoryTreeService, RepositoryTree};
use crate::domain::stores::StoreError;

#[derive(Debug, Error)]
pub enum GetRepositoryTreeError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct GetRepositoryTreeRequest {
    pub repository_id: String,
}

#[derive(Debug, Clone)]
pub struct GetRepositoryTreeResponse {
    pub tree: RepositoryTree,
}

pub struct GetRepositoryTreeUseCase {
    tree_service: Arc<DirectoryTreeService>,
}

impl GetRepositoryTreeUseCase {
    pub fn new(tree_service: Arc<DirectoryTreeService>) -> Self {
        Self { tree_service }
    }

    pub async fn execute(
        &self,
        request: GetRepositoryTreeRequest,
    ) -> Result<GetRepositoryTreeResponse, GetRepositoryTreeError> {
        let tree = self
            .tree_service
            .tree(&request.repository_id)
            .await?
            .ok_or(GetRepositoryTreeError::RepositoryNotFound(request.repository_id))?;

        Ok(GetRepositoryTreeResponse { tree })
    }
}
