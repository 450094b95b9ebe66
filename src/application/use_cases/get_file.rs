use thiserror::Error;

use crate::domain::entities::{File, FileUnique};
use crate::domain::stores::{Store, StoreError};

#[derive(Debug, Error)]
pub enum GetFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct GetFileRequest {
    pub file_id: String,
}

#[derive(Debug, Clone)]
pub struct GetFileResponse {
    pub file: File,
}

pub struct GetFileUseCase {
    store: Store,
}

impl GetFileUseCase {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn execute(&self, request: GetFileRequest) -> Result<GetFileResponse, GetFileError> {
        let file = self
            .store
            .files()
            .find_unique(FileUnique::Id(request.file_id.clone()))
            .await?
            .ok_or(GetFileError::FileNotFound(request.file_id))?;

        Ok(GetFileResponse { file })
    }
}
