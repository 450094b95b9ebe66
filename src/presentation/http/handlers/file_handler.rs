use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::application::use_cases::{
    GetFileUseCase,
    get_file::{GetFileError, GetFileRequest},
};
use crate::domain::entities::File;
use crate::presentation::http::dto::ApiResponse;
use crate::presentation::http::handlers::{failure, store_failure};

pub struct FileHandler {
    get_file_use_case: Arc<GetFileUseCase>,
}

impl FileHandler {
    pub fn new(get_file_use_case: Arc<GetFileUseCase>) -> Self {
        Self { get_file_use_case }
    }

    pub async fn get_file(
        State(handler): State<Arc<FileHandler>>,
        Path(file_id): Path<String>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = GetFileRequest { file_id };

        match handler.get_file_use_case.execute(request).await {
            Ok(response) => Ok((StatusCode::OK, Json(ApiResponse::success(response.file)))),
            Err(GetFileError::FileNotFound(id)) => Ok(failure::<File>(
                StatusCode::NOT_FOUND,
                "FILE_NOT_FOUND",
                format!("File not found: {}", id),
            )),
            Err(GetFileError::Store(e)) => Ok(store_failure::<File>(&e)),
        }
    }
}
