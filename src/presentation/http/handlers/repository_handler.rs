use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::application::use_cases::{
    DeleteRepositoryUseCase, GetRepositoryTreeUseCase, GetRepositoryUseCase,
    ListRepositoriesUseCase, ListRepositoryFilesUseCase, ListRepositoryLogsUseCase,
    RegisterRepositoryUseCase, UpdateRepositoryStatusUseCase,
    delete_repository::{DeleteRepositoryError, DeleteRepositoryRequest},
    get_repository::{GetRepositoryError, GetRepositoryRequest},
    get_repository_tree::{GetRepositoryTreeError, GetRepositoryTreeRequest},
    list_repositories::{ListRepositoriesError, ListRepositoriesRequest},
    list_repository_files::{ListRepositoryFilesError, ListRepositoryFilesRequest},
    list_repository_logs::{ListRepositoryLogsError, ListRepositoryLogsRequest},
    register_repository::RegisterRepositoryError,
    update_repository_status::{UpdateRepositoryStatusError, UpdateRepositoryStatusRequest},
};
use crate::domain::entities::Repository;
use crate::domain::value_objects::RepositoryStatus;
use crate::presentation::http::dto::{
    ApiResponse, FileListQuery, FileListResponseDto, LogListResponseDto, PaginationDto,
    PaginationMetaDto, RegisterRepositoryDto, RepositoryDetailResponseDto, RepositoryListQuery,
    RepositoryListResponseDto, RepositoryTreeResponseDto, UpdateStatusDto,
};
use crate::presentation::http::handlers::{failure, store_failure};

pub struct RepositoryHandler {
    register_use_case: Arc<RegisterRepositoryUseCase>,
    list_use_case: Arc<ListRepositoriesUseCase>,
    get_use_case: Arc<GetRepositoryUseCase>,
    delete_use_case: Arc<DeleteRepositoryUseCase>,
    update_status_use_case: Arc<UpdateRepositoryStatusUseCase>,
    list_logs_use_case: Arc<ListRepositoryLogsUseCase>,
    tree_use_case: Arc<GetRepositoryTreeUseCase>,
    list_files_use_case: Arc<ListRepositoryFilesUseCase>,
}

impl RepositoryHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        register_use_case: Arc<RegisterRepositoryUseCase>,
        list_use_case: Arc<ListRepositoriesUseCase>,
        get_use_case: Arc<GetRepositoryUseCase>,
        delete_use_case: Arc<DeleteRepositoryUseCase>,
        update_status_use_case: Arc<UpdateRepositoryStatusUseCase>,
        list_logs_use_case: Arc<ListRepositoryLogsUseCase>,
        tree_use_case: Arc<GetRepositoryTreeUseCase>,
        list_files_use_case: Arc<ListRepositoryFilesUseCase>,
    ) -> Self {
        Self {
            register_use_case,
            list_use_case,
            get_use_case,
            delete_use_case,
            update_status_use_case,
            list_logs_use_case,
            tree_use_case,
            list_files_use_case,
        }
    }

    pub async fn register_repository(
        State(handler): State<Arc<RepositoryHandler>>,
        Json(dto): Json<RegisterRepositoryDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        match handler.register_use_case.execute(dto.into()).await {
            Ok(response) => Ok((
                StatusCode::CREATED,
                Json(ApiResponse::success(response.repository)),
            )),
            Err(RegisterRepositoryError::ValidationError(msg)) => Ok(failure::<Repository>(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg,
            )),
            Err(RegisterRepositoryError::UserNotFound(msg)) => Ok(failure::<Repository>(
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                msg,
            )),
            Err(RegisterRepositoryError::Store(e)) => Ok(store_failure::<Repository>(&e)),
        }
    }

    pub async fn list_repositories(
        State(handler): State<Arc<RepositoryHandler>>,
        Query(query): Query<RepositoryListQuery>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let status = match query.status.as_deref().map(str::parse::<RepositoryStatus>) {
            None => None,
            Some(Ok(status)) => Some(status),
            Some(Err(e)) => {
                return Ok(failure::<RepositoryListResponseDto>(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    e.to_string(),
                ));
            }
        };

        let request = ListRepositoriesRequest {
            user_id: query.user_id,
            status,
            skip: query.skip,
            limit: query.limit,
        };

        match handler.list_use_case.execute(request).await {
            Ok(response) => {
                let dto = RepositoryListResponseDto {
                    repositories: response.repositories,
                    meta: PaginationMetaDto {
                        offset: response.skip,
                        limit: response.limit,
                        total: response.total_count,
                    },
                };
                Ok((StatusCode::OK, Json(ApiResponse::success(dto))))
            }
            Err(ListRepositoriesError::ValidationError(msg)) => Ok(failure(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg,
            )),
            Err(ListRepositoriesError::Store(e)) => Ok(store_failure(&e)),
        }
    }

    pub async fn get_repository(
        State(handler): State<Arc<RepositoryHandler>>,
        Path(repository_id): Path<String>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = GetRepositoryRequest { repository_id };

        match handler.get_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(RepositoryDetailResponseDto::from(response))),
            )),
            Err(GetRepositoryError::RepositoryNotFound(id)) => Ok(not_found(&id)),
            Err(GetRepositoryError::Store(e)) => Ok(store_failure(&e)),
        }
    }

    pub async fn delete_repository(
        State(handler): State<Arc<RepositoryHandler>>,
        Path(repository_id): Path<String>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = DeleteRepositoryRequest { repository_id };

        match handler.delete_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(response.repository)),
            )),
            Err(DeleteRepositoryError::RepositoryNotFound(id)) => Ok(not_found(&id)),
            Err(DeleteRepositoryError::Store(e)) => Ok(store_failure(&e)),
        }
    }

    pub async fn update_status(
        State(handler): State<Arc<RepositoryHandler>>,
        Path(repository_id): Path<String>,
        Json(dto): Json<UpdateStatusDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = UpdateRepositoryStatusRequest {
            repository_id,
            status: dto.status,
            message: dto.message,
            overview: dto.overview,
        };

        match handler.update_status_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(response.repository)),
            )),
            Err(UpdateRepositoryStatusError::RepositoryNotFound(detail)) => Ok(failure::<Repository>(
                StatusCode::NOT_FOUND,
                "REPOSITORY_NOT_FOUND",
                detail,
            )),
            Err(UpdateRepositoryStatusError::InvalidTransition(msg)) => Ok(failure::<Repository>(
                StatusCode::CONFLICT,
                "INVALID_STATUS_TRANSITION",
                msg,
            )),
            Err(UpdateRepositoryStatusError::Store(e)) => Ok(store_failure::<Repository>(&e)),
        }
    }

    pub async fn list_logs(
        State(handler): State<Arc<RepositoryHandler>>,
        Path(repository_id): Path<String>,
        Query(pagination): Query<PaginationDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = ListRepositoryLogsRequest {
            repository_id,
            skip: pagination.skip,
            limit: pagination.limit,
        };

        match handler.list_logs_use_case.execute(request).await {
            Ok(response) => {
                let dto = LogListResponseDto {
                    logs: response.logs,
                    offset: response.skip,
                    limit: response.limit,
                };
                Ok((StatusCode::OK, Json(ApiResponse::success(dto))))
            }
            Err(ListRepositoryLogsError::RepositoryNotFound(id)) => Ok(not_found(&id)),
            Err(ListRepositoryLogsError::ValidationError(msg)) => Ok(failure(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg,
            )),
            Err(ListRepositoryLogsError::Store(e)) => Ok(store_failure(&e)),
        }
    }

    pub async fn get_tree(
        State(handler): State<Arc<RepositoryHandler>>,
        Path(repository_id): Path<String>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = GetRepositoryTreeRequest { repository_id };

        match handler.tree_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(RepositoryTreeResponseDto {
                    tree: response.tree,
                })),
            )),
            Err(GetRepositoryTreeError::RepositoryNotFound(id)) => Ok(not_found(&id)),
            Err(GetRepositoryTreeError::Store(e)) => Ok(store_failure(&e)),
        }
    }

    pub async fn list_files(
        State(handler): State<Arc<RepositoryHandler>>,
        Path(repository_id): Path<String>,
        Query(query): Query<FileListQuery>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = ListRepositoryFilesRequest {
            repository_id,
            directory_id: query.directory_id,
            skip: query.skip,
            limit: query.limit,
        };

        match handler.list_files_use_case.execute(request).await {
            Ok(response) => {
                let dto = FileListResponseDto {
                    files: response.files,
                    meta: PaginationMetaDto {
                        offset: response.skip,
                        limit: response.limit,
                        total: response.total_count,
                    },
                };
                Ok((StatusCode::OK, Json(ApiResponse::success(dto))))
            }
            Err(ListRepositoryFilesError::RepositoryNotFound(id)) => Ok(not_found(&id)),
            Err(ListRepositoryFilesError::ValidationError(msg)) => Ok(failure(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg,
            )),
            Err(ListRepositoryFilesError::Store(e)) => Ok(store_failure(&e)),
        }
    }
}

fn not_found<T>(repository_id: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    failure(
        StatusCode::NOT_FOUND,
        "REPOSITORY_NOT_FOUND",
        format!("Repository not found: {}", repository_id),
    )
}
