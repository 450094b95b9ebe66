use serde::{Deserialize, Serialize};

use crate::application::services::RepositoryTree;
use crate::application::use_cases::get_repository::GetRepositoryResponse;
use crate::application::use_cases::register_repository::RegisterRepositoryRequest;
use crate::domain::entities::{Log, Repository};
use crate::domain::value_objects::RepositoryStatus;
use crate::presentation::http::dto::PaginationMetaDto;

#[derive(Debug, Deserialize)]
pub struct RegisterRepositoryDto {
    pub name: String,
    pub owner: String,
    pub url: String,
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(alias = "avatarUrl")]
    pub avatar_url: String,
    #[serde(alias = "githubId")]
    pub github_id: i32,
}

impl From<RegisterRepositoryDto> for RegisterRepositoryRequest {
    fn from(dto: RegisterRepositoryDto) -> Self {
        Self {
            name: dto.name,
            owner: dto.owner,
            url: dto.url,
            user_id: dto.user_id,
            avatar_url: dto.avatar_url,
            github_id: dto.github_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusDto {
    pub status: RepositoryStatus,
    pub message: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryListQuery {
    pub user_id: Option<String>,
    /// Parsed by the handler so a bad value is reported like any other
    /// validation error.
    pub status: Option<String>,
    #[serde(default = "default_skip")]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaginationDto {
    #[serde(default = "default_skip")]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_skip() -> i64 {
    0
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct RepositoryListResponseDto {
    pub repositories: Vec<Repository>,
    pub meta: PaginationMetaDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDetailResponseDto {
    #[serde(flatten)]
    pub repository: Repository,
    pub file_count: i64,
    pub directory_count: i64,
}

impl From<GetRepositoryResponse> for RepositoryDetailResponseDto {
    fn from(response: GetRepositoryResponse) -> Self {
        Self {
            repository: response.repository,
            file_count: response.file_count,
            directory_count: response.directory_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogListResponseDto {
    pub logs: Vec<Log>,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct RepositoryTreeResponseDto {
    #[serde(flatten)]
    pub tree: RepositoryTree,
}
