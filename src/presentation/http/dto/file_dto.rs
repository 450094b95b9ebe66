use serde::{Deserialize, Serialize};

use crate::domain::entities::File;
use crate::presentation::http::dto::PaginationMetaDto;

#[derive(Debug, Deserialize)]
pub struct FileListQuery {
    pub directory_id: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct FileListResponseDto {
    pub files: Vec<File>,
    pub meta: PaginationMetaDto,
}
