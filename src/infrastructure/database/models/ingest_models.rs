use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::schema::Row;
use crate::infrastructure::database::schema::{directories, files, logs, repositories};

#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = repositories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RepositoryModel {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub url: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub avatar_url: String,
    pub github_id: i32,
    pub status: String,
    pub overview: Option<String>,
}

impl From<RepositoryModel> for Row {
    fn from(model: RepositoryModel) -> Self {
        vec![
            model.id.into(),
            model.name.into(),
            model.owner.into(),
            model.url.into(),
            model.user_id.into(),
            model.created_at.into(),
            model.updated_at.into(),
            model.avatar_url.into(),
            model.github_id.into(),
            model.status.into(),
            model.overview.into(),
        ]
    }
}

#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = directories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DirectoryModel {
    pub id: String,
    pub path: String,
    pub summary: Option<String>,
    pub repository_id: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DirectoryModel> for Row {
    fn from(model: DirectoryModel) -> Self {
        vec![
            model.id.into(),
            model.path.into(),
            model.summary.into(),
            model.repository_id.into(),
            model.parent_id.into(),
            model.created_at.into(),
            model.updated_at.into(),
        ]
    }
}

#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FileModel {
    pub id: String,
    pub path: String,
    pub name: String,
    pub content: Option<String>,
    pub directory_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub repository_id: String,
    pub analysis: Option<String>,
    pub short_summary: Option<String>,
}

impl From<FileModel> for Row {
    fn from(model: FileModel) -> Self {
        vec![
            model.id.into(),
            model.path.into(),
            model.name.into(),
            model.content.into(),
            model.directory_id.into(),
            model.created_at.into(),
            model.updated_at.into(),
            model.repository_id.into(),
            model.analysis.into(),
            model.short_summary.into(),
        ]
    }
}

#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LogModel {
    pub id: String,
    pub repository_id: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<LogModel> for Row {
    fn from(model: LogModel) -> Self {
        vec![
            model.id.into(),
            model.repository_id.into(),
            model.message.into(),
            model.status.into(),
            model.created_at.into(),
        ]
    }
}
