use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Directory, DirectoryField, File, FileField, Log, LogField, User, UserField};
use crate::domain::schema::{
    generate_id, Entity, FieldDescriptor, FieldKind, ForeignKeyDescriptor, ModelDescriptor, ModelField,
    ModelId, OnDelete, Relation, RelationDescriptor, Row, RowReader, UniqueDescriptor, UniqueKey, Value,
};
use crate::domain::stores::{Assignment, StoreError};
use crate::domain::value_objects::RepositoryStatus;

/// A source repository registered by a user for ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub url: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub avatar_url: String,
    pub github_id: i32,
    pub status: RepositoryStatus,
    pub overview: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryField {
    Id,
    Name,
    Owner,
    Url,
    UserId,
    CreatedAt,
    UpdatedAt,
    AvatarUrl,
    GithubId,
    Status,
    Overview,
}

impl ModelField for RepositoryField {
    fn index(self) -> usize {
        self as usize
    }
}

const REPOSITORY_USER: RelationDescriptor = RelationDescriptor {
    name: "user",
    source: ModelId::Repository,
    target: ModelId::User,
    local: RepositoryField::UserId as usize,
    remote: UserField::Id as usize,
    to_many: false,
};

const REPOSITORY_DIRECTORIES: RelationDescriptor = RelationDescriptor {
    name: "directories",
    source: ModelId::Repository,
    target: ModelId::Directory,
    local: RepositoryField::Id as usize,
    remote: DirectoryField::RepositoryId as usize,
    to_many: true,
};

const REPOSITORY_FILES: RelationDescriptor = RelationDescriptor {
    name: "files",
    source: ModelId::Repository,
    target: ModelId::File,
    local: RepositoryField::Id as usize,
    remote: FileField::RepositoryId as usize,
    to_many: true,
};

const REPOSITORY_LOGS: RelationDescriptor = RelationDescriptor {
    name: "logs",
    source: ModelId::Repository,
    target: ModelId::Log,
    local: RepositoryField::Id as usize,
    remote: LogField::RepositoryId as usize,
    to_many: true,
};

const fn field(name: &'static str, column: &'static str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        name,
        column,
        kind,
        nullable: false,
    }
}

pub static REPOSITORY_MODEL: ModelDescriptor = ModelDescriptor {
    id: ModelId::Repository,
    name: "Repository",
    table: "repositories",
    fields: &[
        field("id", "id", FieldKind::Text),
        field("name", "name", FieldKind::Text),
        field("owner", "owner", FieldKind::Text),
        field("url", "url", FieldKind::Text),
        field("userId", "user_id", FieldKind::Text),
        field("createdAt", "created_at", FieldKind::DateTime),
        field("updatedAt", "updated_at", FieldKind::DateTime),
        field("avatarUrl", "avatar_url", FieldKind::Text),
        field("githubId", "github_id", FieldKind::Int),
        field("status", "status", FieldKind::Enum(RepositoryStatus::VARIANTS)),
        FieldDescriptor {
            name: "overview",
            column: "overview",
            kind: FieldKind::Text,
            nullable: true,
        },
    ],
    primary_key: RepositoryField::Id as usize,
    unique: &[UniqueDescriptor {
        name: "repositories_pkey",
        fields: &[RepositoryField::Id as usize],
    }],
    foreign_keys: &[ForeignKeyDescriptor {
        name: "repositories_user_id_fkey",
        field: RepositoryField::UserId as usize,
        target: ModelId::User,
        on_delete: OnDelete::Cascade,
        scope: None,
        acyclic: None,
    }],
    relations: &[
        REPOSITORY_USER,
        REPOSITORY_DIRECTORIES,
        REPOSITORY_FILES,
        REPOSITORY_LOGS,
    ],
    updated_at: Some(RepositoryField::UpdatedAt as usize),
};

#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryUnique {
    Id(String),
}

impl UniqueKey for RepositoryUnique {
    fn constraint(&self) -> &'static UniqueDescriptor {
        &REPOSITORY_MODEL.unique[0]
    }

    fn values(&self) -> Vec<Value> {
        match self {
            RepositoryUnique::Id(id) => vec![id.into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepository {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub owner: String,
    pub url: String,
    pub user_id: String,
    pub avatar_url: String,
    pub github_id: i32,
    #[serde(default)]
    pub status: Option<RepositoryStatus>,
    #[serde(default)]
    pub overview: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRepository {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub url: Option<String>,
    pub user_id: Option<String>,
    pub avatar_url: Option<String>,
    pub github_id: Option<i32>,
    pub status: Option<RepositoryStatus>,
    pub overview: Option<Option<String>>,
}

impl Repository {
    pub const USER: Relation<Repository, User> = Relation::new(REPOSITORY_USER);
    pub const DIRECTORIES: Relation<Repository, Directory> = Relation::new(REPOSITORY_DIRECTORIES);
    pub const FILES: Relation<Repository, File> = Relation::new(REPOSITORY_FILES);
    pub const LOGS: Relation<Repository, Log> = Relation::new(REPOSITORY_LOGS);

    /// `owner/name`, as shown on the hosting service.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl Entity for Repository {
    type Field = RepositoryField;
    type Unique = RepositoryUnique;
    type Create = CreateRepository;
    type Update = UpdateRepository;

    fn model() -> &'static ModelDescriptor {
        &REPOSITORY_MODEL
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        let mut r = RowReader::new(&REPOSITORY_MODEL, row)?;
        Ok(Self {
            id: r.text()?,
            name: r.text()?,
            owner: r.text()?,
            url: r.text()?,
            user_id: r.text()?,
            created_at: r.datetime()?,
            updated_at: r.datetime()?,
            avatar_url: r.text()?,
            github_id: r.int()?,
            status: r.text()?.parse()?,
            overview: r.opt_text()?,
        })
    }

    fn to_row(&self) -> Row {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.owner.clone().into(),
            self.url.clone().into(),
            self.user_id.clone().into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.avatar_url.clone().into(),
            self.github_id.into(),
            self.status.into(),
            self.overview.clone().into(),
        ]
    }

    fn from_create(data: CreateRepository, now: DateTime<Utc>) -> Self {
        Self {
            id: data.id.unwrap_or_else(generate_id),
            name: data.name,
            owner: data.owner,
            url: data.url,
            user_id: data.user_id,
            created_at: now,
            updated_at: now,
            avatar_url: data.avatar_url,
            github_id: data.github_id,
            status: data.status.unwrap_or_default(),
            overview: data.overview,
        }
    }

    fn assignments(data: UpdateRepository) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(name) = data.name {
            out.push(Assignment::new(RepositoryField::Name.index(), name));
        }
        if let Some(owner) = data.owner {
            out.push(Assignment::new(RepositoryField::Owner.index(), owner));
        }
        if let Some(url) = data.url {
            out.push(Assignment::new(RepositoryField::Url.index(), url));
        }
        if let Some(user_id) = data.user_id {
            out.push(Assignment::new(RepositoryField::UserId.index(), user_id));
        }
        if let Some(avatar_url) = data.avatar_url {
            out.push(Assignment::new(RepositoryField::AvatarUrl.index(), avatar_url));
        }
        if let Some(github_id) = data.github_id {
            out.push(Assignment::new(RepositoryField::GithubId.index(), github_id));
        }
        if let Some(status) = data.status {
            out.push(Assignment::new(RepositoryField::Status.index(), status));
        }
        if let Some(overview) = data.overview {
            out.push(Assignment::new(RepositoryField::Overview.index(), overview));
        }
        out
    }

    fn unique_key(&self) -> RepositoryUnique {
        RepositoryUnique::Id(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CreateRepository {
        CreateRepository {
            name: "tokio".to_string(),
            owner: "tokio-rs".to_string(),
            url: "https://github.com/tokio-rs/tokio".to_string(),
            user_id: "u1".to_string(),
            avatar_url: "https://avatars.githubusercontent.com/u/20248544".to_string(),
            github_id: 60_566_888,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_repository_is_pending() {
        let repo = Repository::from_create(sample(), Utc::now());
        assert_eq!(repo.status, RepositoryStatus::Pending);
        assert_eq!(repo.full_name(), "tokio-rs/tokio");
    }

    #[test]
    fn test_from_row_rejects_unknown_status() {
        let repo = Repository::from_create(sample(), Utc::now());
        let mut row = repo.to_row();
        row[RepositoryField::Status.index()] = Value::from("DONE");
        assert!(matches!(
            Repository::from_row(row),
            Err(StoreError::Validation(_))
        ));
    }
}
