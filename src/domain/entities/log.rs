use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Repository, RepositoryField};
use crate::domain::schema::{
    generate_id, Entity, FieldDescriptor, FieldKind, ForeignKeyDescriptor, ModelDescriptor, ModelField,
    ModelId, OnDelete, Relation, RelationDescriptor, Row, RowReader, UniqueDescriptor, UniqueKey, Value,
};
use crate::domain::stores::{Assignment, StoreError};
use crate::domain::value_objects::RepositoryStatus;

/// Append-only ingestion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub id: String,
    pub repository_id: String,
    pub message: String,
    pub status: RepositoryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogField {
    Id,
    RepositoryId,
    Message,
    Status,
    CreatedAt,
}

impl ModelField for LogField {
    fn index(self) -> usize {
        self as usize
    }
}

const LOG_REPOSITORY: RelationDescriptor = RelationDescriptor {
    name: "repository",
    source: ModelId::Log,
    target: ModelId::Repository,
    local: LogField::RepositoryId as usize,
    remote: RepositoryField::Id as usize,
    to_many: false,
};

pub static LOG_MODEL: ModelDescriptor = ModelDescriptor {
    id: ModelId::Log,
    name: "Log",
    table: "logs",
    fields: &[
        FieldDescriptor { name: "id", column: "id", kind: FieldKind::Text, nullable: false },
        FieldDescriptor {
            name: "repositoryId",
            column: "repository_id",
            kind: FieldKind::Text,
            nullable: false,
        },
        FieldDescriptor { name: "message", column: "message", kind: FieldKind::Text, nullable: false },
        FieldDescriptor {
            name: "status",
            column: "status",
            kind: FieldKind::Enum(RepositoryStatus::VARIANTS),
            nullable: false,
        },
        FieldDescriptor {
            name: "createdAt",
            column: "created_at",
            kind: FieldKind::DateTime,
            nullable: false,
        },
    ],
    primary_key: LogField::Id as usize,
    unique: &[UniqueDescriptor {
        name: "logs_pkey",
        fields: &[LogField::Id as usize],
    }],
    foreign_keys: &[ForeignKeyDescriptor {
        name: "logs_repository_id_fkey",
        field: LogField::RepositoryId as usize,
        target: ModelId::Repository,
        on_delete: OnDelete::Cascade,
        scope: None,
        acyclic: None,
    }],
    relations: &[LOG_REPOSITORY],
    updated_at: None,
};

#[derive(Debug, Clone, PartialEq)]
pub enum LogUnique {
    Id(String),
}

impl UniqueKey for LogUnique {
    fn constraint(&self) -> &'static UniqueDescriptor {
        &LOG_MODEL.unique[0]
    }

    fn values(&self) -> Vec<Value> {
        match self {
            LogUnique::Id(id) => vec![id.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLog {
    #[serde(default)]
    pub id: Option<String>,
    pub repository_id: String,
    pub message: String,
    pub status: RepositoryStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateLog {
    pub message: Option<String>,
    pub status: Option<RepositoryStatus>,
}

impl Log {
    pub const REPOSITORY: Relation<Log, Repository> = Relation::new(LOG_REPOSITORY);
}

impl Entity for Log {
    type Field = LogField;
    type Unique = LogUnique;
    type Create = CreateLog;
    type Update = UpdateLog;

    fn model() -> &'static ModelDescriptor {
        &LOG_MODEL
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        let mut r = RowReader::new(&LOG_MODEL, row)?;
        Ok(Self {
            id: r.text()?,
            repository_id: r.text()?,
            message: r.text()?,
            status: r.text()?.parse()?,
            created_at: r.datetime()?,
        })
    }

    fn to_row(&self) -> Row {
        vec![
            self.id.clone().into(),
            self.repository_id.clone().into(),
            self.message.clone().into(),
            self.status.into(),
            self.created_at.into(),
        ]
    }

    fn from_create(data: CreateLog, now: DateTime<Utc>) -> Self {
        Self {
            id: data.id.unwrap_or_else(generate_id),
            repository_id: data.repository_id,
            message: data.message,
            status: data.status,
            created_at: now,
        }
    }

    fn assignments(data: UpdateLog) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(message) = data.message {
            out.push(Assignment::new(LogField::Message.index(), message));
        }
        if let Some(status) = data.status {
            out.push(Assignment::new(LogField::Status.index(), status));
        }
        out
    }

    fn unique_key(&self) -> LogUnique {
        LogUnique::Id(self.id.clone())
    }
}
