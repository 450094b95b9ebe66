use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Directory, DirectoryField, Repository, RepositoryField};
use crate::domain::schema::{
    generate_id, Entity, FieldDescriptor, FieldKind, ForeignKeyDescriptor, ModelDescriptor, ModelField,
    ModelId, OnDelete, Relation, RelationDescriptor, Row, RowReader, ScopeDescriptor, UniqueDescriptor,
    UniqueKey, Value,
};
use crate::domain::stores::{Assignment, StoreError};

/// A source file of an ingested repository, with its analysis results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileField {
    Id,
    Path,
    Name,
    Content,
    DirectoryId,
    CreatedAt,
    UpdatedAt,
    RepositoryId,
    Analysis,
    ShortSummary,
}

impl ModelField for FileField {
    fn index(self) -> usize {
        self as usize
    }
}

const FILE_REPOSITORY: RelationDescriptor = RelationDescriptor {
    name: "repository",
    source: ModelId::File,
    target: ModelId::Repository,
    local: FileField::RepositoryId as usize,
    remote: RepositoryField::Id as usize,
    to_many: false,
};

const FILE_DIRECTORY: RelationDescriptor = RelationDescriptor {
    name: "directory",
    source: ModelId::File,
    target: ModelId::Directory,
    local: FileField::DirectoryId as usize,
    remote: DirectoryField::Id as usize,
    to_many: false,
};

const fn optional_text(name: &'static str, column: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        name,
        column,
        kind: FieldKind::Text,
        nullable: true,
    }
}

pub static FILE_MODEL: ModelDescriptor = ModelDescriptor {
    id: ModelId::File,
    name: "File",
    table: "files",
    fields: &[
        FieldDescriptor { name: "id", column: "id", kind: FieldKind::Text, nullable: false },
        FieldDescriptor { name: "path", column: "path", kind: FieldKind::Text, nullable: false },
        FieldDescriptor { name: "name", column: "name", kind: FieldKind::Text, nullable: false },
        optional_text("content", "content"),
        optional_text("directoryId", "directory_id"),
        FieldDescriptor {
            name: "createdAt",
            column: "created_at",
            kind: FieldKind::DateTime,
            nullable: false,
        },
        FieldDescriptor {
            name: "updatedAt",
            column: "updated_at",
            kind: FieldKind::DateTime,
            nullable: false,
        },
        FieldDescriptor {
            name: "repositoryId",
            column: "repository_id",
            kind: FieldKind::Text,
            nullable: false,
        },
        optional_text("analysis", "analysis"),
        optional_text("shortSummary", "short_summary"),
    ],
    primary_key: FileField::Id as usize,
    unique: &[UniqueDescriptor {
        name: "files_pkey",
        fields: &[FileField::Id as usize],
    }],
    foreign_keys: &[
        ForeignKeyDescriptor {
            name: "files_repository_id_fkey",
            field: FileField::RepositoryId as usize,
            target: ModelId::Repository,
            on_delete: OnDelete::Cascade,
            scope: None,
            acyclic: None,
        },
        ForeignKeyDescriptor {
            name: "files_directory_id_fkey",
            field: FileField::DirectoryId as usize,
            target: ModelId::Directory,
            on_delete: OnDelete::Cascade,
            scope: Some(ScopeDescriptor {
                name: "files_directory_same_repository",
                local: FileField::RepositoryId as usize,
                remote: DirectoryField::RepositoryId as usize,
            }),
            acyclic: None,
        },
    ],
    relations: &[FILE_REPOSITORY, FILE_DIRECTORY],
    updated_at: Some(FileField::UpdatedAt as usize),
};

#[derive(Debug, Clone, PartialEq)]
pub enum FileUnique {
    Id(String),
}

impl UniqueKey for FileUnique {
    fn constraint(&self) -> &'static UniqueDescriptor {
        &FILE_MODEL.unique[0]
    }

    fn values(&self) -> Vec<Value> {
        match self {
            FileUnique::Id(id) => vec![id.into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFile {
    #[serde(default)]
    pub id: Option<String>,
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub directory_id: Option<String>,
    pub repository_id: String,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub short_summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateFile {
    pub path: Option<String>,
    pub name: Option<String>,
    pub content: Option<Option<String>>,
    pub directory_id: Option<Option<String>>,
    pub repository_id: Option<String>,
    pub analysis: Option<Option<String>>,
    pub short_summary: Option<Option<String>>,
}

impl File {
    pub const REPOSITORY: Relation<File, Repository> = Relation::new(FILE_REPOSITORY);
    pub const DIRECTORY: Relation<File, Directory> = Relation::new(FILE_DIRECTORY);

    /// Lower-cased extension of `name`, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }
}

impl Entity for File {
    type Field = FileField;
    type Unique = FileUnique;
    type Create = CreateFile;
    type Update = UpdateFile;

    fn model() -> &'static ModelDescriptor {
        &FILE_MODEL
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        let mut r = RowReader::new(&FILE_MODEL, row)?;
        Ok(Self {
            id: r.text()?,
            path: r.text()?,
            name: r.text()?,
            content: r.opt_text()?,
            directory_id: r.opt_text()?,
            created_at: r.datetime()?,
            updated_at: r.datetime()?,
            repository_id: r.text()?,
            analysis: r.opt_text()?,
            short_summary: r.opt_text()?,
        })
    }

    fn to_row(&self) -> Row {
        vec![
            self.id.clone().into(),
            self.path.clone().into(),
            self.name.clone().into(),
            self.content.clone().into(),
            self.directory_id.clone().into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.repository_id.clone().into(),
            self.analysis.clone().into(),
            self.short_summary.clone().into(),
        ]
    }

    fn from_create(data: CreateFile, now: DateTime<Utc>) -> Self {
        Self {
            id: data.id.unwrap_or_else(generate_id),
            path: data.path,
            name: data.name,
            content: data.content,
            directory_id: data.directory_id,
            created_at: now,
            updated_at: now,
            repository_id: data.repository_id,
            analysis: data.analysis,
            short_summary: data.short_summary,
        }
    }

    fn assignments(data: UpdateFile) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(path) = data.path {
            out.push(Assignment::new(FileField::Path.index(), path));
        }
        if let Some(name) = data.name {
            out.push(Assignment::new(FileField::Name.index(), name));
        }
        if let Some(content) = data.content {
            out.push(Assignment::new(FileField::Content.index(), content));
        }
        if let Some(directory_id) = data.directory_id {
            out.push(Assignment::new(FileField::DirectoryId.index(), directory_id));
        }
        if let Some(repository_id) = data.repository_id {
            out.push(Assignment::new(FileField::RepositoryId.index(), repository_id));
        }
        if let Some(analysis) = data.analysis {
            out.push(Assignment::new(FileField::Analysis.index(), analysis));
        }
        if let Some(short_summary) = data.short_summary {
            out.push(Assignment::new(FileField::ShortSummary.index(), short_summary));
        }
        out
    }

    fn unique_key(&self) -> FileUnique {
        FileUnique::Id(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        let file = File::from_create(
            CreateFile {
                path: "src/Main.RS".to_string(),
                name: "Main.RS".to_string(),
                repository_id: "r1".to_string(),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(file.extension().as_deref(), Some("rs"));
        assert!(!file.is_analyzed());
    }
}
