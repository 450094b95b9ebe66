use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{File, FileField, Repository, RepositoryField};
use crate::domain::schema::{
    generate_id, Entity, FieldDescriptor, FieldKind, ForeignKeyDescriptor, ModelDescriptor, ModelField,
    ModelId, OnDelete, Relation, RelationDescriptor, Row, RowReader, ScopeDescriptor, UniqueDescriptor,
    UniqueKey, Value,
};
use crate::domain::stores::{Assignment, StoreError};

/// A directory of an ingested repository. Directories form one tree per
/// repository through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub id: String,
    pub path: String,
    pub summary: Option<String>,
    pub repository_id: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryField {
    Id,
    Path,
    Summary,
    RepositoryId,
    ParentId,
    CreatedAt,
    UpdatedAt,
}

impl ModelField for DirectoryField {
    fn index(self) -> usize {
        self as usize
    }
}

const DIRECTORY_REPOSITORY: RelationDescriptor = RelationDescriptor {
    name: "repository",
    source: ModelId::Directory,
    target: ModelId::Repository,
    local: DirectoryField::RepositoryId as usize,
    remote: RepositoryField::Id as usize,
    to_many: false,
};

const DIRECTORY_PARENT: RelationDescriptor = RelationDescriptor {
    name: "parent",
    source: ModelId::Directory,
    target: ModelId::Directory,
    local: DirectoryField::ParentId as usize,
    remote: DirectoryField::Id as usize,
    to_many: false,
};

const DIRECTORY_CHILDREN: RelationDescriptor = RelationDescriptor {
    name: "children",
    source: ModelId::Directory,
    target: ModelId::Directory,
    local: DirectoryField::Id as usize,
    remote: DirectoryField::ParentId as usize,
    to_many: true,
};

const DIRECTORY_FILES: RelationDescriptor = RelationDescriptor {
    name: "files",
    source: ModelId::Directory,
    target: ModelId::File,
    local: DirectoryField::Id as usize,
    remote: FileField::DirectoryId as usize,
    to_many: true,
};

pub static DIRECTORY_MODEL: ModelDescriptor = ModelDescriptor {
    id: ModelId::Directory,
    name: "Directory",
    table: "directories",
    fields: &[
        FieldDescriptor { name: "id", column: "id", kind: FieldKind::Text, nullable: false },
        FieldDescriptor { name: "path", column: "path", kind: FieldKind::Text, nullable: false },
        FieldDescriptor { name: "summary", column: "summary", kind: FieldKind::Text, nullable: true },
        FieldDescriptor {
            name: "repositoryId",
            column: "repository_id",
            kind: FieldKind::Text,
            nullable: false,
        },
        FieldDescriptor { name: "parentId", column: "parent_id", kind: FieldKind::Text, nullable: true },
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
    ],
    primary_key: DirectoryField::Id as usize,
    unique: &[UniqueDescriptor {
        name: "directories_pkey",
        fields: &[DirectoryField::Id as usize],
    }],
    foreign_keys: &[
        ForeignKeyDescriptor {
            name: "directories_repository_id_fkey",
            field: DirectoryField::RepositoryId as usize,
            target: ModelId::Repository,
            on_delete: OnDelete::Cascade,
            scope: None,
            acyclic: None,
        },
        ForeignKeyDescriptor {
            name: "directories_parent_id_fkey",
            field: DirectoryField::ParentId as usize,
            target: ModelId::Directory,
            on_delete: OnDelete::Cascade,
            scope: Some(ScopeDescriptor {
                name: "directories_parent_same_repository",
                local: DirectoryField::RepositoryId as usize,
                remote: DirectoryField::RepositoryId as usize,
            }),
            acyclic: Some("directories_parent_acyclic"),
        },
    ],
    relations: &[
        DIRECTORY_REPOSITORY,
        DIRECTORY_PARENT,
        DIRECTORY_CHILDREN,
        DIRECTORY_FILES,
    ],
    updated_at: Some(DirectoryField::UpdatedAt as usize),
};

#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryUnique {
    Id(String),
}

impl UniqueKey for DirectoryUnique {
    fn constraint(&self) -> &'static UniqueDescriptor {
        &DIRECTORY_MODEL.unique[0]
    }

    fn values(&self) -> Vec<Value> {
        match self {
            DirectoryUnique::Id(id) => vec![id.into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectory {
    #[serde(default)]
    pub id: Option<String>,
    pub path: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub repository_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDirectory {
    pub path: Option<String>,
    pub summary: Option<Option<String>>,
    pub repository_id: Option<String>,
    pub parent_id: Option<Option<String>>,
}

impl Directory {
    pub const REPOSITORY: Relation<Directory, Repository> = Relation::new(DIRECTORY_REPOSITORY);
    pub const PARENT: Relation<Directory, Directory> = Relation::new(DIRECTORY_PARENT);
    pub const CHILDREN: Relation<Directory, Directory> = Relation::new(DIRECTORY_CHILDREN);
    pub const FILES: Relation<Directory, File> = Relation::new(DIRECTORY_FILES);

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.path)
    }
}

impl Entity for Directory {
    type Field = DirectoryField;
    type Unique = DirectoryUnique;
    type Create = CreateDirectory;
    type Update = UpdateDirectory;

    fn model() -> &'static ModelDescriptor {
        &DIRECTORY_MODEL
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        let mut r = RowReader::new(&DIRECTORY_MODEL, row)?;
        Ok(Self {
            id: r.text()?,
            path: r.text()?,
            summary: r.opt_text()?,
            repository_id: r.text()?,
            parent_id: r.opt_text()?,
            created_at: r.datetime()?,
            updated_at: r.datetime()?,
        })
    }

    fn to_row(&self) -> Row {
        vec![
            self.id.clone().into(),
            self.path.clone().into(),
            self.summary.clone().into(),
            self.repository_id.clone().into(),
            self.parent_id.clone().into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_create(data: CreateDirectory, now: DateTime<Utc>) -> Self {
        Self {
            id: data.id.unwrap_or_else(generate_id),
            path: data.path,
            summary: data.summary,
            repository_id: data.repository_id,
            parent_id: data.parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn assignments(data: UpdateDirectory) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(path) = data.path {
            out.push(Assignment::new(DirectoryField::Path.index(), path));
        }
        if let Some(summary) = data.summary {
            out.push(Assignment::new(DirectoryField::Summary.index(), summary));
        }
        if let Some(repository_id) = data.repository_id {
            out.push(Assignment::new(DirectoryField::RepositoryId.index(), repository_id));
        }
        if let Some(parent_id) = data.parent_id {
            out.push(Assignment::new(DirectoryField::ParentId.index(), parent_id));
        }
        out
    }

    fn unique_key(&self) -> DirectoryUnique {
        DirectoryUnique::Id(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_last_segment() {
        let dir = Directory::from_create(
            CreateDirectory {
                path: "src/domain/".to_string(),
                repository_id: "r1".to_string(),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(dir.name(), "domain");
        assert!(dir.is_root());
    }

    #[test]
    fn test_parent_key_is_scoped_and_acyclic() {
        let fk = &DIRECTORY_MODEL.foreign_keys[1];
        assert_eq!(fk.target, ModelId::Directory);
        assert!(fk.scope.is_some());
        assert!(fk.acyclic.is_some());
    }
}
