//! Static description of the persisted models.
//!
//! Every entity publishes a `ModelDescriptor`: its fields, keys, foreign keys
//! and relations. The query engine and both storage backends work from these
//! descriptors, so constraint names and cascade rules live in one place.

pub mod value;

use chrono::{DateTime, Utc};
use std::marker::PhantomData;

use crate::domain::entities::{account, directory, file, log, repository, session, user, verification_token};
use crate::domain::stores::{Assignment, StoreError};

pub use value::{FieldKind, Row, RowReader, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelId {
    User,
    Account,
    Session,
    VerificationToken,
    Repository,
    Directory,
    File,
    Log,
}

impl ModelId {
    pub fn descriptor(self) -> &'static ModelDescriptor {
        match self {
            ModelId::User => &user::USER_MODEL,
            ModelId::Account => &account::ACCOUNT_MODEL,
            ModelId::Session => &session::SESSION_MODEL,
            ModelId::VerificationToken => &verification_token::VERIFICATION_TOKEN_MODEL,
            ModelId::Repository => &repository::REPOSITORY_MODEL,
            ModelId::Directory => &directory::DIRECTORY_MODEL,
            ModelId::File => &file::FILE_MODEL,
            ModelId::Log => &log::LOG_MODEL,
        }
    }
}

pub const ALL_MODELS: [ModelId; 8] = [
    ModelId::User,
    ModelId::Account,
    ModelId::Session,
    ModelId::VerificationToken,
    ModelId::Repository,
    ModelId::Directory,
    ModelId::File,
    ModelId::Log,
];

#[derive(Debug)]
pub struct FieldDescriptor {
    /// Wire name, as serialized.
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

#[derive(Debug)]
pub struct UniqueDescriptor {
    pub name: &'static str,
    pub fields: &'static [usize],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

/// Requires the referenced row to agree with the referencing row on a field,
/// e.g. a directory's parent must belong to the same repository.
#[derive(Debug)]
pub struct ScopeDescriptor {
    pub name: &'static str,
    pub local: usize,
    pub remote: usize,
}

/// Foreign keys always reference the target's primary key.
#[derive(Debug)]
pub struct ForeignKeyDescriptor {
    pub name: &'static str,
    pub field: usize,
    pub target: ModelId,
    pub on_delete: OnDelete,
    pub scope: Option<ScopeDescriptor>,
    /// Self-references only: following the key must never loop back.
    pub acyclic: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub name: &'static str,
    pub source: ModelId,
    pub target: ModelId,
    pub local: usize,
    pub remote: usize,
    pub to_many: bool,
}

#[derive(Debug)]
pub struct ModelDescriptor {
    pub id: ModelId,
    pub name: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub primary_key: usize,
    /// Every unique constraint, primary key first.
    pub unique: &'static [UniqueDescriptor],
    pub foreign_keys: &'static [ForeignKeyDescriptor],
    pub relations: &'static [RelationDescriptor],
    pub updated_at: Option<usize>,
}

impl ModelDescriptor {
    pub fn field(&self, index: usize) -> &FieldDescriptor {
        &self.fields[index]
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn primary_key_field(&self) -> &FieldDescriptor {
        &self.fields[self.primary_key]
    }

    /// Foreign keys in other models that point at this one.
    pub fn referencing_keys(&self) -> Vec<(&'static ModelDescriptor, &'static ForeignKeyDescriptor)> {
        ALL_MODELS
            .iter()
            .map(|id| id.descriptor())
            .flat_map(|model| {
                model
                    .foreign_keys
                    .iter()
                    .filter(|fk| fk.target == self.id)
                    .map(move |fk| (model, fk))
            })
            .collect()
    }

    /// The row's primary key as a string. Every model keys on a text column.
    pub fn key_of(&self, row: &Row) -> Result<String, StoreError> {
        match row.get(self.primary_key) {
            Some(Value::Text(key)) => Ok(key.clone()),
            other => Err(StoreError::Unknown(format!(
                "{} row has a non-text primary key: {:?}",
                self.name, other
            ))),
        }
    }
}

/// Typed handle on one of an entity's fields.
pub trait ModelField: Copy + std::fmt::Debug + PartialEq + Send + Sync + 'static {
    fn index(self) -> usize;
}

/// One of the unique lookups an entity declares (primary key included).
pub trait UniqueKey: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn constraint(&self) -> &'static UniqueDescriptor;

    /// Values for `constraint().fields`, in the same order.
    fn values(&self) -> Vec<Value>;
}

/// A persisted model with a typed Rust representation.
pub trait Entity: Clone + std::fmt::Debug + Send + Sync + Sized + 'static {
    type Field: ModelField;
    type Unique: UniqueKey;
    type Create: Send + 'static;
    type Update: Send + 'static;

    fn model() -> &'static ModelDescriptor;

    fn from_row(row: Row) -> Result<Self, StoreError>;

    fn to_row(&self) -> Row;

    /// Builds the row a create would insert, filling generated defaults.
    fn from_create(data: Self::Create, now: DateTime<Utc>) -> Self;

    fn assignments(data: Self::Update) -> Vec<Assignment>;

    /// Unique key addressing this exact row.
    fn unique_key(&self) -> Self::Unique;
}

/// A typed relation from `E` to `T`.
pub struct Relation<E, T> {
    descriptor: RelationDescriptor,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Relation<E, T> {
    pub const fn new(descriptor: RelationDescriptor) -> Self {
        Self {
            descriptor,
            _marker: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &RelationDescriptor {
        &self.descriptor
    }
}

impl<E, T> Clone for Relation<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Relation<E, T> {}

impl<E, T> std::fmt::Debug for Relation<E, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Relation({})", self.descriptor.name)
    }
}

/// Uuid v4 keys for rows created without an explicit id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_are_consistent() {
        for id in ALL_MODELS {
            let model = id.descriptor();
            assert_eq!(model.id, id);
            assert_eq!(model.unique[0].fields, &[model.primary_key]);
            for fk in model.foreign_keys {
                assert!(fk.field < model.fields.len());
                assert!(matches!(model.fields[fk.field].kind, FieldKind::Text));
            }
            for relation in model.relations {
                assert_eq!(relation.source, id);
                let target = relation.target.descriptor();
                assert!(relation.local < model.fields.len());
                assert!(relation.remote < target.fields.len());
            }
        }
    }

    #[test]
    fn test_repository_is_referenced_by_children() {
        let referencing: Vec<&str> = ModelId::Repository
            .descriptor()
            .referencing_keys()
            .iter()
            .map(|(model, _)| model.name)
            .collect();
        assert_eq!(referencing, vec!["Directory", "File", "Log"]);
    }
}
