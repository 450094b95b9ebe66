use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Account, AccountField, Repository, RepositoryField, Session, SessionField};
use crate::domain::schema::{
    generate_id, Entity, FieldDescriptor, FieldKind, ModelDescriptor, ModelField, ModelId, Relation,
    RelationDescriptor, Row, RowReader, UniqueDescriptor, UniqueKey, Value,
};
use crate::domain::stores::{Assignment, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Id,
    Name,
    Email,
    EmailVerified,
    Image,
    CreatedAt,
    UpdatedAt,
}

impl ModelField for UserField {
    fn index(self) -> usize {
        self as usize
    }
}

const USER_ACCOUNTS: RelationDescriptor = RelationDescriptor {
    name: "accounts",
    source: ModelId::User,
    target: ModelId::Account,
    local: UserField::Id as usize,
    remote: AccountField::UserId as usize,
    to_many: true,
};

const USER_SESSIONS: RelationDescriptor = RelationDescriptor {
    name: "sessions",
    source: ModelId::User,
    target: ModelId::Session,
    local: UserField::Id as usize,
    remote: SessionField::UserId as usize,
    to_many: true,
};

const USER_REPOSITORIES: RelationDescriptor = RelationDescriptor {
    name: "repositories",
    source: ModelId::User,
    target: ModelId::Repository,
    local: UserField::Id as usize,
    remote: RepositoryField::UserId as usize,
    to_many: true,
};

pub static USER_MODEL: ModelDescriptor = ModelDescriptor {
    id: ModelId::User,
    name: "User",
    table: "users",
    fields: &[
        FieldDescriptor { name: "id", column: "id", kind: FieldKind::Text, nullable: false },
        FieldDescriptor { name: "name", column: "name", kind: FieldKind::Text, nullable: true },
        FieldDescriptor { name: "email", column: "email", kind: FieldKind::Text, nullable: false },
        FieldDescriptor {
            name: "emailVerified",
            column: "email_verified",
            kind: FieldKind::DateTime,
            nullable: true,
        },
        FieldDescriptor { name: "image", column: "image", kind: FieldKind::Text, nullable: true },
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
    primary_key: UserField::Id as usize,
    unique: &[
        UniqueDescriptor { name: "users_pkey", fields: &[UserField::Id as usize] },
        UniqueDescriptor { name: "users_email_key", fields: &[UserField::Email as usize] },
    ],
    foreign_keys: &[],
    relations: &[USER_ACCOUNTS, USER_SESSIONS, USER_REPOSITORIES],
    updated_at: Some(UserField::UpdatedAt as usize),
};

#[derive(Debug, Clone, PartialEq)]
pub enum UserUnique {
    Id(String),
    Email(String),
}

impl UniqueKey for UserUnique {
    fn constraint(&self) -> &'static UniqueDescriptor {
        match self {
            UserUnique::Id(_) => &USER_MODEL.unique[0],
            UserUnique::Email(_) => &USER_MODEL.unique[1],
        }
    }

    fn values(&self) -> Vec<Value> {
        match self {
            UserUnique::Id(id) => vec![id.into()],
            UserUnique::Email(email) => vec![email.into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image: Option<String>,
}

/// `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateUser {
    pub id: Option<String>,
    pub name: Option<Option<String>>,
    pub email: Option<String>,
    pub email_verified: Option<Option<DateTime<Utc>>>,
    pub image: Option<Option<String>>,
}

impl User {
    pub const ACCOUNTS: Relation<User, Account> = Relation::new(USER_ACCOUNTS);
    pub const SESSIONS: Relation<User, Session> = Relation::new(USER_SESSIONS);
    pub const REPOSITORIES: Relation<User, Repository> = Relation::new(USER_REPOSITORIES);
}

impl Entity for User {
    type Field = UserField;
    type Unique = UserUnique;
    type Create = CreateUser;
    type Update = UpdateUser;

    fn model() -> &'static ModelDescriptor {
        &USER_MODEL
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        let mut r = RowReader::new(&USER_MODEL, row)?;
        Ok(Self {
            id: r.text()?,
            name: r.opt_text()?,
            email: r.text()?,
            email_verified: r.opt_datetime()?,
            image: r.opt_text()?,
            created_at: r.datetime()?,
            updated_at: r.datetime()?,
        })
    }

    fn to_row(&self) -> Row {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.email.clone().into(),
            self.email_verified.into(),
            self.image.clone().into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_create(data: CreateUser, now: DateTime<Utc>) -> Self {
        Self {
            id: data.id.unwrap_or_else(generate_id),
            name: data.name,
            email: data.email,
            email_verified: data.email_verified,
            image: data.image,
            created_at: now,
            updated_at: now,
        }
    }

    fn assignments(data: UpdateUser) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(id) = data.id {
            out.push(Assignment::new(UserField::Id.index(), id));
        }
        if let Some(name) = data.name {
            out.push(Assignment::new(UserField::Name.index(), name));
        }
        if let Some(email) = data.email {
            out.push(Assignment::new(UserField::Email.index(), email));
        }
        if let Some(email_verified) = data.email_verified {
            out.push(Assignment::new(UserField::EmailVerified.index(), email_verified));
        }
        if let Some(image) = data.image {
            out.push(Assignment::new(UserField::Image.index(), image));
        }
        out
    }

    fn unique_key(&self) -> UserUnique {
        UserUnique::Id(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_create_fills_defaults() {
        let now = Utc::now();
        let user = User::from_create(
            CreateUser {
                email: "ada@example.com".to_string(),
                ..Default::default()
            },
            now,
        );
        assert!(uuid::Uuid::parse_str(&user.id).is_ok());
        assert_eq!(user.created_at, now);
        assert_eq!(user.updated_at, now);
        assert_eq!(User::from_row(user.to_row()).unwrap(), user);
    }

    #[test]
    fn test_update_assignments_distinguish_clear_from_skip() {
        let assignments = User::assignments(UpdateUser {
            name: Some(None),
            ..Default::default()
        });
        assert_eq!(
            assignments,
            vec![Assignment::new(UserField::Name.index(), Value::Null)]
        );
    }

    #[test]
    fn test_serializes_camel_case() {
        let user = User::from_create(
            CreateUser {
                email: "ada@example.com".to_string(),
                ..Default::default()
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("emailVerified").is_some());
        assert!(json.get("createdAt").is_some());
        let names: Vec<&str> = USER_MODEL.fields.iter().map(|f| f.name).collect();
        for name in names {
            assert!(json.get(name).is_some(), "missing {}", name);
        }
    }
}
