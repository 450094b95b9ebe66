use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{User, UserField};
use crate::domain::schema::{
    generate_id, Entity, FieldDescriptor, FieldKind, ForeignKeyDescriptor, ModelDescriptor, ModelField,
    ModelId, OnDelete, Relation, RelationDescriptor, Row, RowReader, UniqueDescriptor, UniqueKey, Value,
};
use crate::domain::stores::{Assignment, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    Id,
    SessionToken,
    UserId,
    Expires,
}

impl ModelField for SessionField {
    fn index(self) -> usize {
        self as usize
    }
}

const SESSION_USER: RelationDescriptor = RelationDescriptor {
    name: "user",
    source: ModelId::Session,
    target: ModelId::User,
    local: SessionField::UserId as usize,
    remote: UserField::Id as usize,
    to_many: false,
};

pub static SESSION_MODEL: ModelDescriptor = ModelDescriptor {
    id: ModelId::Session,
    name: "Session",
    table: "sessions",
    fields: &[
        FieldDescriptor { name: "id", column: "id", kind: FieldKind::Text, nullable: false },
        FieldDescriptor {
            name: "sessionToken",
            column: "session_token",
            kind: FieldKind::Text,
            nullable: false,
        },
        FieldDescriptor { name: "userId", column: "user_id", kind: FieldKind::Text, nullable: false },
        FieldDescriptor {
            name: "expires",
            column: "expires",
            kind: FieldKind::DateTime,
            nullable: false,
        },
    ],
    primary_key: SessionField::Id as usize,
    unique: &[
        UniqueDescriptor { name: "sessions_pkey", fields: &[SessionField::Id as usize] },
        UniqueDescriptor {
            name: "sessions_session_token_key",
            fields: &[SessionField::SessionToken as usize],
        },
    ],
    foreign_keys: &[ForeignKeyDescriptor {
        name: "sessions_user_id_fkey",
        field: SessionField::UserId as usize,
        target: ModelId::User,
        on_delete: OnDelete::Cascade,
        scope: None,
        acyclic: None,
    }],
    relations: &[SESSION_USER],
    updated_at: None,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionUnique {
    Id(String),
    SessionToken(String),
}

impl UniqueKey for SessionUnique {
    fn constraint(&self) -> &'static UniqueDescriptor {
        match self {
            SessionUnique::Id(_) => &SESSION_MODEL.unique[0],
            SessionUnique::SessionToken(_) => &SESSION_MODEL.unique[1],
        }
    }

    fn values(&self) -> Vec<Value> {
        match self {
            SessionUnique::Id(id) => vec![id.into()],
            SessionUnique::SessionToken(token) => vec![token.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    #[serde(default)]
    pub id: Option<String>,
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSession {
    pub session_token: Option<String>,
    pub user_id: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl Session {
    pub const USER: Relation<Session, User> = Relation::new(SESSION_USER);

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

impl Entity for Session {
    type Field = SessionField;
    type Unique = SessionUnique;
    type Create = CreateSession;
    type Update = UpdateSession;

    fn model() -> &'static ModelDescriptor {
        &SESSION_MODEL
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        let mut r = RowReader::new(&SESSION_MODEL, row)?;
        Ok(Self {
            id: r.text()?,
            session_token: r.text()?,
            user_id: r.text()?,
            expires: r.datetime()?,
        })
    }

    fn to_row(&self) -> Row {
        vec![
            self.id.clone().into(),
            self.session_token.clone().into(),
            self.user_id.clone().into(),
            self.expires.into(),
        ]
    }

    fn from_create(data: CreateSession, _now: DateTime<Utc>) -> Self {
        Self {
            id: data.id.unwrap_or_else(generate_id),
            session_token: data.session_token,
            user_id: data.user_id,
            expires: data.expires,
        }
    }

    fn assignments(data: UpdateSession) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(session_token) = data.session_token {
            out.push(Assignment::new(SessionField::SessionToken.index(), session_token));
        }
        if let Some(user_id) = data.user_id {
            out.push(Assignment::new(SessionField::UserId.index(), user_id));
        }
        if let Some(expires) = data.expires {
            out.push(Assignment::new(SessionField::Expires.index(), expires));
        }
        out
    }

    fn unique_key(&self) -> SessionUnique {
        SessionUnique::Id(self.id.clone())
    }
}
