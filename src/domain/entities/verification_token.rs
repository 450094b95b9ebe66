use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::schema::{
    Entity, FieldDescriptor, FieldKind, ModelDescriptor, ModelField, ModelId, Row, RowReader,
    UniqueDescriptor, UniqueKey, Value,
};
use crate::domain::stores::{Assignment, StoreError};

/// One-time sign-in token. `token` is the row identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationTokenField {
    Identifier,
    Token,
    Expires,
}

impl ModelField for VerificationTokenField {
    fn index(self) -> usize {
        self as usize
    }
}

pub static VERIFICATION_TOKEN_MODEL: ModelDescriptor = ModelDescriptor {
    id: ModelId::VerificationToken,
    name: "VerificationToken",
    table: "verification_tokens",
    fields: &[
        FieldDescriptor {
            name: "identifier",
            column: "identifier",
            kind: FieldKind::Text,
            nullable: false,
        },
        FieldDescriptor { name: "token", column: "token", kind: FieldKind::Text, nullable: false },
        FieldDescriptor {
            name: "expires",
            column: "expires",
            kind: FieldKind::DateTime,
            nullable: false,
        },
    ],
    primary_key: VerificationTokenField::Token as usize,
    unique: &[
        UniqueDescriptor {
            name: "verification_tokens_pkey",
            fields: &[VerificationTokenField::Token as usize],
        },
        UniqueDescriptor {
            name: "verification_tokens_identifier_token_key",
            fields: &[
                VerificationTokenField::Identifier as usize,
                VerificationTokenField::Token as usize,
            ],
        },
    ],
    foreign_keys: &[],
    relations: &[],
    updated_at: None,
};

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationTokenUnique {
    Token(String),
    IdentifierToken { identifier: String, token: String },
}

impl UniqueKey for VerificationTokenUnique {
    fn constraint(&self) -> &'static UniqueDescriptor {
        match self {
            VerificationTokenUnique::Token(_) => &VERIFICATION_TOKEN_MODEL.unique[0],
            VerificationTokenUnique::IdentifierToken { .. } => &VERIFICATION_TOKEN_MODEL.unique[1],
        }
    }

    fn values(&self) -> Vec<Value> {
        match self {
            VerificationTokenUnique::Token(token) => vec![token.into()],
            VerificationTokenUnique::IdentifierToken { identifier, token } => {
                vec![identifier.into(), token.into()]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateVerificationToken {
    pub identifier: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl Entity for VerificationToken {
    type Field = VerificationTokenField;
    type Unique = VerificationTokenUnique;
    type Create = CreateVerificationToken;
    type Update = UpdateVerificationToken;

    fn model() -> &'static ModelDescriptor {
        &VERIFICATION_TOKEN_MODEL
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        let mut r = RowReader::new(&VERIFICATION_TOKEN_MODEL, row)?;
        Ok(Self {
            identifier: r.text()?,
            token: r.text()?,
            expires: r.datetime()?,
        })
    }

    fn to_row(&self) -> Row {
        vec![
            self.identifier.clone().into(),
            self.token.clone().into(),
            self.expires.into(),
        ]
    }

    fn from_create(data: CreateVerificationToken, _now: DateTime<Utc>) -> Self {
        Self {
            identifier: data.identifier,
            token: data.token,
            expires: data.expires,
        }
    }

    fn assignments(data: UpdateVerificationToken) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(identifier) = data.identifier {
            out.push(Assignment::new(VerificationTokenField::Identifier.index(), identifier));
        }
        if let Some(expires) = data.expires {
            out.push(Assignment::new(VerificationTokenField::Expires.index(), expires));
        }
        out
    }

    fn unique_key(&self) -> VerificationTokenUnique {
        VerificationTokenUnique::Token(self.token.clone())
    }
}
