use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{User, UserField};
use crate::domain::schema::{
    generate_id, Entity, FieldDescriptor, FieldKind, ForeignKeyDescriptor, ModelDescriptor, ModelField,
    ModelId, OnDelete, Relation, RelationDescriptor, Row, RowReader, UniqueDescriptor, UniqueKey, Value,
};
use crate::domain::stores::{Assignment, StoreError};

/// An external OAuth identity linked to a user. The token fields keep the
/// provider's snake_case names on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub provider: String,
    #[serde(rename = "providerAccountId")]
    pub provider_account_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<i32>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub session_state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountField {
    Id,
    UserId,
    Type,
    Provider,
    ProviderAccountId,
    RefreshToken,
    AccessToken,
    ExpiresAt,
    TokenType,
    Scope,
    IdToken,
    SessionState,
}

impl ModelField for AccountField {
    fn index(self) -> usize {
        self as usize
    }
}

const ACCOUNT_USER: RelationDescriptor = RelationDescriptor {
    name: "user",
    source: ModelId::Account,
    target: ModelId::User,
    local: AccountField::UserId as usize,
    remote: UserField::Id as usize,
    to_many: false,
};

const fn text(name: &'static str, column: &'static str, nullable: bool) -> FieldDescriptor {
    FieldDescriptor {
        name,
        column,
        kind: FieldKind::Text,
        nullable,
    }
}

pub static ACCOUNT_MODEL: ModelDescriptor = ModelDescriptor {
    id: ModelId::Account,
    name: "Account",
    table: "accounts",
    fields: &[
        text("id", "id", false),
        text("userId", "user_id", false),
        text("type", "account_type", false),
        text("provider", "provider", false),
        text("providerAccountId", "provider_account_id", false),
        text("refresh_token", "refresh_token", true),
        text("access_token", "access_token", true),
        FieldDescriptor {
            name: "expires_at",
            column: "expires_at",
            kind: FieldKind::Int,
            nullable: true,
        },
        text("token_type", "token_type", true),
        text("scope", "scope", true),
        text("id_token", "id_token", true),
        text("session_state", "session_state", true),
    ],
    primary_key: AccountField::Id as usize,
    unique: &[
        UniqueDescriptor { name: "accounts_pkey", fields: &[AccountField::Id as usize] },
        UniqueDescriptor {
            name: "accounts_provider_provider_account_id_key",
            fields: &[AccountField::Provider as usize, AccountField::ProviderAccountId as usize],
        },
    ],
    foreign_keys: &[ForeignKeyDescriptor {
        name: "accounts_user_id_fkey",
        field: AccountField::UserId as usize,
        target: ModelId::User,
        on_delete: OnDelete::Cascade,
        scope: None,
        acyclic: None,
    }],
    relations: &[ACCOUNT_USER],
    updated_at: None,
};

#[derive(Debug, Clone, PartialEq)]
pub enum AccountUnique {
    Id(String),
    ProviderAccount {
        provider: String,
        provider_account_id: String,
    },
}

impl UniqueKey for AccountUnique {
    fn constraint(&self) -> &'static UniqueDescriptor {
        match self {
            AccountUnique::Id(_) => &ACCOUNT_MODEL.unique[0],
            AccountUnique::ProviderAccount { .. } => &ACCOUNT_MODEL.unique[1],
        }
    }

    fn values(&self) -> Vec<Value> {
        match self {
            AccountUnique::Id(id) => vec![id.into()],
            AccountUnique::ProviderAccount {
                provider,
                provider_account_id,
            } => vec![provider.into(), provider_account_id.into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateAccount {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub provider: String,
    #[serde(rename = "providerAccountId")]
    pub provider_account_id: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i32>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub session_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateAccount {
    pub user_id: Option<String>,
    pub account_type: Option<String>,
    pub refresh_token: Option<Option<String>>,
    pub access_token: Option<Option<String>>,
    pub expires_at: Option<Option<i32>>,
    pub token_type: Option<Option<String>>,
    pub scope: Option<Option<String>>,
    pub id_token: Option<Option<String>>,
    pub session_state: Option<Option<String>>,
}

impl Account {
    pub const USER: Relation<Account, User> = Relation::new(ACCOUNT_USER);
}

impl Entity for Account {
    type Field = AccountField;
    type Unique = AccountUnique;
    type Create = CreateAccount;
    type Update = UpdateAccount;

    fn model() -> &'static ModelDescriptor {
        &ACCOUNT_MODEL
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        let mut r = RowReader::new(&ACCOUNT_MODEL, row)?;
        Ok(Self {
            id: r.text()?,
            user_id: r.text()?,
            account_type: r.text()?,
            provider: r.text()?,
            provider_account_id: r.text()?,
            refresh_token: r.opt_text()?,
            access_token: r.opt_text()?,
            expires_at: r.opt_int()?,
            token_type: r.opt_text()?,
            scope: r.opt_text()?,
            id_token: r.opt_text()?,
            session_state: r.opt_text()?,
        })
    }

    fn to_row(&self) -> Row {
        vec![
            self.id.clone().into(),
            self.user_id.clone().into(),
            self.account_type.clone().into(),
            self.provider.clone().into(),
            self.provider_account_id.clone().into(),
            self.refresh_token.clone().into(),
            self.access_token.clone().into(),
            self.expires_at.into(),
            self.token_type.clone().into(),
            self.scope.clone().into(),
            self.id_token.clone().into(),
            self.session_state.clone().into(),
        ]
    }

    fn from_create(data: CreateAccount, _now: DateTime<Utc>) -> Self {
        Self {
            id: data.id.unwrap_or_else(generate_id),
            user_id: data.user_id,
            account_type: data.account_type,
            provider: data.provider,
            provider_account_id: data.provider_account_id,
            refresh_token: data.refresh_token,
            access_token: data.access_token,
            expires_at: data.expires_at,
            token_type: data.token_type,
            scope: data.scope,
            id_token: data.id_token,
            session_state: data.session_state,
        }
    }

    fn assignments(data: UpdateAccount) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(user_id) = data.user_id {
            out.push(Assignment::new(AccountField::UserId.index(), user_id));
        }
        if let Some(account_type) = data.account_type {
            out.push(Assignment::new(AccountField::Type.index(), account_type));
        }
        if let Some(refresh_token) = data.refresh_token {
            out.push(Assignment::new(AccountField::RefreshToken.index(), refresh_token));
        }
        if let Some(access_token) = data.access_token {
            out.push(Assignment::new(AccountField::AccessToken.index(), access_token));
        }
        if let Some(expires_at) = data.expires_at {
            out.push(Assignment::new(AccountField::ExpiresAt.index(), expires_at));
        }
        if let Some(token_type) = data.token_type {
            out.push(Assignment::new(AccountField::TokenType.index(), token_type));
        }
        if let Some(scope) = data.scope {
            out.push(Assignment::new(AccountField::Scope.index(), scope));
        }
        if let Some(id_token) = data.id_token {
            out.push(Assignment::new(AccountField::IdToken.index(), id_token));
        }
        if let Some(session_state) = data.session_state {
            out.push(Assignment::new(AccountField::SessionState.index(), session_state));
        }
        out
    }

    fn unique_key(&self) -> AccountUnique {
        AccountUnique::Id(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_fields_keep_snake_case() {
        let account = Account::from_create(
            CreateAccount {
                user_id: "u1".to_string(),
                account_type: "oauth".to_string(),
                provider: "github".to_string(),
                provider_account_id: "42".to_string(),
                access_token: Some("gho_x".to_string()),
                expires_at: Some(1_700_000_000),
                ..Default::default()
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["type"], "oauth");
        assert_eq!(json["providerAccountId"], "42");
        assert_eq!(json["access_token"], "gho_x");
        assert_eq!(json["expires_at"], 1_700_000_000);
        for field in ACCOUNT_MODEL.fields {
            assert!(json.get(field.name).is_some(), "missing {}", field.name);
        }
    }

    #[test]
    fn test_compound_key_values_follow_constraint_order() {
        let key = AccountUnique::ProviderAccount {
            provider: "github".to_string(),
            provider_account_id: "42".to_string(),
        };
        assert_eq!(
            key.constraint().fields,
            &[AccountField::Provider.index(), AccountField::ProviderAccountId.index()]
        );
        assert_eq!(key.values(), vec![Value::from("github"), Value::from("42")]);
    }
}
