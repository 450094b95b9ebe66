use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::schema::Row;
use crate::infrastructure::database::schema::{accounts, sessions, users, verification_tokens};

#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserModel {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserModel> for Row {
    fn from(model: UserModel) -> Self {
        vec![
            model.id.into(),
            model.name.into(),
            model.email.into(),
            model.email_verified.into(),
            model.image.into(),
            model.created_at.into(),
            model.updated_at.into(),
        ]
    }
}

#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountModel {
    pub id: String,
    pub user_id: String,
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<i32>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub session_state: Option<String>,
}

impl From<AccountModel> for Row {
    fn from(model: AccountModel) -> Self {
        vec![
            model.id.into(),
            model.user_id.into(),
            model.account_type.into(),
            model.provider.into(),
            model.provider_account_id.into(),
            model.refresh_token.into(),
            model.access_token.into(),
            model.expires_at.into(),
            model.token_type.into(),
            model.scope.into(),
            model.id_token.into(),
            model.session_state.into(),
        ]
    }
}

#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionModel {
    pub id: String,
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

impl From<SessionModel> for Row {
    fn from(model: SessionModel) -> Self {
        vec![
            model.id.into(),
            model.session_token.into(),
            model.user_id.into(),
            model.expires.into(),
        ]
    }
}

#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = verification_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VerificationTokenModel {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl From<VerificationTokenModel> for Row {
    fn from(model: VerificationTokenModel) -> Self {
        vec![
            model.identifier.into(),
            model.token.into(),
            model.expires.into(),
        ]
    }
}
