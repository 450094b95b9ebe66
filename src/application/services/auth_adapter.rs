use serde::Serialize;
use tracing::{debug, info};

use crate::domain::entities::{
    Account, AccountUnique, CreateAccount, CreateSession, CreateUser, CreateVerificationToken,
    Session, SessionUnique, UpdateSession, UpdateUser, User, UserUnique, VerificationToken,
    VerificationTokenUnique,
};
use crate::domain::stores::{Store, StoreResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionAndUser {
    pub session: Session,
    pub user: User,
}

/// The persistence half of a NextAuth adapter: users, linked OAuth accounts,
/// database sessions and email verification tokens.
#[derive(Clone)]
pub struct AuthAdapter {
    store: Store,
}

impl AuthAdapter {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let user = self.store.users().create(data).await?;
        info!("Created user {}", user.id);
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.store.users().find_unique(UserUnique::Id(id.to_string())).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.store
            .users()
            .find_unique(UserUnique::Email(email.to_string()))
            .await
    }

    pub async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> StoreResult<Option<User>> {
        let key = AccountUnique::ProviderAccount {
            provider: provider.to_string(),
            provider_account_id: provider_account_id.to_string(),
        };
        self.store
            .run(move |tx| match tx.find_unique::<Account>(&key)? {
                Some(account) => tx.related_one(&account, Account::USER),
                None => Ok(None),
            })
            .await
    }

    pub async fn update_user(&self, id: &str, data: UpdateUser) -> StoreResult<User> {
        self.store
            .users()
            .update(UserUnique::Id(id.to_string()), data)
            .await
    }

    /// Deletes the user together with their accounts, sessions and
    /// repositories.
    pub async fn delete_user(&self, id: &str) -> StoreResult<Option<User>> {
        let deleted = found(self.store.users().delete(UserUnique::Id(id.to_string())).await)?;
        if deleted.is_some() {
            info!("Deleted user {}", id);
        }
        Ok(deleted)
    }

    pub async fn link_account(&self, data: CreateAccount) -> StoreResult<Account> {
        let account = self.store.accounts().create(data).await?;
        debug!(
            "Linked {} account {} to user {}",
            account.provider, account.provider_account_id, account.user_id
        );
        Ok(account)
    }

    pub async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> StoreResult<Option<Account>> {
        found(
            self.store
                .accounts()
                .delete(AccountUnique::ProviderAccount {
                    provider: provider.to_string(),
                    provider_account_id: provider_account_id.to_string(),
                })
                .await,
        )
    }

    pub async fn create_session(&self, data: CreateSession) -> StoreResult<Session> {
        self.store.sessions().create(data).await
    }

    pub async fn get_session_and_user(&self, session_token: &str) -> StoreResult<Option<SessionAndUser>> {
        let key = SessionUnique::SessionToken(session_token.to_string());
        self.store
            .run(move |tx| {
                let Some(session) = tx.find_unique::<Session>(&key)? else {
                    return Ok(None);
                };
                let user = tx.related_one(&session, Session::USER)?;
                Ok(user.map(|user| SessionAndUser { session, user }))
            })
            .await
    }

    pub async fn update_session(&self, session_token: &str, data: UpdateSession) -> StoreResult<Option<Session>> {
        found(
            self.store
                .sessions()
                .update(SessionUnique::SessionToken(session_token.to_string()), data)
                .await,
        )
    }

    pub async fn delete_session(&self, session_token: &str) -> StoreResult<Option<Session>> {
        found(
            self.store
                .sessions()
                .delete(SessionUnique::SessionToken(session_token.to_string()))
                .await,
        )
    }

    pub async fn create_verification_token(
        &self,
        data: CreateVerificationToken,
    ) -> StoreResult<VerificationToken> {
        self.store.verification_tokens().create(data).await
    }

    /// Consumes a verification token: returns it and deletes it, or `None`
    /// when no such token exists.
    pub async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> StoreResult<Option<VerificationToken>> {
        found(
            self.store
                .verification_tokens()
                .delete(VerificationTokenUnique::IdentifierToken {
                    identifier: identifier.to_string(),
                    token: token.to_string(),
                })
                .await,
        )
    }
}

fn found<T>(result: StoreResult<T>) -> StoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    use crate::domain::stores::TransactionOptions;
    use crate::infrastructure::memory::MemoryBackend;

    fn adapter() -> AuthAdapter {
        AuthAdapter::new(Store::new(
            Arc::new(MemoryBackend::new()),
            TransactionOptions::default(),
        ))
    }

    async fn user_with_account(adapter: &AuthAdapter) -> User {
        let user = adapter
            .create_user(CreateUser {
                email: "ada@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        adapter
            .link_account(CreateAccount {
                user_id: user.id.clone(),
                account_type: "oauth".to_string(),
                provider: "github".to_string(),
                provider_account_id: "1001".to_string(),
                access_token: Some("gho_token".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn test_get_user_by_account() {
        let adapter = adapter();
        let user = user_with_account(&adapter).await;

        let found = adapter.get_user_by_account("github", "1001").await.unwrap();
        assert_eq!(found, Some(user.clone()));
        assert!(adapter.get_user_by_account("gitlab", "1001").await.unwrap().is_none());

        let unlinked = adapter.unlink_account("github", "1001").await.unwrap();
        assert_eq!(unlinked.map(|a| a.user_id), Some(user.id));
        assert!(adapter.get_user_by_account("github", "1001").await.unwrap().is_none());
        assert!(adapter.unlink_account("github", "1001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let adapter = adapter();
        let user = user_with_account(&adapter).await;
        let expires = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        adapter
            .create_session(CreateSession {
                id: None,
                session_token: "st_1".to_string(),
                user_id: user.id.clone(),
                expires,
            })
            .await
            .unwrap();

        let pair = adapter.get_session_and_user("st_1").await.unwrap().unwrap();
        assert_eq!(pair.user, user);
        assert_eq!(pair.session.expires, expires);

        let later = expires + Duration::days(1);
        let updated = adapter
            .update_session(
                "st_1",
                UpdateSession {
                    expires: Some(later),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.map(|s| s.expires), Some(later));
        assert!(
            adapter
                .update_session("missing", UpdateSession::default())
                .await
                .unwrap()
                .is_none()
        );

        assert!(adapter.delete_session("st_1").await.unwrap().is_some());
        assert!(adapter.get_session_and_user("st_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verification_token_is_consumed_once() {
        let adapter = adapter();
        adapter
            .create_verification_token(CreateVerificationToken {
                identifier: "ada@example.com".to_string(),
                token: "magic".to_string(),
                expires: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();

        assert!(adapter.use_verification_token("bob@example.com", "magic").await.unwrap().is_none());
        let used = adapter.use_verification_token("ada@example.com", "magic").await.unwrap();
        assert_eq!(used.map(|t| t.token), Some("magic".to_string()));
        assert!(adapter.use_verification_token("ada@example.com", "magic").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user_removes_sessions_and_accounts() {
        let adapter = adapter();
        let user = user_with_account(&adapter).await;
        adapter
            .create_session(CreateSession {
                id: None,
                session_token: "st_2".to_string(),
                user_id: user.id.clone(),
                expires: Utc::now(),
            })
            .await
            .unwrap();

        assert!(adapter.delete_user(&user.id).await.unwrap().is_some());
        assert!(adapter.get_user_by_email("ada@example.com").await.unwrap().is_none());
        assert!(adapter.get_session_and_user("st_2").await.unwrap().is_none());
        assert!(adapter.get_user_by_account("github", "1001").await.unwrap().is_none());
        assert!(adapter.delete_user(&user.id).await.unwrap().is_none());
    }
}
