use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AuthAccount, SessionRecord};
use crate::errors::ServiceError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Non-deleted account by email, case-insensitive.
    async fn find_live_by_email(&self, email: &str) -> Result<Option<AuthAccount>, ServiceError>;
    /// Creates a self-registered account: role `user`, active.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<AuthAccount, ServiceError>;
    /// Role of the user as stored, deleted or not (mirrors the session
    /// cache fallback lookup).
    async fn user_role(&self, user_id: Uuid) -> Result<Option<String>, ServiceError>;

    async fn create_session(&self, user_id: Uuid, ttl_hours: i64) -> Result<Uuid, ServiceError>;
    /// Valid (unexpired) session for the token.
    async fn find_session(&self, token: Uuid) -> Result<Option<SessionRecord>, ServiceError>;
    async fn cache_session_role(&self, token: Uuid, role: &str) -> Result<(), ServiceError>;
    async fn delete_session(&self, token: Uuid) -> Result<(), ServiceError>;
}

/// Simple in-memory mock repository for unit tests
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        accounts: Mutex<HashMap<Uuid, AuthAccount>>,
        sessions: Mutex<HashMap<Uuid, SessionRecord>>,
    }

    impl MockAuthRepository {
        /// Test helper: seed an account with an arbitrary role/active flag.
        pub fn seed_account(&self, account: AuthAccount) {
            self.accounts.lock().unwrap().insert(account.id, account);
        }

        pub fn set_active(&self, user_id: Uuid, is_active: bool) {
            if let Some(a) = self.accounts.lock().unwrap().get_mut(&user_id) {
                a.is_active = is_active;
            }
        }

        pub fn set_role(&self, user_id: Uuid, role: &str) {
            if let Some(a) = self.accounts.lock().unwrap().get_mut(&user_id) {
                a.role = role.to_string();
            }
        }

        pub fn session_count(&self) -> usize {
            self.sessions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_live_by_email(
            &self,
            email: &str,
        ) -> Result<Option<AuthAccount>, ServiceError> {
            let wanted = email.trim().to_lowercase();
            let accounts = self.accounts.lock().unwrap();
            Ok(accounts.values().find(|a| a.email == wanted).cloned())
        }

        async fn create_user(
            &self,
            name: &str,
            email: &str,
            password_hash: &str,
        ) -> Result<AuthAccount, ServiceError> {
            let account = AuthAccount {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.trim().to_lowercase(),
                role: "user".to_string(),
                is_active: true,
                password_hash: password_hash.to_string(),
            };
            self.accounts.lock().unwrap().insert(account.id, account.clone());
            Ok(account)
        }

        async fn user_role(&self, user_id: Uuid) -> Result<Option<String>, ServiceError> {
            let accounts = self.accounts.lock().unwrap();
            Ok(accounts.get(&user_id).map(|a| a.role.clone()))
        }

        async fn create_session(
            &self,
            user_id: Uuid,
            _ttl_hours: i64,
        ) -> Result<Uuid, ServiceError> {
            let token = Uuid::new_v4();
            self.sessions
                .lock()
                .unwrap()
                .insert(token, SessionRecord { token, user_id, cached_role: None });
            Ok(token)
        }

        async fn find_session(&self, token: Uuid) -> Result<Option<SessionRecord>, ServiceError> {
            Ok(self.sessions.lock().unwrap().get(&token).cloned())
        }

        async fn cache_session_role(&self, token: Uuid, role: &str) -> Result<(), ServiceError> {
            if let Some(s) = self.sessions.lock().unwrap().get_mut(&token) {
                s.cached_role = Some(role.to_string());
            }
            Ok(())
        }

        async fn delete_session(&self, token: Uuid) -> Result<(), ServiceError> {
            self.sessions.lock().unwrap().remove(&token);
            Ok(())
        }
    }
}
