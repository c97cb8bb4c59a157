use async_trait::async_trait;
use uuid::Uuid;

use super::domain::UserAccount;
use crate::auth::domain::Role;
use crate::errors::ServiceError;

/// Repository abstraction for account administration.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Non-deleted accounts, newest first.
    async fn list(&self) -> Result<Vec<UserAccount>, ServiceError>;
    async fn find(&self, id: Uuid) -> Result<Option<UserAccount>, ServiceError>;
    /// Whether a non-deleted account other than `exclude` holds the email.
    async fn email_in_use(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError>;

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<UserAccount, ServiceError>;
    /// `password_hash` replaces the stored hash only when `Some`.
    async fn update(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        role: Role,
        password_hash: Option<String>,
    ) -> Result<UserAccount, ServiceError>;
    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), ServiceError>;
    /// Soft delete; also deactivates the account.
    async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError>;
}

/// Simple in-memory mock repository for unit tests
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct Row {
        account: UserAccount,
        password_hash: String,
        deleted: bool,
    }

    #[derive(Default)]
    pub struct MockUserRepository {
        rows: Mutex<HashMap<Uuid, Row>>,
        // preserves creation order for list()
        order: Mutex<Vec<Uuid>>,
    }

    impl MockUserRepository {
        pub fn password_hash_of(&self, id: Uuid) -> Option<String> {
            self.rows.lock().unwrap().get(&id).map(|r| r.password_hash.clone())
        }

        pub fn is_deleted(&self, id: Uuid) -> bool {
            self.rows.lock().unwrap().get(&id).map(|r| r.deleted).unwrap_or(false)
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn list(&self) -> Result<Vec<UserAccount>, ServiceError> {
            let rows = self.rows.lock().unwrap();
            let order = self.order.lock().unwrap();
            Ok(order
                .iter()
                .rev()
                .filter_map(|id| rows.get(id))
                .filter(|r| !r.deleted)
                .map(|r| r.account.clone())
                .collect())
        }

        async fn find(&self, id: Uuid) -> Result<Option<UserAccount>, ServiceError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.get(&id).filter(|r| !r.deleted).map(|r| r.account.clone()))
        }

        async fn email_in_use(
            &self,
            email: &str,
            exclude: Option<Uuid>,
        ) -> Result<bool, ServiceError> {
            let wanted = email.trim().to_lowercase();
            let rows = self.rows.lock().unwrap();
            Ok(rows.values().any(|r| {
                !r.deleted && r.account.email == wanted && Some(r.account.id) != exclude
            }))
        }

        async fn create(
            &self,
            name: &str,
            email: &str,
            password_hash: &str,
            role: Role,
        ) -> Result<UserAccount, ServiceError> {
            let now = Utc::now().into();
            let account = UserAccount {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.trim().to_lowercase(),
                role,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            self.rows.lock().unwrap().insert(
                account.id,
                Row { account: account.clone(), password_hash: password_hash.to_string(), deleted: false },
            );
            self.order.lock().unwrap().push(account.id);
            Ok(account)
        }

        async fn update(
            &self,
            id: Uuid,
            name: &str,
            email: &str,
            role: Role,
            password_hash: Option<String>,
        ) -> Result<UserAccount, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.get_mut(&id).ok_or_else(|| ServiceError::not_found("user"))?;
            row.account.name = name.to_string();
            row.account.email = email.trim().to_lowercase();
            row.account.role = role;
            row.account.updated_at = Utc::now().into();
            if let Some(hash) = password_hash {
                row.password_hash = hash;
            }
            Ok(row.account.clone())
        }

        async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.get_mut(&id).ok_or_else(|| ServiceError::not_found("user"))?;
            row.account.is_active = is_active;
            row.account.updated_at = Utc::now().into();
            Ok(())
        }

        async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.get_mut(&id).ok_or_else(|| ServiceError::not_found("user"))?;
            row.deleted = true;
            row.account.is_active = false;
            row.account.updated_at = Utc::now().into();
            Ok(())
        }
    }
}
