use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::domain::{AuthContext, AuthUser, LoginInput, RegisterInput, Role};
use super::repository::AuthRepository;
use crate::errors::ServiceError;
use crate::password;

/// Tunables for the auth service, sourced from the app config.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub session_ttl_hours: i64,
    pub min_password_len: usize,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self { session_ttl_hours: 24, min_password_len: 8 }
    }
}

/// Registration, login/logout and session resolution over a pluggable store.
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    settings: AuthSettings,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, settings: AuthSettings) -> Self {
        Self { repo, settings }
    }

    /// Self-registration. New accounts are plain `user`s and active.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, ServiceError> {
        let name = input.name.trim();
        let email = input.email.trim().to_lowercase();

        let mut fields = HashMap::new();
        if name.chars().count() < 2 {
            fields.insert("name".into(), "name must be at least 2 characters".into());
        }
        if models::user::validate_email(&email).is_err() {
            fields.insert("email".into(), "invalid email address".into());
        }
        if input.password.chars().count() < self.settings.min_password_len {
            fields.insert(
                "password".into(),
                format!("password must be at least {} characters", self.settings.min_password_len),
            );
        }
        if !fields.is_empty() {
            return Err(ServiceError::field_errors("validation failed", fields));
        }

        if self.repo.find_live_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict("email already registered"));
        }

        let hash = password::hash(&input.password)?;
        let account = self.repo.create_user(name, &email, &hash).await?;
        info!(user_id = %account.id, "user registered");

        Ok(AuthUser {
            id: account.id,
            name: account.name,
            email: account.email,
            role: Role::parse(&account.role).unwrap_or(Role::User),
        })
    }

    /// Verifies credentials and issues a fresh session token. Unknown email
    /// and wrong password produce the same generic error.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<(Uuid, AuthUser), ServiceError> {
        let email = input.email.trim().to_lowercase();

        let account = match self.repo.find_live_by_email(&email).await? {
            Some(a) => a,
            None => {
                // Burn a verify anyway so the timing does not leak whether
                // the email exists.
                let _ = password::verify(&input.password, "");
                return Err(ServiceError::unauthenticated("invalid credentials"));
            }
        };

        if !password::verify(&input.password, &account.password_hash) {
            return Err(ServiceError::unauthenticated("invalid credentials"));
        }
        if !account.is_active {
            return Err(ServiceError::forbidden("account is deactivated"));
        }

        let role = Role::parse(&account.role)
            .ok_or_else(|| ServiceError::forbidden("account has no valid role"))?;
        let token = self.repo.create_session(account.id, self.settings.session_ttl_hours).await?;
        info!(user_id = %account.id, "login succeeded");

        Ok((
            token,
            AuthUser { id: account.id, name: account.name, email: account.email, role },
        ))
    }

    /// Deletes the session if it exists. Safe to call with a stale token.
    #[instrument(skip(self))]
    pub async fn logout(&self, token: Uuid) -> Result<(), ServiceError> {
        self.repo.delete_session(token).await?;
        info!("session cleared");
        Ok(())
    }

    /// Resolves a session token into a request-scoped [`AuthContext`]. The
    /// role is cached on the session row on first resolution and reused
    /// until logout.
    pub async fn resolve_session(&self, token: Uuid) -> Result<AuthContext, ServiceError> {
        let session = self
            .repo
            .find_session(token)
            .await?
            .ok_or_else(|| ServiceError::unauthenticated("session expired or invalid"))?;

        let role_str = match session.cached_role {
            Some(r) => r,
            None => {
                let role = self
                    .repo
                    .user_role(session.user_id)
                    .await?
                    .ok_or_else(|| ServiceError::unauthenticated("session expired or invalid"))?;
                self.repo.cache_session_role(token, &role).await?;
                role
            }
        };

        let role = Role::parse(&role_str).ok_or_else(|| {
            warn!(user_id = %session.user_id, role = %role_str, "unrecognized role on session");
            ServiceError::forbidden("account has no valid role")
        })?;

        Ok(AuthContext { user_id: session.user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::domain::AuthAccount;
    use crate::auth::repository::mock::MockAuthRepository;

    fn service() -> AuthService<MockAuthRepository> {
        AuthService::new(Arc::new(MockAuthRepository::default()), AuthSettings::default())
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "Alice Example".into(),
            email: email.into(),
            password: "hunter2hunter2".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let svc = service();
        let user = svc.register(register_input("Alice@Example.com")).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::User);

        let (token, logged_in) = svc
            .login(LoginInput { email: "alice@example.com".into(), password: "hunter2hunter2".into() })
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let ctx = svc.resolve_session(token).await.unwrap();
        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.role, Role::User);
    }

    #[tokio::test]
    async fn register_rejects_bad_fields_with_field_map() {
        let svc = service();
        let err = svc
            .register(RegisterInput {
                name: "A".into(),
                email: "not-an-email".into(),
                password: "short".into(),
            })
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation { fields: Some(fields), .. } => {
                assert!(fields.contains_key("name"));
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("password"));
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let svc = service();
        svc.register(register_input("dup@example.com")).await.unwrap();
        let err = svc.register(register_input("DUP@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_is_generic_on_unknown_email_and_wrong_password() {
        let svc = service();
        svc.register(register_input("bob@example.com")).await.unwrap();

        let unknown = svc
            .login(LoginInput { email: "nobody@example.com".into(), password: "whatever123".into() })
            .await
            .unwrap_err();
        let wrong = svc
            .login(LoginInput { email: "bob@example.com".into(), password: "wrongwrong".into() })
            .await
            .unwrap_err();
        assert!(matches!(unknown, ServiceError::Unauthenticated(_)));
        assert!(matches!(wrong, ServiceError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn login_refuses_deactivated_account() {
        let svc = service();
        let user = svc.register(register_input("carol@example.com")).await.unwrap();
        svc.repo.set_active(user.id, false);

        let err = svc
            .login(LoginInput { email: "carol@example.com".into(), password: "hunter2hunter2".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let svc = service();
        svc.register(register_input("dave@example.com")).await.unwrap();
        let (token, _) = svc
            .login(LoginInput { email: "dave@example.com".into(), password: "hunter2hunter2".into() })
            .await
            .unwrap();

        svc.logout(token).await.unwrap();
        let err = svc.resolve_session(token).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
        assert_eq!(svc.repo.session_count(), 0);
    }

    #[tokio::test]
    async fn resolve_caches_role_and_ignores_later_role_changes() {
        let svc = service();
        let repo = svc.repo.clone();
        let account = AuthAccount {
            id: Uuid::new_v4(),
            name: "Erin".into(),
            email: "erin@example.com".into(),
            role: "staff".into(),
            is_active: true,
            password_hash: password::hash("hunter2hunter2").unwrap(),
        };
        repo.seed_account(account.clone());

        let (token, _) = svc
            .login(LoginInput { email: "erin@example.com".into(), password: "hunter2hunter2".into() })
            .await
            .unwrap();

        let ctx = svc.resolve_session(token).await.unwrap();
        assert_eq!(ctx.role, Role::Staff);

        // Demotion only takes effect on the next login.
        repo.set_role(account.id, "user");
        let ctx = svc.resolve_session(token).await.unwrap();
        assert_eq!(ctx.role, Role::Staff);
    }
}
