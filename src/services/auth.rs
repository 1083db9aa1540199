use std::sync::Arc;

use crate::crypto::password::{CredentialHasher, PasswordError};
use crate::error::{AppError, Result};
use crate::models::user::{NewUser, User};
use crate::repositories::user::UserStore;

/// Normalises an email before it reaches the store.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration, login and account maintenance on top of a [`UserStore`].
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
}

impl AuthService {
    /// Creates a new `AuthService`.
    pub fn new(users: Arc<dyn UserStore>, hasher: CredentialHasher) -> Self {
        Self { users, hasher }
    }

    /// Creates a new user.
    ///
    /// # Arguments
    ///
    /// * `name` - The user's display name.
    /// * `email` - The user's email, also the login key.
    /// * `password` - The plaintext password.
    ///
    /// # Returns
    ///
    /// The created `User`, or `DuplicateEmail` if the email is taken.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        tracing::debug!("🔐 Creating user: {}", email);

        let password_hash = self.hasher.hash(password)?;

        let user = self
            .users
            .create(NewUser {
                name: name.trim().to_string(),
                email,
                password_hash,
            })
            .await?;

        tracing::info!("✅ User registered: {}", user.id);
        Ok(user)
    }

    /// Authenticates a user.
    ///
    /// An unknown email and a wrong password both return
    /// `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        tracing::debug!("🔐 Authenticating user: {}", email);

        let user = match self.users.find_by_email(&email).await {
            Ok(user) => user,
            Err(AppError::NotFound) => return Err(AppError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        self.check_password(password, &user)?;

        tracing::info!("✅ User authenticated: {}", user.id);
        Ok(user)
    }

    /// Changes a user's password after checking the current one.
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        tracing::info!("🔑 Changing password for user: {}", user_id);

        let mut user = self.users.find_by_id(user_id).await?;
        self.check_password(old_password, &user)?;

        user.password_hash = self.hasher.hash(new_password)?;
        self.users.update(&user).await?;

        tracing::info!("✅ Password changed for user: {}", user_id);
        Ok(())
    }

    /// Deletes a user's account.
    pub async fn delete_account(&self, user_id: i64) -> Result<()> {
        tracing::info!("🗑️ Deleting account: {}", user_id);
        self.users.delete(user_id).await
    }

    fn check_password(&self, password: &str, user: &User) -> Result<()> {
        match self.hasher.verify(password, &user.password_hash) {
            Ok(()) => Ok(()),
            Err(PasswordError::Mismatch) => {
                tracing::debug!("Password mismatch for user: {}", user.id);
                Err(AppError::InvalidCredentials)
            }
            Err(e) => {
                tracing::error!("❌ Stored hash for user {} is unusable: {}", user.id, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::password::test_hasher;
    use crate::repositories::memory::MemoryUserStore;

    fn service() -> (AuthService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        (AuthService::new(store.clone(), test_hasher()), store)
    }

    #[tokio::test]
    async fn register_then_login() {
        let (auth, _) = service();

        let user = auth.register("Ann", "ann@x.com", "secret1").await.unwrap();
        assert!(user.id > 0);
        assert_eq!(user.name, "Ann");
        assert_ne!(user.password_hash, "secret1");

        let logged_in = auth.login("ann@x.com", "secret1").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("ann@x.com", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let (auth, _) = service();
        auth.register("Ann", "ann@x.com", "secret1").await.unwrap();

        let wrong_password = auth.login("ann@x.com", "nope").await.unwrap_err();
        let unknown_email = auth.login("bob@x.com", "secret1").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn duplicate_registration_leaves_first_user_alone() {
        let (auth, store) = service();
        let first = auth.register("Ann", "ann@x.com", "secret1").await.unwrap();

        assert!(matches!(
            auth.register("Other", "ann@x.com", "different").await,
            Err(AppError::DuplicateEmail)
        ));

        let stored = store.find_by_id(first.id).await.unwrap();
        assert_eq!(stored, first);
        auth.login("ann@x.com", "secret1").await.unwrap();
    }

    #[tokio::test]
    async fn email_is_normalised() {
        let (auth, _) = service();
        let user = auth.register("Ann", "  Ann@X.com ", "secret1").await.unwrap();
        assert_eq!(user.email, "ann@x.com");
        assert_eq!(auth.login("ANN@x.com", "secret1").await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn change_password_swaps_credentials() {
        let (auth, _) = service();
        let user = auth.register("Ann", "ann@x.com", "secret1").await.unwrap();

        auth.change_password(user.id, "secret1", "secret2").await.unwrap();

        auth.login("ann@x.com", "secret2").await.unwrap();
        assert!(matches!(
            auth.login("ann@x.com", "secret1").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn change_password_requires_the_old_one() {
        let (auth, _) = service();
        let user = auth.register("Ann", "ann@x.com", "secret1").await.unwrap();

        assert!(matches!(
            auth.change_password(user.id, "guess", "secret2").await,
            Err(AppError::InvalidCredentials)
        ));
        auth.login("ann@x.com", "secret1").await.unwrap();
    }

    #[tokio::test]
    async fn change_password_for_missing_user_is_not_found() {
        let (auth, _) = service();
        assert!(matches!(
            auth.change_password(404, "a", "b").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleted_account_can_no_longer_log_in() {
        let (auth, _) = service();
        let user = auth.register("Ann", "ann@x.com", "secret1").await.unwrap();

        auth.delete_account(user.id).await.unwrap();

        assert!(matches!(
            auth.login("ann@x.com", "secret1").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.delete_account(user.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_an_internal_error() {
        let (auth, store) = service();
        let mut user = auth.register("Ann", "ann@x.com", "secret1").await.unwrap();
        user.password_hash = "garbage".to_string();
        store.update(&user).await.unwrap();

        assert!(matches!(
            auth.login("ann@x.com", "secret1").await,
            Err(AppError::Hashing(_))
        ));
    }
}
