use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, User},
    repositories::user::UserStore,
};

#[derive(Default)]
struct Inner {
    last_id: i64,
    users: HashMap<i64, User>,
}

/// Process-local user store. Ids are never reused, even after deletion.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.lock().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateEmail);
        }

        inner.last_id += 1;
        let user = User {
            id: inner.last_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        };
        inner.users.insert(user.id, user.clone());

        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<User> {
        let inner = self.inner.lock().await;
        inner.users.get(&id).cloned().ok_or(AppError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let inner = self.inner.lock().await;
        inner
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let mut inner = self.inner.lock().await;

        if !inner.users.contains_key(&user.id) {
            return Err(AppError::NotFound);
        }
        if inner
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(AppError::DuplicateEmail);
        }

        inner.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.users.remove(&id).ok_or(AppError::NotFound)?;
        tracing::info!("🗑️ User deleted: {}", id);
        Ok(())
    }
}
