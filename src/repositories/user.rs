use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::{error::SqlState, Row};

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, User},
};

/// Persistence for user records.
///
/// Every operation is a single unit of work with no internal retries.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with `DuplicateEmail` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Fetches a user by id. Fails with `NotFound`.
    async fn find_by_id(&self, id: i64) -> Result<User>;

    /// Fetches a user by email. Fails with `NotFound`.
    async fn find_by_email(&self, email: &str) -> Result<User>;

    /// Overwrites the mutable fields of an existing user.
    async fn update(&self, user: &User) -> Result<User>;

    /// Removes a user. Fails with `NotFound` when the id does not exist.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
    })
}

/// Turns a unique-constraint violation into `DuplicateEmail`.
fn map_write_error(err: tokio_postgres::Error) -> AppError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        AppError::DuplicateEmail
    } else {
        AppError::Database(err)
    }
}

/// PostgreSQL-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO users (name, email, password_hash)
                VALUES ($1, $2, $3)
                RETURNING id, name, email, password_hash
                "#,
                &[&user.name, &user.email, &user.password_hash],
            )
            .await
            .map_err(map_write_error)?;

        let user = row_to_user(&row)?;
        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, name, email, password_hash
                FROM users
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        row_to_user(&row)
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, name, email, password_hash
                FROM users
                WHERE email = $1
                "#,
                &[&email],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        row_to_user(&row)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                UPDATE users
                SET name = $1, email = $2, password_hash = $3
                WHERE id = $4
                RETURNING id, name, email, password_hash
                "#,
                &[&user.name, &user.email, &user.password_hash, &user.id],
            )
            .await
            .map_err(map_write_error)?
            .ok_or(AppError::NotFound)?;
        row_to_user(&row)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM users WHERE id = $1", &[&id])
            .await?;

        if deleted == 0 {
            return Err(AppError::NotFound);
        }

        tracing::info!("🗑️ User deleted: {}", id);
        Ok(())
    }
}
