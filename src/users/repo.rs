use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::auth::password::hash_password;
use crate::users::repo_types::{User, UserDraft};

/// Rows returned by `find_all`.
pub const FIND_ALL_LIMIT: i64 = 100;

const USER_COLUMNS: &str = "id, name, email, password, age, favorite_color, \
                            favorite_operating_system, created_at, updated_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User {0} not found")]
    NotFound(i64),
    #[error("Email '{0}' is already taken")]
    ConstraintViolation(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("database unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

/// Persistence for users. Implementations hash passwords on the way in and
/// never hand plaintext back out.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Any id on the draft is discarded.
    async fn create(&self, draft: UserDraft) -> Result<User, StoreError>;
    /// At most [`FIND_ALL_LIMIT`] users in insertion order.
    async fn find_all(&self) -> Result<Vec<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Overwrite the mutable fields. The password is re-hashed whether or not
    /// it changed.
    async fn update(&self, id: i64, draft: UserDraft) -> Result<User, StoreError>;
    /// Number of rows removed; 0 when the id does not exist.
    async fn delete(&self, id: i64) -> Result<u64, StoreError>;
}

pub(crate) fn hash_for_store(plain: &str) -> Result<String, StoreError> {
    hash_password(plain).map_err(|e| StoreError::PasswordHash(e.to_string()))
}

fn map_write_error(e: sqlx::Error, email: &str) -> StoreError {
    let unique = e
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if unique {
        StoreError::ConstraintViolation(email.to_string())
    } else {
        error!(error = %e, "users write failed");
        StoreError::StoreUnavailable(e)
    }
}

/// `UserStore` over the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, draft: UserDraft) -> Result<User, StoreError> {
        let draft = draft.prepared();
        let password = hash_for_store(&draft.password)?;
        let now = OffsetDateTime::now_utc();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password, age, favorite_color,
                               favorite_operating_system, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&password)
        .bind(draft.age)
        .bind(&draft.favorite_color)
        .bind(&draft.favorite_operating_system)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &draft.email))?;

        debug!(user_id = user.id, "user inserted");
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1"
        ))
        .bind(FIND_ALL_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn update(&self, id: i64, draft: UserDraft) -> Result<User, StoreError> {
        let password = hash_for_store(&draft.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password = $2, name = $3, email = $4, age = $5, favorite_color = $6,
                favorite_operating_system = $7, updated_at = $8
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&password)
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(draft.age)
        .bind(&draft.favorite_color)
        .bind(&draft.favorite_operating_system)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &draft.email))?
        .ok_or(StoreError::NotFound(id))?;

        debug!(user_id = id, "user updated");
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
