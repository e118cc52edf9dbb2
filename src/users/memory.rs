use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::users::repo::{hash_for_store, StoreError, UserStore, FIND_ALL_LIMIT};
use crate::users::repo_types::{User, UserDraft};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<User>,
    last_id: i64,
}

/// Process-local `UserStore` with the same semantics as the postgres one.
/// Rows are kept in insertion order; the write lock stands in for the unique
/// email constraint.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    table: RwLock<Table>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, draft: UserDraft) -> Result<User, StoreError> {
        let draft = draft.prepared();
        let password = hash_for_store(&draft.password)?;
        let now = OffsetDateTime::now_utc();

        let mut table = self.table.write().await;
        if table.rows.iter().any(|u| u.email == draft.email) {
            return Err(StoreError::ConstraintViolation(draft.email));
        }
        table.last_id += 1;
        let user = User {
            id: table.last_id,
            name: draft.name,
            email: draft.email,
            password,
            age: draft.age,
            favorite_color: draft.favorite_color,
            favorite_operating_system: draft.favorite_operating_system,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(user.clone());
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .take(FIND_ALL_LIMIT as usize)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        let table = self.table.read().await;
        table
            .rows
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|u| u.email == email).cloned())
    }

    async fn update(&self, id: i64, draft: UserDraft) -> Result<User, StoreError> {
        let password = hash_for_store(&draft.password)?;

        let mut table = self.table.write().await;
        let pos = table
            .rows
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if table.rows.iter().any(|u| u.id != id && u.email == draft.email) {
            return Err(StoreError::ConstraintViolation(draft.email));
        }
        let user = &mut table.rows[pos];

        user.password = password;
        user.name = draft.name;
        user.email = draft.email;
        user.age = draft.age;
        user.favorite_color = draft.favorite_color;
        user.favorite_operating_system = draft.favorite_operating_system;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|u| u.id != id);
        Ok((before - table.rows.len()) as u64)
    }
}
