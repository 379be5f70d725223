//! Read-only lookups into the host application's user and business tables.
//!
//! The redemption engine never writes these entities; it only needs enough
//! of them to validate an issue request and to enrich views and reports.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        DirectoryError::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait BusinessDirectory: Send + Sync {
    async fn find_business(&self, id: i64) -> Result<Option<Business>, DirectoryError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<UserProfile>, DirectoryError>;
}

// ============================================================================
// POSTGRES IMPLEMENTATIONS
// ============================================================================

pub struct PgBusinessDirectory {
    db: PgPool,
}

impl PgBusinessDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BusinessDirectory for PgBusinessDirectory {
    async fn find_business(&self, id: i64) -> Result<Option<Business>, DirectoryError> {
        let business = sqlx::query_as::<_, Business>(
            "SELECT id, name, slug FROM businesses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(business)
    }
}

pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, id: i64) -> Result<Option<UserProfile>, DirectoryError> {
        let user = sqlx::query_as::<_, UserProfile>(
            "SELECT id, username, email FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }
}

// ============================================================================
// IN-MEMORY IMPLEMENTATION (tests, memory-store mode)
// ============================================================================

/// Fixture directory serving both traits from maps.
pub struct MemoryDirectory {
    businesses: DashMap<i64, Business>,
    users: DashMap<i64, UserProfile>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            businesses: DashMap::new(),
            users: DashMap::new(),
        }
    }

    /// A couple of rows so memory-store runs can issue tokens out of the box.
    pub fn with_sample_data() -> Self {
        let directory = Self::new();
        directory.add_business(Business {
            id: 1,
            name: "Cafe Central".to_string(),
            slug: Some("cafe-central".to_string()),
        });
        directory.add_business(Business {
            id: 7,
            name: "Harbor Pizza".to_string(),
            slug: Some("harbor-pizza".to_string()),
        });
        directory.add_user(UserProfile {
            id: 1,
            username: "admin".to_string(),
            email: Some("admin@example.com".to_string()),
        });
        directory.add_user(UserProfile {
            id: 42,
            username: "scanner42".to_string(),
            email: Some("scanner42@example.com".to_string()),
        });
        directory
    }

    pub fn add_business(&self, business: Business) {
        self.businesses.insert(business.id, business);
    }

    pub fn add_user(&self, user: UserProfile) {
        self.users.insert(user.id, user);
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusinessDirectory for MemoryDirectory {
    async fn find_business(&self, id: i64) -> Result<Option<Business>, DirectoryError> {
        Ok(self.businesses.get(&id).map(|entry| entry.clone()))
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_user(&self, id: i64) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.users.get(&id).map(|entry| entry.clone()))
    }
}
