//! Persistence port for users, courses, enrollments and contact messages.
//!
//! Handlers only see [`SharedStore`]; the process picks [`PgStore`] when a
//! database is configured and [`MemoryStore`] otherwise.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ContactMessage, Course, Enrollment, Module, UserData};

pub type SharedStore = Arc<dyn Store>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Duplicate(String),
    /// The document a write depends on does not exist.
    #[error("{0}")]
    Missing(String),
    #[error("storage failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // 23505: unique_violation
            if db.code().as_deref() == Some("23505") {
                return Self::Duplicate(db.message().to_string());
            }
        }
        Self::Backend(err.to_string())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserData>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &UserData) -> Result<(), StoreError>;

    async fn touch_last_login(&self, uuid: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<UserData>, StoreError>;

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError>;

    async fn find_course(&self, external_id: &str) -> Result<Option<Course>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the external id is taken.
    async fn insert_course(&self, course: &Course) -> Result<(), StoreError>;

    /// Writes the module tree of an existing course back in one update.
    async fn replace_modules(&self, external_id: &str, modules: &[Module])
        -> Result<(), StoreError>;

    async fn find_enrollment(
        &self,
        email: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// Inserts the enrollment and bumps the course's `total_students` as one
    /// unit: either both happen or neither does.
    async fn record_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError>;

    async fn insert_contact(&self, contact: &ContactMessage) -> Result<(), StoreError>;
}
