use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{ContactMessage, Course, Enrollment, Module, UserData};

#[derive(Default)]
struct Collections {
    users: Vec<UserData>,
    courses: Vec<Course>,
    enrollments: Vec<Enrollment>,
    contacts: Vec<ContactMessage>,
}

/// In-process store. Every operation takes the single lock, so each one is
/// atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn enrollment_count(&self) -> usize {
        self.inner.lock().await.enrollments.len()
    }

    #[cfg(test)]
    pub async fn contact_count(&self) -> usize {
        self.inner.lock().await.contacts.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserData>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &UserData) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!(
                "User with email `{}` already exists",
                user.email
            )));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn touch_last_login(&self, uuid: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.users.iter_mut().find(|u| u.uuid == uuid) {
            Some(user) => {
                user.last_login = Some(at);
                Ok(())
            }
            None => Err(StoreError::Missing(format!("User `{}` does not exist", uuid))),
        }
    }

    async fn list_users(&self) -> Result<Vec<UserData>, StoreError> {
        Ok(self.inner.lock().await.users.clone())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.inner.lock().await.courses.clone())
    }

    async fn find_course(&self, external_id: &str) -> Result<Option<Course>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .courses
            .iter()
            .find(|c| c.external_id == external_id)
            .cloned())
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .courses
            .iter()
            .any(|c| c.external_id == course.external_id)
        {
            return Err(StoreError::Duplicate(format!(
                "Course with id `{}` already exists",
                course.external_id
            )));
        }
        inner.courses.push(course.clone());
        Ok(())
    }

    async fn replace_modules(
        &self,
        external_id: &str,
        modules: &[Module],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner
            .courses
            .iter_mut()
            .find(|c| c.external_id == external_id)
        {
            Some(course) => {
                course.modules = modules.to_vec();
                Ok(())
            }
            None => Err(StoreError::Missing(format!(
                "Course `{}` does not exist",
                external_id
            ))),
        }
    }

    async fn find_enrollment(
        &self,
        email: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .enrollments
            .iter()
            .find(|e| e.email == email && e.course_id == course_id)
            .cloned())
    }

    async fn record_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .enrollments
            .iter()
            .any(|e| e.email == enrollment.email && e.course_id == enrollment.course_id)
        {
            return Err(StoreError::Duplicate(
                "You are already enrolled in this course".to_string(),
            ));
        }
        let course = inner
            .courses
            .iter_mut()
            .find(|c| c.external_id == enrollment.course_id)
            .ok_or_else(|| {
                StoreError::Missing(format!("Course `{}` does not exist", enrollment.course_id))
            })?;
        course.total_students += 1;
        inner.enrollments.push(enrollment.clone());
        Ok(())
    }

    async fn insert_contact(&self, contact: &ContactMessage) -> Result<(), StoreError> {
        self.inner.lock().await.contacts.push(contact.clone());
        Ok(())
    }
}
