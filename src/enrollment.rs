use axum::extract::Query;
use axum::Extension;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::err::{Error, Fine, JsonBody};
use crate::models::{Enrollment, PaymentStatus};
use crate::store::{SharedStore, Store};
use crate::{proceeds, required, Payload};

pub async fn check_enrolled(store: &dyn Store, query: EnrollmentQuery) -> Result<bool, Error> {
    let (email, course_id) = match (
        required(query.email, "email"),
        required(query.course_id, "courseId"),
    ) {
        (Ok(email), Ok(course_id)) => (email, course_id),
        _ => return Err(Error::invalid("Email and courseId are required")),
    };

    Ok(store.find_enrollment(&email, &course_id).await?.is_some())
}

/// Enrolls a student. Nothing is written unless the pair is new and the
/// course exists; the record and the counter bump then land together.
pub async fn enroll(store: &dyn Store, request: EnrollStudent) -> Result<Enrollment, Error> {
    let fields = (
        required(request.course_id, "courseId"),
        required(request.student_name, "studentName"),
        required(request.email, "email"),
        required(request.phone, "phone"),
    );
    let (course_id, student_name, email, phone) = match fields {
        (Ok(course_id), Ok(student_name), Ok(email), Ok(phone)) => {
            (course_id, student_name, email, phone)
        }
        _ => {
            log::debug!("Enrollment request with missing fields");
            return Err(Error::invalid("All fields are required"));
        }
    };

    if store.find_enrollment(&email, &course_id).await?.is_some() {
        return Err(Error::AlreadyExists {
            message: "You are already enrolled in this course".to_string(),
        });
    }

    if store.find_course(&course_id).await?.is_none() {
        log::debug!("Enrollment for unknown course: {}", course_id);
        return Err(Error::not_found("Course not found"));
    }

    let enrollment = Enrollment {
        uuid: Uuid::new_v4(),
        course_id,
        student_name,
        email,
        phone,
        enrollment_date: Utc::now(),
        // catalogue entries are free
        payment_status: PaymentStatus::Completed,
    };
    store.record_enrollment(&enrollment).await?;

    log::info!(
        "Enrollment {} saved: {} -> {}",
        enrollment.uuid,
        enrollment.email,
        enrollment.course_id
    );
    Ok(enrollment)
}

pub async fn check_enrollment(
    Extension(store): Extension<SharedStore>,
    Query(query): Query<EnrollmentQuery>,
) -> Payload<EnrollmentStatus> {
    let enrolled = check_enrolled(store.as_ref(), query).await?;
    proceeds(EnrollmentStatus { enrolled })
}

pub async fn enroll_student(
    Extension(store): Extension<SharedStore>,
    JsonBody(request): JsonBody<EnrollStudent>,
) -> Payload<EnrolledStudent> {
    let enrollment = enroll(store.as_ref(), request).await?;
    Ok(Fine(EnrolledStudent {
        enrollment_id: enrollment.uuid,
    })
    .with_message("Successfully enrolled in the course!"))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentQuery {
    pub email: Option<String>,
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollStudent {
    pub course_id: Option<String>,
    pub student_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentStatus {
    enrolled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledStudent {
    enrollment_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use crate::store::MemoryStore;

    fn request(email: &str, course_id: &str) -> EnrollStudent {
        EnrollStudent {
            course_id: Some(course_id.to_string()),
            student_name: Some("Grace Hopper".to_string()),
            email: Some(email.to_string()),
            phone: Some("555-0199".to_string()),
        }
    }

    fn query(email: &str, course_id: &str) -> EnrollmentQuery {
        EnrollmentQuery {
            email: Some(email.to_string()),
            course_id: Some(course_id.to_string()),
        }
    }

    async fn catalogue() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_course(&fixtures::web_dev()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn enrolled_student_is_reported_and_cannot_enroll_twice() {
        let store = catalogue().await;

        assert!(!check_enrolled(&store, query("grace@example.com", "web-dev")).await.unwrap());
        let enrollment = enroll(&store, request("grace@example.com", "web-dev")).await.unwrap();
        assert_eq!(enrollment.payment_status, PaymentStatus::Completed);
        assert!(check_enrolled(&store, query("grace@example.com", "web-dev")).await.unwrap());

        let again = enroll(&store, request("grace@example.com", "web-dev")).await.unwrap_err();
        assert!(matches!(again, Error::AlreadyExists { .. }));
        assert_eq!(store.enrollment_count().await, 1);
    }

    #[tokio::test]
    async fn enrolling_bumps_total_students_once() {
        let store = catalogue().await;

        enroll(&store, request("grace@example.com", "web-dev")).await.unwrap();
        enroll(&store, request("alan@example.com", "web-dev")).await.unwrap();

        let course = store.find_course("web-dev").await.unwrap().unwrap();
        assert_eq!(course.total_students, 1502);
    }

    #[tokio::test]
    async fn unknown_course_fails_before_any_write() {
        let store = catalogue().await;

        let err = enroll(&store, request("grace@example.com", "rust-101")).await.unwrap_err();

        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(store.enrollment_count().await, 0);
        assert!(!check_enrolled(&store, query("grace@example.com", "rust-101")).await.unwrap());
    }

    #[tokio::test]
    async fn missing_fields_are_a_validation_error() {
        let store = catalogue().await;
        let err = enroll(
            &store,
            EnrollStudent {
                phone: Some(String::new()),
                ..request("grace@example.com", "web-dev")
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { .. }));

        let err = enroll(&store, request("   ", "web-dev")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { .. }));
        assert_eq!(store.enrollment_count().await, 0);

        let err = check_enrolled(&store, query("grace@example.com", " ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { .. }));

        let err = check_enrolled(
            &store,
            EnrollmentQuery {
                email: Some("grace@example.com".to_string()),
                course_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn same_student_may_take_different_courses() {
        let store = catalogue().await;
        store.insert_course(&fixtures::empty_course("rust-101")).await.unwrap();

        enroll(&store, request("grace@example.com", "web-dev")).await.unwrap();
        enroll(&store, request("grace@example.com", "rust-101")).await.unwrap();

        assert_eq!(store.enrollment_count().await, 2);
    }
}
