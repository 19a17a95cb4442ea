use axum::handler::Handler;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;

use crate::store::SharedStore;
use crate::{auth, contact, courses, enrollment, err, progress};

pub fn app(store: SharedStore) -> Router {
    Router::new()
        .route(
            "/api/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route("/api/courses/:id", get(courses::course_details))
        .route("/api/courses/:id/progress", get(progress::course_progress))
        .route(
            "/api/courses/:id/modules/:module/lessons/:lesson",
            put(progress::update_lesson_by_index),
        )
        .route(
            "/api/courses/:id/lessons/:lesson",
            put(progress::update_lesson_by_id),
        )
        .route("/api/check-enrollment", get(enrollment::check_enrollment))
        .route("/api/enroll", post(enrollment::enroll_student))
        .route("/api/users", get(auth::list_users))
        .route("/contact", post(contact::contact))
        .route("/signup", post(auth::register_student))
        .route("/login", post(auth::login_student))
        .fallback(err::handler404.into_service())
        .layer(CorsLayer::permissive())
        .layer(Extension(store))
}
