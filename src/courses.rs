use axum::extract::Path;
use axum::Extension;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::err::{Error, Fine, JsonBody};
use crate::models::{Course, Lesson, Module};
use crate::store::{SharedStore, Store};
use crate::{proceeds, required, Payload};

pub async fn get_course(store: &dyn Store, course_id: &str) -> Result<Course, Error> {
    log::debug!("Fetching course with id: {}", course_id);
    store
        .find_course(course_id)
        .await?
        .ok_or_else(|| Error::not_found("Course not found"))
}

/// Stores a new course, handing every module and lesson a fresh stable id.
pub async fn add_course(store: &dyn Store, new: NewCourse) -> Result<Course, Error> {
    let course = Course {
        uuid: Uuid::new_v4(),
        external_id: required(new.id, "id")?,
        title: required(new.title, "title")?,
        description: new.description.unwrap_or_default(),
        image: new.image,
        duration: new.duration,
        price: new.price.unwrap_or(0.0),
        instructor: new.instructor.unwrap_or_default(),
        total_students: new.total_students.unwrap_or(0),
        modules: new.modules.into_iter().map(Module::from).collect(),
    };

    store.insert_course(&course).await?;
    log::info!("Course {} added as {}", course.external_id, course.uuid);
    Ok(course)
}

pub async fn list_courses(Extension(store): Extension<SharedStore>) -> Payload<CourseList> {
    let courses = store.list_courses().await?;
    proceeds(CourseList { courses })
}

pub async fn course_details(
    Extension(store): Extension<SharedStore>,
    Path(course_id): Path<String>,
) -> Payload<Course> {
    proceeds(get_course(store.as_ref(), &course_id).await?)
}

pub async fn create_course(
    Extension(store): Extension<SharedStore>,
    JsonBody(new): JsonBody<NewCourse>,
) -> Payload<CreatedCourse> {
    let course = add_course(store.as_ref(), new).await?;
    Ok(Fine(CreatedCourse {
        course_id: course.uuid,
        id: course.external_id,
    })
    .with_message("Course added successfully"))
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseList {
    courses: Vec<Course>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCourse {
    course_id: Uuid,
    id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub duration: Option<String>,
    pub price: Option<f64>,
    pub instructor: Option<String>,
    pub total_students: Option<i64>,
    #[serde(default)]
    pub modules: Vec<NewModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewModule {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<NewLesson>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLesson {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub completed: bool,
}

impl From<NewModule> for Module {
    fn from(module: NewModule) -> Self {
        Module {
            id: Uuid::new_v4(),
            title: module.title,
            lessons: module.lessons.into_iter().map(Lesson::from).collect(),
        }
    }
}

impl From<NewLesson> for Lesson {
    fn from(lesson: NewLesson) -> Self {
        Lesson {
            id: Uuid::new_v4(),
            title: lesson.title,
            kind: lesson.kind,
            content: lesson.content,
            completed: lesson.completed,
        }
    }
}
