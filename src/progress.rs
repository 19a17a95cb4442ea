use axum::extract::Path;
use axum::Extension;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::err::{Empty, Error, Fine, JsonBody};
use crate::models::{Course, Lesson};
use crate::store::{SharedStore, Store};
use crate::{proceeds, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub percentage: f64,
}

impl Progress {
    /// A course without lessons is reported as 0% rather than NaN.
    pub fn of(course: &Course) -> Self {
        let lessons = course.modules.iter().flat_map(|module| module.lessons.iter());
        let (total_lessons, completed_lessons) = lessons.fold((0, 0), |(total, done), lesson| {
            (total + 1, done + usize::from(lesson.completed))
        });
        let percentage = if total_lessons == 0 {
            0.0
        } else {
            completed_lessons as f64 * 100.0 / total_lessons as f64
        };
        Self {
            total_lessons,
            completed_lessons,
            percentage,
        }
    }
}

async fn load_course(store: &dyn Store, course_id: &str) -> Result<Course, Error> {
    store
        .find_course(course_id)
        .await?
        .ok_or_else(|| Error::not_found("Course not found"))
}

pub async fn get_progress(store: &dyn Store, course_id: &str) -> Result<Progress, Error> {
    let course = load_course(store, course_id).await?;
    Ok(Progress::of(&course))
}

/// How a request points at a lesson inside a course.
#[derive(Debug, Clone, Copy)]
pub enum LessonRef {
    /// Zero based positions in the stored order of modules and lessons.
    Position { module: usize, lesson: usize },
    /// Stable id, unaffected by reordering.
    Id(Uuid),
}

impl LessonRef {
    fn resolve(self, course: &mut Course) -> Option<&mut Lesson> {
        match self {
            LessonRef::Position { module, lesson } => course.lesson_mut(module, lesson),
            LessonRef::Id(id) => course.lesson_by_id_mut(id),
        }
    }
}

/// Sets the flag on the referenced lesson and writes the module tree back.
/// When the lesson does not resolve the course is left as it was.
async fn update_lesson(
    store: &dyn Store,
    course_id: &str,
    lesson: LessonRef,
    completed: bool,
) -> Result<(), Error> {
    let mut course = load_course(store, course_id).await?;
    match lesson.resolve(&mut course) {
        Some(lesson) => lesson.completed = completed,
        None => return Err(Error::not_found("Module or lesson not found")),
    }
    store.replace_modules(course_id, &course.modules).await?;
    log::info!(
        "Lesson {:?} in course {} marked completed={}",
        lesson,
        course_id,
        completed
    );
    Ok(())
}

pub async fn set_lesson_completion(
    store: &dyn Store,
    course_id: &str,
    module_index: usize,
    lesson_index: usize,
    completed: bool,
) -> Result<(), Error> {
    let lesson = LessonRef::Position {
        module: module_index,
        lesson: lesson_index,
    };
    update_lesson(store, course_id, lesson, completed).await
}

pub async fn set_lesson_completion_by_id(
    store: &dyn Store,
    course_id: &str,
    lesson_id: Uuid,
    completed: bool,
) -> Result<(), Error> {
    update_lesson(store, course_id, LessonRef::Id(lesson_id), completed).await
}

pub async fn course_progress(
    Extension(store): Extension<SharedStore>,
    Path(course_id): Path<String>,
) -> Payload<CourseProgress> {
    let progress = get_progress(store.as_ref(), &course_id).await?;
    proceeds(CourseProgress { progress })
}

pub async fn update_lesson_by_index(
    Extension(store): Extension<SharedStore>,
    Path((course_id, module, lesson)): Path<(String, String, String)>,
    JsonBody(body): JsonBody<LessonStatus>,
) -> Payload<Empty> {
    let completed = body.completed()?;
    let (module_index, lesson_index) = match (module.parse::<usize>(), lesson.parse::<usize>()) {
        (Ok(m), Ok(l)) => (m, l),
        _ => return Err(Error::not_found("Module or lesson not found")),
    };
    set_lesson_completion(store.as_ref(), &course_id, module_index, lesson_index, completed)
        .await?;
    Ok(Fine(Empty {}).with_message("Lesson status updated successfully"))
}

pub async fn update_lesson_by_id(
    Extension(store): Extension<SharedStore>,
    Path((course_id, lesson)): Path<(String, String)>,
    JsonBody(body): JsonBody<LessonStatus>,
) -> Payload<Empty> {
    let completed = body.completed()?;
    let lesson_id = Uuid::parse_str(&lesson).map_err(|_| Error::not_found("Lesson not found"))?;
    set_lesson_completion_by_id(store.as_ref(), &course_id, lesson_id, completed).await?;
    Ok(Fine(Empty {}).with_message("Lesson status updated successfully"))
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseProgress {
    progress: Progress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LessonStatus {
    completed: Option<bool>,
}

impl LessonStatus {
    fn completed(&self) -> Result<bool, Error> {
        self.completed
            .ok_or_else(|| Error::invalid("`completed` must be a boolean"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use crate::store::MemoryStore;

    async fn catalogue() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_course(&fixtures::web_dev()).await.unwrap();
        store.insert_course(&fixtures::empty_course("empty")).await.unwrap();
        store
    }

    #[tokio::test]
    async fn progress_counts_lessons_across_modules() {
        let store = catalogue().await;
        let progress = get_progress(&store, "web-dev").await.unwrap();
        assert_eq!(
            progress,
            Progress {
                total_lessons: 5,
                completed_lessons: 2,
                percentage: 40.0,
            }
        );
    }

    #[tokio::test]
    async fn course_without_lessons_is_zero_percent() {
        let store = catalogue().await;
        let progress = get_progress(&store, "empty").await.unwrap();
        assert_eq!(progress.total_lessons, 0);
        assert_eq!(progress.percentage, 0.0);
    }

    #[tokio::test]
    async fn unknown_course_has_no_progress() {
        let store = catalogue().await;
        let err = get_progress(&store, "ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn completion_by_index_is_persisted() {
        let store = catalogue().await;

        set_lesson_completion(&store, "web-dev", 1, 1, true).await.unwrap();
        set_lesson_completion(&store, "web-dev", 0, 0, false).await.unwrap();

        let course = store.find_course("web-dev").await.unwrap().unwrap();
        assert!(course.modules[1].lessons[1].completed);
        assert!(!course.modules[0].lessons[0].completed);
        assert_eq!(Progress::of(&course).completed_lessons, 2);
    }

    #[tokio::test]
    async fn out_of_range_indices_leave_course_untouched() {
        let store = catalogue().await;
        let before = store.find_course("web-dev").await.unwrap().unwrap();

        let bad_module = set_lesson_completion(&store, "web-dev", 2, 0, true).await.unwrap_err();
        let bad_lesson = set_lesson_completion(&store, "web-dev", 1, 2, true).await.unwrap_err();

        assert!(matches!(bad_module, Error::NotFound { .. }));
        assert!(matches!(bad_lesson, Error::NotFound { .. }));
        assert_eq!(store.find_course("web-dev").await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn completion_by_id_survives_reordering() {
        let store = catalogue().await;
        let mut course = store.find_course("web-dev").await.unwrap().unwrap();
        let target = course.modules[1].lessons[0].id;
        course.modules.reverse();
        store.replace_modules("web-dev", &course.modules).await.unwrap();

        set_lesson_completion_by_id(&store, "web-dev", target, true).await.unwrap();

        let course = store.find_course("web-dev").await.unwrap().unwrap();
        assert!(course.modules[0].lessons[0].completed);
        assert_eq!(course.modules[0].lessons[0].id, target);
    }

    #[tokio::test]
    async fn unknown_lesson_id_is_not_found() {
        let store = catalogue().await;
        let err = set_lesson_completion_by_id(&store, "web-dev", Uuid::new_v4(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
