use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserData {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Course document. Modules and lessons are owned by the course and have no
/// lifecycle of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub uuid: Uuid,
    /// Client facing key, e.g. `web-dev`.
    #[serde(rename = "id")]
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub duration: Option<String>,
    pub price: f64,
    pub instructor: String,
    pub total_students: i64,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: Uuid,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub completed: bool,
}

impl Course {
    pub fn lesson_mut(&mut self, module: usize, lesson: usize) -> Option<&mut Lesson> {
        self.modules.get_mut(module)?.lessons.get_mut(lesson)
    }

    pub fn lesson_by_id_mut(&mut self, id: Uuid) -> Option<&mut Lesson> {
        self.modules
            .iter_mut()
            .flat_map(|module| module.lessons.iter_mut())
            .find(|lesson| lesson.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            other => Err(format!("unknown payment status `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub uuid: Uuid,
    pub course_id: String,
    pub student_name: String,
    pub email: String,
    pub phone: String,
    pub enrollment_date: DateTime<Utc>,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
pub mod fixtures {
    use super::*;

    pub fn lesson(title: &str, completed: bool) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            title: title.to_string(),
            kind: "video".to_string(),
            content: format!("https://videos.example/{}", title),
            completed,
        }
    }

    pub fn module(title: &str, lessons: Vec<Lesson>) -> Module {
        Module {
            id: Uuid::new_v4(),
            title: title.to_string(),
            lessons,
        }
    }

    /// Two modules of three and two lessons, two of them completed.
    pub fn web_dev() -> Course {
        Course {
            uuid: Uuid::new_v4(),
            external_id: "web-dev".to_string(),
            title: "Web Development for Beginners".to_string(),
            description: "HTML, CSS and JavaScript".to_string(),
            image: None,
            duration: Some("12 weeks".to_string()),
            price: 0.0,
            instructor: "John Smith".to_string(),
            total_students: 1500,
            modules: vec![
                module(
                    "HTML Fundamentals",
                    vec![
                        lesson("intro", true),
                        lesson("elements", true),
                        lesson("forms", false),
                    ],
                ),
                module(
                    "CSS Styling",
                    vec![lesson("basics", false), lesson("flexbox", false)],
                ),
            ],
        }
    }

    pub fn empty_course(external_id: &str) -> Course {
        Course {
            external_id: external_id.to_string(),
            total_students: 0,
            modules: Vec::new(),
            ..web_dev()
        }
    }
}
