use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{ContactMessage, Course, Enrollment, Module, UserData};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS users (
        uuid UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        last_login TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS courses (
        uuid UUID PRIMARY KEY,
        external_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        image TEXT,
        duration TEXT,
        price DOUBLE PRECISION NOT NULL,
        instructor TEXT NOT NULL,
        total_students BIGINT NOT NULL DEFAULT 0,
        modules JSONB NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS enrollments (
        uuid UUID PRIMARY KEY,
        course_id TEXT NOT NULL,
        student_name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        enrollment_date TIMESTAMPTZ NOT NULL,
        payment_status TEXT NOT NULL,
        UNIQUE (email, course_id)
    )",
    "CREATE TABLE IF NOT EXISTS contacts (
        uuid UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        message TEXT NOT NULL,
        submitted_at TIMESTAMPTZ NOT NULL
    )",
];

#[derive(sqlx::FromRow)]
struct CourseRow {
    uuid: Uuid,
    external_id: String,
    title: String,
    description: String,
    image: Option<String>,
    duration: Option<String>,
    price: f64,
    instructor: String,
    total_students: i64,
    modules: Json<Vec<Module>>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            uuid: row.uuid,
            external_id: row.external_id,
            title: row.title,
            description: row.description,
            image: row.image,
            duration: row.duration,
            price: row.price,
            instructor: row.instructor,
            total_students: row.total_students,
            modules: row.modules.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EnrollmentRow {
    uuid: Uuid,
    course_id: String,
    student_name: String,
    email: String,
    phone: String,
    enrollment_date: DateTime<Utc>,
    payment_status: String,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = StoreError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        Ok(Enrollment {
            uuid: row.uuid,
            course_id: row.course_id,
            student_name: row.student_name,
            email: row.email,
            phone: row.phone,
            enrollment_date: row.enrollment_date,
            payment_status: row.payment_status.parse().map_err(StoreError::Backend)?,
        })
    }
}

#[derive(Clone)]
pub struct PgStore {
    pg: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pg = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let store = Self { pg };
        store.prepare_schema().await?;
        Ok(store)
    }

    async fn prepare_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pg).await?;
        }
        log::info!("Database schema is ready");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserData>, StoreError> {
        let user = sqlx::query_as::<_, UserData>("SELECT * FROM users WHERE email = $1 LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pg)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &UserData) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(user.uuid)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.last_login)
            .execute(&self.pg)
            .await?;
        Ok(())
    }

    async fn touch_last_login(&self, uuid: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE users SET last_login = $1 WHERE uuid = $2")
            .bind(at)
            .bind(uuid)
            .execute(&self.pg)
            .await?;
        if res.rows_affected() < 1 {
            return Err(StoreError::Missing(format!("User `{}` does not exist", uuid)));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserData>, StoreError> {
        let users = sqlx::query_as::<_, UserData>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pg)
            .await?;
        Ok(users)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        let rows = sqlx::query_as::<_, CourseRow>("SELECT * FROM courses ORDER BY external_id")
            .fetch_all(&self.pg)
            .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn find_course(&self, external_id: &str) -> Result<Option<Course>, StoreError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT * FROM courses WHERE external_id = $1 LIMIT 1",
        )
        .bind(external_id)
        .fetch_optional(&self.pg)
        .await?;
        Ok(row.map(Course::from))
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO courses VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
            .bind(course.uuid)
            .bind(&course.external_id)
            .bind(&course.title)
            .bind(&course.description)
            .bind(&course.image)
            .bind(&course.duration)
            .bind(course.price)
            .bind(&course.instructor)
            .bind(course.total_students)
            .bind(Json(&course.modules))
            .execute(&self.pg)
            .await?;
        Ok(())
    }

    async fn replace_modules(
        &self,
        external_id: &str,
        modules: &[Module],
    ) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE courses SET modules = $1 WHERE external_id = $2")
            .bind(Json(modules))
            .bind(external_id)
            .execute(&self.pg)
            .await?;
        if res.rows_affected() < 1 {
            return Err(StoreError::Missing(format!(
                "Course `{}` does not exist",
                external_id
            )));
        }
        Ok(())
    }

    async fn find_enrollment(
        &self,
        email: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT * FROM enrollments WHERE email = $1 AND course_id = $2 LIMIT 1",
        )
        .bind(email)
        .bind(course_id)
        .fetch_optional(&self.pg)
        .await?;
        row.map(Enrollment::try_from).transpose()
    }

    async fn record_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError> {
        let mut tx = self.pg.begin().await?;

        sqlx::query("INSERT INTO enrollments VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(enrollment.uuid)
            .bind(&enrollment.course_id)
            .bind(&enrollment.student_name)
            .bind(&enrollment.email)
            .bind(&enrollment.phone)
            .bind(enrollment.enrollment_date)
            .bind(enrollment.payment_status.as_str())
            .execute(&mut tx)
            .await?;

        let bumped = sqlx::query(
            "UPDATE courses SET total_students = total_students + 1 WHERE external_id = $1",
        )
        .bind(&enrollment.course_id)
        .execute(&mut tx)
        .await?;

        if bumped.rows_affected() < 1 {
            tx.rollback().await?;
            return Err(StoreError::Missing(format!(
                "Course `{}` does not exist",
                enrollment.course_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_contact(&self, contact: &ContactMessage) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO contacts VALUES ($1, $2, $3, $4, $5)")
            .bind(contact.uuid)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.message)
            .bind(contact.submitted_at)
            .execute(&self.pg)
            .await?;
        Ok(())
    }
}
