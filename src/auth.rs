use axum::http::StatusCode;
use axum::Extension;
use chrono::{DateTime, Utc};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::err::{Error, Fine, JsonBody};
use crate::models::UserData;
use crate::store::{SharedStore, Store, StoreError};
use crate::{proceeds, required, Payload};

/// Hashes `password` into a salted PBKDF2 PHC string off the async runtime.
pub async fn hash_password(password: String) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Pbkdf2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await?
    .map_err(Error::from)
}

pub async fn verify_password(password: String, digest: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || -> Result<bool, Error> {
        let hash = PasswordHash::new(&digest)?;
        Ok(Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok())
    })
    .await?
}

pub async fn signup(store: &dyn Store, student: CreateStudent) -> Result<Uuid, Error> {
    let name = required(student.name, "name")?;
    let email = required(student.email, "email")?;
    let password = required(student.password, "password")?;

    if store.find_user_by_email(&email).await?.is_some() {
        log::warn!("Signup rejected, user already exists: {}", email);
        return Err(Error::AlreadyExists {
            message: "User already exists with this email".to_string(),
        });
    }

    let user = UserData {
        uuid: Uuid::new_v4(),
        name,
        email,
        password_hash: hash_password(password).await?,
        created_at: Utc::now(),
        last_login: None,
    };

    store.insert_user(&user).await.map_err(|err| match err {
        // lost a race against a concurrent signup
        StoreError::Duplicate(_) => Error::AlreadyExists {
            message: "User already exists with this email".to_string(),
        },
        other => Error::from(other),
    })?;

    log::info!("User created: {} ({})", user.uuid, user.email);
    Ok(user.uuid)
}

pub async fn login(store: &dyn Store, login: LoginStudent) -> Result<UserSummary, Error> {
    let email = required(login.email, "email")?;
    let password = required(login.password, "password")?;

    let student = match store.find_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            log::warn!("Login for unknown user: {}", email);
            return Err(Error::AuthenticationFailure {
                message: "User not found".to_string(),
            });
        }
    };

    if !verify_password(password, student.password_hash.clone()).await? {
        log::warn!("Invalid password for user: {}", email);
        return Err(Error::AuthenticationFailure {
            message: "Invalid password".to_string(),
        });
    }

    let now = Utc::now();
    store.touch_last_login(student.uuid, now).await?;

    log::info!("Login successful for user: {}", email);
    Ok(UserSummary {
        last_login: Some(now),
        ..UserSummary::from(student)
    })
}

pub async fn register_student(
    Extension(store): Extension<SharedStore>,
    JsonBody(student): JsonBody<CreateStudent>,
) -> Payload<CreatedStudent> {
    let student_id = signup(store.as_ref(), student).await?;
    Ok(Fine(CreatedStudent { student_id })
        .with_message("User registered successfully")
        .with_status(StatusCode::CREATED))
}

pub async fn login_student(
    Extension(store): Extension<SharedStore>,
    JsonBody(body): JsonBody<LoginStudent>,
) -> Payload<LoggedInStudent> {
    let user = login(store.as_ref(), body).await?;
    Ok(Fine(LoggedInStudent { user }).with_message("Login successful"))
}

pub async fn list_users(Extension(store): Extension<SharedStore>) -> Payload<UserList> {
    let users = store
        .list_users()
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();
    proceeds(UserList { users })
}

/// Everything about a user that is safe to hand out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<UserData> for UserSummary {
    fn from(user: UserData) -> Self {
        Self {
            id: user.uuid,
            name: user.name,
            email: user.email,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserList {
    users: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedInStudent {
    user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedStudent {
    student_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginStudent {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStudent {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ada() -> CreateStudent {
        CreateStudent {
            name: Some("Ada Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
            password: Some("analytical-engine".to_string()),
        }
    }

    fn credentials(password: &str) -> LoginStudent {
        LoginStudent {
            email: Some("ada@example.com".to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn signup_succeeds_once_per_email() {
        let store = MemoryStore::new();

        let id = signup(&store, ada()).await.unwrap();
        let again = signup(&store, ada()).await.unwrap_err();

        assert!(matches!(again, Error::AlreadyExists { .. }));
        let stored = store.find_user_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(stored.uuid, id);
        assert_ne!(stored.password_hash, "analytical-engine");
        assert!(stored.password_hash.starts_with("$pbkdf2"));
    }

    #[tokio::test]
    async fn signup_requires_every_field() {
        let store = MemoryStore::new();
        let err = signup(
            &store,
            CreateStudent {
                password: Some(String::new()),
                ..ada()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { .. }));
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_updates_last_login() {
        let store = MemoryStore::new();
        signup(&store, ada()).await.unwrap();

        let summary = login(&store, credentials("analytical-engine")).await.unwrap();

        assert_eq!(summary.email, "ada@example.com");
        let stored = store.find_user_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(stored.last_login, summary.last_login);
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_without_touching_last_login() {
        let store = MemoryStore::new();
        signup(&store, ada()).await.unwrap();

        let err = login(&store, credentials("difference-engine")).await.unwrap_err();

        assert!(matches!(err, Error::AuthenticationFailure { .. }));
        let stored = store.find_user_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(stored.last_login.is_none());
    }

    #[tokio::test]
    async fn unknown_email_is_an_auth_failure() {
        let store = MemoryStore::new();
        let err = login(&store, credentials("whatever")).await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailure { .. }));
    }
}
