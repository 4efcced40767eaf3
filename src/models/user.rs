use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub surname: String,
    pub tel: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Authenticated caller, passed explicitly into every engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Тело запроса на регистрацию. Роль приходит строкой и проверяется в сервисе.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub tel: String,
    pub email: String,
    pub password: String,
}

/// Validated user record ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub surname: String,
    pub tel: Option<String>,
    pub email: String,
    pub password_hash: String,
}
