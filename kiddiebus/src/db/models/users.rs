//! Database models for users.

use crate::api::models::users::{ProfileUpdate, Role, UserUpdate};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new user.
///
/// Registration itself is handled by the identity collaborator; this request
/// exists for the bootstrap admin and for test fixtures.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// Database request for updating a user
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl From<UserUpdate> for UserUpdateDBRequest {
    fn from(api: UserUpdate) -> Self {
        Self {
            first_name: api.first_name,
            last_name: api.last_name,
            phone: api.phone,
            role: api.role,
            is_active: api.is_active,
        }
    }
}

impl From<ProfileUpdate> for UserUpdateDBRequest {
    fn from(api: ProfileUpdate) -> Self {
        Self {
            first_name: api.first_name,
            last_name: api.last_name,
            phone: api.phone,
            // The self-service path never touches role or active state
            role: None,
            is_active: None,
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
