use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// User row in the "users" table
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub total_xp: i32,
    pub current_streak: i32,
    pub best_streak: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User returned to clients (credential hash stripped)
#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub total_xp: i32,
    pub current_streak: i32,
    pub best_streak: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            id: user.id,
            username: user.username,
            email: user.email,
            total_xp: user.total_xp,
            current_streak: user.current_streak,
            best_streak: user.best_streak,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Request to register a new user
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 30,
        message = "Username must be between 3 and 30 characters"
    ))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Request to login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Response after successful login or registration
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserPublic,
    pub token: String,
}

/// Response after refreshing a token
#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub token: String,
}

/// Aggregate counters merged into profile and submission responses
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total_xp: i32,
    pub current_streak: i32,
    pub best_streak: i32,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress_percentage: i32,
}

/// Profile view: identity fields + aggregate statistics
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub total_xp: i32,
    pub current_streak: i32,
    pub best_streak: i32,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress_percentage: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
