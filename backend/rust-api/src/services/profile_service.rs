use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::attempt::LessonAttempt;
use crate::models::user::{User, UserProfile, UserStats};

pub struct ProfileService {
    db: PgPool,
}

impl ProfileService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Identity fields merged with aggregate counters and the completed /
    /// total lesson ratio.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let stats = user_stats(&self.db, user_id).await?;

        Ok(UserProfile {
            user_id: user.id,
            username: user.username,
            email: user.email,
            total_xp: stats.total_xp,
            current_streak: stats.current_streak,
            best_streak: stats.best_streak,
            completed_lessons: stats.completed_lessons,
            total_lessons: stats.total_lessons,
            progress_percentage: stats.progress_percentage,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }

    /// The caller's attempt history, newest first, optionally scoped to one
    /// lesson.
    pub async fn get_attempts(
        &self,
        user_id: Uuid,
        lesson_id: Option<Uuid>,
    ) -> Result<Vec<LessonAttempt>, ApiError> {
        let attempts = match lesson_id {
            Some(lesson_id) => {
                sqlx::query_as::<_, LessonAttempt>(
                    r#"
                    SELECT * FROM lesson_attempts
                    WHERE user_id = $1 AND lesson_id = $2
                    ORDER BY submitted_at DESC
                    "#,
                )
                .bind(user_id)
                .bind(lesson_id)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, LessonAttempt>(
                    "SELECT * FROM lesson_attempts WHERE user_id = $1 ORDER BY submitted_at DESC",
                )
                .bind(user_id)
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(attempts)
    }
}

#[derive(sqlx::FromRow)]
struct UserStatsRow {
    total_xp: i32,
    current_streak: i32,
    best_streak: i32,
    completed_lessons: i64,
    total_lessons: i64,
}

/// Aggregate user counters shared by the profile view and submission
/// responses.
pub(crate) async fn user_stats(db: &PgPool, user_id: Uuid) -> Result<UserStats, ApiError> {
    let row = sqlx::query_as::<_, UserStatsRow>(
        r#"
        SELECT u.total_xp, u.current_streak, u.best_streak,
            (SELECT COUNT(*) FROM lesson_progress lp
             WHERE lp.user_id = u.id AND lp.is_completed) AS completed_lessons,
            (SELECT COUNT(*) FROM lessons l WHERE l.is_active) AS total_lessons
        FROM users u
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(UserStats {
        total_xp: row.total_xp,
        current_streak: row.current_streak,
        best_streak: row.best_streak,
        completed_lessons: row.completed_lessons,
        total_lessons: row.total_lessons,
        progress_percentage: progress_percentage(row.completed_lessons, row.total_lessons),
    })
}

/// round(100 * completed / total), defined as 0 when no lessons exist
fn progress_percentage(completed: i64, total: i64) -> i32 {
    if total == 0 {
        return 0;
    }
    (100.0 * completed as f64 / total as f64).round() as i32
}
