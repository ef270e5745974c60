use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Immutable attempt log row, keyed by the client-supplied idempotency key
/// (`attempt_id`). Never updated after insert.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LessonAttempt {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub submitted_answers: serde_json::Value,
    pub score: f64,
    pub xp_earned: i32,
    pub is_completed: bool,
    pub submitted_at: DateTime<Utc>,
}

/// One answer entry of a submission body. A null selection is a valid
/// "unanswered" marker, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub problem_id: Uuid,
    pub selected_option_id: Option<Uuid>,
}

/// Body of POST /lessons/:id/submit. The attempt id is the idempotency key
/// and must be a v4 UUID; it is validated before any storage round trip.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    pub attempt_id: String,

    #[validate(length(min = 1, message = "At least one answer is required"))]
    pub answers: Vec<SubmittedAnswer>,
}

/// Per-problem grading verdict, stored verbatim in the attempt log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub problem_id: Uuid,
    pub selected_option_id: Option<Uuid>,
    pub correct_option_id: Option<Uuid>,
    pub is_correct: bool,
}

/// Result returned for both fresh submissions and idempotent replays.
/// `correct_answers`/`total_problems` are present only when grading actually
/// ran in this call.
#[derive(Debug, Serialize)]
pub struct SubmissionResult {
    pub attempt_id: Uuid,
    pub score: f64,
    pub xp_earned: i32,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_problems: Option<usize>,
    pub current_streak: i32,
    pub total_xp: i32,
    pub progress_percentage: i32,
    pub is_duplicate: bool,
}
