use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lesson row in the "lessons" table. Inactive lessons are excluded from
/// every read path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty_level: i32,
    pub xp_reward: i32,
    pub order_index: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    MultipleChoice,
    TextInput,
}

impl ProblemType {
    pub fn as_str(&self) -> &str {
        match self {
            ProblemType::MultipleChoice => "multiple_choice",
            ProblemType::TextInput => "text_input",
        }
    }

    /// Lenient decode of the stored discriminator.
    pub fn from_db(value: &str) -> Self {
        match value {
            "text_input" => ProblemType::TextInput,
            _ => ProblemType::MultipleChoice,
        }
    }
}

/// Lesson joined with the caller's progress row. Absence of a progress row
/// is the "never attempted" state, not an error.
#[derive(Debug, FromRow, Serialize)]
pub struct LessonSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty_level: i32,
    pub xp_reward: i32,
    pub order_index: i32,
    pub is_completed: bool,
    pub best_score: f64,
    pub attempts_count: i32,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Problem row as read from storage (public columns only)
#[derive(Debug, FromRow)]
pub struct ProblemRow {
    pub id: Uuid,
    pub question: String,
    pub problem_type: String,
    pub order_index: i32,
}

/// Option row as read from storage (no is_correct flag)
#[derive(Debug, FromRow)]
pub struct OptionRow {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub content: String,
    pub order_index: i32,
}

/// Candidate option as serialized to clients. The is_correct flag never
/// appears in this projection.
#[derive(Debug, Serialize)]
pub struct OptionPublic {
    pub id: Uuid,
    pub content: String,
    pub order_index: i32,
}

/// Problem as serialized to clients pre-grading
#[derive(Debug, Serialize)]
pub struct ProblemPublic {
    pub id: Uuid,
    pub question: String,
    pub problem_type: ProblemType,
    pub order_index: i32,
    pub options: Vec<OptionPublic>,
}

/// Internal grading projection: one row per problem with the id of its
/// correct-flagged option. Never serialized to a client response.
#[derive(Debug, FromRow)]
pub struct AnswerKey {
    pub problem_id: Uuid,
    pub correct_option_id: Option<Uuid>,
}

/// Lesson detail with the caller's progress and the public problem set
#[derive(Debug, Serialize)]
pub struct LessonDetail {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty_level: i32,
    pub xp_reward: i32,
    pub order_index: i32,
    pub is_completed: bool,
    pub best_score: f64,
    pub attempts_count: i32,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problems: Option<Vec<ProblemPublic>>,
}

/// Aggregate statistics for a lesson
#[derive(Debug, Serialize)]
pub struct LessonStats {
    pub lesson_id: Uuid,
    pub title: String,
    pub difficulty_level: i32,
    pub xp_reward: i32,
    pub total_attempts: i64,
    pub average_score: f64,
    pub completions: i64,
    pub distinct_users: i64,
}
