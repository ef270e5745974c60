use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics::{
    record_submission_duplicate, record_submission_graded, ANSWERS_GRADED_TOTAL,
    LESSONS_COMPLETED_TOTAL,
};
use crate::models::attempt::{
    GradedAnswer, LessonAttempt, SubmissionResult, SubmitAnswersRequest, SubmittedAnswer,
};
use crate::models::lesson::AnswerKey;
use crate::services::auth_service::is_unique_violation;
use crate::services::lesson_service::LessonService;
use crate::services::profile_service::user_stats;

/// Score at or above which a submission completes the lesson
const COMPLETION_THRESHOLD: f64 = 70.0;

pub struct SubmissionService {
    db: PgPool,
    lessons: LessonService,
}

impl SubmissionService {
    pub fn new(db: PgPool) -> Self {
        let lessons = LessonService::new(db.clone());
        Self { db, lessons }
    }

    /// Grade a submission and merge the result into the caller's progress
    /// and aggregate stats. Replays of a known attempt id short-circuit to
    /// the stored result without grading or writing anything.
    pub async fn submit(
        &self,
        lesson_id: Uuid,
        user_id: Uuid,
        req: &SubmitAnswersRequest,
    ) -> Result<SubmissionResult, ApiError> {
        let attempt_id = parse_attempt_id(&req.attempt_id)?;

        // Idempotency check
        if let Some(existing) = self.find_attempt(attempt_id).await? {
            tracing::info!(%attempt_id, "Returning stored result for duplicate submission");
            return self.replay_result(&existing, user_id).await;
        }

        // Lesson resolution
        let lesson = self.lessons.get_active_lesson(lesson_id).await?;

        // Problem resolution for grading
        let answer_key = self.lessons.problems_with_answers(lesson_id).await?;
        if answer_key.is_empty() {
            return Err(ApiError::Unprocessable(
                "Lesson has no problems to grade".to_string(),
            ));
        }

        // Grading
        let outcome = grade_answers(&answer_key, &req.answers);
        let is_completed = outcome.score >= COMPLETION_THRESHOLD;
        let xp_earned = calculate_xp(lesson.xp_reward, is_completed);

        for graded in &outcome.graded {
            ANSWERS_GRADED_TOTAL
                .with_label_values(&[if graded.is_correct { "true" } else { "false" }])
                .inc();
        }

        match self
            .persist(attempt_id, user_id, lesson_id, &outcome, xp_earned, is_completed)
            .await
        {
            Ok(newly_completed) => {
                record_submission_graded();
                if newly_completed {
                    LESSONS_COMPLETED_TOTAL.inc();
                }
            }
            // A concurrent submission with the same attempt id won the
            // insert race; the stored result is authoritative.
            Err(ApiError::Internal(source))
                if source
                    .downcast_ref::<sqlx::Error>()
                    .is_some_and(is_unique_violation) =>
            {
                tracing::warn!(%attempt_id, "Lost idempotency insert race, replaying stored result");
                let existing = self
                    .find_attempt(attempt_id)
                    .await?
                    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!(
                        "attempt vanished after unique-key conflict"
                    )))?;
                return self.replay_result(&existing, user_id).await;
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            %attempt_id,
            %lesson_id,
            %user_id,
            score = outcome.score,
            xp_earned,
            is_completed,
            "Submission graded"
        );

        let stats = user_stats(&self.db, user_id).await?;

        Ok(SubmissionResult {
            attempt_id,
            score: outcome.score,
            xp_earned,
            is_completed,
            correct_answers: Some(outcome.correct_count),
            total_problems: Some(outcome.total_problems),
            current_streak: stats.current_streak,
            total_xp: stats.total_xp,
            progress_percentage: stats.progress_percentage,
            is_duplicate: false,
        })
    }

    async fn find_attempt(&self, attempt_id: Uuid) -> Result<Option<LessonAttempt>, ApiError> {
        let attempt = sqlx::query_as::<_, LessonAttempt>(
            "SELECT * FROM lesson_attempts WHERE attempt_id = $1",
        )
        .bind(attempt_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(attempt)
    }

    /// Result for a replayed submission: the stored grading outcome plus the
    /// caller's current (not recomputed) aggregates.
    async fn replay_result(
        &self,
        existing: &LessonAttempt,
        user_id: Uuid,
    ) -> Result<SubmissionResult, ApiError> {
        record_submission_duplicate();
        let stats = user_stats(&self.db, user_id).await?;

        Ok(SubmissionResult {
            attempt_id: existing.attempt_id,
            score: existing.score,
            xp_earned: existing.xp_earned,
            is_completed: existing.is_completed,
            correct_answers: None,
            total_problems: None,
            current_streak: stats.current_streak,
            total_xp: stats.total_xp,
            progress_percentage: stats.progress_percentage,
            is_duplicate: true,
        })
    }

    /// All persistent effects of one submission in a single transaction:
    /// attempt insert, progress upsert, XP credit, streak update. Returns
    /// whether this submission newly completed the lesson.
    async fn persist(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
        lesson_id: Uuid,
        outcome: &GradingOutcome,
        xp_earned: i32,
        is_completed: bool,
    ) -> Result<bool, ApiError> {
        let mut tx = self.db.begin().await?;

        // The pre-image decides the false->true completion transition; the
        // row lock serializes concurrent submissions for the same pair.
        let was_completed: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT is_completed FROM lesson_progress
            WHERE user_id = $1 AND lesson_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(&mut *tx)
        .await?;

        let newly_completed = is_completed && !was_completed.unwrap_or(false);

        let submitted_answers = serde_json::to_value(&outcome.graded).map_err(|e| {
            ApiError::Internal(anyhow::Error::new(e).context("Failed to serialize graded answers"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO lesson_attempts
                (id, attempt_id, user_id, lesson_id, submitted_answers, score, xp_earned, is_completed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(attempt_id)
        .bind(user_id)
        .bind(lesson_id)
        .bind(&submitted_answers)
        .bind(outcome.score)
        .bind(xp_earned)
        .bind(is_completed)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO lesson_progress
                (user_id, lesson_id, is_completed, best_score, attempts_count,
                 last_attempted_at, completed_at)
            VALUES ($1, $2, $3, $4, 1, NOW(), CASE WHEN $3 THEN NOW() END)
            ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                is_completed = lesson_progress.is_completed OR EXCLUDED.is_completed,
                best_score = GREATEST(lesson_progress.best_score, EXCLUDED.best_score),
                attempts_count = lesson_progress.attempts_count + 1,
                last_attempted_at = NOW(),
                completed_at = CASE
                    WHEN EXCLUDED.is_completed AND NOT lesson_progress.is_completed THEN NOW()
                    ELSE lesson_progress.completed_at
                END
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(is_completed)
        .bind(outcome.score)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET total_xp = total_xp + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(xp_earned)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        // Streaks are completion-triggered: they move only when a lesson is
        // completed for the first time.
        if newly_completed {
            sqlx::query(
                r#"
                UPDATE users SET
                    current_streak = current_streak + 1,
                    best_streak = GREATEST(best_streak, current_streak + 1),
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(newly_completed)
    }
}

/// Idempotency keys must be v4 UUIDs; anything else is rejected before the
/// first storage round trip.
fn parse_attempt_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .ok()
        .filter(|id| id.get_version_num() == 4)
        .ok_or_else(|| {
            ApiError::validation("Invalid attempt ID format. Expected UUID v4 format.")
        })
}

struct GradingOutcome {
    score: f64,
    correct_count: usize,
    total_problems: usize,
    graded: Vec<GradedAnswer>,
}

/// Grade every problem of the lesson against the submitted selections. An
/// unanswered or unmatched problem counts as incorrect. The score is always
/// computed against the lesson's full problem set.
fn grade_answers(answer_key: &[AnswerKey], answers: &[SubmittedAnswer]) -> GradingOutcome {
    let selected_by_problem: HashMap<Uuid, Option<Uuid>> = answers
        .iter()
        .map(|a| (a.problem_id, a.selected_option_id))
        .collect();

    let mut correct_count = 0;
    let mut graded = Vec::with_capacity(answer_key.len());

    for key in answer_key {
        let selected = selected_by_problem
            .get(&key.problem_id)
            .copied()
            .flatten();

        let is_correct = match (selected, key.correct_option_id) {
            (Some(selected), Some(correct)) => selected == correct,
            _ => false,
        };

        if is_correct {
            correct_count += 1;
        }

        graded.push(GradedAnswer {
            problem_id: key.problem_id,
            selected_option_id: selected,
            correct_option_id: key.correct_option_id,
            is_correct,
        });
    }

    let total_problems = answer_key.len();
    let score = if total_problems == 0 {
        0.0
    } else {
        (100.0 * correct_count as f64 / total_problems as f64).round()
    };

    GradingOutcome {
        score,
        correct_count,
        total_problems,
        graded,
    }
}

/// Full reward on completion, half (rounded) for a good-faith incomplete
/// attempt.
fn calculate_xp(base_xp: i32, is_completed: bool) -> i32 {
    if is_completed {
        base_xp
    } else {
        (base_xp as f64 * 0.5).round() as i32
    }
}
