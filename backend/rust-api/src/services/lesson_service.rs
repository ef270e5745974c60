use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::lesson::{
    AnswerKey, Lesson, LessonDetail, LessonStats, LessonSummary, OptionPublic, OptionRow,
    ProblemPublic, ProblemRow, ProblemType,
};

pub struct LessonService {
    db: PgPool,
}

impl LessonService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active lessons ordered by order_index, joined with the caller's
    /// progress. Without a caller (or without a progress row) the progress
    /// columns fall back to the "never attempted" defaults.
    pub async fn list_lessons(
        &self,
        caller: Option<Uuid>,
    ) -> Result<Vec<LessonSummary>, ApiError> {
        let lessons = sqlx::query_as::<_, LessonSummary>(
            r#"
            SELECT l.id, l.title, l.description, l.difficulty_level, l.xp_reward, l.order_index,
                COALESCE(lp.is_completed, FALSE) AS is_completed,
                COALESCE(lp.best_score, 0)::DOUBLE PRECISION AS best_score,
                COALESCE(lp.attempts_count, 0) AS attempts_count,
                lp.last_attempted_at,
                lp.completed_at
            FROM lessons l
            LEFT JOIN lesson_progress lp ON lp.lesson_id = l.id AND lp.user_id = $1
            WHERE l.is_active
            ORDER BY l.order_index
            "#,
        )
        .bind(caller)
        .fetch_all(&self.db)
        .await?;

        Ok(lessons)
    }

    /// Lesson detail with the caller's progress and (optionally) the public
    /// problem projection.
    pub async fn get_lesson(
        &self,
        lesson_id: Uuid,
        caller: Option<Uuid>,
        include_problems: bool,
    ) -> Result<LessonDetail, ApiError> {
        let row = sqlx::query_as::<_, LessonSummary>(
            r#"
            SELECT l.id, l.title, l.description, l.difficulty_level, l.xp_reward, l.order_index,
                COALESCE(lp.is_completed, FALSE) AS is_completed,
                COALESCE(lp.best_score, 0)::DOUBLE PRECISION AS best_score,
                COALESCE(lp.attempts_count, 0) AS attempts_count,
                lp.last_attempted_at,
                lp.completed_at
            FROM lessons l
            LEFT JOIN lesson_progress lp ON lp.lesson_id = l.id AND lp.user_id = $2
            WHERE l.id = $1 AND l.is_active
            "#,
        )
        .bind(lesson_id)
        .bind(caller)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))?;

        let problems = if include_problems {
            Some(self.problems_public(lesson_id).await?)
        } else {
            None
        };

        Ok(LessonDetail {
            id: row.id,
            title: row.title,
            description: row.description,
            difficulty_level: row.difficulty_level,
            xp_reward: row.xp_reward,
            order_index: row.order_index,
            is_completed: row.is_completed,
            best_score: row.best_score,
            attempts_count: row.attempts_count,
            last_attempted_at: row.last_attempted_at,
            completed_at: row.completed_at,
            problems,
        })
    }

    /// Lesson row by id; NotFound when missing or soft-deleted.
    pub async fn get_active_lesson(&self, lesson_id: Uuid) -> Result<Lesson, ApiError> {
        sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1 AND is_active")
            .bind(lesson_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))
    }

    /// Public problem projection: questions and candidate options without
    /// correct-answer data. This is the only problem shape ever serialized
    /// pre-grading.
    pub async fn problems_public(&self, lesson_id: Uuid) -> Result<Vec<ProblemPublic>, ApiError> {
        let problems = sqlx::query_as::<_, ProblemRow>(
            r#"
            SELECT id, question, problem_type, order_index
            FROM problems
            WHERE lesson_id = $1
            ORDER BY order_index
            "#,
        )
        .bind(lesson_id)
        .fetch_all(&self.db)
        .await?;

        let options = sqlx::query_as::<_, OptionRow>(
            r#"
            SELECT o.id, o.problem_id, o.content, o.order_index
            FROM problem_options o
            JOIN problems p ON p.id = o.problem_id
            WHERE p.lesson_id = $1
            ORDER BY o.order_index
            "#,
        )
        .bind(lesson_id)
        .fetch_all(&self.db)
        .await?;

        let mut options_by_problem: HashMap<Uuid, Vec<OptionPublic>> = HashMap::new();
        for option in options {
            options_by_problem
                .entry(option.problem_id)
                .or_default()
                .push(OptionPublic {
                    id: option.id,
                    content: option.content,
                    order_index: option.order_index,
                });
        }

        Ok(problems
            .into_iter()
            .map(|p| {
                let problem_type = ProblemType::from_db(&p.problem_type);
                // Text-input problems keep their answer rows private.
                let options = match problem_type {
                    ProblemType::MultipleChoice => {
                        options_by_problem.remove(&p.id).unwrap_or_default()
                    }
                    ProblemType::TextInput => Vec::new(),
                };
                ProblemPublic {
                    id: p.id,
                    question: p.question,
                    problem_type,
                    order_index: p.order_index,
                    options,
                }
            })
            .collect())
    }

    /// Internal grading projection. Consumed exclusively by the grading
    /// engine; never serialized to a client response.
    pub async fn problems_with_answers(
        &self,
        lesson_id: Uuid,
    ) -> Result<Vec<AnswerKey>, ApiError> {
        let keys = sqlx::query_as::<_, AnswerKey>(
            r#"
            SELECT p.id AS problem_id, o.id AS correct_option_id
            FROM problems p
            LEFT JOIN problem_options o ON o.problem_id = p.id AND o.is_correct
            WHERE p.lesson_id = $1
            ORDER BY p.order_index
            "#,
        )
        .bind(lesson_id)
        .fetch_all(&self.db)
        .await?;

        Ok(keys)
    }

    /// Aggregate attempt statistics for a lesson.
    pub async fn lesson_stats(&self, lesson_id: Uuid) -> Result<LessonStats, ApiError> {
        let lesson = self.get_active_lesson(lesson_id).await?;

        #[derive(sqlx::FromRow)]
        struct StatsRow {
            total_attempts: i64,
            average_score: f64,
            completions: i64,
            distinct_users: i64,
        }

        let stats = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT COUNT(*) AS total_attempts,
                COALESCE(AVG(score), 0)::DOUBLE PRECISION AS average_score,
                COUNT(*) FILTER (WHERE is_completed) AS completions,
                COUNT(DISTINCT user_id) AS distinct_users
            FROM lesson_attempts
            WHERE lesson_id = $1
            "#,
        )
        .bind(lesson_id)
        .fetch_one(&self.db)
        .await?;

        Ok(LessonStats {
            lesson_id: lesson.id,
            title: lesson.title,
            difficulty_level: lesson.difficulty_level,
            xp_reward: lesson.xp_reward,
            total_attempts: stats.total_attempts,
            average_score: stats.average_score,
            completions: stats.completions,
            distinct_users: stats.distinct_users,
        })
    }
}
