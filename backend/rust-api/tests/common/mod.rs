#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use mathquest_api::{config::Config, create_router, db, services::AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// Deterministic seed ids (v4-shaped) shared by the DB-backed suites.
pub const LESSON_ID: &str = "00000000-0000-4000-8000-000000000001";
pub const EMPTY_LESSON_ID: &str = "00000000-0000-4000-8000-000000000002";

pub const PROBLEM_1: &str = "00000000-0000-4000-8000-000000000011";
pub const PROBLEM_2: &str = "00000000-0000-4000-8000-000000000012";
pub const PROBLEM_3: &str = "00000000-0000-4000-8000-000000000013";

pub const PROBLEM_1_CORRECT: &str = "00000000-0000-4000-8000-000000000111";
pub const PROBLEM_1_WRONG: &str = "00000000-0000-4000-8000-000000000112";
pub const PROBLEM_2_CORRECT: &str = "00000000-0000-4000-8000-000000000121";
pub const PROBLEM_2_WRONG: &str = "00000000-0000-4000-8000-000000000122";
pub const PROBLEM_3_CORRECT: &str = "00000000-0000-4000-8000-000000000131";
pub const PROBLEM_3_WRONG: &str = "00000000-0000-4000-8000-000000000132";

/// The seeded lesson's base XP reward
pub const LESSON_XP_REWARD: i32 = 30;

/// Build the app against the test database, or None when no database is
/// reachable (the suite then skips).
pub async fn create_test_app() -> Option<Router> {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    // Load test environment from .env.test
    dotenvy::from_filename(".env.test").ok();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;

    let config = Config {
        database_url,
        db_max_connections: 5,
        jwt_secret: "test-secret-only-for-integration-tests".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
    };

    let pool = match db::connect(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Test database not reachable, skipping: {}", e);
            return None;
        }
    };

    if let Err(e) = db::run_migrations(&pool).await {
        eprintln!("Test migrations failed, skipping: {}", e);
        return None;
    }

    seed_test_data(&pool).await;

    let app_state = Arc::new(
        AppState::new(config, pool)
            .await
            .expect("Failed to initialize test app state"),
    );

    Some(create_router(app_state))
}

async fn seed_test_data(pool: &sqlx::PgPool) {
    // One gradeable lesson with three problems, four options each, and one
    // lesson without problems. Idempotent across runs and parallel suites.
    sqlx::query(
        r#"
        INSERT INTO lessons (id, title, description, difficulty_level, xp_reward, order_index)
        VALUES
            ($1, 'Addition Basics', 'Single-digit sums', 1, $3, 1),
            ($2, 'Coming Soon', 'No content yet', 1, 10, 99)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(Uuid::parse_str(LESSON_ID).unwrap())
    .bind(Uuid::parse_str(EMPTY_LESSON_ID).unwrap())
    .bind(LESSON_XP_REWARD)
    .execute(pool)
    .await
    .expect("Failed to seed test lessons");

    let problems = [
        (PROBLEM_1, "What is 2 + 2?", 1),
        (PROBLEM_2, "What is 3 + 5?", 2),
        (PROBLEM_3, "What is 7 + 6?", 3),
    ];

    for (id, question, order) in problems {
        sqlx::query(
            r#"
            INSERT INTO problems (id, lesson_id, question, problem_type, order_index)
            VALUES ($1, $2, $3, 'multiple_choice', $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::parse_str(id).unwrap())
        .bind(Uuid::parse_str(LESSON_ID).unwrap())
        .bind(question)
        .bind(order)
        .execute(pool)
        .await
        .expect("Failed to seed test problem");
    }

    let options = [
        (PROBLEM_1_CORRECT, PROBLEM_1, "4", true, 1),
        (PROBLEM_1_WRONG, PROBLEM_1, "5", false, 2),
        (PROBLEM_2_CORRECT, PROBLEM_2, "8", true, 1),
        (PROBLEM_2_WRONG, PROBLEM_2, "9", false, 2),
        (PROBLEM_3_CORRECT, PROBLEM_3, "13", true, 1),
        (PROBLEM_3_WRONG, PROBLEM_3, "14", false, 2),
    ];

    for (id, problem_id, content, is_correct, order) in options {
        sqlx::query(
            r#"
            INSERT INTO problem_options (id, problem_id, content, is_correct, order_index)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::parse_str(id).unwrap())
        .bind(Uuid::parse_str(problem_id).unwrap())
        .bind(content)
        .bind(is_correct)
        .bind(order)
        .execute(pool)
        .await
        .expect("Failed to seed test option");
    }
}

/// Unique per-test email so parallel suites never collide
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4().simple())
}

/// Unique per-test username (max 30 chars)
pub fn unique_username(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &suffix[..12])
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// Test helper to register a new user
pub async fn register_user(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
) -> (StatusCode, Value) {
    let request_body = json!({
        "username": username,
        "email": email,
        "password": password,
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, read_json(response).await)
}

/// Test helper to login a user
pub async fn login_user(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    let request_body = json!({
        "email": email,
        "password": password,
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, read_json(response).await)
}

/// Extract the bearer token from a register/login response body
pub fn token_from(body: &Value) -> String {
    body["data"]["token"]
        .as_str()
        .expect("token not found in response")
        .to_string()
}

/// GET with an optional bearer token
pub async fn get_json(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    (status, read_json(response).await)
}

/// POST a JSON body with an optional bearer token
pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    (status, read_json(response).await)
}

/// Build a submit body from (problem_id, selected_option_id) pairs
pub fn submit_body(attempt_id: &str, answers: &[(&str, Option<&str>)]) -> Value {
    let answers: Vec<Value> = answers
        .iter()
        .map(|(problem_id, selected)| {
            json!({
                "problem_id": problem_id,
                "selected_option_id": selected,
            })
        })
        .collect();

    json!({
        "attempt_id": attempt_id,
        "answers": answers,
    })
}

/// Register a fresh user and return (token, email)
pub async fn fresh_user(app: &Router, prefix: &str) -> (String, String) {
    let email = unique_email(prefix);
    let username = unique_username(prefix);
    let (status, body) = register_user(app, &username, &email, "password123").await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    (token_from(&body), email)
}
