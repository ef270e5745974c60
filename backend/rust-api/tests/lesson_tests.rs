use axum::http::StatusCode;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_list_lessons_anonymous() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let (status, body) = common::get_json(&app, "/lessons", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let lessons = body["data"].as_array().unwrap();
    assert!(!lessons.is_empty());

    let seeded = lessons
        .iter()
        .find(|l| l["id"] == common::LESSON_ID)
        .expect("seeded lesson not in listing");

    // Anonymous callers see the "never attempted" defaults
    assert_eq!(seeded["is_completed"], false);
    assert_eq!(seeded["best_score"], 0.0);
    assert_eq!(seeded["attempts_count"], 0);
}

#[tokio::test]
async fn test_list_lessons_ordered_by_order_index() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let (status, body) = common::get_json(&app, "/lessons", None).await;
    assert_eq!(status, StatusCode::OK);

    let indexes: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["order_index"].as_i64().unwrap())
        .collect();
    let mut sorted = indexes.clone();
    sorted.sort();
    assert_eq!(indexes, sorted);
}

#[tokio::test]
async fn test_list_lessons_with_progress_after_submission() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let (token, _) = common::fresh_user(&app, "listprog").await;

    let attempt_id = Uuid::new_v4().to_string();
    let body = common::submit_body(
        &attempt_id,
        &[
            (common::PROBLEM_1, Some(common::PROBLEM_1_CORRECT)),
            (common::PROBLEM_2, Some(common::PROBLEM_2_CORRECT)),
            (common::PROBLEM_3, Some(common::PROBLEM_3_CORRECT)),
        ],
    );
    let uri = format!("/lessons/{}/submit", common::LESSON_ID);
    let (status, _) = common::post_json(&app, &uri, Some(&token), body).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::get_json(&app, "/lessons", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let seeded = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["id"] == common::LESSON_ID)
        .unwrap()
        .clone();

    assert_eq!(seeded["is_completed"], true);
    assert_eq!(seeded["best_score"], 100.0);
    assert_eq!(seeded["attempts_count"], 1);
    assert!(seeded["completed_at"].is_string());
}

#[tokio::test]
async fn test_get_lesson_includes_problems_without_answers() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let uri = format!("/lessons/{}", common::LESSON_ID);
    let (status, body) = common::get_json(&app, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let lesson = &body["data"];
    assert_eq!(lesson["title"], "Addition Basics");

    let problems = lesson["problems"].as_array().unwrap();
    assert_eq!(problems.len(), 3);

    for problem in problems {
        assert!(problem["question"].is_string());
        assert_eq!(problem["problem_type"], "multiple_choice");
        let options = problem["options"].as_array().unwrap();
        assert!(!options.is_empty());
    }

    // The correct-answer projection must never reach clients
    let raw = body.to_string();
    assert!(!raw.contains("is_correct"));
    assert!(!raw.contains("correct_option_id"));
}

#[tokio::test]
async fn test_get_lesson_malformed_id_is_rejected_before_storage() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let (status, body) = common::get_json(&app, "/lessons/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");
}

#[tokio::test]
async fn test_get_lesson_unknown_id_404() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let uri = format!("/lessons/{}", Uuid::new_v4());
    let (status, body) = common::get_json(&app, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn test_lesson_stats_is_public() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let uri = format!("/lessons/{}/stats", common::LESSON_ID);
    let (status, body) = common::get_json(&app, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let stats = &body["data"];
    assert_eq!(stats["lesson_id"], common::LESSON_ID);
    assert_eq!(stats["title"], "Addition Basics");
    assert!(stats["total_attempts"].as_i64().is_some());
    assert!(stats["average_score"].as_f64().is_some());
}

#[tokio::test]
async fn test_lesson_attempts_requires_auth() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let uri = format!("/lessons/{}/attempts", common::LESSON_ID);
    let (status, _) = common::get_json(&app, &uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lesson_attempts_lists_own_history_newest_first() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let (token, _) = common::fresh_user(&app, "attempts").await;
    let uri = format!("/lessons/{}/attempts", common::LESSON_ID);

    // No attempts yet
    let (status, body) = common::get_json(&app, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Two submissions
    for _ in 0..2 {
        let submit = common::submit_body(
            &Uuid::new_v4().to_string(),
            &[(common::PROBLEM_1, Some(common::PROBLEM_1_CORRECT))],
        );
        let submit_uri = format!("/lessons/{}/submit", common::LESSON_ID);
        let (status, _) = common::post_json(&app, &submit_uri, Some(&token), submit).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = common::get_json(&app, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let attempts = body["data"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);

    let first = attempts[0]["submitted_at"].as_str().unwrap();
    let second = attempts[1]["submitted_at"].as_str().unwrap();
    assert!(first >= second, "attempts should be newest first");
}

#[tokio::test]
async fn test_health_endpoint() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let (status, body) = common::get_json(&app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "mathquest-api");
    assert_eq!(body["dependencies"]["postgres"]["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_requires_basic_auth() {
    let Some(app) = common::create_test_app().await else {
        eprintln!("Skipping: no test database configured");
        return;
    };

    let (status, _) = common::get_json(&app, "/metrics", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
