use axum::http::StatusCode;
use quiz_api::services::history_slot::MemorySlot;
use serde_json::{json, Value};

mod common;

fn stored_history(count: usize) -> String {
    // Newest first, as the store keeps it.
    let entries: Vec<Value> = (0..count)
        .map(|i| {
            let n = count - i;
            json!({
                "quizId": format!("quiz-{}", n),
                "quizTitle": format!("Lecture {}", n),
                "score": n % 6,
                "total": 5,
                "timestamp": 1_700_000_000_000i64 + n as i64,
            })
        })
        .collect();
    Value::Array(entries).to_string()
}

fn app_with_history(raw: &str) -> axum::Router {
    let config = common::test_config();
    let slot = MemorySlot::with_value(&config.history_key, raw);
    common::TestApp {
        config,
        slot,
        ..Default::default()
    }
    .build()
}

#[tokio::test]
async fn test_empty_dashboard() {
    let app = common::create_test_app();

    let (status, json) = common::send(&app, "GET", "/api/v1/dashboard", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["average_percentage"], 0);
    assert_eq!(json["total_quizzes"], 0);
    assert!(json["trend"].as_array().unwrap().is_empty());
    assert!(json["recent"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_trend_shows_last_ten_oldest_first() {
    let app = app_with_history(&stored_history(12));

    let (_, json) = common::send(&app, "GET", "/api/v1/dashboard", None).await;

    assert_eq!(json["total_quizzes"], 12);
    let trend = json["trend"].as_array().unwrap();
    assert_eq!(trend.len(), 10);
    assert_eq!(trend[0]["label"], "Quiz 1");
    assert_eq!(trend[0]["title"], "Lecture 3");
    assert_eq!(trend[9]["label"], "Quiz 10");
    assert_eq!(trend[9]["title"], "Lecture 12");

    let recent = json["recent"].as_array().unwrap();
    assert_eq!(recent.len(), 12);
    assert_eq!(recent[0]["quiz_title"], "Lecture 12");
}

#[tokio::test]
async fn test_corrupt_history_reads_as_empty() {
    let app = app_with_history("{{ definitely not json");

    let (status, json) = common::send(&app, "GET", "/api/v1/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));

    let (_, json) = common::send(&app, "GET", "/api/v1/dashboard", None).await;
    assert_eq!(json["total_quizzes"], 0);
}
