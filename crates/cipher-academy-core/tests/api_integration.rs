//! Integration tests for the HTTP-style router.
//!
//! These tests play a full week through the public routes the web client
//! uses, backed by a file database.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use cipher_academy_core::{
    Api, Catalog, ChallengeEngine, Database, Method, Plan, SlotKey, SlotKind, User, UserId,
};
use serde_json::json;

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn setup(dir: &tempfile::TempDir) -> Api<Database> {
    let db = Database::open_path(&dir.path().join("api.db")).unwrap();
    let engine = ChallengeEngine::new(Arc::new(Catalog::builtin()), db);
    engine
        .enroll(User::new(UserId(10), at("2024-01-01T09:00:00Z")).with_plan(Plan::BetaTrial))
        .unwrap();
    Api::new(Arc::new(engine))
}

#[test]
fn test_full_week_through_routes() {
    let dir = tempfile::tempdir().unwrap();
    let api = setup(&dir);
    let friday = at("2024-01-12T15:30:00Z");

    for (index, kind) in SlotKind::ALL.into_iter().enumerate() {
        let generated = api.handle_at(
            Method::Post,
            "/generate-message",
            &json!({"user_id": 10, "week_number": 1}).to_string(),
            friday,
        );
        assert_eq!(generated.status, 200, "{}", generated.body);
        assert_eq!(generated.body["puzzle_index"], index);

        let answer = api
            .engine()
            .catalog()
            .slot(SlotKey::new(1, kind))
            .unwrap()
            .puzzle
            .expected_answer
            .to_lowercase();
        let submitted = api.handle_at(
            Method::Post,
            "/submit-answer",
            &json!({"user_id": 10, "week_number": 1, "puzzle_index": index, "answer": answer})
                .to_string(),
            friday,
        );
        assert_eq!(submitted.status, 200);
        assert_eq!(submitted.body["result"], "correct");
    }

    let finished = api.handle_at(
        Method::Post,
        "/generate-message",
        &json!({"user_id": 10, "week_number": 1}).to_string(),
        friday,
    );
    assert_eq!(finished.status, 409);
    assert_eq!(finished.body["reason"], "already_completed");

    let progress = api.handle_at(Method::Get, "/api/user-progress/10", "", friday);
    assert_eq!(progress.status, 200);
    assert_eq!(progress.body["current_week"], 2);
    assert_eq!(progress.body["total_solved"], 3);
    assert_eq!(progress.body["current_streak"], 1);

    let board = api.handle_at(Method::Get, "/api/messages/week/1?user_id=10", "", friday);
    let views = board.body.as_array().unwrap();
    assert!(views.iter().all(|v| v["is_completed"] == true));
    assert!(views.iter().all(|v| v["user_solution"].is_string()));
}

#[test]
fn test_plan_horizon_blocks_generate() {
    let dir = tempfile::tempdir().unwrap();
    let api = setup(&dir);
    let much_later = at("2024-01-01T09:00:00Z") + Duration::weeks(20);

    let allowed = api.handle_at(
        Method::Post,
        "/generate-message",
        &json!({"user_id": 10, "week_number": 4}).to_string(),
        much_later,
    );
    assert_eq!(allowed.status, 200);

    let blocked = api.handle_at(
        Method::Post,
        "/generate-message",
        &json!({"user_id": 10, "week_number": 5}).to_string(),
        much_later,
    );
    assert_eq!(blocked.status, 409);
    assert_eq!(blocked.body["reason"], "locked");
}
