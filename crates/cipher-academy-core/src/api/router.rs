use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::dto::{
    ErrorBody, GenerateMessageRequest, GenerateMessageResponse, HealthResponse, MessageView,
    SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::catalog::{SlotKey, SlotKind};
use crate::engine::ChallengeEngine;
use crate::error::{EngineError, NotSubmittableReason, ValidationError};
use crate::storage::ProgressStore;
use crate::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::str::FromStr for Method {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(ValidationError::InvalidValue {
                field: "method".into(),
                message: format!("unsupported method '{other}'"),
            }),
        }
    }
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::error(500, format!("failed to encode response: {e}"), None),
        }
    }

    fn error(status: u16, error: String, reason: Option<&str>) -> Self {
        let body = ErrorBody {
            error,
            reason: reason.map(str::to_string),
        };
        Self {
            status,
            body: serde_json::to_value(body).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<&EngineError> for ApiResponse {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Catalog(e) => Self::error(404, e.to_string(), None),
            EngineError::SlotNotSubmittable { reason } => {
                Self::error(409, err.to_string(), Some(reason.as_str()))
            }
            EngineError::Validation(e) => Self::error(422, e.to_string(), None),
            EngineError::UnknownUser(_) => Self::error(404, err.to_string(), None),
            EngineError::DuplicateUser(_) => Self::error(409, err.to_string(), None),
            EngineError::StorageUnavailable(_) => Self::error(
                503,
                "Service temporarily unavailable, please try again".into(),
                None,
            ),
            EngineError::Config(_) => Self::error(500, "Internal error".into(), None),
        }
    }
}

/// Transport-agnostic request router over a [`ChallengeEngine`].
///
/// Routes:
/// - `POST /generate-message`
/// - `POST /submit-answer`
/// - `GET  /api/user-progress/{user_id}`
/// - `GET  /api/messages/week/{week}?user_id={id}`
/// - `GET  /api/eras`
/// - `GET  /api/health`
pub struct Api<S> {
    engine: Arc<ChallengeEngine<S>>,
}

impl<S> Clone for Api<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

enum Route<'a> {
    GenerateMessage,
    SubmitAnswer,
    UserProgress(&'a str),
    WeekMessages(&'a str),
    Eras,
    Health,
}

impl<'a> Route<'a> {
    fn parse(path: &'a str) -> Option<(Self, Method)> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let route = match segments[..] {
            ["generate-message"] => (Route::GenerateMessage, Method::Post),
            ["submit-answer"] => (Route::SubmitAnswer, Method::Post),
            ["api", "user-progress", id] => (Route::UserProgress(id), Method::Get),
            ["api", "messages", "week", week] => (Route::WeekMessages(week), Method::Get),
            ["api", "eras"] => (Route::Eras, Method::Get),
            ["api", "health"] => (Route::Health, Method::Get),
            _ => return None,
        };
        Some(route)
    }
}

impl<S: ProgressStore> Api<S> {
    pub fn new(engine: Arc<ChallengeEngine<S>>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ChallengeEngine<S> {
        &self.engine
    }

    /// Handle a request at the current time.
    pub fn handle(&self, method: Method, path: &str, body: &str) -> ApiResponse {
        self.handle_at(method, path, body, Utc::now())
    }

    /// Handle a request as of `now`.
    pub fn handle_at(&self, method: Method, target: &str, body: &str, now: DateTime<Utc>) -> ApiResponse {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let Some((route, expected)) = Route::parse(path) else {
            return ApiResponse::error(404, format!("no route for {path}"), None);
        };
        if method != expected {
            return ApiResponse::error(405, format!("{method:?} not allowed on {path}"), None);
        }
        debug!(?method, path, "api request");

        let result = match route {
            Route::GenerateMessage => self.generate_message(body, now),
            Route::SubmitAnswer => self.submit_answer(body, now),
            Route::UserProgress(id) => self.user_progress(id, now),
            Route::WeekMessages(week) => self.week_messages(week, query, now),
            Route::Eras => Ok(ApiResponse::ok(&self.engine.catalog().list_eras())),
            Route::Health => self.health(now),
        };

        result.unwrap_or_else(|err| {
            if err.is_transient() {
                warn!(path, error = %err, "request failed on storage");
            }
            ApiResponse::from(&err)
        })
    }

    fn generate_message(&self, body: &str, now: DateTime<Utc>) -> Result<ApiResponse, EngineError> {
        let req: GenerateMessageRequest = parse_body(body)?;
        let board = self
            .engine
            .board_for_week(UserId(req.user_id), req.week_number, now)?;

        match board.first_available() {
            Some(entry) => Ok(ApiResponse::ok(&GenerateMessageResponse::from_entry(entry))),
            None if board.is_complete() => Err(EngineError::not_submittable(
                NotSubmittableReason::AlreadyCompleted,
            )),
            None => Err(EngineError::not_submittable(NotSubmittableReason::Locked)),
        }
    }

    fn submit_answer(&self, body: &str, now: DateTime<Utc>) -> Result<ApiResponse, EngineError> {
        let req: SubmitAnswerRequest = parse_body(body)?;
        let key = SlotKey::new(req.week_number, SlotKind::from_index(req.puzzle_index)?);
        let evaluation = self
            .engine
            .submit(UserId(req.user_id), key, &req.answer, now)?;
        Ok(ApiResponse::ok(&SubmitAnswerResponse::from(evaluation)))
    }

    fn user_progress(&self, id: &str, now: DateTime<Utc>) -> Result<ApiResponse, EngineError> {
        let id = parse_segment::<i64>("user_id", id)?;
        let summary = self.engine.summary(UserId(id), now)?;
        Ok(ApiResponse::ok(&summary))
    }

    fn week_messages(&self, week: &str, query: &str, now: DateTime<Utc>) -> Result<ApiResponse, EngineError> {
        let week = parse_segment::<u32>("week_number", week)?;
        let user_id = url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "user_id")
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "user_id".into(),
                message: "query parameter is required".into(),
            })?;
        let user_id = parse_segment::<i64>("user_id", &user_id)?;

        let board = self.engine.board_for_week(UserId(user_id), week, now)?;
        let views: Vec<MessageView> = board.entries.iter().map(MessageView::from).collect();
        Ok(ApiResponse::ok(&views))
    }

    fn health(&self, now: DateTime<Utc>) -> Result<ApiResponse, EngineError> {
        self.engine.health()?;
        Ok(ApiResponse::ok(&HealthResponse {
            status: "healthy".into(),
            timestamp: now,
            database: "connected".into(),
        }))
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ValidationError> {
    serde_json::from_str(body).map_err(|e| ValidationError::MalformedPayload(e.to_string()))
}

fn parse_segment<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, ValidationError> {
    raw.parse().map_err(|_| ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!("'{raw}' is not a valid number"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::DatabaseError;
    use crate::progress::{AttemptRecord, ProgressRecord, UserProgressSummary};
    use crate::storage::{Database, Submission, SubmissionOutcome};
    use crate::user::{Plan, User};
    use serde_json::json;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn api() -> Api<Database> {
        let engine = ChallengeEngine::new(Arc::new(Catalog::builtin()), Database::open_memory().unwrap());
        engine
            .enroll(User::new(UserId(1), at("2024-01-01T09:00:00Z")).with_plan(Plan::Full))
            .unwrap();
        Api::new(Arc::new(engine))
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert!("DELETE".parse::<Method>().is_err());
    }

    #[test]
    fn unknown_route_and_wrong_method() {
        let api = api();
        assert_eq!(api.handle(Method::Get, "/nope", "").status, 404);
        assert_eq!(api.handle(Method::Get, "/submit-answer", "").status, 405);
        assert_eq!(api.handle(Method::Post, "/api/health", "").status, 405);
    }

    #[test]
    fn health_reports_connected() {
        let response = api().handle(Method::Get, "/api/health", "");
        assert_eq!(response.status, 200);
        assert_eq!(response.body["status"], "healthy");
        assert_eq!(response.body["database"], "connected");
    }

    #[test]
    fn eras_are_listed_in_order() {
        let response = api().handle(Method::Get, "/api/eras", "");
        assert_eq!(response.status, 200);
        let eras = response.body.as_array().unwrap();
        assert_eq!(eras.len(), 5);
        assert_eq!(eras[0]["first_week"], 1);
        assert_eq!(eras[4]["last_week"], 91);
    }

    #[test]
    fn generate_message_before_release_is_locked() {
        let api = api();
        let body = json!({"user_id": 1, "week_number": 1}).to_string();
        let response = api.handle_at(Method::Post, "/generate-message", &body, at("2024-01-02T00:00:00Z"));
        assert_eq!(response.status, 409);
        assert_eq!(response.body["reason"], "locked");
    }

    #[test]
    fn generate_then_submit() {
        let api = api();
        let now = at("2024-01-07T08:00:01Z");
        let body = json!({"user_id": 1, "week_number": 1}).to_string();
        let response = api.handle_at(Method::Post, "/generate-message", &body, now);
        assert_eq!(response.status, 200);
        assert_eq!(response.body["puzzle_index"], 0);
        assert_eq!(response.body["day_of_week"], "Sunday");

        let expected = api
            .engine()
            .catalog()
            .get_slot(1, SlotKind::Opener)
            .unwrap()
            .puzzle
            .expected_answer
            .clone();
        let submit = json!({"user_id": 1, "week_number": 1, "puzzle_index": 0, "answer": "wrong"});
        let response = api.handle_at(Method::Post, "/submit-answer", &submit.to_string(), now);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"result": "incorrect", "attempts": 1}));

        let submit = json!({"user_id": 1, "week_number": 1, "puzzle_index": 0, "answer": expected});
        let response = api.handle_at(Method::Post, "/submit-answer", &submit.to_string(), now);
        assert_eq!(response.status, 200);
        assert_eq!(response.body["result"], "correct");
        assert_eq!(response.body["new_streak"], 0);

        let response = api.handle_at(Method::Post, "/submit-answer", &submit.to_string(), now);
        assert_eq!(response.status, 409);
        assert_eq!(response.body["reason"], "already_completed");
    }

    #[test]
    fn bad_payloads_are_unprocessable() {
        let api = api();
        assert_eq!(api.handle(Method::Post, "/submit-answer", "{not json").status, 422);
        let missing = json!({"user_id": 1, "week_number": 1}).to_string();
        assert_eq!(api.handle(Method::Post, "/submit-answer", &missing).status, 422);
        assert_eq!(api.handle(Method::Get, "/api/user-progress/abc", "").status, 422);
        assert_eq!(api.handle(Method::Get, "/api/messages/week/1", "").status, 422);
    }

    #[test]
    fn lookups_map_to_not_found() {
        let api = api();
        assert_eq!(api.handle(Method::Get, "/api/user-progress/99", "").status, 404);
        assert_eq!(api.handle(Method::Get, "/api/messages/week/92?user_id=1", "").status, 404);
        let bad_index = json!({"user_id": 1, "week_number": 1, "puzzle_index": 3, "answer": "x"});
        assert_eq!(api.handle(Method::Post, "/submit-answer", &bad_index.to_string()).status, 404);
    }

    #[test]
    fn week_messages_hide_locked_prompts() {
        let api = api();
        let response = api.handle_at(
            Method::Get,
            "/api/messages/week/1?user_id=1",
            "",
            at("2024-01-08T00:00:00Z"),
        );
        assert_eq!(response.status, 200);
        let views = response.body.as_array().unwrap();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0]["status"], "available");
        assert!(views[0]["message"].is_string());
        assert_eq!(views[1]["status"], "locked");
        assert!(views[1]["message"].is_null());
        assert_eq!(views[2]["day_of_week"], "Friday");
    }

    #[test]
    fn user_progress_returns_summary() {
        let response = api().handle(Method::Get, "/api/user-progress/1", "");
        assert_eq!(response.status, 200);
        assert_eq!(response.body["current_week"], 1);
        assert_eq!(response.body["total_points"], 0);
    }

    /// Delegates user lookups to a real database; progress writes and
    /// pings always fail, reads fail when `failing_reads` is set.
    struct UnavailableStore {
        inner: Database,
        failing_reads: bool,
    }

    impl UnavailableStore {
        fn new(failing_reads: bool) -> Self {
            Self {
                inner: Database::open_memory().unwrap(),
                failing_reads,
            }
        }
    }

    impl ProgressStore for UnavailableStore {
        fn insert_user(&self, user: &User) -> Result<bool, DatabaseError> {
            self.inner.insert_user(user)
        }
        fn user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
            ProgressStore::user(&self.inner, id)
        }
        fn update_plan(&self, id: UserId, plan: Plan) -> Result<bool, DatabaseError> {
            self.inner.update_plan(id, plan)
        }
        fn users(&self) -> Result<Vec<User>, DatabaseError> {
            ProgressStore::users(&self.inner)
        }
        fn record(&self, user_id: UserId, key: SlotKey) -> Result<Option<ProgressRecord>, DatabaseError> {
            ProgressStore::record(&self.inner, user_id, key)
        }
        fn records(&self, user_id: UserId) -> Result<Vec<ProgressRecord>, DatabaseError> {
            if self.failing_reads {
                return Err(DatabaseError::Locked);
            }
            ProgressStore::records(&self.inner, user_id)
        }
        fn apply_submission(
            &self,
            _submission: &Submission<'_>,
            _summarize: &dyn Fn(&[ProgressRecord]) -> UserProgressSummary,
        ) -> Result<SubmissionOutcome, DatabaseError> {
            Err(DatabaseError::Locked)
        }
        fn summary(&self, user_id: UserId) -> Result<Option<UserProgressSummary>, DatabaseError> {
            ProgressStore::summary(&self.inner, user_id)
        }
        fn store_summary(&self, summary: &UserProgressSummary) -> Result<(), DatabaseError> {
            ProgressStore::store_summary(&self.inner, summary)
        }
        fn attempts(&self, user_id: UserId, key: SlotKey) -> Result<Vec<AttemptRecord>, DatabaseError> {
            ProgressStore::attempts(&self.inner, user_id, key)
        }
        fn ping(&self) -> Result<(), DatabaseError> {
            Err(DatabaseError::Locked)
        }
    }

    fn unavailable_api(failing_reads: bool) -> Api<UnavailableStore> {
        let engine =
            ChallengeEngine::new(Arc::new(Catalog::builtin()), UnavailableStore::new(failing_reads));
        engine
            .enroll(User::new(UserId(1), at("2024-01-01T09:00:00Z")).with_plan(Plan::Full))
            .unwrap();
        Api::new(Arc::new(engine))
    }

    const RETRY_MESSAGE: &str = "Service temporarily unavailable, please try again";

    #[test]
    fn failed_submission_write_maps_to_503() {
        let api = unavailable_api(false);
        let open = at("2024-01-07T08:00:01Z");
        let body = json!({"user_id": 1, "week_number": 1, "puzzle_index": 0, "answer": "guess"});

        let response = api.handle_at(Method::Post, "/submit-answer", &body.to_string(), open);
        assert_eq!(response.status, 503);
        assert_eq!(response.body["error"], RETRY_MESSAGE);
        assert!(response.body.get("reason").is_none());

        let err = api
            .engine()
            .submit(UserId(1), SlotKey::new(1, SlotKind::Opener), "guess", open)
            .unwrap_err();
        assert!(matches!(err, EngineError::StorageUnavailable(DatabaseError::Locked)));
        assert!(err.is_transient());
    }

    #[test]
    fn failed_progress_read_maps_to_503() {
        let api = unavailable_api(true);
        let open = at("2024-01-07T08:00:01Z");

        let progress = api.handle_at(Method::Get, "/api/user-progress/1", "", open);
        assert_eq!(progress.status, 503);
        assert_eq!(progress.body["error"], RETRY_MESSAGE);

        let err = api
            .engine()
            .submit(UserId(1), SlotKey::new(1, SlotKind::Opener), "guess", open)
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn failed_ping_makes_health_unavailable() {
        let response = unavailable_api(false).handle(Method::Get, "/api/health", "");
        assert_eq!(response.status, 503);
        assert_eq!(response.body["error"], RETRY_MESSAGE);
    }
}
