use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use interview_core::controller::{InterviewConfig, InterviewController, InterviewSettings};
use interview_core::plan::PromptTemplate;
use interview_core::registry::{RegistryError, SessionEntry, SessionStatus};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start-interview", post(start_interview))
        .route("/agent/join", post(agent_join))
        .route("/api/candidate-joined", post(candidate_joined))
        .route("/interview-status/{candidate_id}", get(interview_status))
        .route("/end-interview/{candidate_id}", delete(end_interview))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartInterviewRequest {
    pub room_name: Option<String>,
    pub candidate_id: Option<String>,
    pub job_id: Option<String>,
    pub session_id: Option<String>,
    pub candidate_name: Option<String>,
    pub job_title: Option<String>,
    pub job_department: Option<String>,
    pub agent_token: Option<String>,
    pub questions_count: Option<usize>,
    /// Overall interview time limit in minutes.
    pub interview_duration: Option<u64>,
    pub prompt_text: Option<PromptTemplate>,
}

/// The richer join payload the scheduling frontend sends. Most fields feed
/// question personalization; the rest are accepted and logged.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentJoinRequest {
    pub session_id: Option<String>,
    pub room_name: Option<String>,
    pub candidate_id: Option<String>,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
    pub candidate_skills: Option<String>,
    pub candidate_experience: Option<String>,
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub job_department: Option<String>,
    pub job_description: Option<String>,
    pub interview_mode: Option<String>,
    pub interview_language: Option<String>,
    pub interview_duration: Option<u64>,
    pub questions_count: Option<usize>,
    pub difficulty_level: Option<String>,
    pub agent_id: Option<String>,
    pub agent_token: Option<String>,
    pub prompt_template_name: Option<String>,
    pub prompt_text: Option<PromptTemplate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CandidateJoinedRequest {
    pub session_id: Option<String>,
    pub room_name: Option<String>,
    pub room_id: Option<String>,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
}

fn require(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{name} is required")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn interview_settings(
    state: &AppState,
    questions_count: Option<usize>,
    duration_minutes: Option<u64>,
    token: Option<String>,
) -> InterviewSettings {
    let cfg = &state.config;
    InterviewSettings {
        questions_count: questions_count.unwrap_or(5),
        response_timeout: Duration::from_secs(cfg.response_timeout_secs),
        greeting_settle: Duration::from_secs(cfg.greeting_settle_secs),
        question_gap: Duration::from_secs(cfg.question_gap_secs),
        interview_deadline: Some(Duration::from_secs(
            duration_minutes.unwrap_or(30).saturating_mul(60),
        )),
        room_url: cfg.room_url.clone(),
        room_token: SecretString::from(token.unwrap_or_default()),
    }
}

/// Registers the session and schedules its controller task. Returns to the
/// caller immediately; the interview runs in the background.
///
/// Duplicate-start policy: a second start for a live candidate id replaces
/// the session. The previous controller is told to shut down (which closes
/// its room connection) and its entry is overwritten.
fn spawn_session(state: &AppState, config: InterviewConfig, initial: SessionStatus) {
    if let Some(previous) = state.registry.remove(&config.candidate_id) {
        tracing::info!(
            candidate_id = %config.candidate_id,
            old_session = %previous.session_id,
            "replacing live session for candidate"
        );
        previous.shutdown.notify_one();
    }

    let entry = SessionEntry::new(
        config.session_id.clone(),
        config.room_name.clone(),
        config.candidate_id.clone(),
        config.candidate_name.clone(),
        config.job_id.clone(),
        initial,
    );
    let shutdown = entry.shutdown.clone();
    state.registry.insert(entry);

    let controller = InterviewController::new(
        config,
        (state.rooms)(),
        state.evaluator.clone(),
        state.registry.clone(),
    );
    tokio::spawn(controller.run(shutdown));
}

pub async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> Result<Json<Value>, ApiError> {
    let room_name = require(req.room_name, "roomName")?;
    let candidate_id = require(req.candidate_id, "candidateId")?;
    let job_id = require(req.job_id, "jobId")?;
    let session_id =
        non_empty(req.session_id).unwrap_or_else(|| format!("session_{room_name}"));

    tracing::info!(%room_name, %candidate_id, %job_id, "starting interview");

    let settings = interview_settings(
        &state,
        req.questions_count,
        req.interview_duration,
        req.agent_token,
    );
    let config = InterviewConfig {
        session_id: session_id.clone(),
        room_name: room_name.clone(),
        candidate_id: candidate_id.clone(),
        candidate_name: non_empty(req.candidate_name).unwrap_or_else(|| "Candidate".to_string()),
        job_id: job_id.clone(),
        job_title: req.job_title.unwrap_or_default(),
        job_department: req.job_department.unwrap_or_default(),
        template: req.prompt_text.unwrap_or_default(),
        settings,
        ..InterviewConfig::default()
    };
    spawn_session(&state, config, SessionStatus::Connecting);

    Ok(Json(json!({
        "success": true,
        "message": "AI agent started successfully",
        "sessionId": session_id,
        "roomName": room_name,
        "candidateId": candidate_id,
        "jobId": job_id,
        "agentStatus": "connecting",
    })))
}

pub async fn agent_join(
    State(state): State<AppState>,
    Json(req): Json<AgentJoinRequest>,
) -> Result<Json<Value>, ApiError> {
    let candidate_id = require(req.candidate_id, "candidateId")?;
    let job_id = require(req.job_id, "jobId")?;

    let (session_id, room_name) = match (non_empty(req.session_id), non_empty(req.room_name)) {
        (Some(session), Some(room)) => (session, room),
        (None, Some(room)) => (format!("session_{room}"), room),
        (Some(session), None) => {
            let room = session
                .strip_prefix("session_")
                .unwrap_or(&session)
                .to_string();
            (session, room)
        }
        (None, None) => {
            return Err(ApiError::Validation(
                "sessionId or roomName is required".to_string(),
            ));
        }
    };

    tracing::info!(
        %session_id,
        %room_name,
        %candidate_id,
        %job_id,
        agent_id = req.agent_id.as_deref().unwrap_or(""),
        template = req.prompt_template_name.as_deref().unwrap_or(""),
        "agent join request received"
    );

    let settings = interview_settings(
        &state,
        req.questions_count,
        req.interview_duration,
        req.agent_token,
    );
    let config = InterviewConfig {
        session_id: session_id.clone(),
        room_name: room_name.clone(),
        candidate_id,
        candidate_name: non_empty(req.candidate_name).unwrap_or_else(|| "Candidate".to_string()),
        job_id,
        job_title: req.job_title.unwrap_or_default(),
        job_department: req.job_department.unwrap_or_default(),
        candidate_skills: req.candidate_skills.unwrap_or_default(),
        candidate_experience: req.candidate_experience.unwrap_or_default(),
        template: req.prompt_text.unwrap_or_default(),
        settings,
    };
    spawn_session(&state, config, SessionStatus::Pending);

    Ok(Json(json!({
        "success": true,
        "message": "Agent join request received",
        "sessionId": session_id,
        "roomName": room_name,
        "agentStatus": "connecting",
    })))
}

/// Frontend notification that the candidate entered the room. This is
/// best-effort bookkeeping: the caller always gets a success envelope,
/// even when the update cannot be applied.
pub async fn candidate_joined(
    State(state): State<AppState>,
    Json(req): Json<CandidateJoinedRequest>,
) -> Json<Value> {
    let room = non_empty(req.room_name).or_else(|| non_empty(req.room_id));
    let candidate_name = non_empty(req.candidate_name);

    let result = match room {
        Some(room) => state.registry.update_by_room(&room, |entry| {
            if let Some(name) = candidate_name {
                entry.candidate_name = name;
            }
            entry.candidate_joined_at = Some(chrono::Utc::now());
        }),
        None => Err(RegistryError::NotFound("missing room name".to_string())),
    };

    match result {
        Ok(session_id) => Json(json!({
            "success": true,
            "message": "Candidate join notification received",
            "sessionId": session_id,
        })),
        Err(e) => {
            tracing::warn!("candidate-joined notification not applied: {e}");
            Json(json!({
                "success": true,
                "message": "Notification processed (with warnings)",
            }))
        }
    }
}

pub async fn interview_status(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Json<Value> {
    match state.registry.get(&candidate_id) {
        Some(entry) => Json(json!({
            "status": entry.status,
            "candidateId": candidate_id,
            "agentConnected": entry.connected,
            "currentQuestion": entry.current_question,
            "interviewProgress": entry.progress,
        })),
        None => Json(json!({ "status": "not_found" })),
    }
}

pub async fn end_interview(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Json<Value> {
    match state.registry.remove(&candidate_id) {
        Some(entry) => {
            entry.shutdown.notify_one();
            tracing::info!(%candidate_id, "interview ended by request");
            Json(json!({ "success": true, "message": "Interview ended" }))
        }
        None => Json(json!({ "success": false, "message": "Interview not found" })),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "active_interviews": state.registry.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, EvaluatorProvider};
    use interview_core::evaluator::StubEvaluator;
    use interview_core::transport::{RoomTransport, SimulatedRoom};
    use interview_core::registry::SessionRegistry;
    use std::sync::Arc;
    use tracing::Level;

    fn test_state() -> AppState {
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            provider: EvaluatorProvider::Stub,
            openai_api_key: None,
            chat_model: "gpt-4o".to_string(),
            room_url: "sim://interview".to_string(),
            log_level: Level::INFO,
            response_timeout_secs: 1,
            greeting_settle_secs: 0,
            question_gap_secs: 0,
        };
        AppState {
            registry: SessionRegistry::new(),
            config: Arc::new(config),
            evaluator: Arc::new(StubEvaluator),
            rooms: Arc::new(|| {
                Box::new(SimulatedRoom::new(Duration::ZERO)) as Box<dyn RoomTransport>
            }),
        }
    }

    fn start_request(room: &str, candidate: &str) -> StartInterviewRequest {
        StartInterviewRequest {
            room_name: Some(room.to_string()),
            candidate_id: Some(candidate.to_string()),
            job_id: Some("job-1".to_string()),
            ..StartInterviewRequest::default()
        }
    }

    #[tokio::test]
    async fn start_interview_echoes_ids_and_registers_the_session() {
        let state = test_state();
        let Json(body) = start_interview(State(state.clone()), Json(start_request("room-1", "c1")))
            .await
            .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["roomName"], "room-1");
        assert_eq!(body["candidateId"], "c1");
        assert_eq!(body["jobId"], "job-1");
        assert_eq!(body["sessionId"], "session_room-1");
        assert_eq!(body["agentStatus"], "connecting");

        let entry = state.registry.get("c1").unwrap();
        assert_eq!(entry.room_name, "room-1");
    }

    #[tokio::test]
    async fn start_interview_rejects_missing_fields() {
        let state = test_state();
        let err = start_interview(State(state), Json(StartInterviewRequest::default()))
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(message) => assert_eq!(message, "roomName is required"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_start_replaces_the_live_session() {
        let state = test_state();
        start_interview(State(state.clone()), Json(start_request("room-1", "c1")))
            .await
            .unwrap();
        start_interview(State(state.clone()), Json(start_request("room-2", "c1")))
            .await
            .unwrap();

        assert_eq!(state.registry.len(), 1);
        assert_eq!(state.registry.get("c1").unwrap().room_name, "room-2");
    }

    #[tokio::test]
    async fn extreme_interview_duration_does_not_overflow_the_deadline() {
        let state = test_state();
        let mut req = start_request("room-1", "c1");
        req.interview_duration = Some(u64::MAX);

        let Json(body) = start_interview(State(state.clone()), Json(req))
            .await
            .unwrap();

        assert_eq!(body["success"], true);
        assert!(state.registry.get("c1").is_some());
    }

    #[tokio::test]
    async fn agent_join_requires_a_session_or_room() {
        let state = test_state();
        let req = AgentJoinRequest {
            candidate_id: Some("c1".to_string()),
            job_id: Some("job-1".to_string()),
            ..AgentJoinRequest::default()
        };
        let err = agent_join(State(state), Json(req)).await.unwrap_err();
        match err {
            ApiError::Validation(message) => {
                assert_eq!(message, "sessionId or roomName is required")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn agent_join_derives_the_room_from_the_session_id() {
        let state = test_state();
        let req = AgentJoinRequest {
            session_id: Some("session_room-9".to_string()),
            candidate_id: Some("c9".to_string()),
            job_id: Some("job-1".to_string()),
            ..AgentJoinRequest::default()
        };
        let Json(body) = agent_join(State(state.clone()), Json(req)).await.unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["roomName"], "room-9");
        let entry = state.registry.get("c9").unwrap();
        assert_eq!(entry.room_name, "room-9");
        // Registered but not yet picked up by its controller task.
        assert_eq!(entry.status, SessionStatus::Pending);
    }

    #[tokio::test]
    async fn status_for_unknown_candidate_is_not_found() {
        let state = test_state();
        let Json(body) = interview_status(State(state), Path("ghost".to_string())).await;
        assert_eq!(body, json!({ "status": "not_found" }));
    }

    #[tokio::test]
    async fn status_reports_progress_fields() {
        let state = test_state();
        let mut entry = SessionEntry::new(
            "session_room-1",
            "room-1",
            "c1",
            "Ada",
            "job-1",
            SessionStatus::Active,
        );
        entry.connected = true;
        entry.current_question = Some("Q2".to_string());
        entry.progress = 40.0;
        state.registry.insert(entry);

        let Json(body) = interview_status(State(state), Path("c1".to_string())).await;
        assert_eq!(body["status"], "active");
        assert_eq!(body["agentConnected"], true);
        assert_eq!(body["currentQuestion"], "Q2");
        assert_eq!(body["interviewProgress"], 40.0);
    }

    #[tokio::test]
    async fn end_interview_is_idempotent() {
        let state = test_state();
        state.registry.insert(SessionEntry::new(
            "session_room-1",
            "room-1",
            "c1",
            "Ada",
            "job-1",
            SessionStatus::Active,
        ));

        let Json(first) = end_interview(State(state.clone()), Path("c1".to_string())).await;
        assert_eq!(first["success"], true);
        assert_eq!(first["message"], "Interview ended");

        let Json(second) = end_interview(State(state), Path("c1".to_string())).await;
        assert_eq!(second["success"], false);
        assert_eq!(second["message"], "Interview not found");
    }

    #[tokio::test]
    async fn candidate_joined_updates_the_session_by_room() {
        let state = test_state();
        state.registry.insert(SessionEntry::new(
            "session_room-1",
            "room-1",
            "c1",
            "Candidate",
            "job-1",
            SessionStatus::Active,
        ));

        let req = CandidateJoinedRequest {
            room_id: Some("room-1".to_string()),
            candidate_name: Some("Ada".to_string()),
            ..CandidateJoinedRequest::default()
        };
        let Json(body) = candidate_joined(State(state.clone()), Json(req)).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["sessionId"], "session_room-1");
        let entry = state.registry.get("c1").unwrap();
        assert_eq!(entry.candidate_name, "Ada");
        assert!(entry.candidate_joined_at.is_some());
    }

    #[tokio::test]
    async fn candidate_joined_never_fails_the_caller() {
        let state = test_state();
        let req = CandidateJoinedRequest {
            room_name: Some("no-such-room".to_string()),
            ..CandidateJoinedRequest::default()
        };
        let Json(body) = candidate_joined(State(state), Json(req)).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn health_reports_the_live_session_count() {
        let state = test_state();
        let Json(empty) = health(State(state.clone())).await;
        assert_eq!(empty["active_interviews"], 0);

        start_interview(State(state.clone()), Json(start_request("room-1", "c1")))
            .await
            .unwrap();
        let Json(body) = health(State(state)).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["active_interviews"], 1);
    }
}
