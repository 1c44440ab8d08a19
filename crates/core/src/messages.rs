use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity string the agent attaches to its question payloads, so the
/// frontend can tell agent prompts apart from other data-channel traffic.
pub const AGENT_IDENTITY: &str = "ai-interviewer";

/// Returns the current wall clock as float Unix seconds, the timestamp
/// format the frontend expects on every data-channel payload.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Structured messages the agent publishes over the room data channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// A question (or the greeting) directed at the candidate.
    Question {
        question: String,
        timestamp: f64,
        agent: String,
    },
    /// Per-answer feedback with the evaluator's score.
    Feedback {
        message: String,
        score: f64,
        timestamp: f64,
    },
    /// Final summary sent once the question plan is exhausted.
    /// `final_score` is null when no answer was ever recorded.
    InterviewComplete {
        final_score: Option<f64>,
        total_questions: usize,
        timestamp: f64,
    },
}

impl AgentMessage {
    pub fn question(text: impl Into<String>) -> Self {
        Self::Question {
            question: text.into(),
            timestamp: unix_timestamp(),
            agent: AGENT_IDENTITY.to_string(),
        }
    }

    pub fn feedback(message: impl Into<String>, score: f64) -> Self {
        Self::Feedback {
            message: message.into(),
            score,
            timestamp: unix_timestamp(),
        }
    }

    pub fn complete(final_score: Option<f64>, total_questions: usize) -> Self {
        Self::InterviewComplete {
            final_score,
            total_questions,
            timestamp: unix_timestamp(),
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Messages the candidate's client may send back over the data channel.
/// Payloads that do not parse into this shape are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CandidateMessage {
    Response { text: String },
}

impl CandidateMessage {
    pub fn decode(payload: &[u8]) -> Option<Self> {
        serde_json::from_slice(payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_payload_matches_wire_format() {
        let msg = AgentMessage::question("What is ownership?");
        let bytes = msg.encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["type"], "question");
        assert_eq!(value["question"], "What is ownership?");
        assert_eq!(value["agent"], AGENT_IDENTITY);
        assert!(value["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn complete_payload_carries_null_score_when_unscored() {
        let msg = AgentMessage::complete(None, 5);
        let value: serde_json::Value = serde_json::from_slice(&msg.encode().unwrap()).unwrap();

        assert_eq!(value["type"], "interview_complete");
        assert!(value["final_score"].is_null());
        assert_eq!(value["total_questions"], 5);
    }

    #[test]
    fn decodes_candidate_response_and_ignores_noise() {
        let reply = CandidateMessage::decode(br#"{"type":"response","text":"I led a team"}"#);
        assert_eq!(
            reply,
            Some(CandidateMessage::Response {
                text: "I led a team".to_string()
            })
        );

        assert_eq!(CandidateMessage::decode(b"not json"), None);
        assert_eq!(CandidateMessage::decode(br#"{"type":"ping"}"#), None);
    }
}
