use crate::evaluator::Evaluator;
use crate::messages::AgentMessage;
use crate::plan::{PromptTemplate, QuestionPlan};
use crate::registry::{SessionEntry, SessionRegistry, SessionStatus};
use crate::report::{InterviewReport, ResponseRecord};
use crate::transport::{self, RoomTransport, TransportError};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Timing and sizing knobs for one interview, plus the room credentials.
pub struct InterviewSettings {
    pub questions_count: usize,
    /// How long to wait for a candidate answer before moving on.
    pub response_timeout: Duration,
    /// Pause after the greeting so the candidate's UI can settle.
    pub greeting_settle: Duration,
    /// Pause between questions.
    pub question_gap: Duration,
    /// Hard ceiling on the whole interview. `None` disables it.
    pub interview_deadline: Option<Duration>,
    pub room_url: String,
    pub room_token: SecretString,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            questions_count: 5,
            response_timeout: Duration::from_secs(60),
            greeting_settle: Duration::from_secs(5),
            question_gap: Duration::from_secs(3),
            interview_deadline: Some(Duration::from_secs(30 * 60)),
            room_url: "sim://interview".to_string(),
            room_token: SecretString::from(String::new()),
        }
    }
}

/// Everything the controller needs to run one interview. The extended
/// candidate/job fields come straight from the agent-join payload; most
/// only inform question personalization and logging.
pub struct InterviewConfig {
    pub session_id: String,
    pub room_name: String,
    pub candidate_id: String,
    pub candidate_name: String,
    pub job_id: String,
    pub job_title: String,
    pub job_department: String,
    pub candidate_skills: String,
    pub candidate_experience: String,
    pub template: PromptTemplate,
    pub settings: InterviewSettings,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            room_name: String::new(),
            candidate_id: String::new(),
            candidate_name: "Candidate".to_string(),
            job_id: String::new(),
            job_title: String::new(),
            job_department: String::new(),
            candidate_skills: String::new(),
            candidate_experience: String::new(),
            template: PromptTemplate::default(),
            settings: InterviewSettings::default(),
        }
    }
}

/// How a controller task finished.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(InterviewReport),
    /// An explicit end-request interrupted the session.
    Ended,
    /// The overall interview deadline elapsed.
    DeadlineExceeded,
    Failed(String),
}

/// Drives one interview end-to-end: connect, greet, iterate the question
/// plan, collect and score answers, publish the summary, disconnect. Runs
/// as a single spawned task; all registry mutations for the session funnel
/// through here once the task is live.
pub struct InterviewController {
    config: InterviewConfig,
    transport: Box<dyn RoomTransport>,
    evaluator: Arc<dyn Evaluator>,
    registry: SessionRegistry,
    responses: Vec<ResponseRecord>,
}

impl InterviewController {
    pub fn new(
        config: InterviewConfig,
        transport: Box<dyn RoomTransport>,
        evaluator: Arc<dyn Evaluator>,
        registry: SessionRegistry,
    ) -> Self {
        Self {
            config,
            transport,
            evaluator,
            registry,
            responses: Vec::new(),
        }
    }

    /// Runs the interview to completion. The `shutdown` handle interrupts
    /// the session wherever it is suspended; the room connection is
    /// released on every exit path.
    pub async fn run(mut self, shutdown: Arc<Notify>) -> RunOutcome {
        let deadline = self.config.settings.interview_deadline;

        let outcome = tokio::select! {
            _ = shutdown.notified() => RunOutcome::Ended,
            outcome = async {
                match deadline {
                    Some(limit) => match tokio::time::timeout(limit, self.conduct()).await {
                        Ok(outcome) => outcome,
                        Err(_) => RunOutcome::DeadlineExceeded,
                    },
                    None => self.conduct().await,
                }
            } => outcome,
        };

        self.transport.disconnect().await;

        let final_status = match &outcome {
            RunOutcome::Completed(_) => SessionStatus::Completed,
            RunOutcome::Ended | RunOutcome::DeadlineExceeded => SessionStatus::Ended,
            RunOutcome::Failed(_) => SessionStatus::Failed,
        };
        self.update_entry(|entry| {
            entry.connected = false;
            if entry.status.can_advance_to(final_status) {
                entry.status = final_status;
            }
        });

        match &outcome {
            RunOutcome::Completed(report) => tracing::info!(
                candidate_id = %self.config.candidate_id,
                final_score = ?report.final_score,
                answered = report.answered,
                "interview completed"
            ),
            RunOutcome::Ended => tracing::info!(
                candidate_id = %self.config.candidate_id,
                "interview ended by request"
            ),
            RunOutcome::DeadlineExceeded => tracing::warn!(
                candidate_id = %self.config.candidate_id,
                "interview hit its overall deadline"
            ),
            RunOutcome::Failed(e) => tracing::error!(
                candidate_id = %self.config.candidate_id,
                "interview failed: {e}"
            ),
        }

        outcome
    }

    async fn conduct(&mut self) -> RunOutcome {
        self.update_entry(|entry| {
            if entry.status.can_advance_to(SessionStatus::Joining) {
                entry.status = SessionStatus::Joining;
            }
        });

        if let Err(e) = self.join_room().await {
            return RunOutcome::Failed(format!("{e:#}"));
        }

        let plan = QuestionPlan::build(
            &self.config.template,
            &self.config.candidate_name,
            &self.config.job_title,
            &self.config.job_department,
            self.config.settings.questions_count,
        );
        tracing::info!(
            candidate = %self.config.candidate_name,
            job = %self.config.job_title,
            questions = plan.len(),
            "starting interview"
        );

        if let Err(e) = self.greet().await {
            return RunOutcome::Failed(format!("{e:#}"));
        }

        for (i, question) in plan.iter().enumerate() {
            self.update_entry(|entry| {
                entry.current_question = Some(question.to_string());
                entry.progress = i as f64 / plan.len() as f64 * 100.0;
            });
            tracing::info!(number = i + 1, total = plan.len(), %question, "asking question");

            // A single question's failure is isolated; the interview
            // continues with the next one.
            if let Err(e) = self.ask_and_collect(question).await {
                tracing::warn!(%question, "question cycle failed, moving on: {e:#}");
            }

            tokio::time::sleep(self.config.settings.question_gap).await;
        }

        match self.complete(plan.len()).await {
            Ok(report) => RunOutcome::Completed(report),
            Err(e) => RunOutcome::Failed(format!("{e:#}")),
        }
    }

    /// Connecting phase: join the room and enable local media. Failure
    /// here is fatal to the session and is not retried.
    async fn join_room(&mut self) -> Result<()> {
        self.update_entry(|entry| {
            if entry.status.can_advance_to(SessionStatus::Connecting) {
                entry.status = SessionStatus::Connecting;
            }
        });
        tracing::info!(room = %self.config.room_name, "agent connecting to room");

        self.transport
            .connect(
                &self.config.settings.room_url,
                &self.config.settings.room_token,
            )
            .await
            .context("failed to join interview room")?;
        self.transport
            .set_microphone_enabled(true)
            .await
            .context("failed to enable microphone")?;
        self.transport
            .set_camera_enabled(true)
            .await
            .context("failed to enable camera")?;

        self.update_entry(|entry| {
            entry.connected = true;
            if entry.status.can_advance_to(SessionStatus::Active) {
                entry.status = SessionStatus::Active;
            }
        });
        Ok(())
    }

    /// Greeting phase: send the template greeting (or a generated default)
    /// and give the candidate's client a moment to render.
    async fn greet(&mut self) -> Result<()> {
        let greeting = self
            .config
            .template
            .greeting_message
            .clone()
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "Hello {}, welcome to your interview for the {} position!",
                    self.config.candidate_name, self.config.job_title
                )
            });

        self.publish(&AgentMessage::question(greeting)).await?;
        tokio::time::sleep(self.config.settings.greeting_settle).await;
        Ok(())
    }

    /// One ask/listen/score/feedback cycle. A timed-out wait records
    /// nothing and is not an error.
    async fn ask_and_collect(&mut self, question: &str) -> Result<()> {
        // Subscribe before publishing so a fast answer cannot slip past;
        // replies to earlier prompts were emitted before this receiver
        // existed and are not replayed into it.
        let mut events = self.transport.subscribe();
        self.publish(&AgentMessage::question(question)).await?;

        let reply =
            transport::wait_for_response(&mut events, self.config.settings.response_timeout).await;

        match reply {
            Some(text) => {
                let analysis = self.evaluator.evaluate(question, &text).await;
                let message = format!(
                    "Great answer! Score: {}/10. {}",
                    analysis.score, analysis.feedback
                );
                self.publish(&AgentMessage::feedback(message, analysis.score))
                    .await?;
                self.responses.push(ResponseRecord {
                    question: question.to_string(),
                    response: text,
                    analysis,
                });
            }
            None => {
                tracing::info!(%question, "no response before timeout, moving to next question");
            }
        }
        Ok(())
    }

    /// Completing phase: compute the report and publish the summary.
    /// Publication failure here is fatal to the session.
    async fn complete(&mut self, total_questions: usize) -> Result<InterviewReport> {
        let report = InterviewReport::from_records(&self.responses);
        self.publish(&AgentMessage::complete(report.final_score, total_questions))
            .await
            .context("failed to publish interview summary")?;

        self.update_entry(|entry| {
            entry.current_question = None;
            entry.progress = 100.0;
            if entry.status.can_advance_to(SessionStatus::Completed) {
                entry.status = SessionStatus::Completed;
            }
        });
        Ok(report)
    }

    /// Applies `mutate` to this session's registry entry. Skipped when the
    /// entry is gone (an end-request removed it) or when the candidate's
    /// slot now belongs to a replacement session.
    fn update_entry(&self, mutate: impl FnOnce(&mut SessionEntry)) {
        let _ = self.registry.update(&self.config.candidate_id, |entry| {
            if entry.session_id == self.config.session_id {
                mutate(entry);
            }
        });
    }

    async fn publish(&mut self, message: &AgentMessage) -> Result<(), TransportError> {
        let payload = message
            .encode()
            .map_err(|e| TransportError::Publish(e.to_string()))?;
        self.transport.publish_data(&payload).await
    }
}
