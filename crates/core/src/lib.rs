pub mod controller;
pub mod evaluator;
pub mod messages;
pub mod plan;
pub mod registry;
pub mod report;
pub mod transport;

pub use controller::{InterviewConfig, InterviewController, InterviewSettings, RunOutcome};
pub use evaluator::Evaluator;
pub use registry::{SessionRegistry, SessionStatus};
pub use transport::RoomTransport;
