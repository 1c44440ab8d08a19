use crate::config::Config;
use interview_core::evaluator::Evaluator;
use interview_core::registry::SessionRegistry;
use interview_core::transport::RoomTransport;
use std::sync::Arc;

/// Builds a fresh room connection for one session. Injected so tests (and
/// local runs without a media server) can supply scripted rooms.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn RoomTransport> + Send + Sync>;

/// Shared state handed to every request handler. The registry is the only
/// mutable piece; it is created once at startup and owned here rather than
/// living in a process-wide global.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub config: Arc<Config>,
    pub evaluator: Arc<dyn Evaluator>,
    pub rooms: TransportFactory,
}
