use std::sync::Arc;

use pullup_core::generation::AiSessionGenerator;
use pullup_core::lifecycle::SessionLifecycle;
use pullup_core::store::{EventRecorder, GenerationLog, Generator, SessionStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Session persistence, also probed by `/health`.
    pub sessions: Arc<dyn SessionStore>,
    pub lifecycle: SessionLifecycle,
    pub ai: AiSessionGenerator,
}

impl AppState {
    /// Wire the engines to their collaborators.
    pub fn new(
        config: ServerConfig,
        sessions: Arc<dyn SessionStore>,
        generations: Arc<dyn GenerationLog>,
        events: Arc<dyn EventRecorder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let lifecycle = SessionLifecycle::new(Arc::clone(&sessions), Arc::clone(&events));
        let ai = AiSessionGenerator::new(
            lifecycle.clone(),
            generations,
            generator,
            events,
            config.ai.clone(),
        );
        Self {
            config: Arc::new(config),
            sessions,
            lifecycle,
            ai,
        }
    }
}
