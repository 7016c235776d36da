//! Repository layer: one zero-sized struct per table, each method taking a
//! `&PgPool` and returning `sqlx::Error`.

pub mod event_repo;
pub mod generation_repo;
pub mod training_session_repo;

pub use event_repo::SessionEventRepo;
pub use generation_repo::GenerationRepo;
pub use training_session_repo::TrainingSessionRepo;
