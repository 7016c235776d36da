//! Pull-up training session domain logic.
//!
//! Everything in this crate is independent of the HTTP layer and of the
//! concrete database. Persistence, event recording and plan generation are
//! reached through the traits in [`store`], so the same engines run against
//! PostgreSQL in production and against [`memory`] in tests.

pub mod advisory;
pub mod error;
pub mod generation;
pub mod lifecycle;
pub mod memory;
pub mod preflight;
pub mod projection;
pub mod quota;
pub mod store;
pub mod training_session;
pub mod types;
