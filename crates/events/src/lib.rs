//! Session event recording.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SessionEvent`]: the event envelope carried on the bus.
//! - [`BusEventRecorder`]: the `EventRecorder` the engines write through.
//! - [`EventPersistence`]: background task writing every event to the
//!   `session_events` table.

pub mod bus;
pub mod persistence;
pub mod recorder;

pub use bus::{EventBus, SessionEvent};
pub use persistence::EventPersistence;
pub use recorder::BusEventRecorder;
