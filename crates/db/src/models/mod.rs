//! Row structs for the pullup tables.
//!
//! Each submodule holds a `FromRow` struct matching the table columns and,
//! where the row maps onto a `pullup-core` type, the conversion into it.

pub mod event;
pub mod generation;
pub mod training_session;
