pub mod generation;
pub mod sessions;
