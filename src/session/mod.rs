//! Downstream session state

pub mod state;

pub use state::{CloseReason, SessionPhase, SessionState};
