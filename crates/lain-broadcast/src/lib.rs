//! Lain.TV Broadcast
//!
//! The server-authoritative "now playing" state, the registry that fans
//! published lines out to connected sessions, and the scheduler that asks
//! the inference service for a new line at irregular intervals.

pub mod history;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod state;

pub use history::BroadcastHistory;
pub use registry::{FanOutReport, SessionRegistry};
pub use scheduler::{Cadence, PromptRotation, Scheduler, TickOutcome};
pub use session::{Session, SessionId};
pub use state::{BroadcastState, GenerationGuard};
