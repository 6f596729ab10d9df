//! Lain.TV Viewer
//!
//! Client side of the broadcast: applies relay envelopes, drops duplicate
//! lines, and speaks new ones one at a time through a playback queue.

pub mod connection;
pub mod dedup;
pub mod presentation;
pub mod queue;
pub mod sink;
pub mod viewer;

pub use connection::watch;
pub use dedup::RecentIds;
pub use presentation::{presentation, Presentation};
pub use queue::{PlaybackQueue, SpeakingState, Voice};
#[cfg(feature = "audio")]
pub use sink::RodioSink;
pub use sink::{AudioSink, ClockSink};
pub use viewer::{Caption, Viewer, ViewerEvent};
