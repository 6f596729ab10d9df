//! Route handlers.

pub mod broadcasts;
pub mod status;
