//! Control loop: ticks, user commands and preload notices applied to one
//! playback session

pub mod commands;
pub mod session;

pub use commands::Command;
pub use session::{Session, SessionOptions, SessionOutcome, StatusSurface};
