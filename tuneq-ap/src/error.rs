//! Error types for tuneq-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Out-of-range seeks are clamped by the positioner and never surface here.

use thiserror::Error;

/// Main error type for tuneq-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Track file missing or unreadable
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Corrupt or unsupported audio data
    #[error("Audio decode error: {0}")]
    DecodeFailure(String),

    /// Dequeue with no pending tracks
    #[error("Queue is empty")]
    EmptyQueue,

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Playlist directory could not be listed
    #[error("Playlist error: {0}")]
    Playlist(String),

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from tuneq-common
    #[error(transparent)]
    Common(#[from] tuneq_common::Error),
}

/// Convenience Result type using tuneq-ap Error
pub type Result<T> = std::result::Result<T, Error>;
