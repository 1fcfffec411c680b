//! Error types for the processing graph and the media element

use thiserror::Error;

/// Failures while building or wiring the processing graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// The media element already feeds a processor; a second one is refused.
    #[error("media element already has a processor attached")]
    SourceAlreadyAttached,

    /// Analyser or context settings out of range.
    #[error("invalid graph configuration: {0}")]
    InvalidConfig(String),

    /// Filter coefficients could not be computed for this sample rate.
    #[error("invalid {kind} filter at {frequency} Hz for {sample_rate} Hz")]
    InvalidCoefficients {
        kind: &'static str,
        frequency: f32,
        sample_rate: u32,
    },

    /// The context was closed and cannot be resumed.
    #[error("processing context is closed")]
    ContextClosed,
}

/// Why a play request did not start audio.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlayRejection {
    /// Superseded by a newer source or a pause. Benign.
    #[error("play request aborted")]
    Aborted,

    /// The audio output refused to start.
    #[error("audio output not allowed: {0}")]
    NotAllowed(String),

    /// The stream could not be decoded.
    #[error("format not supported: {0}")]
    NotSupported(String),

    /// Anything else: network failure, missing decoder, dead stream.
    #[error("playback failed: {0}")]
    Failed(String),
}

impl PlayRejection {
    pub fn is_benign(&self) -> bool {
        matches!(self, PlayRejection::Aborted)
    }
}
