//! Media surface error types.
//!
//! Nothing here is fatal: playback failures are reported to the caller and
//! logged, and actor errors only affect the participant they name.

use common::types::{ParticipantId, SurfaceId};
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Playback could not be started on a surface.
///
/// The source assignment itself still stands when this is returned, so a
/// later user gesture can resume playback without a rebind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The runtime refused to start playback (e.g. autoplay policy).
    #[error("Playback rejected: {0}")]
    Rejected(String),

    /// The playback request did not settle in time.
    #[error("Playback did not start within {0:?}")]
    TimedOut(Duration),
}

impl PlaybackError {
    /// Returns a bounded label for metrics.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            PlaybackError::Rejected(_) => "rejected",
            PlaybackError::TimedOut(_) => "timed_out",
        }
    }
}

/// Errors surfaced by the controller and call actor handles.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The controller or call actor is gone (disposed or shut down).
    #[error("Controller unavailable: {0}")]
    ControllerUnavailable(String),

    /// No controller is attached for this participant.
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// The same surface was offered for both media kinds.
    #[error("Surface offered for more than one media kind: {0}")]
    SurfaceInUse(SurfaceId),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
