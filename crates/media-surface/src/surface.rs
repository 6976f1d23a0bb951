//! Rendering surface abstraction.
//!
//! Any sink that accepts one active track and reports playback start or
//! failure satisfies [`RenderSurface`]. Controllers are handed the surfaces
//! they own; they never look surfaces up by identifier.

use async_trait::async_trait;
use common::types::{MediaKind, SurfaceId};
use std::sync::Arc;

use crate::errors::PlaybackError;
use crate::track::SingleTrackSource;

/// An audio or video sink.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Stable identifier for ownership bookkeeping.
    fn id(&self) -> SurfaceId;

    /// Whether a source is currently assigned.
    fn has_source(&self) -> bool;

    /// Assign a source, or clear it with `None`.
    fn set_source(&self, source: Option<SingleTrackSource>);

    /// Presentation-layer mute flag.
    fn set_muted(&self, muted: bool);

    /// Ask the runtime to start playback of the assigned source.
    ///
    /// May settle long after the call; rejection is reported, never raised.
    async fn request_playback(&self) -> Result<(), PlaybackError>;
}

/// Shared handle to a surface.
pub type SurfaceHandle = Arc<dyn RenderSurface>;

/// The pair of surfaces rendering one participant.
#[derive(Clone)]
pub struct ParticipantSurfaces {
    pub audio: SurfaceHandle,
    pub video: SurfaceHandle,
}

impl ParticipantSurfaces {
    #[must_use]
    pub fn new(audio: SurfaceHandle, video: SurfaceHandle) -> Self {
        Self { audio, video }
    }

    /// Surface for the given kind.
    #[must_use]
    pub fn get(&self, kind: MediaKind) -> &SurfaceHandle {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }

    /// Surface identifiers, audio first.
    #[must_use]
    pub fn ids(&self) -> [SurfaceId; 2] {
        [self.audio.id(), self.video.id()]
    }
}

impl std::fmt::Debug for ParticipantSurfaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantSurfaces")
            .field("audio", &self.audio.id())
            .field("video", &self.video.id())
            .finish()
    }
}
