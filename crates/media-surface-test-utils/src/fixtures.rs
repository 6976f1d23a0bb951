//! Test fixtures.

use common::types::{MediaKind, ParticipantId};
use media_surface::actors::{
    ActorMetrics, ParticipantControllerHandle, ParticipantSurfaceController,
};
use media_surface::config::Config;
use media_surface::{MediaTrackRef, ParticipantSurfaces};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mock_surface::MockSurface;

/// Live microphone track.
#[must_use]
pub fn audio_track() -> MediaTrackRef {
    MediaTrackRef::new(MediaKind::Audio, "microphone")
}

/// Live camera track.
#[must_use]
pub fn video_track() -> MediaTrackRef {
    MediaTrackRef::new(MediaKind::Video, "camera")
}

/// A participant with its own pair of mock surfaces.
#[derive(Debug, Clone)]
pub struct TestParticipant {
    pub id: ParticipantId,
    pub audio: Arc<MockSurface>,
    pub video: Arc<MockSurface>,
}

impl TestParticipant {
    /// Participant whose surfaces accept playback.
    #[must_use]
    pub fn new() -> Self {
        Self::with_surfaces(MockSurface::accepting(), MockSurface::accepting())
    }

    /// Participant rendering on the given surfaces.
    #[must_use]
    pub fn with_surfaces(audio: Arc<MockSurface>, video: Arc<MockSurface>) -> Self {
        Self {
            id: ParticipantId::new(),
            audio,
            video,
        }
    }

    /// Surfaces as handed to a controller.
    #[must_use]
    pub fn surfaces(&self) -> ParticipantSurfaces {
        ParticipantSurfaces::new(
            Arc::clone(&self.audio) as _,
            Arc::clone(&self.video) as _,
        )
    }

    /// Spawn a standalone controller for this participant.
    #[must_use]
    pub fn spawn_controller(
        &self,
        config: &Config,
    ) -> (ParticipantControllerHandle, JoinHandle<()>) {
        ParticipantSurfaceController::spawn(
            self.id,
            self.surfaces(),
            config,
            CancellationToken::new(),
            ActorMetrics::new(),
        )
    }
}

impl Default for TestParticipant {
    fn default() -> Self {
        Self::new()
    }
}
