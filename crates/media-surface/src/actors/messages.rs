//! Message types for actor communication.
//!
//! All actor communication uses strongly-typed message passing via
//! `tokio::sync::mpsc`. Response patterns use `tokio::sync::oneshot`.

use common::types::{MediaKind, ParticipantId};
use tokio::sync::oneshot;

use crate::binder::{BindingState, RebindOutcome};
use crate::errors::SurfaceError;
use crate::state::ParticipantMediaState;
use crate::surface::ParticipantSurfaces;

use super::participant::ParticipantControllerHandle;

/// Messages sent to a `ParticipantSurfaceController`.
#[derive(Debug)]
pub enum ControllerMessage {
    /// A new media snapshot for this participant.
    StateUpdate { state: ParticipantMediaState },

    /// Re-request playback on a surface whose playback was refused.
    RetryPlayback {
        kind: MediaKind,
        respond_to: oneshot::Sender<RebindOutcome>,
    },

    /// Get the current binding states.
    GetSnapshot {
        respond_to: oneshot::Sender<ControllerSnapshot>,
    },
}

/// Messages sent to the `CallSurfacesActor`.
#[derive(Debug)]
pub enum CallMessage {
    /// Start rendering a participant on the given surfaces.
    Attach {
        participant_id: ParticipantId,
        surfaces: ParticipantSurfaces,
        respond_to: oneshot::Sender<Result<ParticipantControllerHandle, SurfaceError>>,
    },

    /// Look up a participant's controller handle.
    ///
    /// The caller sends to the controller itself, so a full participant
    /// mailbox never stalls the call actor.
    GetController {
        participant_id: ParticipantId,
        respond_to: oneshot::Sender<Result<ParticipantControllerHandle, SurfaceError>>,
    },

    /// Participant left or its view unmounted.
    Detach {
        participant_id: ParticipantId,
        respond_to: oneshot::Sender<Result<(), SurfaceError>>,
    },

    /// Get current call status.
    GetStatus {
        respond_to: oneshot::Sender<CallStatus>,
    },

    /// Dispose every controller and stop.
    Shutdown {
        respond_to: oneshot::Sender<()>,
    },
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// Point-in-time view of one participant's bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub participant_id: ParticipantId,
    pub audio: BindingState,
    pub video: BindingState,
    /// Number of state updates applied so far.
    pub updates_applied: u64,
}

impl ControllerSnapshot {
    /// State for one kind.
    #[must_use]
    pub const fn state(&self, kind: MediaKind) -> BindingState {
        match kind {
            MediaKind::Audio => self.audio,
            MediaKind::Video => self.video,
        }
    }
}

/// Status of the `CallSurfacesActor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallStatus {
    /// Participants currently attached.
    pub participant_count: usize,
    /// Surfaces currently owned by some participant.
    pub surface_count: usize,
    /// Current mailbox depth.
    pub mailbox_depth: usize,
}
