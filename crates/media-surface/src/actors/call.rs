//! `CallSurfacesActor` - call-level supervisor for participant controllers.
//!
//! - One per call view
//! - Spawns one `ParticipantSurfaceController` per attached participant
//! - Owns the surface → participant ownership map
//! - Owns the root `CancellationToken` for the call view
//! - Detects controller panics via `JoinHandle`
//!
//! # Surface reassignment
//!
//! When a surface is attached for a new participant while another
//! participant still owns it, the previous owner is disposed first and its
//! teardown is awaited, so the new controller's first bind always follows
//! the previous owner's unbind.

use common::types::{ParticipantId, SurfaceId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::errors::SurfaceError;
use crate::state::ParticipantMediaState;
use crate::surface::ParticipantSurfaces;

use super::messages::{CallMessage, CallStatus};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use super::participant::{ParticipantControllerHandle, ParticipantSurfaceController};

/// Handle to the `CallSurfacesActor`.
#[derive(Clone, Debug)]
pub struct CallSurfacesHandle {
    sender: mpsc::Sender<CallMessage>,
    cancel_token: CancellationToken,
}

impl CallSurfacesHandle {
    /// Create a new `CallSurfacesActor` and return a handle to it.
    ///
    /// This spawns the actor task and returns immediately.
    #[must_use]
    pub fn new(config: Config, metrics: Arc<ActorMetrics>) -> Self {
        let (sender, receiver) = mpsc::channel(config.call_mailbox_size);
        let cancel_token = CancellationToken::new();

        let actor = CallSurfacesActor::new(config, receiver, cancel_token.clone(), metrics);
        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    /// Start rendering `participant_id` on `surfaces`.
    ///
    /// Any participant currently owning one of the surfaces is disposed
    /// first. Attaching an already-attached participant replaces its
    /// controller.
    pub async fn attach(
        &self,
        participant_id: ParticipantId,
        surfaces: ParticipantSurfaces,
    ) -> Result<ParticipantControllerHandle, SurfaceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CallMessage::Attach {
                participant_id,
                surfaces,
                respond_to: tx,
            })
            .await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("response receive failed: {e}")))?
    }

    /// Forward a media snapshot to the participant's controller.
    ///
    /// The snapshot is sent from the caller's task, so a participant whose
    /// mailbox is backed up behind a pending playback only delays its own
    /// updates.
    pub async fn update(
        &self,
        participant_id: ParticipantId,
        state: ParticipantMediaState,
    ) -> Result<(), SurfaceError> {
        self.controller(participant_id).await?.update(state).await
    }

    /// Get the controller handle of an attached participant.
    pub async fn controller(
        &self,
        participant_id: ParticipantId,
    ) -> Result<ParticipantControllerHandle, SurfaceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CallMessage::GetController {
                participant_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("response receive failed: {e}")))?
    }

    /// Dispose and forget a participant (left the call, or view unmounted).
    pub async fn detach(&self, participant_id: ParticipantId) -> Result<(), SurfaceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CallMessage::Detach {
                participant_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("response receive failed: {e}")))?
    }

    /// Get the current call status.
    pub async fn status(&self) -> Result<CallStatus, SurfaceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CallMessage::GetStatus { respond_to: tx })
            .await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("response receive failed: {e}")))
    }

    /// Dispose every participant and stop the actor.
    pub async fn shutdown(&self) -> Result<(), SurfaceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CallMessage::Shutdown { respond_to: tx })
            .await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("response receive failed: {e}")))
    }

    /// Cancel the call view. Every controller tears down on its own.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the call view is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Attached participant bookkeeping.
struct AttachedParticipant {
    handle: ParticipantControllerHandle,
    task: JoinHandle<()>,
    surfaces: ParticipantSurfaces,
}

/// The `CallSurfacesActor` implementation.
pub struct CallSurfacesActor {
    config: Config,
    receiver: mpsc::Receiver<CallMessage>,
    cancel_token: CancellationToken,
    participants: HashMap<ParticipantId, AttachedParticipant>,
    /// Which participant currently owns each surface.
    owners: HashMap<SurfaceId, ParticipantId>,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
}

impl CallSurfacesActor {
    fn new(
        config: Config,
        receiver: mpsc::Receiver<CallMessage>,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> Self {
        Self {
            config,
            receiver,
            cancel_token,
            participants: HashMap::new(),
            owners: HashMap::new(),
            metrics,
            mailbox: MailboxMonitor::new(ActorType::Call, "call"),
        }
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "ms.actor.call")]
    async fn run(mut self) {
        info!(target: "ms.actor.call", "CallSurfacesActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "ms.actor.call",
                        "CallSurfacesActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(CallMessage::Shutdown { respond_to }) => {
                            self.dispose_all().await;
                            let _ = respond_to.send(());
                            break;
                        }
                        Some(message) => {
                            self.mailbox.record_dequeue(self.receiver.len());
                            self.handle_message(message).await;
                            self.metrics.record_message_processed();
                        }
                        None => {
                            debug!(
                                target: "ms.actor.call",
                                "CallSurfacesActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.dispose_all().await;

        info!(
            target: "ms.actor.call",
            messages_processed = self.mailbox.messages_processed(),
            "CallSurfacesActor stopped"
        );
    }

    async fn handle_message(&mut self, message: CallMessage) {
        match message {
            CallMessage::Attach {
                participant_id,
                surfaces,
                respond_to,
            } => {
                let result = self.attach(participant_id, surfaces).await;
                let _ = respond_to.send(result);
            }

            CallMessage::GetController {
                participant_id,
                respond_to,
            } => {
                let result = self
                    .participants
                    .get(&participant_id)
                    .map(|attached| attached.handle.clone())
                    .ok_or(SurfaceError::ParticipantNotFound(participant_id));
                let _ = respond_to.send(result);
            }

            CallMessage::Detach {
                participant_id,
                respond_to,
            } => {
                let result = if self.participants.contains_key(&participant_id) {
                    self.dispose_participant(participant_id).await;
                    Ok(())
                } else {
                    Err(SurfaceError::ParticipantNotFound(participant_id))
                };
                let _ = respond_to.send(result);
            }

            CallMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(CallStatus {
                    participant_count: self.participants.len(),
                    surface_count: self.owners.len(),
                    mailbox_depth: self.receiver.len(),
                });
            }

            // Handled in the run loop
            CallMessage::Shutdown { respond_to } => {
                let _ = respond_to.send(());
            }
        }
    }

    async fn attach(
        &mut self,
        participant_id: ParticipantId,
        surfaces: ParticipantSurfaces,
    ) -> Result<ParticipantControllerHandle, SurfaceError> {
        let [audio_id, video_id] = surfaces.ids();
        if audio_id == video_id {
            return Err(SurfaceError::SurfaceInUse(audio_id));
        }

        if self.participants.contains_key(&participant_id) {
            debug!(
                target: "ms.actor.call",
                participant_id = %participant_id,
                "Participant re-attached, replacing controller"
            );
            self.dispose_participant(participant_id).await;
        }

        for surface_id in [audio_id, video_id] {
            if let Some(previous) = self.owners.get(&surface_id).copied() {
                info!(
                    target: "ms.actor.call",
                    participant_id = %participant_id,
                    previous_owner = %previous,
                    surface_id = %surface_id,
                    "Reassigning surface, disposing previous owner"
                );
                self.dispose_participant(previous).await;
            }
        }

        let (handle, task) = ParticipantSurfaceController::spawn(
            participant_id,
            surfaces.clone(),
            &self.config,
            self.cancel_token.child_token(),
            Arc::clone(&self.metrics),
        );

        self.owners.insert(audio_id, participant_id);
        self.owners.insert(video_id, participant_id);
        self.participants.insert(
            participant_id,
            AttachedParticipant {
                handle: handle.clone(),
                task,
                surfaces,
            },
        );

        debug!(
            target: "ms.actor.call",
            participant_id = %participant_id,
            participant_count = self.participants.len(),
            "Participant attached"
        );

        Ok(handle)
    }

    /// Dispose a participant and wait for its surfaces to be released.
    async fn dispose_participant(&mut self, participant_id: ParticipantId) {
        let Some(attached) = self.participants.remove(&participant_id) else {
            return;
        };

        attached.handle.dispose().await;
        for surface_id in attached.surfaces.ids() {
            if self.owners.get(&surface_id) == Some(&participant_id) {
                self.owners.remove(&surface_id);
            }
        }

        match attached.task.await {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                // The controller never reached its own teardown
                for surface in [&attached.surfaces.audio, &attached.surfaces.video] {
                    if surface.has_source() {
                        surface.set_source(None);
                    }
                }
                self.metrics.controller_stopped();
                self.metrics.record_panic(ActorType::Participant);
                warn!(
                    target: "ms.actor.call",
                    participant_id = %participant_id,
                    "Participant controller panicked, surfaces cleared"
                );
            }
            Err(_) => {}
        }

        debug!(
            target: "ms.actor.call",
            participant_id = %participant_id,
            "Participant detached"
        );
    }

    async fn dispose_all(&mut self) {
        let participant_ids: Vec<ParticipantId> = self.participants.keys().copied().collect();
        for participant_id in participant_ids {
            self.dispose_participant(participant_id).await;
        }
    }
}
