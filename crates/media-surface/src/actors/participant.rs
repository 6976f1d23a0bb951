//! `ParticipantSurfaceController` - per-participant binding actor.
//!
//! Each controller:
//! - Owns exactly one participant's audio and video `BindingRecord`s
//! - Applies state updates strictly in arrival order, one at a time
//! - Waits for a pending playback request to settle before the next update
//! - Forwards the self-mute flag for the local participant
//!
//! # Lifecycle
//!
//! 1. Spawned when the participant's surfaces are attached to the call view
//! 2. Runs until disposed, its parent token is cancelled, or every handle
//!    is dropped
//! 3. On exit both surfaces are cleared unconditionally, then the disposed
//!    flag is published so a new owner may bind them

use common::types::{MediaKind, ParticipantId};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::binder::{BindingRecord, RebindOutcome, SurfaceBinder, SurfaceKey};
use crate::config::Config;
use crate::errors::SurfaceError;
use crate::observability::metrics as emit;
use crate::state::{DesiredBinding, ParticipantMediaState};
use crate::surface::ParticipantSurfaces;

use super::messages::{ControllerMessage, ControllerSnapshot};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};

/// Handle to a `ParticipantSurfaceController`.
#[derive(Clone, Debug)]
pub struct ParticipantControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
    cancel_token: CancellationToken,
    disposed: watch::Receiver<bool>,
    participant_id: ParticipantId,
}

impl ParticipantControllerHandle {
    /// Get the participant ID.
    #[must_use]
    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// Queue a new media snapshot.
    ///
    /// Returns once the snapshot is queued; effects are applied in order
    /// behind any earlier snapshot.
    pub async fn update(&self, state: ParticipantMediaState) -> Result<(), SurfaceError> {
        self.sender
            .send(ControllerMessage::StateUpdate { state })
            .await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("channel send failed: {e}")))
    }

    /// Retry playback on a surface left in `Failed` (e.g. after a user
    /// gesture).
    pub async fn retry_playback(&self, kind: MediaKind) -> Result<RebindOutcome, SurfaceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControllerMessage::RetryPlayback {
                kind,
                respond_to: tx,
            })
            .await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("response receive failed: {e}")))
    }

    /// Get the current binding states.
    ///
    /// Answered after every previously queued update has been applied.
    pub async fn snapshot(&self) -> Result<ControllerSnapshot, SurfaceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControllerMessage::GetSnapshot { respond_to: tx })
            .await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SurfaceError::ControllerUnavailable(format!("response receive failed: {e}")))
    }

    /// Tear the controller down.
    ///
    /// Any pending playback settlement is discarded and both surfaces are
    /// cleared before this returns. Safe to call repeatedly.
    pub async fn dispose(&self) {
        self.cancel_token.cancel();
        let mut disposed = self.disposed.clone();
        // Err means the task is already gone, which is just as final
        let _ = disposed.wait_for(|done| *done).await;
    }

    /// Whether the controller has finished tearing down.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    /// Drive the controller from an inbound stream of snapshots.
    ///
    /// The end of the stream means the participant left, so the controller
    /// is disposed when it terminates.
    pub async fn follow<S>(&self, states: S)
    where
        S: Stream<Item = ParticipantMediaState>,
    {
        futures::pin_mut!(states);
        while let Some(state) = states.next().await {
            if self.update(state).await.is_err() {
                break;
            }
        }
        self.dispose().await;
    }
}

/// The `ParticipantSurfaceController` implementation.
pub struct ParticipantSurfaceController {
    participant_id: ParticipantId,
    receiver: mpsc::Receiver<ControllerMessage>,
    cancel_token: CancellationToken,
    binder: SurfaceBinder,
    audio: BindingRecord,
    video: BindingRecord,
    /// Whether the local participant's video surface is muted too.
    mute_local_video: bool,
    last_applied: Option<ParticipantMediaState>,
    updates_applied: u64,
    disposed: watch::Sender<bool>,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
}

impl ParticipantSurfaceController {
    /// Spawn a new controller for `participant_id` rendering on `surfaces`.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        participant_id: ParticipantId,
        surfaces: ParticipantSurfaces,
        config: &Config,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (ParticipantControllerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.participant_mailbox_size);
        let (disposed_tx, disposed_rx) = watch::channel(false);

        metrics.controller_started();

        let actor = Self {
            participant_id,
            receiver,
            cancel_token: cancel_token.clone(),
            binder: SurfaceBinder::new(config.playback_timeout),
            audio: BindingRecord::new(
                SurfaceKey::new(participant_id, MediaKind::Audio),
                surfaces.audio,
            ),
            video: BindingRecord::new(
                SurfaceKey::new(participant_id, MediaKind::Video),
                surfaces.video,
            ),
            mute_local_video: config.mute_local_video,
            last_applied: None,
            updates_applied: 0,
            disposed: disposed_tx,
            metrics,
            mailbox: MailboxMonitor::new(ActorType::Participant, participant_id.to_string()),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = ParticipantControllerHandle {
            sender,
            cancel_token,
            disposed: disposed_rx,
            participant_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(
        skip_all,
        name = "ms.actor.participant",
        fields(participant_id = %self.participant_id)
    )]
    async fn run(mut self) {
        debug!(
            target: "ms.actor.participant",
            participant_id = %self.participant_id,
            audio_surface = %self.audio.surface().id(),
            video_surface = %self.video.surface().id(),
            "ParticipantSurfaceController started"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "ms.actor.participant",
                        participant_id = %self.participant_id,
                        "ParticipantSurfaceController received dispose"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.record_dequeue(self.receiver.len());
                            self.handle_message(message).await;
                            self.metrics.record_message_processed();
                        }
                        None => {
                            debug!(
                                target: "ms.actor.participant",
                                participant_id = %self.participant_id,
                                "All handles dropped, tearing down"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.release_all();
        self.metrics.controller_stopped();
        self.disposed.send_replace(true);

        info!(
            target: "ms.actor.participant",
            participant_id = %self.participant_id,
            updates_applied = self.updates_applied,
            messages_processed = self.mailbox.messages_processed(),
            "ParticipantSurfaceController stopped"
        );
    }

    async fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::StateUpdate { state } => {
                self.apply_state(state).await;
            }

            ControllerMessage::RetryPlayback { kind, respond_to } => {
                let outcome = self.retry_playback(kind).await;
                let _ = respond_to.send(outcome);
            }

            ControllerMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    async fn apply_state(&mut self, state: ParticipantMediaState) {
        let changed = state.changed_kinds(self.last_applied.as_ref());

        let is_local = state.is_local_participant;
        self.binder.apply_mute(&mut self.audio, is_local);
        self.binder
            .apply_mute(&mut self.video, is_local && self.mute_local_video);

        if changed.is_empty() {
            self.last_applied = Some(state);
            self.updates_applied += 1;
            return;
        }

        let audio_desired = state.desired(MediaKind::Audio);
        let video_desired = state.desired(MediaKind::Video);

        // The two kinds are independent keys and may suspend concurrently
        let (audio, video) = tokio::join!(
            converge(
                &self.binder,
                &mut self.audio,
                &audio_desired,
                changed.contains(&MediaKind::Audio),
                &self.cancel_token,
            ),
            converge(
                &self.binder,
                &mut self.video,
                &video_desired,
                changed.contains(&MediaKind::Video),
                &self.cancel_token,
            ),
        );

        self.log_outcome(MediaKind::Audio, &audio);
        self.log_outcome(MediaKind::Video, &video);

        if audio == RebindOutcome::StaleIgnored || video == RebindOutcome::StaleIgnored {
            return;
        }

        self.last_applied = Some(state);
        self.updates_applied += 1;
    }

    async fn retry_playback(&mut self, kind: MediaKind) -> RebindOutcome {
        let record = match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        };
        let outcome = self.binder.retry_playback(record, &self.cancel_token).await;
        self.log_outcome(kind, &outcome);
        outcome
    }

    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            participant_id: self.participant_id,
            audio: self.audio.state(),
            video: self.video.state(),
            updates_applied: self.updates_applied,
        }
    }

    fn release_all(&mut self) {
        self.binder.release(&mut self.audio);
        self.binder.release(&mut self.video);
        self.last_applied = None;
    }

    fn log_outcome(&self, kind: MediaKind, outcome: &RebindOutcome) {
        match outcome {
            RebindOutcome::Unchanged => {}
            RebindOutcome::Bound | RebindOutcome::Unbound => {
                debug!(
                    target: "ms.actor.participant",
                    participant_id = %self.participant_id,
                    kind = kind.as_str(),
                    outcome = ?outcome,
                    "Surface updated"
                );
            }
            RebindOutcome::PlaybackFailed(error) => {
                warn!(
                    target: "ms.actor.participant",
                    participant_id = %self.participant_id,
                    kind = kind.as_str(),
                    error = %error,
                    "Playback refused, waiting for track or enabled change"
                );
            }
            RebindOutcome::InvalidTrack => {
                debug!(
                    target: "ms.actor.participant",
                    participant_id = %self.participant_id,
                    kind = kind.as_str(),
                    "Track already ended, treating as disabled"
                );
            }
            RebindOutcome::StaleIgnored => {
                emit::record_stale_binding_ignored(kind.as_str());
                debug!(
                    target: "ms.actor.participant",
                    participant_id = %self.participant_id,
                    kind = kind.as_str(),
                    "Discarding playback settlement after dispose"
                );
            }
        }
    }
}

async fn converge(
    binder: &SurfaceBinder,
    record: &mut BindingRecord,
    desired: &DesiredBinding,
    changed: bool,
    cancel: &CancellationToken,
) -> RebindOutcome {
    if !changed {
        return RebindOutcome::Unchanged;
    }
    binder.rebind_if_changed(record, desired, cancel).await
}
