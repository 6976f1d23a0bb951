//! Attach/detach protocol between tracks and rendering surfaces.
//!
//! [`SurfaceBinder`] performs the minimal sequence of surface operations so
//! that a surface reflects exactly one track, or none. It holds no state of
//! its own: every decision is made against a [`BindingRecord`] owned by the
//! participant's controller, and records are only mutated through the
//! binder's methods.
//!
//! # Rebind decision
//!
//! | Desired                        | Record holds       | Action          |
//! |--------------------------------|--------------------|-----------------|
//! | disabled, absent, or ended     | a track            | unbind, clear   |
//! | disabled, absent, or ended     | nothing            | none            |
//! | track `t`                      | a different track  | unbind, bind    |
//! | track `t`                      | `t` (any state)    | none            |
//!
//! A failed playback still records the attempted track, so an unchanged
//! update never triggers another attempt.

use common::types::{MediaKind, ParticipantId, TrackId};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::PlaybackError;
use crate::observability::metrics;
use crate::state::DesiredBinding;
use crate::surface::{RenderSurface, SurfaceHandle};
use crate::track::{MediaTrackRef, SingleTrackSource};

/// Composite address of one surface: `(participant, kind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceKey {
    pub participant_id: ParticipantId,
    pub kind: MediaKind,
}

impl SurfaceKey {
    #[must_use]
    pub const fn new(participant_id: ParticipantId, kind: MediaKind) -> Self {
        Self {
            participant_id,
            kind,
        }
    }
}

/// Binding state of one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// No source assigned.
    Unbound,
    /// Source assigned and playing.
    Bound(TrackId),
    /// Source assigned but playback was refused. Still occupied for diffing.
    Failed(TrackId),
}

impl BindingState {
    /// `Bound` and `Failed` both hold a track.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        !matches!(self, BindingState::Unbound)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BindingState::Unbound => "unbound",
            BindingState::Bound(_) => "bound",
            BindingState::Failed(_) => "failed",
        }
    }
}

/// Result of one [`SurfaceBinder::rebind_if_changed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebindOutcome {
    /// Surface untouched.
    Unchanged,
    /// Previous track detached, nothing attached.
    Unbound,
    /// New track attached and playing.
    Bound,
    /// New track attached, playback refused. The source stays assigned.
    PlaybackFailed(PlaybackError),
    /// Desired track had already ended; treated as disabled.
    InvalidTrack,
    /// The controller was disposed while playback was pending; the
    /// settlement was discarded.
    StaleIgnored,
}

/// Per-key binding bookkeeping, owned by a participant controller.
pub struct BindingRecord {
    key: SurfaceKey,
    surface: SurfaceHandle,
    current_track: Option<MediaTrackRef>,
    state: BindingState,
    muted: bool,
}

impl BindingRecord {
    #[must_use]
    pub fn new(key: SurfaceKey, surface: SurfaceHandle) -> Self {
        Self {
            key,
            surface,
            current_track: None,
            state: BindingState::Unbound,
            muted: false,
        }
    }

    #[must_use]
    pub fn key(&self) -> SurfaceKey {
        self.key
    }

    #[must_use]
    pub fn state(&self) -> BindingState {
        self.state
    }

    #[must_use]
    pub fn current_track(&self) -> Option<&MediaTrackRef> {
        self.current_track.as_ref()
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    #[must_use]
    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    fn clear(&mut self) {
        self.current_track = None;
        self.state = BindingState::Unbound;
    }
}

impl std::fmt::Debug for BindingRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRecord")
            .field("key", &self.key)
            .field("surface", &self.surface.id())
            .field("current_track", &self.current_track)
            .field("state", &self.state)
            .field("muted", &self.muted)
            .finish()
    }
}

/// Binds tracks to surfaces.
#[derive(Debug, Clone, Default)]
pub struct SurfaceBinder {
    playback_timeout: Option<Duration>,
}

impl SurfaceBinder {
    #[must_use]
    pub const fn new(playback_timeout: Option<Duration>) -> Self {
        Self { playback_timeout }
    }

    #[must_use]
    pub fn playback_timeout(&self) -> Option<Duration> {
        self.playback_timeout
    }

    /// Attach `track` to `surface` and request playback.
    ///
    /// Any previous source is detached first. A rejected playback is
    /// returned, not raised, and leaves the new source assigned. An ended
    /// track clears the surface instead of attaching.
    pub async fn bind(
        &self,
        surface: &dyn RenderSurface,
        track: &MediaTrackRef,
        muted: bool,
    ) -> Result<(), PlaybackError> {
        self.unbind(surface);
        if !track.is_live() {
            debug!(
                target: "ms.binder",
                surface_id = %surface.id(),
                track_id = %track.id(),
                "Ignoring bind of ended track"
            );
            return Ok(());
        }
        Self::attach(surface, track, muted);
        self.start_playback(surface).await
    }

    /// Clear the surface's source. Empty surfaces are left untouched.
    pub fn unbind(&self, surface: &dyn RenderSurface) {
        if surface.has_source() {
            surface.set_source(None);
        }
    }

    /// Converge `record` to `desired`, touching the surface only when the
    /// effective track changed.
    ///
    /// Cancelling `cancel` while playback is pending drops the pending
    /// request; its settlement is never applied.
    pub async fn rebind_if_changed(
        &self,
        record: &mut BindingRecord,
        desired: &DesiredBinding,
        cancel: &CancellationToken,
    ) -> RebindOutcome {
        let kind = record.key.kind;

        let Some(track) = desired.effective_track() else {
            let invalid = desired.has_invalid_track();
            if record.current_track.is_some() {
                self.unbind(record.surface.as_ref());
                record.clear();
                metrics::record_unbind(kind.as_str());
                return if invalid {
                    RebindOutcome::InvalidTrack
                } else {
                    RebindOutcome::Unbound
                };
            }
            return if invalid {
                RebindOutcome::InvalidTrack
            } else {
                RebindOutcome::Unchanged
            };
        };

        if record
            .current_track
            .as_ref()
            .is_some_and(|current| current.same_track(track))
        {
            return RebindOutcome::Unchanged;
        }

        if record.current_track.is_some() {
            metrics::record_unbind(kind.as_str());
        }
        self.unbind(record.surface.as_ref());
        Self::attach(record.surface.as_ref(), track, record.muted);
        // `state` keeps its previous value until playback settles. The
        // record is owned by one controller task and snapshots are served
        // by that task between updates, so the gap is never observable.
        record.current_track = Some(track.clone());

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return RebindOutcome::StaleIgnored,
            result = self.start_playback(record.surface.as_ref()) => result,
        };
        if cancel.is_cancelled() {
            return RebindOutcome::StaleIgnored;
        }
        metrics::record_playback_latency(kind.as_str(), started.elapsed());

        match result {
            Ok(()) => {
                record.state = BindingState::Bound(track.id());
                metrics::record_bind(kind.as_str(), "bound");
                RebindOutcome::Bound
            }
            Err(error) => {
                record.state = BindingState::Failed(track.id());
                metrics::record_bind(kind.as_str(), error.as_label());
                RebindOutcome::PlaybackFailed(error)
            }
        }
    }

    /// Re-request playback on a `Failed` record's already-assigned source.
    pub async fn retry_playback(
        &self,
        record: &mut BindingRecord,
        cancel: &CancellationToken,
    ) -> RebindOutcome {
        let BindingState::Failed(track_id) = record.state else {
            return RebindOutcome::Unchanged;
        };

        if !record.current_track.as_ref().is_some_and(MediaTrackRef::is_live) {
            self.release(record);
            return RebindOutcome::InvalidTrack;
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return RebindOutcome::StaleIgnored,
            result = self.start_playback(record.surface.as_ref()) => result,
        };
        if cancel.is_cancelled() {
            return RebindOutcome::StaleIgnored;
        }

        let kind = record.key.kind;
        match result {
            Ok(()) => {
                record.state = BindingState::Bound(track_id);
                metrics::record_bind(kind.as_str(), "bound");
                RebindOutcome::Bound
            }
            Err(error) => {
                metrics::record_bind(kind.as_str(), error.as_label());
                RebindOutcome::PlaybackFailed(error)
            }
        }
    }

    /// Forward a changed mute flag. Bind/unbind decisions are unaffected.
    pub fn apply_mute(&self, record: &mut BindingRecord, muted: bool) {
        if record.muted == muted {
            return;
        }
        record.muted = muted;
        if record.state.is_occupied() {
            record.surface.set_muted(muted);
        }
    }

    /// Force the record to `Unbound`, clearing the surface whatever its
    /// prior state.
    pub fn release(&self, record: &mut BindingRecord) {
        if record.current_track.is_some() {
            metrics::record_unbind(record.key.kind.as_str());
        }
        self.unbind(record.surface.as_ref());
        record.clear();
    }

    fn attach(surface: &dyn RenderSurface, track: &MediaTrackRef, muted: bool) {
        surface.set_muted(muted);
        surface.set_source(Some(SingleTrackSource::new(track.clone())));
    }

    async fn start_playback(&self, surface: &dyn RenderSurface) -> Result<(), PlaybackError> {
        let result = match self.playback_timeout {
            Some(limit) => tokio::time::timeout(limit, surface.request_playback())
                .await
                .unwrap_or(Err(PlaybackError::TimedOut(limit))),
            None => surface.request_playback().await,
        };
        if let Err(error) = &result {
            warn!(
                target: "ms.binder",
                surface_id = %surface.id(),
                error = %error,
                "Playback request failed, source remains assigned"
            );
        }
        result
    }
}
