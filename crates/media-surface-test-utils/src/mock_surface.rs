//! Mock rendering surface.
//!
//! Records every source, mute and playback call so tests can assert on the
//! exact sequence the binder produced. Playback can be configured to:
//! - Start immediately
//! - Be refused with a reason (autoplay policy)
//! - Block until the test releases it (gated)

use async_trait::async_trait;
use common::types::{SurfaceId, TrackId};
use media_surface::{PlaybackError, RenderSurface, SingleTrackSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

/// One recorded interaction with a `MockSurface`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// A source holding this track was assigned.
    Attached(TrackId),
    /// The source was cleared.
    Detached,
    /// The mute flag was set.
    Muted(bool),
    /// Playback was requested.
    PlaybackRequested,
    /// A playback request resolved successfully.
    PlaybackStarted,
    /// A playback request was refused.
    PlaybackRejected,
}

#[derive(Debug, Default)]
struct SurfaceState {
    source: Option<SingleTrackSource>,
    muted: bool,
    rejecting: Option<String>,
    events: Vec<SurfaceEvent>,
}

/// Scriptable `RenderSurface`.
#[derive(Debug)]
pub struct MockSurface {
    id: SurfaceId,
    state: Mutex<SurfaceState>,
    /// Present when playback requests block until released.
    gate: Option<Semaphore>,
    playback_requests: AtomicUsize,
    request_notify: Notify,
}

impl MockSurface {
    fn build(rejecting: Option<String>, gated: bool) -> Arc<Self> {
        Arc::new(Self {
            id: SurfaceId::new(),
            state: Mutex::new(SurfaceState {
                rejecting,
                ..SurfaceState::default()
            }),
            gate: gated.then(|| Semaphore::new(0)),
            playback_requests: AtomicUsize::new(0),
            request_notify: Notify::new(),
        })
    }

    /// Surface whose playback always starts.
    #[must_use]
    pub fn accepting() -> Arc<Self> {
        Self::build(None, false)
    }

    /// Surface whose playback is always refused with `reason`.
    #[must_use]
    pub fn rejecting(reason: &str) -> Arc<Self> {
        Self::build(Some(reason.to_string()), false)
    }

    /// Surface whose playback requests block until `release_playback`.
    #[must_use]
    pub fn gated() -> Arc<Self> {
        Self::build(None, true)
    }

    /// Change whether later playback requests are refused.
    pub fn set_rejecting(&self, reason: Option<&str>) {
        self.state.lock().unwrap().rejecting = reason.map(str::to_string);
    }

    /// Let `n` blocked (or future) playback requests proceed.
    pub fn release_playback(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Everything recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// Forget recorded events.
    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }

    /// Number of source assignments.
    #[must_use]
    pub fn attach_count(&self) -> usize {
        self.count(|e| matches!(e, SurfaceEvent::Attached(_)))
    }

    /// Number of source clears.
    #[must_use]
    pub fn detach_count(&self) -> usize {
        self.count(|e| *e == SurfaceEvent::Detached)
    }

    /// Track held by the current source, if any.
    #[must_use]
    pub fn current_track(&self) -> Option<TrackId> {
        self.state
            .lock()
            .unwrap()
            .source
            .as_ref()
            .map(|source| source.track().id())
    }

    /// Current mute flag.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    /// Number of playback requests received, settled or not.
    #[must_use]
    pub fn playback_requests(&self) -> usize {
        self.playback_requests.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` playback requests have been received.
    pub async fn wait_for_playback_requests(&self, n: usize) {
        loop {
            let notified = self.request_notify.notified();
            if self.playback_requests() >= n {
                return;
            }
            notified.await;
        }
    }

    fn count(&self, predicate: impl Fn(&SurfaceEvent) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| predicate(e))
            .count()
    }

    fn record(&self, event: SurfaceEvent) {
        self.state.lock().unwrap().events.push(event);
    }
}

#[async_trait]
impl RenderSurface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn has_source(&self) -> bool {
        self.state.lock().unwrap().source.is_some()
    }

    fn set_source(&self, source: Option<SingleTrackSource>) {
        let mut state = self.state.lock().unwrap();
        let event = match &source {
            Some(source) => SurfaceEvent::Attached(source.track().id()),
            None => SurfaceEvent::Detached,
        };
        state.source = source;
        state.events.push(event);
    }

    fn set_muted(&self, muted: bool) {
        let mut state = self.state.lock().unwrap();
        state.muted = muted;
        state.events.push(SurfaceEvent::Muted(muted));
    }

    async fn request_playback(&self) -> Result<(), PlaybackError> {
        self.record(SurfaceEvent::PlaybackRequested);
        self.playback_requests.fetch_add(1, Ordering::SeqCst);
        self.request_notify.notify_waiters();

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .expect("gate semaphore is never closed")
                .forget();
        }

        let rejecting = self.state.lock().unwrap().rejecting.clone();
        match rejecting {
            Some(reason) => {
                self.record(SurfaceEvent::PlaybackRejected);
                Err(PlaybackError::Rejected(reason))
            }
            None => {
                self.record(SurfaceEvent::PlaybackStarted);
                Ok(())
            }
        }
    }
}
