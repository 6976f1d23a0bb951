//! Track handles.
//!
//! A [`MediaTrackRef`] is a shared handle to one live track owned by the
//! media-session layer. Handles compare by identity only: two refs are the
//! same track exactly when they point at the same underlying allocation.

use common::types::{MediaKind, TrackId};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct TrackInner {
    id: TrackId,
    kind: MediaKind,
    label: String,
    ended: AtomicBool,
}

/// Handle to one live audio or video track.
#[derive(Clone)]
pub struct MediaTrackRef {
    inner: Arc<TrackInner>,
}

impl MediaTrackRef {
    /// Create a handle for a newly produced track.
    #[must_use]
    pub fn new(kind: MediaKind, label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: TrackId::new(),
                kind,
                label: label.into(),
                ended: AtomicBool::new(false),
            }),
        }
    }

    /// Diagnostic identifier, for logs only.
    #[must_use]
    pub fn id(&self) -> TrackId {
        self.inner.id
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Mark the track as ended. Called by the owning media source; the
    /// binder never ends a track.
    pub fn end(&self) {
        self.inner.ended.store(true, Ordering::Release);
    }

    /// Whether the track can still be attached.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.inner.ended.load(Ordering::Acquire)
    }

    /// Identity comparison.
    #[must_use]
    pub fn same_track(&self, other: &MediaTrackRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for MediaTrackRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_track(other)
    }
}

impl Eq for MediaTrackRef {}

impl fmt::Debug for MediaTrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrackRef")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("live", &self.is_live())
            .finish()
    }
}

/// A media source holding exactly one track, assigned to a surface.
///
/// A fresh source is built for every bind; sources are never shared between
/// surfaces or reused across binds.
#[derive(Debug)]
pub struct SingleTrackSource {
    track: MediaTrackRef,
}

impl SingleTrackSource {
    #[must_use]
    pub fn new(track: MediaTrackRef) -> Self {
        Self { track }
    }

    #[must_use]
    pub fn track(&self) -> &MediaTrackRef {
        &self.track
    }
}
