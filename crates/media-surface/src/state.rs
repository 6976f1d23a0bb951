//! Participant media snapshots and the helpers used to diff them.

use common::types::MediaKind;

use crate::track::MediaTrackRef;

/// Desired binding for one media kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredBinding {
    pub enabled: bool,
    pub track: Option<MediaTrackRef>,
}

impl DesiredBinding {
    /// Enabled with the given track.
    #[must_use]
    pub fn enabled(track: MediaTrackRef) -> Self {
        Self {
            enabled: true,
            track: Some(track),
        }
    }

    /// Nothing to render.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// The track that should actually be attached.
    ///
    /// `enabled` is authoritative over a stale track reference, and an
    /// ended track is never playable.
    #[must_use]
    pub fn effective_track(&self) -> Option<&MediaTrackRef> {
        if !self.enabled {
            return None;
        }
        self.track.as_ref().filter(|track| track.is_live())
    }

    /// Enabled with a track present that has already ended.
    #[must_use]
    pub fn has_invalid_track(&self) -> bool {
        self.enabled && self.track.as_ref().is_some_and(|track| !track.is_live())
    }

    /// Whether applying `self` after `other` could change the surface.
    #[must_use]
    pub fn same_effect(&self, other: &DesiredBinding) -> bool {
        match (self.effective_track(), other.effective_track()) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_track(b),
            _ => false,
        }
    }
}

/// Snapshot of one participant's media availability, as supplied by the
/// media-session layer.
#[derive(Debug, Clone, Default)]
pub struct ParticipantMediaState {
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub audio_track: Option<MediaTrackRef>,
    pub video_track: Option<MediaTrackRef>,
    pub is_local_participant: bool,
    pub display_name: String,
}

impl ParticipantMediaState {
    /// A participant with nothing enabled.
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_audio(mut self, enabled: bool, track: Option<MediaTrackRef>) -> Self {
        self.audio_enabled = enabled;
        self.audio_track = track;
        self
    }

    #[must_use]
    pub fn with_video(mut self, enabled: bool, track: Option<MediaTrackRef>) -> Self {
        self.video_enabled = enabled;
        self.video_track = track;
        self
    }

    #[must_use]
    pub fn local(mut self, is_local: bool) -> Self {
        self.is_local_participant = is_local;
        self
    }

    /// The `{enabled, track}` pair for one kind.
    #[must_use]
    pub fn desired(&self, kind: MediaKind) -> DesiredBinding {
        match kind {
            MediaKind::Audio => DesiredBinding {
                enabled: self.audio_enabled,
                track: self.audio_track.clone(),
            },
            MediaKind::Video => DesiredBinding {
                enabled: self.video_enabled,
                track: self.video_track.clone(),
            },
        }
    }

    /// Kinds whose effective binding differs from `previous`.
    ///
    /// With no previous snapshot every kind that has something to render
    /// counts as changed.
    #[must_use]
    pub fn changed_kinds(&self, previous: Option<&ParticipantMediaState>) -> Vec<MediaKind> {
        MediaKind::ALL
            .into_iter()
            .filter(|&kind| {
                let desired = self.desired(kind);
                let before = previous.map_or_else(DesiredBinding::disabled, |p| p.desired(kind));
                !desired.same_effect(&before) || desired.has_invalid_track()
            })
            .collect()
    }
}
