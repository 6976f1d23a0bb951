//! Tests for per-participant surface controllers.
//!
//! Drives `ParticipantSurfaceController` against mock surfaces to verify:
//! - Attach/detach happen only when the effective track changes
//! - Playback refusal is recorded and never retried on its own
//! - Updates are applied in order, one at a time
//! - Dispose clears both surfaces and discards pending settlements

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use common::types::MediaKind;
use futures::stream;
use media_surface::config::Config;
use media_surface::{BindingState, ParticipantMediaState, PlaybackError, RebindOutcome};
use media_surface_test_utils::{audio_track, video_track, MockSurface, SurfaceEvent, TestParticipant};

/// Only the source assignments, in order.
fn source_events(surface: &MockSurface) -> Vec<SurfaceEvent> {
    surface
        .events()
        .into_iter()
        .filter(|e| matches!(e, SurfaceEvent::Attached(_) | SurfaceEvent::Detached))
        .collect()
}

// ============================================================================
// Convergence
// ============================================================================

#[tokio::test]
async fn test_repeated_state_binds_once() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let camera = video_track();

    let state = ParticipantMediaState::new("alice").with_video(true, Some(camera.clone()));
    handle.update(state.clone()).await.unwrap();
    handle.update(state.clone()).await.unwrap();
    handle.update(state).await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Bound(camera.id()));
    assert_eq!(snapshot.updates_applied, 3);
    assert_eq!(participant.video.attach_count(), 1);
    assert_eq!(participant.video.playback_requests(), 1);
    assert_eq!(participant.video.current_track(), Some(camera.id()));
}

#[tokio::test]
async fn test_unrelated_field_change_does_not_touch_surfaces() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let camera = video_track();

    handle
        .update(ParticipantMediaState::new("alice").with_video(true, Some(camera.clone())))
        .await
        .unwrap();
    handle
        .update(ParticipantMediaState::new("Alice (away)").with_video(true, Some(camera)))
        .await
        .unwrap();
    handle.snapshot().await.unwrap();

    assert_eq!(participant.video.attach_count(), 1);
    assert_eq!(participant.video.detach_count(), 0);
}

#[tokio::test]
async fn test_track_swap_detaches_then_attaches() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let first = video_track();
    let second = video_track();

    handle
        .update(ParticipantMediaState::new("bob").with_video(true, Some(first.clone())))
        .await
        .unwrap();
    handle
        .update(ParticipantMediaState::new("bob").with_video(true, Some(second.clone())))
        .await
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Bound(second.id()));
    assert_eq!(
        source_events(&participant.video),
        vec![
            SurfaceEvent::Attached(first.id()),
            SurfaceEvent::Detached,
            SurfaceEvent::Attached(second.id()),
        ]
    );
}

#[tokio::test]
async fn test_disabled_kind_is_never_attached() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());

    handle
        .update(
            ParticipantMediaState::new("carol")
                .with_audio(false, Some(audio_track()))
                .with_video(false, Some(video_track())),
        )
        .await
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.audio, BindingState::Unbound);
    assert_eq!(snapshot.video, BindingState::Unbound);
    assert_eq!(participant.audio.attach_count(), 0);
    assert_eq!(participant.video.attach_count(), 0);
}

#[tokio::test]
async fn test_disabling_clears_surface() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let microphone = audio_track();

    handle
        .update(ParticipantMediaState::new("dave").with_audio(true, Some(microphone.clone())))
        .await
        .unwrap();
    handle
        .update(ParticipantMediaState::new("dave").with_audio(false, Some(microphone)))
        .await
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.audio, BindingState::Unbound);
    assert_eq!(participant.audio.current_track(), None);
    assert_eq!(participant.audio.detach_count(), 1);
}

#[tokio::test]
async fn test_kinds_are_bound_independently() {
    let participant = TestParticipant::with_surfaces(
        MockSurface::accepting(),
        MockSurface::rejecting("autoplay blocked"),
    );
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let microphone = audio_track();
    let camera = video_track();

    handle
        .update(
            ParticipantMediaState::new("erin")
                .with_audio(true, Some(microphone.clone()))
                .with_video(true, Some(camera.clone())),
        )
        .await
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.audio, BindingState::Bound(microphone.id()));
    assert_eq!(snapshot.video, BindingState::Failed(camera.id()));
}

// ============================================================================
// Playback refusal
// ============================================================================

#[tokio::test]
async fn test_rejected_playback_is_not_retried() {
    let participant =
        TestParticipant::with_surfaces(MockSurface::accepting(), MockSurface::rejecting("autoplay"));
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let camera = video_track();
    let state = ParticipantMediaState::new("frank").with_video(true, Some(camera.clone()));

    handle.update(state.clone()).await.unwrap();
    handle.update(state).await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Failed(camera.id()));
    assert_eq!(participant.video.playback_requests(), 1);
    // Source stays assigned after a refusal
    assert_eq!(participant.video.current_track(), Some(camera.id()));
}

#[tokio::test]
async fn test_toggle_after_rejection_binds_again() {
    let participant =
        TestParticipant::with_surfaces(MockSurface::accepting(), MockSurface::rejecting("autoplay"));
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let camera = video_track();

    handle
        .update(ParticipantMediaState::new("grace").with_video(true, Some(camera.clone())))
        .await
        .unwrap();
    assert_eq!(
        handle.snapshot().await.unwrap().video,
        BindingState::Failed(camera.id())
    );

    handle
        .update(ParticipantMediaState::new("grace").with_video(false, Some(camera.clone())))
        .await
        .unwrap();
    assert_eq!(handle.snapshot().await.unwrap().video, BindingState::Unbound);
    assert_eq!(participant.video.current_track(), None);

    participant.video.set_rejecting(None);
    handle
        .update(ParticipantMediaState::new("grace").with_video(true, Some(camera.clone())))
        .await
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Bound(camera.id()));
    assert_eq!(participant.video.playback_requests(), 2);
    assert_eq!(participant.video.attach_count(), 2);
}

#[tokio::test]
async fn test_retry_playback_after_gesture() {
    let participant =
        TestParticipant::with_surfaces(MockSurface::accepting(), MockSurface::rejecting("autoplay"));
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let camera = video_track();

    handle
        .update(ParticipantMediaState::new("heidi").with_video(true, Some(camera.clone())))
        .await
        .unwrap();
    assert_eq!(
        handle.snapshot().await.unwrap().video,
        BindingState::Failed(camera.id())
    );

    participant.video.set_rejecting(None);
    let outcome = handle.retry_playback(MediaKind::Video).await.unwrap();
    assert_eq!(outcome, RebindOutcome::Bound);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Bound(camera.id()));
    // Retry reuses the assigned source
    assert_eq!(participant.video.attach_count(), 1);
    assert_eq!(participant.video.playback_requests(), 2);

    let outcome = handle.retry_playback(MediaKind::Video).await.unwrap();
    assert_eq!(outcome, RebindOutcome::Unchanged);
    assert_eq!(participant.video.playback_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_playback_timeout_marks_failed() {
    let participant =
        TestParticipant::with_surfaces(MockSurface::accepting(), MockSurface::gated());
    let config = Config {
        playback_timeout: Some(Duration::from_millis(50)),
        ..Config::default()
    };
    let (handle, _task) = participant.spawn_controller(&config);
    let camera = video_track();

    handle
        .update(ParticipantMediaState::new("ivan").with_video(true, Some(camera.clone())))
        .await
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Failed(camera.id()));

    participant.video.release_playback(1);
    let outcome = handle.retry_playback(MediaKind::Video).await.unwrap();
    assert_eq!(outcome, RebindOutcome::Bound);
}

#[tokio::test(start_paused = true)]
async fn test_retry_reports_timeout() {
    let participant =
        TestParticipant::with_surfaces(MockSurface::accepting(), MockSurface::gated());
    let config = Config {
        playback_timeout: Some(Duration::from_millis(50)),
        ..Config::default()
    };
    let (handle, _task) = participant.spawn_controller(&config);

    handle
        .update(ParticipantMediaState::new("judy").with_video(true, Some(video_track())))
        .await
        .unwrap();

    let outcome = handle.retry_playback(MediaKind::Video).await.unwrap();
    assert_eq!(
        outcome,
        RebindOutcome::PlaybackFailed(PlaybackError::TimedOut(Duration::from_millis(50)))
    );
}

// ============================================================================
// Ordering and disposal
// ============================================================================

#[tokio::test]
async fn test_updates_wait_for_pending_playback() {
    let participant =
        TestParticipant::with_surfaces(MockSurface::accepting(), MockSurface::gated());
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let first = video_track();
    let second = video_track();

    handle
        .update(ParticipantMediaState::new("ken").with_video(true, Some(first.clone())))
        .await
        .unwrap();
    handle
        .update(ParticipantMediaState::new("ken").with_video(true, Some(second.clone())))
        .await
        .unwrap();

    participant.video.wait_for_playback_requests(1).await;
    assert_eq!(participant.video.current_track(), Some(first.id()));
    assert_eq!(participant.video.attach_count(), 1);

    participant.video.release_playback(1);
    participant.video.wait_for_playback_requests(2).await;
    assert_eq!(participant.video.current_track(), Some(second.id()));

    participant.video.release_playback(1);
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Bound(second.id()));
    assert_eq!(
        source_events(&participant.video),
        vec![
            SurfaceEvent::Attached(first.id()),
            SurfaceEvent::Detached,
            SurfaceEvent::Attached(second.id()),
        ]
    );
}

#[tokio::test]
async fn test_snapshot_waits_for_pending_playback() {
    let participant =
        TestParticipant::with_surfaces(MockSurface::accepting(), MockSurface::gated());
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let first = video_track();
    let second = video_track();

    handle
        .update(ParticipantMediaState::new("kim").with_video(true, Some(first.clone())))
        .await
        .unwrap();
    participant.video.release_playback(1);
    assert_eq!(
        handle.snapshot().await.unwrap().video,
        BindingState::Bound(first.id())
    );

    handle
        .update(ParticipantMediaState::new("kim").with_video(true, Some(second.clone())))
        .await
        .unwrap();
    participant.video.wait_for_playback_requests(2).await;

    let pending = tokio::spawn({
        let handle = handle.clone();
        async move { handle.snapshot().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());

    participant.video.release_playback(1);
    let snapshot = pending.await.unwrap().unwrap();
    // Never Bound(first) while second is already attached
    assert_eq!(snapshot.video, BindingState::Bound(second.id()));
}

#[tokio::test]
async fn test_dispose_clears_surfaces() {
    let participant = TestParticipant::new();
    let (handle, task) = participant.spawn_controller(&Config::default());

    handle
        .update(
            ParticipantMediaState::new("leo")
                .with_audio(true, Some(audio_track()))
                .with_video(true, Some(video_track())),
        )
        .await
        .unwrap();
    handle.snapshot().await.unwrap();

    handle.dispose().await;

    assert!(handle.is_disposed());
    assert_eq!(participant.audio.current_track(), None);
    assert_eq!(participant.video.current_track(), None);
    assert!(tokio::time::timeout(Duration::from_secs(1), task).await.is_ok());
}

#[tokio::test]
async fn test_dispose_discards_pending_settlement() {
    let participant =
        TestParticipant::with_surfaces(MockSurface::accepting(), MockSurface::gated());
    let (handle, _task) = participant.spawn_controller(&Config::default());

    handle
        .update(ParticipantMediaState::new("mallory").with_video(true, Some(video_track())))
        .await
        .unwrap();
    participant.video.wait_for_playback_requests(1).await;

    handle.dispose().await;
    participant.video.release_playback(1);
    tokio::task::yield_now().await;

    assert_eq!(participant.video.current_track(), None);
    assert_eq!(participant.video.events().last(), Some(&SurfaceEvent::Detached));
    assert!(!participant
        .video
        .events()
        .contains(&SurfaceEvent::PlaybackStarted));
    assert!(handle.snapshot().await.is_err());
}

#[tokio::test]
async fn test_follow_disposes_when_stream_ends() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let camera = video_track();

    let states = stream::iter(vec![
        ParticipantMediaState::new("nina").with_video(true, Some(camera.clone())),
        ParticipantMediaState::new("nina").with_video(true, Some(camera.clone())),
    ]);
    handle.follow(states).await;

    assert!(handle.is_disposed());
    assert_eq!(participant.video.current_track(), None);
}

// ============================================================================
// Local participant and ended tracks
// ============================================================================

#[tokio::test]
async fn test_local_participant_is_muted() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());

    handle
        .update(
            ParticipantMediaState::new("me")
                .local(true)
                .with_audio(true, Some(audio_track()))
                .with_video(true, Some(video_track())),
        )
        .await
        .unwrap();
    handle.snapshot().await.unwrap();

    assert!(participant.audio.is_muted());
    assert!(participant.video.is_muted());
}

#[tokio::test]
async fn test_local_video_mute_is_configurable() {
    let participant = TestParticipant::new();
    let config = Config {
        mute_local_video: false,
        ..Config::default()
    };
    let (handle, _task) = participant.spawn_controller(&config);

    handle
        .update(
            ParticipantMediaState::new("me")
                .local(true)
                .with_audio(true, Some(audio_track()))
                .with_video(true, Some(video_track())),
        )
        .await
        .unwrap();
    handle.snapshot().await.unwrap();

    assert!(participant.audio.is_muted());
    assert!(!participant.video.is_muted());
}

#[tokio::test]
async fn test_remote_participant_is_not_muted() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());

    handle
        .update(ParticipantMediaState::new("oscar").with_audio(true, Some(audio_track())))
        .await
        .unwrap();
    handle.snapshot().await.unwrap();

    assert!(!participant.audio.is_muted());
}

#[tokio::test]
async fn test_ended_track_is_treated_as_disabled() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let camera = video_track();
    camera.end();

    handle
        .update(ParticipantMediaState::new("peggy").with_video(true, Some(camera)))
        .await
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Unbound);
    assert_eq!(participant.video.attach_count(), 0);
}

#[tokio::test]
async fn test_track_ending_after_bind_clears_surface() {
    let participant = TestParticipant::new();
    let (handle, _task) = participant.spawn_controller(&Config::default());
    let camera = video_track();
    let state = ParticipantMediaState::new("quinn").with_video(true, Some(camera.clone()));

    handle.update(state.clone()).await.unwrap();
    assert_eq!(
        handle.snapshot().await.unwrap().video,
        BindingState::Bound(camera.id())
    );

    camera.end();
    handle.update(state).await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.video, BindingState::Unbound);
    assert_eq!(participant.video.current_track(), None);
}
