//! # Media Surface Test Utilities
//!
//! Shared test utilities for the media surface binding library.
//!
//! ## Modules
//!
//! - `mock_surface` - Scriptable `RenderSurface` recording every call made on it
//! - `fixtures` - Pre-built tracks and participants
//!
//! ## Usage
//!
//! ```rust,ignore
//! use media_surface_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     // Participant whose video surface refuses playback
//!     let participant = TestParticipant::new();
//!     participant.video.set_rejecting(Some("autoplay blocked"));
//!
//!     let (handle, _task) = participant.spawn_controller(&Config::default());
//!     handle
//!         .update(ParticipantMediaState::new("alice").with_video(true, Some(video_track())))
//!         .await
//!         .unwrap();
//!
//!     // Run your assertions...
//! }
//! ```
//!
//! ## Gated Playback
//!
//! ```rust,ignore
//! let surface = MockSurface::gated();
//!
//! // ... trigger a bind, then:
//! surface.wait_for_playback_requests(1).await;
//! surface.release_playback(1);
//! ```

pub mod fixtures;
pub mod mock_surface;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_surface::*;
