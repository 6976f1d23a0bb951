//! Media Surface Binding Library
//!
//! Keeps each call participant's audio and video rendering surfaces
//! synchronized with that participant's current media availability:
//!
//! - Attaching and detaching live tracks as participant state changes
//! - Tolerating playback rejection (e.g. autoplay policy) without retry storms
//! - Serializing bind/unbind per participant so updates never land out of order
//! - Discarding late settlements after a controller is disposed, so a reused
//!   surface never shows a previous participant's track
//!
//! # Architecture
//!
//! ```text
//! CallSurfacesActor (one per call view)
//! ├── owns surface → participant ownership map
//! └── supervises N ParticipantSurfaceControllers
//!     └── ParticipantSurfaceController (one per participant)
//!         ├── BindingRecord (audio)
//!         └── BindingRecord (video)
//!               └── mutated only through SurfaceBinder
//! ```
//!
//! # Modules
//!
//! - [`actors`] - Per-participant controllers and the call-level supervisor
//! - [`binder`] - Attach/detach protocol and the rebind decision function
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types
//! - [`observability`] - Tracing initialisation and metrics
//! - [`state`] - Participant media snapshots and diff helpers
//! - [`surface`] - Rendering surface abstraction
//! - [`track`] - Track handles compared by identity

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actors;
pub mod binder;
pub mod config;
pub mod errors;
pub mod observability;
pub mod state;
pub mod surface;
pub mod track;

pub use binder::{BindingRecord, BindingState, RebindOutcome, SurfaceBinder, SurfaceKey};
pub use errors::{PlaybackError, SurfaceError};
pub use state::{DesiredBinding, ParticipantMediaState};
pub use surface::{ParticipantSurfaces, RenderSurface, SurfaceHandle};
pub use track::{MediaTrackRef, SingleTrackSource};
