//! Actor model for surface binding.
//!
//! ```text
//! CallSurfacesActor (one per call view)
//! └── supervises N ParticipantSurfaceControllers
//!     └── ParticipantSurfaceController (one per participant)
//! ```
//!
//! # Key Design Decisions
//!
//! - **One mailbox per participant**: state updates for a participant are
//!   applied strictly in arrival order, one at a time
//! - **CancellationToken per controller**: `dispose()` cancels the token, which
//!   drops any pending playback request before it can settle
//! - **Exclusive surfaces**: the call actor disposes a surface's previous owner
//!   and waits for it before handing the surface to someone else
//! - **Message passing**: all communication via `tokio::sync::mpsc` channels,
//!   replies via `tokio::sync::oneshot`
//!
//! # Modules
//!
//! - [`call`] - `CallSurfacesActor` supervising participant controllers
//! - [`participant`] - `ParticipantSurfaceController` per participant
//! - [`messages`] - Message types for actor communication
//! - [`metrics`] - Mailbox monitoring and actor metrics

pub mod call;
pub mod messages;
pub mod metrics;
pub mod participant;

// Re-export primary types
pub use call::{CallSurfacesActor, CallSurfacesHandle};
pub use messages::*;
pub use metrics::{ActorMetrics, ActorType, MailboxMonitor};
pub use participant::{ParticipantControllerHandle, ParticipantSurfaceController};
