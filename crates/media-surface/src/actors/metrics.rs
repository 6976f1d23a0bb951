//! Actor metrics and mailbox monitoring.
//!
//! Mailbox depth thresholds:
//!
//! | Actor Type  | Normal | Warning | Critical |
//! |-------------|--------|---------|----------|
//! | Call        | < 64   | 64-192  | > 192    |
//! | Participant | < 16   | 16-48   | > 48     |
//!
//! A participant mailbox backing up means a surface is stalled on a playback
//! request; state updates behind it are still applied in order once it
//! settles.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::observability::metrics as emit;

/// Mailbox depth thresholds for the call actor.
pub const CALL_MAILBOX_NORMAL: usize = 64;
pub const CALL_MAILBOX_WARNING: usize = 192;

/// Mailbox depth thresholds for participant controllers.
pub const PARTICIPANT_MAILBOX_NORMAL: usize = 16;
pub const PARTICIPANT_MAILBOX_WARNING: usize = 48;

/// Actor type for metrics labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorType {
    /// `CallSurfacesActor` (one per call view).
    Call,
    /// `ParticipantSurfaceController` (one per participant).
    Participant,
}

impl ActorType {
    /// Returns the actor type as a string for metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActorType::Call => "call",
            ActorType::Participant => "participant",
        }
    }

    /// Returns the warning threshold for this actor type.
    #[must_use]
    pub const fn warning_threshold(&self) -> usize {
        match self {
            ActorType::Call => CALL_MAILBOX_WARNING,
            ActorType::Participant => PARTICIPANT_MAILBOX_WARNING,
        }
    }

    /// Returns the normal threshold for this actor type.
    #[must_use]
    pub const fn normal_threshold(&self) -> usize {
        match self {
            ActorType::Call => CALL_MAILBOX_NORMAL,
            ActorType::Participant => PARTICIPANT_MAILBOX_NORMAL,
        }
    }
}

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    /// Below normal threshold.
    Normal,
    /// Between normal and warning thresholds.
    Warning,
    /// Above warning threshold.
    Critical,
}

/// Mailbox monitor for tracking queue depth and emitting metrics.
#[derive(Debug)]
pub struct MailboxMonitor {
    actor_type: ActorType,
    /// Actor identifier (participant id, or "call").
    actor_id: String,
    /// Depth observed at the last dequeue.
    depth: AtomicUsize,
    /// Peak mailbox depth since last reset.
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
}

impl MailboxMonitor {
    /// Create a new mailbox monitor for the given actor.
    #[must_use]
    pub fn new(actor_type: ActorType, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type,
            actor_id: actor_id.into(),
            depth: AtomicUsize::new(0),
            peak_depth: AtomicUsize::new(0),
            messages_processed: AtomicU64::new(0),
        }
    }

    /// Record a dequeued message, with `remaining` messages still queued.
    pub fn record_dequeue(&self, remaining: usize) {
        let previous = self.depth.swap(remaining, Ordering::Relaxed);
        self.peak_depth.fetch_max(remaining, Ordering::Relaxed);
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        emit::set_actor_mailbox_depth(self.actor_type.as_str(), remaining);

        let level = self.level_for_depth(remaining);
        if level == MailboxLevel::Critical {
            warn!(
                target: "ms.actor.mailbox",
                actor_type = self.actor_type.as_str(),
                actor_id = %self.actor_id,
                depth = remaining,
                threshold = self.actor_type.warning_threshold(),
                "Mailbox depth critical"
            );
        } else if level == MailboxLevel::Warning
            && previous <= self.actor_type.normal_threshold()
        {
            // Log once when crossing into the warning band
            debug!(
                target: "ms.actor.mailbox",
                actor_type = self.actor_type.as_str(),
                actor_id = %self.actor_id,
                depth = remaining,
                "Mailbox depth elevated"
            );
        }
    }

    /// Get the last observed mailbox depth.
    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Get the peak mailbox depth.
    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    /// Get total messages processed.
    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    /// Get the current mailbox level.
    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        self.level_for_depth(self.current_depth())
    }

    fn level_for_depth(&self, depth: usize) -> MailboxLevel {
        if depth > self.actor_type.warning_threshold() {
            MailboxLevel::Critical
        } else if depth > self.actor_type.normal_threshold() {
            MailboxLevel::Warning
        } else {
            MailboxLevel::Normal
        }
    }
}

/// Aggregated metrics for the actor system.
#[derive(Debug, Default)]
pub struct ActorMetrics {
    /// Participant controllers currently running.
    pub active_controllers: AtomicUsize,
    /// Total actor panics (indicates bugs).
    pub actor_panics: AtomicU64,
    /// Total messages processed across all actors.
    pub total_messages_processed: AtomicU64,
}

impl ActorMetrics {
    /// Create a new shared metrics instance.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Increment active controller count.
    pub fn controller_started(&self) {
        let count = self.active_controllers.fetch_add(1, Ordering::Relaxed) + 1;
        emit::set_controllers_active(count);
    }

    /// Decrement active controller count.
    pub fn controller_stopped(&self) {
        let count = self
            .active_controllers
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        emit::set_controllers_active(count);
    }

    /// Record an actor panic.
    pub fn record_panic(&self, actor_type: ActorType) {
        self.actor_panics.fetch_add(1, Ordering::Relaxed);
        emit::record_actor_panic(actor_type.as_str());
        tracing::error!(
            target: "ms.actor.panic",
            actor_type = actor_type.as_str(),
            total_panics = self.actor_panics.load(Ordering::Relaxed),
            "Actor panic detected - indicates bug, investigation required"
        );
    }

    /// Record a message being processed.
    pub fn record_message_processed(&self) {
        self.total_messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current controller count.
    #[must_use]
    pub fn controller_count(&self) -> usize {
        self.active_controllers.load(Ordering::Relaxed)
    }
}
