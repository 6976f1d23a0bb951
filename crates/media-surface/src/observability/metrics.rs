//! Metrics definitions for the media surface binder.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ms_` prefix for media surface
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `kind`: 2 values (audio, video)
//! - `outcome`: 3 values (bound, rejected, timed_out)
//! - `actor_type`: 2 values (call, participant)
//!
//! No participant, track, or surface identifiers are ever used as labels.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a completed bind attempt.
///
/// Metric: `ms_surface_binds_total`
/// Labels: `kind`, `outcome`
pub fn record_bind(kind: &'static str, outcome: &'static str) {
    counter!("ms_surface_binds_total", "kind" => kind, "outcome" => outcome).increment(1);
}

/// Record a track being detached from a surface.
///
/// Metric: `ms_surface_unbinds_total`
/// Labels: `kind`
pub fn record_unbind(kind: &'static str) {
    counter!("ms_surface_unbinds_total", "kind" => kind).increment(1);
}

/// Record how long a playback-start request took to settle.
///
/// Metric: `ms_playback_latency_seconds`
/// Labels: `kind`
pub fn record_playback_latency(kind: &'static str, duration: Duration) {
    histogram!("ms_playback_latency_seconds", "kind" => kind).record(duration.as_secs_f64());
}

/// Record a settlement discarded because its controller was disposed.
///
/// Metric: `ms_stale_bindings_ignored_total`
/// Labels: `kind`
pub fn record_stale_binding_ignored(kind: &'static str) {
    counter!("ms_stale_bindings_ignored_total", "kind" => kind).increment(1);
}

/// Set the number of live participant controllers.
///
/// Metric: `ms_controllers_active`
/// Labels: none
pub fn set_controllers_active(count: usize) {
    // usize to f64 conversion is safe for realistic participant counts
    #[allow(clippy::cast_precision_loss)]
    gauge!("ms_controllers_active").set(count as f64);
}

/// Set the mailbox depth for an actor type.
///
/// Metric: `ms_actor_mailbox_depth`
/// Labels: `actor_type`
pub fn set_actor_mailbox_depth(actor_type: &'static str, depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("ms_actor_mailbox_depth", "actor_type" => actor_type).set(depth as f64);
}

/// Record a controller task that panicked.
///
/// Metric: `ms_actor_panics_total`
/// Labels: `actor_type`
pub fn record_actor_panic(actor_type: &'static str) {
    counter!("ms_actor_panics_total", "actor_type" => actor_type).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    fn counter_value(
        snapshot: Vec<(
            metrics_util::CompositeKey,
            Option<metrics::Unit>,
            Option<metrics::SharedString>,
            DebugValue,
        )>,
        name: &str,
    ) -> u64 {
        snapshot
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == name)
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(count) => count,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_binder_metrics_are_recorded() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_bind("video", "bound");
            record_bind("audio", "rejected");
            record_unbind("video");
            record_stale_binding_ignored("audio");
            record_playback_latency("video", Duration::from_millis(20));
            set_controllers_active(3);
            set_actor_mailbox_depth("participant", 2);
            record_actor_panic("participant");
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert!(snapshot.len() >= 7);
        assert_eq!(counter_value(snapshot, "ms_surface_binds_total"), 2);
    }

    #[test]
    fn test_unbind_counter_accumulates() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_unbind("audio");
            record_unbind("audio");
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(counter_value(snapshot, "ms_surface_unbinds_total"), 2);
    }
}
