//! Observability for the media surface binder.
//!
//! # Privacy by Default
//!
//! Actor loops use `#[instrument(skip_all)]` with explicit fields. Display
//! names never appear in logs or metric labels; participants are identified
//! by their opaque id only.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `ms_surface_binds_total` | Counter | `kind`, `outcome` | Bind attempts by result |
//! | `ms_surface_unbinds_total` | Counter | `kind` | Tracks detached |
//! | `ms_playback_latency_seconds` | Histogram | `kind` | Playback-start settle time |
//! | `ms_stale_bindings_ignored_total` | Counter | `kind` | Settlements discarded after dispose |
//! | `ms_controllers_active` | Gauge | none | Live participant controllers |
//! | `ms_actor_mailbox_depth` | Gauge | `actor_type` | Backpressure indicator |
//! | `ms_actor_panics_total` | Counter | `actor_type` | Controller task panics |

pub mod metrics;

use common::config::ObservabilityConfig;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing initialisation errors.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInstall(#[from] TryInitError),
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns `InvalidFilter` if the filter directive does not parse, and
/// `SubscriberInstall` if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let filter =
        EnvFilter::try_new(&config.log_level).map_err(|e| ObservabilityError::InvalidFilter {
            directive: config.log_level.clone(),
            reason: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(ObservabilityError::from)
}
