//! Control-plane stability guard.
//!
//! Fingerprints the control plane's version string once per pass. When
//! the fingerprint changes (an upgrade or a failover to a different
//! server build) scaling is suspended for the cooldown period so the
//! autoscaler does not act on counts read mid-transition.
//!
//! # State Machine
//!
//! ```text
//! Stable ──fingerprint changed──► Cooldown ──finish_cooldown()──► Stable
//! ```
//!
//! A failed version query never triggers a cooldown.

use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use qscale_cluster::{ClusterError, ControlPlane};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Stable,
    Cooldown,
}

/// What the loop should do after a stability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityVerdict {
    Proceed,
    /// Skip the pass and sleep for the given duration.
    Cooldown(Duration),
}

/// Tracks the last seen control-plane fingerprint.
#[derive(Debug, Clone)]
pub struct StabilityGuard {
    last_fingerprint: Option<String>,
    cooldown: Duration,
    state: GuardState,
}

impl StabilityGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_fingerprint: None,
            cooldown,
            state: GuardState::Stable,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn last_fingerprint(&self) -> Option<&str> {
        self.last_fingerprint.as_deref()
    }

    /// Record the starting fingerprint. Never triggers a cooldown.
    pub async fn prime(&mut self, plane: &dyn ControlPlane) {
        let _ = self.check(plane).await;
    }

    /// Query the plane and compare against the last fingerprint.
    pub async fn check(&mut self, plane: &dyn ControlPlane) -> StabilityVerdict {
        let version = plane.version().await;
        self.observe(version)
    }

    /// Apply one version query result.
    pub fn observe(&mut self, version: Result<String, ClusterError>) -> StabilityVerdict {
        let version = match version {
            Ok(version) => version,
            Err(e) => {
                if e.is_connectivity() {
                    warn!(error = %e, "control plane unreachable, skipping stability check");
                } else {
                    error!(error = %e, "control plane version query failed");
                }
                return StabilityVerdict::Proceed;
            }
        };

        let current = fingerprint(&version);
        match self.last_fingerprint.replace(current.clone()) {
            None => {
                debug!(fingerprint = %current, "recorded control plane fingerprint");
                StabilityVerdict::Proceed
            }
            Some(previous) if previous != current => {
                info!(
                    previous = %previous,
                    current = %current,
                    cooldown_secs = self.cooldown.as_secs(),
                    "control plane changed, suspending scaling"
                );
                self.state = GuardState::Cooldown;
                StabilityVerdict::Cooldown(self.cooldown)
            }
            Some(_) => StabilityVerdict::Proceed,
        }
    }

    /// Leave the cooldown state once the wait has elapsed.
    pub fn finish_cooldown(&mut self) {
        if self.state == GuardState::Cooldown {
            debug!("cooldown finished, resuming scaling");
            self.state = GuardState::Stable;
        }
    }
}

/// Hex SHA-256 of a version string.
pub fn fingerprint(version: &str) -> String {
    hex::encode(Sha256::digest(version.as_bytes()))
}
