//! Scale executor: issues the replica-set command and reports the result.
//!
//! Successful scales are reported at info level according to the
//! configured `Verbosity`; everything else about a success stays at
//! debug. Failures are always reported and never retried in-pass: the
//! next pass recomputes the decision from the cluster's actual state.

use tracing::{debug, info, warn};

use qscale_cluster::{ClusterError, ControlPlane};
use qscale_core::{ScalingTarget, Verbosity};

use crate::decision::ReplicaDecision;

/// What happened to a decision.
#[derive(Debug)]
pub enum ScaleOutcome {
    /// No command was needed.
    Unchanged,
    /// The command was accepted.
    Scaled { from: u32, to: u32 },
    /// The command was rejected or could not be sent.
    Failed(ClusterError),
}

/// Executes replica decisions against a control plane.
#[derive(Debug, Clone, Default)]
pub struct ScaleExecutor {
    verbosity: Verbosity,
}

impl ScaleExecutor {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub async fn execute(
        &self,
        plane: &dyn ControlPlane,
        target: &ScalingTarget,
        decision: &ReplicaDecision,
    ) -> ScaleOutcome {
        if !decision.needs_scale() {
            return ScaleOutcome::Unchanged;
        }

        let from = decision.current_replicas;
        let to = decision.desired_replicas;
        let resource = target.id();

        match plane
            .set_replicas(target.resource_kind, &target.namespace, &target.resource_name, to)
            .await
        {
            Ok(()) => {
                if is_reportable(self.verbosity, to, target.min_replicas, decision.resolved_max) {
                    info!(
                        %resource,
                        kind = %target.resource_kind,
                        from,
                        to,
                        "scaled resource"
                    );
                } else {
                    debug!(%resource, from, to, "scaled resource");
                }
                ScaleOutcome::Scaled { from, to }
            }
            Err(e) => {
                warn!(
                    %resource,
                    kind = %target.resource_kind,
                    from,
                    to,
                    error = %e,
                    "scale command failed, will re-evaluate next pass"
                );
                ScaleOutcome::Failed(e)
            }
        }
    }
}

/// Whether a successful scale to `desired` is logged at info level.
pub fn is_reportable(verbosity: Verbosity, desired: u32, min: u32, max: u32) -> bool {
    match verbosity {
        Verbosity::High => true,
        Verbosity::Medium => desired == min || desired == max || desired == midpoint(min, max),
        Verbosity::Low => desired == min || desired == max,
    }
}

fn midpoint(min: u32, max: u32) -> u32 {
    min + (max.saturating_sub(min)) / 2
}
