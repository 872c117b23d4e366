//! Current-replica reader with a bounded retry.
//!
//! An unset or unreadable count is retried under the policy (five
//! attempts, three seconds apart by default). Exhaustion yields
//! `ReplicaReading::Unknown`, which callers must not treat as zero.

use tracing::{debug, warn};

use qscale_core::{ReplicaReading, RetryPolicy, ScalingTarget};

use crate::plane::ControlPlane;

/// Reads a target's current replica count.
#[derive(Debug, Clone)]
pub struct ReplicaReader {
    policy: RetryPolicy,
}

impl Default for ReplicaReader {
    fn default() -> Self {
        Self::new(RetryPolicy::REPLICA_READ)
    }
}

impl ReplicaReader {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn read(&self, plane: &dyn ControlPlane, target: &ScalingTarget) -> ReplicaReading {
        let resource = target.id();
        let found = self
            .policy
            .until_some(|attempt| {
                let resource = resource.as_str();
                async move {
                    match plane
                        .replicas(target.resource_kind, &target.namespace, &target.resource_name)
                        .await
                    {
                        Ok(Some(count)) => Some(count),
                        Ok(None) => {
                            debug!(%resource, attempt, "replica count is unset");
                            None
                        }
                        Err(e) => {
                            warn!(%resource, attempt, error = %e, "failed to read replica count");
                            None
                        }
                    }
                }
            })
            .await;

        match found {
            Some(count) => ReplicaReading::Observed(count),
            None => {
                warn!(
                    %resource,
                    attempts = self.policy.max_attempts(),
                    "replica count unknown after retries"
                );
                ReplicaReading::Unknown
            }
        }
    }
}
