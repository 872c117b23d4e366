//! Replica decisions: bound clamping and anti-flap.
//!
//! A `ReplicaDecision` is built fresh for each target on each pass and
//! threaded through the stages by value.

use qscale_core::{MaxReplicas, ScalingTarget};

/// The per-iteration decision context for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaDecision {
    /// Demand before clamping.
    pub required_replicas: u32,
    /// Count observed on the control plane.
    pub current_replicas: u32,
    /// Count to converge on after clamping and anti-flap.
    pub desired_replicas: u32,
    /// Already sitting at the bound the demand points to.
    pub suppressed: bool,
    /// Upper bound used for this iteration.
    pub resolved_max: u32,
}

impl ReplicaDecision {
    /// Start a decision with the raw demand and the observed count.
    pub fn new(required_replicas: u32, current_replicas: u32) -> Self {
        Self {
            required_replicas,
            current_replicas,
            desired_replicas: required_replicas,
            suppressed: false,
            resolved_max: required_replicas,
        }
    }

    /// Run the full pipeline for `target`: bounds, then anti-flap.
    pub fn for_target(target: &ScalingTarget, required: u32, current: u32) -> Self {
        Self::new(required, current)
            .enforce_bounds(target.min_replicas, target.max_replicas)
            .anti_flap()
    }

    /// Clamp the demand into `[min, max]`.
    ///
    /// A dynamic max is resolved as `required + current + 1`, which leaves
    /// the upper clamp inert for this iteration.
    pub fn enforce_bounds(mut self, min: u32, max: MaxReplicas) -> Self {
        let max = max.resolve(self.required_replicas, self.current_replicas);
        self.resolved_max = max;

        if self.required_replicas <= min {
            self.desired_replicas = min;
            self.suppressed = self.current_replicas == min;
        } else if self.required_replicas >= max {
            self.desired_replicas = max;
            self.suppressed = self.current_replicas == max;
        } else {
            self.desired_replicas = self.required_replicas;
            self.suppressed = false;
        }
        self
    }

    /// Only a full stand-down to zero may lower the replica count; any
    /// other decrease holds at the current count.
    pub fn anti_flap(mut self) -> Self {
        if self.desired_replicas < self.current_replicas && self.desired_replicas != 0 {
            self.desired_replicas = self.current_replicas;
        }
        self
    }

    /// Whether a scale command should be issued.
    pub fn needs_scale(&self) -> bool {
        !self.suppressed && self.desired_replicas != self.current_replicas
    }
}
