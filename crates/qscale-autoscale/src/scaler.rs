//! Autoscaler: the control loop.
//!
//! Each pass checks control-plane stability, then walks the configured
//! targets in order: sample the backlog, read the current replica count,
//! decide, and execute. A failure on one target never stops the pass.
//! The sleep before the next pass is short while nothing is wanted and
//! longer while any target wants replicas.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use qscale_cluster::{ControlPlane, ReplicaReader};
use qscale_core::{LoopSettings, ScalingTarget};
use qscale_queue::{BacklogSampler, BacklogSource};

use crate::decision::ReplicaDecision;
use crate::demand::required_replicas;
use crate::error::{ScaleError, ScaleResult};
use crate::executor::{ScaleExecutor, ScaleOutcome};
use crate::stability::{StabilityGuard, StabilityVerdict};

/// Result of evaluating one target in a pass.
#[derive(Debug)]
pub enum TargetOutcome {
    /// No decision was reached; nothing was sent.
    Skipped(ScaleError),
    Decided {
        decision: ReplicaDecision,
        outcome: ScaleOutcome,
    },
}

impl TargetOutcome {
    /// Desired replicas, if a decision was reached.
    pub fn desired(&self) -> Option<u32> {
        match self {
            Self::Decided { decision, .. } => Some(decision.desired_replicas),
            Self::Skipped(_) => None,
        }
    }
}

/// Result of one pass over every target.
#[derive(Debug)]
pub enum PassReport {
    /// The control plane changed; no target was evaluated.
    Cooldown(Duration),
    Completed {
        /// `(target id, outcome)` in configuration order.
        outcomes: Vec<(String, TargetOutcome)>,
        next_interval: Duration,
    },
}

/// Drives every configured target toward its backlog-derived size.
pub struct Autoscaler {
    source: Arc<dyn BacklogSource>,
    plane: Arc<dyn ControlPlane>,
    targets: Vec<ScalingTarget>,
    settings: LoopSettings,
    sampler: BacklogSampler,
    reader: ReplicaReader,
    executor: ScaleExecutor,
    guard: StabilityGuard,
}

impl Autoscaler {
    pub fn new(
        source: Arc<dyn BacklogSource>,
        plane: Arc<dyn ControlPlane>,
        targets: Vec<ScalingTarget>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            plane,
            targets,
            sampler: BacklogSampler::new(),
            reader: ReplicaReader::default(),
            executor: ScaleExecutor::new(settings.verbosity),
            guard: StabilityGuard::new(settings.cooldown()),
            settings,
        }
    }

    /// Replace the replica reader (e.g. a faster retry policy in tests).
    pub fn with_replica_reader(mut self, reader: ReplicaReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn targets(&self) -> &[ScalingTarget] {
        &self.targets
    }

    pub fn guard(&self) -> &StabilityGuard {
        &self.guard
    }

    /// Compute the decision for one target without acting on it.
    pub async fn decide(&self, target: &ScalingTarget) -> ScaleResult<ReplicaDecision> {
        let snapshot = self.sampler.sample(self.source.as_ref(), target).await?;
        let required = required_replicas(&snapshot, target);

        let current = self
            .reader
            .read(self.plane.as_ref(), target)
            .await
            .observed()
            .ok_or_else(|| ScaleError::ReplicasUnknown {
                resource: target.id(),
            })?;

        let decision = ReplicaDecision::for_target(target, required, current);
        debug!(
            resource = %target.id(),
            pending = snapshot.count(target.consumes),
            required = decision.required_replicas,
            current = decision.current_replicas,
            desired = decision.desired_replicas,
            max = decision.resolved_max,
            suppressed = decision.suppressed,
            "computed replica decision"
        );
        Ok(decision)
    }

    /// Decide and, if needed, scale one target.
    pub async fn evaluate(&self, target: &ScalingTarget) -> TargetOutcome {
        match self.decide(target).await {
            Ok(decision) => {
                let outcome = self
                    .executor
                    .execute(self.plane.as_ref(), target, &decision)
                    .await;
                TargetOutcome::Decided { decision, outcome }
            }
            Err(e) => {
                warn!(resource = %target.id(), error = %e, "skipping target this pass");
                TargetOutcome::Skipped(e)
            }
        }
    }

    /// Run a single pass.
    pub async fn run_pass(&mut self) -> PassReport {
        if let StabilityVerdict::Cooldown(wait) = self.guard.check(self.plane.as_ref()).await {
            return PassReport::Cooldown(wait);
        }

        let mut outcomes = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let outcome = self.evaluate(target).await;
            outcomes.push((target.id(), outcome));
        }

        let active = outcomes
            .iter()
            .any(|(_, outcome)| outcome.desired().is_some_and(|d| d > 0));
        let next_interval = if active {
            self.settings.active_interval()
        } else {
            self.settings.interval()
        };

        PassReport::Completed {
            outcomes,
            next_interval,
        }
    }

    /// Run passes until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            targets = self.targets.len(),
            queue = self.source.name(),
            plane = self.plane.name(),
            interval_secs = self.settings.interval_secs,
            active_interval_secs = self.settings.active_interval_secs,
            "autoscaler starting"
        );
        self.guard.prime(self.plane.as_ref()).await;

        while !*shutdown.borrow() {
            let (wait, cooling) = match self.run_pass().await {
                PassReport::Cooldown(wait) => (wait, true),
                PassReport::Completed { next_interval, .. } => (next_interval, false),
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => break,
            }

            if cooling {
                self.guard.finish_cooldown();
            }
        }

        info!("autoscaler stopped");
    }
}
