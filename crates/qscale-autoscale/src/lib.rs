//! qscale-autoscale: backlog-driven replica scaling.
//!
//! Samples pending work from the queue store, converts it into a replica
//! demand per target, and drives the cluster toward it. Scale-downs only
//! happen all the way to zero, and scaling pauses entirely while the
//! control plane is settling after a version change.
//!
//! # Scaling Algorithm
//!
//! ```text
//! pods     = pending[category] / items_per_replica        // floor
//! required = pods, or 1 if pods == 0 && pending > 0       // predict only
//!
//! max      = fixed max, or required + current + 1         // dynamic max
//! if required <= min:  desired = min  (suppressed if current == min)
//! elif required >= max: desired = max (suppressed if current == max)
//! else:                desired = required
//!
//! if 0 < desired < current: desired = current             // anti-flap
//! if !suppressed && desired != current: ScaleTo(desired)
//! ```
//!
//! # Components
//!
//! - **`demand`**: backlog snapshot → required replicas
//! - **`decision`**: bounds clamp and anti-flap on a `ReplicaDecision`
//! - **`executor`**: issues the scale command with tiered result logging
//! - **`stability`**: control-plane version fingerprinting and cooldown
//! - **`scaler`**: the loop controller tying it all together

pub mod decision;
pub mod demand;
pub mod error;
pub mod executor;
pub mod scaler;
pub mod stability;

pub use decision::ReplicaDecision;
pub use demand::required_replicas;
pub use error::{ScaleError, ScaleResult};
pub use executor::{ScaleExecutor, ScaleOutcome};
pub use scaler::{Autoscaler, PassReport, TargetOutcome};
pub use stability::{GuardState, StabilityGuard, StabilityVerdict};
