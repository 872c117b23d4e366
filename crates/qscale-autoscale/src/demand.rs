//! Demand calculation: pending items to required replicas.

use qscale_core::{BacklogSnapshot, ScalingTarget, WorkCategory, WorkMode};

/// Required replicas for `target` given its backlog.
///
/// Train targets size on archives and round down. Predict targets size on
/// the category they consume and never leave a non-empty backlog without
/// at least one replica.
pub fn required_replicas(snapshot: &BacklogSnapshot, target: &ScalingTarget) -> u32 {
    let per = target.items_per_replica.max(1);

    let category = match target.work_mode {
        WorkMode::Train => WorkCategory::Archive,
        WorkMode::Predict => target.consumes,
    };
    let pending = snapshot.count(category);
    let pods = pending / per;

    if target.work_mode == WorkMode::Predict && pods == 0 && pending > 0 {
        return 1;
    }
    pods
}

#[cfg(test)]
mod tests {
    use super::*;
    use qscale_core::{MaxReplicas, ResourceKind};

    fn target(mode: WorkMode, name: &str, per: u32) -> ScalingTarget {
        ScalingTarget::new(
            0,
            MaxReplicas::Fixed(10),
            per,
            "ns",
            ResourceKind::Deployment,
            mode,
            name,
        )
        .unwrap()
    }

    #[test]
    fn floor_division() {
        let t = target(WorkMode::Predict, "redis-consumer", 3);
        assert_eq!(required_replicas(&BacklogSnapshot::from_counts(10, 0), &t), 3);
        assert_eq!(required_replicas(&BacklogSnapshot::from_counts(9, 0), &t), 3);
        assert_eq!(required_replicas(&BacklogSnapshot::from_counts(0, 0), &t), 0);
    }

    #[test]
    fn predict_rounds_small_backlog_up_to_one() {
        let t = target(WorkMode::Predict, "redis-consumer", 5);
        assert_eq!(required_replicas(&BacklogSnapshot::from_counts(3, 0), &t), 1);
    }

    #[test]
    fn train_does_not_round_up() {
        let t = target(WorkMode::Train, "training-job", 5);
        assert_eq!(required_replicas(&BacklogSnapshot::from_counts(0, 3), &t), 0);
        assert_eq!(required_replicas(&BacklogSnapshot::from_counts(0, 10), &t), 2);
    }

    #[test]
    fn train_ignores_images() {
        let t = target(WorkMode::Train, "training-job", 1);
        assert_eq!(required_replicas(&BacklogSnapshot::from_counts(50, 0), &t), 0);
    }

    #[test]
    fn predict_uses_consumed_category() {
        let images = target(WorkMode::Predict, "redis-consumer", 2);
        let archives = target(WorkMode::Predict, "zip-consumer", 2);
        let snapshot = BacklogSnapshot::from_counts(8, 1);

        assert_eq!(required_replicas(&snapshot, &images), 4);
        // 1 archive / 2 per replica rounds up to one.
        assert_eq!(required_replicas(&snapshot, &archives), 1);
    }

    #[test]
    fn empty_category_needs_nothing() {
        let archives = target(WorkMode::Predict, "zip-consumer", 2);
        assert_eq!(
            required_replicas(&BacklogSnapshot::from_counts(8, 0), &archives),
            0
        );
    }
}
