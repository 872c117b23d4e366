//! Loop regression tests.
//!
//! Drives full autoscaler passes against an in-memory queue store and
//! control plane, configured the same way the daemon configures itself.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use qscale_autoscale::{Autoscaler, PassReport, ScaleOutcome, TargetOutcome};
use qscale_cluster::{FakeControlPlane, ReplicaReader};
use qscale_core::{ResourceKind, RetryPolicy, ScalingTarget};
use qscale_queue::MemoryBacklog;
use qscaled::Cli;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["qscaled", "--redis-host", "localhost"];
    argv.extend_from_slice(args);
    Cli::try_parse_args_only(argv).unwrap()
}

fn autoscaler(
    cli: &Cli,
) -> (
    Arc<MemoryBacklog>,
    Arc<FakeControlPlane>,
    Autoscaler,
    Vec<ScalingTarget>,
) {
    let (targets, settings) = cli.load().unwrap();
    let backlog = Arc::new(MemoryBacklog::new());
    let plane = Arc::new(FakeControlPlane::new());
    let scaler = Autoscaler::new(backlog.clone(), plane.clone(), targets.clone(), settings)
        .with_replica_reader(ReplicaReader::new(RetryPolicy::fixed(2, Duration::ZERO)));
    (backlog, plane, scaler, targets)
}

fn outcomes(report: PassReport) -> (Vec<(String, TargetOutcome)>, Duration) {
    match report {
        PassReport::Completed {
            outcomes,
            next_interval,
        } => (outcomes, next_interval),
        PassReport::Cooldown(wait) => panic!("unexpected cooldown of {wait:?}"),
    }
}

#[tokio::test]
async fn three_pending_images_scale_consumer_to_three() {
    let cli = cli(&[
        "--resource-name",
        "redis-consumer",
        "--resource-namespace",
        "deepcell",
        "--max-pods",
        "4",
    ]);
    let (backlog, plane, mut scaler, _) = autoscaler(&cli);
    plane.insert(ResourceKind::Deployment, "deepcell", "redis-consumer", 0);
    for i in 0..3 {
        backlog.push_item(&format!("predict_{i}"), "new", &format!("img{i}.png"));
    }

    let (results, next) = outcomes(scaler.run_pass().await);
    assert!(matches!(
        results[0].1,
        TargetOutcome::Decided {
            outcome: ScaleOutcome::Scaled { from: 0, to: 3 },
            ..
        }
    ));
    assert_eq!(next, Duration::from_secs(60));

    // Second pass with the same backlog is a no-op.
    let (_, _) = outcomes(scaler.run_pass().await);
    assert_eq!(plane.set_calls().len(), 1);
}

#[tokio::test]
async fn lifecycle_scale_up_hold_and_stand_down() {
    let cli = cli(&["--resource-name", "redis-consumer", "--max-pods", "4"]);
    let (backlog, plane, mut scaler, _) = autoscaler(&cli);
    plane.insert(ResourceKind::Deployment, "default", "redis-consumer", 0);

    backlog.push_item("predict_a", "new", "a.tiff");
    backlog.push_item("predict_b", "new", "b.tiff");
    scaler.run_pass().await;
    assert_eq!(plane.current(ResourceKind::Deployment, "default", "redis-consumer"), Some(2));

    // One item finishes: demand drops to 1 but the count holds at 2.
    backlog.hset("predict_a", "status", "done");
    scaler.run_pass().await;
    assert_eq!(plane.current(ResourceKind::Deployment, "default", "redis-consumer"), Some(2));

    // Everything finishes: stand down to zero and relax the interval.
    backlog.hset("predict_b", "status", "failed");
    let (_, next) = outcomes(scaler.run_pass().await);
    assert_eq!(plane.current(ResourceKind::Deployment, "default", "redis-consumer"), Some(0));
    assert_eq!(next, Duration::from_secs(5));

    let replicas: Vec<u32> = plane.set_calls().iter().map(|c| c.replicas).collect();
    assert_eq!(replicas, vec![2, 0]);
}

#[tokio::test]
async fn legacy_targets_are_independent() {
    let cli = cli(&[
        "--autoscaling",
        "0|2|1|ns|deployment|predict|redis-consumer;0|auto|2|ns|job|train|training-job",
    ]);
    let (backlog, plane, mut scaler, targets) = autoscaler(&cli);
    assert_eq!(targets.len(), 2);

    plane.insert(ResourceKind::Deployment, "ns", "redis-consumer", 0);
    plane.insert(ResourceKind::Job, "ns", "training-job", 0);
    for i in 0..5 {
        backlog.push_item(&format!("predict_{i}"), "new", "cell.png");
        backlog.push_item(&format!("train_{i}"), "new", "set.zip");
    }

    let (results, _) = outcomes(scaler.run_pass().await);
    assert_eq!(results[0].0, "ns/redis-consumer");
    assert_eq!(results[0].1.desired(), Some(2));
    assert_eq!(results[1].0, "ns/training-job");
    assert_eq!(results[1].1.desired(), Some(2));
    assert_eq!(plane.current(ResourceKind::Job, "ns", "training-job"), Some(2));
}

#[tokio::test]
async fn failed_scale_is_retried_next_pass() {
    let cli = cli(&["--resource-name", "redis-consumer", "--max-pods", "4"]);
    let (backlog, plane, mut scaler, _) = autoscaler(&cli);
    plane.insert(ResourceKind::Deployment, "default", "redis-consumer", 0);
    backlog.push_item("predict_a", "new", "a.tiff");

    plane.fail_sets(true);
    let (results, _) = outcomes(scaler.run_pass().await);
    assert!(matches!(
        results[0].1,
        TargetOutcome::Decided {
            outcome: ScaleOutcome::Failed(_),
            ..
        }
    ));

    plane.fail_sets(false);
    scaler.run_pass().await;
    assert_eq!(plane.current(ResourceKind::Deployment, "default", "redis-consumer"), Some(1));
    assert_eq!(plane.set_calls().len(), 2);
}

#[tokio::test]
async fn control_plane_upgrade_pauses_scaling() {
    let cli = cli(&["--resource-name", "redis-consumer", "--cooldown", "30"]);
    let (backlog, plane, mut scaler, _) = autoscaler(&cli);
    plane.insert(ResourceKind::Deployment, "default", "redis-consumer", 0);

    outcomes(scaler.run_pass().await);
    backlog.push_item("predict_a", "new", "a.tiff");
    plane.set_version("v1.31.2");

    let report = scaler.run_pass().await;
    assert!(matches!(report, PassReport::Cooldown(wait) if wait == Duration::from_secs(30)));
    assert!(plane.set_calls().is_empty());

    // Unreachable control plane never starts a cooldown.
    plane.set_version_error("dial tcp 10.0.0.1:443: connection refused");
    outcomes(scaler.run_pass().await);
    assert_eq!(plane.set_calls().len(), 1);
}

#[tokio::test]
async fn toml_config_drives_the_loop() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[loop]
interval_secs = 1
active_interval_secs = 2

[[target]]
resource_name = "zip-consumer"
namespace = "deepcell"
queues = ["predict"]
max_replicas = 3
items_per_replica = 2
"#
    )
    .unwrap();

    let path = file.path().to_string_lossy().to_string();
    let cli = cli(&["--config", &path]);
    let (backlog, plane, mut scaler, _) = autoscaler(&cli);
    plane.insert(ResourceKind::Deployment, "deepcell", "zip-consumer", 0);
    backlog.push_item("predict_1", "new", "a.png");
    backlog.push_item("predict_2", "new", "b.zip");
    backlog.push_item("predict_3", "new", "c.tar.gz");
    backlog.push_item("predict_4", "new", "d.tgz");

    let (results, next) = outcomes(scaler.run_pass().await);
    // Three archives at two per replica.
    assert_eq!(results[0].1.desired(), Some(1));
    assert_eq!(next, Duration::from_secs(2));
}
