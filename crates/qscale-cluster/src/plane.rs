//! The control-plane capability the autoscaler depends on.

use async_trait::async_trait;

use qscale_core::ResourceKind;

use crate::error::ClusterResult;

/// Read and write replica counts, and report the control-plane version.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Current replica count (`spec.replicas` for deployments,
    /// `spec.parallelism` for jobs). `None` when the field is unset.
    async fn replicas(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<Option<u32>>;

    /// Set the replica count. Setting the current value again is harmless.
    async fn set_replicas(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        replicas: u32,
    ) -> ClusterResult<()>;

    /// A string identifying the running control-plane build.
    async fn version(&self) -> ClusterResult<String>;

    /// Plane name (for logging).
    fn name(&self) -> &str;
}
