//! Kubernetes-backed control plane.
//!
//! Reads go through `Api::get`; writes are JSON merge patches of the
//! replica field, which makes repeating a write with the same value a
//! no-op on the API server.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, Patch, PatchParams};
use tracing::debug;

use qscale_core::ResourceKind;

use crate::error::{ClusterError, ClusterResult};
use crate::plane::ControlPlane;

/// Field manager recorded on patches.
const FIELD_MANAGER: &str = "qscale";

/// Control plane over a `kube::Client`.
pub struct KubeControlPlane {
    client: kube::Client,
}

impl KubeControlPlane {
    /// Build a client from the in-cluster service account or local kubeconfig.
    pub async fn try_default() -> ClusterResult<Self> {
        let client = kube::Client::try_default()
            .await
            .map_err(|e| ClusterError::Client(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: kube::Client) -> Self {
        Self { client }
    }
}

fn map_kube_error(
    operation: &'static str,
    kind: ResourceKind,
    namespace: &str,
    name: &str,
    e: kube::Error,
) -> ClusterError {
    match e {
        kube::Error::Api(ref resp) if resp.code == 404 => ClusterError::NotFound {
            kind: kind.as_str(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        other => ClusterError::Api {
            operation,
            message: other.to_string(),
        },
    }
}

/// Negative counts are treated as unset.
fn to_count(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

/// Merge patch body setting the replica field for `kind`.
fn replica_patch(kind: ResourceKind, replicas: u32) -> serde_json::Value {
    match kind {
        ResourceKind::Deployment => serde_json::json!({ "spec": { "replicas": replicas } }),
        ResourceKind::Job => serde_json::json!({ "spec": { "parallelism": replicas } }),
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn replicas(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<Option<u32>> {
        let count = match kind {
            ResourceKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                let deployment = api
                    .get(name)
                    .await
                    .map_err(|e| map_kube_error("get deployment", kind, namespace, name, e))?;
                to_count(deployment.spec.and_then(|s| s.replicas))
            }
            ResourceKind::Job => {
                let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
                let job = api
                    .get(name)
                    .await
                    .map_err(|e| map_kube_error("get job", kind, namespace, name, e))?;
                to_count(job.spec.and_then(|s| s.parallelism))
            }
        };
        Ok(count)
    }

    async fn set_replicas(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        replicas: u32,
    ) -> ClusterResult<()> {
        let patch = replica_patch(kind, replicas);
        let params = PatchParams::apply(FIELD_MANAGER);

        match kind {
            ResourceKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.patch(name, &params, &Patch::Merge(&patch))
                    .await
                    .map_err(|e| map_kube_error("patch deployment", kind, namespace, name, e))?;
            }
            ResourceKind::Job => {
                let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
                api.patch(name, &params, &Patch::Merge(&patch))
                    .await
                    .map_err(|e| map_kube_error("patch job", kind, namespace, name, e))?;
            }
        }

        debug!(%kind, %namespace, %name, replicas, "patched replica count");
        Ok(())
    }

    async fn version(&self) -> ClusterResult<String> {
        let info = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| ClusterError::Api {
                operation: "version",
                message: e.to_string(),
            })?;

        Ok(format!(
            "{} {} {} {}",
            info.git_version, info.git_commit, info.platform, info.build_date
        ))
    }

    fn name(&self) -> &str {
        "kubernetes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_counts_are_unset() {
        assert_eq!(to_count(Some(3)), Some(3));
        assert_eq!(to_count(Some(0)), Some(0));
        assert_eq!(to_count(Some(-1)), None);
        assert_eq!(to_count(None), None);
    }

    #[test]
    fn patch_targets_kind_specific_field() {
        assert_eq!(
            replica_patch(ResourceKind::Deployment, 4),
            serde_json::json!({ "spec": { "replicas": 4 } })
        );
        assert_eq!(
            replica_patch(ResourceKind::Job, 2),
            serde_json::json!({ "spec": { "parallelism": 2 } })
        );
    }
}
