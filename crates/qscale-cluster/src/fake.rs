//! In-memory control plane for tests.
//!
//! Tracks replica counts per resource, records every write, and lets a
//! test script empty reads, failing writes, and version changes.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use qscale_core::ResourceKind;

use crate::error::{ClusterError, ClusterResult};
use crate::plane::ControlPlane;

type ResourceKey = (ResourceKind, String, String);

/// A recorded `set_replicas` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCall {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    pub replicas: u32,
}

struct Inner {
    replicas: HashMap<ResourceKey, u32>,
    empty_reads: u32,
    read_calls: u32,
    fail_sets: bool,
    set_calls: Vec<SetCall>,
    version: Result<String, String>,
}

/// A `ControlPlane` backed by process memory.
pub struct FakeControlPlane {
    inner: Mutex<Inner>,
}

impl Default for FakeControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                replicas: HashMap::new(),
                empty_reads: 0,
                read_calls: 0,
                fail_sets: false,
                set_calls: Vec::new(),
                version: Ok("v1.30.0".to_string()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a resource with a replica count.
    pub fn insert(&self, kind: ResourceKind, namespace: &str, name: &str, replicas: u32) {
        self.lock()
            .replicas
            .insert((kind, namespace.to_string(), name.to_string()), replicas);
    }

    /// Answer the next `count` reads with an unset value.
    pub fn empty_reads(&self, count: u32) {
        self.lock().empty_reads = count;
    }

    /// Make writes fail.
    pub fn fail_sets(&self, fail: bool) {
        self.lock().fail_sets = fail;
    }

    /// Change the reported version string.
    pub fn set_version(&self, version: &str) {
        self.lock().version = Ok(version.to_string());
    }

    /// Make version queries fail with `message`.
    pub fn set_version_error(&self, message: &str) {
        self.lock().version = Err(message.to_string());
    }

    /// Current replica count of a resource, if registered.
    pub fn current(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<u32> {
        self.lock()
            .replicas
            .get(&(kind, namespace.to_string(), name.to_string()))
            .copied()
    }

    /// Every write so far.
    pub fn set_calls(&self) -> Vec<SetCall> {
        self.lock().set_calls.clone()
    }

    /// Number of replica reads so far.
    pub fn read_calls(&self) -> u32 {
        self.lock().read_calls
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn replicas(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<Option<u32>> {
        let mut inner = self.lock();
        inner.read_calls += 1;
        if inner.empty_reads > 0 {
            inner.empty_reads -= 1;
            return Ok(None);
        }
        inner
            .replicas
            .get(&(kind, namespace.to_string(), name.to_string()))
            .copied()
            .map(Some)
            .ok_or_else(|| ClusterError::NotFound {
                kind: kind.as_str(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn set_replicas(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        replicas: u32,
    ) -> ClusterResult<()> {
        let mut inner = self.lock();
        inner.set_calls.push(SetCall {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            replicas,
        });
        if inner.fail_sets {
            return Err(ClusterError::Api {
                operation: "patch",
                message: "admission webhook denied the request".to_string(),
            });
        }
        inner
            .replicas
            .insert((kind, namespace.to_string(), name.to_string()), replicas);
        Ok(())
    }

    async fn version(&self) -> ClusterResult<String> {
        self.lock()
            .version
            .clone()
            .map_err(|message| ClusterError::Api {
                operation: "version",
                message,
            })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_are_recorded_and_applied() {
        let plane = FakeControlPlane::new();
        plane.insert(ResourceKind::Deployment, "ns", "web", 1);

        plane
            .set_replicas(ResourceKind::Deployment, "ns", "web", 3)
            .await
            .unwrap();

        assert_eq!(plane.current(ResourceKind::Deployment, "ns", "web"), Some(3));
        assert_eq!(plane.set_calls().len(), 1);
        assert_eq!(plane.set_calls()[0].replicas, 3);
    }

    #[tokio::test]
    async fn unknown_resource_is_not_found() {
        let plane = FakeControlPlane::new();
        let err = plane
            .replicas(ResourceKind::Job, "ns", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn scripted_empty_reads() {
        let plane = FakeControlPlane::new();
        plane.insert(ResourceKind::Job, "ns", "train", 2);
        plane.empty_reads(1);

        assert_eq!(plane.replicas(ResourceKind::Job, "ns", "train").await.unwrap(), None);
        assert_eq!(plane.replicas(ResourceKind::Job, "ns", "train").await.unwrap(), Some(2));
        assert_eq!(plane.read_calls(), 2);
    }

    #[tokio::test]
    async fn version_errors() {
        let plane = FakeControlPlane::new();
        assert_eq!(plane.version().await.unwrap(), "v1.30.0");

        plane.set_version_error("Unable to connect to the server");
        assert!(plane.version().await.unwrap_err().is_connectivity());
    }
}
