//! qscale-cluster: control-plane access for the autoscaler.
//!
//! The autoscaler only needs three things from the cluster: the current
//! replica (or parallelism) count of a resource, a way to set it, and the
//! control plane's version string. `ControlPlane` captures exactly that.
//!
//! # Components
//!
//! - **`plane`**: the `ControlPlane` capability trait
//! - **`kube_plane`**: `KubeControlPlane`, backed by the Kubernetes API
//! - **`fake`**: `FakeControlPlane`, an in-memory plane for tests
//! - **`reader`**: `ReplicaReader`, bounded-retry replica reads

pub mod error;
pub mod fake;
pub mod kube_plane;
pub mod plane;
pub mod reader;

pub use error::{ClusterError, ClusterResult};
pub use fake::FakeControlPlane;
pub use kube_plane::KubeControlPlane;
pub use plane::ControlPlane;
pub use reader::ReplicaReader;
