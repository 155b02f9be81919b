//! skiff-cluster — cluster lifecycle orchestration.
//!
//! Turns bare hosts reachable over a [`Transport`](skiff_transport::Transport)
//! into a running
//! lightweight Kubernetes cluster, grows it, shrinks it, and tears it
//! down.
//!
//! # Architecture
//!
//! ```text
//!  ClusterAssembler ── init_node / join_node
//!        │
//!        ├─ ControlPlaneInitializer   first master, mints identity
//!        │        └─ ReadinessWaiter  bounded kubeconfig poll
//!        ├─ NodeJoiner                one host at a time, saves per join
//!        │        └─ NodeBootstrapper fixed per-host install sequence
//!        │
//!  NodeRemover / ClusterCleaner ── concurrent best-effort teardown
//! ```
//!
//! Failure policy in one line: the control plane is fatal, everything
//! else is logged, skipped, and reported per host.

pub mod assembler;
pub mod bootstrap;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod provision;
pub mod readiness;
pub mod spec;
pub mod teardown;

pub use assembler::ClusterAssembler;
pub use bootstrap::NodeBootstrapper;
pub use error::{BootstrapError, BootstrapStep, ClusterError, ClusterResult};
pub use manifest::NodeManifest;
pub use paths::ClusterPaths;
pub use provision::{ControlPlaneInitializer, NodeJoiner};
pub use readiness::{wait_system_ready, BackoffConfig, ReadinessWaiter};
pub use spec::ClusterSpec;
pub use teardown::{ClusterCleaner, HostOutcome, MembershipApi, NodeRemover, Outcome};

// Re-exported so callers wiring the components need only this crate.
pub use skiff_state::{ClusterState, Node, NodeRole, StateFile};
