//! skiff-state — the persisted cluster record.
//!
//! One JSON document is the source of truth for cluster membership:
//! identity, join token, node list, and the network/CNI settings chosen
//! at creation. It is created once by control-plane initialization,
//! mutated only by appending node records, and read before every join
//! and removal.
//!
//! [`StateFile`] is the load/save contract: load yields a zero-value
//! state when the file is absent; save writes a temp file and renames
//! it over the target so a crash never leaves half-written state.

pub mod error;
pub mod file;
pub mod types;

pub use error::{StateError, StateResult};
pub use file::StateFile;
pub use types::{ClusterState, Node, NodeRole};
