//! Reconciler for Consul clusters delivered as Azure managed applications.
//!
//! A cluster is purchased as a marketplace managed application; its servers,
//! network and storage live inside a managed resource group owned by the
//! publisher. The reconciler drives the full lifecycle through two planes:
//! the Resource Manager for the managed application itself, and the custom
//! resource provider inside the managed scope for everything Consul-shaped
//! (root tokens, snapshots, upgrades, federation, agent config).
//!
//! Each lifecycle surface lives in its own module: [`cluster`],
//! [`root_token`], [`snapshot`], [`federation_token`] and [`agent_config`].
//! They all run against a shared [`ReconcilerContext`] holding the three
//! client handles behind their traits, so tests run in-memory.

pub mod agent_config;
pub mod cluster;
pub mod config;
pub mod error;
pub mod federation;
pub mod federation_token;
pub mod ids;
pub mod root_token;
pub mod snapshot;

pub use cluster::{ClusterState, CreatedCluster, ResolvedClusterConfig, RootToken};
pub use config::{
    ClusterConfig, ClusterMode, ClusterUpdateConfig, ReconcilerConfig, ReconcilerContext,
    DEFAULT_DELETE_COOLDOWN, DEFAULT_POLL_INTERVAL, DEFAULT_VNET_CIDR,
};
pub use error::ReconcileError;
pub use federation::{federation_tokens_have_same_primary, is_primary_with_secondaries};
pub use snapshot::Snapshot;

#[cfg(test)]
mod cluster_test;
#[cfg(test)]
mod snapshot_test;
