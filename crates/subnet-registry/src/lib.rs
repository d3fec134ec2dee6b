//! Address-space registry for cluster provisioning subnets
//!
//! This crate manages the IP address space of subnets used to provision a
//! compute cluster: it allocates, reserves, and releases addresses or
//! address ranges from a CIDR block, tracks which addresses are claimed by
//! which cluster entities, and supports resizing a subnet without
//! corrupting existing reservations.
//!
//! # Architecture
//!
//! - [`FreeList`] holds the available offsets of one subnet as sorted,
//!   disjoint, non-adjacent inclusive ranges relative to the subnet base.
//! - [`SubnetRegistry`] owns subnet records, delegates range math to the
//!   free list, and persists every mutation as a single document write
//!   through a pluggable [`SubnetStore`] (sled on disk, or in-memory).
//! - [`UsageResolver`] maps the used complement of the free list back to
//!   the owning entities via injected [`EntityUsageLookup`] capabilities.
//!
//! The crate is runtime-agnostic: store and lookup traits are `async` but
//! nothing assumes a particular executor.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use subnet_registry::{CreateSubnet, DetachedCluster, SubnetRegistry};
//!
//! # async fn example() -> subnet_registry::Result<()> {
//! let registry = SubnetRegistry::open("/var/lib/subnet-registry/subnets.db",
//!     Arc::new(DetachedCluster)).await?;
//!
//! registry.create(CreateSubnet {
//!     name: "cluster0".to_string(),
//!     network: "10.141.0.0".parse().unwrap(),
//!     prefix: 24,
//!     ns_hostname: None,
//!     ns_ip: None,
//! }).await?;
//!
//! let ip = registry.reserve_next("cluster0").await?;
//! # let _ = ip;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod addr;
pub mod backend;
pub mod config;
pub mod error;
pub mod freelist;
pub mod models;
pub mod registry;
pub mod usage;

pub use backend::{SubnetStore, SubnetUpdate};
pub use config::{RegistryConfig, StoreConfig};
pub use error::{Error, Result};
pub use freelist::{FreeList, FreeRange};
pub use models::*;
pub use registry::{ClusterRegistry, DetachedCluster, SubnetRegistry};
pub use usage::{ClaimedOffset, EntityUsageLookup, UsageReport, UsageResolver};

/// Re-export key types for convenience
pub mod prelude {
    pub use crate::{
        ClusterRegistry, CreateSubnet, EntityKind, Error, FieldKey, FieldUpdate, FieldValue,
        FreeList, Result, SubnetRecord, SubnetRegistry, SubnetStore, UsageResolver,
    };
}
