//! Store backend implementations
//!
//! The registry persists every mutation through [`SubnetStore`]. Each
//! [`SubnetStore::update`] applies one [`SubnetUpdate`] partial as a single
//! document write; callers never issue multiple partial writes for one
//! logical operation. Serializing mutations of the same subnet across
//! callers is the deployment's responsibility; the backends assume at most
//! one in-flight mutation per subnet.

pub mod memory;
pub mod sled;

use crate::{error::Result, freelist::FreeList, models::*};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trait for subnet storage backends
#[async_trait]
pub trait SubnetStore: Send + Sync {
    /// Initialize the backend
    async fn init(&self) -> Result<()>;

    /// Insert a new subnet record, failing if the name is taken
    async fn insert(&self, record: &SubnetRecord) -> Result<()>;

    /// Load a subnet by name
    async fn load_by_name(&self, name: &str) -> Result<Option<SubnetRecord>>;

    /// Load a subnet by id
    async fn load_by_id(&self, id: &Uuid) -> Result<Option<SubnetRecord>>;

    /// Apply a partial update to a subnet as one atomic document write
    ///
    /// Fails with `NotFound` when the record vanished since it was loaded.
    async fn update(&self, name: &str, update: &SubnetUpdate) -> Result<()>;

    /// Remove a subnet, returning the stored record if it existed
    async fn remove(&self, name: &str) -> Result<Option<SubnetRecord>>;

    /// List all subnet records
    async fn list(&self) -> Result<Vec<SubnetRecord>>;
}

/// Partial update of a subnet record
///
/// Only the fields carried as `Some` change. `usage_links` is the write
/// path of the external linking collaborator; the registry itself never
/// sets it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubnetUpdate {
    /// New base address (host order, masked)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<u32>,

    /// New prefix length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<u8>,

    /// Replacement free list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_list: Option<FreeList>,

    /// New name-server hostname
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns_hostname: Option<String>,

    /// New name-server offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns_offset: Option<u32>,

    /// Replacement usage-link index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_links: Option<UsageLinks>,
}

impl SubnetUpdate {
    /// Apply the partial to a loaded record, stamping `updated_at`
    pub fn apply_to(&self, record: &mut SubnetRecord) {
        if let Some(base) = self.base {
            record.base = base;
        }
        if let Some(prefix) = self.prefix {
            record.prefix = prefix;
        }
        if let Some(free_list) = &self.free_list {
            record.free_list = free_list.clone();
        }
        if let Some(ns_hostname) = &self.ns_hostname {
            record.ns_hostname = ns_hostname.clone();
        }
        if let Some(ns_offset) = self.ns_offset {
            record.ns_offset = Some(ns_offset);
        }
        if let Some(usage_links) = &self.usage_links {
            record.usage_links = Some(usage_links.clone());
        }
        record.updated_at = Utc::now();
    }
}
