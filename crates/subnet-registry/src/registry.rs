//! Core subnet registry implementation
//!
//! [`SubnetRegistry`] owns one store handle and is the only component that
//! persists address-space changes. Every mutation follows the same shape:
//! load the record, derive the change in memory, then apply it with a
//! single [`SubnetStore::update`] call, so the stored document never
//! reflects a half-applied operation.

use crate::{
    addr,
    backend::{SubnetStore, SubnetUpdate, memory::MemoryStore, sled::SledStore},
    config::RegistryConfig,
    error::{Error, Result},
    freelist::FreeList,
    models::*,
};
use async_trait::async_trait;
use chrono::Utc;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Capability for registering a subnet with its parent cluster
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    /// Record that the subnet belongs to the cluster
    async fn link_subnet(&self, subnet: &SubnetRef) -> Result<()>;
}

/// Cluster registry for subnets managed outside any cluster topology
pub struct DetachedCluster;

#[async_trait]
impl ClusterRegistry for DetachedCluster {
    async fn link_subnet(&self, subnet: &SubnetRef) -> Result<()> {
        debug!("Subnet {} created without a cluster link", subnet.name);
        Ok(())
    }
}

/// Subnet registry with pluggable store
pub struct SubnetRegistry {
    /// Storage backend
    store: Arc<Box<dyn SubnetStore>>,
    /// Parent-cluster registration capability
    cluster: Arc<dyn ClusterRegistry>,
}

impl SubnetRegistry {
    /// Create a registry backed by an in-memory store
    pub fn in_memory(cluster: Arc<dyn ClusterRegistry>) -> Self {
        Self {
            store: Arc::new(Box::new(MemoryStore::new())),
            cluster,
        }
    }

    /// Create a registry with a persistent sled store
    pub async fn open(path: impl AsRef<Path>, cluster: Arc<dyn ClusterRegistry>) -> Result<Self> {
        let store = SledStore::new(path).await?;
        store.init().await?;

        Ok(Self {
            store: Arc::new(Box::new(store)),
            cluster,
        })
    }

    /// Create a registry with a custom store
    pub fn with_store(store: Box<dyn SubnetStore>, cluster: Arc<dyn ClusterRegistry>) -> Self {
        Self {
            store: Arc::new(store),
            cluster,
        }
    }

    /// Create a registry from configuration
    pub async fn from_config(
        config: &RegistryConfig,
        cluster: Arc<dyn ClusterRegistry>,
    ) -> Result<Self> {
        if config.store.in_memory {
            Ok(Self::in_memory(cluster))
        } else {
            Self::open(&config.store.db_path, cluster).await
        }
    }

    /// Create a subnet and reserve its name-server address
    ///
    /// The base address is masked down to the network base, the initial
    /// free range covers every host address (network and broadcast
    /// excluded), and the subnet is linked to its parent cluster. When no
    /// explicit name-server IP is given, the highest free offset is
    /// reserved for it; a /31 or /32 subnet has no host window, so the
    /// default reservation is skipped there.
    pub async fn create(&self, req: CreateSubnet) -> Result<SubnetRef> {
        if req.prefix > 32 {
            return Err(Error::InvalidPrefix(req.prefix));
        }

        let base = addr::num_subnet(u32::from(req.network), req.prefix);
        let bound = addr::upper_bound(req.prefix);
        let free_list = if bound >= 2 {
            FreeList::with_range(1, bound - 1)?
        } else {
            FreeList::new()
        };

        let ns_hostname = req
            .ns_hostname
            .clone()
            .unwrap_or_else(addr::guess_ns_hostname);

        let now = Utc::now();
        let record = SubnetRecord {
            id: Uuid::new_v4(),
            name: req.name.clone(),
            base,
            prefix: req.prefix,
            free_list,
            ns_hostname,
            ns_offset: None,
            usage_links: None,
            created_at: now,
            updated_at: now,
        };

        info!(
            "Creating subnet {} ({}/{})",
            record.name,
            Ipv4Addr::from(base),
            record.prefix
        );

        self.store.insert(&record).await?;

        let subnet_ref = record.subnet_ref();
        self.cluster.link_subnet(&subnet_ref).await?;

        let ns_ip = match req.ns_ip {
            Some(ip) => Some(ip),
            None => record
                .free_list
                .highest()
                .map(|offset| addr::to_absolute(offset, base)),
        };

        if let Some(ip) = ns_ip {
            self.set_field(&req.name, FieldUpdate::NsIp(ip)).await?;
        }

        Ok(subnet_ref)
    }

    /// Apply a single field update, persisting the full derived change as
    /// one store write
    ///
    /// Shrinking the prefix truncates the free list at the new upper
    /// bound; growing it never auto-frees the new tail, so callers release
    /// the portion they intend to make available. Moving the name-server
    /// address re-reserves the target even if it is already in use.
    pub async fn set_field(&self, name: &str, update: FieldUpdate) -> Result<()> {
        let record = self.load(name).await?;

        let update = match update {
            FieldUpdate::NsIp(ip) => {
                let offset = addr::to_offset(ip, record.base, record.prefix)?;
                let mut free_list = record.free_list.clone();

                if let Some(old) = record.ns_offset {
                    free_list.release_range(old, old)?;
                }

                let fully = free_list.reserve_range(offset, offset)?;
                if !fully {
                    debug!(
                        "Name-server address {} of subnet {} was already reserved",
                        ip, name
                    );
                }

                SubnetUpdate {
                    free_list: Some(free_list),
                    ns_offset: Some(offset),
                    ..Default::default()
                }
            }

            FieldUpdate::NsHostname(hostname) => SubnetUpdate {
                ns_hostname: Some(hostname),
                ..Default::default()
            },

            FieldUpdate::Base(network) => SubnetUpdate {
                base: Some(addr::num_subnet(u32::from(network), record.prefix)),
                ..Default::default()
            },

            FieldUpdate::Prefix(prefix) => {
                if prefix > 32 {
                    return Err(Error::InvalidPrefix(prefix));
                }

                let mut free_list = record.free_list.clone();
                free_list.rebound(addr::upper_bound(prefix));

                info!(
                    "Resizing subnet {} from /{} to /{}",
                    name, record.prefix, prefix
                );

                SubnetUpdate {
                    base: Some(addr::num_subnet(record.base, prefix)),
                    prefix: Some(prefix),
                    free_list: Some(free_list),
                    ..Default::default()
                }
            }
        };

        self.store.update(name, &update).await
    }

    /// Read a single field
    ///
    /// Addresses come back in dotted-quad form; the netmask is derived
    /// from the prefix.
    pub async fn get_field(&self, name: &str, key: FieldKey) -> Result<FieldValue> {
        let record = self.load(name).await?;
        let base = addr::num_subnet(record.base, record.prefix);

        match key {
            FieldKey::Base => Ok(FieldValue::Addr(Ipv4Addr::from(base))),
            FieldKey::Netmask => Ok(FieldValue::Addr(addr::netmask(record.prefix))),
            FieldKey::Prefix => Ok(FieldValue::Prefix(record.prefix)),
            FieldKey::NsHostname => Ok(FieldValue::Text(record.ns_hostname)),
            FieldKey::NsIp => record
                .ns_offset
                .map(|offset| FieldValue::Addr(addr::to_absolute(offset, base)))
                .ok_or_else(|| {
                    Error::NotFound(format!("subnet '{name}' has no name-server address"))
                }),
        }
    }

    /// Reserve an explicit address range
    ///
    /// With `last` absent a single address is reserved. Returns `true`
    /// when the whole span was free beforehand; on `false` the free part
    /// has still been reserved and the caller decides whether partial
    /// coverage is acceptable.
    pub async fn reserve_range(
        &self,
        name: &str,
        first: Ipv4Addr,
        last: Option<Ipv4Addr>,
    ) -> Result<bool> {
        let record = self.load(name).await?;
        let (start, end) = Self::to_span(&record, first, last)?;

        let mut free_list = record.free_list.clone();
        let fully = free_list.reserve_range(start, end)?;

        self.persist_free_list(name, free_list).await?;

        Ok(fully)
    }

    /// Reserve the lowest free address
    ///
    /// Returns `Ok(None)` when the address space is exhausted.
    pub async fn reserve_next(&self, name: &str) -> Result<Option<Ipv4Addr>> {
        let record = self.load(name).await?;
        let mut free_list = record.free_list.clone();

        match free_list.reserve_next() {
            Some(offset) => {
                self.persist_free_list(name, free_list).await?;
                Ok(Some(addr::to_absolute(offset, record.base)))
            }
            None => {
                debug!("Subnet {} is exhausted", name);
                Ok(None)
            }
        }
    }

    /// Release an address range back to the free list
    ///
    /// Releasing addresses that are already free is a no-op for that part
    /// of the span. Returns the number of addresses actually freed.
    pub async fn release_range(
        &self,
        name: &str,
        first: Ipv4Addr,
        last: Option<Ipv4Addr>,
    ) -> Result<u64> {
        let record = self.load(name).await?;
        let (start, end) = Self::to_span(&record, first, last)?;

        let mut free_list = record.free_list.clone();
        let freed = free_list.release_range(start, end)?;

        self.persist_free_list(name, free_list).await?;

        Ok(freed)
    }

    /// Load a subnet record by name
    pub async fn load(&self, name: &str) -> Result<SubnetRecord> {
        self.store
            .load_by_name(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("subnet '{name}' not found")))
    }

    /// Load a subnet record by id
    pub async fn load_by_id(&self, id: &Uuid) -> Result<SubnetRecord> {
        self.store
            .load_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("subnet {id} not found")))
    }

    /// List all subnet records
    pub async fn list(&self) -> Result<Vec<SubnetRecord>> {
        self.store.list().await
    }

    /// Remove a subnet
    pub async fn remove(&self, name: &str) -> Result<SubnetRecord> {
        self.store
            .remove(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("subnet '{name}' not found")))
    }

    fn to_span(
        record: &SubnetRecord,
        first: Ipv4Addr,
        last: Option<Ipv4Addr>,
    ) -> Result<(u32, u32)> {
        let start = addr::to_offset(first, record.base, record.prefix)?;

        let end = match last {
            Some(ip) => {
                let end = addr::to_offset(ip, record.base, record.prefix)?;
                if end <= start {
                    return Err(Error::InvalidRange { start, end });
                }
                end
            }
            None => start,
        };

        Ok((start, end))
    }

    async fn persist_free_list(&self, name: &str, free_list: FreeList) -> Result<()> {
        let update = SubnetUpdate {
            free_list: Some(free_list),
            ..Default::default()
        };
        self.store.update(name, &update).await
    }
}
