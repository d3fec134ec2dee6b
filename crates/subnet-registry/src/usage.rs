//! Reverse-usage resolution
//!
//! A subnet's free list only says which offsets are taken, not by whom.
//! [`UsageResolver`] walks the record's usage links, asks the registered
//! [`EntityUsageLookup`] capability for each entity kind which offsets its
//! entities claim, and assembles a name-to-address map. Duplicate names
//! are resolved first-write-wins: the earlier entry stays while the later
//! claim is logged as a conflict and skipped.

use crate::{
    addr,
    error::{Error, Result},
    models::{EntityKind, SubnetRecord, SubnetRef},
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use tracing::warn;

/// One named claim on a relative offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedOffset {
    /// Name of the claiming consumer (node, switch, device)
    pub name: String,
    /// Claimed offset relative to the subnet base
    pub offset: u32,
}

/// Capability for fetching the offsets a consumer entity has claimed
///
/// One implementation exists per entity kind. Group entities may
/// contribute several claims (one per node); switches and other devices
/// contribute exactly one.
#[async_trait]
pub trait EntityUsageLookup: Send + Sync {
    /// The entity kind this lookup serves
    fn kind(&self) -> EntityKind;

    /// Offsets the entity currently claims in the subnet
    async fn claimed_offsets(
        &self,
        entity_id: &str,
        subnet: &SubnetRef,
    ) -> Result<Vec<ClaimedOffset>>;
}

/// Result of resolving a subnet's used addresses
#[derive(Debug, Clone, Default)]
pub struct UsageReport {
    /// Consumer name to absolute address
    pub addresses: BTreeMap<String, Ipv4Addr>,
    /// Names that appeared more than once; the first claim won
    pub conflicts: Vec<String>,
}

/// Resolves a subnet's used addresses through injected entity lookups
#[derive(Default)]
pub struct UsageResolver {
    lookups: HashMap<EntityKind, Box<dyn EntityUsageLookup>>,
}

impl UsageResolver {
    /// Create a resolver with no registered lookups
    pub fn new() -> Self {
        Self {
            lookups: HashMap::new(),
        }
    }

    /// Register the lookup for one entity kind, replacing any previous one
    pub fn register(&mut self, lookup: Box<dyn EntityUsageLookup>) {
        self.lookups.insert(lookup.kind(), lookup);
    }

    /// Assemble the name-to-address map of everything claimed in the subnet
    ///
    /// Fails with [`Error::NoUsageConfigured`] when the record carries no
    /// usage links at all; links that exist but are empty resolve to just
    /// the name-server entry. Addresses are returned in absolute form.
    pub async fn resolve_used_addresses(&self, record: &SubnetRecord) -> Result<UsageReport> {
        let links = record
            .usage_links
            .as_ref()
            .ok_or_else(|| Error::NoUsageConfigured(record.name.clone()))?;

        let base = addr::num_subnet(record.base, record.prefix);
        let subnet_ref = record.subnet_ref();
        let mut report = UsageReport::default();

        for (kind, ids) in links.iter() {
            if ids.is_empty() {
                continue;
            }

            let lookup = self.lookups.get(&kind).ok_or_else(|| {
                Error::NotFound(format!("no usage lookup registered for kind '{kind}'"))
            })?;

            for id in ids {
                for claim in lookup.claimed_offsets(id, &subnet_ref).await? {
                    Self::add(
                        &mut report,
                        &record.name,
                        claim.name,
                        addr::to_absolute(claim.offset, base),
                    );
                }
            }
        }

        if let Some(offset) = record.ns_offset {
            Self::add(
                &mut report,
                &record.name,
                record.ns_hostname.clone(),
                addr::to_absolute(offset, base),
            );
        }

        Ok(report)
    }

    // First write wins; later claims on the same name are reported, never
    // applied.
    fn add(report: &mut UsageReport, subnet: &str, name: String, address: Ipv4Addr) {
        if report.addresses.contains_key(&name) {
            warn!("Duplicate name '{}' in subnet '{}'", name, subnet);
            report.conflicts.push(name);
        } else {
            report.addresses.insert(name, address);
        }
    }
}
