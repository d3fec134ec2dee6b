//! Data models for the subnet registry

use crate::error::Error;
use crate::freelist::FreeList;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use uuid::Uuid;

/// A persisted subnet record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetRecord {
    /// Unique subnet identifier
    pub id: Uuid,

    /// Unique subnet name
    pub name: String,

    /// Network base address in host order. Stored masked, but consumers
    /// must still mask with `prefix` before comparing.
    pub base: u32,

    /// CIDR prefix length, 0..=32
    pub prefix: u8,

    /// Currently unallocated offsets, relative to `base`
    pub free_list: FreeList,

    /// Name-server hostname
    pub ns_hostname: String,

    /// Relative offset of the reserved name-server address, if assigned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns_offset: Option<u32>,

    /// Reverse references from entities claiming offsets in this subnet.
    /// Written by the linking collaborator, read-only for the core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_links: Option<UsageLinks>,

    /// When the subnet was created
    pub created_at: DateTime<Utc>,

    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl SubnetRecord {
    /// Lightweight reference to this record
    pub fn subnet_ref(&self) -> SubnetRef {
        SubnetRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Lightweight subnet reference handed to external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetRef {
    /// Subnet identifier
    pub id: Uuid,
    /// Subnet name
    pub name: String,
}

/// Parameters for creating a subnet
#[derive(Debug, Clone)]
pub struct CreateSubnet {
    /// Unique subnet name
    pub name: String,
    /// Network address; host bits are masked off with `prefix`
    pub network: Ipv4Addr,
    /// CIDR prefix length
    pub prefix: u8,
    /// Name-server hostname; guessed from the local host name when absent
    pub ns_hostname: Option<String>,
    /// Name-server address; defaults to the highest free offset when absent
    pub ns_ip: Option<Ipv4Addr>,
}

/// Kind of a consumer entity holding usage links against a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Node group; each group may claim offsets for many nodes
    Group,
    /// Managed switch; one address each
    Switch,
    /// Any other device; one address each
    OtherDev,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Group => "group",
            EntityKind::Switch => "switch",
            EntityKind::OtherDev => "otherdev",
        };
        f.write_str(s)
    }
}

/// Reverse-reference index: entity kind to claiming entity ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLinks {
    /// Node groups with claims in this subnet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<String>,

    /// Switches with claims in this subnet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub switch: Vec<String>,

    /// Other devices with claims in this subnet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub otherdev: Vec<String>,
}

impl UsageLinks {
    /// Iterate `(kind, entity ids)` pairs in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &[String])> {
        [
            (EntityKind::Group, self.group.as_slice()),
            (EntityKind::Switch, self.switch.as_slice()),
            (EntityKind::OtherDev, self.otherdev.as_slice()),
        ]
        .into_iter()
    }

    /// Whether no entity ids are linked at all
    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.switch.is_empty() && self.otherdev.is_empty()
    }
}

/// Readable subnet field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    /// Network base address, returned in dotted-quad form
    Base,
    /// Netmask derived from the prefix
    Netmask,
    /// CIDR prefix length
    Prefix,
    /// Name-server hostname
    NsHostname,
    /// Name-server address, returned in dotted-quad form
    NsIp,
}

impl FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(FieldKey::Base),
            "netmask" => Ok(FieldKey::Netmask),
            "prefix" => Ok(FieldKey::Prefix),
            "ns_hostname" => Ok(FieldKey::NsHostname),
            "ns_ip" => Ok(FieldKey::NsIp),
            other => Err(Error::UnsupportedField(other.to_string())),
        }
    }
}

/// Value returned by a field read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Dotted-quad address
    Addr(Ipv4Addr),
    /// Prefix length
    Prefix(u8),
    /// Raw text value
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Addr(addr) => addr.fmt(f),
            FieldValue::Prefix(prefix) => prefix.fmt(f),
            FieldValue::Text(text) => text.fmt(f),
        }
    }
}

/// Writable subnet field with its new value
///
/// The closed set of variants replaces string-keyed dispatch; anything
/// else a caller can name fails to parse into [`FieldKey`] with
/// [`Error::UnsupportedField`] before reaching the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Re-base the subnet; the free list is untouched
    Base(Ipv4Addr),
    /// Change the prefix length, truncating the free list if it shrinks
    Prefix(u8),
    /// Rename the name server
    NsHostname(String),
    /// Move the reserved name-server address
    NsIp(Ipv4Addr),
}
