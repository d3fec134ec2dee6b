//! Error types for the subnet registry

use thiserror::Error;

/// Subnet registry error type
#[derive(Error, Debug)]
pub enum Error {
    /// Range endpoints are out of order
    #[error("invalid range: start {start} > end {end}")]
    InvalidRange {
        /// First offset of the requested range
        start: u32,
        /// Last offset of the requested range
        end: u32,
    },

    /// Address falls outside the subnet bounds
    #[error("address {addr} is not in subnet {base}/{prefix}")]
    OutOfRange {
        /// The offending address
        addr: std::net::Ipv4Addr,
        /// Subnet base address
        base: std::net::Ipv4Addr,
        /// Subnet prefix length
        prefix: u8,
    },

    /// CIDR prefix length outside [0, 32]
    #[error("invalid prefix length: /{0}")]
    InvalidPrefix(u8),

    /// Subnet or referenced entity vanished
    #[error("not found: {0}")]
    NotFound(String),

    /// Subnet name already taken
    #[error("subnet already exists: {0}")]
    SubnetExists(String),

    /// Unknown key passed to a field operation
    #[error("unsupported field: {0}")]
    UnsupportedField(String),

    /// Usage resolution requested for a subnet with no usage links
    #[error("no usage configured for subnet: {0}")]
    NoUsageConfigured(String),

    /// External store rejected a write
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Database error
    #[error("database error: {0}")]
    Db(#[from] sled::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
