//! Address arithmetic between absolute dotted-quad addresses and
//! offsets relative to a subnet base
//!
//! All functions are pure. Bases are carried as host-order `u32` the way
//! they are persisted; dotted-quad values cross the API boundary as
//! [`Ipv4Addr`].

use crate::error::{Error, Result};
use std::net::Ipv4Addr;

/// Highest valid offset in a subnet with the given prefix length,
/// `2^(32-prefix) - 1`.
pub fn upper_bound(prefix: u8) -> u32 {
    ((1u64 << (32 - u64::from(prefix))) - 1) as u32
}

/// Netmask for a prefix length
pub fn netmask(prefix: u8) -> Ipv4Addr {
    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    Ipv4Addr::from(mask)
}

/// Mask an address down to its network base for the given prefix
pub fn num_subnet(addr: u32, prefix: u8) -> u32 {
    addr & u32::from(netmask(prefix))
}

/// Convert an absolute address to an offset relative to the subnet base
///
/// Fails with [`Error::OutOfRange`] if the address is outside
/// `[base, base + 2^(32-prefix) - 1]`. The base is masked with the prefix
/// before comparing, so callers may pass it unmasked.
pub fn to_offset(addr: Ipv4Addr, base: u32, prefix: u8) -> Result<u32> {
    let net = num_subnet(base, prefix);
    let addr_num = u32::from(addr);
    let bound = u64::from(net) + u64::from(upper_bound(prefix));

    if addr_num < net || u64::from(addr_num) > bound {
        return Err(Error::OutOfRange {
            addr,
            base: Ipv4Addr::from(net),
            prefix,
        });
    }

    Ok(addr_num - net)
}

/// Convert a relative offset back to an absolute address
pub fn to_absolute(offset: u32, base: u32) -> Ipv4Addr {
    Ipv4Addr::from(base.wrapping_add(offset))
}

/// Guess a name-server hostname from the local host name
///
/// The domain part is dropped, and a trailing `1` or `2` is stripped so
/// that both members of an HA controller pair guess the same name.
pub fn guess_ns_hostname() -> String {
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    let short = hostname.split('.').next().unwrap_or(&hostname);

    match short.strip_suffix('1').or_else(|| short.strip_suffix('2')) {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => short.to_string(),
    }
}
