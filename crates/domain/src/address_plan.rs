//! Static address planning.
//!
//! Turns the serviced IPv4 prefixes and the site identifier into the
//! connector's DNS address, its allocatable IPv4 pool and its IPv6 ULA /80.
//! Everything here is computed once at startup and never mutated.

use crate::DomainError;
use ipnetwork::{Ipv4Network, Ipv6Network};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Fixed upper 64 bits shared by every connector's ULA prefix.
pub const ULA_BASE: u64 = 0xfd7a_115c_a1e0_a99c;

pub const ULA_PREFIX_LEN: u8 = 80;

/// Largest discriminator that fits in the 48 free bits of the /80.
pub const MAX_DISCRIMINATOR: u64 = (1 << 48) - 1;

/// Largest IPv4 prefix length that still leaves a usable host.
const MAX_V4_PREFIX_LEN: u8 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPlan {
    pub routes: Vec<Ipv4Network>,
    pub dns_addr: Ipv4Addr,
    pub pool: AddressPool,
}

/// Ordered, finite set of allocatable IPv4 addresses.
///
/// Stored as inclusive ranges so that a /8 does not cost 16M entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPool {
    ranges: Vec<(u32, u32)>,
    len: usize,
}

impl AddressPool {
    fn from_ranges(ranges: Vec<(u32, u32)>) -> Self {
        let len = ranges
            .iter()
            .map(|(start, end)| (end - start) as usize + 1)
            .sum();
        Self { ranges, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the address at `index` in enumeration order.
    pub fn get(&self, index: usize) -> Option<Ipv4Addr> {
        let mut remaining = index;
        for (start, end) in &self.ranges {
            let span = (end - start) as usize + 1;
            if remaining < span {
                return Some(Ipv4Addr::from(start + remaining as u32));
            }
            remaining -= span;
        }
        None
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let bits = u32::from(addr);
        self.ranges
            .iter()
            .any(|(start, end)| (*start..=*end).contains(&bits))
    }

    pub fn iter(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.ranges
            .iter()
            .flat_map(|(start, end)| (*start..=*end).map(Ipv4Addr::from))
    }
}

/// Splits the serviced prefixes into routes, the reserved DNS address and
/// the allocatable pool.
///
/// The DNS address is the first usable host of the first prefix. Network and
/// broadcast addresses of every prefix are excluded from the pool.
pub fn plan_addresses(prefixes: &[Ipv4Network]) -> Result<AddressPlan, DomainError> {
    if prefixes.is_empty() {
        return Err(DomainError::ConfigError(
            "at least one IPv4 prefix is required".to_string(),
        ));
    }

    let mut routes = Vec::with_capacity(prefixes.len());
    let mut ranges = Vec::with_capacity(prefixes.len());

    for prefix in prefixes {
        if prefix.prefix() > MAX_V4_PREFIX_LEN {
            return Err(DomainError::ConfigError(format!(
                "prefix {} has no usable host addresses",
                prefix
            )));
        }

        let route = Ipv4Network::new(prefix.network(), prefix.prefix())
            .map_err(|e| DomainError::InvalidCidr(format!("{}: {}", prefix, e)))?;

        if let Some(existing) = routes.iter().find(|r: &&Ipv4Network| overlaps(r, &route)) {
            return Err(DomainError::ConfigError(format!(
                "prefix {} overlaps {}",
                route, existing
            )));
        }

        let first_host = u32::from(route.network()) + 1;
        let last_host = u32::from(route.broadcast()) - 1;
        ranges.push((first_host, last_host));
        routes.push(route);
    }

    let dns_addr = Ipv4Addr::from(ranges[0].0);
    ranges[0].0 += 1;

    Ok(AddressPlan {
        routes,
        dns_addr,
        pool: AddressPool::from_ranges(ranges),
    })
}

fn overlaps(a: &Ipv4Network, b: &Ipv4Network) -> bool {
    a.contains(b.network()) || b.contains(a.network())
}

/// The /80 unique local prefix owned by the connector with `site_id`.
pub fn ula(site_id: u16) -> Ipv6Network {
    let bits = ((ULA_BASE as u128) << 64) | ((site_id as u128) << 48);
    Ipv6Network::new(Ipv6Addr::from(bits), ULA_PREFIX_LEN)
        .expect("80 is a valid IPv6 prefix length")
}

/// Places `discriminator` in the low 48 bits of the ULA prefix.
pub fn ula_address(prefix: &Ipv6Network, discriminator: u64) -> Option<Ipv6Addr> {
    if discriminator > MAX_DISCRIMINATOR {
        return None;
    }
    let base = u128::from(prefix.network());
    Some(Ipv6Addr::from(base | discriminator as u128))
}
