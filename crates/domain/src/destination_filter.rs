use crate::DomainError;
use ipnetwork::IpNetwork;
use rustc_hash::FxHashMap;
use std::net::IpAddr;

/// Longest-prefix-match table of destinations that bypass interception.
///
/// A more specific entry always wins, so `10.1.0.0/16 => false` carves an
/// exception out of `10.0.0.0/8 => true`.
#[derive(Debug, Default, Clone)]
pub struct DestinationFilter {
    v4: PrefixTable,
    v6: PrefixTable,
}

#[derive(Debug, Default, Clone)]
struct PrefixTable {
    /// Registered prefix lengths, longest first.
    lengths: Vec<u8>,
    entries: FxHashMap<(u8, u128), bool>,
}

impl PrefixTable {
    fn insert(&mut self, bits: u128, len: u8, width: u8, ignored: bool) {
        self.entries.insert((len, mask(bits, len, width)), ignored);
        if let Err(pos) = self.lengths.binary_search_by(|probe| len.cmp(probe)) {
            self.lengths.insert(pos, len);
        }
    }

    fn lookup(&self, bits: u128, width: u8) -> Option<bool> {
        self.lengths
            .iter()
            .find_map(|&len| self.entries.get(&(len, mask(bits, len, width))).copied())
    }
}

fn mask(bits: u128, len: u8, width: u8) -> u128 {
    if len == 0 {
        return 0;
    }
    let shift = width - len;
    (bits >> shift) << shift
}

impl DestinationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an all-ignored table from CIDR strings such as `"10.0.0.0/8"`.
    pub fn from_cidrs<S: AsRef<str>>(cidrs: &[S]) -> Result<Self, DomainError> {
        let mut filter = Self::new();
        for cidr in cidrs {
            let cidr = cidr.as_ref();
            let network: IpNetwork = cidr
                .parse()
                .map_err(|e| DomainError::InvalidCidr(format!("{}: {}", cidr, e)))?;
            filter.insert(network, true);
        }
        Ok(filter)
    }

    pub fn insert(&mut self, prefix: IpNetwork, ignored: bool) {
        match prefix {
            IpNetwork::V4(net) => {
                self.v4
                    .insert(u32::from(net.ip()) as u128, net.prefix(), 32, ignored)
            }
            IpNetwork::V6(net) => self.v6.insert(u128::from(net.ip()), net.prefix(), 128, ignored),
        }
    }

    /// Value of the most specific prefix covering `addr`, if any.
    pub fn lookup(&self, addr: IpAddr) -> Option<bool> {
        match addr {
            IpAddr::V4(v4) => self.v4.lookup(u32::from(v4) as u128, 32),
            IpAddr::V6(v6) => self.v6.lookup(u128::from(v6), 128),
        }
    }

    /// True when any address in `addrs` is covered by an ignored prefix.
    pub fn is_ignored(&self, addrs: &[IpAddr]) -> bool {
        addrs.iter().any(|addr| self.lookup(*addr) == Some(true))
    }

    pub fn len(&self) -> usize {
        self.v4.entries.len() + self.v6.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
