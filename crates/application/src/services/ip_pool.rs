//! Allocation store mapping (peer, domain) pairs to synthetic addresses.
//!
//! IPv4 addresses come from the finite [`AddressPool`] and are reclaimed
//! least-recently-used first once the pool runs dry. IPv6 addresses are the
//! instance ULA /80 plus a 48-bit discriminator that is never reused.
//!
//! Locking: forward records live in a sharded `DashMap` whose entry API
//! serializes creation per key. The IPv4 free list and LRU order sit behind
//! one mutex. Each record's IPv4 slot is only written while that mutex is
//! held, so the order is always shard -> IPv4 state -> record slot.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ipnetwork::Ipv6Network;
use lru::LruCache;
use natc_domain::address_plan::{ula_address, MAX_DISCRIMINATOR};
use natc_domain::{AddressFamily, AddressPool, AllocationKey, DomainError, PeerId};
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

pub const DEFAULT_RECLAIM_IDLE: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct AllocationRecord {
    v4: Mutex<Option<Ipv4Addr>>,
    v6: Ipv6Addr,
    last_used_ms: AtomicU64,
}

impl AllocationRecord {
    fn new(v6: Ipv6Addr, now_ms: u64) -> Self {
        Self {
            v4: Mutex::new(None),
            v6,
            last_used_ms: AtomicU64::new(now_ms),
        }
    }

    fn v4(&self) -> Option<Ipv4Addr> {
        *lock(&self.v4)
    }

    fn set_v4(&self, addr: Option<Ipv4Addr>) {
        *lock(&self.v4) = addr;
    }

    fn touch(&self, now_ms: u64) {
        self.last_used_ms.fetch_max(now_ms, Ordering::Relaxed);
    }

    fn last_used(&self) -> u64 {
        self.last_used_ms.load(Ordering::Relaxed)
    }

    fn addresses(&self) -> Vec<IpAddr> {
        addresses(self.v4(), self.v6)
    }
}

fn addresses(v4: Option<Ipv4Addr>, v6: Ipv6Addr) -> Vec<IpAddr> {
    let mut addrs = Vec::with_capacity(2);
    if let Some(v4) = v4 {
        addrs.push(IpAddr::V4(v4));
    }
    addrs.push(IpAddr::V6(v6));
    addrs
}

struct V4Holder {
    key: AllocationKey,
    record: Arc<AllocationRecord>,
    /// `last_used_ms` of the record when it was last placed in LRU order.
    stamp_ms: u64,
}

struct V4State {
    pool: AddressPool,
    next_fresh: usize,
    recycled: VecDeque<Ipv4Addr>,
    in_use: LruCache<Ipv4Addr, V4Holder>,
}

impl V4State {
    fn take_free(&mut self) -> Option<Ipv4Addr> {
        if let Some(addr) = self.recycled.pop_front() {
            return Some(addr);
        }
        let addr = self.pool.get(self.next_fresh)?;
        self.next_fresh += 1;
        Some(addr)
    }

    fn available(&self) -> usize {
        self.pool.len() - self.next_fresh + self.recycled.len()
    }

    /// Takes the IPv4 address of the least recently used record idle for at
    /// least `idle_ms`. Records touched since they were queued get a second
    /// chance and move to the back of the order.
    fn reclaim(
        &mut self,
        now_ms: u64,
        idle_ms: u64,
        owners: &DashMap<IpAddr, AllocationKey>,
    ) -> Option<Ipv4Addr> {
        for _ in 0..self.in_use.len() {
            let (addr, last_used, stamp) = {
                let (addr, holder) = self.in_use.peek_lru()?;
                (*addr, holder.record.last_used(), holder.stamp_ms)
            };

            if last_used > stamp {
                if let Some(holder) = self.in_use.peek_mut(&addr) {
                    holder.stamp_ms = last_used;
                }
                self.in_use.promote(&addr);
                continue;
            }

            if now_ms.saturating_sub(last_used) < idle_ms {
                return None;
            }

            let (addr, holder) = self.in_use.pop_lru()?;
            holder.record.set_v4(None);
            owners.remove(&IpAddr::V4(addr));
            debug!(
                addr = %addr,
                domain = %holder.key.domain,
                peer = %holder.key.peer,
                "Reclaimed idle IPv4 allocation"
            );
            return Some(addr);
        }
        None
    }
}

pub struct IpPool {
    v6_prefix: Ipv6Network,
    records: DashMap<AllocationKey, Arc<AllocationRecord>>,
    owners: DashMap<IpAddr, AllocationKey>,
    v4: Mutex<V4State>,
    next_discriminator: AtomicU64,
    reclaim_idle: Duration,
    epoch: Instant,
}

impl IpPool {
    pub fn new(pool: AddressPool, v6_prefix: Ipv6Network) -> Self {
        Self {
            v6_prefix,
            records: DashMap::new(),
            owners: DashMap::new(),
            v4: Mutex::new(V4State {
                pool,
                next_fresh: 0,
                recycled: VecDeque::new(),
                in_use: LruCache::unbounded(),
            }),
            next_discriminator: AtomicU64::new(1),
            reclaim_idle: DEFAULT_RECLAIM_IDLE,
            epoch: Instant::now(),
        }
    }

    /// Minimum idle time before an IPv4 allocation can be reclaimed.
    pub fn with_reclaim_idle(mut self, idle: Duration) -> Self {
        self.reclaim_idle = idle;
        self
    }

    /// Returns the stable addresses for `(peer, domain)`, allocating both an
    /// IPv4 and an IPv6 address on first use. IPv4 comes first.
    pub fn ip_for_domain(&self, peer: &PeerId, domain: &str) -> Result<Vec<IpAddr>, DomainError> {
        self.ip_for_domain_family(peer, domain, AddressFamily::Both)
    }

    /// Like [`ip_for_domain`](Self::ip_for_domain), but only fails on IPv4
    /// exhaustion when `family` needs IPv4. A `V6` caller gets a record
    /// without IPv4 when the pool is dry.
    #[instrument(skip(self), level = "debug")]
    pub fn ip_for_domain_family(
        &self,
        peer: &PeerId,
        domain: &str,
        family: AddressFamily,
    ) -> Result<Vec<IpAddr>, DomainError> {
        let key = AllocationKey::new(peer.clone(), domain)?;
        let now = self.now_ms();

        let existing = self.records.get(&key).map(|r| Arc::clone(r.value()));
        let record = match existing {
            Some(record) => record,
            None => match self.records.entry(key.clone()) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let v6 = self.next_v6()?;
                    let record = Arc::new(AllocationRecord::new(v6, now));
                    let v4 = if family.needs_v4() {
                        Some(self.assign_v4(&key, &record, now)?)
                    } else {
                        None
                    };
                    self.owners.insert(IpAddr::V6(v6), key.clone());
                    entry.insert(Arc::clone(&record));

                    let addrs = addresses(v4, v6);
                    debug!(domain = %key.domain, peer = %key.peer, addrs = ?addrs, "New allocation");
                    return Ok(addrs);
                }
            },
        };

        record.touch(now);
        if family.needs_v4() {
            let v4 = self.assign_v4(&key, &record, now)?;
            return Ok(addresses(Some(v4), record.v6));
        }
        Ok(record.addresses())
    }

    /// Current owner of an allocated address.
    pub fn domain_for_ip(&self, addr: IpAddr) -> Option<(Arc<str>, PeerId)> {
        self.owners.get(&addr).map(|key| {
            let key = key.value();
            (Arc::clone(&key.domain), key.peer.clone())
        })
    }

    /// Domain behind `addr`, only if `peer` owns it.
    pub fn domain_for_peer_ip(&self, peer: &PeerId, addr: IpAddr) -> Option<Arc<str>> {
        self.domain_for_ip(addr)
            .filter(|(_, owner)| owner == peer)
            .map(|(domain, _)| domain)
    }

    /// Number of (peer, domain) records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// IPv4 addresses that can be handed out without reclaiming.
    pub fn available_v4(&self) -> usize {
        lock(&self.v4).available()
    }

    /// Returns the record's IPv4 address, allocating one if it has none.
    /// The value is read under the IPv4 state lock, so a concurrent reclaim
    /// cannot clear it between the check and the return.
    fn assign_v4(
        &self,
        key: &AllocationKey,
        record: &Arc<AllocationRecord>,
        now_ms: u64,
    ) -> Result<Ipv4Addr, DomainError> {
        let mut state = lock(&self.v4);
        if let Some(addr) = record.v4() {
            return Ok(addr);
        }

        let idle_ms = self.reclaim_idle.as_millis() as u64;
        let addr = match state.take_free() {
            Some(addr) => addr,
            None => state.reclaim(now_ms, idle_ms, &self.owners).ok_or_else(|| {
                warn!(domain = %key.domain, peer = %key.peer, "IPv4 pool exhausted");
                DomainError::PoolExhausted(format!("no IPv4 address for {}", key.domain))
            })?,
        };

        record.set_v4(Some(addr));
        state.in_use.push(
            addr,
            V4Holder {
                key: key.clone(),
                record: Arc::clone(record),
                stamp_ms: record.last_used(),
            },
        );
        self.owners.insert(IpAddr::V4(addr), key.clone());
        Ok(addr)
    }

    fn next_v6(&self) -> Result<Ipv6Addr, DomainError> {
        let discriminator = self.next_discriminator.fetch_add(1, Ordering::Relaxed);
        if discriminator > MAX_DISCRIMINATOR {
            return Err(DomainError::PoolExhausted(
                "IPv6 discriminator space exhausted".to_string(),
            ));
        }
        ula_address(&self.v6_prefix, discriminator).ok_or_else(|| {
            DomainError::PoolExhausted("IPv6 discriminator space exhausted".to_string())
        })
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
