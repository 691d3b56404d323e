use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// How long a resolved address is reused before resolving again.
pub const DEFAULT_DNS_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct CachedAddress {
    ip: IpAddr,
    resolved_at: Instant,
}

/// Resolved addresses keyed by the hostname the operator typed.
#[derive(Debug)]
pub struct DnsCache {
    entries: HashMap<String, CachedAddress>,
    ttl: Duration,
}

impl Default for DnsCache {
    fn default() -> Self {
        Self::new(DEFAULT_DNS_TTL)
    }
}

impl DnsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Returns the cached address if it is still fresh at `now`.
    pub fn lookup(&self, host: &str, now: Instant) -> Option<IpAddr> {
        self.entries
            .get(host)
            .filter(|entry| now.saturating_duration_since(entry.resolved_at) <= self.ttl)
            .map(|entry| entry.ip)
    }

    pub fn insert(&mut self, host: &str, ip: IpAddr, now: Instant) {
        self.entries.insert(
            host.to_string(),
            CachedAddress {
                ip,
                resolved_at: now,
            },
        );
    }

    /// Drops a host, e.g. after its address stopped answering.
    pub fn invalidate(&mut self, host: &str) {
        self.entries.remove(host);
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    const IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7));

    #[test]
    fn fresh_entry_is_returned() {
        let mut cache = DnsCache::new(Duration::from_secs(10));
        let now = Instant::now();
        cache.insert("example.com", IP, now);
        assert_eq!(cache.lookup("example.com", now + Duration::from_secs(10)), Some(IP));
        assert_eq!(cache.lookup("example.org", now), None);
    }

    #[test]
    fn expired_entry_is_ignored() {
        let mut cache = DnsCache::new(Duration::from_secs(10));
        let now = Instant::now();
        cache.insert("example.com", IP, now);
        assert_eq!(cache.lookup("example.com", now + Duration::from_secs(11)), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = DnsCache::default();
        let now = Instant::now();
        cache.insert("example.com", IP, now);
        cache.invalidate("example.com");
        assert_eq!(cache.lookup("example.com", now), None);
    }
}
