//! ICMP echo probing.
//!
//! Every failure path (resolution, socket creation, timeout, bad reply)
//! collapses into a failed [`Outcome`]; nothing here returns an error.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use surge_ping::{Client, Config, ICMP, IcmpPacket, PingIdentifier, PingSequence};

use crate::dns_cache::DnsCache;
use crate::outcome::{Outcome, duration_millis};

/// Echo payload, 32 ASCII bytes.
pub const PROBE_PAYLOAD: [u8; 32] = [b'a'; 32];

/// Anything that can turn a destination into an [`Outcome`].
pub trait Prober: Send + Sync + 'static {
    fn probe(&self, destination: &str, timeout: Duration) -> impl Future<Output = Outcome> + Send;
}

/// Keep only valid hostname characters (alphanumeric, dots, hyphens).
/// Returns None if nothing is left.
pub fn sanitize_hostname(hostname: &str) -> Option<String> {
    // Also handle case where user included port like "example.com:8080"
    let hostname = hostname.trim();
    let hostname = hostname.split(':').next().unwrap_or(hostname);

    let sanitized: String = hostname
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '-')
        .collect();

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Resolve an IP literal or hostname to its first address.
pub async fn resolve_target(target: &str) -> Option<IpAddr> {
    if let Ok(ip) = target.trim().parse::<IpAddr>() {
        return Some(ip);
    }

    let sanitized = sanitize_hostname(target)?;
    match tokio::net::lookup_host(format!("{sanitized}:0")).await {
        Ok(mut addrs) => addrs.next().map(|addr| addr.ip()),
        Err(e) => {
            log::warn!("Failed to resolve {target}: {e}");
            None
        }
    }
}

fn reply_ttl(packet: &IcmpPacket) -> u32 {
    match packet {
        IcmpPacket::V4(reply) => reply.get_ttl().map_or(0, u32::from),
        IcmpPacket::V6(reply) => u32::from(reply.get_max_hop_limit()),
    }
}

/// Real ICMP prober backed by surge-ping.
///
/// The OS default TTL is used. The don't-fragment bit is left to the OS as
/// surge-ping exposes no socket option for it.
pub struct IcmpProber {
    identifier: u16,
    sequence: AtomicU16,
    dns: Mutex<DnsCache>,
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new()
    }
}

impl IcmpProber {
    pub fn new() -> Self {
        Self {
            identifier: std::process::id() as u16,
            sequence: AtomicU16::new(0),
            dns: Mutex::new(DnsCache::default()),
        }
    }

    async fn resolve(&self, destination: &str) -> Option<IpAddr> {
        let now = Instant::now();
        if let Some(ip) = self.dns.lock().ok().and_then(|cache| cache.lookup(destination, now)) {
            return Some(ip);
        }

        let ip = resolve_target(destination).await?;
        if let Ok(mut cache) = self.dns.lock() {
            cache.insert(destination, ip, now);
        }
        Some(ip)
    }

    fn forget(&self, destination: &str) {
        if let Ok(mut cache) = self.dns.lock() {
            cache.invalidate(destination);
        }
    }

    async fn echo(&self, ip: IpAddr, timeout: Duration) -> Option<(u32, u32)> {
        let config = match ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = match Client::new(&config) {
            Ok(client) => client,
            Err(e) => {
                log::warn!("Failed to create ICMP client for {ip}: {e}");
                return None;
            }
        };

        let mut pinger = client.pinger(ip, PingIdentifier(self.identifier)).await;
        pinger.timeout(timeout);

        let seq = PingSequence(self.sequence.fetch_add(1, Ordering::Relaxed));
        match tokio::time::timeout(timeout, pinger.ping(seq, &PROBE_PAYLOAD)).await {
            Ok(Ok((packet, rtt))) => Some((duration_millis(rtt), reply_ttl(&packet))),
            Ok(Err(e)) => {
                log::debug!("Ping to {ip} failed: {e}");
                None
            }
            Err(_) => {
                log::debug!("Ping to {ip} timed out after {}ms", timeout.as_millis());
                None
            }
        }
    }
}

impl Prober for IcmpProber {
    async fn probe(&self, destination: &str, timeout: Duration) -> Outcome {
        let Some(ip) = self.resolve(destination).await else {
            return Outcome::failure(timeout);
        };

        match self.echo(ip, timeout).await {
            Some((rtt, ttl)) => Outcome::success(rtt, ttl),
            None => {
                self.forget(destination);
                Outcome::failure(timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn sanitize_strips_invalid_characters() {
        assert_eq!(sanitize_hostname(" example.com "), Some("example.com".to_string()));
        assert_eq!(sanitize_hostname("ex ample;rm"), Some("examplerm".to_string()));
        assert_eq!(sanitize_hostname("!!!"), None);
    }

    #[test]
    fn sanitize_drops_port_suffix() {
        assert_eq!(sanitize_hostname("example.com:8080"), Some("example.com".to_string()));
        assert_eq!(sanitize_hostname(" router.lan:22 "), Some("router.lan".to_string()));
        assert_eq!(sanitize_hostname(":8080"), None);
    }

    #[test]
    fn payload_is_32_bytes() {
        assert_eq!(PROBE_PAYLOAD.len(), 32);
        assert!(PROBE_PAYLOAD.iter().all(|b| *b == b'a'));
    }

    #[tokio::test]
    async fn resolve_ip_literals_without_lookup() {
        assert_eq!(
            resolve_target("127.0.0.1").await,
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
        );
        assert_eq!(resolve_target("::1").await, Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }

    #[tokio::test]
    async fn unresolvable_destination_is_a_failed_outcome() {
        let prober = IcmpProber::new();
        let outcome = prober.probe("!!!", Duration::from_millis(250)).await;
        assert_eq!(outcome, Outcome::failure(Duration::from_millis(250)));
    }
}
