//! DNS resolution checks
//!
//! Resolution is independent of HTTP reachability: a domain passes when it
//! resolves to at least one address within the lookup timeout.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Capability to check whether a domain resolves
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolves(&self, domain: &str) -> bool;
}

/// Resolver backed by the system resolver through tokio
///
/// Answers, positive and negative, are cached for the configured TTL.
pub struct TokioDnsResolver {
    timeout: Duration,
    ttl: Duration,
    cache: Mutex<HashMap<String, (bool, Instant)>>,
}

impl TokioDnsResolver {
    pub fn new(timeout: Duration, ttl: Duration) -> Self {
        Self {
            timeout,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, domain: &str) -> Option<bool> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(domain)
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(resolves, _)| *resolves)
    }

    fn remember(&self, domain: &str, resolves: bool) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(domain.to_string(), (resolves, Instant::now()));
    }

    /// Entries currently held, expired or not
    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl DnsResolver for TokioDnsResolver {
    async fn resolves(&self, domain: &str) -> bool {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        if domain.is_empty() {
            return false;
        }
        if let Some(hit) = self.cached(&domain) {
            return hit;
        }

        let lookup = tokio::net::lookup_host((domain.as_str(), 443));
        let resolves = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(e)) => {
                tracing::debug!("DNS lookup for {} failed: {}", domain, e);
                false
            }
            Err(_) => {
                tracing::debug!("DNS lookup for {} timed out after {:?}", domain, self.timeout);
                false
            }
        };

        self.remember(&domain, resolves);
        resolves
    }
}

/// Resolver with a fixed answer set, for offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    known: HashSet<String>,
    resolve_all: bool,
}

impl StaticResolver {
    /// Resolves exactly the given domains
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            known: domains
                .into_iter()
                .map(|d| d.as_ref().to_lowercase())
                .collect(),
            resolve_all: false,
        }
    }

    /// Resolves every domain
    pub fn all() -> Self {
        Self {
            known: HashSet::new(),
            resolve_all: true,
        }
    }
}

#[async_trait]
impl DnsResolver for StaticResolver {
    async fn resolves(&self, domain: &str) -> bool {
        self.resolve_all || self.known.contains(&domain.to_lowercase())
    }
}
