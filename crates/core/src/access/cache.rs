//! Short-lived cache of entitlement answers.
//!
//! Entries are keyed by `(company, permission)` and expire after a fixed TTL.
//! Mutations go through [`EntitlementCache::invalidate`] and friends, which bump
//! a generation counter before dropping entries. A reader that fetched from the
//! store under an older generation never writes its answer back, so a grant or
//! revoke cannot be shadowed by a refill that raced with it.

use crate::types::CompanyId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntitlementKey {
    pub company_id: CompanyId,
    pub permission: String,
}

impl EntitlementKey {
    pub fn new(company_id: CompanyId, permission: impl Into<String>) -> Self {
        Self {
            company_id,
            permission: permission.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedEntitlement {
    allowed: bool,
    expires_at: Instant,
}

pub struct EntitlementCache {
    entries: DashMap<EntitlementKey, CachedEntitlement>,
    ttl: Duration,
    generation: AtomicU64,
}

impl EntitlementCache {
    /// Upper bound on how long an answer may be served after a missed invalidation
    pub const MAX_TTL: Duration = Duration::from_secs(3600);

    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: ttl.min(Self::MAX_TTL),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached answer for `key`, if present and not expired
    pub fn lookup(&self, key: &EntitlementKey) -> Option<bool> {
        let now = Instant::now();
        let hit = self.entries.get(key).map(|entry| *entry.value())?;

        if hit.expires_at > now {
            return Some(hit.allowed);
        }

        self.entries.remove_if(key, |_, cached| cached.expires_at <= now);
        None
    }

    /// Generation to hand back to [`remember`](Self::remember) after a store read
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store `allowed` unless an invalidation happened since `observed`.
    ///
    /// The generation is compared while the entry's shard lock is held, so an
    /// invalidation either lands before the comparison (and the write is
    /// skipped) or after the insert (and removes it).
    pub(crate) fn remember(&self, key: EntitlementKey, allowed: bool, observed: u64) -> bool {
        let entry = self.entries.entry(key);
        if self.generation.load(Ordering::SeqCst) != observed {
            return false;
        }

        entry.insert(CachedEntitlement {
            allowed,
            expires_at: Instant::now() + self.ttl,
        });
        true
    }

    pub fn invalidate(&self, key: &EntitlementKey) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(key);
    }

    pub fn invalidate_company(&self, company_id: CompanyId) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.retain(|key, _| key.company_id != company_id);
    }

    pub fn invalidate_permission(&self, permission: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.retain(|key, _| key.permission != permission);
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }
}

impl Default for EntitlementCache {
    fn default() -> Self {
        Self::new(Self::MAX_TTL)
    }
}
