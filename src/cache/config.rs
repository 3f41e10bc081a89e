//! Cache configuration.
//!
//! Controls the local tier, entry lifetimes, and seeding lifetimes via
//! `pubcache.toml` (`[cache]` section).

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use super::hybrid::EntryOptions;

const DEFAULT_LOCAL_CAPACITY: usize = 10_000;
const DEFAULT_EXPIRATION_SECS: u64 = 300;
const DEFAULT_LOCAL_EXPIRATION_SECS: u64 = 300;
/// Unbounded lifetimes are not supported by the tiers; a year stands in for "never".
const DEFAULT_SEED_EXPIRATION_DAYS: u64 = 365;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Keep an in-process tier in front of the distributed tier.
    pub enable_local_tier: bool,
    /// Maximum entries held by the local tier before LRU eviction.
    pub local_capacity: usize,
    /// Distributed-tier lifetime of populated and refreshed entries.
    pub default_expiration_secs: u64,
    /// Local-tier lifetime of populated and refreshed entries.
    pub local_expiration_secs: u64,
    /// Lifetime of seeded entries on both tiers.
    pub seed_expiration_days: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_local_tier: true,
            local_capacity: DEFAULT_LOCAL_CAPACITY,
            default_expiration_secs: DEFAULT_EXPIRATION_SECS,
            local_expiration_secs: DEFAULT_LOCAL_EXPIRATION_SECS,
            seed_expiration_days: DEFAULT_SEED_EXPIRATION_DAYS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_local_tier: settings.enable_local_tier,
            local_capacity: settings.local_capacity.get(),
            default_expiration_secs: settings.default_expiration.as_secs(),
            local_expiration_secs: settings.local_expiration.as_secs(),
            seed_expiration_days: settings.seed_expiration_days.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the local capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn local_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.local_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Lifetimes applied to ordinary writes and populations.
    pub fn default_entry_options(&self) -> EntryOptions {
        EntryOptions {
            expiration: Duration::from_secs(self.default_expiration_secs),
            local_expiration: Duration::from_secs(self.local_expiration_secs),
        }
    }

    /// Effectively pinned lifetimes applied to seeded entries.
    pub fn seed_entry_options(&self) -> EntryOptions {
        let lifetime =
            Duration::from_secs(self.seed_expiration_days.saturating_mul(SECONDS_PER_DAY));
        EntryOptions {
            expiration: lifetime,
            local_expiration: lifetime,
        }
    }
}
