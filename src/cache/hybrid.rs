//! Two-tier cache with request coalescing.
//!
//! Reads go local tier, then distributed tier, then the caller's population
//! future. Concurrent misses on one key share a single population; the
//! population runs as its own task so a caller that goes away does not cancel
//! it for the others.
//!
//! An explicit `set`/`remove` on a key with a running population bumps that
//! flight's write count. A population whose count moved does not keep its
//! result in the tiers, so an older load never overwrites a newer write. The
//! count lives on the flight and goes away with it.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::{counter, histogram};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::distributed::DistributedCache;
use super::error::CacheError;
use super::local::LocalTier;

/// Lifetimes of one write on each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
    pub expiration: Duration,
    pub local_expiration: Duration,
}

/// Values the hybrid cache can hold.
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

pub type Population<T> = Result<Option<T>, CacheError>;

type FlightFuture<T> = Shared<BoxFuture<'static, Population<T>>>;

struct Flight<T> {
    id: u64,
    writes: Arc<AtomicU64>,
    future: FlightFuture<T>,
}

struct Tiers<T> {
    name: &'static str,
    local: Option<LocalTier<T>>,
    distributed: Arc<dyn DistributedCache>,
    default_options: EntryOptions,
    in_flight: DashMap<String, Flight<T>>,
    flight_counter: AtomicU64,
}

pub struct HybridCache<T> {
    tiers: Arc<Tiers<T>>,
}

impl<T> Clone for HybridCache<T> {
    fn clone(&self) -> Self {
        Self {
            tiers: Arc::clone(&self.tiers),
        }
    }
}

impl<T: Cacheable> HybridCache<T> {
    /// `name` labels this cache's metrics and log lines.
    pub fn new(
        name: &'static str,
        config: &CacheConfig,
        distributed: Arc<dyn DistributedCache>,
    ) -> Self {
        let local = config
            .enable_local_tier
            .then(|| LocalTier::new(config.local_capacity_non_zero()));
        Self {
            tiers: Arc::new(Tiers {
                name,
                local,
                distributed,
                default_options: config.default_entry_options(),
                in_flight: DashMap::new(),
                flight_counter: AtomicU64::new(0),
            }),
        }
    }

    pub fn default_options(&self) -> EntryOptions {
        self.tiers.default_options
    }

    /// Returns the cached value or runs `populate` at most once across
    /// concurrent callers for `key`. A population yielding `None` is not cached.
    pub async fn get_or_create<F, Fut>(&self, key: &str, populate: F) -> Population<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Population<T>> + Send + 'static,
    {
        if let Some(value) = self.tiers.local_get(key) {
            counter!("published_cache_local_hit_total", "cache" => self.tiers.name).increment(1);
            return Ok(Some(value));
        }
        self.join_or_start(key, populate).await
    }

    /// Writes `value` to both tiers.
    pub async fn set(&self, key: &str, value: &T, options: EntryOptions) -> Result<(), CacheError> {
        self.tiers.mark_written(key);
        let result = self.tiers.write(key, value, options).await;
        self.tiers.mark_written(key);
        result
    }

    /// Removes `key` from both tiers. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.tiers.mark_written(key);
        let result = self.tiers.evict(key).await;
        self.tiers.mark_written(key);
        result
    }

    /// Number of populations currently running.
    pub fn in_flight_len(&self) -> usize {
        self.tiers.in_flight.len()
    }

    pub fn local_len(&self) -> usize {
        self.tiers.local.as_ref().map_or(0, LocalTier::len)
    }

    fn join_or_start<F, Fut>(&self, key: &str, populate: F) -> FlightFuture<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Population<T>> + Send + 'static,
    {
        match self.tiers.in_flight.entry(key.to_string()) {
            Entry::Occupied(flight) => {
                counter!("published_cache_coalesced_total", "cache" => self.tiers.name)
                    .increment(1);
                flight.get().future.clone()
            }
            Entry::Vacant(slot) => {
                let id = self.tiers.flight_counter.fetch_add(1, Ordering::Relaxed);
                let writes = Arc::new(AtomicU64::new(0));
                let guard = FlightGuard {
                    tiers: Arc::clone(&self.tiers),
                    key: key.to_string(),
                    id,
                };
                let task = {
                    let writes = Arc::clone(&writes);
                    tokio::spawn(async move {
                        let tiers = Arc::clone(&guard.tiers);
                        tiers.run_flight(&guard.key, &writes, populate).await
                    })
                };

                let aborted_key = key.to_string();
                let future = async move {
                    task.await.unwrap_or_else(|error| {
                        warn!(key = %aborted_key, %error, "Cache population task aborted");
                        Err(CacheError::Aborted { key: aborted_key })
                    })
                }
                .boxed()
                .shared();

                slot.insert(Flight {
                    id,
                    writes,
                    future: future.clone(),
                });
                future
            }
        }
    }
}

/// Unregisters a flight when its task ends, including by panic.
struct FlightGuard<T> {
    tiers: Arc<Tiers<T>>,
    key: String,
    id: u64,
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        let id = self.id;
        self.tiers
            .in_flight
            .remove_if(&self.key, |_, flight| flight.id == id);
    }
}

impl<T: Cacheable> Tiers<T> {
    fn local_get(&self, key: &str) -> Option<T> {
        self.local.as_ref().and_then(|local| local.get(key))
    }

    /// Keys without a running population need no bookkeeping.
    fn mark_written(&self, key: &str) {
        if let Some(flight) = self.in_flight.get(key) {
            flight.writes.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn write(&self, key: &str, value: &T, options: EntryOptions) -> Result<(), CacheError> {
        let payload = serde_json::to_vec(value).map_err(|err| CacheError::Encode {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        if let Some(local) = &self.local
            && let Some(evicted) =
                local.set(key.to_string(), value.clone(), options.local_expiration)
        {
            counter!("published_cache_local_evict_total", "cache" => self.name).increment(1);
            debug!(cache = self.name, %evicted, "Local tier evicted entry");
        }
        self.distributed
            .set(key, Bytes::from(payload), options.expiration)
            .await
    }

    async fn evict(&self, key: &str) -> Result<(), CacheError> {
        if let Some(local) = &self.local {
            local.remove(key);
        }
        self.distributed.remove(key).await
    }

    async fn distributed_get(&self, key: &str) -> Option<T> {
        let payload = match self.distributed.get(key).await {
            Ok(payload) => payload?,
            Err(error) => {
                warn!(cache = self.name, key, %error, "Distributed tier read failed; treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&payload) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(cache = self.name, key, %error, "Undecodable distributed entry; treating as miss");
                None
            }
        }
    }

    async fn run_flight<F, Fut>(
        &self,
        key: &str,
        writes: &AtomicU64,
        populate: F,
    ) -> Population<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Population<T>> + Send + 'static,
    {
        let superseded = || writes.load(Ordering::SeqCst) != 0;

        if let Some(value) = self.distributed_get(key).await {
            counter!("published_cache_distributed_hit_total", "cache" => self.name).increment(1);
            if let Some(local) = &self.local
                && !superseded()
            {
                local.set(
                    key.to_string(),
                    value.clone(),
                    self.default_options.local_expiration,
                );
            }
            return Ok(Some(value));
        }

        counter!("published_cache_miss_total", "cache" => self.name).increment(1);
        let started = Instant::now();
        let populated = populate().await;
        histogram!("published_cache_populate_ms", "cache" => self.name)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let Some(value) = populated? else {
            debug!(cache = self.name, key, "Population produced no value; nothing cached");
            return Ok(None);
        };

        if superseded() {
            debug!(cache = self.name, key, "Key written during population; result not cached");
            return Ok(Some(value));
        }
        if let Err(error) = self.write(key, &value, self.default_options).await {
            warn!(cache = self.name, key, %error, "Failed to store populated entry");
            return Ok(Some(value));
        }
        if superseded() {
            debug!(cache = self.name, key, "Key written while storing population; evicting");
            if let Err(error) = self.evict(key).await {
                warn!(cache = self.name, key, %error, "Failed to evict superseded entry");
            }
        }
        Ok(Some(value))
    }
}
