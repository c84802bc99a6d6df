//! Worker sizing and round-robin sharding

use std::num::NonZeroUsize;

/// Logical processors available to this process
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Clamp a requested worker count to `available`
///
/// Unspecified, zero or too large requests use every available processor.
pub fn resolve_worker_count(requested: Option<usize>, available: usize) -> usize {
    let available = available.max(1);
    match requested {
        Some(n) if n >= 1 && n <= available => n,
        _ => available,
    }
}

/// Deal `items` to `shards` buckets: item i goes to bucket i mod shards
///
/// Always returns exactly `max(shards, 1)` buckets; trailing buckets are
/// empty when there are fewer items than buckets.
pub fn round_robin<T>(items: Vec<T>, shards: usize) -> Vec<Vec<T>> {
    let shards = shards.max(1);
    let per_shard = items.len().div_ceil(shards);
    let mut buckets: Vec<Vec<T>> = (0..shards).map(|_| Vec::with_capacity(per_shard)).collect();
    for (i, item) in items.into_iter().enumerate() {
        buckets[i % shards].push(item);
    }
    buckets
}
