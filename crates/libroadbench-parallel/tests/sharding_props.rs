//! Property tests for worker sizing and round-robin sharding

use libroadbench_parallel::{resolve_worker_count, round_robin};
use proptest::prelude::*;

proptest! {
    #[test]
    fn every_item_lands_in_exactly_one_shard(len in 0usize..200, shards in 1usize..32) {
        let buckets = round_robin((0..len).collect::<Vec<_>>(), shards);
        prop_assert_eq!(buckets.len(), shards);

        let mut seen: Vec<usize> = buckets.iter().flatten().copied().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..len).collect::<Vec<_>>());

        for (worker, bucket) in buckets.iter().enumerate() {
            prop_assert!(bucket.iter().all(|i| i % shards == worker));
            prop_assert!(bucket.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn shard_sizes_differ_by_at_most_one(len in 0usize..200, shards in 1usize..32) {
        let sizes: Vec<usize> = round_robin(vec![(); len], shards).iter().map(Vec::len).collect();
        let max = sizes.iter().copied().max().unwrap_or(0);
        let min = sizes.iter().copied().min().unwrap_or(0);
        prop_assert!(max - min <= 1);
        prop_assert_eq!(sizes.iter().sum::<usize>(), len);
    }

    #[test]
    fn worker_count_stays_within_available(requested in proptest::option::of(0usize..512), available in 1usize..128) {
        let n = resolve_worker_count(requested, available);
        prop_assert!(n >= 1 && n <= available);
        match requested {
            Some(r) if r >= 1 && r <= available => prop_assert_eq!(n, r),
            _ => prop_assert_eq!(n, available),
        }
    }
}
