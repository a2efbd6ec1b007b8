//! Partitioned parallel hash join.
//!
//! The global hash table is split into [`NUM_PARTITIONS`] shards by the low
//! bits of the key hash, so shards are disjoint by key. Build workers scan
//! disjoint page ranges of the build column into thread-local shard maps and
//! fold them into the global shards under one mutex per shard. The scope
//! join at the end of the build phase is the fence: the shard mutexes are
//! dismantled and probe workers read the shards through plain shared
//! references, each appending `(probe_row, build_row)` pairs to its own
//! buffer. Buffers concatenate in worker order, which equals sequential
//! probe-row order because workers own contiguous row ranges.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Mutex;
use std::thread;

use tracing::debug;

use crate::exec::column::Column;
use crate::exec::constants::NUM_PARTITIONS;
use crate::exec::error::ReadError;
use crate::exec::hash::{FixedKey, JoinKey};
use crate::exec::join::{scan_page_keys, MatchList};
use crate::exec::page::Page;

type ShardMap<K> = HashMap<K, Vec<usize>>;

struct PageRange {
    pages: Range<usize>,
    first_row: usize,
}

/// Split a page list into up to `workers` contiguous ranges of roughly equal
/// page counts, with each range's global starting row precomputed.
fn page_ranges(pages: &[Page], workers: usize) -> Vec<PageRange> {
    let total = pages.len();
    if total == 0 {
        return Vec::new();
    }
    let per_worker = (total + workers - 1) / workers;
    let mut first_rows = Vec::with_capacity(total);
    let mut acc = 0usize;
    for page in pages {
        first_rows.push(acc);
        acc += page.num_rows() as usize;
    }
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + per_worker).min(total);
        ranges.push(PageRange {
            pages: start..end,
            first_row: first_rows[start],
        });
        start = end;
    }
    ranges
}

#[inline]
fn shard_of<K: JoinKey>(key: K) -> usize {
    (key.key_hash() as usize) & (NUM_PARTITIONS - 1)
}

/// Pin the calling thread to a core. Advisory: correctness never depends on
/// placement, so failures are ignored.
#[cfg(target_os = "linux")]
fn pin_to_core(core: usize) {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core % libc::CPU_SETSIZE as usize, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_to_core(_core: usize) {}

/// Parallel build-probe over `workers` threads per phase.
pub fn partitioned_join<K: FixedKey>(
    build: &Column,
    probe: &Column,
    workers: usize,
) -> Result<MatchList, ReadError> {
    let workers = workers.max(1);

    // Build phase: thread-local shard maps, folded into the global shards
    // under per-shard mutexes.
    let shards: Vec<Mutex<ShardMap<K>>> = (0..NUM_PARTITIONS).map(|_| Mutex::new(HashMap::new())).collect();
    let ranges = page_ranges(&build.pages, workers);
    debug!(
        build_pages = build.pages.len(),
        workers = ranges.len(),
        "partitioned build"
    );
    let results: Vec<Result<(), ReadError>> = thread::scope(|s| {
        let handles: Vec<_> = ranges
            .iter()
            .enumerate()
            .map(|(worker, range)| {
                let shards = &shards;
                let pages = &build.pages[range.pages.clone()];
                let first_row = range.first_row;
                s.spawn(move || -> Result<(), ReadError> {
                    pin_to_core(worker);
                    let mut local: Vec<ShardMap<K>> =
                        (0..NUM_PARTITIONS).map(|_| HashMap::new()).collect();
                    scan_page_keys::<K>(pages, first_row, |row, key| {
                        local[shard_of(key)].entry(key).or_default().push(row);
                    })?;
                    for (shard, map) in local.into_iter().enumerate() {
                        if map.is_empty() {
                            continue;
                        }
                        let mut global = shards[shard].lock().unwrap();
                        for (key, mut rows) in map {
                            global.entry(key).or_default().append(&mut rows);
                        }
                    }
                    Ok(())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for result in results {
        result?;
    }

    // Build fence has passed; tear the mutexes down so probe reads are
    // lock-free shared references.
    let shards: Vec<ShardMap<K>> = shards
        .into_iter()
        .map(|m| m.into_inner().unwrap())
        .collect();

    // Probe phase: one private match buffer per worker.
    let ranges = page_ranges(&probe.pages, workers);
    let buffers: Vec<Result<MatchList, ReadError>> = thread::scope(|s| {
        let handles: Vec<_> = ranges
            .iter()
            .enumerate()
            .map(|(worker, range)| {
                let shards = &shards;
                let pages = &probe.pages[range.pages.clone()];
                let first_row = range.first_row;
                s.spawn(move || -> Result<MatchList, ReadError> {
                    pin_to_core(worker);
                    let mut matches = MatchList::new();
                    scan_page_keys::<K>(pages, first_row, |row, key| {
                        if let Some(build_rows) = shards[shard_of(key)].get(&key) {
                            for &build_row in build_rows {
                                matches.push((row, build_row));
                            }
                        }
                    })?;
                    Ok(matches)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Concatenate in worker-index order.
    let mut parts = Vec::with_capacity(buffers.len());
    for buffer in buffers {
        parts.push(buffer?);
    }
    let total: usize = parts.iter().map(Vec::len).sum();
    let mut matches = MatchList::with_capacity(total);
    for mut part in parts {
        matches.append(&mut part);
    }
    debug!(matches = matches.len(), "partitioned probe");
    Ok(matches)
}
