//! Unchained hash table: a single-probe directory with packed per-slot Bloom
//! filters, specialized for join builds.
//!
//! Loosely follows "Simple, Efficient and Robust Hash Tables for Join
//! Processing" (DaMoN 2024). The directory holds `DIR_SIZE` slots plus one
//! sentinel; each slot is a 64-bit word packing a 48-bit offset into a
//! contiguous tuple-storage array with a 16-bit Bloom filter in the high
//! bits. A slot's entries are contiguous in storage, so a probe reads two
//! directory words, tests the filter, and scans one range. The table is
//! one-shot: built once, probed any number of times, never resized.

use crate::exec::constants::{DIR_SIZE, POINTER_BITS, POINTER_MASK};
use crate::exec::hash::{slot_of, tag_mask, JoinKey};

/// Pack a tuple-storage offset and a slot filter into one directory word.
#[inline]
fn pack(offset: u64, filter: u16) -> u64 {
    debug_assert!(offset <= POINTER_MASK);
    ((filter as u64) << POINTER_BITS) | offset
}

#[inline]
fn unpack_offset(word: u64) -> usize {
    (word & POINTER_MASK) as usize
}

/// Probe hit-possibility test against a slot's aggregated filter.
#[inline]
fn could_contain(word: u64, probe_hash: u64) -> bool {
    let filter = (word >> POINTER_BITS) as u16;
    tag_mask(probe_hash) & !filter == 0
}

/// A read-only hash structure over a materialized build-side key column.
///
/// The table stores `(full_hash, row_index)` pairs and keeps a reference to
/// the key column itself: probes confirm key equality after the stored-hash
/// comparison, so hash collisions never surface as false matches.
pub struct UnchainedTable<'a, K: JoinKey> {
    directory: Vec<u64>,
    storage: Vec<(u64, u64)>,
    keys: &'a [Option<K>],
    len: usize,
}

impl<'a, K: JoinKey> UnchainedTable<'a, K> {
    /// Build from a key column; `keys[row]` is the join key of build row
    /// `row`, `None` for NULL. NULL keys never enter the table.
    pub fn build(keys: &'a [Option<K>]) -> Self {
        // Stage 1: per-slot counts and provisional filters, one hash per row.
        let mut counts = vec![0u64; DIR_SIZE];
        let mut filters = vec![0u16; DIR_SIZE];
        let mut hashes: Vec<Option<u64>> = Vec::with_capacity(keys.len());
        let mut len = 0usize;
        for key in keys {
            match key {
                Some(k) => {
                    let hash = k.key_hash();
                    let slot = slot_of(hash);
                    counts[slot] += 1;
                    filters[slot] |= tag_mask(hash);
                    len += 1;
                    hashes.push(Some(hash));
                }
                None => hashes.push(None),
            }
        }

        // Stage 2: prefix-sum the counts into packed directory words. The
        // sentinel bounds the last slot's range.
        let mut directory = vec![0u64; DIR_SIZE + 1];
        let mut offset = 0u64;
        for slot in 0..DIR_SIZE {
            directory[slot] = pack(offset, filters[slot]);
            offset += counts[slot];
        }
        directory[DIR_SIZE] = pack(offset, 0);

        // Stage 3: place each (hash, row) pair at its slot's next free
        // offset. Entries of one slot are contiguous but unordered.
        let mut next: Vec<usize> = directory[..DIR_SIZE].iter().map(|&w| unpack_offset(w)).collect();
        let mut storage = vec![(0u64, 0u64); len];
        for (row, hash) in hashes.iter().enumerate() {
            if let Some(hash) = *hash {
                let slot = slot_of(hash);
                storage[next[slot]] = (hash, row as u64);
                next[slot] += 1;
            }
        }

        UnchainedTable {
            directory,
            storage,
            keys,
            len,
        }
    }

    /// Number of non-null keys in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append every build row whose key equals `key` to `out`.
    pub fn probe(&self, key: K, out: &mut Vec<usize>) {
        if self.len == 0 {
            return;
        }
        let hash = key.key_hash();
        let slot = slot_of(hash);
        let word = self.directory[slot];
        if !could_contain(word, hash) {
            return;
        }
        let start = unpack_offset(word);
        let end = unpack_offset(self.directory[slot + 1]);
        for &(stored_hash, row) in &self.storage[start..end] {
            if stored_hash == hash && self.keys[row as usize] == Some(key) {
                out.push(row as usize);
            }
        }
    }

    #[cfg(test)]
    fn sentinel_offset(&self) -> usize {
        unpack_offset(self.directory[DIR_SIZE])
    }
}
