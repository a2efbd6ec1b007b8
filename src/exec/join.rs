//! Single-threaded hash-join build/probe over columnar join columns.
//!
//! Both variants scan the join columns page by page, numbering rows globally
//! across pages in declaration order and skipping NULL keys on either side.
//! Matches come out as `(probe_row, build_row)` pairs in probe-scan order;
//! [`orient`] normalizes them to `(left_row, right_row)` for
//! materialization.

use std::collections::HashMap;

use crate::exec::column::Column;
use crate::exec::constants::PAGE_SIZE;
use crate::exec::error::ReadError;
use crate::exec::hash::FixedKey;
use crate::exec::page::Page;
use crate::exec::unchained::UnchainedTable;
use crate::util::bitmap;

/// `(probe_row, build_row)` pairs, or `(left_row, right_row)` once oriented.
pub type MatchList = Vec<(usize, usize)>;

/// Scan a fixed-width key column's pages, calling `f(row, key)` for every
/// non-null key. `first_row` is the global index of the first logical row in
/// `pages`.
pub(crate) fn scan_page_keys<K: FixedKey>(
    pages: &[Page],
    first_row: usize,
    mut f: impl FnMut(usize, K),
) -> Result<(), ReadError> {
    let mut row = first_row;
    for page in pages {
        let num_rows = page.num_rows() as usize;
        if num_rows == 0 {
            continue;
        }
        let bm_len = bitmap::len_for(num_rows);
        let bytes = page.bytes();
        let bits = &bytes[PAGE_SIZE - bm_len..];
        let num_nonnull = bitmap::count_ones(bits, num_rows);
        if K::DATA_OFFSET + num_nonnull * K::WIDTH + bm_len > PAGE_SIZE {
            return Err(ReadError::MalformedPage("fixed-width payload overflows page"));
        }
        let mut value_idx = 0usize;
        for i in 0..num_rows {
            if bitmap::get(bits, i) {
                let at = K::DATA_OFFSET + value_idx * K::WIDTH;
                f(row, K::load_key(&bytes[at..at + K::WIDTH]));
                value_idx += 1;
            }
            row += 1;
        }
    }
    Ok(())
}

/// Hash join with a chaining map: key → list of build rows.
pub fn simple_join<K: FixedKey>(build: &Column, probe: &Column) -> Result<MatchList, ReadError> {
    let mut table: HashMap<K, Vec<usize>> = HashMap::new();
    scan_page_keys::<K>(&build.pages, 0, |row, key| {
        table.entry(key).or_default().push(row);
    })?;

    let mut matches = MatchList::new();
    scan_page_keys::<K>(&probe.pages, 0, |row, key| {
        if let Some(build_rows) = table.get(&key) {
            for &build_row in build_rows {
                matches.push((row, build_row));
            }
        }
    })?;
    Ok(matches)
}

/// Hash join through the unchained table of [`crate::exec::unchained`].
///
/// The build keys are materialized first so the table can re-verify key
/// equality on probe hits. `build_rows` is the build table's row count.
pub fn unchained_join<K: FixedKey>(
    build: &Column,
    probe: &Column,
    build_rows: usize,
) -> Result<MatchList, ReadError> {
    let mut keys: Vec<Option<K>> = vec![None; build_rows];
    scan_page_keys::<K>(&build.pages, 0, |row, key| {
        keys[row] = Some(key);
    })?;
    let table = UnchainedTable::build(&keys);

    let mut matches = MatchList::new();
    let mut hits = Vec::new();
    scan_page_keys::<K>(&probe.pages, 0, |row, key| {
        hits.clear();
        table.probe(key, &mut hits);
        for &build_row in &hits {
            matches.push((row, build_row));
        }
    })?;
    Ok(matches)
}

/// Normalize `(probe_row, build_row)` pairs to `(left_row, right_row)`.
///
/// With `build_left` the probe side is the right child, so the pairs swap;
/// either way the output order depends only on probe-side row order within
/// equal-key groups.
pub fn orient(matches: MatchList, build_left: bool) -> MatchList {
    if build_left {
        matches
            .into_iter()
            .map(|(probe_row, build_row)| (build_row, probe_row))
            .collect()
    } else {
        matches
    }
}
