//! Columnar page format and hash directory constants.
//!
//! Page layouts are little-endian throughout. Every page starts with a 2-byte
//! logical row count; the two highest values of that field are reserved as
//! markers for the multi-page string encoding.

// ── Page geometry ───────────────────────────────────────────────────

/// Size of every column page in bytes. Compile-time constant; changing it
/// invalidates previously encoded pages.
pub const PAGE_SIZE: usize = 4096;

/// Offset of the logical row count field. 2 bytes.
pub const PAGE_NUM_ROWS: usize = 0;

/// Payload offset for 4-byte values. Keeps values 4-byte aligned.
pub const DATA_OFFSET_4: usize = 4;
/// Payload offset for 8-byte values. Keeps values 8-byte aligned.
pub const DATA_OFFSET_8: usize = 8;

// ── Variable-length string pages ────────────────────────────────────

/// Row-count marker for a page holding the start of a long string.
/// Bytes [2, 4) hold the char count, bytes [4, 4 + count) the chars.
/// Contributes exactly one logical (non-null) row.
pub const LONG_STRING_START: u16 = 0xFFFF;
/// Row-count marker for a page continuing the previous page's long string.
/// Same layout as a start page; contributes no logical rows.
pub const LONG_STRING_CONT: u16 = 0xFFFE;

/// Chars a long-string page can carry after its 4-byte header.
pub const LONG_STRING_CAPACITY: usize = PAGE_SIZE - 4;

/// Longest string a short-string batch page can inline: a fresh page must
/// also hold the 4-byte header, one 2-byte end offset, and one bitmap byte.
pub const MAX_INLINE_STRING: usize = PAGE_SIZE - 7;

// ── Unchained hash table directory ──────────────────────────────────

/// log2 of the directory slot count.
pub const DIR_LOG2: u32 = 14;
/// Directory slot count. One extra sentinel slot is allocated past this.
pub const DIR_SIZE: usize = 1 << DIR_LOG2;
/// Low bits of a directory word holding the tuple-storage offset.
pub const POINTER_BITS: u32 = 48;
/// High bits of a directory word holding the slot's Bloom filter.
pub const FILTER_BITS: u32 = 16;
/// Mask for the offset field of a directory word.
pub const POINTER_MASK: u64 = (1 << POINTER_BITS) - 1;
/// A hash's directory slot is its top `DIR_LOG2` bits.
pub const HASH_TO_SLOT_SHIFT: u32 = 64 - DIR_LOG2;

// ── Partitioned join ────────────────────────────────────────────────

/// Shard count of the partitioned join's global hash table. A key's shard is
/// the low `log2(NUM_PARTITIONS)` bits of its hash. Must be a power of two.
pub const NUM_PARTITIONS: usize = 32;
