//! Bloom filter with pluggable bit array storage.
//!
//! A Bloom filter answers "have I seen this value?" in constant space, with
//! no false negatives and a tunable false positive rate.
//!
//! HowTo:
//!    * Sizing: for `n` expected insertions and target false positive rate
//!      `p`, the filter uses `m = -n ln(p) / (ln 2)^2` bits and
//!      `k = round(m / n * ln 2)` bit positions per value.
//!    * Decomposition: a value is turned into bytes by a decomposer
//!      (its `Display` text by default, or a custom byte layout).
//!    * Hashing: the bytes are hashed once into a 64-bit seed (MurmurHash3
//!      by default) and the `k` positions are derived by double hashing:
//!      `h1 + i * h2` over the two 32-bit halves of the seed.
//!
//! Storage:
//!     * `InMemoryBitArray`: packed words on the heap.
//!     * `FileBackedBitArray`: a plain file, one disk round trip per bit.
//!     * `MmapBitArray`: the same file layout, memory-mapped.
//!
//! Disk-backed filters survive restarts: reopen the same file with the same
//! `n` and `p` and the filter comes back with its contents.
//!
//! ```no_run
//! use backed_bloom_rs::{
//!     BitArrayBackend, BloomFilter, BloomFilterConfigBuilder, BloomFilterOps,
//! };
//!
//! let config = BloomFilterConfigBuilder::default()
//!     .expected_insertions(10_000)
//!     .false_positive_probability(0.01)
//!     .backend(BitArrayBackend::MemoryMapped("seen.bits".into()))
//!     .build()
//!     .unwrap();
//!
//! let mut filter = BloomFilter::<str>::new(config).unwrap();
//! filter.add("hello").unwrap();
//! assert!(filter.contains("hello").unwrap());
//! filter.close().unwrap();
//! ```

pub mod bitarray;
mod bloom_filter;
pub mod charset;
pub mod common;
pub mod decompose;
mod error;
mod filter;
pub mod hash;

pub use bitarray::{
    BitArray, BitArrayBackend, FileBackedBitArray, InMemoryBitArray,
    MmapBitArray, backing_file_len, create_bit_array,
};
pub use bloom_filter::BloomFilter;
pub use charset::Charset;
pub use decompose::{
    ByteSink, Decomposable, Decomposer, DefaultDecomposer, SelfDecomposer,
};
pub use error::{BloomError, Result};
pub use filter::{
    BloomFilterConfig, BloomFilterConfigBuilder, BloomFilterConfigBuilderError,
    BloomFilterOps, BloomFilterStats, BulkBloomFilterOps,
};
pub use hash::{
    Crc32HashFunction, FnvHashFunction, HashFunction, Murmur3HashFunction,
    false_positive_probability, optimal_bit_vector_size, optimal_num_hashes,
};
