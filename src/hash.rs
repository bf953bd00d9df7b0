use crate::error::{BloomError, Result};
use fnv::FnvHasher;
use murmur3::{murmur3_32, murmur3_x64_128};
use std::fmt::Debug;
use std::hash::Hasher;
use std::io::Cursor;

/// A hashing algorithm the Bloom filter can be driven by.
///
/// Algorithms come in two flavours, told apart by [`is_single_valued`]:
///
/// - single-valued functions produce one 64-bit word via [`hash`],
/// - multi-valued functions produce two or more 64-bit words via
///   [`hash_multiple`].
///
/// The filter only ever needs one 64-bit seed per item. For a multi-valued
/// function that seed is the first word of [`hash_multiple`], so a
/// multi-valued implementation must return at least two words.
///
/// [`is_single_valued`]: HashFunction::is_single_valued
/// [`hash`]: HashFunction::hash
/// [`hash_multiple`]: HashFunction::hash_multiple
pub trait HashFunction: Debug + Send + Sync {
    /// Whether [`HashFunction::hash`] is the primary output of this function.
    fn is_single_valued(&self) -> bool;

    /// Hash the bytes into a single 64-bit value.
    fn hash(&self, bytes: &[u8]) -> Result<u64>;

    /// Hash the bytes into several 64-bit words.
    ///
    /// Single-valued functions are never asked for this by the filter; the
    /// default returns the single word.
    fn hash_multiple(&self, bytes: &[u8]) -> Result<Vec<u64>> {
        Ok(vec![self.hash(bytes)?])
    }
}

const MURMUR3_SEED: u32 = 0x7f3a_21ea;

/// MurmurHash3, the default hash function.
///
/// Multi-valued: `hash_multiple` returns the 128-bit x64 variant split into
/// two words (low word first); `hash` is the 32-bit x86 variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct Murmur3HashFunction;

impl HashFunction for Murmur3HashFunction {
    fn is_single_valued(&self) -> bool {
        false
    }

    fn hash(&self, bytes: &[u8]) -> Result<u64> {
        let mut cursor = Cursor::new(bytes);
        Ok(murmur3_32(&mut cursor, MURMUR3_SEED)? as u64)
    }

    fn hash_multiple(&self, bytes: &[u8]) -> Result<Vec<u64>> {
        let mut cursor = Cursor::new(bytes);
        let wide = murmur3_x64_128(&mut cursor, MURMUR3_SEED)?;
        Ok(vec![wide as u64, (wide >> 64) as u64])
    }
}

/// CRC-32 checksum used as a (weak) single-valued hash.
///
/// The upper 32 bits of the result are always zero, which collapses the
/// double-hashing stride to zero; prefer it only where compatibility with
/// CRC-keyed data matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32HashFunction;

impl HashFunction for Crc32HashFunction {
    fn is_single_valued(&self) -> bool {
        true
    }

    fn hash(&self, bytes: &[u8]) -> Result<u64> {
        Ok(crc32fast::hash(bytes) as u64)
    }
}

/// 64-bit FNV-1a, single-valued.
#[derive(Debug, Clone, Copy, Default)]
pub struct FnvHashFunction;

impl HashFunction for FnvHashFunction {
    fn is_single_valued(&self) -> bool {
        true
    }

    fn hash(&self, bytes: &[u8]) -> Result<u64> {
        let mut hasher = FnvHasher::default();
        hasher.write(bytes);
        Ok(hasher.finish())
    }
}

/// Extract the 64-bit seed the index generator works from.
pub fn seed_hash(hasher: &dyn HashFunction, bytes: &[u8]) -> Result<u64> {
    if hasher.is_single_valued() {
        return hasher.hash(bytes);
    }

    let words = hasher.hash_multiple(bytes)?;
    if words.len() < 2 {
        return Err(BloomError::InvalidArgument(format!(
            "multi-valued hash function {hasher:?} returned {} word(s), expected at least 2",
            words.len()
        )));
    }
    Ok(words[0])
}

/// The `k` bit positions derived from one 64-bit hash (Kirsch-Mitzenmacher).
///
/// The hash is split into `h1` (low 32 bits) and `h2` (high 32 bits) and for
/// `i` in `1..=k` the candidate `h1 + i * h2` is computed with 32-bit signed
/// wrap-around. Negative candidates are replaced by their bitwise complement,
/// then reduced modulo the bit count.
#[derive(Debug, Clone)]
pub struct DoubleHashIndices {
    h1: i32,
    h2: i32,
    next: u32,
    num_hashes: u32,
    num_bits: usize,
}

impl DoubleHashIndices {
    pub fn new(hash64: u64, num_hashes: usize, num_bits: usize) -> Self {
        assert!(num_bits > 0, "bit array must hold at least one bit");
        Self {
            h1: hash64 as i32,
            h2: (hash64 >> 32) as i32,
            next: 1,
            num_hashes: num_hashes as u32,
            num_bits,
        }
    }
}

impl Iterator for DoubleHashIndices {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next > self.num_hashes {
            return None;
        }

        let mut candidate =
            self.h1.wrapping_add((self.next as i32).wrapping_mul(self.h2));
        if candidate < 0 {
            candidate = !candidate;
        }
        self.next += 1;

        Some(candidate as usize % self.num_bits)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.num_hashes + 1).saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DoubleHashIndices {}

/// Optimal bit count `m` for `n` insertions at false-positive rate `p`.
///
/// The fractional part is truncated, not rounded up, so sizes line up with
/// filters built by earlier releases. The result lies in `1..=i32::MAX`:
/// [`DoubleHashIndices`] never yields an index above `i32::MAX`, so bits
/// beyond it could never be set.
pub fn optimal_bit_vector_size(n: usize, fpr: f64) -> usize {
    let ln2 = std::f64::consts::LN_2;
    let bits = (-(n as f64) * fpr.ln()) / (ln2 * ln2);
    (bits as usize).clamp(1, MAX_BIT_VECTOR_SIZE)
}

/// Largest bit count double hashing can address.
pub const MAX_BIT_VECTOR_SIZE: usize = i32::MAX as usize;

/// Optimal number of hash positions `k` for `n` insertions into `m` bits.
pub fn optimal_num_hashes(n: usize, m: usize) -> usize {
    let k = ((m as f64 / n as f64) * std::f64::consts::LN_2).round() as usize;
    k.max(1)
}

/// Expected false-positive probability after `inserted` insertions:
/// `(1 - e^(-k * inserted / m))^k`.
pub fn false_positive_probability(
    num_hashes: usize,
    num_bits: usize,
    inserted: usize,
) -> f64 {
    let k = num_hashes as f64;
    let exponent = -k * inserted as f64 / num_bits as f64;
    (1.0 - exponent.exp()).powf(k)
}
