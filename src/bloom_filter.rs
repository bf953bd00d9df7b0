use crate::bitarray::{BitArray, create_bit_array};
use crate::charset::Charset;
use crate::decompose::{
    ByteSink, Decomposable, Decomposer, DefaultDecomposer, SelfDecomposer,
};
use crate::error::{BloomError, Result};
use crate::filter::{
    BloomFilterConfig, BloomFilterOps, BloomFilterStats, BulkBloomFilterOps,
};
use crate::hash::{
    self, DoubleHashIndices, HashFunction, optimal_bit_vector_size,
    optimal_num_hashes, seed_hash,
};
use std::fmt::{self, Display};
use std::sync::Arc;
use tracing::debug;

/// A Bloom filter over values of type `T`.
///
/// Values are turned into bytes by a [`Decomposer`], hashed once into a
/// 64-bit seed, and mapped onto `k` positions of a bit array of `m` bits by
/// double hashing. The bit array can live in memory, in a plain file or in
/// a memory-mapped file; see [`crate::bitarray`].
///
/// `contains` returning `false` is a guarantee of absence, `true` only
/// means "probably present".
///
/// Not synchronised: wrap the filter in a lock to share it between threads.
pub struct BloomFilter<T: ?Sized> {
    bits: Box<dyn BitArray>,
    hasher: Arc<dyn HashFunction>,
    decomposer: Box<dyn Decomposer<T>>,
    charset: Charset,
    expected_insertions: usize,
    num_bits: usize,
    num_hashes: usize,
}

impl<T: Display + ?Sized> BloomFilter<T> {
    /// Filter whose values are decomposed through their `Display` text.
    pub fn new(config: BloomFilterConfig) -> Result<Self> {
        Self::with_decomposer(config, DefaultDecomposer)
    }
}

impl<T: Decomposable + ?Sized + 'static> BloomFilter<T> {
    /// Filter over values that write their own bytes.
    pub fn for_decomposable(config: BloomFilterConfig) -> Result<Self> {
        Self::with_decomposer(config, SelfDecomposer::<T>::new())
    }
}

impl<T: ?Sized> BloomFilter<T> {
    pub fn with_decomposer<D>(config: BloomFilterConfig, decomposer: D) -> Result<Self>
    where
        D: Decomposer<T> + 'static,
    {
        config.validate()?;
        let (num_bits, num_hashes) = sizing(&config);
        let bits = create_bit_array(&config.backend, num_bits)?;
        Ok(Self::assemble(config, bits, Box::new(decomposer), num_bits, num_hashes))
    }

    /// Filter on top of a caller-supplied bit array, which must hold exactly
    /// the number of bits the configuration sizes to.
    ///
    /// `config.backend` is ignored.
    pub fn with_bit_array<D>(
        config: BloomFilterConfig,
        bits: Box<dyn BitArray>,
        decomposer: D,
    ) -> Result<Self>
    where
        D: Decomposer<T> + 'static,
    {
        config.validate()?;
        let (num_bits, num_hashes) = sizing(&config);
        if bits.bit_size() != num_bits {
            return Err(BloomError::SizeMismatch {
                expected: num_bits,
                actual: bits.bit_size(),
            });
        }
        Ok(Self::assemble(config, bits, Box::new(decomposer), num_bits, num_hashes))
    }

    fn assemble(
        config: BloomFilterConfig,
        bits: Box<dyn BitArray>,
        decomposer: Box<dyn Decomposer<T>>,
        num_bits: usize,
        num_hashes: usize,
    ) -> Self {
        debug!(
            expected_insertions = config.expected_insertions,
            false_positive_probability = config.false_positive_probability,
            num_bits,
            num_hashes,
            backend = bits.backend_name(),
            hash_function = ?config.hash_function,
            "Created Bloom filter"
        );

        Self {
            bits,
            hasher: config.hash_function,
            decomposer,
            charset: config.charset,
            expected_insertions: config.expected_insertions,
            num_bits,
            num_hashes,
        }
    }

    /// Switches the charset the default decomposer encodes text with.
    ///
    /// Values added under one charset may not be found under another if
    /// their text encodes differently.
    pub fn set_charset(&mut self, name: &str) -> Result<()> {
        self.set_charset_to(name.parse()?);
        Ok(())
    }

    pub fn set_charset_to(&mut self, charset: Charset) {
        self.charset = charset;
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// The decomposer turning values into hashed bytes.
    pub fn decomposer(&self) -> &dyn Decomposer<T> {
        self.decomposer.as_ref()
    }

    pub fn bit_array(&self) -> &dyn BitArray {
        self.bits.as_ref()
    }

    /// Resets every bit; the filter is empty afterwards.
    pub fn clear(&mut self) -> Result<()> {
        self.bits.clear()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.bits.flush()
    }

    /// Estimate of how many distinct values have been added, from the
    /// fraction of set bits (Swamidass & Baldi).
    pub fn approximate_count(&self) -> Result<usize> {
        let m = self.num_bits as f64;
        let set = self.bits.count_ones()? as f64;
        if set >= m {
            return Ok(usize::MAX);
        }
        let estimate = -(m / self.num_hashes as f64) * (1.0 - set / m).ln();
        Ok(estimate.round() as usize)
    }

    /// Flushes and releases the bit array's backing store.
    pub fn close(mut self) -> Result<()> {
        self.bits.close()?;
        debug!(backend = self.bits.backend_name(), "Closed Bloom filter");
        Ok(())
    }

    fn decompose(&self, value: &T) -> Vec<u8> {
        let mut sink = ByteSink::new(self.charset);
        self.decomposer.decompose(value, &mut sink);
        sink.into_bytes()
    }

    fn indices(&self, bytes: &[u8]) -> Result<DoubleHashIndices> {
        let seed = seed_hash(self.hasher.as_ref(), bytes)?;
        Ok(DoubleHashIndices::new(seed, self.num_hashes, self.num_bits))
    }
}

fn sizing(config: &BloomFilterConfig) -> (usize, usize) {
    let num_bits = optimal_bit_vector_size(
        config.expected_insertions,
        config.false_positive_probability,
    );
    let num_hashes = optimal_num_hashes(config.expected_insertions, num_bits);
    (num_bits, num_hashes)
}

impl<T: ?Sized> BloomFilterOps<T> for BloomFilter<T> {
    fn add_bytes(&mut self, bytes: &[u8]) -> Result<bool> {
        let mut changed = false;
        for index in self.indices(bytes)? {
            changed |= self.bits.set_bit(index)?;
        }
        Ok(changed)
    }

    fn contains_bytes(&self, bytes: &[u8]) -> Result<bool> {
        for index in self.indices(bytes)? {
            if !self.bits.get_bit(index)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn add<'a>(&mut self, value: impl Into<Option<&'a T>>) -> Result<bool>
    where
        T: 'a,
    {
        match value.into() {
            Some(value) => {
                let bytes = self.decompose(value);
                self.add_bytes(&bytes)
            }
            None => Ok(false),
        }
    }

    fn contains<'a>(&self, value: impl Into<Option<&'a T>>) -> Result<bool>
    where
        T: 'a,
    {
        match value.into() {
            Some(value) => self.contains_bytes(&self.decompose(value)),
            None => Ok(false),
        }
    }
}

impl<T: ?Sized> BulkBloomFilterOps<T> for BloomFilter<T> {
    fn add_all<'a, I>(&mut self, values: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut seen_any = false;
        let mut all_changed = true;
        for value in values {
            seen_any = true;
            all_changed &= self.add(value)?;
        }
        Ok(seen_any && all_changed)
    }

    fn contains_all<'a, I>(&self, values: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut seen_any = false;
        for value in values {
            seen_any = true;
            if !self.contains(value)? {
                return Ok(false);
            }
        }
        Ok(seen_any)
    }
}

impl<T: ?Sized> BloomFilterStats for BloomFilter<T> {
    fn number_of_bits(&self) -> usize {
        self.num_bits
    }

    fn number_of_hashes(&self) -> usize {
        self.num_hashes
    }

    fn false_positive_probability(&self, inserted: usize) -> f64 {
        hash::false_positive_probability(self.num_hashes, self.num_bits, inserted)
    }

    fn expected_insertions(&self) -> usize {
        self.expected_insertions
    }
}

impl<T: ?Sized> fmt::Debug for BloomFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.num_hashes)
            .field("expected_insertions", &self.expected_insertions)
            .field("backend", &self.bits.backend_name())
            .field("hasher", &self.hasher)
            .field("charset", &self.charset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitarray::InMemoryBitArray;
    use crate::filter::BloomFilterConfigBuilder;
    use crate::hash::FnvHashFunction;

    fn small_config() -> BloomFilterConfig {
        BloomFilterConfigBuilder::default()
            .expected_insertions(1_000)
            .false_positive_probability(0.01)
            .build()
            .unwrap()
    }

    #[derive(Debug)]
    struct ShortHash;

    impl HashFunction for ShortHash {
        fn is_single_valued(&self) -> bool {
            false
        }

        fn hash(&self, _bytes: &[u8]) -> Result<u64> {
            Ok(0)
        }

        fn hash_multiple(&self, _bytes: &[u8]) -> Result<Vec<u64>> {
            Ok(vec![1])
        }
    }

    mod construction_tests {
        use super::*;

        #[test]
        fn test_sizes_from_config() {
            let filter = BloomFilter::<str>::new(small_config()).unwrap();
            assert_eq!(filter.number_of_bits(), optimal_bit_vector_size(1_000, 0.01));
            assert_eq!(filter.number_of_hashes(), 7);
            assert_eq!(filter.bit_array().bit_size(), filter.number_of_bits());
            assert_eq!(filter.expected_insertions(), 1_000);
        }

        #[test]
        fn test_rejects_invalid_config() {
            let config = BloomFilterConfigBuilder::default()
                .false_positive_probability(0.0)
                .build()
                .unwrap();
            assert!(matches!(
                BloomFilter::<str>::new(config),
                Err(BloomError::InvalidConfig(_))
            ));
        }

        #[test]
        fn test_with_bit_array_checks_size() {
            let wrong = Box::new(InMemoryBitArray::new(64).unwrap());
            let result =
                BloomFilter::<str>::with_bit_array(small_config(), wrong, DefaultDecomposer);
            match result {
                Err(BloomError::SizeMismatch { expected, actual }) => {
                    assert_eq!(expected, optimal_bit_vector_size(1_000, 0.01));
                    assert_eq!(actual, 64);
                }
                other => panic!("Expected SizeMismatch, got {other:?}"),
            }
        }
    }

    mod membership_tests {
        use super::*;

        #[test]
        fn test_add_then_contains() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            assert!(!filter.contains("alpha").unwrap());
            assert!(filter.add("alpha").unwrap());
            assert!(filter.contains("alpha").unwrap());
            // second insert flips nothing
            assert!(!filter.add("alpha").unwrap());
        }

        #[test]
        fn test_sets_exactly_the_double_hash_positions() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            filter.add_bytes(b"item").unwrap();

            let seed = seed_hash(&hash::Murmur3HashFunction, b"item").unwrap();
            let expected: std::collections::BTreeSet<usize> = DoubleHashIndices::new(
                seed,
                filter.number_of_hashes(),
                filter.number_of_bits(),
            )
            .collect();

            for index in &expected {
                assert!(filter.bit_array().get_bit(*index).unwrap());
            }
            assert_eq!(filter.bit_array().count_ones().unwrap(), expected.len());
        }

        #[test]
        fn test_empty_bytes_are_a_value() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            assert!(filter.add_bytes(&[]).unwrap());
            assert!(filter.contains_bytes(&[]).unwrap());
            assert!(filter.contains("").unwrap());
        }

        #[test]
        fn test_none_is_never_added_or_found() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            assert!(!filter.add(None::<&str>).unwrap());
            assert!(!filter.contains(None::<&str>).unwrap());
            assert_eq!(filter.bit_array().count_ones().unwrap(), 0);
        }

        #[test]
        fn test_typed_and_raw_entry_points_agree() {
            let mut filter = BloomFilter::<u64>::new(small_config()).unwrap();
            filter.add(&12_345u64).unwrap();
            assert!(filter.contains_bytes(b"12345").unwrap());
        }

        #[test]
        fn test_short_multi_valued_hash_is_rejected() {
            let config = BloomFilterConfigBuilder::default()
                .expected_insertions(100)
                .hash_function(Arc::new(ShortHash))
                .build()
                .unwrap();
            let mut filter = BloomFilter::<str>::new(config).unwrap();
            assert!(matches!(
                filter.add("x"),
                Err(BloomError::InvalidArgument(_))
            ));
        }

        #[test]
        fn test_single_valued_hash_function() {
            let config = BloomFilterConfigBuilder::default()
                .expected_insertions(1_000)
                .hash_function(Arc::new(FnvHashFunction))
                .build()
                .unwrap();
            let mut filter = BloomFilter::<str>::new(config).unwrap();
            for i in 0..1_000 {
                filter.add(format!("key-{i}").as_str()).unwrap();
            }
            for i in 0..1_000 {
                assert!(filter.contains(format!("key-{i}").as_str()).unwrap());
            }
        }
    }

    mod bulk_tests {
        use super::*;

        #[test]
        fn test_add_all_reports_every_change() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            assert!(filter.add_all(["a", "b", "c"]).unwrap());
            // "a" is already present, so not every add changed bits
            assert!(!filter.add_all(["a", "d"]).unwrap());
            // but "d" was still added
            assert!(filter.contains("d").unwrap());
        }

        #[test]
        fn test_empty_collections_are_false() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            let nothing: [&str; 0] = [];
            assert!(!filter.add_all(nothing).unwrap());
            assert!(!filter.contains_all(nothing).unwrap());
        }

        #[test]
        fn test_contains_all() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            filter.add_all(["x", "y"]).unwrap();
            assert!(filter.contains_all(["x", "y"]).unwrap());
            assert!(!filter.contains_all(["x", "never-added"]).unwrap());
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_set_charset() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            assert_eq!(filter.charset(), Charset::Utf8);

            filter.add("café").unwrap();
            filter.set_charset("ISO-8859-1").unwrap();
            assert_eq!(filter.charset(), Charset::Iso8859_1);
            assert!(filter.contains_bytes(&Charset::Utf8.encode("café")).unwrap());

            assert!(matches!(
                filter.set_charset("KOI8-R"),
                Err(BloomError::UnsupportedCharset(_))
            ));
            assert_eq!(filter.charset(), Charset::Iso8859_1);

            filter.set_charset("utf8").unwrap();
            assert!(filter.contains("café").unwrap());
        }

        #[test]
        fn test_set_charset_to() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            filter.set_charset_to(Charset::Utf16Le);
            assert_eq!(filter.charset(), Charset::Utf16Le);

            filter.add("hé").unwrap();
            assert!(filter.contains_bytes(&Charset::Utf16Le.encode("hé")).unwrap());
        }

        #[test]
        fn test_decomposer_accessor() {
            let by_len = |value: &str, sink: &mut ByteSink| {
                sink.put_int(value.len() as i32);
            };
            let filter =
                BloomFilter::<str>::with_decomposer(small_config(), by_len).unwrap();

            let mut sink = ByteSink::default();
            filter.decomposer().decompose("four", &mut sink);
            assert_eq!(sink.into_bytes(), vec![0, 0, 0, 4]);
        }

        #[test]
        fn test_clear_empties_the_filter() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            filter.add("gone").unwrap();
            filter.clear().unwrap();
            assert!(!filter.contains("gone").unwrap());
            assert_eq!(filter.bit_array().count_ones().unwrap(), 0);
        }

        #[test]
        fn test_false_positive_probability_estimate() {
            let filter = BloomFilter::<str>::new(small_config()).unwrap();
            assert_eq!(filter.false_positive_probability(0), 0.0);
            let at_capacity = filter.false_positive_probability(1_000);
            assert!(at_capacity > 0.005 && at_capacity < 0.015);
            assert!(filter.false_positive_probability(10_000) > at_capacity);
        }

        #[test]
        fn test_approximate_count() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            assert_eq!(filter.approximate_count().unwrap(), 0);
            for i in 0..500 {
                filter.add(format!("item-{i}").as_str()).unwrap();
            }
            let estimate = filter.approximate_count().unwrap();
            assert!((450..=550).contains(&estimate), "estimate {estimate}");
        }

        #[test]
        fn test_close() {
            let mut filter = BloomFilter::<str>::new(small_config()).unwrap();
            filter.add("x").unwrap();
            filter.flush().unwrap();
            assert!(filter.close().is_ok());
        }
    }
}
