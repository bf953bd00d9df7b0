use crate::bitarray::BitArrayBackend;
use crate::charset::Charset;
use crate::error::{BloomError, Result};
use crate::hash::{HashFunction, Murmur3HashFunction};
use derive_builder::Builder;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a [`crate::BloomFilter`]
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct BloomFilterConfig {
    /// Number of insertions the filter is sized for (`n`)
    #[builder(default = "1_000_000")]
    pub expected_insertions: usize,

    /// Target false positive probability (`p`, between 0 and 1 exclusive)
    #[builder(default = "0.01")]
    pub false_positive_probability: f64,

    /// Hash function used to seed the bit positions
    #[builder(default = "Arc::new(Murmur3HashFunction) as Arc<dyn HashFunction>")]
    pub hash_function: Arc<dyn HashFunction>,

    /// Where the bit array lives
    #[builder(default)]
    pub backend: BitArrayBackend,

    /// Charset the default decomposer encodes text with
    #[builder(default = "Charset::platform_default()")]
    pub charset: Charset,
}

impl BloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.expected_insertions == 0 {
            return Err(BloomError::InvalidConfig(
                "Expected insertions must be > 0".into(),
            ));
        }
        let p = self.false_positive_probability;
        if p.is_nan() || p <= 0.0 || p >= 1.0 {
            return Err(BloomError::InvalidConfig(format!(
                "False positive probability must be between 0 and 1, got {p}"
            )));
        }
        Ok(())
    }

    /// Loads the configuration from process environment variables.
    ///
    /// | variable | default |
    /// |---|---|
    /// | `BLOOM_EXPECTED_INSERTIONS` | `1000000` |
    /// | `BLOOM_FALSE_POSITIVE_PROBABILITY` | `0.01` |
    /// | `BLOOM_BACKEND` (`memory`, `file`, `mmap`) | `memory` |
    /// | `BLOOM_FILE_PATH` | `bloom.bits` |
    /// | `BLOOM_CHARSET` | `UTF-8` |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BloomFilterConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::from_lookup_unvalidated(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses the environment without range checks, for callers that
    /// override fields before validating.
    pub fn from_env_unvalidated() -> Result<Self> {
        Self::from_lookup_unvalidated(|key| std::env::var(key).ok())
    }

    pub fn from_lookup_unvalidated<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = BloomFilterConfigBuilder::default();

        if let Some(value) = lookup("BLOOM_EXPECTED_INSERTIONS") {
            builder = builder
                .expected_insertions(parse_env("BLOOM_EXPECTED_INSERTIONS", value)?);
        }
        if let Some(value) = lookup("BLOOM_FALSE_POSITIVE_PROBABILITY") {
            builder = builder.false_positive_probability(parse_env(
                "BLOOM_FALSE_POSITIVE_PROBABILITY",
                value,
            )?);
        }
        if let Some(value) = lookup("BLOOM_CHARSET") {
            builder = builder.charset(value.parse()?);
        }

        let path = PathBuf::from(
            lookup("BLOOM_FILE_PATH").unwrap_or_else(|| "bloom.bits".to_string()),
        );
        if let Some(value) = lookup("BLOOM_BACKEND") {
            let backend = match value.trim().to_ascii_lowercase().as_str() {
                "memory" | "in-memory" | "inmemory" => BitArrayBackend::InMemory,
                "file" | "file-backed" => BitArrayBackend::FileBacked(path),
                "mmap" | "memory-mapped" => BitArrayBackend::MemoryMapped(path),
                other => {
                    return Err(BloomError::EnvParseError {
                        var_name: "BLOOM_BACKEND".to_string(),
                        value: other.to_string(),
                        error: "expected one of memory, file, mmap".to_string(),
                    });
                }
            };
            builder = builder.backend(backend);
        }

        builder
            .build()
            .map_err(|e| BloomError::InvalidConfig(e.to_string()))
    }
}

fn parse_env<T>(var_name: &str, value: String) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| BloomError::EnvParseError {
        var_name: var_name.to_string(),
        value,
        error: e.to_string(),
    })
}

/// Single-item operations of a Bloom filter over values of type `T`.
pub trait BloomFilterOps<T: ?Sized> {
    /// Adds raw bytes; true if any bit flipped from 0 to 1
    fn add_bytes(&mut self, bytes: &[u8]) -> Result<bool>;
    /// Checks raw bytes; false means definitely absent
    fn contains_bytes(&self, bytes: &[u8]) -> Result<bool>;
    /// Decomposes and adds a value; `None` is never added
    fn add<'a>(&mut self, value: impl Into<Option<&'a T>>) -> Result<bool>
    where
        T: 'a;
    /// Decomposes and checks a value; `None` is never contained
    fn contains<'a>(&self, value: impl Into<Option<&'a T>>) -> Result<bool>
    where
        T: 'a;
}

/// Operations over collections of values.
pub trait BulkBloomFilterOps<T: ?Sized> {
    /// True only if every value changed at least one bit
    fn add_all<'a, I>(&mut self, values: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a;
    /// True only if every value is (probably) present
    fn contains_all<'a, I>(&self, values: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a;
}

pub trait BloomFilterStats {
    /// `m`
    fn number_of_bits(&self) -> usize;
    /// `k`
    fn number_of_hashes(&self) -> usize;
    /// Estimated false positive probability after `inserted` insertions
    fn false_positive_probability(&self, inserted: usize) -> f64;
    fn expected_insertions(&self) -> usize;
}
