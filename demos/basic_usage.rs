use backed_bloom_rs::{
    BitArrayBackend, BloomFilter, BloomFilterConfigBuilder, BloomFilterOps,
    BloomFilterStats, BulkBloomFilterOps, ByteSink, Decomposable,
};

struct User {
    id: u32,
    email: String,
}

impl Decomposable for User {
    fn decompose(&self, into: &mut ByteSink) {
        into.put_int(self.id as i32).put_string(&self.email);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // In-memory filter over strings
    let config = BloomFilterConfigBuilder::default()
        .expected_insertions(10_000)
        .false_positive_probability(0.01)
        .build()?;
    let mut words = BloomFilter::<str>::new(config)?;

    words.add_all(["apple", "banana", "cherry"])?;
    println!("apple?  {}", words.contains("apple")?);
    println!("durian? {}", words.contains("durian")?);
    println!(
        "{} bits, {} hashes, estimated fpp after 3 insertions: {:.2e}",
        words.number_of_bits(),
        words.number_of_hashes(),
        words.false_positive_probability(3)
    );

    // Memory-mapped filter over self-describing values; survives restarts
    let path = std::env::temp_dir().join("basic_usage_users.bits");
    let config = BloomFilterConfigBuilder::default()
        .expected_insertions(1_000)
        .backend(BitArrayBackend::MemoryMapped(path.clone()))
        .build()?;
    let mut users = BloomFilter::<User>::for_decomposable(config)?;

    let alice = User {
        id: 1,
        email: "alice@example.com".to_string(),
    };
    users.add(&alice)?;
    println!("alice known? {}", users.contains(&alice)?);
    users.close()?;

    println!("user filter stored at {}", path.display());
    Ok(())
}
