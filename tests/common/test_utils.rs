use rand::Rng;
use rand::distr::Alphanumeric;
use std::path::PathBuf;
use tempfile::TempDir;

/// Backing file in a private temporary directory, removed on drop
pub struct TestBackingFile {
    // held for its Drop
    _dir: TempDir,
    path: PathBuf,
}

impl TestBackingFile {
    /// Create a new backing file path with a name based on the test name
    pub fn new(test_name: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join(format!("{test_name}.bits"));
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> PathBuf {
        self.path.clone()
    }
}

/// `count` distinct keys sharing `prefix`
#[allow(dead_code)]
pub fn generate_keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}

#[allow(dead_code)]
pub fn generate_random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
