#![allow(dead_code)]

use s3_file_upload::memory::StoreCall;
use s3_file_upload::{ByteSize, FileUploader, MemoryClient, UploadBuilder};

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

pub const BUCKET: &str = "test-bucket";
pub const PREFIX: &str = "simulator/data";

pub static TRACER: LazyLock<()> = LazyLock::new(|| {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// A file with known content in a temporary directory.
#[derive(Debug)]
pub struct TestFile {
    dir: TempDir,
    path: PathBuf,
    pub content: Vec<u8>,
}

impl TestFile {
    /// A file named `name` holding `len` bytes of a repeating pattern.
    pub fn new(name: &str, len: usize) -> Self {
        let content = (0..len).map(|n| (n % 251) as u8).collect::<Vec<_>>();
        Self::with_content(name, content)
    }

    pub fn with_content(name: &str, content: Vec<u8>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&content).unwrap();
        Self { dir, path, content }
    }

    /// A path in the same directory where no file exists.
    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An uploader for the test bucket and prefix with a part size in bytes.
pub fn uploader(client: &MemoryClient, part_bytes: u64) -> UploadBuilder {
    UploadBuilder::new(client.clone())
        .bucket(BUCKET)
        .key_prefix(PREFIX)
        .part_size(ByteSize::b(part_bytes))
}

pub fn build(client: &MemoryClient, part_bytes: u64) -> FileUploader {
    uploader(client, part_bytes).build()
}

pub fn part_calls(calls: &[StoreCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, StoreCall::UploadPart(_)))
        .count()
}

pub fn completes(calls: &[StoreCall]) -> Vec<Vec<i32>> {
    calls
        .iter()
        .filter_map(|c| match c {
            StoreCall::Complete(parts) => Some(parts.iter().map(|p| **p).collect()),
            _ => None,
        })
        .collect()
}

pub fn aborts(calls: &[StoreCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, StoreCall::Abort(_)))
        .count()
}
