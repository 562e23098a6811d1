use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use ndarray::ArrayD;
use tracing::debug;

use crate::cache::CacheDir;
use crate::data_reader::{read_header, read_idx, read_payload, IdxKind};
use crate::error::{LoaderError, Result};
use crate::fetch::{Fetch, HttpFetcher};

const MNIST_MIRROR: &str = "https://ossci-datasets.s3.amazonaws.com/mnist";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub cache_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            cache_dir: std::env::temp_dir(),
            timeout: None,
        }
    }
}

impl LoaderConfig {
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The four files of the MNIST distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnistFile {
    TrainImages,
    TrainLabels,
    TestImages,
    TestLabels,
}

impl MnistFile {
    pub fn file_name(self) -> &'static str {
        match self {
            MnistFile::TrainImages => "train-images-idx3-ubyte.gz",
            MnistFile::TrainLabels => "train-labels-idx1-ubyte.gz",
            MnistFile::TestImages => "t10k-images-idx3-ubyte.gz",
            MnistFile::TestLabels => "t10k-labels-idx1-ubyte.gz",
        }
    }

    pub fn url(self) -> String {
        format!("{}/{}", MNIST_MIRROR, self.file_name())
    }

    pub fn kind(self) -> IdxKind {
        match self {
            MnistFile::TrainImages | MnistFile::TestImages => IdxKind::Images,
            MnistFile::TrainLabels | MnistFile::TestLabels => IdxKind::Labels,
        }
    }
}

pub struct IdxLoader {
    cache: CacheDir,
    fetcher: Box<dyn Fetch>,
}

impl IdxLoader {
    pub fn new(config: LoaderConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.timeout)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub fn with_fetcher(config: LoaderConfig, fetcher: impl Fetch + 'static) -> Self {
        IdxLoader {
            cache: CacheDir::new(config.cache_dir),
            fetcher: Box::new(fetcher),
        }
    }

    pub fn cache(&self) -> &CacheDir {
        &self.cache
    }

    /// Local path of the decompressed file for `url`, downloading it on first use.
    pub fn cached_path(&self, url: &str) -> Result<PathBuf> {
        self.cache.ensure(url, self.fetcher.as_ref())
    }

    /// Fetches (or reuses) the file behind `url` and decodes it.
    ///
    /// Images come back with shape (count, rows, cols), labels with (count, 1).
    pub fn load(&self, url: &str) -> Result<ArrayD<u8>> {
        let path = self.cached_path(url)?;
        let file = File::open(&path)?;
        debug!(url, path = %path.display(), "decoding");
        read_idx(BufReader::new(file))
    }

    /// Like `load`, but the header kind is checked against `file` before the payload is read.
    pub fn load_mnist(&self, file: MnistFile) -> Result<ArrayD<u8>> {
        let path = self.cached_path(&file.url())?;
        let mut reader = BufReader::new(File::open(&path)?);

        let header = read_header(&mut reader)?;
        if header.kind != file.kind() {
            return Err(LoaderError::KindMismatch {
                expected: file.kind(),
                actual: header.kind,
            });
        }
        read_payload(&header, reader)
    }
}

/// Loads `url` through the shared temp-dir cache with a default http client.
pub fn load_idx(url: &str) -> Result<ArrayD<u8>> {
    IdxLoader::new(LoaderConfig::default())?.load(url)
}
