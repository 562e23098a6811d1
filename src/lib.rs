//! Download, cache and decode IDX files (the MNIST on-disk format).
//!
//! ```no_run
//! use idx_loader::{IdxLoader, LoaderConfig, MnistFile};
//!
//! let loader = IdxLoader::new(LoaderConfig::default().with_cache_dir("data/"))?;
//! let images = loader.load_mnist(MnistFile::TestImages)?;
//! assert_eq!(images.shape(), &[10_000, 28, 28]);
//! # Ok::<(), idx_loader::LoaderError>(())
//! ```

pub mod cache;
pub mod data_reader;
pub mod error;
pub mod fetch;
pub mod loader;

pub use cache::{cache_key, CacheDir};
pub use data_reader::{
    decode_idx, encode_idx, read_header, read_idx, read_payload, IdxHeader, IdxKind,
};
pub use error::{LoaderError, Result};
pub use fetch::{gunzip, Fetch, HttpFetcher};
pub use loader::{load_idx, IdxLoader, LoaderConfig, MnistFile};
