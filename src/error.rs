use std::io;
use thiserror::Error;

use crate::data_reader::IdxKind;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gzip decompression failed: {0}")]
    Decompress(io::Error),

    #[error("IDX header truncated: {0}")]
    TruncatedHeader(io::Error),

    #[error("unknown IDX magic number {0}")]
    UnknownMagic(u32),

    #[error("payload does not fit shape {shape:?}: expected {expected} bytes, got {actual}")]
    Shape {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    #[error("cannot encode array of shape {0:?} as IDX")]
    UnsupportedShape(Vec<usize>),

    #[error("expected {expected:?} file, decoded {actual:?}")]
    KindMismatch { expected: IdxKind, actual: IdxKind },
}

pub type Result<T> = std::result::Result<T, LoaderError>;
