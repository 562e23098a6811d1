
use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::error::{LoaderError, Result};

pub const IMAGES_MAGIC: u32 = 2051;
pub const LABELS_MAGIC: u32 = 2049;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdxKind {
    Images,
    Labels,
}

impl IdxKind {
    pub fn from_magic(magic: u32) -> Result<Self> {
        match magic {
            IMAGES_MAGIC => Ok(IdxKind::Images),
            LABELS_MAGIC => Ok(IdxKind::Labels),
            other => Err(LoaderError::UnknownMagic(other)),
        }
    }

    pub fn magic(self) -> u32 {
        match self {
            IdxKind::Images => IMAGES_MAGIC,
            IdxKind::Labels => LABELS_MAGIC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxHeader {
    pub kind: IdxKind,
    pub count: u32,
    /// rows and cols for image files, empty for label files.
    pub dims: Vec<u32>,
}

impl IdxHeader {
    /// Shape of the decoded array: (count, rows, cols) or (count, 1).
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = vec![self.count as usize];
        match self.kind {
            IdxKind::Images => shape.extend(self.dims.iter().map(|&d| d as usize)),
            IdxKind::Labels => shape.push(1),
        }
        shape
    }

    // bytes the payload must hold; saturates so absurd headers still fail the size check.
    fn payload_len(&self) -> usize {
        self.shape().iter().fold(1usize, |acc, &d| acc.saturating_mul(d))
    }
}

fn read_be_u32<R: Read>(reader: &mut R) -> Result<u32> {
    reader
        .read_u32::<BigEndian>()
        .map_err(LoaderError::TruncatedHeader)
}

/// Reads the magic number, item count and (for images) the row and column counts.
/// The reader is left positioned at the start of the payload.
pub fn read_header<R: Read>(reader: &mut R) -> Result<IdxHeader> {
    let magic = read_be_u32(reader)?;
    let count = read_be_u32(reader)?;
    let kind = IdxKind::from_magic(magic)?;

    let dims = match kind {
        IdxKind::Images => {
            let rows = read_be_u32(reader)?;
            let cols = read_be_u32(reader)?;
            vec![rows, cols]
        }
        IdxKind::Labels => Vec::new(),
    };

    Ok(IdxHeader { kind, count, dims })
}

pub fn read_idx<R: Read>(mut reader: R) -> Result<ArrayD<u8>> {
    let header = read_header(&mut reader)?;
    read_payload(&header, reader)
}

/// Reads the rest of `reader` as the payload described by an already parsed header.
pub fn read_payload<R: Read>(header: &IdxHeader, mut reader: R) -> Result<ArrayD<u8>> {
    let mut payload: Vec<u8> = Vec::new();
    reader.read_to_end(&mut payload)?;

    let shape = header.shape();
    let expected = header.payload_len();
    if payload.len() != expected {
        return Err(LoaderError::Shape {
            shape,
            expected,
            actual: payload.len(),
        });
    }

    debug!(kind = ?header.kind, ?shape, "decoded idx payload");
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), payload)?)
}

pub fn decode_idx(bytes: &[u8]) -> Result<ArrayD<u8>> {
    read_idx(bytes)
}

fn dim_u32(dim: usize, shape: &[usize]) -> Result<u32> {
    u32::try_from(dim).map_err(|_| LoaderError::UnsupportedShape(shape.to_vec()))
}

/// Writes `array` in the IDX layout for `kind`. Images must be rank 3,
/// labels must have shape (count, 1).
pub fn encode_idx(array: &ArrayD<u8>, kind: IdxKind) -> Result<Vec<u8>> {
    let shape = array.shape();
    let header_fields = match (kind, shape) {
        (IdxKind::Images, &[count, rows, cols]) => vec![count, rows, cols],
        (IdxKind::Labels, &[count, 1]) => vec![count],
        _ => return Err(LoaderError::UnsupportedShape(shape.to_vec())),
    };

    let mut out: Vec<u8> = Vec::with_capacity(4 * (1 + header_fields.len()) + array.len());
    out.write_u32::<BigEndian>(kind.magic())?;
    for dim in header_fields {
        out.write_u32::<BigEndian>(dim_u32(dim, shape)?)?;
    }

    // logical (row-major) order, whatever the memory layout.
    let payload: Vec<u8> = array.iter().copied().collect();
    out.write_all(&payload)?;

    Ok(out)
}
