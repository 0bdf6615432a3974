//! Binary vector blocks
//!
//! Shared on-disk layout for N vectors of dimension D. Both the flat index and
//! the anchor-embedding artifact use it; they differ only in magic bytes.
//!
//! ```text
//! magic[4] | version u16 | tag u8 | reserved u8 | dimensions u32 | count u64 | f32 * count * dimensions
//! ```
//!
//! All integers and floats are little-endian.

use std::io::{Read, Write};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Current block format version
pub const BLOCK_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4 + 8;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Vector block decoding/encoding errors
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file does not start with the expected magic bytes
    #[error("Bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },
    /// Written by a newer (or unknown) format
    #[error("Unsupported block version {0}")]
    UnsupportedVersion(u16),
    /// Payload length does not match the header
    #[error("Truncated block: expected {expected} bytes of vector data, found {found}")]
    Truncated { expected: usize, found: usize },
    /// Bytes remain after the declared payload
    #[error("Trailing data after vector block")]
    TrailingData,
    /// Header declares a shape that cannot be represented
    #[error("Invalid block shape: {0}")]
    InvalidShape(String),
}

// ============================================================================
// VECTOR BLOCK
// ============================================================================

/// Row-major matrix of `count` vectors, each `dimensions` wide
#[derive(Debug, Clone, PartialEq)]
pub struct VectorBlock {
    /// One byte of per-format metadata (e.g. the index metric)
    pub tag: u8,
    /// Width of each vector
    pub dimensions: usize,
    /// Flat row-major values, `count * dimensions` long
    pub data: Vec<f32>,
}

impl VectorBlock {
    /// Number of vectors in the block
    pub fn count(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    /// Borrow row `i`
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    /// Iterate over rows in order
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimensions.max(1))
    }

    /// Encode the block under `magic`
    pub fn write_to<W: Write>(&self, writer: &mut W, magic: [u8; 4]) -> Result<(), CodecError> {
        if self.dimensions == 0 || self.data.len() % self.dimensions != 0 {
            return Err(CodecError::InvalidShape(format!(
                "{} values do not divide into rows of {}",
                self.data.len(),
                self.dimensions
            )));
        }
        let dimensions = u32::try_from(self.dimensions)
            .map_err(|_| CodecError::InvalidShape("dimensions exceed u32".to_string()))?;

        let mut header = Vec::with_capacity(HEADER_LEN);
        header.extend_from_slice(&magic);
        header.extend_from_slice(&BLOCK_VERSION.to_le_bytes());
        header.push(self.tag);
        header.push(0);
        header.extend_from_slice(&dimensions.to_le_bytes());
        header.extend_from_slice(&(self.count() as u64).to_le_bytes());
        writer.write_all(&header)?;

        let payload: Vec<u8> = self.data.iter().flat_map(|f| f.to_le_bytes()).collect();
        writer.write_all(&payload)?;
        writer.flush()?;
        Ok(())
    }

    /// Decode a block, requiring `magic` and consuming the reader to the end
    pub fn read_from<R: Read>(reader: &mut R, magic: [u8; 4]) -> Result<Self, CodecError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes, magic)
    }

    /// Decode a block from an in-memory buffer
    pub fn from_bytes(bytes: &[u8], magic: [u8; 4]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }

        let (header, payload) = bytes.split_at(HEADER_LEN);

        let found = [header[0], header[1], header[2], header[3]];
        if found != magic {
            return Err(CodecError::BadMagic {
                expected: magic,
                found,
            });
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != BLOCK_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let tag = header[6];
        let dimensions = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
        let count = u64::from_le_bytes([
            header[12], header[13], header[14], header[15], header[16], header[17], header[18],
            header[19],
        ]);

        if dimensions == 0 {
            return Err(CodecError::InvalidShape("zero dimensions".to_string()));
        }

        let expected = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(dimensions))
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| CodecError::InvalidShape(format!("{} x {} overflows", count, dimensions)))?;

        if payload.len() < expected {
            return Err(CodecError::Truncated {
                expected,
                found: payload.len(),
            });
        }
        if payload.len() > expected {
            return Err(CodecError::TrailingData);
        }

        let data = payload
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Self {
            tag,
            dimensions,
            data,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
