//! Chunk descriptors and the per-chunk compression primitive.

use std::io::{Read, Write};

use bitfield::bitfield;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use tracing::{debug, warn};

use crate::error::{Result, TexError};

/// Largest payload the 30-bit compressed size field can describe.
pub const MAX_CHUNK_SIZE: usize = (1 << 30) - 1;

bitfield! {
    /// Chunk flags word.
    ///
    /// - Bits 0-1: chunk type (0 for the base level, 1 for the mip tail)
    /// - Bits 2-31: compressed (stored) size in bytes
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChunkFlags(pub u32);
    impl Debug;
    u32;

    pub chunk_type, set_chunk_type: 1, 0;
    pub compressed_size, set_compressed_size: 31, 2;
}

bitfield! {
    /// Chunk misc flags word. Only the low 7 bits (chunk index) are understood.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChunkMiscFlags(pub u32);
    impl Debug;
    u32;

    pub chunk_index, set_chunk_index: 6, 0;
    pub reserved, set_reserved: 31, 7;
}

/// How a chunk payload is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkStorage {
    /// Compressed when that makes the payload smaller.
    #[default]
    Compressed,
    /// Always stored verbatim.
    Raw,
}

/// A chunk with its payload held decompressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub flags: ChunkFlags,
    pub misc: ChunkMiscFlags,
    pub storage: ChunkStorage,
    data: Vec<u8>,
    /// Compressed bytes as last read or written, reused on write while `data` is untouched.
    stored: Option<Vec<u8>>,
    /// Declared decompressed size of a payload the codec could not decode.
    undecoded: Option<u32>,
}

impl Chunk {
    pub fn new(data: Vec<u8>, chunk_type: u32, chunk_index: u32) -> Self {
        let mut chunk = Self {
            data,
            ..Self::default()
        };
        chunk.flags.set_chunk_type(chunk_type);
        chunk.misc.set_chunk_index(chunk_index);
        chunk
    }

    /// Rebuilds a chunk from its descriptor words and on-disk bytes.
    ///
    /// A compressed payload `codec` cannot decode is kept opaque: it is written
    /// back unchanged, but its pixels are unavailable.
    pub(crate) fn from_stored(
        flags: ChunkFlags,
        decompressed_size: u32,
        misc: ChunkMiscFlags,
        stored: Vec<u8>,
        codec: &dyn ChunkCodec,
    ) -> Self {
        if flags.compressed_size() == decompressed_size {
            return Self {
                flags,
                misc,
                storage: ChunkStorage::Raw,
                data: stored,
                stored: None,
                undecoded: None,
            };
        }

        match codec.decompress(&stored, decompressed_size as usize) {
            Ok(data) => Self {
                flags,
                misc,
                storage: ChunkStorage::Compressed,
                data,
                stored: Some(stored),
                undecoded: None,
            },
            Err(e) => {
                warn!(
                    stored = stored.len(),
                    decompressed_size,
                    error = %e,
                    "chunk stream not decodable, keeping it opaque"
                );
                Self {
                    flags,
                    misc,
                    storage: ChunkStorage::Compressed,
                    data: Vec::new(),
                    stored: Some(stored),
                    undecoded: Some(decompressed_size),
                }
            }
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the payload. Storage mode is left as is.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.stored = None;
        self.undecoded = None;
        self.data = data;
    }

    /// False for a compressed payload the reading codec could not decode.
    pub fn is_decoded(&self) -> bool {
        self.undecoded.is_none()
    }

    pub fn chunk_type(&self) -> u32 {
        self.flags.chunk_type()
    }

    pub fn chunk_index(&self) -> u32 {
        self.misc.chunk_index()
    }

    /// True when the chunk holds compressed bytes from its last read or write.
    /// Cleared by [`Chunk::set_data`] until the next write.
    pub fn is_compressed(&self) -> bool {
        self.storage == ChunkStorage::Compressed && self.stored.is_some()
    }

    /// Produces the bytes to write and updates the size field to match.
    pub(crate) fn encode_payload(&mut self, codec: &dyn ChunkCodec) -> Result<Vec<u8>> {
        if self.data.len() > MAX_CHUNK_SIZE {
            return Err(TexError::InvalidInput(format!(
                "chunk payload of {} bytes exceeds the {MAX_CHUNK_SIZE}-byte limit",
                self.data.len()
            )));
        }

        let payload = if self.storage == ChunkStorage::Raw {
            self.data.clone()
        } else if let Some(stored) = &self.stored {
            stored.clone()
        } else {
            let compressed = codec.compress(&self.data)?;
            if compressed.len() < self.data.len() {
                self.stored = Some(compressed.clone());
                compressed
            } else {
                debug!(size = self.data.len(), "compression did not help, storing chunk raw");
                self.data.clone()
            }
        };

        self.flags.set_compressed_size(payload.len() as u32);
        Ok(payload)
    }

    pub fn decompressed_size(&self) -> u32 {
        self.undecoded.unwrap_or(self.data.len() as u32)
    }
}

/// Per-chunk stream compression.
///
/// `decompress(compress(x), x.len())` must return `x`.
pub trait ChunkCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

/// Raw deflate streams.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    level: u32,
}

impl DeflateCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::new(6)
    }
}

impl ChunkCodec for DeflateCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| TexError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| TexError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        DeflateDecoder::new(data)
            .take((expected_len as u64).saturating_add(1))
            .read_to_end(&mut out)
            .map_err(|e| TexError::Compression(e.to_string()))?;
        if out.len() != expected_len {
            return Err(TexError::TruncatedData {
                needed: expected_len as u64,
                available: out.len() as u64,
            });
        }
        Ok(out)
    }
}
