//! Pixel codecs: every format moves through canonical RGBA8 (4 bytes per texel,
//! row-major, no padding).

pub mod bcn;
pub mod r11g11b10;
pub mod rgba;

pub use bcn::{BlockFamily, BlockFormat};
pub use rgba::{ChannelKind, ChannelLayout, ChannelSource};

use crate::config::BcQuality;
use crate::error::{Result, TexError};

/// Codec selected for a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCodec {
    /// Per-channel bit packing.
    Rgba(ChannelLayout),
    /// Packed 11:11:10 unsigned floats.
    R11G11B10,
    /// 4x4 block compression.
    Block(BlockFormat),
}

impl ImageCodec {
    pub fn is_block_compressed(&self) -> bool {
        matches!(self, Self::Block(_))
    }

    /// Texel footprint of one storage unit.
    pub fn block_dimensions(&self) -> (u32, u32) {
        match self {
            Self::Block(_) => (4, 4),
            _ => (1, 1),
        }
    }

    /// Bytes per pixel, or per block for block-compressed formats.
    pub fn bytes_per_unit(&self) -> usize {
        match self {
            Self::Rgba(layout) => layout.bytes_per_pixel(),
            Self::R11G11B10 => 4,
            Self::Block(block) => block.block_size(),
        }
    }

    /// Storage units across one row of `width` texels.
    pub fn units_wide(&self, width: u32) -> usize {
        let (bw, _) = self.block_dimensions();
        width.div_ceil(bw) as usize
    }

    /// Storage rows for `height` texels.
    pub fn units_high(&self, height: u32) -> usize {
        let (_, bh) = self.block_dimensions();
        height.div_ceil(bh) as usize
    }

    /// Tightly packed row length in bytes.
    pub fn row_bytes(&self, width: u32) -> usize {
        self.units_wide(width) * self.bytes_per_unit()
    }

    pub fn calculate_size(&self, width: u32, height: u32) -> usize {
        self.row_bytes(width) * self.units_high(height)
    }

    /// Decodes a tightly packed surface into RGBA8.
    pub fn decode(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let needed = self.calculate_size(width, height);
        if data.len() < needed {
            return Err(TexError::TruncatedData {
                needed: needed as u64,
                available: data.len() as u64,
            });
        }
        match self {
            Self::Rgba(layout) => Ok(layout.decode(data, width, height)),
            Self::R11G11B10 => Ok(r11g11b10::decode(data, width, height)),
            Self::Block(block) => block.decode(data, width, height),
        }
    }

    /// Encodes RGBA8 into a tightly packed surface.
    pub fn encode(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        quality: BcQuality,
    ) -> Result<Vec<u8>> {
        let needed = width as usize * height as usize * 4;
        if rgba.len() < needed {
            return Err(TexError::InvalidInput(format!(
                "expected {needed} bytes of RGBA8 for {width}x{height}, got {}",
                rgba.len()
            )));
        }
        match self {
            Self::Rgba(layout) => Ok(layout.encode(rgba, width, height)),
            Self::R11G11B10 => Ok(r11g11b10::encode(rgba, width, height)),
            Self::Block(block) => block.encode(rgba, width, height, quality),
        }
    }
}
