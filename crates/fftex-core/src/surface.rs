//! Hardware surface layout: mip dimensions, row alignment, and conversion
//! between padded (hardware) and tightly packed (linear) mip data.
//!
//! Everything here is recomputed from the texture on each call; nothing is cached.

use tracing::{debug, warn};

use crate::codec::ImageCodec;
use crate::config::AlignmentPolicy;
use crate::error::Result;
use crate::format::TextureFormat;
use crate::tex::Texture;

/// Row pitch granularity of the pitch-rounding policy, in bytes.
pub const PITCH_ALIGNMENT: usize = 256;

/// `max(1, base >> level)`.
pub fn mip_dimension(base: u32, level: u32) -> u32 {
    base.checked_shr(level).unwrap_or(0).max(1)
}

/// Rounds `value` up to a power-of-two `alignment`.
pub fn align(value: u32, alignment: u32) -> u32 {
    (value + (alignment - 1)) & !(alignment - 1)
}

fn align_usize(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Texel alignment applied to the width of `mip` under dimension rounding.
///
/// Later rules replace earlier ones: 64 by default, 128 for mips of a
/// 512-wide texture, 256 for signed distance fields, 128 for BC4 textures
/// with exactly 7 or 9 mips.
pub fn width_alignment(texture: &Texture, mip: u32) -> u32 {
    let mut alignment = 64;
    if mip >= 1 && texture.width == 512 {
        alignment = 128;
    }
    if texture.flags.signed_distance_field() {
        alignment = 256;
    }
    if texture.format == TextureFormat::Bc4Unorm && matches!(texture.mip_count, 7 | 9) {
        alignment = 128;
    }
    alignment
}

pub fn aligned_width(texture: &Texture, mip: u32) -> u32 {
    let width = mip_dimension(texture.width as u32, mip);
    align(width, width_alignment(texture, mip))
}

pub fn aligned_height(texture: &Texture, mip: u32) -> u32 {
    let height = mip_dimension(texture.height as u32, mip);
    if texture.format.is_block_compressed() && height > 4 {
        align(height, 4)
    } else {
        height
    }
}

/// Byte geometry of one mip level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLayout {
    pub level: u32,
    pub width: u32,
    pub height: u32,
    /// Tightly packed bytes per row (pixel row or block row).
    pub row_bytes: usize,
    /// Padded bytes per row in hardware layout.
    pub row_pitch: usize,
    pub rows: usize,
}

impl MipLayout {
    pub fn linear_size(&self) -> usize {
        self.row_bytes * self.rows
    }

    pub fn hardware_size(&self) -> usize {
        self.row_pitch * self.rows
    }
}

pub fn mip_layout(
    texture: &Texture,
    codec: &ImageCodec,
    policy: AlignmentPolicy,
    mip: u32,
) -> MipLayout {
    let width = mip_dimension(texture.width as u32, mip);
    let height = mip_dimension(texture.height as u32, mip);
    let row_bytes = codec.row_bytes(width);
    let mip_count = texture.mip_count.max(1) as u32;

    let row_pitch = match policy {
        AlignmentPolicy::Dimension => codec.row_bytes(aligned_width(texture, mip)),
        AlignmentPolicy::Pitch if mip_count > 1 && mip + 1 == mip_count => row_bytes,
        AlignmentPolicy::Pitch => align_usize(row_bytes, PITCH_ALIGNMENT),
    };

    MipLayout {
        level: mip,
        width,
        height,
        row_bytes,
        row_pitch,
        rows: codec.units_high(height),
    }
}

/// Layouts for every mip of `texture`, base level first.
pub fn mip_layouts(texture: &Texture, policy: AlignmentPolicy) -> Result<Vec<MipLayout>> {
    let codec = texture.format.codec()?;
    Ok((0..texture.mip_count.max(1) as u32)
        .map(|mip| mip_layout(texture, &codec, policy, mip))
        .collect())
}

/// Total padded size of all mips.
pub fn hardware_size(texture: &Texture, policy: AlignmentPolicy) -> Result<usize> {
    Ok(mip_layouts(texture, policy)?
        .iter()
        .map(MipLayout::hardware_size)
        .sum())
}

/// Total tightly packed size of all mips.
pub fn linear_size(texture: &Texture, policy: AlignmentPolicy) -> Result<usize> {
    Ok(mip_layouts(texture, policy)?
        .iter()
        .map(MipLayout::linear_size)
        .sum())
}

/// Strips per-row padding. Reads past the end of `hardware` are clamped and
/// the missing bytes left zeroed.
pub fn to_linear(
    texture: &Texture,
    policy: AlignmentPolicy,
    hardware: &[u8],
) -> Result<Vec<Vec<u8>>> {
    let layouts = mip_layouts(texture, policy)?;
    let mut offset = 0usize;
    let mut mips = Vec::with_capacity(layouts.len());

    for layout in &layouts {
        let mut linear = vec![0u8; layout.linear_size()];
        let copied = copy_rows(
            &hardware[offset.min(hardware.len())..],
            layout.row_pitch,
            &mut linear,
            layout.row_bytes,
            layout.rows,
        );
        if copied < layout.linear_size() {
            warn!(
                mip = layout.level,
                expected = layout.linear_size(),
                copied,
                "hardware surface shorter than its layout, clamping"
            );
        }
        offset += layout.hardware_size();
        mips.push(linear);
    }

    debug!(mips = mips.len(), consumed = offset, available = hardware.len(), "unpadded surface");
    Ok(mips)
}

/// Inserts per-row padding, one buffer per mip.
pub fn to_hardware_levels(
    texture: &Texture,
    policy: AlignmentPolicy,
    mips: &[Vec<u8>],
) -> Result<Vec<Vec<u8>>> {
    let layouts = mip_layouts(texture, policy)?;
    let mut levels = Vec::with_capacity(layouts.len());

    for layout in &layouts {
        let source = mips.get(layout.level as usize).map_or(&[][..], Vec::as_slice);
        let mut hardware = vec![0u8; layout.hardware_size()];
        let copied = copy_rows(
            source,
            layout.row_bytes,
            &mut hardware,
            layout.row_pitch,
            layout.rows,
        );
        if copied < layout.linear_size() {
            warn!(
                mip = layout.level,
                expected = layout.linear_size(),
                copied,
                "linear mip shorter than its layout, clamping"
            );
        }
        levels.push(hardware);
    }
    Ok(levels)
}

/// Inserts per-row padding and concatenates every mip.
pub fn to_hardware(texture: &Texture, policy: AlignmentPolicy, mips: &[Vec<u8>]) -> Result<Vec<u8>> {
    Ok(to_hardware_levels(texture, policy, mips)?.concat())
}

/// Splits a concatenated linear mip chain into per-mip buffers (clamped to `data`).
pub fn split_linear(texture: &Texture, policy: AlignmentPolicy, data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let layouts = mip_layouts(texture, policy)?;
    let mut offset = 0usize;
    Ok(layouts
        .iter()
        .map(|layout| {
            let start = offset.min(data.len());
            let end = (offset + layout.linear_size()).min(data.len());
            offset += layout.linear_size();
            data[start..end].to_vec()
        })
        .collect())
}

/// Copies `rows` rows of `min(src_stride, dst_stride)` meaningful bytes.
/// Returns the number of source bytes actually copied.
fn copy_rows(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    rows: usize,
) -> usize {
    let row_len = src_stride.min(dst_stride);
    let mut copied = 0;
    for row in 0..rows {
        let start = row * src_stride;
        if start >= src.len() {
            break;
        }
        let n = row_len.min(src.len() - start);
        let dst_start = row * dst_stride;
        dst[dst_start..dst_start + n].copy_from_slice(&src[start..start + n]);
        copied += n;
    }
    copied
}
