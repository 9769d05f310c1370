//! BC1-BC7 block compression.
//!
//! Decoding goes through `texture2ddecoder`, except BC2 which uses
//! `block_compression`. Encoding goes through the ISPC kernels in `intel_tex_2`.

use half::f16;
use intel_tex_2::{RSurface, RgSurface, RgbaSurface};

use crate::config::BcQuality;
use crate::error::{Result, TexError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFamily {
    Bc1,
    Bc2,
    Bc3,
    Bc4,
    Bc5,
    Bc6h,
    Bc7,
}

/// A block format: family plus the sRGB / signed variant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockFormat {
    pub family: BlockFamily,
    pub srgb: bool,
    pub signed: bool,
}

type DecodeFn = fn(&[u8], usize, usize, &mut [u32]) -> std::result::Result<(), &'static str>;

impl BlockFormat {
    pub const fn new(family: BlockFamily) -> Self {
        Self {
            family,
            srgb: false,
            signed: false,
        }
    }

    pub const fn srgb(mut self) -> Self {
        self.srgb = true;
        self
    }

    pub const fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub fn block_size(&self) -> usize {
        match self.family {
            BlockFamily::Bc1 | BlockFamily::Bc4 => 8,
            _ => 16,
        }
    }

    pub fn calculate_size(&self, width: u32, height: u32) -> usize {
        width.div_ceil(4) as usize * height.div_ceil(4) as usize * self.block_size()
    }

    pub fn decode(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let decoder: DecodeFn = match self.family {
            BlockFamily::Bc2 => return Ok(decode_bc2(data, width, height)),
            BlockFamily::Bc1 => texture2ddecoder::decode_bc1,
            BlockFamily::Bc3 => texture2ddecoder::decode_bc3,
            BlockFamily::Bc4 => texture2ddecoder::decode_bc4,
            BlockFamily::Bc5 => texture2ddecoder::decode_bc5,
            BlockFamily::Bc6h if self.signed => texture2ddecoder::decode_bc6_signed,
            BlockFamily::Bc6h => texture2ddecoder::decode_bc6_unsigned,
            BlockFamily::Bc7 => texture2ddecoder::decode_bc7,
        };

        let (w, h) = (width as usize, height as usize);
        let mut pixels = vec![0u32; w * h];
        decoder(data, w, h, &mut pixels).map_err(|e| {
            TexError::InvalidInput(format!("{:?} decode failed: {e}", self.family))
        })?;

        // texture2ddecoder packs BGRA into each u32.
        Ok(pixels
            .iter()
            .flat_map(|&px| {
                let b = (px & 0xFF) as u8;
                let g = ((px >> 8) & 0xFF) as u8;
                let r = ((px >> 16) & 0xFF) as u8;
                let a = ((px >> 24) & 0xFF) as u8;
                [r, g, b, a]
            })
            .collect())
    }

    pub fn encode(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        quality: BcQuality,
    ) -> Result<Vec<u8>> {
        if self.signed {
            return Err(TexError::UnimplementedCodec(format!(
                "signed {:?} encoding",
                self.family
            )));
        }

        let (padded, pw, ph) = pad_to_blocks(rgba, width as usize, height as usize);
        let mut out = vec![0u8; self.calculate_size(width, height)];
        let surface = RgbaSurface {
            width: pw as u32,
            height: ph as u32,
            stride: (pw * 4) as u32,
            data: &padded,
        };

        match self.family {
            BlockFamily::Bc2 => {
                return Err(TexError::UnimplementedCodec("BC2 encoding".into()));
            }
            BlockFamily::Bc1 => intel_tex_2::bc1::compress_blocks_into(&surface, &mut out),
            BlockFamily::Bc3 => intel_tex_2::bc3::compress_blocks_into(&surface, &mut out),
            BlockFamily::Bc4 => {
                let r: Vec<u8> = padded.chunks_exact(4).map(|px| px[0]).collect();
                let surface = RSurface {
                    width: pw as u32,
                    height: ph as u32,
                    stride: pw as u32,
                    data: &r,
                };
                intel_tex_2::bc4::compress_blocks_into(&surface, &mut out);
            }
            BlockFamily::Bc5 => {
                let rg: Vec<u8> = padded
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1]])
                    .collect();
                let surface = RgSurface {
                    width: pw as u32,
                    height: ph as u32,
                    stride: (pw * 2) as u32,
                    data: &rg,
                };
                intel_tex_2::bc5::compress_blocks_into(&surface, &mut out);
            }
            BlockFamily::Bc6h => {
                let halves: Vec<u8> = padded
                    .iter()
                    .flat_map(|&c| f16::from_f32(c as f32 / 255.0).to_le_bytes())
                    .collect();
                let surface = RgbaSurface {
                    width: pw as u32,
                    height: ph as u32,
                    stride: (pw * 8) as u32,
                    data: &halves,
                };
                let settings = bc6h_settings(quality);
                intel_tex_2::bc6h::compress_blocks_into(&settings, &surface, &mut out);
            }
            BlockFamily::Bc7 => {
                let opaque = padded.chunks_exact(4).all(|px| px[3] == 255);
                let settings = bc7_settings(quality, opaque);
                intel_tex_2::bc7::compress_blocks_into(&settings, &surface, &mut out);
            }
        }
        Ok(out)
    }
}

fn bc6h_settings(quality: BcQuality) -> intel_tex_2::bc6h::EncodeSettings {
    use intel_tex_2::bc6h;
    match quality {
        BcQuality::UltraFast | BcQuality::VeryFast => bc6h::very_fast_settings(),
        BcQuality::Fast => bc6h::fast_settings(),
        BcQuality::Basic => bc6h::basic_settings(),
        BcQuality::Slow => bc6h::slow_settings(),
    }
}

fn bc7_settings(quality: BcQuality, opaque: bool) -> intel_tex_2::bc7::EncodeSettings {
    use intel_tex_2::bc7;
    match (quality, opaque) {
        (BcQuality::UltraFast, true) => bc7::opaque_ultra_fast_settings(),
        (BcQuality::VeryFast, true) => bc7::opaque_very_fast_settings(),
        (BcQuality::Fast, true) => bc7::opaque_fast_settings(),
        (BcQuality::Basic, true) => bc7::opaque_basic_settings(),
        (BcQuality::Slow, true) => bc7::opaque_slow_settings(),
        (BcQuality::UltraFast, false) => bc7::alpha_ultra_fast_settings(),
        (BcQuality::VeryFast, false) => bc7::alpha_very_fast_settings(),
        (BcQuality::Fast, false) => bc7::alpha_fast_settings(),
        (BcQuality::Basic, false) => bc7::alpha_basic_settings(),
        (BcQuality::Slow, false) => bc7::alpha_slow_settings(),
    }
}

/// Extends edge texels so both dimensions are multiples of 4.
fn pad_to_blocks(rgba: &[u8], w: usize, h: usize) -> (Vec<u8>, usize, usize) {
    let pw = w.div_ceil(4) * 4;
    let ph = h.div_ceil(4) * 4;
    if w == 0 || h == 0 {
        return (Vec::new(), pw, ph);
    }
    if pw == w && ph == h {
        return (rgba[..w * h * 4].to_vec(), pw, ph);
    }

    let mut padded = vec![0u8; pw * ph * 4];
    for y in 0..ph {
        for x in 0..pw {
            let src = ((y.min(h - 1)) * w + x.min(w - 1)) * 4;
            let dst = (y * pw + x) * 4;
            padded[dst..dst + 4].copy_from_slice(&rgba[src..src + 4]);
        }
    }
    (padded, pw, ph)
}

/// BC2 through `block_compression`; texture2ddecoder has no BC2 entry point.
/// Blocks are decoded into a 4-aligned scratch surface and cropped.
fn decode_bc2(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let blocks_x = w.div_ceil(4);
    let blocks_y = h.div_ceil(4);
    let pitch = blocks_x * 16;
    let mut scratch = vec![0u8; pitch * blocks_y * 4];

    for (index, block) in data.chunks_exact(16).take(blocks_x * blocks_y).enumerate() {
        let (bx, by) = (index % blocks_x, index / blocks_x);
        let offset = by * 4 * pitch + bx * 16;
        block_compression::decode::decode_block_bc2(block, &mut scratch[offset..], pitch);
    }

    if pitch == w * 4 {
        scratch.truncate(w * h * 4);
        return scratch;
    }
    scratch
        .chunks_exact(pitch)
        .take(h)
        .flat_map(|row| row[..w * 4].iter().copied())
        .collect()
}
