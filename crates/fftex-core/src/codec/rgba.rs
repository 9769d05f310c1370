use half::f16;

use crate::error::{Result, TexError};

/// Numeric interpretation shared by every channel of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Unsigned normalized integer.
    Unorm,
    /// Two's-complement normalized integer.
    Snorm,
    /// IEEE-754 storage; 16-bit channels are half floats, 32-bit channels single floats.
    Float,
}

/// Logical channel an output position is filled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelSource {
    Red,
    Green,
    Blue,
    Alpha,
    /// Constant full intensity.
    One,
}

impl ChannelSource {
    fn from_char(c: char) -> Self {
        match c.to_ascii_uppercase() {
            'R' => Self::Red,
            'G' => Self::Green,
            'B' => Self::Blue,
            'A' => Self::Alpha,
            _ => Self::One,
        }
    }

    fn index(self) -> Option<usize> {
        match self {
            Self::Red => Some(0),
            Self::Green => Some(1),
            Self::Blue => Some(2),
            Self::Alpha => Some(3),
            Self::One => None,
        }
    }
}

/// Generic packed-pixel layout: up to four channels of arbitrary width, read
/// from bit 0 upward in R, G, B, A order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    bits: [u8; 4],
    order: [ChannelSource; 4],
    kind: ChannelKind,
    luminance: bool,
}

const RGBA: [ChannelSource; 4] = [
    ChannelSource::Red,
    ChannelSource::Green,
    ChannelSource::Blue,
    ChannelSource::Alpha,
];
const BGRA: [ChannelSource; 4] = [
    ChannelSource::Blue,
    ChannelSource::Green,
    ChannelSource::Red,
    ChannelSource::Alpha,
];
const RRR1: [ChannelSource; 4] = [
    ChannelSource::Red,
    ChannelSource::Red,
    ChannelSource::Red,
    ChannelSource::One,
];

impl ChannelLayout {
    /// Builds a layout from per-channel widths, rejecting shapes the packer cannot represent.
    pub fn new(bits: [u8; 4], kind: ChannelKind) -> Result<Self> {
        let total: u32 = bits.iter().map(|&b| b as u32).sum();
        if total == 0 {
            return Err(TexError::InvalidInput(
                "channel layout must have at least one non-empty channel".into(),
            ));
        }
        if total > 128 || bits.iter().any(|&b| b > 32) {
            return Err(TexError::InvalidInput(format!(
                "channel widths {bits:?} exceed 32 bits per channel or 128 bits per pixel"
            )));
        }
        match kind {
            ChannelKind::Float if bits.iter().any(|&b| b != 0 && b != 16 && b != 32) => {
                return Err(TexError::InvalidInput(format!(
                    "float channels must be 16 or 32 bits wide, got {bits:?}"
                )));
            }
            ChannelKind::Snorm if bits.contains(&1) => {
                return Err(TexError::InvalidInput(
                    "signed channels need at least 2 bits".into(),
                ));
            }
            _ => {}
        }
        Ok(Self::preset(bits, kind, RGBA, false))
    }

    const fn preset(
        bits: [u8; 4],
        kind: ChannelKind,
        order: [ChannelSource; 4],
        luminance: bool,
    ) -> Self {
        Self {
            bits,
            order,
            kind,
            luminance,
        }
    }

    /// Output order such as `"BGRA"` or `"RRR1"`; characters other than R/G/B/A emit 255.
    pub fn with_order(mut self, order: &str) -> Self {
        let mut parsed = [ChannelSource::One; 4];
        for (slot, c) in parsed.iter_mut().zip(order.chars()) {
            *slot = ChannelSource::from_char(c);
        }
        self.order = parsed;
        self
    }

    /// Packs Rec.709 luminance instead of RGB and decodes with alpha forced to 255.
    pub fn with_luminance(mut self, luminance: bool) -> Self {
        self.luminance = luminance;
        self
    }

    pub fn rgba8() -> Self {
        Self::preset([8, 8, 8, 8], ChannelKind::Unorm, RGBA, false)
    }
    pub fn bgra8() -> Self {
        Self::preset([8, 8, 8, 8], ChannelKind::Unorm, BGRA, false)
    }
    pub fn bgrx8() -> Self {
        let order = [
            ChannelSource::Blue,
            ChannelSource::Green,
            ChannelSource::Red,
            ChannelSource::One,
        ];
        Self::preset([8, 8, 8, 8], ChannelKind::Unorm, order, false)
    }
    pub fn rg8() -> Self {
        Self::preset([8, 8, 0, 0], ChannelKind::Unorm, RGBA, false)
    }
    pub fn rg8_snorm() -> Self {
        Self::preset([8, 8, 0, 0], ChannelKind::Snorm, RGBA, false)
    }
    pub fn r8() -> Self {
        Self::preset([8, 0, 0, 0], ChannelKind::Unorm, RRR1, true)
    }
    pub fn r8_snorm() -> Self {
        Self::preset([8, 0, 0, 0], ChannelKind::Snorm, RRR1, false)
    }
    pub fn a8() -> Self {
        let order = [
            ChannelSource::One,
            ChannelSource::One,
            ChannelSource::One,
            ChannelSource::Red,
        ];
        Self::preset([8, 0, 0, 0], ChannelKind::Unorm, order, false)
    }
    pub fn r16_unorm() -> Self {
        Self::preset([16, 0, 0, 0], ChannelKind::Unorm, RGBA, false)
    }
    pub fn r16_float() -> Self {
        Self::preset([16, 0, 0, 0], ChannelKind::Float, RGBA, false)
    }
    pub fn rg16_float() -> Self {
        Self::preset([16, 16, 0, 0], ChannelKind::Float, RGBA, false)
    }
    pub fn rgba16_float() -> Self {
        Self::preset([16, 16, 16, 16], ChannelKind::Float, RGBA, false)
    }
    pub fn r32_float() -> Self {
        Self::preset([32, 0, 0, 0], ChannelKind::Float, RRR1, true)
    }
    pub fn rg32_float() -> Self {
        Self::preset([32, 32, 0, 0], ChannelKind::Float, RGBA, false)
    }
    pub fn rgb32_float() -> Self {
        Self::preset([32, 32, 32, 0], ChannelKind::Float, RGBA, false)
    }
    pub fn rgba32_float() -> Self {
        Self::preset([32, 32, 32, 32], ChannelKind::Float, RGBA, false)
    }
    pub fn rgb10a2() -> Self {
        Self::preset([10, 10, 10, 2], ChannelKind::Unorm, RGBA, false)
    }
    pub fn b5g6r5() -> Self {
        Self::preset([5, 6, 5, 0], ChannelKind::Unorm, BGRA, false)
    }
    pub fn bgra4() -> Self {
        Self::preset([4, 4, 4, 4], ChannelKind::Unorm, BGRA, false)
    }
    pub fn bgr5a1() -> Self {
        Self::preset([5, 5, 5, 1], ChannelKind::Unorm, BGRA, false)
    }

    pub fn bits(&self) -> [u8; 4] {
        self.bits
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bits.iter().map(|&b| b as u32).sum()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel().div_ceil(8) as usize
    }

    pub fn calculate_size(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }

    pub fn decode(&self, data: &[u8], width: u32, height: u32) -> Vec<u8> {
        let count = width as usize * height as usize;
        let bpp = self.bytes_per_pixel();
        let mut out = vec![0u8; count * 4];

        for (src, dst) in data.chunks_exact(bpp).zip(out.chunks_exact_mut(4)) {
            let mut word = [0u8; 16];
            word[..bpp].copy_from_slice(src);
            let raw = u128::from_le_bytes(word);

            let mut values = [255u8; 4];
            let mut shift = 0u32;
            for (value, &n) in values.iter_mut().zip(self.bits.iter()) {
                if n == 0 {
                    continue;
                }
                let field = ((raw >> shift) & field_mask(n)) as u32;
                *value = self.unpack_channel(field, n);
                shift += n as u32;
            }

            for (d, source) in dst.iter_mut().zip(self.order.iter()) {
                *d = source.index().map_or(255, |i| values[i]);
            }
        }
        out
    }

    pub fn encode(&self, rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
        let count = width as usize * height as usize;
        let bpp = self.bytes_per_pixel();
        let mut out = vec![0u8; count * bpp];

        for (src, dst) in rgba.chunks_exact(4).zip(out.chunks_exact_mut(bpp)) {
            let values = if self.luminance {
                let l = luminance(src);
                [l, l, l, 255]
            } else {
                let mut values = [255u8; 4];
                for (channel, value) in values.iter_mut().enumerate() {
                    if let Some(pos) = self.order.iter().position(|s| s.index() == Some(channel)) {
                        *value = src[pos];
                    }
                }
                values
            };

            let mut raw = 0u128;
            let mut shift = 0u32;
            for (&value, &n) in values.iter().zip(self.bits.iter()) {
                if n == 0 {
                    continue;
                }
                raw |= (self.pack_channel(value, n) as u128 & field_mask(n)) << shift;
                shift += n as u32;
            }
            dst.copy_from_slice(&raw.to_le_bytes()[..bpp]);
        }
        out
    }

    fn unpack_channel(&self, field: u32, n: u8) -> u8 {
        match self.kind {
            ChannelKind::Float => {
                let value = if n == 16 {
                    f16::from_bits(field as u16).to_f32()
                } else {
                    f32::from_bits(field)
                };
                (value * 255.0).round().clamp(0.0, 255.0) as u8
            }
            ChannelKind::Snorm => {
                let max_pos = (1i64 << (n - 1)) - 1;
                let sign_bit = 1u32 << (n - 1);
                let signed = if field & sign_bit != 0 {
                    field as i64 - (1i64 << n)
                } else {
                    field as i64
                };
                ((signed + max_pos) * 255 / (2 * max_pos)).clamp(0, 255) as u8
            }
            ChannelKind::Unorm => {
                let mask = field_mask(n) as u64;
                (field as u64 * 255 / mask) as u8
            }
        }
    }

    fn pack_channel(&self, value: u8, n: u8) -> u32 {
        match self.kind {
            ChannelKind::Float => {
                let f = value as f32 / 255.0;
                if n == 16 {
                    f16::from_f32(f).to_bits() as u32
                } else {
                    f.to_bits()
                }
            }
            ChannelKind::Snorm => {
                let max_pos = (1i64 << (n - 1)) - 1;
                let signed = (value as i64 * 2 * max_pos / 255 - max_pos).clamp(-max_pos - 1, max_pos);
                (signed as u64 & field_mask(n) as u64) as u32
            }
            ChannelKind::Unorm => {
                let mask = field_mask(n) as u64;
                (value as u64 * mask / 255) as u32
            }
        }
    }
}

fn field_mask(n: u8) -> u128 {
    (1u128 << n) - 1
}

/// Rec.709 luminance of an RGBA8 texel.
pub fn luminance(texel: &[u8]) -> u8 {
    let r = texel[0] as f32 / 255.0;
    let g = texel[1] as f32 / 255.0;
    let b = texel[2] as f32 / 255.0;
    ((0.2126 * r + 0.7152 * g + 0.0722 * b) * 255.0) as u8
}
