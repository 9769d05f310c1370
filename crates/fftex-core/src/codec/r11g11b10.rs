//! Packed unsigned floats: 6-bit mantissa + 5-bit exponent for red and green,
//! 5-bit mantissa + 5-bit exponent for blue, in one little-endian `u32`.

/// Decodes one packed word into three single-precision floats.
pub fn unpack(word: u32) -> [f32; 3] {
    let x = unpack_channel(word & 0x3F, (word >> 6) & 0x1F, 6);
    let y = unpack_channel((word >> 11) & 0x3F, (word >> 17) & 0x1F, 6);
    let z = unpack_channel((word >> 22) & 0x1F, (word >> 27) & 0x1F, 5);
    [f32::from_bits(x), f32::from_bits(y), f32::from_bits(z)]
}

fn unpack_channel(mantissa: u32, exponent: u32, mantissa_bits: u32) -> u32 {
    let shift = 23 - mantissa_bits;
    if exponent == 0x1F {
        return 0x7F80_0000 | (mantissa << shift);
    }
    if exponent != 0 {
        return ((exponent + 112) << 23) | (mantissa << shift);
    }
    if mantissa == 0 {
        return 0;
    }

    // Denormal: shift until the implicit bit shows up.
    let implicit = 1u32 << mantissa_bits;
    let mut exp: i32 = 1;
    let mut m = mantissa;
    loop {
        exp -= 1;
        m <<= 1;
        if m & implicit != 0 {
            break;
        }
    }
    m &= implicit - 1;
    (((exp + 112) as u32) << 23) | (m << shift)
}

/// Encodes three floats into one packed word.
pub fn pack(rgb: [f32; 3]) -> u32 {
    let x = pack_channel(rgb[0].to_bits(), 6);
    let y = pack_channel(rgb[1].to_bits(), 6);
    let z = pack_channel(rgb[2].to_bits(), 5);
    (x & 0x7FF) | ((y & 0x7FF) << 11) | ((z & 0x3FF) << 22)
}

fn pack_channel(bits: u32, mantissa_bits: u32) -> u32 {
    let drop = 23 - mantissa_bits;
    let field_mask = (1u32 << (mantissa_bits + 5)) - 1;
    let exponent_all_ones = 0x1F << mantissa_bits;

    let sign = bits & 0x8000_0000;
    let mut i = bits & 0x7FFF_FFFF;

    if i & 0x7F80_0000 == 0x7F80_0000 {
        if i & 0x7F_FFFF != 0 {
            // NaN keeps some payload bits so it stays a NaN.
            let folded = if mantissa_bits == 6 {
                (i >> 17) | (i >> 11) | (i >> 6) | i
            } else {
                (i >> 18) | (i >> 13) | (i >> 3) | i
            };
            return exponent_all_ones | (folded & ((1 << mantissa_bits) - 1));
        }
        return if sign != 0 { 0 } else { exponent_all_ones };
    }
    if sign != 0 {
        return 0;
    }

    let (overflow, max_finite) = if mantissa_bits == 6 {
        (0x477E_0000, 0x7BF)
    } else {
        (0x477C_0000, 0x3DF)
    };
    if i > overflow {
        return max_finite;
    }

    if i < 0x3880_0000 {
        let shift = 113 - (i >> 23);
        i = (0x80_0000 | (i & 0x7F_FFFF)).checked_shr(shift).unwrap_or(0);
    } else {
        i = i.wrapping_add(0xC800_0000);
    }

    let round_bias = (1u32 << (drop - 1)) - 1;
    ((i + round_bias + ((i >> drop) & 1)) >> drop) & field_mask
}

/// Packed words to RGBA8; channels are clamped to `[0, 1]` before scaling.
pub fn decode(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let count = width as usize * height as usize;
    let mut out = vec![0u8; count * 4];
    for (src, dst) in data.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        let word = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        let rgb = unpack(word);
        for (d, v) in dst.iter_mut().zip(rgb) {
            *d = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        dst[3] = 255;
    }
    out
}

pub fn encode(rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
    let count = width as usize * height as usize;
    let mut out = vec![0u8; count * 4];
    for (src, dst) in rgba.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        let rgb = [
            src[0] as f32 / 255.0,
            src[1] as f32 / 255.0,
            src[2] as f32 / 255.0,
        ];
        dst.copy_from_slice(&pack(rgb).to_le_bytes());
    }
    out
}
