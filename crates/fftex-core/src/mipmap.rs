use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Default mip count for a new image: `max(floor(log2(max(w, h))), 1)`.
pub fn mip_count(width: u32, height: u32) -> u32 {
    width.max(height).max(1).ilog2().max(1)
}

/// Number of levels until both dimensions reach 1.
pub fn full_chain_length(width: u32, height: u32) -> u32 {
    width.max(height).max(1).ilog2() + 1
}

/// Builds `count` levels, base first. Every level is resampled from the base
/// image with Lanczos3; generation stops early once a 1x1 level is reached.
pub fn generate_mipmaps(base: &RgbaImage, count: u32) -> Vec<RgbaImage> {
    let mut levels = Vec::with_capacity(count.max(1) as usize);
    levels.push(base.clone());

    let (mut width, mut height) = base.dimensions();
    while levels.len() < count as usize && (width > 1 || height > 1) {
        width = (width / 2).max(1);
        height = (height / 2).max(1);
        levels.push(imageops::resize(base, width, height, FilterType::Lanczos3));
    }
    levels
}
