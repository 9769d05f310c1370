//! Conversions between a `.tex` texture and DDS files or raster images.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};
use tracing::{debug, info, instrument};

use crate::config::{ExportFormat, TranscodeConfig};
use crate::dds::DdsFile;
use crate::error::{Result, TexError};
use crate::format::TextureFormat;
use crate::mipmap;
use crate::surface;
use crate::tex::Texture;

/// Builds a DDS holding every mip of `texture` with hardware padding removed.
#[instrument(skip_all, fields(format = %texture.format, width = texture.width, height = texture.height))]
pub fn export_dds(texture: &Texture, config: &TranscodeConfig) -> Result<DdsFile> {
    config.validate()?;
    let dxgi = texture.format.dxgi()?;
    let mips = texture.linear_mips(config.alignment)?;

    let mut dds = DdsFile::new(
        dxgi,
        texture.width as u32,
        texture.height as u32,
        texture.mip_count.max(1) as u32,
        config.force_dx10,
        false,
    );
    dds.header.depth = texture.depth as u32;
    dds.data = mips.concat();
    dds.header.pitch_or_linear_size = dds.data.len() as u32;
    debug!(dxgi = %dxgi, bytes = dds.data.len(), "built dds");
    Ok(dds)
}

/// Decodes mip 0 of `texture` at its logical size.
#[instrument(skip_all, fields(format = %texture.format, width = texture.width, height = texture.height))]
pub fn export_image(texture: &Texture, config: &TranscodeConfig) -> Result<RgbaImage> {
    config.validate()?;
    let codec = texture.format.codec()?;
    let mips = texture.linear_mips(config.alignment)?;
    let base = mips
        .first()
        .ok_or_else(|| TexError::InvalidInput("texture has no mip levels".into()))?;

    let (width, height) = (texture.width as u32, texture.height as u32);
    let rgba = codec.decode(base, width, height)?;
    RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        TexError::InvalidInput(format!("decoded buffer does not fit {width}x{height}"))
    })
}

/// Replaces the pixel data, dimensions and format of `texture` with array layer 0 of `dds`.
#[instrument(skip_all, fields(format = %dds.format))]
pub fn replace_from_dds(texture: &mut Texture, dds: &DdsFile, config: &TranscodeConfig) -> Result<()> {
    config.validate()?;
    let format = TextureFormat::from_dxgi(dds.format)?;
    let width = dimension_u16(dds.header.width, "width")?;
    let height = dimension_u16(dds.header.height, "height")?;
    let mip_count = u16::try_from(dds.mip_count()).map_err(|_| {
        TexError::InvalidInput(format!("{} mip levels is out of range", dds.mip_count()))
    })?;

    texture.format = format;
    texture.width = width;
    texture.height = height;
    texture.depth = dds.header.depth.clamp(1, u16::MAX as u32) as u16;
    texture.mip_count = mip_count;

    let mips = dds.mip_surfaces(0)?;
    let hardware = surface::to_hardware_levels(texture, config.alignment, &mips)?;
    texture.set_image_data(hardware)?;
    info!(format = %format, width, height, mip_count, "replaced texture from dds");
    Ok(())
}

/// Re-encodes `texture` (keeping its format) from an RGBA image, generating mips.
#[instrument(skip_all, fields(format = %texture.format))]
pub fn replace_from_image(
    texture: &mut Texture,
    image: &RgbaImage,
    config: &TranscodeConfig,
) -> Result<()> {
    config.validate()?;
    let (w, h) = image.dimensions();
    let width = dimension_u16(w, "width")?;
    let height = dimension_u16(h, "height")?;
    if width == 0 || height == 0 {
        return Err(TexError::InvalidInput("image has no pixels".into()));
    }
    let codec = texture.format.codec()?;

    let mut mip_count = mipmap::mip_count(w, h);
    if config.keep_mip_count {
        mip_count = mip_count.max(texture.mip_count as u32);
    }
    mip_count = mip_count.min(mipmap::full_chain_length(w, h));

    texture.width = width;
    texture.height = height;
    texture.mip_count = mip_count as u16;

    let encoded = mipmap::generate_mipmaps(image, mip_count)
        .iter()
        .map(|level| codec.encode(level.as_raw(), level.width(), level.height(), config.bc_quality))
        .collect::<Result<Vec<_>>>()?;

    let hardware = surface::to_hardware_levels(texture, config.alignment, &encoded)?;
    texture.set_image_data(hardware)?;
    info!(width, height, mip_count, "replaced texture from image");
    Ok(())
}

/// Encodes `texture` as a DDS or PNG file image, following `config.export_format`.
pub fn export_to_bytes(texture: &Texture, config: &TranscodeConfig) -> Result<Vec<u8>> {
    match config.export_format {
        ExportFormat::Dds => export_dds(texture, config)?.to_bytes(),
        ExportFormat::Png => {
            let mut out = Cursor::new(Vec::new());
            export_image(texture, config)?.write_to(&mut out, ImageFormat::Png)?;
            Ok(out.into_inner())
        }
    }
}

/// Writes `texture` to `path` as DDS or PNG, following `config.export_format`.
pub fn export_to_file(texture: &Texture, path: &Path, config: &TranscodeConfig) -> Result<()> {
    fs::write(path, export_to_bytes(texture, config)?)?;
    debug!(path = %path.display(), "exported texture");
    Ok(())
}

/// Replaces `texture` from a `.dds` file or any raster format the `image` crate reads.
pub fn replace_from_file(texture: &mut Texture, path: &Path, config: &TranscodeConfig) -> Result<()> {
    let is_dds = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dds"));
    if is_dds {
        let dds = DdsFile::from_bytes(&fs::read(path)?)?;
        replace_from_dds(texture, &dds, config)
    } else {
        let image = image::open(path)?.into_rgba8();
        replace_from_image(texture, &image, config)
    }
}

fn dimension_u16(value: u32, what: &str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| TexError::InvalidInput(format!("{what} {value} exceeds 65535")))
}
