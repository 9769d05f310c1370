//! DirectDraw Surface files: the 124-byte header, the legacy pixel-format
//! block and the optional DX10 extension header.
//!
//! Surfaces are stored array layer first, then mip level, each tightly packed.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, instrument};

use crate::codec::ImageCodec;
use crate::error::{Result, TexError};
use crate::format::DxgiFormat;
use crate::surface::mip_dimension;

pub const DDS_MAGIC: u32 = 0x2053_4444;
pub const DDS_HEADER_SIZE: u32 = 124;
pub const PIXEL_FORMAT_SIZE: u32 = 32;

pub const FOURCC_DXT1: u32 = 0x3154_5844;
pub const FOURCC_DXT2: u32 = 0x3254_5844;
pub const FOURCC_DXT3: u32 = 0x3354_5844;
pub const FOURCC_DXT4: u32 = 0x3454_5844;
pub const FOURCC_DXT5: u32 = 0x3554_5844;
pub const FOURCC_ATI1: u32 = 0x3149_5441;
pub const FOURCC_ATI2: u32 = 0x3249_5441;
pub const FOURCC_BC4U: u32 = 0x5534_4342;
pub const FOURCC_BC4S: u32 = 0x5334_4342;
pub const FOURCC_BC5U: u32 = 0x5535_4342;
pub const FOURCC_BC5S: u32 = 0x5335_4342;
pub const FOURCC_DX10: u32 = 0x3031_5844;
/// Legacy D3DFMT_R32F code stored directly in the FourCC field.
pub const FOURCC_R32F: u32 = 0x72;

/// Header flags (`DDSD_*`).
pub mod header_flags {
    pub const CAPS: u32 = 0x1;
    pub const HEIGHT: u32 = 0x2;
    pub const WIDTH: u32 = 0x4;
    pub const PITCH: u32 = 0x8;
    pub const PIXELFORMAT: u32 = 0x1000;
    pub const MIPMAPCOUNT: u32 = 0x2_0000;
    pub const LINEARSIZE: u32 = 0x8_0000;
    pub const DEPTH: u32 = 0x80_0000;
}

/// Pixel-format flags (`DDPF_*`).
pub mod pixel_flags {
    pub const ALPHAPIXELS: u32 = 0x1;
    pub const ALPHA: u32 = 0x2;
    pub const FOURCC: u32 = 0x4;
    pub const RGB: u32 = 0x40;
    pub const YUV: u32 = 0x200;
    pub const LUMINANCE: u32 = 0x2_0000;
}

/// Surface capability flags (`DDSCAPS_*`, `DDSCAPS2_*`).
pub mod caps {
    pub const COMPLEX: u32 = 0x8;
    pub const TEXTURE: u32 = 0x1000;
    pub const MIPMAP: u32 = 0x40_0000;
    pub const CUBEMAP_ALL_FACES: u32 = 0xFE00;
}

const RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;
const MISC_TEXTURECUBE: u32 = 0x4;

const BASE_HEADER_FLAGS: u32 = header_flags::CAPS
    | header_flags::HEIGHT
    | header_flags::WIDTH
    | header_flags::PIXELFORMAT
    | header_flags::MIPMAPCOUNT
    | header_flags::LINEARSIZE;

/// R, G, B, A masks.
type Masks = [u32; 4];

const A1R5G5B5: Masks = [0x7C00, 0x03E0, 0x001F, 0x8000];
const X1R5G5B5: Masks = [0x7C00, 0x03E0, 0x001F, 0x0000];
const A4R4G4B4: Masks = [0x0F00, 0x00F0, 0x000F, 0xF000];
const X4R4G4B4: Masks = [0x0F00, 0x00F0, 0x000F, 0x0000];
const R5G6B5: Masks = [0xF800, 0x07E0, 0x001F, 0x0000];
const G8R8: Masks = [0x00FF, 0xFF00, 0x0000, 0x0000];
const R8G8B8: Masks = [0xFF_0000, 0x00_FF00, 0x00_00FF, 0x00_0000];
const A8B8G8R8: Masks = [0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000];
const X8B8G8R8: Masks = [0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0x0000_0000];
const A8R8G8B8: Masks = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000];
const X8R8G8B8: Masks = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0x0000_0000];

const MASKS_16: &[(Masks, DxgiFormat)] = &[
    (A1R5G5B5, DxgiFormat::B5G5R5A1Unorm),
    (X1R5G5B5, DxgiFormat::B5G5R5A1Unorm),
    (A4R4G4B4, DxgiFormat::B4G4R4A4Unorm),
    (X4R4G4B4, DxgiFormat::B4G4R4A4Unorm),
    (R5G6B5, DxgiFormat::B5G6R5Unorm),
    (G8R8, DxgiFormat::R8G8Unorm),
];

const MASKS_32: &[(Masks, DxgiFormat)] = &[
    (A8B8G8R8, DxgiFormat::R8G8B8A8Unorm),
    (X8B8G8R8, DxgiFormat::R8G8B8A8Unorm),
    (A8R8G8B8, DxgiFormat::B8G8R8A8Unorm),
    (X8R8G8B8, DxgiFormat::B8G8R8X8Unorm),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsHeader {
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_count: u32,
    pub reserved: [u32; 11],
}

impl Default for DdsHeader {
    fn default() -> Self {
        Self {
            size: DDS_HEADER_SIZE,
            flags: BASE_HEADER_FLAGS,
            height: 0,
            width: 0,
            pitch_or_linear_size: 0,
            depth: 0,
            mip_count: 1,
            reserved: [0; 11],
        }
    }
}

/// Pixel-format block plus the caps words that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub four_cc: u32,
    pub rgb_bit_count: u32,
    pub masks: Masks,
    pub caps: [u32; 4],
    pub reserved: u32,
}

impl Default for DdsPixelFormat {
    fn default() -> Self {
        Self {
            size: PIXEL_FORMAT_SIZE,
            flags: pixel_flags::FOURCC,
            four_cc: 0,
            rgb_bit_count: 0,
            masks: [0; 4],
            caps: [caps::TEXTURE, 0, 0, 0],
            reserved: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dx10Header {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flags: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

impl Dx10Header {
    fn new(format: DxgiFormat, cubemap: bool) -> Self {
        Self {
            dxgi_format: format.code(),
            resource_dimension: RESOURCE_DIMENSION_TEXTURE2D,
            misc_flags: if cubemap { MISC_TEXTURECUBE } else { 0 },
            array_size: 1,
            misc_flags2: 0,
        }
    }
}

/// A DDS file held fully in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsFile {
    pub header: DdsHeader,
    pub pixel_format: DdsPixelFormat,
    pub dx10: Option<Dx10Header>,
    pub format: DxgiFormat,
    pub data: Vec<u8>,
}

impl DdsFile {
    /// A header-only file; fill `data` with surfaces afterwards.
    pub fn new(
        format: DxgiFormat,
        width: u32,
        height: u32,
        mip_count: u32,
        force_dx10: bool,
        cubemap: bool,
    ) -> Self {
        let mut dds = Self {
            header: DdsHeader {
                width,
                height,
                depth: 1,
                mip_count: mip_count.max(1),
                ..DdsHeader::default()
            },
            pixel_format: DdsPixelFormat::default(),
            dx10: None,
            format,
            data: Vec::new(),
        };
        dds.set_format(format, force_dx10, cubemap);
        dds
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::load(&mut Cursor::new(bytes))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(148 + self.data.len());
        self.save(&mut out)?;
        Ok(out)
    }

    #[instrument(skip_all)]
    pub fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != DDS_MAGIC {
            return Err(TexError::MalformedHeader(format!(
                "expected DDS magic {DDS_MAGIC:#010x}, found {magic:#010x}"
            )));
        }

        let mut header = DdsHeader {
            size: reader.read_u32::<LittleEndian>()?,
            flags: reader.read_u32::<LittleEndian>()?,
            height: reader.read_u32::<LittleEndian>()?,
            width: reader.read_u32::<LittleEndian>()?,
            pitch_or_linear_size: reader.read_u32::<LittleEndian>()?,
            depth: reader.read_u32::<LittleEndian>()?,
            mip_count: reader.read_u32::<LittleEndian>()?,
            reserved: [0; 11],
        };
        if header.size < DDS_HEADER_SIZE {
            return Err(TexError::MalformedHeader(format!(
                "DDS header size {} is smaller than {DDS_HEADER_SIZE}",
                header.size
            )));
        }
        for word in &mut header.reserved {
            *word = reader.read_u32::<LittleEndian>()?;
        }

        let mut pixel_format = DdsPixelFormat {
            size: reader.read_u32::<LittleEndian>()?,
            flags: reader.read_u32::<LittleEndian>()?,
            four_cc: reader.read_u32::<LittleEndian>()?,
            rgb_bit_count: reader.read_u32::<LittleEndian>()?,
            ..DdsPixelFormat::default()
        };
        for mask in &mut pixel_format.masks {
            *mask = reader.read_u32::<LittleEndian>()?;
        }
        for word in &mut pixel_format.caps {
            *word = reader.read_u32::<LittleEndian>()?;
        }
        pixel_format.reserved = reader.read_u32::<LittleEndian>()?;

        // Headers that declare extra bytes keep them after the fixed fields.
        let extra = (header.size - DDS_HEADER_SIZE) as u64;
        std::io::copy(&mut reader.by_ref().take(extra), &mut std::io::sink())?;

        let dx10 = if pixel_format.four_cc == FOURCC_DX10 {
            Some(Dx10Header {
                dxgi_format: reader.read_u32::<LittleEndian>()?,
                resource_dimension: reader.read_u32::<LittleEndian>()?,
                misc_flags: reader.read_u32::<LittleEndian>()?,
                array_size: reader.read_u32::<LittleEndian>()?,
                misc_flags2: reader.read_u32::<LittleEndian>()?,
            })
        } else {
            None
        };

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut dds = Self {
            header,
            pixel_format,
            dx10,
            format: DxgiFormat::Unknown,
            data,
        };
        dds.format = dds.detect_format()?;
        dds.format.codec()?;

        debug!(
            format = %dds.format,
            width = dds.header.width,
            height = dds.header.height,
            mips = dds.header.mip_count,
            arrays = dds.array_count(),
            "loaded dds"
        );
        Ok(dds)
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let h = &self.header;
        writer.write_u32::<LittleEndian>(DDS_MAGIC)?;
        writer.write_u32::<LittleEndian>(DDS_HEADER_SIZE)?;
        for word in [
            h.flags,
            h.height,
            h.width,
            h.pitch_or_linear_size,
            h.depth,
            h.mip_count,
        ] {
            writer.write_u32::<LittleEndian>(word)?;
        }
        for word in h.reserved {
            writer.write_u32::<LittleEndian>(word)?;
        }

        let pf = &self.pixel_format;
        for word in [PIXEL_FORMAT_SIZE, pf.flags, pf.four_cc, pf.rgb_bit_count] {
            writer.write_u32::<LittleEndian>(word)?;
        }
        for word in pf.masks.iter().chain(pf.caps.iter()) {
            writer.write_u32::<LittleEndian>(*word)?;
        }
        writer.write_u32::<LittleEndian>(pf.reserved)?;

        if let Some(dx10) = &self.dx10 {
            for word in [
                dx10.dxgi_format,
                dx10.resource_dimension,
                dx10.misc_flags,
                dx10.array_size,
                dx10.misc_flags2,
            ] {
                writer.write_u32::<LittleEndian>(word)?;
            }
        }
        writer.write_all(&self.data)?;
        Ok(())
    }

    pub fn is_dx10(&self) -> bool {
        self.dx10.is_some()
    }

    pub fn is_cubemap(&self) -> bool {
        self.pixel_format.caps[1] == caps::CUBEMAP_ALL_FACES
            || self
                .dx10
                .is_some_and(|dx10| dx10.misc_flags & MISC_TEXTURECUBE != 0)
    }

    /// Number of array layers, counting each cubemap face as one.
    pub fn array_count(&self) -> u32 {
        let faces = if self.is_cubemap() { 6 } else { 1 };
        match &self.dx10 {
            Some(dx10) => dx10.array_size.max(1) * faces,
            None => faces,
        }
    }

    pub fn mip_count(&self) -> u32 {
        self.header.mip_count.max(1)
    }

    pub fn codec(&self) -> Result<ImageCodec> {
        self.format.codec()
    }

    /// Rewrites the pixel-format block (and DX10 header) to describe `format`.
    ///
    /// Formats with a legacy FourCC or mask description use it unless
    /// `force_dx10` is set; everything else gets a DX10 header.
    pub fn set_format(&mut self, format: DxgiFormat, force_dx10: bool, cubemap: bool) {
        self.format = format;
        self.header.flags = BASE_HEADER_FLAGS;

        let mut caps1 = caps::TEXTURE;
        if self.header.mip_count > 1 {
            caps1 |= caps::COMPLEX | caps::MIPMAP;
        }
        let caps2 = if cubemap { caps::CUBEMAP_ALL_FACES } else { 0 };

        let legacy = if force_dx10 {
            None
        } else {
            legacy_pixel_format(format)
        };
        let (flags, four_cc, rgb_bit_count, masks) = match legacy {
            Some(description) => {
                self.dx10 = None;
                description
            }
            None => {
                self.dx10 = Some(Dx10Header::new(format, cubemap));
                (pixel_flags::FOURCC, FOURCC_DX10, 0, [0; 4])
            }
        };

        self.pixel_format = DdsPixelFormat {
            size: PIXEL_FORMAT_SIZE,
            flags,
            four_cc,
            rgb_bit_count,
            masks,
            caps: [caps1, caps2, 0, 0],
            reserved: 0,
        };
    }

    /// Total bytes of every surface, array layers outermost.
    pub fn calculate_size(&self) -> Result<usize> {
        let codec = self.codec()?;
        let per_layer: usize = (0..self.mip_count())
            .map(|mip| self.surface_size(&codec, mip))
            .sum();
        Ok(per_layer * self.array_count() as usize)
    }

    /// The surface of one array layer and mip level. Coordinates outside the
    /// file yield the whole data blob.
    pub fn surface(&self, array: u32, mip: u32) -> Result<&[u8]> {
        let codec = self.codec()?;
        let mut offset = 0usize;
        for layer in 0..self.array_count() {
            for level in 0..self.mip_count() {
                let size = self.surface_size(&codec, level);
                if layer == array && level == mip {
                    let start = offset.min(self.data.len());
                    let end = (offset + size).min(self.data.len());
                    return Ok(&self.data[start..end]);
                }
                offset += size;
            }
        }
        Ok(&self.data)
    }

    /// Every mip of one array layer, base level first.
    pub fn mip_surfaces(&self, array: u32) -> Result<Vec<Vec<u8>>> {
        (0..self.mip_count())
            .map(|mip| self.surface(array, mip).map(<[u8]>::to_vec))
            .collect()
    }

    fn surface_size(&self, codec: &ImageCodec, mip: u32) -> usize {
        codec.calculate_size(
            mip_dimension(self.header.width, mip),
            mip_dimension(self.header.height, mip),
        )
    }

    fn detect_format(&mut self) -> Result<DxgiFormat> {
        if let Some(dx10) = &self.dx10 {
            return DxgiFormat::try_from(dx10.dxgi_format);
        }

        let pf = self.pixel_format.clone();
        let from_four_cc = match pf.four_cc {
            FOURCC_DXT1 => Some(DxgiFormat::Bc1Unorm),
            FOURCC_DXT2 | FOURCC_DXT3 => Some(DxgiFormat::Bc2Unorm),
            FOURCC_DXT4 | FOURCC_DXT5 => Some(DxgiFormat::Bc3Unorm),
            FOURCC_ATI1 | FOURCC_BC4U => Some(DxgiFormat::Bc4Unorm),
            FOURCC_BC4S => Some(DxgiFormat::Bc4Snorm),
            FOURCC_ATI2 | FOURCC_BC5U => Some(DxgiFormat::Bc5Unorm),
            FOURCC_BC5S => Some(DxgiFormat::Bc5Snorm),
            FOURCC_R32F => Some(DxgiFormat::R32Float),
            _ => None,
        };
        if let Some(format) = from_four_cc {
            return Ok(format);
        }
        if pf.flags & pixel_flags::FOURCC != 0 && pf.four_cc != 0 {
            return Err(TexError::UnsupportedFormat(format!(
                "unknown DDS FourCC {:?}",
                String::from_utf8_lossy(&pf.four_cc.to_le_bytes())
            )));
        }

        if pf.flags & pixel_flags::LUMINANCE != 0 {
            return Ok(DxgiFormat::R8Unorm);
        }
        if pf.flags & (pixel_flags::ALPHA | pixel_flags::RGB) == pixel_flags::ALPHA {
            return Ok(DxgiFormat::A8Unorm);
        }

        let alpha_mask = if pf.flags & pixel_flags::ALPHAPIXELS != 0 {
            pf.masks[3]
        } else {
            0
        };
        let masks = [pf.masks[0], pf.masks[1], pf.masks[2], alpha_mask];

        let table = match pf.rgb_bit_count {
            16 => MASKS_16,
            24 if masks == R8G8B8 => {
                self.expand_bgr24();
                return Ok(DxgiFormat::B8G8R8X8Unorm);
            }
            32 => MASKS_32,
            _ => &[],
        };
        table
            .iter()
            .find(|(candidate, _)| *candidate == masks)
            .map(|&(_, format)| format)
            .ok_or_else(|| {
                TexError::UnsupportedFormat(format!(
                    "unsupported {}-bit DDS masks {:08x?}",
                    pf.rgb_bit_count, masks
                ))
            })
    }

    /// Widens 24-bit BGR pixels to 32-bit BGRX so they fit a DXGI layout.
    fn expand_bgr24(&mut self) {
        debug!("expanding 24-bit BGR surface to BGRX");
        self.data = self
            .data
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 0xFF])
            .collect();
        self.pixel_format.rgb_bit_count = 32;
        self.pixel_format.masks = X8R8G8B8;
    }
}

/// Flags, FourCC, bit count and masks for formats with a pre-DX10 encoding.
fn legacy_pixel_format(format: DxgiFormat) -> Option<(u32, u32, u32, Masks)> {
    use pixel_flags::{ALPHAPIXELS, FOURCC, LUMINANCE, RGB};

    let masked = |flags: u32, bits: u32, masks: Masks| Some((flags, 0, bits, masks));
    let four_cc = |code: u32| Some((FOURCC, code, 0, [0; 4]));
    match format {
        DxgiFormat::R8G8B8A8Unorm => masked(RGB | ALPHAPIXELS, 32, A8B8G8R8),
        DxgiFormat::B8G8R8A8Unorm => masked(RGB | ALPHAPIXELS, 32, A8R8G8B8),
        DxgiFormat::B8G8R8X8Unorm => masked(RGB, 32, X8R8G8B8),
        DxgiFormat::R8Unorm => masked(LUMINANCE, 8, [0xFF, 0, 0, 0]),
        DxgiFormat::B5G6R5Unorm => masked(RGB, 16, R5G6B5),
        DxgiFormat::B4G4R4A4Unorm => masked(RGB | ALPHAPIXELS, 16, A4R4G4B4),
        DxgiFormat::B5G5R5A1Unorm => masked(RGB | ALPHAPIXELS, 16, A1R5G5B5),
        DxgiFormat::Bc1Unorm => four_cc(FOURCC_DXT1),
        DxgiFormat::Bc2Unorm => four_cc(FOURCC_DXT3),
        DxgiFormat::Bc3Unorm => four_cc(FOURCC_DXT5),
        DxgiFormat::Bc4Unorm => four_cc(FOURCC_BC4U),
        DxgiFormat::Bc4Snorm => four_cc(FOURCC_BC4S),
        DxgiFormat::Bc5Unorm => four_cc(FOURCC_BC5U),
        DxgiFormat::Bc5Snorm => four_cc(FOURCC_BC5S),
        _ => None,
    }
}
