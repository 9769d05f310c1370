//! Pixel-format code tables for the `.tex` container and the DXGI codes used by DDS.
//!
//! Both tables carry DXGI-style labels, which is what lets a texture format be
//! matched to its DDS counterpart by name.

use std::fmt;

use crate::codec::{BlockFamily, BlockFormat, ChannelLayout, ImageCodec};
use crate::error::{Result, TexError};

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $code:literal => $label:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        pub enum $name {
            $($variant = $code,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn code(self) -> u32 {
                self as u32
            }

            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|f| f.name() == name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl TryFrom<u32> for $name {
            type Error = TexError;

            fn try_from(code: u32) -> Result<Self> {
                Self::from_code(code).ok_or_else(|| {
                    TexError::UnsupportedFormat(format!(
                        "unknown {} code {:#x}",
                        stringify!($name),
                        code
                    ))
                })
            }
        }
    };
}

code_table! {
    /// Pixel format codes stored in `.tex` texture records.
    ///
    /// Bits 0..4 hold a variant, 4..8 a size class, 8..12 the channel count,
    /// 12..16 the numeric kind and the remaining bits a sortable family key.
    pub enum TextureFormat {
        R8Typeless = 0x10130 => "R8_TYPELESS",
        R8Unorm = 0x11130 => "R8_UNORM",
        A8Unorm = 0x11131 => "A8_UNORM",
        R8Snorm = 0x13130 => "R8_SNORM",
        R8Uint = 0x14130 => "R8_UINT",
        R8Sint = 0x15130 => "R8_SINT",
        R16Typeless = 0x20140 => "R16_TYPELESS",
        R16Unorm = 0x21140 => "R16_UNORM",
        R16Snorm = 0x23140 => "R16_SNORM",
        R16Uint = 0x24140 => "R16_UINT",
        R16Sint = 0x25140 => "R16_SINT",
        R16Float = 0x26140 => "R16_FLOAT",
        D16Unorm = 0x29140 => "D16_UNORM",
        R8G8Typeless = 0x30240 => "R8G8_TYPELESS",
        R8G8Unorm = 0x31240 => "R8G8_UNORM",
        R8G8Snorm = 0x33240 => "R8G8_SNORM",
        R8G8Uint = 0x34240 => "R8G8_UINT",
        R8G8Sint = 0x35240 => "R8G8_SINT",
        R32Typeless = 0x40150 => "R32_TYPELESS",
        R32Uint = 0x44150 => "R32_UINT",
        R32Sint = 0x45150 => "R32_SINT",
        R32Float = 0x46150 => "R32_FLOAT",
        D32Float = 0x49150 => "D32_FLOAT",
        R16G16Typeless = 0x50250 => "R16G16_TYPELESS",
        R16G16Unorm = 0x51250 => "R16G16_UNORM",
        R16G16Snorm = 0x53250 => "R16G16_SNORM",
        R16G16Uint = 0x54250 => "R16G16_UINT",
        R16G16Sint = 0x55250 => "R16G16_SINT",
        R16G16Float = 0x56250 => "R16G16_FLOAT",
        R11G11B10Float = 0x76350 => "R11G11B10_FLOAT",
        R10G10B10A2Typeless = 0x80450 => "R10G10B10A2_TYPELESS",
        R10G10B10A2Unorm = 0x81450 => "R10G10B10A2_UNORM",
        R10G10B10A2Uint = 0x84450 => "R10G10B10A2_UINT",
        R8G8B8A8Typeless = 0xA0450 => "R8G8B8A8_TYPELESS",
        R8G8B8A8Unorm = 0xA1450 => "R8G8B8A8_UNORM",
        R8G8B8A8UnormSrgb = 0xA2450 => "R8G8B8A8_UNORM_SRGB",
        R8G8B8A8Snorm = 0xA3450 => "R8G8B8A8_SNORM",
        R8G8B8A8Uint = 0xA4450 => "R8G8B8A8_UINT",
        R8G8B8A8Sint = 0xA5450 => "R8G8B8A8_SINT",
        R32G32Typeless = 0xB0260 => "R32G32_TYPELESS",
        R32G32Uint = 0xB4260 => "R32G32_UINT",
        R32G32Sint = 0xB5260 => "R32G32_SINT",
        R32G32Float = 0xB6260 => "R32G32_FLOAT",
        R16G16B16A16Typeless = 0xC0460 => "R16G16B16A16_TYPELESS",
        R16G16B16A16Unorm = 0xC1460 => "R16G16B16A16_UNORM",
        R16G16B16A16Snorm = 0xC3460 => "R16G16B16A16_SNORM",
        R16G16B16A16Uint = 0xC4460 => "R16G16B16A16_UINT",
        R16G16B16A16Sint = 0xC5460 => "R16G16B16A16_SINT",
        R16G16B16A16Float = 0xC6460 => "R16G16B16A16_FLOAT",
        R32G32B32Typeless = 0xD0380 => "R32G32B32_TYPELESS",
        R32G32B32Uint = 0xD4380 => "R32G32B32_UINT",
        R32G32B32Sint = 0xD5380 => "R32G32B32_SINT",
        R32G32B32Float = 0xD6380 => "R32G32B32_FLOAT",
        R32G32B32A32Typeless = 0xE0470 => "R32G32B32A32_TYPELESS",
        R32G32B32A32Uint = 0xE4470 => "R32G32B32A32_UINT",
        R32G32B32A32Sint = 0xE5470 => "R32G32B32A32_SINT",
        R32G32B32A32Float = 0xE6470 => "R32G32B32A32_FLOAT",
        R32G8X24Typeless = 0xF0360 => "R32G8X24_TYPELESS",
        X32TypelessG8X24Uint = 0xF4160 => "X32_TYPELESS_G8X24_UINT",
        R32FloatX8X24Typeless = 0xF6160 => "R32_FLOAT_X8X24_TYPELESS",
        D32FloatS8X24Uint = 0xF9260 => "D32_FLOAT_S8X24_UINT",
        Bc1Unorm = 0x107420 => "BC1_UNORM",
        Bc1UnormSrgb = 0x108420 => "BC1_UNORM_SRGB",
        Bc2Unorm = 0x117430 => "BC2_UNORM",
        Bc2UnormSrgb = 0x118430 => "BC2_UNORM_SRGB",
        Bc3Unorm = 0x127430 => "BC3_UNORM",
        Bc3UnormSrgb = 0x128430 => "BC3_UNORM_SRGB",
        Bc4Unorm = 0x137120 => "BC4_UNORM",
        Bc4Snorm = 0x137121 => "BC4_SNORM",
        Bc5Unorm = 0x147230 => "BC5_UNORM",
        Bc5Snorm = 0x147231 => "BC5_SNORM",
        Bc6hUf16 = 0x157330 => "BC6H_UF16",
        Bc6hSf16 = 0x157331 => "BC6H_SF16",
        Bc7Unorm = 0x167430 => "BC7_UNORM",
        Bc7UnormSrgb = 0x168430 => "BC7_UNORM_SRGB",
    }
}

impl TextureFormat {
    pub fn channel_count(self) -> u32 {
        (self.code() >> 8) & 0xF
    }

    pub fn sort_key(self) -> u32 {
        self.code() >> 16
    }

    pub fn is_block_compressed(self) -> bool {
        self.sort_key() >= 0x10
    }

    /// Codec used to move this format to and from canonical RGBA8.
    pub fn codec(self) -> Result<ImageCodec> {
        use TextureFormat::*;
        let codec = match self {
            R8G8B8A8Unorm | R8G8B8A8UnormSrgb => ImageCodec::Rgba(ChannelLayout::rgba8()),
            R8G8Unorm => ImageCodec::Rgba(ChannelLayout::rg8()),
            R8Unorm => ImageCodec::Rgba(ChannelLayout::r8()),
            R8Snorm => ImageCodec::Rgba(ChannelLayout::r8_snorm()),
            A8Unorm => ImageCodec::Rgba(ChannelLayout::a8()),
            R32G32B32A32Float => ImageCodec::Rgba(ChannelLayout::rgba32_float()),
            R32G32B32Float => ImageCodec::Rgba(ChannelLayout::rgb32_float()),
            R32G32Float | R32G32Uint => ImageCodec::Rgba(ChannelLayout::rg32_float()),
            R32Float => ImageCodec::Rgba(ChannelLayout::r32_float()),
            R16Float => ImageCodec::Rgba(ChannelLayout::r16_float()),
            R16Uint | R16Unorm => ImageCodec::Rgba(ChannelLayout::r16_unorm()),
            R16G16Float => ImageCodec::Rgba(ChannelLayout::rg16_float()),
            R16G16B16A16Float => ImageCodec::Rgba(ChannelLayout::rgba16_float()),
            R11G11B10Float => ImageCodec::R11G11B10,
            R10G10B10A2Unorm => ImageCodec::Rgba(ChannelLayout::rgb10a2()),
            Bc1Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc1)),
            Bc1UnormSrgb => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc1).srgb()),
            Bc2Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc2)),
            Bc2UnormSrgb => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc2).srgb()),
            Bc3Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc3)),
            Bc3UnormSrgb => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc3).srgb()),
            Bc4Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc4)),
            Bc4Snorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc4).signed()),
            Bc5Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc5)),
            Bc5Snorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc5).signed()),
            Bc6hUf16 => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc6h)),
            Bc6hSf16 => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc6h).signed()),
            Bc7Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc7)),
            Bc7UnormSrgb => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc7).srgb()),
            other => {
                return Err(TexError::UnsupportedFormat(format!(
                    "no pixel codec for {other}"
                )));
            }
        };
        Ok(codec)
    }

    /// DXGI code with the same name, used when exporting to DDS.
    pub fn dxgi(self) -> Result<DxgiFormat> {
        DxgiFormat::from_name(self.name()).ok_or_else(|| {
            TexError::UnsupportedFormat(format!("{self} has no DXGI equivalent"))
        })
    }

    /// Picks the texture format matching a DDS format: same name first, then the
    /// first format sharing an identical codec.
    pub fn from_dxgi(dxgi: DxgiFormat) -> Result<Self> {
        let wanted = dxgi.codec()?;
        if let Some(format) = Self::from_name(dxgi.name()) {
            if format.codec().ok() == Some(wanted) {
                return Ok(format);
            }
        }
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.codec().ok() == Some(wanted))
            .ok_or_else(|| {
                TexError::UnsupportedFormat(format!("texture does not support format {dxgi}"))
            })
    }
}

code_table! {
    /// DXGI format codes found in DDS extension headers.
    pub enum DxgiFormat {
        Unknown = 0 => "UNKNOWN",
        R32G32B32A32Typeless = 1 => "R32G32B32A32_TYPELESS",
        R32G32B32A32Float = 2 => "R32G32B32A32_FLOAT",
        R32G32B32A32Uint = 3 => "R32G32B32A32_UINT",
        R32G32B32A32Sint = 4 => "R32G32B32A32_SINT",
        R32G32B32Typeless = 5 => "R32G32B32_TYPELESS",
        R32G32B32Float = 6 => "R32G32B32_FLOAT",
        R32G32B32Uint = 7 => "R32G32B32_UINT",
        R32G32B32Sint = 8 => "R32G32B32_SINT",
        R16G16B16A16Typeless = 9 => "R16G16B16A16_TYPELESS",
        R16G16B16A16Float = 10 => "R16G16B16A16_FLOAT",
        R16G16B16A16Unorm = 11 => "R16G16B16A16_UNORM",
        R16G16B16A16Uint = 12 => "R16G16B16A16_UINT",
        R16G16B16A16Snorm = 13 => "R16G16B16A16_SNORM",
        R16G16B16A16Sint = 14 => "R16G16B16A16_SINT",
        R32G32Typeless = 15 => "R32G32_TYPELESS",
        R32G32Float = 16 => "R32G32_FLOAT",
        R32G32Uint = 17 => "R32G32_UINT",
        R32G32Sint = 18 => "R32G32_SINT",
        R32G8X24Typeless = 19 => "R32G8X24_TYPELESS",
        D32FloatS8X24Uint = 20 => "D32_FLOAT_S8X24_UINT",
        R32FloatX8X24Typeless = 21 => "R32_FLOAT_X8X24_TYPELESS",
        X32TypelessG8X24Uint = 22 => "X32_TYPELESS_G8X24_UINT",
        R10G10B10A2Typeless = 23 => "R10G10B10A2_TYPELESS",
        R10G10B10A2Unorm = 24 => "R10G10B10A2_UNORM",
        R10G10B10A2Uint = 25 => "R10G10B10A2_UINT",
        R11G11B10Float = 26 => "R11G11B10_FLOAT",
        R8G8B8A8Typeless = 27 => "R8G8B8A8_TYPELESS",
        R8G8B8A8Unorm = 28 => "R8G8B8A8_UNORM",
        R8G8B8A8UnormSrgb = 29 => "R8G8B8A8_UNORM_SRGB",
        R8G8B8A8Uint = 30 => "R8G8B8A8_UINT",
        R8G8B8A8Snorm = 31 => "R8G8B8A8_SNORM",
        R8G8B8A8Sint = 32 => "R8G8B8A8_SINT",
        R16G16Typeless = 33 => "R16G16_TYPELESS",
        R16G16Float = 34 => "R16G16_FLOAT",
        R16G16Unorm = 35 => "R16G16_UNORM",
        R16G16Uint = 36 => "R16G16_UINT",
        R16G16Snorm = 37 => "R16G16_SNORM",
        R16G16Sint = 38 => "R16G16_SINT",
        R32Typeless = 39 => "R32_TYPELESS",
        D32Float = 40 => "D32_FLOAT",
        R32Float = 41 => "R32_FLOAT",
        R32Uint = 42 => "R32_UINT",
        R32Sint = 43 => "R32_SINT",
        R24G8Typeless = 44 => "R24G8_TYPELESS",
        D24UnormS8Uint = 45 => "D24_UNORM_S8_UINT",
        R24UnormX8Typeless = 46 => "R24_UNORM_X8_TYPELESS",
        X24TypelessG8Uint = 47 => "X24_TYPELESS_G8_UINT",
        R8G8Typeless = 48 => "R8G8_TYPELESS",
        R8G8Unorm = 49 => "R8G8_UNORM",
        R8G8Uint = 50 => "R8G8_UINT",
        R8G8Snorm = 51 => "R8G8_SNORM",
        R8G8Sint = 52 => "R8G8_SINT",
        R16Typeless = 53 => "R16_TYPELESS",
        R16Float = 54 => "R16_FLOAT",
        D16Unorm = 55 => "D16_UNORM",
        R16Unorm = 56 => "R16_UNORM",
        R16Uint = 57 => "R16_UINT",
        R16Snorm = 58 => "R16_SNORM",
        R16Sint = 59 => "R16_SINT",
        R8Typeless = 60 => "R8_TYPELESS",
        R8Unorm = 61 => "R8_UNORM",
        R8Uint = 62 => "R8_UINT",
        R8Snorm = 63 => "R8_SNORM",
        R8Sint = 64 => "R8_SINT",
        A8Unorm = 65 => "A8_UNORM",
        R1Unorm = 66 => "R1_UNORM",
        R9G9B9E5SharedExp = 67 => "R9G9B9E5_SHAREDEXP",
        R8G8B8G8Unorm = 68 => "R8G8_B8G8_UNORM",
        G8R8G8B8Unorm = 69 => "G8R8_G8B8_UNORM",
        Bc1Typeless = 70 => "BC1_TYPELESS",
        Bc1Unorm = 71 => "BC1_UNORM",
        Bc1UnormSrgb = 72 => "BC1_UNORM_SRGB",
        Bc2Typeless = 73 => "BC2_TYPELESS",
        Bc2Unorm = 74 => "BC2_UNORM",
        Bc2UnormSrgb = 75 => "BC2_UNORM_SRGB",
        Bc3Typeless = 76 => "BC3_TYPELESS",
        Bc3Unorm = 77 => "BC3_UNORM",
        Bc3UnormSrgb = 78 => "BC3_UNORM_SRGB",
        Bc4Typeless = 79 => "BC4_TYPELESS",
        Bc4Unorm = 80 => "BC4_UNORM",
        Bc4Snorm = 81 => "BC4_SNORM",
        Bc5Typeless = 82 => "BC5_TYPELESS",
        Bc5Unorm = 83 => "BC5_UNORM",
        Bc5Snorm = 84 => "BC5_SNORM",
        B5G6R5Unorm = 85 => "B5G6R5_UNORM",
        B5G5R5A1Unorm = 86 => "B5G5R5A1_UNORM",
        B8G8R8A8Unorm = 87 => "B8G8R8A8_UNORM",
        B8G8R8X8Unorm = 88 => "B8G8R8X8_UNORM",
        R10G10B10XrBiasA2Unorm = 89 => "R10G10B10_XR_BIAS_A2_UNORM",
        B8G8R8A8Typeless = 90 => "B8G8R8A8_TYPELESS",
        B8G8R8A8UnormSrgb = 91 => "B8G8R8A8_UNORM_SRGB",
        B8G8R8X8Typeless = 92 => "B8G8R8X8_TYPELESS",
        B8G8R8X8UnormSrgb = 93 => "B8G8R8X8_UNORM_SRGB",
        Bc6hTypeless = 94 => "BC6H_TYPELESS",
        Bc6hUf16 = 95 => "BC6H_UF16",
        Bc6hSf16 = 96 => "BC6H_SF16",
        Bc7Typeless = 97 => "BC7_TYPELESS",
        Bc7Unorm = 98 => "BC7_UNORM",
        Bc7UnormSrgb = 99 => "BC7_UNORM_SRGB",
        B4G4R4A4Unorm = 115 => "B4G4R4A4_UNORM",
    }
}

impl DxgiFormat {
    pub fn is_block_compressed(self) -> bool {
        self.name().starts_with("BC")
    }

    /// Codec for the DXGI formats a DDS file may carry through this tool.
    pub fn codec(self) -> Result<ImageCodec> {
        use DxgiFormat::*;
        let codec = match self {
            R8Unorm => ImageCodec::Rgba(ChannelLayout::r8()),
            R8Snorm => ImageCodec::Rgba(ChannelLayout::r8_snorm()),
            A8Unorm => ImageCodec::Rgba(ChannelLayout::a8()),
            R8G8Unorm => ImageCodec::Rgba(ChannelLayout::rg8()),
            R8G8Snorm => ImageCodec::Rgba(ChannelLayout::rg8_snorm()),
            R16Unorm | R16Uint => ImageCodec::Rgba(ChannelLayout::r16_unorm()),
            R16Float => ImageCodec::Rgba(ChannelLayout::r16_float()),
            R16G16Float => ImageCodec::Rgba(ChannelLayout::rg16_float()),
            R16G16B16A16Float => ImageCodec::Rgba(ChannelLayout::rgba16_float()),
            R32Float => ImageCodec::Rgba(ChannelLayout::r32_float()),
            R32G32Float | R32G32Uint => ImageCodec::Rgba(ChannelLayout::rg32_float()),
            R32G32B32Float => ImageCodec::Rgba(ChannelLayout::rgb32_float()),
            R32G32B32A32Float => ImageCodec::Rgba(ChannelLayout::rgba32_float()),
            R11G11B10Float => ImageCodec::R11G11B10,
            R10G10B10A2Unorm => ImageCodec::Rgba(ChannelLayout::rgb10a2()),
            R8G8B8A8Unorm | R8G8B8A8UnormSrgb => ImageCodec::Rgba(ChannelLayout::rgba8()),
            B8G8R8A8Unorm | B8G8R8A8UnormSrgb => ImageCodec::Rgba(ChannelLayout::bgra8()),
            B8G8R8X8Unorm | B8G8R8X8UnormSrgb => ImageCodec::Rgba(ChannelLayout::bgrx8()),
            B5G6R5Unorm => ImageCodec::Rgba(ChannelLayout::b5g6r5()),
            B4G4R4A4Unorm => ImageCodec::Rgba(ChannelLayout::bgra4()),
            B5G5R5A1Unorm => ImageCodec::Rgba(ChannelLayout::bgr5a1()),
            Bc1Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc1)),
            Bc1UnormSrgb => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc1).srgb()),
            Bc2Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc2)),
            Bc2UnormSrgb => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc2).srgb()),
            Bc3Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc3)),
            Bc3UnormSrgb => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc3).srgb()),
            Bc4Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc4)),
            Bc4Snorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc4).signed()),
            Bc5Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc5)),
            Bc5Snorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc5).signed()),
            Bc6hUf16 => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc6h)),
            Bc6hSf16 => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc6h).signed()),
            Bc7Unorm => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc7)),
            Bc7UnormSrgb => ImageCodec::Block(BlockFormat::new(BlockFamily::Bc7).srgb()),
            other => {
                return Err(TexError::UnsupportedFormat(format!(
                    "Format {other} not supported"
                )));
            }
        };
        Ok(codec)
    }
}
