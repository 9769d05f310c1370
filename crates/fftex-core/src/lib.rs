//! Core library for converting `.tex` game textures to and from DDS and PNG.
//!
//! - Container: `TexDocument` reads and writes the chunked `.tex` format
//! - Surfaces: `surface` removes and re-applies hardware row padding per mip
//! - Codecs: bit-packed channel layouts, 11:11:10 floats and BC1-BC7 blocks
//! - Pipeline: `export_dds`, `export_image`, `replace_from_dds`, `replace_from_image`
//!
//! Quick example:
//! ```ignore
//! use fftex_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let doc = TexDocument::from_bytes(&std::fs::read("albedo.tex")?)?;
//! let png = export_image(&doc.textures[0], &TranscodeConfig::default())?;
//! png.save("albedo.tex.png")?;
//! # Ok(()) }
//! ```

pub mod binary;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod dds;
pub mod error;
pub mod format;
pub mod mipmap;
pub mod pipeline;
pub mod surface;
pub mod tex;

pub use chunk::{Chunk, ChunkCodec, DeflateCodec};
pub use config::*;
pub use dds::DdsFile;
pub use error::*;
pub use format::{DxgiFormat, TextureFormat};
pub use pipeline::*;
pub use tex::{TexDocument, TexHeader, Texture, TextureFlags};

/// Convenience prelude for common types and functions.
/// Importing `fftex_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::chunk::{Chunk, ChunkCodec, ChunkStorage, DeflateCodec};
    pub use crate::codec::{BlockFamily, BlockFormat, ChannelKind, ChannelLayout, ImageCodec};
    pub use crate::config::{
        AlignmentPolicy, BcQuality, ExportFormat, TranscodeConfig, TranscodeConfigBuilder,
    };
    pub use crate::dds::DdsFile;
    pub use crate::error::{Result, TexError};
    pub use crate::format::{DxgiFormat, TextureFormat};
    pub use crate::tex::{TexDocument, TexHeader, Texture, TextureFlags};
    pub use crate::{
        export_dds, export_image, export_to_bytes, export_to_file, replace_from_dds,
        replace_from_file, replace_from_image,
    };
}
