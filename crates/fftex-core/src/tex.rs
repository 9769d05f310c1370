//! The `.tex` texture container.
//!
//! Layout, all little-endian and packed:
//!
//! ```text
//! header            40 bytes
//! texture records   32 bytes each
//! chunk descriptors 16 bytes each
//! (pad to 16)
//! chunk payloads    each preceded by padding to 8
//! ```
//!
//! Offsets are never trusted from a previous save; [`TexDocument::write`]
//! recomputes every offset and size field.

use std::io::{Cursor, Read, Seek, Write};

use bitfield::bitfield;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, instrument};

use crate::binary::{OffsetPatches, TemporarySeek, offset_u32, pad_to, read_bytes};
use crate::chunk::{Chunk, ChunkCodec, ChunkFlags, ChunkMiscFlags, DeflateCodec};
use crate::config::AlignmentPolicy;
use crate::error::{Result, TexError};
use crate::format::TextureFormat;
use crate::surface;

pub const TEX_MAGIC: [u8; 4] = *b"TEX ";
pub const HEADER_SIZE: usize = 40;
pub const TEXTURE_RECORD_SIZE: usize = 32;
pub const CHUNK_DESCRIPTOR_SIZE: usize = 16;

/// Byte offset of `ChunkOffset` inside a texture record.
const CHUNK_OFFSET_FIELD: usize = 16;
const DATA_ALIGNMENT: usize = 16;
const CHUNK_ALIGNMENT: usize = 8;

bitfield! {
    /// Texture flags word.
    ///
    /// - Bits 0-1: dimension kind
    /// - Bit 2: signed distance field
    /// - Bit 3: no separate chunk
    /// - Bits 4-5, 6-7: not understood, preserved
    /// - Bits 8-31: not understood, preserved
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags(pub u32);
    impl Debug;
    u32;

    pub dimension, set_dimension: 1, 0;
    pub signed_distance_field, set_signed_distance_field: 2;
    pub no_chunks, set_no_chunks: 3;
    pub reserved_low, set_reserved_low: 5, 4;
    pub reserved_high, set_reserved_high: 7, 6;
    pub reserved_tail, set_reserved_tail: 31, 8;
}

impl Default for TextureFlags {
    fn default() -> Self {
        let mut flags = TextureFlags(0);
        flags.set_dimension(1);
        flags.set_reserved_high(2);
        flags.set_reserved_tail(0xFF_FFFF);
        flags
    }
}

/// Document header. Fields this tool does not interpret are kept so they survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexHeader {
    pub version: u8,
    pub flags: u8,
    pub unknown: u8,
    pub padding: u8,
    pub texture_count: u8,
    pub padding2: u8,
    pub chunk_count: u16,
    pub unknown2: u32,
    pub unknown3: u32,
    pub unknown_flags: u32,
    pub reserved: [u32; 4],
}

impl Default for TexHeader {
    fn default() -> Self {
        Self {
            version: 4,
            flags: 1,
            unknown: 16,
            padding: 0,
            texture_count: 0,
            padding2: 0,
            chunk_count: 0,
            unknown2: 0,
            unknown3: 0,
            unknown_flags: 0x13,
            reserved: [0; 4],
        }
    }
}

impl TexHeader {
    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != TEX_MAGIC {
            return Err(TexError::MalformedHeader(format!(
                "expected magic {:?}, found {:?}",
                String::from_utf8_lossy(&TEX_MAGIC),
                String::from_utf8_lossy(&magic)
            )));
        }

        let mut header = Self {
            version: reader.read_u8()?,
            flags: reader.read_u8()?,
            unknown: reader.read_u8()?,
            padding: reader.read_u8()?,
            texture_count: reader.read_u8()?,
            padding2: reader.read_u8()?,
            chunk_count: reader.read_u16::<LittleEndian>()?,
            unknown2: reader.read_u32::<LittleEndian>()?,
            unknown3: reader.read_u32::<LittleEndian>()?,
            unknown_flags: reader.read_u32::<LittleEndian>()?,
            reserved: [0; 4],
        };
        for word in &mut header.reserved {
            *word = reader.read_u32::<LittleEndian>()?;
        }
        Ok(header)
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&TEX_MAGIC)?;
        writer.write_u8(self.version)?;
        writer.write_u8(self.flags)?;
        writer.write_u8(self.unknown)?;
        writer.write_u8(self.padding)?;
        writer.write_u8(self.texture_count)?;
        writer.write_u8(self.padding2)?;
        writer.write_u16::<LittleEndian>(self.chunk_count)?;
        writer.write_u32::<LittleEndian>(self.unknown2)?;
        writer.write_u32::<LittleEndian>(self.unknown3)?;
        writer.write_u32::<LittleEndian>(self.unknown_flags)?;
        for word in self.reserved {
            writer.write_u32::<LittleEndian>(word)?;
        }
        Ok(())
    }
}

/// One image resource and the chunks holding its hardware-layout surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub flags: TextureFlags,
    pub format: TextureFormat,
    pub mip_count: u16,
    /// Logical (unpadded) width of mip 0.
    pub width: u16,
    /// Logical (unpadded) height of mip 0.
    pub height: u16,
    pub depth: u16,
    pub color: u32,
    /// Values from the last read or write.
    pub chunk_offset: u32,
    pub chunk_size: u32,
    pub chunk_index: u16,
    pub chunk_count: u16,
    pub chunks: Vec<Chunk>,
}

impl Default for Texture {
    fn default() -> Self {
        Self {
            flags: TextureFlags::default(),
            format: TextureFormat::Bc7UnormSrgb,
            mip_count: 1,
            width: 0,
            height: 0,
            depth: 1,
            color: 0xFFA6_AFC7,
            chunk_offset: 0,
            chunk_size: 0,
            chunk_index: 0,
            chunk_count: 0,
            chunks: Vec::new(),
        }
    }
}

impl Texture {
    pub fn new(format: TextureFormat, width: u16, height: u16, mip_count: u16) -> Self {
        Self {
            format,
            width,
            height,
            mip_count,
            ..Self::default()
        }
    }

    /// Concatenated chunk payloads, clamped to the padded size of the mip chain.
    pub fn image_data(&self, policy: AlignmentPolicy) -> Result<Vec<u8>> {
        if let Some(index) = self.chunks.iter().position(|c| !c.is_decoded()) {
            return Err(TexError::UnimplementedCodec(format!(
                "chunk {index} uses a compression stream this reader cannot decode"
            )));
        }
        let mut data: Vec<u8> = self.chunks.iter().flat_map(|c| c.data().iter().copied()).collect();
        let expected = surface::hardware_size(self, policy)?;
        if data.len() > expected {
            debug!(stored = data.len(), expected, "dropping trailing chunk bytes");
            data.truncate(expected);
        }
        Ok(data)
    }

    /// Per-mip buffers with the hardware padding removed.
    pub fn linear_mips(&self, policy: AlignmentPolicy) -> Result<Vec<Vec<u8>>> {
        surface::to_linear(self, policy, &self.image_data(policy)?)
    }

    /// Stores hardware-layout mip buffers: mip 0 in chunk 0, every further
    /// mip concatenated into chunk 1.
    pub fn set_image_data(&mut self, mips: Vec<Vec<u8>>) -> Result<()> {
        let mut mips = mips.into_iter();
        let base = mips.next().ok_or_else(|| {
            TexError::InvalidInput("set_image_data needs at least one mip level".into())
        })?;
        let tail: Vec<u8> = mips.flatten().collect();

        let mut previous = std::mem::take(&mut self.chunks).into_iter();
        self.chunks.push(reuse_chunk(previous.next(), base, 0, 0));
        if !tail.is_empty() {
            self.chunks.push(reuse_chunk(previous.next(), tail, 1, 1));
        }
        Ok(())
    }
}

fn reuse_chunk(existing: Option<Chunk>, data: Vec<u8>, chunk_type: u32, index: u32) -> Chunk {
    match existing {
        Some(mut chunk) => {
            if chunk.data() != data.as_slice() {
                chunk.set_data(data);
            }
            chunk.flags.set_chunk_type(chunk_type);
            chunk.misc.set_chunk_index(index);
            chunk
        }
        None => Chunk::new(data, chunk_type, index),
    }
}

/// A parsed `.tex` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexDocument {
    pub header: TexHeader,
    pub textures: Vec<Texture>,
}

impl Default for TexDocument {
    fn default() -> Self {
        Self {
            header: TexHeader::default(),
            textures: vec![Texture::default()],
        }
    }
}

impl TexDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut Cursor::new(bytes), &DeflateCodec::default())
    }

    pub fn to_bytes(&mut self, codec: &dyn ChunkCodec) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out, codec)?;
        Ok(out)
    }

    #[instrument(skip_all)]
    pub fn read<R: Read + Seek>(reader: &mut R, codec: &dyn ChunkCodec) -> Result<Self> {
        let header = TexHeader::read(reader)?;

        let mut textures = Vec::with_capacity(header.texture_count as usize);
        for _ in 0..header.texture_count {
            textures.push(read_texture_record(reader)?);
        }

        let mut chunks = Vec::with_capacity(header.chunk_count as usize);
        for index in 0..header.chunk_count {
            let data_offset = reader.read_u32::<LittleEndian>()?;
            let flags = ChunkFlags(reader.read_u32::<LittleEndian>()?);
            let decompressed_size = reader.read_u32::<LittleEndian>()?;
            let misc = ChunkMiscFlags(reader.read_u32::<LittleEndian>()?);

            let stored = {
                let mut guard = TemporarySeek::new(reader, data_offset as u64)?;
                read_bytes(&mut *guard, flags.compressed_size() as usize)?
            };
            debug!(
                index,
                data_offset,
                stored = stored.len(),
                decompressed_size,
                "read chunk"
            );
            chunks.push(Chunk::from_stored(flags, decompressed_size, misc, stored, codec));
        }

        for (i, texture) in textures.iter_mut().enumerate() {
            let start = texture.chunk_index as usize;
            let end = start + texture.chunk_count as usize;
            let run = chunks.get(start..end).ok_or_else(|| {
                TexError::MalformedHeader(format!(
                    "texture {i} references chunks {start}..{end} but the file has {}",
                    chunks.len()
                ))
            })?;
            texture.chunks = run.to_vec();
        }

        debug!(textures = textures.len(), chunks = chunks.len(), "parsed tex document");
        Ok(Self { header, textures })
    }

    /// Serializes the document, recomputing counts, sizes and offsets.
    ///
    /// The whole file is assembled in memory and handed to `writer` in one
    /// call, so a failure leaves `writer` untouched.
    #[instrument(skip_all)]
    pub fn write<W: Write>(&mut self, writer: &mut W, codec: &dyn ChunkCodec) -> Result<()> {
        let total_chunks: usize = self.textures.iter().map(|t| t.chunks.len()).sum();
        self.header.texture_count = u8::try_from(self.textures.len()).map_err(|_| {
            TexError::InvalidInput(format!("{} textures exceed the limit of 255", self.textures.len()))
        })?;
        self.header.chunk_count = u16::try_from(total_chunks).map_err(|_| {
            TexError::InvalidInput(format!("{total_chunks} chunks exceed the limit of 65535"))
        })?;

        let mut payloads = Vec::with_capacity(total_chunks);
        for chunk in self.textures.iter_mut().flat_map(|t| t.chunks.iter_mut()) {
            payloads.push(chunk.encode_payload(codec)?);
        }

        let mut buf = Vec::new();
        let mut patches = OffsetPatches::new();
        self.header.write(&mut buf)?;

        let texture_header_pos = buf.len();
        let mut chunk_index = 0u16;
        for texture in &mut self.textures {
            let mut total = 0u32;
            for chunk in &texture.chunks {
                total += total.wrapping_neg() % CHUNK_ALIGNMENT as u32;
                total += chunk.flags.compressed_size();
            }
            texture.chunk_size = total;
            texture.chunk_index = chunk_index;
            texture.chunk_count = texture.chunks.len() as u16;
            write_texture_record(&mut buf, texture)?;
            chunk_index += texture.chunk_count;
        }

        let chunk_start = buf.len();
        for chunk in self.textures.iter().flat_map(|t| t.chunks.iter()) {
            buf.write_u32::<LittleEndian>(0)?;
            buf.write_u32::<LittleEndian>(chunk.flags.0)?;
            buf.write_u32::<LittleEndian>(chunk.decompressed_size())?;
            buf.write_u32::<LittleEndian>(chunk.misc.0)?;
        }

        pad_to(&mut buf, DATA_ALIGNMENT);

        let mut payloads = payloads.into_iter();
        let mut global = 0usize;
        for (t, texture) in self.textures.iter_mut().enumerate() {
            let record_offset = texture_header_pos + t * TEXTURE_RECORD_SIZE + CHUNK_OFFSET_FIELD;
            if texture.chunks.is_empty() {
                texture.chunk_offset = offset_u32(buf.len())?;
                patches.record(record_offset, texture.chunk_offset);
            }
            for (c, payload) in payloads.by_ref().take(texture.chunks.len()).enumerate() {
                pad_to(&mut buf, CHUNK_ALIGNMENT);
                let position = offset_u32(buf.len())?;
                if c == 0 {
                    texture.chunk_offset = position;
                    patches.record(record_offset, position);
                }
                patches.record(chunk_start + global * CHUNK_DESCRIPTOR_SIZE, position);
                buf.extend_from_slice(&payload);
                global += 1;
            }
        }

        patches.apply(&mut buf)?;
        debug!(bytes = buf.len(), patches = patches.len(), "serialized tex document");
        writer.write_all(&buf)?;
        Ok(())
    }
}

fn read_texture_record<R: Read>(reader: &mut R) -> Result<Texture> {
    let flags = TextureFlags(reader.read_u32::<LittleEndian>()?);
    let format = TextureFormat::try_from(reader.read_u32::<LittleEndian>()?)?;
    Ok(Texture {
        flags,
        format,
        mip_count: reader.read_u16::<LittleEndian>()?,
        width: reader.read_u16::<LittleEndian>()?,
        height: reader.read_u16::<LittleEndian>()?,
        depth: reader.read_u16::<LittleEndian>()?,
        chunk_offset: reader.read_u32::<LittleEndian>()?,
        chunk_size: reader.read_u32::<LittleEndian>()?,
        color: reader.read_u32::<LittleEndian>()?,
        chunk_index: reader.read_u16::<LittleEndian>()?,
        chunk_count: reader.read_u16::<LittleEndian>()?,
        chunks: Vec::new(),
    })
}

fn write_texture_record<W: Write>(writer: &mut W, texture: &Texture) -> Result<()> {
    writer.write_u32::<LittleEndian>(texture.flags.0)?;
    writer.write_u32::<LittleEndian>(texture.format.code())?;
    writer.write_u16::<LittleEndian>(texture.mip_count)?;
    writer.write_u16::<LittleEndian>(texture.width)?;
    writer.write_u16::<LittleEndian>(texture.height)?;
    writer.write_u16::<LittleEndian>(texture.depth)?;
    // Patched once the payload position is known.
    writer.write_u32::<LittleEndian>(0)?;
    writer.write_u32::<LittleEndian>(texture.chunk_size)?;
    writer.write_u32::<LittleEndian>(texture.color)?;
    writer.write_u16::<LittleEndian>(texture.chunk_index)?;
    writer.write_u16::<LittleEndian>(texture.chunk_count)?;
    Ok(())
}
