use thiserror::Error;

#[derive(Debug, Error)]
pub enum TexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Malformed header: {0}")]
    MalformedHeader(String),
    #[error("Format not supported: {0}")]
    UnsupportedFormat(String),
    #[error("Truncated data: needed {needed} bytes, {available} available")]
    TruncatedData { needed: u64, available: u64 },
    #[error("Codec not implemented: {0}")]
    UnimplementedCodec(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Compression error: {0}")]
    Compression(String),
}

pub type Result<T> = std::result::Result<T, TexError>;
