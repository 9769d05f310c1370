//! Conversion settings shared by the export and replace paths.
//! Key notes:
//!   - `alignment` picks how hardware row padding is derived (see [`AlignmentPolicy`])
//!   - `bc_quality` only affects encoding; decoding is quality independent
//!   - `compression_level` feeds the chunk codec when a `.tex` is written

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Row-pitch derivation used for hardware surfaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentPolicy {
    /// Round the mip width in texels (64, with 128/256 exceptions).
    #[default]
    Dimension,
    /// Round the row pitch in bytes up to 256; the last mip of a chain is stored tightly.
    Pitch,
}

impl FromStr for AlignmentPolicy {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dimension" | "dim" => Ok(Self::Dimension),
            "pitch" => Ok(Self::Pitch),
            _ => Err(()),
        }
    }
}

/// Block-compression encoder effort.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BcQuality {
    UltraFast,
    VeryFast,
    #[default]
    Fast,
    Basic,
    Slow,
}

impl FromStr for BcQuality {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ultra_fast" | "ultrafast" => Ok(Self::UltraFast),
            "very_fast" | "veryfast" => Ok(Self::VeryFast),
            "fast" => Ok(Self::Fast),
            "basic" => Ok(Self::Basic),
            "slow" => Ok(Self::Slow),
            _ => Err(()),
        }
    }
}

/// Target written when a `.tex` is exported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Dds,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Dds => "dds",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().trim_start_matches('.') {
            "png" => Ok(Self::Png),
            "dds" => Ok(Self::Dds),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscodeConfig {
    /// Hardware row alignment policy.
    #[serde(default)]
    pub alignment: AlignmentPolicy,
    /// Encoder effort for block-compressed formats.
    #[serde(default)]
    pub bc_quality: BcQuality,
    /// Deflate level (0..=9) used for new chunks.
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Export target for `.tex` inputs.
    #[serde(default)]
    pub export_format: ExportFormat,
    /// Always write a DX10 extension header on DDS export.
    #[serde(default)]
    pub force_dx10: bool,
    /// Keep the texture's mip count on image replace when it exceeds the computed one.
    #[serde(default = "default_keep_mip_count")]
    pub keep_mip_count: bool,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            alignment: AlignmentPolicy::default(),
            bc_quality: BcQuality::default(),
            compression_level: default_compression_level(),
            export_format: ExportFormat::default(),
            force_dx10: false,
            keep_mip_count: default_keep_mip_count(),
        }
    }
}

impl TranscodeConfig {
    /// Returns a builder seeded with defaults.
    pub fn builder() -> TranscodeConfigBuilder {
        TranscodeConfigBuilder::new()
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::TexError;

        if self.compression_level > 9 {
            return Err(TexError::InvalidConfig(format!(
                "compression_level must be within 0..=9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }
}

fn default_compression_level() -> u32 {
    6
}
fn default_keep_mip_count() -> bool {
    true
}

/// Builder for `TranscodeConfig`.
#[derive(Debug, Default, Clone)]
pub struct TranscodeConfigBuilder {
    cfg: TranscodeConfig,
}

impl TranscodeConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: TranscodeConfig::default(),
        }
    }
    pub fn alignment(mut self, v: AlignmentPolicy) -> Self {
        self.cfg.alignment = v;
        self
    }
    pub fn bc_quality(mut self, v: BcQuality) -> Self {
        self.cfg.bc_quality = v;
        self
    }
    pub fn compression_level(mut self, v: u32) -> Self {
        self.cfg.compression_level = v;
        self
    }
    pub fn export_format(mut self, v: ExportFormat) -> Self {
        self.cfg.export_format = v;
        self
    }
    pub fn force_dx10(mut self, v: bool) -> Self {
        self.cfg.force_dx10 = v;
        self
    }
    pub fn keep_mip_count(mut self, v: bool) -> Self {
        self.cfg.keep_mip_count = v;
        self
    }
    pub fn build(self) -> TranscodeConfig {
        self.cfg
    }
}
