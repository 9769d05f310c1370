use std::ffi::OsString;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{ArgAction, Parser};
use fftex_core::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{error, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "fftex",
    about = "Convert .tex textures to PNG/DDS and back",
    version,
    author
)]
struct Cli {
    /// Files to convert: `*.tex` exports, `*.tex.png` / `*.tex.dds` replace the sibling `.tex`.
    /// A `.tex` whose textures cannot all be exported produces no output files.
    #[arg(required = true, help_heading = "Input/Output")]
    files: Vec<PathBuf>,
    /// Export `.tex` files as DDS instead of PNG (legacy `-dds` is accepted)
    #[arg(long, default_value_t = false, help_heading = "Input/Output")]
    dds: bool,

    /// Hardware row alignment: dimension|pitch
    #[arg(long, help_heading = "Surface")]
    alignment: Option<String>,
    /// BC encoder effort: ultra_fast|very_fast|fast|basic|slow
    #[arg(long, help_heading = "Encoding")]
    bc_quality: Option<String>,
    /// Deflate level for rewritten chunks (0-9)
    #[arg(long, help_heading = "Encoding")]
    compression_level: Option<u32>,
    /// Always write a DX10 header on DDS export
    #[arg(long, default_value_t = false, help_heading = "Encoding")]
    force_dx10: bool,
    /// Keep a texture's larger mip count when replacing from an image
    #[arg(long, default_value_t = true, action = ArgAction::Set, help_heading = "Encoding")]
    keep_mip_count: bool,

    /// Optional YAML config file; its values override flags
    #[arg(long, help_heading = "Config")]
    config: Option<PathBuf>,
    /// Print the effective config and exit
    #[arg(long, default_value_t = false, help_heading = "Config")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Config")]
    print_config_format: String,

    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action = ArgAction::Set, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(short, long, default_value_t = false, help_heading = "Logging/UX")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(normalize_legacy_args(std::env::args_os()));
    init_tracing_with_level(cli.quiet, cli.verbose);

    let cfg = build_config(&cli)?;
    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let bar = if cli.progress && !cli.quiet {
        let b = ProgressBar::new(cli.files.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} converting {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };

    #[cfg(feature = "parallel")]
    let failures = cli
        .files
        .par_iter()
        .filter(|p| !convert_one(p, &cfg, bar.as_ref()))
        .count();
    #[cfg(not(feature = "parallel"))]
    let failures = cli
        .files
        .iter()
        .filter(|p| !convert_one(p, &cfg, bar.as_ref()))
        .count();

    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    if failures > 0 {
        warn!(failures, total = cli.files.len(), "some files failed to convert");
    }
    println!("Finished converting!");
    Ok(())
}

/// Maps the single-dash switches older scripts pass to their clap spelling.
fn normalize_legacy_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .filter(|a| a != "-png")
        .map(|a| if a == "-dds" { OsString::from("--dds") } else { a })
        .collect()
}

fn build_config(cli: &Cli) -> anyhow::Result<TranscodeConfig> {
    let mut builder = TranscodeConfig::builder()
        .export_format(if cli.dds { ExportFormat::Dds } else { ExportFormat::Png })
        .force_dx10(cli.force_dx10)
        .keep_mip_count(cli.keep_mip_count);
    if let Some(s) = &cli.alignment {
        builder = builder.alignment(parse_alignment(s)?);
    }
    if let Some(s) = &cli.bc_quality {
        builder = builder.bc_quality(parse_bc_quality(s)?);
    }
    if let Some(v) = cli.compression_level {
        builder = builder.compression_level(v);
    }
    let mut cfg = builder.build();

    if let Some(path) = &cli.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_transcode_config(cfg)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// What to do with one input path, decided by its suffix.
#[derive(Debug, PartialEq, Eq)]
enum Job {
    Export,
    Replace { target: PathBuf },
    SkipText,
    Unknown,
}

fn classify(path: &Path) -> Job {
    let name = path.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".tex.png") || name.ends_with(".tex.dds") {
        Job::Replace {
            target: path.with_extension(""),
        }
    } else if name.ends_with(".tex") {
        Job::Export
    } else if name.ends_with(".pzd") || name.ends_with(".pzd.xml") {
        Job::SkipText
    } else {
        Job::Unknown
    }
}

fn convert_one(path: &Path, cfg: &TranscodeConfig, bar: Option<&ProgressBar>) -> bool {
    if let Some(b) = bar {
        b.set_message(
            path.file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
    }
    let ok = match convert_path(path, cfg) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %path.display(), error = %format!("{e:#}"), "conversion failed");
            false
        }
    };
    if let Some(b) = bar {
        b.inc(1);
    }
    ok
}

fn convert_path(path: &Path, cfg: &TranscodeConfig) -> anyhow::Result<()> {
    let codec = DeflateCodec::new(cfg.compression_level);
    match classify(path) {
        Job::Export => {
            let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
            let doc = TexDocument::read(&mut Cursor::new(bytes), &codec)
                .with_context(|| format!("parse {}", path.display()))?;
            let ext = cfg.export_format.extension();
            // Every texture is encoded before anything is written, so a failure
            // leaves no partial set of outputs behind.
            let mut outputs = Vec::with_capacity(doc.textures.len());
            for (i, texture) in doc.textures.iter().enumerate() {
                let bytes = export_to_bytes(texture, cfg)
                    .with_context(|| format!("export texture {i} ({})", texture.format))?;
                outputs.push((output_path(path, i, ext), bytes));
            }
            for (out, bytes) in outputs {
                fs::write(&out, bytes).with_context(|| format!("write {}", out.display()))?;
                info!(out = %out.display(), "exported");
            }
        }
        Job::Replace { target } => {
            let mut doc = if target.exists() {
                let bytes =
                    fs::read(&target).with_context(|| format!("read {}", target.display()))?;
                TexDocument::read(&mut Cursor::new(bytes), &codec)
                    .with_context(|| format!("parse {}", target.display()))?
            } else {
                info!(target = %target.display(), "no existing .tex, starting from a default texture");
                TexDocument::default()
            };
            if doc.textures.is_empty() {
                doc.textures.push(Texture::default());
            }
            let texture = &mut doc.textures[0];
            replace_from_file(texture, path, cfg)
                .with_context(|| format!("replace from {}", path.display()))?;
            let bytes = doc.to_bytes(&codec)?;
            fs::write(&target, bytes).with_context(|| format!("write {}", target.display()))?;
            info!(target = %target.display(), "rebuilt");
        }
        Job::SkipText => {
            warn!(path = %path.display(), "text containers are not supported, skipping");
        }
        Job::Unknown => {
            return Err(anyhow!("unrecognised file type"));
        }
    }
    Ok(())
}

/// `<path>.<ext>` for the first texture, `<path>.<index>.<ext>` for the rest.
fn output_path(path: &Path, index: usize, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    if index > 0 {
        s.push(format!(".{index}"));
    }
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn parse_alignment(s: &str) -> anyhow::Result<AlignmentPolicy> {
    s.parse()
        .map_err(|_| anyhow!("invalid alignment '{s}', expected dimension|pitch"))
}

fn parse_bc_quality(s: &str) -> anyhow::Result<BcQuality> {
    s.parse().map_err(|_| {
        anyhow!("invalid bc_quality '{s}', expected ultra_fast|very_fast|fast|basic|slow")
    })
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    alignment: Option<String>,
    bc_quality: Option<String>,
    compression_level: Option<u32>,
    export_format: Option<String>,
    force_dx10: Option<bool>,
    keep_mip_count: Option<bool>,
}

impl YamlConfig {
    fn into_transcode_config(self, mut cfg: TranscodeConfig) -> anyhow::Result<TranscodeConfig> {
        if let Some(s) = self.alignment {
            cfg.alignment = parse_alignment(&s)?;
        }
        if let Some(s) = self.bc_quality {
            cfg.bc_quality = parse_bc_quality(&s)?;
        }
        if let Some(v) = self.compression_level {
            cfg.compression_level = v;
        }
        if let Some(s) = self.export_format {
            cfg.export_format = s
                .parse()
                .map_err(|_| anyhow!("invalid export_format '{s}', expected png|dds"))?;
        }
        if let Some(v) = self.force_dx10 {
            cfg.force_dx10 = v;
        }
        if let Some(v) = self.keep_mip_count {
            cfg.keep_mip_count = v;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_suffix() {
        assert_eq!(classify(Path::new("a/b.tex")), Job::Export);
        assert_eq!(
            classify(Path::new("a/b.tex.png")),
            Job::Replace {
                target: PathBuf::from("a/b.tex")
            }
        );
        assert_eq!(
            classify(Path::new("B.TEX.DDS")),
            Job::Replace {
                target: PathBuf::from("B.TEX")
            }
        );
        assert_eq!(classify(Path::new("text.pzd.xml")), Job::SkipText);
        assert_eq!(classify(Path::new("notes.txt")), Job::Unknown);
    }

    #[test]
    fn output_paths_number_extra_textures() {
        let p = Path::new("dir/t_albedo.tex");
        assert_eq!(output_path(p, 0, "png"), PathBuf::from("dir/t_albedo.tex.png"));
        assert_eq!(output_path(p, 2, "dds"), PathBuf::from("dir/t_albedo.tex.2.dds"));
    }

    #[test]
    fn legacy_switches_are_rewritten() {
        let args = ["fftex", "x.tex", "-dds", "-png"].map(OsString::from);
        let out = normalize_legacy_args(args);
        assert_eq!(out, ["fftex", "x.tex", "--dds"].map(OsString::from).to_vec());
    }

    #[test]
    fn yaml_overrides_flags() {
        let cli = Cli::parse_from(["fftex", "x.tex", "--alignment", "dimension"]);
        let mut cfg = build_config(&cli).expect("config");
        let y: YamlConfig =
            serde_yaml::from_str("alignment: pitch\nexport_format: dds\n").expect("yaml");
        cfg = y.into_transcode_config(cfg).expect("merge");
        assert_eq!(cfg.alignment, AlignmentPolicy::Pitch);
        assert_eq!(cfg.export_format, ExportFormat::Dds);
    }

    #[test]
    fn replace_then_export_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let png = dir.path().join("icon.tex.png");
        let img = image::RgbaImage::from_fn(16, 8, |x, y| image::Rgba([x as u8 * 16, y as u8 * 32, 0, 255]));
        img.save(&png).expect("save png");

        let cfg = TranscodeConfig::builder()
            .bc_quality(BcQuality::UltraFast)
            .build();
        convert_path(&png, &cfg).expect("replace");
        let tex = dir.path().join("icon.tex");
        assert!(tex.exists());

        convert_path(&tex, &cfg).expect("export");
        let exported = image::open(dir.path().join("icon.tex.png")).expect("open").into_rgba8();
        assert_eq!(exported.dimensions(), (16, 8));
    }

    #[test]
    fn failed_texture_leaves_no_partial_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tex = dir.path().join("pair.tex");

        let mut first = Texture::new(TextureFormat::R8G8B8A8Unorm, 4, 4, 1);
        let mips = vec![vec![200u8; 4 * 4 * 4]];
        let hardware = fftex_core::surface::to_hardware_levels(
            &first,
            AlignmentPolicy::Dimension,
            &mips,
        )
        .expect("pad");
        first.set_image_data(hardware).expect("set");
        // No pixel codec exists for typeless formats.
        let mut second = Texture::new(TextureFormat::R8Typeless, 4, 4, 1);
        second.set_image_data(vec![vec![0u8; 64 * 4]]).expect("set");

        let mut doc = TexDocument {
            header: TexHeader::default(),
            textures: vec![first, second],
        };
        fs::write(&tex, doc.to_bytes(&DeflateCodec::default()).expect("write")).expect("save");

        let cfg = TranscodeConfig::default();
        let err = convert_path(&tex, &cfg).expect_err("second texture must fail");
        assert!(format!("{err:#}").contains("texture 1"), "{err:#}");
        assert!(!dir.path().join("pair.tex.png").exists());
        assert!(!dir.path().join("pair.tex.1.png").exists());
    }
}
