use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use overprint::{
    AspectRatio, BatchItem, EXPORT_ASPECT, OverlayOptions, OverlayPatch, TextAlign, TextColor,
    composite_many, composite_with_aspect,
};

#[derive(Parser, Debug)]
#[command(name = "overprint", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a single image with a caption overlay and write a JPEG.
    Compose(ComposeArgs),
    /// Composite every item in a JSON manifest, in order, failing fast.
    Batch(BatchArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Input image (any common raster format).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output JPEG path.
    #[arg(long)]
    out: PathBuf,

    /// Caption text; empty skips the overlay.
    #[arg(long, default_value = "")]
    caption: String,

    /// Horizontal anchor of the text block, percent of image width.
    #[arg(long)]
    x: Option<f64>,

    /// Vertical center of the text block, percent of image height.
    #[arg(long)]
    y: Option<f64>,

    /// Font size in pixels at a 1080px short edge.
    #[arg(long)]
    font_size: Option<f64>,

    /// Text box width, percent of image width (20-100).
    #[arg(long)]
    width: Option<f64>,

    #[arg(long, value_enum)]
    align: Option<AlignArg>,

    #[arg(long, value_enum)]
    color: Option<ColorArg>,

    /// Precomputed accent color as #rrggbb (skips extraction).
    #[arg(long)]
    accent: Option<String>,

    /// Zoom factor >= 1.
    #[arg(long)]
    scale: Option<f64>,

    /// Horizontal pan, percent of overflow (-50..50).
    #[arg(long)]
    offset_x: Option<f64>,

    /// Vertical pan, percent of overflow (-50..50).
    #[arg(long)]
    offset_y: Option<f64>,

    /// Target aspect as W:H (default 4:5).
    #[arg(long)]
    aspect: Option<String>,

    /// Skip cropping entirely; overlay on the full image.
    #[arg(long)]
    no_crop: bool,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Batch manifest JSON (defaults + items).
    #[arg(long)]
    manifest: PathBuf,

    /// Directory the outputs are written into.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlignArg {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColorArg {
    Black,
    White,
    Accent,
}

#[derive(Debug, serde::Deserialize)]
struct Manifest {
    #[serde(default)]
    defaults: OverlayOptions,
    items: Vec<ManifestItem>,
}

#[derive(Debug, serde::Deserialize)]
struct ManifestItem {
    image: PathBuf,
    #[serde(default)]
    caption: String,
    #[serde(default)]
    overrides: OverlayPatch,
    /// Output file name; defaults to `<stem>_export.jpg`.
    #[serde(default)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Batch(args) => cmd_batch(args),
    }
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read image '{}'", args.in_path.display()))?;

    let patch = OverlayPatch {
        x: args.x,
        y: args.y,
        font_size: args.font_size,
        width: args.width,
        text_align: args.align.map(AlignArg::into_align),
        text_color: args.color.map(ColorArg::into_color),
        accent_color: args.accent,
        image_scale: args.scale,
        image_offset_x: args.offset_x,
        image_offset_y: args.offset_y,
    };
    let options = patch.apply(&OverlayOptions::default());

    let aspect = if args.no_crop {
        None
    } else {
        match &args.aspect {
            Some(s) => Some(parse_aspect(s)?),
            None => Some(EXPORT_ASPECT),
        }
    };

    let out_bytes = composite_with_aspect(&bytes, &args.caption, &options, aspect)?;
    write_output(&args.out, &out_bytes)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_batch(args: BatchArgs) -> anyhow::Result<()> {
    let f = File::open(&args.manifest)
        .with_context(|| format!("open manifest '{}'", args.manifest.display()))?;
    let manifest: Manifest =
        serde_json::from_reader(BufReader::new(f)).context("parse manifest JSON")?;

    let root = args.manifest.parent().unwrap_or_else(|| Path::new("."));

    let mut items = Vec::with_capacity(manifest.items.len());
    for entry in &manifest.items {
        let path = root.join(&entry.image);
        let image_bytes =
            std::fs::read(&path).with_context(|| format!("read image '{}'", path.display()))?;
        items.push(BatchItem {
            image_bytes,
            caption: entry.caption.clone(),
            overrides: entry.overrides.clone(),
        });
    }

    let outputs = composite_many(&items, &manifest.defaults)?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    for (entry, bytes) in manifest.items.iter().zip(&outputs) {
        let name = entry.out.clone().unwrap_or_else(|| {
            let stem = entry
                .image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "item".to_string());
            PathBuf::from(format!("{stem}_export.jpg"))
        });
        let out_path = args.out_dir.join(name);
        write_output(&out_path, bytes)?;
        eprintln!("wrote {}", out_path.display());
    }

    Ok(())
}

fn parse_aspect(s: &str) -> anyhow::Result<AspectRatio> {
    let (w, h) = s
        .split_once(':')
        .with_context(|| format!("aspect must be W:H, got '{s}'"))?;
    let w: u32 = w.trim().parse().with_context(|| format!("bad aspect width '{w}'"))?;
    let h: u32 = h.trim().parse().with_context(|| format!("bad aspect height '{h}'"))?;
    Ok(AspectRatio::new(w, h)?)
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

impl AlignArg {
    fn into_align(self) -> TextAlign {
        match self {
            Self::Left => TextAlign::Left,
            Self::Center => TextAlign::Center,
            Self::Right => TextAlign::Right,
        }
    }
}

impl ColorArg {
    fn into_color(self) -> TextColor {
        match self {
            Self::Black => TextColor::Black,
            Self::White => TextColor::White,
            Self::Accent => TextColor::Accent,
        }
    }
}
