use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_measure_core::{
    Mark, MarkGroup, MeasureConfig, MeasureSession, PageScale, PageSource, Point, PolygonPreview,
    SelectionRect, SnapConfig, SnapEngine, SnapResult, StatusMessage, TagSummary, Tool,
};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub mod pages;
pub mod script;

use pages::PngPages;

#[derive(Debug, Parser)]
#[command(name = "pdf-measure")]
#[command(about = "Measure distances, areas and counts on page images")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a JSON event script over page images and print the resulting marks.
    Measure {
        /// Page image, repeat once per page in order.
        #[arg(long = "page", value_name = "IMAGE", required = true)]
        pages: Vec<PathBuf>,
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
        /// Settings file; environment variables are used when absent.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Write the report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print where a point on a page image would snap.
    Snap {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long, default_value_t = pdf_measure_core::snapping::DEFAULT_SNAP_RADIUS)]
        radius: f64,
    },
    /// Write the default settings file.
    InitConfig {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct MarkOutput<'a> {
    #[serde(flatten)]
    mark: &'a Mark,
    label: String,
    detail: String,
}

#[derive(Debug, Serialize)]
struct PageOutput<'a> {
    page: u16,
    scale: Option<&'a PageScale>,
    marks: Vec<MarkOutput<'a>>,
}

#[derive(Debug, Serialize)]
struct MeasureOutput<'a> {
    page_count: u16,
    current_page: u16,
    tool: Tool,
    zoom: f64,
    snap: SnapConfig,
    statuses: Vec<StatusMessage>,
    pages: Vec<PageOutput<'a>>,
    groups: Vec<MarkGroup>,
    tags: Vec<TagSummary>,
    selection: Option<SelectionOutput>,
    polygon_preview: Option<PolygonPreview>,
}

#[derive(Debug, Serialize)]
struct SelectionOutput {
    rect: SelectionRect,
    valid: bool,
    crop: Option<[u32; 4]>,
}

#[derive(Debug, Serialize)]
struct SnapOutput {
    input: Point,
    #[serde(flatten)]
    result: SnapResult,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Measure { pages, script, config, output } => {
            run_measure(&pages, &script, config.as_deref(), output.as_deref())
        }
        Commands::Snap { image, x, y, radius } => run_snap(&image, Point::new(x, y), radius),
        Commands::InitConfig { file } => {
            MeasureConfig::default()
                .save_to_file(&file)
                .with_context(|| format!("failed to write config to {}", file.display()))?;
            println!("{}", file.display());
            Ok(())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_measure(
    page_paths: &[PathBuf],
    script_path: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    for path in page_paths {
        ensure_file_exists(path)?;
    }
    ensure_file_exists(script_path)?;

    let config = match config_path {
        Some(path) => MeasureConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MeasureConfig::from_env().context("invalid environment configuration")?,
    };

    let pages = PngPages::open(page_paths)?;
    let steps = script::load(script_path)?;

    let mut session = MeasureSession::new(config);
    session.open_document(&pages).context("failed to open pages")?;
    let statuses = script::replay(&mut session, &pages, &steps)?;

    let tags = session.tag_summary();
    let payload = build_output(&session, &pages, statuses, tags);
    let json = serde_json::to_string_pretty(&payload)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("{}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn build_output<'a>(
    session: &'a MeasureSession,
    pages: &PngPages,
    statuses: Vec<StatusMessage>,
    tags: Vec<TagSummary>,
) -> MeasureOutput<'a> {
    let page_reports = (1..=pages.page_count())
        .map(|page| PageOutput {
            page,
            scale: session.scale(page),
            marks: session
                .marks(page)
                .iter()
                .map(|mark| MarkOutput {
                    mark,
                    label: mark.label(),
                    detail: session.mark_detail(mark.id).unwrap_or_default(),
                })
                .collect(),
        })
        .collect();

    let selection = session.temp().selection.map(|rect| {
        let crop = session
            .raster()
            .and_then(|r| rect.crop_to(r.width(), r.height()))
            .map(|(x, y, w, h)| [x, y, w, h]);
        SelectionOutput { rect, valid: rect.is_valid(), crop }
    });

    MeasureOutput {
        page_count: session.page_count(),
        current_page: session.page(),
        tool: session.tool(),
        zoom: session.zoom(),
        snap: *session.snap_config(),
        statuses,
        pages: page_reports,
        groups: session.groups(),
        tags,
        selection,
        polygon_preview: session.polygon_preview(),
    }
}

fn run_snap(image_path: &Path, point: Point, radius: f64) -> Result<()> {
    ensure_file_exists(image_path)?;

    let pages = PngPages::open(&[image_path])?;
    let rendered = pages.render(1, 1.0)?;
    let raster =
        pdf_measure_core::PageRaster::from_rgba(rendered.width, rendered.height, &rendered.pixels)?;

    let mut engine = SnapEngine::with_config(SnapConfig::default());
    engine.set_radius(radius);
    let result = engine.snap(point, Tool::Distance, &[], Some(&raster));

    let json = serde_json::to_string_pretty(&SnapOutput { input: point, result })?;
    println!("{json}");
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
