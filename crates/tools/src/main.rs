use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use fogchart_core::{
    Candidate, ClassifierRules, Decision, GridGeometry, Navigator, Observation, PixelPos,
    SkipReason, TerrainLabel, TileCoord, WorldModel, annotate, classify_frame,
    format_snapshot_hash,
};
use image::RgbImage;
use serde::Serialize;
use tracing::{Level, info};
use tracing_subscriber::filter::EnvFilter;

/// Classify one captured frame and report what a navigation cycle would do with it
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PNG frame to inspect
    image: PathBuf,

    /// Observer pixel as `x,y`; without it only classification runs
    #[arg(short, long, value_parser = parse_pixel)]
    observer: Option<PixelPos>,

    #[arg(long, default_value_t = GridGeometry::default().tile_width)]
    tile_width: u32,

    #[arg(long, default_value_t = GridGeometry::default().tile_height)]
    tile_height: u32,

    #[arg(long, default_value_t = 0)]
    offset_x: u32,

    #[arg(long, default_value_t = 0)]
    offset_y: u32,

    /// Write the annotated frame to this PNG
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn parse_pixel(raw: &str) -> Result<PixelPos, String> {
    let (x, y) = raw.split_once(',').ok_or_else(|| format!("expected x,y, got '{raw}'"))?;
    let coordinate = |value: &str| {
        value.trim().parse::<i32>().map_err(|_| format!("'{value}' is not a pixel coordinate"))
    };
    Ok(PixelPos::new(coordinate(x)?, coordinate(y)?))
}

#[derive(Debug, Serialize)]
struct ScanReport {
    width: u32,
    height: u32,
    geometry: GridGeometry,
    snapshot_hash: String,
    tiles: usize,
    fog: usize,
    water: usize,
    land: usize,
    observer: Option<PixelPos>,
    anchor: Option<TileCoord>,
    candidates: Vec<Candidate>,
    target: Option<Candidate>,
    path: Vec<TileCoord>,
    click: Option<PixelPos>,
    decision: String,
    status: String,
}

/// Runs one observation against an empty world; nothing is actuated or cached.
fn scan(
    bitmap: &RgbImage,
    geometry: GridGeometry,
    observer: Option<PixelPos>,
) -> (Observation, ScanReport) {
    let navigator = Navigator::default();
    let observation = match observer {
        Some(_) => navigator.observe(&mut WorldModel::new(geometry), bitmap, observer, 0),
        None => Observation {
            observer: None,
            grid: Some(classify_frame(bitmap, geometry, &ClassifierRules::default())),
            reachability: None,
            target: None,
            path: Vec::new(),
            decision: Decision::Skip(SkipReason::ObserverNotFound),
        },
    };

    let grid = observation.grid.as_ref();
    let count = |label| grid.map_or(0, |grid| grid.count(label));
    let (width, height) = bitmap.dimensions();
    let report = ScanReport {
        width,
        height,
        geometry,
        snapshot_hash: grid
            .map_or_else(String::new, |grid| format_snapshot_hash(grid.snapshot_hash())),
        tiles: grid.map_or(0, |grid| grid.len()),
        fog: count(TerrainLabel::Fog),
        water: count(TerrainLabel::Water),
        land: count(TerrainLabel::Land),
        observer: observation.observer,
        anchor: observation.reachability.as_ref().map(|r| r.anchor),
        candidates: observation.candidates().to_vec(),
        target: observation.target,
        path: observation.path.clone(),
        click: match &observation.decision {
            Decision::Step { click, .. } => Some(*click),
            Decision::Skip(_) => None,
        },
        decision: match &observation.decision {
            Decision::Step { .. } => "step".to_string(),
            Decision::Skip(reason) => reason.to_string(),
        },
        status: observation.status_text(),
    };
    (observation, report)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let bitmap = image::open(&args.image)
        .with_context(|| format!("failed to read frame {}", args.image.display()))?
        .to_rgb8();
    let geometry = GridGeometry {
        tile_width: args.tile_width,
        tile_height: args.tile_height,
        offset_x: args.offset_x,
        offset_y: args.offset_y,
    };
    ensure!(geometry.tile_width > 0 && geometry.tile_height > 0, "tile size must be non-zero");

    let (observation, report) = scan(&bitmap, geometry, args.observer);

    if let Some(path) = &args.overlay {
        annotate(&bitmap, &observation)
            .save(path)
            .with_context(|| format!("failed to write overlay {}", path.display()))?;
        info!(path = %path.display(), "overlay written");
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("failed to serialize report")?;
    println!("{json}");

    Ok(())
}
