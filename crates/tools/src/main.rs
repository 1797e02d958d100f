use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalog::{GeoRecord, InMemoryMemoryStore, MemoryDraft, MemoryStore};
use clap::{Args, Parser, Subcommand};
use cluster::{ClusterId, ClusterIndex};
use foundation::{LngLat, LngLatBounds};
use map::{HeadlessSurface, MapConfig, MapView, load_records};
use serde::Serialize;
use tools::args::{parse_bbox, parse_lnglat};
use tools::report::{ClustersReport, ExpandReport, NodeReport, RenderReport, ValidateReport};
use tools::settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "memorial", about = "Inspect memorial map data")]
struct Cli {
    /// JSON map config. MEMORIAL_* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clusters and single memories inside a box at a zoom.
    Clusters(ClustersArgs),
    /// Where a cluster breaks apart and what it splits into.
    Expand(ExpandArgs),
    /// Render the map headlessly and list the markers on screen.
    Render(RenderArgs),
    /// Check a share-form draft.
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct ClustersArgs {
    /// JSON array of backend memory rows.
    #[arg(long)]
    records: PathBuf,
    /// west,south,east,north
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: LngLatBounds,
    #[arg(long)]
    zoom: f64,
}

#[derive(Args, Debug)]
struct ExpandArgs {
    #[arg(long)]
    records: PathBuf,
    /// Cluster id as printed by `clusters`, e.g. 3/17.
    #[arg(long)]
    cluster: ClusterId,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long)]
    records: PathBuf,
    /// lng,lat
    #[arg(long, value_parser = parse_lnglat, allow_hyphen_values = true)]
    center: Option<LngLat>,
    #[arg(long)]
    zoom: Option<f64>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// JSON share-form draft.
    #[arg(long)]
    draft: PathBuf,
    #[arg(long, default_value = "local-author")]
    author: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Clusters(args) => cmd_clusters(config, args).await,
        Command::Expand(args) => cmd_expand(config, args).await,
        Command::Render(args) => cmd_render(config, args).await,
        Command::Validate(args) => cmd_validate(args),
    }
}

async fn cmd_clusters(config: MapConfig, args: ClustersArgs) -> Result<(), Box<dyn Error>> {
    let index = build_index(&config, &args.records).await?;
    let nodes = index
        .clusters(args.bbox, args.zoom)
        .into_iter()
        .map(NodeReport::from)
        .collect();
    print_json(&ClustersReport {
        zoom: index.query_zoom(args.zoom),
        nodes,
    })
}

async fn cmd_expand(config: MapConfig, args: ExpandArgs) -> Result<(), Box<dyn Error>> {
    let index = build_index(&config, &args.records).await?;
    let expansion_zoom = index.expansion_zoom(args.cluster)?;
    let children = index
        .children(args.cluster)?
        .into_iter()
        .map(NodeReport::from)
        .collect();
    print_json(&ExpandReport {
        cluster: args.cluster,
        expansion_zoom,
        children,
    })
}

async fn cmd_render(config: MapConfig, args: RenderArgs) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(read_store(&args.records)?);
    let mut view = MapView::new(config, HeadlessSurface::new())?;

    let load = load_records(store);
    view.apply_load(load.finish().await);

    if args.center.is_some() || args.zoom.is_some() {
        let current = *view.viewport();
        view.jump_to(
            args.center.unwrap_or(current.center),
            args.zoom.unwrap_or(current.zoom),
        );
    }

    let report = RenderReport::of(&view);
    let surface = view.teardown();
    tracing::debug!(camera_updates = surface.camera_updates(), "render finished");
    print_json(&report)
}

fn cmd_validate(args: ValidateArgs) -> Result<(), Box<dyn Error>> {
    let json = read_file(&args.draft)?;
    let draft: MemoryDraft = serde_json::from_str(&json)?;
    let result = draft.validate(&args.author);
    let valid = result.is_ok();
    print_json(&ValidateReport::from(result))?;
    if !valid {
        return Err("draft has invalid fields".into());
    }
    Ok(())
}

async fn build_index(
    config: &MapConfig,
    records: &Path,
) -> Result<ClusterIndex<GeoRecord>, Box<dyn Error>> {
    let store = read_store(records)?;
    let records = store.list_visible_memories().await?;
    let index = ClusterIndex::build(
        records.into_iter().map(|r| (r.position, r)),
        config.cluster.clone(),
    )?;
    Ok(index)
}

fn read_store(path: &Path) -> Result<InMemoryMemoryStore, Box<dyn Error>> {
    let json = read_file(path)?;
    Ok(InMemoryMemoryStore::from_json(&json)?)
}

fn read_file(path: &Path) -> Result<String, Box<dyn Error>> {
    fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()).into())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
