//! `simulate` command: replay viewports against a feature catalogue.
//!
//! The catalogue is a GeoJSON `FeatureCollection`. Every feature carries a
//! numeric `level` property naming the level it belongs to and a
//! `[west, south, east, north]` bbox. A request is answered with the
//! catalogue features at its level that intersect its bounds and are not
//! excluded.
//!
//! Viewports are a JSON array:
//!
//! ```json
//! [
//!   { "zoom": 3, "bounds": { "min_lat": 50, "max_lat": 51, "min_lon": 10, "max_lon": 11 } },
//!   "invalidate",
//!   { "zoom": 8, "bounds": { "min_lat": 50.2, "max_lat": 50.4, "min_lon": 10.2, "max_lon": 10.4 } }
//! ]
//! ```
//!
//! Besides viewports, the strings `"reset"`, `"invalidate"` and `"clear"`
//! inject the matching loader events.

use std::path::Path;
use std::sync::{Arc, Mutex};

use console::style;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use bboxloader::geojson;
use bboxloader::source::{BoxFuture, FetchResult};
use bboxloader::{
    BBoxLoader, FeatureId, FeatureSource, FetchRequest, GeoBounds, LevelId, LoaderSettings,
    LoaderStats, MemoryTarget, Viewport, ViewportEvent,
};

use super::{load_settings, read_json};
use crate::error::CliError;

/// Catalogue property naming a feature's level.
pub const LEVEL_PROPERTY: &str = "level";

/// One entry of the viewport script.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptEntry {
    View { zoom: f64, bounds: GeoBounds },
    Command(ScriptCommand),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptCommand {
    Reset,
    Invalidate,
    Clear,
}

impl From<ScriptEntry> for ViewportEvent {
    fn from(entry: ScriptEntry) -> Self {
        match entry {
            ScriptEntry::View { zoom, bounds } => {
                ViewportEvent::Settled(Viewport::new(zoom, bounds))
            }
            ScriptEntry::Command(ScriptCommand::Reset) => ViewportEvent::Reset,
            ScriptEntry::Command(ScriptCommand::Invalidate) => ViewportEvent::InvalidateTiles,
            ScriptEntry::Command(ScriptCommand::Clear) => ViewportEvent::Clear,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Value>,
}

/// A request seen by the catalogue and how many features it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRecord {
    pub request: FetchRequest,
    pub returned: usize,
}

/// In-memory feature source backed by a GeoJSON catalogue.
pub struct CatalogueSource {
    features: Vec<(LevelId, GeoBounds, Value)>,
    log: Arc<Mutex<Vec<FetchRecord>>>,
}

impl CatalogueSource {
    /// Index a catalogue. Features without a level or bbox are dropped.
    pub fn new(features: Vec<Value>) -> Self {
        let total = features.len();
        let features: Vec<_> = features
            .into_iter()
            .filter_map(|feature| {
                let level = feature
                    .get("properties")?
                    .get(LEVEL_PROPERTY)?
                    .as_u64()
                    .and_then(|l| u32::try_from(l).ok())?;
                let bounds = geojson::feature_bounds(&feature)?;
                Some((LevelId(level), bounds, feature))
            })
            .collect();

        if features.len() < total {
            tracing::warn!(
                dropped = total - features.len(),
                "Catalogue features without level or bbox ignored"
            );
        }

        Self {
            features,
            log: Arc::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Requests answered so far.
    pub fn records(&self) -> Vec<FetchRecord> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn matching(&self, request: &FetchRequest) -> Vec<Value> {
        self.features
            .iter()
            .filter(|(level, bounds, _)| {
                *level == request.level && bounds.intersects(&request.bounds)
            })
            .filter(|(_, _, feature)| {
                geojson::feature_id(feature)
                    .map_or(true, |id| request.excluded_ids.binary_search(&id).is_err())
            })
            .map(|(_, _, feature)| feature.clone())
            .collect()
    }
}

impl FeatureSource for CatalogueSource {
    type Feature = Value;

    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, FetchResult<Value>> {
        let features = self.matching(&request);
        if let Ok(mut log) = self.log.lock() {
            log.push(FetchRecord {
                request,
                returned: features.len(),
            });
        }
        Box::pin(async move { Ok(features) })
    }
}

/// Requested tiles and displayed features at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSummary {
    pub level: LevelId,
    pub tiles: usize,
    pub features: usize,
}

/// Outcome of a replay.
#[derive(Debug)]
pub struct SimulationReport {
    pub fetches: Vec<FetchRecord>,
    pub displayed: Vec<(FeatureId, LevelId)>,
    pub levels: Vec<LevelSummary>,
    pub stats: LoaderStats,
}

/// Replay `events` against `catalogue` with `settings`.
pub async fn simulate(
    settings: &LoaderSettings,
    catalogue: CatalogueSource,
    events: Vec<ViewportEvent>,
) -> Result<SimulationReport, CliError> {
    let loader = BBoxLoader::builder()
        .source(catalogue)
        .target(MemoryTarget::<Value>::new())
        .settings(settings)
        .identity(geojson::feature_id)
        .payload(geojson::raw_geometry_payload)
        .build()?;

    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        // Capacity covers every event; the receiver is alive until run.
        if tx.send(event).await.is_err() {
            break;
        }
    }
    drop(tx);

    let loader = loader.run(rx, CancellationToken::new()).await?;

    let mut displayed: Vec<_> = loader
        .target()
        .active()
        .iter()
        .filter_map(geojson::feature_id)
        .filter_map(|id| loader.tracker().level_of(&id).map(|level| (id, level)))
        .collect();
    displayed.sort();
    displayed.dedup();

    let levels = loader
        .registry()
        .levels()
        .iter()
        .map(|level| LevelSummary {
            level: level.id,
            tiles: loader.tile_cache().count_at_level(level.id),
            features: loader.tracker().count_at_level(level.id),
        })
        .collect();

    Ok(SimulationReport {
        fetches: loader.source().records(),
        displayed,
        levels,
        stats: loader.stats(),
    })
}

/// Run the `simulate` command.
pub fn run(config: &Path, features: &Path, viewports: &Path) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let collection: FeatureCollection = read_json(features)?;
    let script: Vec<ScriptEntry> = read_json(viewports)?;

    let catalogue = CatalogueSource::new(collection.features);
    println!(
        "{} {} catalogue features, {} script entries",
        style("Replaying").bold(),
        catalogue.len(),
        script.len()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let events = script.into_iter().map(ViewportEvent::from).collect();
    let report = runtime.block_on(simulate(&settings, catalogue, events))?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!();
    println!("{}", style("Fetches").bold());
    for (n, record) in report.fetches.iter().enumerate() {
        println!(
            "  #{:<3} {}  bbox={}  excluded={}  returned={}",
            n + 1,
            style(record.request.level).cyan(),
            record.request.bbox,
            record.request.excluded_ids.len(),
            record.returned
        );
    }

    println!();
    println!("{}", style("Displayed").bold());
    for (id, level) in &report.displayed {
        println!("  {:<24} {}", id.as_str(), style(level).green());
    }

    println!();
    println!("{}", style("Levels").bold());
    for summary in &report.levels {
        println!(
            "  {}  tiles={}  features={}",
            style(summary.level).cyan(),
            summary.tiles,
            summary.features
        );
    }

    println!();
    println!("{} {}", style("Stats").bold(), report.stats);
}
