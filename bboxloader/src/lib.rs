//! BBoxLoader - progressive level-of-detail loading of spatial features
//!
//! A map view settles; the loader works out which grid tiles around it have
//! never been requested, asks a feature source for everything in that region
//! at the detail level matching the zoom, and displays the results on a
//! render target. As the user zooms in, features are replaced by finer
//! versions of themselves, never by coarser ones.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌───────────────────┐
//! │ LevelRegistry│──►│ ViewportPlanner│──►│ TileRequestCache  │
//! └──────────────┘   └───────┬────────┘   └───────────────────┘
//!                            │ FetchPlan
//!                            ▼
//!                     ┌─────────────┐  FetchRequest  ┌───────────────┐
//!                     │  BBoxLoader │───────────────►│ FeatureSource │
//!                     └──────┬──────┘◄───────────────└───────────────┘
//!                            │ upgrade     features
//!                            ▼
//!               ┌──────────────────────┐    ┌──────────────┐
//!               │ FeatureDetailTracker │───►│ RenderTarget │
//!               └──────────────────────┘    └──────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use bboxloader::{BBoxLoader, CallbackSource, FeatureId, Level, MemoryTarget, Payload};
//!
//! let source = CallbackSource::new(|_request, completion| {
//!     completion.complete(vec![("road-7".to_string(), "LINESTRING".to_string())]);
//! });
//!
//! let loader = BBoxLoader::builder()
//!     .source(source)
//!     .target(MemoryTarget::<String>::new())
//!     .levels(vec![
//!         Level::new(0, 1.0).with_max_zoom(10.0),
//!         Level::new(1, 0.1).with_min_zoom(10.0),
//!     ])
//!     .identity(|(id, _): &(String, String)| FeatureId::new(id.clone()))
//!     .payload(|(_, geometry): (String, String)| Some(Payload::RawGeometry(geometry)))
//!     .build()
//!     .unwrap();
//! # let _ = loader;
//! ```

pub mod config;
pub mod error;
pub mod feature;
pub mod geo;
pub mod geojson;
pub mod level;
pub mod loader;
pub mod logging;
pub mod planner;
pub mod render;
pub mod source;
pub mod tile;

pub use config::{IngestPolicy, LoaderSettings};
pub use error::{
    ConfigError, FetchError, IngestError, LevelResolutionError, LoaderError, LoaderResult,
    RenderError, ViewportError,
};
pub use feature::{FeatureDetailTracker, FeatureId, Payload};
pub use geo::{BBoxOrder, GeoBounds};
pub use level::{Level, LevelId, LevelRegistry};
pub use loader::{BBoxLoader, BBoxLoaderBuilder, IngestReport, LoaderStats, ViewportEvent};
pub use planner::{FetchPlan, Viewport, ViewportPlanner};
pub use render::{MemoryTarget, RenderTarget};
pub use source::{CallbackSource, Completion, FeatureSource, FetchRequest};
pub use tile::{TileKey, TileRect, TileRequestCache};
