//! Fetch orchestrator.
//!
//! [`BBoxLoader`] ties the pieces together:
//!
//! ```text
//! settle(viewport) ──► ViewportPlanner ──► FetchRequest ──► FeatureSource
//!                          │ marks tiles                          │
//!                          ▼                                      ▼
//!                   TileRequestCache                     PendingFetch (future)
//!                                                                 │
//!   RenderTarget ◄── FeatureDetailTracker ◄── apply_results ◄─────┘
//! ```
//!
//! Fetches are never awaited one after another. A caller either polls the
//! returned [`PendingFetch`] values itself and feeds each [`CompletedFetch`]
//! back through [`BBoxLoader::complete`], or hands an event channel to
//! [`BBoxLoader::run`], which does the same with any number of fetches in
//! flight.
//!
//! Results may arrive in any order. The tracker only ever moves a feature to
//! a strictly finer level, so a late coarse batch cannot overwrite a fine one.

mod builder;
mod run;
mod stats;

pub use builder::BBoxLoaderBuilder;
pub use run::ViewportEvent;
pub use stats::LoaderStats;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use crate::config::IngestPolicy;
use crate::error::{IngestError, LoaderResult};
use crate::feature::{FeatureDetailTracker, FeatureId, Payload};
use crate::geo::{BBoxOrder, GeoBounds};
use crate::level::{LevelId, LevelRegistry};
use crate::planner::{Viewport, ViewportPlanner};
use crate::render::RenderTarget;
use crate::source::{BoxFuture, FeatureSource, FetchRequest, FetchResult};
use crate::tile::TileRequestCache;

/// Derives the stable id of a raw feature.
pub type IdentityFn<F> = Box<dyn Fn(&F) -> Option<FeatureId> + Send + Sync>;

/// Turns a raw feature into something displayable.
pub type PayloadFn<F, G, R> = Box<dyn Fn(F) -> Option<Payload<G, R>> + Send + Sync>;

/// A fetch that has been issued but not yet resolved.
#[must_use = "a pending fetch does nothing unless polled"]
pub struct PendingFetch<F> {
    level: LevelId,
    bounds: GeoBounds,
    future: BoxFuture<'static, FetchResult<F>>,
}

impl<F> PendingFetch<F> {
    /// Level the fetch was issued for.
    pub fn level(&self) -> LevelId {
        self.level
    }

    /// Region the fetch covers.
    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }
}

impl<F> fmt::Debug for PendingFetch<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetch")
            .field("level", &self.level)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl<F> Future for PendingFetch<F> {
    type Output = CompletedFetch<F>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let result = ready!(self.future.as_mut().poll(cx));
        Poll::Ready(CompletedFetch {
            level: self.level,
            bounds: self.bounds,
            result,
        })
    }
}

/// A resolved fetch, ready to be applied.
#[derive(Debug)]
pub struct CompletedFetch<F> {
    pub level: LevelId,
    pub bounds: GeoBounds,
    pub result: FetchResult<F>,
}

/// Outcome of ingesting one result batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Features newly displayed or upgraded
    pub accepted: usize,
    /// Features already displayed at this level or finer
    pub rejected: usize,
    /// Malformed features dropped
    pub skipped: usize,
}

/// Progressive level-of-detail feature loader.
pub struct BBoxLoader<T, S>
where
    T: RenderTarget,
    S: FeatureSource,
{
    source: S,
    target: T,
    registry: LevelRegistry,
    planner: ViewportPlanner,
    tiles: TileRequestCache,
    tracker: FeatureDetailTracker<T::Renderable>,
    identity: IdentityFn<S::Feature>,
    payload: PayloadFn<S::Feature, T::Geometry, T::Renderable>,
    bbox_order: BBoxOrder,
    ingest_policy: IngestPolicy,
    stats: LoaderStats,
}

impl<T, S> BBoxLoader<T, S>
where
    T: RenderTarget,
    S: FeatureSource,
{
    /// Start building a loader.
    pub fn builder() -> BBoxLoaderBuilder<T, S> {
        BBoxLoaderBuilder::new()
    }

    /// Plan and issue a fetch for a settled viewport.
    ///
    /// Returns `None` when every tile covering the padded viewport has been
    /// requested before. The tiles of the returned fetch are already marked,
    /// so a second settle over the same region never fetches them again.
    ///
    /// # Errors
    ///
    /// Level resolution and missing tile sizes are fatal configuration
    /// problems and are returned as-is.
    pub fn on_viewport_settle(
        &mut self,
        viewport: &Viewport,
    ) -> LoaderResult<Option<PendingFetch<S::Feature>>> {
        self.stats.settle_events += 1;

        let Some(plan) = self
            .planner
            .plan(viewport, &self.registry, &mut self.tiles)?
        else {
            return Ok(None);
        };

        self.stats.plans += 1;
        self.stats.tiles_requested += plan.new_tile_count as u64;

        let request = FetchRequest {
            level: plan.level,
            bounds: plan.required_bounds,
            bbox: plan.required_bounds.to_bbox_string(self.bbox_order),
            excluded_ids: self.tracker.ids_at_or_above(plan.level),
        };

        tracing::info!(
            level = %plan.level,
            bbox = %request.bbox,
            new_tiles = plan.new_tile_count,
            excluded = request.excluded_ids.len(),
            "Issuing feature fetch"
        );

        self.stats.fetches_issued += 1;
        let future = self.source.fetch(request);

        Ok(Some(PendingFetch {
            level: plan.level,
            bounds: plan.required_bounds,
            future,
        }))
    }

    /// Apply a resolved fetch.
    ///
    /// A failed fetch is logged and counted; its tiles stay requested until
    /// [`invalidate_tiles`](Self::invalidate_tiles) is called. Returns the
    /// ingest report for a successful fetch.
    pub fn complete(
        &mut self,
        completed: CompletedFetch<S::Feature>,
    ) -> LoaderResult<Option<IngestReport>> {
        match completed.result {
            Ok(features) => Ok(Some(self.apply_results(completed.level, features)?)),
            Err(error) => {
                self.stats.fetches_failed += 1;
                tracing::warn!(
                    level = %completed.level,
                    bounds = %completed.bounds,
                    error = %error,
                    "Feature fetch failed"
                );
                Ok(None)
            }
        }
    }

    /// Ingest a batch of raw features fetched at `level`.
    ///
    /// Each feature is identified, turned into renderables and offered to
    /// the tracker. Features the tracker would reject are not converted.
    ///
    /// Under [`IngestPolicy::Strict`] any malformed feature aborts the whole
    /// batch before the render target is touched. Under
    /// [`IngestPolicy::SkipInvalid`] it is logged and skipped.
    pub fn apply_results(
        &mut self,
        level: LevelId,
        features: Vec<S::Feature>,
    ) -> Result<IngestReport, IngestError> {
        let count = features.len();
        match self.ingest(level, features) {
            Ok(report) => {
                self.stats.features_accepted += report.accepted as u64;
                self.stats.features_rejected += report.rejected as u64;
                self.stats.features_skipped += report.skipped as u64;
                tracing::info!(
                    level = %level,
                    features = count,
                    accepted = report.accepted,
                    rejected = report.rejected,
                    skipped = report.skipped,
                    "Applied feature batch"
                );
                Ok(report)
            }
            Err(error) => {
                self.stats.batches_aborted += 1;
                tracing::error!(
                    level = %level,
                    features = count,
                    error = %error,
                    "Aborted feature batch"
                );
                Err(error)
            }
        }
    }

    /// Process a single viewport event.
    pub fn handle_event(
        &mut self,
        event: ViewportEvent,
    ) -> LoaderResult<Option<PendingFetch<S::Feature>>> {
        match event {
            ViewportEvent::Settled(viewport) => self.on_viewport_settle(&viewport),
            ViewportEvent::Reset => {
                tracing::debug!("Viewport reset");
                Ok(None)
            }
            ViewportEvent::InvalidateTiles => {
                self.invalidate_tiles();
                Ok(None)
            }
            ViewportEvent::Clear => {
                self.clear();
                Ok(None)
            }
        }
    }

    /// Forget every requested tile.
    ///
    /// Regions are fetched again on the next settle. Displayed features stay
    /// and are excluded from those fetches.
    pub fn invalidate_tiles(&mut self) {
        let forgotten = self.tiles.len();
        self.tiles.clear();
        tracing::info!(tiles = forgotten, "Tile cache invalidated");
    }

    /// Remove everything from the render target and start over.
    pub fn clear(&mut self) {
        let features = self.tracker.clear(&mut self.target);
        let tiles = self.tiles.len();
        self.tiles.clear();
        tracing::info!(features, tiles, "Loader cleared");
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn tracker(&self) -> &FeatureDetailTracker<T::Renderable> {
        &self.tracker
    }

    pub fn tile_cache(&self) -> &TileRequestCache {
        &self.tiles
    }

    pub fn registry(&self) -> &LevelRegistry {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> LoaderStats {
        self.stats
    }

    fn ingest(
        &mut self,
        level: LevelId,
        features: Vec<S::Feature>,
    ) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();

        let mut staged = Vec::with_capacity(features.len());
        for (index, feature) in features.into_iter().enumerate() {
            match self.extract(index, feature) {
                Ok(entry) => staged.push(entry),
                Err(error) => self.skip_or_abort(level, error, &mut report)?,
            }
        }

        let mut ready = Vec::with_capacity(staged.len());
        for (id, payload) in staged {
            if !self.tracker.accepts(level, &id) {
                report.rejected += 1;
                continue;
            }
            match self.representations(id, payload) {
                Ok(entry) => ready.push(entry),
                Err(error) => self.skip_or_abort(level, error, &mut report)?,
            }
        }

        for (id, representations) in ready {
            if self
                .tracker
                .upgrade(&mut self.target, level, id, representations)
            {
                report.accepted += 1;
            } else {
                // Same id twice in one batch
                report.rejected += 1;
            }
        }

        Ok(report)
    }

    fn extract(
        &self,
        index: usize,
        feature: S::Feature,
    ) -> Result<(FeatureId, Payload<T::Geometry, T::Renderable>), IngestError> {
        let id = (self.identity)(&feature).ok_or(IngestError::MissingFeatureId { index })?;
        match (self.payload)(feature) {
            Some(payload) => Ok((id, payload)),
            None => Err(IngestError::MissingPayload { id }),
        }
    }

    fn representations(
        &mut self,
        id: FeatureId,
        payload: Payload<T::Geometry, T::Renderable>,
    ) -> Result<(FeatureId, Vec<T::Renderable>), IngestError> {
        match payload {
            Payload::Renderables(renderables) => Ok((id, renderables)),
            Payload::RawGeometry(geometry) => match self.target.geometry_to_renderables(geometry) {
                Ok(renderables) => Ok((id, renderables)),
                Err(source) => Err(IngestError::Conversion { id, source }),
            },
        }
    }

    fn skip_or_abort(
        &self,
        level: LevelId,
        error: IngestError,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        match self.ingest_policy {
            IngestPolicy::Strict => Err(error),
            IngestPolicy::SkipInvalid => {
                tracing::warn!(level = %level, error = %error, "Skipping malformed feature");
                report.skipped += 1;
                Ok(())
            }
        }
    }
}

impl<T, S> fmt::Debug for BBoxLoader<T, S>
where
    T: RenderTarget,
    S: FeatureSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BBoxLoader")
            .field("levels", &self.registry.len())
            .field("buffer_ratio", &self.planner.buffer_ratio())
            .field("bbox_order", &self.bbox_order)
            .field("ingest_policy", &self.ingest_policy)
            .field("requested_tiles", &self.tiles.len())
            .field("tracked_features", &self.tracker.len())
            .finish()
    }
}
