//! Loader construction.

use super::{BBoxLoader, IdentityFn, LoaderStats, PayloadFn};
use crate::config::{IngestPolicy, LoaderSettings};
use crate::error::ConfigError;
use crate::feature::{FeatureDetailTracker, FeatureId, Payload};
use crate::geo::BBoxOrder;
use crate::level::{Level, LevelRegistry};
use crate::planner::{ViewportPlanner, DEFAULT_BUFFER_RATIO};
use crate::render::RenderTarget;
use crate::source::FeatureSource;
use crate::tile::TileRequestCache;

/// Builder for [`BBoxLoader`].
///
/// `source`, `target`, `levels`, `identity` and `payload` are required.
/// Everything else falls back to [`LoaderSettings::default`].
pub struct BBoxLoaderBuilder<T, S>
where
    T: RenderTarget,
    S: FeatureSource,
{
    source: Option<S>,
    target: Option<T>,
    levels: Option<Vec<Level>>,
    identity: Option<IdentityFn<S::Feature>>,
    payload: Option<PayloadFn<S::Feature, T::Geometry, T::Renderable>>,
    buffer_ratio: f64,
    bbox_order: BBoxOrder,
    ingest_policy: IngestPolicy,
}

impl<T, S> Default for BBoxLoaderBuilder<T, S>
where
    T: RenderTarget,
    S: FeatureSource,
{
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            levels: None,
            identity: None,
            payload: None,
            buffer_ratio: DEFAULT_BUFFER_RATIO,
            bbox_order: BBoxOrder::default(),
            ingest_policy: IngestPolicy::default(),
        }
    }
}

impl<T, S> BBoxLoaderBuilder<T, S>
where
    T: RenderTarget,
    S: FeatureSource,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: S) -> Self {
        self.source = Some(source);
        self
    }

    pub fn target(mut self, target: T) -> Self {
        self.target = Some(target);
        self
    }

    /// Levels in declaration order.
    pub fn levels(mut self, levels: Vec<Level>) -> Self {
        self.levels = Some(levels);
        self
    }

    /// Function deriving a feature's stable id.
    pub fn identity<C>(mut self, identity: C) -> Self
    where
        C: Fn(&S::Feature) -> Option<FeatureId> + Send + Sync + 'static,
    {
        self.identity = Some(Box::new(identity));
        self
    }

    /// Function extracting a feature's payload.
    pub fn payload<C>(mut self, payload: C) -> Self
    where
        C: Fn(S::Feature) -> Option<Payload<T::Geometry, T::Renderable>> + Send + Sync + 'static,
    {
        self.payload = Some(Box::new(payload));
        self
    }

    /// Apply loaded settings, including their levels.
    pub fn settings(mut self, settings: &LoaderSettings) -> Self {
        self.levels = Some(settings.levels.clone());
        self.buffer_ratio = settings.buffer_ratio;
        self.bbox_order = settings.bbox_order;
        self.ingest_policy = settings.ingest_policy;
        self
    }

    pub fn buffer_ratio(mut self, ratio: f64) -> Self {
        self.buffer_ratio = ratio;
        self
    }

    pub fn bbox_order(mut self, order: BBoxOrder) -> Self {
        self.bbox_order = order;
        self
    }

    pub fn ingest_policy(mut self, policy: IngestPolicy) -> Self {
        self.ingest_policy = policy;
        self
    }

    /// Validate the options and build the loader.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingOption` naming the first absent required option
    /// - `ConfigError::InvalidValue` for a negative or non-finite buffer ratio
    /// - any level validation error from [`LevelRegistry::new`]
    pub fn build(self) -> Result<BBoxLoader<T, S>, ConfigError> {
        let source = self.source.ok_or(ConfigError::MissingOption("source"))?;
        let target = self.target.ok_or(ConfigError::MissingOption("target"))?;
        let levels = self.levels.ok_or(ConfigError::MissingOption("levels"))?;
        let identity = self
            .identity
            .ok_or(ConfigError::MissingOption("identity"))?;
        let payload = self.payload.ok_or(ConfigError::MissingOption("payload"))?;

        if !self.buffer_ratio.is_finite() || self.buffer_ratio < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "buffer_ratio".to_string(),
                value: self.buffer_ratio.to_string(),
            });
        }

        let registry = LevelRegistry::new(levels)?;

        tracing::debug!(
            levels = registry.len(),
            buffer_ratio = self.buffer_ratio,
            bbox_order = %self.bbox_order,
            ingest_policy = %self.ingest_policy,
            "Built bbox loader"
        );

        Ok(BBoxLoader {
            source,
            target,
            registry,
            planner: ViewportPlanner::new(self.buffer_ratio),
            tiles: TileRequestCache::new(),
            tracker: FeatureDetailTracker::new(),
            identity,
            payload,
            bbox_order: self.bbox_order,
            ingest_policy: self.ingest_policy,
            stats: LoaderStats::default(),
        })
    }
}
