//! Event-driven loader loop.
//!
//! [`BBoxLoader::run`] owns the loader on a single task. Viewport events
//! arrive over a channel; every fetch they issue joins a set of in-flight
//! futures that is polled alongside the channel:
//!
//! ```text
//! events ──► handle_event ──► PendingFetch ──► FuturesUnordered
//!                                                   │ (any order)
//!                              complete ◄───────────┘
//! ```
//!
//! Cache and tracker are only touched from this task, so no locking is
//! needed.

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::BBoxLoader;
use crate::error::{LoaderError, LoaderResult};
use crate::planner::Viewport;
use crate::render::RenderTarget;
use crate::source::FeatureSource;

/// Input events for [`BBoxLoader::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    /// The map stopped moving.
    Settled(Viewport),
    /// The map view was reset. Loaded data is kept.
    Reset,
    /// Forget requested tiles so regions are fetched again.
    InvalidateTiles,
    /// Remove all displayed features and forget requested tiles.
    Clear,
}

impl<T, S> BBoxLoader<T, S>
where
    T: RenderTarget,
    S: FeatureSource,
{
    /// Run the loader until cancelled or until `events` closes.
    ///
    /// When the channel closes, fetches still in flight are awaited and
    /// applied before returning. Cancellation returns immediately and drops
    /// them.
    ///
    /// Returns the loader so its final state can be inspected.
    ///
    /// # Errors
    ///
    /// Configuration and level resolution errors end the loop. A viewport
    /// that cannot be planned, or a batch aborted under the strict ingest
    /// policy, is logged and the loop goes on.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ViewportEvent>,
        cancellation_token: CancellationToken,
    ) -> LoaderResult<Self> {
        tracing::info!(levels = self.registry.len(), "BBox loader started");

        let mut in_flight = FuturesUnordered::new();
        let mut events_open = true;

        loop {
            if !events_open && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    tracing::info!(in_flight = in_flight.len(), "BBox loader cancelled");
                    break;
                }

                Some(completed) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Err(error) = self.complete(completed) {
                        self.check_fatal(error)?;
                    }
                }

                event = events.recv(), if events_open => {
                    let Some(event) = event else {
                        tracing::debug!(
                            in_flight = in_flight.len(),
                            "Event channel closed, draining"
                        );
                        events_open = false;
                        continue;
                    };

                    match self.handle_event(event) {
                        Ok(Some(pending)) => in_flight.push(pending),
                        Ok(None) => {}
                        Err(error) => self.check_fatal(error)?,
                    }
                }
            }
        }

        tracing::info!(stats = %self.stats, "BBox loader stopped");
        Ok(self)
    }

    fn check_fatal(&self, error: LoaderError) -> LoaderResult<()> {
        if error.is_fatal() {
            tracing::error!(error = %error, "BBox loader stopping on fatal error");
            Err(error)
        } else {
            // Already logged by the planner or apply_results
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureId, Payload};
    use crate::geo::GeoBounds;
    use crate::level::{Level, LevelId};
    use crate::render::MemoryTarget;
    use crate::source::{CallbackSource, Completion};
    use std::time::Duration;

    type Loader = BBoxLoader<MemoryTarget<String>, CallbackSource<String>>;

    /// Source answering each request with one feature named after its level,
    /// after a delay that shrinks with the level.
    fn delayed_loader() -> Loader {
        let source = CallbackSource::new(|request, completion: Completion<String>| {
            let delay = Duration::from_millis(if request.level == LevelId(0) { 60 } else { 5 });
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                completion.complete(vec![format!("road@{}", request.level)]);
            });
        });

        BBoxLoader::builder()
            .source(source)
            .target(MemoryTarget::new())
            .levels(vec![
                Level::new(0, 1.0).with_max_zoom(5.0),
                Level::new(1, 0.1).with_min_zoom(5.0),
            ])
            .identity(|_feature: &String| FeatureId::new("road"))
            .payload(|feature: String| Some(Payload::RawGeometry(feature)))
            .build()
            .unwrap()
    }

    fn settled(zoom: f64) -> ViewportEvent {
        ViewportEvent::Settled(Viewport::new(zoom, GeoBounds::new(0.2, 0.8, 0.2, 0.8)))
    }

    #[tokio::test]
    async fn test_run_drains_in_flight_after_channel_closes() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(settled(3.0)).await.unwrap();
        tx.send(settled(10.0)).await.unwrap();
        drop(tx);

        let loader = delayed_loader()
            .run(rx, CancellationToken::new())
            .await
            .unwrap();

        // The coarse result lands last and is rejected
        assert_eq!(loader.target().active(), &["road@L1".to_string()]);
        let stats = loader.stats();
        assert_eq!(stats.fetches_issued, 2);
        assert_eq!(stats.features_accepted, 1);
        assert_eq!(stats.features_rejected, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        token.cancel();

        let loader = delayed_loader().run(rx, token).await.unwrap();
        assert_eq!(loader.stats().settle_events, 0);
        drop(tx);
    }

    #[tokio::test]
    async fn test_run_fails_on_unresolvable_zoom() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(settled(-3.0)).await.unwrap();

        let loader = BBoxLoader::builder()
            .source(CallbackSource::new(|_r, c: Completion<String>| c.complete(vec![])))
            .target(MemoryTarget::<String>::new())
            .levels(vec![Level::new(0, 1.0).with_min_zoom(0.0)])
            .identity(|_f: &String| None)
            .payload(|f: String| Some(Payload::RawGeometry(f)))
            .build()
            .unwrap();

        let err = loader
            .run(rx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::LevelResolution(_)));
        drop(tx);
    }

    #[tokio::test]
    async fn test_run_skips_invalid_viewport() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ViewportEvent::Settled(Viewport::new(
            3.0,
            GeoBounds::new(f64::NAN, 0.8, 0.2, 0.8),
        )))
        .await
        .unwrap();
        tx.send(settled(10.0)).await.unwrap();
        drop(tx);

        let loader = delayed_loader()
            .run(rx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(loader.target().active(), &["road@L1".to_string()]);
        let stats = loader.stats();
        assert_eq!(stats.settle_events, 2);
        assert_eq!(stats.plans, 1);
        assert_eq!(stats.fetches_issued, 1);
        assert_eq!(loader.tile_cache().count_at_level(LevelId(0)), 0);
    }
}
