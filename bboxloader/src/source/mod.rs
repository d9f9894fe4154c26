//! Feature sources.
//!
//! A source receives one [`FetchRequest`] per planning pass and eventually
//! produces the raw features covering the requested region. Sources are
//! free to answer synchronously or asynchronously; the loader never awaits
//! fetches one after another.
//!
//! [`CallbackSource`] adapts the classic `callback(request, reply)` shape.
//! Its [`Completion`] handle is consumed by replying, so a request can be
//! answered at most once. Dropping the handle without replying resolves the
//! fetch with [`FetchError::Abandoned`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::oneshot;

use crate::error::FetchError;
use crate::feature::FeatureId;
use crate::geo::GeoBounds;
use crate::level::LevelId;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a single fetch.
pub type FetchResult<F> = Result<Vec<F>, FetchError>;

/// Request handed to a feature source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Level the features should be returned at
    pub level: LevelId,
    /// Region covering the newly-needed tiles
    pub bounds: GeoBounds,
    /// `bounds` serialized in the configured edge order
    pub bbox: String,
    /// Features already displayed at `level` or better, sorted
    pub excluded_ids: Vec<FeatureId>,
}

/// Source of raw features for a region.
pub trait FeatureSource: Send + Sync {
    /// Raw feature type produced by the source.
    type Feature: Send + 'static;

    /// Start fetching features for `request`.
    ///
    /// The returned future must not borrow the source; it may outlive the
    /// call that issued it.
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, FetchResult<Self::Feature>>;
}

/// One-shot reply handle for a fetch.
pub struct Completion<F> {
    sender: oneshot::Sender<FetchResult<F>>,
}

impl<F> Completion<F> {
    /// Deliver the features for the request.
    pub fn complete(self, features: Vec<F>) {
        self.reply(Ok(features));
    }

    /// Report that the request failed.
    pub fn fail(self, error: FetchError) {
        self.reply(Err(error));
    }

    fn reply(self, result: FetchResult<F>) {
        // The loader may already be gone; there is nobody left to tell.
        let _ = self.sender.send(result);
    }
}

impl<F> fmt::Debug for Completion<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

type Callback<F> = Box<dyn Fn(FetchRequest, Completion<F>) + Send + Sync>;

/// Feature source driven by a callback.
///
/// The callback may reply inside the call, hand the completion to another
/// task, or drop it.
///
/// # Example
///
/// ```
/// use bboxloader::source::CallbackSource;
///
/// let source = CallbackSource::new(|request, completion| {
///     let features = vec![format!("everything in {}", request.bbox)];
///     completion.complete(features);
/// });
/// # let _ = source;
/// ```
pub struct CallbackSource<F> {
    callback: Callback<F>,
}

impl<F> CallbackSource<F> {
    pub fn new<C>(callback: C) -> Self
    where
        C: Fn(FetchRequest, Completion<F>) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl<F> fmt::Debug for CallbackSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSource").finish_non_exhaustive()
    }
}

impl<F: Send + 'static> FeatureSource for CallbackSource<F> {
    type Feature = F;

    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, FetchResult<F>> {
        let (sender, receiver) = oneshot::channel();
        (self.callback)(request, Completion { sender });

        Box::pin(async move { receiver.await.unwrap_or(Err(FetchError::Abandoned)) })
    }
}
