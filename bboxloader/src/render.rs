//! Render target abstraction.
//!
//! The loader never paints anything. It hands renderables to a target and
//! takes them back when a more detailed version replaces them. Targets that
//! can build renderables from raw geometry override
//! [`RenderTarget::geometry_to_renderables`].

use crate::error::RenderError;

/// Destination for rendered feature representations.
pub trait RenderTarget {
    /// Object the target displays (a layer, a scene node, a handle).
    type Renderable;

    /// Raw geometry the target knows how to convert.
    type Geometry;

    /// Start displaying a renderable.
    fn add_renderable(&mut self, renderable: &Self::Renderable);

    /// Stop displaying a renderable previously added.
    fn remove_renderable(&mut self, renderable: &Self::Renderable);

    /// Build renderables from raw geometry.
    ///
    /// Conversion must not add anything to the target; the loader decides
    /// whether the result is displayed.
    fn geometry_to_renderables(
        &mut self,
        geometry: Self::Geometry,
    ) -> Result<Vec<Self::Renderable>, RenderError> {
        let _ = geometry;
        Err(RenderError::ConversionUnsupported)
    }
}

/// In-memory render target that records what is displayed.
///
/// Raw geometry converts into a single renderable of the same type. Useful
/// for headless replay and for tests.
#[derive(Debug, Clone)]
pub struct MemoryTarget<R> {
    active: Vec<R>,
    added: u64,
    removed: u64,
}

impl<R> Default for MemoryTarget<R> {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            added: 0,
            removed: 0,
        }
    }
}

impl<R: PartialEq> MemoryTarget<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderables currently displayed, in insertion order.
    pub fn active(&self) -> &[R] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Total number of add calls.
    pub fn added(&self) -> u64 {
        self.added
    }

    /// Total number of remove calls that found their renderable.
    pub fn removed(&self) -> u64 {
        self.removed
    }
}

impl<R: Clone + PartialEq> RenderTarget for MemoryTarget<R> {
    type Renderable = R;
    type Geometry = R;

    fn add_renderable(&mut self, renderable: &R) {
        self.active.push(renderable.clone());
        self.added += 1;
    }

    fn remove_renderable(&mut self, renderable: &R) {
        if let Some(pos) = self.active.iter().position(|r| r == renderable) {
            self.active.remove(pos);
            self.removed += 1;
        }
    }

    fn geometry_to_renderables(&mut self, geometry: R) -> Result<Vec<R>, RenderError> {
        Ok(vec![geometry])
    }
}
