//! Feature identity, payloads and detail tracking.

mod tracker;

pub use tracker::FeatureDetailTracker;

use std::borrow::Borrow;
use std::fmt;

/// Stable identifier of a spatial feature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(String);

impl FeatureId {
    /// Create an id, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for FeatureId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a payload extractor produces for one raw feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<G, R> {
    /// Geometry the render target still has to convert.
    RawGeometry(G),
    /// Ready-made renderables, displayed as-is.
    Renderables(Vec<R>),
}

impl<G, R> Payload<G, R> {
    /// Payload made of a single renderable.
    pub fn renderable(renderable: R) -> Self {
        Payload::Renderables(vec![renderable])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_id_rejects_empty() {
        assert!(FeatureId::new("").is_none());
        assert_eq!(FeatureId::new("f1").unwrap().as_str(), "f1");
    }

    #[test]
    fn test_feature_id_ordering() {
        let mut ids = vec![FeatureId::from("b"), FeatureId::from("a")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "a");
    }

    #[test]
    fn test_payload_constructors() {
        let ready: Payload<&str, u32> = Payload::renderable(7);
        assert_eq!(ready, Payload::Renderables(vec![7]));
        assert_ne!(ready, Payload::RawGeometry("geom"));
    }
}
