//! Helpers for GeoJSON features held as [`serde_json::Value`].
//!
//! These plug straight into [`BBoxLoaderBuilder::identity`] and
//! [`BBoxLoaderBuilder::payload`] when a source yields plain GeoJSON.
//! [`feature_id`] is more lenient than reading only the top-level `id`: many
//! servers put the id under `properties` instead. Supply a custom identity
//! extractor when that fallback is unwanted.
//!
//! [`BBoxLoaderBuilder::identity`]: crate::loader::BBoxLoaderBuilder::identity
//! [`BBoxLoaderBuilder::payload`]: crate::loader::BBoxLoaderBuilder::payload

use serde_json::Value;

use crate::feature::{FeatureId, Payload};
use crate::geo::GeoBounds;

/// Stable id of a GeoJSON feature.
///
/// Looks at the top-level `id` member first. Only when that is missing does
/// it fall back to `properties.id`. Strings and numbers are accepted. Empty
/// strings, zero, `false` and `null` count as missing.
pub fn feature_id(feature: &Value) -> Option<FeatureId> {
    id_from(feature.get("id")).or_else(|| {
        id_from(
            feature
                .get("properties")
                .and_then(|properties| properties.get("id")),
        )
    })
}

fn id_from(value: Option<&Value>) -> Option<FeatureId> {
    match value? {
        Value::String(s) => FeatureId::new(s.as_str()),
        Value::Number(n) if n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()) => {
            FeatureId::new(n.to_string())
        }
        _ => None,
    }
}

/// Hand the whole feature to the render target for conversion.
///
/// Returns `None` for anything that is not a JSON object.
pub fn raw_geometry_payload<R>(feature: Value) -> Option<Payload<Value, R>> {
    feature
        .is_object()
        .then_some(Payload::RawGeometry(feature))
}

/// Extent of a feature from its `bbox` member (`[west, south, east, north]`).
pub fn feature_bounds(feature: &Value) -> Option<GeoBounds> {
    let bbox = feature.get("bbox")?.as_array()?;
    if bbox.len() != 4 {
        return None;
    }
    let edge = |i: usize| bbox[i].as_f64();
    Some(GeoBounds::from_corners(edge(1)?, edge(0)?, edge(3)?, edge(2)?))
}
