//! Alignment updates
//!
//! Refitting after the user edits tie points produces a new transform record
//! and, when it can be computed, the image's lon/lat footprint.

use crate::bounds::compute_bounds;
use crate::error::{TileError, TileResult};
use log::warn;
use serde::{Deserialize, Serialize};
use tiepoint_core::{LonLatBounds, TiePoints};
use tiepoint_transform::{SerializedTransform, SolveOptions, Transform};

/// A fitted transform and its map footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alignment {
    pub transform: SerializedTransform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<LonLatBounds>,
}

impl Alignment {
    pub fn to_json(&self) -> TileResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Fit the family the tie points support and compute its bounds.
///
/// A bounds failure the transform can recover from leaves `bounds` empty.
///
/// # Errors
///
/// Propagates fit failures; the caller keeps its previous alignment and can
/// consult [`tiepoint_transform::TransformError::is_recoverable`].
pub fn update_alignment(
    points: &TiePoints,
    image_size: (u32, u32),
    opts: &SolveOptions,
) -> TileResult<Alignment> {
    let transform = Transform::fit_auto(points, opts)?;
    let bounds = match compute_bounds(image_size, &transform) {
        Ok(bounds) => Some(bounds),
        Err(TileError::NoBounds) => {
            warn!("{:?} alignment has no map bounds", transform.kind());
            None
        }
        Err(TileError::Transform(e)) if e.is_recoverable() => {
            warn!("{:?} alignment bounds failed: {e}", transform.kind());
            None
        }
        Err(e) => return Err(e),
    };
    Ok(Alignment {
        transform: transform.to_serialized(),
        bounds,
    })
}
