//! Points and tie-point correspondences
//!
//! A [`Correspondence`] pairs a destination point (map meters) with a source
//! point (image pixels). [`TiePoints`] is the ordered set a user accumulates
//! while aligning an image; its cardinality decides which transform family
//! can be fit.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A 2D point with double-precision coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Check that both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// A matched pair of coordinates.
///
/// `to` lives in destination (map meters) space, `from` in source
/// (image pixel) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Destination point (map meters)
    pub to: Point,
    /// Source point (image pixels)
    pub from: Point,
}

impl Correspondence {
    /// Create a new correspondence
    pub const fn new(to: Point, from: Point) -> Self {
        Self { to, from }
    }
}

/// Ordered set of tie-point correspondences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TiePoints {
    pairs: Vec<Correspondence>,
}

impl TiePoints {
    /// Create an empty set.
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Build a set from rows of `[to_x, to_y, from_x, from_y]`.
    ///
    /// This is the layout overlays store their points in.
    pub fn from_rows(rows: &[[f64; 4]]) -> Self {
        let pairs = rows
            .iter()
            .map(|r| Correspondence::new(Point::new(r[0], r[1]), Point::new(r[2], r[3])))
            .collect();
        Self { pairs }
    }

    /// Build a set from parallel destination and source slices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the slices differ in length.
    pub fn from_split(to: &[Point], from: &[Point]) -> Result<Self> {
        if to.len() != from.len() {
            return Err(Error::InvalidParameter(format!(
                "point count mismatch: {} destination vs {} source",
                to.len(),
                from.len()
            )));
        }
        let pairs = to
            .iter()
            .zip(from)
            .map(|(t, f)| Correspondence::new(*t, *f))
            .collect();
        Ok(Self { pairs })
    }

    /// Append a correspondence.
    pub fn push(&mut self, to: Point, from: Point) {
        self.pairs.push(Correspondence::new(to, from));
    }

    /// Get the number of correspondences.
    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Get a correspondence by index.
    pub fn get(&self, index: usize) -> Option<&Correspondence> {
        self.pairs.get(index)
    }

    /// Iterate over the correspondences.
    pub fn iter(&self) -> std::slice::Iter<'_, Correspondence> {
        self.pairs.iter()
    }

    /// Split into destination and source point vectors.
    pub fn split(&self) -> (Vec<Point>, Vec<Point>) {
        self.pairs.iter().map(|c| (c.to, c.from)).unzip()
    }

    /// Convert back into `[to_x, to_y, from_x, from_y]` rows.
    pub fn to_rows(&self) -> Vec<[f64; 4]> {
        self.pairs
            .iter()
            .map(|c| [c.to.x, c.to.y, c.from.x, c.from.y])
            .collect()
    }
}

impl<'a> IntoIterator for &'a TiePoints {
    type Item = &'a Correspondence;
    type IntoIter = std::slice::Iter<'a, Correspondence>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

impl FromIterator<Correspondence> for TiePoints {
    fn from_iter<I: IntoIterator<Item = Correspondence>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Flatten points into `[x0, y0, x1, y1, ...]`.
pub fn flatten_points(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

/// Arithmetic mean of a point slice, or `None` if empty.
pub fn mean_point(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}
