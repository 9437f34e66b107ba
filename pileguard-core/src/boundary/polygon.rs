//! Discrimination polygon
//!
//! ## Vertex Order
//!
//! ```text
//! ratio
//!   │   u₀ ── u₁ ── u₂ ── … ── u_k-1     upper envelope, ascending energy
//!   │   │                        │
//!   │   l₀ ── l₁ ── l₂ ── … ── l_k-1     lower envelope, walked back
//!   └──────────────────────────────── energy
//!
//! vertices = u₀ … u_k-1, l_k-1 … l₀, u₀      (2k + 1, explicitly closed)
//! ```
//!
//! ## Membership
//!
//! Even-odd ray casting toward +x. Points on an edge count as inside so
//! that a bin center lying exactly on the envelope is kept.

use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::histogram::DensityGrid;

/// Point in (energy, ratio) space
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Point {
    /// Energy (MeV)
    pub x: f64,
    /// Tail-to-total ratio
    pub y: f64,
}

/// Tolerance for the on-edge test, relative to the polygon extent
const EDGE_EPSILON: f64 = 1e-12;

/// Closed polygon around the clean band
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct BoundaryPolygon {
    vertices: Vec<Point>,
    min: Point,
    max: Point,
}

impl BoundaryPolygon {
    /// Close upper and lower envelopes sampled at `energies`
    ///
    /// The three slices must have equal length; extra elements of the
    /// longer slices are ignored.
    pub fn from_envelopes(energies: &[f64], upper: &[f64], lower: &[f64]) -> Self {
        let k = energies.len().min(upper.len()).min(lower.len());
        let mut vertices = Vec::with_capacity(2 * k + 1);

        for i in 0..k {
            vertices.push(Point { x: energies[i], y: upper[i] });
        }
        for i in (0..k).rev() {
            vertices.push(Point { x: energies[i], y: lower[i] });
        }
        if let Some(&first) = vertices.first() {
            vertices.push(first);
        }
        Self::from_vertices(vertices)
    }

    fn from_vertices(vertices: Vec<Point>) -> Self {
        let mut min = Point { x: f64::INFINITY, y: f64::INFINITY };
        let mut max = Point { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY };
        for v in &vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        Self { vertices, min, max }
    }

    /// Closed vertex list; the last vertex repeats the first
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Number of envelope samples the polygon was built from
    pub fn columns(&self) -> usize {
        self.vertices.len() / 2
    }

    /// Check if `(x, y)` lies inside or on the polygon
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.vertices.len() < 4 || !x.is_finite() || !y.is_finite() {
            return false;
        }
        if x < self.min.x || x > self.max.x || y < self.min.y || y > self.max.y {
            return false;
        }

        let extent = (self.max.x - self.min.x).max(self.max.y - self.min.y).max(1.0);
        let tolerance = EDGE_EPSILON * extent;
        let mut inside = false;

        for edge in self.vertices.windows(2) {
            let (a, b) = (edge[0], edge[1]);
            if on_segment(a, b, x, y, tolerance) {
                return true;
            }
            if (a.y > y) != (b.y > y) {
                let crossing = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
                if x < crossing {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Grid mass whose bin centers lie inside the polygon
    pub fn integrate(&self, grid: &DensityGrid) -> f64 {
        grid.integral_where(|x, y| self.contains(x, y))
    }
}

fn on_segment(a: Point, b: Point, x: f64, y: f64, tolerance: f64) -> bool {
    let cross = (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x);
    let length = libm::sqrt((b.x - a.x) * (b.x - a.x) + (b.y - a.y) * (b.y - a.y));
    if libm::fabs(cross) > tolerance * length.max(1.0) {
        return false;
    }
    x >= a.x.min(b.x) - tolerance
        && x <= a.x.max(b.x) + tolerance
        && y >= a.y.min(b.y) - tolerance
        && y <= a.y.max(b.y) + tolerance
}
