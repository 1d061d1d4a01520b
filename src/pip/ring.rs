//! Ray-casting point-in-polygon test.
//!
//! A horizontal ray is cast from the point towards +x and the edges it crosses
//! are counted; an odd count means the point is inside. An edge counts when the
//! point's y lies in the half-open span `(min_y, max_y]` of the edge and the
//! point is at or left of the edge's x-intercept at that y. Horizontal edges
//! never count.
//!
//! Points exactly on a vertex or an edge have no special handling: they land
//! on whichever side the crossing rule resolves to. The result is deterministic
//! for identical input, but callers must not rely on boundary points being
//! classified as inside.

use geo::{Coord, LineString, Rect};

use crate::models::Ring;

impl Ring {
    /// Whether `point` lies inside this ring.
    ///
    /// Points outside the bounding rectangle (including NaN coordinates) are
    /// rejected before any edge is visited.
    pub fn contains(&self, point: Coord<f64>) -> bool {
        match self.bbox() {
            Some(rect) if in_rect(rect, point) => ray_cast(point, self.exterior()),
            _ => false,
        }
    }
}

fn in_rect(rect: Rect<f64>, point: Coord<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    min.x <= point.x && point.x <= max.x && min.y <= point.y && point.y <= max.y
}

/// Crossing-parity test over every edge of a closed ring.
pub fn ray_cast(point: Coord<f64>, ring: &LineString<f64>) -> bool {
    let mut inside = false;

    for edge in ring.lines() {
        let (p1, p2) = (edge.start, edge.end);

        if point.y <= p1.y.min(p2.y) || point.y > p1.y.max(p2.y) {
            continue;
        }
        if point.x > p1.x.max(p2.x) {
            continue;
        }

        // p1.y != p2.y here, the span test rejects horizontal edges
        let crosses = p1.x == p2.x
            || point.x <= (point.y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;

        if crosses {
            inside = !inside;
        }
    }

    inside
}
