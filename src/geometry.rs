//! Planar polygon geometry in lon/lat coordinates.

use serde::Serialize;

/// A closed ring of `(x, y)` coordinates.
pub type Ring = Vec<(f64, f64)>;

/// A polygon with one exterior ring and any number of holes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.exterior.iter().copied())
    }
}

/// One or more polygons belonging to a single region.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl MultiPolygon {
    pub fn polygons(&self) -> &[Polygon] {
        &self.0
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.0.iter().flat_map(|p| p.exterior.iter().copied()))
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Returns `None` when the iterator yields no points.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut b = Bounds {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        };
        for (x, y) in iter {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn area(&self) -> f64 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grows the box by `fraction` of its extent on every side. A degenerate
    /// axis is padded by one unit instead.
    pub fn padded(self, fraction: f64) -> Bounds {
        let pad = |lo: f64, hi: f64| {
            let extent = hi - lo;
            if extent > 0.0 { extent * fraction } else { 1.0 }
        };
        let px = pad(self.min_x, self.max_x);
        let py = pad(self.min_y, self.max_y);
        Bounds {
            min_x: self.min_x - px,
            min_y: self.min_y - py,
            max_x: self.max_x + px,
            max_y: self.max_y + py,
        }
    }
}
