//! Vector/geometry collaborator types.
//!
//! Polygons live in pixel coordinates and carry a name plus optional string
//! attributes. The classification pipeline only needs rectangle
//! intersection tests, per-pixel membership, and attribute lookup.
use std::collections::HashMap;

use ndarray::Array2;

use crate::raster::Rect;

/// Pixel value marking "not inside any training polygon" in an indicator
/// window.
pub const NOT_IN_POLYGON: i32 = -1;

/// A named polygon overlay with optional attributes.
#[derive(Debug, Clone)]
pub struct PolygonVector {
    pub name: String,
    pub attributes: HashMap<String, String>,
    /// Outer ring vertices in pixel coordinates; implicitly closed.
    pub ring: Vec<(f64, f64)>,
}

impl PolygonVector {
    pub fn new(name: impl Into<String>, ring: Vec<(f64, f64)>) -> Self {
        PolygonVector {
            name: name.into(),
            attributes: HashMap::new(),
            ring,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ring.len() < 3
    }

    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for &(x, y) in &self.ring {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        (min_x, min_y, max_x, max_y)
    }

    /// Bounding-box overlap test against a pixel rectangle. Pixels are still
    /// filtered by [`PolygonVector::contains`], so a coarse test suffices.
    pub fn intersects(&self, rect: &Rect) -> bool {
        if self.is_empty() {
            return false;
        }
        let (min_x, min_y, max_x, max_y) = self.bounds();
        max_x >= rect.x as f64
            && min_x < rect.x_max() as f64
            && max_y >= rect.y as f64
            && min_y < rect.y_max() as f64
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.ring.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.ring[i];
            let (xj, yj) = self.ring[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Indices of the polygons that intersect `rect`, preserving input order.
pub fn polygons_intersecting(rect: &Rect, polygons: &[&PolygonVector]) -> Vec<usize> {
    polygons
        .iter()
        .enumerate()
        .filter(|(_, p)| p.intersects(rect))
        .map(|(i, _)| i)
        .collect()
}

/// Build the per-pixel class-indicator window for one tile rectangle.
///
/// `indexed` pairs each polygon with its configured vector index. Every
/// pixel gets the index of the last polygon (in input order) whose interior
/// covers the pixel center, or [`NOT_IN_POLYGON`] when none does. Iterating
/// in order and overwriting keeps the later-polygon-wins rule on overlaps.
pub fn class_indicator_window(rect: &Rect, indexed: &[(usize, &PolygonVector)]) -> Array2<i32> {
    let mut indicator = Array2::from_elem((rect.height, rect.width), NOT_IN_POLYGON);
    for (idx, polygon) in indexed {
        for row in 0..rect.height {
            let py = (rect.y + row) as f64 + 0.5;
            for col in 0..rect.width {
                let px = (rect.x + col) as f64 + 0.5;
                if polygon.contains(px, py) {
                    indicator[(row, col)] = *idx as i32;
                }
            }
        }
    }
    indicator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(name: &str, x0: f64, y0: f64, side: f64) -> PolygonVector {
        PolygonVector::new(
            name,
            vec![
                (x0, y0),
                (x0 + side, y0),
                (x0 + side, y0 + side),
                (x0, y0 + side),
            ],
        )
    }

    #[test]
    fn contains_uses_even_odd_rule() {
        let p = square("water", 0.0, 0.0, 4.0);
        assert!(p.contains(2.0, 2.0));
        assert!(!p.contains(5.0, 2.0));
        assert!(!p.contains(-0.5, 2.0));
    }

    #[test]
    fn intersection_filter_keeps_order() {
        let a = square("a", 0.0, 0.0, 4.0);
        let b = square("b", 100.0, 100.0, 4.0);
        let c = square("c", 2.0, 2.0, 4.0);
        let polys = [&a, &b, &c];
        let rect = Rect::new(0, 0, 8, 8);
        assert_eq!(polygons_intersecting(&rect, &polys), vec![0, 2]);
    }

    #[test]
    fn last_polygon_wins_on_overlap() {
        let a = square("a", 0.0, 0.0, 4.0);
        let b = square("b", 2.0, 0.0, 4.0);
        let rect = Rect::new(0, 0, 8, 4);
        let indicator = class_indicator_window(&rect, &[(0, &a), (1, &b)]);
        assert_eq!(indicator[(1, 1)], 0); // only a
        assert_eq!(indicator[(1, 3)], 1); // overlap, b wins
        assert_eq!(indicator[(1, 5)], 1); // only b
        assert_eq!(indicator[(1, 7)], NOT_IN_POLYGON);
    }

    #[test]
    fn degenerate_ring_is_empty() {
        let p = PolygonVector::new("line", vec![(0.0, 0.0), (1.0, 1.0)]);
        assert!(p.is_empty());
        assert!(!p.contains(0.5, 0.5));
        assert!(!p.intersects(&Rect::new(0, 0, 4, 4)));
    }
}
