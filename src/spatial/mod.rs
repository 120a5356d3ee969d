//! Point-region quadtree over 2-D positions.
//!
//! The index knows nothing about physics. The simulation rebuilds one every tick
//! from its own node array, and the layout controller keeps one built from the
//! latest published positions for hit-testing.

mod quadtree;

use serde::Serialize;

pub use quadtree::{DEFAULT_CAPACITY, MAX_DEPTH, QuadCell, QuadTree};

#[derive(Clone, Debug, PartialEq)]
pub struct Point<K = String> {
    pub id: K,
    pub x: f32,
    pub y: f32,
}

impl<K> Point<K> {
    pub fn new(id: K, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }

    pub fn distance_sq_to(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx) + (dy * dy)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
///
/// Containment and overlap tests are closed on every edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Bounding box of `positions`, grown by `margin` on every side and with
    /// each side at least `min_size` long. `None` for empty or non-finite input.
    pub fn bounding<I>(positions: I, margin: f32, min_size: f32) -> Option<Self>
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for (x, y) in positions {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if !min_x.is_finite() || !min_y.is_finite() || !max_x.is_finite() || !max_y.is_finite() {
            return None;
        }

        let margin = margin.max(0.0);
        let width = (max_x - min_x).max(min_size) + (margin * 2.0);
        let height = (max_y - min_y).max(min_size) + (margin * 2.0);
        let center_x = (min_x + max_x) * 0.5;
        let center_y = (min_y + max_y) * 0.5;

        Some(Self::new(
            center_x - (width * 0.5),
            center_y - (height * 0.5),
            width,
            height,
        ))
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + (self.width * 0.5), self.y + (self.height * 0.5))
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        !(other.x > self.right()
            || other.right() < self.x
            || other.y > self.bottom()
            || other.bottom() < self.y)
    }

    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(self.x, self.right()), y.clamp(self.y, self.bottom()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_closed_on_every_edge() {
        let rect = Rectangle::new(0.0, 0.0, 10.0, 20.0);
        assert!(rect.contains(0.0, 0.0));
        assert!(rect.contains(10.0, 20.0));
        assert!(rect.contains(10.0, 0.0));
        assert!(!rect.contains(10.001, 5.0));
        assert!(!rect.contains(5.0, -0.001));
    }

    #[test]
    fn intersects_touching_edges() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rectangle::new(10.0, 10.0, 5.0, 5.0);
        let apart = Rectangle::new(10.5, 0.0, 5.0, 5.0);
        let inside = Rectangle::new(2.0, 2.0, 1.0, 1.0);

        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
        assert!(!a.intersects(&apart));
        assert!(a.intersects(&inside));
        assert!(inside.intersects(&a));
    }

    #[test]
    fn negative_extent_is_clamped_to_zero() {
        let rect = Rectangle::new(5.0, 5.0, -3.0, -1.0);
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 0.0);
        assert!(rect.contains(5.0, 5.0));
    }

    #[test]
    fn bounding_grows_by_margin_and_floor() {
        let rect = Rectangle::bounding([(0.0, 0.0), (0.0, 0.0)], 5.0, 1.0).unwrap();
        assert_eq!(rect.width, 11.0);
        assert_eq!(rect.height, 11.0);
        assert!(rect.contains(0.0, 0.0));

        let rect = Rectangle::bounding([(-10.0, 0.0), (30.0, 4.0)], 2.0, 1.0).unwrap();
        assert!(rect.contains(-12.0, -2.0));
        assert!(rect.contains(32.0, 6.0));
    }

    #[test]
    fn bounding_rejects_empty_and_non_finite() {
        assert!(Rectangle::bounding(std::iter::empty(), 1.0, 1.0).is_none());
        assert!(Rectangle::bounding([(f32::NAN, 0.0)], 1.0, 1.0).is_none());
        assert!(Rectangle::bounding([(0.0, 0.0), (f32::INFINITY, 1.0)], 1.0, 1.0).is_none());
    }
}
