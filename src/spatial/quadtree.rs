use serde::Serialize;

use super::{Point, Rectangle};

pub const DEFAULT_CAPACITY: usize = 4;
pub const MAX_DEPTH: usize = 10;

const NORTHWEST: usize = 0;
const NORTHEAST: usize = 1;
const SOUTHWEST: usize = 2;
const SOUTHEAST: usize = 3;

/// Debug view of one quadtree cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QuadCell {
    pub boundary: Rectangle,
    pub depth: usize,
    pub is_leaf: bool,
    pub len: usize,
}

/// Closed cell extent kept as corners, so siblings share their split line
/// bit for bit and a child's far edge is exactly its parent's.
#[derive(Clone, Copy, Debug)]
struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    fn of(rect: &Rectangle) -> Self {
        Self {
            min_x: rect.x,
            min_y: rect.y,
            max_x: rect.right(),
            max_y: rect.bottom(),
        }
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    fn overlaps(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    fn split(&self) -> (f32, f32) {
        let mid_x = (self.min_x + ((self.max_x - self.min_x) * 0.5)).clamp(self.min_x, self.max_x);
        let mid_y = (self.min_y + ((self.max_y - self.min_y) * 0.5)).clamp(self.min_y, self.max_y);
        (mid_x, mid_y)
    }

    fn distance_sq_to(&self, x: f32, y: f32) -> f32 {
        let dx = (self.min_x - x).max(x - self.max_x).max(0.0);
        let dy = (self.min_y - y).max(y - self.max_y).max(0.0);
        (dx * dx) + (dy * dy)
    }

    fn rectangle(&self) -> Rectangle {
        Rectangle::new(
            self.min_x,
            self.min_y,
            self.max_x - self.min_x,
            self.max_y - self.min_y,
        )
    }
}

/// Region quadtree. A node is either a leaf holding at most `capacity` points,
/// or divided into four owned children and holding none.
///
/// Leaves at [`MAX_DEPTH`] accept points beyond capacity so that coincident
/// points cannot subdivide forever.
#[derive(Clone, Debug)]
pub struct QuadTree<K = String> {
    boundary: Rectangle,
    bounds: Bounds,
    capacity: usize,
    depth: usize,
    points: Vec<Point<K>>,
    children: Option<Box<[QuadTree<K>; 4]>>,
}

impl<K> QuadTree<K> {
    pub fn new(boundary: Rectangle) -> Self {
        Self::with_capacity(boundary, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(boundary: Rectangle, capacity: usize) -> Self {
        Self::node(boundary, Bounds::of(&boundary), capacity.max(1), 0)
    }

    fn node(boundary: Rectangle, bounds: Bounds, capacity: usize, depth: usize) -> Self {
        Self {
            boundary,
            bounds,
            capacity,
            depth,
            points: Vec::new(),
            children: None,
        }
    }

    fn child(bounds: Bounds, capacity: usize, depth: usize) -> Self {
        Self::node(bounds.rectangle(), bounds, capacity, depth)
    }

    pub fn boundary(&self) -> Rectangle {
        self.boundary
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_divided(&self) -> bool {
        self.children.is_some()
    }

    pub fn points(&self) -> &[Point<K>] {
        &self.points
    }

    /// Returns `false` when the point lies outside the boundary.
    pub fn insert(&mut self, point: Point<K>) -> bool {
        if !self.bounds.contains(point.x, point.y) {
            return false;
        }

        self.insert_contained(point);
        true
    }

    fn insert_contained(&mut self, point: Point<K>) {
        if let Some(children) = self.children.as_mut() {
            let quadrant = quadrant_for(self.bounds, point.x, point.y);
            children[quadrant].insert_contained(point);
            return;
        }

        if self.points.len() < self.capacity || self.depth >= MAX_DEPTH {
            self.points.push(point);
            return;
        }

        self.subdivide();
        self.insert_contained(point);
    }

    fn subdivide(&mut self) {
        let Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
        } = self.bounds;
        let (mid_x, mid_y) = self.bounds.split();
        let depth = self.depth + 1;
        let capacity = self.capacity;

        let mut children = Box::new([
            Self::child(
                Bounds {
                    min_x,
                    min_y,
                    max_x: mid_x,
                    max_y: mid_y,
                },
                capacity,
                depth,
            ),
            Self::child(
                Bounds {
                    min_x: mid_x,
                    min_y,
                    max_x,
                    max_y: mid_y,
                },
                capacity,
                depth,
            ),
            Self::child(
                Bounds {
                    min_x,
                    min_y: mid_y,
                    max_x: mid_x,
                    max_y,
                },
                capacity,
                depth,
            ),
            Self::child(
                Bounds {
                    min_x: mid_x,
                    min_y: mid_y,
                    max_x,
                    max_y,
                },
                capacity,
                depth,
            ),
        ]);

        // points held before the split move down with it
        for point in self.points.drain(..) {
            let quadrant = quadrant_for(self.bounds, point.x, point.y);
            children[quadrant].insert_contained(point);
        }

        self.children = Some(children);
    }

    /// All points inside `range`, edges included.
    pub fn query_range(&self, range: &Rectangle) -> Vec<&Point<K>> {
        let mut found = Vec::new();
        self.query_range_into(range, &mut found);
        found
    }

    pub fn query_range_into<'a>(&'a self, range: &Rectangle, found: &mut Vec<&'a Point<K>>) {
        self.collect_in_bounds(&Bounds::of(range), found);
    }

    fn collect_in_bounds<'a>(&'a self, range: &Bounds, found: &mut Vec<&'a Point<K>>) {
        if !self.bounds.overlaps(range) {
            return;
        }

        found.extend(
            self.points
                .iter()
                .filter(|point| range.contains(point.x, point.y)),
        );

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_in_bounds(range, found);
            }
        }
    }

    /// All points within Euclidean `radius` of the centre, boundary included.
    pub fn query_circle(&self, center_x: f32, center_y: f32, radius: f32) -> Vec<&Point<K>> {
        let mut found = Vec::new();
        self.query_circle_into(center_x, center_y, radius, &mut found);
        found
    }

    pub fn query_circle_into<'a>(
        &'a self,
        center_x: f32,
        center_y: f32,
        radius: f32,
        found: &mut Vec<&'a Point<K>>,
    ) {
        if radius.is_nan() || radius < 0.0 {
            return;
        }
        self.collect_in_circle(center_x, center_y, radius * radius, found);
    }

    fn collect_in_circle<'a>(
        &'a self,
        center_x: f32,
        center_y: f32,
        radius_sq: f32,
        found: &mut Vec<&'a Point<K>>,
    ) {
        if self.bounds.distance_sq_to(center_x, center_y) > radius_sq {
            return;
        }

        found.extend(
            self.points
                .iter()
                .filter(|point| point.distance_sq_to(center_x, center_y) <= radius_sq),
        );

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_in_circle(center_x, center_y, radius_sq, found);
            }
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.children = None;
    }

    pub fn size(&self) -> usize {
        let nested: usize = self
            .children
            .as_ref()
            .map(|children| children.iter().map(QuadTree::size).sum())
            .unwrap_or(0);
        self.points.len() + nested
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Every cell in depth-first order, parents before children.
    pub fn cells(&self) -> Vec<QuadCell> {
        let mut cells = Vec::new();
        self.collect_cells(&mut cells);
        cells
    }

    fn collect_cells(&self, cells: &mut Vec<QuadCell>) {
        cells.push(QuadCell {
            boundary: self.boundary,
            depth: self.depth,
            is_leaf: !self.is_divided(),
            len: self.points.len(),
        });

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_cells(cells);
            }
        }
    }
}

/// A point on a dividing line goes to the west/north side, so every point
/// lands in exactly one leaf.
fn quadrant_for(bounds: Bounds, x: f32, y: f32) -> usize {
    let (mid_x, mid_y) = bounds.split();
    let east = x > mid_x;
    let south = y > mid_y;
    match (east, south) {
        (false, false) => NORTHWEST,
        (true, false) => NORTHEAST,
        (false, true) => SOUTHWEST,
        (true, true) => SOUTHEAST,
    }
}
