//! Nearest-waypoint lookup over the planned route.
//!
//! A plain linear scan. The route is short and queried once per frame, so a
//! spatial index has not been worth it yet; any replacement (k-d tree, local
//! search around the previous hit) must keep the earliest-index tie rule.

use crate::core::{PathPoint, Point3};

/// Ordered, read-only route.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    points: Vec<PathPoint>,
}

impl Path {
    /// Build from indexed points, in route order.
    pub fn new(points: Vec<PathPoint>) -> Self {
        Self { points }
    }

    /// Build from bare positions; indices are assigned in order.
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = Point3>,
    {
        let points = positions
            .into_iter()
            .enumerate()
            .map(|(index, position)| PathPoint { index, position })
            .collect();
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// Point carrying the given route index.
    pub fn get(&self, index: usize) -> Option<&PathPoint> {
        self.points
            .get(index)
            .filter(|p| p.index == index)
            .or_else(|| self.points.iter().find(|p| p.index == index))
    }

    /// Index of the point closest (3-D Euclidean) to `query`.
    ///
    /// Strict `<` comparison, so ties keep the earliest point. `None` for an
    /// empty route.
    pub fn nearest_index(&self, query: &Point3) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for point in &self.points {
            let d = (point.position - *query).length();
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((point.index, d)),
            }
        }
        best.map(|(index, _)| index)
    }
}
