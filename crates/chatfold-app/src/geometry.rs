// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};

use crate::ChatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

/// Axis-aligned rectangle with half-open extents: `left..right`, `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left.saturating_add(width),
            bottom: top.saturating_add(height),
        }
    }

    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Normalizes two arbitrary corners; corner order does not matter.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Both axes must overlap; touching edges do not count.
    pub const fn intersects(&self, other: &Self) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            left: self.left.saturating_add(dx),
            top: self.top.saturating_add(dy),
            right: self.right.saturating_add(dx),
            bottom: self.bottom.saturating_add(dy),
        }
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let clipped = Self {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        (clipped.left < clipped.right && clipped.top < clipped.bottom).then_some(clipped)
    }
}

/// Screen-space row rectangles captured when a marquee starts.
///
/// The snapshot lives inside the marquee gesture and is dropped with it, so
/// it cannot be read once the gesture ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeometryCache {
    rects: BTreeMap<ChatId, Rect>,
}

impl GeometryCache {
    pub fn capture<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (ChatId, Rect)>,
    {
        Self {
            rects: rows.into_iter().collect(),
        }
    }

    pub fn rect(&self, id: ChatId) -> Option<Rect> {
        self.rects.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Ids whose rectangles intersect `area` once every cached rectangle is
    /// shifted up by `scrolled_by` (content scrolled since capture).
    pub fn hits(&self, area: Rect, scrolled_by: i32) -> BTreeSet<ChatId> {
        self.rects
            .iter()
            .filter(|(_, rect)| rect.translate(0, -scrolled_by).intersects(&area))
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{GeometryCache, Point, Rect};
    use crate::ChatId;
    use std::collections::BTreeSet;

    fn strip_cache() -> GeometryCache {
        GeometryCache::capture([
            (ChatId::new(1), Rect::from_edges(0, 0, 10, 10)),
            (ChatId::new(2), Rect::from_edges(20, 0, 30, 10)),
            (ChatId::new(3), Rect::from_edges(40, 0, 50, 10)),
            (ChatId::new(4), Rect::from_edges(60, 0, 70, 10)),
        ])
    }

    fn ids(values: &[i64]) -> BTreeSet<ChatId> {
        values.iter().copied().map(ChatId::new).collect()
    }

    #[test]
    fn marquee_across_middle_items_hits_exactly_those() {
        let area = Rect::from_corners(Point::new(15, 2), Point::new(45, 8));
        assert_eq!(strip_cache().hits(area, 0), ids(&[2, 3]));
    }

    #[test]
    fn corner_order_is_irrelevant() {
        let cache = strip_cache();
        let a = Point::new(45, 8);
        let b = Point::new(15, 2);
        let corners = [
            (a, b),
            (b, a),
            (Point::new(15, 8), Point::new(45, 2)),
            (Point::new(45, 2), Point::new(15, 8)),
        ];
        for (first, second) in corners {
            assert_eq!(
                cache.hits(Rect::from_corners(first, second), 0),
                ids(&[2, 3]),
                "corners {first:?} {second:?}"
            );
        }
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let left = Rect::from_edges(0, 0, 10, 10);
        let right = Rect::from_edges(10, 0, 20, 10);
        let below = Rect::from_edges(0, 10, 10, 20);
        assert!(!left.intersects(&right));
        assert!(!left.intersects(&below));
        assert!(left.intersects(&Rect::from_edges(9, 9, 11, 11)));
    }

    #[test]
    fn hits_account_for_scroll_since_capture() {
        let cache = GeometryCache::capture([
            (ChatId::new(1), Rect::from_edges(0, 0, 10, 10)),
            (ChatId::new(2), Rect::from_edges(0, 10, 10, 20)),
            (ChatId::new(3), Rect::from_edges(0, 20, 10, 30)),
        ]);
        let area = Rect::from_edges(0, 0, 10, 5);
        assert_eq!(cache.hits(area, 0), ids(&[1]));
        assert_eq!(cache.hits(area, 20), ids(&[3]));
    }

    #[test]
    fn intersection_clips_or_disappears() {
        let outer = Rect::new(0, 0, 10, 10);
        assert_eq!(
            outer.intersection(&Rect::new(5, 5, 10, 10)),
            Some(Rect::from_edges(5, 5, 10, 10))
        );
        assert_eq!(outer.intersection(&Rect::new(10, 0, 4, 4)), None);
    }

    #[test]
    fn contains_is_half_open() {
        let rect = Rect::new(2, 2, 3, 3);
        assert!(rect.contains(Point::new(2, 2)));
        assert!(rect.contains(Point::new(4, 4)));
        assert!(!rect.contains(Point::new(5, 4)));
    }
}
