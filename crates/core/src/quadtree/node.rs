//! Quadtree nodes: subdivision, membership, range query, sweeps.

use std::cmp::Ordering;
use std::fmt::Write;

use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::error::{FlowError, Result};

use super::{IdSet, Item, Rect};

/// One of the four regions produced by bisecting a node's bounds at
/// its center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub(crate) enum Quadrant {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl Quadrant {
    fn label(self) -> &'static str {
        match self {
            Quadrant::TopLeft => "TOP_LEFT",
            Quadrant::TopRight => "TOP_RIGHT",
            Quadrant::BottomLeft => "BOTTOM_LEFT",
            Quadrant::BottomRight => "BOTTOM_RIGHT",
        }
    }
}

const QUADRANTS: [Quadrant; 4] = [
    Quadrant::TopLeft,
    Quadrant::TopRight,
    Quadrant::BottomLeft,
    Quadrant::BottomRight,
];

/// Direction of an ordered sweep retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sweep {
    XInc,
    XDec,
    YInc,
    YDec,
}

impl Sweep {
    /// Quadrant pairs in visit order, the near side of the sweep
    /// first. The two quadrants of a pair sit on either side of the
    /// split line orthogonal to the sweep axis.
    fn pairs(self) -> [(Quadrant, Quadrant); 2] {
        use Quadrant::*;
        match self {
            Sweep::XInc => [(TopLeft, BottomLeft), (TopRight, BottomRight)],
            Sweep::XDec => [(TopRight, BottomRight), (TopLeft, BottomLeft)],
            Sweep::YInc => [(TopLeft, TopRight), (BottomLeft, BottomRight)],
            Sweep::YDec => [(BottomLeft, BottomRight), (TopLeft, TopRight)],
        }
    }

    /// Ordering of two items along the sweep axis.
    fn cmp(self, a: &Item, b: &Item) -> Ordering {
        match self {
            Sweep::XInc => OrderedFloat(a.rect.x).cmp(&OrderedFloat(b.rect.x)),
            Sweep::XDec => OrderedFloat(b.rect.x).cmp(&OrderedFloat(a.rect.x)),
            Sweep::YInc => OrderedFloat(a.rect.y).cmp(&OrderedFloat(b.rect.y)),
            Sweep::YDec => OrderedFloat(b.rect.y).cmp(&OrderedFloat(a.rect.y)),
        }
    }
}

/// A node is either a leaf owning items or an internal node owning
/// exactly four children. The exclusivity is structural.
enum NodeKind {
    Leaf(Vec<Item>),
    Internal(Box<[QuadNode; 4]>),
}

pub(crate) struct QuadNode {
    bounds: Rect,
    depth: usize,
    max_depth: usize,
    max_children: usize,
    kind: NodeKind,
}

impl QuadNode {
    pub(crate) fn new(bounds: Rect, depth: usize, max_depth: usize, max_children: usize) -> Self {
        Self {
            bounds,
            depth,
            max_depth,
            max_children,
            kind: NodeKind::Leaf(Vec::new()),
        }
    }

    pub(crate) fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Quadrant membership test against this node's center. A
    /// rectangle straddling the split lines, or carrying the unbounded
    /// sentinel along the tested axis, hits 2 or 4 quadrants.
    fn find_quadrants(&self, rect: Rect) -> [bool; 4] {
        let bx = self.bounds.x + self.bounds.width / 2.0;
        let by = self.bounds.y + self.bounds.height / 2.0;
        let mut hits = [false; 4];

        let spans_right = rect.unbounded_width() || rect.x2() >= bx;
        if rect.y < by {
            if rect.x < bx {
                hits[Quadrant::TopLeft as usize] = true;
                if spans_right {
                    hits[Quadrant::TopRight as usize] = true;
                }
            } else {
                hits[Quadrant::TopRight as usize] = true;
            }
        }
        if rect.y >= by || rect.unbounded_height() || rect.y2() >= by {
            if rect.x < bx {
                hits[Quadrant::BottomLeft as usize] = true;
                if spans_right {
                    hits[Quadrant::BottomRight as usize] = true;
                }
            } else {
                hits[Quadrant::BottomRight as usize] = true;
            }
        }
        hits
    }

    pub(crate) fn insert(&mut self, item: Item) {
        let hits = self.find_quadrants(item.rect);
        let needs_split = match &mut self.kind {
            NodeKind::Internal(children) => {
                // Straddling items go into every matching child.
                for (i, hit) in hits.iter().enumerate() {
                    if *hit {
                        children[i].insert(item);
                    }
                }
                false
            }
            NodeKind::Leaf(items) => {
                items.push(item);
                // Past max_depth a leaf may exceed max_children.
                items.len() >= self.max_children && self.depth < self.max_depth
            }
        };
        if needs_split {
            self.subdivide();
        }
    }

    /// Turns this leaf into an internal node, redistributing its items
    /// into four children. Child extents use floored halves so they
    /// stay integral across levels instead of drifting.
    fn subdivide(&mut self) {
        let items = match &mut self.kind {
            NodeKind::Leaf(items) => std::mem::take(items),
            NodeKind::Internal(_) => return,
        };

        let depth = self.depth + 1;
        let (max_depth, max_children) = (self.max_depth, self.max_children);
        let bx = self.bounds.x;
        let by = self.bounds.y;
        let half_w = (self.bounds.width / 2.0).floor();
        let half_h = (self.bounds.height / 2.0).floor();

        let child = |x: f64, y: f64| {
            QuadNode::new(Rect::new(x, y, half_w, half_h), depth, max_depth, max_children)
        };
        self.kind = NodeKind::Internal(Box::new([
            child(bx, by),
            child(bx + half_w, by),
            child(bx, by + half_h),
            child(bx + half_w, by + half_h),
        ]));

        for item in items {
            self.insert(item);
        }
    }

    /// Range query. Dedup happens at the leaves through the shared
    /// `seen` set.
    pub(crate) fn retrieve(&self, query: Rect, out: &mut Vec<Item>, seen: &mut IdSet) {
        match &self.kind {
            NodeKind::Internal(children) => {
                let hits = self.find_quadrants(query);
                for (i, hit) in hits.iter().enumerate() {
                    if *hit {
                        children[i].retrieve(query, out, seen);
                    }
                }
            }
            NodeKind::Leaf(items) => {
                for item in items {
                    if item.rect.overlaps_query(query) && seen.insert(item.id) {
                        out.push(*item);
                    }
                }
            }
        }
    }

    /// Ordered sweep. Returns false as soon as the callback stopped
    /// the sweep; the stop propagates through every active frame.
    ///
    /// Order is free while the query touches only one quadrant of a
    /// pair. When it straddles the split line orthogonal to the sweep,
    /// both quadrants are drained through `retrieve` into a local
    /// buffer which is sorted before delivery; the cost stays confined
    /// to the straddling subtree.
    pub(crate) fn retrieve_sweep<F>(
        &self,
        query: Rect,
        dir: Sweep,
        seen: &mut IdSet,
        func: &mut F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        match &self.kind {
            NodeKind::Internal(children) => {
                let hits = self.find_quadrants(query);
                for (a, b) in dir.pairs() {
                    let (hit_a, hit_b) = (hits[a as usize], hits[b as usize]);
                    if hit_a && hit_b {
                        let mut buf = Vec::new();
                        children[a as usize].retrieve(query, &mut buf, seen);
                        children[b as usize].retrieve(query, &mut buf, seen);
                        buf.sort_unstable_by(|x, y| dir.cmp(x, y));
                        for item in buf {
                            if !func(item) {
                                return false;
                            }
                        }
                    } else if hit_a {
                        if !children[a as usize].retrieve_sweep(query, dir, seen, func) {
                            return false;
                        }
                    } else if hit_b {
                        if !children[b as usize].retrieve_sweep(query, dir, seen, func) {
                            return false;
                        }
                    }
                }
                true
            }
            NodeKind::Leaf(items) => {
                // Sort a local copy; stored order stays untouched.
                let mut ordered: SmallVec<[Item; 16]> = items.iter().copied().collect();
                ordered.sort_unstable_by(|x, y| dir.cmp(x, y));
                for item in ordered {
                    if item.rect.overlaps_query(query) && !seen.contains(item.id) {
                        if !func(item) {
                            return false;
                        }
                        seen.insert(item.id);
                    }
                }
                true
            }
        }
    }

    pub(crate) fn dump_into(&self, out: &mut String) {
        let indent = "  ".repeat(self.depth);
        match &self.kind {
            NodeKind::Internal(children) => {
                for (i, child) in children.iter().enumerate() {
                    let _ = writeln!(out, "{indent}depth {} {}", self.depth, QUADRANTS[i].label());
                    child.dump_into(out);
                }
            }
            NodeKind::Leaf(items) => {
                let _ = writeln!(out, "{indent}leaf with {} items", items.len());
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match &self.kind {
            NodeKind::Internal(children) => {
                for child in children.iter() {
                    if child.depth != self.depth + 1 {
                        return Err(FlowError::InvariantViolation(format!(
                            "child at depth {} under node at depth {}",
                            child.depth, self.depth
                        )));
                    }
                    let (b, c) = (self.bounds, child.bounds);
                    if c.x < b.x || c.y < b.y || c.x2() > b.x2() || c.y2() > b.y2() {
                        return Err(FlowError::InvariantViolation(format!(
                            "child bounds ({}, {}, {}, {}) escape parent ({}, {}, {}, {})",
                            c.x, c.y, c.width, c.height, b.x, b.y, b.width, b.height
                        )));
                    }
                    child.validate()?;
                }
                Ok(())
            }
            NodeKind::Leaf(items) => {
                if items.len() >= self.max_children && self.depth < self.max_depth {
                    return Err(FlowError::InvariantViolation(format!(
                        "leaf at depth {} holds {} items, limit {}",
                        self.depth,
                        items.len(),
                        self.max_children
                    )));
                }
                Ok(())
            }
        }
    }
}
