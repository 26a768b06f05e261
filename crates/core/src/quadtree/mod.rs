//! Region quadtree over axis-aligned rectangles.
//!
//! The tree is built once per page with fixed bounds and limits,
//! populated by a single insertion pass, queried repeatedly, then
//! discarded. Items may straddle split lines and are then stored in
//! several leaves; every query keeps a per-call dedup set so each item
//! is reported exactly once.
//!
//! Besides the plain range query ([`QuadTree::retrieve`]) there are
//! four directional sweeps that deliver items in strict sweep-axis
//! order through a push callback which may stop the sweep early.

mod node;

use crate::error::{FlowError, Result};

use node::{QuadNode, Sweep};

/// Reserved extent meaning "unbounded along this axis".
///
/// Legal only on the far extent of query rectangles; stored items must
/// be fully bounded.
pub const UNBOUNDED: f64 = -1.0;

/// Default limit on subdivision depth.
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Default number of items a leaf holds before it splits.
pub const DEFAULT_MAX_CHILDREN: usize = 4;

/// An axis-aligned rectangle in page coordinates (y increases
/// downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge. Meaningless when the width is unbounded.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge. Meaningless when the height is unbounded.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn unbounded_width(&self) -> bool {
        self.width == UNBOUNDED
    }

    #[inline]
    pub fn unbounded_height(&self) -> bool {
        self.height == UNBOUNDED
    }

    /// True if this rectangle overlaps `query`, honoring the unbounded
    /// sentinel on the query's far extents.
    #[inline]
    pub(crate) fn overlaps_query(&self, query: Rect) -> bool {
        query.x <= self.x2()
            && query.y <= self.y2()
            && (self.x <= query.x2() || query.unbounded_width())
            && (self.y <= query.y2() || query.unbounded_height())
    }

    fn is_valid_bounds(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// A stored unit: a rectangle plus a caller-assigned dense id, used
/// for equality and deduplication.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub rect: Rect,
    pub id: usize,
}

impl Item {
    pub const fn new(rect: Rect, id: usize) -> Self {
        Self { rect, id }
    }
}

/// Per-query dedup set keyed by dense item id, backed by a bitset.
#[derive(Debug, Default)]
pub(crate) struct IdSet {
    bits: Vec<u64>,
}

impl IdSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as seen. Returns true if it was not seen before.
    pub(crate) fn insert(&mut self, id: usize) -> bool {
        let word = id / 64;
        let mask = 1u64 << (id % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        if self.bits[word] & mask != 0 {
            false
        } else {
            self.bits[word] |= mask;
            true
        }
    }

    pub(crate) fn contains(&self, id: usize) -> bool {
        self.bits
            .get(id / 64)
            .is_some_and(|w| w & (1u64 << (id % 64)) != 0)
    }
}

/// Facade owning the root node and the logical insert count.
pub struct QuadTree {
    root: QuadNode,
    len: usize,
}

impl QuadTree {
    /// Creates a tree with the default depth and leaf-size limits.
    pub fn new(bounds: Rect) -> Result<Self> {
        Self::with_limits(bounds, DEFAULT_MAX_DEPTH, DEFAULT_MAX_CHILDREN)
    }

    /// Creates a tree covering `bounds`, splitting leaves that reach
    /// `max_children` items until `max_depth` levels deep. Fails fast
    /// on malformed bounds.
    pub fn with_limits(bounds: Rect, max_depth: usize, max_children: usize) -> Result<Self> {
        if !bounds.is_valid_bounds() {
            return Err(FlowError::InvalidBounds {
                x: bounds.x,
                y: bounds.y,
                width: bounds.width,
                height: bounds.height,
            });
        }
        Ok(Self {
            root: QuadNode::new(bounds, 0, max_depth, max_children),
            len: 0,
        })
    }

    pub fn bounds(&self) -> Rect {
        self.root.bounds()
    }

    /// Number of logical inserts, independent of how many leaves
    /// physically store each item.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts an item. Items straddling split lines land in every
    /// matching child. Stored items must be fully bounded.
    pub fn insert(&mut self, item: Item) {
        debug_assert!(
            !item.rect.unbounded_width() && !item.rect.unbounded_height(),
            "stored items must not carry the unbounded sentinel"
        );
        self.root.insert(item);
        self.len += 1;
    }

    /// Inserts every item in order; each one counts toward `len`.
    pub fn insert_all(&mut self, items: impl IntoIterator<Item = Item>) {
        for item in items {
            self.insert(item);
        }
    }

    /// Range query: every stored item overlapping `query`, each
    /// reported exactly once, in no particular order.
    pub fn retrieve(&self, query: Rect) -> Vec<Item> {
        let mut out = Vec::new();
        let mut seen = IdSet::new();
        self.root.retrieve(query, &mut out, &mut seen);
        out
    }

    /// Sweeps items rightward from `start.x` in non-decreasing x
    /// order, restricted to the horizontal band `start.y ..
    /// start.y + start.height`. The callback returns false to stop the
    /// sweep; the return value is false when it did.
    pub fn retrieve_xinc<F>(&self, start: Rect, mut func: F) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let query = Rect::new(start.x, start.y, UNBOUNDED, start.height);
        self.root
            .retrieve_sweep(query, Sweep::XInc, &mut IdSet::new(), &mut func)
    }

    /// Mirror of [`retrieve_xinc`](Self::retrieve_xinc): sweeps
    /// leftward from `start.x` in non-increasing x order. Items whose
    /// x coordinate equals `start.x` are included.
    pub fn retrieve_xdec<F>(&self, start: Rect, mut func: F) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        // Anchor at the tree's left edge; the finite width up to the
        // sweep origin bounds the far side of the query.
        let left = self.root.bounds().x;
        let query = Rect::new(left, start.y, start.x - left, start.height);
        self.root
            .retrieve_sweep(query, Sweep::XDec, &mut IdSet::new(), &mut func)
    }

    /// Sweeps items downward from `start.y` in non-decreasing y order,
    /// restricted to the vertical band `start.x .. start.x +
    /// start.width`.
    pub fn retrieve_yinc<F>(&self, start: Rect, mut func: F) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let query = Rect::new(start.x, start.y, start.width, UNBOUNDED);
        self.root
            .retrieve_sweep(query, Sweep::YInc, &mut IdSet::new(), &mut func)
    }

    /// Mirror of [`retrieve_yinc`](Self::retrieve_yinc): sweeps from
    /// `start.y` in non-increasing y order. Items whose y coordinate
    /// equals `start.y` are included.
    pub fn retrieve_ydec<F>(&self, start: Rect, mut func: F) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let top = self.root.bounds().y;
        let query = Rect::new(start.x, top, start.width, start.y - top);
        self.root
            .retrieve_sweep(query, Sweep::YDec, &mut IdSet::new(), &mut func)
    }

    /// Indented per-node occupancy listing for debugging. No stability
    /// guarantee across versions.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.root.dump_into(&mut out);
        out
    }

    /// Walks the tree checking structural invariants: child depths,
    /// child-bounds containment, and that only max-depth leaves exceed
    /// the leaf-size limit.
    pub fn validate(&self) -> Result<()> {
        self.root.validate()
    }
}
