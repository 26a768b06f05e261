//! Reading-order adjacency over positioned text fragments.
//!
//! [`FlowLinker`] derives per-fragment geometry from the page
//! transforms, indexes every fragment in one per-page quadtree, then
//! sweeps right and down from each fragment to record its nearest
//! distinct neighbor in either direction. The resulting sparse
//! directed graph is what column and line reconstruction downstream
//! consume; those heuristics themselves live outside this crate.

use std::f64::consts::FRAC_PI_2;

use smol_str::SmolStr;

use crate::error::Result;
use crate::quadtree::{Item, QuadTree, Rect, UNBOUNDED};
use crate::utils::{Matrix, apply_matrix_norm};

use super::style::StyleMap;

/// Tree limits for per-page fragment indexing. Pages hold hundreds to
/// low thousands of fragments; wide leaves beat deep subdivision here.
const FLOW_MAX_DEPTH: usize = 4;
const FLOW_MAX_CHILDREN: usize = 16;

/// A positioned text fragment as handed over by the upstream page
/// parser.
#[derive(Debug, Clone)]
pub struct PageFragment {
    /// Affine transform placing the fragment on the page.
    pub transform: Matrix,
    pub text: String,
    /// Key into the style lookup.
    pub fontname: SmolStr,
    /// Precomputed bounding extent.
    pub width: f64,
    pub height: f64,
}

/// A fragment augmented with derived geometry and neighbor links.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedFragment {
    /// Index of the fragment in the input list.
    pub id: usize,
    /// Ascent-adjusted anchor at the glyph's visual top.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in radians; vertical styles are shifted by a quarter
    /// turn.
    pub angle: f64,
    /// Scale magnitude of the transform.
    pub font_height: f64,
    pub vertical: bool,
    /// Nearest distinct fragment to the right, if any.
    pub right: Option<usize>,
    /// Nearest distinct fragment below, if any.
    pub bottom: Option<usize>,
    /// True when the text has no non-whitespace character. Whitespace
    /// fragments are indexed but excluded from topmost tracking.
    pub is_whitespace: bool,
    /// The trimmed text parsed as an integer, kept for downstream
    /// page/line-number detection.
    pub as_int: Option<i64>,
}

/// Result of linking one page.
#[derive(Debug, Clone)]
pub struct LinkedPage {
    pub fragments: Vec<LinkedFragment>,
    /// Non-whitespace fragment with the greatest y, exposed for
    /// downstream consumers.
    pub topmost: Option<usize>,
}

/// Builds one quadtree per page and fills in right/bottom links.
pub struct FlowLinker {
    page_bounds: Rect,
}

impl FlowLinker {
    pub fn new(page_bounds: Rect) -> Self {
        Self { page_bounds }
    }

    /// Derives geometry for every fragment, indexes the page, and
    /// records each fragment's nearest right and bottom neighbor.
    pub fn link(&self, fragments: &[PageFragment], styles: &StyleMap) -> Result<LinkedPage> {
        let mut derived: Vec<LinkedFragment> = fragments
            .iter()
            .enumerate()
            .map(|(id, frag)| derive_fragment(id, frag, styles))
            .collect();

        let mut tree =
            QuadTree::with_limits(self.page_bounds, FLOW_MAX_DEPTH, FLOW_MAX_CHILDREN)?;
        for d in &derived {
            tree.insert(Item::new(Rect::new(d.x, d.y, d.width, d.height), d.id));
        }

        let mut topmost: Option<usize> = None;
        for i in 0..derived.len() {
            let d = &derived[i];
            let (id, x, y, width, height) = (d.id, d.x, d.y, d.width, d.height);

            if !d.is_whitespace {
                topmost = match topmost {
                    Some(t) if derived[t].y >= y => Some(t),
                    _ => Some(id),
                };
            }

            // Nearest item to the right: sweep rightward from the
            // fragment's right edge across its own vertical band.
            let mut right = None;
            tree.retrieve_xinc(Rect::new(x + width, y, UNBOUNDED, height), |c| {
                if c.id == id {
                    true
                } else {
                    right = Some(c.id);
                    false
                }
            });

            // Nearest item below: decreasing-y sweep from the
            // fragment's bottom edge across its own horizontal band.
            let mut bottom = None;
            tree.retrieve_ydec(Rect::new(x, y - height, width, UNBOUNDED), |c| {
                if c.id == id {
                    true
                } else {
                    bottom = Some(c.id);
                    false
                }
            });

            derived[i].right = right;
            derived[i].bottom = bottom;
        }

        Ok(LinkedPage {
            fragments: derived,
            topmost,
        })
    }
}

fn derive_fragment(id: usize, frag: &PageFragment, styles: &StyleMap) -> LinkedFragment {
    let style = styles.get(&frag.fontname).copied().unwrap_or_default();
    let (a, b, _, _, e, f) = frag.transform;

    let mut angle = b.atan2(a);
    if style.vertical {
        angle += FRAC_PI_2;
    }

    let (sx, sy) = apply_matrix_norm(frag.transform, (0.0, 1.0));
    let font_height = sx.hypot(sy);

    // Anchor at the glyph's visual top: the ascent vector, rotated by
    // the fragment's angle. Descent is negative, hence 1 + descent.
    let ascent = match (style.ascent, style.descent) {
        (Some(asc), _) => asc * font_height,
        (None, Some(desc)) => (1.0 + desc) * font_height,
        (None, None) => font_height,
    };
    let x = e + ascent * angle.sin();
    let y = f - ascent * angle.cos();

    let is_whitespace = frag.text.chars().all(char::is_whitespace);
    let as_int = frag.text.trim().parse::<i64>().ok();

    LinkedFragment {
        id,
        x,
        y,
        width: frag.width,
        height: frag.height,
        angle,
        font_height,
        vertical: style.vertical,
        right: None,
        bottom: None,
        is_whitespace,
        as_int,
    }
}
