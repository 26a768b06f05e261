//! Fragment style metadata, as produced by an upstream style table.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Font style metadata consulted when deriving fragment geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FragmentStyle {
    /// Vertical writing mode; shifts the derived rotation by a
    /// quarter turn.
    pub vertical: bool,
    /// Ascent as a fraction of the font height.
    pub ascent: Option<f64>,
    /// Descent as a fraction of the font height, negative below the
    /// baseline.
    pub descent: Option<f64>,
}

/// Lookup from fontname to style metadata. Fragments whose fontname is
/// missing fall back to the default style.
pub type StyleMap = FxHashMap<SmolStr, FragmentStyle>;
