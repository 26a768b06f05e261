//! Flow linking integration tests: geometry derivation from transform
//! matrices, right/bottom neighbor links, and page-level metadata.

use std::f64::consts::FRAC_PI_2;

use pageflow_core::layout::{FlowLinker, FragmentStyle, PageFragment, StyleMap};
use pageflow_core::quadtree::Rect;
use pageflow_core::FlowError;
use smol_str::SmolStr;

const EPS: f64 = 1e-9;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

fn given_fragment(e: f64, f: f64, text: &str) -> PageFragment {
    PageFragment {
        transform: (1.0, 0.0, 0.0, 1.0, e, f),
        text: text.to_owned(),
        fontname: SmolStr::new("F0"),
        width: 2.0,
        height: 2.0,
    }
}

/// Style table whose ascent pins the anchor at the raw translation,
/// so link targets can be read straight off the inputs.
fn given_zero_ascent_styles() -> StyleMap {
    let mut styles = StyleMap::default();
    styles.insert(
        SmolStr::new("F0"),
        FragmentStyle {
            vertical: false,
            ascent: Some(0.0),
            descent: None,
        },
    );
    styles
}

fn given_linker() -> FlowLinker {
    FlowLinker::new(Rect::new(0.0, 0.0, 100.0, 100.0))
}

// ============================================================================
// Geometry derivation
// ============================================================================

#[test]
fn test_identity_transform_uses_font_height_ascent() {
    let frag = given_fragment(10.0, 20.0, "a");
    let page = given_linker().link(&[frag], &StyleMap::default()).unwrap();
    let d = &page.fragments[0];

    assert!(approx(d.angle, 0.0));
    assert!(approx(d.font_height, 1.0));
    // No style entry: the full font height acts as the ascent.
    assert!(approx(d.x, 10.0));
    assert!(approx(d.y, 19.0));
    assert!(!d.vertical);
}

#[test]
fn test_descent_fallback_scales_ascent() {
    let mut styles = StyleMap::default();
    styles.insert(
        SmolStr::new("F0"),
        FragmentStyle {
            vertical: false,
            ascent: None,
            descent: Some(-0.25),
        },
    );
    let frag = given_fragment(10.0, 20.0, "a");
    let page = given_linker().link(&[frag], &styles).unwrap();
    let d = &page.fragments[0];

    assert!(approx(d.x, 10.0));
    assert!(approx(d.y, 20.0 - 0.75));
}

#[test]
fn test_quarter_turn_transform_rotates_anchor() {
    let frag = PageFragment {
        transform: (0.0, 1.0, -1.0, 0.0, 10.0, 20.0),
        text: "a".to_owned(),
        fontname: SmolStr::new("F0"),
        width: 2.0,
        height: 2.0,
    };
    let page = given_linker().link(&[frag], &StyleMap::default()).unwrap();
    let d = &page.fragments[0];

    assert!(approx(d.angle, FRAC_PI_2));
    assert!(approx(d.font_height, 1.0));
    // The ascent vector now points along +x.
    assert!(approx(d.x, 11.0));
    assert!(approx(d.y, 20.0));
}

#[test]
fn test_vertical_style_adds_quarter_turn() {
    let mut styles = StyleMap::default();
    styles.insert(
        SmolStr::new("F0"),
        FragmentStyle {
            vertical: true,
            ascent: Some(1.0),
            descent: None,
        },
    );
    let frag = given_fragment(10.0, 20.0, "a");
    let page = given_linker().link(&[frag], &styles).unwrap();
    let d = &page.fragments[0];

    assert!(d.vertical);
    assert!(approx(d.angle, FRAC_PI_2));
    assert!(approx(d.x, 11.0));
    assert!(approx(d.y, 20.0));
}

#[test]
fn test_scaled_transform_sets_font_height() {
    let frag = PageFragment {
        transform: (3.0, 0.0, 0.0, 3.0, 10.0, 20.0),
        ..given_fragment(10.0, 20.0, "a")
    };
    let page = given_linker().link(&[frag], &StyleMap::default()).unwrap();
    assert!(approx(page.fragments[0].font_height, 3.0));
}

#[test]
fn test_text_classification() {
    let frags = vec![
        given_fragment(10.0, 20.0, "42"),
        given_fragment(10.0, 40.0, " 7 "),
        given_fragment(10.0, 60.0, "4a"),
        given_fragment(10.0, 80.0, " \t"),
        given_fragment(30.0, 20.0, ""),
    ];
    let page = given_linker()
        .link(&frags, &given_zero_ascent_styles())
        .unwrap();

    assert_eq!(page.fragments[0].as_int, Some(42));
    assert!(!page.fragments[0].is_whitespace);
    assert_eq!(page.fragments[1].as_int, Some(7));
    assert_eq!(page.fragments[2].as_int, None);
    assert!(page.fragments[3].is_whitespace);
    assert_eq!(page.fragments[3].as_int, None);
    assert!(page.fragments[4].is_whitespace);
}

// ============================================================================
// Neighbor links
// ============================================================================

#[test]
fn test_right_links_chain_along_a_row() {
    let frags: Vec<PageFragment> = (0..6)
        .map(|i| given_fragment(2.0 + 2.0 * i as f64, 49.0, "a"))
        .collect();
    let page = given_linker()
        .link(&frags, &given_zero_ascent_styles())
        .unwrap();

    for i in 0..5 {
        assert_eq!(page.fragments[i].right, Some(i + 1), "fragment {i}");
        assert_eq!(page.fragments[i].bottom, None);
    }
    assert_eq!(page.fragments[5].right, None);
}

#[test]
fn test_bottom_links_descend_a_column() {
    // Page coordinates with y growing upward: 50 sits above 30 above 10.
    let frags = vec![
        given_fragment(10.0, 50.0, "a"),
        given_fragment(10.0, 30.0, "b"),
        given_fragment(10.0, 10.0, "c"),
    ];
    let page = given_linker()
        .link(&frags, &given_zero_ascent_styles())
        .unwrap();

    assert_eq!(page.fragments[0].bottom, Some(1));
    assert_eq!(page.fragments[1].bottom, Some(2));
    assert_eq!(page.fragments[2].bottom, None);
    for d in &page.fragments {
        assert_eq!(d.right, None);
    }
}

#[test]
fn test_links_ignore_fragments_outside_the_band() {
    let frags = vec![
        given_fragment(10.0, 50.0, "a"),
        // To the right but in a different row.
        given_fragment(20.0, 80.0, "b"),
        // Below but in a different column.
        given_fragment(60.0, 20.0, "c"),
        // Genuine neighbors.
        given_fragment(30.0, 50.0, "d"),
        given_fragment(10.0, 20.0, "e"),
    ];
    let page = given_linker()
        .link(&frags, &given_zero_ascent_styles())
        .unwrap();

    assert_eq!(page.fragments[0].right, Some(3));
    assert_eq!(page.fragments[0].bottom, Some(4));
}

#[test]
fn test_bottom_skips_to_nearest_below() {
    let frags = vec![
        given_fragment(10.0, 90.0, "a"),
        given_fragment(10.0, 20.0, "far"),
        given_fragment(10.0, 60.0, "near"),
    ];
    let page = given_linker()
        .link(&frags, &given_zero_ascent_styles())
        .unwrap();
    assert_eq!(page.fragments[0].bottom, Some(2));
}

#[test]
fn test_whitespace_fragments_still_participate_in_links() {
    let frags = vec![
        given_fragment(10.0, 50.0, "a"),
        given_fragment(14.0, 50.0, " "),
        given_fragment(18.0, 50.0, "b"),
    ];
    let page = given_linker()
        .link(&frags, &given_zero_ascent_styles())
        .unwrap();
    assert_eq!(page.fragments[0].right, Some(1));
    assert_eq!(page.fragments[1].right, Some(2));
}

// ============================================================================
// Page metadata and errors
// ============================================================================

#[test]
fn test_topmost_is_greatest_y_ignoring_whitespace() {
    let frags = vec![
        given_fragment(10.0, 50.0, "a"),
        given_fragment(10.0, 30.0, "b"),
        // Whitespace above everything must not win.
        given_fragment(10.0, 99.0, " "),
    ];
    let page = given_linker()
        .link(&frags, &given_zero_ascent_styles())
        .unwrap();
    assert_eq!(page.topmost, Some(0));
}

#[test]
fn test_topmost_none_for_empty_or_all_whitespace() {
    let linker = given_linker();
    let styles = given_zero_ascent_styles();

    let page = linker.link(&[], &styles).unwrap();
    assert!(page.fragments.is_empty());
    assert_eq!(page.topmost, None);

    let frags = vec![given_fragment(10.0, 50.0, " "), given_fragment(10.0, 30.0, "\t")];
    let page = linker.link(&frags, &styles).unwrap();
    assert_eq!(page.topmost, None);
}

#[test]
fn test_invalid_page_bounds_error() {
    let linker = FlowLinker::new(Rect::new(0.0, 0.0, -1.0, 100.0));
    let err = linker
        .link(&[given_fragment(10.0, 20.0, "a")], &StyleMap::default())
        .unwrap_err();
    assert!(matches!(err, FlowError::InvalidBounds { .. }));
}
