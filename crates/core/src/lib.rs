//! pageflow - reading-order reconstruction for positioned page text.
//!
//! The crate has two halves: a region quadtree over axis-aligned
//! rectangles with ordered directional sweep retrievals
//! ([`quadtree`]), and a linker that uses those sweeps to give every
//! text fragment on a page its nearest neighbor to the right and
//! below ([`layout`]).

pub mod error;
pub mod layout;
pub mod quadtree;
pub mod utils;

pub use error::{FlowError, Result};
pub use layout::{FlowLinker, LinkedFragment, LinkedPage, PageFragment};
pub use quadtree::{Item, QuadTree, Rect};
