//! Page layout: fragment styles and reading-order linkage.

pub mod flow;
pub mod style;

pub use flow::{FlowLinker, LinkedFragment, LinkedPage, PageFragment};
pub use style::{FragmentStyle, StyleMap};
