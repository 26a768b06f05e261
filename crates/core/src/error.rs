//! Error types for the pageflow library.

use thiserror::Error;

/// Primary error type for spatial-index and flow-linking operations.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Construction was handed malformed bounds. This is the caller's
    /// contract to avoid, not a recoverable runtime condition.
    #[error("invalid bounds: x={x} y={y} width={width} height={height}")]
    InvalidBounds { x: f64, y: f64, width: f64, height: f64 },

    /// A structural invariant of the tree itself was found broken.
    /// Indicates a bug in the tree, not bad input.
    #[error("quadtree invariant violated: {0}")]
    InvariantViolation(String),
}

/// Convenience Result type alias for FlowError.
pub type Result<T> = std::result::Result<T, FlowError>;
