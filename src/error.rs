// Error taxonomy for the move pipeline
//
// Every variant here is fatal for the request that raised it. Nothing in the
// pipeline retries or substitutes a default move; the HTTP layer turns these
// into a server error.

use std::path::PathBuf;
use thiserror::Error;

/// Input-contract violations on the occupancy grid or the raw snapshot
#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid data has {actual} cells, shape {height}x{width}x{channels} needs {expected}")]
    ShapeMismatch {
        height: usize,
        width: usize,
        channels: usize,
        expected: usize,
        actual: usize,
    },
    #[error("grid needs at least 2 channels (head + occupancy), got {0}")]
    TooFewChannels(usize),
    #[error("head channel has no marked cell")]
    HeadNotFound,
    #[error("head at ({row}, {col}) has no neighbour {direction}; grid is not border-padded")]
    HeadOnBoundary {
        row: usize,
        col: usize,
        direction: &'static str,
    },
    #[error("coordinate ({x}, {y}) lies outside the {width}x{height} board")]
    CoordOffBoard { x: i32, y: i32, width: u32, height: u32 },
    #[error("snake '{0}' has an empty body")]
    EmptyBody(String),
    #[error("state pair layers differ in shape: {previous:?} vs {current:?}")]
    LayerMismatch {
        previous: (usize, usize, usize),
        current: (usize, usize, usize),
    },
}

/// Failures loading or invoking a policy model
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed model: {0}")]
    MalformedModel(String),
    #[error("model expects {expected} inputs, state pair provides {actual}")]
    InputShape { expected: usize, actual: usize },
    #[error("probe action index {0} is out of range")]
    ProbeOutOfRange(usize),
    #[error("inference backend failed: {0}")]
    Backend(String),
}

/// Anything that prevents a move from being decided
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("no policy model configured for board size {0}")]
    UnsupportedBoardSize(u32),
    #[error("decision task aborted: {0}")]
    TaskAborted(String),
}
