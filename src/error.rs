use thiserror::Error;

/// Top-level error type for the field solver.
#[derive(Debug, Error)]
pub enum Rf2dError {
    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors raised while preparing or running a field solve.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("grid pitch must be positive, got {0}")]
    InvalidGridPitch(f64),

    #[error("solve area has no extent (width {width}, height {height})")]
    EmptyDomain { width: f64, height: f64 },

    #[error("grid pitch {grid} needs more than {limit} lattice nodes")]
    TooManyNodes { grid: f64, limit: usize },

    #[error("cannot allocate a lattice of {columns} x {rows} nodes")]
    LatticeAllocation { columns: usize, rows: usize },

    #[error("at least one worker thread is required")]
    InvalidThreads,

    #[error("convergence threshold must be positive, got {0}")]
    InvalidThreshold(f64),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("failed to spawn solve thread: {0}")]
    ThreadSpawn(String),

    #[error("solve thread panicked: {0}")]
    Panicked(String),
}

/// Errors related to the element model and its records.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown element type: {0}")]
    UnknownKind(String),

    #[error("index {index} is out of range for {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for results using [`Rf2dError`].
pub type Result<T> = std::result::Result<T, Rf2dError>;
