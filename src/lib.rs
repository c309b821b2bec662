pub mod analysis;
pub mod error;
pub mod gauss;
pub mod laplace;
pub mod lattice;
pub mod math;
pub mod model;
pub mod units;

pub use error::{ModelError, Result, Rf2dError, SolveError};
