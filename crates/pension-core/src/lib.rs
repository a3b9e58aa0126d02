pub mod calc;
pub mod error;
pub mod fx;
pub mod kernel;
pub mod model;
pub mod params;
pub mod registry;
pub mod runner;
pub mod types;

pub use error::PensionSimError;
pub use types::*;

/// Standard result type for all pension-core operations.
pub type PensionSimResult<T> = Result<T, PensionSimError>;
