pub mod audit;
pub mod executor;
pub mod model;
pub mod traits;

// Re-export common types for convenience
pub use executor::*;
pub use model::*;
pub use traits::*;
