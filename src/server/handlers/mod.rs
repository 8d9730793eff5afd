//! Handler module declarations and re-exports

pub mod board;
pub mod placement;
pub mod query;

// Re-export all handlers for convenient access
pub use board::*;
pub use placement::*;
pub use query::*;
