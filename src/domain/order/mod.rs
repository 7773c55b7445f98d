// ============================================================================
// Order Domain - Order list rules
// ============================================================================
//
// Everything here is synchronous and framework-free:
// - Value objects (StatusCode, status groups, sort, page size)
// - Filter state and its single setter
// - Selection eligibility rules and derived batch gates
// - Batch commands
// - Errors
//
// ============================================================================

pub mod value_objects;
pub mod filter;
pub mod eligibility;
pub mod commands;
pub mod errors;

// Re-export for convenience
pub use value_objects::*;
pub use filter::*;
pub use eligibility::*;
pub use commands::*;
pub use errors::*;
