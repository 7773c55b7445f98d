// ============================================================================
// Core Actor Abstractions
// ============================================================================
//
// Traits and small collaborators that controller actors are built from.
//
// ============================================================================

pub mod scoped;

// Re-export core types
pub use scoped::*;
