// ============================================================================
// Actors Module
// ============================================================================
//
// Structure:
// - core/       - Scoped store trait shared by controller actors
// - order_list/ - Order list controller and its batch workflow
//
// Filter, eligibility and workflow rules are plain functions and types in
// `domain`; the actor composes them and owns the resulting state.
//
// ============================================================================

pub mod core;
pub mod order_list;

pub use order_list::{ControllerSettings, OrderListController};
