// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure order-list rules. No I/O and no async here; the controller actor
// composes these with the Order Service.
//
// ============================================================================

pub mod order;
