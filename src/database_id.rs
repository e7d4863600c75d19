//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of a subscription transaction.
pub type TransactionId = DatabaseId;
/// The ID of a subscription plan.
pub type PlanId = DatabaseId;
/// The ID of a user.
pub type UserId = DatabaseId;
