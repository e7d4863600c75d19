//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/users/{user_id}', use [format_endpoint].

/// The route for the billing list and for submitting payments.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route for getting a transaction or changing its status.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the ledger totals.
pub const TRANSACTION_SUMMARY: &str = "/api/transactions/summary";
/// The route the payment gateway calls once a checkout succeeds.
pub const GATEWAY_CALLBACK: &str = "/api/callbacks/gateway";
/// The route for listing and creating plans.
pub const PLANS: &str = "/api/plans";
/// The route for getting, replacing and deleting a plan.
pub const PLAN: &str = "/api/plans/{plan_id}";
/// The route for registering users.
pub const USERS: &str = "/api/users";
/// The route for getting a user.
pub const USER: &str = "/api/users/{user_id}";
/// The route for a user's transactions.
pub const USER_TRANSACTIONS: &str = "/api/users/{user_id}/transactions";
/// The route for a user's active entitlements.
pub const USER_ENTITLEMENTS: &str = "/api/users/{user_id}/entitlements";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// Parameters are delimited by braces, e.g. `{transaction_id}`. If no
/// parameter is found in `endpoint_path`, the function returns the original
/// `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |end| param_start + end + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
