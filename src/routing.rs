//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    AppState, endpoints,
    entitlement::get_user_entitlements_endpoint,
    error::ErrorBody,
    plan::{
        create_plan_endpoint, delete_plan_endpoint, get_plan_endpoint, get_plans_endpoint,
        update_plan_endpoint,
    },
    transaction::{
        gateway_callback_endpoint, get_summary_endpoint, get_transaction_endpoint,
        get_transactions_endpoint, get_user_transactions_endpoint, submit_transaction_endpoint,
        update_status_endpoint,
    },
    user::{create_user_endpoint, get_user_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            get(get_transactions_endpoint).post(submit_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION_SUMMARY, get(get_summary_endpoint))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint).patch(update_status_endpoint),
        )
        .route(endpoints::GATEWAY_CALLBACK, post(gateway_callback_endpoint))
        .route(
            endpoints::PLANS,
            get(get_plans_endpoint).post(create_plan_endpoint),
        )
        .route(
            endpoints::PLAN,
            get(get_plan_endpoint)
                .put(update_plan_endpoint)
                .delete(delete_plan_endpoint),
        )
        .route(endpoints::USERS, post(create_user_endpoint))
        .route(endpoints::USER, get(get_user_endpoint))
        .route(
            endpoints::USER_TRANSACTIONS,
            get(get_user_transactions_endpoint),
        )
        .route(
            endpoints::USER_ENTITLEMENTS,
            get(get_user_entitlements_endpoint),
        )
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "no route matches the requested path".to_owned(),
        }),
    )
        .into_response()
}
