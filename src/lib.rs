//! A ledger for verifying subscription payments.
//!
//! Users submit payments for subscription plans, administrators verify or
//! reject them, and each verified payment grants a time-bounded entitlement
//! to the plan. The library provides:
//! - A JSON REST API over a SQLite ledger, see [build_router].
//! - A client-side [sync] controller that keeps an operator's view of the
//!   billing list consistent under debounced input and out-of-order responses.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod database_id;
mod db;
pub mod endpoints;
mod entitlement;
mod error;
mod logging;
mod pagination;
mod plan;
mod routing;
pub mod sync;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use database_id::{DatabaseId, PlanId, TransactionId, UserId};
pub use db::initialize as initialize_db;
pub use entitlement::{Entitlement, get_active_entitlements, get_entitlement};
pub use error::{Error, ErrorBody};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::{Page, PaginationConfig};
pub use plan::{Plan, PlanForm};
pub use routing::build_router;
pub use transaction::{
    BillingSummary, GatewayCallback, MethodFilter, PaymentMethod, StatusFilter, StatusUpdate,
    SubmissionForm, Transaction, TransactionBuilder, TransactionPage, TransactionQuery,
    TransactionQueryParams, TransactionStatus, complete_by_reference, query_transactions,
    set_status, submit_transaction,
};
pub use user::{User, UserForm, get_user_by_id};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
