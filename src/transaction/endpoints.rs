//! Route handlers for submitting, listing and verifying transactions.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    database_id::{PlanId, TransactionId, UserId},
    pagination::PaginationConfig,
};

use super::{
    core::{
        PaymentMethod, Transaction, TransactionStatus, get_transaction, get_user_transactions,
        submit_transaction,
    },
    query::{TransactionPage, TransactionQueryParams, query_transactions},
    status::{complete_by_reference, set_status},
    summary::{BillingSummary, get_billing_summary},
};

/// The state needed by the ledger endpoints.
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Controls the defaults and limits for paging the billing list.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

impl LedgerState {
    fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }
}

/// The request body for submitting a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionForm {
    /// The user who paid.
    pub user_id: UserId,
    /// The plan being paid for.
    pub plan_id: PlanId,
    /// The amount paid.
    pub amount: f64,
    /// One of the payment method strings, e.g. "mobile-money".
    pub method: String,
    /// Where the proof of payment is stored, for manual transfers.
    #[serde(default)]
    pub receipt_url: Option<String>,
    /// The payment rail's reference, generated when omitted.
    #[serde(default)]
    pub reference: Option<String>,
}

/// The request body for moving a transaction to another status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// One of `PENDING`, `COMPLETED` or `REJECTED`.
    pub status: String,
}

/// The request body the payment gateway posts once a checkout succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCallback {
    /// The reference the checkout was started with.
    pub tx_ref: String,
}

/// A route handler for one page of the billing list.
pub async fn get_transactions_endpoint(
    State(state): State<LedgerState>,
    Query(params): Query<TransactionQueryParams>,
) -> Result<Json<TransactionPage>, Error> {
    let query = params.into_query(&state.pagination_config)?;

    let connection = state.connection()?;

    query_transactions(&query, OffsetDateTime::now_utc(), &connection).map(Json)
}

/// A route handler for getting a transaction by its ID.
pub async fn get_transaction_endpoint(
    State(state): State<LedgerState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = state.connection()?;
    get_transaction(transaction_id, OffsetDateTime::now_utc(), &connection).map(Json)
}

/// A route handler for submitting a payment, responds with the pending transaction.
pub async fn submit_transaction_endpoint(
    State(state): State<LedgerState>,
    Json(form): Json<SubmissionForm>,
) -> Result<impl IntoResponse, Error> {
    let method: PaymentMethod = form.method.parse()?;
    let builder = Transaction::build(form.user_id, form.plan_id, form.amount, method)
        .receipt_url(form.receipt_url)
        .reference(form.reference);

    let connection = state.connection()?;
    let transaction = submit_transaction(builder, OffsetDateTime::now_utc(), &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// A route handler for verifying, rejecting or reopening a transaction.
///
/// The change is applied immediately, clients are expected to have asked the
/// operator to confirm it.
pub async fn update_status_endpoint(
    State(state): State<LedgerState>,
    Path(transaction_id): Path<TransactionId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Transaction>, Error> {
    let status: TransactionStatus = update.status.parse()?;
    let connection = state.connection()?;

    set_status(transaction_id, status, OffsetDateTime::now_utc(), &connection).map(Json)
}

/// A route handler for the ledger totals.
pub async fn get_summary_endpoint(
    State(state): State<LedgerState>,
) -> Result<Json<BillingSummary>, Error> {
    let connection = state.connection()?;
    get_billing_summary(&connection).map(Json)
}

/// A route handler listing one user's transactions, newest first.
pub async fn get_user_transactions_endpoint(
    State(state): State<LedgerState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state.connection()?;
    get_user_transactions(user_id, OffsetDateTime::now_utc(), &connection).map(Json)
}

/// A route handler for the payment gateway's success callback.
pub async fn gateway_callback_endpoint(
    State(state): State<LedgerState>,
    Json(callback): Json<GatewayCallback>,
) -> Result<Json<Transaction>, Error> {
    tracing::info!("gateway reported payment for {}", callback.tx_ref);

    let connection = state.connection()?;

    complete_by_reference(&callback.tx_ref, OffsetDateTime::now_utc(), &connection).map(Json)
}
