//! The subscription transaction ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for submitting payments
//! - The status transitions that grant and revoke entitlements
//! - The paged, filtered billing list query and the ledger summary
//! - Route handlers for the ledger's JSON API

mod core;
mod endpoints;
mod query;
mod status;
mod summary;

pub use core::{
    PaymentMethod, Transaction, TransactionBuilder, TransactionStatus, create_transaction_table,
    get_transaction, get_user_transactions, is_active, submit_transaction,
};
pub(crate) use core::window_end;
pub use endpoints::{
    GatewayCallback, LedgerState, StatusUpdate, SubmissionForm, gateway_callback_endpoint,
    get_summary_endpoint, get_transaction_endpoint, get_transactions_endpoint,
    get_user_transactions_endpoint, submit_transaction_endpoint, update_status_endpoint,
};
pub use query::{
    MethodFilter, StatusFilter, TransactionPage, TransactionQuery, TransactionQueryParams,
    query_transactions,
};
pub use status::{complete_by_reference, set_status};
pub use summary::{BillingSummary, get_billing_summary};

#[cfg(test)]
pub use core::count_transactions;
