//! Totals shown above the billing list.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Counts of transactions by status and the revenue that has been verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSummary {
    /// Every transaction in the ledger.
    pub total_transactions: u64,
    /// Transactions waiting for an administrator.
    pub pending_count: u64,
    /// Verified transactions.
    pub completed_count: u64,
    /// Rejected transactions.
    pub rejected_count: u64,
    /// The sum of the amounts of completed transactions.
    pub verified_revenue: f64,
}

/// Summarise the whole ledger.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_billing_summary(connection: &Connection) -> Result<BillingSummary, Error> {
    connection
        .query_row(
            "SELECT
                COUNT(id),
                COUNT(CASE WHEN status = 'PENDING' THEN 1 END),
                COUNT(CASE WHEN status = 'COMPLETED' THEN 1 END),
                COUNT(CASE WHEN status = 'REJECTED' THEN 1 END),
                COALESCE(SUM(CASE WHEN status = 'COMPLETED' THEN amount END), 0.0)
             FROM subscription_transaction",
            [],
            |row| {
                let count = |index: usize| row.get::<_, i64>(index).map(i64::unsigned_abs);

                Ok(BillingSummary {
                    total_transactions: count(0)?,
                    pending_count: count(1)?,
                    completed_count: count(2)?,
                    rejected_count: count(3)?,
                    verified_revenue: row.get(4)?,
                })
            },
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        test_utils::{must_create_test_connection, seed_user_and_plan},
        transaction::{
            BillingSummary, PaymentMethod, Transaction, TransactionStatus, get_billing_summary,
            set_status, submit_transaction,
        },
    };

    #[test]
    fn empty_ledger_has_zero_totals() {
        let conn = must_create_test_connection();

        let got = get_billing_summary(&conn).unwrap();

        assert_eq!(
            got,
            BillingSummary {
                total_transactions: 0,
                pending_count: 0,
                completed_count: 0,
                rejected_count: 0,
                verified_revenue: 0.0,
            }
        );
    }

    #[test]
    fn counts_statuses_and_sums_completed_amounts() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);
        let now = datetime!(2025-06-01 12:00 UTC);
        let submit = |amount| {
            submit_transaction(
                Transaction::build(user.id, plan.id, amount, PaymentMethod::MobileMoney),
                now,
                &conn,
            )
            .unwrap()
        };
        let first = submit(500.0);
        let second = submit(250.0);
        let third = submit(1000.0);
        submit(75.0);
        set_status(first.id, TransactionStatus::Completed, now, &conn).unwrap();
        set_status(second.id, TransactionStatus::Completed, now, &conn).unwrap();
        set_status(third.id, TransactionStatus::Rejected, now, &conn).unwrap();

        let got = get_billing_summary(&conn).unwrap();

        assert_eq!(
            got,
            BillingSummary {
                total_transactions: 4,
                pending_count: 1,
                completed_count: 2,
                rejected_count: 1,
                verified_revenue: 750.0,
            }
        );
    }
}
