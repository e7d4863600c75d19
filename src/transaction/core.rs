//! Defines the core data models and database queries for subscription transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{
    Error,
    database_id::{PlanId, TransactionId, UserId},
    plan::{MAX_PERIOD_DAYS, get_plan},
    user::get_user_by_id,
};

// ============================================================================
// MODELS
// ============================================================================

/// Where a transaction is in the verification workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Submitted by a user and waiting for an administrator.
    Pending,
    /// Verified by an administrator, grants an entitlement.
    Completed,
    /// Rejected by an administrator.
    Rejected,
}

impl TransactionStatus {
    /// All statuses, in workflow order.
    pub const ALL: [TransactionStatus; 3] = [
        TransactionStatus::Pending,
        TransactionStatus::Completed,
        TransactionStatus::Rejected,
    ];

    /// The canonical string form used in the database and over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Rejected => "REJECTED",
        }
    }

    /// Whether moving a transaction into this status needs the operator to
    /// confirm first.
    pub fn requires_confirmation(self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Rejected
        )
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidStatus(s.to_owned()))
    }
}

/// How a user paid for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// A bank transfer checked against an uploaded receipt.
    #[serde(rename = "manual-transfer-A")]
    ManualTransferA,
    /// A second bank's transfer, also checked against a receipt.
    #[serde(rename = "manual-transfer-B")]
    ManualTransferB,
    /// A mobile money payment identified by its reference.
    #[serde(rename = "mobile-money")]
    MobileMoney,
    /// A hosted payment gateway checkout.
    #[serde(rename = "gateway")]
    Gateway,
    /// Credit issued by the platform itself.
    #[serde(rename = "system-credit")]
    SystemCredit,
}

impl PaymentMethod {
    /// All payment methods.
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::ManualTransferA,
        PaymentMethod::ManualTransferB,
        PaymentMethod::MobileMoney,
        PaymentMethod::Gateway,
        PaymentMethod::SystemCredit,
    ];

    /// The canonical string form used in the database and over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::ManualTransferA => "manual-transfer-A",
            PaymentMethod::ManualTransferB => "manual-transfer-B",
            PaymentMethod::MobileMoney => "mobile-money",
            PaymentMethod::Gateway => "gateway",
            PaymentMethod::SystemCredit => "system-credit",
        }
    }

    /// Manual methods are verified by eye against a receipt image.
    pub fn requires_receipt(self) -> bool {
        matches!(
            self,
            PaymentMethod::ManualTransferA | PaymentMethod::ManualTransferB
        )
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| Error::InvalidMethod(s.to_owned()))
    }
}

macro_rules! impl_text_sql {
    ($type:ty) => {
        impl ToSql for $type {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $type {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
            }
        }
    };
}

impl_text_sql!(TransactionStatus);
impl_text_sql!(PaymentMethod);

/// A payment a user submitted for a subscription plan.
///
/// To create a new `Transaction`, use [Transaction::build] and
/// [submit_transaction].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The reference used to reconcile with the payment rail, e.g. a bank
    /// transfer ID.
    pub reference: String,
    /// The user who submitted the payment.
    pub user_id: UserId,
    /// The plan this payment activates.
    pub plan_id: PlanId,
    /// The amount paid in the platform's base currency unit.
    pub amount: f64,
    /// How the user paid.
    pub payment_method: PaymentMethod,
    /// Where the proof of payment image is stored, only for manual methods.
    pub receipt_url: Option<String>,
    /// Where the transaction is in the verification workflow.
    pub status: TransactionStatus,
    /// When the transaction was submitted.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// When the current activation was granted, if the transaction is completed.
    #[serde(with = "time::serde::rfc3339::option")]
    pub granted_at: Option<OffsetDateTime>,
    /// When the current activation lapses, if the transaction is completed.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    /// The plan's usage allowance granted with the activation.
    pub remaining_usage: i64,
    /// Whether the transaction currently grants an entitlement.
    ///
    /// Derived when the transaction is read, see [is_active].
    pub is_active: bool,
}

impl Transaction {
    /// Start building a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        user_id: UserId,
        plan_id: PlanId,
        amount: f64,
        payment_method: PaymentMethod,
    ) -> TransactionBuilder {
        TransactionBuilder {
            user_id,
            plan_id,
            amount,
            payment_method,
            receipt_url: None,
            reference: None,
        }
    }
}

/// A builder for submitting [Transaction] instances.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The user submitting the payment.
    pub user_id: UserId,
    /// The plan the payment is for.
    pub plan_id: PlanId,
    /// The amount paid, must be positive.
    pub amount: f64,
    /// How the user paid.
    pub payment_method: PaymentMethod,
    /// The proof of payment, required for manual methods and refused otherwise.
    pub receipt_url: Option<String>,
    /// The payment rail's reference, generated when absent.
    pub reference: Option<String>,
}

impl TransactionBuilder {
    /// Set the receipt URL for the transaction.
    pub fn receipt_url(mut self, receipt_url: Option<String>) -> Self {
        self.receipt_url = receipt_url;
        self
    }

    /// Set the payment reference for the transaction.
    pub fn reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }
}

/// Whether a transaction grants an entitlement at `now`.
///
/// Only completed transactions with a granted window that has not lapsed are
/// active. This is evaluated every time a transaction is read rather than
/// stored, so it cannot drift from the wall clock.
pub fn is_active(
    status: TransactionStatus,
    granted_at: Option<OffsetDateTime>,
    period: Option<Duration>,
    now: OffsetDateTime,
) -> bool {
    match (status, granted_at, period) {
        (TransactionStatus::Completed, Some(granted_at), Some(period)) => {
            granted_at <= now && granted_at.checked_add(period).is_none_or(|end| now < end)
        }
        _ => false,
    }
}

/// When an entitlement window that opened at `granted_at` and lasts
/// `period_days` closes.
///
/// Returns `None` if the end does not fit in an [OffsetDateTime].
pub(crate) fn window_end(granted_at: OffsetDateTime, period_days: i64) -> Option<OffsetDateTime> {
    period_days
        .checked_mul(SECONDS_PER_DAY)
        .map(Duration::seconds)
        .and_then(|period| granted_at.checked_add(period))
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Create a reference for payments submitted without one, e.g. "GP-SUB-1A2B3C4D".
pub fn generate_reference() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();

    format!("GP-SUB-{}", id[..8].to_uppercase())
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The columns selected by every transaction query, in the order expected by
/// [map_transaction_row]. The transaction table must be aliased as `t`.
pub(crate) const TRANSACTION_COLUMNS: &str = "t.id, t.reference, t.user_id, t.plan_id, t.amount, \
    t.payment_method, t.receipt_url, t.status, t.timestamp, t.granted_at, t.period_days, \
    t.remaining_usage";

/// Submit a new payment, creating a pending transaction.
///
/// `now` becomes the transaction's timestamp and is normalised to UTC.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the amount is not a positive number, the user or
///   plan does not exist, a manual method has no receipt, or a non-manual
///   method has one,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn submit_transaction(
    builder: TransactionBuilder,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if !builder.amount.is_finite() || builder.amount <= 0.0 {
        return Err(Error::Validation(format!(
            "amount must be a positive number, got {}",
            builder.amount
        )));
    }

    match get_plan(builder.plan_id, connection) {
        Ok(_) => {}
        Err(Error::NotFound) => {
            return Err(Error::Validation(format!(
                "plan {} does not exist",
                builder.plan_id
            )));
        }
        Err(error) => return Err(error),
    }

    match get_user_by_id(builder.user_id, connection) {
        Ok(_) => {}
        Err(Error::NotFound) => {
            return Err(Error::Validation(format!(
                "user {} does not exist",
                builder.user_id
            )));
        }
        Err(error) => return Err(error),
    }

    let receipt_url = builder
        .receipt_url
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty());

    match (builder.payment_method.requires_receipt(), &receipt_url) {
        (true, None) => {
            return Err(Error::Validation(format!(
                "a receipt is required for {} payments",
                builder.payment_method
            )));
        }
        (false, Some(_)) => {
            return Err(Error::Validation(format!(
                "receipts are only accepted for manual transfers, not {} payments",
                builder.payment_method
            )));
        }
        _ => {}
    }

    let reference = builder
        .reference
        .map(|reference| reference.trim().to_owned())
        .filter(|reference| !reference.is_empty())
        .unwrap_or_else(generate_reference);

    let id: TransactionId = connection.query_row(
        "INSERT INTO subscription_transaction
            (reference, user_id, plan_id, amount, payment_method, receipt_url, status, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         RETURNING id",
        (
            &reference,
            builder.user_id,
            builder.plan_id,
            builder.amount,
            builder.payment_method,
            &receipt_url,
            TransactionStatus::Pending,
            now.to_offset(UtcOffset::UTC),
        ),
        |row| row.get(0),
    )?;

    tracing::info!(
        "user {} submitted transaction {id} ({reference}) for plan {}",
        builder.user_id,
        builder.plan_id
    );

    get_transaction(id, now, connection)
}

/// Retrieve a transaction from the database by its `id`, deriving whether it
/// is active at `now`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM subscription_transaction t WHERE t.id = :id"
        ))?
        .query_one(&[(":id", &id)], |row| map_transaction_row(row, now))?;

    Ok(transaction)
}

/// Get all of a user's transactions, newest first.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `user_id` does not refer to a registered user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_user_transactions(
    user_id: UserId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    get_user_by_id(user_id, connection)?;

    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM subscription_transaction t
             WHERE t.user_id = ?1
             ORDER BY t.timestamp DESC, t.id ASC"
        ))?
        .query_map([user_id], |row| map_transaction_row(row, now))?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u64, Error> {
    let count: i64 =
        connection.query_row("SELECT COUNT(id) FROM subscription_transaction;", [], |row| {
            row.get(0)
        })?;

    Ok(count.unsigned_abs())
}

/// Create the transaction table in the database.
///
/// Triggers keep the submitted payment details immutable and stop rows from
/// being deleted, so only the verification fields ever change.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS subscription_transaction (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reference TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                plan_id INTEGER NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                payment_method TEXT NOT NULL,
                receipt_url TEXT,
                status TEXT NOT NULL DEFAULT 'PENDING'
                    CHECK (status IN ('PENDING', 'COMPLETED', 'REJECTED')),
                timestamp TEXT NOT NULL,
                granted_at TEXT,
                period_days INTEGER CHECK (period_days BETWEEN 1 AND {MAX_PERIOD_DAYS}),
                remaining_usage INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE RESTRICT,
                FOREIGN KEY(plan_id) REFERENCES plan(id) ON UPDATE CASCADE ON DELETE RESTRICT
                )"
        ),
        (),
    )?;

    connection.execute(
        "CREATE TRIGGER IF NOT EXISTS subscription_transaction_immutable
         BEFORE UPDATE OF reference, user_id, plan_id, amount, payment_method, receipt_url, timestamp
         ON subscription_transaction
         BEGIN
             SELECT RAISE(ABORT, 'submitted payment details cannot be changed');
         END",
        (),
    )?;

    connection.execute(
        "CREATE TRIGGER IF NOT EXISTS subscription_transaction_retained
         BEFORE DELETE ON subscription_transaction
         BEGIN
             SELECT RAISE(ABORT, 'transactions are retained for audit');
         END",
        (),
    )?;

    // Index for the default ordering of the billing list.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_subscription_transaction_timestamp
         ON subscription_transaction(timestamp DESC, id ASC);",
        (),
    )?;

    // Index for entitlement reconciliation.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_subscription_transaction_user_plan
         ON subscription_transaction(user_id, plan_id, status);",
        (),
    )?;

    Ok(())
}

/// Map a database row selected with [TRANSACTION_COLUMNS] to a Transaction,
/// deriving `is_active` at `now`.
pub(crate) fn map_transaction_row(row: &Row, now: OffsetDateTime) -> Result<Transaction, rusqlite::Error> {
    let status = row.get(7)?;
    let granted_at: Option<OffsetDateTime> = row.get(9)?;
    let period_days: Option<i64> = row.get(10)?;

    let period = period_days
        .map(|days| {
            days.checked_mul(SECONDS_PER_DAY)
                .map(Duration::seconds)
                .ok_or(rusqlite::Error::IntegralValueOutOfRange(10, days))
        })
        .transpose()?;

    let expires_at = granted_at
        .zip(period_days)
        .map(|(start, days)| {
            window_end(start, days).ok_or(rusqlite::Error::IntegralValueOutOfRange(10, days))
        })
        .transpose()?;

    Ok(Transaction {
        id: row.get(0)?,
        reference: row.get(1)?,
        user_id: row.get(2)?,
        plan_id: row.get(3)?,
        amount: row.get(4)?,
        payment_method: row.get(5)?,
        receipt_url: row.get(6)?,
        status,
        timestamp: row.get(8)?,
        granted_at,
        expires_at,
        remaining_usage: row.get(11)?,
        is_active: is_active(status, granted_at, period, now),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use time::{Duration, macros::datetime};

    use crate::{
        Error,
        test_utils::{must_create_test_connection, seed_user_and_plan},
        transaction::{
            PaymentMethod, Transaction, TransactionStatus, count_transactions, get_transaction,
            get_user_transactions, submit_transaction,
        },
        user::create_user,
    };

    #[test]
    fn submit_creates_pending_transaction() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);
        let now = datetime!(2025-06-01 12:00 UTC);

        let transaction = submit_transaction(
            Transaction::build(user.id, plan.id, 500.0, PaymentMethod::MobileMoney)
                .reference(Some("ETB-991".to_owned())),
            now,
            &conn,
        )
        .expect("could not submit transaction");

        assert_eq!(transaction.status, TransactionStatus::Pending);
        assert!(!transaction.is_active);
        assert_eq!(transaction.amount, 500.0);
        assert_eq!(transaction.reference, "ETB-991");
        assert_eq!(transaction.timestamp, now);
        assert_eq!(transaction.granted_at, None);
        assert_eq!(get_transaction(transaction.id, now, &conn), Ok(transaction));
    }

    #[test]
    fn submit_generates_missing_reference() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);

        let transaction = submit_transaction(
            Transaction::build(user.id, plan.id, 500.0, PaymentMethod::Gateway)
                .reference(Some("  ".to_owned())),
            datetime!(2025-06-01 12:00 UTC),
            &conn,
        )
        .expect("could not submit transaction");

        assert!(transaction.reference.starts_with("GP-SUB-"));
        assert_eq!(transaction.reference.len(), "GP-SUB-".len() + 8);
    }

    #[test]
    fn submit_fails_on_non_positive_amount() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);

        for amount in [0.0, -10.0, f64::NAN] {
            let result = submit_transaction(
                Transaction::build(user.id, plan.id, amount, PaymentMethod::MobileMoney),
                datetime!(2025-06-01 12:00 UTC),
                &conn,
            );

            assert!(
                matches!(result, Err(Error::Validation(_))),
                "want validation error for amount {amount}, got {result:?}"
            );
        }
    }

    #[test]
    fn submit_fails_on_unknown_plan() {
        let conn = must_create_test_connection();
        let (user, _) = seed_user_and_plan(&conn);

        let result = submit_transaction(
            Transaction::build(user.id, 999, 500.0, PaymentMethod::MobileMoney),
            datetime!(2025-06-01 12:00 UTC),
            &conn,
        );

        assert_eq!(
            result,
            Err(Error::Validation("plan 999 does not exist".to_owned()))
        );
    }

    #[test]
    fn submit_fails_on_unknown_user() {
        let conn = must_create_test_connection();
        let (_, plan) = seed_user_and_plan(&conn);

        let result = submit_transaction(
            Transaction::build(999, plan.id, 500.0, PaymentMethod::MobileMoney),
            datetime!(2025-06-01 12:00 UTC),
            &conn,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn manual_transfer_requires_receipt() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);
        let now = datetime!(2025-06-01 12:00 UTC);

        let missing = submit_transaction(
            Transaction::build(user.id, plan.id, 500.0, PaymentMethod::ManualTransferA),
            now,
            &conn,
        );
        let present = submit_transaction(
            Transaction::build(user.id, plan.id, 500.0, PaymentMethod::ManualTransferB)
                .receipt_url(Some("/static/uploads/receipt_1.jpg".to_owned())),
            now,
            &conn,
        )
        .expect("could not submit transaction");

        assert!(matches!(missing, Err(Error::Validation(_))));
        assert_eq!(
            present.receipt_url.as_deref(),
            Some("/static/uploads/receipt_1.jpg")
        );
    }

    #[test]
    fn receipt_refused_for_non_manual_method() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);

        let result = submit_transaction(
            Transaction::build(user.id, plan.id, 500.0, PaymentMethod::Gateway)
                .receipt_url(Some("/static/uploads/receipt_1.jpg".to_owned())),
            datetime!(2025-06-01 12:00 UTC),
            &conn,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn get_missing_transaction_is_not_found() {
        let conn = must_create_test_connection();

        let result = get_transaction(1, datetime!(2025-06-01 12:00 UTC), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn payment_details_are_immutable() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);
        let transaction = submit_transaction(
            Transaction::build(user.id, plan.id, 500.0, PaymentMethod::MobileMoney),
            datetime!(2025-06-01 12:00 UTC),
            &conn,
        )
        .unwrap();

        let result = conn.execute(
            "UPDATE subscription_transaction SET amount = 1.0 WHERE id = ?1",
            [transaction.id],
        );

        assert!(result.is_err());
    }

    #[test]
    fn transactions_are_never_deleted() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);
        let transaction = submit_transaction(
            Transaction::build(user.id, plan.id, 500.0, PaymentMethod::MobileMoney),
            datetime!(2025-06-01 12:00 UTC),
            &conn,
        )
        .unwrap();

        let result = conn.execute(
            "DELETE FROM subscription_transaction WHERE id = ?1",
            [transaction.id],
        );

        assert!(result.is_err());
        assert_eq!(count_transactions(&conn), Ok(1));
    }

    #[test]
    fn user_transactions_are_newest_first() {
        let conn = must_create_test_connection();
        let (user, plan) = seed_user_and_plan(&conn);
        let other_user = create_user("Other", "other@example.com", &conn).unwrap();
        let start = datetime!(2025-06-01 12:00 UTC);
        let mut want = Vec::new();
        for i in 0..3 {
            want.push(
                submit_transaction(
                    Transaction::build(user.id, plan.id, 100.0, PaymentMethod::MobileMoney),
                    start + Duration::hours(i),
                    &conn,
                )
                .unwrap(),
            );
        }
        submit_transaction(
            Transaction::build(other_user.id, plan.id, 100.0, PaymentMethod::MobileMoney),
            start,
            &conn,
        )
        .unwrap();
        want.reverse();

        let got = get_user_transactions(user.id, start, &conn).expect("could not list");

        assert_eq!(want, got);
    }

    #[test]
    fn user_transactions_for_unknown_user_is_not_found() {
        let conn = must_create_test_connection();

        let result = get_user_transactions(42, datetime!(2025-06-01 12:00 UTC), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
