//! Moves transactions through the verification workflow and keeps the
//! owner's entitlement in step with the result.

use rusqlite::{Connection, OptionalExtension, Transaction as SqlTransaction, TransactionBehavior};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error, database_id::TransactionId, entitlement::reconcile_entitlement, plan::get_plan,
};

use super::core::{PaymentMethod, Transaction, TransactionStatus, get_transaction};

/// Move the transaction `id` to `new_status` at `now`.
///
/// Every status is reachable from every other and the change is applied as
/// soon as this function is called. Asking the operator to confirm a
/// verification or rejection is the caller's job.
///
/// Moving into [TransactionStatus::Completed] grants a fresh activation
/// starting at `now` that lasts for the plan's period and carries the plan's
/// usage limit. Moving out of it clears the activation. Either way the
/// owner's entitlement to the plan is rebuilt afterwards, so it is revoked
/// once no other completed transaction covers it. Requesting the status the
/// transaction already has leaves the row untouched but still rebuilds the
/// entitlement.
///
/// The read, the update and the entitlement rebuild happen in one immediate
/// SQLite transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::UnknownTransaction] if `id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn set_status(
    id: TransactionId,
    new_status: TransactionStatus,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let current = match get_transaction(id, now, &sql_transaction) {
        Err(Error::NotFound) => return Err(Error::UnknownTransaction(id)),
        result => result?,
    };

    if current.status == new_status {
        tracing::debug!("transaction {id} is already {new_status}");
    } else if new_status == TransactionStatus::Completed {
        let plan = get_plan(current.plan_id, &sql_transaction)?;

        sql_transaction.execute(
            "UPDATE subscription_transaction
             SET status = ?1, granted_at = ?2, period_days = ?3, remaining_usage = ?4
             WHERE id = ?5",
            (
                new_status,
                now.to_offset(UtcOffset::UTC),
                plan.period_days,
                plan.usage_limit,
                id,
            ),
        )?;
    } else {
        sql_transaction.execute(
            "UPDATE subscription_transaction
             SET status = ?1, granted_at = NULL, period_days = NULL, remaining_usage = 0
             WHERE id = ?2",
            (new_status, id),
        )?;
    }

    reconcile_entitlement(current.user_id, current.plan_id, now, &sql_transaction)?;

    let updated = get_transaction(id, now, &sql_transaction)?;
    sql_transaction.commit()?;

    if current.status != new_status {
        tracing::info!(
            "transaction {id} ({}) moved from {} to {new_status}",
            updated.reference,
            current.status
        );
    }

    Ok(updated)
}

/// Complete the most recent gateway transaction with the reference
/// `reference`, as reported by the payment gateway's callback.
///
/// A transaction that is already completed is returned unchanged so that a
/// gateway retrying its callback does not restart the activation window.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no gateway transaction has the reference,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn complete_by_reference(
    reference: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let id: TransactionId = connection
        .query_row(
            "SELECT id FROM subscription_transaction
             WHERE reference = ?1 AND payment_method = ?2
             ORDER BY timestamp DESC, id DESC
             LIMIT 1",
            (reference.trim(), PaymentMethod::Gateway),
            |row| row.get(0),
        )
        .optional()?
        .ok_or(Error::NotFound)?;

    let transaction = get_transaction(id, now, connection)?;
    if transaction.status == TransactionStatus::Completed {
        tracing::debug!("gateway callback for {reference} ignored, already completed");
        return Ok(transaction);
    }

    set_status(id, TransactionStatus::Completed, now, connection)
}
