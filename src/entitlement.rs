//! Subscription entitlements granted by completed transactions.
//!
//! An entitlement is the window during which a user may use a plan. It is
//! never edited directly: [reconcile_entitlement] rebuilds it from the
//! completed transactions that still cover the user and plan, so granting,
//! refreshing and revoking all go through the same path.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    database_id::{PlanId, TransactionId, UserId},
    transaction::window_end,
    user::get_user_by_id,
};

/// A user's right to use a plan between two instants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    /// The user holding the entitlement.
    pub user_id: UserId,
    /// The plan the entitlement is for.
    pub plan_id: PlanId,
    /// When the earliest covering activation was granted.
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    /// When the entitlement lapses.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// The completed transaction whose window reaches furthest.
    pub source_transaction_id: TransactionId,
}

impl Entitlement {
    /// Whether the entitlement window contains `now`.
    pub fn covers(&self, now: OffsetDateTime) -> bool {
        self.starts_at <= now && now < self.expires_at
    }
}

/// Create the entitlement table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_entitlement_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS entitlement (
                user_id INTEGER NOT NULL,
                plan_id INTEGER NOT NULL,
                starts_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                source_transaction_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, plan_id),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(plan_id) REFERENCES plan(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(source_transaction_id) REFERENCES subscription_transaction(id)
                )",
        (),
    )?;

    Ok(())
}

/// Rebuild the entitlement for `user_id` and `plan_id` from the completed
/// transactions whose windows are still open at `now`.
///
/// When no completed transaction covers the pair any more the entitlement is
/// revoked (deleted) and `None` is returned. Otherwise the window spans from
/// the earliest covering grant to the latest covering expiry. Overlapping
/// grants widen the window rather than adding their periods together.
///
/// Callers should run this inside the same SQL transaction as the status
/// change that triggered it.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub(crate) fn reconcile_entitlement(
    user_id: UserId,
    plan_id: PlanId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Option<Entitlement>, Error> {
    let windows = connection
        .prepare(
            "SELECT id, granted_at, period_days FROM subscription_transaction
             WHERE user_id = ?1 AND plan_id = ?2 AND status = 'COMPLETED'
                AND granted_at IS NOT NULL AND period_days IS NOT NULL",
        )?
        .query_map((user_id, plan_id), |row| {
            let id: TransactionId = row.get(0)?;
            let granted_at: OffsetDateTime = row.get(1)?;
            let period_days: i64 = row.get(2)?;

            let expires_at = window_end(granted_at, period_days)
                .ok_or(rusqlite::Error::IntegralValueOutOfRange(2, period_days))?;

            Ok((id, granted_at, expires_at))
        })?
        .filter(|window| match window {
            Ok((_, granted_at, expires_at)) => *granted_at <= now && now < *expires_at,
            Err(_) => true,
        })
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;

    let Some(&(source_transaction_id, _, expires_at)) =
        windows.iter().max_by_key(|(id, _, expires_at)| (*expires_at, *id))
    else {
        let revoked = connection.execute(
            "DELETE FROM entitlement WHERE user_id = ?1 AND plan_id = ?2",
            (user_id, plan_id),
        )?;

        if revoked > 0 {
            tracing::info!("revoked entitlement to plan {plan_id} for user {user_id}");
        }

        return Ok(None);
    };

    let starts_at = windows
        .iter()
        .map(|(_, granted_at, _)| *granted_at)
        .min()
        .unwrap_or(now);

    let entitlement = Entitlement {
        user_id,
        plan_id,
        starts_at,
        expires_at,
        source_transaction_id,
    };

    connection.execute(
        "INSERT INTO entitlement (user_id, plan_id, starts_at, expires_at, source_transaction_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, plan_id) DO UPDATE SET
            starts_at = excluded.starts_at,
            expires_at = excluded.expires_at,
            source_transaction_id = excluded.source_transaction_id",
        (
            entitlement.user_id,
            entitlement.plan_id,
            entitlement.starts_at,
            entitlement.expires_at,
            entitlement.source_transaction_id,
        ),
    )?;

    tracing::info!(
        "user {user_id} is entitled to plan {plan_id} until {}",
        entitlement.expires_at
    );

    Ok(Some(entitlement))
}

/// Get the entitlement for `user_id` and `plan_id` if it covers `now`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_entitlement(
    user_id: UserId,
    plan_id: PlanId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Option<Entitlement>, Error> {
    let entitlement = connection
        .prepare(
            "SELECT user_id, plan_id, starts_at, expires_at, source_transaction_id
             FROM entitlement WHERE user_id = ?1 AND plan_id = ?2",
        )?
        .query_row((user_id, plan_id), map_entitlement_row)
        .optional()?;

    Ok(entitlement.filter(|entitlement| entitlement.covers(now)))
}

/// Get every entitlement of `user_id` that covers `now`, ending soonest first.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_active_entitlements(
    user_id: UserId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<Entitlement>, Error> {
    let entitlements = connection
        .prepare(
            "SELECT user_id, plan_id, starts_at, expires_at, source_transaction_id
             FROM entitlement WHERE user_id = ?1
             ORDER BY expires_at ASC, plan_id ASC",
        )?
        .query_map([user_id], map_entitlement_row)?
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;

    Ok(entitlements
        .into_iter()
        .filter(|entitlement| entitlement.covers(now))
        .collect())
}

fn map_entitlement_row(row: &Row) -> Result<Entitlement, rusqlite::Error> {
    Ok(Entitlement {
        user_id: row.get(0)?,
        plan_id: row.get(1)?,
        starts_at: row.get(2)?,
        expires_at: row.get(3)?,
        source_transaction_id: row.get(4)?,
    })
}

/// The state needed to look up entitlements.
#[derive(Debug, Clone)]
pub struct EntitlementState {
    /// The database connection for reading entitlements.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EntitlementState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler listing a user's active entitlements.
pub async fn get_user_entitlements_endpoint(
    State(state): State<EntitlementState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Entitlement>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_user_by_id(user_id, &connection)?;

    get_active_entitlements(user_id, OffsetDateTime::now_utc(), &connection).map(Json)
}
