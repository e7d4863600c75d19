//! Defines the plan model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{Error, database_id::PlanId};

/// The entitlement period used when a plan does not specify one.
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// The longest entitlement period a plan may grant, roughly a century.
pub const MAX_PERIOD_DAYS: i64 = 36_500;

/// A subscription plan that a user can pay for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// The ID of the plan.
    pub id: PlanId,
    /// The name shown to users, e.g. "Sender Pro".
    pub name: String,
    /// The list price of the plan in the platform's base currency unit.
    pub price: f64,
    /// How many uses (e.g. shipment posts) an activation grants.
    pub usage_limit: i64,
    /// How long an activation of this plan lasts.
    pub period_days: i64,
    /// A free text description of the plan.
    pub description: String,
}

impl Plan {
    /// The length of the entitlement window granted by this plan.
    pub fn period(&self) -> Duration {
        Duration::days(self.period_days)
    }
}

/// The fields needed to create or replace a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanForm {
    /// The name shown to users.
    pub name: String,
    /// The list price of the plan.
    pub price: f64,
    /// How many uses an activation grants.
    #[serde(default)]
    pub usage_limit: i64,
    /// How long an activation lasts, defaults to [DEFAULT_PERIOD_DAYS].
    #[serde(default = "default_period_days")]
    pub period_days: i64,
    /// A free text description of the plan.
    #[serde(default)]
    pub description: String,
}

fn default_period_days() -> i64 {
    DEFAULT_PERIOD_DAYS
}

impl PlanForm {
    fn validate(self) -> Result<Self, Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("plan name cannot be empty".to_owned()));
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::Validation(format!(
                "plan price must be zero or more, got {}",
                self.price
            )));
        }

        if self.usage_limit < 0 {
            return Err(Error::Validation(format!(
                "plan usage limit must be zero or more, got {}",
                self.usage_limit
            )));
        }

        if !(1..=MAX_PERIOD_DAYS).contains(&self.period_days) {
            return Err(Error::Validation(format!(
                "plan period must be between 1 and {MAX_PERIOD_DAYS} days, got {}",
                self.period_days
            )));
        }

        Ok(Self {
            name: self.name.trim().to_owned(),
            ..self
        })
    }
}

/// Create the plan table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_plan_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS plan (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                price REAL NOT NULL,
                usage_limit INTEGER NOT NULL,
                period_days INTEGER NOT NULL CHECK (period_days BETWEEN 1 AND {MAX_PERIOD_DAYS}),
                description TEXT NOT NULL
                )"
        ),
        (),
    )?;

    Ok(())
}

/// Create a new plan in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the form has an empty name, a negative price or
///   usage limit, or a period outside 1 to [MAX_PERIOD_DAYS] days,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_plan(form: PlanForm, connection: &Connection) -> Result<Plan, Error> {
    let form = form.validate()?;

    connection
        .prepare(
            "INSERT INTO plan (name, price, usage_limit, period_days, description)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, name, price, usage_limit, period_days, description",
        )?
        .query_row(
            (
                form.name,
                form.price,
                form.usage_limit,
                form.period_days,
                form.description,
            ),
            map_plan_row,
        )
        .map_err(Error::from)
}

/// Retrieve a plan from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid plan,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_plan(id: PlanId, connection: &Connection) -> Result<Plan, Error> {
    connection
        .prepare(
            "SELECT id, name, price, usage_limit, period_days, description FROM plan WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_plan_row)
        .map_err(Error::from)
}

/// Retrieve all plans ordered by price, then ID.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_all_plans(connection: &Connection) -> Result<Vec<Plan>, Error> {
    connection
        .prepare(
            "SELECT id, name, price, usage_limit, period_days, description FROM plan
             ORDER BY price ASC, id ASC",
        )?
        .query_map([], map_plan_row)?
        .map(|plan_result| plan_result.map_err(Error::SqlError))
        .collect()
}

/// Replace the fields of the plan `id`.
///
/// Existing activations keep the period they were granted with.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the form is invalid,
/// - [Error::NotFound] if `id` does not refer to a valid plan,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_plan(id: PlanId, form: PlanForm, connection: &Connection) -> Result<Plan, Error> {
    let form = form.validate()?;

    connection
        .prepare(
            "UPDATE plan
             SET name = ?1, price = ?2, usage_limit = ?3, period_days = ?4, description = ?5
             WHERE id = ?6
             RETURNING id, name, price, usage_limit, period_days, description",
        )?
        .query_row(
            (
                form.name,
                form.price,
                form.usage_limit,
                form.period_days,
                form.description,
                id,
            ),
            map_plan_row,
        )
        .map_err(Error::from)
}

/// Delete the plan `id`.
///
/// Plans that any transaction refers to are kept so that the ledger stays
/// auditable.
///
/// # Errors
/// This function will return a:
/// - [Error::PlanInUse] if a transaction refers to the plan,
/// - [Error::NotFound] if `id` does not refer to a valid plan,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_plan(id: PlanId, connection: &Connection) -> Result<(), Error> {
    let references: i64 = connection.query_row(
        "SELECT COUNT(id) FROM subscription_transaction WHERE plan_id = ?1",
        [id],
        |row| row.get(0),
    )?;

    if references > 0 {
        return Err(Error::PlanInUse);
    }

    match connection.execute("DELETE FROM plan WHERE id = ?1", [id])? {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

fn map_plan_row(row: &Row) -> Result<Plan, rusqlite::Error> {
    Ok(Plan {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        usage_limit: row.get(3)?,
        period_days: row.get(4)?,
        description: row.get(5)?,
    })
}
