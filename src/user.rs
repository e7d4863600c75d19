//! Code for creating the user table and fetching users from the database.
//!
//! Users are owned by the wider marketplace; the ledger only keeps the
//! identity fields it needs for ownership checks and for searching
//! transactions by their owner.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, database_id::UserId};

/// A user of the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::Validation] if the name is empty, the email is malformed or
///   already registered,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(name: &str, email: &str, connection: &Connection) -> Result<User, Error> {
    let name = name.trim();
    let email = email.trim();

    if name.is_empty() {
        return Err(Error::Validation("user name cannot be empty".to_owned()));
    }

    if !email.contains('@') {
        return Err(Error::Validation(format!(
            "\"{email}\" is not a valid email address"
        )));
    }

    connection
        .prepare("INSERT INTO user (name, email) VALUES (?1, ?2) RETURNING id, name, email")?
        .query_row((name, email), map_user_row)
        .map_err(Error::from)
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return a [Error::NotFound] if `user_id` does not
/// belong to a registered user, or a [Error::SqlError] for other SQL errors.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name, email FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id)], map_user_row)
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}

/// The state needed by the user endpoints.
#[derive(Debug, Clone)]
pub struct UserState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for registering a user with the ledger.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserForm {
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
}

/// A route handler for registering a user.
pub async fn create_user_endpoint(
    State(state): State<UserState>,
    Json(form): Json<UserForm>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = create_user(&form.name, &form.email, &connection)?;
    tracing::info!("registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

/// A route handler for getting a user by their ID.
pub async fn get_user_endpoint(
    State(state): State<UserState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<User>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_user_by_id(user_id, &connection).map(Json)
}
