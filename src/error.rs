//! Defines the app level error type and its conversion to JSON error responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::database_id::TransactionId;

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A submission or request parameter was malformed.
    ///
    /// The string describes which field was rejected and why, and is shown to
    /// the caller as is.
    #[error("{0}")]
    Validation(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A status change was requested for a transaction that does not exist.
    #[error("there is no transaction with the ID {0}")]
    UnknownTransaction(TransactionId),

    /// A status string outside of `PENDING`, `COMPLETED` and `REJECTED`.
    #[error("\"{0}\" is not a valid transaction status")]
    InvalidStatus(String),

    /// A payment method string outside of the supported methods.
    #[error("\"{0}\" is not a valid payment method")]
    InvalidMethod(String),

    /// Tried to delete a plan that transactions still refer to.
    #[error("the plan is referenced by existing transactions and cannot be deleted")]
    PlanInUse,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::Validation("a user with that email address already exists".to_owned())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body sent to clients when a request fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// A message that can be shown to the operator verbatim.
    pub error: String,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound | Error::UnknownTransaction(_) => StatusCode::NOT_FOUND,
            Error::InvalidStatus(_) | Error::InvalidMethod(_) => StatusCode::BAD_REQUEST,
            Error::PlanInUse => StatusCode::CONFLICT,
            Error::SqlError(_) | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let message = match &self {
            Error::SqlError(_) | Error::DatabaseLockError => {
                // Internal details stay in the server logs.
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        };

        (status_code, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (Error::Validation("bad".to_owned()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::UnknownTransaction(7), StatusCode::NOT_FOUND),
            (Error::InvalidStatus("DONE".to_owned()), StatusCode::BAD_REQUEST),
            (Error::InvalidMethod("cash".to_owned()), StatusCode::BAD_REQUEST),
            (Error::PlanInUse, StatusCode::CONFLICT),
            (Error::DatabaseLockError, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, want) in cases {
            let got = error.into_response().status();
            assert_eq!(got, want);
        }
    }
}
