//! The ledger API as seen by the sync controller.

use std::future::Future;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::{
    TransactionId,
    endpoints::{self, format_endpoint},
    error::ErrorBody,
    transaction::{
        StatusUpdate, Transaction, TransactionPage, TransactionQuery, TransactionQueryParams,
        TransactionStatus,
    },
};

/// The ways a call to the ledger can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The ledger could not be reached or failed internally. Retrying may succeed.
    #[error("could not reach the ledger: {0}")]
    TransientNetwork(String),

    /// The ledger refused the request, e.g. an unknown transaction or status.
    ///
    /// The message comes from the ledger and can be shown to the operator.
    #[error("{message}")]
    Rejected {
        /// The HTTP status code of the response.
        status: u16,
        /// The ledger's explanation.
        message: String,
    },

    /// The ledger answered with a body that could not be decoded.
    #[error("unexpected response from the ledger: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::TransientNetwork(_))
    }
}

/// The ledger operations the sync controller needs.
pub trait LedgerClient: Clone + Send + Sync + 'static {
    /// Fetch one page of the billing list.
    fn query(
        &self,
        query: TransactionQuery,
    ) -> impl Future<Output = Result<TransactionPage, ClientError>> + Send;

    /// Move a transaction to `status`.
    fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> impl Future<Output = Result<Transaction, ClientError>> + Send;
}

/// A [LedgerClient] that talks to the ledger's JSON API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    base_url: String,
    client: Client,
}

impl HttpLedgerClient {
    /// Create a client for the ledger served at `base_url`, e.g. "http://127.0.0.1:3000".
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl LedgerClient for HttpLedgerClient {
    async fn query(&self, query: TransactionQuery) -> Result<TransactionPage, ClientError> {
        let response = self
            .client
            .get(self.url(endpoints::TRANSACTIONS_API))
            .query(&TransactionQueryParams::from(&query))
            .send()
            .await
            .map_err(|error| ClientError::TransientNetwork(error.to_string()))?;

        decode(response).await
    }

    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, ClientError> {
        let response = self
            .client
            .patch(self.url(&format_endpoint(endpoints::TRANSACTION, id)))
            .json(&StatusUpdate {
                status: status.as_str().to_owned(),
            })
            .send()
            .await
            .map_err(|error| ClientError::TransientNetwork(error.to_string()))?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|error| ClientError::InvalidResponse(error.to_string()));
    }

    let body = response
        .text()
        .await
        .map_err(|error| ClientError::TransientNetwork(error.to_string()))?;
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|error_body| error_body.error)
        .unwrap_or(body);

    if status.is_server_error() {
        Err(ClientError::TransientNetwork(message))
    } else {
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
