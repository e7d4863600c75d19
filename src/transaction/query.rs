//! The paged, filtered query behind the billing list.

use std::str::FromStr;

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    pagination::{Page, PaginationConfig, page_count, page_offset},
};

use super::core::{
    PaymentMethod, TRANSACTION_COLUMNS, Transaction, TransactionStatus, map_transaction_row,
};

/// The keyword that clients send to turn a filter off.
const ALL_KEYWORD: &str = "ALL";

/// Restricts a query to transactions with one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Any status.
    #[default]
    All,
    /// Only transactions with this status.
    Only(TransactionStatus),
}

impl FromStr for StatusFilter {
    type Err = Error;

    /// Parse `"ALL"` (or an empty string) as no filter, otherwise a status.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | ALL_KEYWORD => Ok(StatusFilter::All),
            status => status.parse().map(StatusFilter::Only),
        }
    }
}

/// Restricts a query to transactions paid with one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodFilter {
    /// Any payment method.
    #[default]
    All,
    /// Only transactions paid with this method.
    Only(PaymentMethod),
}

impl FromStr for MethodFilter {
    type Err = Error;

    /// Parse `"ALL"` (or an empty string) as no filter, otherwise a method.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | ALL_KEYWORD => Ok(MethodFilter::All),
            method => method.parse().map(MethodFilter::Only),
        }
    }
}

/// A fully specified billing list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    /// The 1-based page to fetch.
    pub page: u64,
    /// How many records make up a page.
    pub page_size: u64,
    /// Which status to show.
    pub status: StatusFilter,
    /// Which payment method to show.
    pub method: MethodFilter,
    /// Matched as a substring of the reference or the owner's name or email.
    pub search: String,
}

impl TransactionQuery {
    /// The first page of the unfiltered list.
    pub fn first_page(page_size: u64) -> Self {
        Self {
            page: 1,
            page_size,
            status: StatusFilter::All,
            method: MethodFilter::All,
            search: String::new(),
        }
    }
}

/// The query string parameters of the billing list endpoint.
///
/// Omitted parameters fall back to the server's [PaginationConfig] and to no
/// filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionQueryParams {
    /// The 1-based page to fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// How many records make up a page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    /// A status, or `ALL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// A payment method, or `ALL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// A search term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TransactionQueryParams {
    /// Fill in defaults and parse the filters.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if the page size exceeds the configured maximum,
    /// - [Error::InvalidStatus] or [Error::InvalidMethod] for unknown filter
    ///   values.
    pub fn into_query(self, config: &PaginationConfig) -> Result<TransactionQuery, Error> {
        let page_size = self.page_size.unwrap_or(config.default_page_size);

        if page_size > config.max_page_size {
            return Err(Error::Validation(format!(
                "page size must be at most {}, got {page_size}",
                config.max_page_size
            )));
        }

        Ok(TransactionQuery {
            page: self.page.unwrap_or(config.default_page),
            page_size,
            status: self.status.as_deref().unwrap_or(ALL_KEYWORD).parse()?,
            method: self.method.as_deref().unwrap_or(ALL_KEYWORD).parse()?,
            search: self.search.unwrap_or_default(),
        })
    }
}

impl From<&TransactionQuery> for TransactionQueryParams {
    fn from(query: &TransactionQuery) -> Self {
        let search = query.search.trim();

        Self {
            page: Some(query.page),
            page_size: Some(query.page_size),
            status: match query.status {
                StatusFilter::All => None,
                StatusFilter::Only(status) => Some(status.as_str().to_owned()),
            },
            method: match query.method {
                MethodFilter::All => None,
                MethodFilter::Only(method) => Some(method.as_str().to_owned()),
            },
            search: (!search.is_empty()).then(|| search.to_owned()),
        }
    }
}

/// A page of the billing list.
pub type TransactionPage = Page<Transaction>;

/// Fetch one page of transactions matching `query`, newest first, deriving
/// whether each is active at `now`.
///
/// Ties on the timestamp are broken by ascending ID so that pages never
/// shuffle between identical queries. A page past the end of the results is
/// returned empty, with `current_page` still set to the requested page.
///
/// Search ignores case across all of Unicode, using the `fold_case` SQL
/// function registered by [crate::initialize_db].
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the page or page size is zero,
/// - or [Error::SqlError] if there is some SQL error.
pub fn query_transactions(
    query: &TransactionQuery,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<TransactionPage, Error> {
    if query.page < 1 {
        return Err(Error::Validation(format!(
            "page must be at least 1, got {}",
            query.page
        )));
    }

    if query.page_size < 1 {
        return Err(Error::Validation(format!(
            "page size must be at least 1, got {}",
            query.page_size
        )));
    }

    let mut conditions = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let StatusFilter::Only(status) = query.status {
        conditions.push("t.status = ?");
        params.push(Value::Text(status.as_str().to_owned()));
    }

    if let MethodFilter::Only(method) = query.method {
        conditions.push("t.payment_method = ?");
        params.push(Value::Text(method.as_str().to_owned()));
    }

    let search = query.search.trim().to_lowercase();
    if !search.is_empty() {
        conditions.push(
            "(instr(fold_case(t.reference), ?) > 0 \
             OR instr(fold_case(u.name), ?) > 0 \
             OR instr(fold_case(u.email), ?) > 0)",
        );
        for _ in 0..3 {
            params.push(Value::Text(search.clone()));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let from_clause = format!(
        "FROM subscription_transaction t LEFT JOIN user u ON u.id = t.user_id {where_clause}"
    );

    let total_records: i64 = connection.query_row(
        &format!("SELECT COUNT(t.id) {from_clause}"),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )?;
    let total_records = total_records.unsigned_abs();
    let total_pages = page_count(total_records, query.page_size);

    let empty_page = || Page {
        items: Vec::new(),
        total_records,
        total_pages,
        current_page: query.page,
    };

    let (Some(offset), Ok(limit)) = (
        page_offset(query.page, query.page_size),
        i64::try_from(query.page_size),
    ) else {
        return Ok(empty_page());
    };

    if query.page > total_pages {
        return Ok(empty_page());
    }

    params.push(Value::Integer(limit));
    params.push(Value::Integer(offset));

    let items = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} {from_clause}
             ORDER BY t.timestamp DESC, t.id ASC
             LIMIT ? OFFSET ?"
        ))?
        .query_map(params_from_iter(params.iter()), |row| {
            map_transaction_row(row, now)
        })?
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;

    Ok(Page {
        items,
        total_records,
        total_pages,
        current_page: query.page,
    })
}
