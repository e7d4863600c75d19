#![allow(missing_docs)]

use rusqlite::Connection;
use time::macros::datetime;

use crate::{
    AppState, TransactionId,
    db::initialize,
    pagination::{Page, PaginationConfig},
    plan::{Plan, PlanForm, create_plan},
    transaction::{PaymentMethod, Transaction, TransactionPage, TransactionStatus},
    user::{User, create_user},
};

pub(crate) fn must_create_test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("Could not open in-memory database");
    initialize(&conn).expect("Could not initialize database");
    conn
}

/// Insert a user and a 30 day plan with ten uses.
pub(crate) fn seed_user_and_plan(conn: &Connection) -> (User, Plan) {
    let user = create_user("Abebe Kebede", "abebe@example.com", conn)
        .expect("Could not create test user");
    let plan = create_plan(
        PlanForm {
            name: "Sender Pro".to_owned(),
            price: 500.0,
            usage_limit: 10,
            period_days: 30,
            description: "Ten shipment posts a month".to_owned(),
        },
        conn,
    )
    .expect("Could not create test plan");

    (user, plan)
}

pub(crate) fn must_create_test_state() -> AppState {
    let conn = Connection::open_in_memory().expect("Could not open in-memory database");

    AppState::new(conn, PaginationConfig::default()).expect("Could not create app state")
}

/// A pending transaction that was never stored, for client-side tests.
pub(crate) fn transaction_fixture(id: TransactionId, reference: &str) -> Transaction {
    Transaction {
        id,
        reference: reference.to_owned(),
        user_id: 1,
        plan_id: 1,
        amount: 500.0,
        payment_method: PaymentMethod::MobileMoney,
        receipt_url: None,
        status: TransactionStatus::Pending,
        timestamp: datetime!(2025-06-01 12:00 UTC),
        granted_at: None,
        expires_at: None,
        remaining_usage: 0,
        is_active: false,
    }
}

/// A single page holding one fixture transaction per reference.
pub(crate) fn page_of(references: &[&str]) -> TransactionPage {
    Page {
        items: references
            .iter()
            .zip(1..)
            .map(|(reference, id)| transaction_fixture(id, reference))
            .collect(),
        total_records: references.len() as u64,
        total_pages: 1,
        current_page: 1,
    }
}
