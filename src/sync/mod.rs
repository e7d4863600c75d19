//! Client-side synchronisation of the billing list.
//!
//! An operator edits the page, filters and search term while queries and
//! status changes are in flight. [SyncController] debounces those edits,
//! tags every query with a sequence number so that only the newest result is
//! shown, and asks for confirmation before verifying or rejecting a payment.
//!
//! ```no_run
//! use billing_ledger::sync::{Command, HttpLedgerClient, SyncController, SyncState};
//! use tokio::sync::{mpsc, watch};
//!
//! # async fn example() {
//! let (commands, command_rx) = mpsc::channel(16);
//! let (view_tx, mut view) = watch::channel(SyncState::new(20));
//! let (notice_tx, _notices) = mpsc::unbounded_channel();
//!
//! let controller = SyncController::new(HttpLedgerClient::new("http://127.0.0.1:3000"), 20);
//! tokio::spawn(controller.run(command_rx, view_tx, notice_tx));
//!
//! commands.send(Command::SetSearch("ETB-991".to_owned())).await.unwrap();
//! view.changed().await.unwrap();
//! # }
//! ```

mod client;
mod controller;
mod debounce;
mod state;

pub use client::{ClientError, HttpLedgerClient, LedgerClient};
pub use controller::{Command, SyncController};
pub use debounce::{DEFAULT_QUIET_WINDOW, should_fire};
pub use state::{Effect, Event, Input, Notice, PendingTransition, SyncState};
