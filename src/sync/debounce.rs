//! Decides when a burst of input changes has settled.

use std::time::Duration;

use tokio::time::Instant;

/// How long inputs must stay unchanged before the billing list is re-queried.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Whether a query scheduled by the change at `last_change` should fire at
/// `now`, i.e. no change has happened for at least `quiet_window`.
pub fn should_fire(last_change: Instant, now: Instant, quiet_window: Duration) -> bool {
    now.saturating_duration_since(last_change) >= quiet_window
}
