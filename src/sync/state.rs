//! The operator's view of the billing list and the reducer that advances it.
//!
//! [SyncState] never changes in place. Every input, timer tick and network
//! result is an [Event], and [SyncState::reduce] returns the next state along
//! with the [Effect]s the controller must carry out. Keeping the state pure
//! lets the sequence-number rules be tested without a runtime.

use crate::{
    TransactionId,
    transaction::{
        MethodFilter, StatusFilter, Transaction, TransactionPage, TransactionQuery,
        TransactionStatus,
    },
};

use super::client::ClientError;

/// A change to one of the query inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Go to another page.
    Page(u64),
    /// Show another status.
    Status(StatusFilter),
    /// Show another payment method.
    Method(MethodFilter),
    /// Search for another term.
    Search(String),
}

/// Something that happened to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The operator changed an input.
    InputChanged(Input),
    /// The inputs have been quiet for long enough to query.
    DebounceElapsed,
    /// The operator asked to reload the list now.
    RefreshRequested,
    /// A query finished.
    QuerySucceeded {
        /// The sequence number the query was dispatched with.
        sequence: u64,
        /// The page the ledger returned.
        page: TransactionPage,
    },
    /// A query failed.
    QueryFailed {
        /// The sequence number the query was dispatched with.
        sequence: u64,
        /// Why it failed.
        error: ClientError,
    },
    /// The operator asked to move a transaction to another status.
    TransitionRequested {
        /// The transaction to change.
        id: TransactionId,
        /// The status to move it to.
        status: TransactionStatus,
    },
    /// The operator confirmed the pending transition.
    TransitionConfirmed,
    /// The operator backed out of the pending transition.
    TransitionCancelled,
    /// The ledger applied a status change.
    MutationSucceeded {
        /// The transaction as the ledger now has it.
        transaction: Transaction,
    },
    /// The ledger did not apply a status change.
    MutationFailed {
        /// The transaction that was to be changed.
        id: TransactionId,
        /// The status it was to be moved to.
        status: TransactionStatus,
        /// Why it failed.
        error: ClientError,
    },
}

/// Work the controller must do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Restart the quiet window, replacing any query already scheduled.
    ScheduleQuery,
    /// Drop the scheduled query, if any.
    CancelScheduledQuery,
    /// Send `query` to the ledger, tagged with `sequence`.
    DispatchQuery {
        /// Orders this query against every other.
        sequence: u64,
        /// The inputs as they were when the query fired.
        query: TransactionQuery,
    },
    /// Ask the ledger to move `id` to `status`.
    DispatchMutation {
        /// The transaction to change.
        id: TransactionId,
        /// The status to move it to.
        status: TransactionStatus,
    },
    /// Tell the operator something.
    Notify(Notice),
}

/// Messages for the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The list could not be loaded, the previous page is still shown.
    QueryFailed {
        /// What went wrong.
        message: String,
        /// Whether trying again may help.
        retryable: bool,
    },
    /// A status change was applied by the ledger.
    MutationApplied {
        /// The changed transaction.
        id: TransactionId,
        /// Its new status.
        status: TransactionStatus,
    },
    /// A status change was not applied and the displayed status is unchanged.
    MutationFailed {
        /// The transaction that was to be changed.
        id: TransactionId,
        /// The status it was to be moved to.
        status: TransactionStatus,
        /// What went wrong.
        message: String,
    },
}

/// A status change waiting for the operator to confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    /// The transaction to change.
    pub id: TransactionId,
    /// The status to move it to.
    pub status: TransactionStatus,
}

/// Everything the billing view shows and needs to decide what to do next.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    /// The page the operator is on.
    pub page: u64,
    /// How many records make up a page.
    pub page_size: u64,
    /// The status filter.
    pub status: StatusFilter,
    /// The payment method filter.
    pub method: MethodFilter,
    /// The search term.
    pub search: String,
    /// The sequence number given to the most recently dispatched query.
    pub last_dispatched: u64,
    /// The highest sequence number whose result, success or failure, has
    /// been applied. Results at or below it are stale.
    pub highest_seen: u64,
    /// The page last returned by the ledger.
    pub displayed: Option<TransactionPage>,
    /// Whether a query newer than the displayed page is in flight.
    pub loading: bool,
    /// Whether the latest query failed in a way that may succeed on retry.
    pub retryable_failure: bool,
    /// A status change awaiting confirmation.
    pub pending_transition: Option<PendingTransition>,
}

impl SyncState {
    /// The state of a freshly opened view, before anything has loaded.
    pub fn new(page_size: u64) -> Self {
        Self {
            page: 1,
            page_size,
            status: StatusFilter::All,
            method: MethodFilter::All,
            search: String::new(),
            last_dispatched: 0,
            highest_seen: 0,
            displayed: None,
            loading: false,
            retryable_failure: false,
            pending_transition: None,
        }
    }

    /// The query described by the current inputs.
    pub fn current_query(&self) -> TransactionQuery {
        TransactionQuery {
            page: self.page,
            page_size: self.page_size,
            status: self.status,
            method: self.method,
            search: self.search.clone(),
        }
    }

    /// Advance the state by one event.
    pub fn reduce(&self, event: Event) -> (SyncState, Vec<Effect>) {
        let mut next = self.clone();

        let effects = match event {
            Event::InputChanged(input) => next.change_input(input),
            Event::DebounceElapsed => vec![next.dispatch_query()],
            Event::RefreshRequested => vec![Effect::CancelScheduledQuery, next.dispatch_query()],
            Event::QuerySucceeded { sequence, page } => {
                if next.accept(sequence) {
                    next.displayed = Some(page);
                    next.retryable_failure = false;
                }
                Vec::new()
            }
            Event::QueryFailed { sequence, error } => {
                if next.accept(sequence) {
                    next.retryable_failure = error.is_retryable();
                    vec![Effect::Notify(Notice::QueryFailed {
                        message: error.to_string(),
                        retryable: error.is_retryable(),
                    })]
                } else {
                    Vec::new()
                }
            }
            Event::TransitionRequested { id, status } => {
                if status.requires_confirmation() {
                    next.pending_transition = Some(PendingTransition { id, status });
                    Vec::new()
                } else {
                    next.pending_transition = None;
                    vec![Effect::DispatchMutation { id, status }]
                }
            }
            Event::TransitionConfirmed => match next.pending_transition.take() {
                Some(PendingTransition { id, status }) => {
                    vec![Effect::DispatchMutation { id, status }]
                }
                None => Vec::new(),
            },
            Event::TransitionCancelled => {
                next.pending_transition = None;
                Vec::new()
            }
            Event::MutationSucceeded { transaction } => vec![
                Effect::Notify(Notice::MutationApplied {
                    id: transaction.id,
                    status: transaction.status,
                }),
                Effect::CancelScheduledQuery,
                next.dispatch_query(),
            ],
            Event::MutationFailed { id, status, error } => {
                vec![Effect::Notify(Notice::MutationFailed {
                    id,
                    status,
                    message: error.to_string(),
                })]
            }
        };

        (next, effects)
    }

    fn change_input(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Page(page) => {
                let page = page.max(1);
                if page == self.page {
                    return Vec::new();
                }
                self.page = page;
            }
            Input::Status(status) => {
                if status == self.status {
                    return Vec::new();
                }
                self.status = status;
                self.page = 1;
            }
            Input::Method(method) => {
                if method == self.method {
                    return Vec::new();
                }
                self.method = method;
                self.page = 1;
            }
            Input::Search(search) => {
                if search == self.search {
                    return Vec::new();
                }
                self.search = search;
                self.page = 1;
            }
        }

        vec![Effect::ScheduleQuery]
    }

    fn dispatch_query(&mut self) -> Effect {
        self.last_dispatched += 1;
        self.loading = true;

        Effect::DispatchQuery {
            sequence: self.last_dispatched,
            query: self.current_query(),
        }
    }

    /// Record the result tagged `sequence` if it is newer than every result
    /// applied so far.
    fn accept(&mut self, sequence: u64) -> bool {
        if sequence <= self.highest_seen {
            tracing::debug!(
                "discarding result of query {sequence}, already applied {}",
                self.highest_seen
            );
            return false;
        }

        self.highest_seen = sequence;
        self.loading = sequence < self.last_dispatched;
        true
    }
}
