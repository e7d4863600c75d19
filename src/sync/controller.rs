//! Drives a [SyncState] from operator commands, the debounce timer and
//! in-flight ledger requests.

use std::time::Duration;

use futures::{StreamExt, future::BoxFuture, stream::FuturesUnordered};
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, sleep},
};

use crate::{
    TransactionId,
    transaction::{MethodFilter, StatusFilter, TransactionStatus},
};

use super::{
    client::LedgerClient,
    debounce::{DEFAULT_QUIET_WINDOW, should_fire},
    state::{Effect, Event, Input, Notice, SyncState},
};

/// What the operator can do in the billing view.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Go to another page.
    SetPage(u64),
    /// Filter by status.
    SetStatusFilter(StatusFilter),
    /// Filter by payment method.
    SetMethodFilter(MethodFilter),
    /// Search by reference or owner.
    SetSearch(String),
    /// Reload the list now, skipping the quiet window.
    Refresh,
    /// Start moving a transaction to another status.
    RequestTransition {
        /// The transaction to change.
        id: TransactionId,
        /// The status to move it to.
        status: TransactionStatus,
    },
    /// Confirm the pending transition.
    Confirm,
    /// Cancel the pending transition.
    Cancel,
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        match command {
            Command::SetPage(page) => Event::InputChanged(Input::Page(page)),
            Command::SetStatusFilter(status) => Event::InputChanged(Input::Status(status)),
            Command::SetMethodFilter(method) => Event::InputChanged(Input::Method(method)),
            Command::SetSearch(search) => Event::InputChanged(Input::Search(search)),
            Command::Refresh => Event::RefreshRequested,
            Command::RequestTransition { id, status } => {
                Event::TransitionRequested { id, status }
            }
            Command::Confirm => Event::TransitionConfirmed,
            Command::Cancel => Event::TransitionCancelled,
        }
    }
}

/// Keeps an operator's view of the billing list in step with the ledger.
///
/// The controller runs as a single task. Input changes are debounced, every
/// query is tagged with a sequence number and only the newest result is ever
/// shown, so a slow response can never overwrite a newer one.
#[derive(Debug, Clone)]
pub struct SyncController<C> {
    client: C,
    page_size: u64,
    quiet_window: Duration,
}

impl<C: LedgerClient> SyncController<C> {
    /// Create a controller that shows `page_size` transactions per page and
    /// waits [DEFAULT_QUIET_WINDOW] after the last input change to query.
    pub fn new(client: C, page_size: u64) -> Self {
        Self {
            client,
            page_size,
            quiet_window: DEFAULT_QUIET_WINDOW,
        }
    }

    /// Set how long inputs must be unchanged before a query fires.
    pub fn with_quiet_window(mut self, quiet_window: Duration) -> Self {
        self.quiet_window = quiet_window;
        self
    }

    /// Run until `commands` is closed.
    ///
    /// The first page is loaded straight away. Every new state is published
    /// on `view` and operator facing messages are sent on `notices`.
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<Command>,
        view: watch::Sender<SyncState>,
        notices: mpsc::UnboundedSender<Notice>,
    ) {
        let mut state = SyncState::new(self.page_size);
        let mut in_flight: FuturesUnordered<BoxFuture<'static, Event>> = FuturesUnordered::new();

        let timer = sleep(self.quiet_window);
        tokio::pin!(timer);
        let mut timer_armed = false;
        let mut last_change = Instant::now();

        let mut next_event = Some(Event::RefreshRequested);

        loop {
            let event = match next_event.take() {
                Some(event) => event,
                None => tokio::select! {
                    command = commands.recv() => match command {
                        Some(command) => command.into(),
                        None => break,
                    },
                    () = &mut timer, if timer_armed => {
                        if should_fire(last_change, Instant::now(), self.quiet_window) {
                            timer_armed = false;
                            Event::DebounceElapsed
                        } else {
                            timer.as_mut().reset(last_change + self.quiet_window);
                            continue;
                        }
                    },
                    Some(event) = in_flight.next(), if !in_flight.is_empty() => event,
                },
            };

            let (next_state, effects) = state.reduce(event);
            state = next_state;

            for effect in effects {
                match effect {
                    Effect::ScheduleQuery => {
                        last_change = Instant::now();
                        timer.as_mut().reset(last_change + self.quiet_window);
                        timer_armed = true;
                    }
                    Effect::CancelScheduledQuery => timer_armed = false,
                    Effect::DispatchQuery { sequence, query } => {
                        tracing::debug!("dispatching query {sequence}: {query:?}");
                        let client = self.client.clone();
                        in_flight.push(Box::pin(async move {
                            match client.query(query).await {
                                Ok(page) => Event::QuerySucceeded { sequence, page },
                                Err(error) => Event::QueryFailed { sequence, error },
                            }
                        }));
                    }
                    Effect::DispatchMutation { id, status } => {
                        tracing::info!("moving transaction {id} to {status}");
                        let client = self.client.clone();
                        in_flight.push(Box::pin(async move {
                            match client.set_status(id, status).await {
                                Ok(transaction) => Event::MutationSucceeded { transaction },
                                Err(error) => Event::MutationFailed { id, status, error },
                            }
                        }));
                    }
                    Effect::Notify(notice) => {
                        if notices.send(notice).is_err() {
                            tracing::debug!("no one is listening for notices");
                        }
                    }
                }
            }

            view.send_replace(state.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use tokio::{
        sync::{mpsc, watch},
        task::JoinHandle,
        time::sleep,
    };

    use crate::{
        TransactionId,
        sync::{ClientError, Command, LedgerClient, Notice, SyncController, SyncState},
        test_utils::{page_of, transaction_fixture},
        transaction::{Transaction, TransactionPage, TransactionQuery, TransactionStatus},
    };

    #[derive(Debug, Default)]
    struct Script {
        /// Response delay per search term.
        delays: HashMap<String, Duration>,
        fail_queries: bool,
        fail_mutations: bool,
        queries: Vec<TransactionQuery>,
        mutations: Vec<(TransactionId, TransactionStatus)>,
    }

    /// Answers every query with one transaction whose reference is the search term.
    #[derive(Debug, Clone, Default)]
    struct ScriptedClient {
        script: Arc<Mutex<Script>>,
    }

    impl ScriptedClient {
        fn delay(&self, search: &str, delay: Duration) {
            self.script
                .lock()
                .unwrap()
                .delays
                .insert(search.to_owned(), delay);
        }

        fn searches(&self) -> Vec<String> {
            self.script
                .lock()
                .unwrap()
                .queries
                .iter()
                .map(|query| query.search.clone())
                .collect()
        }
    }

    impl LedgerClient for ScriptedClient {
        async fn query(&self, query: TransactionQuery) -> Result<TransactionPage, ClientError> {
            let (delay, fail) = {
                let mut script = self.script.lock().unwrap();
                script.queries.push(query.clone());
                let delay = script
                    .delays
                    .get(&query.search)
                    .copied()
                    .unwrap_or(Duration::from_millis(10));
                (delay, script.fail_queries)
            };

            sleep(delay).await;

            if fail {
                Err(ClientError::TransientNetwork("connection reset".to_owned()))
            } else {
                Ok(page_of(&[query.search.as_str()]))
            }
        }

        async fn set_status(
            &self,
            id: TransactionId,
            status: TransactionStatus,
        ) -> Result<Transaction, ClientError> {
            let fail = {
                let mut script = self.script.lock().unwrap();
                script.mutations.push((id, status));
                script.fail_mutations
            };

            sleep(Duration::from_millis(10)).await;

            if fail {
                Err(ClientError::TransientNetwork("connection reset".to_owned()))
            } else {
                let mut transaction = transaction_fixture(id, "");
                transaction.status = status;
                Ok(transaction)
            }
        }
    }

    struct Harness {
        client: ScriptedClient,
        commands: mpsc::Sender<Command>,
        view: watch::Receiver<SyncState>,
        notices: mpsc::UnboundedReceiver<Notice>,
        _task: JoinHandle<()>,
    }

    impl Harness {
        fn start() -> Self {
            let client = ScriptedClient::default();
            let (commands, command_rx) = mpsc::channel(16);
            let (view_tx, view) = watch::channel(SyncState::new(20));
            let (notice_tx, notices) = mpsc::unbounded_channel();
            let controller = SyncController::new(client.clone(), 20);
            let task = tokio::spawn(controller.run(command_rx, view_tx, notice_tx));

            Self {
                client,
                commands,
                view,
                notices,
                _task: task,
            }
        }

        async fn send(&self, command: Command) {
            self.commands.send(command).await.unwrap();
        }

        fn displayed_references(&self) -> Vec<String> {
            self.view
                .borrow()
                .displayed
                .as_ref()
                .map(|page| {
                    page.items
                        .iter()
                        .map(|item| item.reference.clone())
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loads_first_page_on_start() {
        let harness = Harness::start();

        sleep(Duration::from_millis(50)).await;

        assert_eq!(harness.client.searches(), vec![String::new()]);
        assert_eq!(harness.displayed_references(), vec![String::new()]);
        assert!(!harness.view.borrow().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_query_never_overwrites_later_one() {
        let harness = Harness::start();
        harness.client.delay("slow", Duration::from_secs(2));
        sleep(Duration::from_millis(50)).await;

        harness.send(Command::SetSearch("slow".to_owned())).await;
        sleep(Duration::from_millis(600)).await;
        harness.send(Command::SetSearch("fast".to_owned())).await;
        sleep(Duration::from_millis(600)).await;

        assert_eq!(harness.displayed_references(), vec!["fast".to_owned()]);

        // Let the slow response arrive.
        sleep(Duration::from_secs(3)).await;

        assert_eq!(harness.client.searches(), vec!["", "slow", "fast"]);
        assert_eq!(harness.displayed_references(), vec!["fast".to_owned()]);
        assert!(!harness.view.borrow().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_changes_are_coalesced() {
        let harness = Harness::start();
        sleep(Duration::from_millis(50)).await;

        for search in ["E", "ET", "ETB", "ETB-991"] {
            harness.send(Command::SetSearch(search.to_owned())).await;
            sleep(Duration::from_millis(100)).await;
        }

        assert_eq!(harness.client.searches(), vec![""]);

        sleep(Duration::from_millis(600)).await;

        assert_eq!(harness.client.searches(), vec!["", "ETB-991"]);
        assert_eq!(harness.displayed_references(), vec!["ETB-991".to_owned()]);
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_resets_page_before_query() {
        let harness = Harness::start();
        sleep(Duration::from_millis(50)).await;
        harness.send(Command::SetPage(3)).await;
        sleep(Duration::from_millis(600)).await;

        harness.send(Command::SetSearch("ETB".to_owned())).await;
        sleep(Duration::from_millis(1)).await;

        assert_eq!(harness.view.borrow().page, 1);
        let queries = harness.client.script.lock().unwrap().queries.clone();
        assert_eq!(queries.len(), 2, "the search query should still be waiting");
        assert_eq!(queries[1].page, 3);

        sleep(Duration::from_millis(600)).await;

        let queries = harness.client.script.lock().unwrap().queries.clone();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[2].page, 1);
        assert_eq!(queries[2].search, "ETB");
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_skips_quiet_window() {
        let harness = Harness::start();
        sleep(Duration::from_millis(50)).await;

        harness.send(Command::Refresh).await;
        sleep(Duration::from_millis(20)).await;

        assert_eq!(harness.client.searches().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn requery_after_mutation_replaces_pending_search() {
        let harness = Harness::start();
        sleep(Duration::from_millis(50)).await;

        harness.send(Command::SetSearch("ETB".to_owned())).await;
        harness
            .send(Command::RequestTransition {
                id: 7,
                status: TransactionStatus::Pending,
            })
            .await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(harness.client.searches(), vec!["", "ETB"]);

        sleep(Duration::from_secs(1)).await;

        assert_eq!(harness.client.searches(), vec!["", "ETB"]);
        assert_eq!(harness.displayed_references(), vec!["ETB".to_owned()]);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_transition_is_applied_then_requeried() {
        let mut harness = Harness::start();
        sleep(Duration::from_millis(50)).await;

        harness
            .send(Command::RequestTransition {
                id: 7,
                status: TransactionStatus::Completed,
            })
            .await;
        sleep(Duration::from_millis(50)).await;
        assert!(harness.client.script.lock().unwrap().mutations.is_empty());

        harness.send(Command::Confirm).await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(
            harness.client.script.lock().unwrap().mutations,
            vec![(7, TransactionStatus::Completed)]
        );
        assert_eq!(
            harness.notices.recv().await,
            Some(Notice::MutationApplied {
                id: 7,
                status: TransactionStatus::Completed
            })
        );
        assert_eq!(harness.client.searches().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_transition_is_reported_and_not_shown() {
        let mut harness = Harness::start();
        sleep(Duration::from_millis(50)).await;
        let before = harness.view.borrow().displayed.clone();
        harness.client.script.lock().unwrap().fail_mutations = true;

        harness
            .send(Command::RequestTransition {
                id: 1,
                status: TransactionStatus::Pending,
            })
            .await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(
            harness.notices.recv().await,
            Some(Notice::MutationFailed {
                id: 1,
                status: TransactionStatus::Pending,
                message: "could not reach the ledger: connection reset".to_owned(),
            })
        );
        assert_eq!(harness.view.borrow().displayed, before);
        assert_eq!(harness.client.searches().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_page_and_flags_retry() {
        let mut harness = Harness::start();
        sleep(Duration::from_millis(50)).await;
        harness.client.script.lock().unwrap().fail_queries = true;

        harness.send(Command::Refresh).await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(harness.displayed_references(), vec![String::new()]);
        assert!(harness.view.borrow().retryable_failure);
        assert_eq!(
            harness.notices.recv().await,
            Some(Notice::QueryFailed {
                message: "could not reach the ledger: connection reset".to_owned(),
                retryable: true,
            })
        );
    }
}
