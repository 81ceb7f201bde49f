// SPDX-License-Identifier: Apache-2.0

//! Search orchestrator state machine.
//!
//! One task owns the [`SearchState`]. User commands, retry-loop progress,
//! network changes and resume timers all reach it as messages, so every
//! transition happens in one place and in order.
//!
//! ```text
//! Idle --start--> Searching --attempt failed--> Retrying --...--> Success | Error
//! Error --retry_now / connectivity restored--> Searching
//! ```
//!
//! Each search gets a generation number and its own cancellation token.
//! Starting a new search cancels the previous token first; results tagged
//! with an older generation are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bon::Builder;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{TerminalError, ValidationError, WayfareError};
use crate::executor::{Execution, RetryExecutor};
use crate::failure::Failure;
use crate::network::{NetworkStatus, wait_until_online};
use crate::policy::RetryPolicy;
use crate::request::{self, Request, Transport};
use crate::search::params::{SearchParams, ValidatedSearch};
use crate::search::results::{Flight, SearchResults, parse_flights};
use crate::search::state::{FailureCause, SearchFailure, SearchState};

/// Settings for a search orchestrator.
#[derive(Debug, Clone, Builder)]
pub struct SearchOptions {
    /// Flight search endpoint.
    #[builder(into)]
    pub endpoint: String,
    /// Retry policy for each search.
    #[builder(default)]
    pub policy: RetryPolicy,
    /// Timeout for a single backend call.
    #[builder(default = Duration::from_secs(30))]
    pub per_call_timeout: Duration,
    /// Deadline for the whole retry loop.
    pub outer_timeout: Option<Duration>,
    /// Delay before resuming a failed search once connectivity returns.
    #[builder(default = Duration::from_secs(2))]
    pub resume_guard: Duration,
}

impl SearchOptions {
    /// Builds options from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::Config` if the retry settings are invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, WayfareError> {
        Ok(Self::builder()
            .endpoint(config.search.endpoint.clone())
            .policy(config.retry.to_policy()?)
            .per_call_timeout(Duration::from_millis(config.request.per_call_timeout_ms))
            .maybe_outer_timeout(config.request.outer_timeout_ms.map(Duration::from_millis))
            .resume_guard(Duration::from_millis(config.search.resume_guard_ms))
            .build())
    }
}

#[derive(Debug)]
enum Command {
    Start {
        params: SearchParams,
        reply: oneshot::Sender<Result<(), ValidationError>>,
    },
    Cancel {
        reply: oneshot::Sender<bool>,
    },
    RetryNow {
        reply: oneshot::Sender<bool>,
    },
    Dismiss {
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Debug)]
enum Event {
    /// A retry for `generation` is about to happen.
    Retrying { generation: u64, attempt: u32 },
    /// The loop for `generation` ended.
    Finished {
        generation: u64,
        outcome: Result<SearchResults, SearchFailure>,
    },
    /// The resume guard for error occurrence `occurrence` elapsed.
    Resume { occurrence: u64 },
}

/// Shared, read-only inputs of every search loop.
struct LoopContext {
    transport: Arc<dyn Transport>,
    network: Arc<dyn NetworkStatus>,
    executor: RetryExecutor,
    options: SearchOptions,
}

#[derive(Debug)]
struct ActiveLoop {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug)]
struct ErrorOccurrence {
    id: u64,
    resume_scheduled: bool,
}

/// Owner of the search lifecycle. Runs as its own task; use [`SearchHandle`].
pub struct SearchOrchestrator {
    ctx: Arc<LoopContext>,
    state: watch::Sender<SearchState>,
    events: mpsc::UnboundedSender<Event>,
    generation: u64,
    active: Option<ActiveLoop>,
    last_search: Option<ValidatedSearch>,
    error: Option<ErrorOccurrence>,
    next_occurrence: u64,
    shutdown: CancellationToken,
}

impl SearchOrchestrator {
    /// Spawns the orchestrator task and returns a handle to it.
    ///
    /// Must be called within a Tokio runtime. The task stops, cancelling any
    /// running search, once every handle is dropped.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        network: Arc<dyn NetworkStatus>,
        options: SearchOptions,
    ) -> SearchHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let network_rx = network.subscribe();
        let (orchestrator, state_rx) = Self::new(transport, network, options, event_tx);

        tokio::spawn(orchestrator.run(command_rx, event_rx, network_rx));

        SearchHandle {
            commands: command_tx,
            state: state_rx,
        }
    }

    fn new(
        transport: Arc<dyn Transport>,
        network: Arc<dyn NetworkStatus>,
        options: SearchOptions,
        events: mpsc::UnboundedSender<Event>,
    ) -> (Self, watch::Receiver<SearchState>) {
        let (state, state_rx) = watch::channel(SearchState::Idle);
        let ctx = LoopContext {
            transport,
            network,
            executor: RetryExecutor::new(options.policy),
            options,
        };
        let orchestrator = Self {
            ctx: Arc::new(ctx),
            state,
            events,
            generation: 0,
            active: None,
            last_search: None,
            error: None,
            next_occurrence: 0,
            shutdown: CancellationToken::new(),
        };
        (orchestrator, state_rx)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
        mut network: watch::Receiver<bool>,
    ) {
        let mut watching_network = true;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
                changed = network.changed(), if watching_network => {
                    if changed.is_ok() {
                        let online = *network.borrow_and_update();
                        self.handle_network(online);
                    } else {
                        watching_network = false;
                    }
                }
            }
        }
        debug!("All search handles dropped, stopping orchestrator");
        self.shutdown.cancel();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { params, reply } => {
                let _ = reply.send(self.start(&params));
            }
            Command::Cancel { reply } => {
                let _ = reply.send(self.cancel());
            }
            Command::RetryNow { reply } => {
                let _ = reply.send(self.retry_now());
            }
            Command::Dismiss { reply } => {
                let _ = reply.send(self.dismiss());
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Retrying {
                generation,
                attempt,
            } => {
                if self.is_current(generation) {
                    self.transition(SearchState::Retrying {
                        attempt,
                        max_attempts: self.ctx.executor.policy().max_attempts,
                    });
                }
            }
            Event::Finished {
                generation,
                outcome,
            } => {
                if !self.is_current(generation) {
                    debug!(generation, "Discarding result of superseded search");
                    return;
                }
                self.active = None;
                match outcome {
                    Ok(results) => self.transition(SearchState::Success(results)),
                    Err(mut failure) => {
                        // The loop read connectivity before this event was handled;
                        // a reconnect in between produced no edge we can still see.
                        let online = self.ctx.network.is_online();
                        if online && failure.cause == FailureCause::Offline {
                            failure.cause = FailureCause::Network;
                        }
                        self.next_occurrence += 1;
                        self.error = Some(ErrorOccurrence {
                            id: self.next_occurrence,
                            resume_scheduled: false,
                        });
                        self.transition(SearchState::Error(failure));
                        if online {
                            self.handle_network(true);
                        }
                    }
                }
            }
            Event::Resume { occurrence } => self.resume(occurrence),
        }
    }

    fn handle_network(&mut self, online: bool) {
        if !online {
            debug!("Offline, further attempts are suspended");
            return;
        }

        let resumable = matches!(&*self.state.borrow(), SearchState::Error(f) if f.can_retry());
        if !resumable {
            return;
        }
        let Some(occurrence) = self.error.as_mut() else {
            return;
        };
        if occurrence.resume_scheduled {
            debug!(occurrence = occurrence.id, "Resume already scheduled");
            return;
        }
        occurrence.resume_scheduled = true;

        let id = occurrence.id;
        let guard = self.ctx.options.resume_guard;
        let events = self.events.clone();
        let shutdown = self.shutdown.clone();
        #[allow(clippy::cast_possible_truncation)]
        let guard_ms = guard.as_millis() as u64;
        debug!(occurrence = id, guard_ms, "Scheduling resume");
        tokio::spawn(async move {
            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(guard) => {
                    let _ = events.send(Event::Resume { occurrence: id });
                }
            }
        });
    }

    fn start(&mut self, params: &SearchParams) -> Result<(), ValidationError> {
        let search = params
            .validate(self.ctx.network.is_online())
            .inspect_err(|err| debug!(error = %err, "Search rejected"))?;
        self.begin(search);
        Ok(())
    }

    fn cancel(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        debug!(generation = active.generation, "Cancelling search");
        active.token.cancel();
        self.transition(SearchState::Idle);
        true
    }

    fn retry_now(&mut self) -> bool {
        let retryable = matches!(&*self.state.borrow(), SearchState::Error(f) if f.can_retry());
        if !retryable || !self.ctx.network.is_online() {
            return false;
        }
        match self.last_search.clone() {
            Some(search) => {
                self.begin(search);
                true
            }
            None => false,
        }
    }

    fn dismiss(&mut self) -> bool {
        if !matches!(&*self.state.borrow(), SearchState::Error(_)) {
            return false;
        }
        self.error = None;
        self.transition(SearchState::Idle);
        true
    }

    fn resume(&mut self, occurrence: u64) {
        let Some(current) = self.error.as_mut().filter(|o| o.id == occurrence) else {
            debug!(occurrence, "Ignoring resume for a stale error");
            return;
        };
        if !self.ctx.network.is_online() {
            // Lost connectivity again during the guard; wait for the next change.
            current.resume_scheduled = false;
            return;
        }
        if let Some(search) = self.last_search.clone() {
            info!(occurrence, "Connectivity restored, resuming search");
            self.begin(search);
        }
    }

    /// Starts a fresh loop, cancelling the running one first.
    fn begin(&mut self, search: ValidatedSearch) {
        if let Some(previous) = self.active.take() {
            debug!(generation = previous.generation, "Superseding in-flight search");
            previous.token.cancel();
        }

        self.generation += 1;
        let generation = self.generation;
        let token = self.shutdown.child_token();
        self.active = Some(ActiveLoop {
            generation,
            token: token.clone(),
        });
        self.error = None;
        self.last_search = Some(search.clone());
        self.transition(SearchState::Searching);

        tokio::spawn(run_search(
            Arc::clone(&self.ctx),
            search,
            generation,
            token,
            self.events.clone(),
        ));
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    fn transition(&self, next: SearchState) {
        debug!(generation = self.generation, state = ?next, "Search state transition");
        self.state.send_replace(next);
    }
}

/// Runs one search loop and reports its outcome to the orchestrator.
async fn run_search(
    ctx: Arc<LoopContext>,
    search: ValidatedSearch,
    generation: u64,
    token: CancellationToken,
    events: mpsc::UnboundedSender<Event>,
) {
    let search_request = Request {
        endpoint: ctx.options.endpoint.clone(),
        payload: search.payload(),
    };
    let max_attempts = ctx.executor.policy().max_attempts;
    let attempts = AtomicU32::new(0);

    let (ctx_ref, request_ref, token_ref, attempts_ref) = (&ctx, &search_request, &token, &attempts);
    let execution = ctx.executor.execute(
        move |attempt| {
            attempts_ref.store(attempt, Ordering::Relaxed);
            async move {
                if !ctx_ref.network.is_online() {
                    debug!(attempt, "Offline, waiting for connectivity before attempt");
                    if !wait_until_online(ctx_ref.network.as_ref(), token_ref).await {
                        return Err(Failure::Cancelled);
                    }
                }
                let response = request::call(
                    ctx_ref.transport.as_ref(),
                    request_ref,
                    ctx_ref.options.per_call_timeout,
                    token_ref,
                )
                .await?;
                parse_flights(&response.body).map_err(|err| Failure::Other {
                    message: err.to_string(),
                })
            }
        },
        |record| {
            let _ = events.send(Event::Retrying {
                generation,
                attempt: record.number + 1,
            });
        },
        &token,
    );

    let outcome = match ctx.options.outer_timeout {
        Some(limit) => {
            if let Ok(result) = tokio::time::timeout(limit, execution).await {
                settle(result, max_attempts, ctx.network.is_online())
            } else {
                token.cancel();
                #[allow(clippy::cast_possible_truncation)]
                let limit_ms = limit.as_millis() as u64;
                warn!(generation, limit_ms, "Search exceeded its overall deadline");
                Err(SearchFailure::outer_timeout(
                    attempts.load(Ordering::Relaxed),
                    limit_ms,
                ))
            }
        }
        None => settle(execution.await, max_attempts, ctx.network.is_online()),
    };

    let _ = events.send(Event::Finished {
        generation,
        outcome,
    });
}

fn settle(
    result: Result<Execution<(Vec<Flight>, usize)>, TerminalError>,
    max_attempts: u32,
    online: bool,
) -> Result<SearchResults, SearchFailure> {
    match result {
        Ok(execution) => {
            let (flights, discarded) = execution.value;
            Ok(SearchResults {
                flights,
                discarded,
                attempts_used: execution.attempts_used,
            })
        }
        Err(err) => Err(SearchFailure::from_terminal(&err, max_attempts, online)),
    }
}

/// Caller-facing handle to a running [`SearchOrchestrator`].
#[derive(Debug, Clone)]
pub struct SearchHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SearchState>,
}

impl SearchHandle {
    /// Validates `params` and starts a search, superseding any running one.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::Validation` if a local precondition fails; the
    /// state is left unchanged in that case.
    pub async fn start_search(&self, params: SearchParams) -> Result<(), WayfareError> {
        self.send_command(|reply| Command::Start { params, reply })
            .await?
            .map_err(WayfareError::from)
    }

    /// Cancels the running search and returns to `Idle`.
    ///
    /// Returns `false` if no search was running.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::OrchestratorClosed` if the task is gone.
    pub async fn cancel_search(&self) -> Result<bool, WayfareError> {
        self.send_command(|reply| Command::Cancel { reply }).await
    }

    /// Re-runs the last search from a retryable `Error` state.
    ///
    /// Returns `false` if the state does not allow a retry or the device is offline.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::OrchestratorClosed` if the task is gone.
    pub async fn retry_now(&self) -> Result<bool, WayfareError> {
        self.send_command(|reply| Command::RetryNow { reply }).await
    }

    /// Dismisses an `Error` state, returning to `Idle` and disabling
    /// automatic resumption for it.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::OrchestratorClosed` if the task is gone.
    pub async fn dismiss_error(&self) -> Result<bool, WayfareError> {
        self.send_command(|reply| Command::Dismiss { reply }).await
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }

    /// Waits until no search is running and returns the resulting state.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::OrchestratorClosed` if the task is gone.
    pub async fn wait_until_settled(&self) -> Result<SearchState, WayfareError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|state| !state.is_active())
            .await
            .map_err(|_| WayfareError::OrchestratorClosed)?;
        Ok(state.clone())
    }

    async fn send_command<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, WayfareError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| WayfareError::OrchestratorClosed)?;
        rx.await.map_err(|_| WayfareError::OrchestratorClosed)
    }
}
