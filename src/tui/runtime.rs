//! Async runtime and task management for the TUI
//!
//! Dual-channel event-driven architecture:
//! - Input channel (priority): terminal input, never dropped
//! - Data channel: poll timer ticks (droppable) and gateway worker results
//!   (always delivered, a lost poll result would wedge the poll slot)
//!
//! The event loop owns the [`App`] and with it the engine. It uses
//! `tokio::select!` biased toward input so a busy data channel never starves
//! the keyboard. Gateway calls run in `spawn_blocking` and report back as
//! [`WorkerEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{Effect, KillReport, WorkerEvent};
use crate::gateway::{GatewayError, SchedulerGateway};
use crate::models::JobId;
use crate::tui::app::App;
use crate::tui::event::{DataEvent, EventResult, InputEvent};

/// Channel capacities
const INPUT_CHANNEL_CAPACITY: usize = 16;
const DATA_CHANNEL_CAPACITY: usize = 32;

/// How long shutdown waits for background tasks
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// TUI runtime managing all background tasks
pub struct TuiRuntime {
    cancel_token: CancellationToken,
    task_handles: Vec<JoinHandle<()>>,
}

impl Default for TuiRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiRuntime {
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            task_handles: Vec::new(),
        }
    }

    /// Clone of the cancellation token for spawning tasks
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.task_handles.push(handle);
    }

    /// Signal shutdown and wait for tasks to complete
    pub async fn shutdown(self) {
        self.cancel_token.cancel();

        let shutdown = async {
            for handle in self.task_handles {
                let _ = handle.await;
            }
        };

        tokio::select! {
            _ = shutdown => {}
            _ = tokio::time::sleep(SHUTDOWN_GRACE) => {
                warn!("background tasks did not stop in time");
            }
        }
    }
}

/// Spawn the terminal input reader task
pub fn spawn_input_task(tx: mpsc::Sender<InputEvent>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = EventStream::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                maybe_event = reader.next() => {
                    match maybe_event {
                        Some(Ok(event)) => {
                            let input_event = match event {
                                Event::Key(key) => Some(InputEvent::Key(key)),
                                Event::Resize(w, h) => Some(InputEvent::Resize(w, h)),
                                _ => None,
                            };

                            if let Some(evt) = input_event
                                && tx.send(evt).await.is_err()
                            {
                                break; // Receiver dropped
                            }
                        }
                        Some(Err(e)) => {
                            let is_fatal = matches!(
                                e.kind(),
                                std::io::ErrorKind::BrokenPipe
                                    | std::io::ErrorKind::ConnectionReset
                                    | std::io::ErrorKind::UnexpectedEof
                            );

                            if is_fatal {
                                info!("Terminal disconnected: {:?}", e);
                                break;
                            }
                            warn!("Terminal event read error: {:?}", e);
                        }
                        None => break,
                    }
                }
            }
        }
    })
}

/// Spawn the poll timer. Ticks are dropped rather than queued when the
/// event loop is behind; the engine skips them while a poll is running anyway.
pub fn spawn_poll_ticker(
    tx: mpsc::Sender<DataEvent>,
    cancel: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the first poll is already out
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if tx.try_send(DataEvent::Tick).is_err() {
                        debug!("Dropped poll tick (channel full)");
                    }
                }
            }
        }
    })
}

/// Runs engine effects against the gateway on the blocking pool
#[derive(Clone)]
pub struct EffectExecutor {
    gateway: Arc<dyn SchedulerGateway>,
    user: Arc<str>,
    tx: mpsc::Sender<DataEvent>,
}

impl EffectExecutor {
    pub fn new(
        gateway: Arc<dyn SchedulerGateway>,
        user: &str,
        tx: mpsc::Sender<DataEvent>,
    ) -> Self {
        Self {
            gateway,
            user: Arc::from(user),
            tx,
        }
    }

    /// Start a worker for `effect`. The result arrives on the data channel.
    pub fn execute(&self, effect: Effect) {
        let gateway = Arc::clone(&self.gateway);
        match effect {
            Effect::Poll { seq } => {
                let user = Arc::clone(&self.user);
                self.spawn_worker(
                    move || WorkerEvent::PollFinished {
                        seq,
                        result: gateway.list_jobs(&user),
                    },
                    move |err| WorkerEvent::PollFinished {
                        seq,
                        result: Err(err),
                    },
                );
            }
            Effect::Cancel { action, targets } => {
                let fallback_targets = targets.clone();
                self.spawn_worker(
                    move || WorkerEvent::KillFinished {
                        action,
                        report: cancel_all(gateway.as_ref(), &targets),
                    },
                    move |err| WorkerEvent::KillFinished {
                        action,
                        report: KillReport {
                            succeeded: Vec::new(),
                            failed: fallback_targets
                                .into_iter()
                                .map(|id| (id, err.clone()))
                                .collect(),
                        },
                    },
                );
            }
            Effect::FetchDetails { action, id } => {
                let fallback_id = id.clone();
                self.spawn_worker(
                    move || {
                        let result = gateway.job_details(&id);
                        WorkerEvent::DetailsFetched { action, id, result }
                    },
                    move |err| WorkerEvent::DetailsFetched {
                        action,
                        id: fallback_id,
                        result: Err(err),
                    },
                );
            }
            Effect::FetchLog { action, id, stream } => {
                let fallback_id = id.clone();
                self.spawn_worker(
                    move || {
                        let result = gateway.fetch_log(&id, stream);
                        WorkerEvent::LogFetched {
                            action,
                            id,
                            stream,
                            result,
                        }
                    },
                    move |err| WorkerEvent::LogFetched {
                        action,
                        id: fallback_id,
                        stream,
                        result: Err(err),
                    },
                );
            }
            Effect::Quit => debug!("quit effect reached the executor"),
        }
    }

    /// Run `work` on the blocking pool. If it panics, `on_panic` still
    /// answers the engine so no action or poll is left hanging.
    fn spawn_worker<F, P>(&self, work: F, on_panic: P)
    where
        F: FnOnce() -> WorkerEvent + Send + 'static,
        P: FnOnce(GatewayError) -> WorkerEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match tokio::task::spawn_blocking(work).await {
                Ok(event) => event,
                Err(e) => {
                    warn!("Gateway worker failed: {}", e);
                    on_panic(GatewayError::Unavailable(format!("gateway worker failed: {}", e)))
                }
            };
            if tx.send(DataEvent::Worker(event)).await.is_err() {
                debug!("Event loop gone, dropping worker result");
            }
        });
    }
}

/// Cancel each target in turn; one failure never stops the rest
fn cancel_all(gateway: &dyn SchedulerGateway, targets: &[JobId]) -> KillReport {
    let mut report = KillReport::default();
    for id in targets {
        match gateway.cancel_job(id) {
            Ok(()) => report.succeeded.push(id.clone()),
            Err(err) => {
                warn!(job_id = %id, error = %err, "cancel failed");
                report.failed.push((id.clone(), err));
            }
        }
    }
    report
}

/// Run the main TUI event loop
pub async fn run_event_loop(
    mut app: App,
    mut input_rx: mpsc::Receiver<InputEvent>,
    mut data_rx: mpsc::Receiver<DataEvent>,
    executor: EffectExecutor,
    mut render_fn: impl FnMut(&App) -> Result<()>,
) -> Result<()> {
    let mut needs_render = true;

    app.start();

    loop {
        for effect in app.take_effects() {
            executor.execute(effect);
        }

        if needs_render {
            render_fn(&app)?;
            needs_render = false;
        }

        if !app.running {
            break;
        }

        let result = tokio::select! {
            // Bias toward input channel to prevent input starvation
            biased;

            Some(input) = input_rx.recv() => app.handle_input(input),
            Some(data) = data_rx.recv() => app.handle_data(data),
            else => break,
        };

        match result {
            EventResult::Continue => needs_render = true,
            EventResult::Unchanged => {}
            EventResult::Quit => break,
        }
    }

    Ok(())
}

/// Create the dual channels for the TUI
pub fn create_channels() -> (
    mpsc::Sender<InputEvent>,
    mpsc::Receiver<InputEvent>,
    mpsc::Sender<DataEvent>,
    mpsc::Receiver<DataEvent>,
) {
    let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    let (data_tx, data_rx) = mpsc::channel(DATA_CHANNEL_CAPACITY);
    (input_tx, input_rx, data_tx, data_rx)
}
