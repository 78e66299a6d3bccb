//! Live job-state engine.
//!
//! [`Engine`] is owned by the event loop and is the only place job state is
//! mutated. Entry points return [`Effect`]s (gateway calls to run on a
//! worker); workers report back with immutable [`WorkerEvent`]s through
//! [`Engine::apply`]. Every change is published as a [`Snapshot`] on a
//! `watch` channel for the renderer.

mod actions;
mod poll;
mod reconciler;
mod selection;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

pub use actions::{
    ActionCoordinator, ActionId, ActionKind, ActionOutcome, ActionRejected, KillReport, KillStep,
    PendingAction, Phase,
};
pub use poll::{PollCompletion, PollScheduler, PollSeq, PollTrigger};
pub use reconciler::{Diff, Reconciler, StaleInfo, ViewModel};
pub use selection::SelectionState;

use crate::gateway::{GatewayError, JobDetails, LogStream};
use crate::models::{AppConfig, JobId, JobRecord, RefreshConfig};

/// Engine settings, usually derived from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub interval: Duration,
    pub hide_finished: bool,
    pub confirm_kill: bool,
    pub display_timeout: Duration,
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: Duration::try_from_secs_f64(config.refresh.interval_secs)
                .unwrap_or_else(|_| {
                    Duration::from_secs_f64(RefreshConfig::default().interval_secs)
                }),
            hide_finished: config.display.hide_finished,
            confirm_kill: config.behavior.confirm_kill,
            display_timeout: Duration::from_secs(config.behavior.feedback_timeout_secs),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Side effect requested by the engine, executed off the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Poll { seq: PollSeq },
    Cancel { action: ActionId, targets: Vec<JobId> },
    FetchDetails { action: ActionId, id: JobId },
    FetchLog { action: ActionId, id: JobId, stream: LogStream },
    Quit,
}

/// Result message produced by a gateway worker
#[derive(Debug)]
pub enum WorkerEvent {
    PollFinished {
        seq: PollSeq,
        result: Result<Vec<JobRecord>, GatewayError>,
    },
    KillFinished {
        action: ActionId,
        report: KillReport,
    },
    DetailsFetched {
        action: ActionId,
        id: JobId,
        result: Result<JobDetails, GatewayError>,
    },
    LogFetched {
        action: ActionId,
        id: JobId,
        stream: LogStream,
        result: Result<String, GatewayError>,
    },
}

/// Text fetched by the last inspect or view-log action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutput {
    Details { id: JobId, details: JobDetails },
    Log { id: JobId, stream: LogStream, text: String },
}

/// Everything the renderer needs, published on every change
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub view: Arc<ViewModel>,
    pub selection: SelectionState,
    pub generation: u64,
    pub polling: bool,
    /// Kill targets while the confirmation prompt is up
    pub confirming: Option<Vec<JobId>>,
    pub submitting: Option<ActionKind>,
    /// Most recent finished action not yet acknowledged or expired
    pub latest: Option<PendingAction>,
    pub output: Option<Arc<ActionOutput>>,
}

/// Open log output that is re-read on every tick
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogFollow {
    id: JobId,
    stream: LogStream,
    in_flight: Option<ActionId>,
}

pub struct Engine {
    reconciler: Reconciler,
    selection: SelectionState,
    actions: ActionCoordinator,
    poll: PollScheduler,
    output: Option<Arc<ActionOutput>>,
    follow: Option<LogFollow>,
    publisher: watch::Sender<Snapshot>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let (publisher, _) = watch::channel(Snapshot::default());
        Self {
            reconciler: Reconciler::new(options.hide_finished),
            selection: SelectionState::new(),
            actions: ActionCoordinator::new(options.confirm_kill, options.display_timeout),
            poll: PollScheduler::new(options.interval),
            output: None,
            follow: None,
            publisher,
        }
    }

    /// Feed of snapshots for the renderer
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.publisher.subscribe()
    }

    #[must_use]
    pub fn view(&self) -> &Arc<ViewModel> {
        self.reconciler.view()
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll.interval()
    }

    /// Kick off the first poll
    pub fn start(&mut self) -> Option<Effect> {
        let effect = self
            .poll
            .request(PollTrigger::Timer)
            .map(|seq| Effect::Poll { seq });
        self.publish();
        effect
    }

    /// Flip selection of a visible job. Returns whether it is now selected.
    pub fn on_toggle_select(&mut self, id: &JobId) -> bool {
        if !self.view().contains(id) {
            return false;
        }
        let selected = self.selection.toggle(id);
        self.publish();
        selected
    }

    /// Toggle the row under the cursor
    pub fn on_toggle_cursor(&mut self) -> bool {
        match self.selection.cursor().cloned() {
            Some(id) => self.on_toggle_select(&id),
            None => false,
        }
    }

    pub fn on_move_cursor(&mut self, delta: isize) {
        let view = Arc::clone(self.reconciler.view());
        self.selection.move_cursor(delta, &view);
        self.publish();
    }

    pub fn on_cursor_top(&mut self) {
        let view = Arc::clone(self.reconciler.view());
        self.selection.move_to_top(&view);
        self.publish();
    }

    pub fn on_cursor_bottom(&mut self) {
        let view = Arc::clone(self.reconciler.view());
        self.selection.move_to_bottom(&view);
        self.publish();
    }

    pub fn on_clear_selection(&mut self) {
        self.selection.clear();
        self.publish();
    }

    pub fn on_refresh(&mut self) -> Option<Effect> {
        self.actions.track_refresh(Instant::now());
        let effect = self
            .poll
            .request(PollTrigger::Manual)
            .map(|seq| Effect::Poll { seq });
        self.publish();
        effect
    }

    /// Kill the selection, or the cursor row when nothing is selected
    pub fn on_kill(&mut self) -> Result<Option<Effect>, ActionRejected> {
        let targets = self.selection.action_targets();
        let step = self.actions.request_kill(targets, Instant::now())?;
        let effect = match step {
            KillStep::NeedsConfirmation => None,
            KillStep::Submit { action, targets } => Some(Effect::Cancel { action, targets }),
        };
        self.publish();
        Ok(effect)
    }

    /// Answer the kill confirmation prompt
    pub fn on_confirm(&mut self, accepted: bool) -> Option<Effect> {
        let effect = self
            .actions
            .confirm(accepted, Instant::now())
            .map(|(action, targets)| Effect::Cancel { action, targets });
        self.publish();
        effect
    }

    pub fn on_inspect(&mut self) -> Result<Effect, ActionRejected> {
        let target = self.selection.cursor().cloned();
        let (action, id) = self
            .actions
            .request_fetch(ActionKind::Inspect, target, Instant::now())?;
        self.publish();
        Ok(Effect::FetchDetails { action, id })
    }

    pub fn on_view_log(&mut self, stream: LogStream) -> Result<Effect, ActionRejected> {
        let target = self.selection.cursor().cloned();
        let (action, id) =
            self.actions
                .request_fetch(ActionKind::ViewLog(stream), target, Instant::now())?;
        self.publish();
        Ok(Effect::FetchLog { action, id, stream })
    }

    /// Dismiss finished action results and any open output
    pub fn on_acknowledge(&mut self) {
        self.actions.acknowledge();
        self.output = None;
        self.follow = None;
        self.publish();
    }

    /// Timer tick: retire old results, poll if nothing is in flight and
    /// re-read an open log unless the previous read is still running
    pub fn on_tick(&mut self, now: Instant) -> Vec<Effect> {
        let expired = self.actions.expire(now);
        let mut effects: Vec<Effect> = self
            .poll
            .request(PollTrigger::Timer)
            .map(|seq| Effect::Poll { seq })
            .into_iter()
            .collect();

        if let Some(follow) = self.follow.as_mut()
            && follow.in_flight.is_none()
        {
            let action = self.actions.allocate_id();
            follow.in_flight = Some(action);
            effects.push(Effect::FetchLog {
                action,
                id: follow.id.clone(),
                stream: follow.stream,
            });
        }

        if expired || !effects.is_empty() {
            self.publish();
        }
        effects
    }

    pub fn on_quit(&mut self) -> Effect {
        debug!("quit requested");
        Effect::Quit
    }

    /// Apply a worker result. May return a follow-up effect (a coalesced or
    /// forced poll).
    pub fn apply(&mut self, event: WorkerEvent) -> Option<Effect> {
        let now = Instant::now();
        let effect = match event {
            WorkerEvent::PollFinished { seq, result } => self.apply_poll(seq, result, now),
            WorkerEvent::KillFinished { action, report } => {
                if !self.actions.complete_kill(action, &report, now) {
                    return None;
                }
                let targets = report
                    .succeeded
                    .iter()
                    .chain(report.failed.iter().map(|(id, _)| id));
                self.selection.deselect(targets);
                self.poll
                    .request(PollTrigger::Forced)
                    .map(|seq| Effect::Poll { seq })
            }
            WorkerEvent::DetailsFetched { action, id, result } => {
                let error = result.as_ref().err().cloned();
                if self.actions.complete_fetch(action, error.as_ref(), now)
                    && let Ok(details) = result
                {
                    self.output = Some(Arc::new(ActionOutput::Details { id, details }));
                    self.follow = None;
                }
                None
            }
            WorkerEvent::LogFetched {
                action,
                id,
                stream,
                result,
            } => {
                self.apply_log(action, id, stream, result, now);
                None
            }
        };
        self.publish();
        effect
    }

    fn apply_log(
        &mut self,
        action: ActionId,
        id: JobId,
        stream: LogStream,
        result: Result<String, GatewayError>,
        now: Instant,
    ) {
        if let Some(follow) = self.follow.as_mut()
            && follow.in_flight == Some(action)
        {
            follow.in_flight = None;
            match result {
                Ok(text) => {
                    self.output = Some(Arc::new(ActionOutput::Log { id, stream, text }));
                }
                Err(err) => warn!(job_id = %id, error = %err, "log re-read failed"),
            }
            return;
        }

        let error = result.as_ref().err().cloned();
        if self.actions.complete_fetch(action, error.as_ref(), now)
            && let Ok(text) = result
        {
            self.follow = Some(LogFollow {
                id: id.clone(),
                stream,
                in_flight: None,
            });
            self.output = Some(Arc::new(ActionOutput::Log { id, stream, text }));
        }
    }

    fn apply_poll(
        &mut self,
        seq: PollSeq,
        result: Result<Vec<JobRecord>, GatewayError>,
        now: Instant,
    ) -> Option<Effect> {
        let completion = self.poll.complete(seq);

        if completion.apply {
            match result {
                Ok(records) => {
                    let diff = self.reconciler.apply_success(records, Utc::now());
                    let view = Arc::clone(self.reconciler.view());
                    self.selection.reconcile(&diff, &view);
                }
                Err(err) => self.reconciler.apply_failure(err, Utc::now()),
            }
        }

        // A coalesced follow-up answers any manual refresh instead
        if completion.dispatch.is_none() {
            let error = self.reconciler.view().stale.as_ref().map(|s| s.error.clone());
            self.actions.finish_refresh(error.as_ref(), now);
        }

        completion.dispatch.map(|seq| Effect::Poll { seq })
    }

    fn publish(&self) {
        let view = Arc::clone(self.reconciler.view());
        self.publisher.send_replace(Snapshot {
            generation: view.generation,
            view,
            selection: self.selection.clone(),
            polling: self.poll.is_polling(),
            confirming: self.actions.confirming().map(<[JobId]>::to_vec),
            submitting: self.actions.submitting(),
            latest: self.actions.latest_finished().cloned(),
            output: self.output.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;

    fn job(id: &str, state: JobState, submit: i64) -> JobRecord {
        JobRecord::new(id, state).submitted_at(submit)
    }

    fn id(s: &str) -> JobId {
        JobId::from(s)
    }

    fn poll_seq(effect: Option<Effect>) -> PollSeq {
        match effect {
            Some(Effect::Poll { seq }) => seq,
            other => panic!("expected a poll effect, got {:?}", other),
        }
    }

    /// The poll a tick dispatched
    fn tick_poll(effects: Vec<Effect>) -> PollSeq {
        poll_seq(effects.into_iter().find(|e| matches!(e, Effect::Poll { .. })))
    }

    /// Engine that has completed one poll with the given jobs
    fn engine_with(jobs: Vec<JobRecord>, options: EngineOptions) -> Engine {
        let mut engine = Engine::new(options);
        let seq = poll_seq(engine.start());
        assert!(engine
            .apply(WorkerEvent::PollFinished {
                seq,
                result: Ok(jobs),
            })
            .is_none());
        engine
    }

    #[test]
    fn test_first_poll_places_cursor_on_first_row() {
        let engine = engine_with(
            vec![job("A", JobState::Running, 1), job("B", JobState::Pending, 2)],
            EngineOptions::default(),
        );
        assert_eq!(engine.selection().cursor(), Some(&id("A")));
        assert_eq!(engine.view().generation, 1);
    }

    #[test]
    fn test_selected_job_ages_out() {
        let mut engine = engine_with(
            vec![job("A", JobState::Running, 1), job("B", JobState::Pending, 2)],
            EngineOptions::default(),
        );
        engine.on_move_cursor(1);
        assert!(engine.on_toggle_select(&id("B")));

        let seq = tick_poll(engine.on_tick(Instant::now()));
        engine.apply(WorkerEvent::PollFinished {
            seq,
            result: Ok(vec![job("A", JobState::Running, 1)]),
        });

        assert!(engine.selection().selected_ids().is_empty());
        assert_eq!(engine.selection().cursor(), Some(&id("A")));
    }

    #[test]
    fn test_kill_partial_failure_schedules_one_refresh() {
        let mut engine = engine_with(
            vec![job("A", JobState::Running, 1), job("B", JobState::Running, 2)],
            EngineOptions::default(),
        );
        engine.on_toggle_select(&id("A"));
        engine.on_toggle_select(&id("B"));

        assert_eq!(engine.on_kill(), Ok(None), "confirmation comes first");
        let (action, targets) = match engine.on_confirm(true) {
            Some(Effect::Cancel { action, targets }) => (action, targets),
            other => panic!("expected cancel effect, got {:?}", other),
        };
        assert_eq!(targets, vec![id("A"), id("B")]);

        let report = KillReport {
            succeeded: vec![id("A")],
            failed: vec![(id("B"), GatewayError::NotFound("Invalid job id".into()))],
        };
        let follow_up = engine.apply(WorkerEvent::KillFinished { action, report });
        poll_seq(follow_up);

        let rx = engine.subscribe();
        let snapshot = rx.borrow();
        let latest = snapshot.latest.as_ref().unwrap();
        assert_eq!(latest.kind, ActionKind::Kill);
        assert!(matches!(latest.outcome, ActionOutcome::Failed(ref r) if r.contains("B")));
        assert!(snapshot.selection.selected_ids().is_empty());
        assert!(snapshot.polling);
    }

    #[test]
    fn test_kill_forced_refresh_coalesces_with_running_poll() {
        let options = EngineOptions {
            confirm_kill: false,
            ..EngineOptions::default()
        };
        let mut engine = engine_with(vec![job("A", JobState::Running, 1)], options);

        let Ok(Some(Effect::Cancel { action, .. })) = engine.on_kill() else {
            panic!("expected immediate cancel");
        };
        let running = tick_poll(engine.on_tick(Instant::now()));

        let report = KillReport {
            succeeded: vec![id("A")],
            failed: Vec::new(),
        };
        assert_eq!(engine.apply(WorkerEvent::KillFinished { action, report }), None);

        // The forced refresh runs once the timer poll resolves
        let follow_up = engine.apply(WorkerEvent::PollFinished {
            seq: running,
            result: Ok(vec![job("A", JobState::Cancelling, 1)]),
        });
        let forced = poll_seq(follow_up);
        assert_eq!(
            engine.apply(WorkerEvent::PollFinished {
                seq: forced,
                result: Ok(vec![]),
            }),
            None
        );
    }

    #[test]
    fn test_manual_refresh_bursts_coalesce() {
        let mut engine = Engine::new(EngineOptions::default());
        let first = poll_seq(engine.start());

        for _ in 0..4 {
            assert_eq!(engine.on_refresh(), None);
        }
        let second = poll_seq(engine.apply(WorkerEvent::PollFinished {
            seq: first,
            result: Ok(vec![]),
        }));
        assert_eq!(
            engine.apply(WorkerEvent::PollFinished {
                seq: second,
                result: Ok(vec![]),
            }),
            None
        );

        let latest = engine.subscribe().borrow().latest.clone().unwrap();
        assert_eq!(latest.kind, ActionKind::Refresh);
        assert_eq!(latest.outcome, ActionOutcome::Succeeded);
    }

    #[test]
    fn test_failed_poll_keeps_jobs_and_marks_stale() {
        let mut engine = engine_with(
            vec![job("A", JobState::Running, 1), job("B", JobState::Running, 2)],
            EngineOptions::default(),
        );
        let rx = engine.subscribe();

        let seq = tick_poll(engine.on_tick(Instant::now()));
        engine.apply(WorkerEvent::PollFinished {
            seq,
            result: Err(GatewayError::Unavailable("timed out".into())),
        });

        let snapshot = rx.borrow();
        assert_eq!(snapshot.view.len(), 2);
        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.view.stale.is_some());
        assert_eq!(snapshot.selection.cursor(), Some(&id("A")));
    }

    #[test]
    fn test_inspect_output_and_acknowledge() {
        let mut engine =
            engine_with(vec![job("A", JobState::Running, 1)], EngineOptions::default());

        let Ok(Effect::FetchDetails { action, id: target }) = engine.on_inspect() else {
            panic!("expected details fetch");
        };
        assert_eq!(target, id("A"));
        assert_eq!(engine.on_view_log(LogStream::Stdout), Err(ActionRejected::Busy));

        let details = crate::gateway::parse_scontrol_output("JobId=A JobState=RUNNING");
        engine.apply(WorkerEvent::DetailsFetched {
            action,
            id: target,
            result: Ok(details),
        });

        let rx = engine.subscribe();
        assert!(matches!(
            rx.borrow().output.as_deref(),
            Some(ActionOutput::Details { .. })
        ));

        engine.on_acknowledge();
        assert!(rx.borrow().output.is_none());
        assert!(rx.borrow().latest.is_none());
    }

    #[test]
    fn test_log_fetch_failure_reports_without_output() {
        let mut engine =
            engine_with(vec![job("A", JobState::Pending, 1)], EngineOptions::default());
        let Ok(Effect::FetchLog {
            action,
            id: target,
            stream,
        }) = engine.on_view_log(LogStream::Stdout)
        else {
            panic!("expected log fetch");
        };
        engine.apply(WorkerEvent::LogFetched {
            action,
            id: target,
            stream,
            result: Err(GatewayError::NotFound("log file not found yet".into())),
        });

        let snapshot = engine.subscribe().borrow().clone();
        assert!(snapshot.output.is_none());
        let latest = snapshot.latest.unwrap();
        assert!(matches!(latest.outcome, ActionOutcome::Failed(_)));
        assert!(snapshot.submitting.is_none());
    }

    fn open_log(engine: &mut Engine, text: &str) {
        let Ok(Effect::FetchLog {
            action,
            id: target,
            stream,
        }) = engine.on_view_log(LogStream::Stdout)
        else {
            panic!("expected log fetch");
        };
        engine.apply(WorkerEvent::LogFetched {
            action,
            id: target,
            stream,
            result: Ok(text.to_string()),
        });
    }

    fn log_text(engine: &Engine) -> Option<String> {
        match engine.subscribe().borrow().output.as_deref() {
            Some(ActionOutput::Log { text, .. }) => Some(text.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_open_log_is_reread_on_tick() {
        let mut engine =
            engine_with(vec![job("A", JobState::Running, 1)], EngineOptions::default());
        open_log(&mut engine, "line 1\n");
        let latest_before = engine.subscribe().borrow().latest.clone();

        let effects = engine.on_tick(Instant::now());
        let reread = effects
            .iter()
            .find_map(|e| match e {
                Effect::FetchLog { action, id, stream } => Some((*action, id.clone(), *stream)),
                _ => None,
            })
            .expect("tick should re-read the open log");
        assert_eq!(reread.1, id("A"));
        assert_eq!(reread.2, LogStream::Stdout);

        // One re-read at a time
        let again = engine.on_tick(Instant::now());
        assert!(!again.iter().any(|e| matches!(e, Effect::FetchLog { .. })));

        engine.apply(WorkerEvent::LogFetched {
            action: reread.0,
            id: reread.1,
            stream: reread.2,
            result: Ok("line 1\nline 2\n".to_string()),
        });
        assert_eq!(log_text(&engine).as_deref(), Some("line 1\nline 2\n"));
        // Re-reads stay off the status bar and never block actions
        assert_eq!(engine.subscribe().borrow().latest, latest_before);
        assert!(engine.subscribe().borrow().submitting.is_none());

        let next = engine.on_tick(Instant::now());
        assert!(next.iter().any(|e| matches!(e, Effect::FetchLog { .. })));
    }

    #[test]
    fn test_failed_reread_keeps_last_text() {
        let mut engine =
            engine_with(vec![job("A", JobState::Running, 1)], EngineOptions::default());
        open_log(&mut engine, "kept\n");

        let Some(Effect::FetchLog { action, id, stream }) = engine
            .on_tick(Instant::now())
            .into_iter()
            .find(|e| matches!(e, Effect::FetchLog { .. }))
        else {
            panic!("expected log re-read");
        };
        engine.apply(WorkerEvent::LogFetched {
            action,
            id,
            stream,
            result: Err(GatewayError::Unavailable("timed out".into())),
        });
        assert_eq!(log_text(&engine).as_deref(), Some("kept\n"));
    }

    #[test]
    fn test_closing_log_stops_rereads() {
        let mut engine =
            engine_with(vec![job("A", JobState::Running, 1)], EngineOptions::default());
        open_log(&mut engine, "text");
        engine.on_acknowledge();

        let effects = engine.on_tick(Instant::now());
        assert!(!effects.iter().any(|e| matches!(e, Effect::FetchLog { .. })));
    }

    #[test]
    fn test_no_reread_without_open_log() {
        let mut engine =
            engine_with(vec![job("A", JobState::Running, 1)], EngineOptions::default());
        let effects = engine.on_tick(Instant::now());
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Poll { .. }));
    }

    #[test]
    fn test_oversized_interval_does_not_panic() {
        let mut config = AppConfig::default();
        config.refresh.interval_secs = 1e300;
        let options = EngineOptions::from_config(&config);
        assert_eq!(options.interval, Duration::from_secs(1));

        config.refresh.interval_secs = f64::INFINITY;
        assert_eq!(EngineOptions::from_config(&config).interval, Duration::from_secs(1));
    }

    #[test]
    fn test_actions_on_empty_view_have_no_target() {
        let mut engine = Engine::new(EngineOptions::default());
        assert_eq!(engine.on_kill(), Err(ActionRejected::NoTarget));
        assert_eq!(engine.on_inspect(), Err(ActionRejected::NoTarget));
        assert!(!engine.on_toggle_cursor());
    }

    #[test]
    fn test_results_expire_after_display_timeout() {
        let options = EngineOptions {
            display_timeout: Duration::from_secs(5),
            ..EngineOptions::default()
        };
        let mut engine = engine_with(vec![job("A", JobState::Running, 1)], options);
        let Ok(Effect::FetchDetails { action, id: target }) = engine.on_inspect() else {
            panic!("expected details fetch");
        };
        engine.apply(WorkerEvent::DetailsFetched {
            action,
            id: target,
            result: Err(GatewayError::NotFound("gone".into())),
        });
        assert!(engine.subscribe().borrow().latest.is_some());

        engine.on_tick(Instant::now() + Duration::from_secs(6));
        assert!(engine.subscribe().borrow().latest.is_none());
    }

    #[test]
    fn test_quit() {
        let mut engine = Engine::new(EngineOptions::default());
        assert_eq!(engine.on_quit(), Effect::Quit);
    }
}
