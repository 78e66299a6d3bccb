//! Poll scheduling.
//!
//! Two producers feed one request slot: timer ticks and on-demand refreshes
//! (manual, or forced after a kill). At most one `list_jobs` call is ever in
//! flight. A tick that arrives while a poll is running is dropped; an
//! on-demand request sets the single pending flag, which dispatches exactly
//! one follow-up poll once the current one resolves.

use std::time::Duration;

use tracing::debug;

pub type PollSeq = u64;

/// What asked for a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    Timer,
    Manual,
    Forced,
}

/// What to do after a poll resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCompletion {
    /// Apply the result; false for superseded or unknown results
    pub apply: bool,
    /// Follow-up poll to dispatch right away
    pub dispatch: Option<PollSeq>,
}

#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    in_flight: Option<PollSeq>,
    pending: bool,
    next_seq: PollSeq,
    last_applied: PollSeq,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            in_flight: None,
            pending: false,
            next_seq: 1,
            last_applied: 0,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Ask for a poll. Returns the sequence number to dispatch, or `None`
    /// when the request was skipped (timer) or coalesced (manual, forced).
    pub fn request(&mut self, trigger: PollTrigger) -> Option<PollSeq> {
        if let Some(seq) = self.in_flight {
            match trigger {
                PollTrigger::Timer => {
                    debug!(in_flight = seq, "poll still running, skipping tick");
                }
                PollTrigger::Manual | PollTrigger::Forced => {
                    debug!(in_flight = seq, ?trigger, "poll still running, coalescing request");
                    self.pending = true;
                }
            }
            return None;
        }
        Some(self.dispatch(trigger))
    }

    fn dispatch(&mut self, trigger: PollTrigger) -> PollSeq {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some(seq);
        debug!(seq, ?trigger, "dispatching poll");
        seq
    }

    /// A poll resolved (successfully or not).
    pub fn complete(&mut self, seq: PollSeq) -> PollCompletion {
        if self.in_flight == Some(seq) {
            self.in_flight = None;
        }

        // Last writer wins: never apply a result older than one already shown
        let apply = seq > self.last_applied;
        if apply {
            self.last_applied = seq;
        } else {
            debug!(seq, last_applied = self.last_applied, "discarding superseded poll result");
        }

        let dispatch = if self.pending && self.in_flight.is_none() {
            self.pending = false;
            Some(self.dispatch(PollTrigger::Manual))
        } else {
            None
        };

        PollCompletion { apply, dispatch }
    }
}
