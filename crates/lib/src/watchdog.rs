//! Inactivity watchdog: warning deadline, hard deadline, countdown, close grace.
//!
//! The watchdog holds deadlines, not timers. The owner asks for `next_deadline()`, sleeps until
//! it, then calls `poll()` with the current time and the chat's open flag. Everything due is
//! processed in time order and returned as events.
//!
//! States:
//! - Idle -> Armed (arm)
//! - Armed -> Warning (warning deadline)
//! - Warning -> Closing (hard deadline)
//! - Closing -> Idle (grace delay elapsed)
//! - Armed | Warning -> Armed (activity, keep-active)
//! - any -> Idle (disarm)

use crate::config::InactivityConfig;
use std::fmt;
use tokio::time::Instant;

/// Watchdog lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchdogState {
    /// Nothing pending.
    Idle,
    /// Warning and hard deadlines pending.
    Armed,
    /// Warning shown; hard deadline and countdown ticker pending.
    Warning,
    /// Closure announced; waiting out the grace delay.
    Closing,
}

impl fmt::Display for WatchdogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchdogState::Idle => write!(f, "Idle"),
            WatchdogState::Armed => write!(f, "Armed"),
            WatchdogState::Warning => write!(f, "Warning"),
            WatchdogState::Closing => write!(f, "Closing"),
        }
    }
}

/// Something the owner must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Warning deadline reached; show the countdown.
    WarningStarted { seconds_left: u64 },
    /// One countdown tick elapsed.
    CountdownTick { seconds_left: u64 },
    /// Hard deadline reached; announce the closure.
    TimedOut,
    /// Grace delay over; close the chat and start a new session.
    CloseDue,
}

/// The single outstanding deadline pair. The warning half is consumed when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Deadlines {
    warning_at: Option<Instant>,
    timeout_at: Instant,
}

#[derive(Debug, Clone)]
pub struct InactivityWatchdog {
    timing: InactivityConfig,
    state: WatchdogState,
    deadlines: Option<Deadlines>,
    next_tick: Option<Instant>,
    close_at: Option<Instant>,
    countdown: u64,
    warning: bool,
}

impl InactivityWatchdog {
    pub fn new(timing: InactivityConfig) -> Self {
        Self {
            timing,
            state: WatchdogState::Idle,
            deadlines: None,
            next_tick: None,
            close_at: None,
            countdown: 0,
            warning: false,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn timing(&self) -> &InactivityConfig {
        &self.timing
    }

    /// True while the inactivity warning should be displayed (Warning and Closing).
    pub fn is_warning(&self) -> bool {
        self.warning
    }

    /// Seconds left on the displayed countdown.
    pub fn countdown(&self) -> u64 {
        self.countdown
    }

    /// True if a warning/hard deadline pair is outstanding.
    pub fn has_pending_deadlines(&self) -> bool {
        self.deadlines.is_some()
    }

    pub fn is_ticking(&self) -> bool {
        self.next_tick.is_some()
    }

    /// True if nothing at all is scheduled.
    pub fn is_cleared(&self) -> bool {
        self.deadlines.is_none() && self.next_tick.is_none() && self.close_at.is_none()
    }

    /// Start (or restart) both deadlines from `now`. Any prior pair, ticker and grace delay are dropped.
    pub fn arm(&mut self, now: Instant) {
        self.clear();
        self.deadlines = Some(Deadlines {
            warning_at: Some(now + self.timing.warning()),
            timeout_at: now + self.timing.timeout(),
        });
        self.transition(WatchdogState::Armed);
    }

    /// User activity: re-arm from zero when Armed or Warning. Returns false (no-op) otherwise.
    pub fn reset_on_activity(&mut self, now: Instant) -> bool {
        match self.state {
            WatchdogState::Armed | WatchdogState::Warning => {
                self.arm(now);
                true
            }
            WatchdogState::Idle | WatchdogState::Closing => false,
        }
    }

    /// Explicit "keep chatting" from the warning prompt. Same effect as activity.
    pub fn keep_active(&mut self, now: Instant) -> bool {
        let kept = self.reset_on_activity(now);
        if kept {
            log::info!("watchdog: kept active by user");
        }
        kept
    }

    /// Cancel everything and return to Idle.
    pub fn disarm(&mut self) {
        self.clear();
        self.transition(WatchdogState::Idle);
    }

    fn clear(&mut self) {
        self.deadlines = None;
        self.next_tick = None;
        self.close_at = None;
        self.countdown = 0;
        self.warning = false;
    }

    fn transition(&mut self, next: WatchdogState) {
        if self.state != next {
            log::debug!("watchdog: {} -> {}", self.state, next);
        }
        self.state = next;
    }

    /// Earliest scheduled instant, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        let pair = self
            .deadlines
            .map(|d| d.warning_at.map_or(d.timeout_at, |w| w.min(d.timeout_at)));
        [pair, self.next_tick, self.close_at]
            .into_iter()
            .flatten()
            .min()
    }

    /// Fire everything due at or before `now`, oldest first.
    ///
    /// A deadline that comes due while the chat is closed is a no-op: the watchdog disarms
    /// and reports nothing.
    pub fn poll(&mut self, now: Instant, chat_open: bool) -> Vec<WatchdogEvent> {
        let mut events = Vec::new();
        while let Some(due) = self.next_deadline() {
            if due > now {
                break;
            }
            if !chat_open {
                log::debug!("watchdog: deadline reached with chat closed, disarming");
                self.disarm();
                break;
            }
            // Ticks go first on ties so the countdown reaches zero before the hard deadline.
            if self.next_tick == Some(due) {
                events.push(self.fire_tick(due));
            } else if self.deadlines.and_then(|d| d.warning_at) == Some(due) {
                events.push(self.fire_warning(due));
            } else if self.deadlines.map(|d| d.timeout_at) == Some(due) {
                events.push(self.fire_timeout(due));
            } else if self.close_at == Some(due) {
                events.push(self.fire_close());
            } else {
                break;
            }
        }
        events
    }

    fn fire_warning(&mut self, at: Instant) -> WatchdogEvent {
        if let Some(d) = self.deadlines.as_mut() {
            d.warning_at = None;
        }
        self.warning = true;
        self.countdown = self.timing.countdown_seconds();
        self.next_tick = if self.countdown > 0 {
            Some(at + self.timing.tick())
        } else {
            None
        };
        self.transition(WatchdogState::Warning);
        WatchdogEvent::WarningStarted {
            seconds_left: self.countdown,
        }
    }

    fn fire_tick(&mut self, at: Instant) -> WatchdogEvent {
        self.countdown = self.countdown.saturating_sub(1);
        self.next_tick = if self.countdown > 0 {
            Some(at + self.timing.tick())
        } else {
            None
        };
        WatchdogEvent::CountdownTick {
            seconds_left: self.countdown,
        }
    }

    fn fire_timeout(&mut self, at: Instant) -> WatchdogEvent {
        self.deadlines = None;
        self.next_tick = None;
        self.close_at = Some(at + self.timing.close_delay());
        self.transition(WatchdogState::Closing);
        WatchdogEvent::TimedOut
    }

    fn fire_close(&mut self) -> WatchdogEvent {
        self.clear();
        self.transition(WatchdogState::Idle);
        WatchdogEvent::CloseDue
    }
}
