//! Typing session state machine.
//!
//! A session moves `Idle → Running → Finished` and back to `Idle` on reset.
//! All mutation happens synchronously in response to one event at a time:
//! an input change, a timer tick, a finish or a reset request.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::highlight::{self, TokenKind};
use crate::settings::{Mode, Settings, TimeDuration};
use crate::stats::{self, Stats};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Source of the current instant
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Finished,
}

/// The parts of [`Settings`] the state machine itself cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub mode: Mode,
    pub time_duration: TimeDuration,
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            mode: settings.mode,
            time_duration: settings.time_duration,
        }
    }
}

impl SessionConfig {
    fn initial_time_remaining(&self) -> Option<u32> {
        match self.mode {
            Mode::Time => Some(self.time_duration.secs()),
            Mode::Count | Mode::Zen => None,
        }
    }
}

/// What happened to a proposed input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Applied,
    /// applied, and it completed the session
    Completed,
    /// longer than the target, dropped without touching state
    Rejected,
    /// the session is already finished
    Ignored,
}

/// Live state of a session; replaced wholesale on reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub input: String,
    /// `input` length in chars
    pub typed: usize,
    pub mistakes: usize,
    pub missed_chars: HashMap<char, usize>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    /// whole seconds left, time mode only
    pub time_remaining: Option<u32>,
    pub phase: Phase,
}

impl SessionState {
    fn initial(config: &SessionConfig) -> Self {
        Self {
            time_remaining: config.initial_time_remaining(),
            ..Self::default()
        }
    }
}

/// Per-position view for rendering: expected vs typed plus a colour hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCell {
    pub expected: char,
    pub typed: Option<char>,
    pub kind: TokenKind,
}

impl CharCell {
    /// `None` while the position has not been typed yet
    pub fn is_correct(&self) -> Option<bool> {
        self.typed.map(|typed| typed == self.expected)
    }
}

/// One-second countdown owned by the session.
///
/// Dropping it is the cancellation: a session without a countdown ignores ticks.
#[derive(Debug, Clone, Copy)]
struct Countdown {
    next_tick: Instant,
    remaining: u32,
}

impl Countdown {
    fn start(now: Instant, secs: u32) -> Self {
        Self {
            next_tick: now + ONE_SECOND,
            remaining: secs,
        }
    }

    /// Fire every whole-second tick that is due. True once it hits zero.
    fn advance(&mut self, now: Instant) -> bool {
        while self.remaining > 0 && now >= self.next_tick {
            self.remaining -= 1;
            self.next_tick += ONE_SECOND;
        }
        self.remaining == 0
    }
}

type CompletionListener = Box<dyn FnMut(&Stats)>;

/// A single typing run against a fixed target text
pub struct TypingSession<C: Clock = SystemClock> {
    config: SessionConfig,
    target: String,
    expected: Vec<char>,
    state: SessionState,
    countdown: Option<Countdown>,
    stats: Option<Stats>,
    on_complete: Option<CompletionListener>,
    clock: C,
}

impl TypingSession<SystemClock> {
    pub fn new(target: impl Into<String>, config: SessionConfig) -> Result<Self> {
        Self::with_clock(target, config, SystemClock)
    }
}

impl<C: Clock> TypingSession<C> {
    /// Fails with [`Error::EmptyTarget`] for an empty target: an empty session
    /// would count as complete before the first keystroke.
    pub fn with_clock(target: impl Into<String>, config: SessionConfig, clock: C) -> Result<Self> {
        let target = target.into();
        if target.is_empty() {
            return Err(Error::EmptyTarget);
        }

        Ok(Self {
            expected: target.chars().collect(),
            target,
            state: SessionState::initial(&config),
            config,
            countdown: None,
            stats: None,
            on_complete: None,
            clock,
        })
    }

    /// Register the listener called once per finished session
    pub fn set_on_complete(&mut self, listener: impl FnMut(&Stats) + 'static) {
        self.on_complete = Some(Box::new(listener));
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn target_len(&self) -> usize {
        self.expected.len()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn input(&self) -> &str {
        &self.state.input
    }

    pub fn typed_len(&self) -> usize {
        self.state.typed
    }

    pub fn mistakes(&self) -> usize {
        self.state.mistakes
    }

    pub fn missed_chars(&self) -> &HashMap<char, usize> {
        &self.state.missed_chars
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.state.time_remaining
    }

    pub fn has_started(&self) -> bool {
        self.state.started_at.is_some()
    }

    pub fn has_finished(&self) -> bool {
        self.state.phase == Phase::Finished
    }

    /// True while the countdown can still fire
    pub fn timer_active(&self) -> bool {
        self.countdown.is_some()
    }

    /// Final stats, once finished
    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn expected_char(&self, idx: usize) -> Option<char> {
        self.expected.get(idx).copied()
    }

    /// Time since the first keystroke, frozen once finished
    pub fn elapsed(&self) -> Duration {
        match self.state.started_at {
            Some(started) => {
                let end = self.state.finished_at.unwrap_or_else(|| self.clock.now());
                end.saturating_duration_since(started)
            }
            None => Duration::ZERO,
        }
    }

    pub fn current_wpm(&self) -> u32 {
        stats::words_per_minute(self.state.typed, self.elapsed().as_secs_f64() / 60.0)
    }

    pub fn current_accuracy(&self) -> u32 {
        stats::accuracy(self.state.typed, self.state.mistakes)
    }

    /// Expected/typed/kind for every target position
    pub fn cells(&self) -> Vec<CharCell> {
        let mut typed = self.state.input.chars();
        highlight::char_kinds(&self.target)
            .into_iter()
            .map(|(expected, kind)| CharCell {
                expected,
                typed: typed.next(),
                kind,
            })
            .collect()
    }

    /// Apply the whole proposed input, as delivered by an input-change event.
    ///
    /// Only growth is scored: when the input gets longer, its last character
    /// is compared with the target at the same position. Shrinking (backspace)
    /// never touches the mistake tally.
    pub fn handle_input(&mut self, proposed: &str) -> InputOutcome {
        if self.state.phase == Phase::Finished {
            return InputOutcome::Ignored;
        }

        let proposed_len = proposed.chars().count();
        if proposed_len > self.expected.len() {
            trace!(proposed_len, target_len = self.expected.len(), "dropping over-long input");
            return InputOutcome::Rejected;
        }

        let now = self.clock.now();
        if self.state.phase == Phase::Idle && proposed_len > 0 {
            self.start(now);
        }

        if proposed_len > self.state.typed {
            let idx = proposed_len - 1;
            let expected = self.expected[idx];
            if let Some(typed) = proposed.chars().next_back() {
                if typed != expected {
                    self.state.mistakes += 1;
                    *self.state.missed_chars.entry(expected).or_insert(0) += 1;
                    trace!(idx, ?expected, ?typed, "mistake");
                }
            }
        }

        self.state.input.clear();
        self.state.input.push_str(proposed);
        self.state.typed = proposed_len;

        if self.state.typed == self.expected.len() && self.config.mode != Mode::Time {
            self.complete(now);
            return InputOutcome::Completed;
        }

        InputOutcome::Applied
    }

    /// A single forward keystroke
    pub fn type_char(&mut self, c: char) -> InputOutcome {
        let mut proposed = String::with_capacity(self.state.input.len() + c.len_utf8());
        proposed.push_str(&self.state.input);
        proposed.push(c);
        self.handle_input(&proposed)
    }

    pub fn backspace(&mut self) -> InputOutcome {
        let mut proposed = self.state.input.clone();
        proposed.pop();
        self.handle_input(&proposed)
    }

    /// Timer tick from the host loop. Returns true if it ended the session.
    pub fn on_tick(&mut self) -> bool {
        let Some(countdown) = self.countdown.as_mut() else {
            return false;
        };

        let now = self.clock.now();
        let expired = countdown.advance(now);
        self.state.time_remaining = Some(countdown.remaining);

        if expired {
            self.complete(now);
        }
        expired
    }

    /// Explicit stop, the only way a zen session ends early.
    ///
    /// Returns the stats if the session is (now) finished. An idle session
    /// has nothing to score and stays idle.
    pub fn finish(&mut self) -> Option<&Stats> {
        if self.state.phase == Phase::Running {
            let now = self.clock.now();
            self.complete(now);
        }
        self.stats.as_ref()
    }

    /// Discard all progress and return to idle with the same target
    pub fn reset(&mut self) {
        self.stop_timer();
        self.state = SessionState::initial(&self.config);
        self.stats = None;
        debug!(target_len = self.expected.len(), mode = %self.config.mode, "session reset");
    }

    /// Swap in a new target and configuration, then reset
    pub fn reset_with(&mut self, target: impl Into<String>, config: SessionConfig) -> Result<()> {
        let target = target.into();
        if target.is_empty() {
            return Err(Error::EmptyTarget);
        }
        self.expected = target.chars().collect();
        self.target = target;
        self.config = config;
        self.reset();
        Ok(())
    }

    fn start(&mut self, now: Instant) {
        self.state.started_at = Some(now);
        self.state.phase = Phase::Running;
        if self.config.mode == Mode::Time {
            self.start_timer(now);
        }
        debug!(mode = %self.config.mode, "session started");
    }

    fn start_timer(&mut self, now: Instant) {
        // never two countdowns at once
        self.stop_timer();
        let secs = self.config.time_duration.secs();
        self.countdown = Some(Countdown::start(now, secs));
        self.state.time_remaining = Some(secs);
    }

    fn stop_timer(&mut self) {
        self.countdown = None;
    }

    fn complete(&mut self, now: Instant) {
        self.stop_timer();
        if self.state.phase == Phase::Finished {
            return;
        }
        self.state.phase = Phase::Finished;
        self.state.finished_at = Some(now);

        let elapsed = self
            .state
            .started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        let typed = self.state.typed;

        let stats = Stats {
            wpm: stats::words_per_minute(typed, elapsed.as_secs_f64() / 60.0),
            raw_wpm: stats::words_per_minute(typed, elapsed.as_millis() as f64 / 60_000.0),
            accuracy: stats::accuracy(typed, self.state.mistakes),
            elapsed,
            errors: self.state.mistakes,
            missed_chars: self.state.missed_chars.clone(),
        };
        info!(
            wpm = stats.wpm,
            raw_wpm = stats.raw_wpm,
            accuracy = stats.accuracy,
            errors = stats.errors,
            elapsed_ms = elapsed.as_millis() as u64,
            "session complete"
        );

        if let Some(listener) = self.on_complete.as_mut() {
            listener(&stats);
        }
        self.stats = Some(stats);
    }
}

impl<C: Clock + fmt::Debug> fmt::Debug for TypingSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypingSession")
            .field("config", &self.config)
            .field("target", &self.target)
            .field("state", &self.state)
            .field("countdown", &self.countdown)
            .field("stats", &self.stats)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
