//! Load/error/retry sequencing for the embedded game.
//!
//! The machine owns no DOM and no real timers: every input carries `now` in
//! milliseconds, timers are named deadlines fired by `tick`, and the results
//! are `Effect`s for the driver to apply.

use serde_json::Value;

use crate::config::LoaderTimings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Timeout,
    Network,
    GameReported,
}

impl Failure {
    pub fn message(self) -> &'static str {
        match self {
            Failure::Timeout => {
                "Game is taking longer than expected to load. Please check your internet connection."
            }
            Failure::Network => "Failed to load the game. Please try refreshing the page.",
            Failure::GameReported => "Game encountered an error. Please try reloading.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    LoadTimeout,
    Grace,
    Fade,
    RestoreSource,
    RotateTip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Insert a fresh loading overlay, replacing any existing one.
    ShowLoading,
    /// Replace the overlay with the error presentation.
    ShowError(String),
    RotateTip(usize),
    FadeOverlay,
    RemoveOverlay,
    ClearSource,
    RestoreSource,
    Track(&'static str, Option<Value>),
}

#[derive(Debug)]
pub struct GameLoader {
    timings: LoaderTimings,
    tip_count: usize,
    phase: Phase,
    tip: usize,
    // Between ClearSource and RestoreSource the frame shows a blank document.
    awaiting_source: bool,
    timers: Vec<(f64, Timer)>,
}

impl GameLoader {
    pub fn new(timings: LoaderTimings, tip_count: usize) -> Self {
        Self {
            timings,
            tip_count,
            phase: Phase::Idle,
            tip: 0,
            awaiting_source: false,
            timers: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tip(&self) -> usize {
        self.tip
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.timers
            .iter()
            .map(|(at, _)| *at)
            .min_by(|a, b| a.total_cmp(b))
    }

    fn arm(&mut self, timer: Timer, at: f64) {
        self.cancel(timer);
        self.timers.push((at, timer));
    }

    fn cancel(&mut self, timer: Timer) {
        self.timers.retain(|(_, armed)| *armed != timer);
    }

    fn enter_loading(&mut self, now: f64) {
        self.phase = Phase::Loading;
        self.tip = 0;
        if self.tip_count > 1 {
            self.arm(Timer::RotateTip, now + self.timings.tip_start_ms);
        }
    }

    pub fn start(&mut self, now: f64) -> Vec<Effect> {
        if self.phase != Phase::Idle {
            return Vec::new();
        }
        self.enter_loading(now);
        self.arm(Timer::LoadTimeout, now + self.timings.load_timeout_ms);
        vec![Effect::ShowLoading]
    }

    /// The frame's native load event. A load that arrives after the error
    /// overlay is already up still wins: the game is there, so the error
    /// overlay fades out like the loading one would.
    pub fn on_load(&mut self, now: f64) -> Vec<Effect> {
        if self.awaiting_source {
            return Vec::new();
        }
        match self.phase {
            Phase::Loading | Phase::Errored => {
                self.cancel(Timer::LoadTimeout);
                self.cancel(Timer::RotateTip);
                self.phase = Phase::Loaded;
                self.arm(Timer::Grace, now + self.timings.grace_ms);
                vec![Effect::Track("game_iframe_loaded", None)]
            }
            Phase::Idle | Phase::Loaded => Vec::new(),
        }
    }

    pub fn on_failure(&mut self, failure: Failure, _now: f64) -> Vec<Effect> {
        if self.phase != Phase::Loading {
            return Vec::new();
        }
        self.timers.clear();
        self.awaiting_source = false;
        self.phase = Phase::Errored;

        let message = failure.message();
        vec![
            Effect::ShowError(message.to_string()),
            Effect::Track("game_load_error", Some(Value::from(message))),
        ]
    }

    /// User-requested reload; only meaningful while the error overlay is up.
    pub fn retry(&mut self, now: f64) -> Vec<Effect> {
        if self.phase != Phase::Errored {
            return Vec::new();
        }
        self.timers.clear();
        self.enter_loading(now);
        self.awaiting_source = true;
        self.arm(Timer::RestoreSource, now + self.timings.restore_delay_ms);
        vec![
            Effect::RemoveOverlay,
            Effect::ShowLoading,
            Effect::ClearSource,
            Effect::Track("game_retry_attempted", None),
        ]
    }

    /// Fires every timer due at `now`, earliest first.
    pub fn tick(&mut self, now: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        while let Some(index) = self.due_index(now) {
            let (at, timer) = self.timers.remove(index);
            effects.extend(self.fire(timer, at));
        }
        effects
    }

    fn due_index(&self, now: f64) -> Option<usize> {
        let mut due: Option<(usize, f64)> = None;
        for (index, (at, _)) in self.timers.iter().enumerate() {
            if *at > now {
                continue;
            }
            if due.is_none_or(|(_, earliest)| *at < earliest) {
                due = Some((index, *at));
            }
        }
        due.map(|(index, _)| index)
    }

    fn fire(&mut self, timer: Timer, at: f64) -> Vec<Effect> {
        match timer {
            Timer::LoadTimeout => self.on_failure(Failure::Timeout, at),
            Timer::Grace => {
                self.arm(Timer::Fade, at + self.timings.fade_ms);
                vec![
                    Effect::FadeOverlay,
                    Effect::Track("game_loaded_successfully", None),
                ]
            }
            Timer::Fade => vec![Effect::RemoveOverlay],
            Timer::RestoreSource => {
                self.awaiting_source = false;
                self.arm(Timer::LoadTimeout, at + self.timings.load_timeout_ms);
                vec![Effect::RestoreSource]
            }
            Timer::RotateTip => {
                if self.phase != Phase::Loading || self.tip_count < 2 {
                    return Vec::new();
                }
                self.tip = (self.tip + 1) % self.tip_count;
                self.arm(Timer::RotateTip, at + self.timings.tip_interval_ms);
                vec![Effect::RotateTip(self.tip)]
            }
        }
    }
}
