//! Derived engagement milestones. All timestamps are milliseconds supplied by
//! the caller.

pub const SCROLL_MILESTONES: [u32; 3] = [25, 50, 75];
pub const ENGAGED_DEPTH: u32 = 25;
pub const GAME_ENGAGEMENT_MS: f64 = 10_000.0;
pub const ENGAGED_SESSION_SECS: u64 = 30;
pub const HIDDEN_TAB_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrottleDecision {
    Run,
    /// Run later, after this many milliseconds.
    Defer(f64),
    Skip,
}

#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: f64,
    trailing: bool,
    last_run: Option<f64>,
}

impl Throttle {
    /// Runs at most once per interval; calls inside the interval are dropped.
    pub fn leading(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            trailing: false,
            last_run: None,
        }
    }

    /// Like `leading`, but a call inside the interval is deferred to its end.
    pub fn with_trailing(interval_ms: f64) -> Self {
        Self {
            trailing: true,
            ..Self::leading(interval_ms)
        }
    }

    pub fn poll(&mut self, now: f64) -> ThrottleDecision {
        match self.last_run {
            Some(last) if now - last < self.interval_ms => {
                if self.trailing {
                    ThrottleDecision::Defer(self.interval_ms - (now - last))
                } else {
                    ThrottleDecision::Skip
                }
            }
            _ => {
                self.last_run = Some(now);
                ThrottleDecision::Run
            }
        }
    }

    /// Records a deferred run.
    pub fn mark_run(&mut self, now: f64) {
        self.last_run = Some(now);
    }
}

fn percent(numerator: f64, denominator: f64) -> Option<u32> {
    if denominator <= 0.0 || !numerator.is_finite() {
        return None;
    }
    Some((numerator / denominator * 100.0).round().max(0.0) as u32)
}

/// Share of the scrollable distance already scrolled.
pub fn scrollable_depth(scroll_y: f64, body_height: f64, viewport_height: f64) -> Option<u32> {
    percent(scroll_y, body_height - viewport_height)
}

/// Share of the document above the bottom edge of the viewport.
pub fn viewport_depth(scroll_top: f64, viewport_height: f64, document_height: f64) -> Option<u32> {
    percent(scroll_top + viewport_height, document_height)
}

/// Reports the first time scroll depth reaches `ENGAGED_DEPTH`.
#[derive(Debug, Default)]
pub struct EngagedScroll {
    max_depth: u32,
    engaged: bool,
}

impl EngagedScroll {
    pub fn observe(&mut self, depth: u32) -> bool {
        if depth <= self.max_depth {
            return false;
        }
        self.max_depth = depth;
        if self.max_depth >= ENGAGED_DEPTH && !self.engaged {
            self.engaged = true;
            return true;
        }
        false
    }
}

/// Maximum scroll depth plus which milestones were already reported.
#[derive(Debug, Default)]
pub struct MilestoneTracker {
    max_depth: u32,
    fired: [bool; SCROLL_MILESTONES.len()],
}

impl MilestoneTracker {
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Newly crossed milestones, ascending. Readings at or below the previous
    /// maximum never report.
    pub fn observe(&mut self, depth: u32) -> Vec<u32> {
        if depth <= self.max_depth {
            return Vec::new();
        }
        self.max_depth = depth;

        let mut crossed = Vec::new();
        for (milestone, fired) in SCROLL_MILESTONES.iter().zip(self.fired.iter_mut()) {
            if depth >= *milestone && !*fired {
                *fired = true;
                crossed.push(*milestone);
            }
        }
        crossed
    }
}

pub fn milestone_event_name(milestone: u32) -> String {
    format!("scroll_depth_{}", milestone)
}

/// One-shot "section entered the viewport" detection.
#[derive(Debug, Default)]
pub struct SectionSighting {
    seen: bool,
}

impl SectionSighting {
    pub fn observe(&mut self, rect_top: f64, rect_bottom: f64, viewport_height: f64) -> bool {
        if self.seen {
            return false;
        }
        if rect_top < viewport_height && rect_bottom > 0.0 {
            self.seen = true;
            return true;
        }
        false
    }
}

/// Accumulates how long a section stays in view.
#[derive(Debug)]
pub struct VisibilityTimer {
    threshold_ms: f64,
    visible_since: Option<f64>,
    accumulated_ms: f64,
    reported: bool,
}

impl Default for VisibilityTimer {
    fn default() -> Self {
        Self::new(GAME_ENGAGEMENT_MS)
    }
}

impl VisibilityTimer {
    pub fn new(threshold_ms: f64) -> Self {
        Self {
            threshold_ms,
            visible_since: None,
            accumulated_ms: 0.0,
            reported: false,
        }
    }

    pub fn accumulated_ms(&self) -> f64 {
        self.accumulated_ms
    }

    /// Feeds a visibility change. Returns the accumulated seconds the one time
    /// the total first exceeds the threshold.
    pub fn update(&mut self, visible: bool, now: f64) -> Option<u64> {
        match (visible, self.visible_since) {
            (true, None) => {
                self.visible_since = Some(now);
                None
            }
            (false, Some(since)) => {
                self.visible_since = None;
                self.accumulated_ms += (now - since).max(0.0);
                if self.accumulated_ms > self.threshold_ms && !self.reported {
                    self.reported = true;
                    return Some((self.accumulated_ms / 1000.0).round() as u64);
                }
                None
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started_at: f64,
}

impl SessionClock {
    pub fn start(now: f64) -> Self {
        Self { started_at: now }
    }

    pub fn elapsed_secs(&self, now: f64) -> u64 {
        ((now - self.started_at).max(0.0) / 1000.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_throttle_drops_calls_inside_interval() {
        let mut throttle = Throttle::leading(1000.0);
        assert_eq!(throttle.poll(0.0), ThrottleDecision::Run);
        assert_eq!(throttle.poll(400.0), ThrottleDecision::Skip);
        assert_eq!(throttle.poll(999.0), ThrottleDecision::Skip);
        assert_eq!(throttle.poll(1000.0), ThrottleDecision::Run);
    }

    #[test]
    fn trailing_throttle_defers_to_interval_end() {
        let mut throttle = Throttle::with_trailing(250.0);
        assert_eq!(throttle.poll(100.0), ThrottleDecision::Run);
        assert_eq!(throttle.poll(200.0), ThrottleDecision::Defer(150.0));
        throttle.mark_run(350.0);
        assert_eq!(throttle.poll(400.0), ThrottleDecision::Defer(200.0));
        assert_eq!(throttle.poll(600.0), ThrottleDecision::Run);
    }

    #[test]
    fn depth_formulas() {
        assert_eq!(scrollable_depth(500.0, 3000.0, 1000.0), Some(25));
        assert_eq!(scrollable_depth(10.0, 800.0, 800.0), None);
        assert_eq!(viewport_depth(0.0, 1000.0, 4000.0), Some(25));
        assert_eq!(viewport_depth(3000.0, 1000.0, 4000.0), Some(100));
        assert_eq!(viewport_depth(0.0, 1000.0, 0.0), None);
    }

    #[test]
    fn engaged_scroll_fires_once() {
        let mut engaged = EngagedScroll::default();
        assert!(!engaged.observe(10));
        assert!(engaged.observe(30));
        assert!(!engaged.observe(90));
        assert!(!engaged.observe(20));
    }

    #[test]
    fn milestones_fire_at_most_once() {
        let mut tracker = MilestoneTracker::default();
        assert_eq!(tracker.observe(30), vec![25]);
        assert_eq!(tracker.observe(30), Vec::<u32>::new());
        assert_eq!(tracker.observe(40), Vec::<u32>::new());
        assert_eq!(tracker.observe(20), Vec::<u32>::new());
        assert_eq!(tracker.observe(55), vec![50]);
        assert_eq!(tracker.observe(100), vec![75]);
        assert_eq!(tracker.observe(100), Vec::<u32>::new());
        assert_eq!(tracker.max_depth(), 100);
    }

    #[test]
    fn milestone_jump_reports_every_crossed_threshold() {
        let mut tracker = MilestoneTracker::default();
        assert_eq!(tracker.observe(80), vec![25, 50, 75]);
        assert_eq!(milestone_event_name(50), "scroll_depth_50");
    }

    #[test]
    fn milestones_need_strictly_greater_depth() {
        let mut tracker = MilestoneTracker::default();
        assert_eq!(tracker.observe(24), Vec::<u32>::new());
        assert_eq!(tracker.observe(24), Vec::<u32>::new());
        assert_eq!(tracker.observe(25), vec![25]);
    }

    #[test]
    fn section_sighting_is_one_shot() {
        let mut sighting = SectionSighting::default();
        assert!(!sighting.observe(1200.0, 1800.0, 900.0));
        assert!(sighting.observe(600.0, 1200.0, 900.0));
        assert!(!sighting.observe(100.0, 700.0, 900.0));
    }

    #[test]
    fn visibility_timer_accumulates_across_views() {
        let mut timer = VisibilityTimer::default();
        assert_eq!(timer.update(true, 0.0), None);
        assert_eq!(timer.update(false, 6_000.0), None);
        assert_eq!(timer.update(true, 20_000.0), None);
        assert_eq!(timer.update(true, 21_000.0), None);
        assert_eq!(timer.update(false, 25_000.0), Some(11));
        assert_eq!(timer.accumulated_ms(), 11_000.0);
        assert_eq!(timer.update(true, 30_000.0), None);
        assert_eq!(timer.update(false, 50_000.0), None);
    }

    #[test]
    fn visibility_timer_ignores_repeated_exits() {
        let mut timer = VisibilityTimer::new(1_000.0);
        assert_eq!(timer.update(false, 5_000.0), None);
        assert_eq!(timer.accumulated_ms(), 0.0);
    }

    #[test]
    fn session_clock_rounds_to_seconds() {
        let clock = SessionClock::start(1_000.0);
        assert_eq!(clock.elapsed_secs(1_000.0), 0);
        assert_eq!(clock.elapsed_secs(32_600.0), 32);
        assert_eq!(clock.elapsed_secs(500.0), 0);
    }
}
