//! Edge-triggered idle episode tracking.
//!
//! The tracker holds a single latch, `notified`, recording whether an alert
//! has already gone out for the current idle episode. Feeding it one idle
//! sample per poll yields at most one [`Transition`] per threshold crossing in
//! either direction; samples that do not cross the threshold yield
//! [`Transition::None`].

use chrono::{DateTime, Local};
use std::time::Duration;

/// Idle duration at which an episode starts.
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Time between two idle samples.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Observable state of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    /// No alert outstanding.
    Active,
    /// An alert has been sent for the current idle episode.
    IdleNotified,
}

/// Side effect requested by a single observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    None,
    /// The threshold was just crossed; an idle alert is due.
    IdleDetected {
        idle: Duration,
        since: DateTime<Local>,
    },
    /// Input resumed after an alerted episode.
    ActiveAgain,
}

/// Tracker for the current idle episode.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    threshold: Duration,
    notified: bool,
    episode_start: Option<DateTime<Local>>,
}

impl Default for IdleTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleTracker {
    /// Create a tracker in the `Active` state.
    pub fn new() -> Self {
        Self {
            threshold: IDLE_THRESHOLD,
            notified: false,
            episode_start: None,
        }
    }

    /// Whether an alert is outstanding for the current episode.
    pub fn state(&self) -> IdleState {
        if self.notified {
            IdleState::IdleNotified
        } else {
            IdleState::Active
        }
    }

    /// Estimated start of the current alerted episode, if any.
    pub fn episode_start(&self) -> Option<DateTime<Local>> {
        self.episode_start
    }

    /// Feed one idle sample taken at `now`.
    pub fn observe(&mut self, idle: Duration, now: DateTime<Local>) -> Transition {
        if idle >= self.threshold {
            if self.notified {
                return Transition::None;
            }
            let since =
                now - chrono::Duration::from_std(idle).unwrap_or_else(|_| chrono::Duration::zero());
            self.notified = true;
            self.episode_start = Some(since);
            Transition::IdleDetected { idle, since }
        } else {
            let was_notified = self.notified;
            self.notified = false;
            self.episode_start = None;
            if was_notified {
                Transition::ActiveAgain
            } else {
                Transition::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mins(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    fn at(step: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
            + chrono::Duration::seconds(i64::from(step) * POLL_INTERVAL.as_secs() as i64)
    }

    fn run(samples: &[Duration]) -> Vec<Transition> {
        let mut tracker = IdleTracker::new();
        samples
            .iter()
            .enumerate()
            .map(|(i, d)| tracker.observe(*d, at(i as u32)))
            .collect()
    }

    #[test]
    fn test_starts_active() {
        let tracker = IdleTracker::new();
        assert_eq!(tracker.state(), IdleState::Active);
        assert_eq!(tracker.episode_start(), None);
    }

    #[test]
    fn test_below_threshold_is_silent() {
        let transitions = run(&[mins(1), mins(2), mins(4)]);
        assert!(transitions.iter().all(|t| *t == Transition::None));
    }

    #[test]
    fn test_alert_fires_exactly_at_threshold() {
        let mut tracker = IdleTracker::new();
        assert_eq!(tracker.observe(mins(4), at(0)), Transition::None);
        assert_eq!(tracker.state(), IdleState::Active);

        let t = tracker.observe(mins(5), at(1));
        assert_eq!(
            t,
            Transition::IdleDetected {
                idle: mins(5),
                since: at(1) - chrono::Duration::minutes(5),
            }
        );
        assert_eq!(tracker.state(), IdleState::IdleNotified);

        assert_eq!(tracker.observe(mins(6), at(2)), Transition::None);
        assert_eq!(tracker.state(), IdleState::IdleNotified);
    }

    #[test]
    fn test_recovery_after_alert() {
        let transitions = run(&[mins(6), mins(6), mins(2)]);
        assert!(matches!(transitions[0], Transition::IdleDetected { .. }));
        assert_eq!(transitions[1], Transition::None);
        assert_eq!(transitions[2], Transition::ActiveAgain);
    }

    #[test]
    fn test_episode_start_uses_actual_idle_duration() {
        let mut tracker = IdleTracker::new();
        let now = at(0);
        tracker.observe(mins(12), now);
        assert_eq!(
            tracker.episode_start(),
            Some(now - chrono::Duration::minutes(12))
        );

        tracker.observe(Duration::ZERO, at(1));
        assert_eq!(tracker.episode_start(), None);
    }

    #[test]
    fn test_repeated_idle_sample_is_idempotent() {
        let mut tracker = IdleTracker::new();
        tracker.observe(mins(7), at(0));
        for step in 1..50 {
            assert_eq!(tracker.observe(mins(7), at(step)), Transition::None);
            assert_eq!(tracker.state(), IdleState::IdleNotified);
        }
    }

    #[test]
    fn test_each_episode_alerts_once() {
        let samples = [
            mins(6),
            mins(7),
            mins(1),
            mins(0),
            mins(5),
            mins(9),
            mins(3),
            mins(8),
        ];
        let transitions = run(&samples);
        let alerts: Vec<usize> = transitions
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t, Transition::IdleDetected { .. }))
            .map(|(i, _)| i)
            .collect();
        let recoveries: Vec<usize> = transitions
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Transition::ActiveAgain)
            .map(|(i, _)| i)
            .collect();

        assert_eq!(alerts, vec![0, 4, 7]);
        assert_eq!(recoveries, vec![2, 6]);
    }

    /// Every sequence of up to 8 samples drawn from {below, at/above}: alerts
    /// match the starts of maximal idle runs and recoveries match their ends.
    #[test]
    fn test_transitions_match_idle_runs_exhaustively() {
        for len in 1..=8u32 {
            for bits in 0..(1u32 << len) {
                let samples: Vec<Duration> = (0..len)
                    .map(|i| if bits & (1 << i) != 0 { mins(6) } else { mins(1) })
                    .collect();
                let transitions = run(&samples);

                for (i, t) in transitions.iter().enumerate() {
                    let idle = samples[i] >= IDLE_THRESHOLD;
                    let prev_idle = i > 0 && samples[i - 1] >= IDLE_THRESHOLD;
                    let expected_alert = idle && !prev_idle;
                    let expected_recovery = !idle && prev_idle;

                    assert_eq!(
                        matches!(t, Transition::IdleDetected { .. }),
                        expected_alert,
                        "alert mismatch at {i} for {samples:?}"
                    );
                    assert_eq!(
                        *t == Transition::ActiveAgain,
                        expected_recovery,
                        "recovery mismatch at {i} for {samples:?}"
                    );
                }
            }
        }
    }
}
