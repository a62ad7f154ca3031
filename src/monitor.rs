//! The idle monitoring service.
//!
//! [`IdleMonitor`] owns the sampler, the notifier, the event log and the
//! idle tracker. All mutable state sits behind one async mutex so a tick and
//! a stop hook never interleave: a stop that arrives mid-tick waits for the
//! tick (including its notification) to finish.

use chrono::{DateTime, Local};
use std::future::Future;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::idle::tracker::{IdleState, IdleTracker, Transition, POLL_INTERVAL};
use crate::idle::{IdleSampler, SampleError};
use crate::logging::EventLog;
use crate::notify::{minutes, Notification, Notifier};

/// Why the service is going down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stopped on request (Ctrl-C, SIGINT).
    Stop,
    /// The host is powering down or restarting.
    Shutdown,
}

impl StopReason {
    fn event_message(self) -> &'static str {
        match self {
            StopReason::Stop => "Service stopped.",
            StopReason::Shutdown => "Service shutdown.",
        }
    }
}

/// State guarded by the service lock.
struct ServiceState {
    tracker: IdleTracker,
    events: EventLog,
    stopped: bool,
    /// The previous sample failed; only the first of a run is written to the event log.
    sampling_failed: bool,
}

/// Edge-triggered idle monitor.
pub struct IdleMonitor<S, N> {
    sampler: S,
    notifier: N,
    machine: String,
    state: Mutex<ServiceState>,
}

impl<S: IdleSampler, N: Notifier> IdleMonitor<S, N> {
    /// Create a monitor in the `Active` state; nothing runs until [`Self::run`].
    pub fn new(sampler: S, notifier: N, events: EventLog, machine: impl Into<String>) -> Self {
        Self {
            sampler,
            notifier,
            machine: machine.into(),
            state: Mutex::new(ServiceState {
                tracker: IdleTracker::new(),
                events,
                stopped: false,
                sampling_failed: false,
            }),
        }
    }

    /// Current tracker state.
    pub async fn state(&self) -> IdleState {
        self.state.lock().await.tracker.state()
    }

    /// Start hook: records the start in the event log.
    pub async fn start(&self) {
        self.state.lock().await.events.append("Service started.");
    }

    /// Sample once and act on the resulting transition.
    ///
    /// A sampler failure is returned and the tracker is left as it was, so
    /// the next tick simply retries. Only the first failure of a run, and the
    /// recovery after it, reach the event log.
    pub async fn tick(&self) -> Result<Transition, SampleError> {
        self.tick_at(Local::now()).await
    }

    async fn tick_at(&self, now: DateTime<Local>) -> Result<Transition, SampleError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.stopped {
            debug!("Ignoring tick after stop");
            return Ok(Transition::None);
        }

        let idle = match self.sampler.sample() {
            Ok(idle) => idle,
            Err(e) => {
                if state.sampling_failed {
                    debug!("Idle sample still failing: {}", e);
                } else {
                    warn!("Idle sample failed, retrying next tick: {}", e);
                    state.events.append(&format!("Idle sample error: {}", e));
                    state.sampling_failed = true;
                }
                return Err(e);
            }
        };
        if state.sampling_failed {
            state.sampling_failed = false;
            state.events.append("Idle sampling recovered.");
        }

        let episode_start = state.tracker.episode_start();
        let transition = state.tracker.observe(idle, now);
        match &transition {
            Transition::IdleDetected { idle, since } => {
                state
                    .events
                    .append(&format!("Idle detected for {:.1} minutes.", minutes(*idle)));
                let alert = Notification::idle_alert(&self.machine, *idle, *since);
                self.deliver(&mut state.events, &alert).await;
            }
            Transition::ActiveAgain => {
                if let Some(start) = episode_start {
                    debug!("Idle episode lasted {}s", (now - start).num_seconds());
                }
                state.events.append("User active again.");
            }
            Transition::None => {}
        }

        Ok(transition)
    }

    /// Stop or shutdown hook.
    ///
    /// The first call sends the "Service Stopped" notification and logs the
    /// reason; later calls do nothing and return `false`.
    pub async fn stop(&self, reason: StopReason) -> bool {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.stopped {
            debug!("Ignoring {:?}: service already stopped", reason);
            return false;
        }
        state.stopped = true;

        let notice = Notification::service_stopped(&self.machine, Local::now());
        self.deliver(&mut state.events, &notice).await;
        state.events.append(reason.event_message());
        true
    }

    /// Send a notification, recording the outcome. Never fails.
    async fn deliver(&self, events: &mut EventLog, notification: &Notification) {
        match self
            .notifier
            .notify(&notification.subject, &notification.body)
            .await
        {
            Ok(()) => events.append(&format!("Email sent: {}", notification.subject)),
            Err(e) => {
                warn!("Notification '{}' not delivered: {}", notification.subject, e);
                events.append(&format!("Email failed: {}", e));
            }
        }
    }

    /// Run the service until `shutdown` resolves, then stop.
    ///
    /// The first sample is taken immediately. A tick that overruns the poll
    /// interval delays the next one; ticks never overlap and never queue up.
    pub async fn run(&self, shutdown: impl Future<Output = StopReason>) {
        self.start().await;

        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Polling idle time every {:?}", POLL_INTERVAL);

        let reason = loop {
            tokio::select! {
                reason = &mut shutdown => break reason,
                _ = interval.tick() => {
                    // Failures are already reported by tick().
                    let _ = self.tick().await;
                }
            }
        };

        info!(
            "Received {:?} while {:?}, shutting down",
            reason,
            self.state().await
        );
        self.stop(reason).await;
    }
}
