//! Board-wide "wait until every tile is at rest" task.
//!
//! Replaces interval/timeout handles with a single owned value: the board keeps
//! at most one `SettleTask`, and overwriting it drops the previous callback
//! without running it.

use super::Board;

/// Step run on the board once it has settled, with the firing timestamp.
pub type Deferred = Box<dyn FnOnce(&mut Board, f64)>;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Stage {
    /// Checking for running transitions every poll interval.
    Polling { next_poll_ms: f64 },
    /// Everything stopped; waiting out the settle delay.
    Settling { fire_at_ms: f64 },
}

pub(crate) struct SettleTask {
    stage: Stage,
    delay_ms: f64,
    poll_interval_ms: f64,
    callback: Deferred,
}

impl SettleTask {
    pub(crate) fn new(callback: Deferred, delay_ms: f64, poll_interval_ms: f64, now: f64) -> Self {
        Self {
            stage: Stage::Polling {
                next_poll_ms: now + poll_interval_ms,
            },
            delay_ms,
            poll_interval_ms,
            callback,
        }
    }

    /// Advance the task to `now`. Returns true once the callback is due.
    pub(crate) fn advance(&mut self, now: f64, transitions_active: bool) -> bool {
        match self.stage {
            Stage::Polling { next_poll_ms } => {
                if now < next_poll_ms {
                    return false;
                }
                if transitions_active {
                    log::trace!("settle poll at {now:.1}: transitions still running");
                    self.stage = Stage::Polling {
                        next_poll_ms: now + self.poll_interval_ms,
                    };
                    return false;
                }
                if self.delay_ms <= 0.0 {
                    return true;
                }
                self.stage = Stage::Settling {
                    fire_at_ms: now + self.delay_ms,
                };
                false
            }
            Stage::Settling { fire_at_ms } => now >= fire_at_ms,
        }
    }

    pub(crate) fn is_settling(&self) -> bool {
        matches!(self.stage, Stage::Settling { .. })
    }

    pub(crate) fn into_callback(self) -> Deferred {
        self.callback
    }
}

impl std::fmt::Debug for SettleTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettleTask")
            .field("stage", &self.stage)
            .field("delay_ms", &self.delay_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(delay_ms: f64) -> SettleTask {
        SettleTask::new(Box::new(|_: &mut Board, _: f64| {}), delay_ms, 10.0, 0.0)
    }

    #[test]
    fn waits_for_first_poll() {
        let mut t = task(0.0);
        assert!(!t.advance(5.0, false));
        assert!(t.advance(10.0, false));
    }

    #[test]
    fn keeps_polling_while_active() {
        let mut t = task(0.0);
        assert!(!t.advance(10.0, true));
        assert!(!t.advance(15.0, false));
        assert!(t.advance(20.0, false));
    }

    #[test]
    fn settle_delay_runs_after_transitions_stop() {
        let mut t = task(250.0);
        assert!(!t.advance(10.0, false));
        assert!(t.is_settling());
        // new transitions during the settle delay do not restart it
        assert!(!t.advance(200.0, true));
        assert!(t.advance(260.0, true));
    }
}
