use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Cancellable once-per-period tick source owned by whoever drives a session.
///
/// Nothing is spawned: ticks are only produced while the owner awaits
/// [`QuestionTimer::tick`], so dropping the timer stops it.
#[derive(Debug)]
pub struct QuestionTimer {
    period: Duration,
    interval: Option<Interval>,
}

impl QuestionTimer {
    /// A stopped timer with a one-second period.
    #[must_use]
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    #[must_use]
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// (Re)start counting; the first tick fires one full period from now.
    pub fn restart(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn cancel(&mut self) {
        self.interval = None;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick. Never resolves while the timer is cancelled.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

impl Default for QuestionTimer {
    fn default() -> Self {
        Self::new()
    }
}
