use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Periodic save trigger.
///
/// Starting always replaces the running timer, so there is never more than
/// one. A tick only fires once a full period has passed since `start`.
#[derive(Debug)]
pub struct Autosave {
    period: Duration,
    timer: Option<Interval>,
}

impl Autosave {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            timer: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn start(&mut self) {
        let mut timer = interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
        log::debug!("Autosave every {:?}", self.period);
    }

    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            log::debug!("Autosave stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Wait for the next tick. Never completes while stopped.
    pub async fn tick(&mut self) {
        match &mut self.timer {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_full_period() {
        let mut autosave = Autosave::new(Duration::from_millis(1000));
        autosave.start();

        assert!(
            timeout(Duration::from_millis(999), autosave.tick())
                .await
                .is_err()
        );
        assert!(
            timeout(Duration::from_millis(10), autosave.tick())
                .await
                .is_ok()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_never_ticks() {
        let mut autosave = Autosave::new(Duration::from_millis(100));
        autosave.start();
        autosave.stop();

        assert!(!autosave.is_running());
        assert!(
            timeout(Duration::from_secs(60), autosave.tick())
                .await
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_period() {
        let mut autosave = Autosave::new(Duration::from_millis(1000));
        autosave.start();
        tokio::time::advance(Duration::from_millis(600)).await;
        autosave.start();

        assert!(
            timeout(Duration::from_millis(900), autosave.tick())
                .await
                .is_err()
        );
        assert!(autosave.is_running());
    }
}
