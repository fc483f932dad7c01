use tmbft_config::TimeoutConfig;
use tmbft_types::Timeout;
use tokio::sync::mpsc;

/// Schedules the three per-step timers of §4.E as standalone tokio tasks
/// that sleep for the configured duration and then post the `Timeout` back
/// to the consensus task.
///
/// There is deliberately no per-timer cancellation here: §4.E's
/// "best-effort stop" is implemented downstream instead, by tagging every
/// timeout with the `(height, round)` it was raised for and having
/// [`tmbft_driver::Driver::handle_timeout`] silently drop it if that tag no
/// longer matches current state. A timer that fires after its round has
/// moved on simply does nothing; there is no race to lose.
pub struct TimeoutController {
    tx: mpsc::Sender<Timeout>,
    config: TimeoutConfig,
}

impl TimeoutController {
    pub fn new(tx: mpsc::Sender<Timeout>, config: TimeoutConfig) -> Self {
        Self { tx, config }
    }

    pub fn schedule(&self, timeout: Timeout) {
        let duration = self.config.duration(timeout.step, timeout.round);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // The receiving end outliving us is the common case (shutdown
            // races the sleep); nothing to do if the send fails.
            let _ = tx.send(timeout).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmbft_types::{Height, Round};

    #[tokio::test(start_paused = true)]
    async fn schedule_fires_after_configured_duration() {
        let (tx, mut rx) = mpsc::channel(8);
        let controller = TimeoutController::new(tx, TimeoutConfig::default());

        let timeout = Timeout::propose(Height::new(1), Round::INITIAL);
        controller.schedule(timeout);

        tokio::time::advance(std::time::Duration::from_millis(3000)).await;
        assert_eq!(rx.recv().await, Some(timeout));
    }
}
