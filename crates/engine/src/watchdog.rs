use std::time::Duration;

use tmbft_types::{Height, Round};
use tokio::sync::{mpsc, watch};

/// The liveness watchdog of §4.I: fires every `request_timeout` and, if
/// neither height nor round has advanced since the previous tick, asks the
/// consensus task to replay its WAL for the current height.
///
/// The watchdog only reads a `(height, round)` snapshot published by the
/// consensus task and sends a trigger; it never touches the WAL or the
/// driver itself, preserving the single-writer discipline of §5.
pub fn spawn(
    period: Duration,
    progress: watch::Receiver<(Height, Round)>,
    replay_tx: mpsc::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // the first tick fires immediately; skip it
        let mut last_seen = *progress.borrow();

        loop {
            interval.tick().await;
            let current = *progress.borrow();
            if current == last_seen && replay_tx.send(()).await.is_err() {
                return;
            }
            last_seen = current;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stalled_progress_triggers_a_replay() {
        let (progress_tx, progress_rx) = watch::channel((Height::new(1), Round::INITIAL));
        let (replay_tx, mut replay_rx) = mpsc::channel(4);
        let _handle = spawn(Duration::from_millis(100), progress_rx, replay_tx);

        tokio::time::advance(Duration::from_millis(250)).await;
        assert!(replay_rx.recv().await.is_some());
        drop(progress_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn advancing_round_suppresses_a_replay() {
        let (progress_tx, progress_rx) = watch::channel((Height::new(1), Round::INITIAL));
        let (replay_tx, mut replay_rx) = mpsc::channel(4);
        let _handle = spawn(Duration::from_millis(100), progress_rx, replay_tx);

        progress_tx.send((Height::new(1), Round::new(1))).unwrap();
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(replay_rx.try_recv().is_err());
    }
}
