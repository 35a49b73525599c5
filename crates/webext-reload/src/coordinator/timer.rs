//! Debounced reconnect timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A single-shot timer where scheduling again replaces the pending firing.
///
/// At most one firing is outstanding at a time, so repeated disconnect
/// signals collapse into one reconnect attempt.
#[derive(Debug)]
pub struct ReconnectTimer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    fired_tx: mpsc::UnboundedSender<u64>,
    fired_rx: mpsc::UnboundedReceiver<u64>,
}

impl ReconnectTimer {
    pub fn new(delay: Duration) -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        Self {
            delay,
            generation: 0,
            pending: None,
            fired_tx,
            fired_rx,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms the timer for `delay` from now, cancelling any pending firing.
    pub fn schedule(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;
        let tx = self.fired_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(generation);
        }));
    }

    /// True while a scheduled firing has not yet happened.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Waits for the current schedule to fire. Stale firings are discarded.
    ///
    /// Never resolves if nothing is scheduled.
    pub async fn fired(&mut self) {
        while let Some(generation) = self.fired_rx.recv().await {
            if generation == self.generation {
                self.pending = None;
                return;
            }
        }
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}
