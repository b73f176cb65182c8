//! Coalesces bursts of search input into a single filter update.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Each [`push`](Self::push) cancels the previously scheduled value and
/// schedules the new one after `delay`; only the last value of a burst is
/// delivered to the receiver.
pub struct SearchDebouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> SearchDebouncer<T> {
    /// Must be called inside a tokio runtime.
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                tx,
                pending: None,
            },
            rx,
        )
    }

    pub fn push(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means nobody is listening anymore.
            let _ = tx.send(value);
        }));
    }

    /// Drops the scheduled value, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for SearchDebouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
