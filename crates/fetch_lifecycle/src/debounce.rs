//! Debounced value relay: only the last value of a burst is forwarded once
//! a quiet period has elapsed.

use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// Coalesces rapid submissions into a single forwarded value.
///
/// Each [`submit`](Self::submit) aborts the not-yet-forwarded predecessor
/// and schedules the new value for forwarding after the configured delay.
/// The receiving half returned by [`new`](Self::new) is the natural
/// upstream of a key stream: wrap it in a stream adapter and feed it to
/// `FetchController::run_key_stream` so bursts of reselections mint one
/// epoch instead of many.
pub struct DebouncedInput<K> {
    delay: Duration,
    forward_tx: mpsc::UnboundedSender<K>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<K: Send + 'static> DebouncedInput<K> {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<K>) {
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                forward_tx,
                pending: Mutex::new(None),
            },
            forward_rx,
        )
    }

    /// Schedule `value` for forwarding after the quiet period, superseding
    /// any value still waiting.
    pub async fn submit(&self, value: K) {
        let mut pending = self.pending.lock().await;
        if let Some(superseded) = pending.take() {
            superseded.abort();
            debug!("debounced value superseded before the quiet period elapsed");
        }
        let forward_tx = self.forward_tx.clone();
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = forward_tx.send(value);
        }));
    }
}
