//! Keyed request lifecycle: bind a changing selection key to asynchronous
//! fetches so that the visible outcome always belongs to the most recently
//! selected key, no matter in which order the fetches complete.
//!
//! Every call to [`FetchController::on_key_changed`] mints a new epoch. The
//! fetch launched under an epoch may only commit its outcome while that
//! epoch is still current; outcomes of superseded epochs are discarded
//! silently. Cancellation of the superseded fetch is advisory — a transport
//! may ignore it — and correctness never depends on it: the epoch gate at
//! commit time is the sole arbiter.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod debounce;
pub use debounce::DebouncedInput;

/// The single outcome value exposed to the consuming surface.
///
/// Exactly one of these is visible at any time and it always corresponds to
/// the fetch launched for the controller's current epoch. Discarded
/// outcomes of superseded epochs never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum FetchOutcome<T> {
    /// No key has been selected yet.
    NoSelection,
    /// A fetch for the current key is in flight.
    Pending,
    /// The current key's fetch resolved.
    Success(T),
    /// The current key's fetch failed; the reason is uninterpreted.
    Failure(String),
}

impl<T> FetchOutcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchOutcome::Pending)
    }

    /// Terminal for the current epoch: a later key change starts over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchOutcome::Success(_) | FetchOutcome::Failure(_))
    }
}

/// Asynchronous collaborator that resolves a key to its payload.
///
/// The cancellation token is advisory: an implementation may abort early
/// when it fires (and return any error it likes), or ignore it entirely.
/// Either way a superseded fetch can never overwrite newer visible state.
#[async_trait]
pub trait KeyedFetcher: Send + Sync {
    type Key: Clone + Send + Sync + 'static;
    type Payload: Clone + Send + Sync + 'static;

    async fn fetch(&self, key: Self::Key, cancel: CancellationToken) -> Result<Self::Payload>;
}

/// Diagnostic counters; bookkeeping only, no correctness weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleStats {
    pub launched: u64,
    pub committed: u64,
    pub discarded_stale: u64,
    pub discarded_after_teardown: u64,
}

/// Returned when a key selection is attempted after [`FetchController::teardown`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("controller is torn down; key selection ignored")]
pub struct ControllerClosed;

struct EpochState {
    next_epoch: u64,
    current_epoch: Option<u64>,
    torn_down: bool,
    cancel: Option<CancellationToken>,
    stats: LifecycleStats,
}

struct Shared<T> {
    inner: Mutex<EpochState>,
    outcome_tx: watch::Sender<FetchOutcome<T>>,
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    /// The commit gate. Runs under the same lock as the epoch bump in
    /// `on_key_changed`, so an outcome can never land in the middle of a
    /// key change.
    async fn commit(&self, epoch: u64, result: Result<T>) {
        let mut state = self.inner.lock().await;
        if state.torn_down {
            state.stats.discarded_after_teardown += 1;
            debug!(epoch, "outcome arrived after teardown; discarded");
            return;
        }
        if state.current_epoch != Some(epoch) {
            state.stats.discarded_stale += 1;
            debug!(
                epoch,
                current = ?state.current_epoch,
                "outcome belongs to a superseded selection; discarded"
            );
            return;
        }
        state.stats.committed += 1;
        let outcome = match result {
            Ok(payload) => {
                info!(epoch, "fetch outcome committed");
                FetchOutcome::Success(payload)
            }
            Err(err) => {
                warn!(epoch, error = %err, "fetch failed; failure committed");
                FetchOutcome::Failure(err.to_string())
            }
        };
        self.outcome_tx.send_replace(outcome);
    }
}

/// Owns the current epoch and the visible outcome for one logical selection.
///
/// Consumers read the outcome through [`subscribe`](Self::subscribe) or
/// [`current_outcome`](Self::current_outcome) and drive the lifecycle with
/// [`on_key_changed`](Self::on_key_changed) and [`teardown`](Self::teardown);
/// they never touch epoch state directly.
pub struct FetchController<F: KeyedFetcher> {
    fetcher: Arc<F>,
    shared: Arc<Shared<F::Payload>>,
}

impl<F: KeyedFetcher + 'static> FetchController<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_shared_fetcher(Arc::new(fetcher))
    }

    pub fn with_shared_fetcher(fetcher: Arc<F>) -> Self {
        let (outcome_tx, _) = watch::channel(FetchOutcome::NoSelection);
        Self {
            fetcher,
            shared: Arc::new(Shared {
                inner: Mutex::new(EpochState {
                    next_epoch: 0,
                    current_epoch: None,
                    torn_down: false,
                    cancel: None,
                    stats: LifecycleStats::default(),
                }),
                outcome_tx,
            }),
        }
    }

    /// Select a new key: supersede the previous epoch, cancel its fetch
    /// (advisory), publish `Pending`, and launch a fetch for `key`.
    ///
    /// `Pending` is observable as soon as this returns. Reselecting an
    /// equal key still mints a fresh epoch, so an unresolved earlier fetch
    /// for the same key is superseded like any other.
    pub async fn on_key_changed(&self, key: F::Key) -> Result<(), ControllerClosed> {
        let (epoch, cancel) = {
            let mut state = self.shared.inner.lock().await;
            if state.torn_down {
                warn!("key selection after teardown ignored");
                return Err(ControllerClosed);
            }
            if let Some(superseded) = state.cancel.take() {
                superseded.cancel();
            }
            let epoch = state.next_epoch;
            state.next_epoch += 1;
            state.current_epoch = Some(epoch);
            let cancel = CancellationToken::new();
            state.cancel = Some(cancel.clone());
            state.stats.launched += 1;
            // Published under the lock so no outcome can slip in between
            // the epoch bump and the Pending transition.
            self.shared.outcome_tx.send_replace(FetchOutcome::Pending);
            (epoch, cancel)
        };
        debug!(epoch, "selection changed; fetch launched");

        let fetcher = Arc::clone(&self.fetcher);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let result = fetcher.fetch(key, cancel).await;
            shared.commit(epoch, result).await;
        });
        Ok(())
    }

    /// Supersede the current epoch with a terminal no-epoch marker.
    ///
    /// Any still-in-flight fetch is cancelled (advisory) and its eventual
    /// outcome discarded unconditionally. Idempotent; the last visible
    /// outcome stays as it was.
    pub async fn teardown(&self) {
        let mut state = self.shared.inner.lock().await;
        if state.torn_down {
            return;
        }
        state.torn_down = true;
        state.current_epoch = None;
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        info!("controller torn down");
    }

    /// Drive the controller from a stream of key-change events until the
    /// stream ends or the controller is torn down.
    pub async fn run_key_stream<S>(&self, keys: S)
    where
        S: Stream<Item = F::Key>,
    {
        tokio::pin!(keys);
        while let Some(key) = keys.next().await {
            if self.on_key_changed(key).await.is_err() {
                break;
            }
        }
    }

    pub fn current_outcome(&self) -> FetchOutcome<F::Payload> {
        self.shared.outcome_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchOutcome<F::Payload>> {
        self.shared.outcome_tx.subscribe()
    }

    pub async fn stats(&self) -> LifecycleStats {
        self.shared.inner.lock().await.stats
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
