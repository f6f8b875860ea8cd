//! Reducer-driven state store: a single owned state value, a pure
//! `(state, action) -> state` reducer, and change notification for any
//! number of observers.

use std::fmt::Debug;

use tokio::sync::watch;
use tracing::debug;

/// Pure state transition. Implementations must not perform I/O or otherwise
/// depend on anything but the incoming state and action.
pub trait Reducer: Send + Sync {
    type State: Clone + Send + Sync + 'static;
    type Action: Debug + Send;

    fn reduce(&self, state: &Self::State, action: &Self::Action) -> Self::State;
}

/// Owns the state and serializes dispatches.
///
/// Observers subscribe to a change-notified handle; a slow observer may
/// skip intermediate states but never sees them out of order.
pub struct Store<R: Reducer> {
    reducer: R,
    state_tx: watch::Sender<R::State>,
}

impl<R: Reducer> Store<R> {
    pub fn new(reducer: R, initial: R::State) -> Self {
        let (state_tx, _) = watch::channel(initial);
        Self { reducer, state_tx }
    }

    /// Fold `action` into the current state and notify observers.
    pub fn dispatch(&self, action: R::Action) {
        self.state_tx.send_modify(|state| {
            *state = self.reducer.reduce(state, &action);
        });
        debug!(?action, "action dispatched");
    }

    pub fn snapshot(&self) -> R::State {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<R::State> {
        self.state_tx.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
