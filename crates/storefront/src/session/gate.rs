//! Single-flight refresh gate.
//!
//! The first request to find the credential expired becomes the *leader* and
//! performs the refresh; requests that arrive while it is in flight become
//! *followers* and wait for its outcome. When the leader settles, every
//! follower queued during that refresh is released in FIFO order with the
//! same outcome and the gate returns to [`RefreshState::Idle`].
//!
//! A request whose `401` arrives only after the refresh already settled must
//! not start another one. Requests therefore note the gate's
//! [`cycle`](RefreshGate::cycle) before they are sent and are admitted with
//! [`admit_since`](RefreshGate::admit_since), which hands back the outcome of
//! any refresh that settled in between.
//!
//! The gate knows nothing about transports or credentials, so the state
//! machine can be exercised on its own.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use tokio::sync::oneshot;

use super::RefreshError;

/// Result of one refresh, shared by the leader and all followers.
pub type RefreshOutcome = Result<SecretString, RefreshError>;

/// Whether a refresh is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Default)]
struct GateInner {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
    /// Number of refreshes that settled with a real outcome.
    cycle: u64,
    last: Option<RefreshOutcome>,
}

/// Serializes refresh attempts.
#[derive(Default)]
pub struct RefreshGate {
    inner: Mutex<GateInner>,
}

/// What a request that saw an expired credential should do.
pub enum Admission<'a> {
    /// Perform the refresh, then settle the lease.
    Leader(RefreshLease<'a>),
    /// Wait for the refresh already in flight.
    Follower(RefreshWaiter),
    /// A refresh settled after the request was sent; use its outcome.
    Settled(RefreshOutcome),
}

impl RefreshGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes settled so far. Read it before sending a request.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.lock().cycle
    }

    /// Join the current refresh cycle, starting one if none is in flight.
    pub fn admit(&self) -> Admission<'_> {
        self.admit_inner(None)
    }

    /// Like [`admit`](Self::admit) for a request sent at `cycle`: if a refresh
    /// has settled since then, its outcome is returned instead of starting
    /// another refresh.
    pub fn admit_since(&self, cycle: u64) -> Admission<'_> {
        self.admit_inner(Some(cycle))
    }

    fn admit_inner(&self, sent_at: Option<u64>) -> Admission<'_> {
        let mut inner = self.lock();
        if !inner.refreshing
            && sent_at.is_some_and(|cycle| cycle != inner.cycle)
            && let Some(outcome) = &inner.last
        {
            tracing::debug!("Refresh already settled since request was sent");
            return Admission::Settled(outcome.clone());
        }
        if inner.refreshing {
            let (tx, rx) = oneshot::channel();
            inner.waiters.push_back(tx);
            tracing::debug!(queued = inner.waiters.len(), "Waiting for in-flight refresh");
            Admission::Follower(RefreshWaiter { rx })
        } else {
            inner.refreshing = true;
            tracing::debug!("Refresh started");
            Admission::Leader(RefreshLease {
                gate: self,
                settled: false,
            })
        }
    }

    #[must_use]
    pub fn state(&self) -> RefreshState {
        if self.lock().refreshing {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Number of followers waiting on the current refresh.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    fn release(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut inner = self.lock();
            inner.refreshing = false;
            // An abandoned refresh proved nothing; later requests may retry.
            if !matches!(outcome, Err(RefreshError::Abandoned)) {
                inner.cycle += 1;
                inner.last = Some(outcome.clone());
            }
            std::mem::take(&mut inner.waiters)
        };
        tracing::debug!(
            released = waiters.len(),
            success = outcome.is_ok(),
            "Refresh settled"
        );
        for waiter in waiters {
            // A follower whose caller went away has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The leader's hold on the gate.
///
/// Dropping the lease without settling it (the leading request was
/// cancelled) releases the followers with [`RefreshError::Abandoned`] and
/// returns the gate to idle, so the gate can never stay stuck in
/// `Refreshing`.
pub struct RefreshLease<'a> {
    gate: &'a RefreshGate,
    settled: bool,
}

impl RefreshLease<'_> {
    /// Release every follower with `outcome` and return the gate to idle.
    pub fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.gate.release(outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh abandoned before it settled");
            self.gate.release(&Err(RefreshError::Abandoned));
        }
    }
}

/// A follower's claim on the leader's outcome.
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    /// Suspend until the in-flight refresh settles.
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }
}
