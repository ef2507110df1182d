//! Single-flight coordination of session refreshes.
//!
//! The first caller that needs a new access token becomes the leader and runs
//! the refresh. Callers arriving while it is in flight park a one-shot
//! continuation in a FIFO queue. When the leader settles, the status returns to
//! `Idle` and every parked continuation receives the same outcome, all under
//! one lock, so no caller observes `Idle` with undelivered continuations.
//! A leader dropped mid-refresh hands the refresh over to the callers it left behind.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::errors::RefreshError;

type Outcome = Result<String, RefreshError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Idle,
    Refreshing,
}

/// How a caller took part in a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Ran the refresh call itself.
    Leader,
    /// Waited on a refresh another caller was already running.
    Queued,
}

/// The outcome of [`RefreshCoordinator::obtain`].
#[derive(Debug)]
pub struct Renewal {
    pub outcome: Outcome,
    pub role: Role,
}

struct State {
    status: RefreshStatus,
    queue: Vec<oneshot::Sender<Outcome>>,
}

/// Owns the refresh status and the pending queue of one client.
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        RefreshCoordinator {
            state: Mutex::new(State {
                status: RefreshStatus::Idle,
                queue: Vec::new(),
            }),
        }
    }

    pub fn status(&self) -> RefreshStatus {
        self.lock().status
    }

    /// Number of callers parked behind the refresh in flight.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Gets a fresh access token: runs `refresh` if no refresh is in flight,
    /// otherwise waits for the one that is.
    ///
    /// If the leader is dropped before it settles, its waiters are released
    /// without an outcome and the first of them to re-enter runs `refresh` itself.
    pub async fn obtain<F, Fut>(&self, refresh: F) -> Renewal
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        loop {
            let parked = {
                let mut state = self.lock();
                match state.status {
                    RefreshStatus::Refreshing => {
                        let (sender, receiver) = oneshot::channel();
                        state.queue.push(sender);
                        Some(receiver)
                    }
                    RefreshStatus::Idle => {
                        state.status = RefreshStatus::Refreshing;
                        None
                    }
                }
            };

            let Some(receiver) = parked else {
                break;
            };
            // A dropped sender means the leader went away mid-flight.
            if let Ok(outcome) = receiver.await {
                return Renewal {
                    outcome,
                    role: Role::Queued,
                };
            }
        }

        let settle = Settle {
            coordinator: self,
            settled: false,
        };
        let outcome = refresh().await;
        settle.finish(&outcome);
        Renewal {
            outcome,
            role: Role::Leader,
        }
    }

    /// Returns to `Idle` and hands `outcome` to every parked caller, in arrival order.
    fn settle(&self, outcome: &Outcome) {
        let mut state = self.lock();
        state.status = RefreshStatus::Idle;
        for waiter in state.queue.drain(..) {
            // The receiving caller may itself have been dropped; nothing to deliver then.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Returns to `Idle` and drops every parked sender, waking the callers to retry.
    fn abandon(&self) {
        let mut state = self.lock();
        state.status = RefreshStatus::Idle;
        state.queue.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Critical sections contain no panicking code, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the coordinator even if the leader's future is dropped mid-refresh.
struct Settle<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Settle<'_> {
    fn finish(mut self, outcome: &Outcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    async fn wait_for_pending(coordinator: &RefreshCoordinator, n: usize) {
        while coordinator.pending() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_leader_runs_refresh_and_returns_to_idle() {
        let coordinator = RefreshCoordinator::new();
        let renewal = coordinator
            .obtain(|| async { Ok("T2".to_string()) })
            .await;

        assert_eq!(renewal.role, Role::Leader);
        assert_eq!(renewal.outcome, Ok("T2".to_string()));
        assert_eq!(coordinator.status(), RefreshStatus::Idle);
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test]
    async fn test_waiters_share_one_refresh_in_fifo_order() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));

        let leader = {
            let coordinator = coordinator.clone();
            let release = release.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                coordinator
                    .obtain(|| async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        release.notified().await;
                        Ok("T3".to_string())
                    })
                    .await
            })
        };
        while coordinator.status() != RefreshStatus::Refreshing {
            tokio::task::yield_now().await;
        }

        let mut waiters = Vec::new();
        for i in 0..3 {
            let waiter_coordinator = coordinator.clone();
            let calls = calls.clone();
            let order = order.clone();
            waiters.push(tokio::spawn(async move {
                let renewal = waiter_coordinator
                    .obtain(|| async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok("unexpected".to_string())
                    })
                    .await;
                order.lock().unwrap().push(i);
                renewal
            }));
            wait_for_pending(&coordinator, i + 1).await;
        }

        release.notify_one();
        assert_eq!(leader.await.unwrap().outcome, Ok("T3".to_string()));
        for waiter in waiters {
            let renewal = waiter.await.unwrap();
            assert_eq!(renewal.role, Role::Queued);
            assert_eq!(renewal.outcome, Ok("T3".to_string()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(coordinator.status(), RefreshStatus::Idle);
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let release = Arc::new(Notify::new());

        let leader = {
            let coordinator = coordinator.clone();
            let release = release.clone();
            tokio::spawn(async move {
                coordinator
                    .obtain(|| async {
                        release.notified().await;
                        Err(RefreshError::Rejected { status: 500 })
                    })
                    .await
            })
        };
        while coordinator.status() != RefreshStatus::Refreshing {
            tokio::task::yield_now().await;
        }
        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .obtain(|| async { Ok("unexpected".to_string()) })
                    .await
            })
        };
        wait_for_pending(&coordinator, 1).await;

        release.notify_one();
        let expected = Err(RefreshError::Rejected { status: 500 });
        assert_eq!(leader.await.unwrap().outcome, expected);
        assert_eq!(waiter.await.unwrap().outcome, expected);
        assert_eq!(coordinator.status(), RefreshStatus::Idle);
    }

    #[tokio::test]
    async fn test_dropped_leader_hands_refresh_to_first_waiter() {
        let coordinator = Arc::new(RefreshCoordinator::new());

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .obtain(|| std::future::pending::<Outcome>())
                    .await
            })
        };
        while coordinator.status() != RefreshStatus::Refreshing {
            tokio::task::yield_now().await;
        }

        let release = Arc::new(Notify::new());
        let mut waiters = Vec::new();
        for i in 0..2 {
            let waiter_coordinator = coordinator.clone();
            let release = release.clone();
            waiters.push(tokio::spawn(async move {
                waiter_coordinator
                    .obtain(|| async {
                        release.notified().await;
                        Ok("T4".to_string())
                    })
                    .await
            }));
            wait_for_pending(&coordinator, i + 1).await;
        }

        leader.abort();
        // One released waiter takes over; the other parks behind it again.
        while !(coordinator.status() == RefreshStatus::Refreshing && coordinator.pending() == 1) {
            tokio::task::yield_now().await;
        }
        release.notify_one();

        let mut roles = Vec::new();
        for waiter in waiters {
            let renewal = waiter.await.unwrap();
            assert_eq!(renewal.outcome, Ok("T4".to_string()));
            roles.push(renewal.role);
        }

        assert_eq!(roles.iter().filter(|r| **r == Role::Leader).count(), 1);
        assert_eq!(coordinator.status(), RefreshStatus::Idle);
        assert_eq!(coordinator.pending(), 0);
    }
}
