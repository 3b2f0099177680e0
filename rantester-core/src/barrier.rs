//! Counter-based join barrier.
//!
//! Every unit of concurrent work (gNB task, UE actor) holds a [`BarrierUnit`]
//! for its whole lifetime. Dropping the unit releases it, so a task that
//! panics or returns early still joins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    outstanding: AtomicUsize,
    registered: AtomicUsize,
    notify: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct JoinBarrier {
    inner: Arc<Inner>,
}

impl JoinBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one unit of work.
    pub fn enter(&self) -> BarrierUnit {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        self.inner.registered.fetch_add(1, Ordering::Relaxed);
        BarrierUnit {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Units registered but not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Units ever registered.
    pub fn total_registered(&self) -> usize {
        self.inner.registered.load(Ordering::Relaxed)
    }

    /// Blocks until every registered unit has been released.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One registered unit; released on drop.
#[derive(Debug)]
pub struct BarrierUnit {
    inner: Arc<Inner>,
}

impl Drop for BarrierUnit {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn empty_barrier_does_not_block() {
        JoinBarrier::new().wait().await;
    }

    #[tokio::test]
    async fn waits_for_every_unit() {
        let barrier = JoinBarrier::new();
        let units: Vec<_> = (0..4).map(|_| barrier.enter()).collect();
        assert_eq!(barrier.outstanding(), 4);

        for (i, unit) in units.into_iter().enumerate() {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5 * i as u64)).await;
                drop(unit);
            });
        }

        tokio::time::timeout(Duration::from_secs(5), barrier.wait())
            .await
            .expect("barrier should release");
        assert_eq!(barrier.outstanding(), 0);
        assert_eq!(barrier.total_registered(), 4);
    }

    #[tokio::test]
    async fn panicking_task_still_releases() {
        let barrier = JoinBarrier::new();
        let unit = barrier.enter();
        let task = tokio::spawn(async move {
            let _unit = unit;
            panic!("actor crashed");
        });
        assert!(task.await.is_err());
        barrier.wait().await;
    }
}
