//! Bounded, paced admission of outbound catalog requests.
//!
//! At most `limit` requests hold a slot at once. Waiters are admitted in
//! arrival order (tokio's semaphore is fair). After admission every request
//! additionally waits until `spacing` has passed since the previous admission.
//!
//! Slots are released when the [`ThrottlePermit`] is dropped, which covers
//! early returns, errors and cancelled futures alike. After [`RequestThrottler::close`]
//! waiting and future requests are turned away with an error.

use shelfcheck_core::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// An admitted request slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct ThrottlePermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug)]
pub struct RequestThrottler {
    semaphore: Arc<Semaphore>,
    limit: usize,
    spacing: Duration,
    last_request: Mutex<Instant>,
}

impl RequestThrottler {
    /// `limit` is raised to 1 when zero.
    pub fn new(limit: usize, spacing: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            spacing,
            last_request: Mutex::new(Instant::now().checked_sub(spacing).unwrap_or_else(Instant::now)),
        }
    }

    /// Wait for a free slot, then for the inter-request spacing.
    ///
    /// # Errors
    ///
    /// Returns `TRANSPORT_ERROR` once the throttler has been closed.
    pub async fn acquire(&self) -> Result<ThrottlePermit, Error> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::TransportError("request throttle closed".into()))?;

        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.spacing {
            tokio::time::sleep(self.spacing - elapsed).await;
        }
        *last = Instant::now();
        drop(last);

        tracing::trace!(in_flight = self.in_flight(), "throttle slot acquired");
        Ok(ThrottlePermit { _permit: permit })
    }

    /// Stop admitting requests. Held permits stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let throttler = Arc::new(RequestThrottler::new(2, Duration::ZERO));
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (throttler, current, peak) = (throttler.clone(), current.clone(), peak.clone());
            handles.push(tokio::spawn(async move {
                let _permit = throttler.acquire().await.unwrap();
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(15)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(throttler.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fifo_admission() {
        let throttler = Arc::new(RequestThrottler::new(1, Duration::ZERO));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let held = throttler.acquire().await.unwrap();

        let mut handles = Vec::new();
        for id in 0..4 {
            let (throttler, order) = (throttler.clone(), order.clone());
            handles.push(tokio::spawn(async move {
                let _permit = throttler.acquire().await.unwrap();
                order.lock().unwrap().push(id);
            }));
            // let the task queue up before the next one arrives
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_release_on_error() {
        let throttler = RequestThrottler::new(1, Duration::ZERO);

        async fn failing(throttler: &RequestThrottler) -> Result<(), &'static str> {
            let _permit = throttler.acquire().await.unwrap();
            Err("boom")
        }

        assert!(failing(&throttler).await.is_err());
        assert_eq!(throttler.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_release_on_cancel() {
        let throttler = RequestThrottler::new(1, Duration::ZERO);

        let timed_out = tokio::time::timeout(Duration::from_millis(10), async {
            let _permit = throttler.acquire().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;

        assert!(timed_out.is_err());
        assert_eq!(throttler.in_flight(), 0);
        tokio::time::timeout(Duration::from_millis(100), throttler.acquire())
            .await
            .expect("slot should be free")
            .unwrap();
    }

    #[tokio::test]
    async fn test_spacing_between_requests() {
        let throttler = RequestThrottler::new(4, Duration::from_millis(40));
        let start = Instant::now();

        for _ in 0..3 {
            drop(throttler.acquire().await.unwrap());
        }

        // first admission is immediate, the next two wait
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_closed_throttler_rejects_waiters() {
        let throttler = Arc::new(RequestThrottler::new(1, Duration::ZERO));
        let held = throttler.acquire().await.unwrap();

        let waiter = {
            let throttler = throttler.clone();
            tokio::spawn(async move { throttler.acquire().await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        throttler.close();
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err.code(), "TRANSPORT_ERROR");
        assert!(throttler.acquire().await.is_err());
        assert!(throttler.is_closed());

        drop(held);
        assert_eq!(throttler.in_flight(), 0);
    }

    #[test]
    fn test_zero_limit_raised() {
        let throttler = RequestThrottler::new(0, Duration::ZERO);
        assert_eq!(throttler.limit(), 1);
    }
}
