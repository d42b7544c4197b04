//! Simulated CPU load that keeps an entity observably busy.

use crate::customer_actor::CustomerError;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const SLICE_MS: u64 = 100;

/// Busy-works `percentage` ms out of every 100 ms until `cancel` fires.
///
/// The busy part of each slice runs on the blocking pool, so the async workers stay free.
/// Cancellation is observed while spinning and while sleeping.
pub async fn consume(percentage: u8, cancel: CancellationToken) -> Result<(), CustomerError> {
    if !(1..=100).contains(&percentage) {
        return Err(CustomerError::InvalidLoadPercentage(percentage));
    }
    let busy = Duration::from_millis(u64::from(percentage));
    let rest = Duration::from_millis(SLICE_MS - u64::from(percentage));

    while !cancel.is_cancelled() {
        let token = cancel.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || spin(busy, &token)).await {
            debug!(error = %e, "Load slice failed");
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(rest) => {}
        }
        tokio::task::yield_now().await;
    }
    Ok(())
}

fn spin(busy: Duration, cancel: &CancellationToken) {
    let started = Instant::now();
    while started.elapsed() < busy && !cancel.is_cancelled() {
        std::hint::spin_loop();
    }
}

/// A running [`consume`] task owned by one entity.
pub struct LoadTask {
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), CustomerError>>,
}

impl LoadTask {
    /// Validates `percentage` and spawns the load.
    pub fn start(percentage: u8) -> Result<Self, CustomerError> {
        if !(1..=100).contains(&percentage) {
            return Err(CustomerError::InvalidLoadPercentage(percentage));
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(consume(percentage, cancel.clone()));
        Ok(Self { cancel, handle })
    }

    /// Cancels the load and waits for it to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        match self.handle.await {
            Ok(Ok(())) => debug!("Load stopped"),
            Ok(Err(e)) => debug!(error = %e, "Load exited with error"),
            Err(e) => debug!(error = %e, "Load task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_out_of_range_percentage() {
        for percentage in [0u8, 101, 255] {
            let result = consume(percentage, CancellationToken::new()).await;
            assert_eq!(result, Err(CustomerError::InvalidLoadPercentage(percentage)));
            assert!(LoadTask::start(percentage).is_err());
        }
    }

    #[tokio::test]
    async fn test_returns_once_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(consume(10, cancel).await, Ok(()));
    }

    #[tokio::test]
    async fn test_load_leaves_the_runtime_responsive() {
        let load = LoadTask::start(90).unwrap();
        tokio::task::yield_now().await;

        for _ in 0..5 {
            let started = Instant::now();
            tokio::time::sleep(Duration::from_millis(1)).await;
            assert!(started.elapsed() < Duration::from_millis(50));
        }

        tokio::time::timeout(Duration::from_secs(1), load.stop())
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_joins_the_task() {
        let load = LoadTask::start(5).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::time::timeout(Duration::from_secs(1), load.stop())
            .await
            .unwrap();
    }
}
