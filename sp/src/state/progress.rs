//! Client-visible progress estimate
//!
//! Progress is a function of elapsed time only. It rises quickly at first,
//! flattens out as `expected` is approached, and never reaches 100 on its own.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::debug;

use super::StatusHandle;
use super::machine::MAX_IN_FLIGHT_PROGRESS;
use crate::domain::GenerationStatus;

/// Ease-out estimate: `99 * (1 - e^(-2t/expected))`
pub fn estimate_progress(elapsed: Duration, expected: Duration) -> u8 {
    let max = f64::from(MAX_IN_FLIGHT_PROGRESS);
    if expected.is_zero() {
        return MAX_IN_FLIGHT_PROGRESS;
    }
    let ratio = elapsed.as_secs_f64() / expected.as_secs_f64();
    let estimate = max * (1.0 - (-2.0 * ratio).exp());
    estimate.clamp(0.0, max).floor() as u8
}

/// Advance progress every `tick` until the request leaves `generating`
pub fn spawn_progress_ticker(handle: StatusHandle, tick: Duration, expected: Duration) -> JoinHandle<()> {
    debug!(tick_ms = tick.as_millis() as u64, "spawn_progress_ticker: called");
    let started = Instant::now();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let progress = estimate_progress(started.elapsed(), expected);
            match handle.update_progress(u32::from(progress)).await {
                Ok(GenerationStatus::Generating) => {}
                Ok(status) => {
                    debug!(%status, "progress ticker: request settled, stopping");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "progress ticker: tracker gone, stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::sample_survey;
    use crate::state::MemorySnapshotStore;
    use proptest::prelude::*;

    #[test]
    fn test_estimate_curve() {
        let expected = Duration::from_secs(60);
        assert_eq!(estimate_progress(Duration::ZERO, expected), 0);
        assert_eq!(estimate_progress(Duration::from_secs(30), expected), 62);
        assert_eq!(estimate_progress(Duration::from_secs(60), expected), 85);
        assert_eq!(estimate_progress(Duration::from_secs(3600), expected), 99);
        assert_eq!(estimate_progress(Duration::from_secs(5), Duration::ZERO), 99);
    }

    proptest! {
        #[test]
        fn prop_estimate_is_monotonic_and_capped(a in 0u64..10_000_000, b in 0u64..10_000_000, expected in 1u64..1_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let expected = Duration::from_millis(expected);
            let p_lo = estimate_progress(Duration::from_millis(lo), expected);
            let p_hi = estimate_progress(Duration::from_millis(hi), expected);
            prop_assert!(p_lo <= p_hi);
            prop_assert!(p_hi <= 99);
        }
    }

    #[tokio::test]
    async fn test_ticker_advances_then_stops_on_terminal_state() {
        let handle = StatusHandle::spawn(Box::new(MemorySnapshotStore::new()), Duration::from_secs(3600)).unwrap();
        handle.start(sample_survey()).await.unwrap();

        let ticker = spawn_progress_ticker(handle.clone(), Duration::from_millis(5), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(60)).await;
        let mid = handle.view().await.unwrap().progress;
        assert!(mid > 0 && mid <= 99, "progress was {mid}");

        handle.complete("plan").await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), ticker).await.unwrap().unwrap();
        assert_eq!(handle.view().await.unwrap().progress, 100);
    }
}
