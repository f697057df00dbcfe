//! Mock upstream provider servers for integration tests

// Not every test binary uses every helper.
#![allow(dead_code)]

pub mod gemini_mock;

use std::future::Future;
use std::time::Duration;

pub use gemini_mock::{MockGemini, MockGeminiState, SetupBehavior};

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Await `future`, failing the test if it takes longer than `timeout`.
pub async fn within<F: Future>(timeout: Duration, future: F) -> F::Output {
    tokio::time::timeout(timeout, future)
        .await
        .expect("operation timed out")
}
