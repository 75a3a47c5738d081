// This file is part of drep-indexer.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use log::debug;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

/// Errors which may succeed when retried, e.g. because of rate limiting or timeouts.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry policy with exponential backoff: the n-th retry (starting at zero) waits
/// `initial_backoff * 2^n`, i.e. 1s, 2s, 4s for the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,

    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// A policy which never retries.
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// The backoff before the given retry, starting at zero.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry))
    }

    /// Run the given operation, retrying it as long as it fails with a retryable error and the
    /// maximum number of retries is not yet reached. The last error is returned as is.
    pub async fn retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retry = 0;

        loop {
            match operation().await {
                Err(error) if error.is_retryable() && retry < self.max_retries => {
                    let backoff = self.backoff(retry);
                    debug!(retry, backoff:?; "retrying after retryable error");

                    sleep(backoff).await;
                    retry += 1;
                }

                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use crate::retry::{RetryPolicy, Retryable};
    use assert_matches::assert_matches;
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };
    use tokio::time::Instant;

    #[derive(Debug, PartialEq, Eq)]
    struct TestError {
        retryable: bool,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[test]
    fn test_backoff() {
        let policy = RetryPolicy::default();
        let backoffs = (0..3).map(|n| policy.backoff(n)).collect::<Vec<_>>();
        assert_eq!(
            backoffs,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let attempts_ref = &attempts;
        let result = policy
            .retry(|| async move {
                attempts_ref.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError { retryable: true })
            })
            .await;

        assert_matches!(result, Err(TestError { retryable: true }));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let attempts_ref = &attempts;
        let result = policy
            .retry(|| async move {
                let attempt = attempts_ref.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(TestError { retryable: true })
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_not_retryable() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let attempts_ref = &attempts;
        let result = policy
            .retry(|| async move {
                attempts_ref.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError { retryable: false })
            })
            .await;

        assert_matches!(result, Err(TestError { retryable: false }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
