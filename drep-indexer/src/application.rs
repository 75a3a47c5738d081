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

mod backfill;
pub mod cache;
mod metrics;
mod rationale;
mod summaries;
mod sync;
#[cfg(all(test, feature = "standalone", not(feature = "cloud")))]
mod testing;

pub use sync::*;

use crate::{
    application::metrics::Metrics,
    domain::{
        RationaleFetcher, RunType, ScoreWeights, Summarizer, storage::Storage, upstream::Upstream,
    },
};
use log::{error, info, warn};
use serde::Deserialize;
use std::{num::NonZeroUsize, pin::pin, time::Duration};
use tokio::{
    select,
    signal::unix::Signal,
    time::{MissedTickBehavior, interval},
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Interval of fast syncs (stages 1 to 4).
    #[serde(with = "humantime_serde")]
    pub fast_interval: Duration,

    /// Interval of full syncs (stages 1 to 7).
    #[serde(with = "humantime_serde")]
    pub full_interval: Duration,

    /// Maximum number of delegate IDs per bulk upstream request.
    pub fetch_batch_size: NonZeroUsize,

    /// Number of rows per write transaction.
    pub write_batch_size: NonZeroUsize,

    /// Maximum number of concurrent per-delegate upstream requests.
    pub concurrency: NonZeroUsize,

    #[serde(rename = "backfill")]
    pub backfill_config: BackfillConfig,

    /// Maximum number of external rationales resolved per full sync.
    pub rationale_limit: usize,

    pub rationale_concurrency: NonZeroUsize,

    /// Maximum number of rationales and of proposals summarized per full sync.
    pub summary_limit: usize,

    #[serde(default)]
    pub score_weights: ScoreWeights,

    /// Persisted delegates older than this are served, but flagged as stale.
    #[serde(with = "humantime_serde")]
    pub freshness_window: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillConfig {
    /// Maximum number of concurrent vote power updates per delegate.
    pub concurrency: NonZeroUsize,

    /// Pause between two delegates to pace upstream requests.
    #[serde(with = "humantime_serde")]
    pub delegate_delay: Duration,
}

/// Run fast and full syncs at their configured intervals until SIGTERM is received. A full sync
/// runs right away and restarts the fast interval. A running sync is never interrupted, such that
/// it always records its sync run; SIGTERM is handled once it has finished.
pub async fn run(
    config: Config,
    upstream: impl Upstream,
    storage: impl Storage,
    fetcher: impl RationaleFetcher,
    summarizer: impl Summarizer,
    mut sigterm: Signal,
) -> anyhow::Result<()> {
    let shutdown = async move {
        sigterm.recv().await;
        warn!("SIGTERM received");
    };

    schedule(config, upstream, storage, fetcher, summarizer, shutdown).await;

    Ok(())
}

async fn schedule(
    config: Config,
    upstream: impl Upstream,
    storage: impl Storage,
    fetcher: impl RationaleFetcher,
    summarizer: impl Summarizer,
    shutdown: impl Future<Output = ()>,
) {
    let metrics = Metrics::default();
    let mut shutdown = pin!(shutdown);

    let mut full_interval = interval(config.full_interval);
    full_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut fast_interval = interval(config.fast_interval);
    fast_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        fast_interval:? = config.fast_interval,
        full_interval:? = config.full_interval;
        "starting scheduler"
    );

    loop {
        let run_type = select! {
            biased;

            _ = &mut shutdown => {
                info!("stopping scheduler");
                return;
            }

            _ = full_interval.tick() => RunType::Full,

            _ = fast_interval.tick() => RunType::Fast,
        };

        let result = sync(
            run_type,
            &config,
            &upstream,
            &storage,
            &fetcher,
            &summarizer,
            &metrics,
        )
        .await;
        if let Err(error) = result {
            error!(error:?, run_type:%; "cannot complete sync");
        }

        if run_type == RunType::Full {
            fast_interval.reset();
        }
    }
}
