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

use crate::{
    application::BackfillConfig,
    domain::{BackfillOutcome, PowerSource, resolve_power, storage::Storage, upstream::Upstream},
};
use anyhow::Context;
use drep_common::error::StdErrorExt;
use fastrace::trace;
use futures::{StreamExt, stream};
use log::{debug, info, warn};
use tokio::time::sleep;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Resolved {
    exact: usize,
    nearest: usize,
    unresolved: usize,
}

/// Resolve the voting power of persisted votes which have none or only an approximated one,
/// delegate by delegate, pausing between delegates.
#[trace]
pub async fn backfill(
    config: &BackfillConfig,
    upstream: &impl Upstream,
    storage: &impl Storage,
) -> BackfillOutcome {
    let mut outcome = BackfillOutcome::default();

    let drep_ids = match storage.get_unresolved_power_drep_ids().await {
        Ok(drep_ids) => drep_ids,

        Err(error) => {
            warn!(error:% = error.as_chain(); "cannot get delegates with unresolved vote power");
            outcome.delegates.fail(1, error.as_chain());
            return outcome;
        }
    };
    debug!(delegates = drep_ids.len(); "backfilling vote power");

    for (n, drep_id) in drep_ids.iter().enumerate() {
        if n > 0 {
            sleep(config.delegate_delay).await;
        }

        match backfill_delegate(drep_id, config.concurrency.get(), upstream, storage).await {
            Ok(resolved) => {
                outcome.delegates.succeed(1);
                outcome.resolved_exact += resolved.exact;
                outcome.resolved_nearest += resolved.nearest;
                outcome.unresolved += resolved.unresolved;
            }

            Err(error) => {
                warn!(drep_id, error:?; "cannot backfill vote power");
                outcome.delegates.fail(1, format!("{drep_id}: {error:#}"));
            }
        }
    }

    info!(
        delegates = outcome.delegates.succeeded,
        failed = outcome.delegates.failed,
        exact = outcome.resolved_exact,
        nearest = outcome.resolved_nearest,
        unresolved = outcome.unresolved;
        "vote power backfilled"
    );

    outcome
}

#[trace(properties = { "drep_id": "{drep_id}" })]
async fn backfill_delegate(
    drep_id: &str,
    concurrency: usize,
    upstream: &impl Upstream,
    storage: &impl Storage,
) -> anyhow::Result<Resolved> {
    let history = upstream
        .fetch_power_history(drep_id)
        .await
        .context("fetch power history")?;
    storage
        .save_power_snapshots(&history)
        .await
        .context("save power snapshots")?;

    // Also includes the snapshots recorded by previous syncs.
    let snapshots = storage
        .get_power_snapshots(drep_id)
        .await
        .context("get power snapshots")?;
    let votes = storage
        .get_unresolved_power_votes(drep_id)
        .await
        .context("get votes with unresolved power")?;

    let resolutions = resolve_power(&votes, &snapshots);
    let missed = votes
        .iter()
        .filter(|vote| {
            vote.source.is_none()
                && !resolutions
                    .iter()
                    .any(|resolution| resolution.tx_hash == vote.tx_hash)
        })
        .map(|vote| vote.tx_hash.clone())
        .collect::<Vec<_>>();

    let results = stream::iter(&resolutions)
        .map(move |resolution| async move {
            storage
                .save_vote_power(resolution)
                .await
                .map(|updated| updated.then_some(resolution.power.source))
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

    if !missed.is_empty() {
        debug!(drep_id, missed = missed.len(); "no voting power history for votes");
        storage
            .save_power_missed(&missed)
            .await
            .context("save missed vote power")?;
    }

    let mut resolved = Resolved {
        unresolved: missed.len(),
        ..Default::default()
    };
    for result in results {
        match result.context("save vote power")? {
            Some(PowerSource::Exact) => resolved.exact += 1,
            Some(PowerSource::Nearest) => resolved.nearest += 1,
            None => {}
        }
    }

    Ok(resolved)
}

#[cfg(all(test, feature = "standalone", not(feature = "cloud")))]
mod tests {
    use crate::{
        application::{
            backfill::backfill,
            testing::{MockUpstream, config, record, storage, vote},
        },
        domain::{Decision, PowerSnapshot, PowerSource, storage::Storage as _},
    };
    use std::error::Error as StdError;

    #[tokio::test]
    async fn test_backfill() -> Result<(), Box<dyn StdError>> {
        let (storage, _temp_dir) = storage().await?;

        let votes = [
            vote("tx1", "drep1", 0, Decision::Yes, 498),
            vote("tx2", "drep1", 1, Decision::No, 500),
            vote("tx3", "drep1", 2, Decision::Yes, 503),
            vote("tx4", "drep2", 0, Decision::Yes, 500),
        ];
        storage.save_votes(&votes).await?;

        // Only known from a previous sync.
        storage
            .save_power_snapshots(&[PowerSnapshot {
                drep_id: "drep1".to_owned(),
                epoch: 503,
                amount: 30,
            }])
            .await?;

        let upstream = MockUpstream::new(503)
            .with_delegate(record("drep1", 30), vec![])
            .with_delegate(record("drep2", 10), vec![])
            .with_power_history("drep1", &[(497, 10), (499, 20)]);

        let outcome = backfill(&config().backfill_config, &upstream, &storage).await;
        assert_eq!(outcome.delegates.succeeded, 2);
        assert_eq!(outcome.resolved_exact, 1);
        assert_eq!(outcome.resolved_nearest, 2);
        assert_eq!(outcome.unresolved, 1);

        let power = storage
            .get_votes("drep1")
            .await?
            .into_iter()
            .map(|vote| vote.power.map(|power| (power.amount, power.source)))
            .collect::<Vec<_>>();
        assert_eq!(power, [
            // Equidistant to 497 and 499, the earlier epoch wins.
            Some((10, PowerSource::Nearest)),
            Some((20, PowerSource::Nearest)),
            Some((30, PowerSource::Exact)),
        ]);

        // No history at all: stays unresolved.
        let votes = storage.get_votes("drep2").await?;
        assert_eq!(votes[0].power, None);

        // Another pass only upgrades to exact once a matching snapshot shows up. drep2 is not
        // backfilled again.
        let upstream = upstream.with_power_history("drep1", &[(497, 10), (499, 20), (500, 25)]);
        let outcome = backfill(&config().backfill_config, &upstream, &storage).await;
        assert_eq!(outcome.delegates.succeeded, 1);
        assert_eq!(outcome.resolved_exact, 1);
        assert_eq!(outcome.resolved_nearest, 0);
        assert_eq!(outcome.unresolved, 0);

        let votes = storage.get_votes("drep1").await?;
        assert_eq!(
            votes[1].power.map(|power| (power.amount, power.source)),
            Some((25, PowerSource::Exact))
        );

        Ok(())
    }
}
