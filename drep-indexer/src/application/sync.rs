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
    application::{Config, backfill, metrics::Metrics, rationale, summaries},
    domain::{
        Delegate, DelegateInput, EnrichmentContext, PowerSnapshot, Proposal, ProposalRef,
        RationaleFetcher, RunType, ScoreHistoryEntry, ScoreWeights, Summarizer, SyncCounters,
        SyncRun, Vote, enrich_all, storage::Storage, upstream::Upstream,
    },
};
use anyhow::Context;
use chrono::Utc;
use drep_common::{batch::BatchOutcome, error::StdErrorExt};
use fastrace::trace;
use futures::{StreamExt, stream};
use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::HashMap;
use tokio::join;

/// Run a sync of the given type and record it as exactly one sync run, also if the upstream
/// health check fails. Only failing to record the sync run is an error.
#[trace(properties = { "run_type": "{run_type}" })]
pub async fn sync(
    run_type: RunType,
    config: &Config,
    upstream: &impl Upstream,
    storage: &impl Storage,
    fetcher: &impl RationaleFetcher,
    summarizer: &impl Summarizer,
    metrics: &Metrics,
) -> anyhow::Result<SyncRun> {
    info!(run_type:%; "starting sync");

    let started_at = Utc::now();
    let mut counters = SyncCounters::default();
    let result = run_stages(
        run_type,
        config,
        upstream,
        storage,
        fetcher,
        summarizer,
        &mut counters,
    )
    .await;
    let finished_at = Utc::now();

    let sync_run = SyncRun {
        run_type,
        started_at,
        finished_at,
        success: result.is_ok(),
        error: result.err().map(|error| format!("{error:#}")),
        counters,
    };

    let id = storage
        .save_sync_run(&sync_run)
        .await
        .context("save sync run")?;
    metrics.record_sync_run(&sync_run);

    match &sync_run.error {
        None => info!(
            id,
            run_type:%,
            duration_ms = sync_run.duration_ms(),
            delegates = sync_run.counters.delegates.succeeded,
            votes = sync_run.counters.votes.succeeded,
            complete = sync_run.counters.is_complete();
            "sync completed"
        ),

        Some(error) => warn!(id, run_type:%, error; "sync aborted"),
    }

    Ok(sync_run)
}

async fn run_stages(
    run_type: RunType,
    config: &Config,
    upstream: &impl Upstream,
    storage: &impl Storage,
    fetcher: &impl RationaleFetcher,
    summarizer: &impl Summarizer,
    counters: &mut SyncCounters,
) -> anyhow::Result<()> {
    let current_epoch = upstream
        .health_check()
        .await
        .context("upstream health check")?;
    counters.current_epoch = Some(current_epoch);

    // Stage 1: proposals and delegates with their votes.
    let ((proposals, fresh_proposals), inputs) = join!(
        fetch_proposals(upstream, storage),
        fetch_delegates(config, upstream, counters),
    );
    counters.proposals_fetched = proposals.len();

    // Stage 2: enrichment against the run-wide baseline.
    let votes = inputs
        .iter()
        .flat_map(|input| &input.votes)
        .unique_by(|vote| &vote.tx_hash)
        .cloned()
        .collect::<Vec<_>>();
    let proposals = index_proposals(proposals);
    let delegates = enrich(
        inputs,
        &proposals,
        Some(current_epoch),
        config.score_weights,
        storage,
    )
    .await;

    // Stage 3: upserts in batches, each counted on its own.
    let batch_size = config.write_batch_size.get();
    if fresh_proposals {
        let proposals = proposals.into_values().collect::<Vec<_>>();
        counters.proposals =
            write_batches(&proposals, batch_size, |batch| storage.save_proposals(batch)).await;
    }
    counters.delegates =
        write_batches(&delegates, batch_size, |batch| storage.save_delegates(batch)).await;
    counters.votes = write_batches(&votes, batch_size, |batch| storage.save_votes(batch)).await;

    // Stage 4: follow-ups depending on the persisted delegates.
    let score_history = delegates
        .iter()
        .map(ScoreHistoryEntry::for_delegate)
        .collect::<Vec<_>>();
    let power_snapshots = delegates
        .iter()
        .map(|delegate| PowerSnapshot {
            drep_id: delegate.id.clone(),
            epoch: current_epoch,
            amount: delegate.voting_power,
        })
        .collect::<Vec<_>>();

    let (alignment, score_history, delegator_counts, power_snapshots) = join!(
        write_batches(&delegates, batch_size, |batch| storage.save_alignment(batch)),
        write_batches(&score_history, batch_size, |batch| {
            storage.save_score_history(batch)
        }),
        refresh_delegator_counts(&delegates, config, upstream, storage),
        write_batches(&power_snapshots, batch_size, |batch| {
            storage.save_power_snapshots(batch)
        }),
    );
    counters.alignment = alignment;
    counters.score_history = score_history;
    counters.delegator_counts = delegator_counts;
    counters.power_snapshots = power_snapshots;

    if run_type == RunType::Full {
        // Stage 5.
        let backfill = backfill::backfill(&config.backfill_config, upstream, storage).await;
        counters.backfill = Some(backfill);

        // Stage 6.
        let rationales = rationale::resolve_rationales(
            config.rationale_limit,
            config.rationale_concurrency.get(),
            fetcher,
            storage,
        )
        .await;
        counters.rationales = Some(rationales);

        // Stage 7.
        if summarizer.is_enabled() {
            let summaries = summaries::summarize(config.summary_limit, summarizer, storage).await;
            counters.summaries = Some(summaries);
        } else {
            debug!("summarizer disabled, skipping summaries");
        }
    }

    Ok(())
}

/// Fetch and classify all proposals, falling back to the persisted ones if the upstream fails.
/// The flag tells whether the proposals are freshly fetched.
#[trace]
pub(super) async fn fetch_proposals(
    upstream: &impl Upstream,
    storage: &impl Storage,
) -> (Vec<Proposal>, bool) {
    match upstream.fetch_proposals().await {
        Ok(proposals) => (proposals.into_iter().map(Proposal::from).collect(), true),

        Err(error) => {
            warn!(error:% = error.as_chain(); "cannot fetch proposals, using persisted ones");

            let proposals = storage.get_proposals().await.unwrap_or_else(|error| {
                warn!(error:% = error.as_chain(); "cannot get persisted proposals");
                vec![]
            });

            (proposals, false)
        }
    }
}

/// Fetch all registered delegates with their votes. A delegate whose votes cannot be fetched is
/// skipped, hence keeps its persisted state.
#[trace]
pub(super) async fn fetch_delegates(
    config: &Config,
    upstream: &impl Upstream,
    counters: &mut SyncCounters,
) -> Vec<DelegateInput> {
    let drep_ids = match upstream.fetch_drep_ids().await {
        Ok(drep_ids) => drep_ids,

        Err(error) => {
            warn!(error:% = error.as_chain(); "cannot fetch delegate IDs");
            return vec![];
        }
    };
    counters.drep_ids = drep_ids.len();

    let (records, record_fetches) = upstream
        .fetch_batch(&drep_ids, config.fetch_batch_size.get())
        .await;
    if !record_fetches.is_complete() {
        warn!(failed = record_fetches.failed; "cannot fetch some delegates, skipping them");
    }
    counters.record_fetches = record_fetches;

    let results = stream::iter(records)
        .map(move |record| async move {
            let votes = upstream.fetch_votes(&record.info.id).await;
            (record, votes)
        })
        .buffer_unordered(config.concurrency.get())
        .collect::<Vec<_>>()
        .await;

    results
        .into_iter()
        .filter_map(|(record, votes)| match votes {
            Ok(votes) => {
                counters.vote_fetches.succeed(1);
                Some(DelegateInput { record, votes })
            }

            Err(error) => {
                let error = error.as_chain();
                warn!(drep_id = record.info.id, error; "cannot fetch votes, skipping delegate");
                counters
                    .vote_fetches
                    .fail(1, format!("{}: {error}", record.info.id));
                None
            }
        })
        .sorted_by(|a, b| a.record.info.id.cmp(&b.record.info.id))
        .collect()
}

pub(super) fn index_proposals(proposals: Vec<Proposal>) -> HashMap<ProposalRef, Proposal> {
    proposals
        .into_iter()
        .map(|proposal| (proposal.proposal.clone(), proposal))
        .collect()
}

/// Enrich and score all delegates, taking into account which external rationales have already
/// been resolved.
#[trace]
pub(super) async fn enrich(
    mut inputs: Vec<DelegateInput>,
    proposals: &HashMap<ProposalRef, Proposal>,
    current_epoch: Option<u32>,
    weights: ScoreWeights,
    storage: &impl Storage,
) -> Vec<Delegate> {
    let resolutions = storage
        .get_rationale_resolutions()
        .await
        .unwrap_or_else(|error| {
            warn!(error:% = error.as_chain(); "cannot get rationale resolutions");
            HashMap::new()
        });

    inputs
        .iter_mut()
        .flat_map(|input| input.votes.iter_mut())
        .for_each(|vote: &mut Vote| {
            if let Some(resolution) = resolutions.get(&vote.tx_hash) {
                vote.resolution = resolution.clone();
            }
        });

    let context = EnrichmentContext {
        current_epoch,
        proposals,
        weights,
        now: Utc::now(),
    };

    enrich_all(inputs, context)
}

/// Write the given items in batches; a failing batch is counted and does not affect others.
async fn write_batches<'a, T, F, Fut, R>(
    items: &'a [T],
    batch_size: usize,
    mut write: F,
) -> BatchOutcome
where
    F: FnMut(&'a [T]) -> Fut,
    Fut: Future<Output = Result<R, sqlx::Error>>,
{
    let mut outcome = BatchOutcome::default();

    for batch in items.chunks(batch_size.max(1)) {
        let result = write(batch).await;
        if let Err(error) = &result {
            warn!(error:% = error.as_chain(), batch_size = batch.len(); "cannot write batch");
        }
        outcome.record(batch.len(), result);
    }

    outcome
}

async fn refresh_delegator_counts(
    delegates: &[Delegate],
    config: &Config,
    upstream: &impl Upstream,
    storage: &impl Storage,
) -> BatchOutcome {
    let results = stream::iter(delegates)
        .map(move |delegate| async move {
            let count = upstream.fetch_delegator_count(&delegate.id).await;
            (delegate.id.clone(), count)
        })
        .buffer_unordered(config.concurrency.get())
        .collect::<Vec<_>>()
        .await;

    let mut outcome = BatchOutcome::default();
    let mut counts = Vec::with_capacity(results.len());
    for (drep_id, result) in results {
        match result {
            Ok(count) => counts.push((drep_id, count)),

            Err(error) => {
                debug!(drep_id, error:% = error.as_chain(); "cannot fetch delegator count");
                outcome.fail(1, format!("{drep_id}: {}", error.as_chain()));
            }
        }
    }

    outcome += write_batches(&counts, config.write_batch_size.get(), |batch| {
        storage.save_delegator_counts(batch)
    })
    .await;

    outcome
}

#[cfg(all(test, feature = "standalone", not(feature = "cloud")))]
mod tests {
    use crate::{
        application::{
            metrics::Metrics,
            sync,
            testing::{
                MockFetcher, MockSummarizer, MockUpstream, config, external_vote, record,
                storage, vote,
            },
        },
        domain::{
            Decision, Delegate, PowerSource, RationaleResolution, RunType, storage::Storage as _,
        },
    };
    use chrono::{DateTime, Utc};
    use std::error::Error as StdError;

    #[tokio::test]
    async fn test_full_sync() -> Result<(), Box<dyn StdError>> {
        let (storage, _temp_dir) = storage().await?;
        let upstream = MockUpstream::new(500)
            .with_delegate(
                record("drep1", 5_000_000),
                vec![
                    vote("tx1", "drep1", 0, Decision::Yes, 499),
                    external_vote("tx2", "drep1", 1, Decision::No, 500),
                ],
            )
            .with_delegate(record("drep2", 2_000_000), vec![vote(
                "tx3",
                "drep2",
                0,
                Decision::Abstain,
                500,
            )])
            .with_power_history("drep1", &[(499, 4_000_000)]);

        let sync_run = sync(
            RunType::Full,
            &config(),
            &upstream,
            &storage,
            &MockFetcher::resolving("a rationale long enough to count as an actual explanation"),
            &MockSummarizer::enabled(),
            &Metrics::default(),
        )
        .await?;

        assert!(sync_run.success);
        assert_eq!(sync_run.counters.current_epoch, Some(500));
        assert_eq!(sync_run.counters.drep_ids, 2);
        assert_eq!(sync_run.counters.delegates.succeeded, 2);
        assert_eq!(sync_run.counters.votes.succeeded, 3);
        assert_eq!(sync_run.counters.proposals.succeeded, 2);
        assert_eq!(sync_run.counters.delegator_counts.succeeded, 2);

        let delegates = storage.get_delegates().await?;
        assert_eq!(delegates.len(), 2);
        assert!(delegates.iter().all(|delegate| delegate.delegator_count == Some(3)));

        // Votes at epoch 499 resolve against the history, votes at 500 against the snapshot of
        // the current epoch.
        let votes = storage.get_votes("drep1").await?;
        assert!(votes.iter().all(|vote| {
            vote.power.map(|power| power.source) == Some(PowerSource::Exact)
        }));
        assert_eq!(votes[0].power.map(|power| power.amount), Some(4_000_000));
        assert_eq!(votes[1].power.map(|power| power.amount), Some(5_000_000));

        let backfill = sync_run.counters.backfill.expect("backfill outcome");
        assert_eq!(backfill.resolved_exact, 3);

        assert_eq!(
            sync_run.counters.rationales.map(|outcome| outcome.succeeded),
            Some(1)
        );
        assert_matches::assert_matches!(
            storage.get_rationale_resolutions().await?.get("tx2"),
            Some(RationaleResolution::Resolved(_))
        );

        let summaries = sync_run.counters.summaries.expect("summaries outcome");
        assert_eq!(summaries.succeeded, 1);
        assert_eq!(storage.get_coverage().await?.rationales_summarized, 1);

        let runs = storage.get_sync_runs(10).await?;
        assert_eq!(runs.len(), 1);
        assert!(runs[0].success);

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_idempotent() -> Result<(), Box<dyn StdError>> {
        let (storage, _temp_dir) = storage().await?;
        let upstream = MockUpstream::new(500)
            .with_delegate(record("drep1", 5_000_000), vec![
                vote("tx1", "drep1", 0, Decision::Yes, 499),
                vote("tx2", "drep1", 1, Decision::No, 500),
            ])
            .with_power_history("drep1", &[(499, 4_000_000)]);

        let config = config();
        let fetcher = MockFetcher::failing();
        let summarizer = MockSummarizer::disabled();
        let metrics = Metrics::default();

        sync(
            RunType::Full,
            &config,
            &upstream,
            &storage,
            &fetcher,
            &summarizer,
            &metrics,
        )
        .await?;
        let delegates = without_updated_at(storage.get_delegates().await?);
        let votes = storage.get_votes("drep1").await?;
        let snapshots = storage.get_power_snapshots("drep1").await?;
        let coverage = storage.get_coverage().await?;

        sync(
            RunType::Full,
            &config,
            &upstream,
            &storage,
            &fetcher,
            &summarizer,
            &metrics,
        )
        .await?;
        assert_eq!(without_updated_at(storage.get_delegates().await?), delegates);
        assert_eq!(storage.get_votes("drep1").await?, votes);
        assert_eq!(storage.get_power_snapshots("drep1").await?, snapshots);
        assert_eq!(storage.get_coverage().await?, coverage);

        assert_eq!(votes.len(), 2);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(delegates.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_record_batch_keeps_other_delegates() -> Result<(), Box<dyn StdError>> {
        let (storage, _temp_dir) = storage().await?;
        let upstream = MockUpstream::new(500)
            .with_delegate(record("drep1", 1_000), vec![vote(
                "tx1",
                "drep1",
                0,
                Decision::Yes,
                500,
            )])
            .with_delegate(record("drep2", 1_000), vec![vote(
                "tx2",
                "drep2",
                0,
                Decision::No,
                500,
            )])
            .failing_record("drep2");

        let sync_run = sync(
            RunType::Fast,
            &config(),
            &upstream,
            &storage,
            &MockFetcher::failing(),
            &MockSummarizer::disabled(),
            &Metrics::default(),
        )
        .await?;

        assert_eq!(sync_run.counters.record_fetches.succeeded, 1);
        assert_eq!(sync_run.counters.record_fetches.failed, 1);
        assert!(!sync_run.counters.is_complete());

        let delegates = storage.get_delegates().await?;
        assert_eq!(delegates.len(), 1);
        assert_eq!(delegates[0].id, "drep1");

        Ok(())
    }

    fn without_updated_at(delegates: Vec<Delegate>) -> Vec<Delegate> {
        delegates
            .into_iter()
            .map(|delegate| Delegate {
                updated_at: DateTime::<Utc>::UNIX_EPOCH,
                ..delegate
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fast_sync_skips_follow_up_stages() -> Result<(), Box<dyn StdError>> {
        let (storage, _temp_dir) = storage().await?;
        let upstream = MockUpstream::new(500).with_delegate(record("drep1", 1_000), vec![
            external_vote("tx1", "drep1", 0, Decision::Yes, 500),
        ]);

        let sync_run = sync(
            RunType::Fast,
            &config(),
            &upstream,
            &storage,
            &MockFetcher::failing(),
            &MockSummarizer::enabled(),
            &Metrics::default(),
        )
        .await?;

        assert!(sync_run.success);
        assert!(sync_run.counters.backfill.is_none());
        assert!(sync_run.counters.rationales.is_none());
        assert!(sync_run.counters.summaries.is_none());
        assert_eq!(storage.get_pending_rationales(10).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_health_check_keeps_persisted_data() -> Result<(), Box<dyn StdError>> {
        let (storage, _temp_dir) = storage().await?;
        let upstream = MockUpstream::new(500).with_delegate(record("drep1", 1_000), vec![
            vote("tx1", "drep1", 0, Decision::Yes, 500),
        ]);

        let first = sync(
            RunType::Fast,
            &config(),
            &upstream,
            &storage,
            &MockFetcher::failing(),
            &MockSummarizer::disabled(),
            &Metrics::default(),
        )
        .await?;
        assert!(first.success);
        let persisted = storage.get_delegates().await?;

        let second = sync(
            RunType::Full,
            &config(),
            &upstream.unhealthy(),
            &storage,
            &MockFetcher::failing(),
            &MockSummarizer::disabled(),
            &Metrics::default(),
        )
        .await?;
        assert!(!second.success);
        assert!(second.error.is_some_and(|error| error.contains("health check")));
        assert_eq!(second.counters.delegates.total(), 0);

        assert_eq!(storage.get_delegates().await?, persisted);

        let runs = storage.get_sync_runs(10).await?;
        assert_eq!(runs.len(), 2);
        assert!(!runs[0].success);
        assert!(runs[1].success);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_vote_fetch_skips_delegate() -> Result<(), Box<dyn StdError>> {
        let (storage, _temp_dir) = storage().await?;
        let upstream = MockUpstream::new(500)
            .with_delegate(record("drep1", 1_000), vec![vote(
                "tx1",
                "drep1",
                0,
                Decision::Yes,
                500,
            )])
            .with_delegate(record("drep2", 1_000), vec![])
            .failing_votes("drep2");

        let sync_run = sync(
            RunType::Fast,
            &config(),
            &upstream,
            &storage,
            &MockFetcher::failing(),
            &MockSummarizer::disabled(),
            &Metrics::default(),
        )
        .await?;

        assert!(sync_run.success);
        assert_eq!(sync_run.counters.vote_fetches.succeeded, 1);
        assert_eq!(sync_run.counters.vote_fetches.failed, 1);

        let delegates = storage.get_delegates().await?;
        assert_eq!(delegates.len(), 1);
        assert_eq!(delegates[0].id, "drep1");
        assert_eq!(delegates[0].metrics.participation_rate, 100);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_proposals_fetch_uses_persisted() -> Result<(), Box<dyn StdError>> {
        let (storage, _temp_dir) = storage().await?;
        let upstream = MockUpstream::new(500).with_delegate(record("drep1", 1_000), vec![
            vote("tx1", "drep1", 0, Decision::Yes, 500),
        ]);

        sync(
            RunType::Fast,
            &config(),
            &upstream,
            &storage,
            &MockFetcher::failing(),
            &MockSummarizer::disabled(),
            &Metrics::default(),
        )
        .await?;

        let sync_run = sync(
            RunType::Fast,
            &config(),
            &upstream.failing_proposals(),
            &storage,
            &MockFetcher::failing(),
            &MockSummarizer::disabled(),
            &Metrics::default(),
        )
        .await?;

        assert!(sync_run.success);
        assert_eq!(sync_run.counters.proposals_fetched, 1);
        assert_eq!(sync_run.counters.proposals.total(), 0);
        assert_eq!(storage.get_proposals().await?.len(), 1);

        Ok(())
    }
}
