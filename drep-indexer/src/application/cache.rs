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
    application::{
        Config,
        sync::{enrich, fetch_delegates, fetch_proposals, index_proposals},
    },
    domain::{
        AlignmentBreakdown, AlignmentShift, Coverage, Delegate, PreferenceSet, Proposal,
        SyncCounters, SyncRunRecord, VoteTally, detect_shift, hybrid_score, storage::Storage,
        to_score, upstream::Upstream,
    },
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use fastrace::trace;
use log::warn;
use serde::Serialize;
use std::time::Duration;

/// Read model serving the persisted snapshot written by the syncs. Reads never wait for a sync:
/// a stale snapshot is flagged but still served, and only a missing snapshot is computed live
/// from the upstream, without persisting it.
#[derive(Debug, Clone)]
pub struct DelegateCache<U, S> {
    config: Config,
    upstream: U,
    storage: S,
}

/// All delegates ordered by score descending.
#[derive(Debug, Clone, PartialEq)]
pub struct Delegates {
    pub delegates: Vec<Delegate>,

    /// Most recent update of the persisted delegates; `None` if computed live.
    pub updated_at: Option<DateTime<Utc>>,

    /// Whether the persisted delegates are older than the freshness window.
    pub stale: bool,

    /// Whether the delegates were computed live because none were persisted.
    pub live: bool,
}

/// A delegate scored against a preference set.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDelegate {
    pub delegate: Delegate,
    pub alignment: AlignmentBreakdown,
    pub hybrid_score: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalWithTally {
    pub proposal: Proposal,
    pub tally: VoteTally,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub coverage: CoverageReport,
    pub sync_runs: Vec<SyncRunRecord>,
}

/// Coverage counts and percentages (0..=100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub votes: u64,
    pub vote_power: u8,
    pub exact_vote_power: u8,
    pub rationales: u64,
    pub rationale_resolution: u8,
    pub rationale_hash_verification: u8,
    pub rationale_summaries: u8,
    pub proposals: u64,
    pub proposal_summaries: u8,
}

impl From<Coverage> for CoverageReport {
    fn from(coverage: Coverage) -> Self {
        Self {
            votes: coverage.votes,
            vote_power: percentage(coverage.votes_with_power, coverage.votes),
            exact_vote_power: percentage(coverage.votes_with_exact_power, coverage.votes),
            rationales: coverage.rationales,
            rationale_resolution: percentage(coverage.rationales_resolved, coverage.rationales),
            rationale_hash_verification: percentage(
                coverage.rationales_hash_verified,
                coverage.rationales_resolved,
            ),
            rationale_summaries: percentage(
                coverage.rationales_summarized,
                coverage.rationales_resolved,
            ),
            proposals: coverage.proposals,
            proposal_summaries: percentage(coverage.proposals_summarized, coverage.proposals),
        }
    }
}

impl<U, S> DelegateCache<U, S>
where
    U: Upstream,
    S: Storage,
{
    pub fn new(config: Config, upstream: U, storage: S) -> Self {
        Self {
            config,
            upstream,
            storage,
        }
    }

    #[trace]
    pub async fn get_all(&self) -> anyhow::Result<Delegates> {
        let delegates = self
            .storage
            .get_delegates()
            .await
            .context("get persisted delegates")?;

        if delegates.is_empty() {
            warn!("no persisted delegates, computing live");

            let delegates = self.compute_live().await.context("compute delegates live")?;
            return Ok(Delegates {
                delegates,
                updated_at: None,
                stale: false,
                live: true,
            });
        }

        let updated_at = delegates.iter().map(|delegate| delegate.updated_at).max();
        let stale = updated_at
            .is_some_and(|updated_at| is_stale(updated_at, Utc::now(), self.config.freshness_window));
        if stale {
            warn!(updated_at:?; "persisted delegates are stale");
        }

        Ok(Delegates {
            delegates,
            updated_at,
            stale,
            live: false,
        })
    }

    /// All delegates with their alignment for the given preferences, ordered by hybrid score
    /// descending. Without preferences the hybrid score is the composite score.
    #[trace]
    pub async fn get_all_with_preferences(
        &self,
        preferences: &PreferenceSet,
    ) -> anyhow::Result<Vec<RankedDelegate>> {
        let Delegates { delegates, .. } = self.get_all().await?;

        let mut ranked = delegates
            .into_iter()
            .map(|delegate| {
                let alignment = delegate.alignment.breakdown(preferences);
                let hybrid_score = if preferences.is_empty() {
                    delegate.metrics.score
                } else {
                    hybrid_score(delegate.metrics.score, alignment.overall)
                };

                RankedDelegate {
                    delegate,
                    alignment,
                    hybrid_score,
                }
            })
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| b.hybrid_score.cmp(&a.hybrid_score));

        Ok(ranked)
    }

    /// Alignment shifts between the two latest score history entries of each delegate.
    #[trace]
    pub async fn alignment_shifts(
        &self,
        preferences: &PreferenceSet,
    ) -> anyhow::Result<Vec<AlignmentShift>> {
        let history = self
            .storage
            .get_latest_score_history()
            .await
            .context("get latest score history")?;

        let mut shifts = history
            .into_iter()
            .filter_map(|(drep_id, entries)| match entries.as_slice() {
                [current, previous, ..] => detect_shift(
                    &drep_id,
                    &previous.alignment,
                    &current.alignment,
                    preferences,
                ),
                _ => None,
            })
            .collect::<Vec<_>>();
        shifts.sort_by(|a, b| a.drep_id.cmp(&b.drep_id));

        Ok(shifts)
    }

    #[trace]
    pub async fn proposals(&self) -> anyhow::Result<Vec<ProposalWithTally>> {
        let proposals = self
            .storage
            .get_proposals()
            .await
            .context("get proposals")?;
        let tallies = self
            .storage
            .get_vote_tallies()
            .await
            .context("get vote tallies")?;

        let proposals = proposals
            .into_iter()
            .map(|proposal| {
                let tally = tallies.get(&proposal.proposal).copied().unwrap_or_default();
                ProposalWithTally { proposal, tally }
            })
            .collect();

        Ok(proposals)
    }

    #[trace]
    pub async fn diagnostics(&self, sync_runs: usize) -> anyhow::Result<Diagnostics> {
        let coverage = self
            .storage
            .get_coverage()
            .await
            .context("get coverage")?;
        let sync_runs = self
            .storage
            .get_sync_runs(sync_runs)
            .await
            .context("get sync runs")?;

        Ok(Diagnostics {
            coverage: coverage.into(),
            sync_runs,
        })
    }

    async fn compute_live(&self) -> anyhow::Result<Vec<Delegate>> {
        let current_epoch = self
            .upstream
            .health_check()
            .await
            .context("upstream health check")?;

        let (proposals, _) = fetch_proposals(&self.upstream, &self.storage).await;
        let inputs =
            fetch_delegates(&self.config, &self.upstream, &mut SyncCounters::default()).await;
        let proposals = index_proposals(proposals);

        let mut delegates = enrich(
            inputs,
            &proposals,
            Some(current_epoch),
            self.config.score_weights,
            &self.storage,
        )
        .await;
        delegates.sort_by(|a, b| {
            b.metrics
                .score
                .cmp(&a.metrics.score)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(delegates)
    }
}

fn is_stale(updated_at: DateTime<Utc>, now: DateTime<Utc>, freshness_window: Duration) -> bool {
    (now - updated_at)
        .to_std()
        .is_ok_and(|age| age > freshness_window)
}

fn percentage(part: u64, total: u64) -> u8 {
    if total == 0 {
        0
    } else {
        to_score(part as f64 * 100.0 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use crate::application::cache::{is_stale, percentage};
    use chrono::{TimeDelta, Utc};
    use std::time::Duration;

    #[test]
    fn test_is_stale() {
        let now = Utc::now();
        let window = Duration::from_secs(15 * 60);

        assert!(!is_stale(now - TimeDelta::minutes(14), now, window));
        assert!(is_stale(now - TimeDelta::minutes(16), now, window));
        assert!(!is_stale(now + TimeDelta::minutes(1), now, window));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(5, 5), 100);
    }
}
