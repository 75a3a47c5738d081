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
    application::{BackfillConfig, Config},
    domain::{
        DRepId, DRepInfo, DRepMetadata, DRepRecord, Decision, FetchedRationale, PowerSnapshot,
        ProposalLifecycle, ProposalRef, ProposalStatus, ProposalType, RationaleFetcher,
        RationaleRef, RationaleResolution, RawProposal, ScoreWeights, Summarizer, Vote,
        upstream::Upstream,
    },
    infra::storage::Storage,
};
use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use drep_common::{
    batch::BatchOutcome,
    infra::{
        migrations,
        pool::{self, sqlite::SqlitePool},
    },
    retry::Retryable,
};
use std::{
    collections::{HashMap, HashSet},
    error::Error as StdError,
    num::NonZeroUsize,
    time::Duration,
};
use tempfile::TempDir;
use thiserror::Error;

pub const PROPOSAL_TX_HASH: &str =
    "abababababababababababababababababababababababababababababababab";

pub async fn storage() -> Result<(Storage, TempDir), Box<dyn StdError>> {
    let temp_dir = tempfile::tempdir().context("cannot create tempdir")?;
    let sqlite_file = temp_dir.path().join("drep.sqlite").display().to_string();
    let pool = SqlitePool::new(pool::sqlite::Config {
        cnn_url: sqlite_file,
    })
    .await?;
    migrations::sqlite::run(&pool).await?;

    Ok((Storage::new(pool), temp_dir))
}

pub fn config() -> Config {
    let non_zero = |n| NonZeroUsize::new(n).expect("non-zero");

    Config {
        fast_interval: Duration::from_secs(15 * 60),
        full_interval: Duration::from_secs(6 * 60 * 60),
        fetch_batch_size: non_zero(50),
        write_batch_size: non_zero(100),
        concurrency: non_zero(10),
        backfill_config: BackfillConfig {
            concurrency: non_zero(10),
            delegate_delay: Duration::ZERO,
        },
        rationale_limit: 100,
        rationale_concurrency: non_zero(5),
        summary_limit: 100,
        score_weights: ScoreWeights::ACCOUNTABILITY,
        freshness_window: Duration::from_secs(15 * 60),
    }
}

pub fn record(drep_id: &str, voting_power: u64) -> DRepRecord {
    DRepRecord {
        info: DRepInfo {
            id: drep_id.to_owned(),
            hex: None,
            active: true,
            voting_power,
            meta_url: None,
            meta_hash: None,
        },
        metadata: Some(DRepMetadata {
            given_name: Some(format!("{drep_id} name")),
            ..Default::default()
        }),
    }
}

/// Block time within the given epoch.
pub fn epoch_time(epoch: u32) -> DateTime<Utc> {
    let secs = 1_596_059_091 + (i64::from(epoch) - 208) * 432_000 + 3_600;
    Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
}

pub fn vote(tx_hash: &str, drep_id: &str, index: u32, decision: Decision, epoch: u32) -> Vote {
    Vote {
        tx_hash: tx_hash.to_owned(),
        drep_id: drep_id.to_owned(),
        proposal: ProposalRef::new(PROPOSAL_TX_HASH, index),
        decision,
        epoch,
        block_time: epoch_time(epoch),
        rationale: None,
        resolution: RationaleResolution::Pending,
        power: None,
    }
}

pub fn external_vote(
    tx_hash: &str,
    drep_id: &str,
    index: u32,
    decision: Decision,
    epoch: u32,
) -> Vote {
    Vote {
        rationale: Some(RationaleRef::External {
            url: format!("https://example.com/{tx_hash}.json"),
            hash: None,
        }),
        ..vote(tx_hash, drep_id, index, decision, epoch)
    }
}

#[derive(Debug, Error)]
#[error("mock upstream unavailable")]
pub struct MockError;

impl Retryable for MockError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// In-memory upstream; every proposal voted on is reported as an active info action.
#[derive(Debug, Clone)]
pub struct MockUpstream {
    current_epoch: u32,
    healthy: bool,
    records: Vec<DRepRecord>,
    votes: HashMap<DRepId, Vec<Vote>>,
    failing_votes: HashSet<DRepId>,
    failing_records: HashSet<DRepId>,
    proposals: Vec<RawProposal>,
    failing_proposals: bool,
    power_history: HashMap<DRepId, Vec<PowerSnapshot>>,
}

impl MockUpstream {
    pub fn new(current_epoch: u32) -> Self {
        Self {
            current_epoch,
            healthy: true,
            records: vec![],
            votes: HashMap::new(),
            failing_votes: HashSet::new(),
            failing_records: HashSet::new(),
            proposals: vec![],
            failing_proposals: false,
            power_history: HashMap::new(),
        }
    }

    pub fn with_delegate(mut self, record: DRepRecord, votes: Vec<Vote>) -> Self {
        for vote in &votes {
            if !self.proposals.iter().any(|p| p.proposal == vote.proposal) {
                self.proposals.push(RawProposal {
                    proposal: vote.proposal.clone(),
                    proposal_type: ProposalType::InfoAction,
                    meta_json: None,
                    description: None,
                    withdrawals: vec![],
                    lifecycle: ProposalLifecycle {
                        proposed_epoch: vote.epoch.saturating_sub(1),
                        expiration_epoch: None,
                        status: ProposalStatus::Active,
                    },
                });
            }
        }

        self.votes.insert(record.info.id.clone(), votes);
        self.records.push(record);
        self
    }

    pub fn with_power_history(mut self, drep_id: &str, history: &[(u32, u64)]) -> Self {
        let snapshots = history
            .iter()
            .map(|&(epoch, amount)| PowerSnapshot {
                drep_id: drep_id.to_owned(),
                epoch,
                amount,
            })
            .collect();
        self.power_history.insert(drep_id.to_owned(), snapshots);
        self
    }

    pub fn failing_votes(mut self, drep_id: &str) -> Self {
        self.failing_votes.insert(drep_id.to_owned());
        self
    }

    pub fn failing_record(mut self, drep_id: &str) -> Self {
        self.failing_records.insert(drep_id.to_owned());
        self
    }

    pub fn failing_proposals(&self) -> Self {
        Self {
            failing_proposals: true,
            ..self.clone()
        }
    }

    pub fn unhealthy(&self) -> Self {
        Self {
            healthy: false,
            ..self.clone()
        }
    }
}

impl Upstream for MockUpstream {
    type Error = MockError;

    async fn health_check(&self) -> Result<u32, Self::Error> {
        if self.healthy {
            Ok(self.current_epoch)
        } else {
            Err(MockError)
        }
    }

    async fn fetch_drep_ids(&self) -> Result<Vec<DRepId>, Self::Error> {
        Ok(self.records.iter().map(|record| record.info.id.clone()).collect())
    }

    async fn fetch_batch(
        &self,
        drep_ids: &[DRepId],
        _batch_size: usize,
    ) -> (Vec<DRepRecord>, BatchOutcome) {
        let mut outcome = BatchOutcome::default();
        let records = self
            .records
            .iter()
            .filter(|record| drep_ids.contains(&record.info.id))
            .filter(|record| {
                let failing = self.failing_records.contains(&record.info.id);
                if failing {
                    outcome.fail(1, MockError);
                } else {
                    outcome.succeed(1);
                }
                !failing
            })
            .cloned()
            .collect();
        (records, outcome)
    }

    async fn fetch_votes(&self, drep_id: &str) -> Result<Vec<Vote>, Self::Error> {
        if self.failing_votes.contains(drep_id) {
            return Err(MockError);
        }
        Ok(self.votes.get(drep_id).cloned().unwrap_or_default())
    }

    async fn fetch_proposals(&self) -> Result<Vec<RawProposal>, Self::Error> {
        if self.failing_proposals {
            return Err(MockError);
        }
        Ok(self.proposals.clone())
    }

    async fn fetch_power_history(&self, drep_id: &str) -> Result<Vec<PowerSnapshot>, Self::Error> {
        Ok(self.power_history.get(drep_id).cloned().unwrap_or_default())
    }

    async fn fetch_delegator_count(&self, _drep_id: &str) -> Result<u64, Self::Error> {
        Ok(3)
    }
}

#[derive(Debug, Clone)]
pub struct MockFetcher(Option<String>);

impl MockFetcher {
    pub fn resolving(text: &str) -> Self {
        Self(Some(text.to_owned()))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

impl RationaleFetcher for MockFetcher {
    type Error = MockError;

    async fn fetch(
        &self,
        _url: &str,
        expected_hash: Option<&str>,
    ) -> Result<FetchedRationale, Self::Error> {
        let text = self.0.clone().ok_or(MockError)?;
        Ok(FetchedRationale {
            text,
            hash_verified: expected_hash.is_some(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MockSummarizer(bool);

impl MockSummarizer {
    pub fn enabled() -> Self {
        Self(true)
    }

    pub fn disabled() -> Self {
        Self(false)
    }
}

impl Summarizer for MockSummarizer {
    type Error = MockError;

    fn is_enabled(&self) -> bool {
        self.0
    }

    async fn summarize(&self, text: &str) -> Result<String, Self::Error> {
        Ok(text.chars().take(16).collect())
    }
}
