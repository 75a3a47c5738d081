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

use crate::domain::UnknownVariant;
use chrono::{DateTime, Utc};
use drep_common::batch::BatchOutcome;
use serde::Serialize;
use std::{
    fmt::{self, Display},
    str::FromStr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    /// Stages 1 to 4: fetch, enrich, persist, follow-ups.
    Fast,

    /// All stages including power backfill, rationale resolution and summaries.
    Full,
}

impl RunType {
    pub const fn as_str(self) -> &'static str {
        match self {
            RunType::Fast => "fast",
            RunType::Full => "full",
        }
    }
}

impl Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(RunType::Fast),
            "full" => Ok(RunType::Full),
            other => Err(UnknownVariant::new("run type", other)),
        }
    }
}

/// Outcome of one sync run, appended once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRun {
    pub run_type: RunType,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub counters: SyncCounters,
}

impl SyncRun {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Per-stage counters of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncCounters {
    pub current_epoch: Option<u32>,
    pub drep_ids: usize,
    pub record_fetches: BatchOutcome,
    pub vote_fetches: BatchOutcome,
    pub proposals_fetched: usize,
    pub delegates: BatchOutcome,
    pub votes: BatchOutcome,
    pub proposals: BatchOutcome,
    pub alignment: BatchOutcome,
    pub score_history: BatchOutcome,
    pub delegator_counts: BatchOutcome,
    pub power_snapshots: BatchOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backfill: Option<BackfillOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationales: Option<BatchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summaries: Option<BatchOutcome>,
}

impl SyncCounters {
    /// Whether no fetch or write of any stage failed.
    pub fn is_complete(&self) -> bool {
        let outcomes = [
            &self.record_fetches,
            &self.vote_fetches,
            &self.delegates,
            &self.votes,
            &self.proposals,
            &self.alignment,
            &self.score_history,
            &self.delegator_counts,
            &self.power_snapshots,
        ];
        let optional = [
            self.backfill.as_ref().map(|backfill| &backfill.delegates),
            self.rationales.as_ref(),
            self.summaries.as_ref(),
        ];

        outcomes
            .into_iter()
            .chain(optional.into_iter().flatten())
            .all(BatchOutcome::is_complete)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillOutcome {
    pub delegates: BatchOutcome,
    pub resolved_exact: usize,
    pub resolved_nearest: usize,
    pub unresolved: usize,
}

/// A persisted sync run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRunRecord {
    pub id: i64,
    pub run_type: RunType,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub success: bool,
    pub error: Option<String>,
    pub counters: serde_json::Value,
}

/// Raw counts backing the coverage diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    pub votes: u64,
    pub votes_with_power: u64,
    pub votes_with_exact_power: u64,
    pub rationales: u64,
    pub rationales_resolved: u64,
    pub rationales_hash_verified: u64,
    pub rationales_summarized: u64,
    pub proposals: u64,
    pub proposals_summarized: u64,
}

#[cfg(test)]
mod tests {
    use crate::domain::{BackfillOutcome, SyncCounters};

    #[test]
    fn test_is_complete() {
        let mut counters = SyncCounters::default();
        counters.delegates.succeed(10);
        assert!(counters.is_complete());

        counters.backfill = Some(BackfillOutcome::default());
        if let Some(backfill) = counters.backfill.as_mut() {
            backfill.delegates.fail(1, "drep1: no history");
        }
        assert!(!counters.is_complete());
    }
}
