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

use crate::domain::SyncRun;
use metrics::{Counter, Gauge, counter, gauge, histogram};

pub struct Metrics {
    current_epoch: Gauge,
    delegates: Gauge,
    write_failures: Counter,
    record_fetch_failures: Counter,
    vote_fetch_failures: Counter,
    power_resolved_exact: Counter,
    power_resolved_nearest: Counter,
    power_unresolved: Counter,
    rationales_resolved: Counter,
    rationales_unresolved: Counter,
    summaries: Counter,
    summary_failures: Counter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            current_epoch: gauge!("drep_indexer_current_epoch"),
            delegates: gauge!("drep_indexer_delegates"),
            write_failures: counter!("drep_indexer_write_failures"),
            record_fetch_failures: counter!("drep_indexer_record_fetch_failures"),
            vote_fetch_failures: counter!("drep_indexer_vote_fetch_failures"),
            power_resolved_exact: counter!("drep_indexer_power_resolutions", "source" => "exact"),
            power_resolved_nearest: counter!("drep_indexer_power_resolutions", "source" => "nearest"),
            power_unresolved: counter!("drep_indexer_power_unresolved"),
            rationales_resolved: counter!("drep_indexer_rationales", "outcome" => "resolved"),
            rationales_unresolved: counter!("drep_indexer_rationales", "outcome" => "unresolved"),
            summaries: counter!("drep_indexer_summaries", "outcome" => "success"),
            summary_failures: counter!("drep_indexer_summaries", "outcome" => "failure"),
        }
    }
}

impl Metrics {
    pub fn record_sync_run(&self, sync_run: &SyncRun) {
        let run_type = sync_run.run_type.as_str();
        let outcome = if sync_run.success { "success" } else { "failure" };

        counter!("drep_indexer_sync_runs", "run_type" => run_type, "outcome" => outcome)
            .increment(1);
        histogram!("drep_indexer_sync_duration_seconds", "run_type" => run_type)
            .record(sync_run.duration_ms() as f64 / 1_000.0);

        let counters = &sync_run.counters;
        if let Some(current_epoch) = counters.current_epoch {
            self.current_epoch.set(current_epoch);
        }
        if sync_run.success {
            self.delegates.set(counters.delegates.succeeded as f64);
        }

        let write_failures = [
            &counters.delegates,
            &counters.votes,
            &counters.proposals,
            &counters.alignment,
            &counters.score_history,
            &counters.delegator_counts,
            &counters.power_snapshots,
        ]
        .into_iter()
        .map(|outcome| outcome.failed as u64)
        .sum::<u64>();
        self.write_failures.increment(write_failures);
        self.record_fetch_failures
            .increment(counters.record_fetches.failed as u64);
        self.vote_fetch_failures
            .increment(counters.vote_fetches.failed as u64);

        if let Some(backfill) = &counters.backfill {
            self.power_resolved_exact
                .increment(backfill.resolved_exact as u64);
            self.power_resolved_nearest
                .increment(backfill.resolved_nearest as u64);
            self.power_unresolved.increment(backfill.unresolved as u64);
        }

        if let Some(rationales) = &counters.rationales {
            self.rationales_resolved
                .increment(rationales.succeeded as u64);
            self.rationales_unresolved
                .increment(rationales.failed as u64);
        }

        if let Some(summaries) = &counters.summaries {
            self.summaries.increment(summaries.succeeded as u64);
            self.summary_failures.increment(summaries.failed as u64);
        }
    }
}
