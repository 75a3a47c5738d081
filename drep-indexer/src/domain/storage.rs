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

use crate::domain::{
    Coverage, DRepId, Delegate, PendingRationale, PowerResolution, PowerSnapshot, Proposal,
    ProposalRef, RationaleEntry, RationaleResolution, ScoreHistoryEntry, SyncRun, SyncRunRecord,
    UnresolvedVote, Vote, VoteTally,
};
use std::collections::HashMap;

/// Storage abstraction. Every batch method writes its batch in a single transaction and all
/// writes are idempotent upserts.
#[trait_variant::make(Send)]
pub trait Storage
where
    Self: Clone + Send + Sync + 'static,
{
    /// Upsert delegates including metrics, without touching stored alignment scores.
    async fn save_delegates(&self, delegates: &[Delegate]) -> Result<(), sqlx::Error>;

    /// Update the alignment scores of already stored delegates.
    async fn save_alignment(&self, delegates: &[Delegate]) -> Result<(), sqlx::Error>;

    async fn save_delegator_counts(&self, counts: &[(DRepId, u64)]) -> Result<(), sqlx::Error>;

    /// All delegates ordered by score descending.
    async fn get_delegates(&self) -> Result<Vec<Delegate>, sqlx::Error>;

    /// Upsert votes by transaction hash. Never touches resolved voting power.
    async fn save_votes(&self, votes: &[Vote]) -> Result<(), sqlx::Error>;

    async fn get_votes(&self, drep_id: &str) -> Result<Vec<Vote>, sqlx::Error>;

    async fn get_vote_tallies(&self) -> Result<HashMap<ProposalRef, VoteTally>, sqlx::Error>;

    async fn save_proposals(&self, proposals: &[Proposal]) -> Result<(), sqlx::Error>;

    async fn get_proposals(&self) -> Result<Vec<Proposal>, sqlx::Error>;

    /// Insert snapshots, ignoring already known (delegate, epoch) pairs. Returns the number of
    /// inserted snapshots.
    async fn save_power_snapshots(&self, snapshots: &[PowerSnapshot]) -> Result<u64, sqlx::Error>;

    async fn get_power_snapshots(&self, drep_id: &str) -> Result<Vec<PowerSnapshot>, sqlx::Error>;

    /// Ids of delegates having votes with nearest voting power or with none which have not been
    /// marked as missed.
    async fn get_unresolved_power_drep_ids(&self) -> Result<Vec<DRepId>, sqlx::Error>;

    async fn get_unresolved_power_votes(
        &self,
        drep_id: &str,
    ) -> Result<Vec<UnresolvedVote>, sqlx::Error>;

    /// Apply a power resolution unless the vote is already resolved exactly. Returns whether the
    /// vote was updated.
    async fn save_vote_power(&self, resolution: &PowerResolution) -> Result<bool, sqlx::Error>;

    /// Mark votes without any voting power snapshot to resolve from; these stay unresolved and
    /// are not backfilled again.
    async fn save_power_missed(&self, tx_hashes: &[String]) -> Result<(), sqlx::Error>;

    async fn save_score_history(&self, entries: &[ScoreHistoryEntry]) -> Result<(), sqlx::Error>;

    /// The two latest score history entries per delegate, latest first.
    async fn get_latest_score_history(
        &self,
    ) -> Result<HashMap<DRepId, Vec<ScoreHistoryEntry>>, sqlx::Error>;

    /// Votes with an external rationale anchor and no rationale cache entry yet.
    async fn get_pending_rationales(
        &self,
        limit: usize,
    ) -> Result<Vec<PendingRationale>, sqlx::Error>;

    async fn save_rationale(&self, entry: &RationaleEntry) -> Result<(), sqlx::Error>;

    /// Resolution state of all cached rationales by vote transaction hash.
    async fn get_rationale_resolutions(
        &self,
    ) -> Result<HashMap<String, RationaleResolution>, sqlx::Error>;

    /// Resolved rationales without summary as (vote transaction hash, text).
    async fn get_unsummarized_rationales(
        &self,
        limit: usize,
    ) -> Result<Vec<(String, String)>, sqlx::Error>;

    async fn save_rationale_summary(
        &self,
        vote_tx_hash: &str,
        summary: &str,
    ) -> Result<(), sqlx::Error>;

    /// Proposals with an abstract but without summary.
    async fn get_unsummarized_proposals(
        &self,
        limit: usize,
    ) -> Result<Vec<(ProposalRef, String)>, sqlx::Error>;

    async fn save_proposal_summary(
        &self,
        proposal: &ProposalRef,
        summary: &str,
    ) -> Result<(), sqlx::Error>;

    async fn save_sync_run(&self, sync_run: &SyncRun) -> Result<i64, sqlx::Error>;

    /// The latest sync runs, latest first.
    async fn get_sync_runs(&self, limit: usize) -> Result<Vec<SyncRunRecord>, sqlx::Error>;

    async fn get_coverage(&self) -> Result<Coverage, sqlx::Error>;
}
