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
    self, AlignmentScores, Category, ClassifiedProposal, Coverage, DRepId, DRepMetadata, Delegate,
    DelegateMetrics, PendingRationale, PowerResolution, PowerSnapshot, PowerSource, Proposal,
    ProposalLifecycle, ProposalRef, ProposalStatus, RationaleEntry, RationaleRef,
    RationaleResolution, Reliability, ResolvedPower, ScoreHistoryEntry, SyncRun, SyncRunRecord,
    TreasuryWithdrawal, UnresolvedVote, Vote, VoteTally,
};
use chrono::{DateTime, NaiveDate, Utc};
use fastrace::trace;
use indoc::indoc;
use itertools::Itertools;
use sqlx::FromRow;
use std::{collections::HashMap, error::Error as StdError};

/// Unified storage implementation for PostgreSQL (cloud) and SQLite (standalone). Uses Cargo
/// features to select the appropriate database backend at build time.
#[derive(Debug, Clone)]
pub struct Storage {
    #[cfg(feature = "cloud")]
    pool: drep_common::infra::pool::postgres::PostgresPool,

    #[cfg(all(feature = "standalone", not(feature = "cloud")))]
    pool: drep_common::infra::pool::sqlite::SqlitePool,
}

impl Storage {
    #[cfg(feature = "cloud")]
    pub fn new(pool: drep_common::infra::pool::postgres::PostgresPool) -> Self {
        Self { pool }
    }

    #[cfg(all(feature = "standalone", not(feature = "cloud")))]
    pub fn new(pool: drep_common::infra::pool::sqlite::SqlitePool) -> Self {
        Self { pool }
    }
}

impl domain::storage::Storage for Storage {
    #[trace]
    async fn save_delegates(&self, delegates: &[Delegate]) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            INSERT INTO delegates (
                id,
                drep_hex,
                name,
                ticker,
                handle,
                metadata,
                active,
                voting_power,
                delegator_count,
                vote_count,
                participation_rate,
                rationale_rate,
                deliberation_modifier,
                effective_participation,
                reliability_score,
                reliability_streak,
                reliability_recency,
                reliability_gap,
                reliability_tenure,
                profile_completeness,
                score,
                alignment_treasury_conservative,
                alignment_treasury_growth,
                alignment_decentralization,
                alignment_security,
                alignment_innovation,
                alignment_transparency,
                updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28
            )
            ON CONFLICT (id) DO UPDATE SET
                drep_hex = EXCLUDED.drep_hex,
                name = EXCLUDED.name,
                ticker = EXCLUDED.ticker,
                handle = EXCLUDED.handle,
                metadata = EXCLUDED.metadata,
                active = EXCLUDED.active,
                voting_power = EXCLUDED.voting_power,
                delegator_count = COALESCE(EXCLUDED.delegator_count, delegates.delegator_count),
                vote_count = EXCLUDED.vote_count,
                participation_rate = EXCLUDED.participation_rate,
                rationale_rate = EXCLUDED.rationale_rate,
                deliberation_modifier = EXCLUDED.deliberation_modifier,
                effective_participation = EXCLUDED.effective_participation,
                reliability_score = EXCLUDED.reliability_score,
                reliability_streak = EXCLUDED.reliability_streak,
                reliability_recency = EXCLUDED.reliability_recency,
                reliability_gap = EXCLUDED.reliability_gap,
                reliability_tenure = EXCLUDED.reliability_tenure,
                profile_completeness = EXCLUDED.profile_completeness,
                score = EXCLUDED.score,
                updated_at = EXCLUDED.updated_at
        "};

        let mut tx = self.pool.begin().await?;

        for delegate in delegates {
            let metadata = delegate
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|error| sqlx::Error::Encode(error.into()))?;
            let DelegateMetrics {
                participation_rate,
                rationale_rate,
                deliberation_modifier,
                effective_participation,
                reliability,
                profile_completeness,
                score,
            } = delegate.metrics;
            let alignment = delegate.alignment;

            sqlx::query(query)
                .bind(&delegate.id)
                .bind(&delegate.hex)
                .bind(&delegate.name)
                .bind(&delegate.ticker)
                .bind(&delegate.handle)
                .bind(metadata)
                .bind(delegate.active)
                .bind(delegate.voting_power as i64)
                .bind(delegate.delegator_count.map(|count| count as i64))
                .bind(delegate.vote_count as i64)
                .bind(i64::from(participation_rate))
                .bind(i64::from(rationale_rate))
                .bind(deliberation_modifier)
                .bind(i64::from(effective_participation))
                .bind(i64::from(reliability.score))
                .bind(i64::from(reliability.streak))
                .bind(i64::from(reliability.recency))
                .bind(i64::from(reliability.gap))
                .bind(i64::from(reliability.tenure))
                .bind(i64::from(profile_completeness))
                .bind(i64::from(score))
                .bind(i64::from(alignment.treasury_conservative))
                .bind(i64::from(alignment.treasury_growth))
                .bind(i64::from(alignment.decentralization))
                .bind(i64::from(alignment.security))
                .bind(i64::from(alignment.innovation))
                .bind(i64::from(alignment.transparency))
                .bind(delegate.updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    #[trace]
    async fn save_alignment(&self, delegates: &[Delegate]) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            UPDATE delegates SET
                alignment_treasury_conservative = $1,
                alignment_treasury_growth = $2,
                alignment_decentralization = $3,
                alignment_security = $4,
                alignment_innovation = $5,
                alignment_transparency = $6
            WHERE id = $7
        "};

        let mut tx = self.pool.begin().await?;

        for delegate in delegates {
            let alignment = delegate.alignment;

            sqlx::query(query)
                .bind(i64::from(alignment.treasury_conservative))
                .bind(i64::from(alignment.treasury_growth))
                .bind(i64::from(alignment.decentralization))
                .bind(i64::from(alignment.security))
                .bind(i64::from(alignment.innovation))
                .bind(i64::from(alignment.transparency))
                .bind(&delegate.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    #[trace]
    async fn save_delegator_counts(&self, counts: &[(DRepId, u64)]) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            UPDATE delegates
            SET delegator_count = $1
            WHERE id = $2
        "};

        let mut tx = self.pool.begin().await?;

        for (drep_id, count) in counts {
            sqlx::query(query)
                .bind(*count as i64)
                .bind(drep_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    #[trace]
    async fn get_delegates(&self) -> Result<Vec<Delegate>, sqlx::Error> {
        let query = indoc! {"
            SELECT
                id,
                drep_hex,
                name,
                ticker,
                handle,
                metadata,
                active,
                voting_power,
                delegator_count,
                vote_count,
                participation_rate,
                rationale_rate,
                deliberation_modifier,
                effective_participation,
                reliability_score,
                reliability_streak,
                reliability_recency,
                reliability_gap,
                reliability_tenure,
                profile_completeness,
                score,
                alignment_treasury_conservative,
                alignment_treasury_growth,
                alignment_decentralization,
                alignment_security,
                alignment_innovation,
                alignment_transparency,
                updated_at
            FROM delegates
            ORDER BY score DESC, id
        "};

        sqlx::query_as::<_, DelegateRow>(query)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(Delegate::try_from)
            .collect()
    }

    #[trace]
    async fn save_votes(&self, votes: &[Vote]) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            INSERT INTO votes (
                tx_hash,
                drep_id,
                proposal_tx_hash,
                proposal_index,
                decision,
                epoch,
                block_time,
                rationale_text,
                rationale_url,
                rationale_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (tx_hash) DO UPDATE SET
                drep_id = EXCLUDED.drep_id,
                proposal_tx_hash = EXCLUDED.proposal_tx_hash,
                proposal_index = EXCLUDED.proposal_index,
                decision = EXCLUDED.decision,
                epoch = EXCLUDED.epoch,
                block_time = EXCLUDED.block_time,
                rationale_text = EXCLUDED.rationale_text,
                rationale_url = EXCLUDED.rationale_url,
                rationale_hash = EXCLUDED.rationale_hash
        "};

        let mut tx = self.pool.begin().await?;

        for vote in votes {
            let (rationale_text, rationale_url, rationale_hash) = match &vote.rationale {
                Some(RationaleRef::Inline(text)) => (Some(text.as_str()), None, None),
                Some(RationaleRef::External { url, hash }) => {
                    (None, Some(url.as_str()), hash.as_deref())
                }
                None => (None, None, None),
            };

            sqlx::query(query)
                .bind(&vote.tx_hash)
                .bind(&vote.drep_id)
                .bind(&vote.proposal.tx_hash)
                .bind(i64::from(vote.proposal.index))
                .bind(vote.decision.as_str())
                .bind(i64::from(vote.epoch))
                .bind(vote.block_time)
                .bind(rationale_text)
                .bind(rationale_url)
                .bind(rationale_hash)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    #[trace(properties = { "drep_id": "{drep_id}" })]
    async fn get_votes(&self, drep_id: &str) -> Result<Vec<Vote>, sqlx::Error> {
        let query = indoc! {"
            SELECT
                votes.tx_hash,
                votes.drep_id,
                votes.proposal_tx_hash,
                votes.proposal_index,
                votes.decision,
                votes.epoch,
                votes.block_time,
                votes.rationale_text,
                votes.rationale_url,
                votes.rationale_hash,
                votes.voting_power,
                votes.power_source,
                rationale_cache.text AS resolved_text,
                rationale_cache.resolved
            FROM votes
            LEFT JOIN rationale_cache ON rationale_cache.vote_tx_hash = votes.tx_hash
            WHERE votes.drep_id = $1
            ORDER BY votes.block_time, votes.tx_hash
        "};

        sqlx::query_as::<_, VoteRow>(query)
            .bind(drep_id)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(Vote::try_from)
            .collect()
    }

    #[trace]
    async fn get_vote_tallies(&self) -> Result<HashMap<ProposalRef, VoteTally>, sqlx::Error> {
        let query = indoc! {"
            SELECT
                proposal_tx_hash,
                proposal_index,
                COUNT(*) FILTER (WHERE decision = 'Yes'),
                COUNT(*) FILTER (WHERE decision = 'No'),
                COUNT(*) FILTER (WHERE decision = 'Abstain')
            FROM votes
            GROUP BY proposal_tx_hash, proposal_index
        "};

        let tallies = sqlx::query_as::<_, (String, i64, i64, i64, i64)>(query)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(|(tx_hash, index, yes, no, abstain)| {
                let tally = VoteTally {
                    yes: yes as u64,
                    no: no as u64,
                    abstain: abstain as u64,
                };
                (ProposalRef::new(tx_hash, index as u32), tally)
            })
            .collect();

        Ok(tallies)
    }

    #[trace]
    async fn save_proposals(&self, proposals: &[Proposal]) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            INSERT INTO proposals (
                tx_hash,
                proposal_index,
                proposal_type,
                title,
                abstract,
                withdrawal_amount,
                treasury_tier,
                categories,
                proposed_epoch,
                ratified_epoch,
                enacted_epoch,
                dropped_epoch,
                expired_epoch,
                expiration_epoch,
                summary,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (tx_hash, proposal_index) DO UPDATE SET
                proposal_type = EXCLUDED.proposal_type,
                title = EXCLUDED.title,
                abstract = EXCLUDED.abstract,
                withdrawal_amount = EXCLUDED.withdrawal_amount,
                treasury_tier = EXCLUDED.treasury_tier,
                categories = EXCLUDED.categories,
                proposed_epoch = EXCLUDED.proposed_epoch,
                ratified_epoch = EXCLUDED.ratified_epoch,
                enacted_epoch = EXCLUDED.enacted_epoch,
                dropped_epoch = EXCLUDED.dropped_epoch,
                expired_epoch = EXCLUDED.expired_epoch,
                expiration_epoch = EXCLUDED.expiration_epoch,
                summary = COALESCE(EXCLUDED.summary, proposals.summary),
                updated_at = EXCLUDED.updated_at
        "};

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for proposal in proposals {
            let classification = &proposal.classification;
            let status = proposal.lifecycle.status;
            let categories = classification
                .categories
                .iter()
                .map(|category| category.as_str())
                .join(",");

            sqlx::query(query)
                .bind(&proposal.proposal.tx_hash)
                .bind(i64::from(proposal.proposal.index))
                .bind(proposal.proposal_type.as_str())
                .bind(&classification.title)
                .bind(&classification.abstract_text)
                .bind(classification.withdrawal.map(|w| w.amount as i64))
                .bind(classification.withdrawal.map(|w| w.tier.as_str()))
                .bind(categories)
                .bind(i64::from(proposal.lifecycle.proposed_epoch))
                .bind(status.ratified_epoch().map(i64::from))
                .bind(status.enacted_epoch().map(i64::from))
                .bind(status.dropped_epoch().map(i64::from))
                .bind(status.expired_epoch().map(i64::from))
                .bind(proposal.lifecycle.expiration_epoch.map(i64::from))
                .bind(&proposal.summary)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    #[trace]
    async fn get_proposals(&self) -> Result<Vec<Proposal>, sqlx::Error> {
        let query = indoc! {"
            SELECT
                tx_hash,
                proposal_index,
                proposal_type,
                title,
                abstract,
                withdrawal_amount,
                categories,
                proposed_epoch,
                ratified_epoch,
                enacted_epoch,
                dropped_epoch,
                expired_epoch,
                expiration_epoch,
                summary
            FROM proposals
            ORDER BY proposed_epoch DESC, tx_hash, proposal_index
        "};

        sqlx::query_as::<_, ProposalRow>(query)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(Proposal::try_from)
            .collect()
    }

    #[trace]
    async fn save_power_snapshots(&self, snapshots: &[PowerSnapshot]) -> Result<u64, sqlx::Error> {
        let query = indoc! {"
            INSERT INTO power_snapshots (drep_id, epoch, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (drep_id, epoch) DO NOTHING
        "};

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for snapshot in snapshots {
            inserted += sqlx::query(query)
                .bind(&snapshot.drep_id)
                .bind(i64::from(snapshot.epoch))
                .bind(snapshot.amount as i64)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    #[trace(properties = { "drep_id": "{drep_id}" })]
    async fn get_power_snapshots(&self, drep_id: &str) -> Result<Vec<PowerSnapshot>, sqlx::Error> {
        let query = indoc! {"
            SELECT epoch, amount
            FROM power_snapshots
            WHERE drep_id = $1
            ORDER BY epoch
        "};

        let snapshots = sqlx::query_as::<_, (i64, i64)>(query)
            .bind(drep_id)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(|(epoch, amount)| PowerSnapshot {
                drep_id: drep_id.to_owned(),
                epoch: epoch as u32,
                amount: amount as u64,
            })
            .collect();

        Ok(snapshots)
    }

    #[trace]
    async fn get_unresolved_power_drep_ids(&self) -> Result<Vec<DRepId>, sqlx::Error> {
        let query = indoc! {"
            SELECT DISTINCT drep_id
            FROM votes
            WHERE power_source = 'nearest'
            OR (power_source IS NULL AND NOT power_missed)
            ORDER BY drep_id
        "};

        sqlx::query_scalar::<_, String>(query)
            .fetch_all(&*self.pool)
            .await
    }

    #[trace(properties = { "drep_id": "{drep_id}" })]
    async fn get_unresolved_power_votes(
        &self,
        drep_id: &str,
    ) -> Result<Vec<UnresolvedVote>, sqlx::Error> {
        let query = indoc! {"
            SELECT tx_hash, epoch, power_source
            FROM votes
            WHERE drep_id = $1
            AND (power_source = 'nearest' OR (power_source IS NULL AND NOT power_missed))
            ORDER BY epoch, tx_hash
        "};

        sqlx::query_as::<_, (String, i64, Option<String>)>(query)
            .bind(drep_id)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(|(tx_hash, epoch, source)| {
                let source = source
                    .map(|source| source.parse::<PowerSource>())
                    .transpose()
                    .map_err(decode_error)?;

                Ok(UnresolvedVote {
                    tx_hash,
                    epoch: epoch as u32,
                    source,
                })
            })
            .collect()
    }

    #[trace]
    async fn save_vote_power(&self, resolution: &PowerResolution) -> Result<bool, sqlx::Error> {
        let query = indoc! {"
            UPDATE votes
            SET voting_power = $1, power_source = $2
            WHERE tx_hash = $3
            AND (power_source IS NULL OR power_source <> 'exact')
        "};

        let result = sqlx::query(query)
            .bind(resolution.power.amount as i64)
            .bind(resolution.power.source.as_str())
            .bind(&resolution.tx_hash)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[trace]
    async fn save_power_missed(&self, tx_hashes: &[String]) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            UPDATE votes
            SET power_missed = TRUE
            WHERE tx_hash = $1
            AND power_source IS NULL
        "};

        let mut tx = self.pool.begin().await?;

        for tx_hash in tx_hashes {
            sqlx::query(query).bind(tx_hash).execute(&mut *tx).await?;
        }

        tx.commit().await
    }

    #[trace]
    async fn save_score_history(&self, entries: &[ScoreHistoryEntry]) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            INSERT INTO score_history (
                drep_id,
                date,
                score,
                voting_power,
                alignment_treasury_conservative,
                alignment_treasury_growth,
                alignment_decentralization,
                alignment_security,
                alignment_innovation,
                alignment_transparency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (drep_id, date) DO UPDATE SET
                score = EXCLUDED.score,
                voting_power = EXCLUDED.voting_power,
                alignment_treasury_conservative = EXCLUDED.alignment_treasury_conservative,
                alignment_treasury_growth = EXCLUDED.alignment_treasury_growth,
                alignment_decentralization = EXCLUDED.alignment_decentralization,
                alignment_security = EXCLUDED.alignment_security,
                alignment_innovation = EXCLUDED.alignment_innovation,
                alignment_transparency = EXCLUDED.alignment_transparency
        "};

        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let alignment = entry.alignment;

            sqlx::query(query)
                .bind(&entry.drep_id)
                .bind(entry.date)
                .bind(i64::from(entry.score))
                .bind(entry.voting_power as i64)
                .bind(i64::from(alignment.treasury_conservative))
                .bind(i64::from(alignment.treasury_growth))
                .bind(i64::from(alignment.decentralization))
                .bind(i64::from(alignment.security))
                .bind(i64::from(alignment.innovation))
                .bind(i64::from(alignment.transparency))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    #[trace]
    async fn get_latest_score_history(
        &self,
    ) -> Result<HashMap<DRepId, Vec<ScoreHistoryEntry>>, sqlx::Error> {
        let query = indoc! {"
            SELECT
                drep_id,
                date,
                score,
                voting_power,
                alignment_treasury_conservative,
                alignment_treasury_growth,
                alignment_decentralization,
                alignment_security,
                alignment_innovation,
                alignment_transparency
            FROM score_history
            ORDER BY drep_id, date DESC
        "};

        let rows = sqlx::query_as::<_, ScoreHistoryRow>(query)
            .fetch_all(&*self.pool)
            .await?;

        let mut history = HashMap::<DRepId, Vec<ScoreHistoryEntry>>::new();
        for row in rows {
            let entries = history.entry(row.drep_id.clone()).or_default();
            if entries.len() < 2 {
                entries.push(row.into());
            }
        }

        Ok(history)
    }

    #[trace]
    async fn get_pending_rationales(
        &self,
        limit: usize,
    ) -> Result<Vec<PendingRationale>, sqlx::Error> {
        let query = indoc! {"
            SELECT votes.tx_hash, votes.rationale_url, votes.rationale_hash
            FROM votes
            LEFT JOIN rationale_cache ON rationale_cache.vote_tx_hash = votes.tx_hash
            WHERE votes.rationale_url IS NOT NULL
            AND rationale_cache.vote_tx_hash IS NULL
            ORDER BY votes.block_time DESC
            LIMIT $1
        "};

        let pending = sqlx::query_as::<_, (String, String, Option<String>)>(query)
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(|(vote_tx_hash, url, hash)| PendingRationale {
                vote_tx_hash,
                url,
                hash,
            })
            .collect();

        Ok(pending)
    }

    #[trace]
    async fn save_rationale(&self, entry: &RationaleEntry) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            INSERT INTO rationale_cache (
                vote_tx_hash,
                url,
                text,
                resolved,
                hash_verified,
                fetched_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (vote_tx_hash) DO UPDATE SET
                url = EXCLUDED.url,
                text = EXCLUDED.text,
                resolved = EXCLUDED.resolved,
                hash_verified = EXCLUDED.hash_verified,
                fetched_at = EXCLUDED.fetched_at
        "};

        sqlx::query(query)
            .bind(&entry.vote_tx_hash)
            .bind(&entry.url)
            .bind(&entry.text)
            .bind(entry.text.is_some())
            .bind(entry.hash_verified)
            .bind(entry.fetched_at)
            .execute(&*self.pool)
            .await?;

        Ok(())
    }

    #[trace]
    async fn get_rationale_resolutions(
        &self,
    ) -> Result<HashMap<String, RationaleResolution>, sqlx::Error> {
        let query = indoc! {"
            SELECT vote_tx_hash, text, resolved
            FROM rationale_cache
        "};

        let resolutions = sqlx::query_as::<_, (String, Option<String>, bool)>(query)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(|(vote_tx_hash, text, resolved)| {
                (vote_tx_hash, rationale_resolution(text, Some(resolved)))
            })
            .collect();

        Ok(resolutions)
    }

    #[trace]
    async fn get_unsummarized_rationales(
        &self,
        limit: usize,
    ) -> Result<Vec<(String, String)>, sqlx::Error> {
        let query = indoc! {"
            SELECT vote_tx_hash, text
            FROM rationale_cache
            WHERE resolved
            AND text IS NOT NULL
            AND summary IS NULL
            ORDER BY fetched_at
            LIMIT $1
        "};

        sqlx::query_as::<_, (String, String)>(query)
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await
    }

    #[trace]
    async fn save_rationale_summary(
        &self,
        vote_tx_hash: &str,
        summary: &str,
    ) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            UPDATE rationale_cache
            SET summary = $1
            WHERE vote_tx_hash = $2
        "};

        sqlx::query(query)
            .bind(summary)
            .bind(vote_tx_hash)
            .execute(&*self.pool)
            .await?;

        Ok(())
    }

    #[trace]
    async fn get_unsummarized_proposals(
        &self,
        limit: usize,
    ) -> Result<Vec<(ProposalRef, String)>, sqlx::Error> {
        let query = indoc! {"
            SELECT tx_hash, proposal_index, abstract
            FROM proposals
            WHERE summary IS NULL
            AND abstract IS NOT NULL
            ORDER BY proposed_epoch DESC, tx_hash, proposal_index
            LIMIT $1
        "};

        let proposals = sqlx::query_as::<_, (String, i64, String)>(query)
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(|(tx_hash, index, text)| (ProposalRef::new(tx_hash, index as u32), text))
            .collect();

        Ok(proposals)
    }

    #[trace]
    async fn save_proposal_summary(
        &self,
        proposal: &ProposalRef,
        summary: &str,
    ) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            UPDATE proposals
            SET summary = $1
            WHERE tx_hash = $2
            AND proposal_index = $3
        "};

        sqlx::query(query)
            .bind(summary)
            .bind(&proposal.tx_hash)
            .bind(i64::from(proposal.index))
            .execute(&*self.pool)
            .await?;

        Ok(())
    }

    #[trace]
    async fn save_sync_run(&self, sync_run: &SyncRun) -> Result<i64, sqlx::Error> {
        let query = indoc! {"
            INSERT INTO sync_runs (
                run_type,
                started_at,
                finished_at,
                duration_ms,
                success,
                error,
                counters
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        "};

        let counters = serde_json::to_string(&sync_run.counters)
            .map_err(|error| sqlx::Error::Encode(error.into()))?;

        sqlx::query_scalar::<_, i64>(query)
            .bind(sync_run.run_type.as_str())
            .bind(sync_run.started_at)
            .bind(sync_run.finished_at)
            .bind(sync_run.duration_ms())
            .bind(sync_run.success)
            .bind(&sync_run.error)
            .bind(counters)
            .fetch_one(&*self.pool)
            .await
    }

    #[trace]
    async fn get_sync_runs(&self, limit: usize) -> Result<Vec<SyncRunRecord>, sqlx::Error> {
        let query = indoc! {"
            SELECT
                id,
                run_type,
                started_at,
                finished_at,
                duration_ms,
                success,
                error,
                counters
            FROM sync_runs
            ORDER BY id DESC
            LIMIT $1
        "};

        sqlx::query_as::<_, SyncRunRow>(query)
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(SyncRunRecord::try_from)
            .collect()
    }

    #[trace]
    async fn get_coverage(&self) -> Result<Coverage, sqlx::Error> {
        let votes_query = indoc! {"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE voting_power IS NOT NULL),
                COUNT(*) FILTER (WHERE power_source = 'exact'),
                COUNT(*) FILTER (WHERE rationale_url IS NOT NULL)
            FROM votes
        "};

        let rationales_query = indoc! {"
            SELECT
                COUNT(*) FILTER (WHERE resolved),
                COUNT(*) FILTER (WHERE hash_verified),
                COUNT(*) FILTER (WHERE summary IS NOT NULL)
            FROM rationale_cache
        "};

        let proposals_query = indoc! {"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE summary IS NOT NULL)
            FROM proposals
        "};

        let (votes, votes_with_power, votes_with_exact_power, rationales) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(votes_query)
                .fetch_one(&*self.pool)
                .await?;

        let (rationales_resolved, rationales_hash_verified, rationales_summarized) =
            sqlx::query_as::<_, (i64, i64, i64)>(rationales_query)
                .fetch_one(&*self.pool)
                .await?;

        let (proposals, proposals_summarized) = sqlx::query_as::<_, (i64, i64)>(proposals_query)
            .fetch_one(&*self.pool)
            .await?;

        Ok(Coverage {
            votes: votes as u64,
            votes_with_power: votes_with_power as u64,
            votes_with_exact_power: votes_with_exact_power as u64,
            rationales: rationales as u64,
            rationales_resolved: rationales_resolved as u64,
            rationales_hash_verified: rationales_hash_verified as u64,
            rationales_summarized: rationales_summarized as u64,
            proposals: proposals as u64,
            proposals_summarized: proposals_summarized as u64,
        })
    }
}

#[derive(Debug, FromRow)]
struct DelegateRow {
    id: String,
    drep_hex: Option<String>,
    name: Option<String>,
    ticker: Option<String>,
    handle: Option<String>,
    metadata: Option<String>,
    active: bool,
    voting_power: i64,
    delegator_count: Option<i64>,
    vote_count: i64,
    participation_rate: i64,
    rationale_rate: i64,
    deliberation_modifier: f64,
    effective_participation: i64,
    reliability_score: i64,
    reliability_streak: i64,
    reliability_recency: i64,
    reliability_gap: i64,
    reliability_tenure: i64,
    profile_completeness: i64,
    score: i64,
    alignment_treasury_conservative: i64,
    alignment_treasury_growth: i64,
    alignment_decentralization: i64,
    alignment_security: i64,
    alignment_innovation: i64,
    alignment_transparency: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DelegateRow> for Delegate {
    type Error = sqlx::Error;

    fn try_from(row: DelegateRow) -> Result<Self, Self::Error> {
        let metadata = row
            .metadata
            .as_deref()
            .map(serde_json::from_str::<DRepMetadata>)
            .transpose()
            .map_err(decode_error)?;

        Ok(Delegate {
            id: row.id,
            hex: row.drep_hex,
            name: row.name,
            ticker: row.ticker,
            handle: row.handle,
            metadata,
            active: row.active,
            voting_power: row.voting_power as u64,
            delegator_count: row.delegator_count.map(|count| count as u64),
            vote_count: row.vote_count as u64,
            metrics: DelegateMetrics {
                participation_rate: score(row.participation_rate),
                rationale_rate: score(row.rationale_rate),
                deliberation_modifier: row.deliberation_modifier,
                effective_participation: score(row.effective_participation),
                reliability: Reliability {
                    score: score(row.reliability_score),
                    streak: score(row.reliability_streak),
                    recency: score(row.reliability_recency),
                    gap: score(row.reliability_gap),
                    tenure: score(row.reliability_tenure),
                },
                profile_completeness: score(row.profile_completeness),
                score: score(row.score),
            },
            alignment: AlignmentScores {
                treasury_conservative: score(row.alignment_treasury_conservative),
                treasury_growth: score(row.alignment_treasury_growth),
                decentralization: score(row.alignment_decentralization),
                security: score(row.alignment_security),
                innovation: score(row.alignment_innovation),
                transparency: score(row.alignment_transparency),
            },
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct VoteRow {
    tx_hash: String,
    drep_id: String,
    proposal_tx_hash: String,
    proposal_index: i64,
    decision: String,
    epoch: i64,
    block_time: DateTime<Utc>,
    rationale_text: Option<String>,
    rationale_url: Option<String>,
    rationale_hash: Option<String>,
    voting_power: Option<i64>,
    power_source: Option<String>,
    resolved_text: Option<String>,
    resolved: Option<bool>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = sqlx::Error;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let rationale = match (row.rationale_text, row.rationale_url) {
            (Some(text), _) => Some(RationaleRef::Inline(text)),
            (None, Some(url)) => Some(RationaleRef::External {
                url,
                hash: row.rationale_hash,
            }),
            (None, None) => None,
        };

        let power = match (row.voting_power, row.power_source) {
            (Some(amount), Some(source)) => Some(ResolvedPower {
                amount: amount as u64,
                source: source.parse().map_err(decode_error)?,
            }),
            _ => None,
        };

        Ok(Vote {
            tx_hash: row.tx_hash,
            drep_id: row.drep_id,
            proposal: ProposalRef::new(row.proposal_tx_hash, row.proposal_index as u32),
            decision: row.decision.parse().map_err(decode_error)?,
            epoch: row.epoch as u32,
            block_time: row.block_time,
            rationale,
            resolution: rationale_resolution(row.resolved_text, row.resolved),
            power,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProposalRow {
    tx_hash: String,
    proposal_index: i64,
    proposal_type: String,
    title: String,
    #[sqlx(rename = "abstract")]
    abstract_text: Option<String>,
    withdrawal_amount: Option<i64>,
    categories: String,
    proposed_epoch: i64,
    ratified_epoch: Option<i64>,
    enacted_epoch: Option<i64>,
    dropped_epoch: Option<i64>,
    expired_epoch: Option<i64>,
    expiration_epoch: Option<i64>,
    summary: Option<String>,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = sqlx::Error;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        let epoch = |epoch: Option<i64>| epoch.map(|epoch| epoch as u32);

        let categories = row
            .categories
            .split(',')
            .filter(|category| !category.is_empty())
            .map(|category| category.parse::<Category>())
            .collect::<Result<_, _>>()
            .map_err(decode_error)?;

        Ok(Proposal {
            proposal: ProposalRef::new(row.tx_hash, row.proposal_index as u32),
            proposal_type: row.proposal_type.parse().map_err(decode_error)?,
            classification: ClassifiedProposal {
                title: row.title,
                abstract_text: row.abstract_text,
                withdrawal: row
                    .withdrawal_amount
                    .map(|amount| TreasuryWithdrawal::new(amount as u64)),
                categories,
            },
            lifecycle: ProposalLifecycle {
                proposed_epoch: row.proposed_epoch as u32,
                expiration_epoch: epoch(row.expiration_epoch),
                status: ProposalStatus::from_epochs(
                    epoch(row.ratified_epoch),
                    epoch(row.enacted_epoch),
                    epoch(row.dropped_epoch),
                    epoch(row.expired_epoch),
                ),
            },
            summary: row.summary,
        })
    }
}

#[derive(Debug, FromRow)]
struct ScoreHistoryRow {
    drep_id: String,
    date: NaiveDate,
    score: i64,
    voting_power: i64,
    alignment_treasury_conservative: i64,
    alignment_treasury_growth: i64,
    alignment_decentralization: i64,
    alignment_security: i64,
    alignment_innovation: i64,
    alignment_transparency: i64,
}

impl From<ScoreHistoryRow> for ScoreHistoryEntry {
    fn from(row: ScoreHistoryRow) -> Self {
        ScoreHistoryEntry {
            drep_id: row.drep_id,
            date: row.date,
            score: score(row.score),
            voting_power: row.voting_power as u64,
            alignment: AlignmentScores {
                treasury_conservative: score(row.alignment_treasury_conservative),
                treasury_growth: score(row.alignment_treasury_growth),
                decentralization: score(row.alignment_decentralization),
                security: score(row.alignment_security),
                innovation: score(row.alignment_innovation),
                transparency: score(row.alignment_transparency),
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct SyncRunRow {
    id: i64,
    run_type: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration_ms: i64,
    success: bool,
    error: Option<String>,
    counters: String,
}

impl TryFrom<SyncRunRow> for SyncRunRecord {
    type Error = sqlx::Error;

    fn try_from(row: SyncRunRow) -> Result<Self, Self::Error> {
        Ok(SyncRunRecord {
            id: row.id,
            run_type: row.run_type.parse().map_err(decode_error)?,
            started_at: row.started_at,
            finished_at: row.finished_at,
            duration_ms: row.duration_ms,
            success: row.success,
            error: row.error,
            counters: serde_json::from_str(&row.counters).map_err(decode_error)?,
        })
    }
}

fn rationale_resolution(text: Option<String>, resolved: Option<bool>) -> RationaleResolution {
    match (resolved, text) {
        (Some(true), Some(text)) => RationaleResolution::Resolved(text),
        (Some(_), _) => RationaleResolution::Unresolved,
        (None, _) => RationaleResolution::Pending,
    }
}

fn score(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

fn decode_error(error: impl StdError + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(error.into())
}
