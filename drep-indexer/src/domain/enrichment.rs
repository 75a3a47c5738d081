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
    DRepRecord, Decision, Delegate, DelegateMetrics, Proposal, ProposalActivity, ProposalRef,
    ScoreWeights, Vote, alignment_scores, profile_completeness, reliability, to_score,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

const DELIBERATION_MIN_VOTES: usize = 10;

/// A delegate's upstream record together with all its votes.
#[derive(Debug, Clone)]
pub struct DelegateInput {
    pub record: DRepRecord,
    pub votes: Vec<Vote>,
}

/// Run-wide inputs of the enrichment.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentContext<'a> {
    /// Current epoch from the upstream health check, if available.
    pub current_epoch: Option<u32>,
    pub proposals: &'a HashMap<ProposalRef, Proposal>,
    pub weights: ScoreWeights,
    pub now: DateTime<Utc>,
}

/// Enrich and score all delegates of a run. Participation is relative to the highest vote count
/// across all given delegates, hence this needs the complete set.
pub fn enrich_all(inputs: Vec<DelegateInput>, context: EnrichmentContext<'_>) -> Vec<Delegate> {
    let baseline = inputs.iter().map(|input| input.votes.len()).max().unwrap_or_default();

    let highest_vote_epoch = inputs
        .iter()
        .flat_map(|input| input.votes.iter().map(|vote| vote.epoch))
        .max()
        .unwrap_or_default();
    let current_epoch = context.current_epoch.unwrap_or(highest_vote_epoch);

    let activity = ProposalActivity::new(context.proposals.values(), current_epoch);
    let activity = (!activity.is_empty()).then_some(&activity);

    inputs
        .into_iter()
        .map(|input| enrich(input, baseline, current_epoch, activity, &context))
        .collect()
}

fn enrich(
    input: DelegateInput,
    baseline: usize,
    current_epoch: u32,
    activity: Option<&ProposalActivity>,
    context: &EnrichmentContext<'_>,
) -> Delegate {
    let DelegateInput {
        record: DRepRecord { info, metadata },
        votes,
    } = input;

    let participation_rate = participation_rate(votes.len(), baseline);
    let rationale_rate = rationale_rate(&votes);
    let deliberation_modifier = deliberation_modifier(&votes);
    let effective_participation = to_score(f64::from(participation_rate) * deliberation_modifier);

    let vote_epochs = votes.iter().map(|vote| vote.epoch).collect::<BTreeSet<_>>();
    let reliability = reliability(&vote_epochs, current_epoch, activity);

    let profile_completeness = profile_completeness(metadata.as_ref());
    let score = context
        .weights
        .score(effective_participation, rationale_rate, reliability.score);

    let alignment = alignment_scores(
        &votes,
        context.proposals,
        participation_rate,
        info.voting_power,
    );

    let (name, ticker, handle) = metadata
        .as_ref()
        .map(|metadata| {
            (
                metadata.given_name.clone(),
                metadata.ticker.clone(),
                metadata.handle.clone(),
            )
        })
        .unwrap_or_default();

    Delegate {
        id: info.id,
        hex: info.hex,
        name,
        ticker,
        handle,
        metadata,
        active: info.active,
        voting_power: info.voting_power,
        delegator_count: None,
        vote_count: votes.len() as u64,
        metrics: DelegateMetrics {
            participation_rate,
            rationale_rate,
            deliberation_modifier,
            effective_participation,
            reliability,
            profile_completeness,
            score,
        },
        alignment,
        updated_at: context.now,
    }
}

/// Participation 0..=100 relative to the baseline vote count; 0 if the baseline is 0.
pub fn participation_rate(votes: usize, baseline: usize) -> u8 {
    if baseline == 0 {
        return 0;
    }
    to_score(votes as f64 / baseline as f64 * 100.0)
}

/// Percentage of votes carrying a rationale.
pub fn rationale_rate(votes: &[Vote]) -> u8 {
    if votes.is_empty() {
        return 0;
    }
    let with_rationale = votes.iter().filter(|vote| vote.has_rationale()).count();
    to_score(with_rationale as f64 / votes.len() as f64 * 100.0)
}

/// Penalty for uniform voting, applied to participation once a delegate has cast more than ten
/// votes.
pub fn deliberation_modifier(votes: &[Vote]) -> f64 {
    if votes.len() <= DELIBERATION_MIN_VOTES {
        return 1.0;
    }

    let count = |decision| votes.iter().filter(|vote| vote.decision == decision).count();
    let dominant = [Decision::Yes, Decision::No, Decision::Abstain]
        .into_iter()
        .map(count)
        .max()
        .unwrap_or_default();
    let ratio = dominant as f64 / votes.len() as f64;

    if ratio > 0.95 {
        0.70
    } else if ratio > 0.90 {
        0.85
    } else if ratio > 0.85 {
        0.95
    } else {
        1.0
    }
}
