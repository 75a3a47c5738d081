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
    Category, DRepId, Decision, LOVELACE_PER_ADA, Proposal, ProposalRef, ProposalType,
    TreasuryTier, Vote, to_score,
};
use serde::Serialize;
use std::{
    borrow::Borrow,
    collections::{BTreeSet, HashMap},
};

const NEUTRAL: u8 = 50;
const SHIFT_THRESHOLD: i16 = 8;
const CATEGORY_SHIFT_THRESHOLD: i16 = 5;

/// Policy categories a voter cares about.
pub type PreferenceSet = BTreeSet<Category>;

/// Per-category alignment scores of a delegate, independent of any preference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlignmentScores {
    pub treasury_conservative: u8,
    pub treasury_growth: u8,
    pub decentralization: u8,
    pub security: u8,
    pub innovation: u8,
    pub transparency: u8,
}

impl Default for AlignmentScores {
    fn default() -> Self {
        Self {
            treasury_conservative: NEUTRAL,
            treasury_growth: NEUTRAL,
            decentralization: NEUTRAL,
            security: NEUTRAL,
            innovation: NEUTRAL,
            transparency: NEUTRAL,
        }
    }
}

impl AlignmentScores {
    pub fn get(&self, category: Category) -> u8 {
        match category {
            Category::TreasuryConservative => self.treasury_conservative,
            Category::TreasuryGrowth => self.treasury_growth,
            Category::Decentralization => self.decentralization,
            Category::Security => self.security,
            Category::Innovation => self.innovation,
            Category::Transparency => self.transparency,
        }
    }

    /// Breakdown for the given preferences. The treasury score is the selected treasury variant,
    /// or the mean of both if both or none are selected.
    pub fn breakdown(&self, preferences: &PreferenceSet) -> AlignmentBreakdown {
        let conservative = preferences.contains(&Category::TreasuryConservative);
        let growth = preferences.contains(&Category::TreasuryGrowth);
        let treasury = match (conservative, growth) {
            (true, false) => self.treasury_conservative,
            (false, true) => self.treasury_growth,
            _ => mean_or_neutral([self.treasury_conservative, self.treasury_growth]),
        };

        let mut selected = preferences
            .iter()
            .filter(|category| !category.is_treasury())
            .map(|&category| self.get(category))
            .collect::<Vec<_>>();
        if conservative || growth {
            selected.push(treasury);
        }
        let overall = mean_or_neutral(selected);

        AlignmentBreakdown {
            treasury,
            decentralization: self.decentralization,
            security: self.security,
            innovation: self.innovation,
            transparency: self.transparency,
            overall,
        }
    }
}

/// Alignment of a delegate with a preference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlignmentBreakdown {
    pub treasury: u8,
    pub decentralization: u8,
    pub security: u8,
    pub innovation: u8,
    pub transparency: u8,
    pub overall: u8,
}

/// Size class of a delegate by voting power.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTier {
    Small,
    Medium,
    Large,
    Whale,
}

impl PowerTier {
    pub fn from_lovelace(amount: u64) -> Self {
        match amount / LOVELACE_PER_ADA {
            ada if ada < 1_000_000 => PowerTier::Small,
            ada if ada < 10_000_000 => PowerTier::Medium,
            ada if ada < 50_000_000 => PowerTier::Large,
            _ => PowerTier::Whale,
        }
    }

    pub fn decentralization_score(self) -> u8 {
        match self {
            PowerTier::Small => 95,
            PowerTier::Medium => 72,
            PowerTier::Large => 40,
            PowerTier::Whale => 12,
        }
    }
}

/// Compute the per-category alignment scores of a delegate from its votes.
pub fn alignment_scores(
    votes: &[Vote],
    proposals: &HashMap<ProposalRef, Proposal>,
    participation_rate: u8,
    voting_power: u64,
) -> AlignmentScores {
    let decentralization = PowerTier::from_lovelace(voting_power).decentralization_score();
    if votes.is_empty() {
        return AlignmentScores {
            decentralization,
            ..Default::default()
        };
    }

    let with_proposal = votes
        .iter()
        .filter_map(|vote| proposals.get(&vote.proposal).map(|proposal| (vote, proposal)))
        .collect::<Vec<_>>();

    let treasury_votes = with_proposal
        .iter()
        .filter_map(|&(vote, proposal)| proposal.treasury_tier().map(|tier| (vote, tier)))
        .collect::<Vec<_>>();

    let treasury_conservative = mean_or_neutral(
        treasury_votes
            .iter()
            .map(|&(vote, tier)| conservative_score(vote.decision, tier)),
    );
    let treasury_growth = mean_or_neutral(
        treasury_votes
            .iter()
            .map(|&(vote, tier)| growth_score(vote.decision, tier, vote.has_rationale())),
    );

    let rationale_rate = share(votes, |vote| vote.has_rationale());

    let security_votes = with_proposal
        .iter()
        .filter(|(_, proposal)| proposal.is_relevant_to(Category::Security))
        .map(|&(vote, _)| vote)
        .collect::<Vec<_>>();
    let security = if security_votes.is_empty() {
        0.5 * f64::from(participation_rate) + 0.5 * rationale_rate
    } else {
        let caution = share(&security_votes, |vote| vote.decision != Decision::Yes);
        let rationale = share(&security_votes, |vote| vote.has_rationale());
        0.6 * caution + 0.4 * rationale
    };

    let innovation_votes = with_proposal
        .iter()
        .filter(|(_, proposal)| {
            proposal.is_relevant_to(Category::Innovation)
                || proposal.proposal_type == ProposalType::InfoAction
        })
        .map(|&(vote, _)| vote)
        .collect::<Vec<_>>();
    let innovation = if innovation_votes.is_empty() {
        f64::from(NEUTRAL)
    } else {
        let yes = share(&innovation_votes, |vote| vote.decision == Decision::Yes);
        0.5 * yes + 0.5 * f64::from(participation_rate)
    };

    AlignmentScores {
        treasury_conservative,
        treasury_growth,
        decentralization,
        security: to_score(security),
        innovation: to_score(innovation),
        transparency: to_score(rationale_rate),
    }
}

fn conservative_score(decision: Decision, tier: TreasuryTier) -> u8 {
    match (decision, tier) {
        (Decision::No, TreasuryTier::Major) => 100,
        (Decision::No, TreasuryTier::Significant) => 90,
        (Decision::No, TreasuryTier::Routine) => 50,
        (Decision::Yes, TreasuryTier::Major) => 10,
        (Decision::Yes, TreasuryTier::Significant) => 30,
        (Decision::Yes, TreasuryTier::Routine) => 50,
        (Decision::Abstain, _) => NEUTRAL,
    }
}

fn growth_score(decision: Decision, tier: TreasuryTier, rationale: bool) -> u8 {
    match (decision, tier, rationale) {
        (Decision::Yes, TreasuryTier::Major, true) => 90,
        (Decision::Yes, TreasuryTier::Significant, true) => 85,
        (Decision::Yes, TreasuryTier::Routine, true) => 70,
        (Decision::Yes, _, false) => 60,
        (Decision::No, TreasuryTier::Major, _) => 10,
        (Decision::No, _, true) => 40,
        (Decision::No, _, false) => 20,
        (Decision::Abstain, _, _) => NEUTRAL,
    }
}

/// Percentage of votes matching the predicate, 0..=100.
fn share<V>(votes: &[V], predicate: impl Fn(&Vote) -> bool) -> f64
where
    V: Borrow<Vote>,
{
    if votes.is_empty() {
        return 0.0;
    }
    let matching = votes.iter().filter(|vote| predicate((*vote).borrow())).count();
    matching as f64 / votes.len() as f64 * 100.0
}

fn mean_or_neutral(scores: impl IntoIterator<Item = u8>) -> u8 {
    let (sum, count) = scores
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), score| (sum + u32::from(score), count + 1));
    if count == 0 {
        NEUTRAL
    } else {
        to_score(f64::from(sum) / f64::from(count))
    }
}

/// A flagged drop of a delegate's overall alignment between its two latest history entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentShift {
    pub drep_id: DRepId,
    pub previous_overall: u8,
    pub current_overall: u8,
    pub categories: Vec<CategoryShift>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryShift {
    pub category: Category,
    pub previous: u8,
    pub current: u8,
}

/// Detect an alignment shift: the overall score for the preferences dropped by more than 8
/// points. A flagged shift lists every selected category which dropped by more than 5 points.
pub fn detect_shift(
    drep_id: &str,
    previous: &AlignmentScores,
    current: &AlignmentScores,
    preferences: &PreferenceSet,
) -> Option<AlignmentShift> {
    let previous_overall = previous.breakdown(preferences).overall;
    let current_overall = current.breakdown(preferences).overall;
    if i16::from(previous_overall) - i16::from(current_overall) <= SHIFT_THRESHOLD {
        return None;
    }

    let categories = preferences
        .iter()
        .map(|&category| CategoryShift {
            category,
            previous: previous.get(category),
            current: current.get(category),
        })
        .filter(|shift| {
            i16::from(shift.previous) - i16::from(shift.current) > CATEGORY_SHIFT_THRESHOLD
        })
        .collect();

    Some(AlignmentShift {
        drep_id: drep_id.to_owned(),
        previous_overall,
        current_overall,
        categories,
    })
}
