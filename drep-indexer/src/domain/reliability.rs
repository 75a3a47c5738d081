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

use crate::domain::Proposal;
use serde::Serialize;
use std::collections::BTreeSet;

const STREAK_WEIGHT: f64 = 0.35;
const RECENCY_WEIGHT: f64 = 0.30;
const GAP_WEIGHT: f64 = 0.20;
const TENURE_WEIGHT: f64 = 0.15;

/// Reliability score and its four sub-scores, each 0..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Reliability {
    pub score: u8,
    pub streak: u8,
    pub recency: u8,
    pub gap: u8,
    pub tenure: u8,
}

/// Epochs in which at least one proposal was open for voting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalActivity(BTreeSet<u32>);

impl ProposalActivity {
    pub fn new<'a>(proposals: impl IntoIterator<Item = &'a Proposal>, current_epoch: u32) -> Self {
        let epochs = proposals
            .into_iter()
            .flat_map(|proposal| {
                let lifecycle = proposal.lifecycle;
                lifecycle.proposed_epoch..=lifecycle.last_open_epoch(current_epoch)
            })
            .collect();
        Self(epochs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_active(&self, epoch: u32) -> bool {
        self.0.contains(&epoch)
    }
}

/// Compute reliability from the epochs a delegate voted in.
///
/// `current_epoch` falls back to the highest vote epoch if lower. Epochs without proposal
/// activity are skipped for streak and gap when `activity` is given. An unvoted current epoch
/// neither breaks the streak nor counts as a gap, as voting may still happen.
pub fn reliability(
    vote_epochs: &BTreeSet<u32>,
    current_epoch: u32,
    activity: Option<&ProposalActivity>,
) -> Reliability {
    let (Some(&first), Some(&last)) = (vote_epochs.first(), vote_epochs.last()) else {
        return Reliability::default();
    };

    let current = current_epoch.max(last);
    let counted = |epoch: u32| {
        let open = activity.is_none_or(|activity| activity.is_active(epoch));
        let pending = epoch == current && !vote_epochs.contains(&epoch);
        open && !pending
    };

    let streak = (first..=current)
        .rev()
        .filter(|&epoch| counted(epoch))
        .take_while(|epoch| vote_epochs.contains(epoch))
        .count();

    let longest_gap = (first..=current)
        .filter(|&epoch| counted(epoch))
        .fold((0u32, 0u32), |(longest, run), epoch| {
            if vote_epochs.contains(&epoch) {
                (longest, 0)
            } else {
                (longest.max(run + 1), run + 1)
            }
        })
        .0;

    let streak_score = (streak as f64 * 10.0).min(100.0);
    let recency_score = 100.0 * (-f64::from(current - last) / 5.0).exp();
    let gap_score = (100.0 - f64::from(longest_gap) * 12.0).max(0.0);
    let tenure_score = 20.0 + 80.0 * (1.0 - (-f64::from(current - first) / 30.0).exp());

    let score = STREAK_WEIGHT * streak_score
        + RECENCY_WEIGHT * recency_score
        + GAP_WEIGHT * gap_score
        + TENURE_WEIGHT * tenure_score;

    Reliability {
        score: to_score(score),
        streak: to_score(streak_score),
        recency: to_score(recency_score),
        gap: to_score(gap_score),
        tenure: to_score(tenure_score),
    }
}

pub(crate) fn to_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        ClassifiedProposal, Proposal, ProposalActivity, ProposalLifecycle, ProposalRef,
        ProposalStatus, ProposalType, Reliability, reliability,
    };
    use std::collections::BTreeSet;

    fn proposal(proposed_epoch: u32, status: ProposalStatus) -> Proposal {
        Proposal {
            proposal: ProposalRef::new("tx", proposed_epoch),
            proposal_type: ProposalType::InfoAction,
            classification: ClassifiedProposal {
                title: "title".to_owned(),
                abstract_text: None,
                withdrawal: None,
                categories: BTreeSet::new(),
            },
            lifecycle: ProposalLifecycle {
                proposed_epoch,
                expiration_epoch: Some(proposed_epoch + 6),
                status,
            },
            summary: None,
        }
    }

    #[test]
    fn test_no_votes() {
        assert_eq!(reliability(&BTreeSet::new(), 500, None), Reliability::default());
    }

    #[test]
    fn test_consistent_voter() {
        let epochs = (491..=500).collect::<BTreeSet<_>>();
        let reliability = reliability(&epochs, 500, None);

        assert_eq!(reliability.streak, 100);
        assert_eq!(reliability.recency, 100);
        assert_eq!(reliability.gap, 100);
        // 20 + 80 * (1 - e^-0.3) = 40.73
        assert_eq!(reliability.tenure, 41);
        // 35 + 30 + 20 + 0.15 * 40.73 = 91.11
        assert_eq!(reliability.score, 91);
    }

    #[test]
    fn test_gaps_and_recency() {
        let epochs = BTreeSet::from([490, 491, 495]);
        let reliability = reliability(&epochs, 500, None);

        // Epochs 496..=500 unvoted, the current one is still open.
        assert_eq!(reliability.streak, 0);
        assert_eq!(reliability.gap, 52);
        // 100 * e^-1
        assert_eq!(reliability.recency, 37);
    }

    #[test]
    fn test_open_current_epoch() {
        let epochs = BTreeSet::from([498, 499]);
        let reliability = reliability(&epochs, 500, None);

        assert_eq!(reliability.streak, 20);
        assert_eq!(reliability.gap, 100);
    }

    #[test]
    fn test_inactive_epochs_skipped() {
        let activity = ProposalActivity::new(
            &[
                proposal(490, ProposalStatus::Enacted(491)),
                proposal(496, ProposalStatus::Active),
            ],
            500,
        );
        assert!(!activity.is_active(493));
        assert!(activity.is_active(500));

        let epochs = BTreeSet::from([490, 491, 496, 497, 498, 499]);
        let with_activity = reliability(&epochs, 500, Some(&activity));
        assert_eq!(with_activity.streak, 60);
        assert_eq!(with_activity.gap, 100);

        let without_activity = reliability(&epochs, 500, None);
        assert_eq!(without_activity.streak, 40);
        assert_eq!(without_activity.gap, 52);
    }
}
