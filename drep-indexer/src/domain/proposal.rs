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

use crate::domain::{ProposalRef, UnknownVariant};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::BTreeSet,
    fmt::{self, Display},
    str::FromStr,
};

pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// A governance proposal as delivered by the upstream API, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProposal {
    pub proposal: ProposalRef,
    pub proposal_type: ProposalType,
    pub meta_json: Option<Value>,
    pub description: Option<Value>,
    /// Withdrawal amounts in lovelace.
    pub withdrawals: Vec<u64>,
    pub lifecycle: ProposalLifecycle,
}

/// A classified proposal, as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub proposal: ProposalRef,
    pub proposal_type: ProposalType,
    pub classification: ClassifiedProposal,
    pub lifecycle: ProposalLifecycle,
    pub summary: Option<String>,
}

impl Proposal {
    pub fn is_relevant_to(&self, category: Category) -> bool {
        self.classification.categories.contains(&category)
    }

    pub fn treasury_tier(&self) -> Option<TreasuryTier> {
        self.classification.withdrawal.map(|w| w.tier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedProposal {
    pub title: String,
    pub abstract_text: Option<String>,
    pub withdrawal: Option<TreasuryWithdrawal>,
    pub categories: BTreeSet<Category>,
}

/// Total withdrawal of a treasury proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreasuryWithdrawal {
    pub amount: u64,
    pub tier: TreasuryTier,
}

impl TreasuryWithdrawal {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            tier: TreasuryTier::from_lovelace(amount),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalType {
    ParameterChange,
    HardForkInitiation,
    TreasuryWithdrawals,
    NoConfidence,
    NewCommittee,
    NewConstitution,
    InfoAction,
}

impl ProposalType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProposalType::ParameterChange => "ParameterChange",
            ProposalType::HardForkInitiation => "HardForkInitiation",
            ProposalType::TreasuryWithdrawals => "TreasuryWithdrawals",
            ProposalType::NoConfidence => "NoConfidence",
            ProposalType::NewCommittee => "NewCommittee",
            ProposalType::NewConstitution => "NewConstitution",
            ProposalType::InfoAction => "InfoAction",
        }
    }
}

impl Display for ProposalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ParameterChange" => Ok(ProposalType::ParameterChange),
            "HardForkInitiation" => Ok(ProposalType::HardForkInitiation),
            "TreasuryWithdrawals" => Ok(ProposalType::TreasuryWithdrawals),
            "NoConfidence" => Ok(ProposalType::NoConfidence),
            "NewCommittee" => Ok(ProposalType::NewCommittee),
            "NewConstitution" => Ok(ProposalType::NewConstitution),
            "InfoAction" => Ok(ProposalType::InfoAction),
            other => Err(UnknownVariant::new("proposal type", other)),
        }
    }
}

/// Size class of a treasury withdrawal, by total ADA requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TreasuryTier {
    Routine,
    Significant,
    Major,
}

impl TreasuryTier {
    const SIGNIFICANT_ADA: u64 = 1_000_000;
    const MAJOR_ADA: u64 = 20_000_000;

    pub fn from_lovelace(amount: u64) -> Self {
        let ada = amount / LOVELACE_PER_ADA;
        if ada >= Self::MAJOR_ADA {
            TreasuryTier::Major
        } else if ada >= Self::SIGNIFICANT_ADA {
            TreasuryTier::Significant
        } else {
            TreasuryTier::Routine
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TreasuryTier::Routine => "routine",
            TreasuryTier::Significant => "significant",
            TreasuryTier::Major => "major",
        }
    }
}

impl FromStr for TreasuryTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routine" => Ok(TreasuryTier::Routine),
            "significant" => Ok(TreasuryTier::Significant),
            "major" => Ok(TreasuryTier::Major),
            other => Err(UnknownVariant::new("treasury tier", other)),
        }
    }
}

/// Policy category a proposal can be relevant to and a voter can express a preference for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    TreasuryConservative,
    TreasuryGrowth,
    Decentralization,
    Security,
    Innovation,
    Transparency,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::TreasuryConservative,
        Category::TreasuryGrowth,
        Category::Decentralization,
        Category::Security,
        Category::Innovation,
        Category::Transparency,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::TreasuryConservative => "treasury-conservative",
            Category::TreasuryGrowth => "treasury-growth",
            Category::Decentralization => "decentralization",
            Category::Security => "security",
            Category::Innovation => "innovation",
            Category::Transparency => "transparency",
        }
    }

    pub const fn is_treasury(self) -> bool {
        matches!(
            self,
            Category::TreasuryConservative | Category::TreasuryGrowth
        )
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("category", s))
    }
}

/// Epochs of a proposal's lifecycle. The type admits at most one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalLifecycle {
    pub proposed_epoch: u32,
    pub expiration_epoch: Option<u32>,
    pub status: ProposalStatus,
}

impl ProposalLifecycle {
    /// Last epoch in which the proposal was open for voting, bounded by `current_epoch`.
    pub fn last_open_epoch(&self, current_epoch: u32) -> u32 {
        let last = self
            .status
            .epoch()
            .or(self.expiration_epoch)
            .unwrap_or(current_epoch);
        last.min(current_epoch)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProposalStatus {
    #[default]
    Active,
    Ratified(u32),
    Enacted(u32),
    Dropped(u32),
    Expired(u32),
}

impl ProposalStatus {
    /// Build the status from the individual terminal epochs reported upstream. Enacted proposals
    /// are also ratified; the most advanced state wins.
    pub fn from_epochs(
        ratified: Option<u32>,
        enacted: Option<u32>,
        dropped: Option<u32>,
        expired: Option<u32>,
    ) -> Self {
        enacted
            .map(ProposalStatus::Enacted)
            .or(ratified.map(ProposalStatus::Ratified))
            .or(dropped.map(ProposalStatus::Dropped))
            .or(expired.map(ProposalStatus::Expired))
            .unwrap_or_default()
    }

    pub fn epoch(self) -> Option<u32> {
        match self {
            ProposalStatus::Active => None,
            ProposalStatus::Ratified(epoch)
            | ProposalStatus::Enacted(epoch)
            | ProposalStatus::Dropped(epoch)
            | ProposalStatus::Expired(epoch) => Some(epoch),
        }
    }

    pub fn ratified_epoch(self) -> Option<u32> {
        match self {
            ProposalStatus::Ratified(epoch) => Some(epoch),
            _ => None,
        }
    }

    pub fn enacted_epoch(self) -> Option<u32> {
        match self {
            ProposalStatus::Enacted(epoch) => Some(epoch),
            _ => None,
        }
    }

    pub fn dropped_epoch(self) -> Option<u32> {
        match self {
            ProposalStatus::Dropped(epoch) => Some(epoch),
            _ => None,
        }
    }

    pub fn expired_epoch(self) -> Option<u32> {
        match self {
            ProposalStatus::Expired(epoch) => Some(epoch),
            _ => None,
        }
    }
}

/// Yes/No/Abstain counts over the persisted votes of one proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub yes: u64,
    pub no: u64,
    pub abstain: u64,
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        Category, LOVELACE_PER_ADA, ProposalLifecycle, ProposalStatus, TreasuryTier,
    };

    #[test]
    fn test_treasury_tier() {
        let ada = |n: u64| n * LOVELACE_PER_ADA;

        assert_eq!(TreasuryTier::from_lovelace(0), TreasuryTier::Routine);
        assert_eq!(
            TreasuryTier::from_lovelace(ada(999_999)),
            TreasuryTier::Routine
        );
        assert_eq!(
            TreasuryTier::from_lovelace(ada(1_000_000)),
            TreasuryTier::Significant
        );
        assert_eq!(
            TreasuryTier::from_lovelace(ada(19_999_999)),
            TreasuryTier::Significant
        );
        assert_eq!(
            TreasuryTier::from_lovelace(ada(20_000_000)),
            TreasuryTier::Major
        );
        assert_eq!(
            TreasuryTier::from_lovelace(ada(25_000_000)),
            TreasuryTier::Major
        );
    }

    #[test]
    fn test_status_from_epochs() {
        let status = ProposalStatus::from_epochs(Some(510), Some(511), None, None);
        assert_eq!(status, ProposalStatus::Enacted(511));

        let status = ProposalStatus::from_epochs(None, None, None, Some(520));
        assert_eq!(status, ProposalStatus::Expired(520));

        let status = ProposalStatus::from_epochs(None, None, None, None);
        assert_eq!(status, ProposalStatus::Active);
    }

    #[test]
    fn test_last_open_epoch() {
        let lifecycle = ProposalLifecycle {
            proposed_epoch: 500,
            expiration_epoch: Some(506),
            status: ProposalStatus::Active,
        };
        assert_eq!(lifecycle.last_open_epoch(503), 503);
        assert_eq!(lifecycle.last_open_epoch(510), 506);

        let lifecycle = ProposalLifecycle {
            status: ProposalStatus::Dropped(502),
            ..lifecycle
        };
        assert_eq!(lifecycle.last_open_epoch(510), 502);
    }

    #[test]
    fn test_category_parse() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().ok(), Some(category));
        }
        assert!("growth".parse::<Category>().is_err());
    }
}
