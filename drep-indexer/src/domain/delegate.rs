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

use crate::domain::{AlignmentScores, DRepId, DRepMetadata, Reliability};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Registration data of a delegate as delivered by the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct DRepInfo {
    pub id: DRepId,
    pub hex: Option<String>,
    pub active: bool,
    /// Voting power in lovelace.
    pub voting_power: u64,
    pub meta_url: Option<String>,
    pub meta_hash: Option<String>,
}

/// Registration data together with the resolved profile metadata, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct DRepRecord {
    pub info: DRepInfo,
    pub metadata: Option<DRepMetadata>,
}

/// An enriched and scored delegate, as persisted once per sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct Delegate {
    pub id: DRepId,
    pub hex: Option<String>,
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub handle: Option<String>,
    pub metadata: Option<DRepMetadata>,
    pub active: bool,
    pub voting_power: u64,
    pub delegator_count: Option<u64>,
    pub vote_count: u64,
    pub metrics: DelegateMetrics,
    pub alignment: AlignmentScores,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DelegateMetrics {
    pub participation_rate: u8,
    pub rationale_rate: u8,
    pub deliberation_modifier: f64,
    pub effective_participation: u8,
    pub reliability: Reliability,
    pub profile_completeness: u8,
    pub score: u8,
}

impl Default for DelegateMetrics {
    fn default() -> Self {
        Self {
            participation_rate: 0,
            rationale_rate: 0,
            deliberation_modifier: 1.0,
            effective_participation: 0,
            reliability: Reliability::default(),
            profile_completeness: 0,
            score: 0,
        }
    }
}

/// One row of a delegate's daily score history.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreHistoryEntry {
    pub drep_id: DRepId,
    pub date: chrono::NaiveDate,
    pub score: u8,
    pub voting_power: u64,
    pub alignment: AlignmentScores,
}

impl ScoreHistoryEntry {
    pub fn for_delegate(delegate: &Delegate) -> Self {
        Self {
            drep_id: delegate.id.clone(),
            date: delegate.updated_at.date_naive(),
            score: delegate.metrics.score,
            voting_power: delegate.voting_power,
            alignment: delegate.alignment,
        }
    }
}
