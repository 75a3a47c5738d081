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

use chrono::{DateTime, Utc};
use std::{
    fmt::{self, Display},
    str::FromStr,
};
use thiserror::Error;

/// Bech32 DRep identifier, e.g. `drep1...`.
pub type DRepId = String;

/// Rationales resolved from external anchors shorter than this are not counted.
pub const MIN_RATIONALE_LEN: usize = 50;

/// A vote cast by a delegate on a proposal. Uniquely identified by its transaction hash.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub tx_hash: String,
    pub drep_id: DRepId,
    pub proposal: ProposalRef,
    pub decision: Decision,
    pub epoch: u32,
    pub block_time: DateTime<Utc>,
    pub rationale: Option<RationaleRef>,
    pub resolution: RationaleResolution,
    pub power: Option<ResolvedPower>,
}

impl Vote {
    /// Whether this vote carries a rationale: non-empty inline text or an external anchor which is
    /// assumed to carry one unless its resolved text turned out too short.
    pub fn has_rationale(&self) -> bool {
        match &self.rationale {
            None => false,

            Some(RationaleRef::Inline(text)) => !text.trim().is_empty(),

            Some(RationaleRef::External { .. }) => match &self.resolution {
                RationaleResolution::Pending | RationaleResolution::Unresolved => true,
                RationaleResolution::Resolved(text) => {
                    text.trim().chars().count() >= MIN_RATIONALE_LEN
                }
            },
        }
    }
}

/// Reference to a governance proposal: the hash of the submitting transaction and the index of
/// the proposal within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProposalRef {
    pub tx_hash: String,
    pub index: u32,
}

impl ProposalRef {
    pub fn new(tx_hash: impl Into<String>, index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            index,
        }
    }
}

impl Display for ProposalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Decision {
    Yes,
    No,
    Abstain,
}

impl Decision {
    pub const fn as_str(self) -> &'static str {
        match self {
            Decision::Yes => "Yes",
            Decision::No => "No",
            Decision::Abstain => "Abstain",
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" | "yes" => Ok(Decision::Yes),
            "No" | "no" => Ok(Decision::No),
            "Abstain" | "abstain" => Ok(Decision::Abstain),
            other => Err(UnknownVariant::new("decision", other)),
        }
    }
}

/// Where a vote's rationale lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RationaleRef {
    Inline(String),
    External { url: String, hash: Option<String> },
}

/// Outcome of resolving an external rationale anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RationaleResolution {
    /// Not fetched yet.
    #[default]
    Pending,

    Resolved(String),

    /// Fetching failed permanently (broken URL, oversized or malformed payload); never retried.
    Unresolved,
}

/// Voting weight attributed to a historical vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPower {
    pub amount: u64,
    pub source: PowerSource,
}

/// How a vote's voting weight was determined. Ordered by preference: `Exact` beats `Nearest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PowerSource {
    Nearest,
    Exact,
}

impl PowerSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            PowerSource::Exact => "exact",
            PowerSource::Nearest => "nearest",
        }
    }
}

impl Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(PowerSource::Exact),
            "nearest" => Ok(PowerSource::Nearest),
            other => Err(UnknownVariant::new("power source", other)),
        }
    }
}

/// Error possibly returned when parsing domain enums from strings.
#[derive(Debug, Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
