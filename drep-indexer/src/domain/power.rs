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

use crate::domain::{DRepId, PowerSource, ResolvedPower};

/// Voting power of a delegate at an epoch, in lovelace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerSnapshot {
    pub drep_id: DRepId,
    pub epoch: u32,
    pub amount: u64,
}

/// A persisted vote whose voting power is missing or only approximated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedVote {
    pub tx_hash: String,
    pub epoch: u32,
    pub source: Option<PowerSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerResolution {
    pub tx_hash: String,
    pub power: ResolvedPower,
}

/// Resolve voting power for votes from a delegate's snapshots: a snapshot at the vote's epoch is
/// exact, otherwise the closest snapshot (the earlier one on ties) is nearest. Votes already
/// resolved as nearest are only upgraded to exact; votes without any snapshot stay unresolved.
pub fn resolve_power(votes: &[UnresolvedVote], snapshots: &[PowerSnapshot]) -> Vec<PowerResolution> {
    votes
        .iter()
        .filter(|vote| vote.source != Some(PowerSource::Exact))
        .filter_map(|vote| {
            let exact = snapshots.iter().find(|snapshot| snapshot.epoch == vote.epoch);

            let power = match exact {
                Some(snapshot) => ResolvedPower {
                    amount: snapshot.amount,
                    source: PowerSource::Exact,
                },

                None if vote.source.is_none() => {
                    let nearest = snapshots
                        .iter()
                        .min_by_key(|snapshot| (snapshot.epoch.abs_diff(vote.epoch), snapshot.epoch))?;
                    ResolvedPower {
                        amount: nearest.amount,
                        source: PowerSource::Nearest,
                    }
                }

                None => return None,
            };

            Some(PowerResolution {
                tx_hash: vote.tx_hash.clone(),
                power,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::domain::{PowerSnapshot, PowerSource, UnresolvedVote, resolve_power};

    fn snapshot(epoch: u32, amount: u64) -> PowerSnapshot {
        PowerSnapshot {
            drep_id: "drep1".to_owned(),
            epoch,
            amount,
        }
    }

    fn vote(tx_hash: &str, epoch: u32, source: Option<PowerSource>) -> UnresolvedVote {
        UnresolvedVote {
            tx_hash: tx_hash.to_owned(),
            epoch,
            source,
        }
    }

    #[test]
    fn test_exact_match() {
        let snapshots = [snapshot(500, 10), snapshot(501, 11)];
        let resolutions = resolve_power(&[vote("a", 501, None)], &snapshots);

        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].power.amount, 11);
        assert_eq!(resolutions[0].power.source, PowerSource::Exact);
    }

    #[test]
    fn test_nearest_tie_prefers_earlier() {
        let snapshots = [snapshot(510, 20), snapshot(506, 10)];
        let resolutions = resolve_power(&[vote("a", 508, None)], &snapshots);

        assert_eq!(resolutions[0].power.amount, 10);
        assert_eq!(resolutions[0].power.source, PowerSource::Nearest);
    }

    #[test]
    fn test_upgrades_only() {
        let snapshots = [snapshot(500, 10)];
        let votes = [
            vote("exact", 500, Some(PowerSource::Exact)),
            vote("nearest-upgrade", 500, Some(PowerSource::Nearest)),
            vote("nearest-keep", 503, Some(PowerSource::Nearest)),
        ];

        let resolutions = resolve_power(&votes, &snapshots);
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].tx_hash, "nearest-upgrade");
        assert_eq!(resolutions[0].power.source, PowerSource::Exact);
    }

    #[test]
    fn test_no_history() {
        assert!(resolve_power(&[vote("a", 500, None)], &[]).is_empty());
    }
}
