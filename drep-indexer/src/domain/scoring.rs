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

use crate::domain::to_score;
use serde::Deserialize;
use thiserror::Error;

/// Weights of the composite accountability score. They always sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawScoreWeights")]
pub struct ScoreWeights {
    participation: f64,
    rationale: f64,
    reliability: f64,
}

impl ScoreWeights {
    pub const ACCOUNTABILITY: ScoreWeights = ScoreWeights {
        participation: 0.45,
        rationale: 0.35,
        reliability: 0.20,
    };

    pub fn new(
        participation: f64,
        rationale: f64,
        reliability: f64,
    ) -> Result<Self, InvalidScoreWeights> {
        let weights = [participation, rationale, reliability];
        let sum = weights.iter().sum::<f64>();

        if weights.iter().any(|weight| !(0.0..=1.0).contains(weight))
            || (sum - 1.0).abs() > 1e-9
        {
            return Err(InvalidScoreWeights(participation, rationale, reliability));
        }

        Ok(Self {
            participation,
            rationale,
            reliability,
        })
    }

    /// Composite score 0..=100 from effective participation, rationale rate and reliability,
    /// each 0..=100.
    pub fn score(&self, effective_participation: u8, rationale_rate: u8, reliability: u8) -> u8 {
        let score = 100.0
            * (f64::from(effective_participation) / 100.0 * self.participation
                + f64::from(rationale_rate) / 100.0 * self.rationale
                + f64::from(reliability) / 100.0 * self.reliability);
        to_score(score)
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::ACCOUNTABILITY
    }
}

#[derive(Debug, Deserialize)]
struct RawScoreWeights {
    participation: f64,
    rationale: f64,
    reliability: f64,
}

impl TryFrom<RawScoreWeights> for ScoreWeights {
    type Error = InvalidScoreWeights;

    fn try_from(raw: RawScoreWeights) -> Result<Self, Self::Error> {
        ScoreWeights::new(raw.participation, raw.rationale, raw.reliability)
    }
}

#[derive(Debug, Error)]
#[error("score weights {0}, {1}, {2} must be within 0..=1 and sum to 1")]
pub struct InvalidScoreWeights(f64, f64, f64);

/// Display score blending the composite score with the alignment overall for voters with
/// preferences.
pub fn hybrid_score(score: u8, alignment_overall: u8) -> u8 {
    to_score(f64::from(score) * 0.6 + f64::from(alignment_overall) * 0.4)
}

#[cfg(test)]
mod tests {
    use crate::domain::{ScoreWeights, hybrid_score};
    use assert_matches::assert_matches;

    #[test]
    fn test_score() {
        let weights = ScoreWeights::ACCOUNTABILITY;

        assert_eq!(weights.score(0, 0, 0), 0);
        assert_eq!(weights.score(100, 100, 100), 100);
        // 35 * 0.45 + 80 * 0.35 + 60 * 0.20 = 15.75 + 28 + 12
        assert_eq!(weights.score(35, 80, 60), 56);
    }

    #[test]
    fn test_weights_validation() {
        assert_matches!(ScoreWeights::new(0.5, 0.3, 0.2), Ok(_));
        assert_matches!(ScoreWeights::new(0.5, 0.5, 0.2), Err(_));
        assert_matches!(ScoreWeights::new(1.2, -0.1, -0.1), Err(_));

        let weights =
            serde_json::from_str::<ScoreWeights>(r#"{"participation":0.6,"rationale":0.4,"reliability":0.0}"#);
        assert_matches!(weights, Ok(_));

        let weights =
            serde_json::from_str::<ScoreWeights>(r#"{"participation":0.6,"rationale":0.6,"reliability":0.0}"#);
        assert_matches!(weights, Err(_));
    }

    #[test]
    fn test_hybrid_score() {
        assert_eq!(hybrid_score(80, 50), 68);
        assert_eq!(hybrid_score(0, 100), 40);
    }
}
