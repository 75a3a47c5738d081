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

use serde::Serialize;
use std::{fmt::Display, ops::AddAssign};

/// Only the first errors are kept to bound memory for large runs.
const MAX_ERRORS: usize = 16;

/// Tally of a best-effort batch operation: items which succeeded, items which failed and the
/// (first) error messages. Batch operations return this instead of failing, such that callers can
/// aggregate partial failures across stages.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BatchOutcome {
    /// Count the given number of items as succeeded.
    pub fn succeed(&mut self, count: usize) {
        self.succeeded += count;
    }

    /// Count the given number of items as failed with the given error.
    pub fn fail(&mut self, count: usize, error: impl Display) {
        self.failed += count;
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error.to_string());
        }
    }

    /// Count the given number of items as succeeded or failed depending on the given result.
    pub fn record<T, E>(&mut self, count: usize, result: Result<T, E>)
    where
        E: Display,
    {
        match result {
            Ok(_) => self.succeed(count),
            Err(error) => self.fail(count, error),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Whether no item failed.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

impl AddAssign for BatchOutcome {
    fn add_assign(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;

        let remaining = MAX_ERRORS.saturating_sub(self.errors.len());
        self.errors.extend(other.errors.into_iter().take(remaining));
    }
}

#[cfg(test)]
mod tests {
    use crate::batch::BatchOutcome;

    #[test]
    fn test_record() {
        let mut outcome = BatchOutcome::default();
        outcome.record(100, Ok::<_, String>(()));
        outcome.record(42, Err::<(), _>("boom"));

        assert_eq!(outcome.succeeded, 100);
        assert_eq!(outcome.failed, 42);
        assert_eq!(outcome.errors, vec!["boom".to_owned()]);
        assert_eq!(outcome.total(), 142);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_add_assign_bounds_errors() {
        let mut outcome = BatchOutcome::default();
        for _ in 0..20 {
            let mut other = BatchOutcome::default();
            other.fail(1, "failed");
            outcome += other;
        }

        assert_eq!(outcome.failed, 20);
        assert_eq!(outcome.errors.len(), 16);
    }
}
