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

use crate::domain::{DRepId, DRepRecord, PowerSnapshot, RawProposal, Vote};
use drep_common::{batch::BatchOutcome, retry::Retryable};
use std::error::Error as StdError;

/// Read access to an already indexed chain-data API.
#[trait_variant::make(Send)]
pub trait Upstream
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Retryable + Send + Sync + 'static;

    /// Check availability and return the current epoch.
    async fn health_check(&self) -> Result<u32, Self::Error>;

    /// All registered delegate ids.
    async fn fetch_drep_ids(&self) -> Result<Vec<DRepId>, Self::Error>;

    /// Registration data and profile metadata for the given ids, requesting at most
    /// `batch_size` ids per call. A failing call only loses its own ids, which are counted as
    /// failed in the returned outcome.
    async fn fetch_batch(&self, ids: &[DRepId], batch_size: usize)
    -> (Vec<DRepRecord>, BatchOutcome);

    /// All votes of one delegate.
    async fn fetch_votes(&self, drep_id: &str) -> Result<Vec<Vote>, Self::Error>;

    async fn fetch_proposals(&self) -> Result<Vec<RawProposal>, Self::Error>;

    /// Voting power per epoch of one delegate.
    async fn fetch_power_history(&self, drep_id: &str)
    -> Result<Vec<PowerSnapshot>, Self::Error>;

    async fn fetch_delegator_count(&self, drep_id: &str) -> Result<u64, Self::Error>;
}
