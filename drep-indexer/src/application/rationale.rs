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

use crate::domain::{PendingRationale, RationaleEntry, RationaleFetcher, storage::Storage};
use chrono::Utc;
use drep_common::{batch::BatchOutcome, error::StdErrorExt};
use fastrace::trace;
use futures::{StreamExt, stream};
use log::{debug, info, warn};

/// Resolve up to `limit` external rationales not yet cached, most recent votes first. Anchors
/// which cannot be fetched or parsed are cached as unresolved and never fetched again; both
/// outcomes are persisted, only unresolved ones count as failed.
#[trace]
pub async fn resolve_rationales(
    limit: usize,
    concurrency: usize,
    fetcher: &impl RationaleFetcher,
    storage: &impl Storage,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    let pending = match storage.get_pending_rationales(limit).await {
        Ok(pending) => pending,

        Err(error) => {
            warn!(error:% = error.as_chain(); "cannot get pending rationales");
            outcome.fail(1, error.as_chain());
            return outcome;
        }
    };
    debug!(pending = pending.len(); "resolving rationales");

    let results = stream::iter(pending)
        .map(move |pending| resolve_rationale(pending, fetcher, storage))
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

    for result in results {
        outcome += result;
    }

    info!(
        resolved = outcome.succeeded,
        unresolved = outcome.failed;
        "rationales resolved"
    );

    outcome
}

async fn resolve_rationale(
    pending: PendingRationale,
    fetcher: &impl RationaleFetcher,
    storage: &impl Storage,
) -> BatchOutcome {
    let PendingRationale {
        vote_tx_hash,
        url,
        hash,
    } = pending;
    let mut outcome = BatchOutcome::default();

    let fetched = fetcher.fetch(&url, hash.as_deref()).await;
    let (text, hash_verified) = match fetched {
        Ok(fetched) => (Some(fetched.text), fetched.hash_verified),

        Err(error) => {
            let error = error.as_chain();
            debug!(vote_tx_hash, url, error; "cannot resolve rationale");
            outcome.fail(1, format!("{url}: {error}"));
            (None, false)
        }
    };
    let resolved = text.is_some();

    let entry = RationaleEntry {
        vote_tx_hash,
        url,
        text,
        hash_verified,
        fetched_at: Utc::now(),
    };

    match storage.save_rationale(&entry).await {
        Ok(()) if resolved => outcome.succeed(1),
        Ok(()) => {}

        Err(error) => {
            warn!(vote_tx_hash = entry.vote_tx_hash, error:% = error.as_chain(); "cannot save rationale");
            if resolved {
                outcome.fail(1, error.as_chain());
            }
        }
    }

    outcome
}
