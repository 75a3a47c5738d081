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

use crate::domain::{Summarizer, storage::Storage};
use drep_common::{batch::BatchOutcome, error::StdErrorExt};
use fastrace::trace;
use log::{debug, info, warn};

/// Summarize up to `limit` resolved rationales and up to `limit` proposal abstracts lacking a
/// summary. A failing item is counted and skipped.
#[trace]
pub async fn summarize(
    limit: usize,
    summarizer: &impl Summarizer,
    storage: &impl Storage,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    match storage.get_unsummarized_rationales(limit).await {
        Ok(rationales) => {
            for (vote_tx_hash, text) in rationales {
                let result = match summarizer.summarize(&text).await {
                    Ok(summary) => storage
                        .save_rationale_summary(&vote_tx_hash, &summary)
                        .await
                        .map_err(|error| error.as_chain()),
                    Err(error) => Err(error.as_chain()),
                };

                if let Err(error) = &result {
                    debug!(vote_tx_hash, error; "cannot summarize rationale");
                }
                outcome.record(1, result);
            }
        }

        Err(error) => {
            warn!(error:% = error.as_chain(); "cannot get unsummarized rationales");
            outcome.fail(1, error.as_chain());
        }
    }

    match storage.get_unsummarized_proposals(limit).await {
        Ok(proposals) => {
            for (proposal, text) in proposals {
                let result = match summarizer.summarize(&text).await {
                    Ok(summary) => storage
                        .save_proposal_summary(&proposal, &summary)
                        .await
                        .map_err(|error| error.as_chain()),
                    Err(error) => Err(error.as_chain()),
                };

                if let Err(error) = &result {
                    debug!(proposal:%, error; "cannot summarize proposal");
                }
                outcome.record(1, result);
            }
        }

        Err(error) => {
            warn!(error:% = error.as_chain(); "cannot get unsummarized proposals");
            outcome.fail(1, error.as_chain());
        }
    }

    info!(summarized = outcome.succeeded, failed = outcome.failed; "summaries created");

    outcome
}
