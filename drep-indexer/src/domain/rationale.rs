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

use crate::domain::text_field;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::error::Error as StdError;

/// CIP-136 vote rationale body fields, in display order.
const RATIONALE_FIELDS: &[&str] = &[
    "summary",
    "rationaleStatement",
    "precedentDiscussion",
    "counterargumentDiscussion",
    "conclusion",
];

/// Pre-CIP-136 fields carrying free-form rationale text.
const LEGACY_FIELDS: &[&str] = &["comment", "rationale", "description"];

/// A vote whose external rationale has not been fetched yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRationale {
    pub vote_tx_hash: String,
    pub url: String,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRationale {
    pub text: String,
    pub hash_verified: bool,
}

/// A rationale cache entry; `text` is `None` for permanently unresolved anchors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationaleEntry {
    pub vote_tx_hash: String,
    pub url: String,
    pub text: Option<String>,
    pub hash_verified: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Fetches the document behind an external rationale anchor.
#[trait_variant::make(Send)]
pub trait RationaleFetcher
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    /// Fetch and extract the rationale text; `expected_hash` is the anchor's blake2b-256 hash.
    async fn fetch(
        &self,
        url: &str,
        expected_hash: Option<&str>,
    ) -> Result<FetchedRationale, Self::Error>;
}

/// Extract rationale text from a CIP-100/CIP-136 document, falling back to legacy fields.
pub fn rationale_text(json: &Value) -> Option<String> {
    let body = json.get("body").filter(|body| body.is_object());

    let structured = body
        .map(|body| {
            RATIONALE_FIELDS
                .iter()
                .filter_map(|field| text_field(body, field))
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .filter(|text| !text.is_empty());

    structured.or_else(|| {
        body.into_iter()
            .chain([json])
            .flat_map(|value| LEGACY_FIELDS.iter().map(move |field| text_field(value, field)))
            .flatten()
            .next()
    })
}
