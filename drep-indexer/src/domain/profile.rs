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
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// CIP-119 DRep profile metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DRepMetadata {
    pub given_name: Option<String>,
    pub ticker: Option<String>,
    pub handle: Option<String>,
    pub objectives: Option<String>,
    pub motivations: Option<String>,
    pub qualifications: Option<String>,
    pub bio: Option<String>,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub label: Option<String>,
    pub uri: String,
}

impl DRepMetadata {
    /// Parse CIP-119 JSON, falling back to top-level fields for pre-standard documents.
    pub fn from_json(json: &Value) -> Self {
        let body = json.get("body").filter(|body| body.is_object()).unwrap_or(json);

        let given_name = text_field(body, "givenName").or_else(|| text_field(body, "name"));

        let references = body
            .get("references")
            .and_then(Value::as_array)
            .map(|references| {
                references
                    .iter()
                    .filter_map(|reference| {
                        text_field(reference, "uri").map(|uri| Reference {
                            label: text_field(reference, "label"),
                            uri,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            given_name,
            ticker: text_field(body, "ticker"),
            handle: text_field(body, "handle"),
            objectives: text_field(body, "objectives"),
            motivations: text_field(body, "motivations"),
            qualifications: text_field(body, "qualifications"),
            bio: text_field(body, "bio"),
            references,
        }
    }

    pub fn valid_link_count(&self) -> usize {
        self.references
            .iter()
            .filter(|reference| is_web_link(&reference.uri))
            .count()
    }
}

fn is_web_link(uri: &str) -> bool {
    Url::parse(uri)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or_default()
}

/// Profile completeness: 0..=100 points for the presence of profile fields and links.
pub fn profile_completeness(metadata: Option<&DRepMetadata>) -> u8 {
    let Some(metadata) = metadata else {
        return 0;
    };

    let field = |value: &Option<String>, points: u32| {
        if value.is_some() { points } else { 0 }
    };

    let links = match metadata.valid_link_count() {
        0 => 0,
        1 => 25,
        _ => 30,
    };

    let total = field(&metadata.given_name, 15)
        + field(&metadata.objectives, 20)
        + field(&metadata.motivations, 15)
        + field(&metadata.qualifications, 10)
        + field(&metadata.bio, 10)
        + links;

    total.min(100) as u8
}
