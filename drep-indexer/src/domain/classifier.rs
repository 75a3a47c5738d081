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

use crate::domain::{
    Category, ClassifiedProposal, Proposal, ProposalRef, ProposalType, RawProposal,
    TreasuryWithdrawal,
};
use serde_json::Value;
use std::collections::BTreeSet;

const TREASURY_KEYWORDS: &[&str] = &[
    "treasury",
    "withdrawal",
    "budget",
    "funding",
    "grant",
    "spending",
];
const DECENTRALIZATION_KEYWORDS: &[&str] = &[
    "decentraliz",
    "decentralis",
    "stake pool",
    "distribution",
    "concentration",
    "community",
];
const SECURITY_KEYWORDS: &[&str] = &[
    "security",
    "audit",
    "vulnerab",
    "attack",
    "risk",
    "safety",
];
const INNOVATION_KEYWORDS: &[&str] = &[
    "innovation",
    "research",
    "upgrade",
    "scaling",
    "development",
    "smart contract",
];
const TRANSPARENCY_KEYWORDS: &[&str] = &[
    "transparen",
    "accountab",
    "report",
    "disclos",
    "open source",
];

/// Known layouts of proposal anchor metadata, in extraction priority order.
#[derive(Debug, Clone, Copy)]
pub enum MetadataShape<'a> {
    /// CIP-108: fields nested under `body`.
    Nested(&'a Value),

    /// Legacy: fields at the top level.
    Flat(&'a Value),

    /// Plain text description without any structure.
    Description(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Abstract,
}

type Extractor = fn(MetadataShape<'_>, Field) -> Option<String>;

const EXTRACTORS: [Extractor; 3] = [extract_nested, extract_flat, extract_description];

/// Classify a raw proposal: title and abstract extraction, treasury tier and relevant categories.
pub fn classify(raw: &RawProposal) -> ClassifiedProposal {
    let shapes = metadata_shapes(raw);

    let title = extract(&shapes, Field::Title).unwrap_or_else(|| fallback_title(&raw.proposal));
    let abstract_text = extract(&shapes, Field::Abstract);

    let withdrawal = (raw.proposal_type == ProposalType::TreasuryWithdrawals)
        .then(|| TreasuryWithdrawal::new(raw.withdrawals.iter().sum()));

    let categories = match raw.proposal_type {
        ProposalType::TreasuryWithdrawals => {
            BTreeSet::from([Category::TreasuryConservative, Category::TreasuryGrowth])
        }

        ProposalType::ParameterChange => BTreeSet::from([Category::Security]),

        ProposalType::HardForkInitiation => {
            BTreeSet::from([Category::Security, Category::Innovation])
        }

        ProposalType::NoConfidence | ProposalType::NewCommittee => {
            BTreeSet::from([Category::Decentralization, Category::Security])
        }

        ProposalType::NewConstitution => {
            BTreeSet::from([Category::Security, Category::Transparency])
        }

        ProposalType::InfoAction => info_action_categories(&title, abstract_text.as_deref()),
    };

    ClassifiedProposal {
        title,
        abstract_text,
        withdrawal,
        categories,
    }
}

impl From<RawProposal> for Proposal {
    fn from(raw: RawProposal) -> Self {
        let classification = classify(&raw);

        Self {
            proposal: raw.proposal,
            proposal_type: raw.proposal_type,
            classification,
            lifecycle: raw.lifecycle,
            summary: None,
        }
    }
}

fn info_action_categories(title: &str, abstract_text: Option<&str>) -> BTreeSet<Category> {
    let text = format!("{title} {}", abstract_text.unwrap_or_default()).to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|keyword| text.contains(keyword));

    let mut categories = BTreeSet::new();
    if matches(TREASURY_KEYWORDS) {
        categories.insert(Category::TreasuryConservative);
        categories.insert(Category::TreasuryGrowth);
    }
    if matches(DECENTRALIZATION_KEYWORDS) {
        categories.insert(Category::Decentralization);
    }
    if matches(SECURITY_KEYWORDS) {
        categories.insert(Category::Security);
    }
    if matches(INNOVATION_KEYWORDS) {
        categories.insert(Category::Innovation);
    }
    if matches(TRANSPARENCY_KEYWORDS) {
        categories.insert(Category::Transparency);
    }

    if categories.is_empty() {
        categories.insert(Category::Transparency);
    }
    categories
}

fn metadata_shapes(raw: &RawProposal) -> Vec<MetadataShape<'_>> {
    let mut shapes = Vec::with_capacity(3);

    if let Some(meta_json) = &raw.meta_json {
        if let Some(body) = meta_json.get("body").filter(|body| body.is_object()) {
            shapes.push(MetadataShape::Nested(body));
        }
        if meta_json.is_object() {
            shapes.push(MetadataShape::Flat(meta_json));
        }
    }

    if let Some(description) = raw.description.as_ref().and_then(Value::as_str) {
        shapes.push(MetadataShape::Description(description));
    }

    shapes
}

fn extract(shapes: &[MetadataShape<'_>], field: Field) -> Option<String> {
    shapes
        .iter()
        .flat_map(|&shape| EXTRACTORS.iter().map(move |extractor| extractor(shape, field)))
        .flatten()
        .next()
}

fn extract_nested(shape: MetadataShape<'_>, field: Field) -> Option<String> {
    match shape {
        MetadataShape::Nested(body) => match field {
            Field::Title => text_field(body, "title"),
            Field::Abstract => text_field(body, "abstract"),
        },
        _ => None,
    }
}

fn extract_flat(shape: MetadataShape<'_>, field: Field) -> Option<String> {
    match shape {
        MetadataShape::Flat(value) => match field {
            Field::Title => text_field(value, "title").or_else(|| text_field(value, "name")),
            Field::Abstract => ["abstract", "summary", "description"]
                .into_iter()
                .find_map(|key| text_field(value, key)),
        },
        _ => None,
    }
}

fn extract_description(shape: MetadataShape<'_>, field: Field) -> Option<String> {
    match (shape, field) {
        (MetadataShape::Description(text), Field::Abstract) => non_empty(text),
        _ => None,
    }
}

/// Text of a metadata field, either a plain string or a JSON-LD `{"@value": ...}` object.
pub fn text_field(value: &Value, key: &str) -> Option<String> {
    let field = value.get(key)?;
    field
        .as_str()
        .or_else(|| field.get("@value").and_then(Value::as_str))
        .and_then(non_empty)
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn fallback_title(proposal: &ProposalRef) -> String {
    let prefix = proposal
        .tx_hash
        .get(..8)
        .unwrap_or(proposal.tx_hash.as_str());
    format!("Proposal {prefix}...#{}", proposal.index)
}
