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
    DRepId, DRepInfo, DRepMetadata, DRepRecord, Decision, PowerSnapshot, ProposalLifecycle,
    ProposalRef, ProposalStatus, ProposalType, RationaleRef, RationaleResolution, RawProposal,
    Vote, rationale_text, upstream::Upstream,
};
use chrono::DateTime;
use drep_common::{
    batch::BatchOutcome,
    error::StdErrorExt,
    retry::{RetryPolicy, Retryable},
};
use fastrace::trace;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{
    Deserialize, Deserializer,
    de::{DeserializeOwned, IgnoredAny},
};
use serde_json::{Value, json};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;
use tokio::time::sleep;

/// Config for the Koios API client.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Delay between two consecutive `fetch_batch` requests.
    #[serde(with = "humantime_serde")]
    pub batch_delay: Duration,

    pub page_size: usize,

    pub retry_policy: RetryPolicy,

    #[serde(default)]
    pub epoch_clock: EpochClock,
}

/// Maps block times to epochs; defaults to Cardano mainnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EpochClock {
    /// Unix time of the first Shelley era slot.
    pub shelley_start_time: i64,
    pub shelley_start_epoch: u32,
    /// Epoch length in seconds.
    pub epoch_length: i64,
}

impl EpochClock {
    pub fn epoch_of(&self, block_time: i64) -> u32 {
        let epochs = (block_time - self.shelley_start_time).max(0) / self.epoch_length.max(1);
        self.shelley_start_epoch + epochs as u32
    }
}

impl Default for EpochClock {
    fn default() -> Self {
        Self {
            shelley_start_time: 1_596_059_091,
            shelley_start_epoch: 208,
            epoch_length: 432_000,
        }
    }
}

/// An [Upstream] implementation based on the Koios REST API.
#[derive(Debug, Clone)]
pub struct KoiosClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    batch_delay: Duration,
    page_size: usize,
    retry_policy: RetryPolicy,
    epoch_clock: EpochClock,
}

impl KoiosClient {
    /// Create a new [KoiosClient] with the given [Config].
    pub fn new(config: Config) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_owned(),
            api_key: config.api_key,
            batch_delay: config.batch_delay,
            page_size: config.page_size.max(1),
            retry_policy: config.retry_policy,
            epoch_clock: config.epoch_clock,
        })
    }

    async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned,
    {
        let url = &format!("{}{path}", self.base_url);
        self.retry_policy
            .retry(|| async move { self.execute(path, self.http.get(url).query(query)).await })
            .await
    }

    async fn post<T>(&self, path: &str, body: &Value) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned,
    {
        let url = &format!("{}{path}", self.base_url);
        self.retry_policy
            .retry(|| async move { self.execute(path, self.http.post(url).json(body)).await })
            .await
    }

    /// GET all pages of a paginated resource.
    async fn get_all<T>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>, UpstreamError>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();

        loop {
            let mut page_query = query.to_vec();
            page_query.push(("limit", self.page_size.to_string()));
            page_query.push(("offset", items.len().to_string()));

            let page = self.get::<Vec<T>>(path, &page_query).await?;
            let page_len = page.len();
            items.extend(page);

            if page_len < self.page_size {
                break;
            }
        }

        Ok(items)
    }

    async fn execute<T>(&self, path: &str, request: RequestBuilder) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned,
    {
        let request = match &self.api_key {
            Some(api_key) => request.bearer_auth(api_key.expose_secret()),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|error| UpstreamError::from_request(path, error))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited(path.to_owned()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                path: path.to_owned(),
                status,
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|error| UpstreamError::from_request(path, error))
    }

    async fn fetch_metadata(
        &self,
        ids: &[DRepId],
    ) -> Result<HashMap<DRepId, DRepMetadata>, UpstreamError> {
        let body = json!({ "_drep_ids": ids });
        let metadata = self
            .post::<Vec<DRepMetadataResponse>>("/drep_metadata", &body)
            .await?
            .into_iter()
            .filter_map(|response| {
                let json = response.meta_json?;
                Some((response.drep_id, DRepMetadata::from_json(&json)))
            })
            .collect();

        Ok(metadata)
    }

    fn make_vote(&self, drep_id: &str, response: DRepVoteResponse) -> Option<Vote> {
        let decision = match response.vote.parse::<Decision>() {
            Ok(decision) => decision,
            Err(error) => {
                warn!(drep_id, vote_tx_hash = response.vote_tx_hash; "skipping vote: {error}");
                return None;
            }
        };

        let inline = response.meta_json.as_ref().and_then(rationale_text);
        let rationale = match (inline, response.meta_url) {
            (Some(text), _) => Some(RationaleRef::Inline(text)),
            (None, Some(url)) if !url.trim().is_empty() => Some(RationaleRef::External {
                url,
                hash: response.meta_hash,
            }),
            _ => None,
        };

        Some(Vote {
            tx_hash: response.vote_tx_hash,
            drep_id: drep_id.to_owned(),
            proposal: ProposalRef::new(response.proposal_tx_hash, response.proposal_index),
            decision,
            epoch: self.epoch_clock.epoch_of(response.block_time),
            block_time: DateTime::from_timestamp(response.block_time, 0).unwrap_or_default(),
            rationale,
            resolution: RationaleResolution::Pending,
            power: None,
        })
    }
}

impl Upstream for KoiosClient {
    type Error = UpstreamError;

    #[trace]
    async fn health_check(&self) -> Result<u32, Self::Error> {
        let tip = self.get::<Vec<TipResponse>>("/tip", &[]).await?;
        let epoch_no = tip
            .first()
            .map(|tip| tip.epoch_no)
            .ok_or(UpstreamError::EmptyTip)?;
        debug!(epoch_no; "upstream healthy");

        Ok(epoch_no)
    }

    #[trace]
    async fn fetch_drep_ids(&self) -> Result<Vec<DRepId>, Self::Error> {
        let ids = self
            .get_all::<DRepListEntry>("/drep_list", &[])
            .await?
            .into_iter()
            .map(|entry| entry.drep_id)
            .collect();

        Ok(ids)
    }

    #[trace]
    async fn fetch_batch(
        &self,
        ids: &[DRepId],
        batch_size: usize,
    ) -> (Vec<DRepRecord>, BatchOutcome) {
        let mut records = Vec::with_capacity(ids.len());
        let mut outcome = BatchOutcome::default();

        for (n, batch) in ids.chunks(batch_size.max(1)).enumerate() {
            if n > 0 {
                sleep(self.batch_delay).await;
            }

            let body = json!({ "_drep_ids": batch });
            let infos = match self.post::<Vec<DRepInfoResponse>>("/drep_info", &body).await {
                Ok(infos) => infos,

                Err(error) => {
                    let error = error.as_chain();
                    warn!(batch_size = batch.len(), error; "cannot fetch DRep batch, skipping");
                    outcome.fail(batch.len(), error);
                    continue;
                }
            };
            outcome.succeed(batch.len());

            let mut metadata = match self.fetch_metadata(batch).await {
                Ok(metadata) => metadata,
                Err(error) => {
                    warn!(error:%; "cannot fetch DRep metadata, continuing without");
                    HashMap::new()
                }
            };

            records.extend(infos.into_iter().map(|info| DRepRecord {
                metadata: metadata.remove(&info.drep_id),
                info: DRepInfo {
                    id: info.drep_id,
                    hex: info.hex,
                    active: info.active,
                    voting_power: info.amount,
                    meta_url: info.meta_url,
                    meta_hash: info.meta_hash,
                },
            }));
        }

        (records, outcome)
    }

    #[trace(properties = { "drep_id": "{drep_id}" })]
    async fn fetch_votes(&self, drep_id: &str) -> Result<Vec<Vote>, Self::Error> {
        let query = [("_drep_id", drep_id.to_owned())];
        let votes = self
            .get_all::<DRepVoteResponse>("/drep_votes", &query)
            .await?
            .into_iter()
            .filter_map(|response| self.make_vote(drep_id, response))
            .collect();

        Ok(votes)
    }

    #[trace]
    async fn fetch_proposals(&self) -> Result<Vec<RawProposal>, Self::Error> {
        let proposals = self
            .get_all::<ProposalResponse>("/proposal_list", &[])
            .await?
            .into_iter()
            .filter_map(|response| {
                let proposal_type = match response.proposal_type.parse::<ProposalType>() {
                    Ok(proposal_type) => proposal_type,
                    Err(error) => {
                        warn!(
                            proposal_tx_hash = response.proposal_tx_hash;
                            "skipping proposal: {error}"
                        );
                        return None;
                    }
                };

                let withdrawals = match response.withdrawal {
                    Some(Withdrawals::Many(withdrawals)) => withdrawals,
                    Some(Withdrawals::One(withdrawal)) => vec![withdrawal],
                    None => vec![],
                };

                Some(RawProposal {
                    proposal: ProposalRef::new(response.proposal_tx_hash, response.proposal_index),
                    proposal_type,
                    meta_json: response.meta_json,
                    description: response.proposal_description,
                    withdrawals: withdrawals.into_iter().map(|w| w.amount).collect(),
                    lifecycle: ProposalLifecycle {
                        proposed_epoch: response.proposed_epoch,
                        expiration_epoch: response.expiration,
                        status: ProposalStatus::from_epochs(
                            response.ratified_epoch,
                            response.enacted_epoch,
                            response.dropped_epoch,
                            response.expired_epoch,
                        ),
                    },
                })
            })
            .collect();

        Ok(proposals)
    }

    #[trace(properties = { "drep_id": "{drep_id}" })]
    async fn fetch_power_history(
        &self,
        drep_id: &str,
    ) -> Result<Vec<PowerSnapshot>, Self::Error> {
        let query = [("_drep_id", drep_id.to_owned())];
        let snapshots = self
            .get_all::<PowerHistoryEntry>("/drep_voting_power_history", &query)
            .await?
            .into_iter()
            .map(|entry| PowerSnapshot {
                drep_id: drep_id.to_owned(),
                epoch: entry.epoch_no,
                amount: entry.amount,
            })
            .collect();

        Ok(snapshots)
    }

    #[trace(properties = { "drep_id": "{drep_id}" })]
    async fn fetch_delegator_count(&self, drep_id: &str) -> Result<u64, Self::Error> {
        let query = [("_drep_id", drep_id.to_owned())];
        let delegators = self
            .get_all::<IgnoredAny>("/drep_delegators", &query)
            .await?;

        Ok(delegators.len() as u64)
    }
}

/// Error possibly returned by [KoiosClient].
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("rate limited requesting {0}")]
    RateLimited(String),

    #[error("timeout requesting {0}")]
    Timeout(String),

    #[error("unexpected status {status} requesting {path}: {body}")]
    Status {
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("cannot request {0}")]
    Request(String, #[source] reqwest::Error),

    #[error("tip response is empty")]
    EmptyTip,

    #[error("cannot create HTTP client")]
    Client(#[source] reqwest::Error),
}

impl UpstreamError {
    fn from_request(path: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            UpstreamError::Timeout(path.to_owned())
        } else {
            UpstreamError::Request(path.to_owned(), error)
        }
    }
}

impl Retryable for UpstreamError {
    fn is_retryable(&self) -> bool {
        matches!(self, UpstreamError::RateLimited(_) | UpstreamError::Timeout(_))
    }
}

#[derive(Debug, Deserialize)]
struct TipResponse {
    epoch_no: u32,
}

#[derive(Debug, Deserialize)]
struct DRepListEntry {
    drep_id: String,
}

#[derive(Debug, Deserialize)]
struct DRepInfoResponse {
    drep_id: String,

    hex: Option<String>,

    #[serde(default)]
    active: bool,

    #[serde(default, deserialize_with = "lovelace")]
    amount: u64,

    meta_url: Option<String>,

    meta_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DRepMetadataResponse {
    drep_id: String,

    #[serde(default, alias = "json")]
    meta_json: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DRepVoteResponse {
    proposal_tx_hash: String,
    proposal_index: u32,
    vote_tx_hash: String,
    block_time: i64,
    vote: String,

    #[serde(default)]
    meta_url: Option<String>,

    #[serde(default)]
    meta_hash: Option<String>,

    #[serde(default)]
    meta_json: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PowerHistoryEntry {
    epoch_no: u32,

    #[serde(deserialize_with = "lovelace")]
    amount: u64,
}

#[derive(Debug, Deserialize)]
struct ProposalResponse {
    proposal_tx_hash: String,
    proposal_index: u32,
    proposal_type: String,

    #[serde(default)]
    proposal_description: Option<Value>,

    proposed_epoch: u32,
    ratified_epoch: Option<u32>,
    enacted_epoch: Option<u32>,
    dropped_epoch: Option<u32>,
    expired_epoch: Option<u32>,
    expiration: Option<u32>,

    #[serde(default)]
    meta_json: Option<Value>,

    #[serde(default)]
    withdrawal: Option<Withdrawals>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Withdrawals {
    Many(Vec<Withdrawal>),
    One(Withdrawal),
}

#[derive(Debug, Deserialize)]
struct Withdrawal {
    #[serde(deserialize_with = "lovelace")]
    amount: u64,
}

/// Lovelace amounts are delivered as decimal strings, sometimes as numbers or null.
fn lovelace<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(u64),
        Text(String),
    }

    match Option::<Amount>::deserialize(deserializer)? {
        Some(Amount::Number(amount)) => Ok(amount),
        Some(Amount::Text(amount)) => amount.parse().map_err(serde::de::Error::custom),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{Decision, ProposalStatus, ProposalType, RationaleRef, upstream::Upstream},
        infra::koios::{Config, EpochClock, KoiosClient, UpstreamError},
    };
    use assert_matches::assert_matches;
    use drep_common::retry::{RetryPolicy, Retryable};
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path, query_param},
    };

    fn client(server: &MockServer, api_key: Option<&str>) -> KoiosClient {
        let config = Config {
            url: server.uri(),
            api_key: api_key.map(|api_key| SecretString::from(api_key.to_owned())),
            timeout: Duration::from_secs(5),
            batch_delay: Duration::from_millis(1),
            page_size: 2,
            retry_policy: RetryPolicy::new(3, Duration::from_millis(5)),
            epoch_clock: EpochClock::default(),
        };
        KoiosClient::new(config).expect("client can be created")
    }

    #[test]
    fn test_epoch_clock() {
        let clock = EpochClock::default();
        assert_eq!(clock.epoch_of(1_596_059_091), 208);
        assert_eq!(clock.epoch_of(1_596_059_091 + 432_000 * 300 + 1), 508);
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tip"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "epoch_no": 575 }])))
            .expect(1)
            .mount(&server)
            .await;

        let epoch = client(&server, Some("secret")).health_check().await;
        assert_matches!(epoch, Ok(575));
    }

    #[tokio::test]
    async fn test_rate_limited_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tip"))
            .respond_with(ResponseTemplate::new(429))
            .expect(4)
            .mount(&server)
            .await;

        let error = client(&server, None).health_check().await;
        assert_matches!(error, Err(error @ UpstreamError::RateLimited(_)) if error.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tip"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let error = client(&server, None).health_check().await;
        assert_matches!(
            error,
            Err(error @ UpstreamError::Status { .. }) if !error.is_retryable()
        );
    }

    #[tokio::test]
    async fn test_fetch_drep_ids_paginated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drep_list"))
            .and(query_param("offset", "0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "drep_id": "drep1a" }, { "drep_id": "drep1b" }])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drep_list"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "drep_id": "drep1c" }])))
            .mount(&server)
            .await;

        let ids = client(&server, None).fetch_drep_ids().await.expect("ids can be fetched");
        assert_eq!(ids, vec!["drep1a", "drep1b", "drep1c"]);
    }

    #[tokio::test]
    async fn test_fetch_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/drep_info"))
            .and(body_json(json!({ "_drep_ids": ["drep1a"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "drep_id": "drep1a",
                "hex": "aa",
                "active": true,
                "amount": "1500000",
                "meta_url": "https://example.com/drep.jsonld",
                "meta_hash": "abcd"
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drep_info"))
            .and(body_json(json!({ "_drep_ids": ["drep1b"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "drep_id": "drep1b",
                "active": false,
                "amount": null
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drep_metadata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "drep_id": "drep1a",
                "meta_json": { "body": { "givenName": "Alice" } }
            }])))
            .expect(2)
            .mount(&server)
            .await;

        let ids = vec!["drep1a".to_owned(), "drep1b".to_owned()];
        let (records, outcome) = client(&server, None).fetch_batch(&ids, 1).await;

        assert_eq!(outcome.succeeded, 2);
        assert!(outcome.is_complete());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].info.voting_power, 1_500_000);
        assert_eq!(
            records[0].metadata.as_ref().and_then(|m| m.given_name.as_deref()),
            Some("Alice")
        );
        assert!(!records[1].info.active);
        assert_eq!(records[1].info.voting_power, 0);
        assert!(records[1].metadata.is_none());
    }

    #[tokio::test]
    async fn test_failing_batch_keeps_other_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/drep_info"))
            .and(body_json(json!({ "_drep_ids": ["drep1a"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "drep_id": "drep1a",
                "active": true,
                "amount": "42"
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drep_info"))
            .and(body_json(json!({ "_drep_ids": ["drep1b"] })))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drep_info"))
            .and(body_json(json!({ "_drep_ids": ["drep1c"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "drep_id": "drep1c",
                "active": true,
                "amount": "7"
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drep_metadata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let ids = vec!["drep1a".to_owned(), "drep1b".to_owned(), "drep1c".to_owned()];
        let (records, outcome) = client(&server, None).fetch_batch(&ids, 1).await;

        let ids = records
            .iter()
            .map(|record| record.info.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["drep1a", "drep1c"]);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_votes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drep_votes"))
            .and(query_param("_drep_id", "drep1a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "proposal_tx_hash": "p1",
                    "proposal_index": 0,
                    "vote_tx_hash": "v1",
                    "block_time": 1_596_059_091 + 432_000 * 300,
                    "vote": "Yes",
                    "meta_url": "ipfs://bafy",
                    "meta_hash": "abcd"
                },
                {
                    "proposal_tx_hash": "p2",
                    "proposal_index": 1,
                    "vote_tx_hash": "v2",
                    "block_time": 1_596_059_091,
                    "vote": "Maybe"
                }
            ])))
            .mount(&server)
            .await;

        let votes = client(&server, None)
            .fetch_votes("drep1a")
            .await
            .expect("votes can be fetched");

        assert_eq!(votes.len(), 1);
        let vote = &votes[0];
        assert_eq!(vote.decision, Decision::Yes);
        assert_eq!(vote.epoch, 508);
        assert_matches!(
            &vote.rationale,
            Some(RationaleRef::External { url, hash: Some(hash) }) if url == "ipfs://bafy" && hash == "abcd"
        );
    }

    #[tokio::test]
    async fn test_fetch_proposals() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/proposal_list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "proposal_tx_hash": "p1",
                "proposal_index": 0,
                "proposal_type": "TreasuryWithdrawals",
                "proposed_epoch": 500,
                "ratified_epoch": 502,
                "enacted_epoch": 503,
                "dropped_epoch": null,
                "expired_epoch": null,
                "expiration": 506,
                "withdrawal": [
                    { "stake_address": "stake1a", "amount": "1000000" },
                    { "stake_address": "stake1b", "amount": "2000000" }
                ]
            }])))
            .mount(&server)
            .await;

        let proposals = client(&server, None)
            .fetch_proposals()
            .await
            .expect("proposals can be fetched");

        assert_eq!(proposals.len(), 1);
        let proposal = &proposals[0];
        assert_eq!(proposal.proposal_type, ProposalType::TreasuryWithdrawals);
        assert_eq!(proposal.withdrawals, vec![1_000_000, 2_000_000]);
        assert_eq!(proposal.lifecycle.status, ProposalStatus::Enacted(503));
    }
}
