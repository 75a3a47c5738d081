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

use crate::domain::{FetchedRationale, RationaleFetcher, rationale_text};
use blake2::{Blake2b, Digest, digest::consts::U32};
use drep_common::retry::{RetryPolicy, Retryable};
use fastrace::trace;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Config for fetching external rationale documents.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Maximum document size in bytes.
    pub max_size: usize,

    /// Gateway base URL `ipfs://` anchors are rewritten to, e.g. `https://ipfs.io/ipfs`.
    pub ipfs_gateway: String,

    pub retry_policy: RetryPolicy,
}

/// A [RationaleFetcher] implementation based on plain HTTP(S) and an IPFS gateway.
#[derive(Debug, Clone)]
pub struct HttpRationaleFetcher {
    http: Client,
    max_size: usize,
    ipfs_gateway: String,
    retry_policy: RetryPolicy,
}

impl HttpRationaleFetcher {
    pub fn new(config: Config) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            max_size: config.max_size,
            ipfs_gateway: config.ipfs_gateway.trim_end_matches('/').to_owned(),
            retry_policy: config.retry_policy,
        })
    }

    fn resolve_url(&self, url: &str) -> Result<String, FetchError> {
        let url = url.trim();

        if let Some(cid) = url.strip_prefix("ipfs://") {
            let cid = cid.trim_start_matches("ipfs/");
            return Ok(format!("{}/{cid}", self.ipfs_gateway));
        }

        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url.to_owned()),
            _ => Err(FetchError::InvalidUrl(url.to_owned())),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_request)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        if response
            .content_length()
            .is_some_and(|length| length as usize > self.max_size)
        {
            return Err(FetchError::TooLarge(self.max_size));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchError::from_request)? {
            if body.len() + chunk.len() > self.max_size {
                return Err(FetchError::TooLarge(self.max_size));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

impl RationaleFetcher for HttpRationaleFetcher {
    type Error = FetchError;

    #[trace(properties = { "url": "{url}" })]
    async fn fetch(
        &self,
        url: &str,
        expected_hash: Option<&str>,
    ) -> Result<FetchedRationale, Self::Error> {
        let url = &self.resolve_url(url)?;
        let body = self
            .retry_policy
            .retry(|| async move { self.download(url).await })
            .await?;

        let hash_verified = expected_hash.is_some_and(|expected_hash| {
            expected_hash.eq_ignore_ascii_case(&blake2b_256_hex(&body))
        });

        let json = serde_json::from_slice(&body).map_err(FetchError::Malformed)?;
        let text = rationale_text(&json).ok_or(FetchError::NoRationale)?;

        Ok(FetchedRationale {
            text,
            hash_verified,
        })
    }
}

/// Hex encoded blake2b-256 hash, as used for CIP-100 anchors.
fn blake2b_256_hex(bytes: &[u8]) -> String {
    const_hex::encode(Blake2b::<U32>::digest(bytes))
}

/// Error possibly returned by [HttpRationaleFetcher].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid rationale URL {0}")]
    InvalidUrl(String),

    #[error("rate limited")]
    RateLimited,

    #[error("timeout")]
    Timeout,

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("cannot request rationale")]
    Request(#[source] reqwest::Error),

    #[error("rationale exceeds {0} bytes")]
    TooLarge(usize),

    #[error("malformed rationale document")]
    Malformed(#[source] serde_json::Error),

    #[error("rationale document contains no rationale")]
    NoRationale,

    #[error("cannot create HTTP client")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    fn from_request(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(error)
        }
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited | FetchError::Timeout)
    }
}
