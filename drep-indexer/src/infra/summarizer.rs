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

use crate::domain::Summarizer;
use fastrace::trace;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Config for the summarization service. Summaries are disabled without `url`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Maximum input length in characters; longer texts are truncated.
    pub max_input_len: usize,
}

/// A [Summarizer] implementation delegating to an HTTP service which accepts
/// `{"text": ...}` and responds with `{"summary": ...}`.
#[derive(Debug, Clone)]
pub struct HttpSummarizer {
    http: Client,
    url: Option<String>,
    api_key: Option<SecretString>,
    max_input_len: usize,
}

impl HttpSummarizer {
    pub fn new(config: Config) -> Result<Self, SummarizerError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SummarizerError::Request)?;

        Ok(Self {
            http,
            url: config.url,
            api_key: config.api_key,
            max_input_len: config.max_input_len,
        })
    }
}

impl Summarizer for HttpSummarizer {
    type Error = SummarizerError;

    fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    #[trace]
    async fn summarize(&self, text: &str) -> Result<String, Self::Error> {
        let url = self.url.as_deref().ok_or(SummarizerError::Disabled)?;
        let text = text.chars().take(self.max_input_len).collect::<String>();

        let request = self.http.post(url).json(&SummarizeRequest { text: &text });
        let request = match &self.api_key {
            Some(api_key) => request.bearer_auth(api_key.expose_secret()),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(SummarizerError::Request)?
            .error_for_status()
            .map_err(SummarizerError::Request)?
            .json::<SummarizeResponse>()
            .await
            .map_err(SummarizerError::Request)?;

        let summary = response.summary.trim();
        if summary.is_empty() {
            return Err(SummarizerError::EmptySummary);
        }

        Ok(summary.to_owned())
    }
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    summary: String,
}

/// Error possibly returned by [HttpSummarizer].
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer is not configured")]
    Disabled,

    #[error("cannot request summary")]
    Request(#[source] reqwest::Error),

    #[error("summarizer returned an empty summary")]
    EmptySummary,
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::Summarizer,
        infra::summarizer::{Config, HttpSummarizer, SummarizerError},
    };
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    fn config(url: Option<String>) -> Config {
        Config {
            url,
            api_key: None,
            timeout: Duration::from_secs(5),
            max_input_len: 5,
        }
    }

    #[tokio::test]
    async fn test_summarize() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize"))
            .and(body_json(json!({ "text": "Hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "summary": " Hi " })))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = HttpSummarizer::new(config(Some(format!("{}/summarize", server.uri()))))
            .expect("summarizer can be created");
        assert!(summarizer.is_enabled());

        let summary = summarizer.summarize("Hello world").await;
        assert_matches!(summary.as_deref(), Ok("Hi"));
    }

    #[tokio::test]
    async fn test_disabled() {
        let summarizer = HttpSummarizer::new(config(None)).expect("summarizer can be created");
        assert!(!summarizer.is_enabled());
        assert_matches!(
            summarizer.summarize("Hello").await,
            Err(SummarizerError::Disabled)
        );
    }
}
