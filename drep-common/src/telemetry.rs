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

use fastrace::collector::{self, ConsoleReporter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use serde::Deserialize;
use std::net::IpAddr;

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "tracing")]
    pub tracing_config: TracingConfig,

    #[serde(rename = "metrics")]
    pub metrics_config: MetricsConfig,
}

/// Tracing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    pub enabled: bool,
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: IpAddr,
    pub port: u16,
}

/// Initialize logging: structured key-value records to stdout, filtered via `RUST_LOG`.
pub fn init_logging() {
    logforth::starter_log::stdout().apply();
}

/// Initialize tracing: report finished spans if enabled. Spans created via `fastrace::trace` are
/// no-ops unless a reporter is set.
pub fn init_tracing(config: TracingConfig) {
    if config.enabled {
        fastrace::set_reporter(ConsoleReporter, collector::Config::default());
    }
}

/// Initialize metrics: serve Prometheus metrics via HTTP if enabled.
pub fn init_metrics(config: MetricsConfig) -> Result<(), BuildError> {
    let MetricsConfig {
        enabled,
        address,
        port,
    } = config;

    if enabled {
        PrometheusBuilder::new()
            .with_http_listener((address, port))
            .install()?;
    }

    Ok(())
}
