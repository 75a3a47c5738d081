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

#[cfg(any(feature = "cloud", feature = "standalone"))]
#[tokio::main]
async fn main() {
    use drep_common::telemetry;
    use log::error;
    use std::panic;

    telemetry::init_logging();
    panic::set_hook(Box::new(|panic| error!(panic:%; "process panicked")));

    if let Err(error) = run().await {
        let backtrace = error.backtrace();
        let error = format!("{error:#}");
        error!(error, backtrace:%; "process exited with ERROR");
        std::process::exit(1);
    }
}

#[cfg(any(feature = "cloud", feature = "standalone"))]
async fn run() -> anyhow::Result<()> {
    use anyhow::Context;
    use drep_common::{config::ConfigExt, telemetry};
    use drep_indexer::{
        application,
        config::Config,
        infra::{
            self, koios::KoiosClient, rationale::HttpRationaleFetcher, storage::Storage,
            summarizer::HttpSummarizer,
        },
    };
    use log::info;
    use tokio::signal::unix::{SignalKind, signal};

    let sigterm = signal(SignalKind::terminate()).context("register SIGTERM handler")?;

    let config = Config::load().context("load configuration")?;
    info!(config:?; "starting");
    let Config {
        run_migrations,
        application_config,
        infra_config,
        telemetry_config:
            telemetry::Config {
                tracing_config,
                metrics_config,
            },
    } = config;

    telemetry::init_tracing(tracing_config);
    telemetry::init_metrics(metrics_config).context("initialize metrics")?;

    let infra::Config {
        storage_config,
        upstream_config,
        rationale_config,
        summarizer_config,
    } = infra_config;

    let storage = create_storage(storage_config, run_migrations).await?;
    let upstream = KoiosClient::new(upstream_config).context("create upstream client")?;
    let fetcher =
        HttpRationaleFetcher::new(rationale_config).context("create rationale fetcher")?;
    let summarizer = HttpSummarizer::new(summarizer_config).context("create summarizer")?;

    application::run(
        application_config,
        upstream,
        storage,
        fetcher,
        summarizer,
        sigterm,
    )
    .await
    .context("run DRep indexer application")
}

#[cfg(feature = "cloud")]
async fn create_storage(
    config: drep_common::infra::pool::postgres::Config,
    run_migrations: bool,
) -> anyhow::Result<drep_indexer::infra::storage::Storage> {
    use anyhow::Context;
    use drep_common::infra::{migrations, pool::postgres::PostgresPool};

    let pool = PostgresPool::new(config)
        .await
        .context("create DB pool for Postgres")?;

    if run_migrations {
        migrations::postgres::run(&pool)
            .await
            .context("run Postgres migrations")?;
    }

    Ok(drep_indexer::infra::storage::Storage::new(pool))
}

#[cfg(all(feature = "standalone", not(feature = "cloud")))]
async fn create_storage(
    config: drep_common::infra::pool::sqlite::Config,
    run_migrations: bool,
) -> anyhow::Result<drep_indexer::infra::storage::Storage> {
    use anyhow::Context;
    use drep_common::infra::{migrations, pool::sqlite::SqlitePool};

    let pool = SqlitePool::new(config)
        .await
        .context("create DB pool for SQLite")?;

    if run_migrations {
        migrations::sqlite::run(&pool)
            .await
            .context("run SQLite migrations")?;
    }

    Ok(drep_indexer::infra::storage::Storage::new(pool))
}

#[cfg(not(any(feature = "cloud", feature = "standalone")))]
fn main() {
    unimplemented!()
}
