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

use crate::infra::pool::sqlite::SqlitePool;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Run the database migrations for SQLite.
pub async fn run(pool: &SqlitePool) -> Result<(), Error> {
    sqlx::migrate!("migrations/sqlite").run(&**pool).await?;
    Ok(())
}

/// Error possibly returned by [run].
#[derive(Debug, Error)]
#[error("cannot run migrations for sqlite")]
pub struct Error(#[from] MigrateError);

#[cfg(test)]
mod tests {
    use crate::infra::{
        migrations::sqlite::run,
        pool::{self, sqlite::SqlitePool},
    };
    use anyhow::Context;
    use std::{collections::HashSet, error::Error as StdError};

    #[tokio::test]
    async fn test_run() -> Result<(), Box<dyn StdError>> {
        let temp_dir = tempfile::tempdir().context("cannot create tempdir")?;
        let sqlite_file = temp_dir.path().join("drep.sqlite").display().to_string();
        let pool = SqlitePool::new(pool::sqlite::Config {
            cnn_url: sqlite_file,
        })
        .await?;

        let result = run(&pool).await;
        assert!(result.is_ok());

        let table_names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table'",
        )
        .fetch_all(&*pool)
        .await?
        .into_iter()
        .collect::<HashSet<_>>();

        for table_name in [
            "delegates",
            "votes",
            "proposals",
            "power_snapshots",
            "score_history",
            "rationale_cache",
            "sync_runs",
        ] {
            assert!(table_names.contains(table_name), "missing table {table_name}");
        }

        Ok(())
    }
}
