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

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::de::DeserializeOwned;
use std::env;

const CONFIG_FILE: &str = "CONFIG_FILE";
const CONFIG_FILE_DEFAULT: &str = "config.yaml";

/// Extension methods for configuration types.
pub trait ConfigExt
where
    Self: DeserializeOwned,
{
    /// Load the configuration from the YAML file given by the `CONFIG_FILE` environment variable
    /// (defaults to `config.yaml`), overridden by `APP__` prefixed environment variables with
    /// `__` as the separator for nested keys, e.g. `APP__INFRA__STORAGE__PASSWORD`.
    fn load() -> Result<Self, Box<figment::Error>> {
        let config_file = env::var(CONFIG_FILE).unwrap_or_else(|_| CONFIG_FILE_DEFAULT.to_owned());

        Figment::new()
            .merge(Yaml::file(config_file))
            .merge(Env::prefixed("APP__").split("__"))
            .extract()
            .map_err(Box::new)
    }
}

impl<T> ConfigExt for T where T: DeserializeOwned {}
