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

pub mod storage;
pub mod upstream;

mod alignment;
mod classifier;
mod delegate;
mod enrichment;
mod power;
mod profile;
mod proposal;
mod rationale;
mod reliability;
mod scoring;
mod summarizer;
mod sync_run;
mod vote;

pub use alignment::*;
pub use classifier::*;
pub use delegate::*;
pub use enrichment::*;
pub use power::*;
pub use profile::*;
pub use proposal::*;
pub use rationale::*;
pub use reliability::*;
pub use scoring::*;
pub use summarizer::*;
pub use sync_run::*;
pub use vote::*;
