// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tool settings loaded from a TOML file

use crate::infrastructure::constants::{
    COLUMN_WIDTH, DEFAULT_PROJECT, DEFAULT_STATE_NAMESPACE, FIELD_MANAGER, LIST_HEIGHT,
    MIN_SERVER_MINOR, POLL_INITIAL_MS, POLL_MAX_MS, PROVIDER_NAME, READY_TIMEOUT_SECS, TICK_MS,
};
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stack: StackConf,
    pub kubernetes: KubernetesConf,
    pub provider: ProviderConf,
    pub engine: EngineConf,
    pub dashboard: DashboardConf,
    pub logging: LoggingConf,
}

impl Settings {
    pub fn from<T: AsRef<str>>(path: T) -> anyhow::Result<Self> {
        let content = read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.as_ref(), e))?;

        let conf: Self =
            toml::from_str(&content).map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;

        Ok(conf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConf {
    /// Project the stacks belong to
    pub project: String,
    /// Namespace where stack records are kept
    pub state_namespace: String,
}

impl Default for StackConf {
    fn default() -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            state_namespace: DEFAULT_STATE_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConf {
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
    pub field_manager: String,
}

impl Default for KubernetesConf {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            field_manager: FIELD_MANAGER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConf {
    pub name: String,
    /// Oldest Kubernetes 1.x minor release the provider accepts
    pub min_server_minor: u32,
}

impl Default for ProviderConf {
    fn default() -> Self {
        Self {
            name: PROVIDER_NAME.to_string(),
            min_server_minor: MIN_SERVER_MINOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConf {
    pub ready_timeout_secs: u64,
    pub poll_initial_ms: u64,
    pub poll_max_ms: u64,
}

impl Default for EngineConf {
    fn default() -> Self {
        Self {
            ready_timeout_secs: READY_TIMEOUT_SECS,
            poll_initial_ms: POLL_INITIAL_MS,
            poll_max_ms: POLL_MAX_MS,
        }
    }
}

impl EngineConf {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn poll_initial(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }

    pub fn poll_max(&self) -> Duration {
        Duration::from_millis(self.poll_max_ms.max(self.poll_initial_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConf {
    pub tick_ms: u64,
    pub column_width: usize,
    pub list_height: usize,
}

impl Default for DashboardConf {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            column_width: COLUMN_WIDTH,
            list_height: LIST_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConf {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
    /// Write logs here instead of stderr
    pub file: Option<String>,
}

impl Default for LoggingConf {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}
