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

use thiserror::Error;
pub type Result<T> = std::result::Result<T, DeployError>;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Kubernetes API error: {0}")]
    KubeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resource not found: {resource_type} '{name}' in namespace '{namespace}'")]
    NotFound {
        resource_type: String,
        name: String,
        namespace: String,
    },

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<kube::Error> for DeployError {
    fn from(err: kube::Error) -> Self {
        DeployError::KubeError(err.to_string())
    }
}

impl DeployError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn not_found(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Broad class of a failed operation, used when reporting fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Stack selection/creation or provider installation failed.
    Setup,
    /// The engine reported a failed refresh, update or destroy.
    Operational,
    /// The engine succeeded but its outputs were missing or malformed.
    OutputContract,
}

/// A fatal failure of one deploy/destroy run, tagged with the phase it happened in.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("Failed to get stack: {0}")]
    StackSelection(#[source] DeployError),

    #[error("Failed to install program plugins: {0}")]
    PluginInstall(#[source] DeployError),

    #[error("Failed to refresh stack: {0}")]
    Refresh(#[source] DeployError),

    #[error("Failed to update stack: {0}")]
    Update(#[source] DeployError),

    #[error("Failed to destroy stack: {0}")]
    Destroy(#[source] DeployError),

    #[error("Failed to unmarshal output URL: {0}")]
    OutputContract(String),
}

impl OperationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::StackSelection(_) | Self::PluginInstall(_) => ErrorClass::Setup,
            Self::Refresh(_) | Self::Update(_) | Self::Destroy(_) => ErrorClass::Operational,
            Self::OutputContract(_) => ErrorClass::OutputContract,
        }
    }
}
