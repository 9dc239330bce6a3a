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

//! The orchestration engine seen from the operation driver

use crate::domain::config::AppSpec;
use crate::domain::stack::events::EventSink;
use crate::domain::stack::name::StackName;
use crate::shared::error::DeployError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider the engine must have available before it can act on a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: String,
    pub min_server_minor: u32,
}

/// A resource the engine currently tracks for a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub urn: String,
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub resources: Vec<ResourceRef>,
}

/// Outputs of a successful update, keyed by output name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpResult {
    pub outputs: HashMap<String, serde_json::Value>,
}

/// Stable identifier of a resource within a project and stack.
pub fn resource_urn(project: &str, stack: &StackName, type_name: &str, name: &str) -> String {
    format!("urn:productionapp:{}::{}::{}::{}", stack, project, type_name, name)
}

/// One row of `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSummary {
    pub name: String,
    pub image: Option<String>,
    pub port: Option<String>,
    pub url: Option<String>,
    pub last_operation: Option<String>,
    pub updated_at: Option<String>,
}

/// Creates, updates, refreshes and destroys the infrastructure behind a stack.
/// It owns all remote state; callers only observe.
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    /// Select the stack, creating it if it does not exist yet.
    async fn upsert_stack(&self, stack: &StackName) -> Result<(), DeployError>;

    /// Make sure the resource provider is present and usable.
    async fn install_provider(&self, provider: &ProviderSpec) -> Result<(), DeployError>;

    /// Reconcile recorded state with what actually exists.
    async fn refresh(&self, stack: &StackName) -> Result<RefreshSummary, DeployError>;

    /// Drive the stack to the declared program, reporting per-resource events.
    async fn up(
        &self,
        stack: &StackName,
        app: &AppSpec,
        events: &EventSink,
    ) -> Result<UpResult, DeployError>;

    /// Tear down every resource of the stack, reporting per-resource events.
    async fn destroy(&self, stack: &StackName, events: &EventSink) -> Result<(), DeployError>;

    /// Forget the stack entirely. Only valid once it has no resources.
    async fn remove_stack(&self, stack: &StackName) -> Result<(), DeployError>;

    async fn list_stacks(&self) -> Result<Vec<StackSummary>, DeployError>;
}
