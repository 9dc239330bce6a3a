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

//! In-process engine that keeps stacks in memory. Used by tests and for
//! exercising the dashboard without a cluster.

use crate::domain::config::AppSpec;
use crate::domain::stack::engine::{
    Engine, ProviderSpec, RefreshSummary, ResourceRef, StackSummary, UpResult,
};
use crate::domain::stack::events::EventSink;
use crate::domain::stack::name::StackName;
use crate::infrastructure::constants::{DEFAULT_PROJECT, OUTPUT_URL};
use crate::infrastructure::kubernetes::resources::planned_resources;
use crate::shared::error::DeployError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Engine call that should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    UpsertStack,
    InstallProvider,
    Refresh,
    Up,
    Destroy,
}

#[derive(Debug, Default)]
struct StackState {
    app: Option<AppSpec>,
    resources: Vec<ResourceRef>,
}

pub struct InMemoryEngine {
    project: String,
    outputs: HashMap<String, serde_json::Value>,
    failure: Option<FailurePoint>,
    stacks: Mutex<BTreeMap<StackName, StackState>>,
}

impl InMemoryEngine {
    /// An engine whose updates report `endpoint` as the `url` output.
    pub fn new(endpoint: &str) -> Self {
        let mut outputs = HashMap::new();
        outputs.insert(OUTPUT_URL.to_string(), serde_json::Value::from(endpoint));
        Self::with_outputs(outputs)
    }

    pub fn with_outputs(outputs: HashMap<String, serde_json::Value>) -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            outputs,
            failure: None,
            stacks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn failing_at(mut self, point: FailurePoint) -> Self {
        self.failure = Some(point);
        self
    }

    /// Pretend `app` was already deployed to `stack`.
    pub fn seed(&self, stack: &StackName, app: AppSpec) {
        let resources = planned_resources(&self.project, stack, &app.name);
        self.lock().insert(
            stack.clone(),
            StackState {
                app: Some(app),
                resources,
            },
        );
    }

    pub fn has_stack(&self, stack: &StackName) -> bool {
        self.lock().contains_key(stack)
    }

    pub fn resources(&self, stack: &StackName) -> Vec<ResourceRef> {
        self.lock()
            .get(stack)
            .map(|s| s.resources.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<StackName, StackState>> {
        // A poisoned lock only means a test panicked mid-call; the map is still usable.
        self.stacks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, point: FailurePoint) -> Result<(), DeployError> {
        if self.failure == Some(point) {
            return Err(DeployError::KubeError(format!(
                "injected failure at {:?}",
                point
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Engine for InMemoryEngine {
    async fn upsert_stack(&self, stack: &StackName) -> Result<(), DeployError> {
        self.check(FailurePoint::UpsertStack)?;
        self.lock().entry(stack.clone()).or_default();
        Ok(())
    }

    async fn install_provider(&self, _provider: &ProviderSpec) -> Result<(), DeployError> {
        self.check(FailurePoint::InstallProvider)
    }

    async fn refresh(&self, stack: &StackName) -> Result<RefreshSummary, DeployError> {
        self.check(FailurePoint::Refresh)?;
        Ok(RefreshSummary {
            resources: self.resources(stack),
        })
    }

    async fn up(
        &self,
        stack: &StackName,
        app: &AppSpec,
        events: &EventSink,
    ) -> Result<UpResult, DeployError> {
        self.check(FailurePoint::Up)?;
        let planned = planned_resources(&self.project, stack, &app.name);
        let (component, children) = planned
            .split_first()
            .ok_or_else(|| DeployError::InvalidResource("empty program".to_string()))?;

        events.pre(&component.urn, &component.type_name).await;
        for resource in children {
            events.pre(&resource.urn, &resource.type_name).await;
            events.outputs(&resource.urn, &resource.type_name).await;
        }
        events.outputs(&component.urn, &component.type_name).await;

        let mut stacks = self.lock();
        let state = stacks.entry(stack.clone()).or_default();
        state.app = Some(app.clone());
        state.resources = planned;

        Ok(UpResult {
            outputs: self.outputs.clone(),
        })
    }

    async fn destroy(&self, stack: &StackName, events: &EventSink) -> Result<(), DeployError> {
        self.check(FailurePoint::Destroy)?;
        let existing = self.resources(stack);
        if let Some((component, children)) = existing.split_first() {
            events.pre(&component.urn, &component.type_name).await;
            for resource in children.iter().rev() {
                events.pre(&resource.urn, &resource.type_name).await;
                events.outputs(&resource.urn, &resource.type_name).await;
            }
            events.outputs(&component.urn, &component.type_name).await;
        }

        if let Some(state) = self.lock().get_mut(stack) {
            state.resources.clear();
        }
        Ok(())
    }

    async fn remove_stack(&self, stack: &StackName) -> Result<(), DeployError> {
        let mut stacks = self.lock();
        if stacks.get(stack).is_some_and(|s| !s.resources.is_empty()) {
            return Err(DeployError::ValidationError(format!(
                "stack '{}' still has resources",
                stack
            )));
        }
        stacks.remove(stack);
        Ok(())
    }

    async fn list_stacks(&self) -> Result<Vec<StackSummary>, DeployError> {
        Ok(self
            .lock()
            .iter()
            .map(|(name, state)| StackSummary {
                name: name.to_string(),
                image: state.app.as_ref().map(|a| a.image.clone()),
                port: state.app.as_ref().map(|a| a.container_port.to_string()),
                url: self
                    .outputs
                    .get(OUTPUT_URL)
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                last_operation: None,
                updated_at: None,
            })
            .collect())
    }
}
