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

use crate::domain::stack::engine::{ResourceRef, StackSummary};
use crate::domain::stack::name::StackName;
use crate::infrastructure::constants::{
    LABEL_MANAGED_BY, LABEL_MANAGED_BY_VALUE, LABEL_PROJECT, LABEL_STACK, RECORD_KEY_IMAGE,
    RECORD_KEY_LAST_OPERATION, RECORD_KEY_PORT, RECORD_KEY_RESOURCES, RECORD_KEY_UPDATED_AT,
    RECORD_KEY_URL,
};
use crate::shared::error::DeployError;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Name of the ConfigMap that records `stack` within `project`.
pub fn record_name(project: &str, stack: &StackName) -> String {
    format!("{}-{}", project, stack)
}

/// Label selector matching every stack record of `project`.
pub fn record_selector(project: &str) -> String {
    format!(
        "{}={},{}={}",
        LABEL_MANAGED_BY, LABEL_MANAGED_BY_VALUE, LABEL_PROJECT, project
    )
}

/// What the engine remembers about a stack between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackRecord {
    pub image: Option<String>,
    pub port: Option<String>,
    pub url: Option<String>,
    pub last_operation: Option<String>,
    pub updated_at: Option<String>,
    pub resources: Vec<ResourceRef>,
}

impl StackRecord {
    pub fn from_configmap(configmap: &ConfigMap) -> Result<Self, DeployError> {
        let empty = BTreeMap::new();
        let data = configmap.data.as_ref().unwrap_or(&empty);
        let field = |key: &str| data.get(key).filter(|v| !v.is_empty()).cloned();

        let resources = match data.get(RECORD_KEY_RESOURCES) {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)?,
            _ => Vec::new(),
        };

        Ok(Self {
            image: field(RECORD_KEY_IMAGE),
            port: field(RECORD_KEY_PORT),
            url: field(RECORD_KEY_URL),
            last_operation: field(RECORD_KEY_LAST_OPERATION),
            updated_at: field(RECORD_KEY_UPDATED_AT),
            resources,
        })
    }

    /// Stamp the record with the operation that just finished.
    pub fn touch(&mut self, operation: &str) {
        self.last_operation = Some(operation.to_string());
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }

    pub fn summary(&self, name: impl Into<String>) -> StackSummary {
        StackSummary {
            name: name.into(),
            image: self.image.clone(),
            port: self.port.clone(),
            url: self.url.clone(),
            last_operation: self.last_operation.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

pub struct StackRecordBuilder<'a> {
    project: &'a str,
    stack: &'a StackName,
    namespace: &'a str,
    record: &'a StackRecord,
}

impl<'a> StackRecordBuilder<'a> {
    pub fn new(
        project: &'a str,
        stack: &'a StackName,
        namespace: &'a str,
        record: &'a StackRecord,
    ) -> Self {
        Self {
            project,
            stack,
            namespace,
            record,
        }
    }

    pub fn build(&self) -> Result<ConfigMap, DeployError> {
        let metadata = ObjectMeta {
            name: Some(record_name(self.project, self.stack)),
            namespace: Some(self.namespace.to_string()),
            labels: Some(self.get_labels()),
            ..Default::default()
        };

        let mut data = BTreeMap::new();
        let optional = [
            (RECORD_KEY_IMAGE, &self.record.image),
            (RECORD_KEY_PORT, &self.record.port),
            (RECORD_KEY_URL, &self.record.url),
            (RECORD_KEY_LAST_OPERATION, &self.record.last_operation),
            (RECORD_KEY_UPDATED_AT, &self.record.updated_at),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                data.insert(key.to_string(), value.clone());
            }
        }
        data.insert(
            RECORD_KEY_RESOURCES.to_string(),
            serde_json::to_string(&self.record.resources)?,
        );

        Ok(ConfigMap {
            metadata,
            data: Some(data),
            ..Default::default()
        })
    }

    pub fn get_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(
            LABEL_MANAGED_BY.to_string(),
            LABEL_MANAGED_BY_VALUE.to_string(),
        );
        labels.insert(LABEL_PROJECT.to_string(), self.project.to_string());
        labels.insert(LABEL_STACK.to_string(), self.stack.to_string());
        labels
    }
}
