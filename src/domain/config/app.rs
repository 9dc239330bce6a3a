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

use crate::infrastructure::constants::{
    APP_REPLICAS, LABEL_APP, LABEL_INSTANCE, SERVICE_PORT, SERVICE_TYPE_LOAD_BALANCER,
};
use crate::shared::error::DeployError;
use regex::Regex;
use std::collections::BTreeMap;

/// The application a stack deploys: one image behind a load balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    pub name: String,
    pub image: String,
    pub container_port: i32,
    pub replicas: i32,
    pub service_port: i32,
    pub service_type: String,
    pub image_pull_policy: Option<String>,
    pub extra_labels: BTreeMap<String, String>,
    pub service_annotations: BTreeMap<String, String>,
}

impl AppSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, container_port: i32) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            container_port,
            replicas: APP_REPLICAS,
            service_port: SERVICE_PORT,
            service_type: SERVICE_TYPE_LOAD_BALANCER.to_string(),
            image_pull_policy: None,
            extra_labels: BTreeMap::new(),
            service_annotations: BTreeMap::new(),
        }
    }

    /// Labels shared by every resource and used as the pod selector.
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_APP.to_string(), self.name.clone());
        labels.insert(LABEL_INSTANCE.to_string(), self.name.clone());
        labels
    }

    /// Selector labels plus any user-supplied ones. Selector keys win.
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.extra_labels.clone();
        labels.extend(self.selector_labels());
        labels
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        if !is_valid_k8s_name(&self.name) {
            return Err(DeployError::ConfigError(format!(
                "Invalid name: {} (lowercase letters, digits and '-' only)",
                self.name
            )));
        }

        if self.name.len() > 63 {
            return Err(DeployError::ConfigError(format!(
                "name too long (max 63 chars): {}",
                self.name
            )));
        }

        if !is_valid_image_ref(&self.image) {
            return Err(DeployError::ConfigError(format!(
                "Invalid image reference: '{}'",
                self.image
            )));
        }

        if !(1..=65535).contains(&self.container_port) {
            return Err(DeployError::ConfigError(format!(
                "port must be between 1 and 65535, got {}",
                self.container_port
            )));
        }

        if let Some(ref policy) = self.image_pull_policy {
            let valid_policies = ["Always", "IfNotPresent", "Never"];
            if !valid_policies.contains(&policy.as_str()) {
                return Err(DeployError::ConfigError(format!(
                    "Invalid image_pull_policy: {}",
                    policy
                )));
            }
        }

        Ok(())
    }
}

pub(crate) fn is_valid_k8s_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 {
        return false;
    }

    if !name.chars().next().unwrap_or(' ').is_ascii_alphanumeric() {
        return false;
    }
    if !name.chars().last().unwrap_or(' ').is_ascii_alphanumeric() {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_valid_image_ref(image: &str) -> bool {
    // registry/path:tag or registry/path@sha256:digest, no whitespace
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._\-/:]*[A-Za-z0-9])?(@sha256:[a-f0-9]{64})?$")
        .map(|re| re.is_match(image))
        .unwrap_or(false)
}
