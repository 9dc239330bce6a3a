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

use crate::domain::config::AppSpec;
use crate::shared::error::DeployError;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

pub struct DeploymentBuilder<'a> {
    app: &'a AppSpec,
}

impl<'a> DeploymentBuilder<'a> {
    pub fn new(app: &'a AppSpec) -> Self {
        Self { app }
    }

    pub fn build(&self) -> Result<Deployment, DeployError> {
        if self.app.replicas < 1 {
            return Err(DeployError::InvalidResource(format!(
                "Deployment {} needs at least one replica",
                self.app.name
            )));
        }

        let labels = self.app.labels();

        let container = Container {
            name: self.app.name.clone(),
            image: Some(self.app.image.clone()),
            image_pull_policy: self.app.image_pull_policy.clone(),
            ports: Some(vec![ContainerPort {
                container_port: self.app.container_port,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };

        Ok(Deployment {
            metadata: ObjectMeta {
                name: Some(self.app.name.clone()),
                namespace: Some(self.app.name.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(self.app.replicas),
                selector: LabelSelector {
                    match_labels: Some(self.app.selector_labels()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![container],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}
