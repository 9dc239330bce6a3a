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
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub struct ServiceBuilder<'a> {
    app: &'a AppSpec,
}

impl<'a> ServiceBuilder<'a> {
    pub fn new(app: &'a AppSpec) -> Self {
        Self { app }
    }

    pub fn build(&self) -> Result<Service, DeployError> {
        let annotations = if self.app.service_annotations.is_empty() {
            None
        } else {
            Some(self.app.service_annotations.clone())
        };

        let metadata = ObjectMeta {
            name: Some(self.app.name.clone()),
            namespace: Some(self.app.name.clone()),
            labels: Some(self.app.labels()),
            annotations,
            ..Default::default()
        };

        let service = Service {
            metadata,
            spec: Some(ServiceSpec {
                type_: Some(self.app.service_type.clone()),
                ports: Some(vec![ServicePort {
                    name: Some("http".to_string()),
                    port: self.app.service_port,
                    target_port: Some(IntOrString::Int(self.app.container_port)),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                selector: Some(self.app.selector_labels()),
                ..Default::default()
            }),
            ..Default::default()
        };

        Ok(service)
    }
}

/// Externally reachable address of a load-balanced service, preferring the
/// ingress IP over its hostname. `None` while the address is still pending.
pub fn service_endpoint(service: &Service) -> Option<String> {
    let ingress = service
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?;

    let ip = ingress
        .iter()
        .find_map(|i| i.ip.as_deref().filter(|ip| !ip.is_empty()));
    let hostname = ingress
        .iter()
        .find_map(|i| i.hostname.as_deref().filter(|h| !h.is_empty()));

    ip.or(hostname).map(|host| format!("http://{}", host))
}
