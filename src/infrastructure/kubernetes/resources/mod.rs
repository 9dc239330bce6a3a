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

pub mod deployment;
pub mod namespace;
pub mod service;
pub mod stack_record;

pub use self::deployment::DeploymentBuilder;
pub use self::namespace::NamespaceBuilder;
pub use self::service::{service_endpoint, ServiceBuilder};
pub use self::stack_record::{record_name, record_selector, StackRecord, StackRecordBuilder};

use crate::domain::config::AppSpec;
use crate::domain::stack::engine::{resource_urn, ResourceRef};
use crate::domain::stack::name::StackName;
use crate::infrastructure::constants::{PROVIDER_NAME, TYPE_COMPONENT};
use crate::shared::error::DeployError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Service};

/// Type name reported for a Kubernetes resource, e.g. `kubernetes:apps/v1:Deployment`.
pub fn type_token<K: k8s_openapi::Resource>() -> String {
    let group_version = if K::GROUP.is_empty() {
        format!("core/{}", K::VERSION)
    } else {
        K::API_VERSION.to_string()
    };
    format!("{}:{}:{}", PROVIDER_NAME, group_version, K::KIND)
}

/// Resources an update of `app_name` declares, component first, then its
/// children in creation order.
pub fn planned_resources(project: &str, stack: &StackName, app_name: &str) -> Vec<ResourceRef> {
    [
        TYPE_COMPONENT.to_string(),
        type_token::<Namespace>(),
        type_token::<Deployment>(),
        type_token::<Service>(),
    ]
    .into_iter()
    .map(|type_name| ResourceRef {
        urn: resource_urn(project, stack, &type_name, app_name),
        type_name,
        name: app_name.to_string(),
    })
    .collect()
}

/// The manifests an update would apply, as a multi-document YAML stream.
pub fn render_manifests(app: &AppSpec) -> Result<String, DeployError> {
    let documents = [
        serde_yaml::to_string(&NamespaceBuilder::new(app).build()?)?,
        serde_yaml::to_string(&DeploymentBuilder::new(app).build()?)?,
        serde_yaml::to_string(&ServiceBuilder::new(app).build()?)?,
    ];
    Ok(documents
        .iter()
        .map(|doc| format!("---\n{}", doc))
        .collect::<String>())
}
