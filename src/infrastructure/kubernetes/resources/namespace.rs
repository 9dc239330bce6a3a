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
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub struct NamespaceBuilder<'a> {
    app: &'a AppSpec,
}

impl<'a> NamespaceBuilder<'a> {
    pub fn new(app: &'a AppSpec) -> Self {
        Self { app }
    }

    pub fn build(&self) -> Result<Namespace, DeployError> {
        Ok(Namespace {
            metadata: ObjectMeta {
                name: Some(self.app.name.clone()),
                labels: Some(self.app.labels()),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}
