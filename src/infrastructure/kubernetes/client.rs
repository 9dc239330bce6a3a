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

use crate::shared::error::DeployError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Service};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

#[async_trait::async_trait]
pub trait DeployKubeClient: Send + Sync {
    async fn apply_namespace(&self, namespace: &Namespace) -> Result<(), DeployError>;

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<(), DeployError>;

    async fn apply_service(&self, service: &Service) -> Result<(), DeployError>;

    async fn apply_configmap(&self, configmap: &ConfigMap) -> Result<(), DeployError>;

    async fn get_namespace(&self, name: &str) -> Result<Namespace, DeployError>;

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, DeployError>;

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, DeployError>;

    async fn get_configmap(&self, namespace: &str, name: &str) -> Result<ConfigMap, DeployError>;

    async fn list_configmaps(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ConfigMap>, DeployError>;

    async fn delete_namespace(&self, name: &str) -> Result<(), DeployError>;

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), DeployError>;

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), DeployError>;

    async fn delete_configmap(&self, namespace: &str, name: &str) -> Result<(), DeployError>;

    /// Minor version reported by the API server, e.g. `30` for v1.30.
    async fn server_minor_version(&self) -> Result<u32, DeployError>;
}

pub struct DeployKubeClientImpl {
    client: Client,
    field_manager: String,
}

impl DeployKubeClientImpl {
    pub async fn new(field_manager: String) -> Result<Self, DeployError> {
        let client = Client::try_default().await.map_err(|e| {
            DeployError::KubeError(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self {
            client,
            field_manager,
        })
    }

    pub async fn new_with_config(
        field_manager: String,
        kubeconfig_path: Option<String>,
        context: Option<String>,
    ) -> Result<Self, DeployError> {
        use kube::config::{KubeConfigOptions, Kubeconfig};

        if kubeconfig_path.is_none() && context.is_none() {
            return Self::new(field_manager).await;
        }

        let kubeconfig = if let Some(path) = kubeconfig_path {
            Kubeconfig::read_from(path)
                .map_err(|e| DeployError::KubeError(format!("Failed to load kubeconfig: {}", e)))?
        } else {
            Kubeconfig::read()
                .map_err(|e| DeployError::KubeError(format!("Failed to load kubeconfig: {}", e)))?
        };

        let config_options = KubeConfigOptions {
            context,
            cluster: None,
            user: None,
        };

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &config_options)
            .await
            .map_err(|e| {
                DeployError::KubeError(format!("Failed to create Kubernetes config: {}", e))
            })?;

        let client = Client::try_from(config).map_err(|e| {
            DeployError::KubeError(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self {
            client,
            field_manager,
        })
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Server-side apply `obj` if it exists, create it otherwise.
    async fn apply<K>(&self, api: Api<K>, obj: &K, kind: &str) -> Result<(), DeployError>
    where
        K: kube::Resource + Clone + Debug + Serialize + DeserializeOwned,
    {
        let name = obj
            .meta()
            .name
            .as_ref()
            .ok_or_else(|| DeployError::ConfigError(format!("{} name is required", kind)))?;

        match api.get(name).await {
            Ok(_) => {
                debug!(kind, name = %name, "Patching existing resource");
                let patch_params = PatchParams::apply(&self.field_manager).force();
                let patch = serde_json::to_value(obj).map_err(|e| {
                    DeployError::KubeError(format!("Failed to serialize {}: {}", kind, e))
                })?;
                api.patch(name, &patch_params, &Patch::Apply(patch)).await?;
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(kind, name = %name, "Creating resource");
                api.create(&PostParams::default(), obj).await?;
            }
            Err(e) => return Err(DeployError::KubeError(e.to_string())),
        }
        Ok(())
    }

    async fn get<K>(
        &self,
        api: Api<K>,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<K, DeployError>
    where
        K: kube::Resource + Clone + Debug + DeserializeOwned,
    {
        api.get(name)
            .await
            .map_err(|e| map_api_error(e, kind, namespace, name))
    }

    async fn delete<K>(
        &self,
        api: Api<K>,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), DeployError>
    where
        K: kube::Resource + Clone + Debug + DeserializeOwned,
    {
        api.delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| map_api_error(e, kind, namespace, name))
    }
}

fn map_api_error(err: kube::Error, kind: &str, namespace: &str, name: &str) -> DeployError {
    if let kube::Error::Api(ae) = err {
        if ae.code == 404 {
            DeployError::not_found(kind, name, namespace)
        } else {
            DeployError::KubeError(ae.message)
        }
    } else {
        DeployError::KubeError(err.to_string())
    }
}

fn namespace_of<K: kube::Resource>(obj: &K, kind: &str) -> Result<String, DeployError> {
    obj.meta()
        .namespace
        .clone()
        .ok_or_else(|| DeployError::ConfigError(format!("{} namespace is required", kind)))
}

/// Leading digits of a version component; providers append suffixes like `30+`.
fn parse_minor(minor: &str) -> Option<u32> {
    let digits: String = minor.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[async_trait::async_trait]
impl DeployKubeClient for DeployKubeClientImpl {
    async fn apply_namespace(&self, namespace: &Namespace) -> Result<(), DeployError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        self.apply(api, namespace, "Namespace").await
    }

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<(), DeployError> {
        let ns = namespace_of(deployment, "Deployment")?;
        self.apply(self.namespaced(&ns), deployment, "Deployment")
            .await
    }

    async fn apply_service(&self, service: &Service) -> Result<(), DeployError> {
        let ns = namespace_of(service, "Service")?;
        let api: Api<Service> = self.namespaced(&ns);
        let name = service
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| DeployError::ConfigError("Service name is required".to_string()))?;

        // clusterIP is immutable once allocated
        let mut service_to_apply = service.clone();
        if let Ok(existing) = api.get(name).await {
            if let (Some(existing_spec), Some(ref mut new_spec)) =
                (&existing.spec, &mut service_to_apply.spec)
            {
                new_spec.cluster_ip = existing_spec.cluster_ip.clone();
                new_spec.cluster_ips = existing_spec.cluster_ips.clone();
            }
        }

        self.apply(api, &service_to_apply, "Service").await
    }

    async fn apply_configmap(&self, configmap: &ConfigMap) -> Result<(), DeployError> {
        let ns = namespace_of(configmap, "ConfigMap")?;
        self.apply(self.namespaced(&ns), configmap, "ConfigMap")
            .await
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace, DeployError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        self.get(api, "Namespace", "", name).await
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Deployment, DeployError> {
        self.get(self.namespaced(namespace), "Deployment", namespace, name)
            .await
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, DeployError> {
        self.get(self.namespaced(namespace), "Service", namespace, name)
            .await
    }

    async fn get_configmap(&self, namespace: &str, name: &str) -> Result<ConfigMap, DeployError> {
        self.get(self.namespaced(namespace), "ConfigMap", namespace, name)
            .await
    }

    async fn list_configmaps(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ConfigMap>, DeployError> {
        let api: Api<ConfigMap> = self.namespaced(namespace);
        let list_params = ListParams::default().labels(label_selector);

        api.list(&list_params)
            .await
            .map(|list| list.items)
            .map_err(|e| DeployError::KubeError(e.to_string()))
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), DeployError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        self.delete(api, "Namespace", "", name).await
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), DeployError> {
        self.delete(
            self.namespaced::<Deployment>(namespace),
            "Deployment",
            namespace,
            name,
        )
        .await
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), DeployError> {
        self.delete(self.namespaced::<Service>(namespace), "Service", namespace, name)
            .await
    }

    async fn delete_configmap(&self, namespace: &str, name: &str) -> Result<(), DeployError> {
        self.delete(
            self.namespaced::<ConfigMap>(namespace),
            "ConfigMap",
            namespace,
            name,
        )
        .await
    }

    async fn server_minor_version(&self) -> Result<u32, DeployError> {
        let info = self.client.apiserver_version().await?;
        parse_minor(&info.minor).ok_or_else(|| {
            DeployError::KubeError(format!(
                "Unrecognized Kubernetes server version {}.{}",
                info.major, info.minor
            ))
        })
    }
}
