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

//! Engine that drives the Kubernetes API directly. The cluster holds all
//! state: the declared resources themselves plus one ConfigMap per stack.

use crate::domain::config::app::is_valid_k8s_name;
use crate::domain::config::{AppSpec, Settings};
use crate::domain::stack::engine::{
    Engine, ProviderSpec, RefreshSummary, ResourceRef, StackSummary, UpResult,
};
use crate::domain::stack::events::EventSink;
use crate::domain::stack::name::StackName;
use crate::infrastructure::constants::{LABEL_STACK, OUTPUT_URL, PROVIDER_NAME};
use crate::infrastructure::kubernetes::client::DeployKubeClient;
use crate::infrastructure::kubernetes::resources::{
    planned_resources, record_name, record_selector, service_endpoint, type_token,
    DeploymentBuilder, NamespaceBuilder, ServiceBuilder, StackRecord, StackRecordBuilder,
};
use crate::infrastructure::kubernetes::wait::{wait_for, WaitConfig};
use crate::shared::error::DeployError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Service};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct KubeEngine {
    client: Arc<dyn DeployKubeClient>,
    project: String,
    state_namespace: String,
    wait: WaitConfig,
}

impl KubeEngine {
    pub fn new(
        client: Arc<dyn DeployKubeClient>,
        settings: &Settings,
    ) -> Result<Self, DeployError> {
        let project = settings.stack.project.clone();
        if !is_valid_k8s_name(&project) {
            return Err(DeployError::config_error(format!(
                "Invalid project name: {} (lowercase letters, digits and '-' only)",
                project
            )));
        }

        Ok(Self {
            client,
            project,
            state_namespace: settings.stack.state_namespace.clone(),
            wait: WaitConfig::from(&settings.engine),
        })
    }

    async fn load_record(&self, stack: &StackName) -> Result<Option<StackRecord>, DeployError> {
        let name = record_name(&self.project, stack);
        match self.client.get_configmap(&self.state_namespace, &name).await {
            Ok(configmap) => Ok(Some(StackRecord::from_configmap(&configmap)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn require_record(&self, stack: &StackName) -> Result<StackRecord, DeployError> {
        self.load_record(stack).await?.ok_or_else(|| {
            DeployError::not_found(
                "Stack",
                record_name(&self.project, stack),
                &self.state_namespace,
            )
        })
    }

    async fn save_record(
        &self,
        stack: &StackName,
        record: &StackRecord,
    ) -> Result<(), DeployError> {
        let configmap =
            StackRecordBuilder::new(&self.project, stack, &self.state_namespace, record).build()?;
        self.client.apply_configmap(&configmap).await
    }

    /// Whether a recorded resource still exists. Children of an application
    /// live in the namespace named after it.
    async fn resource_exists(&self, resource: &ResourceRef) -> Result<bool, DeployError> {
        let name = resource.name.as_str();
        let found = if resource.type_name == type_token::<Namespace>() {
            self.client.get_namespace(name).await.map(|_| ())
        } else if resource.type_name == type_token::<Deployment>() {
            self.client.get_deployment(name, name).await.map(|_| ())
        } else if resource.type_name == type_token::<Service>() {
            self.client.get_service(name, name).await.map(|_| ())
        } else {
            return Ok(true);
        };

        match found {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete_resource(&self, resource: &ResourceRef) -> Result<(), DeployError> {
        let name = resource.name.as_str();
        let deleted = if resource.type_name == type_token::<Namespace>() {
            self.client.delete_namespace(name).await
        } else if resource.type_name == type_token::<Deployment>() {
            self.client.delete_deployment(name, name).await
        } else if resource.type_name == type_token::<Service>() {
            self.client.delete_service(name, name).await
        } else {
            return Ok(());
        };

        match deleted {
            Err(e) if e.is_not_found() => {
                debug!(urn = %resource.urn, "Already gone");
                Ok(())
            }
            other => other,
        }
    }

    async fn wait_for_endpoint(&self, namespace: &str, name: &str) -> Result<String, DeployError> {
        let what = format!("load balancer address of service {}/{}", namespace, name);
        wait_for(&self.wait, &what, move || async move {
            let service = self.client.get_service(namespace, name).await?;
            Ok(service_endpoint(&service))
        })
        .await
    }

    async fn wait_for_namespace_gone(&self, name: &str) -> Result<(), DeployError> {
        let what = format!("deletion of namespace {}", name);
        wait_for(&self.wait, &what, move || async move {
            match self.client.get_namespace(name).await {
                Ok(_) => Ok(None),
                Err(e) if e.is_not_found() => Ok(Some(())),
                Err(e) => Err(e),
            }
        })
        .await
    }
}

#[async_trait::async_trait]
impl Engine for KubeEngine {
    #[instrument(skip_all, fields(stack = %stack))]
    async fn upsert_stack(&self, stack: &StackName) -> Result<(), DeployError> {
        if self.load_record(stack).await?.is_some() {
            info!("Selected existing stack");
            return Ok(());
        }

        let mut record = StackRecord::default();
        record.touch("create");
        self.save_record(stack, &record).await?;
        info!("Created stack");
        Ok(())
    }

    async fn install_provider(&self, provider: &ProviderSpec) -> Result<(), DeployError> {
        if provider.name != PROVIDER_NAME {
            return Err(DeployError::config_error(format!(
                "Unsupported provider: {}",
                provider.name
            )));
        }

        let minor = self.client.server_minor_version().await?;
        if minor < provider.min_server_minor {
            return Err(DeployError::ValidationError(format!(
                "Kubernetes v1.{} is older than the oldest supported release v1.{}",
                minor, provider.min_server_minor
            )));
        }
        info!(server_minor = minor, "Kubernetes provider ready");
        Ok(())
    }

    #[instrument(skip_all, fields(stack = %stack))]
    async fn refresh(&self, stack: &StackName) -> Result<RefreshSummary, DeployError> {
        let mut record = self.require_record(stack).await?;

        let (component, children) = match record.resources.split_first() {
            Some((component, children)) => (component.clone(), children.to_vec()),
            None => return Ok(RefreshSummary::default()),
        };

        let mut alive = Vec::with_capacity(children.len());
        for resource in children {
            if self.resource_exists(&resource).await? {
                alive.push(resource);
            } else {
                warn!(urn = %resource.urn, "Recorded resource no longer exists");
            }
        }

        let mut resources = Vec::with_capacity(alive.len() + 1);
        if !alive.is_empty() {
            resources.push(component);
            resources.extend(alive);
        }

        if resources != record.resources {
            record.resources = resources.clone();
            record.touch("refresh");
            self.save_record(stack, &record).await?;
        }

        Ok(RefreshSummary { resources })
    }

    #[instrument(skip_all, fields(stack = %stack, image = %app.image))]
    async fn up(
        &self,
        stack: &StackName,
        app: &AppSpec,
        events: &EventSink,
    ) -> Result<UpResult, DeployError> {
        app.validate()?;
        let namespace = NamespaceBuilder::new(app).build()?;
        let deployment = DeploymentBuilder::new(app).build()?;
        let service = ServiceBuilder::new(app).build()?;

        let planned = planned_resources(&self.project, stack, &app.name);
        let [component, ns_ref, deployment_ref, service_ref] = planned.as_slice() else {
            return Err(DeployError::InvalidResource(
                "unexpected resource plan".to_string(),
            ));
        };

        events.pre(&component.urn, &component.type_name).await;

        events.pre(&ns_ref.urn, &ns_ref.type_name).await;
        self.client.apply_namespace(&namespace).await?;
        events.outputs(&ns_ref.urn, &ns_ref.type_name).await;

        events.pre(&deployment_ref.urn, &deployment_ref.type_name).await;
        self.client.apply_deployment(&deployment).await?;
        events
            .outputs(&deployment_ref.urn, &deployment_ref.type_name)
            .await;

        events.pre(&service_ref.urn, &service_ref.type_name).await;
        self.client.apply_service(&service).await?;
        let url = self.wait_for_endpoint(&app.name, &app.name).await?;
        events.outputs(&service_ref.urn, &service_ref.type_name).await;

        events.outputs(&component.urn, &component.type_name).await;

        let mut record = self.load_record(stack).await?.unwrap_or_default();
        record.image = Some(app.image.clone());
        record.port = Some(app.container_port.to_string());
        record.url = Some(url.clone());
        record.resources = planned.clone();
        record.touch("update");
        self.save_record(stack, &record).await?;
        info!(url = %url, "Update complete");

        let mut outputs = HashMap::new();
        outputs.insert(OUTPUT_URL.to_string(), serde_json::Value::String(url));
        Ok(UpResult { outputs })
    }

    #[instrument(skip_all, fields(stack = %stack))]
    async fn destroy(&self, stack: &StackName, events: &EventSink) -> Result<(), DeployError> {
        let Some(mut record) = self.load_record(stack).await? else {
            return Ok(());
        };

        if let Some((component, children)) = record.resources.split_first() {
            events.pre(&component.urn, &component.type_name).await;
            for resource in children.iter().rev() {
                events.pre(&resource.urn, &resource.type_name).await;
                self.delete_resource(resource).await?;
                if resource.type_name == type_token::<Namespace>() {
                    self.wait_for_namespace_gone(&resource.name).await?;
                }
                events.outputs(&resource.urn, &resource.type_name).await;
            }
            events.outputs(&component.urn, &component.type_name).await;
        }

        record.resources.clear();
        record.url = None;
        record.touch("destroy");
        self.save_record(stack, &record).await?;
        info!("Destroy complete");
        Ok(())
    }

    async fn remove_stack(&self, stack: &StackName) -> Result<(), DeployError> {
        if let Some(record) = self.load_record(stack).await? {
            if !record.resources.is_empty() {
                return Err(DeployError::ValidationError(format!(
                    "stack '{}' still has {} resources",
                    stack,
                    record.resources.len()
                )));
            }
        }

        let name = record_name(&self.project, stack);
        match self
            .client
            .delete_configmap(&self.state_namespace, &name)
            .await
        {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    async fn list_stacks(&self) -> Result<Vec<StackSummary>, DeployError> {
        let configmaps = self
            .client
            .list_configmaps(&self.state_namespace, &record_selector(&self.project))
            .await?;

        let mut stacks = Vec::with_capacity(configmaps.len());
        for configmap in &configmaps {
            let name = configmap
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(LABEL_STACK))
                .or(configmap.metadata.name.as_ref())
                .cloned()
                .unwrap_or_default();
            match StackRecord::from_configmap(configmap) {
                Ok(record) => stacks.push(record.summary(name)),
                Err(e) => warn!(stack = %name, error = %e, "Skipping unreadable stack record"),
            }
        }
        stacks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stack::events::EngineEvent;
    use k8s_openapi::api::core::v1::{
        ConfigMap, LoadBalancerIngress, LoadBalancerStatus, ServiceStatus,
    };
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    type Key = (String, String);

    #[derive(Default)]
    struct FakeCluster {
        namespaces: BTreeMap<String, Namespace>,
        deployments: BTreeMap<Key, Deployment>,
        services: BTreeMap<Key, Service>,
        configmaps: BTreeMap<Key, ConfigMap>,
    }

    /// Applies land in memory; services get a load balancer address at once
    /// when `ingress_ip` is set.
    struct FakeKubeClient {
        cluster: Mutex<FakeCluster>,
        minor: u32,
        ingress_ip: Option<String>,
    }

    impl FakeKubeClient {
        fn new(ingress_ip: Option<&str>) -> Self {
            Self {
                cluster: Mutex::new(FakeCluster::default()),
                minor: 30,
                ingress_ip: ingress_ip.map(str::to_string),
            }
        }

        fn key<K: kube::Resource>(obj: &K) -> Key {
            (
                obj.meta().namespace.clone().unwrap_or_default(),
                obj.meta().name.clone().unwrap_or_default(),
            )
        }

        fn missing(kind: &str, namespace: &str, name: &str) -> DeployError {
            DeployError::not_found(kind, name, namespace)
        }
    }

    #[async_trait::async_trait]
    impl DeployKubeClient for FakeKubeClient {
        async fn apply_namespace(&self, namespace: &Namespace) -> Result<(), DeployError> {
            let name = namespace.metadata.name.clone().unwrap_or_default();
            self.cluster
                .lock()
                .unwrap()
                .namespaces
                .insert(name, namespace.clone());
            Ok(())
        }

        async fn apply_deployment(&self, deployment: &Deployment) -> Result<(), DeployError> {
            let key = Self::key(deployment);
            let mut cluster = self.cluster.lock().unwrap();
            if !cluster.namespaces.contains_key(&key.0) {
                return Err(Self::missing("Namespace", "", &key.0));
            }
            cluster.deployments.insert(key, deployment.clone());
            Ok(())
        }

        async fn apply_service(&self, service: &Service) -> Result<(), DeployError> {
            let mut service = service.clone();
            if let Some(ip) = &self.ingress_ip {
                service.status = Some(ServiceStatus {
                    load_balancer: Some(LoadBalancerStatus {
                        ingress: Some(vec![LoadBalancerIngress {
                            ip: Some(ip.clone()),
                            ..Default::default()
                        }]),
                    }),
                    ..Default::default()
                });
            }
            let key = Self::key(&service);
            self.cluster.lock().unwrap().services.insert(key, service);
            Ok(())
        }

        async fn apply_configmap(&self, configmap: &ConfigMap) -> Result<(), DeployError> {
            let key = Self::key(configmap);
            self.cluster
                .lock()
                .unwrap()
                .configmaps
                .insert(key, configmap.clone());
            Ok(())
        }

        async fn get_namespace(&self, name: &str) -> Result<Namespace, DeployError> {
            self.cluster
                .lock()
                .unwrap()
                .namespaces
                .get(name)
                .cloned()
                .ok_or_else(|| Self::missing("Namespace", "", name))
        }

        async fn get_deployment(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<Deployment, DeployError> {
            self.cluster
                .lock()
                .unwrap()
                .deployments
                .get(&(namespace.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| Self::missing("Deployment", namespace, name))
        }

        async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, DeployError> {
            self.cluster
                .lock()
                .unwrap()
                .services
                .get(&(namespace.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| Self::missing("Service", namespace, name))
        }

        async fn get_configmap(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<ConfigMap, DeployError> {
            self.cluster
                .lock()
                .unwrap()
                .configmaps
                .get(&(namespace.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| Self::missing("ConfigMap", namespace, name))
        }

        async fn list_configmaps(
            &self,
            namespace: &str,
            label_selector: &str,
        ) -> Result<Vec<ConfigMap>, DeployError> {
            let wanted: Vec<(&str, &str)> = label_selector
                .split(',')
                .filter_map(|pair| pair.split_once('='))
                .collect();
            Ok(self
                .cluster
                .lock()
                .unwrap()
                .configmaps
                .iter()
                .filter(|((ns, _), _)| ns == namespace)
                .filter(|(_, cm)| {
                    let labels = cm.metadata.labels.clone().unwrap_or_default();
                    wanted
                        .iter()
                        .all(|(k, v)| labels.get(*k).map(String::as_str) == Some(*v))
                })
                .map(|(_, cm)| cm.clone())
                .collect())
        }

        async fn delete_namespace(&self, name: &str) -> Result<(), DeployError> {
            let mut cluster = self.cluster.lock().unwrap();
            cluster
                .namespaces
                .remove(name)
                .ok_or_else(|| Self::missing("Namespace", "", name))?;
            cluster.deployments.retain(|(ns, _), _| ns != name);
            cluster.services.retain(|(ns, _), _| ns != name);
            Ok(())
        }

        async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), DeployError> {
            self.cluster
                .lock()
                .unwrap()
                .deployments
                .remove(&(namespace.to_string(), name.to_string()))
                .map(|_| ())
                .ok_or_else(|| Self::missing("Deployment", namespace, name))
        }

        async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), DeployError> {
            self.cluster
                .lock()
                .unwrap()
                .services
                .remove(&(namespace.to_string(), name.to_string()))
                .map(|_| ())
                .ok_or_else(|| Self::missing("Service", namespace, name))
        }

        async fn delete_configmap(&self, namespace: &str, name: &str) -> Result<(), DeployError> {
            self.cluster
                .lock()
                .unwrap()
                .configmaps
                .remove(&(namespace.to_string(), name.to_string()))
                .map(|_| ())
                .ok_or_else(|| Self::missing("ConfigMap", namespace, name))
        }

        async fn server_minor_version(&self) -> Result<u32, DeployError> {
            Ok(self.minor)
        }
    }

    fn fast_settings() -> Settings {
        let mut settings = Settings::default();
        settings.stack.project = "proj".to_string();
        settings.engine.ready_timeout_secs = 5;
        settings.engine.poll_initial_ms = 5;
        settings.engine.poll_max_ms = 20;
        settings
    }

    fn engine(client: Arc<FakeKubeClient>) -> KubeEngine {
        KubeEngine::new(client, &fast_settings()).unwrap()
    }

    fn sink() -> (EventSink, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (EventSink::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn demo() -> StackName {
        "demo".parse().unwrap()
    }

    #[tokio::test]
    async fn test_up_creates_resources_and_records_stack() {
        let client = Arc::new(FakeKubeClient::new(Some("10.1.2.3")));
        let engine = engine(client.clone());
        let stack = demo();
        let app = AppSpec::new("demo", "nginx:1.27", 8080);
        let (events, mut rx) = sink();

        engine.upsert_stack(&stack).await.unwrap();
        let result = engine.up(&stack, &app, &events).await.unwrap();

        assert_eq!(
            result.outputs.get(OUTPUT_URL),
            Some(&serde_json::json!("http://10.1.2.3"))
        );

        let events = drain(&mut rx);
        assert_eq!(events.len(), 8);
        assert_eq!(
            events.first(),
            Some(&EngineEvent::pre(
                planned_resources("proj", &stack, "demo")[0].urn.clone(),
                "productionapp:index:Deployment"
            ))
        );

        {
            let cluster = client.cluster.lock().unwrap();
            assert!(cluster.namespaces.contains_key("demo"));
            assert!(cluster
                .deployments
                .contains_key(&("demo".to_string(), "demo".to_string())));
        }

        let stacks = engine.list_stacks().await.unwrap();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].name, "demo");
        assert_eq!(stacks[0].image.as_deref(), Some("nginx:1.27"));
        assert_eq!(stacks[0].url.as_deref(), Some("http://10.1.2.3"));
        assert_eq!(stacks[0].last_operation.as_deref(), Some("update"));
    }

    #[tokio::test]
    async fn test_destroy_then_remove_stack() {
        let client = Arc::new(FakeKubeClient::new(Some("10.1.2.3")));
        let engine = engine(client.clone());
        let stack = demo();
        let app = AppSpec::new("demo", "nginx", 80);
        let (events, mut rx) = sink();

        engine.upsert_stack(&stack).await.unwrap();
        engine.up(&stack, &app, &events).await.unwrap();
        drain(&mut rx);

        assert!(engine.remove_stack(&stack).await.is_err());

        engine.destroy(&stack, &events).await.unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 8);
        // Service goes first, namespace last among the children.
        assert_eq!(
            events.get(1).map(|e| e.urn().contains("Service")),
            Some(true)
        );

        assert!(client.cluster.lock().unwrap().namespaces.is_empty());
        assert!(engine.refresh(&stack).await.unwrap().resources.is_empty());

        engine.remove_stack(&stack).await.unwrap();
        assert!(engine.list_stacks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_forgets_resources_deleted_elsewhere() {
        let client = Arc::new(FakeKubeClient::new(Some("10.1.2.3")));
        let engine = engine(client.clone());
        let stack = demo();
        let (events, _rx) = sink();

        engine.upsert_stack(&stack).await.unwrap();
        engine
            .up(&stack, &AppSpec::new("demo", "nginx", 80), &events)
            .await
            .unwrap();
        assert_eq!(engine.refresh(&stack).await.unwrap().resources.len(), 4);

        client.delete_namespace("demo").await.unwrap();
        let summary = engine.refresh(&stack).await.unwrap();
        assert!(summary.resources.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_requires_stack() {
        let engine = engine(Arc::new(FakeKubeClient::new(None)));
        let err = engine.refresh(&demo()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_up_times_out_without_load_balancer() {
        let client = Arc::new(FakeKubeClient::new(None));
        let mut settings = fast_settings();
        settings.engine.ready_timeout_secs = 0;
        let engine = KubeEngine::new(client, &settings).unwrap();
        let stack = demo();
        let (events, _rx) = sink();

        engine.upsert_stack(&stack).await.unwrap();
        let err = engine
            .up(&stack, &AppSpec::new("demo", "nginx", 80), &events)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_install_provider_checks_server_version() {
        let mut fake = FakeKubeClient::new(None);
        fake.minor = 20;
        let engine = engine(Arc::new(fake));

        let provider = ProviderSpec {
            name: "kubernetes".to_string(),
            min_server_minor: 24,
        };
        assert!(matches!(
            engine.install_provider(&provider).await,
            Err(DeployError::ValidationError(_))
        ));

        let other = ProviderSpec {
            name: "nomad".to_string(),
            min_server_minor: 0,
        };
        assert!(matches!(
            engine.install_provider(&other).await,
            Err(DeployError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_project_rejected() {
        let mut settings = Settings::default();
        settings.stack.project = "Not_Valid".to_string();
        assert!(KubeEngine::new(Arc::new(FakeKubeClient::new(None)), &settings).is_err());
    }
}
