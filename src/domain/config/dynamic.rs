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

use crate::domain::config::{AppSpec, Settings};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Parse dynamic configuration properties from -D key=value format
pub fn parse_properties(configs: &[String]) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();

    for config in configs {
        let parts: Vec<&str> = config.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(format!(
                "Invalid config format: '{}'. Expected 'key=value'",
                config
            ));
        }

        let key = parts[0].trim();
        let value = parts[1].trim();

        if key.is_empty() {
            return Err(format!("Empty key in config: '{}'", config));
        }

        map.insert(key.to_string(), value.to_string());
    }

    Ok(map)
}

pub fn apply_to_settings(configs: &HashMap<String, String>, settings: &mut Settings) {
    if let Some(project) = configs.get("stack.project") {
        settings.stack.project = project.clone();
    }

    if let Some(namespace) = configs.get("stack.state-namespace") {
        settings.stack.state_namespace = namespace.clone();
    }

    if let Some(path) = configs.get("kubernetes.config.file") {
        settings.kubernetes.kubeconfig = Some(path.clone());
    }

    if let Some(context) = configs.get("kubernetes.context") {
        settings.kubernetes.context = Some(context.clone());
    }

    if let Some(manager) = configs.get("kubernetes.field-manager") {
        settings.kubernetes.field_manager = manager.clone();
    }

    set_parsed(configs, "provider.min-server-minor", &mut settings.provider.min_server_minor);
    set_parsed(configs, "engine.ready-timeout-secs", &mut settings.engine.ready_timeout_secs);
    set_parsed(configs, "engine.poll-initial-ms", &mut settings.engine.poll_initial_ms);
    set_parsed(configs, "engine.poll-max-ms", &mut settings.engine.poll_max_ms);
    set_parsed(configs, "dashboard.tick-ms", &mut settings.dashboard.tick_ms);
    set_parsed(configs, "dashboard.column-width", &mut settings.dashboard.column_width);
    set_parsed(configs, "dashboard.list-height", &mut settings.dashboard.list_height);

    if let Some(level) = configs.get("logging.level") {
        settings.logging.level = level.clone();
    }

    if let Some(file) = configs.get("logging.file") {
        settings.logging.file = Some(file.clone());
    }
}

pub fn apply_to_app(configs: &HashMap<String, String>, app: &mut AppSpec) {
    if let Some(policy) = configs.get("app.image-pull-policy") {
        app.image_pull_policy = Some(policy.clone());
    }

    if let Some(labels_str) = configs.get("app.labels") {
        app.extra_labels.extend(parse_key_value_pairs(labels_str));
    }

    if let Some(annotations_str) = configs.get("service.annotations") {
        app.service_annotations
            .extend(parse_key_value_pairs(annotations_str));
    }
}

fn set_parsed<T: std::str::FromStr>(configs: &HashMap<String, String>, key: &str, target: &mut T) {
    if let Some(raw) = configs.get(key) {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!(key, value = %raw, "Ignoring unparsable dynamic config value"),
        }
    }
}

fn parse_key_value_pairs(input: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for pair in input.split(',') {
        let parts: Vec<&str> = pair.splitn(2, '=').collect();
        if parts.len() == 2 {
            map.insert(parts[0].trim().to_string(), parts[1].trim().to_string());
        }
    }
    map
}
