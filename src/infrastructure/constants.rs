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

/// Default project that groups stacks
pub const DEFAULT_PROJECT: &str = "productionapp-cli";

/// Namespace holding the stack records
pub const DEFAULT_STATE_NAMESPACE: &str = "default";

/// Server-side apply field manager
pub const FIELD_MANAGER: &str = "productionapp";

/// Application shape
pub const APP_REPLICAS: i32 = 3;
pub const SERVICE_PORT: i32 = 80;
pub const DEFAULT_CONTAINER_PORT: i32 = 80;
pub const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";

/// Resource labels
pub const LABEL_APP: &str = "app.kubernetes.io/app";
pub const LABEL_INSTANCE: &str = "app.production.instance/name";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_MANAGED_BY_VALUE: &str = "productionapp";
pub const LABEL_PROJECT: &str = "productionapp.io/project";
pub const LABEL_STACK: &str = "productionapp.io/stack";

/// Stack record keys
pub const RECORD_KEY_IMAGE: &str = "image";
pub const RECORD_KEY_PORT: &str = "port";
pub const RECORD_KEY_URL: &str = "url";
pub const RECORD_KEY_LAST_OPERATION: &str = "last-operation";
pub const RECORD_KEY_UPDATED_AT: &str = "updated-at";
pub const RECORD_KEY_RESOURCES: &str = "resources";

/// Output names
pub const OUTPUT_URL: &str = "url";

/// Resource type names reported in lifecycle events
pub const TYPE_COMPONENT: &str = "productionapp:index:Deployment";

/// Provider
pub const PROVIDER_NAME: &str = "kubernetes";
pub const MIN_SERVER_MINOR: u32 = 24;

/// Waiting on the cluster
pub const READY_TIMEOUT_SECS: u64 = 600;
pub const POLL_INITIAL_MS: u64 = 1000;
pub const POLL_MAX_MS: u64 = 10_000;

/// Dashboard
pub const TICK_MS: u64 = 100;
pub const COLUMN_WIDTH: usize = 50;
pub const LIST_HEIGHT: usize = 8;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "PRODUCTIONAPP_CONFIG";
