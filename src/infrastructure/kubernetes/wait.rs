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

//! Polling the cluster until a condition holds

use crate::domain::config::EngineConf;
use crate::shared::error::DeployError;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl From<&EngineConf> for WaitConfig {
    fn from(conf: &EngineConf) -> Self {
        Self {
            initial_delay: conf.poll_initial(),
            max_delay: conf.poll_max(),
            timeout: conf.ready_timeout(),
        }
    }
}

/// Call `check` with exponential backoff until it yields a value.
///
/// `Ok(None)` means not ready yet. An error from `check` ends the wait
/// immediately. Gives up with `DeployError::Timeout` once `config.timeout`
/// has passed.
pub async fn wait_for<T, F, Fut>(
    config: &WaitConfig,
    what: &str,
    mut check: F,
) -> Result<T, DeployError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, DeployError>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let mut delays = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .build();

    loop {
        attempts += 1;

        if let Some(value) = check().await? {
            debug!(what, attempts, "Ready");
            return Ok(value);
        }

        let delay = delays
            .next()
            .unwrap_or(config.max_delay)
            .min(config.max_delay);
        if start.elapsed() + delay > config.timeout {
            return Err(DeployError::Timeout(format!(
                "{} not ready after {:?} ({} attempts)",
                what, config.timeout, attempts
            )));
        }

        debug!(
            what,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "Not ready, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
