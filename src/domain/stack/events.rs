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

//! Signals flowing from a running operation to whoever is watching it

use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

/// Per-resource lifecycle notification emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Work on the resource is starting.
    ResourcePre { urn: String, type_name: String },
    /// Work on the resource has finished.
    ResourceOutputs { urn: String, type_name: String },
}

impl EngineEvent {
    pub fn pre(urn: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::ResourcePre {
            urn: urn.into(),
            type_name: type_name.into(),
        }
    }

    pub fn outputs(urn: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::ResourceOutputs {
            urn: urn.into(),
            type_name: type_name.into(),
        }
    }

    pub fn urn(&self) -> &str {
        match self {
            Self::ResourcePre { urn, .. } | Self::ResourceOutputs { urn, .. } => urn,
        }
    }
}

/// High-level progress of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressMessage {
    /// A new step is under way.
    Step(String),
    /// The operation finished and has nothing to report (destroy).
    Completed,
    /// The operation finished and the application is reachable here.
    CompletedWithEndpoint(String),
}

impl ProgressMessage {
    pub fn step(text: impl Into<String>) -> Self {
        Self::Step(text.into())
    }

    /// Classify a free-text line: `"Success"` completes, an absolute URL with a
    /// host completes with that endpoint, anything else is an ordinary step.
    pub fn classify(line: &str) -> Self {
        if line == "Success" {
            return Self::Completed;
        }
        if is_endpoint(line) {
            return Self::CompletedWithEndpoint(line.to_string());
        }
        Self::Step(line.to_string())
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Step(_))
    }
}

fn is_endpoint(line: &str) -> bool {
    match Url::parse(line) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Sending half for progress messages. A closed receiver means the viewer
/// went away; the operation carries on regardless.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressMessage>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<ProgressMessage>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, msg: ProgressMessage) {
        if self.tx.send(msg).await.is_err() {
            debug!("Progress receiver closed, dropping message");
        }
    }

    pub async fn step(&self, text: impl Into<String>) {
        self.send(ProgressMessage::Step(text.into())).await;
    }
}

/// Sending half for lifecycle events.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, event: EngineEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("Event receiver closed, dropping event");
        }
    }

    pub async fn pre(&self, urn: &str, type_name: &str) {
        self.send(EngineEvent::pre(urn, type_name)).await;
    }

    pub async fn outputs(&self, urn: &str, type_name: &str) {
        self.send(EngineEvent::outputs(urn, type_name)).await;
    }
}
