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

//! Stacks and the operations run against them

pub mod driver;
pub mod engine;
pub mod events;
pub mod memory;
pub mod name;

pub use self::driver::{Operation, OperationDriver};
pub use self::engine::{
    resource_urn, Engine, ProviderSpec, RefreshSummary, ResourceRef, StackSummary, UpResult,
};
pub use self::events::{EngineEvent, EventSink, ProgressMessage, ProgressSink};
pub use self::memory::{FailurePoint, InMemoryEngine};
pub use self::name::StackName;
