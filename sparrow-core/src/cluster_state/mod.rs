// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Cluster-state provider (spec.md §4.5): enumerates the worker set for an
//! application, and tracks which applications this scheduler has been asked
//! to watch. Three interchangeable realizations, selected by
//! [`crate::config::DeploymentMode`] at startup.

mod config_based;
mod production;
mod standalone;

pub use config_based::ConfigBasedClusterState;
pub use production::{ClusterStateSource, NullClusterStateSource, ProductionClusterState};
pub use standalone::StandaloneClusterState;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::scheduler_types::WorkerAddr;

/// Implementers must treat the returned set as a snapshot: changes between
/// `submitJob` and a later `getTask` do not invalidate a plan already
/// computed (spec.md §4.5).
#[async_trait]
pub trait ClusterStateProvider: Send + Sync {
    /// Registers interest in `app_id`'s worker set. Returns whether the
    /// provider accepted the registration (spec.md §4.1, `registerFrontend`).
    async fn watch_application(&self, app_id: &str) -> Result<bool>;

    /// Current worker set for `app_id`. Empty if the application is unknown
    /// or has no workers (spec.md §8, "Empty worker set" boundary case).
    async fn backends(&self, app_id: &str) -> Result<HashSet<WorkerAddr>>;
}
