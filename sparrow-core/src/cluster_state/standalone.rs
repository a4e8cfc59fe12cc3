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

//! In-memory cluster-state provider, populated by local registrations.
//! Grounded on the teacher's own `#[cfg(feature = "sled")] standalone` module
//! and the `StandaloneClient` used by its `#[tokio::test] test_poll_work`.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cluster_state::ClusterStateProvider;
use crate::error::Result;
use crate::scheduler_types::WorkerAddr;

#[derive(Default)]
pub struct StandaloneClusterState {
    workers: DashMap<String, HashSet<WorkerAddr>>,
}

impl StandaloneClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/dev-time registration of a worker under an application.
    pub fn register_worker(&self, app_id: &str, worker: WorkerAddr) {
        self.workers.entry(app_id.to_string()).or_default().insert(worker);
    }

    pub fn deregister_worker(&self, app_id: &str, worker: &WorkerAddr) {
        if let Some(mut set) = self.workers.get_mut(app_id) {
            set.remove(worker);
        }
    }
}

#[async_trait]
impl ClusterStateProvider for StandaloneClusterState {
    async fn watch_application(&self, app_id: &str) -> Result<bool> {
        self.workers.entry(app_id.to_string()).or_default();
        Ok(true)
    }

    async fn backends(&self, app_id: &str) -> Result<HashSet<WorkerAddr>> {
        Ok(self.workers.get(app_id).map(|s| s.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn backends_reflect_local_registrations() {
        let state = StandaloneClusterState::new();
        state.watch_application("A").await.unwrap();
        assert!(state.backends("A").await.unwrap().is_empty());

        state.register_worker("A", WorkerAddr::new("w1", 1000));
        state.register_worker("A", WorkerAddr::new("w2", 1001));
        let backends = state.backends("A").await.unwrap();
        assert_eq!(backends.len(), 2);
    }

    #[tokio::test]
    async fn unknown_application_has_no_backends() {
        let state = StandaloneClusterState::new();
        assert!(state.backends("unknown").await.unwrap().is_empty());
    }
}
