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

//! Static worker list loaded from configuration (spec.md §4.5).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::cluster_state::ClusterStateProvider;
use crate::error::Result;
use crate::scheduler_types::WorkerAddr;

pub struct ConfigBasedClusterState {
    workers: HashMap<String, HashSet<WorkerAddr>>,
}

impl ConfigBasedClusterState {
    /// `raw` is the `SchedulerConfig::static_workers` table: `appId ->
    /// ["host:port", ...]`. Entries that fail to parse are dropped rather
    /// than failing the whole table (spec.md §7, category 5 treats a single
    /// bad address as ignorable, not fatal).
    pub fn new(raw: &HashMap<String, Vec<String>>) -> Self {
        let workers = raw
            .iter()
            .map(|(app_id, addrs)| {
                let parsed = addrs.iter().filter_map(|a| WorkerAddr::parse(a)).collect();
                (app_id.clone(), parsed)
            })
            .collect();
        Self { workers }
    }
}

#[async_trait]
impl ClusterStateProvider for ConfigBasedClusterState {
    async fn watch_application(&self, _app_id: &str) -> Result<bool> {
        // The static table is fixed at startup; watching is a no-op that
        // always succeeds.
        Ok(true)
    }

    async fn backends(&self, app_id: &str) -> Result<HashSet<WorkerAddr>> {
        Ok(self.workers.get(app_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_statically_configured_workers() {
        let mut raw = HashMap::new();
        raw.insert("A".to_string(), vec!["w1:1000".to_string(), "w2:1001".to_string()]);
        let state = ConfigBasedClusterState::new(&raw);
        let backends = state.backends("A").await.unwrap();
        assert_eq!(backends.len(), 2);
        assert!(state.backends("B").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_address_is_dropped_not_fatal() {
        let mut raw = HashMap::new();
        raw.insert("A".to_string(), vec!["w1:1000".to_string(), "not-an-address".to_string()]);
        let state = ConfigBasedClusterState::new(&raw);
        assert_eq!(state.backends("A").await.unwrap().len(), 1);
    }
}
