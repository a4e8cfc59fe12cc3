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

//! Production cluster-state provider: a snapshot maintained by a background
//! subscription to an external state-store client (spec.md §4.5, §9).
//!
//! The concrete store (the teacher depends on `etcd-client` as an optional
//! feature) is intentionally kept out of this crate's hard dependency graph;
//! `ClusterStateSource` is the seam a real deployment plugs an etcd/zookeeper
//! client into. `NullClusterStateSource` is a stub that never pushes
//! updates, used by tests and by deployments that have not wired a store in
//! yet.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::cluster_state::ClusterStateProvider;
use crate::error::Result;
use crate::scheduler_types::WorkerAddr;

/// A push update from the external cluster membership store: the full
/// worker set for one application.
#[derive(Debug, Clone)]
pub struct ClusterStateUpdate {
    pub app_id: String,
    pub workers: HashSet<WorkerAddr>,
}

/// External collaborator (spec.md §1, "out of scope"): the thing that
/// actually knows the cluster membership. The production provider only
/// consumes this interface.
#[async_trait]
pub trait ClusterStateSource: Send + Sync {
    /// Registers interest in `app_id` with the external store.
    async fn watch(&self, app_id: &str) -> Result<bool>;

    /// Runs until cancelled, pushing every update it observes onto `tx`.
    async fn subscribe(&self, tx: mpsc::Sender<ClusterStateUpdate>);
}

/// A source that accepts every watch and never pushes an update. Useful for
/// tests and for standing the scheduler up before a real store is wired in.
#[derive(Default)]
pub struct NullClusterStateSource;

#[async_trait]
impl ClusterStateSource for NullClusterStateSource {
    async fn watch(&self, _app_id: &str) -> Result<bool> {
        Ok(true)
    }

    async fn subscribe(&self, _tx: mpsc::Sender<ClusterStateUpdate>) {
        std::future::pending::<()>().await;
    }
}

pub struct ProductionClusterState {
    source: Arc<dyn ClusterStateSource>,
    snapshot: Arc<RwLock<HashMap<String, HashSet<WorkerAddr>>>>,
}

impl ProductionClusterState {
    /// Spawns the background subscription loop immediately, mirroring the
    /// teacher's `tokio::spawn(async move { state_clone.synchronize_job_status_loop()
    /// .await })` pattern in `SchedulerServer::new_with_policy`.
    pub fn new(source: Arc<dyn ClusterStateSource>) -> Self {
        let snapshot: Arc<RwLock<HashMap<String, HashSet<WorkerAddr>>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let (tx, mut rx) = mpsc::channel::<ClusterStateUpdate>(128);

        let source_for_loop = source.clone();
        tokio::spawn(async move {
            source_for_loop.subscribe(tx).await;
        });

        let snapshot_for_loop = snapshot.clone();
        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                snapshot_for_loop.write().insert(update.app_id, update.workers);
            }
        });

        Self { source, snapshot }
    }
}

#[async_trait]
impl ClusterStateProvider for ProductionClusterState {
    async fn watch_application(&self, app_id: &str) -> Result<bool> {
        self.source.watch(app_id).await
    }

    async fn backends(&self, app_id: &str) -> Result<HashSet<WorkerAddr>> {
        Ok(self.snapshot.read().get(app_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneShotSource {
        update: ClusterStateUpdate,
    }

    #[async_trait]
    impl ClusterStateSource for OneShotSource {
        async fn watch(&self, _app_id: &str) -> Result<bool> {
            Ok(true)
        }

        async fn subscribe(&self, tx: mpsc::Sender<ClusterStateUpdate>) {
            let _ = tx.send(self.update.clone()).await;
            std::future::pending::<()>().await;
        }
    }

    #[tokio::test]
    async fn snapshot_updates_from_subscription() {
        let mut workers = HashSet::new();
        workers.insert(WorkerAddr::new("w1", 1000));
        let source = Arc::new(OneShotSource {
            update: ClusterStateUpdate { app_id: "A".to_string(), workers: workers.clone() },
        });
        let state = ProductionClusterState::new(source);

        // Give the spawned tasks a chance to run.
        for _ in 0..50 {
            if !state.backends("A").await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(state.backends("A").await.unwrap(), workers);
    }

    #[tokio::test]
    async fn null_source_never_populates_snapshot() {
        let state = ProductionClusterState::new(Arc::new(NullClusterStateSource));
        assert!(state.backends("A").await.unwrap().is_empty());
    }
}
