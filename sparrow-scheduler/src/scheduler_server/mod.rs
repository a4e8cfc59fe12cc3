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

//! The scheduler façade (spec.md §4.1): the front door for
//! `submitJob`/`getTask`/`sendFrontendMessage`/`registerFrontend`.

pub mod grpc;

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;

use sparrow_core::audit;
use sparrow_core::client::{
    new_frontend_client_pool, new_worker_client_pool, FrontendClientPool, WorkerClientPool,
};
use sparrow_core::cluster_state::ClusterStateProvider;
use sparrow_core::config::SchedulerConfig;
use sparrow_core::error::Result;
use sparrow_core::ids::RequestIdAllocator;
use sparrow_core::proto::FrontendMessageParams;
use sparrow_core::scheduler_types::{LaunchSpec, SchedulingRequest, Task, WorkerAddr};

use sparrow_placer::{ConstrainedPlacer, RequestRegistry, TaskPlacer, UnconstrainedPlacer};

/// Process-wide scheduler state (spec.md §3, "Entity: Scheduler instance").
pub struct SchedulerServer {
    own_addr: WorkerAddr,
    config: SchedulerConfig,
    cluster_state: Arc<dyn ClusterStateProvider>,
    worker_clients: WorkerClientPool,
    frontend_clients: FrontendClientPool,
    id_allocator: RequestIdAllocator,
    /// `appId -> frontend endpoint`. Writes are rare (one per
    /// `registerFrontend` call); `DashMap` gives us the reader-preferring
    /// behavior spec.md §5 asks for without a dedicated RwLock.
    frontends: DashMap<String, WorkerAddr>,
    registry: Arc<RequestRegistry>,
    /// Signals the `initialize -> serve -> shutdown` lifecycle (spec.md §3).
    /// Mirrors the teacher's `tokio::spawn` background-task pattern for
    /// `synchronize_job_status_loop`: a watch channel that every long-running
    /// task spawned by this instance can observe and stop on.
    shutdown_tx: tokio::sync::watch::Sender<bool>,
}

/// A cloneable handle that can trigger shutdown without holding the rest of
/// the façade, so it can be handed to a ctrl-c listener after `SchedulerServer`
/// itself has been moved into the tonic service.
#[derive(Clone)]
pub struct ShutdownHandle(tokio::sync::watch::Sender<bool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.0.send(true);
    }
}

impl SchedulerServer {
    pub fn new(config: SchedulerConfig, cluster_state: Arc<dyn ClusterStateProvider>) -> Self {
        let own_addr = WorkerAddr::new(config.bind_host.clone(), config.bind_port);
        let id_allocator = RequestIdAllocator::new(config.bind_host.clone(), config.bind_port);
        let (shutdown_tx, _) = tokio::sync::watch::channel(false);
        Self {
            own_addr,
            config,
            cluster_state,
            worker_clients: new_worker_client_pool(),
            frontend_clients: new_frontend_client_pool(),
            id_allocator,
            frontends: DashMap::new(),
            registry: Arc::new(RequestRegistry::new()),
            shutdown_tx,
        }
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    /// A receiver that resolves once `shutdown()` has been called on any
    /// handle derived from this instance.
    pub fn shutdown_signal(&self) -> tokio::sync::watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// spec.md §4.1 `registerFrontend`: parses the address, records the
    /// mapping, and asks the cluster-state provider to watch the
    /// application. Idempotent: registering the same `appId` again just
    /// overwrites the address (last write wins).
    pub async fn register_frontend(&self, app_id: &str, address: &str) -> Result<bool> {
        let addr = match WorkerAddr::parse(address) {
            Some(a) => a,
            None => return Ok(false),
        };
        self.frontends.insert(app_id.to_string(), addr);
        self.cluster_state.watch_application(app_id).await
    }

    /// spec.md §4.1 `submitJob`. Returns the allocated request ID once
    /// dispatch has been *initiated* -- it does not wait for worker replies.
    pub async fn submit_job(&self, request: SchedulingRequest) -> Result<String> {
        let request_id = self.id_allocator.allocate();
        audit::arrived(&request_id, request.tasks.len(), &self.own_addr.host, self.own_addr.port);

        let mut workers = self.cluster_state.backends(&request.app_id).await?;
        let constrained = request.is_constrained();

        if self.config.enable_spread_hack {
            apply_spread_hack(&request.probe_ratio, &request.tasks, &mut workers);
        }

        let probe_ratio = request.probe_ratio.unwrap_or(if constrained {
            self.config.default_constrained_probe_ratio
        } else {
            self.config.default_unconstrained_probe_ratio
        });

        let mut rng = StdRng::from_entropy();
        let placer: Arc<dyn TaskPlacer> = if constrained {
            Arc::new(
                ConstrainedPlacer::with_rng(
                    request_id.clone(),
                    &request.tasks,
                    &workers,
                    self.own_addr.clone(),
                    probe_ratio,
                    &mut rng,
                )
                .with_app_id(&request.app_id),
            )
        } else {
            Arc::new(
                UnconstrainedPlacer::with_rng(
                    request_id.clone(),
                    &request.tasks,
                    &workers,
                    self.own_addr.clone(),
                    probe_ratio,
                    &mut rng,
                )
                .with_app_id(&request.app_id),
            )
        };

        self.registry.insert(placer.clone());

        for (worker, batch) in placer.reservation_batches().iter() {
            let endpoint = worker.to_string();
            audit::node_monitor_launch_enqueue_task(&request_id, &endpoint, batch.num_reservations);

            let pool = self.worker_clients.clone();
            let proto_batch = grpc::batch_to_proto(batch);
            let request_id_for_task = request_id.clone();
            let endpoint_for_task = endpoint.clone();
            // Best-effort, fire-and-forget dispatch (spec.md §4.1 step 8):
            // other workers must still be contacted even if this one fails,
            // and the placer stays installed regardless.
            tokio::spawn(async move {
                match pool.checkout(&endpoint_for_task).await {
                    Ok(mut client) => {
                        match client.enqueue_task_reservations(proto_batch).await {
                            Ok(_) => audit::node_monitor_complete_enqueue_task(
                                &request_id_for_task,
                                &endpoint_for_task,
                            ),
                            Err(status) => {
                                audit::node_monitor_enqueue_task_failed(
                                    &request_id_for_task,
                                    &endpoint_for_task,
                                    &status.to_string(),
                                );
                                pool.discard(&endpoint_for_task).await;
                            }
                        }
                    }
                    Err(e) => audit::node_monitor_enqueue_task_failed(
                        &request_id_for_task,
                        &endpoint_for_task,
                        &e.to_string(),
                    ),
                }
            });
        }

        Ok(request_id)
    }

    /// spec.md §4.1 `getTask`. Never raises; returns empty on any detected
    /// inconsistency (unknown request, protocol violation).
    pub fn get_task(&self, request_id: &str, worker: &WorkerAddr) -> Vec<LaunchSpec> {
        let worker_str = worker.to_string();
        let placer = match self.registry.get(request_id) {
            Some(p) => p,
            None => {
                audit::get_task_unknown_request(request_id, &worker_str);
                return Vec::new();
            }
        };

        let mut result = placer.assign_task(worker);
        if result.len() > 1 {
            audit::protocol_violation(request_id, &worker_str, "assign_task returned more than one task");
            result = Vec::new();
        }

        match result.first() {
            Some(spec) => audit::assigned_task(request_id, &worker_str, &spec.task_id),
            None => audit::get_task_no_task(request_id, &worker_str),
        }

        if placer.all_responses_received() {
            self.registry.remove_if_drained(request_id);
        }

        result
    }

    /// spec.md §4.1 `sendFrontendMessage`. spec.md §9 flags the original's
    /// "log then call the RPC on a null handle anyway" behavior as a latent
    /// bug; this implementation returns immediately after logging.
    pub fn send_frontend_message(
        &self,
        app_id: &str,
        full_task_id: &str,
        status: i32,
        payload: Vec<u8>,
    ) {
        let addr = match self.frontends.get(app_id) {
            Some(addr) => addr.clone(),
            None => {
                log::error!("no frontend registered for app_id={}", app_id);
                return;
            }
        };

        let endpoint = addr.to_string();
        let pool = self.frontend_clients.clone();
        let full_task_id = full_task_id.to_string();
        tokio::spawn(async move {
            let client = match pool.checkout(&endpoint).await {
                Ok(c) => c,
                Err(e) => {
                    log::error!("could not reach frontend {}: {}", endpoint, e);
                    return;
                }
            };
            let mut client = client;
            let req = FrontendMessageParams { full_task_id, status, payload };
            if client.frontend_message(req).await.is_err() {
                // The completion callback only returns the handle to the
                // pool on success (spec.md §5); on error it stays discarded.
                pool.discard(&endpoint).await;
            }
        });
    }
}

/// spec.md §4.1, "the spread hack": when `probeRatio == 3` and every task
/// shares an identical preference list of size 1 or 2, exclude those
/// preferred workers from the candidate set before placement. Documented as
/// a deliberate, configuration-gated special case rather than part of the
/// placement algorithm proper (spec.md §9, Open Questions).
fn apply_spread_hack(probe_ratio: &Option<f64>, tasks: &[Task], workers: &mut HashSet<WorkerAddr>) {
    let ratio = probe_ratio.unwrap_or(0.0);
    if (ratio - 3.0).abs() > f64::EPSILON || tasks.is_empty() {
        return;
    }
    let first_pref = &tasks[0].preference;
    if first_pref.is_empty() || first_pref.len() > 2 {
        return;
    }
    if !tasks.iter().all(|t| &t.preference == first_pref) {
        return;
    }
    for worker in first_pref {
        workers.remove(worker);
    }
}
