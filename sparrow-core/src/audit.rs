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

//! Structured audit log (spec.md §6, "Audit event schema").
//!
//! One `log` line per lifecycle event, each carrying the request ID plus the
//! optional worker address / task ID fields the schema calls for. This keeps
//! the teacher's own logging facade (`log::{info, warn, error}`) rather than
//! introducing a separate structured-logging crate, since the schema here is
//! small and fixed.

use log::{info, warn};

pub fn arrived(request_id: &str, task_count: usize, scheduler_host: &str, scheduler_port: u16) {
    info!(
        "event=arrived request_id={} task_count={} scheduler={}:{}",
        request_id, task_count, scheduler_host, scheduler_port
    );
}

pub fn node_monitor_launch_enqueue_task(request_id: &str, worker: &str, num_reservations: u32) {
    info!(
        "event=node_monitor_launch_enqueue_task request_id={} worker={} num_reservations={}",
        request_id, worker, num_reservations
    );
}

pub fn node_monitor_complete_enqueue_task(request_id: &str, worker: &str) {
    info!(
        "event=node_monitor_complete_enqueue_task request_id={} worker={}",
        request_id, worker
    );
}

pub fn node_monitor_enqueue_task_failed(request_id: &str, worker: &str, error: &str) {
    warn!(
        "event=node_monitor_enqueue_task_failed request_id={} worker={} error={}",
        request_id, worker, error
    );
}

pub fn assigned_task(request_id: &str, worker: &str, task_id: &str) {
    info!(
        "event=assigned_task request_id={} worker={} task_id={}",
        request_id, worker, task_id
    );
}

pub fn get_task_no_task(request_id: &str, worker: &str) {
    info!("event=get_task_no_task request_id={} worker={}", request_id, worker);
}

pub fn get_task_unknown_request(request_id: &str, worker: &str) {
    warn!(
        "event=get_task_unknown_request request_id={} worker={}",
        request_id, worker
    );
}

pub fn protocol_violation(request_id: &str, worker: &str, detail: &str) {
    warn!(
        "event=protocol_violation request_id={} worker={} detail={}",
        request_id, worker, detail
    );
}
