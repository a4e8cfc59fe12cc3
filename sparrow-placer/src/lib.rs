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

//! Task placers (spec.md §4.2-4.4) and the request registry (spec.md §4.6).
//!
//! The two variants -- [`unconstrained::UnconstrainedPlacer`] and
//! [`constrained::ConstrainedPlacer`] -- share the small contract described
//! below, modeled as a capability trait the way the teacher models its own
//! pluggable behaviors (`EventAction<E>` in `ballista_core::event_loop`,
//! `ConfigBackend` in the scheduler binary): one trait, two implementations,
//! chosen at `submitJob` time.

pub mod constrained;
pub mod registry;
pub mod unconstrained;

pub use constrained::ConstrainedPlacer;
pub use registry::RequestRegistry;
pub use unconstrained::UnconstrainedPlacer;

use std::collections::HashMap;

use sparrow_core::scheduler_types::{LaunchSpec, ReservationBatch, WorkerAddr};

/// Common contract every task placer implements (spec.md §4.2). A placer is
/// owned exclusively by the request registry for the lifetime of one
/// request; `assign_task` must be safe to call concurrently for the same
/// placer from different worker RPCs (spec.md §5).
pub trait TaskPlacer: Send + Sync {
    /// The request ID this placer was constructed for.
    fn request_id(&self) -> &str;

    /// The plan computed at construction time: one reservation batch per
    /// worker that received credits.
    fn reservation_batches(&self) -> &HashMap<WorkerAddr, ReservationBatch>;

    /// Consumes one reservation credit `worker` holds and returns the launch
    /// spec it should receive, or an empty list if there is nothing left to
    /// assign. Length is always 0 or 1.
    fn assign_task(&self, worker: &WorkerAddr) -> Vec<LaunchSpec>;

    /// True once every issued credit has produced a reply (spec.md §4.2,
    /// "drained"). Once true, `assign_task` never produces another task.
    fn all_responses_received(&self) -> bool;
}

/// `ceil(probe_ratio * task_count)`, shared by both placer variants.
pub(crate) fn probe_count(probe_ratio: f64, task_count: usize) -> u32 {
    (probe_ratio * task_count as f64).ceil() as u32
}
