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

//! Unconstrained placer (spec.md §4.3): random probing with no per-task
//! worker preference.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use sparrow_core::scheduler_types::{LaunchSpec, ReservationBatch, Task, WorkerAddr};

use crate::{probe_count, TaskPlacer};

struct Inner {
    unassigned: VecDeque<Task>,
    worker_remaining: HashMap<WorkerAddr, u32>,
    responses_received: u32,
}

pub struct UnconstrainedPlacer {
    request_id: String,
    batches: HashMap<WorkerAddr, ReservationBatch>,
    total_credits: u32,
    inner: Mutex<Inner>,
}

impl UnconstrainedPlacer {
    /// Builds the plan from a fixed RNG seed, so that identical `(request,
    /// worker set, seed)` inputs produce identical plans (spec.md §8,
    /// "determinism under a fixed RNG").
    pub fn with_rng(
        request_id: String,
        tasks: &[Task],
        workers: &HashSet<WorkerAddr>,
        scheduler_addr: WorkerAddr,
        probe_ratio: f64,
        rng: &mut StdRng,
    ) -> Self {
        let task_count = tasks.len();
        let p = probe_count(probe_ratio, task_count);

        let mut worker_list: Vec<WorkerAddr> = workers.iter().cloned().collect();
        worker_list.sort();

        let mut credits: HashMap<WorkerAddr, u32> = HashMap::new();
        if !worker_list.is_empty() {
            let unique_count = std::cmp::min(p as usize, worker_list.len());
            let chosen: Vec<WorkerAddr> =
                worker_list.choose_multiple(rng, unique_count).cloned().collect();
            for w in &chosen {
                credits.insert(w.clone(), 1);
            }
            // p > |workers|: distribute the extra reservations with
            // replacement until the total equals p (spec.md §4.3).
            let mut issued = chosen.len() as u32;
            while issued < p {
                let w = worker_list.choose(rng).expect("worker_list is non-empty here");
                *credits.entry(w.clone()).or_insert(0) += 1;
                issued += 1;
            }
        }

        let total_credits: u32 = credits.values().sum();

        let batches = credits
            .iter()
            .map(|(worker, &num_reservations)| {
                (
                    worker.clone(),
                    ReservationBatch {
                        request_id: request_id.clone(),
                        app_id: String::new(),
                        scheduler_addr: scheduler_addr.clone(),
                        num_reservations,
                        tasks: tasks.to_vec(),
                    },
                )
            })
            .collect();

        Self {
            request_id,
            batches,
            total_credits,
            inner: Mutex::new(Inner {
                unassigned: tasks.iter().cloned().collect(),
                worker_remaining: credits,
                responses_received: 0,
            }),
        }
    }

    /// Convenience constructor seeded from entropy, for production use.
    pub fn new(
        request_id: String,
        tasks: &[Task],
        workers: &HashSet<WorkerAddr>,
        scheduler_addr: WorkerAddr,
        probe_ratio: f64,
    ) -> Self {
        let mut rng = StdRng::from_entropy();
        Self::with_rng(request_id, tasks, workers, scheduler_addr, probe_ratio, &mut rng)
    }

    /// Fills in `app_id` on every batch; kept separate from `with_rng` so
    /// tests can build plans without needing a full `SchedulingRequest`.
    pub fn with_app_id(mut self, app_id: &str) -> Self {
        for batch in self.batches.values_mut() {
            batch.app_id = app_id.to_string();
        }
        self
    }
}

impl TaskPlacer for UnconstrainedPlacer {
    fn request_id(&self) -> &str {
        &self.request_id
    }

    fn reservation_batches(&self) -> &HashMap<WorkerAddr, ReservationBatch> {
        &self.batches
    }

    fn assign_task(&self, worker: &WorkerAddr) -> Vec<LaunchSpec> {
        let mut inner = self.inner.lock();
        let remaining = match inner.worker_remaining.get_mut(worker) {
            Some(r) if *r > 0 => r,
            _ => return Vec::new(),
        };
        *remaining -= 1;
        inner.responses_received += 1;

        match inner.unassigned.pop_front() {
            Some(task) => vec![LaunchSpec { task_id: task.task_id, payload: task.payload }],
            None => Vec::new(),
        }
    }

    fn all_responses_received(&self) -> bool {
        self.inner.lock().responses_received >= self.total_credits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workers(n: usize) -> HashSet<WorkerAddr> {
        (0..n).map(|i| WorkerAddr::new(format!("w{}", i), 1000 + i as u16)).collect()
    }

    fn tasks(n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| Task { task_id: format!("t{}", i), payload: vec![i as u8], preference: vec![] })
            .collect()
    }

    #[test]
    fn total_credits_at_least_probe_count() {
        let placer = UnconstrainedPlacer::new(
            "r1".to_string(),
            &tasks(2),
            &workers(4),
            WorkerAddr::new("sched", 9),
            2.0,
        );
        assert_eq!(placer.total_credits, 4);
        assert_eq!(placer.reservation_batches().len(), 4);
    }

    #[test]
    fn extra_credits_distribute_without_duplicating_assignment() {
        let placer = UnconstrainedPlacer::new(
            "r1".to_string(),
            &tasks(2),
            &workers(2),
            WorkerAddr::new("sched", 9),
            3.0, // probe_count = 6 > 2 workers
        );
        assert_eq!(placer.total_credits, 6);
        let total_issued: u32 = placer.reservation_batches().values().map(|b| b.num_reservations).sum();
        assert_eq!(total_issued, 6);

        let mut assigned = std::collections::HashSet::new();
        let ws: Vec<WorkerAddr> = placer.reservation_batches().keys().cloned().collect();
        for _ in 0..6 {
            for w in &ws {
                let got = placer.assign_task(w);
                for spec in got {
                    assert!(assigned.insert(spec.task_id), "task assigned twice");
                }
            }
        }
        assert!(placer.all_responses_received());
        assert!(assigned.len() <= 2);
    }

    #[test]
    fn empty_worker_set_drains_immediately() {
        let placer = UnconstrainedPlacer::new(
            "r1".to_string(),
            &tasks(2),
            &HashSet::new(),
            WorkerAddr::new("sched", 9),
            2.0,
        );
        assert!(placer.reservation_batches().is_empty());
        assert!(placer.all_responses_received());
        assert!(placer.assign_task(&WorkerAddr::new("w0", 1000)).is_empty());
    }

    #[test]
    fn probe_ratio_one_issues_exactly_one_credit_per_task() {
        let placer = UnconstrainedPlacer::new(
            "r1".to_string(),
            &tasks(3),
            &workers(5),
            WorkerAddr::new("sched", 9),
            1.0,
        );
        assert_eq!(placer.total_credits, 3);
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let placer_a = UnconstrainedPlacer::with_rng(
            "r1".to_string(),
            &tasks(3),
            &workers(6),
            WorkerAddr::new("sched", 9),
            2.0,
            &mut rng_a,
        );
        let placer_b = UnconstrainedPlacer::with_rng(
            "r1".to_string(),
            &tasks(3),
            &workers(6),
            WorkerAddr::new("sched", 9),
            2.0,
            &mut rng_b,
        );
        let mut a: Vec<(WorkerAddr, u32)> =
            placer_a.reservation_batches().iter().map(|(w, b)| (w.clone(), b.num_reservations)).collect();
        let mut b: Vec<(WorkerAddr, u32)> =
            placer_b.reservation_batches().iter().map(|(w, b)| (w.clone(), b.num_reservations)).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn each_task_assigned_at_most_once_across_many_calls() {
        let placer = UnconstrainedPlacer::new(
            "r1".to_string(),
            &tasks(5),
            &workers(10),
            WorkerAddr::new("sched", 9),
            2.0,
        );
        let ws: Vec<WorkerAddr> = placer.reservation_batches().keys().cloned().collect();
        let mut seen = std::collections::HashSet::new();
        loop {
            if placer.all_responses_received() {
                break;
            }
            for w in &ws {
                for spec in placer.assign_task(w) {
                    assert!(seen.insert(spec.task_id));
                }
            }
        }
        assert!(seen.len() <= 5);
    }
}
