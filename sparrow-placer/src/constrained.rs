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

//! Constrained placer (spec.md §4.4): probing honors per-task node
//! preferences, falling back to unconstrained selection when a task has no
//! usable preference (no preference at all, or every preferred node failed
//! to resolve to a live worker -- spec.md §8, "Constrained with all
//! preferences unresolvable").

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use sparrow_core::scheduler_types::{LaunchSpec, ReservationBatch, Task, WorkerAddr};

use crate::{probe_count, TaskPlacer};

struct Inner {
    /// Per-worker queue of task IDs probed to it, in preference order, so
    /// that assignment is deterministic across identical inputs.
    worker_queues: HashMap<WorkerAddr, VecDeque<String>>,
    worker_remaining: HashMap<WorkerAddr, u32>,
    assigned: HashSet<String>,
    responses_received: u32,
}

pub struct ConstrainedPlacer {
    request_id: String,
    batches: HashMap<WorkerAddr, ReservationBatch>,
    task_payloads: HashMap<String, Vec<u8>>,
    total_credits: u32,
    inner: Mutex<Inner>,
}

impl ConstrainedPlacer {
    pub fn with_rng(
        request_id: String,
        tasks: &[Task],
        workers: &HashSet<WorkerAddr>,
        scheduler_addr: WorkerAddr,
        probe_ratio: f64,
        rng: &mut StdRng,
    ) -> Self {
        let k = probe_count(probe_ratio, 1).max(1) as usize; // ceil(probeRatio) per task
        let mut worker_list: Vec<WorkerAddr> = workers.iter().cloned().collect();
        worker_list.sort();

        let mut worker_task_lists: HashMap<WorkerAddr, Vec<&Task>> = HashMap::new();
        let mut worker_credits: HashMap<WorkerAddr, u32> = HashMap::new();

        for task in tasks {
            // spec.md §4.4: probe ceil(probeRatio) of the preferred workers;
            // fall back to unconstrained selection once preferences are
            // exhausted (including tasks with no preference at all).
            let mut available: Vec<WorkerAddr> =
                task.preference.iter().filter(|w| workers.contains(*w)).cloned().collect();
            available.shuffle(rng);
            let mut chosen: Vec<WorkerAddr> = available.into_iter().take(k).collect();

            if chosen.len() < k && !worker_list.is_empty() {
                let mut fallback_pool: Vec<WorkerAddr> =
                    worker_list.iter().filter(|w| !chosen.contains(w)).cloned().collect();
                fallback_pool.shuffle(rng);
                let need = k - chosen.len();
                chosen.extend(fallback_pool.into_iter().take(need));

                // The distinct fallback pool may still be smaller than `k`
                // (spec.md §4.4's fallback is "unconstrained selection", and
                // §4.3 distributes a shortfall with replacement rather than
                // truncating the credit count below `ceil(probeRatio)`).
                while chosen.len() < k {
                    let w = worker_list.choose(rng).expect("worker_list is non-empty here");
                    chosen.push(w.clone());
                }
            }

            for worker in chosen {
                worker_task_lists.entry(worker.clone()).or_default().push(task);
                *worker_credits.entry(worker).or_insert(0) += 1;
            }
        }

        let mut task_payloads = HashMap::new();
        let mut worker_queues = HashMap::new();
        let mut batches = HashMap::new();
        for (worker, worker_tasks) in worker_task_lists {
            let queue: VecDeque<String> =
                worker_tasks.iter().map(|t| t.task_id.clone()).collect();
            let num_reservations = worker_credits[&worker];
            batches.insert(
                worker.clone(),
                ReservationBatch {
                    request_id: request_id.clone(),
                    app_id: String::new(),
                    scheduler_addr: scheduler_addr.clone(),
                    num_reservations,
                    tasks: worker_tasks.iter().map(|&t| t.clone()).collect(),
                },
            );
            worker_queues.insert(worker, queue);
        }
        for task in tasks {
            task_payloads.insert(task.task_id.clone(), task.payload.clone());
        }

        let total_credits: u32 = worker_credits.values().sum();

        Self {
            request_id,
            batches,
            task_payloads,
            total_credits,
            inner: Mutex::new(Inner {
                worker_queues,
                worker_remaining: worker_credits,
                assigned: HashSet::new(),
                responses_received: 0,
            }),
        }
    }

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

    pub fn with_app_id(mut self, app_id: &str) -> Self {
        for batch in self.batches.values_mut() {
            batch.app_id = app_id.to_string();
        }
        self
    }
}

impl TaskPlacer for ConstrainedPlacer {
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

        let queue = match inner.worker_queues.get_mut(worker) {
            Some(q) => q,
            None => return Vec::new(),
        };
        while let Some(task_id) = queue.pop_front() {
            if inner.assigned.contains(&task_id) {
                continue;
            }
            inner.assigned.insert(task_id.clone());
            let payload = self.task_payloads.get(&task_id).cloned().unwrap_or_default();
            return vec![LaunchSpec { task_id, payload }];
        }
        Vec::new()
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

    #[test]
    fn probes_preferred_workers_only() {
        let w0 = WorkerAddr::new("w0", 1000);
        let w1 = WorkerAddr::new("w1", 1001);
        let tasks = vec![Task {
            task_id: "t1".to_string(),
            payload: vec![1],
            preference: vec![w0.clone()],
        }];
        let mut workers_set = HashSet::new();
        workers_set.insert(w0.clone());
        workers_set.insert(w1.clone());

        let placer = ConstrainedPlacer::new(
            "r1".to_string(),
            &tasks,
            &workers_set,
            WorkerAddr::new("sched", 9),
            1.0,
        );
        assert_eq!(placer.reservation_batches().len(), 1);
        assert!(placer.reservation_batches().contains_key(&w0));
        assert!(placer.assign_task(&w1).is_empty());
        let got = placer.assign_task(&w0);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].task_id, "t1");
    }

    #[test]
    fn falls_back_to_unconstrained_when_preferences_unresolvable() {
        let tasks = vec![Task {
            task_id: "t1".to_string(),
            payload: vec![1],
            preference: vec![WorkerAddr::new("ghost", 9999)], // not in cluster
        }];
        let placer = ConstrainedPlacer::new(
            "r1".to_string(),
            &tasks,
            &workers(3),
            WorkerAddr::new("sched", 9),
            2.0,
        );
        // ceil(2.0) = 2 fallback workers chosen from the cluster.
        let total: u32 = placer.reservation_batches().values().map(|b| b.num_reservations).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn each_task_assigned_at_most_once() {
        let w: Vec<WorkerAddr> = (0..4).map(|i| WorkerAddr::new(format!("w{}", i), 1000 + i)).collect();
        let tasks = vec![
            Task { task_id: "t1".to_string(), payload: vec![1], preference: w.clone() },
            Task { task_id: "t2".to_string(), payload: vec![2], preference: w.clone() },
        ];
        let workers_set: HashSet<WorkerAddr> = w.iter().cloned().collect();
        let placer = ConstrainedPlacer::new(
            "r1".to_string(),
            &tasks,
            &workers_set,
            WorkerAddr::new("sched", 9),
            2.0,
        );
        let mut seen = HashSet::new();
        loop {
            if placer.all_responses_received() {
                break;
            }
            for worker in &w {
                for spec in placer.assign_task(worker) {
                    assert!(seen.insert(spec.task_id));
                }
            }
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn empty_worker_set_drains_immediately() {
        let tasks = vec![Task {
            task_id: "t1".to_string(),
            payload: vec![1],
            preference: vec![WorkerAddr::new("w0", 1000)],
        }];
        let placer = ConstrainedPlacer::new(
            "r1".to_string(),
            &tasks,
            &HashSet::new(),
            WorkerAddr::new("sched", 9),
            2.0,
        );
        assert!(placer.reservation_batches().is_empty());
        assert!(placer.all_responses_received());
    }
}
