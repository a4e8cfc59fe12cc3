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

//! Domain types (spec.md §3). These are the in-process representation used
//! by the façade and the placers; conversions to/from the generated
//! protobuf types live next to the gRPC service implementation so that the
//! placement logic never depends directly on the wire format.

use std::fmt;

/// `host:port` pair identifying a worker or a scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerAddr {
    pub host: String,
    pub port: u16,
}

impl WorkerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// Parses `"host:port"`. Returns `None` on any malformed address, the
    /// caller decides whether that is fatal (`registerFrontend`, spec.md
    /// §4.1) or merely ignorable (a preference entry, spec.md §7 category 5).
    pub fn parse(addr: &str) -> Option<Self> {
        let (host, port) = addr.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        let port: u16 = port.parse().ok()?;
        Some(Self::new(host, port))
    }
}

impl fmt::Display for WorkerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opaque task payload plus an optional list of preferred worker addresses,
/// in preference order (spec.md §3, "Task carries ... an optional
/// preference").
#[derive(Debug, Clone)]
pub struct Task {
    pub task_id: String,
    pub payload: Vec<u8>,
    pub preference: Vec<WorkerAddr>,
}

impl Task {
    pub fn is_constrained(&self) -> bool {
        !self.preference.is_empty()
    }
}

/// Immutable value delivered by a frontend (spec.md §3, "Entity: Scheduling
/// request").
#[derive(Debug, Clone)]
pub struct SchedulingRequest {
    pub app_id: String,
    pub tasks: Vec<Task>,
    pub probe_ratio: Option<f64>,
}

impl SchedulingRequest {
    /// spec.md §4.1 step 4: constrained iff any task carries a non-empty
    /// preference list.
    pub fn is_constrained(&self) -> bool {
        self.tasks.iter().any(Task::is_constrained)
    }
}

/// Value sent to one worker (spec.md §3, "Entity: Reservation batch"). The
/// worker treats `tasks` as opaque queue credits, it never inspects them
/// beyond presenting them at `getTask` time.
#[derive(Debug, Clone)]
pub struct ReservationBatch {
    pub request_id: String,
    pub app_id: String,
    pub scheduler_addr: WorkerAddr,
    pub num_reservations: u32,
    pub tasks: Vec<Task>,
}

/// Value returned to a worker on `getTask` (spec.md §3, "Entity: Launch
/// spec"): exactly one pending task, or nothing.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub task_id: String,
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_address() {
        let addr = WorkerAddr::parse("10.0.0.5:9000").unwrap();
        assert_eq!(addr.host, "10.0.0.5");
        assert_eq!(addr.port, 9000);
    }

    #[test]
    fn rejects_malformed_address() {
        assert!(WorkerAddr::parse("not-an-address").is_none());
        assert!(WorkerAddr::parse(":9000").is_none());
        assert!(WorkerAddr::parse("host:notaport").is_none());
    }

    #[test]
    fn constrained_iff_any_task_has_preference() {
        let unconstrained = SchedulingRequest {
            app_id: "A".into(),
            tasks: vec![Task { task_id: "t1".into(), payload: vec![], preference: vec![] }],
            probe_ratio: None,
        };
        assert!(!unconstrained.is_constrained());

        let constrained = SchedulingRequest {
            app_id: "A".into(),
            tasks: vec![Task {
                task_id: "t1".into(),
                payload: vec![],
                preference: vec![WorkerAddr::new("h1", 1)],
            }],
            probe_ratio: None,
        };
        assert!(constrained.is_constrained());
    }
}
