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

//! Request registry (spec.md §4.6): a concurrent map from request ID to its
//! task placer. Insertion happens exactly once in `submitJob`; removal
//! happens exactly once when a `getTask` observes the placer drained.

use std::sync::Arc;

use dashmap::DashMap;

use crate::TaskPlacer;

#[derive(Default)]
pub struct RequestRegistry {
    placers: DashMap<String, Arc<dyn TaskPlacer>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly constructed placer. Called exactly once per
    /// request, from `submitJob`.
    pub fn insert(&self, placer: Arc<dyn TaskPlacer>) {
        self.placers.insert(placer.request_id().to_string(), placer);
    }

    pub fn get(&self, request_id: &str) -> Option<Arc<dyn TaskPlacer>> {
        self.placers.get(request_id).map(|e| e.value().clone())
    }

    /// Removes the placer for `request_id` iff it is still present *and*
    /// every `DashMap` entry access is already serialized by the shard lock,
    /// so at most one caller observes `true` for the same request even when
    /// several `getTask` calls race (spec.md §4.6, §8 scenario 6).
    pub fn remove_if_drained(&self, request_id: &str) -> bool {
        if let dashmap::mapref::entry::Entry::Occupied(entry) = self.placers.entry(request_id.to_string())
        {
            if entry.get().all_responses_received() {
                entry.remove();
                return true;
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.placers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placers.is_empty()
    }
}
