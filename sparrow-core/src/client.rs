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

//! Pooled RPC handles to worker and frontend endpoints.
//!
//! Generalizes the teacher's `executors_client: Arc<RwLock<HashMap<String,
//! ExecutorGrpcClient<Channel>>>>` (scheduler `lib.rs`) into one pool type
//! keyed by endpoint, reused for both the worker and the frontend RPC
//! surfaces. The resource policy from spec.md §5 is: a handle is checked out,
//! used for exactly one call, and either returned to the pool (success) or
//! dropped (error) -- it is never returned in a possibly-bad state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tonic::transport::Channel;

use crate::error::{Result, SparrowError};
use crate::proto::frontend_service_client::FrontendServiceClient;
use crate::proto::worker_service_client::WorkerServiceClient;

/// A pool of cloneable gRPC clients keyed by `"host:port"`. `tonic` channels
/// are cheap to clone (they share an underlying connection), so "pooling"
/// here means "connect once, clone thereafter", exactly as the teacher's
/// `executors_client` map does.
pub struct ClientPool<C> {
    clients: Arc<RwLock<HashMap<String, C>>>,
    connect: fn(String) -> futures::future::BoxFuture<'static, Result<C>>,
}

impl<C: Clone> ClientPool<C> {
    fn new(connect: fn(String) -> futures::future::BoxFuture<'static, Result<C>>) -> Self {
        Self { clients: Arc::new(RwLock::new(HashMap::new())), connect }
    }

    /// Borrows a handle for `endpoint`, connecting lazily on first use.
    pub async fn checkout(&self, endpoint: &str) -> Result<C> {
        if let Some(client) = self.clients.read().await.get(endpoint) {
            return Ok(client.clone());
        }
        let client = (self.connect)(endpoint.to_string()).await?;
        self.clients.write().await.insert(endpoint.to_string(), client.clone());
        Ok(client)
    }

    /// Drops a handle that failed, so the next `checkout` reconnects instead
    /// of reusing a possibly-broken channel (spec.md §5, resource policy).
    pub async fn discard(&self, endpoint: &str) {
        self.clients.write().await.remove(endpoint);
    }
}

impl<C> Clone for ClientPool<C> {
    fn clone(&self) -> Self {
        Self { clients: self.clients.clone(), connect: self.connect }
    }
}

async fn connect_worker(endpoint: String) -> Result<WorkerServiceClient<Channel>> {
    let uri = format!("http://{}", endpoint);
    WorkerServiceClient::connect(uri.clone())
        .await
        .map_err(|source| SparrowError::Transport { endpoint: uri, source })
}

async fn connect_frontend(endpoint: String) -> Result<FrontendServiceClient<Channel>> {
    let uri = format!("http://{}", endpoint);
    FrontendServiceClient::connect(uri.clone())
        .await
        .map_err(|source| SparrowError::Transport { endpoint: uri, source })
}

pub type WorkerClientPool = ClientPool<WorkerServiceClient<Channel>>;
pub type FrontendClientPool = ClientPool<FrontendServiceClient<Channel>>;

pub fn new_worker_client_pool() -> WorkerClientPool {
    ClientPool::new(|endpoint| Box::pin(connect_worker(endpoint)))
}

pub fn new_frontend_client_pool() -> FrontendClientPool {
    ClientPool::new(|endpoint| Box::pin(connect_frontend(endpoint)))
}
