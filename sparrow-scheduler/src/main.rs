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

use std::sync::Arc;

use clap::Parser;

use sparrow_core::cluster_state::{
    ClusterStateProvider, ConfigBasedClusterState, NullClusterStateSource, ProductionClusterState,
    StandaloneClusterState,
};
use sparrow_core::config::{DeploymentMode, SchedulerConfig, SchedulerOpt};
use sparrow_core::proto::scheduler_service_server::SchedulerServiceServer;
use sparrow_scheduler::SchedulerServer;

fn build_cluster_state(config: &SchedulerConfig) -> Arc<dyn ClusterStateProvider> {
    match config.deployment_mode {
        DeploymentMode::Standalone => Arc::new(StandaloneClusterState::new()),
        DeploymentMode::ConfigBased => Arc::new(ConfigBasedClusterState::new(&config.static_workers)),
        DeploymentMode::Production => {
            log::warn!(
                "production deployment mode has no cluster-state source wired in; \
                 falling back to a null source that never reports any workers"
            );
            Arc::new(ProductionClusterState::new(Arc::new(NullClusterStateSource)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opt = SchedulerOpt::parse();
    let config = opt.into_config()?;
    let addr = format!("{}:{}", config.bind_host, config.bind_port).parse()?;

    log::info!(
        "starting sparrow-scheduler on {} (deployment_mode={:?})",
        addr,
        config.deployment_mode
    );

    let cluster_state = build_cluster_state(&config);
    let scheduler = SchedulerServer::new(config, cluster_state);

    // Grab a shutdown handle/signal before `scheduler` is moved into the
    // tonic service, so ctrl-c can still trigger a graceful stop.
    let mut shutdown_rx = scheduler.shutdown_signal();
    let shutdown_handle = scheduler.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("received shutdown signal");
            shutdown_handle.shutdown();
        }
    });

    tonic::transport::Server::builder()
        .add_service(SchedulerServiceServer::new(scheduler))
        .serve_with_shutdown(addr, async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}
