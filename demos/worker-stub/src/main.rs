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

//! A thin stand-in for a real node monitor, for manually exercising the
//! late-binding `getTask` protocol end-to-end. It accepts reservation
//! batches and then pulls tasks from whichever scheduler sent them, the same
//! `poll_work`-style loop the teacher's `ballista-executor` runs against the
//! scheduler it registered with -- except this stub never actually executes
//! anything, it just logs what it was handed.
//!
//! The real worker-side queue is an explicit out-of-scope collaborator
//! (spec.md §1); this binary exists only for manual testing and is
//! deliberately not part of the crate graph the scheduler depends on.

use clap::Parser;
use tokio::sync::mpsc;
use tonic::{Request, Response, Status};

use sparrow_core::proto::scheduler_service_client::SchedulerServiceClient;
use sparrow_core::proto::worker_service_server::{WorkerService, WorkerServiceServer};
use sparrow_core::proto::{
    EnqueueTaskReservationsResult, GetTaskParams, HostAddress, ReservationBatch,
};

#[derive(Debug, Parser)]
#[clap(name = "worker-stub", about = "Minimal node-monitor stub", version)]
struct Opt {
    #[clap(long, default_value = "0.0.0.0")]
    bind_host: String,

    #[clap(long, default_value = "50100")]
    bind_port: u16,
}

struct WorkerStub {
    batches: mpsc::UnboundedSender<ReservationBatch>,
}

#[tonic::async_trait]
impl WorkerService for WorkerStub {
    async fn enqueue_task_reservations(
        &self,
        request: Request<ReservationBatch>,
    ) -> Result<Response<EnqueueTaskReservationsResult>, Status> {
        let batch = request.into_inner();
        log::info!(
            "received {} reservation(s) for request_id={}",
            batch.num_reservations,
            batch.request_id
        );
        // The scheduler's dispatch is fire-and-forget (spec.md §4.1 step 8);
        // we only need to accept the batch and pull later, on our own time.
        if self.batches.send(batch).is_err() {
            return Err(Status::internal("worker stub is shutting down"));
        }
        Ok(Response::new(EnqueueTaskReservationsResult { accepted: true }))
    }
}

/// Pulls every reservation credit in `batch` from the scheduler that issued
/// it, logging whatever comes back. Mirrors the shape of the teacher's
/// executor `poll_work` loop: call, inspect, call again until the credits
/// run out.
async fn drain_batch(batch: ReservationBatch, own_worker: HostAddress) {
    let Some(scheduler) = batch.scheduler.clone() else {
        log::warn!("reservation batch for request_id={} has no scheduler address", batch.request_id);
        return;
    };
    let endpoint = format!("http://{}:{}", scheduler.host, scheduler.port);
    let mut client = match SchedulerServiceClient::connect(endpoint.clone()).await {
        Ok(c) => c,
        Err(e) => {
            log::warn!("could not reach scheduler at {}: {}", endpoint, e);
            return;
        }
    };

    for _ in 0..batch.num_reservations {
        let params = GetTaskParams {
            request_id: batch.request_id.clone(),
            worker: Some(own_worker.clone()),
        };
        match client.get_task(Request::new(params)).await {
            Ok(resp) => {
                let tasks = resp.into_inner().tasks;
                match tasks.first() {
                    Some(spec) => log::info!(
                        "request_id={} got task_id={} ({} byte payload)",
                        batch.request_id,
                        spec.task_id,
                        spec.payload.len()
                    ),
                    None => log::info!("request_id={} got no task", batch.request_id),
                }
            }
            Err(status) => {
                log::warn!("get_task for request_id={} failed: {}", batch.request_id, status);
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::parse();
    let own_worker = HostAddress { host: opt.bind_host.clone(), port: opt.bind_port as u32 };

    let (tx, mut rx) = mpsc::unbounded_channel::<ReservationBatch>();

    tokio::spawn(async move {
        while let Some(batch) = rx.recv().await {
            let own_worker = own_worker.clone();
            tokio::spawn(drain_batch(batch, own_worker));
        }
    });

    let addr = format!("{}:{}", opt.bind_host, opt.bind_port).parse()?;
    log::info!("worker stub listening on {}", addr);

    tonic::transport::Server::builder()
        .add_service(WorkerServiceServer::new(WorkerStub { batches: tx }))
        .serve(addr)
        .await?;

    Ok(())
}
