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

//! Wire adapter: converts between the generated protobuf types and the
//! façade's domain types (`sparrow_core::scheduler_types`), and maps
//! `SparrowError` to `tonic::Status` at this one boundary, exactly as the
//! teacher's scheduler gRPC service does for `BallistaError`.

use tonic::{Request, Response, Status};

use sparrow_core::proto::scheduler_service_server::SchedulerService;
use sparrow_core::proto::{
    EnqueueTaskReservationsResult, GetTaskParams, GetTaskResult, HostAddress,
    LaunchSpec as ProtoLaunchSpec, RegisterFrontendParams, RegisterFrontendResult,
    ReservationBatch as ProtoReservationBatch, SendFrontendMessageParams,
    SendFrontendMessageResult, SubmitJobParams, SubmitJobResult, Task as ProtoTask,
    TaskPreference,
};
use sparrow_core::scheduler_types::{ReservationBatch, SchedulingRequest, Task, WorkerAddr};

use super::SchedulerServer;

/// Converts an outgoing reservation batch to its wire form. Public within
/// the crate because `submit_job` builds the request on the façade side,
/// away from the gRPC server trait impl.
pub(crate) fn batch_to_proto(batch: &ReservationBatch) -> ProtoReservationBatch {
    ProtoReservationBatch {
        request_id: batch.request_id.clone(),
        app_id: batch.app_id.clone(),
        scheduler: Some(HostAddress {
            host: batch.scheduler_addr.host.clone(),
            port: batch.scheduler_addr.port as u32,
        }),
        num_reservations: batch.num_reservations,
        tasks: batch.tasks.iter().map(task_to_proto).collect(),
    }
}

fn task_to_proto(task: &Task) -> ProtoTask {
    ProtoTask {
        task_id: task.task_id.clone(),
        payload: task.payload.clone(),
        preference: Some(TaskPreference {
            nodes: task.preference.iter().map(|w| w.to_string()).collect(),
        }),
    }
}

fn task_from_proto(task: ProtoTask) -> Task {
    let preference = task
        .preference
        .map(|p| p.nodes.iter().filter_map(|s| WorkerAddr::parse(s)).collect())
        .unwrap_or_default();
    Task { task_id: task.task_id, payload: task.payload, preference }
}

fn host_address_to_addr(addr: HostAddress) -> Option<WorkerAddr> {
    if addr.host.is_empty() {
        return None;
    }
    u16::try_from(addr.port).ok().map(|port| WorkerAddr::new(addr.host, port))
}

#[tonic::async_trait]
impl SchedulerService for SchedulerServer {
    async fn register_frontend(
        &self,
        request: Request<RegisterFrontendParams>,
    ) -> Result<Response<RegisterFrontendResult>, Status> {
        let params = request.into_inner();
        let accepted = self.register_frontend(&params.app_id, &params.address).await?;
        Ok(Response::new(RegisterFrontendResult { accepted }))
    }

    async fn submit_job(
        &self,
        request: Request<SubmitJobParams>,
    ) -> Result<Response<SubmitJobResult>, Status> {
        let params = request.into_inner();
        let scheduling_request = SchedulingRequest {
            app_id: params.app_id,
            tasks: params.tasks.into_iter().map(task_from_proto).collect(),
            probe_ratio: params.probe_ratio,
        };
        let request_id = self.submit_job(scheduling_request).await?;
        Ok(Response::new(SubmitJobResult { request_id }))
    }

    async fn get_task(
        &self,
        request: Request<GetTaskParams>,
    ) -> Result<Response<GetTaskResult>, Status> {
        let params = request.into_inner();
        let worker = params
            .worker
            .and_then(host_address_to_addr)
            .ok_or_else(|| Status::invalid_argument("missing or malformed worker address"))?;

        let tasks = self
            .get_task(&params.request_id, &worker)
            .into_iter()
            .map(|spec| ProtoLaunchSpec { task_id: spec.task_id, payload: spec.payload })
            .collect();
        Ok(Response::new(GetTaskResult { tasks }))
    }

    async fn send_frontend_message(
        &self,
        request: Request<SendFrontendMessageParams>,
    ) -> Result<Response<SendFrontendMessageResult>, Status> {
        let params = request.into_inner();
        self.send_frontend_message(&params.app_id, &params.full_task_id, params.status, params.payload);
        Ok(Response::new(SendFrontendMessageResult {}))
    }
}
