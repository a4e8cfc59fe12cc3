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

//! Error taxonomy shared by every crate in the workspace.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SparrowError>;

/// The errors a scheduler replica can encounter, grouped the way spec.md §7
/// groups them: configuration errors are fatal at startup, transport errors
/// are logged and swallowed per-worker, and protocol violations degrade to an
/// empty reply rather than propagating.
#[derive(Error, Debug)]
pub enum SparrowError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error talking to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("rpc call to {endpoint} failed: {status}")]
    Rpc { endpoint: String, status: tonic::Status },

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("{0}")]
    General(String),
}

impl SparrowError {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        SparrowError::Configuration(msg.into())
    }

    pub fn protocol_violation<S: Into<String>>(msg: S) -> Self {
        SparrowError::ProtocolViolation(msg.into())
    }
}

impl From<SparrowError> for tonic::Status {
    fn from(err: SparrowError) -> Self {
        match err {
            SparrowError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            SparrowError::ProtocolViolation(msg) => tonic::Status::internal(msg),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}
