/*
 * Copyright (c) 2024 Yunshan Networks
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

use public::proto::cloudprovider::{
    AssignIpReply, AssignIpRequest, UnAssignIpReply, UnAssignIpRequest,
};

#[derive(Debug, Error)]
pub enum CallFailure {
    #[error("{0}")]
    Status(tonic::Status),
    #[error("deadline {0:?} exceeded")]
    Timeout(Duration),
    #[error("rejected by cloud provider")]
    Rejected,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid endpoint http://{addr}")]
    Endpoint {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("dial server({addr}) failed")]
    Dial {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("dial task did not complete")]
    Join(#[source] JoinError),
}

#[derive(Debug, Error)]
pub enum Error {
    // the process cannot do its job without the cloud provider
    #[error("failed to connect to cloud provider {addr}")]
    CloudProviderUnreachable {
        addr: String,
        #[source]
        source: Arc<ConnectError>,
    },
    #[error("AssignIP for {request:?} failed: reply {reply:?}, err {cause}")]
    AssignIp {
        request: AssignIpRequest,
        reply: Option<AssignIpReply>,
        #[source]
        cause: CallFailure,
    },
    #[error("UnAssignIP for {request:?} failed: reply {reply:?}, err {cause}")]
    UnAssignIp {
        request: UnAssignIpRequest,
        reply: Option<UnAssignIpReply>,
        #[source]
        cause: CallFailure,
    },
}

impl Error {
    /// Fatal errors are not worth retrying, the process should exit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CloudProviderUnreachable { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
