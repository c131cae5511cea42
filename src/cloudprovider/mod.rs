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

mod error;
mod grpc;

pub use error::{CallFailure, ConnectError, Error, Result};
pub use grpc::{Dialer, GrpcCloudProvider, GrpcDialer, IpProviderRpc};

use async_trait::async_trait;

use public::proto::cloudprovider::{
    AssignIpReply, AssignIpRequest, UnAssignIpReply, UnAssignIpRequest,
};

/// CloudProvider is a floating ip vendor, such as a public cloud eni provider.
///
/// Both calls either return a reply whose `success` flag is set, or an error
/// carrying the request, the reply if there was one, and the cause.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    async fn assign_ip(&self, request: AssignIpRequest) -> Result<AssignIpReply>;
    async fn un_assign_ip(&self, request: UnAssignIpRequest) -> Result<UnAssignIpReply>;
}

trait Reply {
    fn success(&self) -> bool;
}

impl Reply for AssignIpReply {
    fn success(&self) -> bool {
        self.success
    }
}

impl Reply for UnAssignIpReply {
    fn success(&self) -> bool {
        self.success
    }
}
