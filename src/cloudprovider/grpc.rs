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

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info};
use tokio::time::{self, error::Elapsed};
use tonic::transport::{Channel, Endpoint};
use tonic::Status;

use super::{CallFailure, CloudProvider, ConnectError, Error, Reply, Result};
use public::consts::{
    GRPC_CALL_TIMEOUT, GRPC_CONNECT_TIMEOUT, GRPC_KEEPALIVE_INTERVAL, GRPC_KEEPALIVE_TIMEOUT,
};
use public::proto::cloudprovider::{
    ip_provider_service_client::IpProviderServiceClient, AssignIpReply, AssignIpRequest,
    UnAssignIpReply, UnAssignIpRequest,
};

/// The bound remote service, shared by every call once connected.
#[async_trait]
pub trait IpProviderRpc: Send + Sync {
    async fn assign(&self, request: AssignIpRequest) -> Result<AssignIpReply, Status>;
    async fn unassign(&self, request: UnAssignIpRequest) -> Result<UnAssignIpReply, Status>;
}

#[async_trait]
impl IpProviderRpc for IpProviderServiceClient<Channel> {
    async fn assign(&self, request: AssignIpRequest) -> Result<AssignIpReply, Status> {
        // clones share the underlying channel
        let mut client = self.clone();
        client.assign_ip(request).await.map(|r| r.into_inner())
    }

    async fn unassign(&self, request: UnAssignIpRequest) -> Result<UnAssignIpReply, Status> {
        let mut client = self.clone();
        client.un_assign_ip(request).await.map(|r| r.into_inner())
    }
}

/// Establishes the connection to the cloud provider.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Rpc: IpProviderRpc + 'static;

    async fn dial(&self, addr: &str) -> Result<Self::Rpc, ConnectError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrpcDialer {
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
    pub keepalive_timeout: Duration,
    pub keepalive_while_idle: bool,
}

impl Default for GrpcDialer {
    fn default() -> Self {
        Self {
            connect_timeout: GRPC_CONNECT_TIMEOUT,
            keepalive_interval: GRPC_KEEPALIVE_INTERVAL,
            keepalive_timeout: GRPC_KEEPALIVE_TIMEOUT,
            keepalive_while_idle: true,
        }
    }
}

impl GrpcDialer {
    // plaintext, the vendor service sits on the node's trusted network
    pub fn endpoint(&self, addr: &str) -> Result<Endpoint, ConnectError> {
        let endpoint = Endpoint::from_shared(format!("http://{}", addr)).map_err(|source| {
            ConnectError::Endpoint {
                addr: addr.to_owned(),
                source,
            }
        })?;
        Ok(endpoint
            .connect_timeout(self.connect_timeout)
            .http2_keep_alive_interval(self.keepalive_interval)
            .keep_alive_timeout(self.keepalive_timeout)
            .keep_alive_while_idle(self.keepalive_while_idle))
    }
}

#[async_trait]
impl Dialer for GrpcDialer {
    type Rpc = IpProviderServiceClient<Channel>;

    async fn dial(&self, addr: &str) -> Result<Self::Rpc, ConnectError> {
        let channel = self
            .endpoint(addr)?
            .connect()
            .await
            .map_err(|source| ConnectError::Dial {
                addr: addr.to_owned(),
                source,
            })?;
        Ok(IpProviderServiceClient::new(channel))
    }
}

type Connection<R> = Result<Arc<R>, Arc<ConnectError>>;

/// Brokers AssignIP/UnAssignIP over grpc.
///
/// The connection is made by the first call, exactly once for the lifetime of
/// the provider. The dial runs on its own task, callers arriving while it is in
/// progress wait for it, and a caller giving up does not restart it. A failed
/// connect is not retried, every later call reports it as a fatal error.
pub struct GrpcCloudProvider<D: Dialer = GrpcDialer> {
    cloud_provider_addr: String,
    client: Shared<BoxFuture<'static, Connection<D::Rpc>>>,
    timeout: Duration,
}

impl GrpcCloudProvider {
    pub fn new<S: Into<String>>(cloud_provider_addr: S) -> Self {
        Self::with_dialer(cloud_provider_addr, GrpcDialer::default())
    }
}

impl<D: Dialer> GrpcCloudProvider<D> {
    pub fn with_dialer<S: Into<String>>(cloud_provider_addr: S, dialer: D) -> Self {
        let cloud_provider_addr = cloud_provider_addr.into();
        let addr = cloud_provider_addr.clone();
        // lazy, nothing is dialed until the first call polls it
        let client = async move {
            debug!("dial cloud provider with address {}", addr);
            let dial_addr = addr.clone();
            let dial = tokio::spawn(async move { dialer.dial(&dial_addr).await });
            let result = match dial.await {
                Ok(result) => result,
                Err(e) => Err(ConnectError::Join(e)),
            };
            match result {
                Ok(client) => {
                    info!("connected to cloud provider {}", addr);
                    Ok(Arc::new(client))
                }
                Err(e) => {
                    error!("failed to connect to cloud provider {}: {:?}", addr, e);
                    Err(Arc::new(e))
                }
            }
        }
        .boxed()
        .shared();
        Self {
            cloud_provider_addr,
            client,
            timeout: GRPC_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connect(&self) -> Result<Arc<D::Rpc>> {
        self.client
            .clone()
            .await
            .map_err(|source| Error::CloudProviderUnreachable {
                addr: self.cloud_provider_addr.clone(),
                source,
            })
    }
}

// Splits the outcome of a bounded call into the reply or (reply, cause).
fn check_reply<R: Reply>(
    result: Result<Result<R, Status>, Elapsed>,
    timeout: Duration,
) -> Result<R, (Option<R>, CallFailure)> {
    match result {
        Ok(Ok(reply)) if reply.success() => Ok(reply),
        Ok(Ok(reply)) => Err((Some(reply), CallFailure::Rejected)),
        Ok(Err(status)) => Err((None, CallFailure::Status(status))),
        Err(_) => Err((None, CallFailure::Timeout(timeout))),
    }
}

#[async_trait]
impl<D: Dialer> CloudProvider for GrpcCloudProvider<D> {
    async fn assign_ip(&self, request: AssignIpRequest) -> Result<AssignIpReply> {
        let client = self.connect().await?;
        debug!("AssignIP {:?}", request);

        let result = time::timeout(self.timeout, client.assign(request.clone())).await;
        debug!("request {:?}, result {:?}", request, result);
        check_reply(result, self.timeout).map_err(|(reply, cause)| {
            let e = Error::AssignIp {
                request,
                reply,
                cause,
            };
            debug!("{}", e);
            e
        })
    }

    async fn un_assign_ip(&self, request: UnAssignIpRequest) -> Result<UnAssignIpReply> {
        let client = self.connect().await?;
        debug!("UnAssignIP {:?}", request);

        let result = time::timeout(self.timeout, client.unassign(request.clone())).await;
        debug!("request {:?}, result {:?}", request, result);
        check_reply(result, self.timeout).map_err(|(reply, cause)| {
            let e = Error::UnAssignIp {
                request,
                reply,
                cause,
            };
            debug!("{}", e);
            e
        })
    }
}
