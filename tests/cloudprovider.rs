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

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{transport::Server as TonicServer, Code, Request, Response, Status};

use eni_ipam::cloudprovider::{CallFailure, CloudProvider, Error, GrpcCloudProvider};
use public::proto::cloudprovider::{
    ip_provider_service_server::{IpProviderService, IpProviderServiceServer},
    AssignIpReply, AssignIpRequest, UnAssignIpReply, UnAssignIpRequest,
};

const BANNED_IP: &str = "10.0.0.99";
const BROKEN_IP: &str = "10.0.0.98";
const SLOW_IP: &str = "10.0.0.97";

#[derive(Default)]
struct ServiceImpl {
    calls: AtomicUsize,
    assigned: Mutex<Vec<AssignIpRequest>>,
}

impl ServiceImpl {
    async fn answer(&self, ip_address: &str) -> Result<(bool, String), Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match ip_address {
            BANNED_IP => Ok((false, format!("{} is not in the eni's subnet", ip_address))),
            BROKEN_IP => Err(Status::not_found("eni not found")),
            SLOW_IP => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok((true, String::new()))
            }
            _ => Ok((true, String::new())),
        }
    }
}

#[tonic::async_trait]
impl IpProviderService for ServiceImpl {
    async fn assign_ip(
        &self,
        request: Request<AssignIpRequest>,
    ) -> Result<Response<AssignIpReply>, Status> {
        let request = request.into_inner();
        let (success, msg) = self.answer(&request.ip_address).await?;
        if success {
            self.assigned.lock().await.push(request);
        }
        Ok(Response::new(AssignIpReply { success, msg }))
    }

    async fn un_assign_ip(
        &self,
        request: Request<UnAssignIpRequest>,
    ) -> Result<Response<UnAssignIpReply>, Status> {
        let request = request.into_inner();
        let (success, msg) = self.answer(&request.ip_address).await?;
        Ok(Response::new(UnAssignIpReply { success, msg }))
    }
}

async fn start_server(service: Arc<ServiceImpl>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        TonicServer::builder()
            .add_service(IpProviderServiceServer::from_arc(service))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    (addr, handle)
}

fn assign_request(ip_address: &str) -> AssignIpRequest {
    AssignIpRequest {
        node_name: "node-1".to_owned(),
        ip_address: ip_address.to_owned(),
        app_name: "nginx".to_owned(),
        pod_name: "nginx-0".to_owned(),
        pod_namespace: "default".to_owned(),
    }
}

fn un_assign_request(ip_address: &str) -> UnAssignIpRequest {
    UnAssignIpRequest {
        node_name: "node-1".to_owned(),
        ip_address: ip_address.to_owned(),
        app_name: "nginx".to_owned(),
        pod_name: "nginx-0".to_owned(),
        pod_namespace: "default".to_owned(),
    }
}

#[tokio::test]
async fn assign_and_unassign() {
    let service = Arc::new(ServiceImpl::default());
    let (addr, server) = start_server(service.clone()).await;
    let provider = GrpcCloudProvider::new(addr.to_string());

    let reply = provider
        .assign_ip(assign_request("10.0.0.10"))
        .await
        .unwrap();
    assert!(reply.success);
    let reply = provider
        .un_assign_ip(un_assign_request("10.0.0.10"))
        .await
        .unwrap();
    assert!(reply.success);

    let assigned = service.assigned.lock().await;
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0], assign_request("10.0.0.10"));
    drop(assigned);

    server.abort();
}

#[tokio::test]
async fn rejected_reply_is_returned_with_error() {
    let service = Arc::new(ServiceImpl::default());
    let (addr, server) = start_server(service).await;
    let provider = GrpcCloudProvider::new(addr.to_string());

    match provider.assign_ip(assign_request(BANNED_IP)).await {
        Err(Error::AssignIp {
            request,
            reply: Some(reply),
            cause: CallFailure::Rejected,
        }) => {
            assert_eq!(request.ip_address, BANNED_IP);
            assert!(!reply.success);
            assert!(reply.msg.contains("subnet"));
        }
        other => panic!("unexpected result {:?}", other),
    }

    server.abort();
}

#[tokio::test]
async fn status_error_has_no_reply() {
    let service = Arc::new(ServiceImpl::default());
    let (addr, server) = start_server(service).await;
    let provider = GrpcCloudProvider::new(addr.to_string());

    match provider.un_assign_ip(un_assign_request(BROKEN_IP)).await {
        Err(e @ Error::UnAssignIp { .. }) => {
            assert!(!e.is_fatal());
            assert!(e.to_string().contains(BROKEN_IP));
            match e {
                Error::UnAssignIp {
                    reply: None,
                    cause: CallFailure::Status(status),
                    ..
                } => assert_eq!(status.code(), Code::NotFound),
                other => panic!("unexpected error {:?}", other),
            }
        }
        other => panic!("unexpected result {:?}", other),
    }

    server.abort();
}

#[tokio::test]
async fn slow_call_times_out() {
    let service = Arc::new(ServiceImpl::default());
    let (addr, server) = start_server(service).await;
    let provider =
        GrpcCloudProvider::new(addr.to_string()).with_timeout(Duration::from_millis(200));

    match provider.assign_ip(assign_request(SLOW_IP)).await {
        Err(Error::AssignIp {
            reply: None,
            cause: CallFailure::Timeout(timeout),
            ..
        }) => assert_eq!(timeout, Duration::from_millis(200)),
        other => panic!("unexpected result {:?}", other),
    }
    // the connection survives an abandoned call
    assert!(provider
        .assign_ip(assign_request("10.0.0.11"))
        .await
        .unwrap()
        .success);

    server.abort();
}

#[tokio::test]
async fn concurrent_callers_share_one_provider() {
    let service = Arc::new(ServiceImpl::default());
    let (addr, server) = start_server(service.clone()).await;
    let provider: Arc<dyn CloudProvider> = Arc::new(GrpcCloudProvider::new(addr.to_string()));

    let mut handles = vec![];
    for i in 0..16 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move {
            provider
                .assign_ip(assign_request(&format!("10.0.1.{}", i)))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().success);
    }
    assert_eq!(service.calls.load(Ordering::SeqCst), 16);
    assert_eq!(service.assigned.lock().await.len(), 16);

    server.abort();
}

#[tokio::test]
async fn unreachable_cloud_provider_is_fatal() {
    // bind then drop to get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let provider = GrpcCloudProvider::new(addr.to_string());

    let first = provider.assign_ip(assign_request("10.0.0.12")).await;
    assert!(matches!(first, Err(ref e) if e.is_fatal()));

    // not retried, even once the server shows up
    let listener = TcpListener::bind(addr).await.unwrap();
    let server = tokio::spawn(async move {
        TonicServer::builder()
            .add_service(IpProviderServiceServer::new(ServiceImpl::default()))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    let second = provider.un_assign_ip(un_assign_request("10.0.0.12")).await;
    assert!(matches!(second, Err(Error::CloudProviderUnreachable { .. })));

    server.abort();
}
