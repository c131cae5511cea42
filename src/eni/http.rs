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

use std::time::Duration;

use async_trait::async_trait;
use hyper::{client::HttpConnector, Client, Uri};
use log::debug;
use tokio::time;

use super::{Error, MetadataClient, Result};
use public::consts::{DEFAULT_METADATA_ENDPOINT, METADATA_TIMEOUT};

const MACS_PATH: &str = "network/interfaces/macs";

/// Metadata client backed by the instance metadata http service.
pub struct HttpMetadataClient {
    endpoint: String,
    timeout: Duration,
    client: Client<HttpConnector>,
}

impl Default for HttpMetadataClient {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_ENDPOINT, METADATA_TIMEOUT)
    }
}

impl HttpMetadataClient {
    pub fn new<S: AsRef<str>>(endpoint: S, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.as_ref().trim_end_matches('/').to_owned(),
            timeout,
            client: Client::new(),
        }
    }

    async fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}/{}", self.endpoint, path);
        let uri = url
            .parse::<Uri>()
            .map_err(|_| Error::InvalidEndpoint(url.clone()))?;
        debug!("get metadata {}", url);

        let body = time::timeout(self.timeout, self.fetch(uri, path))
            .await
            .map_err(|_| Error::Timeout(path.to_owned(), self.timeout))??;
        Ok(body.trim().to_owned())
    }

    async fn fetch(&self, uri: Uri, path: &str) -> Result<String> {
        let resp = self
            .client
            .get(uri)
            .await
            .map_err(|e| Error::Request(path.to_owned(), e.to_string()))?;
        let status = resp.status();
        let body = hyper::body::to_bytes(resp.into_body())
            .await
            .map_err(|e| Error::Request(path.to_owned(), e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Status {
                path: path.to_owned(),
                status: status.as_u16(),
            });
        }
        String::from_utf8(body.to_vec()).map_err(|_| Error::InvalidBody(path.to_owned()))
    }

    // directory listings are one entry per line, sub directories end with '/'
    async fn get_list(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .get(path)
            .await?
            .lines()
            .map(|l| l.trim().trim_end_matches('/'))
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect())
    }
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn eni_macs(&self) -> Result<Vec<String>> {
        self.get_list(&format!("{}/", MACS_PATH)).await
    }

    async fn mac(&self) -> Result<String> {
        self.get("mac").await
    }

    async fn eni_primary_ipv4(&self, mac: &str) -> Result<String> {
        self.get(&format!("{}/{}/primary-local-ipv4", MACS_PATH, mac))
            .await
    }

    async fn eni_ipv4_subnet_mask(&self, mac: &str, primary_ip: &str) -> Result<String> {
        self.get(&format!(
            "{}/{}/local-ipv4s/{}/subnet-mask",
            MACS_PATH, mac, primary_ip
        ))
        .await
    }

    async fn eni_ipv4_gateway(&self, mac: &str, primary_ip: &str) -> Result<String> {
        self.get(&format!(
            "{}/{}/local-ipv4s/{}/gateway",
            MACS_PATH, mac, primary_ip
        ))
        .await
    }

    async fn eni_ipv4_list(&self, mac: &str) -> Result<Vec<String>> {
        self.get_list(&format!("{}/{}/local-ipv4s/", MACS_PATH, mac))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    use super::*;
    use crate::eni::get_eni_meta_map;

    const PREFIX: &str = "/latest/meta-data";

    fn start_server(routes: &[(&str, &str)]) -> SocketAddr {
        let routes = Arc::new(
            routes
                .iter()
                .map(|(path, body)| (format!("{}/{}", PREFIX, path), body.to_string()))
                .collect::<HashMap<_, _>>(),
        );
        let make_svc = make_service_fn(move |_| {
            let routes = routes.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let routes = routes.clone();
                    async move {
                        let resp = match routes.get(req.uri().path()) {
                            Some(body) => Response::new(Body::from(body.clone())),
                            None => {
                                let mut resp = Response::new(Body::from("not found"));
                                *resp.status_mut() = StatusCode::NOT_FOUND;
                                resp
                            }
                        };
                        Ok::<_, Infallible>(resp)
                    }
                }))
            }
        });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    fn client(addr: SocketAddr) -> HttpMetadataClient {
        HttpMetadataClient::new(
            format!("http://{}{}/", addr, PREFIX),
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn read_metadata() {
        let addr = start_server(&[
            ("mac", "52:54:00:AA:BB:CC\n"),
            (
                "network/interfaces/macs/",
                "52:54:00:AA:BB:CC/\n52:54:00:DD:EE:FF/\n",
            ),
            (
                "network/interfaces/macs/52:54:00:AA:BB:CC/primary-local-ipv4",
                "10.0.0.2",
            ),
            (
                "network/interfaces/macs/52:54:00:AA:BB:CC/local-ipv4s/10.0.0.2/subnet-mask",
                "255.255.255.0",
            ),
            (
                "network/interfaces/macs/52:54:00:AA:BB:CC/local-ipv4s/10.0.0.2/gateway",
                "10.0.0.1",
            ),
            (
                "network/interfaces/macs/52:54:00:AA:BB:CC/local-ipv4s/",
                "10.0.0.2/\n10.0.0.9/\n",
            ),
        ]);
        let cli = client(addr);

        assert_eq!(cli.mac().await.unwrap(), "52:54:00:AA:BB:CC");
        assert_eq!(
            cli.eni_macs().await.unwrap(),
            vec!["52:54:00:AA:BB:CC", "52:54:00:DD:EE:FF"]
        );
        assert_eq!(
            cli.eni_primary_ipv4("52:54:00:AA:BB:CC").await.unwrap(),
            "10.0.0.2"
        );
        assert_eq!(
            cli.eni_ipv4_subnet_mask("52:54:00:AA:BB:CC", "10.0.0.2")
                .await
                .unwrap(),
            "255.255.255.0"
        );
        assert_eq!(
            cli.eni_ipv4_gateway("52:54:00:AA:BB:CC", "10.0.0.2")
                .await
                .unwrap(),
            "10.0.0.1"
        );
        assert_eq!(
            cli.eni_ipv4_list("52:54:00:AA:BB:CC").await.unwrap(),
            vec!["10.0.0.2", "10.0.0.9"]
        );

        assert!(matches!(
            cli.eni_primary_ipv4("52:54:00:DD:EE:FF").await,
            Err(Error::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn discover_over_http() {
        let addr = start_server(&[
            ("mac", "52:54:00:aa:bb:cc"),
            ("network/interfaces/macs/", "52:54:00:AA:BB:CC/\n"),
            (
                "network/interfaces/macs/52:54:00:AA:BB:CC/primary-local-ipv4",
                "10.0.0.2",
            ),
            (
                "network/interfaces/macs/52:54:00:AA:BB:CC/local-ipv4s/10.0.0.2/subnet-mask",
                "255.255.255.0",
            ),
            (
                "network/interfaces/macs/52:54:00:AA:BB:CC/local-ipv4s/10.0.0.2/gateway",
                "10.0.0.1",
            ),
            (
                "network/interfaces/macs/52:54:00:AA:BB:CC/local-ipv4s/",
                "10.0.0.2/\n",
            ),
        ]);
        let map = get_eni_meta_map(&client(addr)).await.unwrap();
        let eni = &map["52:54:00:aa:bb:cc"];
        assert!(eni.primary);
        assert_eq!(eni.gateway, "10.0.0.1");
        assert_eq!(eni.secondary_ips, vec!["10.0.0.2"]);
    }

    #[tokio::test]
    async fn missing_gateway_fails_discovery() {
        let addr = start_server(&[
            ("mac", "52:54:00:aa:bb:cc"),
            ("network/interfaces/macs/", "52:54:00:aa:bb:cc/\n"),
            (
                "network/interfaces/macs/52:54:00:aa:bb:cc/primary-local-ipv4",
                "10.0.0.2",
            ),
            (
                "network/interfaces/macs/52:54:00:aa:bb:cc/local-ipv4s/10.0.0.2/subnet-mask",
                "255.255.255.0",
            ),
        ]);
        let e = get_eni_meta_map(&client(addr)).await.unwrap_err();
        assert!(
            matches!(e, Error::Status { ref path, status: 404 } if path.ends_with("10.0.0.2/gateway"))
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint() {
        let cli = HttpMetadataClient::new("http://127.0.0.1:1/latest/meta-data", Duration::from_secs(2));
        assert!(matches!(cli.mac().await, Err(Error::Request(ref path, _)) if path == "mac"));
    }
}
