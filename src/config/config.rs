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

use std::fs;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cloudprovider::GrpcDialer;
use public::consts::{
    DEFAULT_CLOUD_PROVIDER_ADDR, DEFAULT_LOG_FILE, DEFAULT_METADATA_ENDPOINT, DEV_PREFIX,
    GRPC_CALL_TIMEOUT, GRPC_CONNECT_TIMEOUT, GRPC_KEEPALIVE_INTERVAL, GRPC_KEEPALIVE_TIMEOUT,
    METADATA_TIMEOUT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cloud-provider-addr is empty")]
    CloudProviderAddrEmpty,
    #[error("cloud-provider-addr {0} invalid, expected host:port")]
    CloudProviderAddrInvalid(String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("yaml config invalid: {0}")]
    YamlConfigInvalid(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub cloud_provider_addr: String,
    #[serde(with = "humantime_serde")]
    pub rpc_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub keepalive_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub keepalive_timeout: Duration,
    pub metadata_endpoint: String,
    #[serde(with = "humantime_serde")]
    pub metadata_timeout: Duration,
    pub device_prefix: String,
    pub log_file: String,
}

impl Config {
    pub fn load_from_file<T: AsRef<Path>>(path: T) -> Result<Self, ConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::YamlConfigInvalid(e.to_string()))?;
        Self::load(&contents)
    }

    pub fn load<C: AsRef<str>>(contents: C) -> Result<Self, ConfigError> {
        let contents = contents.as_ref();
        let cfg = if contents.trim().is_empty() {
            // parsing empty string leads to EOF error
            Self::default()
        } else {
            serde_yaml::from_str(contents)
                .map_err(|e| ConfigError::YamlConfigInvalid(e.to_string()))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cloud_provider_addr.is_empty() {
            return Err(ConfigError::CloudProviderAddrEmpty);
        }
        // only the shape is checked here, resolving happens when dialing
        match self.cloud_provider_addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => (),
            _ => {
                return Err(ConfigError::CloudProviderAddrInvalid(
                    self.cloud_provider_addr.clone(),
                ))
            }
        }
        for (name, d) in [
            ("rpc-timeout", self.rpc_timeout),
            ("connect-timeout", self.connect_timeout),
            ("keepalive-interval", self.keepalive_interval),
            ("keepalive-timeout", self.keepalive_timeout),
            ("metadata-timeout", self.metadata_timeout),
        ] {
            if d.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        Ok(())
    }

    pub fn grpc_dialer(&self) -> GrpcDialer {
        GrpcDialer {
            connect_timeout: self.connect_timeout,
            keepalive_interval: self.keepalive_interval,
            keepalive_timeout: self.keepalive_timeout,
            ..Default::default()
        }
    }

    // best effort, used for logging only
    pub fn resolved_cloud_provider_addr(&self) -> Option<String> {
        self.cloud_provider_addr
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .map(|addr| addr.to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloud_provider_addr: DEFAULT_CLOUD_PROVIDER_ADDR.to_owned(),
            rpc_timeout: GRPC_CALL_TIMEOUT,
            connect_timeout: GRPC_CONNECT_TIMEOUT,
            keepalive_interval: GRPC_KEEPALIVE_INTERVAL,
            keepalive_timeout: GRPC_KEEPALIVE_TIMEOUT,
            metadata_endpoint: DEFAULT_METADATA_ENDPOINT.to_owned(),
            metadata_timeout: METADATA_TIMEOUT,
            device_prefix: DEV_PREFIX.to_owned(),
            log_file: DEFAULT_LOG_FILE.to_owned(),
        }
    }
}
