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

pub const DEFAULT_CONF_FILE: &'static str = "/etc/eni-ipam.yaml";
pub const DEFAULT_LOG_FILE: &'static str = "/var/log/eni-ipam/eni-ipam.log";
pub const DEFAULT_LOG_RETENTION: u32 = 30;

pub const DEFAULT_CLOUD_PROVIDER_ADDR: &'static str = "127.0.0.1:9020";

// per call deadline of AssignIP/UnAssignIP
pub const GRPC_CALL_TIMEOUT: Duration = Duration::from_secs(60);
pub const GRPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
// send pings every 2 minutes if there is no activity
pub const GRPC_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(120);
// wait 1 minute for ping ack before considering the connection dead
pub const GRPC_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_METADATA_ENDPOINT: &'static str =
    "http://metadata.tencentyun.com/latest/meta-data";
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

// kernel name prefix of eni devices, eth0 is the primary eni
pub const DEV_PREFIX: &'static str = "eth";

// exit code when the cloud provider cannot be dialed, restarting will not help
pub const CLOUD_PROVIDER_UNREACHABLE_EXIT: i32 = 2;
