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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid metadata url {0}")]
    InvalidEndpoint(String),
    #[error("metadata request {0} failed: {1}")]
    Request(String, String),
    #[error("metadata request {path} returned status {status}")]
    Status { path: String, status: u16 },
    #[error("metadata request {0} timed out after {1:?}")]
    Timeout(String, Duration),
    #[error("metadata response of {0} is not utf-8")]
    InvalidBody(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
