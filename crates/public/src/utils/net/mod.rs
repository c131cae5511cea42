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

use std::error::Error as StdError;
#[cfg(unix)]
use std::io;

#[cfg(unix)]
use nix::errno::Errno;

use crate::consts::DEV_PREFIX;

mod error;
pub use error::{Error, Result};

/// Returns the eni index of a kernel interface, e.g. `eth3` -> 3.
pub fn get_eni_index<S: AsRef<str>>(if_name: S) -> Result<u32> {
    get_eni_index_with_prefix(if_name, DEV_PREFIX)
}

pub fn get_eni_index_with_prefix<S: AsRef<str>>(if_name: S, prefix: &str) -> Result<u32> {
    let if_name = if_name.as_ref();
    let num = if_name.strip_prefix(prefix).unwrap_or(if_name);
    num.parse::<u32>().map_err(|e| Error::ParseEniIndex(if_name.to_owned(), e))
}

// Finds the os error code carried by `err` or anything in its source chain.
#[cfg(unix)]
fn errno_of(err: &(dyn StdError + 'static)) -> Option<Errno> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(errno) = e.downcast_ref::<Errno>() {
            return Some(*errno);
        }
        if let Some(code) = e.downcast_ref::<io::Error>().and_then(|e| e.raw_os_error()) {
            return Some(Errno::from_i32(code));
        }
        if let Some(Error::Errno(errno)) = e.downcast_ref::<Error>() {
            return Some(*errno);
        }
        current = e.source();
    }
    None
}

/// Returns true if the error is ESRCH, which is what the kernel answers when
/// deleting a route or rule that is no longer in the routing table.
#[cfg(unix)]
pub fn is_not_exists_error(err: &(dyn StdError + 'static)) -> bool {
    errno_of(err) == Some(Errno::ESRCH)
}

/// Returns true if the error is EEXIST, which is what the kernel answers when
/// adding a route or rule that is already in the routing table.
#[cfg(unix)]
pub fn is_already_exists_error(err: &(dyn StdError + 'static)) -> bool {
    errno_of(err) == Some(Errno::EEXIST)
}

/// Treats an already deleted route or rule as a successful deletion.
#[cfg(unix)]
pub fn ignore_not_exists<E: StdError + 'static>(result: Result<(), E>) -> Result<(), E> {
    match result {
        Err(e) if is_not_exists_error(&e) => Ok(()),
        r => r,
    }
}

/// Treats an already present route or rule as a successful addition.
#[cfg(unix)]
pub fn ignore_already_exists<E: StdError + 'static>(result: Result<(), E>) -> Result<(), E> {
    match result {
        Err(e) if is_already_exists_error(&e) => Ok(()),
        r => r,
    }
}
