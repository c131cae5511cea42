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
use std::path::Path;

use flexi_logger::{
    colored_opt_format, Age, Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, Logger,
    LoggerHandle, Naming,
};

use public::consts::DEFAULT_LOG_RETENTION;

/// Starts logging to `log_file`, rotated daily. Falls back to stderr when the
/// log directory is not writable. The level is taken from RUST_LOG, info by default.
pub fn init_logger<P: AsRef<Path>>(log_file: P) -> Result<LoggerHandle, FlexiLoggerError> {
    let log_file = log_file.as_ref();
    let logger = Logger::try_with_env_or_str("info")?.format(colored_opt_format);
    // check log folder permission
    let write_to_file = match log_file.parent() {
        Some(base_path) if base_path.exists() => base_path
            .metadata()
            .ok()
            .map(|meta| !meta.permissions().readonly())
            .unwrap_or(false),
        Some(base_path) => fs::create_dir_all(base_path).is_ok(),
        None => false,
    };
    let logger = if write_to_file {
        logger
            .log_to_file(FileSpec::try_from(log_file)?)
            .rotate(
                Criterion::Age(Age::Day),
                Naming::Timestamps,
                Cleanup::KeepLogFiles(DEFAULT_LOG_RETENTION as usize),
            )
            .create_symlink(log_file)
            .append()
            .duplicate_to_stderr(Duplicate::Warn)
    } else {
        eprintln!(
            "Log file path '{}' access denied, logs will not be written to file",
            log_file.display()
        );
        logger.log_to_stderr()
    };
    logger.start()
}
