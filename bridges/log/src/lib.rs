// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A bridge to forward logs from the `log` crate to a zaplog appender.
//!
//! # Example
//!
//! ```
//! use zaplog_append_file::LogSink;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let sink = LogSink::builder(dir.path().join("app.log"))
//!     .tag("api")
//!     .build()
//!     .unwrap();
//! zaplog_bridge_log::setup_log_crate(sink);
//!
//! log::info!("listening on {}", 8080);
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::borrow::Cow;

use zaplog_core::Append;
use zaplog_core::Trap;
use zaplog_core::record::Level;
use zaplog_core::record::Record;
use zaplog_core::trap::DefaultTrap;

#[derive(Debug)]
struct LogCrateLogger {
    append: Box<dyn Append>,
    trap: Box<dyn Trap>,
}

// `Trace` has no counterpart and is folded into `Debug`
fn level_of(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

impl log::Log for LogCrateLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.append.enabled(level_of(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let level = level_of(record.level());
        if !self.append.enabled(level) {
            return;
        }

        let args = record.args();
        let payload = match args.as_str() {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(args.to_string()),
        };
        let record = Record::builder().level(level).payload(payload).build();
        if let Err(err) = self.append.append(&record) {
            self.trap.trap(&err);
        }
    }

    fn flush(&self) {
        if let Err(err) = self.append.flush() {
            self.trap.trap(&err);
        }
    }
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_boxed_logger`] so that all logs from the log crate are forwarded
/// to `append`. Failures of `append` are written to stderr by [`DefaultTrap`].
///
/// This should be called early in the execution of a Rust program. Any log events that occur
/// before initialization will be ignored.
///
/// This function will set the global maximum log level to `Trace`. Filtering is left to the
/// appender; to cut the macros short, call [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// use zaplog_append_file::LogSink;
///
/// let dir = tempfile::tempdir().unwrap();
/// let sink = LogSink::builder(dir.path().join("app.log")).build().unwrap();
/// if let Err(err) = zaplog_bridge_log::try_setup_log_crate(sink) {
///     eprintln!("failed to setup log crate: {err}");
/// }
/// ```
pub fn try_setup_log_crate(append: impl Into<Box<dyn Append>>) -> Result<(), log::SetLoggerError> {
    try_setup_log_crate_with_trap(append, DefaultTrap::default())
}

/// Like [`try_setup_log_crate`], but reports failures of `append` to `trap`.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
pub fn try_setup_log_crate_with_trap(
    append: impl Into<Box<dyn Append>>,
    trap: impl Into<Box<dyn Trap>>,
) -> Result<(), log::SetLoggerError> {
    let logger = LogCrateLogger {
        append: append.into(),
        trap: trap.into(),
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Set up the log crate global logger.
///
/// See [`try_setup_log_crate`] for details.
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
pub fn setup_log_crate(append: impl Into<Box<dyn Append>>) {
    try_setup_log_crate(append).expect(
        "zaplog_bridge_log::setup_log_crate must be called before the log crate global logger initialized",
    )
}
