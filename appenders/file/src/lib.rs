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

//! A size-bounded rolling file sink.
//!
//! Lines are appended to one active file. When the next write would make the file reach its size
//! threshold, the file is renamed to `<path>.<YYYYMMDD-HHMMSS>[.<n>]`, a fresh file takes its place,
//! the rotated file is optionally gzipped in the background, and all but the newest rotated files
//! are deleted.
//!
//! # Example
//!
//!```
//! use std::num::NonZeroUsize;
//!
//! use zaplog_append_file::LogSink;
//! use zaplog_core::record::Level;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let sink = LogSink::builder(dir.path().join("app.log"))
//!     .tag("api")
//!     .level(Level::Debug)
//!     .max_file_size(NonZeroUsize::new(64 * 1024 * 1024).unwrap())
//!     .max_log_files(NonZeroUsize::new(10).unwrap())
//!     .compress(true)
//!     .build()
//!     .unwrap();
//!
//! sink.debug(format_args!("connected to {}", "db-1"));
//! sink.close().unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use self::append::LogSink;
pub use self::append::LogSinkBuilder;
pub use self::config::SinkConfig;
pub use self::rolling::DEFAULT_MAX_FILE_SIZE;
pub use self::rolling::DEFAULT_MAX_LOG_FILES;
pub use self::rolling::RollingFileWriter;
pub use self::rolling::RollingFileWriterBuilder;

mod append;
mod clock;
mod compress;
mod config;
mod retention;
mod rolling;
