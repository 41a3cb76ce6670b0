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

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::Deserialize;
use zaplog_core::Error;
use zaplog_core::Trap;
use zaplog_core::record::Level;

use crate::append::LogSink;
use crate::append::LogSinkBuilder;
use crate::rolling::DEFAULT_MAX_FILE_SIZE;
use crate::rolling::DEFAULT_MAX_LOG_FILES;

const MEGABYTE: usize = 1024 * 1024;

/// Loosely typed sink settings, as read from a configuration file.
///
/// Non-positive sizes and counts fall back to their defaults and an unrecognized level falls back
/// to `INFO`; only a missing or empty `filename` is rejected.
///
/// # Examples
///
/// ```
/// use zaplog_append_file::SinkConfig;
///
/// let config: SinkConfig = serde_json::from_str(
///     r#"{ "filename": "logs/app.log", "maxSizeMB": 50, "level": "warn", "tag": "billing" }"#,
/// )
/// .unwrap();
/// assert_eq!(config.max_file_size().get(), 50 * 1024 * 1024);
/// assert_eq!(config.max_log_files().get(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkConfig {
    /// Path of the active log file.
    pub filename: PathBuf,
    /// Size threshold of the active file in megabytes.
    #[serde(rename = "maxSizeMB", default)]
    pub max_size_mb: i64,
    /// Number of rotated files to keep.
    #[serde(default)]
    pub max_files: i64,
    /// Minimum level written, case-insensitive.
    #[serde(default)]
    pub level: String,
    /// Whether rotated files are gzipped.
    #[serde(default)]
    pub compress: bool,
    /// Tag embedded in every line.
    #[serde(default)]
    pub tag: String,
}

impl SinkConfig {
    /// A config writing to `filename` with every other setting at its default.
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// The normalized size threshold in bytes.
    pub fn max_file_size(&self) -> NonZeroUsize {
        usize::try_from(self.max_size_mb)
            .ok()
            .and_then(|mb| NonZeroUsize::new(mb.saturating_mul(MEGABYTE)))
            .unwrap_or(DEFAULT_MAX_FILE_SIZE)
    }

    /// The normalized retention count.
    pub fn max_log_files(&self) -> NonZeroUsize {
        usize::try_from(self.max_files)
            .ok()
            .and_then(NonZeroUsize::new)
            .unwrap_or(DEFAULT_MAX_LOG_FILES)
    }

    /// The normalized minimum level.
    pub fn level(&self) -> Level {
        Level::parse_or_default(&self.level)
    }

    /// A [`LogSinkBuilder`] carrying the normalized settings.
    pub fn builder(&self) -> LogSinkBuilder {
        LogSink::builder(&self.filename)
            .max_file_size(self.max_file_size())
            .max_log_files(self.max_log_files())
            .level(self.level())
            .compress(self.compress)
            .tag(&self.tag)
    }

    /// Build a [`LogSink`] that reports background failures to stderr.
    ///
    /// # Errors
    ///
    /// Return an error if the filename is empty, the log directory cannot be created, or the
    /// active file cannot be opened.
    pub fn build(&self) -> Result<LogSink, Error> {
        self.builder().build()
    }

    /// Build a [`LogSink`] that reports background failures to `trap`.
    ///
    /// # Errors
    ///
    /// See [`SinkConfig::build`].
    pub fn build_with_trap(&self, trap: impl Into<Box<dyn Trap>>) -> Result<LogSink, Error> {
        self.builder().trap(trap).build()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use zaplog_core::ErrorKind;
    use zaplog_core::trap::DefaultTrap;

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: SinkConfig = serde_json::from_str(
            r#"{
                "filename": "/var/log/billing/app.log",
                "maxSizeMB": 1,
                "maxFiles": 3,
                "level": "Error",
                "compress": true,
                "tag": "billing"
            }"#,
        )
        .unwrap();

        assert_eq!(config.filename, PathBuf::from("/var/log/billing/app.log"));
        assert_eq!(config.max_file_size().get(), 1024 * 1024);
        assert_eq!(config.max_log_files().get(), 3);
        assert_eq!(config.level(), Level::Error);
        assert!(config.compress);
        assert_eq!(config.tag, "billing");
    }

    #[test]
    fn test_defaults_for_missing_and_non_positive_values() {
        let config: SinkConfig = serde_json::from_str(r#"{ "filename": "app.log" }"#).unwrap();
        assert_eq!(config.max_file_size(), DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.max_log_files(), DEFAULT_MAX_LOG_FILES);
        assert_eq!(config.level(), Level::Info);
        assert!(!config.compress);
        assert_eq!(config.tag, "");

        let config: SinkConfig = serde_json::from_str(
            r#"{ "filename": "app.log", "maxSizeMB": -4, "maxFiles": 0, "level": "verbose" }"#,
        )
        .unwrap();
        assert_eq!(config.max_file_size(), DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.max_log_files(), DEFAULT_MAX_LOG_FILES);
        assert_eq!(config.level(), Level::Info);
    }

    #[test]
    fn test_filename_is_required() {
        let err = serde_json::from_str::<SinkConfig>(r#"{ "maxSizeMB": 5 }"#).unwrap_err();
        assert!(err.to_string().contains("filename"));
    }

    #[test]
    fn test_empty_filename_is_rejected_on_build() {
        let err = SinkConfig::new("").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_build_applies_settings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("app.log");
        let config = SinkConfig {
            level: "warn".to_string(),
            tag: "billing".to_string(),
            ..SinkConfig::new(&path)
        };

        let sink = config.build_with_trap(DefaultTrap::default()).unwrap();
        sink.info(format_args!("filtered"));
        sink.warn(format_args!("kept"));
        sink.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with("] [WARN] [billing] kept\n"));
    }
}
