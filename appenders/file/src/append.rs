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

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use zaplog_core::Error;
use zaplog_core::Layout;
use zaplog_core::Trap;
use zaplog_core::append::Append;
use zaplog_core::layout::TaggedTextLayout;
use zaplog_core::record::Level;
use zaplog_core::record::LevelFilter;
use zaplog_core::record::Record;
use zaplog_core::trap::DefaultTrap;

use crate::rolling::RollingFileWriter;
use crate::rolling::RollingFileWriterBuilder;

/// A builder to configure and create a [`LogSink`].
#[derive(Debug)]
pub struct LogSinkBuilder {
    builder: RollingFileWriterBuilder,
    layout: Box<dyn Layout>,
    filter: LevelFilter,
    trap: Arc<dyn Trap>,
}

impl LogSinkBuilder {
    /// Create a new log sink builder writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            builder: RollingFileWriterBuilder::new(path),
            layout: Box::new(TaggedTextLayout::default()),
            filter: LevelFilter::default(),
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Build the [`LogSink`].
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The configured filename is empty or names no file.
    /// * The log directory cannot be created.
    /// * The active file cannot be opened.
    pub fn build(self) -> Result<LogSink, Error> {
        let LogSinkBuilder {
            builder,
            layout,
            filter,
            trap,
        } = self;
        let writer = builder.trap(trap.clone()).build()?;
        Ok(LogSink::new(writer, layout, filter, trap))
    }

    /// Set the tag embedded in every formatted line.
    ///
    /// This replaces the layout with a [`TaggedTextLayout`] carrying `tag`.
    ///
    /// # Examples
    ///
    /// ```
    /// use zaplog_append_file::LogSinkBuilder;
    ///
    /// let builder = LogSinkBuilder::new("logs/app.log").tag("billing");
    /// ```
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.layout = Box::new(TaggedTextLayout::new(tag));
        self
    }

    /// Set the layout for the logs.
    ///
    /// Default to [`TaggedTextLayout`] with an empty tag.
    #[must_use]
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Set the level filter applied before any formatting or I/O.
    ///
    /// Default to `LevelFilter::MoreSevereEqual(Level::Info)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use zaplog_append_file::LogSinkBuilder;
    /// use zaplog_core::record::Level;
    ///
    /// let builder = LogSinkBuilder::new("logs/app.log").level(Level::Warn);
    /// ```
    #[must_use]
    pub fn level(mut self, filter: impl Into<LevelFilter>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the trap for errors that cannot be returned to the caller.
    ///
    /// Default to [`DefaultTrap`].
    ///
    /// # Examples
    ///
    /// ```
    /// use zaplog_append_file::LogSinkBuilder;
    /// use zaplog_core::trap::DefaultTrap;
    ///
    /// let builder = LogSinkBuilder::new("logs/app.log").trap(DefaultTrap::default());
    /// ```
    #[must_use]
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        let trap: Box<dyn Trap> = trap.into();
        self.trap = Arc::from(trap);
        self
    }

    /// Roll the active file over once the next write would make it reach `n` bytes.
    ///
    /// Default to 10 MiB.
    #[must_use]
    pub fn max_file_size(mut self, n: NonZeroUsize) -> Self {
        self.builder = self.builder.max_file_size(n);
        self
    }

    /// Set the maximum number of rotated files to keep.
    ///
    /// Default to 5.
    #[must_use]
    pub fn max_log_files(mut self, n: NonZeroUsize) -> Self {
        self.builder = self.builder.max_log_files(n);
        self
    }

    /// Gzip rotated files in the background.
    ///
    /// Default to `false`.
    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.builder = self.builder.compress(compress);
        self
    }
}

/// A log sink that appends lines to one file, rolls it over by size, and prunes old rotations.
///
/// All writes, including any rotation they trigger, are serialized by one lock, so concurrent
/// callers never interleave partial lines.
///
/// `&LogSink` also implements [`std::io::Write`]; every `write` call lands whole in one file.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use zaplog_append_file::LogSink;
/// use zaplog_core::record::Level;
///
/// let dir = tempfile::tempdir().unwrap();
/// let sink = LogSink::builder(dir.path().join("app.log"))
///     .tag("billing")
///     .level(Level::Debug)
///     .max_file_size(NonZeroUsize::new(1024 * 1024).unwrap())
///     .build()
///     .unwrap();
///
/// sink.info(format_args!("invoice batch {} started", 42));
/// sink.close().unwrap();
/// ```
#[derive(Debug)]
pub struct LogSink {
    writer: Mutex<RollingFileWriter>,
    layout: Box<dyn Layout>,
    filter: LevelFilter,
    trap: Arc<dyn Trap>,
}

impl LogSink {
    fn new(
        writer: RollingFileWriter,
        layout: Box<dyn Layout>,
        filter: LevelFilter,
        trap: Arc<dyn Trap>,
    ) -> Self {
        let writer = Mutex::new(writer);
        Self {
            writer,
            layout,
            filter,
            trap,
        }
    }

    /// Create a [`LogSinkBuilder`] writing to `path`.
    pub fn builder(path: impl Into<PathBuf>) -> LogSinkBuilder {
        LogSinkBuilder::new(path)
    }

    fn writer(&self) -> MutexGuard<'_, RollingFileWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append raw bytes to the active file, rolling it over first if it would reach the size
    /// threshold. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Return an error if the rotation or the append fails, or if the sink is closed or was left
    /// without an active file by an earlier failed rotation.
    pub fn write(&self, bytes: &[u8]) -> Result<usize, Error> {
        self.writer().write_bytes(bytes)
    }

    /// Format a line at `level` and append it.
    ///
    /// Does nothing if `level` does not pass the sink's filter. Failures are reported to the trap
    /// and never returned, so logging cannot abort the caller.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.filter.test(level) {
            return;
        }

        let payload = match args.as_str() {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(args.to_string()),
        };
        let record = Record::builder().level(level).payload(payload).build();
        if let Err(err) = self.append(&record) {
            self.trap.trap(&err);
        }
    }

    /// Log at [`Level::Debug`].
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args)
    }

    /// Log at [`Level::Info`].
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    /// Log at [`Level::Warn`].
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    /// Log at [`Level::Error`].
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args)
    }

    /// Log at [`Level::Fatal`]. The process is not terminated.
    pub fn fatal(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Fatal, args)
    }

    /// Sync and release the active file.
    ///
    /// Later writes fail with [`ErrorKind::Closed`](zaplog_core::ErrorKind::Closed); closing again
    /// is a no-op.
    pub fn close(&self) -> Result<(), Error> {
        self.writer().close()
    }

    /// The level filter of this sink.
    pub fn level_filter(&self) -> LevelFilter {
        self.filter
    }
}

impl Write for &LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        LogSink::write(*self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer().flush().map_err(io::Error::other)
    }
}

impl Append for LogSink {
    fn enabled(&self, level: Level) -> bool {
        self.filter.test(level)
    }

    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        self.write(&bytes)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        self.writer().flush()
    }
}
