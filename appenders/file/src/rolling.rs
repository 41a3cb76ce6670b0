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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::mem;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use jiff::Zoned;
use zaplog_core::Error;
use zaplog_core::ErrorKind;
use zaplog_core::Trap;
use zaplog_core::trap::DefaultTrap;

use crate::clock::Clock;
use crate::compress::InFlight;
use crate::compress::compressed_path;
use crate::compress::spawn_compression;
use crate::retention::Retention;
use crate::retention::log_dir_of;

/// Default size threshold of the active log file: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: NonZeroUsize = NonZeroUsize::new(10 * 1024 * 1024).unwrap();

/// Default number of rotated files to keep.
pub const DEFAULT_MAX_LOG_FILES: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// A writer that appends to a single file and rolls it over by size.
#[derive(Debug)]
pub struct RollingFileWriter {
    state: State,
    active: Active,
}

#[derive(Debug)]
enum Active {
    Open(File),
    // released by `close`
    Closed,
    // lost in a failed rotation; never reopened
    Lost,
}

impl Drop for RollingFileWriter {
    fn drop(&mut self) {
        if let Active::Open(file) = &mut self.active {
            if let Err(err) = file.flush() {
                let err = Error::new(ErrorKind::Io, "failed to flush file writer on dropped")
                    .with_context("path", self.state.path.display())
                    .with_source(err);
                self.state.trap.trap(&err);
            }
        }
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        RollingFileWriter::flush(self).map_err(io::Error::other)
    }
}

impl RollingFileWriter {
    /// Append all of `buf` to the active file, rolling over first if it would reach the size
    /// threshold.
    ///
    /// The size counter grows by exactly the bytes the file accepted, even when an error cuts the
    /// write short.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.ensure_active()?;

        if self.state.should_rollover(buf.len()) {
            self.rotate()?;
        }

        let file = match &mut self.active {
            Active::Open(file) => file,
            Active::Closed | Active::Lost => return Err(self.state.unavailable(&self.active)),
        };

        let mut written = 0;
        while written < buf.len() {
            match file.write(&buf[written..]) {
                Ok(0) => {
                    let err = io::Error::from(io::ErrorKind::WriteZero);
                    return Err(self.state.append_error(written, err));
                }
                Ok(n) => {
                    written += n;
                    self.state.current_filesize += n;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(self.state.append_error(written, err)),
            }
        }

        Ok(written)
    }

    /// Flush the active file, if any.
    pub fn flush(&mut self) -> Result<(), Error> {
        match &mut self.active {
            Active::Open(file) => file.flush().map_err(Error::from_io_error),
            Active::Closed | Active::Lost => Ok(()),
        }
    }

    /// Sync and release the active file. Writes afterwards fail; closing again is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        match mem::replace(&mut self.active, Active::Closed) {
            Active::Open(file) => file.sync_all().map_err(|err| {
                Error::new(ErrorKind::Io, "failed to close active log")
                    .with_context("path", self.state.path.display())
                    .with_source(err)
            }),
            Active::Closed | Active::Lost => Ok(()),
        }
    }

    /// Bytes appended to the active file since it was created or last rotated.
    pub fn current_size(&self) -> usize {
        self.state.current_filesize
    }

    /// The path of the active file.
    pub fn path(&self) -> &Path {
        &self.state.path
    }

    fn ensure_active(&self) -> Result<(), Error> {
        match self.active {
            Active::Open(_) => Ok(()),
            Active::Closed | Active::Lost => Err(self.state.unavailable(&self.active)),
        }
    }

    // Retire the active file. Any failure before the fresh file is open leaves the writer without
    // an active file for good.
    fn rotate(&mut self) -> Result<(), Error> {
        let file = match mem::replace(&mut self.active, Active::Lost) {
            Active::Open(file) => file,
            other => {
                self.active = other;
                return Err(self.state.unavailable(&self.active));
            }
        };

        file.sync_all().map_err(|err| {
            Error::new(ErrorKind::Io, "failed to close active log for rotation")
                .with_context("path", self.state.path.display())
                .with_source(err)
        })?;
        drop(file);

        let now = self.state.clock.now();
        let rotated = self.state.rotated_filename(&now);
        fs::rename(&self.state.path, &rotated).map_err(|err| {
            Error::new(ErrorKind::Io, "failed to rename active log for rotation")
                .with_context("from", self.state.path.display())
                .with_context("to", rotated.display())
                .with_source(err)
        })?;

        self.active = Active::Open(self.state.open_active()?);
        self.state.current_filesize = 0;

        if self.state.compress {
            spawn_compression(rotated, &self.state.in_flight, self.state.trap.clone());
        }

        if let Err(err) = self
            .state
            .retention
            .enforce(&self.state.in_flight, self.state.trap.as_ref())
        {
            self.state.trap.trap(&err);
        }

        Ok(())
    }
}

/// A builder for configuring [`RollingFileWriter`].
#[derive(Debug)]
pub struct RollingFileWriterBuilder {
    // required
    path: PathBuf,

    // has default
    max_size: NonZeroUsize,
    max_files: NonZeroUsize,
    compress: bool,
    clock: Clock,
    trap: Box<dyn Trap>,
}

impl RollingFileWriterBuilder {
    /// Creates a new [`RollingFileWriterBuilder`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_LOG_FILES,
            compress: false,
            clock: Clock::DefaultClock,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for the rolling file writer.
    #[must_use]
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Set the maximum number of rotated files to keep.
    #[must_use]
    pub fn max_log_files(mut self, n: NonZeroUsize) -> Self {
        self.max_files = n;
        self
    }

    /// Set the maximum size of the active file in bytes.
    #[must_use]
    pub fn max_file_size(mut self, n: NonZeroUsize) -> Self {
        self.max_size = n;
        self
    }

    /// Whether to gzip rotated files in the background.
    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[cfg(test)]
    pub(crate) fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the [`RollingFileWriter`].
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The configured filename is empty or has no file name component.
    /// * The log directory cannot be created.
    /// * The active file cannot be opened.
    pub fn build(self) -> Result<RollingFileWriter, Error> {
        let Self {
            path,
            max_size,
            max_files,
            compress,
            clock,
            trap,
        } = self;

        if path.as_os_str().is_empty() {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "filename must not be empty",
            ));
        }

        let (state, file) = State::new(path, max_size, max_files, compress, clock, trap)?;
        Ok(RollingFileWriter {
            state,
            active: Active::Open(file),
        })
    }
}

#[derive(Debug)]
struct State {
    path: PathBuf,
    log_dir: PathBuf,
    base_name: String,
    current_filesize: usize,
    max_size: NonZeroUsize,
    compress: bool,
    retention: Retention,
    in_flight: InFlight,
    clock: Clock,
    trap: Arc<dyn Trap>,
    // stamp and suffix of the latest rotated name
    last_rotation: Option<(String, u64)>,
}

impl State {
    fn new(
        path: PathBuf,
        max_size: NonZeroUsize,
        max_files: NonZeroUsize,
        compress: bool,
        clock: Clock,
        trap: Box<dyn Trap>,
    ) -> Result<(Self, File), Error> {
        let base_name = match path.file_name().map(|name| name.to_str()) {
            Some(Some(name)) => name.to_string(),
            Some(None) => {
                return Err(Error::new(
                    ErrorKind::ConfigInvalid,
                    "filename must be valid UTF-8",
                )
                .with_context("path", path.display()));
            }
            None => {
                return Err(Error::new(
                    ErrorKind::ConfigInvalid,
                    "filename must name a file",
                )
                .with_context("path", path.display()));
            }
        };

        let log_dir = log_dir_of(&path);
        fs::create_dir_all(&log_dir).map_err(|err| {
            Error::new(ErrorKind::Io, "failed to create log directory")
                .with_context("path", log_dir.display())
                .with_source(err)
        })?;

        let mut state = State {
            retention: Retention::new(log_dir.clone(), base_name.clone(), max_files),
            path,
            log_dir,
            base_name,
            current_filesize: 0,
            max_size,
            compress,
            in_flight: InFlight::default(),
            clock,
            trap: Arc::from(trap),
            last_rotation: None,
        };

        // continue to use the existing active file, if any
        let file = state.open_active()?;
        let metadata = file.metadata().map_err(|err| {
            Error::new(ErrorKind::Io, "failed to read active log metadata")
                .with_context("path", state.path.display())
                .with_source(err)
        })?;
        // a file too large to count still rolls over on the next write
        state.current_filesize = usize::try_from(metadata.len()).unwrap_or(usize::MAX);

        Ok((state, file))
    }

    fn open_active(&self) -> Result<File, Error> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| {
                Error::new(ErrorKind::Io, "failed to open active log")
                    .with_context("path", self.path.display())
                    .with_source(err)
            })
    }

    // `<path>.<YYYYMMDD-HHMMSS>`, with a `.<n>` suffix when that second is already taken. Within
    // one second the suffix only grows, even after retention removed earlier names.
    fn rotated_filename(&mut self, now: &Zoned) -> PathBuf {
        let stamp = now.strftime("%Y%m%d-%H%M%S").to_string();
        let mut seq = match &self.last_rotation {
            Some((last_stamp, last_seq)) if *last_stamp == stamp => last_seq + 1,
            _ => 0,
        };

        let base_name = &self.base_name;
        let name = |seq: u64| match seq {
            0 => format!("{base_name}.{stamp}"),
            seq => format!("{base_name}.{stamp}.{seq}"),
        };
        let mut candidate = self.log_dir.join(name(seq));
        while candidate.is_file() || compressed_path(&candidate).is_file() {
            seq += 1;
            candidate = self.log_dir.join(name(seq));
        }

        self.last_rotation = Some((stamp, seq));
        candidate
    }

    fn should_rollover(&self, incoming: usize) -> bool {
        self.current_filesize.saturating_add(incoming) >= self.max_size.get()
    }

    fn unavailable(&self, active: &Active) -> Error {
        let err = match active {
            Active::Closed => Error::new(ErrorKind::Closed, "log sink is closed"),
            Active::Open(_) | Active::Lost => Error::new(
                ErrorKind::NoActiveFile,
                "log sink has no active file since a rotation failed; re-create the sink",
            ),
        };
        err.with_context("path", self.path.display())
    }

    fn append_error(&self, written: usize, err: io::Error) -> Error {
        Error::new(ErrorKind::Io, "failed to append to active log")
            .with_context("path", self.path.display())
            .with_context("written", written)
            .with_source(err)
    }
}
