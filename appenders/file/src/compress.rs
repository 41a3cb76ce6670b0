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

use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;
use std::time::SystemTime;

use flate2::Compression;
use flate2::write::GzEncoder;
use zaplog_core::Error;
use zaplog_core::ErrorKind;
use zaplog_core::Trap;

/// Rotated files whose background compression has not finished yet.
///
/// Retention consults this set so that it never deletes a file under a running compressor.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlight {
    fn paths(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.paths.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn register(&self, path: &Path) -> InFlightGuard {
        self.paths().insert(path.to_path_buf());
        InFlightGuard {
            in_flight: self.clone(),
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn contains(&self, path: &Path) -> bool {
        self.paths().contains(path)
    }
}

/// Removes its path from the in-flight set on drop, whichever way the compression ended.
pub(crate) struct InFlightGuard {
    in_flight: InFlight,
    path: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.paths().remove(&self.path);
    }
}

/// The path of the compressed form of `path`.
pub(crate) fn compressed_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Compress `source` on a detached thread.
///
/// The thread is never joined. Failures are reported to `trap` and the uncompressed file is kept.
pub(crate) fn spawn_compression(source: PathBuf, in_flight: &InFlight, trap: Arc<dyn Trap>) {
    let guard = in_flight.register(&source);
    let display = source.display().to_string();
    let task_trap = trap.clone();

    let spawned = thread::Builder::new()
        .name("zaplog-compress".to_string())
        .spawn(move || {
            let _guard = guard;
            if let Err(err) = compress_file(&source) {
                task_trap.trap(&err);
            }
        });

    if let Err(err) = spawned {
        let err = Error::new(ErrorKind::Io, "failed to spawn compression thread")
            .with_context("path", display)
            .with_source(err);
        trap.trap(&err);
    }
}

/// Gzip `source` into `<source>.gz`, then remove `source`.
///
/// A partially written `.gz` is removed on failure; `source` is only removed once the compressed
/// copy is complete and synced.
pub(crate) fn compress_file(source: &Path) -> Result<PathBuf, Error> {
    let dest = compressed_path(source);

    let input = File::open(source).map_err(|err| {
        Error::new(ErrorKind::Io, "failed to open rotated log for compression")
            .with_context("path", source.display())
            .with_source(err)
    })?;
    let modified = input.metadata().and_then(|m| m.modified()).ok();

    let output = File::create(&dest).map_err(|err| {
        Error::new(ErrorKind::Io, "failed to create compressed log")
            .with_context("path", dest.display())
            .with_source(err)
    })?;

    if let Err(err) = encode(input, output, modified) {
        let _ = fs::remove_file(&dest);
        return Err(Error::new(ErrorKind::Io, "failed to compress rotated log")
            .with_context("path", source.display())
            .with_source(err));
    }

    fs::remove_file(source).map_err(|err| {
        Error::new(ErrorKind::Io, "failed to remove rotated log after compression")
            .with_context("path", source.display())
            .with_source(err)
    })?;

    Ok(dest)
}

fn encode(input: File, output: File, modified: Option<SystemTime>) -> io::Result<()> {
    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    io::copy(&mut BufReader::new(input), &mut encoder)?;
    let output = encoder
        .finish()?
        .into_inner()
        .map_err(io::IntoInnerError::into_error)?;
    output.sync_all()?;

    // keep the segment's place in retention order, which sorts by modification time
    if let Some(modified) = modified {
        let _ = output.set_modified(modified);
    }

    Ok(())
}
