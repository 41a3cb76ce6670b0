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

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use zaplog_core::Error;
use zaplog_core::ErrorKind;
use zaplog_core::Trap;

use crate::compress::InFlight;

/// Keeps at most `max_files` rotated segments next to the active log.
#[derive(Debug)]
pub(crate) struct Retention {
    log_dir: PathBuf,
    base_name: String,
    max_files: NonZeroUsize,
}

/// A rotated file together with its compressed form, if any.
#[derive(Debug)]
struct Segment {
    // path of the uncompressed form, whether or not it still exists
    stem: PathBuf,
    members: Vec<PathBuf>,
    modified: SystemTime,
    stamp: String,
    seq: u64,
}

// newest is the least
fn compare_segment(a: &Segment, b: &Segment) -> Ordering {
    b.modified
        .cmp(&a.modified)
        .then_with(|| b.stamp.cmp(&a.stamp))
        .then_with(|| b.seq.cmp(&a.seq))
}

impl Retention {
    pub(crate) fn new(log_dir: PathBuf, base_name: String, max_files: NonZeroUsize) -> Self {
        Self {
            log_dir,
            base_name,
            max_files,
        }
    }

    /// Delete the oldest segments beyond the retention count, returning how many were removed.
    ///
    /// Segments still being compressed count toward the limit but are left alone. A failed delete
    /// is reported to `trap` and does not stop the others; a failed listing aborts this round.
    pub(crate) fn enforce(&self, in_flight: &InFlight, trap: &dyn Trap) -> Result<usize, Error> {
        self.enforce_with(in_flight, trap, |path| fs::remove_file(path))
    }

    fn enforce_with(
        &self,
        in_flight: &InFlight,
        trap: &dyn Trap,
        mut remove: impl FnMut(&Path) -> io::Result<()>,
    ) -> Result<usize, Error> {
        let mut segments = self.list_segments()?;
        let max_files = self.max_files.get();
        if segments.len() <= max_files {
            return Ok(0);
        }

        segments.sort_by(compare_segment);

        let mut removed = 0;
        for segment in segments.iter().skip(max_files) {
            if in_flight.contains(&segment.stem) {
                continue;
            }

            let mut complete = true;
            for path in &segment.members {
                match remove(path) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => {
                        complete = false;
                        let err = Error::new(ErrorKind::Io, "failed to remove old log")
                            .with_context("path", path.display())
                            .with_source(err);
                        trap.trap(&err);
                    }
                }
            }
            if complete {
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn list_segments(&self) -> Result<Vec<Segment>, Error> {
        let read_dir = fs::read_dir(&self.log_dir).map_err(|err| {
            Error::new(ErrorKind::Io, "failed to read log dir")
                .with_context("path", self.log_dir.display())
                .with_source(err)
        })?;

        let prefix = format!("{}.", self.base_name);
        let mut segments: BTreeMap<String, Segment> = BTreeMap::new();

        for entry in read_dir {
            let Ok(entry) = entry else { continue };
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            // the sink only creates regular files
            if !metadata.is_file() {
                continue;
            }

            let filename = entry.file_name();
            // if the filename is not a UTF-8 string, skip it.
            let Some(filename) = filename.to_str() else {
                continue;
            };
            if !filename.starts_with(&prefix) {
                continue;
            }

            let stem_name = filename.strip_suffix(".gz").unwrap_or(filename);
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let segment = segments
                .entry(stem_name.to_string())
                .or_insert_with(|| self.new_segment(stem_name, &prefix));
            segment.members.push(entry.path());
            segment.modified = segment.modified.max(modified);
        }

        Ok(segments.into_values().collect())
    }

    fn new_segment(&self, stem_name: &str, prefix: &str) -> Segment {
        let suffix = stem_name.strip_prefix(prefix).unwrap_or_default();
        let (stamp, seq) = match suffix.split_once('.') {
            Some((stamp, seq)) => (stamp, seq.parse().unwrap_or_default()),
            None => (suffix, 0),
        };

        Segment {
            stem: self.log_dir.join(stem_name),
            members: vec![],
            modified: SystemTime::UNIX_EPOCH,
            stamp: stamp.to_string(),
            seq,
        }
    }
}

/// The directory holding `path`, treating a bare filename as relative to the working directory.
pub(crate) fn log_dir_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
