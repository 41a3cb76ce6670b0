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
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use flate2::read::GzDecoder;
use rand::Rng;
use rand::distr::Alphanumeric;
use tempfile::TempDir;
use zaplog_append_file::LogSink;
use zaplog_append_file::SinkConfig;
use zaplog_core::Error;
use zaplog_core::ErrorKind;
use zaplog_core::Trap;
use zaplog_core::record::Level;

#[derive(Debug, Default)]
struct CollectingTrap {
    errors: Mutex<Vec<String>>,
}

impl Trap for CollectingTrap {
    fn trap(&self, err: &Error) {
        self.errors.lock().unwrap().push(err.to_string());
    }
}

fn rotated_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.file_name().unwrap() != "app.log")
        .collect::<Vec<_>>();
    files.sort();
    files
}

fn sink(dir: &Path, max_size: usize, max_files: usize) -> LogSink {
    LogSink::builder(dir.join("app.log"))
        .max_file_size(NonZeroUsize::new(max_size).unwrap())
        .max_log_files(NonZeroUsize::new(max_files).unwrap())
        .build()
        .unwrap()
}

#[test]
fn test_rotation_at_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let sink = sink(temp_dir.path(), 100, 5);

    sink.write(&[b'a'; 60]).unwrap();
    assert!(rotated_files(temp_dir.path()).is_empty());

    sink.write(&[b'b'; 50]).unwrap();
    let rotated = rotated_files(temp_dir.path());
    assert_eq!(rotated.len(), 1);
    assert_eq!(fs::read(&rotated[0]).unwrap(), vec![b'a'; 60]);
    assert_eq!(
        fs::read(temp_dir.path().join("app.log")).unwrap(),
        vec![b'b'; 50]
    );
}

#[test]
fn test_writes_below_threshold_never_rotate() {
    let temp_dir = TempDir::new().unwrap();
    let sink = sink(temp_dir.path(), 1000, 5);

    for _ in 0..99 {
        sink.write(b"0123456789").unwrap();
    }
    assert!(rotated_files(temp_dir.path()).is_empty());
    assert_eq!(
        fs::metadata(temp_dir.path().join("app.log")).unwrap().len(),
        990
    );
}

#[test]
fn test_retention_keeps_newest_rotations() {
    let temp_dir = TempDir::new().unwrap();
    let sink = sink(temp_dir.path(), 100, 3);

    let mut rng = rand::rng();
    let mut written = vec![];
    for _ in 0..8 {
        let line = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(80)
            .map(char::from)
            .collect::<String>();
        sink.write(line.as_bytes()).unwrap();
        written.push(line);
    }

    // seven rotations happened; the last write is still active
    let rotated = rotated_files(temp_dir.path());
    assert_eq!(rotated.len(), 3);
    let kept = rotated
        .iter()
        .map(|path| fs::read_to_string(path).unwrap())
        .collect::<HashSet<_>>();
    let expected = written[4..7].iter().cloned().collect::<HashSet<_>>();
    assert_eq!(kept, expected);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("app.log")).unwrap(),
        written[7]
    );
}

#[test]
fn test_compressed_rotation_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let trap = Arc::new(CollectingTrap::default());
    let sink = LogSink::builder(temp_dir.path().join("app.log"))
        .max_file_size(NonZeroUsize::new(100).unwrap())
        .compress(true)
        .trap(trap.clone())
        .build()
        .unwrap();

    let first = "[2024-08-10 00:00:00] [INFO] [api] first line to be compressed\n";
    sink.write(first.as_bytes()).unwrap();
    sink.write(b"second line\n").unwrap();
    sink.write(b"x".repeat(60).as_slice()).unwrap();

    // the third write rotated the first two; wait for the compressor to replace the raw file
    let deadline = Instant::now() + Duration::from_secs(10);
    let compressed = loop {
        let rotated = rotated_files(temp_dir.path());
        let done = rotated.len() == 1
            && rotated
                .iter()
                .all(|path| path.extension().is_some_and(|ext| ext == "gz"));
        if done || Instant::now() > deadline {
            break rotated;
        }
        thread::sleep(Duration::from_millis(20));
    };

    assert!(trap.errors.lock().unwrap().is_empty());
    assert_eq!(compressed.len(), 1);
    let mut decoder = GzDecoder::new(File::open(&compressed[0]).unwrap());
    let mut content = String::new();
    decoder.read_to_string(&mut content).unwrap();
    assert_eq!(content, format!("{first}second line\n"));
}

#[test]
fn test_filtered_log_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("app.log");
    let sink = LogSink::builder(&path).level(Level::Error).build().unwrap();

    sink.debug(format_args!("noise"));
    sink.info(format_args!("noise"));
    sink.warn(format_args!("noise"));
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);

    sink.fatal(format_args!("disk gone"));
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.ends_with("] [FATAL] [] disk gone\n"));
}

#[test]
fn test_concurrent_writers_never_split_lines() {
    const THREADS: usize = 8;
    const LINES: usize = 200;

    let temp_dir = TempDir::new().unwrap();
    let sink = Arc::new(sink(temp_dir.path(), 1024, 10_000));

    let handles = (0..THREADS)
        .map(|t| {
            let sink = sink.clone();
            thread::spawn(move || {
                let mut total = 0;
                for i in 0..LINES {
                    let line = format!("thread-{t} line-{i} {}\n", "x".repeat(i % 40));
                    total += sink.write(line.as_bytes()).unwrap();
                }
                total
            })
        })
        .collect::<Vec<_>>();
    let expected_bytes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .sum::<usize>();
    sink.close().unwrap();

    let mut total_bytes = 0;
    let mut lines = HashSet::new();
    for entry in fs::read_dir(temp_dir.path()).unwrap() {
        let content = fs::read_to_string(entry.unwrap().path()).unwrap();
        assert!(content.len() <= 1024);
        assert!(content.is_empty() || content.ends_with('\n'));
        total_bytes += content.len();
        for line in content.lines() {
            assert!(line.starts_with("thread-"), "split line: {line:?}");
            assert!(lines.insert(line.to_string()), "duplicated line: {line:?}");
        }
    }

    assert_eq!(total_bytes, expected_bytes);
    assert_eq!(lines.len(), THREADS * LINES);
}

#[test]
fn test_restart_resumes_active_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("app.log");

    let first = sink(temp_dir.path(), 100, 5);
    first.write(&[b'a'; 30]).unwrap();
    first.close().unwrap();
    drop(first);

    let second = sink(temp_dir.path(), 100, 5);
    second.write(&[b'b'; 30]).unwrap();

    let mut expected = vec![b'a'; 30];
    expected.extend_from_slice(&[b'b'; 30]);
    assert_eq!(fs::read(&path).unwrap(), expected);
    assert!(rotated_files(temp_dir.path()).is_empty());
}

#[test]
fn test_failed_rotation_until_reconstructed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("app.log");
    let trap = Arc::new(CollectingTrap::default());
    let sink = LogSink::builder(&path)
        .max_file_size(NonZeroUsize::new(10).unwrap())
        .trap(trap.clone())
        .build()
        .unwrap();

    sink.write(b"12345678").unwrap();
    // the rename of a vanished active file cannot succeed
    fs::remove_file(&path).unwrap();

    let err = sink.write(b"12345678").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    let err = sink.write(b"1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoActiveFile);

    sink.error(format_args!("lost"));
    {
        let errors = trap.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("NoActiveFile"));
    }
    drop(sink);

    let sink = LogSink::builder(&path)
        .max_file_size(NonZeroUsize::new(10).unwrap())
        .build()
        .unwrap();
    sink.write(b"recovered").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"recovered");
}

#[test]
fn test_sink_from_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("logs").join("app.log");
    let json = serde_json::json!({
        "filename": path,
        "maxSizeMB": 1,
        "maxFiles": 2,
        "level": "DEBUG",
        "tag": "billing",
    });
    let config: SinkConfig = serde_json::from_value(json).unwrap();

    let sink = config.build().unwrap();
    sink.debug(format_args!("charged {} accounts", 3));
    sink.close().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.ends_with("] [DEBUG] [billing] charged 3 accounts\n"));
}
