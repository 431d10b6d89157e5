// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Checks the events a disk level emits. Kept in its own test binary because it installs a
//! global subscriber: the worker thread does not see thread-local subscribers.

use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex};

use futures::executor::block_on;
use stratum_disk::{DiskLevel, Fingerprint, Utf8Codec};
use stratum_level::CacheLevel;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone, Default)]
struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).to_string()
    }

    fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false))
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn lifecycle_events_carry_cache_fields() {
    let capture = LogCapture::default();
    tracing::subscriber::set_global_default(capture.subscriber()).expect("no other global subscriber");

    let dir = TempDir::new().unwrap();
    let level = DiskLevel::<&str, String, _>::builder(dir.path(), Utf8Codec)
        .capacity(8)
        .build()
        .unwrap();

    level.set("12345".to_string(), &"first");
    level.set("67890".to_string(), &"second");
    assert!(block_on(level.get(&"second")).is_succeeded());
    assert!(block_on(level.get(&"absent")).is_failed());

    let corrupt = Fingerprint::of("second").to_string();
    fs::write(dir.path().join(&corrupt), [0xff; 5]).unwrap();
    assert!(block_on(level.get(&"second")).is_failed());
    drop(level);

    let output = capture.output();
    for expected in [
        "disk cache opened",
        "disk cache write",
        "disk cache eviction",
        "disk cache hit",
        "disk cache miss",
        "corrupt disk cache entry removed",
        "cache.fingerprint",
        corrupt.as_str(),
    ] {
        assert!(output.contains(expected), "log output does not contain '{expected}', got:\n{output}");
    }
}
