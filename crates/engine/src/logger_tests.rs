// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use el_adapters::{BackendError, FailingBackend, FakeBackend};
use el_core::{Counter, MetricKind};
use el_storage::Checkpoint;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

fn setup(backends: Vec<Arc<dyn Backend>>) -> (Arc<AsyncWriter>, Logger) {
    let writer = Arc::new(AsyncWriter::new().unwrap());
    let logger = Logger::new(Arc::clone(&writer), backends);
    (writer, logger)
}

#[test]
fn last_write_wins_per_name_and_step() {
    let fake = FakeBackend::new();
    let (writer, mut logger) = setup(vec![Arc::new(fake.clone())]);

    logger.scalar("loss", 1.0, 3);
    logger.scalar("loss", 0.5, 3);
    logger.scalar("loss", 0.25, 4);
    assert_eq!(logger.pending(), 2);
    logger.flush().unwrap();
    writer.wait().unwrap();

    let snapshots = fake.snapshots();
    assert_eq!(snapshots.len(), 1);
    let values: Vec<(i64, f64)> = snapshots[0]
        .iter()
        .map(|r| (r.step, r.value.as_scalar().unwrap()))
        .collect();
    assert_eq!(values, vec![(3, 0.5), (4, 0.25)]);
}

#[test]
fn add_prefixes_keys() {
    let fake = FakeBackend::new();
    let (writer, mut logger) = setup(vec![Arc::new(fake.clone())]);

    logger.add([("loss", 0.1), ("acc", 0.9)], "train", 1);
    logger.add([("loss", 0.2)], "", 1);
    logger.flush().unwrap();
    writer.wait().unwrap();

    let names: Vec<String> = fake.snapshots()[0].iter().map(|r| r.name.clone()).collect();
    assert_eq!(names, vec!["loss", "train/acc", "train/loss"]);
}

#[test]
fn typed_helpers_set_kind() {
    let fake = FakeBackend::new();
    let (writer, mut logger) = setup(vec![Arc::new(fake.clone())]);

    logger.vector("weights", vec![1.0, 2.0], 0);
    logger.text("phase", "warmup", 0);
    logger.image(
        "frame",
        Pixels {
            shape: vec![1, 1, 1],
            data: vec![255],
        },
        0,
    );
    logger.flush().unwrap();
    writer.wait().unwrap();

    let snapshot = &fake.snapshots()[0];
    assert_eq!(snapshot.get("weights").unwrap().kind(), MetricKind::Vector);
    assert_eq!(snapshot.get("phase").unwrap().kind(), MetricKind::Text);
    assert_eq!(snapshot.get("frame").unwrap().kind(), MetricKind::Image);
}

#[test]
fn flush_hands_off_buffer() {
    let fake = FakeBackend::new().with_delay(Duration::from_millis(20));
    let (writer, mut logger) = setup(vec![Arc::new(fake.clone())]);

    logger.scalar("x", 1.0, 0);
    logger.flush().unwrap();
    assert_eq!(logger.pending(), 0);

    // Values logged after the flush never leak into the queued snapshot
    logger.scalar("x", 2.0, 1);
    logger.flush().unwrap();
    writer.wait().unwrap();

    assert_eq!(fake.steps(), vec![0, 1]);
}

#[test]
fn empty_flush_queues_nothing() {
    let fake = FakeBackend::new();
    let (writer, mut logger) = setup(vec![Arc::new(fake.clone())]);

    logger.flush().unwrap();
    writer.wait().unwrap();

    assert!(fake.snapshots().is_empty());
    assert_eq!(writer.pending(), 0);
}

#[test]
fn snapshots_arrive_in_flush_order() {
    let slow = FakeBackend::named("slow").with_delay(Duration::from_millis(5));
    let fast = FakeBackend::named("fast");
    let (writer, mut logger) = setup(vec![Arc::new(slow.clone()), Arc::new(fast.clone())]);

    for step in 0..10 {
        logger.scalar("loss", step as f64, step);
        logger.flush().unwrap();
    }
    writer.close().unwrap();

    let expected: Vec<i64> = (0..10).collect();
    assert_eq!(slow.steps(), expected);
    assert_eq!(fast.steps(), expected);
}

#[test]
fn failing_backend_is_isolated_and_reported() {
    let failing = FailingBackend::new();
    let healthy = FakeBackend::named("healthy");
    let (writer, mut logger) = setup(vec![Arc::new(failing.clone()), Arc::new(healthy.clone())]);

    for step in 0..3 {
        logger.scalar("loss", 1.0, step);
        logger.flush().unwrap();
    }
    let err = writer.close().unwrap_err();

    assert_eq!(healthy.steps(), vec![0, 1, 2]);
    let errors = err.into_vec();
    assert_eq!(errors.len(), 3);
    assert!(errors
        .iter()
        .all(|e| matches!(e, WriteError::Backend { backend, .. } if backend == "failing")));
}

#[test]
fn flush_after_close_keeps_buffer() {
    let (writer, mut logger) = setup(vec![]);
    writer.close().unwrap();

    logger.scalar("x", 1.0, 0);
    assert!(matches!(logger.flush(), Err(WriteError::Closed)));
    assert_eq!(logger.pending(), 1);
}

#[test]
fn close_flushes_and_closes_backends() {
    let fake = FakeBackend::new();
    let (writer, mut logger) = setup(vec![Arc::new(fake.clone())]);

    logger.scalar("x", 1.0, 0);
    logger.close().unwrap();
    writer.close().unwrap();

    assert_eq!(fake.steps(), vec![0]);
    assert!(fake.is_closed());
}

/// Records whether a checkpoint was already published when each snapshot arrived
struct Observer {
    directory: PathBuf,
    seen: Arc<Mutex<Vec<bool>>>,
}

#[async_trait]
impl Backend for Observer {
    fn name(&self) -> &str {
        "observer"
    }

    async fn write(&self, _snapshot: &Snapshot) -> Result<(), BackendError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let published = el_storage::archive::exists(&self.directory);
        self.seen.lock().unwrap().push(published);
        Ok(())
    }
}

#[test]
fn flush_completes_before_later_checkpoint() {
    let dir = TempDir::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer = Observer {
        directory: dir.path().to_path_buf(),
        seen: Arc::clone(&seen),
    };
    let (writer, mut logger) = setup(vec![Arc::new(observer)]);
    let step = Arc::new(Mutex::new(Counter::new(1)));
    let mut checkpoint = Checkpoint::new(dir.path(), Arc::clone(&writer));
    checkpoint.attach("step", &step).unwrap();

    logger.scalar("loss", 0.5, 1);
    logger.flush().unwrap();
    checkpoint.save().unwrap();
    logger.scalar("loss", 0.4, 2);
    logger.flush().unwrap();
    writer.close().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![false, true]);
}
