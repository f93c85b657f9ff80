// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::saveable::from_payload;
use el_core::Counter;
use serde_json::json;
use tempfile::TempDir;

/// Test object with a value and a byte buffer
#[derive(Debug, Clone, PartialEq)]
struct Model {
    value: i64,
    weights: Vec<u8>,
}

impl Model {
    fn new(value: i64) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            value,
            weights: vec![value as u8; 4],
        }))
    }
}

impl Checkpointable for Model {
    fn save(&self) -> Result<Payload, CheckpointError> {
        Ok(json!({"value": self.value, "weights": self.weights}))
    }

    fn load(&mut self, payload: Payload) -> Result<(), CheckpointError> {
        self.value = from_payload(payload["value"].clone())?;
        self.weights = from_payload(payload["weights"].clone())?;
        Ok(())
    }
}

fn setup() -> (TempDir, Arc<AsyncWriter>) {
    (TempDir::new().unwrap(), Arc::new(AsyncWriter::new().unwrap()))
}

#[test]
fn save_then_load_into_fresh_objects() {
    let (dir, writer) = setup();
    let x = Model::new(12);
    let y = Arc::new(Mutex::new(Counter::new(345)));

    let mut cp = Checkpoint::new(dir.path(), Arc::clone(&writer));
    cp.attach("x", &x).unwrap();
    cp.attach("y", &y).unwrap();
    cp.save().unwrap();
    writer.wait().unwrap();

    let x2 = Model::new(0);
    let y2 = Arc::new(Mutex::new(Counter::default()));
    let mut restored = Checkpoint::new(dir.path(), Arc::clone(&writer));
    restored.attach("x", &x2).unwrap();
    restored.attach("y", &y2).unwrap();
    restored.load().unwrap();

    assert_eq!(*x2.lock().unwrap(), *x.lock().unwrap());
    assert_eq!(*y2.lock().unwrap(), *y.lock().unwrap());
}

#[test]
fn load_waits_for_pending_save() {
    let (dir, writer) = setup();
    let model = Model::new(5);
    let mut cp = Checkpoint::new(dir.path(), writer);
    cp.attach("model", &model).unwrap();

    cp.save().unwrap();
    model.lock().unwrap().value = 99;
    cp.load().unwrap();

    assert_eq!(model.lock().unwrap().value, 5);
}

#[test]
fn payload_is_captured_at_save_time() {
    let (dir, writer) = setup();
    let step = Arc::new(Mutex::new(Counter::new(1)));
    let mut cp = Checkpoint::new(dir.path(), Arc::clone(&writer));
    cp.attach("step", &step).unwrap();

    cp.save().unwrap();
    step.lock().unwrap().set(1000);
    writer.wait().unwrap();

    let archive = archive::read(dir.path()).unwrap();
    assert_eq!(archive.get("step"), Some(&json!(1)));
}

#[test]
fn load_missing_archive_fails() {
    let (dir, writer) = setup();
    let mut cp = Checkpoint::new(dir.path(), writer);
    let model = Model::new(1);
    cp.attach("model", &model).unwrap();

    let err = cp.load().unwrap_err();
    assert!(matches!(err, CheckpointError::Archive(ArchiveError::Missing(_))));
}

#[test]
fn load_corrupt_archive_fails() {
    let (dir, writer) = setup();
    std::fs::write(archive::archive_path(dir.path()), "not json").unwrap();
    let mut cp = Checkpoint::new(dir.path(), writer);
    let model = Model::new(1);
    cp.attach("model", &model).unwrap();

    let err = cp.load().unwrap_err();
    assert!(matches!(err, CheckpointError::Archive(ArchiveError::Corrupt { .. })));
    assert_eq!(model.lock().unwrap().value, 1);
}

#[test]
fn partial_save_then_explicit_load_reports_missing_key() {
    let (dir, writer) = setup();
    let foo = Model::new(42);
    let bar = Model::new(12);
    let mut cp = Checkpoint::new(dir.path(), writer);
    cp.attach("foo", &foo).unwrap();
    cp.attach("bar", &bar).unwrap();

    cp.save_with(SaveOptions {
        keys: Some(vec!["bar".to_string()]),
        ..Default::default()
    })
    .unwrap();

    foo.lock().unwrap().value = 0;
    bar.lock().unwrap().value = 0;
    cp.load_with(LoadOptions {
        keys: Some(vec!["bar".to_string()]),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(foo.lock().unwrap().value, 0);
    assert_eq!(bar.lock().unwrap().value, 12);

    bar.lock().unwrap().value = 0;
    let err = cp
        .load_with(LoadOptions {
            keys: Some(vec!["bar".to_string(), "foo".to_string()]),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, CheckpointError::MissingKey(ref k) if k == "foo"));
    // Nothing was restored by the failed load
    assert_eq!(bar.lock().unwrap().value, 0);
}

#[test]
fn full_load_restores_entries_present_in_archive() {
    let (dir, writer) = setup();
    let foo = Model::new(42);
    let mut cp = Checkpoint::new(dir.path(), writer);
    cp.attach("foo", &foo).unwrap();
    cp.save().unwrap();

    // An object attached after the checkpoint was written keeps its state
    let added = Model::new(9);
    cp.attach("added", &added).unwrap();
    foo.lock().unwrap().value = 0;

    cp.load().unwrap();
    assert_eq!(foo.lock().unwrap().value, 42);
    assert_eq!(added.lock().unwrap().value, 9);
}

#[test]
fn load_or_save_resumes_with_newly_attached_entry() {
    let (dir, writer) = setup();
    let model = Model::new(3);
    let mut cp = Checkpoint::new(dir.path(), writer);
    cp.attach("model", &model).unwrap();
    assert_eq!(cp.load_or_save().unwrap(), Resume::Saved);

    let extra = Model::new(5);
    cp.attach("extra", &extra).unwrap();
    assert_eq!(cp.load_or_save().unwrap(), Resume::Loaded);
    assert_eq!(extra.lock().unwrap().value, 5);
}

#[test]
fn explicit_key_must_be_attached() {
    let (dir, writer) = setup();
    let mut cp = Checkpoint::new(dir.path(), writer);
    let model = Model::new(1);
    cp.attach("foo", &model).unwrap();

    let err = cp
        .save_with(SaveOptions {
            keys: Some(vec!["nope".to_string()]),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, CheckpointError::UnknownEntry(ref k) if k == "nope"));
}

#[test]
fn save_and_load_other_directory() {
    let (dir, writer) = setup();
    let inner = dir.path().join("inner");
    let model = Model::new(42);
    let mut cp = Checkpoint::new(dir.path().join("default"), writer);
    cp.attach("foo", &model).unwrap();

    cp.save_with(SaveOptions {
        directory: Some(inner.clone()),
        ..Default::default()
    })
    .unwrap();
    model.lock().unwrap().value = 12;
    cp.load_with(LoadOptions {
        directory: Some(inner.clone()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(model.lock().unwrap().value, 42);
    assert!(archive::exists(&inner));
    assert!(!cp.exists());
}

#[test]
fn dry_run_writes_nothing() {
    let (dir, writer) = setup();
    let mut cp = Checkpoint::new(dir.path(), Arc::clone(&writer)).with_write(false);
    let model = Model::new(42);
    cp.attach("foo", &model).unwrap();

    cp.save().unwrap();
    writer.close().unwrap();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn load_or_save_saves_then_loads() {
    let (dir, writer) = setup();

    for restart in 0..3 {
        let model = Model::new(42);
        let mut cp = Checkpoint::new(dir.path(), Arc::clone(&writer));
        cp.attach("foo", &model).unwrap();

        let resume = cp.load_or_save().unwrap();
        let expected = if restart == 0 { Resume::Saved } else { Resume::Loaded };
        assert_eq!(resume, expected);
        assert_eq!(model.lock().unwrap().value, 42 + restart);

        model.lock().unwrap().value += 1;
        cp.save().unwrap();
    }
}

#[test]
fn load_or_save_on_existing_checkpoint_leaves_state_unchanged() {
    let (dir, writer) = setup();
    let model = Model::new(7);
    let mut cp = Checkpoint::new(dir.path(), writer);
    cp.attach("foo", &model).unwrap();

    assert_eq!(cp.load_or_save().unwrap(), Resume::Saved);
    assert_eq!(cp.load_or_save().unwrap(), Resume::Loaded);
    assert_eq!(model.lock().unwrap().value, 7);
}

#[test]
fn load_or_save_removes_interrupted_writes() {
    let (dir, writer) = setup();
    let staged = archive::stage(dir.path(), &archive::Archive::new(BTreeMap::new())).unwrap();
    let temp = staged.temp_path().to_path_buf();
    std::mem::forget(staged);

    let mut cp = Checkpoint::new(dir.path(), writer);
    let model = Model::new(1);
    cp.attach("foo", &model).unwrap();
    assert_eq!(cp.load_or_save().unwrap(), Resume::Saved);

    assert!(!temp.exists());
}

#[test]
fn reserved_names_are_rejected() {
    let (dir, writer) = setup();
    let mut cp = Checkpoint::new(dir.path(), writer);
    let err = cp.attach("_timestamp", &Model::new(1)).unwrap_err();
    assert!(matches!(err, CheckpointError::ReservedName(_)));
    assert!(cp.attach("", &Model::new(1)).is_err());
}

#[test]
fn reattach_replaces_entry() {
    let (dir, writer) = setup();
    let first = Model::new(1);
    let second = Model::new(2);
    let mut cp = Checkpoint::new(dir.path(), Arc::clone(&writer));
    cp.attach("model", &first).unwrap();
    cp.attach("model", &second).unwrap();
    cp.save().unwrap();
    writer.wait().unwrap();

    assert_eq!(cp.keys().collect::<Vec<_>>(), vec!["model"]);
    let archive = archive::read(dir.path()).unwrap();
    assert_eq!(archive.get("model").unwrap()["value"], json!(2));
}

#[test]
fn detach_removes_entry() {
    let (dir, writer) = setup();
    let mut cp = Checkpoint::new(dir.path(), writer);
    let model = Model::new(1);
    cp.attach("a", &model).unwrap();
    assert!(cp.detach("a"));
    assert!(!cp.detach("a"));
    assert_eq!(cp.keys().count(), 0);
}

#[test]
fn dropped_object_fails_save() {
    let (dir, writer) = setup();
    let mut cp = Checkpoint::new(dir.path(), writer);
    {
        let temporary = Model::new(1);
        cp.attach("gone", &temporary).unwrap();
    }

    let err = cp.save().unwrap_err();
    assert!(matches!(err, CheckpointError::EntryDropped(ref k) if k == "gone"));
}

#[test]
fn failing_object_is_named_in_error() {
    struct Broken;
    impl Checkpointable for Broken {
        fn save(&self) -> Result<Payload, CheckpointError> {
            Err(CheckpointError::MissingKey("inner".to_string()))
        }
        fn load(&mut self, _payload: Payload) -> Result<(), CheckpointError> {
            Ok(())
        }
    }

    let (dir, writer) = setup();
    let broken = Arc::new(Mutex::new(Broken));
    let mut cp = Checkpoint::new(dir.path(), writer);
    cp.attach("broken", &broken).unwrap();

    let err = cp.save().unwrap_err();
    assert!(matches!(err, CheckpointError::Entry { ref key, .. } if key == "broken"));
}

#[test]
fn archive_write_failure_surfaces_on_close_and_keeps_previous_checkpoint() {
    let (dir, writer) = setup();
    let model = Model::new(1);
    let mut cp = Checkpoint::new(dir.path(), Arc::clone(&writer));
    cp.attach("model", &model).unwrap();
    cp.save().unwrap();
    writer.wait().unwrap();

    // A regular file where a directory is expected makes the write fail
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, "file").unwrap();
    model.lock().unwrap().value = 2;
    cp.save_with(SaveOptions {
        directory: Some(blocked.join("nested")),
        ..Default::default()
    })
    .unwrap();

    let err = writer.close().unwrap_err();
    assert!(matches!(err, WriteError::Archive(_)));

    let archive = archive::read(dir.path()).unwrap();
    assert_eq!(archive.get("model").unwrap()["value"], json!(1));
}

#[test]
fn save_after_writer_closed_fails() {
    let (dir, writer) = setup();
    let mut cp = Checkpoint::new(dir.path(), Arc::clone(&writer));
    let model = Model::new(1);
    cp.attach("model", &model).unwrap();
    writer.close().unwrap();

    let err = cp.save().unwrap_err();
    assert!(matches!(err, CheckpointError::Write(WriteError::Closed)));
}
