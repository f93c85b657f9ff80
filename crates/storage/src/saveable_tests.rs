// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use el_core::Trigger;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[test]
fn counter_saves_raw_integer() {
    let mut step = Counter::new(120);
    assert_eq!(step.save().unwrap(), json!(120));

    step.load(json!(7)).unwrap();
    assert_eq!(step.get(), 7);
}

#[test]
fn counter_rejects_malformed_payload() {
    let mut step = Counter::new(1);
    let err = step.load(json!("seven")).unwrap_err();
    assert!(matches!(err, CheckpointError::Payload(_)));
    assert_eq!(step.get(), 1);
}

#[test]
fn trigger_state_survives_roundtrip() {
    let mut once = Once::new();
    assert!(once.fires(0));

    let mut restored = Once::new();
    restored.load(once.save().unwrap()).unwrap();
    assert!(!restored.fires(1));
}

#[test]
fn saveable_wraps_closures() {
    let value = Arc::new(Mutex::new(42));
    let saved_from = Arc::clone(&value);
    let loaded_into = Arc::clone(&value);

    let mut saveable = Saveable::new(
        move || to_payload(&*saved_from.lock().unwrap()),
        move |payload| {
            *loaded_into.lock().unwrap() = from_payload(payload)?;
            Ok(())
        },
    );

    let payload = saveable.save().unwrap();
    *value.lock().unwrap() = 12;
    saveable.load(payload).unwrap();
    assert_eq!(*value.lock().unwrap(), 42);
}

#[test]
fn ratio_state_survives_archive_roundtrip() {
    use crate::archive;
    use std::collections::BTreeMap;

    let dir = tempfile::TempDir::new().unwrap();
    for ratio in [0.1, 0.3, 1.0 / 3.0, 0.7, 0.123_456_789] {
        for steps in 1..40 {
            let mut should = Ratio::new(ratio);
            for step in 0..steps {
                should.fires(step);
            }

            let mut entries = BTreeMap::new();
            entries.insert("should".to_string(), should.save().unwrap());
            archive::publish(dir.path(), &archive::Archive::new(entries)).unwrap();

            let loaded = archive::read(dir.path()).unwrap();
            let mut restored = Ratio::new(0.0);
            restored.load(loaded.get("should").unwrap().clone()).unwrap();
            assert_eq!(restored, should, "ratio {} after {} steps", ratio, steps);
        }
    }
}
