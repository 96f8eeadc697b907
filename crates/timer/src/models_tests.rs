// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::models::{CurrentExperience, Experience, LockValue};

#[test]
fn lock_value_parses_bool_and_int() -> anyhow::Result<()> {
    let unlocked: LockValue = serde_json::from_str("false")?;
    assert_eq!(unlocked, LockValue::Flag(false));
    assert!(!unlocked.engaged());

    let closed: LockValue = serde_json::from_str("true")?;
    assert!(closed.engaged());

    let limited: LockValue = serde_json::from_str("3")?;
    assert_eq!(limited, LockValue::Limit(3));
    assert!(limited.engaged());
    Ok(())
}

#[test]
fn current_parses_controller_response() -> anyhow::Result<()> {
    let raw = r#"{
        "id": "waves",
        "title": "Waves",
        "artist": null,
        "description": "ocean",
        "lifetime": 60,
        "last_update": 1700000000000,
        "unlisted": false,
        "queueable": true,
        "folders": [],
        "tags": [],
        "collection": "demos",
        "start_time": 1700000001000,
        "last_lock_update": 1700000002000,
        "lock": 2
    }"#;
    let current: CurrentExperience = serde_json::from_str(raw)?;
    assert_eq!(current.experience.id, "waves");
    assert_eq!(current.experience.collection.as_deref(), Some("demos"));
    assert_eq!(current.lock, LockValue::Limit(2));
    assert_eq!(current.last_lock_update, Some(1_700_000_002_000));
    assert_eq!(current.end_time, None);
    Ok(())
}

#[test]
fn current_defaults_optional_fields() -> anyhow::Result<()> {
    let raw = r#"{"id": "x", "title": "X", "lifetime": 30, "last_update": 5}"#;
    let current: CurrentExperience = serde_json::from_str(raw)?;
    assert_eq!(current.lock, LockValue::Flag(false));
    assert!(current.start_time.is_none());
    assert!(current.last_interaction.is_none());
    Ok(())
}

#[test]
fn experience_roundtrip() -> anyhow::Result<()> {
    let experience = Experience {
        id: "life".to_owned(),
        unlisted: false,
        queueable: true,
        collection: None,
        lifetime: 45,
        title: "Life".to_owned(),
        artist: Some("someone".to_owned()),
        description: None,
    };
    let json = serde_json::to_string(&experience)?;
    let back: Experience = serde_json::from_str(&json)?;
    assert_eq!(back, experience);
    Ok(())
}
