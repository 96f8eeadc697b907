// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use crate::models::{CurrentExperience, Experience, LockValue};
use crate::timer::{should_advance, INTERACTION_TIMEOUT_S};

const NOW: u64 = 1_700_000_000_000;

fn current(lifetime: u64, start_time: u64) -> CurrentExperience {
    CurrentExperience {
        experience: Experience {
            id: "x".to_owned(),
            unlisted: false,
            queueable: true,
            collection: None,
            lifetime,
            title: "X".to_owned(),
            artist: None,
            description: None,
        },
        end_time: None,
        start_time: Some(start_time),
        last_interaction: None,
        last_lock_update: None,
        lock: LockValue::Flag(false),
        last_update: 1,
    }
}

#[test]
fn no_current_advances() {
    assert!(should_advance(None, NOW));
}

#[yare::parameterized(
    bool_lock = { LockValue::Flag(true) },
    int_lock = { LockValue::Limit(1) },
    big_int_lock = { LockValue::Limit(40) },
)]
fn engaged_lock_holds(lock: LockValue) {
    let mut cur = current(60, NOW - 3_600_000);
    cur.lock = lock;
    cur.last_lock_update = Some(NOW - 1000);
    assert!(!should_advance(Some(&cur), NOW));
}

#[test]
fn released_lock_advances_immediately() {
    // Well inside the lifetime, but the lock was toggled off.
    let mut cur = current(60, NOW - 5_000);
    cur.lock = LockValue::Flag(false);
    cur.last_lock_update = Some(NOW - 1000);
    assert!(should_advance(Some(&cur), NOW));
}

#[test]
fn never_locked_falls_through_to_lifetime() {
    let fresh = current(60, NOW - 5_000);
    assert!(!should_advance(Some(&fresh), NOW));

    let stale = current(60, NOW - 61_000);
    assert!(should_advance(Some(&stale), NOW));
}

#[test]
fn end_time_dominates_lifetime() {
    // lifetime=60 says hold, end_time in the past says advance.
    let mut cur = current(60, NOW - 15_000);
    cur.end_time = Some(NOW - 1);
    assert!(should_advance(Some(&cur), NOW));

    // lifetime expired, end_time in the future says hold.
    let mut cur = current(60, NOW - 3_600_000);
    cur.end_time = Some(NOW + 10_000);
    assert!(!should_advance(Some(&cur), NOW));
}

#[test]
fn recent_interaction_holds_past_lifetime() {
    let mut cur = current(60, NOW - 3_600_000);
    cur.last_interaction = Some(NOW - (INTERACTION_TIMEOUT_S * 1000 - 1000));
    assert!(!should_advance(Some(&cur), NOW));

    cur.last_interaction = Some(NOW - (INTERACTION_TIMEOUT_S * 1000 + 1000));
    assert!(should_advance(Some(&cur), NOW));
}

#[test]
fn lifetime_boundary_advances() {
    let cur = current(60, NOW - 60_000);
    assert!(should_advance(Some(&cur), NOW), "advance once now - start >= lifetime");
}

// -- Commercial cadence -------------------------------------------------------

mod cadence {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    use crate::api::TimerApi;
    use crate::timer::Timer;

    /// Controller stand-in: an empty current (always advance), a catalog with
    /// one rotation entry and one commercial, and a record of every set.
    async fn serve_mock(sets: Arc<Mutex<Vec<String>>>) -> anyhow::Result<String> {
        use axum::extract::State;
        use axum::routing::get;
        use axum::Json;

        async fn current() -> Json<serde_json::Value> {
            Json(serde_json::json!({}))
        }
        async fn experiences() -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "x": {"id": "x", "title": "X", "lifetime": 60, "queueable": true},
                "ad": {
                    "id": "ad", "title": "AD", "lifetime": 15,
                    "queueable": true, "collection": "commercials"
                },
            }))
        }
        async fn set(
            State(sets): State<Arc<Mutex<Vec<String>>>>,
            Json(body): Json<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            if let Some(id) = body.get("id").and_then(|id| id.as_str()) {
                sets.lock().await.push(id.to_owned());
            }
            Json(serde_json::json!({"status": "ok"}))
        }

        let router = axum::Router::new()
            .route("/current", get(current).put(set))
            .route("/experiences", get(experiences))
            .with_state(sets);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(format!("http://{addr}"))
    }

    #[tokio::test]
    async fn zero_interval_always_picks_commercials() -> anyhow::Result<()> {
        let sets = Arc::new(Mutex::new(Vec::new()));
        let url = serve_mock(Arc::clone(&sets)).await?;
        let mut timer =
            Timer::new(TimerApi::new(url)).with_commercial_interval(Duration::ZERO);

        for _ in 0..4 {
            timer.advance_if_ready().await?;
        }
        let sets = sets.lock().await;
        assert_eq!(sets.len(), 4);
        assert!(sets.iter().all(|id| id == "ad"), "interval elapsed before every pick: {sets:?}");
        Ok(())
    }

    #[tokio::test]
    async fn long_interval_stays_on_the_rotation() -> anyhow::Result<()> {
        let sets = Arc::new(Mutex::new(Vec::new()));
        let url = serve_mock(Arc::clone(&sets)).await?;
        let mut timer =
            Timer::new(TimerApi::new(url)).with_commercial_interval(Duration::from_secs(3600));

        for _ in 0..4 {
            timer.advance_if_ready().await?;
        }
        let sets = sets.lock().await;
        assert!(sets.iter().all(|id| id == "x"), "no commercial is due yet: {sets:?}");
        Ok(())
    }

    #[tokio::test]
    async fn commercial_cuts_in_once_the_interval_elapses() -> anyhow::Result<()> {
        let sets = Arc::new(Mutex::new(Vec::new()));
        let url = serve_mock(Arc::clone(&sets)).await?;
        let mut timer =
            Timer::new(TimerApi::new(url)).with_commercial_interval(Duration::from_millis(500));

        timer.advance_if_ready().await?;
        assert_eq!(sets.lock().await.last().map(String::as_str), Some("x"));

        tokio::time::sleep(Duration::from_millis(700)).await;
        timer.advance_if_ready().await?;
        assert_eq!(sets.lock().await.last().map(String::as_str), Some("ad"));

        // The cadence clock reset on the pop, so the next pick is rotation
        // again.
        timer.advance_if_ready().await?;
        assert_eq!(sets.lock().await.last().map(String::as_str), Some("x"));
        Ok(())
    }
}

proptest! {
    /// With only lifetime set, the decision is exactly `elapsed >= lifetime`.
    #[test]
    fn lifetime_rule(lifetime in 1u64..=600, elapsed_ms in 0u64..=700_000) {
        let cur = current(lifetime, NOW - elapsed_ms);
        prop_assert_eq!(should_advance(Some(&cur), NOW), elapsed_ms >= lifetime * 1000);
    }

    /// With end_time set, lifetime is irrelevant: advance iff now > end_time.
    #[test]
    fn end_time_rule(
        lifetime in 1u64..=600,
        elapsed_ms in 0u64..=700_000,
        end_offset_ms in -300_000i64..=300_000,
    ) {
        let mut cur = current(lifetime, NOW - elapsed_ms);
        let end_time = NOW.saturating_add_signed(end_offset_ms);
        cur.end_time = Some(end_time);
        prop_assert_eq!(should_advance(Some(&cur), NOW), NOW > end_time);
    }

    /// An engaged lock holds regardless of every other field.
    #[test]
    fn lock_rule(
        lifetime in 1u64..=600,
        elapsed_ms in 0u64..=700_000,
        limit in 1u32..=64,
    ) {
        let mut cur = current(lifetime, NOW - elapsed_ms);
        cur.lock = LockValue::Limit(limit);
        cur.last_lock_update = Some(NOW - 1);
        cur.end_time = Some(NOW - 1);
        prop_assert!(!should_advance(Some(&cur), NOW));
    }
}
