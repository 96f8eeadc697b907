// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios: controller, scheduler, and messaging working
//! against each other over real sockets.

use std::sync::atomic::Ordering;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use kiosk_specs::{boot, write_experience, HarnessOptions};
use kiosk_timer::api::TimerApi;
use kiosk_timer::timer::Timer;

/// Poll until `predicate` holds on `GET /current`, or fail after `secs`.
async fn wait_for_current(
    harness: &kiosk_specs::Harness,
    secs: u64,
    predicate: impl Fn(&serde_json::Value) -> bool,
) -> anyhow::Result<serde_json::Value> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(secs);
    loop {
        let current = harness.get_current().await?;
        if predicate(&current) {
            return Ok(current);
        }
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("current never matched, last: {current}");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Scenario: boot with no operator input; after the initial delay the
/// display settles on the empty experience.
#[tokio::test]
async fn boot_settles_on_empty() -> anyhow::Result<()> {
    let options = HarnessOptions {
        initial_empty_delay_s: 1,
        spawn_background_loops: true,
        ..Default::default()
    };
    let harness = boot(options, |data_dir| write_experience(data_dir, "a", 60, None)).await?;

    // Before the delay there has been no transition at all.
    assert_eq!(harness.get_current().await?, serde_json::json!({}));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(harness.get_current().await?, serde_json::json!({}));
    Ok(())
}

/// Scenario: the operator and the scheduler race; exactly one wins and the
/// other sees 429.
#[tokio::test]
async fn operator_set_wins_over_concurrent_set() -> anyhow::Result<()> {
    let harness = boot(HarnessOptions::default(), |data_dir| {
        // load_time keeps the winning transition inside the modify lock
        // long enough for the loser to arrive.
        write_experience(data_dir, "a", 60, Some(1))?;
        write_experience(data_dir, "b", 60, Some(1))
    })
    .await?;

    let client = reqwest::Client::new();
    let put_a = client
        .put(format!("{}/current", harness.base_url))
        .json(&serde_json::json!({"id": "a"}))
        .send();
    let put_b = client
        .put(format!("{}/current", harness.base_url))
        .json(&serde_json::json!({"id": "b"}))
        .send();
    let (resp_a, resp_b) = tokio::join!(put_a, put_b);
    let (status_a, status_b) = (resp_a?.status().as_u16(), resp_b?.status().as_u16());

    let mut statuses = [status_a, status_b];
    statuses.sort();
    assert_eq!(statuses, [200, 429], "one winner, one throttled loser");

    let winner = if status_a == 200 { "a" } else { "b" };
    let current = wait_for_current(&harness, 3, |c| c["id"] == winner).await?;
    assert_eq!(current["id"], winner);
    Ok(())
}

/// Scenario: an app lock holds the rotation past the lifetime; releasing it
/// advances on the next tick.
#[tokio::test]
async fn lock_holds_then_release_advances() -> anyhow::Result<()> {
    let harness = boot(HarnessOptions::default(), |data_dir| {
        write_experience(data_dir, "x", 1, None)?;
        write_experience(data_dir, "y", 60, None)
    })
    .await?;

    // Start without stamping the throttle clock so the scheduler's
    // throttled PUT is allowed through afterwards.
    anyhow::ensure!(harness.ctx.controller.set_current(Some("x"), None, false).await?);

    let client = reqwest::Client::new();
    client
        .patch(format!("{}/current", harness.base_url))
        .json(&serde_json::json!({"id": "x", "lock": true}))
        .send()
        .await?
        .error_for_status()?;

    // Outlive the lifetime, then check the scheduler holds.
    tokio::time::sleep(Duration::from_millis(1300)).await;
    let mut timer = Timer::new(TimerApi::new(harness.base_url.clone()));
    timer.advance_if_ready().await?;
    let current = harness.get_current().await?;
    assert_eq!(current["id"], "x", "locked experience must not rotate");

    // Release the lock; the next ticks advance.
    client
        .patch(format!("{}/current", harness.base_url))
        .json(&serde_json::json!({"id": "x", "lock": false}))
        .send()
        .await?
        .error_for_status()?;

    for _ in 0..5 {
        timer.advance_if_ready().await?;
        if harness.get_current().await?["id"] == "y" {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    anyhow::bail!("scheduler never advanced after the lock release");
}

/// Scenario: an app-set end time dominates the lifetime in both directions.
#[tokio::test]
async fn end_time_overrides_lifetime() -> anyhow::Result<()> {
    let harness = boot(HarnessOptions::default(), |data_dir| {
        write_experience(data_dir, "v", 1, None)?;
        write_experience(data_dir, "w", 60, None)
    })
    .await?;

    anyhow::ensure!(harness.ctx.controller.set_current(Some("v"), None, false).await?);

    // End time two seconds out: the scheduler holds even past the
    // (already-expired) lifetime.
    let end_time = kiosk_timer::timer::epoch_ms() + 2000;
    let client = reqwest::Client::new();
    client
        .patch(format!("{}/current", harness.base_url))
        .json(&serde_json::json!({"id": "v", "end_time": end_time}))
        .send()
        .await?
        .error_for_status()?;

    tokio::time::sleep(Duration::from_millis(1300)).await;
    let mut timer = Timer::new(TimerApi::new(harness.base_url.clone()));
    timer.advance_if_ready().await?;
    assert_eq!(harness.get_current().await?["id"], "v", "end time in the future holds");

    // Once the end time passes, the scheduler moves on.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    for _ in 0..5 {
        timer.advance_if_ready().await?;
        if harness.get_current().await?["id"] == "w" {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    anyhow::bail!("scheduler never advanced past the end time");
}

/// Scenario: the running environment fails; the exit watch clears the
/// display.
#[tokio::test]
async fn failed_environment_clears_current() -> anyhow::Result<()> {
    let options = HarnessOptions {
        capture_failed_timeout_s: 0,
        spawn_background_loops: true,
        ..Default::default()
    };
    let harness = boot(options, |data_dir| write_experience(data_dir, "d", 60, None)).await?;

    anyhow::ensure!(harness.ctx.controller.set_current(Some("d"), None, false).await?);
    assert_eq!(harness.get_current().await?["id"], "d");

    // The upstream stops reporting processes; with a zero grace window the
    // exit watch should notice within a couple of ticks.
    harness.capture.processes.store(0, Ordering::Relaxed);
    wait_for_current(&harness, 5, |current| current == &serde_json::json!({})).await?;
    Ok(())
}

/// Scenario: full client acceptance flow against a running experience,
/// including the interaction stamp the router writes back.
#[tokio::test]
async fn client_acceptance_stamps_interaction() -> anyhow::Result<()> {
    let harness =
        boot(HarnessOptions::default(), |data_dir| write_experience(data_dir, "e", 60, None))
            .await?;
    anyhow::ensure!(harness.ctx.controller.set_current(Some("e"), None, false).await?);

    let (mut app, _) =
        tokio_tungstenite::connect_async(format!("{}/messaging/out/e", harness.ws_url)).await?;
    let (mut client, _) =
        tokio_tungstenite::connect_async(format!("{}/messaging/in/e", harness.ws_url)).await?;

    client
        .send(Message::Text(r#"{"type":"con","version":1}"#.to_owned().into()))
        .await?;

    // Find the forwarded con to learn the client id.
    let client_id = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let frame = app
                .next()
                .await
                .ok_or_else(|| anyhow::anyhow!("app socket closed"))??;
            if let Message::Text(text) = frame {
                let value: serde_json::Value = serde_json::from_str(&text)?;
                if value["type"] == "con" {
                    return value["client"]
                        .as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| anyhow::anyhow!("con carries the client id"));
                }
            }
        }
    })
    .await??;

    let acc = serde_json::json!({
        "type": "acc", "version": 1, "accepted": true, "client": client_id
    });
    app.send(Message::Text(acc.to_string().into())).await?;

    // Wait for the acceptance to land client-side, then interact.
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let frame = client
                .next()
                .await
                .ok_or_else(|| anyhow::anyhow!("client socket closed"))??;
            if let Message::Text(text) = frame {
                let value: serde_json::Value = serde_json::from_str(&text)?;
                if value["type"] == "acc" {
                    return anyhow::Ok(());
                }
            }
        }
    })
    .await??;

    client
        .send(Message::Text(
            r#"{"type":"cap","version":1,"body":{"k":1}}"#.to_owned().into(),
        ))
        .await?;

    // The app receives the stamped frame...
    let cap = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let frame = app
                .next()
                .await
                .ok_or_else(|| anyhow::anyhow!("app socket closed"))??;
            if let Message::Text(text) = frame {
                let value: serde_json::Value = serde_json::from_str(&text)?;
                if value["type"] == "cap" {
                    return anyhow::Ok(value);
                }
            }
        }
    })
    .await??;
    assert_eq!(cap["body"], serde_json::json!({"k": 1}));
    assert_eq!(cap["client"], serde_json::json!(client_id));

    // ...and the controller records the interaction.
    let current = wait_for_current(&harness, 3, |c| c.get("last_interaction").is_some()).await?;
    assert_eq!(current["id"], "e");
    Ok(())
}
