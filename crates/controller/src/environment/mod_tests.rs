// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use crate::environment::{EnvState, Environment, EnvironmentError, WebEnvironment};
use crate::ports::PortManager;

fn fake_browser(dir: &std::path::Path) -> anyhow::Result<String> {
    let path = dir.join("browser.sh");
    std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n")?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path.display().to_string())
}

fn web_env(dir: &tempfile::TempDir, static_exists: bool) -> anyhow::Result<Environment> {
    let static_path = dir.path().join("static");
    if static_exists {
        std::fs::create_dir_all(&static_path)?;
    }
    let browser = fake_browser(dir.path())?;
    Ok(Environment::web(WebEnvironment::new(
        "demo".to_owned(),
        static_path,
        "/".to_owned(),
        browser,
        "ws://localhost:8000/messaging/out/demo".to_owned(),
        Arc::new(PortManager::new()),
    )))
}

#[tokio::test]
async fn lifecycle_walks_idle_running_stopped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let env = web_env(&dir, true)?;

    assert_eq!(env.state().await, EnvState::Idle);
    env.start(None).await?;
    assert_eq!(env.state().await, EnvState::Running);
    env.stop(None).await?;
    assert_eq!(env.state().await, EnvState::Stopped);

    // A stopped environment may start again.
    env.start(None).await?;
    assert_eq!(env.state().await, EnvState::Running);
    env.stop(None).await?;
    Ok(())
}

#[tokio::test]
async fn start_from_running_is_a_transition_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let env = web_env(&dir, true)?;
    env.start(None).await?;

    let err = env.start(None).await.err().ok_or_else(|| anyhow::anyhow!("expected error"))?;
    assert!(matches!(err, EnvironmentError::Transition { op: "start", .. }));
    // The invariant violation leaves the running environment alone.
    assert_eq!(env.state().await, EnvState::Running);
    env.stop(None).await?;
    Ok(())
}

#[tokio::test]
async fn stop_from_idle_or_stopped_is_a_transition_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let env = web_env(&dir, true)?;

    let err = env.stop(None).await.err().ok_or_else(|| anyhow::anyhow!("expected error"))?;
    assert!(matches!(err, EnvironmentError::Transition { op: "stop", state: "idle", .. }));

    env.start(None).await?;
    env.stop(None).await?;
    let err = env.stop(None).await.err().ok_or_else(|| anyhow::anyhow!("expected error"))?;
    assert!(matches!(err, EnvironmentError::Transition { op: "stop", state: "stopped", .. }));
    Ok(())
}

#[tokio::test]
async fn failed_start_leaves_failed_and_may_retry() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let env = web_env(&dir, false)?;

    let err = env.start(None).await.err().ok_or_else(|| anyhow::anyhow!("expected error"))?;
    assert!(matches!(err, EnvironmentError::Initialization { .. }));
    assert_eq!(env.state().await, EnvState::Failed);

    // Start is valid from failed; with the path now present it succeeds.
    std::fs::create_dir_all(dir.path().join("static"))?;
    env.start(None).await?;
    assert_eq!(env.state().await, EnvState::Running);
    env.stop(None).await?;
    Ok(())
}

#[tokio::test]
async fn stop_is_valid_from_failed() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let env = web_env(&dir, false)?;
    let _ = env.start(None).await;
    assert_eq!(env.state().await, EnvState::Failed);

    env.stop(None).await?;
    assert_eq!(env.state().await, EnvState::Stopped);
    Ok(())
}

#[tokio::test]
async fn availability_tracks_static_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let present = web_env(&dir, true)?;
    assert!(present.available().await);

    let absent = web_env(&tempfile::tempdir()?, false)?;
    assert!(!absent.available().await);
    Ok(())
}

#[test]
fn is_capture_distinguishes_kinds() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let web = web_env(&dir, true)?;
    assert!(!web.is_capture());
    assert_eq!(web.id(), "demo");
    Ok(())
}
