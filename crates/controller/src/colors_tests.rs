// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::colors::ColorManager;

const PALETTES_JSON: &str = r##"{
    "primary": {"0": "#000000", "50": "#3f51b5", "100": "#ffffff"},
    "secondary": {"50": "#ff4081"},
    "tertiary": {"50": "#00bcd4"}
}"##;

/// The extractor is `cat`, so whatever the thumbnail file contains comes
/// back as the extraction result.
#[tokio::test]
async fn extraction_result_lands_after_drain() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let experience_dir = dir.path().join("waves");
    std::fs::create_dir(&experience_dir)?;
    std::fs::write(experience_dir.join("thumb.jpg"), PALETTES_JSON)?;

    let manager = ColorManager::new("cat", dir.path().join("colors.json"));
    manager.load(&[("waves".to_owned(), experience_dir.clone(), false)]).await;

    // Give the background job a moment, then drain.
    for _ in 0..50 {
        manager.drain().await;
        if manager.get("waves").await.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let palettes = manager.get("waves").await.ok_or_else(|| anyhow::anyhow!("palettes"))?;
    assert_eq!(palettes.primary.get(&50).map(String::as_str), Some("#3f51b5"));
    assert!(dir.path().join("colors.json").exists(), "cache persisted");
    Ok(())
}

#[tokio::test]
async fn cache_hit_skips_extraction() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let experience_dir = dir.path().join("waves");
    std::fs::create_dir(&experience_dir)?;
    std::fs::write(experience_dir.join("thumb.jpg"), PALETTES_JSON)?;
    let cache_path = dir.path().join("colors.json");

    let seed = ColorManager::new("cat", cache_path.clone());
    seed.load(&[("waves".to_owned(), experience_dir.clone(), false)]).await;
    for _ in 0..50 {
        seed.drain().await;
        if seed.get("waves").await.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(seed.get("waves").await.is_some());

    // Same thumbnail, extractor that can only fail: the cache must answer.
    let cached = ColorManager::new("false", cache_path);
    cached.load(&[("waves".to_owned(), experience_dir, false)]).await;
    assert!(cached.get("waves").await.is_some(), "palette came from the cache");
    Ok(())
}

#[tokio::test]
async fn unlisted_experiences_are_skipped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let experience_dir = dir.path().join("secret");
    std::fs::create_dir(&experience_dir)?;
    std::fs::write(experience_dir.join("thumb.jpg"), PALETTES_JSON)?;

    let manager = ColorManager::new("cat", dir.path().join("colors.json"));
    manager.load(&[("secret".to_owned(), experience_dir, true)]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.drain().await;
    assert!(manager.get("secret").await.is_none());
    Ok(())
}

#[tokio::test]
async fn missing_thumbnail_is_skipped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let experience_dir = dir.path().join("bare");
    std::fs::create_dir(&experience_dir)?;

    let manager = ColorManager::new("cat", dir.path().join("colors.json"));
    manager.load(&[("bare".to_owned(), experience_dir, false)]).await;
    manager.drain().await;
    assert!(manager.get("bare").await.is_none());
    Ok(())
}
