// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use crate::loader::LoaderManager;

#[tokio::test]
async fn start_and_stop() {
    let loader = LoaderManager::new("sleep 30");
    assert!(!loader.is_running().await);

    loader.start().await;
    assert!(loader.is_running().await);

    loader.stop().await;
    assert!(!loader.is_running().await);
}

#[tokio::test]
async fn double_start_keeps_one_process() {
    let loader = LoaderManager::new("sleep 30");
    loader.start().await;
    loader.start().await;
    assert!(loader.is_running().await);
    loader.stop().await;
}

#[tokio::test]
async fn stop_without_start_is_harmless() {
    let loader = LoaderManager::new("sleep 30");
    loader.stop().await;
    assert!(!loader.is_running().await);
}

#[tokio::test]
async fn scheduled_dismissal_fires() {
    let loader = Arc::new(LoaderManager::new("sleep 30"));
    loader.start().await;
    loader.stop_after(Duration::from_millis(50));

    for _ in 0..50 {
        if !loader.is_running().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!loader.is_running().await, "dismissal should have fired");
}
