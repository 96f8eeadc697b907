// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::stability::StabilityManager;

#[tokio::test]
async fn healthy_probe_stays_stable() {
    let manager = StabilityManager::new("true");
    for _ in 0..8 {
        assert!(manager.check_stable().await);
    }
}

#[tokio::test]
async fn too_few_samples_draw_no_conclusion() {
    let manager = StabilityManager::new("false");
    // Four failures are below the minimum sample count.
    for _ in 0..4 {
        assert!(manager.check_stable().await);
    }
}

#[tokio::test]
async fn sustained_failures_report_unstable() {
    let manager = StabilityManager::new("false");
    for _ in 0..4 {
        let _ = manager.check_stable().await;
    }
    assert!(!manager.check_stable().await, "5 failures out of 5 crosses the threshold");
}

#[tokio::test]
async fn missing_probe_counts_as_failure() {
    let manager = StabilityManager::new("/nonexistent/kiosk-gpu-probe-binary");
    for _ in 0..4 {
        let _ = manager.check_stable().await;
    }
    assert!(!manager.check_stable().await);
}
