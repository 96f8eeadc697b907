// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host video-device discovery for docker experiences.
//!
//! Every `FT_VIDEO_DEV_<name>` environment variable holds a USB
//! `idVendor:idProduct` pair. Host `/dev/video*` nodes whose sysfs ids match
//! are exposed inside containers as `/dev/video<name>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "FT_VIDEO_DEV_";

#[derive(Debug, Default)]
pub struct VideoDeviceManager {
    devices: HashMap<String, PathBuf>,
}

impl VideoDeviceManager {
    /// Scan `/dev` and the process environment.
    pub fn from_system() -> Self {
        let host_devices = scan_host_devices(Path::new("/dev"), Path::new("/sys/class/video4linux"));
        Self::with_devices(host_devices, std::env::vars())
    }

    /// Build the map from pre-scanned `(vendor:product, path)` pairs and an
    /// environment snapshot.
    pub fn with_devices(
        host_devices: Vec<(String, PathBuf)>,
        env: impl Iterator<Item = (String, String)>,
    ) -> Self {
        let mut devices = HashMap::new();
        for (key, wanted_id) in env {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let name = name.to_lowercase();
            match host_devices.iter().find(|(id, _)| *id == wanted_id) {
                Some((_, path)) => {
                    devices.insert(name, path.clone());
                }
                None => {
                    tracing::debug!(device = %name, id = %wanted_id, "no host device matches");
                }
            }
        }
        Self { devices }
    }

    /// `container device name → host device path`.
    pub fn devices(&self) -> &HashMap<String, PathBuf> {
        &self.devices
    }
}

/// List `(idVendor:idProduct, /dev/videoN)` pairs for every host video node.
fn scan_host_devices(dev_dir: &Path, sysfs_dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(dev_dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.starts_with("video").then_some(name)
        })
        .collect();
    names.sort();

    names
        .into_iter()
        .filter_map(|name| {
            let id = usb_id(&sysfs_dir.join(&name))?;
            Some((id, dev_dir.join(&name)))
        })
        .collect()
}

/// Read `idVendor:idProduct` from a device's sysfs parent, the same way
/// browsers identify capture hardware.
fn usb_id(sysfs_device: &Path) -> Option<String> {
    let parent = sysfs_device.join("device").join("..");
    let vendor = std::fs::read_to_string(parent.join("idVendor")).ok()?;
    let product = std::fs::read_to_string(parent.join("idProduct")).ok()?;
    Some(format!("{}:{}", vendor.trim(), product.trim()))
}

#[cfg(test)]
#[path = "video_devices_tests.rs"]
mod tests;
