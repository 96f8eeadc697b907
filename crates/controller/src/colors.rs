// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Experience color palettes.
//!
//! The web interface tints itself per experience using palettes extracted
//! from each experience's thumbnail. Extraction runs out of process; results
//! land on a channel the controller drains once a second and persists to a
//! JSON cache keyed by thumbnail hash, so palettes survive restarts and
//! recompute only when the thumbnail changes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalettes {
    pub primary: HashMap<u8, String>,
    pub secondary: HashMap<u8, String>,
    pub tertiary: HashMap<u8, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheItem {
    hash: String,
    colors: ColorPalettes,
}

struct ExtractionResult {
    experience_id: String,
    hash: String,
    colors: ColorPalettes,
}

pub struct ColorManager {
    palette_cmd: String,
    cache_path: PathBuf,
    colors: Mutex<HashMap<String, ColorPalettes>>,
    cache: Mutex<HashMap<String, CacheItem>>,
    results_tx: mpsc::UnboundedSender<ExtractionResult>,
    results_rx: Mutex<mpsc::UnboundedReceiver<ExtractionResult>>,
}

impl ColorManager {
    pub fn new(palette_cmd: impl Into<String>, cache_path: PathBuf) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            palette_cmd: palette_cmd.into(),
            cache_path,
            colors: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
            results_tx,
            results_rx: Mutex::new(results_rx),
        }
    }

    pub async fn get(&self, experience_id: &str) -> Option<ColorPalettes> {
        self.colors.lock().await.get(experience_id).cloned()
    }

    /// Seed palettes for a freshly-loaded catalog. Cache hits resolve
    /// immediately; misses queue a background extraction.
    pub async fn load(&self, experiences: &[(String, PathBuf, bool)]) {
        *self.cache.lock().await = self.read_cache();

        for (id, experience_path, unlisted) in experiences {
            // Unlisted experiences never show in the web interface.
            if *unlisted {
                continue;
            }

            let thumb_path = experience_path.join("thumb.jpg");
            let Some(hash) = thumb_hash(&thumb_path) else {
                continue;
            };

            let cached = self.cache.lock().await.get(id).cloned();
            match cached {
                Some(item) if item.hash == hash => {
                    self.colors.lock().await.insert(id.clone(), item.colors);
                }
                _ => self.queue_extraction(id.clone(), thumb_path, hash),
            }
        }
    }

    /// Pull any finished extractions off the channel and persist them.
    pub async fn drain(&self) {
        let mut dirty = false;
        {
            let mut results_rx = self.results_rx.lock().await;
            while let Ok(result) = results_rx.try_recv() {
                self.colors
                    .lock()
                    .await
                    .insert(result.experience_id.clone(), result.colors.clone());
                self.cache.lock().await.insert(
                    result.experience_id,
                    CacheItem { hash: result.hash, colors: result.colors },
                );
                dirty = true;
            }
        }
        if dirty {
            self.write_cache().await;
        }
    }

    fn queue_extraction(&self, experience_id: String, thumb_path: PathBuf, hash: String) {
        let palette_cmd = self.palette_cmd.clone();
        let results_tx = self.results_tx.clone();
        tokio::spawn(async move {
            match extract_palettes(&palette_cmd, &thumb_path).await {
                Ok(colors) => {
                    let _ = results_tx.send(ExtractionResult { experience_id, hash, colors });
                }
                Err(err) => {
                    tracing::warn!(experience = %experience_id, err = %err, "palette extraction failed");
                }
            }
        });
    }

    fn read_cache(&self) -> HashMap<String, CacheItem> {
        let Ok(raw) = std::fs::read_to_string(&self.cache_path) else {
            return HashMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    async fn write_cache(&self) {
        let cache = self.cache.lock().await;
        let serialized = match serde_json::to_vec(&*cache) {
            Ok(serialized) => serialized,
            Err(err) => {
                tracing::warn!(err = %err, "color cache failed to serialize");
                return;
            }
        };
        if let Err(err) = tokio::fs::write(&self.cache_path, serialized).await {
            tracing::warn!(path = %self.cache_path.display(), err = %err, "color cache write failed");
        }
    }
}

/// Run the external extractor, which prints the palettes as JSON on stdout.
async fn extract_palettes(palette_cmd: &str, thumb_path: &Path) -> anyhow::Result<ColorPalettes> {
    let output = Command::new("sh")
        .args(["-c", &format!("{palette_cmd} {}", thumb_path.display())])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await?;
    if !output.status.success() {
        anyhow::bail!("palette extractor exited with {}", output.status);
    }
    Ok(serde_json::from_slice(&output.stdout)?)
}

fn thumb_hash(thumb_path: &Path) -> Option<String> {
    let contents = std::fs::read(thumb_path).ok()?;
    let digest = Sha256::digest(&contents);
    Some(format!("{digest:x}"))
}

#[cfg(test)]
#[path = "colors_tests.rs"]
mod tests;
