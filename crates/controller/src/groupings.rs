// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Experience groupings: collections, tags, and folders.
//!
//! Each grouping lives in its own TOML file at the data-directory root,
//! keyed by grouping id. Membership maps are derived here and attached to
//! catalog responses by the controller.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub id: String,
    pub experiences: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    pub experiences: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub id: String,
    pub tags: Vec<String>,
    pub title: String,
    pub featured: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// All groupings loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct Groupings {
    pub collections: HashMap<String, Collection>,
    pub tags: HashMap<String, Tag>,
    pub folders: HashMap<String, Folder>,
}

impl Groupings {
    pub fn load(dir: &Path) -> Self {
        let mut collections: HashMap<String, Collection> = load_grouping(dir, "collections.toml");
        let mut tags: HashMap<String, Tag> = load_grouping(dir, "tags.toml");
        let mut folders: HashMap<String, Folder> = load_grouping(dir, "folders.toml");

        for (id, collection) in collections.iter_mut() {
            collection.id = id.clone();
        }
        for (id, tag) in tags.iter_mut() {
            tag.id = id.clone();
        }
        for (id, folder) in folders.iter_mut() {
            folder.id = id.clone();
        }

        Self { collections, tags, folders }
    }

    /// experience id → collection id. An experience belongs to at most one
    /// collection; when two claim it, the first in key order wins.
    pub fn collection_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        let mut ids: Vec<&String> = self.collections.keys().collect();
        ids.sort();
        for id in ids {
            if let Some(collection) = self.collections.get(id) {
                for experience in &collection.experiences {
                    map.entry(experience.clone()).or_insert_with(|| id.clone());
                }
            }
        }
        map
    }

    /// experience id → tag ids listing it.
    pub fn tag_map(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (id, tag) in &self.tags {
            for experience in &tag.experiences {
                map.entry(experience.clone()).or_default().push(id.clone());
            }
        }
        for tags in map.values_mut() {
            tags.sort();
        }
        map
    }

    /// experience id → folder ids whose tag lists intersect the
    /// experience's tags.
    pub fn folder_map(&self) -> HashMap<String, Vec<String>> {
        let tag_map = self.tag_map();
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (experience, tags) in &tag_map {
            for (folder_id, folder) in &self.folders {
                if tags.iter().any(|tag| folder.tags.contains(tag)) {
                    map.entry(experience.clone()).or_default().push(folder_id.clone());
                }
            }
        }
        for folders in map.values_mut() {
            folders.sort();
        }
        map
    }
}

fn load_grouping<T: serde::de::DeserializeOwned>(dir: &Path, file_name: &str) -> HashMap<String, T> {
    let path = dir.join(file_name);
    if !path.exists() {
        return HashMap::new();
    }

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(path = %path.display(), err = %err, "grouping file unreadable");
            return HashMap::new();
        }
    };

    match toml::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(path = %path.display(), err = %err, "grouping file failed to parse");
            HashMap::new()
        }
    }
}

#[cfg(test)]
#[path = "groupings_tests.rs"]
mod tests;
