// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller client for the scheduler.
//!
//! The scheduler's only interface to the controller is the operator HTTP
//! API: it polls `/current`, reads the catalog, and pushes advances with
//! `PUT /current`. Deck state lives here because the decks are rebuilt
//! whenever the catalog generation stamp moves.

use std::collections::HashMap;
use std::time::Duration;

use crate::models::{CurrentExperience, Experience};
use crate::playlist::{Deck, Entry, SubDeck};

/// Throttle passed on every scheduler-driven set, so an operator change
/// wins over the rotation for this many seconds.
pub const CURRENT_EXPERIENCE_SET_DELAY_S: u64 = 10;

/// Collection id whose members play on the commercial cadence instead of
/// the main rotation.
const COMMERCIALS_COLLECTION: &str = "commercials";

pub struct TimerApi {
    base_url: String,
    client: reqwest::Client,
    pub experiences: Deck,
    pub commercials: Deck,
    last_update: Option<u64>,
    decks_seeded: bool,
}

impl TimerApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            client,
            experiences: Deck::default(),
            commercials: Deck::default(),
            last_update: None,
            decks_seeded: false,
        }
    }

    /// Fetch the current experience. A moved catalog stamp triggers a deck
    /// rebuild before the result is returned.
    pub async fn current(&mut self) -> anyhow::Result<Option<CurrentExperience>> {
        let value: serde_json::Value = self
            .client
            .get(format!("{}/current", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if value.as_object().map(|object| object.is_empty()).unwrap_or(true) {
            // Nothing running yet (e.g. right after boot); the decks still
            // need a first build before the next advance.
            if !self.decks_seeded {
                self.reload().await?;
            }
            return Ok(None);
        }
        let current: CurrentExperience = serde_json::from_value(value)?;

        if self.last_update != Some(current.last_update) {
            self.reload().await?;
            self.last_update = Some(current.last_update);
        }
        Ok(Some(current))
    }

    /// Rebuild the decks from the catalog: commercials in their own deck,
    /// every other collection as a sub-deck, the rest standalone.
    pub async fn reload(&mut self) -> anyhow::Result<()> {
        let catalog: HashMap<String, Experience> = self
            .client
            .get(format!("{}/experiences", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let (experiences, commercials) = build_decks(catalog.into_values());
        self.experiences = experiences;
        self.commercials = commercials;
        self.decks_seeded = true;
        tracing::info!(
            rotation = self.experiences.len(),
            commercials = self.commercials.len(),
            "decks rebuilt"
        );
        Ok(())
    }

    /// Push an advance. A 429 means someone else changed the experience
    /// inside the throttle window; that's not a fault, just a lost race.
    pub async fn set_current(&self, id: &str) -> anyhow::Result<bool> {
        let response = self
            .client
            .put(format!(
                "{}/current?throttle={CURRENT_EXPERIENCE_SET_DELAY_S}",
                self.base_url
            ))
            .json(&serde_json::json!({ "id": id }))
            .send()
            .await?;

        if response.status().as_u16() == 429 {
            tracing::warn!(experience = %id, "tried to set current experience too soon after user");
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }
}

/// Split a catalog into the main rotation deck and the commercial deck.
pub fn build_decks(experiences: impl Iterator<Item = Experience>) -> (Deck, Deck) {
    let mut commercials = Vec::new();
    let mut standalone = Vec::new();
    let mut collections: HashMap<String, Vec<Experience>> = HashMap::new();

    for experience in experiences {
        if !experience.queueable {
            continue;
        }
        match experience.collection.as_deref() {
            Some(COMMERCIALS_COLLECTION) => commercials.push(experience),
            Some(collection) => {
                collections.entry(collection.to_owned()).or_default().push(experience);
            }
            None => standalone.push(experience),
        }
    }

    let mut entries: Vec<Entry> = standalone.into_iter().map(Entry::Single).collect();
    for (collection, members) in collections {
        if !members.is_empty() {
            entries.push(Entry::Collection(SubDeck::new(collection, members)));
        }
    }

    (Deck::new(entries), Deck::from_experiences(commercials))
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
