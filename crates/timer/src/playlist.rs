// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shuffled decks of experiences.
//!
//! The top deck mixes standalone experiences with one sub-deck per
//! collection. Popping a sub-deck yields one experience and remembers where
//! that collection left off, so collections interleave with the rest of the
//! rotation instead of playing back to back. Any drained deck reshuffles
//! from its source.

use rand::seq::SliceRandom;

use crate::models::Experience;

#[derive(Debug, Clone)]
pub enum Entry {
    Single(Experience),
    Collection(SubDeck),
}

/// One collection's own independently-shuffled deck.
#[derive(Debug, Clone)]
pub struct SubDeck {
    pub collection: String,
    experiences: Vec<Experience>,
    order: Vec<usize>,
}

impl SubDeck {
    pub fn new(collection: String, experiences: Vec<Experience>) -> Self {
        Self { collection, experiences, order: Vec::new() }
    }

    fn pop(&mut self) -> Option<Experience> {
        if self.experiences.is_empty() {
            return None;
        }
        if self.order.is_empty() {
            self.order = shuffled_indices(self.experiences.len());
        }
        self.order.pop().map(|index| self.experiences[index].clone())
    }
}

/// A shuffled deck. Draws come off a shuffled index ring over an immutable
/// source, so sub-deck progress survives a top-level reshuffle.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    source: Vec<Entry>,
    order: Vec<usize>,
}

impl Deck {
    pub fn new(source: Vec<Entry>) -> Self {
        Self { source, order: Vec::new() }
    }

    pub fn from_experiences(experiences: Vec<Experience>) -> Self {
        Self::new(experiences.into_iter().map(Entry::Single).collect())
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Draw the next experience, reshuffling on drain.
    pub fn pop(&mut self) -> Option<Experience> {
        if self.source.is_empty() {
            return None;
        }

        // A sub-deck can only come up empty if its collection was empty, and
        // those are filtered out at build time; the bound is just belt and
        // suspenders against popping forever.
        for _ in 0..self.source.len() + 1 {
            if self.order.is_empty() {
                self.order = shuffled_indices(self.source.len());
            }
            let Some(index) = self.order.pop() else {
                return None;
            };
            match &mut self.source[index] {
                Entry::Single(experience) => return Some(experience.clone()),
                Entry::Collection(sub) => {
                    if let Some(experience) = sub.pop() {
                        return Some(experience);
                    }
                }
            }
        }
        None
    }
}

fn shuffled_indices(len: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(&mut rand::rng());
    order
}

#[cfg(test)]
#[path = "playlist_tests.rs"]
mod tests;
