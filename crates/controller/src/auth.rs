// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rotating access codes for the placard QR URL.
//!
//! Six random bytes encode to eight url-safe characters, short enough for a
//! small QR code. Codes expire on the next transition, so brute force is
//! not a practical concern.

use base64::Engine;
use rand::RngCore;
use std::sync::Mutex;

const CODE_BYTES: usize = 6;

/// Holds the live code and the one that will replace it, so a user scanning
/// mid-rotation still gets in.
pub struct AccessCodeManager {
    codes: Mutex<Codes>,
}

struct Codes {
    current: String,
    next: String,
}

impl AccessCodeManager {
    pub fn new() -> Self {
        Self { codes: Mutex::new(Codes { current: generate_code(), next: generate_code() }) }
    }

    pub fn current(&self) -> String {
        self.codes.lock().map(|codes| codes.current.clone()).unwrap_or_default()
    }

    /// Accept a presented code. The upcoming code is also accepted and
    /// rotates in on first use.
    pub fn accept(&self, presented: &str) -> bool {
        let Ok(mut codes) = self.codes.lock() else {
            return false;
        };
        if presented == codes.current {
            return true;
        }
        if presented == codes.next {
            codes.current = std::mem::replace(&mut codes.next, generate_code());
            return true;
        }
        false
    }

    /// Rotate to a fresh code, returning it.
    pub fn advance(&self) -> String {
        let Ok(mut codes) = self.codes.lock() else {
            return String::new();
        };
        codes.current = std::mem::replace(&mut codes.next, generate_code());
        codes.current.clone()
    }
}

impl Default for AccessCodeManager {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_code() -> String {
    let mut bytes = [0u8; CODE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
