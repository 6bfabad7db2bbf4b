//! Batch token gate.
//!
//! Validity is a shape check only. Signed keys (`BETA|user|expiry|rand|mac`) are
//! recognized so their embedded expiry can be reported, but the MAC is never checked.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// File consulted for a token when none is passed explicitly.
pub const TOKEN_FILE: &str = "beta_key.txt";

const LEGACY_PREFIX: &str = "OLD-";
const SIGNED_PREFIX: &str = "BETA";
const MIN_PLAIN_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenShape {
    Legacy,
    /// `expiry` is a unix timestamp; 0 means the key never expires.
    Signed { user: String, expiry: u64 },
    Plain,
}

impl TokenShape {
    /// True for signed keys with a non-zero expiry before `now`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        matches!(self, TokenShape::Signed { expiry, .. } if *expiry != 0 && *expiry < now)
    }

    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.is_expired_at(now)
    }
}

pub fn is_valid(token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }
    let upper = token.to_uppercase();
    upper.starts_with(LEGACY_PREFIX)
        || upper.starts_with(SIGNED_PREFIX)
        || token.chars().count() >= MIN_PLAIN_LEN
}

/// Classify a token that already passed [`is_valid`]. Invalid tokens yield None.
pub fn inspect(token: &str) -> Option<TokenShape> {
    if !is_valid(token) {
        return None;
    }
    let token = token.trim();
    if token.to_uppercase().starts_with(LEGACY_PREFIX) {
        return Some(TokenShape::Legacy);
    }
    let parts: Vec<&str> = token.split('|').collect();
    if parts.len() == 5 && parts[0] == SIGNED_PREFIX {
        let expiry = parts[2].parse::<u64>().unwrap_or(0);
        return Some(TokenShape::Signed {
            user: parts[1].to_string(),
            expiry,
        });
    }
    Some(TokenShape::Plain)
}

/// First line of the token file, trimmed. None when the file is missing or blank.
pub fn read_token_file(dir: &Path) -> Option<String> {
    let text = std::fs::read_to_string(dir.join(TOKEN_FILE)).ok()?;
    let line = text.lines().next()?.trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// `PREFIX-` followed by 16 uppercase hex characters.
pub fn generate_legacy_key<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let value: u64 = rng.r#gen();
    format!("{}-{:016X}", prefix.trim_end_matches('-'), value)
}
