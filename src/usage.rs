//! Play entitlement
//!
//! A draw may only start when the player has free plays left or an
//! unlimited entitlement. The session asks before every start and records
//! one play per finished draw.

use serde::{Deserialize, Serialize};

use crate::error::LottoResult;
use crate::persistence::Storage;

/// Free plays before the paywall
pub const MAX_TRIAL_PLAYS: u32 = 10;

pub trait Entitlement {
    /// May a new draw start?
    fn can_play(&self) -> bool;
    /// Count one finished draw
    fn record_play(&mut self);
    /// Persist state; default is a no-op
    fn persist(&self, _storage: &mut dyn Storage) -> LottoResult<()> {
        Ok(())
    }
}

/// Always allows play
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl Entitlement for Unlimited {
    fn can_play(&self) -> bool {
        true
    }

    fn record_play(&mut self) {}
}

/// Free-trial counter with an unlimited upgrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageTracker {
    pub unlimited: bool,
    pub plays_used: u32,
    pub max_trial_plays: u32,
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self {
            unlimited: false,
            plays_used: 0,
            max_trial_plays: MAX_TRIAL_PLAYS,
        }
    }
}

impl UsageTracker {
    /// Storage key
    const STORAGE_KEY: &'static str = "lotto_mixer_usage";

    pub fn remaining(&self) -> Option<u32> {
        if self.unlimited {
            None
        } else {
            Some(self.max_trial_plays.saturating_sub(self.plays_used))
        }
    }

    pub fn set_unlimited(&mut self, unlimited: bool) {
        if self.unlimited != unlimited {
            log::info!("Unlimited entitlement {}", if unlimited { "granted" } else { "revoked" });
            self.unlimited = unlimited;
        }
    }

    /// Load usage, starting a fresh trial on missing or corrupt data
    pub fn load(storage: &dyn Storage) -> Self {
        match storage.get_item(Self::STORAGE_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable usage record: {}", e);
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Usage record unavailable: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut dyn Storage) -> LottoResult<()> {
        let json = serde_json::to_string(self)?;
        storage.set_item(Self::STORAGE_KEY, &json)
    }
}

impl Entitlement for UsageTracker {
    fn can_play(&self) -> bool {
        self.unlimited || self.plays_used < self.max_trial_plays
    }

    fn record_play(&mut self) {
        if !self.unlimited {
            self.plays_used += 1;
        }
    }

    fn persist(&self, storage: &mut dyn Storage) -> LottoResult<()> {
        self.save(storage)
    }
}
