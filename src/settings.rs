//! User preferences
//!
//! Persisted separately from history under its own storage key.

use serde::{Deserialize, Serialize};

use crate::error::LottoResult;
use crate::persistence::Storage;
use crate::variant::LotteryVariant;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Play sound cues
    pub sound_enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,

    // === Haptics ===
    /// Vibration feedback
    pub haptics_enabled: bool,

    // === Game ===
    /// Variant shown on launch
    pub last_variant: LotteryVariant,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            master_volume: 0.8,
            haptics_enabled: true,
            last_variant: LotteryVariant::DoubleColor,
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "lotto_mixer_settings";

    /// Volume actually applied (0 when sound is off)
    pub fn effective_volume(&self) -> f32 {
        if self.sound_enabled {
            self.master_volume.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Load settings, falling back to defaults on missing or corrupt data
    pub fn load(storage: &dyn Storage) -> Self {
        match storage.get_item(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    settings
                }
                Err(e) => {
                    log::warn!("Discarding unreadable settings: {}", e);
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Settings unavailable: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut dyn Storage) -> LottoResult<()> {
        let json = serde_json::to_string(self)?;
        storage.set_item(Self::STORAGE_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;

    #[test]
    fn test_roundtrip_through_storage() {
        let mut storage = MemoryStorage::new();
        let settings = Settings {
            sound_enabled: false,
            haptics_enabled: false,
            last_variant: LotteryVariant::Arrangement5,
            ..Default::default()
        };
        settings.save(&mut storage).unwrap();
        assert_eq!(Settings::load(&storage), settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(Settings::STORAGE_KEY, r#"{ "haptics_enabled": false }"#)
            .unwrap();
        let s = Settings::load(&storage);
        assert!(!s.haptics_enabled);
        assert!(s.sound_enabled);
        assert_eq!(s.last_variant, LotteryVariant::DoubleColor);
    }

    #[test]
    fn test_effective_volume() {
        let mut s = Settings::default();
        assert!((s.effective_volume() - 0.8).abs() < 1e-6);
        s.master_volume = 3.0;
        assert_eq!(s.effective_volume(), 1.0);
        s.sound_enabled = false;
        assert_eq!(s.effective_volume(), 0.0);
    }
}
