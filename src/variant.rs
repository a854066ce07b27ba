//! Lottery variant rules
//!
//! Static per-variant configuration: ball pools, phase count, machine style
//! and whether draw order is significant.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LottoError;

/// Which pool a ball was drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallCategory {
    /// Red balls / main digits
    Primary,
    /// Blue balls (two-phase variants only)
    Secondary,
}

impl BallCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BallCategory::Primary => "primary",
            BallCategory::Secondary => "secondary",
        }
    }
}

/// How a variant is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStyle {
    /// Physical drum with a release gate
    Mixer,
    /// Spinning digit reels
    SlotMachine,
}

/// Whether the order of drawn numbers carries meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawOrdering {
    /// Position-sensitive ("arrangement" games): keep extraction order
    Positional,
    /// Choose-a-set games: sorted ascending when the result is built
    Set,
}

/// A pool of consecutive numbers and how many are drawn from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallPool {
    pub range: RangeInclusive<u32>,
    pub count: usize,
}

impl BallPool {
    pub fn new(range: RangeInclusive<u32>, count: usize) -> Self {
        Self { range, count }
    }

    /// Every number in the pool, ascending
    pub fn numbers(&self) -> Vec<u32> {
        self.range.clone().collect()
    }

    pub fn size(&self) -> usize {
        self.range.clone().count()
    }
}

/// Full rule set for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawConfig {
    pub primary: BallPool,
    pub secondary: Option<BallPool>,
    pub style: MachineStyle,
    pub ordering: DrawOrdering,
}

impl DrawConfig {
    pub fn has_secondary(&self) -> bool {
        self.secondary.as_ref().is_some_and(|p| p.count > 0)
    }

    pub fn pool(&self, category: BallCategory) -> Option<&BallPool> {
        match category {
            BallCategory::Primary => Some(&self.primary),
            BallCategory::Secondary => self.secondary.as_ref(),
        }
    }

    /// Reel count in slot mode (one reel per drawn number)
    pub fn slot_columns(&self) -> usize {
        self.primary.count + self.secondary.as_ref().map_or(0, |p| p.count)
    }
}

/// Supported lottery games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryVariant {
    /// 6 of 33 + 1 of 16
    #[default]
    DoubleColor,
    /// 5 of 35 + 2 of 12
    SuperLotto,
    /// 3 positional digits
    Arrangement3,
    /// 5 positional digits
    Arrangement5,
    /// 3 positional digits
    ThreeD,
}

impl LotteryVariant {
    pub const ALL: [LotteryVariant; 5] = [
        LotteryVariant::DoubleColor,
        LotteryVariant::SuperLotto,
        LotteryVariant::Arrangement3,
        LotteryVariant::Arrangement5,
        LotteryVariant::ThreeD,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LotteryVariant::DoubleColor => "double_color",
            LotteryVariant::SuperLotto => "super_lotto",
            LotteryVariant::Arrangement3 => "arrangement3",
            LotteryVariant::Arrangement5 => "arrangement5",
            LotteryVariant::ThreeD => "three_d",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LotteryVariant::DoubleColor => "双色球",
            LotteryVariant::SuperLotto => "大乐透",
            LotteryVariant::Arrangement3 => "排列三",
            LotteryVariant::Arrangement5 => "排列五",
            LotteryVariant::ThreeD => "福彩3D",
        }
    }

    pub fn config(&self) -> DrawConfig {
        match self {
            LotteryVariant::DoubleColor => DrawConfig {
                primary: BallPool::new(1..=33, 6),
                secondary: Some(BallPool::new(1..=16, 1)),
                style: MachineStyle::Mixer,
                ordering: DrawOrdering::Set,
            },
            LotteryVariant::SuperLotto => DrawConfig {
                primary: BallPool::new(1..=35, 5),
                secondary: Some(BallPool::new(1..=12, 2)),
                style: MachineStyle::Mixer,
                ordering: DrawOrdering::Set,
            },
            LotteryVariant::Arrangement3 | LotteryVariant::ThreeD => DrawConfig {
                primary: BallPool::new(0..=9, 3),
                secondary: None,
                style: MachineStyle::SlotMachine,
                ordering: DrawOrdering::Positional,
            },
            LotteryVariant::Arrangement5 => DrawConfig {
                primary: BallPool::new(0..=9, 5),
                secondary: None,
                style: MachineStyle::SlotMachine,
                ordering: DrawOrdering::Positional,
            },
        }
    }
}

impl fmt::Display for LotteryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LotteryVariant {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "double_color" | "ssq" => Ok(LotteryVariant::DoubleColor),
            "super_lotto" | "dlt" => Ok(LotteryVariant::SuperLotto),
            "arrangement3" | "pl3" => Ok(LotteryVariant::Arrangement3),
            "arrangement5" | "pl5" => Ok(LotteryVariant::Arrangement5),
            "three_d" | "fc3d" | "3d" => Ok(LotteryVariant::ThreeD),
            _ => Err(LottoError::UnknownVariant(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_color_pools() {
        let cfg = LotteryVariant::DoubleColor.config();
        assert_eq!(cfg.primary.size(), 33);
        assert_eq!(cfg.primary.count, 6);
        assert!(cfg.has_secondary());
        assert_eq!(cfg.secondary.as_ref().map(|p| p.size()), Some(16));
        assert_eq!(cfg.slot_columns(), 7);
        assert_eq!(cfg.ordering, DrawOrdering::Set);
    }

    #[test]
    fn test_arrangement_is_single_phase_positional() {
        let cfg = LotteryVariant::Arrangement5.config();
        assert!(!cfg.has_secondary());
        assert_eq!(cfg.style, MachineStyle::SlotMachine);
        assert_eq!(cfg.ordering, DrawOrdering::Positional);
        assert_eq!(cfg.slot_columns(), 5);
        assert_eq!(cfg.primary.numbers(), (0..=9).collect::<Vec<_>>());
        assert!(cfg.pool(BallCategory::Secondary).is_none());
    }

    #[test]
    fn test_parse_variant_keys() {
        for v in LotteryVariant::ALL {
            assert_eq!(v.as_str().parse::<LotteryVariant>().ok(), Some(v));
        }
        assert_eq!("SSQ".parse::<LotteryVariant>().ok(), Some(LotteryVariant::DoubleColor));
        assert!(matches!(
            "keno".parse::<LotteryVariant>(),
            Err(LottoError::UnknownVariant(name)) if name == "keno"
        ));
    }
}
