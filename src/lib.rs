//! Lotto Mixer - lottery ball drawing simulation
//!
//! Core modules:
//! - `sim`: Deterministic ball container physics (fill, agitate, gate, escape)
//! - `extraction`: Phase state machine driving the container
//! - `session`: Game status and the single "tap to advance" action
//! - `slot`: Reel-based slot machine mode
//! - `persistence`: Key/value storage for history, settings and usage
//! - `tuning`: Data-driven physics and timing constants

pub mod error;
pub mod extraction;
pub mod feedback;
pub mod history;
pub mod persistence;
pub mod platform;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod sim;
pub mod slot;
pub mod tuning;
pub mod usage;
pub mod variant;

pub use error::{LottoError, LottoResult};
pub use extraction::{ExtractionController, ExtractionEvent, ExtractionPhase, PhaseCommand, PhaseKind};
pub use history::{DrawResult, History};
pub use session::{AdvanceOutcome, GameSession, SessionEvent, SessionServices, SessionStatus};
pub use settings::Settings;
pub use tuning::Tuning;
pub use variant::{BallCategory, DrawConfig, LotteryVariant, MachineStyle};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Shortest signed difference `a - b` between two angles, in [-π, π)
#[inline]
pub fn angle_delta(a: f32, b: f32) -> f32 {
    normalize_angle(a - b)
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI + 0.5) - (-PI + 0.5)).abs() < 1e-4);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
        assert!(normalize_angle(PI) < PI);
    }

    #[test]
    fn test_angle_delta_across_seam() {
        let d = angle_delta(-PI + 0.1, PI - 0.1);
        assert!((d - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_polar_roundtrip_point() {
        let p = polar_to_cartesian(10.0, -PI / 2.0);
        assert!(p.x.abs() < 1e-4);
        assert!((p.y + 10.0).abs() < 1e-4);
        let (r, theta) = cartesian_to_polar(p);
        assert!((r - 10.0).abs() < 1e-4);
        assert!((theta + PI / 2.0).abs() < 1e-4);
    }
}
