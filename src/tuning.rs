//! Data-driven physics and timing constants
//!
//! Every tunable of the mixer lives here so control flow never carries
//! magic numbers. Loadable from JSON; missing fields fall back to defaults.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{LottoError, LottoResult};
use crate::sim::state::BARRIER_THICKNESS;

/// Reject a tuning value with a description of the broken constraint
fn ensure(ok: bool, constraint: &str) -> LottoResult<()> {
    if ok {
        Ok(())
    } else {
        Err(LottoError::InvalidTuning(constraint.to_string()))
    }
}

/// Geometry and force constants for the ball container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerTuning {
    /// Container wall radius
    pub radius: f32,
    /// Ball radius
    pub ball_radius: f32,
    /// Balls spawn within `radius * spawn_fraction` of the center
    pub spawn_fraction: f32,
    /// Gate arc center (radians, -π/2 is the floor)
    pub gate_center: f32,
    /// Gate arc angular span (radians)
    pub gate_span: f32,
    /// Speed clamp (units/s)
    pub max_speed: f32,
    /// Linear damping per second
    pub linear_damping: f32,
    /// Velocity retained when bouncing off the wall
    pub wall_restitution: f32,
    /// Velocity retained in ball/ball contacts
    pub ball_restitution: f32,
    /// How far past the wall a ball must travel to count as escaped
    pub escape_margin: f32,
    /// Outward acceleration applied to a ball passing through the open gate
    pub escape_assist: f32,
    /// Gravity while idle
    pub rest_gravity: Vec2,
    /// Gravity while agitating (air jet lifts the balls)
    pub agitation_gravity: Vec2,
    /// Gravity while settling and extracting
    pub settle_gravity: Vec2,
    /// Turbulence strength while agitating
    pub agitation_turbulence: f32,
    /// Vortex strength while agitating
    pub agitation_vortex: f32,
    /// Turbulence noise smoothness (0 = white noise, 1 = frozen)
    pub turbulence_smoothness: f32,
    /// Upper clamp for turbulence
    pub max_turbulence: f32,
    /// Absolute clamp for vortex
    pub max_vortex: f32,
    /// Random velocity kick given to each ball when agitation starts
    pub agitation_kick: f32,
    /// Horizontal shake applied to every ball on each extraction pulse
    pub pulse_shake: f32,
    /// Velocity toward the gate mouth given to the nearest ball on each pulse
    pub pulse_nudge: f32,
    /// Velocity retained when agitation stops
    pub settle_damping: f32,
    /// Cosmetic drop duration after escape (seconds)
    pub drop_duration: f32,
    /// Cosmetic fade duration after the drop (seconds)
    pub fade_duration: f32,
    /// Drop target below the container center
    pub drop_depth: f32,
}

impl Default for ContainerTuning {
    fn default() -> Self {
        Self {
            radius: 190.0,
            ball_radius: 16.5,
            spawn_fraction: 0.6,
            gate_center: -std::f32::consts::FRAC_PI_2,
            gate_span: 0.32,
            max_speed: 350.0,
            linear_damping: 0.2,
            wall_restitution: 0.8,
            ball_restitution: 0.5,
            escape_margin: 30.0,
            escape_assist: 900.0,
            rest_gravity: Vec2::new(0.0, -980.0),
            agitation_gravity: Vec2::new(0.0, 900.0),
            settle_gravity: Vec2::new(0.0, -600.0),
            agitation_turbulence: 3000.0,
            agitation_vortex: 300.0,
            turbulence_smoothness: 0.4,
            max_turbulence: 6000.0,
            max_vortex: 2000.0,
            agitation_kick: 200.0,
            pulse_shake: 60.0,
            pulse_nudge: 220.0,
            settle_damping: 0.5,
            drop_duration: 0.3,
            fade_duration: 0.1,
            drop_depth: 260.0,
        }
    }
}

impl ContainerTuning {
    pub fn validate(&self) -> LottoResult<()> {
        let scalars = [
            self.radius,
            self.ball_radius,
            self.spawn_fraction,
            self.gate_center,
            self.gate_span,
            self.max_speed,
            self.linear_damping,
            self.wall_restitution,
            self.ball_restitution,
            self.escape_margin,
            self.escape_assist,
            self.agitation_turbulence,
            self.agitation_vortex,
            self.turbulence_smoothness,
            self.max_turbulence,
            self.max_vortex,
            self.agitation_kick,
            self.pulse_shake,
            self.pulse_nudge,
            self.settle_damping,
            self.drop_duration,
            self.fade_duration,
            self.drop_depth,
        ];
        ensure(scalars.iter().all(|v| v.is_finite()), "container values must be finite")?;
        ensure(
            self.rest_gravity.is_finite() && self.agitation_gravity.is_finite() && self.settle_gravity.is_finite(),
            "gravity vectors must be finite",
        )?;
        ensure(self.ball_radius > 0.0, "ball_radius must be positive")?;
        ensure(
            self.radius - self.ball_radius - BARRIER_THICKNESS > 0.0,
            "ball_radius must be smaller than radius",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.spawn_fraction),
            "spawn_fraction must be within [0, 1]",
        )?;
        ensure(
            self.gate_span > 0.0 && self.gate_span < std::f32::consts::TAU,
            "gate_span must be within (0, 2π)",
        )?;
        ensure(self.max_speed > 0.0, "max_speed must be positive")?;
        ensure(
            [
                self.linear_damping,
                self.wall_restitution,
                self.ball_restitution,
                self.escape_margin,
                self.escape_assist,
                self.agitation_turbulence,
                self.max_turbulence,
                self.max_vortex,
                self.agitation_kick,
                self.pulse_shake,
                self.pulse_nudge,
                self.settle_damping,
                self.drop_duration,
                self.fade_duration,
            ]
            .iter()
            .all(|v| *v >= 0.0),
            "container magnitudes must be non-negative",
        )?;
        Ok(())
    }
}

/// Phase durations for the extraction state machine (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingTuning {
    /// Time spent churning before the balls are allowed to settle
    pub agitation_duration: f32,
    /// Time spent settling before the first gate pulse
    pub settle_duration: f32,
    /// Interval between gate pulses
    pub pulse_interval: f32,
    /// Extra pulses allowed beyond the target before forcing completion
    pub pulse_margin: u32,
}

impl Default for TimingTuning {
    fn default() -> Self {
        Self {
            agitation_duration: 7.0,
            settle_duration: 1.5,
            pulse_interval: 1.2,
            pulse_margin: 4,
        }
    }
}

impl TimingTuning {
    pub fn validate(&self) -> LottoResult<()> {
        ensure(
            self.agitation_duration.is_finite() && self.agitation_duration >= 0.0,
            "agitation_duration must be non-negative",
        )?;
        ensure(
            self.settle_duration.is_finite() && self.settle_duration >= 0.0,
            "settle_duration must be non-negative",
        )?;
        ensure(
            self.pulse_interval.is_finite() && self.pulse_interval > 0.0,
            "pulse_interval must be positive",
        )
    }

    /// Maximum number of pulses for a phase drawing `target` balls
    pub fn pulse_budget(&self, target: usize) -> u32 {
        target as u32 + self.pulse_margin
    }
}

/// Reel timings for slot-machine mode (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotTuning {
    /// Delay between consecutive reels starting to spin
    pub spin_stagger: f32,
    /// Step interval of a freshly released reel
    pub initial_interval: f32,
    /// Interval multiplier per step while accelerating
    pub acceleration: f32,
    /// Fastest step interval; at full speed steps jitter around it
    pub min_interval: f32,
    pub jitter_min: f32,
    pub jitter_max: f32,
    /// Delay between consecutive reels receiving their target
    pub stop_stagger: f32,
    /// Time for a stopping reel to reach full deceleration
    pub decel_duration: f32,
    /// Step interval at the start of deceleration
    pub decel_base_interval: f32,
    /// Interval added over the full deceleration
    pub decel_interval_range: f32,
    /// Deceleration progress after which a reel may land
    pub land_progress: f32,
}

impl Default for SlotTuning {
    fn default() -> Self {
        Self {
            spin_stagger: 0.15,
            initial_interval: 0.3,
            acceleration: 0.85,
            min_interval: 0.05,
            jitter_min: 0.04,
            jitter_max: 0.06,
            stop_stagger: 1.0,
            decel_duration: 2.0,
            decel_base_interval: 0.05,
            decel_interval_range: 0.13,
            land_progress: 0.9,
        }
    }
}

impl SlotTuning {
    pub fn validate(&self) -> LottoResult<()> {
        let durations = [
            self.initial_interval,
            self.min_interval,
            self.jitter_min,
            self.decel_duration,
            self.decel_base_interval,
        ];
        ensure(
            durations.iter().all(|v| v.is_finite() && *v > 0.0),
            "reel intervals and durations must be positive",
        )?;
        ensure(
            [self.spin_stagger, self.stop_stagger, self.decel_interval_range]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0),
            "reel staggers must be non-negative",
        )?;
        ensure(
            self.jitter_max.is_finite() && self.jitter_min <= self.jitter_max,
            "jitter_min must not exceed jitter_max",
        )?;
        ensure(
            self.acceleration > 0.0 && self.acceleration <= 1.0,
            "acceleration must be within (0, 1]",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.land_progress),
            "land_progress must be within [0, 1]",
        )
    }

    /// Step interval for a stopping reel at `progress` in [0, 1]
    pub fn decel_interval(&self, progress: f32) -> f32 {
        self.decel_base_interval + self.decel_interval_range * progress.clamp(0.0, 1.0)
    }
}

/// Complete tuning set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub container: ContainerTuning,
    pub timing: TimingTuning,
    pub slot: SlotTuning,
}

impl Tuning {
    /// Parse and validate; rejected values are configuration errors
    pub fn from_json(json: &str) -> LottoResult<Self> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> LottoResult<()> {
        self.container.validate()?;
        self.timing.validate()?;
        self.slot.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "timing": { "agitation_duration": 2.0 } }"#).unwrap();
        assert_eq!(tuning.timing.agitation_duration, 2.0);
        assert_eq!(tuning.timing.settle_duration, 1.5);
        assert_eq!(tuning.container, ContainerTuning::default());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(Tuning::from_json("{ not json").is_err());
    }

    fn rejected(json: &str) -> bool {
        matches!(Tuning::from_json(json), Err(LottoError::InvalidTuning(_)))
    }

    #[test]
    fn test_defaults_validate() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_negative_kick_and_shake_rejected() {
        assert!(rejected(r#"{ "container": { "agitation_kick": -5.0 } }"#));
        assert!(rejected(r#"{ "container": { "pulse_shake": -1.0 } }"#));
        assert!(rejected(r#"{ "container": { "max_vortex": -10.0 } }"#));
    }

    #[test]
    fn test_inverted_jitter_rejected() {
        assert!(rejected(r#"{ "slot": { "jitter_min": 0.08, "jitter_max": 0.02 } }"#));
    }

    #[test]
    fn test_oversized_ball_rejected() {
        assert!(rejected(r#"{ "container": { "radius": 20.0, "ball_radius": 16.5 } }"#));
        assert!(rejected(r#"{ "container": { "ball_radius": 0.0 } }"#));
    }

    #[test]
    fn test_non_positive_durations_rejected() {
        assert!(rejected(r#"{ "timing": { "pulse_interval": 0.0 } }"#));
        assert!(rejected(r#"{ "timing": { "settle_duration": -1.0 } }"#));
        assert!(rejected(r#"{ "slot": { "decel_duration": 0.0 } }"#));
        assert!(rejected(r#"{ "slot": { "acceleration": 1.5 } }"#));
    }

    #[test]
    fn test_pulse_budget() {
        let timing = TimingTuning::default();
        assert_eq!(timing.pulse_budget(6), 10);
        assert_eq!(timing.pulse_budget(0), 4);
    }

    #[test]
    fn test_decel_interval_ramps() {
        let slot = SlotTuning::default();
        assert!((slot.decel_interval(0.0) - 0.05).abs() < 1e-6);
        assert!((slot.decel_interval(1.0) - 0.18).abs() < 1e-6);
        assert!((slot.decel_interval(5.0) - 0.18).abs() < 1e-6);
    }
}
