//! Container entities: balls, gate, force fields

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arc::ArcSegment;
use crate::variant::BallCategory;

/// Thickness of the wall and gate barrier bands
pub const BARRIER_THICKNESS: f32 = 5.0;

/// A numbered ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub value: u32,
    pub category: BallCategory,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Set once when the ball leaves through the gate; never cleared
    pub extracted: bool,
    /// Smoothed turbulence sample (per ball so neighbours decorrelate)
    #[serde(skip)]
    pub noise: Vec2,
}

impl Ball {
    pub fn new(id: u32, value: u32, category: BallCategory, pos: Vec2, radius: f32) -> Self {
        Self {
            id,
            value,
            category,
            pos,
            vel: Vec2::ZERO,
            radius,
            extracted: false,
            noise: Vec2::ZERO,
        }
    }

    /// Participates in physics (not yet extracted)
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.extracted
    }

    /// Rescale velocity down to `max_speed` if it exceeds it
    pub fn clamp_speed(&mut self, max_speed: f32) {
        self.vel = self.vel.clamp_length_max(max_speed);
    }
}

/// The controllable section of the container wall
///
/// Closed: `barrier` holds the physical arc and nothing passes.
/// Open: `barrier` is `None` and balls may leave through `footprint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    /// Angular window the gate occupies (fixed per phase)
    footprint: ArcSegment,
    /// Physical barrier, present only while closed
    barrier: Option<ArcSegment>,
}

impl Gate {
    /// A closed gate centered on `center` spanning `span` radians
    pub fn new(radius: f32, center: f32, span: f32) -> Self {
        let footprint = ArcSegment::centered(radius, BARRIER_THICKNESS, center, span);
        Self {
            barrier: Some(footprint.clone()),
            footprint,
        }
    }

    pub fn is_open(&self) -> bool {
        self.barrier.is_none()
    }

    /// Remove the barrier. Idempotent.
    pub fn open(&mut self) {
        self.barrier = None;
    }

    /// Rebuild and re-attach the barrier. Idempotent.
    pub fn close(&mut self) {
        self.barrier = Some(ArcSegment::centered(
            self.footprint.radius,
            self.footprint.thickness,
            self.footprint.mid_angle(),
            self.footprint.angular_span(),
        ));
    }

    pub fn barrier(&self) -> Option<&ArcSegment> {
        self.barrier.as_ref()
    }

    pub fn footprint(&self) -> &ArcSegment {
        &self.footprint
    }

    pub fn arc_center(&self) -> f32 {
        self.footprint.mid_angle()
    }

    pub fn arc_span(&self) -> f32 {
        self.footprint.angular_span()
    }

    /// Whether an angle lies within the gate window
    pub fn contains_angle(&self, theta: f32) -> bool {
        self.footprint.contains_angle(theta)
    }

    /// Whether the barrier currently blocks `theta`
    pub fn blocks(&self, theta: f32) -> bool {
        self.barrier.as_ref().is_some_and(|b| b.contains_angle(theta))
    }
}

/// Force-field magnitudes applied to every live ball
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Agitation {
    pub turbulence: f32,
    pub vortex: f32,
}

impl Agitation {
    pub fn is_active(&self) -> bool {
        self.turbulence > 0.0 || self.vortex != 0.0
    }
}

/// What the container reports when a ball leaves through the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapedBall {
    pub id: u32,
    pub value: u32,
    pub category: BallCategory,
}

/// An extracted ball playing its drop-and-fade animation outside physics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppingBall {
    pub id: u32,
    pub value: u32,
    pub category: BallCategory,
    pub start: Vec2,
    pub target: Vec2,
    pub pos: Vec2,
    pub elapsed: f32,
    /// 1.0 opaque, 0.0 gone
    pub alpha: f32,
}

impl DroppingBall {
    /// Advance the animation. Returns false once fully faded.
    pub fn advance(&mut self, dt: f32, drop_duration: f32, fade_duration: f32) -> bool {
        self.elapsed += dt;
        let t = (self.elapsed / drop_duration.max(f32::EPSILON)).min(1.0);
        self.pos = self.start.lerp(self.target, t);

        let fade_elapsed = self.elapsed - drop_duration;
        if fade_elapsed > 0.0 {
            self.alpha = (1.0 - fade_elapsed / fade_duration.max(f32::EPSILON)).max(0.0);
        }
        self.alpha > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_gate_open_close_idempotent() {
        let mut gate = Gate::new(190.0, -FRAC_PI_2, 0.32);
        assert!(!gate.is_open());
        assert!(gate.blocks(-FRAC_PI_2));

        gate.open();
        gate.open();
        assert!(gate.is_open());
        assert!(!gate.blocks(-FRAC_PI_2));
        assert!(gate.contains_angle(-FRAC_PI_2));

        gate.close();
        gate.close();
        assert!(!gate.is_open());
        let barrier = gate.barrier().unwrap();
        assert!((barrier.angular_span() - gate.arc_span()).abs() < 1e-4);
        assert!((barrier.mid_angle() - gate.arc_center()).abs() < 1e-4);
        assert!((gate.arc_span() - 0.32).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_speed_rescales() {
        let mut ball = Ball::new(1, 7, BallCategory::Primary, Vec2::ZERO, 16.5);
        ball.vel = Vec2::new(300.0, 400.0);
        ball.clamp_speed(350.0);
        assert!((ball.vel.length() - 350.0).abs() < 1e-3);
        // Direction preserved
        assert!((ball.vel.normalize() - Vec2::new(0.6, 0.8)).length() < 1e-5);
    }

    #[test]
    fn test_drop_fades_out() {
        let mut drop = DroppingBall {
            id: 1,
            value: 3,
            category: BallCategory::Primary,
            start: Vec2::ZERO,
            target: Vec2::new(0.0, -100.0),
            pos: Vec2::ZERO,
            elapsed: 0.0,
            alpha: 1.0,
        };
        assert!(drop.advance(0.3, 0.3, 0.1));
        assert!((drop.pos.y + 100.0).abs() < 1e-3);
        assert!(!drop.advance(0.11, 0.3, 0.1));
    }
}
