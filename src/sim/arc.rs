//! Arc geometry for the container wall and its gate
//!
//! The container boundary is a circle split into two arcs: the gate arc,
//! which can be opened, and the wall arc covering everything else.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{angle_delta, normalize_angle, polar_to_cartesian};

/// A thickened arc segment in polar space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcSegment {
    /// Centerline radius from container center
    pub radius: f32,
    /// Radial thickness (extends radius ± thickness/2)
    pub thickness: f32,
    /// Start angle (radians, normalized to [-π, π))
    pub theta_start: f32,
    /// End angle (radians, normalized to [-π, π)), counter-clockwise from start
    pub theta_end: f32,
}

impl ArcSegment {
    pub fn new(radius: f32, thickness: f32, theta_start: f32, theta_end: f32) -> Self {
        Self {
            radius,
            thickness,
            theta_start: normalize_angle(theta_start),
            theta_end: normalize_angle(theta_end),
        }
    }

    /// Arc spanning `span` radians centered on `center`
    pub fn centered(radius: f32, thickness: f32, center: f32, span: f32) -> Self {
        Self::new(radius, thickness, center - span / 2.0, center + span / 2.0)
    }

    /// The rest of the circle at the same radius
    pub fn complement(&self) -> Self {
        Self::new(self.radius, self.thickness, self.theta_end, self.theta_start)
    }

    /// Angular span of the arc (handles wraparound)
    pub fn angular_span(&self) -> f32 {
        let mut span = self.theta_end - self.theta_start;
        if span < 0.0 {
            span += std::f32::consts::TAU;
        }
        span
    }

    /// Angle halfway along the arc
    pub fn mid_angle(&self) -> f32 {
        normalize_angle(self.theta_start + self.angular_span() / 2.0)
    }

    /// Signed angular distance of `theta` from the arc's mid angle
    pub fn offset_from_mid(&self, theta: f32) -> f32 {
        angle_delta(theta, self.mid_angle())
    }

    /// Check if an angle is within the arc's angular extent
    pub fn contains_angle(&self, theta: f32) -> bool {
        let theta = normalize_angle(theta);
        let start = self.theta_start;
        let end = self.theta_end;

        if start <= end {
            theta >= start && theta <= end
        } else {
            // Wraparound case (e.g., start=170°, end=-170°)
            theta >= start || theta <= end
        }
    }

    /// Point on the centerline at the mid angle
    pub fn mouth(&self) -> Vec2 {
        polar_to_cartesian(self.radius, self.mid_angle())
    }

    /// Unit vector pointing away from the container center at `theta`
    pub fn outward_normal_at(&self, theta: f32) -> Vec2 {
        Vec2::new(theta.cos(), theta.sin())
    }
}
