//! Ball/ball contact detection and response
//!
//! Balls are equal-mass discs. Overlaps are resolved by splitting the
//! penetration between both balls and exchanging the normal velocity.

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact normal pointing from `b` toward `a`
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check overlap between two discs
pub fn ball_ball_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let delta = a_pos - b_pos;
    let min_dist = a_radius + b_radius;
    let dist_sq = delta.length_squared();

    if dist_sq >= min_dist * min_dist {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    // Coincident centers: pick a stable axis
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::Y };

    CollisionResult {
        hit: true,
        normal,
        penetration: min_dist - dist,
    }
}

/// Separate two overlapping equal-mass balls and exchange normal velocity.
///
/// Returns the corrected (pos_a, vel_a, pos_b, vel_b).
pub fn resolve_ball_contact(
    pos_a: Vec2,
    vel_a: Vec2,
    pos_b: Vec2,
    vel_b: Vec2,
    contact: &CollisionResult,
    restitution: f32,
) -> (Vec2, Vec2, Vec2, Vec2) {
    let correction = contact.normal * (contact.penetration / 2.0);
    let pos_a = pos_a + correction;
    let pos_b = pos_b - correction;

    let closing = (vel_a - vel_b).dot(contact.normal);
    if closing >= 0.0 {
        // Already separating
        return (pos_a, vel_a, pos_b, vel_b);
    }

    let impulse = -(1.0 + restitution) * closing / 2.0;
    let vel_a = vel_a + contact.normal * impulse;
    let vel_b = vel_b - contact.normal * impulse;
    (pos_a, vel_a, pos_b, vel_b)
}

/// Reflect the outward component of `vel` against a wall with normal `outward`
pub fn reflect_off_wall(vel: Vec2, outward: Vec2, restitution: f32) -> Vec2 {
    let vn = vel.dot(outward);
    if vn <= 0.0 {
        return vel;
    }
    vel - outward * vn * (1.0 + restitution)
}
