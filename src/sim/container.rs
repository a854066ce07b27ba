//! Ball container physics
//!
//! A circular drum holding free balls, with one controllable gate arc at the
//! floor. Each tick: integrate forces, speed clamp, ball/ball contacts, then
//! boundary correction. Escape detection is a separate call so the owner can
//! serialize it against its own quota.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::f32::consts::PI;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::arc::ArcSegment;
use super::collision::{ball_ball_collision, reflect_off_wall, resolve_ball_contact};
use super::state::{Agitation, BARRIER_THICKNESS, Ball, DroppingBall, EscapedBall, Gate};
use crate::polar_to_cartesian;
use crate::tuning::ContainerTuning;
use crate::variant::BallCategory;

/// Simulated drum of balls with a release gate
#[derive(Debug, Clone)]
pub struct PhysicsContainer {
    tuning: ContainerTuning,
    /// Balls sorted by id (stable iteration order)
    balls: Vec<Ball>,
    gate: Gate,
    /// Fixed wall covering everything outside the gate window
    wall: ArcSegment,
    agitation: Agitation,
    gravity: Vec2,
    /// Owner has quota left and is actively releasing
    release_armed: bool,
    /// Extracted balls still animating
    drops: Vec<DroppingBall>,
    rng: Pcg32,
    next_id: u32,
    time_ticks: u64,
    anomalies: u32,
}

impl PhysicsContainer {
    pub fn new(tuning: ContainerTuning, seed: u64) -> Self {
        let gate = Gate::new(tuning.radius, tuning.gate_center, tuning.gate_span);
        let wall = gate.footprint().complement();
        let gravity = tuning.rest_gravity;
        Self {
            tuning,
            balls: Vec::new(),
            gate,
            wall,
            agitation: Agitation::default(),
            gravity,
            release_armed: false,
            drops: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
            time_ticks: 0,
            anomalies: 0,
        }
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Replace all balls with one fresh ball per distinct number
    pub fn fill(&mut self, numbers: impl IntoIterator<Item = u32>, category: BallCategory) {
        self.clear();
        let values: BTreeSet<u32> = numbers.into_iter().collect();
        let safe = self.tuning.radius * self.tuning.spawn_fraction;
        for value in values {
            // sqrt for uniform density over the disc
            let r = safe * self.rng.random::<f32>().sqrt();
            let theta = self.rng.random_range(-PI..PI);
            let pos = polar_to_cartesian(r, theta);
            self.spawn_at(value, category, pos);
        }
        log::debug!("Container filled with {} {} balls", self.balls.len(), category.as_str());
    }

    /// Add a single ball at rest at `pos`. Returns its id.
    pub fn spawn_at(&mut self, value: u32, category: BallCategory, pos: Vec2) -> u32 {
        let id = self.next_entity_id();
        self.balls.push(Ball::new(id, value, category, pos, self.tuning.ball_radius));
        id
    }

    /// Remove every ball and pending drop animation
    pub fn clear(&mut self) {
        self.balls.clear();
        self.drops.clear();
    }

    /// Set force-field magnitudes, clamped to safe ranges
    pub fn set_agitation(&mut self, turbulence: f32, vortex: f32) {
        let turbulence = if turbulence.is_finite() { turbulence } else { 0.0 };
        let vortex = if vortex.is_finite() { vortex } else { 0.0 };
        self.agitation = Agitation {
            turbulence: turbulence.clamp(0.0, self.tuning.max_turbulence),
            vortex: vortex.clamp(-self.tuning.max_vortex, self.tuning.max_vortex),
        };
    }

    pub fn agitation(&self) -> Agitation {
        self.agitation
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = if gravity.is_finite() { gravity } else { Vec2::ZERO };
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn open_gate(&mut self) {
        self.gate.open();
    }

    pub fn close_gate(&mut self) {
        self.gate.close();
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Allow balls at the open gate to leave. Cleared by the owner when its
    /// quota is met.
    pub fn arm_release(&mut self, armed: bool) {
        self.release_armed = armed;
    }

    pub fn is_release_armed(&self) -> bool {
        self.release_armed
    }

    /// Random impulse on every live ball (start of agitation)
    pub fn kick(&mut self) {
        let k = self.tuning.agitation_kick;
        for ball in self.balls.iter_mut().filter(|b| b.is_live()) {
            ball.vel += Vec2::new(
                self.rng.random_range(-k..=k),
                self.rng.random_range(-k..=2.0 * k),
            );
            ball.clamp_speed(self.tuning.max_speed);
        }
    }

    /// Small horizontal jolt on every live ball (each extraction pulse)
    pub fn shake(&mut self) {
        let s = self.tuning.pulse_shake;
        for ball in self.balls.iter_mut().filter(|b| b.is_live()) {
            ball.vel.x += self.rng.random_range(-s..=s);
            ball.clamp_speed(self.tuning.max_speed);
        }
    }

    /// Scale every live ball's velocity (used when agitation stops)
    pub fn damp(&mut self, factor: f32) {
        for ball in self.balls.iter_mut().filter(|b| b.is_live()) {
            ball.vel *= factor;
        }
    }

    /// Push the live ball closest to the gate mouth toward the exit.
    /// Returns the nudged ball's id.
    pub fn nudge_toward_gate(&mut self) -> Option<u32> {
        let center = self.gate.arc_center();
        let mouth = polar_to_cartesian(self.max_dist(), center);
        let exit = polar_to_cartesian(self.tuning.radius + self.tuning.escape_margin, center);
        let nudge = self.tuning.pulse_nudge;
        let max_speed = self.tuning.max_speed;

        let ball = self.balls.iter_mut().filter(|b| b.is_live()).min_by(|a, b| {
            a.pos
                .distance_squared(mouth)
                .partial_cmp(&b.pos.distance_squared(mouth))
                .unwrap_or(Ordering::Equal)
        })?;
        ball.vel += (exit - ball.pos).normalize_or_zero() * nudge;
        ball.clamp_speed(max_speed);
        Some(ball.id)
    }

    /// Advance the container by one fixed timestep
    pub fn tick(&mut self, dt: f32) {
        self.time_ticks += 1;
        self.integrate(dt);
        self.resolve_contacts();
        self.correct_boundary(dt);

        let (drop, fade) = (self.tuning.drop_duration, self.tuning.fade_duration);
        self.drops.retain_mut(|d| d.advance(dt, drop, fade));
    }

    fn integrate(&mut self, dt: f32) {
        let agitation = self.agitation;
        let blend = 1.0 - self.tuning.turbulence_smoothness.clamp(0.0, 1.0);
        let damping = (1.0 - self.tuning.linear_damping * dt).max(0.0);
        let radius = self.tuning.radius;
        let max_speed = self.tuning.max_speed;

        for ball in self.balls.iter_mut().filter(|b| b.is_live()) {
            let mut accel = self.gravity;

            if agitation.turbulence > 0.0 {
                let angle = self.rng.random_range(-PI..PI);
                let sample = Vec2::from_angle(angle) * agitation.turbulence * self.rng.random::<f32>();
                ball.noise = ball.noise.lerp(sample, blend);
                accel += ball.noise;
            } else {
                ball.noise = Vec2::ZERO;
            }

            if agitation.vortex != 0.0 {
                // Tangential swirl, stronger toward the wall
                accel += (ball.pos / radius).perp() * agitation.vortex;
            }

            ball.vel = (ball.vel + accel * dt) * damping;
            if !ball.vel.is_finite() {
                log::warn!("Ball {} velocity diverged, zeroing", ball.id);
                ball.vel = Vec2::ZERO;
                self.anomalies += 1;
            }
            ball.clamp_speed(max_speed);
            ball.pos += ball.vel * dt;
        }
    }

    fn resolve_contacts(&mut self) {
        let restitution = self.tuning.ball_restitution;
        let n = self.balls.len();
        for i in 0..n {
            if !self.balls[i].is_live() {
                continue;
            }
            for j in (i + 1)..n {
                if !self.balls[j].is_live() {
                    continue;
                }
                let (a, b) = (&self.balls[i], &self.balls[j]);
                let contact = ball_ball_collision(a.pos, a.radius, b.pos, b.radius);
                if !contact.hit {
                    continue;
                }
                let (pa, va, pb, vb) =
                    resolve_ball_contact(a.pos, a.vel, b.pos, b.vel, &contact, restitution);
                self.balls[i].pos = pa;
                self.balls[i].vel = va;
                self.balls[j].pos = pb;
                self.balls[j].vel = vb;
            }
        }
    }

    /// Whether a ball at `theta` may cross the boundary right now
    fn passable(&self, theta: f32) -> bool {
        self.release_armed && !self.wall.contains_angle(theta) && !self.gate.blocks(theta)
    }

    fn correct_boundary(&mut self, dt: f32) {
        let max_dist = self.max_dist();
        let restitution = self.tuning.wall_restitution;
        let assist = self.tuning.escape_assist;
        let max_speed = self.tuning.max_speed;

        for i in 0..self.balls.len() {
            if !self.balls[i].is_live() {
                continue;
            }
            let pos = self.balls[i].pos;
            let dist = pos.length();
            if dist <= max_dist {
                continue;
            }
            let theta = pos.y.atan2(pos.x);
            let outward = pos / dist;
            let passable = self.passable(theta);

            let ball = &mut self.balls[i];
            if passable {
                ball.vel += outward * assist * dt;
                ball.clamp_speed(max_speed);
            } else {
                ball.pos = outward * max_dist;
                ball.vel = reflect_off_wall(ball.vel, outward, restitution);
            }
        }
    }

    /// Mark and return at most one ball that has left through the gate window
    pub fn detect_escape(&mut self) -> Option<EscapedBall> {
        let escape_dist = self.tuning.radius + self.tuning.escape_margin;
        let gate = &self.gate;
        let idx = self.balls.iter().position(|b| {
            b.is_live() && b.pos.length() > escape_dist && gate.contains_angle(b.pos.y.atan2(b.pos.x))
        })?;

        let target = gate.footprint().outward_normal_at(gate.arc_center()) * self.tuning.drop_depth;
        let ball = &mut self.balls[idx];
        ball.extracted = true;
        ball.vel = Vec2::ZERO;
        ball.noise = Vec2::ZERO;

        self.drops.push(DroppingBall {
            id: ball.id,
            value: ball.value,
            category: ball.category,
            start: ball.pos,
            target,
            pos: ball.pos,
            elapsed: 0.0,
            alpha: 1.0,
        });

        log::debug!("Ball {} (value {}) escaped at tick {}", ball.id, ball.value, self.time_ticks);
        Some(EscapedBall {
            id: ball.id,
            value: ball.value,
            category: ball.category,
        })
    }

    /// Furthest a ball center may sit from the center while inside
    pub fn max_dist(&self) -> f32 {
        self.tuning.radius - self.tuning.ball_radius - BARRIER_THICKNESS / 2.0
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    #[cfg(test)]
    pub(crate) fn balls_mut(&mut self) -> &mut [Ball] {
        &mut self.balls
    }

    pub fn live_count(&self) -> usize {
        self.balls.iter().filter(|b| b.is_live()).count()
    }

    pub fn drops(&self) -> &[DroppingBall] {
        &self.drops
    }

    pub fn tuning(&self) -> &ContainerTuning {
        &self.tuning
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// Numerical anomalies repaired so far (non-finite velocities)
    pub fn anomalies(&self) -> u32 {
        self.anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use std::f32::consts::FRAC_PI_2;

    fn quiet_container() -> PhysicsContainer {
        let mut c = PhysicsContainer::new(ContainerTuning::default(), 7);
        c.set_gravity(Vec2::ZERO);
        c
    }

    #[test]
    fn test_fill_spawns_one_ball_per_number_at_rest() {
        let mut c = PhysicsContainer::new(ContainerTuning::default(), 1);
        c.fill([5, 1, 3, 3, 2], BallCategory::Primary);
        assert_eq!(c.balls().len(), 4);
        let safe = c.tuning().radius * c.tuning().spawn_fraction;
        for ball in c.balls() {
            assert!(ball.pos.length() <= safe + 1e-3);
            assert_eq!(ball.vel, Vec2::ZERO);
            assert!(!ball.extracted);
        }
        let values: Vec<u32> = c.balls().iter().map(|b| b.value).collect();
        assert_eq!(values, vec![1, 2, 3, 5]);

        // Refill clears and keeps ids unique across fills
        let first_ids: Vec<u32> = c.balls().iter().map(|b| b.id).collect();
        c.fill(1..=3, BallCategory::Secondary);
        assert_eq!(c.balls().len(), 3);
        assert!(c.balls().iter().all(|b| !first_ids.contains(&b.id)));
        assert!(c.balls().iter().all(|b| b.category == BallCategory::Secondary));
    }

    #[test]
    fn test_set_agitation_clamps() {
        let mut c = quiet_container();
        c.set_agitation(1.0e9, -1.0e9);
        assert_eq!(c.agitation().turbulence, c.tuning().max_turbulence);
        assert_eq!(c.agitation().vortex, -c.tuning().max_vortex);

        c.set_agitation(f32::NAN, f32::INFINITY);
        assert_eq!(c.agitation(), Agitation::default());

        c.set_agitation(-5.0, 10.0);
        assert_eq!(c.agitation().turbulence, 0.0);
        assert_eq!(c.agitation().vortex, 10.0);
    }

    #[test]
    fn test_speed_clamped_not_dropped() {
        let mut c = quiet_container();
        c.spawn_at(1, BallCategory::Primary, Vec2::ZERO);
        c.balls_mut()[0].vel = Vec2::new(5000.0, 0.0);
        c.tick(SIM_DT);
        assert_eq!(c.live_count(), 1);
        assert!(c.balls()[0].vel.length() <= c.tuning().max_speed + 1e-3);
    }

    #[test]
    fn test_closed_gate_pushes_ball_back() {
        let mut c = quiet_container();
        let max_dist = c.max_dist();
        c.spawn_at(1, BallCategory::Primary, polar_to_cartesian(max_dist + 20.0, -FRAC_PI_2));
        c.balls_mut()[0].vel = Vec2::new(0.0, -300.0);
        c.arm_release(true);

        for _ in 0..60 {
            c.tick(SIM_DT);
            assert!(c.detect_escape().is_none());
            assert!(c.balls()[0].pos.length() <= max_dist + 1e-2);
        }
        assert!(!c.balls()[0].extracted);
    }

    #[test]
    fn test_open_but_unarmed_gate_holds_balls() {
        let mut c = quiet_container();
        let max_dist = c.max_dist();
        c.spawn_at(1, BallCategory::Primary, polar_to_cartesian(max_dist - 1.0, -FRAC_PI_2));
        c.balls_mut()[0].vel = Vec2::new(0.0, -300.0);
        c.open_gate();

        for _ in 0..60 {
            c.tick(SIM_DT);
            assert!(c.detect_escape().is_none());
        }
        assert!(c.balls()[0].pos.length() <= max_dist + 1e-2);
    }

    #[test]
    fn test_open_armed_gate_releases_ball_once() {
        let mut c = quiet_container();
        let max_dist = c.max_dist();
        c.spawn_at(9, BallCategory::Secondary, polar_to_cartesian(max_dist - 1.0, -FRAC_PI_2));
        c.balls_mut()[0].vel = Vec2::new(0.0, -300.0);
        c.open_gate();
        c.arm_release(true);

        let mut escapes = Vec::new();
        for _ in 0..240 {
            c.tick(SIM_DT);
            if let Some(e) = c.detect_escape() {
                escapes.push(e);
            }
        }
        assert_eq!(escapes.len(), 1);
        assert_eq!(escapes[0].value, 9);
        assert_eq!(escapes[0].category, BallCategory::Secondary);
        assert!(c.balls()[0].extracted);
        assert_eq!(c.live_count(), 0);
    }

    #[test]
    fn test_wall_never_releases_outside_gate() {
        let mut c = quiet_container();
        let max_dist = c.max_dist();
        // Heading straight out through the side wall
        c.spawn_at(1, BallCategory::Primary, polar_to_cartesian(max_dist - 1.0, 0.0));
        c.balls_mut()[0].vel = Vec2::new(350.0, 0.0);
        c.open_gate();
        c.arm_release(true);

        for _ in 0..240 {
            c.tick(SIM_DT);
            assert!(c.detect_escape().is_none());
            assert!(c.balls()[0].pos.length() <= max_dist + 1e-2);
        }
    }

    #[test]
    fn test_detect_escape_reports_one_ball_per_call() {
        let mut c = quiet_container();
        let r = c.tuning().radius + c.tuning().escape_margin + 5.0;
        c.spawn_at(1, BallCategory::Primary, polar_to_cartesian(r, -FRAC_PI_2 - 0.05));
        c.spawn_at(2, BallCategory::Primary, polar_to_cartesian(r, -FRAC_PI_2 + 0.05));

        let first = c.detect_escape().unwrap();
        assert_eq!(first.value, 1);
        let second = c.detect_escape().unwrap();
        assert_eq!(second.value, 2);
        assert!(c.detect_escape().is_none());
        assert_eq!(c.drops().len(), 2);
    }

    #[test]
    fn test_extracted_ball_is_frozen() {
        let mut c = quiet_container();
        let r = c.tuning().radius + c.tuning().escape_margin + 5.0;
        c.spawn_at(1, BallCategory::Primary, polar_to_cartesian(r, -FRAC_PI_2));
        assert!(c.detect_escape().is_some());
        let pos = c.balls()[0].pos;
        c.set_gravity(Vec2::new(0.0, -980.0));
        for _ in 0..60 {
            c.tick(SIM_DT);
        }
        assert_eq!(c.balls()[0].pos, pos);
        assert!(c.detect_escape().is_none());
        // Cosmetic drop finishes and is discarded
        assert!(c.drops().is_empty());
    }

    #[test]
    fn test_nudge_targets_ball_nearest_gate() {
        let mut c = quiet_container();
        let far = c.spawn_at(1, BallCategory::Primary, Vec2::new(0.0, 100.0));
        let near = c.spawn_at(2, BallCategory::Primary, Vec2::new(0.0, -100.0));
        assert_eq!(c.nudge_toward_gate(), Some(near));
        assert_ne!(near, far);
        // Nudged ball now heads down toward the gate
        assert!(c.balls()[1].vel.y < 0.0);
        assert_eq!(c.balls()[0].vel, Vec2::ZERO);
    }

    #[test]
    fn test_agitated_balls_stay_inside() {
        let mut c = PhysicsContainer::new(ContainerTuning::default(), 42);
        c.fill(1..=33, BallCategory::Primary);
        c.set_gravity(c.tuning().agitation_gravity);
        let (t, v) = (c.tuning().agitation_turbulence, c.tuning().agitation_vortex);
        c.set_agitation(t, v);
        c.kick();

        let max_dist = c.max_dist();
        for _ in 0..600 {
            c.tick(SIM_DT);
            assert!(c.detect_escape().is_none());
        }
        assert_eq!(c.live_count(), 33);
        for ball in c.balls() {
            assert!(ball.pos.length() <= max_dist + 1e-2);
            assert!(ball.vel.is_finite());
        }
    }
}
