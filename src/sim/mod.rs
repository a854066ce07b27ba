//! Deterministic container simulation
//!
//! All ball physics lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by ball ID)
//! - No timers, events or platform dependencies

pub mod arc;
pub mod collision;
pub mod container;
pub mod state;

pub use arc::ArcSegment;
pub use collision::{CollisionResult, ball_ball_collision, reflect_off_wall, resolve_ball_contact};
pub use container::PhysicsContainer;
pub use state::{Agitation, Ball, DroppingBall, EscapedBall, Gate};
