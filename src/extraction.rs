//! Extraction state machine
//!
//! Drives a `PhysicsContainer` through one draw phase:
//!
//! `Idle → Agitating → Settling → Extracting → Complete`
//!
//! Transitions are linear. Phase durations and gate pulses are scheduled
//! timers; a new phase or a reset cancels them by bumping the scheduler
//! generation. At most one ball is accepted per gate pulse, and the gate is
//! closed as soon as it is accepted.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::scheduler::Scheduler;
use crate::sim::PhysicsContainer;
use crate::tuning::{ContainerTuning, TimingTuning, Tuning};
use crate::variant::BallCategory;

/// Step within a single draw phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    Idle,
    Agitating,
    Settling,
    Extracting,
    Complete,
}

/// Current phase with its quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPhase {
    pub kind: PhaseKind,
    pub category: BallCategory,
    pub target: usize,
    pub extracted_so_far: usize,
}

impl ExtractionPhase {
    pub fn idle() -> Self {
        Self {
            kind: PhaseKind::Idle,
            category: BallCategory::Primary,
            target: 0,
            extracted_so_far: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.target - self.extracted_so_far
    }

    pub fn has_quota(&self) -> bool {
        self.extracted_so_far < self.target
    }

    /// Count one extraction. Refuses once the quota is met.
    fn record(&mut self) -> bool {
        if !self.has_quota() {
            return false;
        }
        self.extracted_so_far += 1;
        true
    }
}

/// "Start phase" command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCommand {
    /// Numbers to fill the container with
    pub numbers: Vec<u32>,
    pub category: BallCategory,
    /// How many balls to release
    pub target: usize,
}

/// Signals emitted by the controller, delivered FIFO
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionEvent {
    /// Container filled and churning
    AgitationStarted { category: BallCategory, target: usize },
    /// Gate pulses begin
    ExtractionStarted { category: BallCategory },
    /// One ball left through the gate
    BallSelected {
        value: u32,
        category: BallCategory,
        /// 1-based pulse the ball was released on
        pulse: u32,
    },
    /// Gate closed for good this phase
    ExtractionStopped { category: BallCategory },
    /// Phase finished; `numbers` in extraction order
    PhaseComplete {
        category: BallCategory,
        numbers: Vec<u32>,
        /// Completed by the pulse budget rather than by quota
        forced: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseTimer {
    EndAgitation,
    EndSettle,
    Pulse,
}

pub struct ExtractionController {
    container: PhysicsContainer,
    timing: TimingTuning,
    phase: ExtractionPhase,
    scheduler: Scheduler<PhaseTimer>,
    /// Numbers extracted this phase, in order
    extracted: Vec<u32>,
    pulses_fired: u32,
    pulse_budget: u32,
    /// Gate opened by a pulse and no ball accepted yet
    pulse_open: bool,
    events: VecDeque<ExtractionEvent>,
    anomalies: u32,
}

impl ExtractionController {
    pub fn new(tuning: &Tuning, seed: u64) -> Self {
        Self::with_container(PhysicsContainer::new(tuning.container.clone(), seed), tuning.timing.clone())
    }

    pub fn with_container(container: PhysicsContainer, timing: TimingTuning) -> Self {
        Self {
            container,
            timing,
            phase: ExtractionPhase::idle(),
            scheduler: Scheduler::new(),
            extracted: Vec::new(),
            pulses_fired: 0,
            pulse_budget: 0,
            pulse_open: false,
            events: VecDeque::new(),
            anomalies: 0,
        }
    }

    fn container_tuning(&self) -> &ContainerTuning {
        self.container.tuning()
    }

    /// Begin a phase: fill, agitate and schedule settling.
    ///
    /// Any phase in progress is abandoned first.
    pub fn start_phase(&mut self, command: PhaseCommand) {
        if self.phase.kind != PhaseKind::Idle {
            self.abandon_phase();
        }

        let PhaseCommand {
            numbers,
            category,
            target,
        } = command;

        self.container.fill(numbers, category);
        let available = self.container.live_count();
        let target = if target > available {
            log::warn!("Target {} exceeds {} balls in container, clamping", target, available);
            self.anomalies += 1;
            available
        } else {
            target
        };

        self.phase = ExtractionPhase {
            kind: PhaseKind::Agitating,
            category,
            target,
            extracted_so_far: 0,
        };
        self.extracted.clear();
        self.pulses_fired = 0;
        self.pulse_budget = self.timing.pulse_budget(target);
        self.pulse_open = false;

        let (gravity, turbulence, vortex) = {
            let t = self.container_tuning();
            (t.agitation_gravity, t.agitation_turbulence, t.agitation_vortex)
        };
        self.container.close_gate();
        self.container.arm_release(false);
        self.container.set_gravity(gravity);
        self.container.set_agitation(turbulence, vortex);
        self.container.kick();

        log::info!(
            "Phase started: {} balls, drawing {} {}",
            available,
            target,
            category.as_str()
        );
        self.events.push_back(ExtractionEvent::AgitationStarted { category, target });

        if target == 0 {
            self.complete(false);
            return;
        }
        self.scheduler.schedule(self.timing.agitation_duration, PhaseTimer::EndAgitation);
    }

    /// Fill the container without starting a phase (static preview)
    pub fn preload(&mut self, numbers: Vec<u32>, category: BallCategory) {
        self.abandon_phase();
        self.container.fill(numbers, category);
        let gravity = self.container_tuning().rest_gravity;
        self.container.set_gravity(gravity);
    }

    /// Cancel everything and return to `Idle` with an empty container.
    /// Undelivered events from the abandoned phase are discarded.
    pub fn reset(&mut self) {
        self.abandon_phase();
        self.container.clear();
        self.events.clear();
    }

    fn abandon_phase(&mut self) {
        if matches!(
            self.phase.kind,
            PhaseKind::Agitating | PhaseKind::Settling | PhaseKind::Extracting
        ) {
            log::info!("Abandoning {:?} phase", self.phase.kind);
        }
        self.scheduler.cancel_all();
        self.phase = ExtractionPhase::idle();
        self.extracted.clear();
        self.pulses_fired = 0;
        self.pulse_budget = 0;
        self.pulse_open = false;

        let gravity = self.container_tuning().rest_gravity;
        self.container.close_gate();
        self.container.arm_release(false);
        self.container.set_agitation(0.0, 0.0);
        self.container.set_gravity(gravity);
    }

    /// Advance timers, physics and escape detection by one fixed timestep
    pub fn tick(&mut self, dt: f32) {
        for fired in self.scheduler.advance(dt) {
            // An earlier timer in this batch may have ended the phase
            if !self.scheduler.is_current(fired.generation) {
                log::trace!("Skipping stale {:?}", fired.payload);
                continue;
            }
            self.on_timer(fired.payload);
        }

        self.container.tick(dt);

        if self.phase.kind == PhaseKind::Extracting && self.pulse_open {
            if let Some(ball) = self.container.detect_escape() {
                self.accept_ball(ball.value, ball.category);
            }
        }
    }

    fn on_timer(&mut self, timer: PhaseTimer) {
        match (timer, self.phase.kind) {
            (PhaseTimer::EndAgitation, PhaseKind::Agitating) => self.begin_settling(),
            (PhaseTimer::EndSettle, PhaseKind::Settling) => self.begin_extracting(),
            (PhaseTimer::Pulse, PhaseKind::Extracting) => self.pulse(),
            (timer, kind) => {
                log::warn!("Ignoring {:?} timer in {:?} phase", timer, kind);
            }
        }
    }

    fn begin_settling(&mut self) {
        let (gravity, damping) = {
            let t = self.container_tuning();
            (t.settle_gravity, t.settle_damping)
        };
        self.phase.kind = PhaseKind::Settling;
        self.container.set_agitation(0.0, 0.0);
        self.container.set_gravity(gravity);
        self.container.damp(damping);
        log::debug!("Settling");
        self.scheduler.schedule(self.timing.settle_duration, PhaseTimer::EndSettle);
    }

    fn begin_extracting(&mut self) {
        self.phase.kind = PhaseKind::Extracting;
        log::debug!("Extracting with budget of {} pulses", self.pulse_budget);
        self.events.push_back(ExtractionEvent::ExtractionStarted {
            category: self.phase.category,
        });
        self.pulse();
    }

    fn pulse(&mut self) {
        if self.pulses_fired >= self.pulse_budget {
            log::warn!(
                "Pulse budget exhausted with {}/{} balls, forcing completion",
                self.phase.extracted_so_far,
                self.phase.target
            );
            self.anomalies += 1;
            self.complete(true);
            return;
        }

        self.pulses_fired += 1;
        if self.phase.has_quota() {
            self.container.open_gate();
            self.container.arm_release(true);
            self.container.shake();
            self.container.nudge_toward_gate();
            self.pulse_open = true;
            log::debug!("Pulse {} opened gate", self.pulses_fired);
        }
        self.scheduler.schedule(self.timing.pulse_interval, PhaseTimer::Pulse);
    }

    fn accept_ball(&mut self, value: u32, category: BallCategory) {
        // Debounce: nothing else leaves until the next pulse
        self.pulse_open = false;
        self.container.close_gate();
        self.container.arm_release(false);

        if !self.phase.record() {
            // Unreachable while the gate is only opened with quota left
            log::warn!("Ball {} escaped with no quota left", value);
            self.anomalies += 1;
            return;
        }
        self.extracted.push(value);
        self.events.push_back(ExtractionEvent::BallSelected {
            value,
            category,
            pulse: self.pulses_fired,
        });

        if !self.phase.has_quota() {
            self.complete(false);
        }
    }

    fn complete(&mut self, forced: bool) {
        self.scheduler.cancel_all();
        self.pulse_open = false;
        self.container.close_gate();
        self.container.arm_release(false);
        self.container.set_agitation(0.0, 0.0);
        self.phase.kind = PhaseKind::Complete;

        let category = self.phase.category;
        log::info!(
            "Phase complete: {:?} ({} of {}{})",
            self.extracted,
            self.phase.extracted_so_far,
            self.phase.target,
            if forced { ", forced" } else { "" }
        );
        self.events.push_back(ExtractionEvent::ExtractionStopped { category });
        self.events.push_back(ExtractionEvent::PhaseComplete {
            category,
            numbers: self.extracted.clone(),
            forced,
        });
    }

    /// Take all pending events in emission order
    pub fn drain_events(&mut self) -> Vec<ExtractionEvent> {
        self.events.drain(..).collect()
    }

    pub fn phase(&self) -> &ExtractionPhase {
        &self.phase
    }

    pub fn container(&self) -> &PhysicsContainer {
        &self.container
    }

    pub fn extracted(&self) -> &[u32] {
        &self.extracted
    }

    pub fn pulses_fired(&self) -> u32 {
        self.pulses_fired
    }

    /// Current timer generation (changes on every reset or completion)
    pub fn generation(&self) -> u64 {
        self.scheduler.generation()
    }

    /// Recoverable anomalies seen so far (forced completions, clamped
    /// targets, repaired velocities)
    pub fn anomalies(&self) -> u32 {
        self.anomalies + self.container.anomalies()
    }
}
