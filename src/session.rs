//! Game session
//!
//! Holds the overall draw status and exposes the single user action, "tap to
//! advance". The session never touches physics directly: it issues phase
//! commands to the `ExtractionController` (or spins the `SlotMachine`) and
//! reacts to the events they emit.
//!
//! Both machines are pumped synchronously from `tick`, so every event is
//! handled on the same logical thread that produced it.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::error::LottoResult;
use crate::extraction::{ExtractionController, ExtractionEvent, ExtractionPhase, PhaseCommand};
use crate::feedback::{Feedback, FeedbackRouter, FeedbackSink, HapticStyle, NullFeedback, SoundEffect, SoundLoop};
use crate::history::{DrawResult, History};
use crate::persistence::{MemoryStorage, Storage};
use crate::platform;
use crate::settings::Settings;
use crate::slot::{SlotEvent, SlotMachine};
use crate::tuning::Tuning;
use crate::usage::{Entitlement, Unlimited};
use crate::variant::{BallCategory, DrawConfig, LotteryVariant, MachineStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    RunningPrimary,
    /// Two-phase variants only: primary done, waiting for the tap
    AwaitingSecondary,
    RunningSecondary,
    /// Slot mode: reels free spinning
    Spinning,
    /// Slot mode: reels decelerating onto the result
    Stopping,
    Finished,
}

/// What a tap did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Started,
    StopRequested,
    Reset,
    /// Button is disabled in the current status
    Ignored,
    PaywallRequired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    /// Gate pulses began for this category
    ExtractionStarted { category: BallCategory },
    BallArrived { value: u32, category: BallCategory },
    /// Gate closed for good for this category
    ExtractionStopped { category: BallCategory },
    ReelStopped { reel: usize, digit: u32 },
    DrawFinished(DrawResult),
    PaywallRequired,
}

/// Collaborators injected at construction
pub struct SessionServices {
    pub feedback: Box<dyn FeedbackSink>,
    pub entitlement: Box<dyn Entitlement>,
    pub storage: Box<dyn Storage>,
}

impl SessionServices {
    /// Silent, unlimited, memory-backed services
    pub fn in_memory() -> Self {
        Self {
            feedback: Box::new(NullFeedback),
            entitlement: Box::new(Unlimited),
            storage: Box::new(MemoryStorage::new()),
        }
    }
}

pub struct GameSession {
    variant: LotteryVariant,
    config: DrawConfig,
    tuning: Tuning,
    status: SessionStatus,
    controller: ExtractionController,
    slot: SlotMachine,
    feedback: FeedbackRouter,
    entitlement: Box<dyn Entitlement>,
    storage: Box<dyn Storage>,
    history: History,
    /// Live display buffers, in arrival order. Never sorted.
    primary: Vec<u32>,
    secondary: Vec<u32>,
    events: VecDeque<SessionEvent>,
    rng: Pcg32,
}

impl GameSession {
    pub fn new(variant: LotteryVariant, tuning: Tuning, settings: &Settings, services: SessionServices, seed: u64) -> Self {
        let SessionServices {
            feedback,
            entitlement,
            storage,
        } = services;
        let mut rng = Pcg32::seed_from_u64(seed);
        let controller = ExtractionController::new(&tuning, rng.random());
        let config = variant.config();
        let slot = Self::build_slot(&tuning, &config, rng.random());
        let history = History::load(storage.as_ref());

        let mut session = Self {
            variant,
            config,
            tuning,
            status: SessionStatus::Idle,
            controller,
            slot,
            feedback: FeedbackRouter::new(feedback, settings),
            entitlement,
            storage,
            history,
            primary: Vec::new(),
            secondary: Vec::new(),
            events: VecDeque::new(),
            rng,
        };
        session.rearm();
        log::info!("Session ready for {} ({})", variant.display_name(), variant);
        session
    }

    fn build_slot(tuning: &Tuning, config: &DrawConfig, seed: u64) -> SlotMachine {
        SlotMachine::new(
            tuning.slot.clone(),
            config.slot_columns(),
            config.primary.range.clone(),
            seed,
        )
    }

    /// The single user-facing action
    pub fn on_user_advance(&mut self) -> AdvanceOutcome {
        let outcome = match self.status {
            SessionStatus::Idle => {
                if !self.check_entitlement() {
                    return AdvanceOutcome::PaywallRequired;
                }
                self.click();
                self.clear_buffers();
                match self.config.style {
                    MachineStyle::Mixer => self.start_phase(BallCategory::Primary),
                    MachineStyle::SlotMachine => self.start_spin(),
                }
                AdvanceOutcome::Started
            }
            SessionStatus::AwaitingSecondary => {
                if !self.check_entitlement() {
                    return AdvanceOutcome::PaywallRequired;
                }
                self.click();
                self.start_phase(BallCategory::Secondary);
                AdvanceOutcome::Started
            }
            SessionStatus::Spinning => {
                if self.slot.stop() {
                    self.click();
                    self.set_status(SessionStatus::Stopping);
                    AdvanceOutcome::StopRequested
                } else {
                    AdvanceOutcome::Ignored
                }
            }
            SessionStatus::Finished => {
                self.reset();
                self.click();
                AdvanceOutcome::Reset
            }
            SessionStatus::RunningPrimary | SessionStatus::RunningSecondary | SessionStatus::Stopping => {
                AdvanceOutcome::Ignored
            }
        };
        self.pump();
        outcome
    }

    /// Switch variant. Always resets, even mid-draw.
    pub fn select_variant(&mut self, variant: LotteryVariant) {
        log::info!("Selecting {}", variant);
        self.variant = variant;
        self.config = variant.config();
        let seed = self.rng.random();
        self.slot = Self::build_slot(&self.tuning, &self.config, seed);
        self.reset();
    }

    /// Abandon any run and return to `Idle`. Pending events are discarded.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.slot.reset();
        self.feedback.emit(Feedback::StopLoop(SoundLoop::Mixer));
        self.feedback.emit(Feedback::StopLoop(SoundLoop::SlotRoll));
        self.clear_buffers();
        self.events.clear();
        self.set_status(SessionStatus::Idle);
        self.rearm();
    }

    /// Advance the active machine by one fixed timestep
    pub fn tick(&mut self, dt: f32) {
        match self.config.style {
            MachineStyle::Mixer => self.controller.tick(dt),
            MachineStyle::SlotMachine => self.slot.tick(dt),
        }
        self.pump();
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.feedback.apply_settings(settings);
    }

    fn check_entitlement(&mut self) -> bool {
        if self.entitlement.can_play() {
            return true;
        }
        log::info!("No plays left, showing paywall");
        self.click();
        self.events.push_back(SessionEvent::PaywallRequired);
        false
    }

    fn click(&mut self) {
        self.feedback.emit(Feedback::Play(SoundEffect::ButtonClick));
    }

    fn clear_buffers(&mut self) {
        self.primary.clear();
        self.secondary.clear();
    }

    /// Static primary pool in the drum so the idle screen isn't empty
    fn rearm(&mut self) {
        if self.config.style == MachineStyle::Mixer {
            self.controller
                .preload(self.config.primary.numbers(), BallCategory::Primary);
        }
    }

    fn start_phase(&mut self, category: BallCategory) {
        let Some(pool) = self.config.pool(category).cloned() else {
            log::warn!("{} has no {} pool", self.variant, category.as_str());
            return;
        };
        self.set_status(match category {
            BallCategory::Primary => SessionStatus::RunningPrimary,
            BallCategory::Secondary => SessionStatus::RunningSecondary,
        });
        self.controller.start_phase(PhaseCommand {
            numbers: pool.numbers(),
            category,
            target: pool.count,
        });
    }

    fn start_spin(&mut self) {
        if self.slot.spin() {
            self.feedback.emit(Feedback::StartLoop(SoundLoop::SlotRoll));
            self.feedback.emit(Feedback::Haptic(HapticStyle::Heavy));
            self.set_status(SessionStatus::Spinning);
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            log::info!("Session {:?} -> {:?}", self.status, status);
            self.status = status;
            self.events.push_back(SessionEvent::StatusChanged(status));
        }
    }

    /// Handle everything the machines emitted, in emission order
    fn pump(&mut self) {
        for event in self.controller.drain_events() {
            self.on_extraction_event(event);
        }
        for event in self.slot.drain_events() {
            self.on_slot_event(event);
        }
    }

    fn on_extraction_event(&mut self, event: ExtractionEvent) {
        match event {
            ExtractionEvent::AgitationStarted { .. } => {
                self.feedback.emit(Feedback::StartLoop(SoundLoop::Mixer));
            }
            ExtractionEvent::ExtractionStarted { category } => {
                self.events.push_back(SessionEvent::ExtractionStarted { category });
            }
            ExtractionEvent::BallSelected { value, category, .. } => {
                match category {
                    BallCategory::Primary => self.primary.push(value),
                    BallCategory::Secondary => self.secondary.push(value),
                }
                self.feedback.emit(Feedback::Play(SoundEffect::BallDrop));
                self.feedback.emit(Feedback::Haptic(HapticStyle::Heavy));
                self.events.push_back(SessionEvent::BallArrived { value, category });
            }
            ExtractionEvent::ExtractionStopped { category } => {
                self.feedback.emit(Feedback::StopLoop(SoundLoop::Mixer));
                self.events.push_back(SessionEvent::ExtractionStopped { category });
            }
            ExtractionEvent::PhaseComplete { category, forced, .. } => {
                if forced {
                    log::warn!("{} phase forced to complete", category.as_str());
                }
                self.on_phase_complete(category);
            }
        }
    }

    fn on_phase_complete(&mut self, category: BallCategory) {
        match (category, self.status) {
            (BallCategory::Primary, SessionStatus::RunningPrimary) => {
                match self.config.secondary.as_ref().map(|pool| pool.numbers()) {
                    Some(numbers) => {
                        self.set_status(SessionStatus::AwaitingSecondary);
                        self.controller.preload(numbers, BallCategory::Secondary);
                    }
                    None => self.finish_draw(),
                }
            }
            (BallCategory::Secondary, SessionStatus::RunningSecondary) => self.finish_draw(),
            (category, status) => {
                log::warn!("Ignoring {} completion while {:?}", category.as_str(), status);
            }
        }
    }

    fn on_slot_event(&mut self, event: SlotEvent) {
        match event {
            SlotEvent::ReelStopped { reel, digit } => {
                self.feedback.emit(Feedback::Play(SoundEffect::SlotStop));
                self.feedback.emit(Feedback::Haptic(HapticStyle::Medium));
                self.events.push_back(SessionEvent::ReelStopped { reel, digit });
            }
            SlotEvent::Finished(digits) => {
                if self.status != SessionStatus::Stopping {
                    log::warn!("Ignoring slot result while {:?}", self.status);
                    return;
                }
                self.primary = digits;
                self.feedback.emit(Feedback::StopLoop(SoundLoop::SlotRoll));
                self.feedback.emit(Feedback::Play(SoundEffect::Win));
                self.finish_draw();
            }
        }
    }

    /// Enter `Finished` and persist exactly one result
    fn finish_draw(&mut self) {
        self.set_status(SessionStatus::Finished);
        let result = DrawResult::new(
            self.variant,
            platform::now_ms(),
            self.primary.clone(),
            self.secondary.clone(),
        );
        log::info!("Draw finished: {}", result.display_string());

        self.history.add(result.clone());
        if let Err(e) = self.history.save(self.storage.as_mut()) {
            log::warn!("Failed to save history: {}", e);
        }
        self.entitlement.record_play();
        if let Err(e) = self.entitlement.persist(self.storage.as_mut()) {
            log::warn!("Failed to save usage: {}", e);
        }
        self.events.push_back(SessionEvent::DrawFinished(result));
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn variant(&self) -> LotteryVariant {
        self.variant
    }

    /// Whether a tap would do anything
    pub fn can_advance(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Idle | SessionStatus::AwaitingSecondary | SessionStatus::Spinning | SessionStatus::Finished
        )
    }

    /// Balls so far, in arrival order
    pub fn selected_balls(&self) -> impl Iterator<Item = (u32, BallCategory)> + '_ {
        self.primary
            .iter()
            .map(|&n| (n, BallCategory::Primary))
            .chain(self.secondary.iter().map(|&n| (n, BallCategory::Secondary)))
    }

    pub fn primary_balls(&self) -> &[u32] {
        &self.primary
    }

    pub fn secondary_balls(&self) -> &[u32] {
        &self.secondary
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn clear_history(&mut self) -> LottoResult<()> {
        self.history.clear_stored(self.storage.as_mut())
    }

    pub fn extraction_phase(&self) -> &ExtractionPhase {
        self.controller.phase()
    }

    pub fn controller(&self) -> &ExtractionController {
        &self.controller
    }

    pub fn slot(&self) -> &SlotMachine {
        &self.slot
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Shared store for other records (settings) kept beside history and usage
    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }

    /// Simulation anomalies recorded so far (stuck balls, forced phases)
    pub fn anomalies(&self) -> u32 {
        self.controller.anomalies()
    }
}
