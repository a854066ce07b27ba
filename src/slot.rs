//! Slot-machine mode
//!
//! Digit reels that spin up, then decelerate onto a uniformly drawn target.
//! Purely timed; no physics is involved. Reels are independent, and the
//! result is reported in reel order.

use std::collections::VecDeque;
use std::ops::RangeInclusive;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::scheduler::Scheduler;
use crate::tuning::SlotTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    Idle,
    Spinning,
    Stopping,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReelState {
    /// Showing its last symbol
    Resting,
    /// Waiting for its staggered release
    Queued,
    /// Free spinning at `interval` seconds per symbol
    Spinning { interval: f32 },
    /// Decelerating onto `target` since `started` (scheduler seconds)
    Stopping { target: u32, started: f64 },
    Landed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reel {
    pub symbol: u32,
    pub state: ReelState,
    /// Target handed out before the reel was released
    pending_target: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    ReelStopped { reel: usize, digit: u32 },
    /// Every reel landed; digits in reel order
    Finished(Vec<u32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReelTimer {
    Release(usize),
    Step(usize),
    BeginStop(usize),
}

pub struct SlotMachine {
    tuning: SlotTuning,
    digits: RangeInclusive<u32>,
    reels: Vec<Reel>,
    phase: SlotPhase,
    scheduler: Scheduler<ReelTimer>,
    targets: Vec<u32>,
    rng: Pcg32,
    events: VecDeque<SlotEvent>,
}

impl SlotMachine {
    pub fn new(tuning: SlotTuning, columns: usize, digits: RangeInclusive<u32>, seed: u64) -> Self {
        let first = *digits.start();
        Self {
            tuning,
            digits,
            reels: (0..columns)
                .map(|_| Reel {
                    symbol: first,
                    state: ReelState::Resting,
                    pending_target: None,
                })
                .collect(),
            phase: SlotPhase::Idle,
            scheduler: Scheduler::new(),
            targets: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            events: VecDeque::new(),
        }
    }

    /// Start all reels, staggered. Returns false unless idle or finished.
    pub fn spin(&mut self) -> bool {
        if !matches!(self.phase, SlotPhase::Idle | SlotPhase::Finished) {
            return false;
        }
        self.scheduler.cancel_all();
        self.targets.clear();
        for (i, reel) in self.reels.iter_mut().enumerate() {
            reel.state = ReelState::Queued;
            reel.pending_target = None;
            self.scheduler
                .schedule(self.tuning.spin_stagger * i as f32, ReelTimer::Release(i));
        }
        self.phase = SlotPhase::Spinning;
        log::info!("Slot spin with {} reels", self.reels.len());
        true
    }

    /// Draw the result and begin staggered stops. Returns false unless spinning.
    pub fn stop(&mut self) -> bool {
        if self.phase != SlotPhase::Spinning {
            return false;
        }
        let digits = self.digits.clone();
        self.targets = (0..self.reels.len())
            .map(|_| self.rng.random_range(digits.clone()))
            .collect();
        for i in 0..self.reels.len() {
            self.scheduler
                .schedule(self.tuning.stop_stagger * i as f32, ReelTimer::BeginStop(i));
        }
        self.phase = SlotPhase::Stopping;
        log::debug!("Slot targets {:?}", self.targets);
        if self.reels.is_empty() {
            self.finish();
        }
        true
    }

    /// Cancel everything and return to rest
    pub fn reset(&mut self) {
        self.scheduler.cancel_all();
        for reel in &mut self.reels {
            reel.state = ReelState::Resting;
            reel.pending_target = None;
        }
        self.targets.clear();
        self.events.clear();
        self.phase = SlotPhase::Idle;
    }

    pub fn tick(&mut self, dt: f32) {
        for fired in self.scheduler.advance(dt) {
            if !self.scheduler.is_current(fired.generation) {
                continue;
            }
            match fired.payload {
                ReelTimer::Release(i) => self.release(i),
                ReelTimer::Step(i) => self.step(i),
                ReelTimer::BeginStop(i) => self.begin_stop(i),
            }
        }
    }

    fn release(&mut self, i: usize) {
        let Some(pending) = self.reels.get(i).map(|r| r.pending_target) else {
            return;
        };
        let now = self.scheduler.now();
        let reel = &mut self.reels[i];
        reel.state = match pending {
            Some(target) => ReelState::Stopping { target, started: now },
            None => ReelState::Spinning {
                interval: self.tuning.initial_interval,
            },
        };
        reel.pending_target = None;
        let delay = match reel.state {
            ReelState::Stopping { .. } => self.tuning.decel_interval(0.0),
            _ => self.tuning.initial_interval,
        };
        self.scheduler.schedule(delay, ReelTimer::Step(i));
    }

    fn begin_stop(&mut self, i: usize) {
        let Some(&target) = self.targets.get(i) else {
            return;
        };
        let now = self.scheduler.now();
        let reel = &mut self.reels[i];
        match reel.state {
            ReelState::Spinning { .. } => reel.state = ReelState::Stopping { target, started: now },
            // Not released yet: it will start decelerating when it is
            ReelState::Queued => reel.pending_target = Some(target),
            state => log::warn!("Reel {} asked to stop while {:?}", i, state),
        }
    }

    fn step(&mut self, i: usize) {
        let next = self.next_symbol(self.reels[i].symbol);
        let now = self.scheduler.now();
        match self.reels[i].state {
            ReelState::Spinning { interval } => {
                let interval = if interval > self.tuning.min_interval {
                    (interval * self.tuning.acceleration).max(self.tuning.min_interval)
                } else {
                    self.rng
                        .random_range(self.tuning.jitter_min..=self.tuning.jitter_max)
                };
                let reel = &mut self.reels[i];
                reel.symbol = next;
                reel.state = ReelState::Spinning { interval };
                self.scheduler.schedule(interval, ReelTimer::Step(i));
            }
            ReelState::Stopping { target, started } => {
                let duration = self.tuning.decel_duration.max(f32::EPSILON);
                let progress = (((now - started) as f32) / duration).min(1.0);
                self.reels[i].symbol = next;
                if progress >= self.tuning.land_progress && next == target {
                    self.land(i, target);
                } else {
                    self.scheduler
                        .schedule(self.tuning.decel_interval(progress), ReelTimer::Step(i));
                }
            }
            _ => {}
        }
    }

    fn land(&mut self, i: usize, digit: u32) {
        self.reels[i].state = ReelState::Landed;
        log::debug!("Reel {} landed on {}", i, digit);
        self.events.push_back(SlotEvent::ReelStopped { reel: i, digit });
        if self.reels.iter().all(|r| r.state == ReelState::Landed) {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.scheduler.cancel_all();
        self.phase = SlotPhase::Finished;
        log::info!("Slot result {:?}", self.targets);
        self.events.push_back(SlotEvent::Finished(self.targets.clone()));
    }

    fn next_symbol(&self, symbol: u32) -> u32 {
        if symbol >= *self.digits.end() {
            *self.digits.start()
        } else {
            symbol + 1
        }
    }

    pub fn drain_events(&mut self) -> Vec<SlotEvent> {
        self.events.drain(..).collect()
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    pub fn reels(&self) -> &[Reel] {
        &self.reels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn machine(columns: usize, seed: u64) -> SlotMachine {
        SlotMachine::new(SlotTuning::default(), columns, 0..=9, seed)
    }

    fn run(slot: &mut SlotMachine, secs: f32) -> Vec<SlotEvent> {
        let mut events = Vec::new();
        for _ in 0..(secs / SIM_DT) as u32 {
            slot.tick(SIM_DT);
            events.extend(slot.drain_events());
        }
        events
    }

    #[test]
    fn test_reels_land_on_their_targets() {
        let mut slot = machine(3, 11);
        assert!(slot.spin());
        run(&mut slot, 2.0);
        assert!(slot.reels().iter().all(|r| matches!(r.state, ReelState::Spinning { .. })));

        assert!(slot.stop());
        let events = run(&mut slot, 12.0);
        assert_eq!(slot.phase(), SlotPhase::Finished);

        let stopped: Vec<(usize, u32)> = events
            .iter()
            .filter_map(|e| match e {
                SlotEvent::ReelStopped { reel, digit } => Some((*reel, *digit)),
                _ => None,
            })
            .collect();
        assert_eq!(stopped.len(), 3);
        let mut reels: Vec<usize> = stopped.iter().map(|(r, _)| *r).collect();
        reels.sort_unstable();
        assert_eq!(reels, vec![0, 1, 2]);

        let Some(SlotEvent::Finished(digits)) = events.last() else {
            panic!("expected Finished last, got {:?}", events.last());
        };
        for (reel, digit) in &stopped {
            assert_eq!(digits[*reel], *digit);
        }
        for (reel, digit) in slot.reels().iter().zip(digits) {
            assert_eq!(reel.symbol, *digit);
        }
    }

    #[test]
    fn test_stop_before_release_still_lands() {
        let mut slot = machine(5, 3);
        slot.spin();
        // Stop immediately: later reels are still queued
        assert!(slot.stop());
        let events = run(&mut slot, 20.0);
        assert!(matches!(events.last(), Some(SlotEvent::Finished(d)) if d.len() == 5));
    }

    #[test]
    fn test_taps_out_of_turn_are_rejected() {
        let mut slot = machine(3, 1);
        assert!(!slot.stop());
        assert!(slot.spin());
        assert!(!slot.spin());
        assert!(slot.stop());
        assert!(!slot.stop());
    }

    #[test]
    fn test_reset_cancels_pending_reels() {
        let mut slot = machine(3, 5);
        slot.spin();
        run(&mut slot, 1.0);
        slot.stop();
        run(&mut slot, 1.5);
        slot.reset();
        assert!(run(&mut slot, 10.0).is_empty());
        assert_eq!(slot.phase(), SlotPhase::Idle);
    }

    #[test]
    fn test_digits_cover_range() {
        let mut seen = [false; 10];
        let mut slot = machine(5, 99);
        for _ in 0..40 {
            slot.spin();
            slot.stop();
            let events = run(&mut slot, 20.0);
            if let Some(SlotEvent::Finished(digits)) = events.last() {
                for d in digits {
                    seen[*d as usize] = true;
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
    }
}
