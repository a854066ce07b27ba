//! Single-threaded timer queue
//!
//! Delayed work is modelled as scheduled callbacks advanced by the fixed
//! tick, never as blocking waits. Every timer carries the generation it was
//! scheduled in; `cancel_all` bumps the generation so anything already handed
//! out from an abandoned phase is recognisably stale.

/// A timer that came due during `advance`
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub generation: u64,
    pub payload: T,
}

#[derive(Debug, Clone)]
struct ScheduledTimer<T> {
    due: f64,
    seq: u64,
    generation: u64,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: f64,
    generation: u64,
    next_seq: u64,
    pending: Vec<ScheduledTimer<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            generation: 0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }

    /// Seconds elapsed since creation
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Run `payload` after `delay` seconds
    pub fn schedule(&mut self, delay: f32, payload: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(ScheduledTimer {
            due: self.now + f64::from(delay.max(0.0)),
            seq,
            generation: self.generation,
            payload,
        });
    }

    /// Drop every pending timer and invalidate the current generation
    pub fn cancel_all(&mut self) -> u64 {
        if !self.pending.is_empty() {
            log::trace!("Cancelling {} pending timers", self.pending.len());
        }
        self.pending.clear();
        self.generation += 1;
        self.generation
    }

    /// Advance the clock and return due timers in due order (FIFO on ties)
    pub fn advance(&mut self, dt: f32) -> Vec<Fired<T>> {
        self.now += f64::from(dt);
        let now = self.now + 1e-9;

        let (mut due, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|t| t.due <= now);
        self.pending = rest;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));

        let generation = self.generation;
        due.into_iter()
            .filter(|t| {
                let fresh = t.generation == generation;
                if !fresh {
                    log::trace!("Dropping stale timer from generation {}", t.generation);
                }
                fresh
            })
            .map(|t| Fired {
                generation: t.generation,
                payload: t.payload,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule(0.5, "b");
        s.schedule(0.2, "a");
        s.schedule(0.5, "c");
        assert!(s.advance(0.1).is_empty());
        let fired: Vec<_> = s.advance(0.5).into_iter().map(|f| f.payload).collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert_eq!(s.pending_count(), 0);
    }

    #[test]
    fn test_cancel_all_discards_pending() {
        let mut s = Scheduler::new();
        s.schedule(1.0, 1);
        let before = s.generation();
        let after = s.cancel_all();
        assert_ne!(before, after);
        assert!(!s.is_current(before));
        assert!(s.advance(5.0).is_empty());
    }

    #[test]
    fn test_fired_generation_detects_cancellation_mid_batch() {
        let mut s = Scheduler::new();
        s.schedule(0.1, "first");
        s.schedule(0.1, "second");
        let fired = s.advance(0.2);
        assert_eq!(fired.len(), 2);
        // Handling "first" resets the phase
        s.cancel_all();
        assert!(!s.is_current(fired[1].generation));
    }

    #[test]
    fn test_accumulated_ticks_hit_due_time() {
        let mut s = Scheduler::new();
        s.schedule(1.0, ());
        let mut fired = 0;
        for _ in 0..120 {
            fired += s.advance(1.0 / 120.0).len();
        }
        assert_eq!(fired, 1);
    }
}
