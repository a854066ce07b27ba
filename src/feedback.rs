//! Audio/haptic feedback signals
//!
//! One-way, fire-and-forget cues emitted by the session. The core never
//! waits on them; a platform layer implements `FeedbackSink` to play them.

use crate::settings::Settings;

/// One-shot sound cues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Any accepted button tap
    ButtonClick,
    /// A ball dropped out of the gate
    BallDrop,
    /// One reel landed
    SlotStop,
    /// Slot draw finished
    Win,
}

/// Looping ambience
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundLoop {
    /// Drum air jets, from agitation until the gate closes
    Mixer,
    /// Reels spinning
    SlotRoll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticStyle {
    Medium,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Play(SoundEffect),
    StartLoop(SoundLoop),
    StopLoop(SoundLoop),
    Haptic(HapticStyle),
}

/// Consumer of feedback cues (audio engine, haptics driver, test recorder)
pub trait FeedbackSink {
    fn signal(&mut self, feedback: Feedback, volume: f32);
}

/// Logs cues at debug level; used by the headless binary
#[derive(Debug, Default)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn signal(&mut self, feedback: Feedback, volume: f32) {
        log::debug!("feedback {:?} (volume {:.2})", feedback, volume);
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullFeedback;

impl FeedbackSink for NullFeedback {
    fn signal(&mut self, _feedback: Feedback, _volume: f32) {}
}

/// Applies the sound and haptic toggles before forwarding to a sink
pub struct FeedbackRouter {
    sink: Box<dyn FeedbackSink>,
    sound_enabled: bool,
    haptics_enabled: bool,
    volume: f32,
}

impl FeedbackRouter {
    pub fn new(sink: Box<dyn FeedbackSink>, settings: &Settings) -> Self {
        let mut router = Self {
            sink,
            sound_enabled: true,
            haptics_enabled: true,
            volume: 1.0,
        };
        router.apply_settings(settings);
        router
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.sound_enabled = settings.sound_enabled;
        self.haptics_enabled = settings.haptics_enabled;
        self.volume = settings.effective_volume();
    }

    pub fn emit(&mut self, feedback: Feedback) {
        let allowed = match feedback {
            Feedback::Haptic(_) => self.haptics_enabled,
            // Stopping a loop is always allowed so nothing keeps playing
            // after sound is switched off
            Feedback::StopLoop(_) => true,
            Feedback::Play(_) | Feedback::StartLoop(_) => self.sound_enabled,
        };
        if allowed {
            self.sink.signal(feedback, self.volume);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<Feedback>>>);

    impl FeedbackSink for Recorder {
        fn signal(&mut self, feedback: Feedback, _volume: f32) {
            self.0.borrow_mut().push(feedback);
        }
    }

    #[test]
    fn test_toggles_filter_cues() {
        let rec = Recorder::default();
        let settings = Settings {
            sound_enabled: false,
            ..Default::default()
        };
        let mut router = FeedbackRouter::new(Box::new(rec.clone()), &settings);
        router.emit(Feedback::Play(SoundEffect::BallDrop));
        router.emit(Feedback::StartLoop(SoundLoop::Mixer));
        router.emit(Feedback::StopLoop(SoundLoop::Mixer));
        router.emit(Feedback::Haptic(HapticStyle::Heavy));
        assert_eq!(
            *rec.0.borrow(),
            vec![Feedback::StopLoop(SoundLoop::Mixer), Feedback::Haptic(HapticStyle::Heavy)]
        );

        router.apply_settings(&Settings {
            haptics_enabled: false,
            ..Default::default()
        });
        router.emit(Feedback::Haptic(HapticStyle::Medium));
        router.emit(Feedback::Play(SoundEffect::Win));
        assert_eq!(rec.0.borrow().last(), Some(&Feedback::Play(SoundEffect::Win)));
        assert_eq!(rec.0.borrow().len(), 3);
    }
}
