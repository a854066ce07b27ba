//! Lotto Mixer entry point
//!
//! Headless native driver: runs one complete draw for the chosen variant
//! with a fixed-timestep loop and prints the result.
//!
//! Usage: `lotto-mixer [variant] [--seed N] [--data-dir DIR] [--tuning FILE]`

use std::path::PathBuf;

use clap::Parser;
use lotto_mixer::consts::{MAX_SUBSTEPS, SIM_DT};
use lotto_mixer::feedback::LogFeedback;
use lotto_mixer::persistence::FileStorage;
use lotto_mixer::usage::UsageTracker;
use lotto_mixer::{
    AdvanceOutcome, GameSession, LotteryVariant, LottoResult, SessionEvent, SessionServices, SessionStatus,
    Settings, Tuning,
};

/// Simulated frame time (60 Hz display)
const FRAME_DT: f32 = 1.0 / 60.0;
/// Give up after this much simulated time
const MAX_RUN_SECS: f32 = 180.0;
/// How long the reels spin before the driver taps stop
const SPIN_HOLD_SECS: f32 = 1.5;

#[derive(Parser, Debug)]
#[command(name = "lotto-mixer", about = "Run one lottery draw and print the result")]
struct Args {
    /// Variant key: double_color, super_lotto, arrangement3, arrangement5, three_d
    variant: Option<LotteryVariant>,

    /// RNG seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for history, usage and settings
    #[arg(long, default_value = ".lotto-mixer")]
    data_dir: PathBuf,

    /// JSON file overriding physics and timing constants
    #[arg(long)]
    tuning: Option<PathBuf>,
}

fn main() -> LottoResult<()> {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    log::info!("Lotto Mixer (native) starting...");

    let args = Args::parse();
    let tuning = match &args.tuning {
        Some(path) => Tuning::from_json(&std::fs::read_to_string(path)?)?,
        None => Tuning::default(),
    };

    let storage = FileStorage::open(&args.data_dir)?;
    let mut settings = Settings::load(&storage);
    let variant = args.variant.unwrap_or(settings.last_variant);
    let usage = UsageTracker::load(&storage);
    if let Some(left) = usage.remaining() {
        log::info!("{} free plays left", left);
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("Seed {}", seed);

    let services = SessionServices {
        feedback: Box::new(LogFeedback),
        entitlement: Box::new(usage),
        storage: Box::new(storage),
    };
    let mut session = GameSession::new(variant, tuning, &settings, services, seed);

    println!("{} ({})", variant.display_name(), variant);
    run_draw(&mut session);

    settings.last_variant = variant;
    if let Err(e) = settings.save(session.storage_mut()) {
        log::warn!("Failed to save settings: {}", e);
    }
    Ok(())
}

/// Tap through one draw, driving the session like a display-refresh loop
fn run_draw(session: &mut GameSession) {
    let mut accumulator = 0.0_f32;
    let mut elapsed = 0.0_f32;
    let mut spin_started = None;

    if session.on_user_advance() == AdvanceOutcome::PaywallRequired {
        println!("No free plays left.");
        return;
    }

    while elapsed < MAX_RUN_SECS {
        accumulator += FRAME_DT;
        elapsed += FRAME_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            session.tick(SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }

        for event in session.drain_events() {
            match event {
                SessionEvent::BallArrived { value, category } => {
                    println!("  {} ball {:02}", category.as_str(), value);
                }
                SessionEvent::ReelStopped { reel, digit } => {
                    println!("  reel {} -> {}", reel + 1, digit);
                }
                SessionEvent::DrawFinished(result) => {
                    println!("Result: {}", result.display_string());
                }
                SessionEvent::ExtractionStarted { category } => {
                    println!("Drawing {} balls", category.as_str());
                }
                SessionEvent::ExtractionStopped { .. } => {}
                SessionEvent::PaywallRequired => println!("No free plays left."),
                SessionEvent::StatusChanged(status) => log::debug!("status {:?}", status),
            }
        }

        match session.status() {
            SessionStatus::AwaitingSecondary => {
                if session.on_user_advance() == AdvanceOutcome::PaywallRequired {
                    return;
                }
            }
            SessionStatus::Spinning => {
                let started = *spin_started.get_or_insert(elapsed);
                if elapsed - started >= SPIN_HOLD_SECS {
                    session.on_user_advance();
                }
            }
            SessionStatus::Finished => {
                if session.anomalies() > 0 {
                    log::warn!("{} simulation anomalies during draw", session.anomalies());
                }
                return;
            }
            _ => {}
        }
    }
    log::warn!("Draw did not finish within {} s", MAX_RUN_SECS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_variant_key() {
        let args = Args::try_parse_from(["lotto-mixer", "super_lotto", "--seed", "7"]).unwrap();
        assert_eq!(args.variant, Some(LotteryVariant::SuperLotto));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.data_dir, PathBuf::from(".lotto-mixer"));
    }

    #[test]
    fn test_args_reject_unknown_variant() {
        assert!(Args::try_parse_from(["lotto-mixer", "powerball"]).is_err());
        assert!(Args::try_parse_from(["lotto-mixer", "--seed", "x"]).is_err());
    }
}
