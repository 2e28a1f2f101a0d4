use anyhow::{Result, anyhow};
use log::{info, warn};
use pico_args::Arguments;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::{env, thread, time::Duration};

use crate::config::{ConfigStore, ProfileState};
use crate::frame::Frame;
use crate::gestures::{GESTURE_TYPES, GestureType};
use crate::math::Vector;
use crate::session::Session;
use crate::synth;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            print_help();
            Ok(())
        }

        Some("simulate") => {
            let what: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: palmtrack simulate <circle|swipe|screentap|keytap>"))?;
            let frames: usize = pargs
                .opt_value_from_str("--frames")?
                .unwrap_or(128);
            simulate(&what, frames)
        }

        Some("motion") => {
            motion_demo();
            Ok(())
        }

        Some("profiles") => {
            let state = ProfileState::load_or_install_default()?;
            for name in state.list_profiles() {
                let marker = if name == state.active_name { "*" } else { " " };
                println!("{marker} {name}");
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: palmtrack use <profile_name>"))?;
            let mut state = ProfileState::load_or_install_default()?;
            state.set_active(&name)?;
            println!("active profile: {}", state.active_name);
            Ok(())
        }

        Some("doctor") => {
            let state = ProfileState::load_or_install_default()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&state.doctor_report()).unwrap_or_default()
            );
            Ok(())
        }

        Some("run") => run_loop(),

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

/// Session preconfigured from the active on-disk profile; falls back to
/// built-in defaults when no profile can be loaded.
fn make_session() -> Session {
    match ProfileState::load_or_install_default() {
        Ok(state) => {
            let mut store = ConfigStore::new();
            store.apply_profile(&state.profile);
            info!("using profile '{}'", state.active_name);
            Session::with_config(store)
        }
        Err(e) => {
            warn!("profile unavailable ({e}); using built-in thresholds");
            Session::new()
        }
    }
}

fn simulate(what: &str, frames: usize) -> Result<()> {
    let (ty, stream) = match what {
        "circle" => (GestureType::Circle, synth::circle_frames(frames)),
        "swipe" => (GestureType::Swipe, synth::swipe_frames(frames)),
        "screentap" => (GestureType::ScreenTap, synth::screen_tap_frames()),
        "keytap" => (GestureType::KeyTap, synth::key_tap_frames()),
        other => return Err(anyhow!("unknown trajectory: {other}")),
    };

    let session = make_session();
    session.enable_gesture(ty, true);

    let mut emitted = 0usize;
    for f in &stream {
        let published = session.process(synth::data_from(f));
        for g in &published.gestures {
            emitted += 1;
            println!("{}", serde_json::to_string(g)?);
        }
    }
    info!(
        "{what}: {} frames fed, {emitted} gesture snapshot(s)",
        stream.len()
    );
    Ok(())
}

fn motion_demo() {
    let older = synth::two_hand_frame();
    let cases = [
        ("translation +x 25mm", synth::translated(&older, Vector::new(25.0, 0.0, 0.0))),
        ("rotation 30deg about y", synth::rotated(&older, Vector::Y_AXIS, 0.5236)),
        ("scale x1.3", synth::scaled(&older, 1.3)),
    ];
    for (label, newer) in cases {
        let m = newer.motion(&older);
        println!(
            "{}",
            serde_json::json!({
                "case": label,
                "translation": m.translation.to_array(),
                "rotation_axis": m.rotation_axis.to_array(),
                "rotation_angle": m.rotation_angle,
                "scale_factor": m.scale_factor,
                "probabilities": {
                    "translation": m.translation_probability,
                    "rotation": m.rotation_probability,
                    "scale": m.scale_probability,
                },
            })
        );
    }
}

/// Continuous synthetic producer: cycles through the built-in
/// trajectories until SIGINT/SIGTERM, logging per-pass gesture counts.
fn run_loop() -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, stop.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, stop.clone())?;

    let session = make_session();
    for ty in GESTURE_TYPES {
        session.enable_gesture(ty, true);
    }
    info!("producer loop started (ctrl-c to stop)");

    let mut clock_us: i64 = 0;
    let mut pass = 0u64;
    while !stop.load(Ordering::Relaxed) {
        let mut emitted = 0usize;
        let streams = [
            synth::circle_frames(128),
            synth::swipe_frames(48),
            synth::screen_tap_frames(),
            synth::key_tap_frames(),
        ];
        for stream in streams {
            for f in &stream {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                let mut data = synth::data_from(f);
                data.timestamp = clock_us;
                clock_us += synth::FRAME_INTERVAL_US;
                let published = session.process(data);
                emitted += published.gestures.len();
                thread::sleep(Duration::from_millis(2));
            }
        }
        pass += 1;
        let newest: Arc<Frame> = session.frame();
        info!(
            "pass {pass}: newest frame {} ({} in history), {emitted} gesture snapshot(s)",
            newest.id,
            crate::history::HISTORY_DEPTH.min(newest.id as usize + 1),
        );
    }
    info!("producer loop stopped");
    Ok(())
}

fn print_help() {
    println!(
        r#"palmtrack - skeletal hand-tracking core (synthetic demo surface)

USAGE:
  palmtrack help                               Show this help
  palmtrack simulate <trajectory> [--frames N] Feed a synthetic trajectory and print gestures
                                               (circle|swipe|screentap|keytap)
  palmtrack motion                             Demo the rigid-motion estimator
  palmtrack profiles                           List threshold profiles; '*' marks active
  palmtrack use <name>                         Switch the active profile
  palmtrack doctor                             Print a JSON config/environment report
  palmtrack run                                Continuous synthetic producer until ctrl-c

TIPS:
  - Profiles: ~/.config/palmtrack/profiles
  - Active profile pointer: ~/.config/palmtrack/active
  - RUST_LOG=debug palmtrack simulate circle  for per-frame detail
"#
    );
}
