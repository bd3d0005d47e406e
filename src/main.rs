//! Headless swarm run.
//!
//! Drives a simulation with a scripted pointer that circles through the
//! swarm, pulls audio each frame the way a sound device would, and logs
//! what happens.
//!
//! Usage: `swarmsong [frames] [particles] [config.json]`
//!
//! Set `RUST_LOG=debug` to see every note and morph.

use swarmsong::prelude::*;
use swarmsong::SimulationError;

const FPS: f32 = 60.0;
const ORBIT_RADIUS: f32 = 80.0;

fn main() -> Result<(), SimulationError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let frames: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(600);
    let particles: Option<u32> = args.next().and_then(|s| s.parse().ok());
    let mut config = match args.next() {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(count) = particles {
        config = config.with_particle_count(count);
    }

    let mut sim = Simulation::new(config)?;
    let mut scheduler = Scheduler::fixed(1.0 / FPS);
    let samples_per_frame = (sim.sound().settings().sample_rate / FPS).round() as usize;
    let mut audio = vec![0.0f32; samples_per_frame];
    let mut presented_bytes = 0usize;
    let mut sink = |frame: RenderFrame<'_>| {
        presented_bytes = frame.position_bytes().len() + frame.color_bytes().len();
    };

    // Pointer press counts as the first gesture and starts audio.
    sim.pointer_pressed();
    scheduler.start();

    let mut notes = 0;
    let mut morphs = 0;
    for frame in 0..frames {
        let t = frame as f32 / FPS;
        let point = Vec3::new(t.cos() * ORBIT_RADIUS, (t * 0.7).sin() * ORBIT_RADIUS, 0.0);
        sim.set_interaction_point(Some(point));
        sim.set_pressed((t as u64) % 4 == 0);

        match frame {
            200 => sim.apply(Command::ToggleShape),
            400 => sim.apply(Command::ToggleInvert),
            _ => {}
        }

        let Some(report) = scheduler.tick_after(1.0 / FPS, &mut sim, &mut sink) else {
            break;
        };
        sim.render_audio(&mut audio);

        if report.note.is_some() {
            notes += 1;
        }
        if report.morphed.is_some() {
            morphs += 1;
        }

        if frame % 60 == 0 {
            let rms = (audio.iter().map(|s| s * s).sum::<f32>() / audio.len().max(1) as f32).sqrt();
            log::info!(
                "frame {:4}  energy {:7.1}  displacement {:6.2}  voices {}  rms {:.4}",
                frame,
                report.energy,
                sim.field().mean_displacement(),
                sim.sound().active_voices(),
                rms
            );
        }
    }

    scheduler.stop();
    log::info!(
        "{} frames, {} notes, {} morphs, {} bytes per frame, final shape {}",
        scheduler.clock().frame(),
        notes,
        morphs,
        presented_bytes,
        sim.field().shape()
    );

    Ok(())
}
