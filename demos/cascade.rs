//! # Cascade Demo
//!
//! Pours a steady stream of particles into an 800x600 box and reports
//! throughput. Headless: there is no rendering, just the solver.
//!
//! Run with: `cargo run --example cascade --release [-- --gpu] [count]`

use std::time::Instant;

use verlet2d::gpu::GpuCollider;
use verlet2d::prelude::*;

const SCREEN: Vec2 = Vec2::new(800.0, 600.0);
const RADIUS: f32 = 5.0;
const DT: f32 = 1.0 / 60.0;

fn main() {
    let use_gpu = std::env::args().any(|a| a == "--gpu");
    let target: usize = std::env::args()
        .filter(|a| a != "--gpu")
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2_000);

    let mut solver = Solver::new(SCREEN, RADIUS).expect("valid configuration");

    if use_gpu {
        match GpuCollider::new() {
            Ok(collider) => {
                println!("Collision pass: GPU");
                solver.set_backend(collider);
            }
            Err(e) => {
                println!("GPU unavailable ({}), falling back to local backend", e);
                solver.set_backend(LocalBackend::new());
            }
        }
    } else {
        println!("Collision pass: in-place CPU");
    }

    println!("Target particles: {}", target);

    let mut clock = FrameClock::new();
    let step_dt = DT / solver.sub_steps() as f32;
    let mut slowest = 0.0f32;

    while clock.frame() < 3_600 {
        // Emit from a nozzle near the top-left corner until full.
        if solver.particles().len() < target {
            for lane in 0..4 {
                let pos = Vec2::new(30.0, 560.0 - lane as f32 * 2.5 * RADIUS);
                let h = solver.spawn_particle(pos, RADIUS);
                solver
                    .particle_mut(h)
                    .set_velocity(Vec2::new(300.0, 0.0), step_dt);
            }
        }

        let frame_start = Instant::now();
        solver.update(DT);
        let step = frame_start.elapsed().as_secs_f32();
        slowest = slowest.max(step);

        clock.tick();
        if clock.frame() % 600 == 0 {
            println!(
                "frame {:>5}  particles {:>6}  step {:>7.3} ms  worst {:>7.3} ms",
                clock.frame(),
                solver.particles().len(),
                step * 1e3,
                slowest * 1e3,
            );
        }
    }

    let (mut lowest, mut highest) = (f32::MAX, f32::MIN);
    for p in solver.particles().iter() {
        lowest = lowest.min(p.pos.y);
        highest = highest.max(p.pos.y);
    }

    println!();
    println!("Simulated {} frames in {:.2?}", clock.frame(), clock.elapsed());
    println!("Average rate: {:.1} updates/s", clock.average_fps());
    println!(
        "Final pile: {} particles, y in [{:.1}, {:.1}]",
        solver.particles().len(),
        lowest,
        highest
    );
}
