//! Headless attractor: a cloud of balls pulled towards a pulsing box.
//!
//! Run with `RUST_LOG=debug cargo run --example attract`.

use std::f32::consts::TAU;

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use log::info;
use rand::Rng;
use rigid_bridge::prelude::*;
use rigid_bridge::FrameClock;

const BALLS: usize = 300;
const SPREAD: f32 = 30.0;
const FRAMES: u64 = 600;

/// Counts what would have been drawn this frame.
#[derive(Default)]
struct DrawStats {
    lines: usize,
    triangles: usize,
}

impl DebugDrawer for DrawStats {
    fn line(&mut self, _from: Vec3, _to: Vec3, _color: u32) {
        self.lines += 1;
    }

    fn triangle(&mut self, _a: Vec3, _b: Vec3, _c: Vec3, _color: u32) {
        self.triangles += 1;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut world = World::new();
    world
        .setup(WorldConfig { gravity: Some([0.0; 3]), ..WorldConfig::default() })
        .context("setting up the world")?;

    let mut rng = rand::thread_rng();
    let mut balls = Vec::with_capacity(BALLS);
    for _ in 0..BALLS {
        let pos = Vec3::new(
            rng.gen_range(-SPREAD..SPREAD),
            rng.gen_range(-SPREAD..SPREAD),
            rng.gen_range(-SPREAD..SPREAD),
        );
        let ball = world.add_sphere(4.0, pos, Quat::IDENTITY, 1000.0)?;
        balls.push(ball);
    }
    let core = world.add_box(Vec3::splat(10.0), Vec3::ZERO, Quat::IDENTITY, 0.0)?;
    let core = core.as_static()?;
    info!("spawned {} actors", world.actor_count());

    let mut clock = FrameClock::new();
    let mut time = 0.0f32;
    while clock.frame() < FRAMES {
        world.update_with_clock(&mut clock);
        time += clock.last_frame_time();

        for ball in &balls {
            let h = ball.as_dynamic()?;
            let pull = -h.position(&world).normalize_or_zero() * h.mass(&world) * 50.0;
            h.apply_impulse_force(&mut world, pull, false);
        }

        let phase = |k: f32| (time * 10.0 + TAU * k / 3.0).sin() + 1.0;
        let size = Vec3::new(phase(0.0), phase(1.0), phase(2.0)) * 100.0 + Vec3::ONE;
        core.set_size(&mut world, size)?;

        if clock.frame() % 60 == 0 {
            let mut stats = DrawStats::default();
            world.draw(&mut stats);
            let spread = balls
                .iter()
                .filter_map(|b| b.as_dynamic().ok())
                .map(|h| h.position(&world).length())
                .fold(0.0f32, f32::max);
            info!(
                "frame {}: {} lines, {} triangles, furthest ball {:.1}",
                clock.frame(),
                stats.lines,
                stats.triangles,
                spread
            );
        }
    }

    for ball in balls {
        ball.dispose(&mut world);
    }
    info!("done after {:.2}s, {} actors left", clock.elapsed(), world.actor_count());
    Ok(())
}
