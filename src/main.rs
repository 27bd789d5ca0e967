//! Headless demo: runs a few presets against a container that only logs.
//!
//! ```text
//! RUST_LOG=debug cargo run
//! ```

use leonids::prelude::*;
use leonids::ActiveParticles;
use log::info;

/// Pretends to be a view; collects particle instances like a renderer would.
struct LogView {
    name: &'static str,
    next_surface: u64,
    instances: Vec<leonids::ParticleInstance>,
}

impl LogView {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            next_surface: 1,
            instances: Vec::new(),
        }
    }
}

impl Container for LogView {
    type Sprite = char;

    fn origin(&self) -> Vec2 {
        Vec2::new(0.0, 48.0)
    }

    fn density(&self) -> f32 {
        2.0
    }

    fn attach_surface(&mut self) -> SurfaceHandle {
        let surface = SurfaceHandle(self.next_surface);
        self.next_surface += 1;
        info!("[{}] attach {:?}", self.name, surface);
        surface
    }

    fn render(&mut self, _: SurfaceHandle, particles: ActiveParticles<'_>, _: &[char]) {
        self.instances.clear();
        self.instances.extend(particles.map(|p| p.instance()));
    }

    fn detach_surface(&mut self, surface: SurfaceHandle) {
        info!("[{}] detach {:?}", self.name, surface);
    }
}

fn run(name: &'static str, config: SystemConfig, frames: u32) -> leonids::Result<()> {
    let mut system = ParticleSystem::from_config(LogView::new(name), vec!['*', '+', 'o'], &config)?;
    let mut time = Time::new().with_fixed_delta(Some(Duration::from_millis(16)));

    system.launch(240.0, 320.0)?;
    for frame in 0..frames {
        let report = system.update(time.update());
        if frame % 30 == 0 {
            let bytes = system
                .container()
                .map_or(0, |v| bytemuck::cast_slice::<_, u8>(v.instances.as_slice()).len());
            info!(
                "[{}] t={:>5}ms active={:>3} +{} -{} ({} bytes of instances)",
                name,
                time.elapsed().as_millis(),
                report.active,
                report.activated,
                report.expired,
                bytes
            );
        }
        if system.state() == DriverState::Idle {
            break;
        }
        if frame == frames / 2 {
            system.stop_emitting();
        }
    }
    info!(
        "[{}] done: activated {}, dropped {}",
        name,
        system.activated_count(),
        system.dropped_count()
    );
    system.detach();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let demos = [
        ("confetti", presets::confetti(40.0)),
        ("explosion", presets::explosion(120)),
        ("snow", presets::snow(25.0)),
        ("sparkle", presets::sparkle(60.0)),
    ];
    for (name, config) in demos {
        if let Err(e) = run(name, config, 600) {
            log::error!("[{}] {}", name, e);
        }
    }
}
