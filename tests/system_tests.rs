//! End-to-end behavior of `ParticleSystem` against a recording host.

use leonids::prelude::*;
use leonids::{ActiveParticles, ConfigError, Error, StateError};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct RecordingView {
    attached: Vec<SurfaceHandle>,
    detached: Vec<SurfaceHandle>,
    /// Active count seen by each render call.
    rendered: Vec<usize>,
}

impl Container for RecordingView {
    type Sprite = u32;

    fn attach_surface(&mut self) -> SurfaceHandle {
        let surface = SurfaceHandle(self.attached.len() as u64 + 1);
        self.attached.push(surface);
        surface
    }

    fn render(&mut self, _: SurfaceHandle, particles: ActiveParticles<'_>, sprites: &[u32]) {
        assert!(particles.clone().all(|p| p.sprite < sprites.len()));
        self.rendered.push(particles.len());
    }

    fn detach_surface(&mut self, surface: SurfaceHandle) {
        self.detached.push(surface);
    }
}

struct Window {
    views: HashSet<ContainerId>,
}

impl Host for Window {
    type Container = RecordingView;

    fn find_container(&mut self, id: ContainerId) -> Option<RecordingView> {
        self.views.contains(&id).then(RecordingView::default)
    }
}

fn window() -> Window {
    Window {
        views: HashSet::from([ContainerId::CONTENT, ContainerId(7)]),
    }
}

fn system(capacity: usize, ttl_ms: u64) -> ParticleSystem<RecordingView> {
    ParticleSystem::new(
        RecordingView::default(),
        capacity,
        vec![1, 2, 3],
        Duration::from_millis(ttl_ms),
    )
    .unwrap()
    .with_seed(42)
}

#[test]
fn test_burst_scenario() {
    let mut s = system(100, 1000);
    s.one_shot(10.0, 10.0, 50).unwrap();
    assert_eq!(s.active_count(), 50);

    s.update(Duration::from_millis(500));
    assert_eq!(s.active_count(), 50);
    s.update(Duration::from_millis(501));
    assert_eq!(s.active_count(), 0);
    assert_eq!(s.state(), DriverState::Idle);

    let view = s.container().unwrap();
    assert_eq!(view.rendered, vec![50, 0]);
    assert_eq!(view.attached, view.detached);
}

#[test]
fn test_empty_sprites_rejected_everywhere() {
    let ttl = Duration::from_millis(1000);
    let expected = "Bitmap array can not be empty";

    let err = ParticleSystem::new(RecordingView::default(), 100, vec![], ttl).err().unwrap();
    assert_eq!(err.to_string(), expected);

    let err = ParticleSystem::from_host(&mut window(), 100, vec![], ttl).err().unwrap();
    assert_eq!(err.to_string(), expected);

    let err = ParticleSystem::from_host_with_container(&mut window(), 100, vec![], ttl, ContainerId(7))
        .err()
        .unwrap();
    assert_eq!(err.to_string(), expected);
}

#[test]
fn test_host_container_lookup() {
    let ttl = Duration::from_millis(1000);
    assert!(ParticleSystem::from_host(&mut window(), 10, vec![1], ttl).is_ok());
    assert!(ParticleSystem::from_host_with_container(&mut window(), 10, vec![1], ttl, ContainerId(7)).is_ok());
    assert_eq!(
        ParticleSystem::from_host_with_container(&mut window(), 10, vec![1], ttl, ContainerId(3)).err(),
        Some(ConfigError::ContainerNotFound(ContainerId(3)))
    );
}

#[test]
fn test_rate_scenario() {
    let mut s = system(100, 10_000);
    s.emit(0.0, 0.0, 10.0).unwrap();
    for _ in 0..19 {
        s.update(Duration::from_millis(50));
    }
    assert_eq!(s.activated_count(), 9);
    s.update(Duration::from_millis(100));
    assert_eq!(s.activated_count(), 10);
}

#[test]
fn test_pool_exhaustion_scenario() {
    let mut s = system(5, 1000);
    assert!(s.one_shot(0.0, 0.0, 20).is_ok());
    assert_eq!(s.active_count(), 5);
    assert_eq!(s.dropped_count(), 15);
}

#[test]
fn test_emit_for_stops_and_drains() {
    let mut s = system(100, 300);
    s.emit_for(0.0, 0.0, 20.0, Duration::from_millis(500)).unwrap();
    for _ in 0..10 {
        s.update(Duration::from_millis(50));
    }
    assert_eq!(s.activated_count(), 10);
    assert_eq!(s.state(), DriverState::Stopped);

    for _ in 0..10 {
        s.update(Duration::from_millis(50));
    }
    assert_eq!(s.state(), DriverState::Idle);
    assert!(!s.has_surface());
}

#[test]
fn test_stop_is_idempotent() {
    let mut a = system(100, 1000);
    let mut b = system(100, 1000);
    a.emit(0.0, 0.0, 30.0).unwrap();
    b.emit(0.0, 0.0, 30.0).unwrap();
    a.update(Duration::from_millis(200));
    b.update(Duration::from_millis(200));

    a.stop_emitting();
    b.stop_emitting();
    b.stop_emitting();
    for _ in 0..5 {
        assert_eq!(a.update(Duration::from_millis(100)), b.update(Duration::from_millis(100)));
    }
    assert_eq!(a.state(), b.state());
}

#[test]
fn test_start_while_running_fails_without_side_effects() {
    let mut s = system(100, 1000);
    s.emit(5.0, 5.0, 10.0).unwrap();
    assert_eq!(
        s.one_shot(50.0, 50.0, 10),
        Err(Error::State(StateError::AlreadyRunning))
    );
    assert_eq!(s.settings().area, leonids::SpawnArea::Point(Vec2::new(5.0, 5.0)));
    assert_eq!(s.container().unwrap().attached.len(), 1);
}

#[test]
fn test_restart_after_stop_keeps_surface() {
    let mut s = system(100, 1000);
    s.one_shot(0.0, 0.0, 10).unwrap();
    s.update(Duration::from_millis(100));
    assert_eq!(s.state(), DriverState::Stopped);

    s.one_shot(0.0, 0.0, 10).unwrap();
    assert_eq!(s.active_count(), 20);
    assert_eq!(s.container().unwrap().attached.len(), 1);
}

#[test]
fn test_cancel_clears_immediately() {
    let mut s = system(100, 5000);
    s.emit(0.0, 0.0, 100.0).unwrap();
    s.update(Duration::from_millis(300));
    assert_eq!(s.cancel(), 30);
    assert_eq!(s.state(), DriverState::Idle);
    assert_eq!(s.container().unwrap().detached.len(), 1);
    assert_eq!(s.update(Duration::from_millis(16)), TickReport::default());
}

#[test]
fn test_emit_from_rect_edge() {
    let mut s = system(100, 1000);
    let rect = Rect::new(0.0, 100.0, 200.0, 50.0);
    s.one_shot_from(rect, Gravity::BOTTOM, 40).unwrap();
    assert!(s
        .active_particles()
        .all(|p| p.position.y == 150.0 && (0.0..=200.0).contains(&p.position.x)));
}

#[test]
fn test_update_emit_point_moves_new_particles() {
    let mut s = system(100, 5000);
    s.emit(0.0, 0.0, 10.0).unwrap();
    s.update(Duration::from_millis(100));
    s.update_emit_point(300.0, 400.0).unwrap();
    s.update(Duration::from_millis(100));

    let positions: Vec<_> = s.active_particles().map(|p| p.position).collect();
    assert_eq!(positions, vec![Vec2::ZERO, Vec2::new(300.0, 400.0)]);
}

#[test]
fn test_round_robin_sprites() {
    let mut s = system(10, 1000).with_sprite_order(SpriteOrder::RoundRobin);
    s.one_shot(0.0, 0.0, 5).unwrap();
    let sprites: Vec<_> = s.active_particles().map(|p| p.sprite).collect();
    assert_eq!(sprites, vec![0, 1, 2, 0, 1]);
}

#[test]
fn test_initial_delay_holds_burst() {
    let mut s = system(10, 1000).with_initial_delay(Duration::from_millis(200));
    s.one_shot(0.0, 0.0, 4).unwrap();
    assert_eq!(s.active_count(), 0);
    s.update(Duration::from_millis(150));
    assert_eq!(s.active_count(), 0);
    s.update(Duration::from_millis(100));
    assert_eq!(s.active_count(), 4);
}

#[test]
fn test_from_config_and_launch() {
    let config = SystemConfig::from_json(
        r#"{
            "max_particles": 30,
            "time_to_live_ms": 400,
            "speed": { "type": "range", "min": 10, "max": 20 },
            "fade_out_ms": 100,
            "seed": 5,
            "emission": { "type": "burst", "count": 25 }
        }"#,
    )
    .unwrap();
    let mut s = ParticleSystem::from_config(RecordingView::default(), vec![9], &config).unwrap();
    assert_eq!(s.capacity(), 30);

    s.launch(0.0, 0.0).unwrap();
    assert_eq!(s.active_count(), 25);
    s.update(Duration::from_millis(350));
    assert!(s.active_particles().all(|p| (p.alpha - 0.5).abs() < 1e-3));
}

#[test]
fn test_config_acceleration_range_and_eased_fade() {
    let config = SystemConfig::from_json(
        r#"{
            "time_to_live_ms": 1000,
            "acceleration_range": { "min": 40, "max": 40, "min_angle": 90, "max_angle": 90 },
            "fade_out_ms": 500,
            "fade_easing": "ease_out",
            "emission": { "type": "burst", "count": 4 }
        }"#,
    )
    .unwrap();
    let mut s = ParticleSystem::from_config(RecordingView::default(), vec![1], &config).unwrap();
    s.launch(0.0, 0.0).unwrap();
    s.update(Duration::from_millis(750));

    for p in s.active_particles() {
        assert!((p.velocity.y - 30.0).abs() < 1e-3);
        // 1 - (1 - (1 - 0.5)²)
        assert!((p.alpha - 0.25).abs() < 1e-3);
    }
}

#[test]
fn test_rate_emission_is_exact_over_many_frames() {
    let mut s = system(100, 10_000);
    s.emit(0.0, 0.0, 25.0).unwrap();
    for _ in 0..116 {
        s.update(Duration::from_millis(10));
    }
    assert_eq!(s.activated_count(), 29);
}

#[test]
fn test_preset_runs_to_completion() {
    let mut s = ParticleSystem::from_config(RecordingView::default(), vec![0, 1], &presets::explosion(64)).unwrap();
    s.launch(100.0, 100.0).unwrap();
    for _ in 0..60 {
        s.update(Duration::from_millis(16));
    }
    assert_eq!(s.state(), DriverState::Idle);
    assert_eq!(s.activated_count(), 64);
    assert!(!s.has_surface());
}

proptest! {
    #[test]
    fn prop_active_never_exceeds_capacity(
        capacity in 1usize..40,
        rate in 0.0f32..500.0,
        ticks in proptest::collection::vec(0u64..120, 1..60),
    ) {
        let mut s = system(capacity, 700);
        s.emit(0.0, 0.0, rate).unwrap();
        for ms in ticks {
            let report = s.update(Duration::from_millis(ms));
            prop_assert!(report.active <= capacity);
            prop_assert_eq!(report.active, s.active_count());
        }
    }

    #[test]
    fn prop_expired_particles_are_never_rendered(
        ticks in proptest::collection::vec(1u64..80, 1..40),
    ) {
        let mut s = system(200, 250);
        s.emit(0.0, 0.0, 60.0).unwrap();
        for ms in ticks {
            s.update(Duration::from_millis(ms));
            prop_assert!(s.active_particles().all(|p| p.age < p.time_to_live));
        }
    }
}
