//! Host integration points.
//!
//! The engine never draws pixels, looks up screen density or walks a view
//! tree itself. A host implements [`Container`] for the view that particles
//! are shown on top of, and optionally [`Host`] to look containers up by id.

use crate::pool::ActiveParticles;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque id of a drawing surface attached to a [`Container`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Identifies a container inside a [`Host`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub u32);

impl ContainerId {
    /// The host's root content container.
    pub const CONTENT: ContainerId = ContainerId(0);
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::CONTENT
    }
}

/// Axis-aligned rectangle in window coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner.
    pub origin: Vec2,
    /// Width and height.
    pub size: Vec2,
}

impl Rect {
    /// Rectangle from top-left corner and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Bottom-right corner.
    pub fn max(&self) -> Vec2 {
        self.origin + self.size
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }
}

/// A host view that particles are drawn over.
///
/// The container adds a full-size drawing surface on top of its content when
/// emission starts and removes it when the effect is over.
pub trait Container {
    /// Opaque drawable handle, e.g. a bitmap or texture id.
    type Sprite;

    /// Offset of the container in window coordinates.
    fn origin(&self) -> Vec2 {
        Vec2::ZERO
    }

    /// Device pixels per density-independent unit.
    fn density(&self) -> f32 {
        1.0
    }

    /// Add a drawing surface above the container's content.
    fn attach_surface(&mut self) -> SurfaceHandle;

    /// Draw `particles` on `surface`. Called once per tick.
    fn render(
        &mut self,
        surface: SurfaceHandle,
        particles: ActiveParticles<'_>,
        sprites: &[Self::Sprite],
    );

    /// Remove a surface previously returned by `attach_surface`.
    fn detach_surface(&mut self, surface: SurfaceHandle);
}

/// Something that owns containers, such as a window or activity.
pub trait Host {
    /// Container type handed out by this host.
    type Container: Container;

    /// Look up the container with the given id.
    fn find_container(&mut self, id: ContainerId) -> Option<Self::Container>;
}
