//! Per-frame state advancement.

use crate::input::PointerState;
use crate::scene::Scene;

/// Continuous spin of the mesh around the vertical axis, per frame
pub const SPIN_Y: f64 = 0.003;
/// Continuous spin of the mesh around the horizontal axis, per frame
pub const SPIN_X: f64 = 0.001;
/// Particle cloud drift around the vertical axis, per frame
pub const PARTICLE_DRIFT: f64 = -0.001;
/// Tilt in radians at the viewport edge
pub const PARALLAX_SENSITIVITY: f64 = 0.2;
/// Fraction of the remaining distance to the parallax target covered per frame
pub const PARALLAX_EASING: f64 = 0.05;

/// Advances the scene one frame at a time.
///
/// The mesh rotation is the sum of an ever-growing spin and a parallax
/// offset that eases toward the pointer-derived target. Only the change in
/// offset is added each frame, so the spin is never pulled back.
#[derive(Debug, Clone, Copy, Default)]
pub struct Animator {
    /// Parallax tilt currently baked into the mesh rotation (x, y)
    parallax: [f64; 2],
    frames: u64,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn parallax(&self) -> [f64; 2] {
        self.parallax
    }

    /// Forgets the accumulated parallax offset, used after a rotation reset
    pub fn reset(&mut self) {
        self.parallax = [0.0, 0.0];
    }

    pub fn step(&mut self, scene: &mut Scene, pointer: PointerState) {
        self.frames += 1;

        if let Some(object) = scene.mesh.as_mut() {
            object.rotation.y += SPIN_Y;
            object.rotation.x += SPIN_X;

            let target = [
                pointer.y * PARALLAX_SENSITIVITY,
                pointer.x * PARALLAX_SENSITIVITY,
            ];
            let delta = [
                (target[0] - self.parallax[0]) * PARALLAX_EASING,
                (target[1] - self.parallax[1]) * PARALLAX_EASING,
            ];
            self.parallax[0] += delta[0];
            self.parallax[1] += delta[1];
            object.rotation.x += delta[0];
            object.rotation.y += delta[1];
        }

        if let Some(particles) = scene.particles.as_mut() {
            particles.rotation.y += PARTICLE_DRIFT;
        }
    }
}
