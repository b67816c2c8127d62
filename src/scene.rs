//! Scene state: camera, lights, the marble mesh and the gold dust.
//!
//! A [`Scene`] is built once at startup and owned by the app loop. The mesh
//! and particle cloud are optional so the frame update can skip whatever has
//! not been set up.

use crate::geometry::{particle_cloud, Mesh, TorusKnot, PARTICLE_COUNT};
use crate::input::Viewport;
use crate::texture::{synthesize_marble, Raster};
use glam::{DMat3, DMat4, DVec3};
use rand::Rng;
use std::f64::consts::PI;

/// Linear RGB color with components in 0..=1
pub type Rgb = DVec3;

/// Converts a `0xRRGGBB` literal
pub fn hex(value: u32) -> Rgb {
    DVec3::new(
        ((value >> 16) & 0xff) as f64 / 255.0,
        ((value >> 8) & 0xff) as f64 / 255.0,
        (value & 0xff) as f64 / 255.0,
    )
}

/// Deep charcoal backdrop, also used as the fog color
pub const BACKGROUND: u32 = 0x0a0a0a;
pub const GOLD: u32 = 0xd4af37;

/// Euler rotation applied in X, then Y, then Z order. Never wrapped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Euler {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Euler {
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_rotation_x(self.x) * DMat3::from_rotation_y(self.y) * DMat3::from_rotation_z(self.z)
    }
}

/// Exponential squared fog
#[derive(Debug, Clone, Copy)]
pub struct Fog {
    pub color: Rgb,
    pub density: f64,
}

impl Fog {
    /// Fraction of fog color at view distance `depth`
    pub fn factor(&self, depth: f64) -> f64 {
        let d = self.density * depth;
        (1.0 - (-d * d).exp()).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: DVec3,
}

impl PerspectiveCamera {
    pub fn new(fov: f64, aspect: f64, near: f64, far: f64) -> Self {
        Self {
            fov,
            aspect,
            near,
            far,
            position: DVec3::ZERO,
        }
    }

    /// The camera looks down -Z from its position
    pub fn view(&self) -> DMat4 {
        DMat4::from_translation(-self.position)
    }

    pub fn projection(&self) -> DMat4 {
        DMat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: Rgb,
    pub intensity: f64,
}

/// Cone light aimed at `target`
#[derive(Debug, Clone, Copy)]
pub struct SpotLight {
    pub color: Rgb,
    pub intensity: f64,
    pub position: DVec3,
    pub target: DVec3,
    /// Half-angle of the cone in radians
    pub angle: f64,
    /// Fraction of the cone that fades out toward the edge
    pub penumbra: f64,
    /// Whether meshes shadow each other under this light
    pub cast_shadow: bool,
}

impl SpotLight {
    pub fn new(color: Rgb, intensity: f64) -> Self {
        Self {
            color,
            intensity,
            position: DVec3::new(0.0, 1.0, 0.0),
            target: DVec3::ZERO,
            angle: PI / 3.0,
            penumbra: 0.0,
            cast_shadow: false,
        }
    }

    /// Cone falloff for a surface point, 0 outside and 1 in the core
    pub fn cone_attenuation(&self, point: DVec3) -> f64 {
        let axis = (self.target - self.position).normalize();
        let to_point = (point - self.position).normalize();
        let cos_outer = self.angle.cos();
        let cos_inner = (self.angle * (1.0 - self.penumbra)).cos();
        smoothstep(cos_outer, cos_inner, axis.dot(to_point))
    }
}

fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge1 <= edge0 {
        return if x >= edge0 { 1.0 } else { 0.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Polished stone surface
#[derive(Clone)]
pub struct PhysicalMaterial {
    pub map: Option<Raster>,
    pub color: Rgb,
    pub roughness: f64,
    pub metalness: f64,
    pub clearcoat: f64,
    pub clearcoat_roughness: f64,
}

pub struct MeshObject {
    pub mesh: Mesh,
    pub material: PhysicalMaterial,
    pub rotation: Euler,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

pub struct PointsMaterial {
    pub color: Rgb,
    /// World-space point size
    pub size: f64,
    pub opacity: f64,
    pub additive: bool,
}

pub struct ParticleCloud {
    pub positions: Vec<DVec3>,
    pub material: PointsMaterial,
    pub rotation: Euler,
}

/// Which optional parts of the scene to build
#[derive(Debug, Clone, Copy)]
pub struct SceneOptions {
    pub particles: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self { particles: true }
    }
}

pub struct Scene {
    pub background: Rgb,
    pub fog: Fog,
    pub camera: PerspectiveCamera,
    pub ambient: AmbientLight,
    pub spots: Vec<SpotLight>,
    pub mesh: Option<MeshObject>,
    pub particles: Option<ParticleCloud>,
}

impl Scene {
    /// Scene with camera, lights and fog but nothing to look at yet
    pub fn empty(viewport: Viewport) -> Self {
        let mut camera = PerspectiveCamera::new(75.0, viewport.aspect(), 0.1, 1000.0);
        camera.position = DVec3::new(0.0, 0.0, 4.5);

        // warm key light
        let mut main_spot = SpotLight::new(hex(0xffdfba), 10.0);
        main_spot.position = DVec3::new(5.0, 5.0, 5.0);
        main_spot.angle = PI / 4.0;
        main_spot.penumbra = 0.5;
        main_spot.cast_shadow = true;

        // gold rim light
        let mut rim = SpotLight::new(hex(GOLD), 8.0);
        rim.position = DVec3::new(-5.0, 2.0, -5.0);

        Self {
            background: hex(BACKGROUND),
            fog: Fog {
                color: hex(BACKGROUND),
                density: 0.03,
            },
            camera,
            ambient: AmbientLight {
                color: DVec3::ONE,
                intensity: 0.4,
            },
            spots: vec![main_spot, rim],
            mesh: None,
            particles: None,
        }
    }

    /// Full scene: marble torus knot plus optional gold dust
    pub fn new<R: Rng + ?Sized>(viewport: Viewport, options: SceneOptions, rng: &mut R) -> Self {
        let mut scene = Self::empty(viewport);
        scene.mesh = Some(marble_knot(rng));
        if options.particles {
            scene.particles = Some(gold_dust(rng));
        }
        tracing::info!(
            width = viewport.width,
            height = viewport.height,
            particles = options.particles,
            "scene initialized"
        );
        scene
    }
}

fn marble_knot<R: Rng + ?Sized>(rng: &mut R) -> MeshObject {
    let mesh = TorusKnot::default().build();
    tracing::debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "built torus knot"
    );
    MeshObject {
        mesh,
        material: PhysicalMaterial {
            map: Some(synthesize_marble(rng)),
            color: DVec3::ONE,
            roughness: 0.2,
            metalness: 0.1,
            clearcoat: 1.0,
            clearcoat_roughness: 0.1,
        },
        rotation: Euler::default(),
        cast_shadow: true,
        receive_shadow: true,
    }
}

fn gold_dust<R: Rng + ?Sized>(rng: &mut R) -> ParticleCloud {
    ParticleCloud {
        positions: particle_cloud(rng, PARTICLE_COUNT),
        material: PointsMaterial {
            color: hex(GOLD),
            size: 0.05,
            opacity: 0.7,
            additive: true,
        },
        rotation: Euler::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        let c = hex(0xff8000);
        assert_eq!(c.x, 1.0);
        assert!((c.y - 128.0 / 255.0).abs() < 1e-12);
        assert_eq!(c.z, 0.0);
    }

    #[test]
    fn test_spot_cone() {
        let mut spot = SpotLight::new(DVec3::ONE, 1.0);
        spot.position = DVec3::new(5.0, 5.0, 5.0);
        spot.angle = PI / 4.0;
        spot.penumbra = 0.5;

        assert_eq!(spot.cone_attenuation(DVec3::ZERO), 1.0);
        // well behind the light
        assert_eq!(spot.cone_attenuation(DVec3::new(10.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_fog_factor() {
        let fog = Fog {
            color: hex(BACKGROUND),
            density: 0.03,
        };
        assert_eq!(fog.factor(0.0), 0.0);
        assert!(fog.factor(4.5) < 0.02);
        assert!(fog.factor(100.0) > 0.99);
    }

    #[test]
    fn test_empty_scene_camera() {
        let scene = Scene::empty(Viewport::new(200, 100));
        assert_eq!(scene.camera.aspect, 2.0);
        assert_eq!(scene.camera.position, DVec3::new(0.0, 0.0, 4.5));
        assert_eq!(scene.spots.len(), 2);
        // only the key light casts shadows
        assert!(scene.spots[0].cast_shadow);
        assert!(!scene.spots[1].cast_shadow);
        assert!(scene.mesh.is_none());
        assert!(scene.particles.is_none());
    }
}
