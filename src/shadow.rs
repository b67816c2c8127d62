//! Shadow map for a spot light.
//!
//! The mesh is rasterized from the light into a depth buffer with the same
//! triangle routine the camera pass uses. Lookups compare linear distances
//! and average a 3x3 block of texels for soft edges.

use crate::graphics::draw_triangle;
use crate::math::project;
use crate::scene::{MeshObject, Rgb, SpotLight};
use crate::vertex::{Fragment, Vertex};
use glam::{DMat4, DVec2, DVec3};

pub const SHADOW_MAP_SIZE: usize = 256;

const SHADOW_NEAR: f64 = 0.1;
const SHADOW_FAR: f64 = 100.0;
/// Constant depth bias in world units
const DEPTH_BIAS: f64 = 0.02;
/// Extra bias per unit of surface slope toward the light
const SLOPE_BIAS: f64 = 0.03;
const MAX_SLOPE: f64 = 4.0;
/// Texels around the lookup on each side
const PCF_RADIUS: i64 = 1;
/// Headroom around the mesh when fitting the frustum
const FIT_MARGIN: f64 = 1.1;

pub struct ShadowMap {
    size: usize,
    view_projection: Option<DMat4>,
    depth: Vec<f64>,
    // draw_triangle wants a color target; nothing reads it back
    scratch: Vec<Rgb>,
}

impl ShadowMap {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            view_projection: None,
            depth: vec![f64::INFINITY; size * size],
            scratch: vec![Rgb::ZERO; size * size],
        }
    }

    /// Drops the last map; every lookup is lit until the next `render`
    pub fn clear(&mut self) {
        self.view_projection = None;
    }

    /// Renders the depth of `object` as seen from `light`. The frustum
    /// follows the cone, narrowed to the mesh when the mesh is smaller.
    pub fn render(&mut self, light: &SpotLight, object: &MeshObject) {
        self.depth.fill(f64::INFINITY);
        self.view_projection = None;

        // the mesh sits at the world origin
        let distance = light.position.length();
        if distance <= SHADOW_NEAR || self.size == 0 {
            return;
        }
        let radius = object
            .mesh
            .positions
            .iter()
            .map(|p| p.length())
            .fold(0.0, f64::max);
        let mut fov = 2.0 * light.angle;
        if radius < distance {
            fov = fov.min(2.0 * (radius / distance).asin() * FIT_MARGIN);
        }

        let forward = -light.position / distance;
        let up = if forward.cross(DVec3::Y).length_squared() < 1e-9 {
            DVec3::Z
        } else {
            DVec3::Y
        };
        let view = DMat4::look_at_rh(light.position, DVec3::ZERO, up);
        let projection = DMat4::perspective_rh_gl(fov, 1.0, SHADOW_NEAR, SHADOW_FAR);
        let view_projection = projection * view;

        let model = object.rotation.matrix();
        let extent = self.size as f64;
        let vertices: Vec<Option<Vertex>> = object
            .mesh
            .positions
            .iter()
            .map(|&position| {
                let world = model * position;
                let (screen_position, depth, inv_w) =
                    project(&view_projection, world, extent, extent)?;
                Some(Vertex {
                    position: world,
                    screen_position,
                    depth,
                    inv_w,
                    normal: DVec3::ZERO,
                    uv: DVec2::ZERO,
                })
            })
            .collect();

        let depth_only = |_: &Fragment| Rgb::ZERO;
        for [a, b, c] in &object.mesh.indices {
            let (Some(v0), Some(v1), Some(v2)) = (
                &vertices[*a as usize],
                &vertices[*b as usize],
                &vertices[*c as usize],
            ) else {
                continue;
            };
            draw_triangle(
                v0,
                v1,
                v2,
                &mut self.scratch,
                &mut self.depth,
                self.size,
                self.size,
                &depth_only,
            );
        }
        self.view_projection = Some(view_projection);
    }

    /// Fraction of the light reaching `position`, from 0 (fully shadowed)
    /// to 1. `n_dot_l` is the cosine between the surface normal and the
    /// direction to the light and scales the bias on sloped surfaces.
    pub fn visibility(&self, position: DVec3, n_dot_l: f64) -> f64 {
        let Some(view_projection) = &self.view_projection else {
            return 1.0;
        };
        let extent = self.size as f64;
        let Some((screen, depth, _)) = project(view_projection, position, extent, extent) else {
            return 1.0;
        };

        let cos = n_dot_l.clamp(1e-3, 1.0);
        let slope = ((1.0 - cos * cos).sqrt() / cos).min(MAX_SLOPE);
        let receiver = linear_depth(depth) - DEPTH_BIAS - SLOPE_BIAS * slope;

        let (cx, cy) = (screen[0].floor() as i64, screen[1].floor() as i64);
        let size = self.size as i64;
        let mut lit = 0;
        let mut taps = 0;
        for dy in -PCF_RADIUS..=PCF_RADIUS {
            for dx in -PCF_RADIUS..=PCF_RADIUS {
                taps += 1;
                let (x, y) = (cx + dx, cy + dy);
                if x < 0 || y < 0 || x >= size || y >= size {
                    lit += 1;
                    continue;
                }
                let stored = self.depth[(y * size + x) as usize];
                if !stored.is_finite() || linear_depth(stored) >= receiver {
                    lit += 1;
                }
            }
        }
        lit as f64 / taps as f64
    }
}

/// Distance along the light axis for an NDC depth
fn linear_depth(ndc: f64) -> f64 {
    2.0 * SHADOW_NEAR * SHADOW_FAR / ((SHADOW_FAR + SHADOW_NEAR) - ndc * (SHADOW_FAR - SHADOW_NEAR))
}
