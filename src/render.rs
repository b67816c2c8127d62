//! Software renderer: draws a [`Scene`] into an RGB framebuffer.

use crate::graphics::{draw_point, draw_triangle};
use crate::math::{ambient_irradiance, project, shininess, spot_contribution, to_rgb8};
use crate::scene::{Rgb, Scene};
use crate::shadow::{ShadowMap, SHADOW_MAP_SIZE};
use crate::texture::Raster;
use crate::vertex::{Fragment, Vertex};
use glam::DVec3;

/// Strength of the clearcoat highlight relative to the base specular
const CLEARCOAT_SPECULAR: f64 = 0.25;
/// Dielectric reflectance at normal incidence
const BASE_SPECULAR: f64 = 0.04;
/// Samples per axis when antialiasing
const SUPERSAMPLE: u32 = 2;

/// How frames are rasterized
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Render at twice the resolution per axis and average down
    pub antialias: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { antialias: true }
    }
}

pub struct Renderer {
    width: u32,
    height: u32,
    /// Samples per output pixel along each axis
    samples: u32,
    color: Vec<Rgb>,
    depth: Vec<f64>,
    shadow: ShadowMap,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut renderer = Self {
            width: 0,
            height: 0,
            samples: 1,
            color: Vec::new(),
            depth: Vec::new(),
            shadow: ShadowMap::new(SHADOW_MAP_SIZE),
        };
        renderer.set_size(width, height);
        renderer
    }

    pub fn with_options(width: u32, height: u32, options: RenderOptions) -> Self {
        let mut renderer = Self::new(width, height);
        renderer.set_antialias(options.antialias);
        renderer
    }

    /// Resizes the output, discarding the previous frame
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let len = (width * self.samples) as usize * (height * self.samples) as usize;
        self.color = vec![Rgb::ZERO; len];
        self.depth = vec![f64::INFINITY; len];
    }

    pub fn set_antialias(&mut self, enabled: bool) {
        self.samples = if enabled { SUPERSAMPLE } else { 1 };
        self.set_size(self.width, self.height);
    }

    pub fn antialias(&self) -> bool {
        self.samples > 1
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Output pixel, averaged over its samples
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let s = self.samples;
        let stride = self.width * s;
        let mut sum = Rgb::ZERO;
        for sy in 0..s {
            for sx in 0..s {
                sum += self.color[((y * s + sy) * stride + x * s + sx) as usize];
            }
        }
        to_rgb8(sum / (s * s) as f64)
    }

    /// Copies the last frame into an opaque RGBA raster
    pub fn to_raster(&self) -> Raster {
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let [r, g, b] = self.pixel(x, y);
                pixels.extend_from_slice(&[r, g, b, 255]);
            }
        }
        Raster {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Draws one frame of `scene` through its camera
    pub fn render(&mut self, scene: &Scene) {
        self.color.fill(scene.background);
        self.depth.fill(f64::INFINITY);
        if self.color.is_empty() {
            return;
        }

        let (w, h) = (
            (self.width * self.samples) as usize,
            (self.height * self.samples) as usize,
        );
        let width = w as f64;
        let height = h as f64;
        let camera = &scene.camera;
        let view_projection = camera.projection() * camera.view();

        if let Some(object) = &scene.mesh {
            let model = object.rotation.matrix();
            let mesh = &object.mesh;
            let material = &object.material;

            let shadow_light = if object.cast_shadow {
                scene.spots.iter().position(|spot| spot.cast_shadow)
            } else {
                None
            };
            match shadow_light {
                Some(index) => self.shadow.render(&scene.spots[index], object),
                None => self.shadow.clear(),
            }
            let shadow = &self.shadow;

            let vertices: Vec<Option<Vertex>> = mesh
                .positions
                .iter()
                .zip(&mesh.normals)
                .zip(&mesh.uvs)
                .map(|((&position, &normal), &uv)| {
                    let world = model * position;
                    let (screen_position, depth, inv_w) =
                        project(&view_projection, world, width, height)?;
                    Some(Vertex {
                        position: world,
                        screen_position,
                        depth,
                        inv_w,
                        normal: model * normal,
                        uv,
                    })
                })
                .collect();

            let base_exponent = shininess(material.roughness);
            let coat_exponent = shininess(material.clearcoat_roughness);
            let ambient = ambient_irradiance(&scene.ambient);

            let shade = |fragment: &Fragment| -> Rgb {
                let albedo = match &material.map {
                    Some(map) => {
                        let [r, g, b] = map.sample(fragment.uv.x, fragment.uv.y);
                        material.color * DVec3::new(r, g, b)
                    }
                    None => material.color,
                };
                let view_dir = (camera.position - fragment.position).normalize();
                let mut normal = fragment.normal;
                if normal.dot(view_dir) < 0.0 {
                    normal = -normal;
                }

                let diffuse_albedo = albedo * (1.0 - material.metalness);
                let specular_tint = DVec3::splat(BASE_SPECULAR).lerp(albedo, material.metalness);

                let mut color = diffuse_albedo * ambient;
                for (index, spot) in scene.spots.iter().enumerate() {
                    let (irradiance, base) =
                        spot_contribution(spot, fragment.position, normal, view_dir, base_exponent);
                    if irradiance == Rgb::ZERO {
                        continue;
                    }
                    let visibility = if object.receive_shadow && shadow_light == Some(index) {
                        let light_dir = (spot.position - fragment.position).normalize();
                        shadow.visibility(fragment.position, normal.dot(light_dir))
                    } else {
                        1.0
                    };
                    if visibility <= 0.0 {
                        continue;
                    }
                    let (_, coat) =
                        spot_contribution(spot, fragment.position, normal, view_dir, coat_exponent);
                    color += diffuse_albedo * irradiance * visibility;
                    color += specular_tint * spot.color * base * visibility;
                    color += spot.color * coat * CLEARCOAT_SPECULAR * material.clearcoat * visibility;
                }

                let view_distance = (fragment.position - camera.position).length();
                color.lerp(scene.fog.color, scene.fog.factor(view_distance))
            };

            for [a, b, c] in &mesh.indices {
                let (Some(v0), Some(v1), Some(v2)) = (
                    &vertices[*a as usize],
                    &vertices[*b as usize],
                    &vertices[*c as usize],
                ) else {
                    continue;
                };
                draw_triangle(v0, v1, v2, &mut self.color, &mut self.depth, w, h, &shade);
            }
        }

        if let Some(particles) = &scene.particles {
            let rotation = particles.rotation.matrix();
            let material = &particles.material;

            for &position in &particles.positions {
                let world = rotation * position;
                let Some((screen, depth, inv_w)) = project(&view_projection, world, width, height)
                else {
                    continue;
                };
                // point diameter is size * (height / 2) / distance, in pixels
                let radius = material.size * height * 0.25 * inv_w;
                let fog = scene.fog.factor((world - camera.position).length());
                draw_point(
                    screen,
                    depth,
                    radius,
                    material.color * (1.0 - fog),
                    material.opacity,
                    material.additive,
                    &mut self.color,
                    &self.depth,
                    w,
                    h,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Viewport;
    use crate::scene::{hex, Scene, SceneOptions, BACKGROUND};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bg() -> [u8; 3] {
        to_rgb8(hex(BACKGROUND))
    }

    #[test]
    fn test_set_size() {
        let mut renderer = Renderer::new(10, 20);
        assert_eq!(renderer.size(), (10, 20));
        renderer.set_size(33, 7);
        assert_eq!(renderer.size(), (33, 7));
        assert_eq!(renderer.to_raster().pixels.len(), 33 * 7 * 4);
    }

    #[test]
    fn test_empty_scene_is_background() {
        let viewport = Viewport::new(32, 16);
        let scene = Scene::empty(viewport);
        let mut renderer = Renderer::new(viewport.width, viewport.height);
        renderer.render(&scene);
        for y in 0..16 {
            for x in 0..32 {
                assert_eq!(renderer.pixel(x, y), bg());
            }
        }
    }

    #[test]
    fn test_zero_size_render_is_noop() {
        let scene = Scene::empty(Viewport::new(1, 1));
        let mut renderer = Renderer::new(0, 0);
        renderer.render(&scene);
        assert_eq!(renderer.size(), (0, 0));
    }

    #[test]
    fn test_scene_draws_marble_in_center() {
        let viewport = Viewport::new(96, 64);
        let mut rng = StdRng::seed_from_u64(11);
        let scene = Scene::new(viewport, SceneOptions { particles: false }, &mut rng);
        let mut renderer = Renderer::new(viewport.width, viewport.height);
        renderer.render(&scene);

        let covered = (0..64)
            .flat_map(|y| (0..96).map(move |x| (x, y)))
            .filter(|&(x, y)| renderer.pixel(x, y) != bg())
            .count();
        assert!(covered > 96 * 64 / 10);
        // corners stay empty
        assert_eq!(renderer.pixel(0, 0), bg());
        assert_eq!(renderer.pixel(95, 63), bg());
    }

    #[test]
    fn test_particles_add_light() {
        let viewport = Viewport::new(160, 120);
        let mut rng = StdRng::seed_from_u64(5);
        let mut scene = Scene::new(viewport, SceneOptions { particles: true }, &mut rng);
        scene.mesh = None;
        let mut renderer = Renderer::new(viewport.width, viewport.height);
        renderer.render(&scene);

        let lit = (0..120)
            .flat_map(|y| (0..160).map(move |x| (x, y)))
            .filter(|&(x, y)| renderer.pixel(x, y) != bg())
            .count();
        assert!(lit > 0);
        assert!(lit < 160 * 120 / 2);
    }

    fn marble_scene(viewport: Viewport) -> Scene {
        let mut rng = StdRng::seed_from_u64(11);
        Scene::new(viewport, SceneOptions { particles: false }, &mut rng)
    }

    fn frame(renderer: &Renderer) -> Vec<[u8; 3]> {
        let (width, height) = renderer.size();
        (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| renderer.pixel(x, y))
            .collect()
    }

    #[test]
    fn test_key_light_shadows_only_darken() {
        let viewport = Viewport::new(96, 64);
        let mut scene = marble_scene(viewport);
        let mut renderer = Renderer::new(viewport.width, viewport.height);

        renderer.render(&scene);
        let shadowed = frame(&renderer);
        scene.spots[0].cast_shadow = false;
        renderer.render(&scene);
        let unshadowed = frame(&renderer);

        let mut darker = 0;
        for (with, without) in shadowed.iter().zip(&unshadowed) {
            assert!((0..3).all(|i| with[i] <= without[i]));
            if with != without {
                darker += 1;
            }
        }
        // the knot crosses over itself, so some strand lies in shadow
        assert!(darker > 0);
    }

    #[test]
    fn test_receive_shadow_flag() {
        let viewport = Viewport::new(96, 64);
        let mut scene = marble_scene(viewport);
        let mut renderer = Renderer::new(viewport.width, viewport.height);

        if let Some(object) = scene.mesh.as_mut() {
            object.receive_shadow = false;
        }
        renderer.render(&scene);
        let ignored = frame(&renderer);
        scene.spots[0].cast_shadow = false;
        renderer.render(&scene);
        assert_eq!(ignored, frame(&renderer));
    }

    #[test]
    fn test_antialias_averages_samples() {
        let viewport = Viewport::new(96, 64);
        let scene = marble_scene(viewport);

        let mut plain = Renderer::new(viewport.width, viewport.height);
        plain.render(&scene);
        let mut smooth =
            Renderer::with_options(viewport.width, viewport.height, RenderOptions::default());
        assert!(smooth.antialias());
        smooth.render(&scene);

        assert_eq!(smooth.size(), (96, 64));
        assert_eq!(smooth.to_raster().pixels.len(), 96 * 64 * 4);
        assert_eq!(smooth.pixel(0, 0), bg());

        let covered = |frame: &[[u8; 3]]| frame.iter().filter(|p| **p != bg()).count() as f64;
        let (a, b) = (
            covered(frame(&plain).as_slice()),
            covered(frame(&smooth).as_slice()),
        );
        assert!((a - b).abs() < a * 0.2);
        // silhouette pixels pick up partial coverage
        assert_ne!(frame(&plain), frame(&smooth));
    }

    #[test]
    fn test_antialias_toggle_keeps_size() {
        let mut renderer = Renderer::new(20, 10);
        renderer.set_antialias(true);
        renderer.set_size(30, 12);
        assert_eq!(renderer.size(), (30, 12));
        renderer.set_antialias(false);
        assert!(!renderer.antialias());
        assert_eq!(renderer.to_raster().pixels.len(), 30 * 12 * 4);
    }
}
