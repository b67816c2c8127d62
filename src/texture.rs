//! Procedural marble texture synthesis.
//!
//! The texture is a warm off-white base with three layers of random-walk
//! veins drawn on top: soft blurred grey, medium grey-brown, then sharp gold
//! highlights. Later layers land on top of earlier ones.

use crate::error::{Marble3dError, Result};
use glam::DVec2;
use rand::Rng;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Edge length of the square marble raster
pub const TEXTURE_SIZE: u32 = 1024;
/// Segments appended after the start point of every vein
pub const VEIN_SEGMENTS: usize = 20;
/// Creamy white base fill
pub const BASE_COLOR: [u8; 4] = [0xfd, 0xfb, 0xf7, 0xff];

/// Drawing parameters shared by every vein of one layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VeinLayer {
    pub color: [u8; 3],
    /// Narrowest stroke width in pixels
    pub width_min: f64,
    /// Random extra width added on top of `width_min`
    pub width_span: f64,
    pub opacity: f64,
    /// Gaussian blur sigma in pixels, 0 for none
    pub blur: f64,
    /// Largest per-segment wander, split evenly either side of zero
    pub volatility: f64,
    pub count: usize,
}

pub const VEIN_LAYERS: [VeinLayer; 3] = [
    // soft grey
    VeinLayer {
        color: [0x88, 0x88, 0x88],
        width_min: 2.0,
        width_span: 8.0,
        opacity: 0.15,
        blur: 5.0,
        volatility: 200.0,
        count: 15,
    },
    // medium grey/brown
    VeinLayer {
        color: [0x6b, 0x6b, 0x6b],
        width_min: 1.0,
        width_span: 4.0,
        opacity: 0.2,
        blur: 2.0,
        volatility: 150.0,
        count: 10,
    },
    // sharp gold
    VeinLayer {
        color: [0xd4, 0xaf, 0x37],
        width_min: 0.5,
        width_span: 2.0,
        opacity: 0.8,
        blur: 0.0,
        volatility: 100.0,
        count: 6,
    },
];

/// Stroke style for a single polyline
#[derive(Debug, Clone, Copy)]
pub struct Stroke {
    pub color: [u8; 3],
    pub width: f64,
    pub opacity: f64,
    pub blur: f64,
}

/// RGBA8 raster, row-major
#[derive(Clone)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Raster {
    /// Create a raster filled with a solid color
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Bilinear lookup clamped to the edge texels. `v = 0` is the bottom row, as
    /// for an image uploaded with a vertical flip.
    pub fn sample(&self, u: f64, v: f64) -> [f64; 3] {
        let w = self.width as i64;
        let h = self.height as i64;
        let fx = u * self.width as f64 - 0.5;
        let fy = (1.0 - v) * self.height as f64 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let texel = |x: i64, y: i64| {
            let p = self.get_pixel(x.clamp(0, w - 1) as u32, y.clamp(0, h - 1) as u32);
            [p[0] as f64, p[1] as f64, p[2] as f64]
        };
        let (x0, y0) = (x0 as i64, y0 as i64);
        let c00 = texel(x0, y0);
        let c10 = texel(x0 + 1, y0);
        let c01 = texel(x0, y0 + 1);
        let c11 = texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 3];
        for i in 0..3 {
            let top = c00[i] + (c10[i] - c00[i]) * tx;
            let bottom = c01[i] + (c11[i] - c01[i]) * tx;
            out[i] = (top + (bottom - top) * ty) / 255.0;
        }
        out
    }

    /// Strokes a polyline with round caps and joins, then composites it
    /// source-over. Geometry outside the raster is clipped.
    pub fn stroke_polyline(&mut self, points: &[DVec2], stroke: &Stroke) {
        let Some(first) = points.first() else {
            return;
        };
        let half = stroke.width * 0.5;
        let margin = half + 1.0 + (stroke.blur * 3.0).ceil();

        let (mut lo, mut hi) = (*first, *first);
        for p in points {
            lo = lo.min(*p);
            hi = hi.max(*p);
        }
        let x0 = (lo.x - margin).floor().max(0.0) as i64;
        let y0 = (lo.y - margin).floor().max(0.0) as i64;
        let x1 = (hi.x + margin).ceil().min(self.width as f64) as i64;
        let y1 = (hi.y + margin).ceil().min(self.height as f64) as i64;
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let region_w = (x1 - x0) as usize;
        let region_h = (y1 - y0) as usize;
        let mut mask = vec![0.0f32; region_w * region_h];

        let single = [*first, *first];
        let segments = if points.len() == 1 {
            single.windows(2)
        } else {
            points.windows(2)
        };
        for segment in segments {
            let (a, b) = (segment[0], segment[1]);
            let sx0 = ((a.x.min(b.x) - half - 1.0).floor() as i64).max(x0);
            let sy0 = ((a.y.min(b.y) - half - 1.0).floor() as i64).max(y0);
            let sx1 = ((a.x.max(b.x) + half + 1.0).ceil() as i64).min(x1);
            let sy1 = ((a.y.max(b.y) + half + 1.0).ceil() as i64).min(y1);
            for y in sy0..sy1 {
                for x in sx0..sx1 {
                    let p = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);
                    let coverage = (half + 0.5 - distance_to_segment(p, a, b)).clamp(0.0, 1.0);
                    let idx = (y - y0) as usize * region_w + (x - x0) as usize;
                    mask[idx] = mask[idx].max(coverage as f32);
                }
            }
        }

        if stroke.blur > 0.0 {
            gaussian_blur(&mut mask, region_w, region_h, stroke.blur);
        }

        for ry in 0..region_h {
            let y = y0 as usize + ry;
            for rx in 0..region_w {
                let alpha = stroke.opacity * mask[ry * region_w + rx] as f64;
                if alpha <= 0.0 {
                    continue;
                }
                let x = x0 as usize + rx;
                let idx = (y * self.width as usize + x) * 4;
                for c in 0..3 {
                    let dst = self.pixels[idx + c] as f64;
                    let src = stroke.color[c] as f64;
                    self.pixels[idx + c] = (dst + (src - dst) * alpha).round() as u8;
                }
            }
        }
    }
}

fn distance_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    let t = if len2 == 0.0 {
        0.0
    } else {
        ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    };
    p.distance(a + ab * t)
}

/// Separable Gaussian blur of a coverage mask, treating the outside as empty
fn gaussian_blur(mask: &mut [f32], width: usize, height: usize, sigma: f64) {
    let radius = (sigma * 3.0).ceil() as isize;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp() as f32)
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }

    let mut tmp = vec![0.0f32; mask.len()];
    for y in 0..height {
        let row = y * width;
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = x as isize + k as isize - radius;
                if sx >= 0 && (sx as usize) < width {
                    acc += mask[row + sx as usize] * weight;
                }
            }
            tmp[row + x] = acc;
        }
    }
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = y as isize + k as isize - radius;
                if sy >= 0 && (sy as usize) < height {
                    acc += tmp[sy as usize * width + x] * weight;
                }
            }
            mask[y * width + x] = acc;
        }
    }
}

/// Random-walk vein: a start point inside the raster followed by
/// [`VEIN_SEGMENTS`] offsets, each within `±volatility / 2` per axis.
pub fn vein_path<R: Rng + ?Sized>(rng: &mut R, volatility: f64) -> Vec<DVec2> {
    let size = TEXTURE_SIZE as f64;
    let mut point = DVec2::new(rng.random_range(0.0..size), rng.random_range(0.0..size));
    let mut path = Vec::with_capacity(VEIN_SEGMENTS + 1);
    path.push(point);
    for _ in 0..VEIN_SEGMENTS {
        point.x += (rng.random::<f64>() - 0.5) * volatility;
        point.y += (rng.random::<f64>() - 0.5) * volatility;
        path.push(point);
    }
    path
}

/// Generates a fresh 1024x1024 marble raster
pub fn synthesize_marble<R: Rng + ?Sized>(rng: &mut R) -> Raster {
    let mut raster = Raster::filled(TEXTURE_SIZE, TEXTURE_SIZE, BASE_COLOR);
    for layer in &VEIN_LAYERS {
        for _ in 0..layer.count {
            let stroke = Stroke {
                color: layer.color,
                width: layer.width_min + rng.random::<f64>() * layer.width_span,
                opacity: layer.opacity,
                blur: layer.blur,
            };
            let path = vein_path(rng, layer.volatility);
            raster.stroke_polyline(&path, &stroke);
        }
    }
    tracing::debug!(
        veins = VEIN_LAYERS.iter().map(|l| l.count).sum::<usize>(),
        "synthesized marble texture"
    );
    raster
}

/// Write a raster to a PNG file
pub fn write_png(raster: &Raster, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let w = BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, raster.width, raster.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let encoding = |source| Marble3dError::PngEncoding {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = encoder.write_header().map_err(encoding)?;
    writer.write_image_data(&raster.pixels).map_err(encoding)?;
    writer.finish().map_err(encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn dominant_color(raster: &Raster) -> [u8; 4] {
        let mut counts: HashMap<[u8; 4], usize> = HashMap::new();
        for p in raster.pixels.chunks_exact(4) {
            *counts.entry([p[0], p[1], p[2], p[3]]).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by_key(|(_, n)| *n)
            .map(|(color, _)| color)
            .unwrap()
    }

    #[test]
    fn test_marble_dimensions_and_base_fill() {
        let mut rng = rand::rng();
        let a = synthesize_marble(&mut rng);
        let b = synthesize_marble(&mut rng);

        for raster in [&a, &b] {
            assert_eq!(raster.width, TEXTURE_SIZE);
            assert_eq!(raster.height, TEXTURE_SIZE);
            assert_eq!(raster.pixels.len(), (TEXTURE_SIZE * TEXTURE_SIZE * 4) as usize);
            assert_eq!(dominant_color(raster), BASE_COLOR);
        }
        assert_ne!(a.pixels, b.pixels);
    }

    #[test]
    fn test_marble_seeded_is_reproducible() {
        let a = synthesize_marble(&mut StdRng::seed_from_u64(7));
        let b = synthesize_marble(&mut StdRng::seed_from_u64(7));
        assert!(a.pixels == b.pixels);
    }

    #[test]
    fn test_vein_path_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        for layer in &VEIN_LAYERS {
            for _ in 0..50 {
                let path = vein_path(&mut rng, layer.volatility);
                assert_eq!(path.len(), VEIN_SEGMENTS + 1);

                let start = path[0];
                assert!((0.0..TEXTURE_SIZE as f64).contains(&start.x));
                assert!((0.0..TEXTURE_SIZE as f64).contains(&start.y));

                for pair in path.windows(2) {
                    let d = pair[1] - pair[0];
                    assert!(d.x.abs() <= layer.volatility / 2.0);
                    assert!(d.y.abs() <= layer.volatility / 2.0);
                }
            }
        }
    }

    #[test]
    fn test_stroke_sharp_line() {
        let mut raster = Raster::filled(64, 64, [255, 255, 255, 255]);
        let stroke = Stroke {
            color: [0, 0, 0],
            width: 4.0,
            opacity: 1.0,
            blur: 0.0,
        };
        raster.stroke_polyline(&[DVec2::new(10.0, 32.0), DVec2::new(50.0, 32.0)], &stroke);

        assert_eq!(raster.get_pixel(30, 32), [0, 0, 0, 255]);
        assert_eq!(raster.get_pixel(30, 10), [255, 255, 255, 255]);
        // round cap covers the endpoint itself
        assert_eq!(raster.get_pixel(50, 32), [0, 0, 0, 255]);
        assert_eq!(raster.get_pixel(56, 32), [255, 255, 255, 255]);
    }

    #[test]
    fn test_stroke_opacity_blends() {
        let mut raster = Raster::filled(16, 16, [200, 200, 200, 255]);
        let stroke = Stroke {
            color: [0, 0, 0],
            width: 6.0,
            opacity: 0.5,
            blur: 0.0,
        };
        raster.stroke_polyline(&[DVec2::new(2.0, 8.0), DVec2::new(14.0, 8.0)], &stroke);
        assert_eq!(raster.get_pixel(8, 8), [100, 100, 100, 255]);
    }

    #[test]
    fn test_stroke_blur_spreads_and_softens() {
        let line = [DVec2::new(8.0, 32.0), DVec2::new(56.0, 32.0)];
        let sharp_stroke = Stroke {
            color: [0, 0, 0],
            width: 2.0,
            opacity: 1.0,
            blur: 0.0,
        };
        let blurred_stroke = Stroke {
            blur: 3.0,
            ..sharp_stroke
        };

        let mut sharp = Raster::filled(64, 64, [255, 255, 255, 255]);
        sharp.stroke_polyline(&line, &sharp_stroke);
        let mut blurred = Raster::filled(64, 64, [255, 255, 255, 255]);
        blurred.stroke_polyline(&line, &blurred_stroke);

        assert_eq!(sharp.get_pixel(32, 37), [255, 255, 255, 255]);
        assert!(blurred.get_pixel(32, 37)[0] < 255);
        assert!(blurred.get_pixel(32, 32)[0] > sharp.get_pixel(32, 32)[0]);
    }

    #[test]
    fn test_stroke_outside_is_clipped() {
        let mut raster = Raster::filled(8, 8, BASE_COLOR);
        let stroke = Stroke {
            color: [0, 0, 0],
            width: 3.0,
            opacity: 1.0,
            blur: 2.0,
        };
        raster.stroke_polyline(&[DVec2::new(-500.0, -500.0), DVec2::new(-400.0, -450.0)], &stroke);
        assert!(raster.pixels.chunks_exact(4).all(|p| p == BASE_COLOR));
    }

    #[test]
    fn test_sample_solid() {
        let raster = Raster::filled(4, 4, [255, 0, 51, 255]);
        let c = raster.sample(0.3, 0.9);
        assert!((c[0] - 1.0).abs() < 1e-9);
        assert!(c[1].abs() < 1e-9);
        assert!((c[2] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_sample_clamps_at_edges() {
        let mut raster = Raster::filled(2, 1, [255, 0, 0, 255]);
        raster.pixels[4..8].copy_from_slice(&[0, 0, 255, 255]);
        // the edge taps must not pick up the opposite side
        assert_eq!(raster.sample(0.0, 0.5), [1.0, 0.0, 0.0]);
        assert_eq!(raster.sample(1.0, 0.5), [0.0, 0.0, 1.0]);
        assert_eq!(raster.sample(0.5, 0.0), [0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_write_png() {
        let raster = Raster::filled(16, 16, BASE_COLOR);
        let path = std::env::temp_dir().join("marble3d_test_texture.png");

        write_png(&raster, &path).unwrap();
        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.len() > 0);

        std::fs::remove_file(&path).unwrap();
    }
}
