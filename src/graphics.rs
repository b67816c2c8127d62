use crate::math::edge_function;
use crate::scene::Rgb;
use crate::vertex::{Fragment, Vertex};

/// Draws a front-facing triangle with per-pixel shading.
///
/// Back faces (clockwise on screen) are skipped. Attributes are
/// interpolated perspective-correctly; depth is linear in screen space.
pub fn draw_triangle<F>(
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
    color_buffer: &mut [Rgb],
    z_buffer: &mut [f64],
    width: usize,
    height: usize,
    shade: &F,
) where
    F: Fn(&Fragment) -> Rgb,
{
    if width == 0 || height == 0 {
        return;
    }

    // Precompute area of the triangle
    let area = edge_function(&v0.screen_position, &v1.screen_position, &v2.screen_position);
    if area <= 0.0 {
        return;
    }

    // Compute bounding box of the triangle
    let min_x = v0.screen_position[0]
        .min(v1.screen_position[0])
        .min(v2.screen_position[0])
        .floor()
        .max(0.0);
    let max_x = v0.screen_position[0]
        .max(v1.screen_position[0])
        .max(v2.screen_position[0])
        .ceil()
        .min(width as f64 - 1.0);
    let min_y = v0.screen_position[1]
        .min(v1.screen_position[1])
        .min(v2.screen_position[1])
        .floor()
        .max(0.0);
    let max_y = v0.screen_position[1]
        .max(v1.screen_position[1])
        .max(v2.screen_position[1])
        .ceil()
        .min(height as f64 - 1.0);
    if max_x < min_x || max_y < min_y {
        return;
    }

    for y in min_y as usize..=max_y as usize {
        for x in min_x as usize..=max_x as usize {
            let p = [x as f64 + 0.5, y as f64 + 0.5];

            let w0 = edge_function(&v1.screen_position, &v2.screen_position, &p);
            let w1 = edge_function(&v2.screen_position, &v0.screen_position, &p);
            let w2 = edge_function(&v0.screen_position, &v1.screen_position, &p);
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            // Normalize barycentric coordinates
            let w0 = w0 / area;
            let w1 = w1 / area;
            let w2 = w2 / area;

            // Depth test
            let depth = v0.depth * w0 + v1.depth * w1 + v2.depth * w2;
            let offset = y * width + x;
            if depth >= z_buffer[offset] {
                continue;
            }
            z_buffer[offset] = depth;

            // Perspective-correct weights
            let p0 = w0 * v0.inv_w;
            let p1 = w1 * v1.inv_w;
            let p2 = w2 * v2.inv_w;
            let sum = p0 + p1 + p2;
            let (p0, p1, p2) = (p0 / sum, p1 / sum, p2 / sum);

            let fragment = Fragment {
                position: v0.position * p0 + v1.position * p1 + v2.position * p2,
                normal: (v0.normal * p0 + v1.normal * p1 + v2.normal * p2).normalize_or_zero(),
                uv: v0.uv * p0 + v1.uv * p1 + v2.uv * p2,
            };
            color_buffer[offset] = shade(&fragment);
        }
    }
}

/// Draws a square splat centered on `center`, hidden behind anything closer
/// than `depth`. Additive splats brighten what is underneath, others blend
/// over it. Does not write depth.
pub fn draw_point(
    center: [f64; 2],
    depth: f64,
    radius: f64,
    color: Rgb,
    opacity: f64,
    additive: bool,
    color_buffer: &mut [Rgb],
    z_buffer: &[f64],
    width: usize,
    height: usize,
) {
    let radius = radius.max(0.5);
    let x0 = (center[0] - radius).floor().max(0.0) as i64;
    let y0 = (center[1] - radius).floor().max(0.0) as i64;
    let x1 = ((center[0] + radius).ceil() as i64).min(width as i64);
    let y1 = ((center[1] + radius).ceil() as i64).min(height as i64);

    for y in y0..y1 {
        for x in x0..x1 {
            let offset = y as usize * width + x as usize;
            if depth >= z_buffer[offset] {
                continue;
            }
            let dst = &mut color_buffer[offset];
            if additive {
                *dst += color * opacity;
            } else {
                *dst = dst.lerp(color, opacity);
            }
        }
    }
}
