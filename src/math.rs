use crate::scene::{AmbientLight, Rgb, SpotLight};
use glam::{DMat4, DVec3};

/// Scales candela-style light intensities into display range
const LIGHT_SCALE: f64 = std::f64::consts::PI;

/// Edge function used in rasterization
pub fn edge_function(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> f64 {
    (c[0] - a[0]) * (b[1] - a[1]) - (c[1] - a[1]) * (b[0] - a[0])
}

/// Projects a world-space point. Returns screen position, NDC depth and
/// `1 / w`, or `None` when the point is at or behind the near plane.
pub fn project(
    view_projection: &DMat4,
    point: DVec3,
    width: f64,
    height: f64,
) -> Option<([f64; 2], f64, f64)> {
    let clip = *view_projection * point.extend(1.0);
    if clip.w <= f64::EPSILON {
        return None;
    }
    let inv_w = 1.0 / clip.w;
    let ndc = clip.truncate() * inv_w;
    if ndc.z < -1.0 {
        return None;
    }
    let screen = [(ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height];
    Some((screen, ndc.z, inv_w))
}

/// Blinn-Phong exponent for a roughness in [0, 1]
pub fn shininess(roughness: f64) -> f64 {
    let r = roughness.clamp(0.02, 1.0);
    (2.0 / (r * r) - 2.0).clamp(1.0, 256.0)
}

/// Surface response of one spot light: (diffuse irradiance, specular lobe)
pub fn spot_contribution(
    light: &SpotLight,
    position: DVec3,
    normal: DVec3,
    view_dir: DVec3,
    exponent: f64,
) -> (Rgb, f64) {
    let to_light = light.position - position;
    let distance_sq = to_light.length_squared().max(1e-4);
    let light_dir = to_light / distance_sq.sqrt();

    let n_dot_l = normal.dot(light_dir);
    if n_dot_l <= 0.0 {
        return (Rgb::ZERO, 0.0);
    }
    let falloff = light.cone_attenuation(position) * light.intensity * LIGHT_SCALE / distance_sq;
    if falloff <= 0.0 {
        return (Rgb::ZERO, 0.0);
    }

    let half = (light_dir + view_dir).normalize();
    let specular = normal.dot(half).max(0.0).powf(exponent) * (exponent + 8.0) / 8.0;
    (light.color * (falloff * n_dot_l), specular * falloff * n_dot_l)
}

pub fn ambient_irradiance(ambient: &AmbientLight) -> Rgb {
    ambient.color * ambient.intensity
}

/// Clamps a linear color into 8-bit channels
pub fn to_rgb8(color: Rgb) -> [u8; 3] {
    let c = color.clamp(DVec3::ZERO, DVec3::ONE) * 255.0;
    [c.x.round() as u8, c.y.round() as u8, c.z.round() as u8]
}
