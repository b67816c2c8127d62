//! Geometry primitives: the torus knot mesh and the particle point cloud.

use glam::{DVec2, DVec3};
use rand::Rng;
use std::f64::consts::PI;

/// Number of gold dust particles
pub const PARTICLE_COUNT: usize = 150;
/// Full extent of the particle box, centered at the origin
pub const PARTICLE_BOUNDS: DVec3 = DVec3::new(15.0, 15.0, 10.0);

/// Indexed triangle mesh with per-vertex normals and UVs
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub uvs: Vec<DVec2>,
    /// Counter-clockwise front faces
    pub indices: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }
}

/// Parameters of a (p, q) torus knot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusKnot {
    pub radius: f64,
    pub tube: f64,
    pub tubular_segments: u32,
    pub radial_segments: u32,
    pub p: u32,
    pub q: u32,
}

impl Default for TorusKnot {
    fn default() -> Self {
        Self {
            radius: 1.1,
            tube: 0.35,
            tubular_segments: 200,
            radial_segments: 32,
            p: 2,
            q: 3,
        }
    }
}

impl TorusKnot {
    /// Point on the knot's center curve
    fn curve_point(&self, u: f64) -> DVec3 {
        let (su, cu) = u.sin_cos();
        let qu_over_p = self.q as f64 / self.p as f64 * u;
        let cs = qu_over_p.cos();
        DVec3::new(
            self.radius * (2.0 + cs) * 0.5 * cu,
            self.radius * (2.0 + cs) * su * 0.5,
            self.radius * qu_over_p.sin() * 0.5,
        )
    }

    /// Builds the tube mesh around the knot curve.
    ///
    /// Produces `(tubular + 1) * (radial + 1)` vertices (seams duplicated so
    /// UVs run cleanly from 0 to 1) and `tubular * radial * 2` triangles.
    pub fn build(&self) -> Mesh {
        let tubular = self.tubular_segments.max(3);
        let radial = self.radial_segments.max(3);
        let mut mesh = Mesh::default();

        for i in 0..=tubular {
            let u = i as f64 / tubular as f64 * self.p as f64 * PI * 2.0;
            let p1 = self.curve_point(u);
            let p2 = self.curve_point(u + 0.01);

            // moving frame along the curve
            let tangent = p2 - p1;
            let mut normal = p2 + p1;
            let binormal = tangent.cross(normal).normalize();
            normal = binormal.cross(tangent).normalize();

            for j in 0..=radial {
                let v = j as f64 / radial as f64 * PI * 2.0;
                let cx = -self.tube * v.cos();
                let cy = self.tube * v.sin();
                let position = p1 + normal * cx + binormal * cy;

                mesh.positions.push(position);
                mesh.normals.push((position - p1).normalize());
                mesh.uvs.push(DVec2::new(
                    i as f64 / tubular as f64,
                    j as f64 / radial as f64,
                ));
            }
        }

        let stride = radial + 1;
        for j in 1..=tubular {
            for i in 1..=radial {
                let a = stride * (j - 1) + (i - 1);
                let b = stride * j + (i - 1);
                let c = stride * j + i;
                let d = stride * (j - 1) + i;
                mesh.indices.push([a, b, d]);
                mesh.indices.push([b, c, d]);
            }
        }

        mesh
    }
}

/// Scatters `count` points uniformly inside [`PARTICLE_BOUNDS`]
pub fn particle_cloud<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<DVec3> {
    (0..count)
        .map(|_| {
            DVec3::new(
                (rng.random::<f64>() - 0.5) * PARTICLE_BOUNDS.x,
                (rng.random::<f64>() - 0.5) * PARTICLE_BOUNDS.y,
                (rng.random::<f64>() - 0.5) * PARTICLE_BOUNDS.z,
            )
        })
        .collect()
}
