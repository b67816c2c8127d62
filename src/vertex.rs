use glam::{DVec2, DVec3};

/// Vertex after model, view and projection transforms
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    /// World-space position, used for lighting and fog
    pub position: DVec3,
    pub screen_position: [f64; 2],
    /// Normalized device depth in [-1, 1]
    pub depth: f64,
    /// Reciprocal of clip-space w, for perspective-correct interpolation
    pub inv_w: f64,
    pub normal: DVec3,
    pub uv: DVec2,
}

/// Interpolated surface sample handed to the shader
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub position: DVec3,
    pub normal: DVec3,
    pub uv: DVec2,
}
