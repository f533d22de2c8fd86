use glam::{Mat4, Vec3};

use crate::mesh::BBox;

/// Perspective camera defined by eye position, target, and projection
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye (camera) position in world space.
    pub eye: Vec3,
    /// Look-at target position.
    pub target: Vec3,
    /// Up direction vector.
    pub up: Vec3,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 100.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect: 1.0,
            fovy: 30.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

impl Camera {
    /// Build the combined view-projection matrix.
    pub fn build_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        // perspective_rh already uses [0,1] depth range (wgpu/Vulkan
        // convention)
        let proj = Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        );
        proj * view
    }

    /// Unit vector from eye toward target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or(Vec3::NEG_Z)
    }

    /// Move the eye along the current view direction so that `bbox` fills
    /// the vertical field of view, and retarget its centre. Near and far
    /// planes are refit to the box.
    pub fn frame_bbox(&mut self, bbox: &BBox) {
        let center = bbox.center();
        let radius = (bbox.diagonal() * 0.5).max(f32::EPSILON);
        let half_fov = (self.fovy.to_radians() * 0.5).max(f32::EPSILON);
        let distance = radius / half_fov.sin();
        let direction = self.forward();

        self.target = center;
        self.eye = center - direction * distance;
        self.znear = (distance - radius).max(distance * 0.01);
        self.zfar = distance + radius * 2.0;
    }

    /// Project a world-space point to pixel coordinates in a
    /// `width` x `height` viewport (origin top-left). `None` if the point is
    /// behind the eye.
    pub fn project(&self, point: Vec3, width: u32, height: u32) -> Option<(f32, f32)> {
        let clip = self.build_matrix() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some((
            (ndc.x * 0.5 + 0.5) * width as f32,
            (0.5 - ndc.y * 0.5) * height as f32,
        ))
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
/// GPU uniform buffer holding the view-projection matrix and camera metadata.
pub struct CameraUniform {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Camera world-space position.
    pub position: [f32; 3],
    /// Viewport aspect ratio.
    pub aspect: f32,
    /// Camera forward direction; the headlight shines along it.
    pub forward: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy: f32,
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    /// Create a new camera uniform with identity view-projection.
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 3],
            aspect: 1.0,
            forward: [0.0, 0.0, -1.0],
            fovy: 30.0,
        }
    }

    /// Uniform for `camera`.
    pub fn from_camera(camera: &Camera) -> Self {
        let mut uniform = Self::new();
        uniform.update_view_proj(camera);
        uniform
    }

    /// Update uniform fields from the given camera's current state.
    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_proj = camera.build_matrix().to_cols_array_2d();
        self.position = camera.eye.to_array();
        self.aspect = camera.aspect;
        self.forward = camera.forward().to_array();
        self.fovy = camera.fovy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_sixteen_byte_aligned() {
        assert_eq!(size_of::<CameraUniform>() % 16, 0);
    }

    #[test]
    fn framing_centres_the_box() {
        let mut camera = Camera::default();
        let bbox = BBox::from_min_max([10.0, 10.0, 10.0], [20.0, 20.0, 20.0]);
        camera.frame_bbox(&bbox);
        assert_eq!(camera.target, Vec3::splat(15.0));
        assert!(camera.znear > 0.0 && camera.znear < camera.zfar);

        let (x, y) = camera.project(bbox.center(), 800, 600).unwrap();
        assert!((x - 400.0).abs() < 1e-2);
        assert!((y - 300.0).abs() < 1e-2);
    }

    #[test]
    fn framed_box_fits_the_view() {
        let mut camera = Camera::default();
        let bbox = BBox::from_min_max([-5.0, -50.0, -5.0], [5.0, 50.0, 5.0]);
        camera.frame_bbox(&bbox);
        for corner in [bbox.min, bbox.max] {
            let (_, y) = camera.project(corner, 600, 600).unwrap();
            assert!((0.0..=600.0).contains(&y), "corner projected to {y}");
        }
    }

    #[test]
    fn points_behind_the_eye_do_not_project() {
        let camera = Camera::default();
        assert!(camera.project(Vec3::new(0.0, 0.0, 200.0), 100, 100).is_none());
    }
}
