use assert2::assert;
use bon::bon;
use nalgebra::{Matrix4, Perspective3, Translation3, Vector4};

use crate::geometry::{FloatType, Ray, WorldPoint, WorldVector, euler_rotation_deg};

const DEFAULT_FOV_DEG: FloatType = 60.0;
const DEFAULT_NEAR: FloatType = 0.1;
const DEFAULT_FAR: FloatType = 100.0;

/// Pinhole camera generating primary rays through its inverse view and
/// projection matrices.
///
/// Pose and lens setters recompute the matrices immediately; rays always
/// reflect the latest state.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    position: WorldPoint,
    /// Euler rotation in degrees, applied X then Y then Z
    rotation_deg: WorldVector,

    fov_deg: FloatType,
    near: FloatType,
    far: FloatType,

    window_size: (u32, u32),

    view: Matrix4<FloatType>,
    proj: Matrix4<FloatType>,
    inv_view: Matrix4<FloatType>,
    inv_proj: Matrix4<FloatType>,
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        window_size: (u32, u32),
        position: Option<WorldPoint>,
        rotation_deg: Option<WorldVector>,
    ) -> Camera {
        assert!(window_size.0 > 0);
        assert!(window_size.1 > 0);

        let mut camera = Camera {
            position: position.unwrap_or_else(WorldPoint::origin),
            rotation_deg: rotation_deg.unwrap_or_else(WorldVector::zeros),
            fov_deg: DEFAULT_FOV_DEG,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            window_size,
            view: Matrix4::identity(),
            proj: Matrix4::identity(),
            inv_view: Matrix4::identity(),
            inv_proj: Matrix4::identity(),
        };
        camera.recalculate_matrices();
        camera
    }
}

impl Camera {
    fn recalculate_matrices(&mut self) {
        let rotation = euler_rotation_deg(&self.rotation_deg);
        let translation = Translation3::from(self.position.coords);

        self.inv_view = translation.to_homogeneous() * rotation.to_homogeneous();
        self.view = rotation.inverse().to_homogeneous() * translation.inverse().to_homogeneous();

        let aspect = self.window_size.0 as FloatType / self.window_size.1 as FloatType;
        let perspective = Perspective3::new(aspect, self.fov_deg.to_radians(), self.near, self.far);
        self.proj = perspective.to_homogeneous();
        self.inv_proj = perspective.inverse();
    }

    /// Generates the primary ray through the centre of pixel `(x, y)`.
    ///
    /// The pixel is unprojected at the near and far clip planes; the
    /// difference gives the camera-space direction, which the inverse view
    /// rotation takes to world space. The ray starts at the camera position
    /// in air (`current_ior = 1`).
    pub fn get_ray(&self, pixel_x: u32, pixel_y: u32, width: u32, height: u32) -> Ray {
        let nx = (pixel_x as FloatType + 0.5) / width as FloatType * 2.0 - 1.0;
        let ny = (pixel_y as FloatType + 0.5) / height as FloatType * 2.0 - 1.0;

        let cam_near = self.inv_proj * Vector4::new(nx, ny, -1.0, 1.0);
        let cam_near = cam_near / cam_near.w;
        let cam_far = self.inv_proj * Vector4::new(nx, ny, 1.0, 1.0);
        let cam_far = cam_far / cam_far.w;

        let dir_cam = (cam_far - cam_near).xyz();
        let dir_world = self.inv_view.fixed_view::<3, 3>(0, 0) * dir_cam;

        Ray::new(self.position, dir_world)
    }

    pub fn position(&self) -> WorldPoint {
        self.position
    }

    pub fn set_position(&mut self, position: WorldPoint) {
        self.position = position;
        self.recalculate_matrices();
    }

    pub fn rotation_deg(&self) -> WorldVector {
        self.rotation_deg
    }

    pub fn set_rotation_deg(&mut self, rotation_deg: WorldVector) {
        self.rotation_deg = rotation_deg;
        self.recalculate_matrices();
    }

    pub fn fov_deg(&self) -> FloatType {
        self.fov_deg
    }

    pub fn set_fov_deg(&mut self, fov_deg: FloatType) {
        self.fov_deg = fov_deg;
        self.recalculate_matrices();
    }

    pub fn near(&self) -> FloatType {
        self.near
    }

    pub fn set_near(&mut self, near: FloatType) {
        self.near = near;
        self.recalculate_matrices();
    }

    pub fn far(&self) -> FloatType {
        self.far
    }

    pub fn set_far(&mut self, far: FloatType) {
        self.far = far;
        self.recalculate_matrices();
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    pub fn set_window_size(&mut self, window_size: (u32, u32)) {
        assert!(window_size.0 > 0);
        assert!(window_size.1 > 0);
        self.window_size = window_size;
        self.recalculate_matrices();
    }

    /// World-space view direction (-Z of the camera frame).
    pub fn forward(&self) -> WorldVector {
        -WorldVector::new(self.view[(2, 0)], self.view[(2, 1)], self.view[(2, 2)]).normalize()
    }

    pub fn right(&self) -> WorldVector {
        WorldVector::new(self.view[(0, 0)], self.view[(0, 1)], self.view[(0, 2)]).normalize()
    }

    pub fn up(&self) -> WorldVector {
        WorldVector::new(self.view[(1, 0)], self.view[(1, 1)], self.view[(1, 2)]).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    fn default_camera() -> Camera {
        Camera::builder().window_size((800, 600)).build()
    }

    #[test]
    fn rays_are_normalized() {
        let camera = default_camera();
        for (x, y) in [(0, 0), (400, 300), (799, 599), (13, 522)] {
            let ray = camera.get_ray(x, y, 800, 600);
            assert!((ray.direction.norm() - 1.0).abs() < 1e-5);
            assert!(ray.current_ior == 1.0);
        }
    }

    #[test]
    fn centre_ray_looks_down_negative_z() {
        let camera = default_camera();
        let ray = camera.get_ray(400, 300, 800, 600);
        assert!(ray.direction.x.abs() < 2e-3);
        assert!(ray.direction.y.abs() < 2e-3);
        assert!(ray.direction.z < -0.999);
        assert!(ray.origin == WorldPoint::origin());
    }

    #[test]
    fn left_right_up_down() {
        let camera = default_camera();
        let centre = camera.get_ray(400, 300, 800, 600);
        let left = camera.get_ray(0, 300, 800, 600);
        let right = camera.get_ray(799, 300, 800, 600);
        let top = camera.get_ray(400, 0, 800, 600);
        let bottom = camera.get_ray(400, 599, 800, 600);

        assert!(left.direction.x < centre.direction.x);
        assert!(right.direction.x > centre.direction.x);
        assert!(top.direction.y < centre.direction.y);
        assert!(bottom.direction.y > centre.direction.y);
    }

    #[test]
    fn rotation_turns_the_view() {
        let mut camera = default_camera();
        camera.set_rotation_deg(WorldVector::new(0.0, 90.0, 0.0));

        let ray = camera.get_ray(400, 300, 800, 600);
        // Yaw of 90 degrees swings -Z to -X
        assert!(ray.direction.x < -0.999);
        assert!((camera.forward() - WorldVector::new(-1.0, 0.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn position_offsets_ray_origins() {
        let mut camera = default_camera();
        camera.set_position(WorldPoint::new(1.0, 2.0, 3.0));
        let ray = camera.get_ray(123, 456, 800, 600);
        assert!(ray.origin == WorldPoint::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn fov_widens_the_frustum() {
        let mut camera = default_camera();
        let narrow = camera.get_ray(0, 300, 800, 600);
        camera.set_fov_deg(90.0);
        let wide = camera.get_ray(0, 300, 800, 600);
        assert!(wide.direction.x < narrow.direction.x);
    }
}
