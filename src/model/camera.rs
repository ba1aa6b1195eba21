use glam::{Mat4, Quat, Vec2, Vec3};

/// Eye/center/up camera. World space is +X right, +Y down, +Z towards the
/// viewer, so the projection flips Y.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let fov_y = 60f32.to_radians();
        Self {
            // far enough back that the canvas height fills the view at z = 0
            eye: Vec3::new(0.0, 0.0, (height as f32 / 2.0) / (fov_y / 2.0).tan()),
            center: Vec3::ZERO,
            up: Vec3::Y,
            fov_y,
            aspect: width as f32 / height.max(1) as f32,
            z_near: 0.1,
            z_far: 10000.0,
        }
    }

    pub fn set_perspective(&mut self, fov_y_deg: f32, z_near: f32, z_far: f32) {
        self.fov_y = fov_y_deg.to_radians();
        self.z_near = z_near;
        self.z_far = z_far;
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) { self.aspect = width as f32 / height.max(1) as f32; }

    /// Camera-local (x, y, z) axes; z points from the center back to the eye.
    pub fn local_axes(&self) -> (Vec3, Vec3, Vec3) {
        let z = (self.eye - self.center).normalize();
        let x = self.up.cross(z).normalize();
        let y = z.cross(x).normalize();
        (x, y, z)
    }

    /// Translate eye and center together along the local axes.
    pub fn move_local(&mut self, x: f32, y: f32, z: f32) {
        let (lx, ly, lz) = self.local_axes();
        let delta = lx * x + ly * y + lz * z;
        self.eye += delta;
        self.center += delta;
    }

    /// Turn left (positive) or right about the up vector, in degrees.
    pub fn pan(&mut self, degrees: f32) {
        self.rotate_view(degrees, self.up);
    }

    /// Look down (positive) or up about the local x axis, in degrees.
    pub fn tilt(&mut self, degrees: f32) {
        let (x, _, _) = self.local_axes();
        self.rotate_view(degrees, x);
    }

    fn rotate_view(&mut self, degrees: f32, axis: Vec3) {
        if degrees == 0.0 {
            return;
        }
        let rot = Quat::from_axis_angle(axis.normalize(), degrees.to_radians());
        self.center = self.eye + rot * (self.center - self.eye);
        self.up = rot * self.up;
    }

    /// Move the eye to `position`, keeping the viewing direction.
    pub fn set_position(&mut self, position: Vec3) {
        let delta = position - self.eye;
        self.eye = position;
        self.center += delta;
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.center = target;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.center, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        let flip_y = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0));
        flip_y * Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Map a world point to viewport coordinates (origin top-left, y down).
/// Returns `None` for points behind the camera.
pub fn project_to_screen(view_proj: Mat4, world: Vec3, viewport: Vec2) -> Option<Vec2> {
    let clip = view_proj * world.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x + 1.0) * 0.5 * viewport.x,
        (1.0 - ndc.y) * 0.5 * viewport.y,
    ))
}
