use crate::config::{CameraConfig, ControlsConfig};
use crate::scene::Aabb;
use glam::{Mat4, Vec2, Vec3};

const MIN_POLAR: f32 = 1e-3;
const MAX_POLAR: f32 = std::f32::consts::PI - 1e-3;

/// Perspective camera looking at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: Vec3::from(config.position),
            target: Vec3::from(config.target),
            up: Vec3::Y,
            fov_y_deg: config.fov_deg,
            aspect,
            near: config.near,
            far: config.far,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// wgpu clip space: depth in [0, 1].
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    /// Keep the viewing direction and back off until `bounds` fits the view.
    pub fn frame_bounds_preserve_orientation(&mut self, bounds: &Aabb) {
        if bounds.is_empty() {
            return;
        }
        let forward = self.forward();
        let radius = bounds.extent().length().max(1e-3);
        let half_fov_y = self.fov_y_deg.to_radians() * 0.5;
        let half_fov_x = (half_fov_y.tan() * self.aspect).atan();
        let distance = radius / half_fov_y.min(half_fov_x).sin().max(1e-3);
        self.target = bounds.center();
        self.position = self.target - forward * distance;
        self.far = self.far.max(distance + radius * 2.0);
    }
}

/// Accumulated user input, applied once per frame by `OrbitControls::update`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitInput {
    /// Pixels dragged with the rotate button.
    pub rotate_px: Vec2,
    /// Pixels dragged with the pan button.
    pub pan_px: Vec2,
    /// Wheel steps; positive zooms in.
    pub zoom_steps: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CameraMovement {
    pub aim_left: bool,
    pub aim_right: bool,
    pub aim_up: bool,
    pub aim_down: bool,
}

/// Orbit around a target: drag rotates, secondary drag pans, wheel dollies.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pending: OrbitInput,
    rotate_speed: f32,
    zoom_speed: f32,
    pan_speed: f32,
    min_distance: f32,
    max_distance: f32,
}

impl OrbitControls {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            pending: OrbitInput::default(),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance.unwrap_or(f32::INFINITY),
        }
    }

    pub fn rotate(&mut self, delta_px: Vec2) {
        self.pending.rotate_px += delta_px;
    }

    pub fn pan(&mut self, delta_px: Vec2) {
        self.pending.pan_px += delta_px;
    }

    pub fn zoom(&mut self, steps: f32) {
        self.pending.zoom_steps += steps;
    }

    pub fn has_pending(&self) -> bool {
        self.pending != OrbitInput::default()
    }

    /// Arrow-key orbiting, in pixels per second equivalent.
    pub fn apply_movement(&mut self, movement: &CameraMovement, frame_dt: f32) {
        let step = 240.0 * frame_dt;
        let mut delta = Vec2::ZERO;
        if movement.aim_left {
            delta.x -= step;
        }
        if movement.aim_right {
            delta.x += step;
        }
        if movement.aim_up {
            delta.y -= step;
        }
        if movement.aim_down {
            delta.y += step;
        }
        if delta != Vec2::ZERO {
            self.rotate(delta);
        }
    }

    /// Apply pending input to `camera`. `viewport_height` is in pixels.
    /// Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera, viewport_height: f32) -> bool {
        let input = std::mem::take(&mut self.pending);
        if input == OrbitInput::default() {
            return false;
        }
        let height = viewport_height.max(1.0);

        let offset = camera.position - camera.target;
        let mut radius = offset.length().max(1e-4);
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        // A full-height drag turns the camera by one full revolution.
        let tau = std::f32::consts::TAU;
        azimuth -= tau * input.rotate_px.x / height * self.rotate_speed;
        polar -= tau * input.rotate_px.y / height * self.rotate_speed;
        polar = polar.clamp(MIN_POLAR, MAX_POLAR);
        wrap_angle(&mut azimuth);

        if input.zoom_steps != 0.0 {
            let scale = 0.95f32.powf(self.zoom_speed * input.zoom_steps.abs());
            if input.zoom_steps > 0.0 {
                radius *= scale;
            } else {
                radius /= scale;
            }
        }
        radius = radius.clamp(self.min_distance.max(1e-4), self.max_distance);

        if input.pan_px != Vec2::ZERO {
            // Pan so the point under the cursor follows it at the target depth.
            let (_, right, up) = view_basis(camera);
            let world_per_px =
                2.0 * radius * (camera.fov_y_deg.to_radians() * 0.5).tan() / height;
            let shift = (-right * input.pan_px.x + up * input.pan_px.y)
                * world_per_px
                * self.pan_speed;
            camera.target += shift;
        }

        let sin_polar = polar.sin();
        let offset = Vec3::new(
            radius * sin_polar * azimuth.sin(),
            radius * polar.cos(),
            radius * sin_polar * azimuth.cos(),
        );
        camera.position = camera.target + offset;
        true
    }
}

fn view_basis(camera: &PerspectiveCamera) -> (Vec3, Vec3, Vec3) {
    let forward = camera.forward();
    let right = forward.cross(camera.up).try_normalize().unwrap_or(Vec3::X);
    let up = right.cross(forward);
    (forward, right, up)
}

fn wrap_angle(angle: &mut f32) {
    if angle.is_finite() {
        *angle = (*angle + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU)
            - std::f32::consts::PI;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(position: Vec3) -> PerspectiveCamera {
        PerspectiveCamera {
            position,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_deg: 45.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    #[test]
    fn update_without_input_is_a_no_op() {
        let mut controls = OrbitControls::new(&ControlsConfig::default());
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 10.0));
        assert!(!controls.update(&mut camera, 720.0));
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn rotation_keeps_distance_to_target() {
        let mut controls = OrbitControls::new(&ControlsConfig::default());
        let mut camera = camera_at(Vec3::new(3.0, 4.0, 12.0));
        let before = camera.position.distance(camera.target);
        controls.rotate(Vec2::new(120.0, -45.0));
        assert!(controls.update(&mut camera, 720.0));
        let after = camera.position.distance(camera.target);
        assert!((before - after).abs() < 1e-3);
        assert!(!controls.has_pending());
    }

    #[test]
    fn polar_angle_never_reaches_the_pole() {
        let mut controls = OrbitControls::new(&ControlsConfig::default());
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 10.0));
        controls.rotate(Vec2::new(0.0, 10_000.0));
        controls.update(&mut camera, 720.0);
        assert!(camera.position.is_finite());
        let offset = (camera.position - camera.target).normalize();
        assert!(offset.dot(Vec3::Y).abs() < 1.0);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let config = ControlsConfig {
            min_distance: 5.0,
            max_distance: Some(20.0),
            ..ControlsConfig::default()
        };
        let mut controls = OrbitControls::new(&config);
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 10.0));
        controls.zoom(200.0);
        controls.update(&mut camera, 720.0);
        assert!((camera.position.length() - 5.0).abs() < 1e-3);
        controls.zoom(-400.0);
        controls.update(&mut camera, 720.0);
        assert!((camera.position.length() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn pan_moves_target_and_camera_together() {
        let mut controls = OrbitControls::new(&ControlsConfig::default());
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 10.0));
        controls.pan(Vec2::new(100.0, 0.0));
        controls.update(&mut camera, 720.0);
        assert!(camera.target.x < 0.0);
        assert!((camera.position.x - camera.target.x).abs() < 1e-3);
    }

    #[test]
    fn frame_bounds_preserves_orientation() {
        let mut camera = camera_at(Vec3::new(5.0, 6.0, 7.0));
        let forward = camera.forward();
        let bounds = Aabb {
            min: Vec3::new(9.0, -1.0, -1.0),
            max: Vec3::new(11.0, 1.0, 1.0),
        };
        camera.frame_bounds_preserve_orientation(&bounds);
        assert!((camera.forward() - forward).length() < 1e-4);
        assert!((camera.target - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
        assert!(camera.position.is_finite());
    }

    #[test]
    fn arrow_keys_queue_rotation() {
        let mut controls = OrbitControls::new(&ControlsConfig::default());
        let movement = CameraMovement {
            aim_right: true,
            ..CameraMovement::default()
        };
        controls.apply_movement(&movement, 1.0 / 60.0);
        assert!(controls.has_pending());
    }
}
