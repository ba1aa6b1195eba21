use crate::config::GameConfig;
use crate::controller::input::{InputProcessor, InputState};
use crate::model::{Camera, RenderableModel};

/// Drives the camera from the keyboard and keeps the bee avatar banked and
/// pitched to match.
///
/// The camera always creeps forward. Turning pans the camera and banks the
/// bee up to `max_heading`; tilting pitches both up to `max_tilt`. Neither
/// accumulator drifts back to zero on its own.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub slow_step: f32,
    pub fast_step: f32,
    pub max_heading: f32,
    pub heading_step: f32,
    pub pan_step: f32,
    pub max_tilt: f32,
    pub tilt_step: f32,
    heading: f32,
    tilt: f32,
}

impl CameraController {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            slow_step: config.slow_step,
            fast_step: config.fast_step,
            max_heading: config.max_heading,
            heading_step: config.heading_step,
            pan_step: config.pan_step,
            max_tilt: config.max_tilt,
            tilt_step: config.tilt_step,
            heading: 0.0,
            tilt: 0.0,
        }
    }

    /// Bank in degrees; positive is left.
    pub fn heading(&self) -> f32 { self.heading }

    /// Pitch in degrees; negative is up.
    pub fn tilt(&self) -> f32 { self.tilt }

    /// Apply one frame of input.
    pub fn update(
        &mut self,
        input: &InputState,
        processor: &InputProcessor,
        camera: &mut Camera,
        avatar: &mut RenderableModel,
    ) {
        let step = if processor.is_fast_forward(input) { self.fast_step } else { self.slow_step };
        camera.move_local(0.0, 0.0, -step);

        if processor.is_turning_left(input) {
            self.turn(1.0, camera, avatar);
        } else if processor.is_turning_right(input) {
            self.turn(-1.0, camera, avatar);
        }

        if processor.is_tilting_up(input) {
            self.pitch(-1.0, camera, avatar);
        } else if processor.is_tilting_down(input) {
            self.pitch(1.0, camera, avatar);
        }
    }

    fn turn(&mut self, direction: f32, camera: &mut Camera, avatar: &mut RenderableModel) {
        // while still banked the other way the bee levels out before the view turns
        let pan = if self.heading * direction < 0.0 { 0.0 } else { self.pan_step * direction };

        let next = (self.heading + self.heading_step * direction)
            .clamp(-self.max_heading, self.max_heading);
        let bank = next - self.heading;
        self.heading = next;

        avatar.rotate(bank, pan, 0.0);
        camera.pan(pan);
    }

    fn pitch(&mut self, direction: f32, camera: &mut Camera, avatar: &mut RenderableModel) {
        let next = (self.tilt + self.tilt_step * direction).clamp(-self.max_tilt, self.max_tilt);
        let delta = next - self.tilt;
        if delta == 0.0 {
            return;
        }
        self.tilt = next;
        camera.tilt(delta);
        avatar.rotate(0.0, 0.0, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{MeshId, TextureId};
    use glam::Vec3;

    struct Rig {
        controller: CameraController,
        processor: InputProcessor,
        input: InputState,
        camera: Camera,
        bee: RenderableModel,
    }

    impl Rig {
        fn new() -> Self {
            let mut camera = Camera::new(800, 600);
            camera.set_position(Vec3::ZERO);
            camera.look_at(Vec3::new(0.0, 0.0, 300.0));
            Self {
                controller: CameraController::new(&GameConfig::DEFAULT),
                processor: InputProcessor::default(),
                input: InputState::new(),
                camera,
                bee: RenderableModel::new(vec![MeshId(0), MeshId(1)], TextureId(0), 0.25, 2).unwrap(),
            }
        }

        fn frame(&mut self) {
            self.controller.update(&self.input, &self.processor, &mut self.camera, &mut self.bee);
        }
    }

    #[test]
    fn idle_camera_creeps_forward() {
        let mut rig = Rig::new();
        rig.frame();
        assert!((rig.camera.eye - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-3);
        assert_eq!(rig.controller.heading(), 0.0);
        assert_eq!(rig.controller.tilt(), 0.0);
        assert_eq!(rig.bee.rotation(), Vec3::ZERO);
    }

    #[test]
    fn fast_forward_takes_the_long_step() {
        let mut rig = Rig::new();
        rig.input.set_key("KeyW", true);
        rig.frame();
        assert!((rig.camera.eye.z - 25.0).abs() < 1e-3);
    }

    #[test]
    fn holding_left_clamps_heading_at_75_on_frame_38() {
        let mut rig = Rig::new();
        rig.input.set_key("ArrowLeft", true);
        for frame in 1..=40 {
            rig.frame();
            let expected = (2.0 * frame as f32).min(75.0);
            assert_eq!(rig.controller.heading(), expected, "frame {frame}");
            // bank follows the heading exactly, yaw follows the pan
            assert_eq!(rig.bee.rotation().x, expected);
            assert_eq!(rig.bee.rotation().y, frame as f32);
        }
        assert_eq!(rig.controller.heading(), 75.0);
    }

    #[test]
    fn heading_never_leaves_bounds() {
        let mut rig = Rig::new();
        let pattern = ["ArrowRight", "ArrowLeft", "ArrowRight"];
        for (i, key) in pattern.iter().enumerate() {
            rig.input.clear_keys();
            rig.input.set_key(key, true);
            for _ in 0..(60 + i * 7) {
                rig.frame();
                assert!(rig.controller.heading().abs() <= 75.0);
            }
        }
        assert_eq!(rig.controller.heading(), -75.0);
    }

    #[test]
    fn reversing_while_banked_levels_out_before_panning() {
        let mut rig = Rig::new();
        rig.input.set_key("ArrowRight", true);
        for _ in 0..5 {
            rig.frame();
        }
        assert_eq!(rig.controller.heading(), -10.0);
        let yaw_before = rig.bee.rotation().y;

        rig.input.set_key("ArrowRight", false);
        rig.input.set_key("ArrowLeft", true);
        rig.frame();
        assert_eq!(rig.controller.heading(), -8.0);
        // no pan while still banked right
        assert_eq!(rig.bee.rotation().y, yaw_before);
    }

    #[test]
    fn tilt_stops_at_25_degrees() {
        let mut rig = Rig::new();
        rig.input.set_key("ArrowUp", true);
        for _ in 0..80 {
            rig.frame();
            assert!(rig.controller.tilt() >= -25.0);
        }
        assert_eq!(rig.controller.tilt(), -25.0);
        assert_eq!(rig.bee.rotation().z, -25.0);

        rig.input.set_key("ArrowUp", false);
        rig.input.set_key("ArrowDown", true);
        for _ in 0..200 {
            rig.frame();
        }
        assert_eq!(rig.controller.tilt(), 25.0);
        assert_eq!(rig.bee.rotation().z, 25.0);
    }

    #[test]
    fn left_beats_right_when_both_held() {
        let mut rig = Rig::new();
        rig.input.set_key("ArrowLeft", true);
        rig.input.set_key("ArrowRight", true);
        rig.frame();
        assert_eq!(rig.controller.heading(), 2.0);
    }
}
