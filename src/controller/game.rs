use glam::Vec3;
use rand::Rng;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::controller::camera_controller::CameraController;
use crate::controller::input::{InputProcessor, InputState, KeyBindings};
use crate::model::{Camera, Scene, SceneAssets};
use crate::view::frame::{rgb, Canvas, Frame};

const TITLE_COLOR: [u8; 4] = [0xED, 0x22, 0x5D, 0xFF];
const SKY_BLUE: [u8; 4] = [135, 206, 235, 255];
const GRASS: [u8; 4] = [107, 142, 35, 255];
const INSTRUCTIONS_WIDTH: f32 = 800.0;
const INSTRUCTIONS_ASPECT: f32 = 1.77777;

/// How far below the look target the bee flies.
const BEE_DROP: f32 = 50.0;
const BEE_ROTATION: Vec3 = Vec3::new(180.0, -90.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Title,
    Playing,
}

/// One game session: the title screen, then the flight.
pub struct Game {
    config: GameConfig,
    processor: InputProcessor,
    scene: Scene,
    camera: Camera,
    controller: CameraController,
    mode: GameMode,
    frame_count: u64,
    /// Flipped before each bee draw; `false` selects the first pose.
    bee_pose: bool,
}

impl Game {
    pub fn new<R: Rng>(
        assets: SceneAssets,
        config: GameConfig,
        bindings: KeyBindings,
        width: u32,
        height: u32,
        rng: &mut R,
    ) -> Self {
        let scene = Scene::new(assets, &config, rng);
        let mut camera = Camera::new(width, height);
        camera.set_perspective(config.fov_y_deg, config.z_near, config.z_far);
        Self {
            controller: CameraController::new(&config),
            config,
            processor: InputProcessor::new(bindings),
            scene,
            camera,
            mode: GameMode::Title,
            frame_count: 0,
            bee_pose: true,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    pub fn mode(&self) -> GameMode { self.mode }
    pub fn camera(&self) -> &Camera { &self.camera }
    pub fn scene(&self) -> &Scene { &self.scene }
    pub fn config(&self) -> &GameConfig { &self.config }

    /// Frames rendered so far, counting the one in progress.
    pub fn frame_count(&self) -> u64 { self.frame_count }

    /// Advance one frame and record what to draw.
    pub fn update(&mut self, input: &InputState) -> Frame {
        self.frame_count += 1;
        let mut canvas = Canvas::new();
        match self.mode {
            GameMode::Title => self.title_frame(&mut canvas, input),
            GameMode::Playing => self.playing_frame(&mut canvas, input),
        }
        canvas.finish()
    }

    fn title_frame(&mut self, canvas: &mut Canvas, input: &InputState) {
        canvas.background(rgb(0, 0, 0));
        self.camera.set_position(Vec3::new(0.0, 0.0, 500.0));
        self.camera.look_at(Vec3::ZERO);
        canvas.set_camera(&self.camera);

        let assets = &self.scene.assets;
        canvas.fill(TITLE_COLOR);
        canvas.text_font(assets.title_font);
        canvas.text_size(25.0);
        canvas.text("Welcome To The Garden Game", 0.0, -300.0);

        // in the scene rather than the overlay so the flower in front stays visible
        canvas.image(
            assets.image_plane,
            assets.instructions,
            0.0,
            250.0,
            INSTRUCTIONS_WIDTH,
            INSTRUCTIONS_WIDTH / INSTRUCTIONS_ASPECT,
        );

        let spin = self.frame_count as f32;
        canvas.push();
        canvas.translate(0.0, 0.0, 200.0);
        canvas.rotate_x(180.0);
        canvas.rotate_y(spin);
        canvas.rotate_z(spin);
        canvas.normal_material();
        canvas.scale(0.5);
        canvas.model(assets.demo_flower);
        canvas.pop();

        canvas.text_size(14.0);
        canvas.fill(rgb(255, 255, 255));
        canvas.text("Press SPACE To Start!", 0.0, 390.0);

        if self.processor.wants_to_start(input) {
            self.start_game();
        }
    }

    /// Takes effect from the next frame on.
    fn start_game(&mut self) {
        self.mode = GameMode::Playing;
        self.camera.set_position(Vec3::ZERO);
        self.camera.look_at(Vec3::new(0.0, 0.0, 300.0));
        info!(frame = self.frame_count, "game started");
    }

    fn playing_frame(&mut self, canvas: &mut Canvas, input: &InputState) {
        canvas.background(SKY_BLUE);
        canvas.lights();
        self.controller.update(input, &self.processor, &mut self.camera, self.scene.bee_mut());
        canvas.set_camera(&self.camera);

        self.render_floor(canvas);
        self.render_bee(canvas);
        self.scene.render_stationary(canvas);

        if self.frame_count % 300 == 0 {
            debug!(
                eye = ?self.camera.eye,
                heading = self.controller.heading(),
                tilt = self.controller.tilt(),
                "flight"
            );
        }
    }

    fn render_floor(&self, canvas: &mut Canvas) {
        canvas.push();
        canvas.fill(GRASS);
        canvas.rotate_x(90.0);
        canvas.model(self.scene.assets.ground);
        canvas.pop();
    }

    fn render_bee(&mut self, canvas: &mut Canvas) {
        self.bee_pose = !self.bee_pose;
        let pose = usize::from(self.bee_pose);
        let c = self.camera.center;
        self.scene.assets.bee.draw_pose(
            canvas,
            BEE_ROTATION,
            Vec3::new(c.x, BEE_DROP + c.y, c.z),
            pose,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{MeshId, TextureId};
    use crate::model::scene::test_assets;
    use crate::view::frame::Material;
    use glam::Mat4;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn game() -> Game {
        Game::new(
            test_assets(),
            GameConfig::DEFAULT,
            KeyBindings::default(),
            800,
            600,
            &mut StdRng::seed_from_u64(11),
        )
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn stays_on_title_until_start_is_pressed() {
        let mut game = game();
        let input = InputState::new();
        for _ in 0..5 {
            let frame = game.update(&input);
            assert_eq!(game.mode(), GameMode::Title);
            assert_eq!(frame.clear_color, [0.0, 0.0, 0.0, 1.0]);
            assert!(!frame.lights);
            assert_eq!(frame.draws.len(), 2);
            assert_eq!(frame.draws[1].material, Material::Normal);
            assert_eq!(frame.overlay.texts.len(), 2);
        }
        assert!(approx(game.camera().eye, Vec3::new(0.0, 0.0, 500.0)));
        assert!(approx(game.camera().center, Vec3::ZERO));
    }

    #[test]
    fn start_moves_camera_then_flight_begins_next_frame() {
        let mut game = game();
        let mut input = InputState::new();
        for _ in 0..5 {
            game.update(&input);
        }

        input.set_key("Space", true);
        let sixth = game.update(&input);
        // the start frame is still the title screen
        assert_eq!(sixth.overlay.texts.len(), 2);
        assert_eq!(game.mode(), GameMode::Playing);
        assert!(approx(game.camera().eye, Vec3::ZERO));
        assert!(approx(game.camera().center, Vec3::new(0.0, 0.0, 300.0)));

        input.set_key("Space", false);
        let seventh = game.update(&input);
        assert!(seventh.lights);
        assert_eq!(seventh.clear_color, [135.0 / 255.0, 206.0 / 255.0, 235.0 / 255.0, 1.0]);
        assert!(seventh.overlay.is_empty());
        assert!(approx(game.camera().eye, Vec3::new(0.0, 0.0, 10.0)));
        // floor, bee, then every stationary entity
        assert_eq!(seventh.draws.len(), 2 + 10 + 25 + 100 + 100);
        assert_eq!(seventh.draws[0].mesh, MeshId(6));
        assert!(matches!(seventh.draws[0].material, Material::Fill(_)));
    }

    #[test]
    fn never_returns_to_title() {
        let mut game = game();
        let mut input = InputState::new();
        input.set_key("Space", true);
        game.update(&input);
        for key in ["ArrowLeft", "ArrowUp", "KeyW", "ArrowDown"] {
            input.set_key(key, true);
            for _ in 0..10 {
                game.update(&input);
                assert_eq!(game.mode(), GameMode::Playing);
            }
        }
    }

    #[test]
    fn placements_survive_gameplay() {
        let mut game = game();
        let trees = game.scene().trees().to_vec();
        let flowers = game.scene().flowers().to_vec();
        let mut input = InputState::new();
        input.set_key("Space", true);
        input.set_key("ArrowRight", true);
        for _ in 0..50 {
            game.update(&input);
        }
        assert_eq!(game.scene().trees(), trees.as_slice());
        assert_eq!(game.scene().flowers(), flowers.as_slice());
    }

    #[test]
    fn bee_wings_alternate_starting_with_first_pose() {
        let mut game = game();
        let mut input = InputState::new();
        input.set_key("Space", true);
        game.update(&input);

        let poses: Vec<_> = (0..4).map(|_| game.update(&input).draws[1].mesh).collect();
        assert_eq!(poses, vec![MeshId(0), MeshId(1), MeshId(0), MeshId(1)]);
    }

    #[test]
    fn bee_hangs_below_the_look_target() {
        let mut game = game();
        let mut input = InputState::new();
        input.set_key("Space", true);
        game.update(&input);
        let frame = game.update(&input);
        let origin = frame.draws[1].transform.transform_point3(Vec3::ZERO);
        let c = game.camera().center;
        assert!(approx(origin, Vec3::new(c.x, c.y + 50.0, c.z)));
    }

    #[test]
    fn demo_flower_spins_with_frame_count() {
        let mut game = game();
        let input = InputState::new();
        for expected_count in 1..=5u64 {
            let frame = game.update(&input);
            assert_eq!(game.frame_count(), expected_count);
            let fc = expected_count as f32;
            let expected = Mat4::from_translation(Vec3::new(0.0, 0.0, 200.0))
                * Mat4::from_rotation_x(180f32.to_radians())
                * Mat4::from_rotation_y(fc.to_radians())
                * Mat4::from_rotation_z(fc.to_radians())
                * Mat4::from_scale(Vec3::splat(0.5));
            assert!(frame.draws[1].transform.abs_diff_eq(expected, 1e-4));
        }
    }

    #[test]
    fn instructions_sit_behind_the_demo_flower() {
        let mut game = game();
        let frame = game.update(&InputState::new());

        let image = &frame.draws[0];
        let flower = &frame.draws[1];
        assert_eq!(image.mesh, MeshId(7));
        assert_eq!(image.material, Material::Texture(TextureId(5)));
        assert_eq!(flower.mesh, MeshId(4));

        let image_center = image.transform.transform_point3(Vec3::ZERO);
        let flower_center = flower.transform.transform_point3(Vec3::ZERO);
        assert!(approx(image_center, Vec3::new(0.0, 250.0, 0.0)));
        // closer to the title camera at z = 500, so it wins the depth test
        assert!(flower_center.z > image_center.z);

        let width = image.transform.transform_vector3(Vec3::X).length();
        let height = image.transform.transform_vector3(Vec3::Y).length();
        assert!((width - 800.0).abs() < 1e-3);
        assert!((height - 800.0 / 1.77777).abs() < 1e-3);
    }
}
