//! Compile-time gameplay constants.
//!
//! Nothing here is read at runtime; logging is the only thing configured
//! through the environment (see [`crate::logging`]).

/// Directory all asset paths are relative to. Served next to `index.html`
/// in the browser and resolved against the working directory natively.
pub const ASSET_ROOT: &str = "assets";

/// Where to find one renderable model on disk.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// One path per pose, in pose order.
    pub paths: &'static [&'static str],
    pub texture: &'static str,
    pub scale: f32,
    pub poses: usize,
}

// Two meshes flip the wings
pub const BEE: ModelSpec = ModelSpec {
    paths: &["models/Bee.obj", "models/Bee2.obj"],
    texture: "textures/Bee.png",
    scale: 0.25,
    poses: 2,
};
pub const TREE: ModelSpec = ModelSpec {
    paths: &["models/Tree.obj"],
    texture: "textures/Tree.png",
    scale: 10.0,
    poses: 1,
};
pub const ROCK: ModelSpec = ModelSpec {
    paths: &["models/rock/Rock.obj"],
    texture: "textures/Rock.png",
    scale: 2.0,
    poses: 1,
};
pub const FLOWER: ModelSpec = ModelSpec {
    paths: &["models/flower/Flower.obj"],
    texture: "textures/Flower.png",
    scale: 2.0,
    poses: 1,
};
pub const SUNFLOWER: ModelSpec = ModelSpec {
    paths: &["models/sunflower/Sunflower.obj"],
    texture: "textures/Sunflower.png",
    scale: 1.0,
    poses: 1,
};

pub const DEMO_FLOWER_MODEL: &str = "models/flower/Flower.obj";
pub const TITLE_FONT: &str = "fonts/Title.ttf";
pub const INSTRUCTIONS_IMAGE: &str = "Instructions.png";

/// Tunables for one game session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    // frame rate is already poor past these counts
    pub tree_count: usize,
    pub rock_count: usize,
    pub flower_count: usize,
    pub sunflower_count: usize,

    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub target_fps: u32,

    /// Forward distance per frame without and with the fast-forward key.
    pub slow_step: f32,
    pub fast_step: f32,

    pub max_heading: f32,
    pub heading_step: f32,
    pub pan_step: f32,
    pub max_tilt: f32,
    pub tilt_step: f32,
}

impl GameConfig {
    pub const DEFAULT: Self = Self {
        tree_count: 10,
        rock_count: 25,
        flower_count: 100,
        sunflower_count: 100,
        fov_y_deg: 80.0,
        z_near: 0.1,
        z_far: 25000.0,
        target_fps: 30,
        slow_step: 10.0,
        fast_step: 25.0,
        max_heading: 75.0,
        heading_step: 2.0,
        pan_step: 1.0,
        max_tilt: 25.0,
        tilt_step: 0.5,
    };
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
