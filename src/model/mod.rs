// MODEL: scene data, camera and renderable models
pub mod camera;
pub mod placement;
pub mod renderable;
pub mod scene;

pub use camera::{project_to_screen, Camera};
pub use placement::{generate_placements, Placement};
pub use renderable::{Meshes, RenderableModel};
pub use scene::{Scene, SceneAssets};
