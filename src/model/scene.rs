use glam::Vec3;
use rand::Rng;
use tracing::info;

use crate::assets::{AssetError, AssetLoader, FontId, MeshId, TextureId};
use crate::config::{self, GameConfig};
use crate::model::placement::{generate_placements, Placement};
use crate::model::RenderableModel;
use crate::utils::create_plane_mesh;
use crate::view::Canvas;

pub const GROUND_HALF_EXTENT: f32 = 10000.0;
pub const GROUND_DEPTH: f32 = -200.0;

/// Everything the game needs loaded before the first frame.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub bee: RenderableModel,
    pub tree: RenderableModel,
    pub rock: RenderableModel,
    pub flower: RenderableModel,
    pub sunflower: RenderableModel,
    /// Untextured flower spinning on the title screen.
    pub demo_flower: MeshId,
    pub ground: MeshId,
    /// Unit square images are drawn on.
    pub image_plane: MeshId,
    pub title_font: FontId,
    pub instructions: TextureId,
}

impl SceneAssets {
    /// Load every model, texture and font. Any failure aborts the load.
    pub async fn load(loader: &mut AssetLoader) -> Result<Self, AssetError> {
        let bee = RenderableModel::load(loader, &config::BEE).await?;
        let tree = RenderableModel::load(loader, &config::TREE).await?;
        let rock = RenderableModel::load(loader, &config::ROCK).await?;
        let flower = RenderableModel::load(loader, &config::FLOWER).await?;
        let sunflower = RenderableModel::load(loader, &config::SUNFLOWER).await?;
        let title_font = loader.load_font(config::TITLE_FONT).await?;
        let instructions = loader.load_texture(config::INSTRUCTIONS_IMAGE).await?;
        let demo_flower = loader.load_mesh(config::DEMO_FLOWER_MODEL).await?;
        let ground = loader.insert_mesh(create_plane_mesh(GROUND_HALF_EXTENT, GROUND_DEPTH));
        let image_plane = loader.insert_mesh(create_plane_mesh(0.5, 0.0));
        info!("scene assets loaded");

        Ok(Self {
            bee,
            tree,
            rock,
            flower,
            sunflower,
            demo_flower,
            ground,
            image_plane,
            title_font,
            instructions,
        })
    }
}

/// How a group of stationary entities is posed. Placement `(x, y)` maps to
/// world `(y, height, x)`; the placement seed is the Y rotation.
#[derive(Debug, Clone, Copy)]
struct GroupPose {
    tilt_x: f32,
    height: f32,
}

const TREE_POSE: GroupPose = GroupPose { tilt_x: 90.0, height: -800.0 };
const ROCK_POSE: GroupPose = GroupPose { tilt_x: 90.0, height: 100.0 };
const FLOWER_POSE: GroupPose = GroupPose { tilt_x: 180.0, height: 0.0 };
const SUNFLOWER_POSE: GroupPose = GroupPose { tilt_x: 180.0, height: 105.0 };

/// Loaded models plus this session's entity layout.
pub struct Scene {
    pub assets: SceneAssets,
    trees: Vec<Placement>,
    rocks: Vec<Placement>,
    flowers: Vec<Placement>,
    sunflowers: Vec<Placement>,
}

impl Scene {
    /// Lay out all stationary entities. Placements never change afterwards.
    pub fn new<R: Rng>(assets: SceneAssets, config: &GameConfig, rng: &mut R) -> Self {
        let scene = Self {
            assets,
            trees: generate_placements(config.tree_count, rng),
            rocks: generate_placements(config.rock_count, rng),
            flowers: generate_placements(config.flower_count, rng),
            sunflowers: generate_placements(config.sunflower_count, rng),
        };
        info!(
            trees = scene.trees.len(),
            rocks = scene.rocks.len(),
            flowers = scene.flowers.len(),
            sunflowers = scene.sunflowers.len(),
            "scene laid out"
        );
        scene
    }

    pub fn trees(&self) -> &[Placement] { &self.trees }
    pub fn rocks(&self) -> &[Placement] { &self.rocks }
    pub fn flowers(&self) -> &[Placement] { &self.flowers }
    pub fn sunflowers(&self) -> &[Placement] { &self.sunflowers }

    pub fn bee_mut(&mut self) -> &mut RenderableModel {
        &mut self.assets.bee
    }

    /// Trees, rocks, flowers, then sunflowers.
    pub fn render_stationary(&self, canvas: &mut Canvas) {
        render_group(canvas, &self.assets.tree, &self.trees, TREE_POSE);
        render_group(canvas, &self.assets.rock, &self.rocks, ROCK_POSE);
        render_group(canvas, &self.assets.flower, &self.flowers, FLOWER_POSE);
        render_group(canvas, &self.assets.sunflower, &self.sunflowers, SUNFLOWER_POSE);
    }
}

fn render_group(canvas: &mut Canvas, model: &RenderableModel, placements: &[Placement], pose: GroupPose) {
    for p in placements.iter().rev() {
        model.draw(
            canvas,
            Vec3::new(pose.tilt_x, p.seed, 0.0),
            Vec3::new(p.y, pose.height, p.x),
        );
    }
}

/// Handles with no files behind them, for tests that never touch a GPU.
#[cfg(test)]
pub(crate) fn test_assets() -> SceneAssets {
    let model = |mesh: usize, texture: usize, scale: f32| {
        RenderableModel::new(vec![MeshId(mesh)], TextureId(texture), scale, 1).unwrap()
    };
    SceneAssets {
        bee: RenderableModel::new(vec![MeshId(0), MeshId(1)], TextureId(0), 0.25, 2).unwrap(),
        tree: model(2, 1, 10.0),
        rock: model(3, 2, 2.0),
        flower: model(4, 3, 2.0),
        sunflower: model(5, 4, 1.0),
        demo_flower: MeshId(4),
        ground: MeshId(6),
        image_plane: MeshId(7),
        title_font: FontId(0),
        instructions: TextureId(5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scene() -> Scene {
        Scene::new(test_assets(), &GameConfig::DEFAULT, &mut StdRng::seed_from_u64(3))
    }

    #[test]
    fn lays_out_configured_counts() {
        let scene = scene();
        assert_eq!(scene.trees().len(), 10);
        assert_eq!(scene.rocks().len(), 25);
        assert_eq!(scene.flowers().len(), 100);
        assert_eq!(scene.sunflowers().len(), 100);
    }

    #[test]
    fn stationary_render_draws_every_entity_once() {
        let scene = scene();
        let mut canvas = Canvas::new();
        scene.render_stationary(&mut canvas);
        let frame = canvas.finish();
        assert_eq!(frame.draws.len(), 10 + 25 + 100 + 100);
        assert!(frame.draws[..10].iter().all(|d| d.mesh == MeshId(2)));
        assert!(frame.draws[235 - 100..].iter().all(|d| d.mesh == MeshId(5)));
    }

    #[test]
    fn trees_stand_at_their_placement() {
        let scene = scene();
        let mut canvas = Canvas::new();
        scene.render_stationary(&mut canvas);
        let frame = canvas.finish();

        // groups are drawn back to front
        let last = scene.trees()[scene.trees().len() - 1];
        let origin = frame.draws[0].transform.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(last.y, -800.0, last.x)).length() < 1e-2);
    }

    #[test]
    fn every_group_uses_its_own_tilt_and_height() {
        let scene = scene();
        let mut canvas = Canvas::new();
        scene.render_stationary(&mut canvas);
        let frame = canvas.finish();

        // (first draw index, placements, tilt about x, height, scale)
        let groups = [
            (0, scene.trees(), 90.0_f32, -800.0, 10.0),
            (10, scene.rocks(), 90.0, 100.0, 2.0),
            (35, scene.flowers(), 180.0, 0.0, 2.0),
            (135, scene.sunflowers(), 180.0, 105.0, 1.0),
        ];
        for (first, placements, tilt_x, height, scale) in groups {
            let p = placements[placements.len() - 1];
            let expected = Mat4::from_translation(Vec3::new(p.y, height, p.x))
                * Mat4::from_rotation_y(p.seed.to_radians())
                * Mat4::from_rotation_z(0.0)
                * Mat4::from_rotation_x(tilt_x.to_radians())
                * Mat4::from_scale(Vec3::splat(scale));
            let draw = &frame.draws[first];
            assert!(
                draw.transform.abs_diff_eq(expected, 1e-2),
                "group starting at draw {first}"
            );
        }
    }
}
