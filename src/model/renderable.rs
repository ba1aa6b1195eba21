use glam::Vec3;

use crate::assets::{AssetError, AssetLoader, MeshId, TextureId};
use crate::config::ModelSpec;
use crate::view::Canvas;

/// Mesh handles of a model. Chosen once at construction so drawing never
/// has to work out which kind of model it is holding.
#[derive(Debug, Clone, PartialEq)]
pub enum Meshes {
    Single(MeshId),
    /// One mesh per animation pose.
    Poses(Vec<MeshId>),
}

/// A textured model that can be drawn any number of times per frame.
#[derive(Debug, Clone)]
pub struct RenderableModel {
    meshes: Meshes,
    texture: TextureId,
    scale: f32,
    /// Accumulated rotation in degrees, added to every draw.
    rotation: Vec3,
}

impl RenderableModel {
    /// `poses` must be at least 1 and match the number of meshes.
    pub fn new(
        meshes: Vec<MeshId>,
        texture: TextureId,
        scale: f32,
        poses: usize,
    ) -> Result<Self, AssetError> {
        if poses == 0 || meshes.len() != poses {
            return Err(AssetError::PoseCount { expected: poses, found: meshes.len() });
        }
        let meshes = match meshes.as_slice() {
            [single] => Meshes::Single(*single),
            _ => Meshes::Poses(meshes),
        };
        Ok(Self { meshes, texture, scale, rotation: Vec3::ZERO })
    }

    pub async fn load(loader: &mut AssetLoader, spec: &ModelSpec) -> Result<Self, AssetError> {
        if spec.poses == 0 || spec.paths.len() != spec.poses {
            return Err(AssetError::PoseCount { expected: spec.poses, found: spec.paths.len() });
        }
        let mut meshes = Vec::with_capacity(spec.paths.len());
        for path in spec.paths {
            meshes.push(loader.load_mesh(path).await?);
        }
        let texture = loader.load_texture(spec.texture).await?;
        Self::new(meshes, texture, spec.scale, spec.poses)
    }

    pub fn meshes(&self) -> &Meshes { &self.meshes }

    pub fn pose_count(&self) -> usize {
        match &self.meshes {
            Meshes::Single(_) => 1,
            Meshes::Poses(poses) => poses.len(),
        }
    }

    pub fn rotation(&self) -> Vec3 { self.rotation }

    /// Add to the accumulated rotation (degrees). Never clamped here.
    pub fn rotate(&mut self, x: f32, y: f32, z: f32) {
        self.rotation += Vec3::new(x, y, z);
    }

    /// Draw a single-mesh model.
    ///
    /// # Panics
    /// If the model has several poses; use [`Self::draw_pose`].
    pub fn draw(&self, canvas: &mut Canvas, rotation: Vec3, translation: Vec3) {
        match &self.meshes {
            Meshes::Single(mesh) => self.emit(canvas, rotation, translation, *mesh),
            Meshes::Poses(poses) => panic!(
                "model has {} poses; draw it with draw_pose()",
                poses.len()
            ),
        }
    }

    /// Draw one pose of the model. A single-mesh model only has pose 0.
    ///
    /// # Panics
    /// If `pose` is out of range.
    pub fn draw_pose(&self, canvas: &mut Canvas, rotation: Vec3, translation: Vec3, pose: usize) {
        let mesh = match &self.meshes {
            Meshes::Single(mesh) if pose == 0 => *mesh,
            Meshes::Poses(poses) if pose < poses.len() => poses[pose],
            _ => panic!(
                "pose {} out of range for a model with {} pose(s)",
                pose,
                self.pose_count()
            ),
        };
        self.emit(canvas, rotation, translation, mesh);
    }

    // Y, then Z, then X; the order is part of how the models are authored.
    fn emit(&self, canvas: &mut Canvas, rotation: Vec3, translation: Vec3, mesh: MeshId) {
        let r = rotation + self.rotation;
        canvas.push();
        canvas.translate(translation.x, translation.y, translation.z);
        canvas.rotate_y(r.y);
        canvas.rotate_z(r.z);
        canvas.rotate_x(r.x);
        canvas.texture(self.texture);
        canvas.scale(self.scale);
        canvas.model(mesh);
        canvas.pop();
    }
}
