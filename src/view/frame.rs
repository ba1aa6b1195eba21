//! Immediate-mode recording of one frame.
//!
//! Game code talks to a [`Canvas`] the way it would talk to a sketching
//! API (push/pop, translate, rotate, texture, model). The canvas records a
//! [`Frame`]: an ordered list of draw commands with their final transforms,
//! plus overlay text. The GPU renderer and the egui overlay consume the
//! frame afterwards, so nothing in here needs a device.
use glam::{Mat4, Vec3};
use tracing::warn;

use crate::assets::{FontId, MeshId, TextureId};
use crate::model::Camera;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    Texture(TextureId),
    /// Surface normal as colour; ignores lights.
    Normal,
    Fill([f32; 4]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub mesh: MeshId,
    pub material: Material,
    pub transform: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    /// Top-center anchor in world space.
    pub position: Vec3,
    pub size: f32,
    pub color: [u8; 4],
    pub font: Option<FontId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub texts: Vec<TextItem>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub clear_color: [f32; 4],
    pub lights: bool,
    pub view_proj: Mat4,
    pub draws: Vec<DrawCommand>,
    pub overlay: Overlay,
}

/// Model matrix stack. Every operation post-multiplies, so the last call
/// applies to geometry first.
#[derive(Debug, Clone)]
pub struct TransformStack {
    current: Mat4,
    saved: Vec<Mat4>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self { current: Mat4::IDENTITY, saved: Vec::new() }
    }
}

impl TransformStack {
    pub fn current(&self) -> Mat4 { self.current }

    pub fn depth(&self) -> usize { self.saved.len() }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restore the last pushed matrix. Returns false on an unbalanced pop.
    pub fn pop(&mut self) -> bool {
        match self.saved.pop() {
            Some(m) => {
                self.current = m;
                true
            }
            None => false,
        }
    }

    pub fn translate(&mut self, t: Vec3) {
        self.current *= Mat4::from_translation(t);
    }

    pub fn rotate_x(&mut self, degrees: f32) {
        self.current *= Mat4::from_rotation_x(degrees.to_radians());
    }

    pub fn rotate_y(&mut self, degrees: f32) {
        self.current *= Mat4::from_rotation_y(degrees.to_radians());
    }

    pub fn rotate_z(&mut self, degrees: f32) {
        self.current *= Mat4::from_rotation_z(degrees.to_radians());
    }

    pub fn scale(&mut self, s: f32) {
        self.scale_xyz(Vec3::splat(s));
    }

    pub fn scale_xyz(&mut self, s: Vec3) {
        self.current *= Mat4::from_scale(s);
    }
}

pub fn rgb(r: u8, g: u8, b: u8) -> [u8; 4] {
    [r, g, b, 255]
}

fn unit_rgba(c: [u8; 4]) -> [f32; 4] {
    c.map(|v| v as f32 / 255.0)
}

/// Records one frame. Transform and material are saved together by `push`.
pub struct Canvas {
    transforms: TransformStack,
    material: Material,
    saved_materials: Vec<Material>,
    fill_color: [u8; 4],
    text_size: f32,
    text_font: Option<FontId>,
    frame: Frame,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        let white = rgb(255, 255, 255);
        Self {
            transforms: TransformStack::default(),
            material: Material::Fill(unit_rgba(white)),
            saved_materials: Vec::new(),
            fill_color: white,
            text_size: 12.0,
            text_font: None,
            frame: Frame {
                clear_color: [0.0, 0.0, 0.0, 1.0],
                lights: false,
                view_proj: Mat4::IDENTITY,
                draws: Vec::new(),
                overlay: Overlay::default(),
            },
        }
    }

    pub fn background(&mut self, color: [u8; 4]) {
        self.frame.clear_color = unit_rgba(color);
    }

    /// Ambient plus one directional light for the rest of the frame.
    pub fn lights(&mut self) {
        self.frame.lights = true;
    }

    /// Snapshot the camera; draws recorded in this frame use it.
    pub fn set_camera(&mut self, camera: &Camera) {
        self.frame.view_proj = camera.view_proj();
    }

    pub fn push(&mut self) {
        self.transforms.push();
        self.saved_materials.push(self.material);
    }

    pub fn pop(&mut self) {
        if !self.transforms.pop() {
            warn!("pop() without matching push()");
            return;
        }
        if let Some(m) = self.saved_materials.pop() {
            self.material = m;
        }
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.transforms.translate(Vec3::new(x, y, z));
    }

    pub fn rotate_x(&mut self, degrees: f32) {
        self.transforms.rotate_x(degrees);
    }

    pub fn rotate_y(&mut self, degrees: f32) {
        self.transforms.rotate_y(degrees);
    }

    pub fn rotate_z(&mut self, degrees: f32) {
        self.transforms.rotate_z(degrees);
    }

    pub fn scale(&mut self, s: f32) {
        self.transforms.scale(s);
    }

    pub fn texture(&mut self, texture: TextureId) {
        self.material = Material::Texture(texture);
    }

    pub fn normal_material(&mut self) {
        self.material = Material::Normal;
    }

    /// Solid colour for following geometry and text.
    pub fn fill(&mut self, color: [u8; 4]) {
        self.fill_color = color;
        self.material = Material::Fill(unit_rgba(color));
    }

    pub fn text_font(&mut self, font: FontId) {
        self.text_font = Some(font);
    }

    pub fn text_size(&mut self, size: f32) {
        self.text_size = size;
    }

    pub fn model(&mut self, mesh: MeshId) {
        self.frame.draws.push(DrawCommand {
            mesh,
            material: self.material,
            transform: self.transforms.current(),
        });
    }

    pub fn text(&mut self, text: impl Into<String>, x: f32, y: f32) {
        let position = self.transforms.current().transform_point3(Vec3::new(x, y, 0.0));
        self.frame.overlay.texts.push(TextItem {
            text: text.into(),
            position,
            size: self.text_size,
            color: self.fill_color,
            font: self.text_font,
        });
    }

    /// Draw `texture` centered on `(x, y)` as a `width` x `height` plane in
    /// the scene, so it is depth tested like any model. `plane` must be a
    /// unit square in the XY plane.
    pub fn image(&mut self, plane: MeshId, texture: TextureId, x: f32, y: f32, width: f32, height: f32) {
        self.push();
        self.translate(x, y, 0.0);
        self.transforms.scale_xyz(Vec3::new(width, height, 1.0));
        self.texture(texture);
        self.model(plane);
        self.pop();
    }

    pub fn finish(self) -> Frame {
        if self.transforms.depth() != 0 {
            warn!(depth = self.transforms.depth(), "frame finished with unbalanced push()");
        }
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-4)
    }

    #[test]
    fn operations_compose_in_call_order() {
        let mut stack = TransformStack::default();
        stack.translate(Vec3::new(1.0, 2.0, 3.0));
        stack.rotate_y(90.0);
        stack.scale(2.0);
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_rotation_y(90f32.to_radians())
            * Mat4::from_scale(Vec3::splat(2.0));
        assert!(approx_eq(stack.current(), expected));

        // a unit x point is scaled, rotated onto -z, then translated
        let p = stack.current().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-4);
    }

    #[test]
    fn pop_restores_and_reports_imbalance() {
        let mut stack = TransformStack::default();
        stack.push();
        stack.translate(Vec3::X);
        assert!(stack.pop());
        assert_eq!(stack.current(), Mat4::IDENTITY);
        assert!(!stack.pop());
    }

    #[test]
    fn push_pop_scopes_transform_and_material() {
        let mut canvas = Canvas::new();
        canvas.push();
        canvas.translate(5.0, 0.0, 0.0);
        canvas.texture(TextureId(3));
        canvas.model(MeshId(1));
        canvas.pop();
        canvas.model(MeshId(2));

        let frame = canvas.finish();
        assert_eq!(frame.draws.len(), 2);
        assert_eq!(frame.draws[0].material, Material::Texture(TextureId(3)));
        assert_eq!(frame.draws[0].transform, Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(frame.draws[1].transform, Mat4::IDENTITY);
        assert!(matches!(frame.draws[1].material, Material::Fill(_)));
    }

    #[test]
    fn text_uses_current_fill_size_and_font() {
        let mut canvas = Canvas::new();
        canvas.fill(rgb(237, 34, 93));
        canvas.text_font(FontId(0));
        canvas.text_size(25.0);
        canvas.text("hello", 0.0, -300.0);

        let frame = canvas.finish();
        let item = &frame.overlay.texts[0];
        assert_eq!(item.color, [237, 34, 93, 255]);
        assert_eq!(item.size, 25.0);
        assert_eq!(item.font, Some(FontId(0)));
        assert_eq!(item.position, Vec3::new(0.0, -300.0, 0.0));
    }

    #[test]
    fn background_and_lights_are_recorded() {
        let mut canvas = Canvas::new();
        canvas.background(rgb(0, 0, 0));
        let frame = canvas.finish();
        assert_eq!(frame.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert!(!frame.lights);

        let mut canvas = Canvas::new();
        canvas.lights();
        assert!(canvas.finish().lights);
    }

    #[test]
    fn image_is_a_scaled_textured_plane_in_the_scene() {
        let mut canvas = Canvas::new();
        canvas.fill(rgb(255, 0, 0));
        canvas.image(MeshId(7), TextureId(5), 0.0, 250.0, 800.0, 450.0);
        canvas.model(MeshId(1));

        let frame = canvas.finish();
        assert!(frame.overlay.is_empty());
        assert_eq!(frame.draws.len(), 2);
        let plane = &frame.draws[0];
        assert_eq!(plane.mesh, MeshId(7));
        assert_eq!(plane.material, Material::Texture(TextureId(5)));
        let expected = Mat4::from_translation(Vec3::new(0.0, 250.0, 0.0))
            * Mat4::from_scale(Vec3::new(800.0, 450.0, 1.0));
        assert!(approx_eq(plane.transform, expected));
        // corners of the unit plane land on the image edges
        let top_left = plane.transform.transform_point3(Vec3::new(-0.5, -0.5, 0.0));
        assert!((top_left - Vec3::new(-400.0, 25.0, 0.0)).length() < 1e-3);

        // the image does not leak its texture or transform
        assert!(matches!(frame.draws[1].material, Material::Fill(_)));
        assert_eq!(frame.draws[1].transform, Mat4::IDENTITY);
    }
}
