use std::collections::HashMap;
use std::sync::Arc;

use egui::{Align2, Color32, Context, FontFamily, Pos2, Rect};
use glam::{Mat4, Vec2, Vec3};

use crate::assets::{AssetStore, FontId};
use crate::model::project_to_screen;
use crate::view::frame::{Frame, Overlay};

/// Where a world-space overlay anchor lands on screen, and how many screen
/// points one world unit covers there.
pub fn screen_placement(view_proj: Mat4, position: Vec3, viewport: Vec2) -> Option<(Vec2, f32)> {
    let at = project_to_screen(view_proj, position, viewport)?;
    let beside = project_to_screen(view_proj, position + Vec3::X, viewport)?;
    Some((at, (beside - at).length()))
}

/// Paints the overlay text of a [`Frame`] with egui.
pub struct OverlayPainter {
    fonts: HashMap<FontId, FontFamily>,
}

impl OverlayPainter {
    /// Register `fonts` as egui font families so text items can refer to
    /// them by handle.
    pub fn new(ctx: &Context, store: &AssetStore, fonts: &[FontId]) -> Self {
        let mut definitions = egui::FontDefinitions::default();
        let mut families = HashMap::new();
        for &id in fonts {
            let name = format!("font{}", id.0);
            definitions.font_data.insert(
                name.clone(),
                Arc::new(egui::FontData::from_owned(store.font(id).to_vec())),
            );
            let family = FontFamily::Name(name.clone().into());
            definitions.families.insert(family.clone(), vec![name]);
            families.insert(id, family);
        }
        ctx.set_fonts(definitions);

        Self { fonts: families }
    }

    pub fn paint(&self, ctx: &Context, overlay: &Overlay, view_proj: Mat4, viewport: Vec2) {
        let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("overlay")));

        for item in &overlay.texts {
            let Some((anchor, scale)) = screen_placement(view_proj, item.position, viewport) else { continue };
            let family = item
                .font
                .and_then(|id| self.fonts.get(&id).cloned())
                .unwrap_or(FontFamily::Proportional);
            let [r, g, b, a] = item.color;
            painter.text(
                Pos2::new(anchor.x, anchor.y),
                Align2::CENTER_TOP,
                &item.text,
                egui::FontId::new(item.size * scale, family),
                Color32::from_rgba_unmultiplied(r, g, b, a),
            );
        }
    }
}

/// Build the complete UI and return egui output
pub fn build_ui(
    egui_ctx: &Context,
    raw_input: egui::RawInput,
    painter: &OverlayPainter,
    frame: &Frame,
    viewport: Vec2,
) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        if !frame.overlay.is_empty() {
            painter.paint(ctx, &frame.overlay, frame.view_proj, viewport);
        }
    })
}

/// egui input for a canvas of `width` x `height` physical pixels.
pub fn raw_input(width: u32, height: u32, pixels_per_point: f32, now_ms: f64) -> egui::RawInput {
    egui::RawInput {
        time: Some(now_ms / 1000.0),
        screen_rect: Some(Rect::from_min_size(
            Pos2::ZERO,
            egui::vec2(width as f32 / pixels_per_point, height as f32 / pixels_per_point),
        )),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Camera;
    use crate::view::frame::{rgb, Canvas};

    fn title_camera() -> Camera {
        let mut cam = Camera::new(800, 600);
        cam.set_perspective(80.0, 0.1, 25000.0);
        cam.set_position(Vec3::new(0.0, 0.0, 500.0));
        cam.look_at(Vec3::ZERO);
        cam
    }

    #[test]
    fn anchors_above_center_land_above_screen_center() {
        let viewport = Vec2::new(800.0, 600.0);
        let (pos, scale) =
            screen_placement(title_camera().view_proj(), Vec3::new(0.0, -300.0, 0.0), viewport).unwrap();
        assert!((pos.x - 400.0).abs() < 1e-2);
        assert!(pos.y < 300.0);
        // 2 * 500 * tan(40deg) world units span the viewport height
        let expected = 600.0 / (1000.0 * 40f32.to_radians().tan());
        assert!((scale - expected).abs() < 1e-3);
    }

    #[test]
    fn overlay_paints_every_text_item() {
        let ctx = Context::default();
        let painter = OverlayPainter::new(&ctx, &AssetStore::default(), &[]);

        let mut canvas = Canvas::new();
        canvas.set_camera(&title_camera());
        canvas.fill(rgb(255, 255, 255));
        canvas.text("Welcome To The Garden Game", 0.0, -300.0);
        canvas.text("Press SPACE To Start!", 0.0, 390.0);
        let frame = canvas.finish();

        let output = build_ui(&ctx, raw_input(800, 600, 1.0, 0.0), &painter, &frame, Vec2::new(800.0, 600.0));
        assert!(output.shapes.len() >= 2);
    }
}
