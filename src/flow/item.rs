// src/flow/item.rs
//! A single cover in the carousel: its images, transform and hit shape.

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_7X13_BOLD, FONT_9X18_BOLD};
use image::{DynamicImage, Rgba, RgbaImage, imageops};
use tracing::debug;

use super::{
    canvas::Canvas,
    geometry::{Axis, PointF, RectF, Transform},
    model::{ListModel, ModelIndex},
};
use crate::config::FlowConfig;

const PLACEHOLDER_FILL: Rgba<u8> = Rgba([235, 235, 235, 255]);
const NO_COVER_FILL: Rgba<u8> = Rgba([64, 64, 64, 255]);

/// Renderable state of one carousel entry.
///
/// Items hold no reference to their scene or model; the scene passes the
/// model and the item's index whenever image data is needed.
#[derive(Debug, Clone)]
pub struct FlowItem {
    front: Option<RgbaImage>,
    reflection: Option<RgbaImage>,
    transform: Transform,
    rotation: f32,
    pos: PointF,
    saved_x: f32,
    z: i32,
    dirty: bool,
    shape: RectF,
    size: f32,
    pivot_y: f32,
    image_side: u32,
    reflection_alpha: u8,
}

impl FlowItem {
    pub fn new(config: &FlowConfig, y: f32) -> Self {
        Self {
            front: None,
            reflection: None,
            transform: Transform::IDENTITY,
            rotation: 0.0,
            pos: PointF::new(0.0, y),
            saved_x: 0.0,
            z: 0,
            dirty: true,
            shape: RectF::default(),
            size: config.item_size,
            pivot_y: config.item_size * config.perspective,
            image_side: config.image_side,
            reflection_alpha: config.reflection_alpha,
        }
    }

    /// Rotate out of plane around the perspective anchor, then scale about the centre.
    pub fn compute_transform(&mut self, angle: f32, axis: Axis, x_scale: f32, y_scale: f32) {
        let half = self.size / 2.0;
        self.transform = Transform::IDENTITY
            .translate(half, self.pivot_y)
            .rotate(angle, axis)
            .translate(-half, -self.pivot_y)
            .translate(half, half)
            .scale(x_scale, y_scale)
            .translate(-half, -half);
        self.rotation = angle;
    }

    pub fn reset_transform(&mut self) {
        self.transform = Transform::IDENTITY;
        self.rotation = 0.0;
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn pos(&self) -> PointF {
        self.pos
    }

    pub fn set_pos(&mut self, pos: PointF) {
        self.pos = pos;
    }

    pub fn set_x(&mut self, x: f32) {
        self.pos.x = x;
    }

    /// Remember the current x so an animation can offset from it.
    pub fn save_x(&mut self) {
        self.saved_x = self.pos.x;
    }

    pub fn saved_x(&self) -> f32 {
        self.saved_x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn set_z(&mut self, z: i32) {
        self.z = z;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn front(&self) -> Option<&RgbaImage> {
        self.front.as_ref()
    }

    pub fn reflection(&self) -> Option<&RgbaImage> {
        self.reflection.as_ref()
    }

    /// Silhouette of the front image in item coordinates.
    pub fn shape(&self) -> RectF {
        self.shape
    }

    /// Item-local to scene transform.
    pub fn scene_transform(&self) -> Transform {
        Transform::translation(self.pos.x, self.pos.y) * self.transform
    }

    /// Regenerate the front face, its reflection and the hit shape.
    pub fn refresh_image(&mut self, model: Option<&dyn ListModel>, index: &ModelIndex) {
        self.front = model.map(|model| self.front_face(model, index));
        self.reflection = self.front.as_ref().map(|front| self.reflect(front));
        self.update_shape();
        self.dirty = false;
    }

    /// Draw the item through `to_device`, regenerating stale images first.
    pub fn paint(
        &mut self,
        model: Option<&dyn ListModel>,
        index: &ModelIndex,
        canvas: &mut Canvas,
        to_device: &Transform,
    ) {
        if self.dirty {
            self.refresh_image(model, index);
        }
        let full = *to_device * self.transform;
        let smooth = full.is_scaling();

        let (Some(front), Some(reflection)) = (&self.front, &self.reflection) else {
            self.paint_no_cover(canvas, &full);
            return;
        };

        let area = self.image_area();
        let (w, h) = (front.width() as f32, front.height() as f32);
        let front_rect = area.align_bottom_center(w, h);
        canvas.draw_image(front, PointF::new(front_rect.x, front_rect.y), &full, smooth);
        let reflection_rect = area.translated(0.0, self.size).align_top_center(w, h);
        canvas.draw_image(
            reflection,
            PointF::new(reflection_rect.x, reflection_rect.y),
            &full,
            smooth,
        );
    }

    /// True when the scene point hits the rendered silhouette.
    pub fn contains(&self, scene_point: PointF, root: &Transform) -> bool {
        let Some(to_local) = (*root * self.scene_transform()).inverted() else {
            return false;
        };
        self.shape.contains(to_local.map(scene_point))
    }

    /// Square inside the bounding rect the front face is aligned in.
    fn image_area(&self) -> RectF {
        let side = self.image_side as f32;
        RectF::new(1.0, 1.0, side, side)
    }

    fn front_face(&self, model: &dyn ListModel, index: &ModelIndex) -> RgbaImage {
        match model.decoration(index) {
            Some(image) if image.width() > 0 && image.height() > 0 => {
                self.scaled_cover(&image)
            }
            _ => {
                debug!(row = index.row(), "no cover art, drawing placeholder");
                self.placeholder(model, index)
            }
        }
    }

    fn scaled_cover(&self, image: &DynamicImage) -> RgbaImage {
        image
            .resize(self.image_side, self.image_side, imageops::FilterType::Triangle)
            .to_rgba8()
    }

    fn placeholder(&self, model: &dyn ListModel, index: &ModelIndex) -> RgbaImage {
        let side = self.image_side;
        let mut canvas = Canvas::from_image(RgbaImage::from_pixel(side, side, PLACEHOLDER_FILL));
        let s = side as f32;

        let album = model
            .display_text(&index.primary())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No Album".to_string());
        let artist = model
            .display_text(&index.sibling(index.row(), 1))
            .filter(|t| !t.is_empty());
        let hint = match artist {
            Some(artist) => format!("{artist}\nCover art unavailable"),
            None => "Cover art unavailable".to_string(),
        };

        let title_font = if side >= 192 { &FONT_9X18_BOLD } else { &FONT_7X13_BOLD };
        canvas.draw_text_box(
            &album,
            RectF::new(10.0, 20.0, s - 20.0, s * 0.57),
            title_font,
            [0, 0, 0],
        );
        canvas.draw_text_box(
            &hint,
            RectF::new(10.0, s * 0.7, s - 20.0, s * 0.22),
            &FONT_6X10,
            [100, 100, 100],
        );
        canvas.into_image()
    }

    /// Vertically mirrored copy fading from `reflection_alpha` at the seam to nothing.
    fn reflect(&self, front: &RgbaImage) -> RgbaImage {
        let mut reflection = imageops::flip_vertical(front);
        let height = reflection.height().max(1) as f32;
        let seam = self.reflection_alpha as f32 / 255.0;
        for (_, y, pixel) in reflection.enumerate_pixels_mut() {
            let fade = seam * (1.0 - y as f32 / height);
            pixel[3] = (pixel[3] as f32 * fade).round() as u8;
        }
        reflection
    }

    fn update_shape(&mut self) {
        let Some(front) = &self.front else {
            self.shape = RectF::default();
            return;
        };
        let placed = self
            .image_area()
            .align_bottom_center(front.width() as f32, front.height() as f32);

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0, 0);
        for (x, y, pixel) in front.enumerate_pixels() {
            if pixel[3] > 0 {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        self.shape = if min_x > max_x {
            RectF::default()
        } else {
            RectF::new(
                placed.x + min_x as f32,
                placed.y + min_y as f32,
                (max_x - min_x + 1) as f32,
                (max_y - min_y + 1) as f32,
            )
        };
    }

    fn paint_no_cover(&self, canvas: &mut Canvas, to_device: &Transform) {
        let side = self.image_side;
        let mut block = Canvas::from_image(RgbaImage::from_pixel(side, side, NO_COVER_FILL));
        let bounds = RectF::new(0.0, 0.0, side as f32, side as f32);
        block.draw_text_box("No Cover", bounds, &FONT_9X18_BOLD, [255, 255, 255]);
        let origin = self.image_area();
        canvas.draw_image(
            block.image(),
            PointF::new(origin.x, origin.y),
            to_device,
            to_device.is_scaling(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::model::{StandardItem, StandardModel};

    fn config() -> FlowConfig {
        FlowConfig {
            image_side: 64,
            item_size: 66.0,
            ..FlowConfig::default()
        }
    }

    fn index(row: usize) -> ModelIndex {
        ModelIndex::new(&[], row, 0)
    }

    #[test]
    fn cover_is_scaled_into_square_footprint() {
        let cover = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 100, Rgba([9, 9, 9, 255])));
        let model = StandardModel::from_rows(vec![
            StandardItem::new(["Album"]).with_decoration(cover),
        ]);
        let mut item = FlowItem::new(&config(), 0.0);
        item.refresh_image(Some(&model), &index(0));

        let front = item.front().unwrap();
        assert_eq!((front.width(), front.height()), (64, 32));
        assert!(!item.is_dirty());
        // silhouette sits on the bottom edge of the image area
        assert_eq!(item.shape().bottom(), 65.0);
        assert_eq!(item.shape().height, 32.0);
    }

    #[test]
    fn missing_cover_synthesises_placeholder() {
        let model = StandardModel::from_rows(vec![StandardItem::new(["Blue", "Joni"])]);
        let mut item = FlowItem::new(&config(), 0.0);
        item.refresh_image(Some(&model), &index(0));

        let front = item.front().unwrap();
        assert_eq!((front.width(), front.height()), (64, 64));
        assert!(front.pixels().any(|p| *p != PLACEHOLDER_FILL));
    }

    #[test]
    fn empty_decoration_falls_back_to_placeholder() {
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        let model = StandardModel::from_rows(vec![
            StandardItem::new(["Broken", "Nobody"]).with_decoration(empty),
        ]);
        let mut item = FlowItem::new(&config(), 0.0);
        let mut canvas = Canvas::new(80, 160);
        item.paint(Some(&model), &index(0), &mut canvas, &Transform::IDENTITY);

        let front = item.front().unwrap();
        assert_eq!((front.width(), front.height()), (64, 64));
        assert!(item.reflection().is_some());
        assert!(canvas.image().pixels().any(|p| p[3] == 255));
    }

    #[test]
    fn reflection_fades_to_transparent() {
        let model = StandardModel::from_rows(vec![StandardItem::new(["A"])]);
        let mut item = FlowItem::new(&config(), 0.0);
        item.refresh_image(Some(&model), &index(0));

        let reflection = item.reflection().unwrap();
        let seam = reflection.get_pixel(0, 0)[3];
        let far = reflection.get_pixel(0, reflection.height() - 1)[3];
        assert!(seam > 60 && seam <= 90);
        assert!(far <= 2);
    }

    #[test]
    fn paint_without_model_draws_no_cover_block() {
        let mut item = FlowItem::new(&config(), 0.0);
        let mut canvas = Canvas::new(80, 80);
        item.paint(None, &index(3), &mut canvas, &Transform::IDENTITY);

        assert!(item.front().is_none());
        assert!(canvas.image().pixels().any(|p| p[3] == 255));
    }

    #[test]
    fn out_of_range_row_still_paints() {
        let model = StandardModel::new();
        let mut item = FlowItem::new(&config(), 0.0);
        let mut canvas = Canvas::new(80, 160);
        item.paint(Some(&model), &index(7), &mut canvas, &Transform::IDENTITY);

        assert!(item.front().is_some());
        assert!(canvas.image().pixels().any(|p| p[3] == 255));
    }

    #[test]
    fn transform_records_rotation() {
        let mut item = FlowItem::new(&config(), 0.0);
        item.compute_transform(-66.0, Axis::Y, 0.8, 0.8);
        assert_eq!(item.rotation(), -66.0);
        assert!(item.transform().is_scaling());
        item.reset_transform();
        assert!(item.transform().is_identity());
    }
}
