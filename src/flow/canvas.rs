// src/flow/canvas.rs
//! Software RGBA surface the carousel is composed on.

use std::convert::Infallible;

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::Rectangle,
};
use embedded_text::{
    TextBox,
    alignment::{HorizontalAlignment, VerticalAlignment},
    style::TextBoxStyleBuilder,
};
use image::{
    Pixel as _, Rgba, RgbaImage,
    imageops::{interpolate_bilinear, interpolate_nearest},
};

use super::geometry::{PointF, RectF, Transform};

/// An owned RGBA image with the drawing operations the carousel needs.
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for p in self.image.pixels_mut() {
            *p = color;
        }
    }

    /// Source-over fill of the pixels covered by `rect`.
    pub fn fill_rect(&mut self, rect: RectF, color: Rgba<u8>) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.image.get_pixel_mut(x, y).blend(&color);
            }
        }
    }

    /// Draw `src` with its top-left corner at `origin` (in local coordinates),
    /// mapped to the canvas through `to_device`.
    pub fn draw_image(&mut self, src: &RgbaImage, origin: PointF, to_device: &Transform, smooth: bool) {
        if src.width() == 0 || src.height() == 0 {
            return;
        }
        let local = RectF::new(origin.x, origin.y, src.width() as f32, src.height() as f32);
        let Some(to_local) = to_device.inverted() else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.clip(to_device.map_rect(&local)) else {
            return;
        };
        let (w, h) = (src.width() as f32, src.height() as f32);
        for y in y0..y1 {
            for x in x0..x1 {
                let p = to_local.map(PointF::new(x as f32 + 0.5, y as f32 + 0.5));
                let (u, v) = (p.x - origin.x, p.y - origin.y);
                if u < 0.0 || v < 0.0 || u >= w || v >= h {
                    continue;
                }
                // sample at texel centres
                let sx = (u - 0.5).clamp(0.0, w - 1.0);
                let sy = (v - 0.5).clamp(0.0, h - 1.0);
                let sample = if smooth {
                    interpolate_bilinear(src, sx, sy)
                } else {
                    interpolate_nearest(src, sx, sy)
                };
                if let Some(color) = sample {
                    self.image.get_pixel_mut(x, y).blend(&color);
                }
            }
        }
    }

    /// Word-wrapped text centred inside `bounds`.
    pub fn draw_text_box(&mut self, text: &str, bounds: RectF, font: &MonoFont<'_>, color: [u8; 3]) {
        let style = MonoTextStyle::new(font, Rgb888::new(color[0], color[1], color[2]));
        let textbox_style = TextBoxStyleBuilder::new()
            .alignment(HorizontalAlignment::Center)
            .vertical_alignment(VerticalAlignment::Middle)
            .build();
        let area = Rectangle::new(
            Point::new(bounds.x as i32, bounds.y as i32),
            Size::new(bounds.width.max(0.0) as u32, bounds.height.max(0.0) as u32),
        );
        let _ = TextBox::with_textbox_style(text, area, style, textbox_style).draw(self);
    }

    /// Darken towards the edges: clear inside half the radius, alpha 64 at
    /// three quarters and 192 at the rim and beyond.
    pub fn radial_shade(&mut self, center: PointF, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            let (dx, dy) = (x as f32 + 0.5 - center.x, y as f32 + 0.5 - center.y);
            let d = (dx * dx + dy * dy).sqrt() / radius;
            let alpha = if d < 0.5 {
                continue;
            } else if d < 0.75 {
                (d - 0.5) / 0.25 * 64.0
            } else if d < 1.0 {
                64.0 + (d - 0.75) / 0.25 * 128.0
            } else {
                192.0
            };
            pixel.blend(&Rgba([0, 0, 0, alpha as u8]));
        }
    }

    /// Integer pixel bounds of `rect` clipped to the canvas.
    fn clip(&self, rect: RectF) -> Option<(u32, u32, u32, u32)> {
        if rect.is_empty() || !rect.x.is_finite() || !rect.y.is_finite() {
            return None;
        }
        let x0 = rect.x.floor().max(0.0) as u32;
        let y0 = rect.y.floor().max(0.0) as u32;
        let x1 = (rect.right().ceil().max(0.0) as u32).min(self.image.width());
        let y1 = (rect.bottom().ceil().max(0.0) as u32).min(self.image.height());
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 && point.x < w && point.y < h {
                self.image.put_pixel(
                    point.x as u32,
                    point.y as u32,
                    Rgba([color.r(), color.g(), color.b(), 255]),
                );
            }
        }
        Ok(())
    }
}
