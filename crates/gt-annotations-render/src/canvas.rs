//! Drawing surfaces for annotation overlays.

use crate::color::EntityColor;
use crate::render::RenderOptions;
use crate::{RenderError, RenderResult};
use ab_glyph::{FontVec, PxScale};
use gt_annotations_core::BoundingBox;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Horizontal offset of a label from its box's left edge, in pixels
pub const LABEL_OFFSET_X: f32 = 15.0;
/// Vertical offset of a label above its box's top edge, in pixels
pub const LABEL_OFFSET_Y: f32 = 20.0;
/// Extra width given to a label area past its box's right edge, in pixels
pub const LABEL_EXTRA_WIDTH: f32 = 20.0;

/// Rectangle in page pixel coordinates (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PixelRect {
    /// Entity box scaled to a `width` x `height` page.
    #[must_use]
    pub fn entity_box(bbox: &BoundingBox, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            x0: w * bbox.left as f32,
            y0: h * bbox.top as f32,
            x1: w * bbox.right() as f32,
            y1: h * bbox.bottom() as f32,
        }
    }

    /// Floating label area, anchored up and to the left of the entity box.
    #[must_use]
    pub fn label_area(bbox: &BoundingBox, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            x0: w * bbox.left as f32 - LABEL_OFFSET_X,
            y0: h * bbox.top as f32 - LABEL_OFFSET_Y,
            x1: w * bbox.right() as f32 + LABEL_EXTRA_WIDTH,
            y1: h * bbox.bottom() as f32,
        }
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// A paged surface that can draw entity boxes and labels.
///
/// Pages are 1-based.
pub trait AnnotationCanvas {
    fn page_count(&self) -> usize;

    /// Pixel size of `page`, or `None` when the page does not exist.
    fn page_size(&self, page: u32) -> Option<(u32, u32)>;

    /// Bordered rectangle around an entity.
    fn draw_box(
        &mut self,
        page: u32,
        rect: PixelRect,
        color: EntityColor,
        options: &RenderOptions,
    ) -> RenderResult<()>;

    /// Entity type label floating at the top-left of `area`.
    fn draw_label(
        &mut self,
        page: u32,
        area: PixelRect,
        label: &str,
        color: EntityColor,
        options: &RenderOptions,
    ) -> RenderResult<()>;
}

/// Raster canvas over one RGBA image per page
pub struct ImageCanvas {
    pages: Vec<RgbaImage>,
    font: Option<FontVec>,
}

impl std::fmt::Debug for ImageCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCanvas")
            .field("pages", &self.pages.len())
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl ImageCanvas {
    #[must_use]
    pub fn from_images(pages: Vec<RgbaImage>) -> Self {
        Self { pages, font: None }
    }

    /// `count` white pages of `width` x `height` pixels.
    pub fn blank(count: usize, width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidPageSize { width, height });
        }
        let page = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        Ok(Self::from_images(vec![page; count]))
    }

    /// Loads page images in order; the first path is page 1.
    pub fn open_pages<P: AsRef<Path>>(paths: &[P]) -> RenderResult<Self> {
        let pages = paths
            .iter()
            .map(|path| Ok(image::open(path.as_ref())?.to_rgba8()))
            .collect::<RenderResult<Vec<_>>>()?;
        Ok(Self::from_images(pages))
    }

    /// Enables text labels using the TrueType/OpenType font at `path`.
    pub fn with_font_path(mut self, path: &Path) -> RenderResult<Self> {
        let font_data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(font_data).map_err(|e| RenderError::InvalidFont {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.font = Some(font);
        Ok(self)
    }

    #[must_use]
    pub fn pages(&self) -> &[RgbaImage] {
        &self.pages
    }

    /// Writes `<stem>_page_<n>.png` for every page into `dir`.
    pub fn save_pages(&self, dir: &Path, stem: &str) -> RenderResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.pages.len());
        for (i, page) in self.pages.iter().enumerate() {
            let path = dir.join(format!("{stem}_page_{}.png", i + 1));
            page.save(&path)?;
            written.push(path);
        }
        Ok(written)
    }

    fn page_mut(&mut self, page: u32) -> Option<&mut RgbaImage> {
        let index = usize::try_from(page).ok()?.checked_sub(1)?;
        self.pages.get_mut(index)
    }
}

/// Clamps a pixel coordinate to `0..=limit`.
fn clamp_px(value: f32, limit: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        (value.round() as u32).min(limit)
    }
}

impl AnnotationCanvas for ImageCanvas {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: u32) -> Option<(u32, u32)> {
        let index = usize::try_from(page).ok()?.checked_sub(1)?;
        self.pages.get(index).map(RgbaImage::dimensions)
    }

    fn draw_box(
        &mut self,
        page: u32,
        rect: PixelRect,
        color: EntityColor,
        options: &RenderOptions,
    ) -> RenderResult<()> {
        let Some(img) = self.page_mut(page) else {
            return Ok(());
        };
        let (page_width, page_height) = img.dimensions();

        // Clamp to image bounds
        let x = clamp_px(rect.x0, page_width);
        let y = clamp_px(rect.y0, page_height);
        let w = clamp_px(rect.x1, page_width).saturating_sub(x);
        let h = clamp_px(rect.y1, page_height).saturating_sub(y);
        if w == 0 || h == 0 {
            return Ok(());
        }

        let rgba = color.to_rgba();
        for t in 0..options.line_thickness {
            let inner_w = w.saturating_sub(2 * t);
            let inner_h = h.saturating_sub(2 * t);
            if inner_w > 0 && inner_h > 0 {
                let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(inner_w, inner_h);
                draw_hollow_rect_mut(img, rect, rgba);
            }
        }
        Ok(())
    }

    fn draw_label(
        &mut self,
        page: u32,
        area: PixelRect,
        label: &str,
        color: EntityColor,
        options: &RenderOptions,
    ) -> RenderResult<()> {
        let font_scale = options.font_scale;
        let Self { pages, font } = self;
        let Some(img) = usize::try_from(page)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .and_then(|i| pages.get_mut(i))
        else {
            return Ok(());
        };
        let (page_width, page_height) = img.dimensions();

        let x = clamp_px(area.x0, page_width);
        let y = clamp_px(area.y0, page_height);
        let (bg_w, bg_h) = if font.is_some() {
            (
                (label.chars().count() as f32 * font_scale * 0.6).ceil() as u32 + 4,
                font_scale.ceil() as u32 + 2,
            )
        } else {
            // Without a font the label is a colored tab; its text is in the sidecar.
            (12, 8)
        };

        // Fill background rectangle manually
        let bg_color = color.with_alpha(options.label_bg_opacity);
        for py in y..(y + bg_h).min(page_height) {
            for px in x..(x + bg_w).min(page_width) {
                img.put_pixel(px, py, bg_color);
            }
        }

        if let Some(font) = font.as_ref() {
            draw_text_mut(
                img,
                Rgba([255, 255, 255, 255]),
                x as i32 + 2,
                y as i32 + 1,
                PxScale::from(font_scale),
                font,
                label,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RenderOptions {
        RenderOptions::default()
    }

    #[test]
    fn test_entity_box_scaling() {
        let bbox = BoundingBox::new(0.25, 0.1, 0.5, 0.1);
        let rect = PixelRect::entity_box(&bbox, 200, 400);
        assert!((rect.x0 - 20.0).abs() < 1e-4);
        assert!((rect.y0 - 100.0).abs() < 1e-4);
        assert!((rect.x1 - 120.0).abs() < 1e-4);
        assert!((rect.y1 - 140.0).abs() < 1e-4);
    }

    #[test]
    fn test_label_area_offsets() {
        let bbox = BoundingBox::new(0.25, 0.1, 0.5, 0.1);
        let area = PixelRect::label_area(&bbox, 200, 400);
        assert!((area.x0 - 5.0).abs() < 1e-4);
        assert!((area.y0 - 80.0).abs() < 1e-4);
        assert!((area.x1 - 140.0).abs() < 1e-4);
        assert!((area.y1 - 140.0).abs() < 1e-4);
    }

    #[test]
    fn test_blank_rejects_zero_size() {
        assert!(matches!(
            ImageCanvas::blank(1, 0, 10),
            Err(RenderError::InvalidPageSize { .. })
        ));
    }

    #[test]
    fn test_page_size_is_one_based() {
        let canvas = ImageCanvas::blank(2, 30, 40).unwrap();
        assert_eq!(canvas.page_count(), 2);
        assert_eq!(canvas.page_size(0), None);
        assert_eq!(canvas.page_size(1), Some((30, 40)));
        assert_eq!(canvas.page_size(3), None);
    }

    #[test]
    fn test_draw_box_border() {
        let mut canvas = ImageCanvas::blank(1, 100, 100).unwrap();
        let color = EntityColor::from_components([0.0, 0.0, 1.0]);
        let rect = PixelRect { x0: 10.0, y0: 10.0, x1: 50.0, y1: 30.0 };
        canvas.draw_box(1, rect, color, &options()).unwrap();

        let img = &canvas.pages()[0];
        assert_eq!(*img.get_pixel(10, 10), Rgba([0, 0, 255, 255]));
        assert_eq!(*img.get_pixel(11, 20), Rgba([0, 0, 255, 255]));
        assert_eq!(*img.get_pixel(30, 20), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_draw_label_tab_without_font() {
        let mut canvas = ImageCanvas::blank(1, 100, 100).unwrap();
        let color = EntityColor::from_components([1.0, 0.0, 0.0]);
        // Anchor above the page is clamped to the top edge
        let area = PixelRect { x0: -5.0, y0: -10.0, x1: 60.0, y1: 30.0 };
        canvas.draw_label(1, area, "DATE", color, &options()).unwrap();

        let img = &canvas.pages()[0];
        assert_eq!(*img.get_pixel(0, 0), Rgba([255, 0, 0, 200]));
        assert_eq!(*img.get_pixel(50, 50), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_missing_page_is_ignored() {
        let mut canvas = ImageCanvas::blank(1, 10, 10).unwrap();
        let rect = PixelRect { x0: 0.0, y0: 0.0, x1: 5.0, y1: 5.0 };
        let color = EntityColor::from_components([0.0, 0.0, 0.0]);
        assert!(canvas.draw_box(5, rect, color, &options()).is_ok());
    }

    #[test]
    fn test_save_pages() {
        let dir = tempfile::TempDir::new().unwrap();
        let canvas = ImageCanvas::blank(2, 8, 8).unwrap();
        let written = canvas.save_pages(dir.path(), "doc").unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("doc_page_2.png"));
        assert!(written[1].exists());
    }

    #[test]
    fn test_invalid_font_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("font.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let result = ImageCanvas::blank(1, 8, 8).unwrap().with_font_path(&path);
        assert!(matches!(result, Err(RenderError::InvalidFont { .. })));
    }
}
