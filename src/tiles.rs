//! Tile engine for pixel-inspection mode.
//!
//! The image is carved into 16x16-source-pixel tiles. Each visible tile is
//! rasterized once into a bitmap where every source pixel becomes a 64x64
//! cell annotated with its channel value(s), then kept in a bounded LRU
//! cache keyed by tile coordinates. Only the margin-expanded visible range
//! is ever materialized.

use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use egui::Rect;
use image::{imageops, Rgba, RgbaImage};

use crate::picture::Picture;
use crate::view::ViewTransform;

/// Device pixels per source pixel in pixel-inspection mode (also the
/// maximum zoom scale).
pub const PIXEL_CELL: u32 = 64;
/// Source pixels per tile edge.
pub const TILE_SOURCE_PX: u32 = 16;
/// Tile cache bound (count-based).
pub const CACHE_MAX_TILES: usize = 200;

const FONT_PIXEL: f32 = 12.0;
const LINE_GAP: f32 = 3.0;
const PADDING: f32 = 5.0;
/// Luminance above which annotation text flips from white to black.
const TEXT_LUMA_THRESHOLD: f32 = 140.0;
/// Grid line color, alpha-blended over the cells.
const GRID_RGBA: [u8; 4] = [100, 100, 100, 120];

/// Tile coordinates: image-space block indices, not pixels.
pub type TileKey = (u32, u32);

// ============================================================================
// Visible range
// ============================================================================

/// Tile-index bounding box covering the viewport under the given transform,
/// clamped to the image and expanded by a 1-tile margin (clamped at edges).
/// `None` when the viewport does not intersect the image at all.
pub fn visible_tile_range(
    viewport: Rect,
    transform: &ViewTransform,
    img_w: u32,
    img_h: u32,
) -> Option<(RangeInclusive<u32>, RangeInclusive<u32>)> {
    if img_w == 0 || img_h == 0 {
        return None;
    }
    let a = transform.screen_to_image(viewport.min, viewport, img_w, img_h);
    let b = transform.screen_to_image(viewport.max, viewport, img_w, img_h);

    let left = (a.x.floor().max(0.0)) as i64;
    let top = (a.y.floor().max(0.0)) as i64;
    let right = (b.x.ceil() as i64).min(img_w as i64 - 1);
    let bottom = (b.y.ceil() as i64).min(img_h as i64 - 1);
    if right < left || bottom < top {
        return None;
    }

    let tile = TILE_SOURCE_PX as i64;
    let max_tx = (img_w - 1) / TILE_SOURCE_PX;
    let max_ty = (img_h - 1) / TILE_SOURCE_PX;
    let tx0 = ((left / tile - 1).max(0)) as u32;
    let ty0 = ((top / tile - 1).max(0)) as u32;
    let tx1 = ((right / tile + 1) as u32).min(max_tx);
    let ty1 = ((bottom / tile + 1) as u32).min(max_ty);
    Some((tx0..=tx1, ty0..=ty1))
}

/// Collect a range pair into the required-key set.
pub fn required_keys(range: &(RangeInclusive<u32>, RangeInclusive<u32>)) -> HashSet<TileKey> {
    let mut keys = HashSet::new();
    for ty in range.1.clone() {
        for tx in range.0.clone() {
            keys.insert((tx, ty));
        }
    }
    keys
}

// ============================================================================
// Materialized tile set
// ============================================================================

/// The set of currently presented tiles. Generic over the stored value so
/// the reconciliation logic is independent of how tiles are displayed.
pub struct TileLayer<T> {
    tiles: HashMap<TileKey, T>,
}

impl<T> TileLayer<T> {
    pub fn new() -> Self {
        Self { tiles: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TileKey, &T)> {
        self.tiles.iter()
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Reconcile against the required set: drop every tile not required,
    /// call `make` for each required key not yet present. `make` returning
    /// `None` (a failed tile render) leaves that key unmaterialized — the
    /// gap is retried on the next reconciliation.
    ///
    /// Idempotent: an unchanged required set yields `(0, 0)` on repeat.
    pub fn reconcile(
        &mut self,
        required: &HashSet<TileKey>,
        mut make: impl FnMut(TileKey) -> Option<T>,
    ) -> (usize, usize) {
        let before = self.tiles.len();
        self.tiles.retain(|key, _| required.contains(key));
        let removed = before - self.tiles.len();

        let mut added = 0;
        for &key in required {
            if self.tiles.contains_key(&key) {
                continue;
            }
            if let Some(value) = make(key) {
                self.tiles.insert(key, value);
                added += 1;
            }
        }
        (added, removed)
    }
}

// ============================================================================
// Tile rasterization
// ============================================================================

/// Annotation text color for a pixel: black on bright, white on dark.
pub(crate) fn annotation_color(r: u8, g: u8, b: u8) -> [u8; 3] {
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma > TEXT_LUMA_THRESHOLD {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    }
}

/// Cached glyph coverage, rasterized once per (glyph, size) at origin zero
/// and replayed at each draw position.
type GlyphPixelCache = HashMap<(GlyphId, u32), (Vec<(u32, u32, f32)>, f32, f32)>;

/// Renders one tile: nearest-neighbor upscale to 64px cells, value text per
/// cell, then the translucent cell grid. Deterministic for a given picture;
/// the glyph cache only memoizes rasterization.
pub struct TileAnnotator {
    font: Option<FontArc>,
    glyph_cache: GlyphPixelCache,
}

impl TileAnnotator {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font, glyph_cache: HashMap::new() }
    }

    /// Annotator using a system monospace face. Tiles render without text
    /// when no usable font resolves (warned once here).
    pub fn with_system_font() -> Self {
        let font = load_monospace_font();
        if font.is_none() {
            crate::log_warn!("No monospace font found; pixel cells will not be annotated");
        }
        Self::new(font)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Rasterize the tile at `key`. `None` for keys outside the image or
    /// degenerate (zero-sized) edge blocks — callers simply omit the tile.
    pub fn render(&mut self, picture: &Picture, key: TileKey) -> Option<RgbaImage> {
        let (tx, ty) = key;
        let (iw, ih) = (picture.width(), picture.height());
        let x0 = tx.checked_mul(TILE_SOURCE_PX)?;
        let y0 = ty.checked_mul(TILE_SOURCE_PX)?;
        if x0 >= iw || y0 >= ih {
            return None;
        }
        let bw = TILE_SOURCE_PX.min(iw - x0);
        let bh = TILE_SOURCE_PX.min(ih - y0);
        if bw == 0 || bh == 0 {
            return None;
        }

        let block = imageops::crop_imm(picture.pixels(), x0, y0, bw, bh).to_image();
        let mut out = imageops::resize(
            &block,
            bw * PIXEL_CELL,
            bh * PIXEL_CELL,
            imageops::FilterType::Nearest,
        );

        if self.font.is_some() {
            for yy in 0..bh {
                for xx in 0..bw {
                    let p = block.get_pixel(xx, yy);
                    let (r, g, b) = (p[0], p[1], p[2]);
                    let color = annotation_color(r, g, b);
                    let cell_x = (xx * PIXEL_CELL) as f32;
                    let cell_y = (yy * PIXEL_CELL) as f32;
                    let center_x = cell_x + PIXEL_CELL as f32 * 0.5;
                    let line_h = self.line_height();

                    if picture.is_grayscale() {
                        // One line, vertically centered in the cell.
                        let top = cell_y + (PIXEL_CELL as f32 - line_h) * 0.5;
                        self.draw_label(&mut out, &r.to_string(), center_x, top, color);
                    } else {
                        // R/G/B stacked from the top padding.
                        let top = cell_y + PADDING;
                        for (i, v) in [r, g, b].into_iter().enumerate() {
                            let line_top = top + i as f32 * (line_h + LINE_GAP);
                            self.draw_label(&mut out, &v.to_string(), center_x, line_top, color);
                        }
                    }
                }
            }
        }

        draw_cell_grid(&mut out, bw, bh);
        Some(out)
    }

    fn line_height(&self) -> f32 {
        match &self.font {
            Some(font) => font.as_scaled(FONT_PIXEL).height(),
            None => FONT_PIXEL,
        }
    }

    /// Draw one horizontally centered text line whose top edge is `top_y`.
    fn draw_label(
        &mut self,
        out: &mut RgbaImage,
        text: &str,
        center_x: f32,
        top_y: f32,
        color: [u8; 3],
    ) {
        let Some(font) = &self.font else { return };
        let scaled = font.as_scaled(FONT_PIXEL);

        // Lay out left-to-right with kerning, then center on `center_x`.
        let mut glyphs: Vec<(GlyphId, f32)> = Vec::with_capacity(text.len());
        let mut cursor = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = font.glyph_id(ch);
            if let Some(p) = prev {
                cursor += scaled.kern(p, id);
            }
            glyphs.push((id, cursor));
            cursor += scaled.h_advance(id);
            prev = Some(id);
        }
        let origin_x = center_x - cursor * 0.5;
        let baseline = top_y + scaled.ascent();

        let size_key = FONT_PIXEL.to_bits();
        for (id, gx) in glyphs {
            let cache_key = (id, size_key);
            if !self.glyph_cache.contains_key(&cache_key) {
                let glyph = id.with_scale_and_position(FONT_PIXEL, point(0.0, 0.0));
                let mut px_list = Vec::new();
                let (bx, by) = match font.outline_glyph(glyph) {
                    Some(outlined) => {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|x, y, cov| px_list.push((x, y, cov)));
                        (bounds.min.x, bounds.min.y)
                    }
                    None => (0.0, 0.0),
                };
                self.glyph_cache.insert(cache_key, (px_list, bx, by));
            }
            let (pixels, bx, by) = &self.glyph_cache[&cache_key];
            for &(px, py, cov) in pixels {
                let x = (origin_x + gx + bx + px as f32).round() as i64;
                let y = (baseline + by + py as f32).round() as i64;
                if x < 0 || y < 0 || x >= out.width() as i64 || y >= out.height() as i64 {
                    continue;
                }
                let dst = out.get_pixel_mut(x as u32, y as u32);
                for c in 0..3 {
                    let blended = color[c] as f32 * cov + dst[c] as f32 * (1.0 - cov);
                    dst[c] = blended.round() as u8;
                }
            }
        }
    }
}

/// Translucent grid at every 64px cell boundary, full tile extent. The far
/// edge line lands on the last pixel row/column (the drawable surface ends
/// exactly at the boundary).
fn draw_cell_grid(out: &mut RgbaImage, block_w: u32, block_h: u32) {
    let (w, h) = out.dimensions();
    for gx in 0..=block_w {
        let x = (gx * PIXEL_CELL).min(w - 1);
        for y in 0..h {
            blend_rgba(out.get_pixel_mut(x, y), GRID_RGBA);
        }
    }
    for gy in 0..=block_h {
        let y = (gy * PIXEL_CELL).min(h - 1);
        for x in 0..w {
            blend_rgba(out.get_pixel_mut(x, y), GRID_RGBA);
        }
    }
}

fn blend_rgba(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let a = src[3] as f32 / 255.0;
    for c in 0..3 {
        dst[c] = (src[c] as f32 * a + dst[c] as f32 * (1.0 - a)).round() as u8;
    }
}

/// Resolve a monospace face from the system for cell annotations: Consolas
/// first, then common fallbacks, then the generic monospace family.
fn load_monospace_font() -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let source = SystemSource::new();
    let handle = source
        .select_best_match(
            &[
                FamilyName::Title("Consolas".to_string()),
                FamilyName::Title("DejaVu Sans Mono".to_string()),
                FamilyName::Title("Menlo".to_string()),
                FamilyName::Monospace,
            ],
            &Properties::new(),
        )
        .ok()?;
    let font_data = handle.load().ok()?;
    let bytes: Vec<u8> = (*font_data.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2, Vec2};
    use image::Rgba;

    fn viewport(w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(w, h))
    }

    fn picture(w: u32, h: u32, px: [u8; 4]) -> Picture {
        Picture::new(RgbaImage::from_pixel(w, h, Rgba(px))).unwrap()
    }

    #[test]
    fn test_visible_range_covers_whole_small_image() {
        // 40x40 image at scale 1 fits entirely in the viewport: tiles 0..=2.
        let t = ViewTransform::default();
        let range = visible_tile_range(viewport(200.0, 200.0), &t, 40, 40).unwrap();
        assert_eq!(range.0, 0..=2);
        assert_eq!(range.1, 0..=2);
    }

    #[test]
    fn test_visible_range_margin_clamped_at_edges() {
        // Zoomed to pixel scale, viewport sees only the top-left corner.
        let mut t = ViewTransform { scale: 64.0, pan_offset: Vec2::ZERO };
        t.anchor_to(Vec2::ZERO, pos2(0.0, 0.0), viewport(128.0, 128.0), 100, 100);
        let range = visible_tile_range(viewport(128.0, 128.0), &t, 100, 100).unwrap();
        // Visible pixels 0..2 -> tile 0, margin would reach -1 but clamps.
        assert_eq!(*range.0.start(), 0);
        assert_eq!(*range.1.start(), 0);
        assert!(*range.0.end() <= 1);
    }

    #[test]
    fn test_visible_range_none_when_image_offscreen() {
        let t = ViewTransform {
            scale: 1.0,
            pan_offset: Vec2::new(10_000.0, 0.0),
        };
        assert!(visible_tile_range(viewport(100.0, 100.0), &t, 64, 64).is_none());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut layer: TileLayer<u32> = TileLayer::new();
        let required: HashSet<TileKey> = [(0, 0), (1, 0), (0, 1)].into_iter().collect();

        let (added, removed) = layer.reconcile(&required, |_| Some(7));
        assert_eq!((added, removed), (3, 0));

        let (added, removed) = layer.reconcile(&required, |_| Some(7));
        assert_eq!((added, removed), (0, 0));
    }

    #[test]
    fn test_reconcile_drops_tiles_outside_required() {
        let mut layer: TileLayer<u32> = TileLayer::new();
        let first: HashSet<TileKey> = [(0, 0), (1, 0)].into_iter().collect();
        layer.reconcile(&first, |_| Some(0));

        let second: HashSet<TileKey> = [(1, 0), (2, 0)].into_iter().collect();
        let (added, removed) = layer.reconcile(&second, |_| Some(0));
        assert_eq!((added, removed), (1, 1));
        assert!(!layer.contains(&(0, 0)));
        assert!(layer.contains(&(2, 0)));
    }

    #[test]
    fn test_failed_tiles_are_omitted_silently() {
        let mut layer: TileLayer<u32> = TileLayer::new();
        let required: HashSet<TileKey> = [(0, 0), (1, 0)].into_iter().collect();
        let (added, _) = layer.reconcile(&required, |key| (key != (1, 0)).then_some(0));
        assert_eq!(added, 1);
        assert!(!layer.contains(&(1, 0)));
    }

    #[test]
    fn test_render_tile_dimensions() {
        let pic = picture(40, 24, [50, 60, 70, 255]);
        let mut annotator = TileAnnotator::new(None);

        // Interior tile: full 16x16 block.
        let full = annotator.render(&pic, (0, 0)).unwrap();
        assert_eq!(full.dimensions(), (16 * 64, 16 * 64));

        // Edge tile: clipped to 8x8 source pixels.
        let edge = annotator.render(&pic, (2, 1)).unwrap();
        assert_eq!(edge.dimensions(), (8 * 64, 8 * 64));

        // Outside the image entirely.
        assert!(annotator.render(&pic, (3, 0)).is_none());
        assert!(annotator.render(&pic, (0, 2)).is_none());
    }

    #[test]
    fn test_render_upscales_nearest() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, Rgba([200, 100, 50, 255]));
        let pic = Picture::new(img).unwrap();
        let mut annotator = TileAnnotator::new(None);
        let tile = annotator.render(&pic, (0, 0)).unwrap();
        assert_eq!(tile.dimensions(), (128, 128));
        // Inside the second cell, away from grid lines and cell edges.
        assert_eq!(tile.get_pixel(96, 32), &Rgba([200, 100, 50, 255]));
        assert_eq!(tile.get_pixel(32, 96), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_grid_lines_darken_boundaries() {
        let pic = picture(2, 2, [255, 255, 255, 255]);
        let mut annotator = TileAnnotator::new(None);
        let tile = annotator.render(&pic, (0, 0)).unwrap();
        // The cell boundary at x=64 is blended toward the grid gray.
        let boundary = tile.get_pixel(64, 32);
        assert!(boundary[0] < 255);
        // Cell interiors stay untouched.
        assert_eq!(tile.get_pixel(32, 32), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_annotation_color_threshold() {
        assert_eq!(annotation_color(255, 255, 255), [0, 0, 0]);
        assert_eq!(annotation_color(0, 0, 0), [255, 255, 255]);
        // Pure red: luminance 76.2 -> white text.
        assert_eq!(annotation_color(255, 0, 0), [255, 255, 255]);
        // Pure green: luminance 149.7 -> black text.
        assert_eq!(annotation_color(0, 255, 0), [0, 0, 0]);
    }

    #[test]
    fn test_required_keys_counts() {
        let keys = required_keys(&(0..=2, 1..=2));
        assert_eq!(keys.len(), 6);
        assert!(keys.contains(&(2, 2)));
        assert!(!keys.contains(&(0, 0)));
    }
}
