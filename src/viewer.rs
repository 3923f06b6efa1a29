//! Viewport controller — the heart of the viewer.
//!
//! Owns the view transform and the Normal/Pixel state machine, decides when
//! tiles are materialized, and reports pixel samples and navigation
//! requests to the shell as drained events. Everything here is driven by
//! plain input primitives (points, deltas, times) so the whole state
//! machine runs headless in tests; `app.rs` is only the egui adapter.

use std::collections::HashSet;
use std::sync::Arc;

use egui::{Modifiers, Pos2, Rect, Vec2};
use image::RgbaImage;

use crate::debounce::Debounce;
use crate::lru::LruCache;
use crate::picture::Picture;
use crate::probe::{probe, PixelSample};
use crate::tiles::{
    required_keys, visible_tile_range, TileAnnotator, TileKey, TileLayer, CACHE_MAX_TILES,
    PIXEL_CELL, TILE_SOURCE_PX,
};
use crate::view::{fit_scale, ViewTransform, MAX_SCALE, MIN_SCALE};

/// Width of the prev/next navigation strips at the viewport edges.
pub const NAV_HOTSPOT_WIDTH: f32 = 40.0;

/// Above this scale bilinear resampling is pointless; switch to nearest.
const SMOOTH_THRESHOLD: f32 = 2.5;
/// Wheel-zoom factor per angle unit (Qt-style: 120 units per notch).
const WHEEL_ZOOM_RATE: f32 = 0.0015;
/// Zooming in past this scale snaps into pixel-inspection mode.
const PIXEL_ENTER_SCALE: f32 = PIXEL_CELL as f32 - 1.0;
/// Pan distance per angle unit for modifier-scroll (30px per notch).
const WHEEL_PAN_STEP: f32 = 30.0 / 120.0;

/// Debounce intervals, in seconds.
const PAN_TILE_DELAY: f64 = 0.060;
const RESIZE_SETTLE_DELAY: f64 = 0.180;
const ZOOM_IDLE_DELAY: f64 = 0.120;

/// One tagged state instead of independent flags, so illegal combinations
/// (pixel mode with auto-fit) cannot be represented.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewMode {
    Normal {
        /// While set, a viewport resize re-fits the image. Cleared by any
        /// manual zoom.
        auto_fit: bool,
    },
    Pixel {
        /// Transform to restore on exit; `None` means recompute a fit.
        saved: Option<ViewTransform>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavSide {
    Prev,
    Next,
}

/// Events for the shell, drained once per frame via [`Viewer::take_events`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewerEvent {
    /// The pixel under the pointer changed (or left the image).
    Sample(PixelSample),
    /// A navigation hotspot was activated.
    Nav(NavSide),
}

pub struct Viewer {
    picture: Option<Picture>,
    transform: ViewTransform,
    mode: ViewMode,
    viewport: Rect,
    /// Set when an image loads before the first frame sized the viewport.
    pending_fit: bool,
    /// True while a wheel-zoom gesture is in flight (zoom-idle pending).
    zooming: bool,
    /// Bilinear resampling permitted (hysteresis: re-enabled only once a
    /// zoom gesture settles at or below the threshold).
    smooth_enabled: bool,
    last_pointer: Option<Pos2>,
    last_sample: Option<PixelSample>,

    cache: LruCache<TileKey, Arc<RgbaImage>>,
    tiles: TileLayer<Arc<RgbaImage>>,
    annotator: TileAnnotator,

    events: Vec<ViewerEvent>,
    pan_update: Debounce,
    resize_settle: Debounce,
    zoom_idle: Debounce,
}

impl Viewer {
    pub fn new(annotator: TileAnnotator) -> Self {
        Self {
            picture: None,
            transform: ViewTransform::default(),
            mode: ViewMode::Normal { auto_fit: true },
            viewport: Rect::NOTHING,
            pending_fit: false,
            zooming: false,
            smooth_enabled: true,
            last_pointer: None,
            last_sample: None,
            cache: LruCache::new(CACHE_MAX_TILES),
            tiles: TileLayer::new(),
            annotator,
            events: Vec::new(),
            pan_update: Debounce::new(PAN_TILE_DELAY),
            resize_settle: Debounce::new(RESIZE_SETTLE_DELAY),
            zoom_idle: Debounce::new(ZOOM_IDLE_DELAY),
        }
    }

    // ---- accessors ----------------------------------------------------------

    pub fn picture(&self) -> Option<&Picture> {
        self.picture.as_ref()
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_pixel_mode(&self) -> bool {
        matches!(self.mode, ViewMode::Pixel { .. })
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// True when the continuous image may be drawn with bilinear filtering.
    pub fn wants_smooth_filter(&self) -> bool {
        self.smooth_enabled && self.transform.scale <= SMOOTH_THRESHOLD
    }

    /// The materialized tile set (empty outside pixel mode).
    pub fn materialized(&self) -> impl Iterator<Item = (&TileKey, &Arc<RgbaImage>)> {
        self.tiles.iter()
    }

    pub fn materialized_len(&self) -> usize {
        self.tiles.len()
    }

    /// Screen rectangle the image occupies, for the continuous layer.
    pub fn image_rect_on_screen(&self) -> Option<Rect> {
        let (iw, ih) = self.dims()?;
        Some(self.transform.image_rect(self.viewport, iw, ih))
    }

    /// Screen rectangle for one materialized tile: anchored at the tile's
    /// image-space origin, sized so the bitmap covers exactly its source
    /// block (at pixel scale that is 1:1 with device pixels).
    pub fn tile_screen_rect(&self, key: TileKey, bitmap: &RgbaImage) -> Option<Rect> {
        let (iw, ih) = self.dims()?;
        let (tx, ty) = key;
        let origin = Vec2::new((tx * TILE_SOURCE_PX) as f32, (ty * TILE_SOURCE_PX) as f32);
        let min = self.transform.image_to_screen(origin, self.viewport, iw, ih);
        let src_size = Vec2::new(
            (bitmap.width() / PIXEL_CELL) as f32,
            (bitmap.height() / PIXEL_CELL) as f32,
        );
        Some(Rect::from_min_size(min, src_size * self.transform.scale))
    }

    /// Next pending debounce deadline, for repaint scheduling.
    pub fn next_deadline(&self) -> Option<f64> {
        [
            self.pan_update.deadline(),
            self.resize_settle.deadline(),
            self.zoom_idle.deadline(),
        ]
        .into_iter()
        .flatten()
        .reduce(f64::min)
    }

    pub fn take_events(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.events)
    }

    fn dims(&self) -> Option<(u32, u32)> {
        self.picture.as_ref().map(|p| (p.width(), p.height()))
    }

    // ---- loading ------------------------------------------------------------

    /// Replace the current image wholesale. All cache and transform state is
    /// invalidated; a fit is applied (or deferred until the viewport has a
    /// size). A failed decode never reaches this point, so the previous
    /// image stays live on load errors.
    pub fn load(&mut self, picture: Picture) {
        self.cache.clear();
        self.tiles.clear();
        self.pan_update.stop();
        self.resize_settle.stop();
        self.zoom_idle.stop();
        self.zooming = false;
        self.smooth_enabled = true;
        self.last_sample = None;
        self.transform = ViewTransform::default();
        self.mode = ViewMode::Normal { auto_fit: true };
        crate::log_info!(
            "Loaded {}x{} image (grayscale: {})",
            picture.width(),
            picture.height(),
            picture.is_grayscale()
        );
        self.picture = Some(picture);
        if self.viewport.width() > 1.0 && self.viewport.height() > 1.0 {
            self.fit_to_viewport(None);
        } else {
            self.pending_fit = true;
        }
    }

    // ---- reference point ----------------------------------------------------

    /// Pick the reference point for a transform change: an explicit point if
    /// it lies inside the viewport, else the pointer, else the center.
    fn reference_point(&self, explicit: Option<Pos2>) -> Pos2 {
        explicit
            .filter(|p| self.viewport.contains(*p))
            .or_else(|| self.last_pointer.filter(|p| self.viewport.contains(*p)))
            .unwrap_or_else(|| self.viewport.center())
    }

    // ---- transform operations -----------------------------------------------

    /// Fit the image to the viewport on its constraining dimension while
    /// holding the reference point fixed. Turns auto-fit on.
    pub fn fit_to_viewport(&mut self, explicit_ref: Option<Pos2>) {
        let Some((iw, ih)) = self.dims() else { return };
        if self.is_pixel_mode() {
            self.exit_pixel_mode(explicit_ref);
        }
        let ref_pt = self.reference_point(explicit_ref);
        let img_pt = self.transform.screen_to_image(ref_pt, self.viewport, iw, ih);
        self.transform.scale = fit_scale(self.viewport.size(), iw, ih);
        self.transform.anchor_to(img_pt, ref_pt, self.viewport, iw, ih);
        self.mode = ViewMode::Normal { auto_fit: true };
    }

    /// Scale by `factor` about `ref_pt`, clamped to the legal range. The
    /// shared primitive behind wheel zoom. Returns the resulting scale.
    pub fn zoom_at(&mut self, ref_pt: Pos2, factor: f32) -> f32 {
        let Some((iw, ih)) = self.dims() else {
            return self.transform.scale;
        };
        let img_pt = self.transform.screen_to_image(ref_pt, self.viewport, iw, ih);
        self.transform.scale = (self.transform.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.transform.anchor_to(img_pt, ref_pt, self.viewport, iw, ih);
        self.transform.scale
    }

    /// Pan by a screen-space delta (drag or modifier-scroll). In pixel mode
    /// this schedules a debounced tile update.
    pub fn pan_by(&mut self, delta: Vec2, now: f64) {
        if self.picture.is_none() {
            return;
        }
        self.transform.pan_offset += delta;
        if self.is_pixel_mode() {
            self.pan_update.start(now);
        }
    }

    // ---- pixel mode ---------------------------------------------------------

    /// Snap the scale to exactly one cell per source pixel and swap the
    /// continuous layer for annotated tiles. Valid only from Normal mode.
    ///
    /// Tiles are materialized here, before the continuous image stops being
    /// drawn, so the first pixel-mode frame never shows a blank viewport.
    pub fn enter_pixel_mode(&mut self, explicit_ref: Option<Pos2>) {
        if self.is_pixel_mode() {
            return;
        }
        let Some((iw, ih)) = self.dims() else { return };
        let saved = self.transform;
        let ref_pt = self.reference_point(explicit_ref);
        let img_pt = self.transform.screen_to_image(ref_pt, self.viewport, iw, ih);
        self.transform.scale = MAX_SCALE; // bit-exact: tiles map 1:1 to device pixels
        self.transform.anchor_to(img_pt, ref_pt, self.viewport, iw, ih);
        self.mode = ViewMode::Pixel { saved: Some(saved) };
        self.update_visible_tiles();
        crate::log_info!("Entered pixel mode ({} tiles materialized)", self.tiles.len());
    }

    /// Tear down the tile layer and restore the saved transform (or refit
    /// when none survives), re-preserving the reference point. Valid only
    /// from Pixel mode.
    pub fn exit_pixel_mode(&mut self, explicit_ref: Option<Pos2>) {
        let ViewMode::Pixel { saved } = self.mode else { return };
        let Some((iw, ih)) = self.dims() else { return };
        // Stop the pending tile update before tearing the set down, so no
        // reconciliation runs against removed tiles.
        self.pan_update.stop();
        self.tiles.clear();

        let ref_pt = self.reference_point(explicit_ref);
        let img_pt = self.transform.screen_to_image(ref_pt, self.viewport, iw, ih);
        match saved {
            Some(t) => {
                self.transform = t;
                self.mode = ViewMode::Normal { auto_fit: false };
            }
            None => {
                self.transform.scale = fit_scale(self.viewport.size(), iw, ih);
                self.mode = ViewMode::Normal { auto_fit: true };
            }
        }
        self.transform.anchor_to(img_pt, ref_pt, self.viewport, iw, ih);
        crate::log_info!("Exited pixel mode (scale {:.2})", self.transform.scale);
    }

    /// Reconcile the materialized tile set against the margin-expanded
    /// visible range. Idempotent; returns (added, removed).
    fn update_visible_tiles(&mut self) -> (usize, usize) {
        if !self.is_pixel_mode() {
            return (0, 0);
        }
        let Some(picture) = &self.picture else {
            return (0, 0);
        };
        let (iw, ih) = (picture.width(), picture.height());
        let required = match visible_tile_range(self.viewport, &self.transform, iw, ih) {
            Some(range) => required_keys(&range),
            None => HashSet::new(),
        };
        let cache = &mut self.cache;
        let annotator = &mut self.annotator;
        self.tiles.reconcile(&required, |key| {
            if let Some(bitmap) = cache.get(&key) {
                return Some(Arc::clone(bitmap));
            }
            let bitmap = Arc::new(annotator.render(picture, key)?);
            cache.insert(key, Arc::clone(&bitmap));
            Some(bitmap)
        })
    }

    // ---- input --------------------------------------------------------------

    /// Pointer moved (`None` = left the viewport). Emits a sample event
    /// whenever the pixel under the pointer changes.
    pub fn pointer_moved(&mut self, pos: Option<Pos2>) {
        match pos {
            Some(p) => {
                self.last_pointer = Some(p);
                self.emit_sample_at(p);
            }
            None => {
                if self.last_pointer.take().is_some() {
                    self.push_sample(PixelSample::Absent);
                }
            }
        }
    }

    /// Pointer press. Returns true when the press hit a navigation hotspot
    /// (and was consumed); otherwise the pressed pixel is sampled.
    pub fn pointer_pressed(&mut self, pos: Pos2) -> bool {
        if self.picture.is_none() {
            return false;
        }
        if let Some(side) = self.hotspot_at(pos) {
            self.events.push(ViewerEvent::Nav(side));
            return true;
        }
        self.emit_sample_at(pos);
        false
    }

    /// Pointer release: the end of a drag-pan. The image may have moved
    /// under the stationary pointer, so re-sample the pixel beneath it.
    pub fn pointer_released(&mut self, pos: Pos2) {
        if self.picture.is_some() && self.viewport.contains(pos) {
            self.emit_sample_at(pos);
        }
    }

    /// Double-click: hotspots already navigated on the click, so only the
    /// plain-surface action remains — leave pixel mode and refit.
    pub fn double_click(&mut self, pos: Pos2) {
        if self.picture.is_none() || self.hotspot_at(pos).is_some() {
            return;
        }
        self.pan_update.stop();
        if self.is_pixel_mode() {
            self.exit_pixel_mode(Some(pos));
        }
        self.fit_to_viewport(Some(pos));
    }

    /// Navigation hotspot under `pos`, if any: a 40px strip at either
    /// viewport edge.
    pub fn hotspot_at(&self, pos: Pos2) -> Option<NavSide> {
        if self.picture.is_none() || !self.viewport.contains(pos) {
            return None;
        }
        if pos.x <= self.viewport.min.x + NAV_HOTSPOT_WIDTH {
            return Some(NavSide::Prev);
        }
        if pos.x >= self.viewport.max.x - NAV_HOTSPOT_WIDTH {
            return Some(NavSide::Next);
        }
        None
    }

    /// Wheel input. `angle_delta` is in Qt-style angle units (120/notch).
    pub fn wheel(&mut self, pos: Pos2, angle_delta: f32, modifiers: Modifiers, now: f64) {
        if angle_delta == 0.0 || self.picture.is_none() {
            return;
        }
        // Modifier scroll pans without a scale change.
        if modifiers.ctrl || modifiers.command {
            self.pan_by(Vec2::new(0.0, angle_delta * WHEEL_PAN_STEP), now);
            return;
        }
        if modifiers.shift {
            self.pan_by(Vec2::new(angle_delta * WHEEL_PAN_STEP, 0.0), now);
            return;
        }

        if self.is_pixel_mode() {
            // Direction alone decides the exit — not the scale the gesture
            // would produce. Zoom-in is already at maximum magnification.
            if angle_delta < 0.0 {
                self.exit_pixel_mode(Some(pos));
            }
            return;
        }

        let factor = 1.0 + WHEEL_ZOOM_RATE * angle_delta;
        let new_scale = self.zoom_at(pos, factor);

        self.zooming = true;
        self.zoom_idle.start(now);
        if new_scale > SMOOTH_THRESHOLD && self.smooth_enabled {
            self.smooth_enabled = false;
        }
        self.mode = ViewMode::Normal { auto_fit: false };

        if new_scale >= PIXEL_ENTER_SCALE && angle_delta > 0.0 {
            self.enter_pixel_mode(Some(pos));
        }
    }

    /// Viewport geometry for this frame; detects resizes.
    pub fn set_viewport(&mut self, rect: Rect, now: f64) {
        let prev = self.viewport;
        self.viewport = rect;
        if self.picture.is_none() {
            return;
        }
        if self.pending_fit && rect.width() > 1.0 && rect.height() > 1.0 {
            self.pending_fit = false;
            self.fit_to_viewport(None);
            return;
        }
        let resized = !prev.size().is_finite() || (prev.size() - rect.size()).length() > 0.5;
        if !resized {
            return;
        }
        match self.mode {
            ViewMode::Normal { auto_fit: true } if !self.zooming => self.fit_to_viewport(None),
            ViewMode::Normal { .. } => self.resize_settle.start(now),
            ViewMode::Pixel { .. } => self.pan_update.start(now),
        }
    }

    /// Advance the debounce timers. Called once per frame.
    pub fn tick(&mut self, now: f64) {
        if self.pan_update.poll(now) {
            self.update_visible_tiles();
        }
        if self.zoom_idle.poll(now) {
            self.zooming = false;
            // Gesture over: restore smooth resampling if the scale allows.
            if self.transform.scale <= SMOOTH_THRESHOLD && !self.smooth_enabled {
                self.smooth_enabled = true;
            }
        }
        if self.resize_settle.poll(now) {
            if self.zooming {
                // Suspended while a zoom gesture is in flight; re-check once
                // it settles.
                self.resize_settle.start(now);
            } else if let ViewMode::Normal { auto_fit: true } = self.mode {
                if let Some((iw, ih)) = self.dims() {
                    let target = fit_scale(self.viewport.size(), iw, ih);
                    if (self.transform.scale - target).abs() > 1e-3 {
                        self.fit_to_viewport(None);
                    }
                }
            }
        }
    }

    fn emit_sample_at(&mut self, pos: Pos2) {
        let sample = match &self.picture {
            Some(picture) => probe(picture, &self.transform, self.viewport, pos),
            None => PixelSample::Absent,
        };
        self.push_sample(sample);
    }

    fn push_sample(&mut self, sample: PixelSample) {
        if self.last_sample != Some(sample) {
            self.last_sample = Some(sample);
            self.events.push(ViewerEvent::Sample(sample));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};
    use image::{Rgba, RgbaImage};

    fn viewport(w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(w, h))
    }

    fn loaded_viewer(img_w: u32, img_h: u32) -> Viewer {
        let mut v = Viewer::new(TileAnnotator::new(None));
        v.set_viewport(viewport(800.0, 600.0), 0.0);
        let pic =
            Picture::new(RgbaImage::from_pixel(img_w, img_h, Rgba([90, 90, 90, 255]))).unwrap();
        v.load(pic);
        v
    }

    #[test]
    fn test_scale_stays_in_range_under_any_zoom_sequence() {
        let mut v = loaded_viewer(100, 100);
        let center = pos2(400.0, 300.0);
        for factor in [10.0, 10.0, 0.0001, 0.5, 1000.0, 0.003, 1.0001] {
            let s = v.zoom_at(center, factor);
            assert!((MIN_SCALE..=MAX_SCALE).contains(&s), "scale {s} out of range");
        }
    }

    #[test]
    fn test_fit_is_idempotent() {
        let mut v = loaded_viewer(320, 200);
        v.fit_to_viewport(None);
        let first = v.transform();
        v.fit_to_viewport(None);
        assert_eq!(v.transform(), first);
    }

    #[test]
    fn test_zoom_keeps_reference_point_stable() {
        let mut v = loaded_viewer(100, 100);
        let anchor = pos2(123.0, 456.0);
        let before = v.transform().screen_to_image(anchor, v.viewport(), 100, 100);
        v.zoom_at(anchor, 1.3);
        let after = v.transform().image_to_screen(before, v.viewport(), 100, 100);
        assert!((after - anchor).length() < 1.0);
    }

    #[test]
    fn test_enter_exit_pixel_mode_restores_transform() {
        let mut v = loaded_viewer(64, 64);
        v.zoom_at(pos2(400.0, 300.0), 2.0);
        v.mode = ViewMode::Normal { auto_fit: false };
        let saved = v.transform();

        v.enter_pixel_mode(Some(pos2(400.0, 300.0)));
        assert!(v.is_pixel_mode());
        assert_eq!(v.transform().scale, MAX_SCALE);

        v.exit_pixel_mode(Some(pos2(400.0, 300.0)));
        assert!(!v.is_pixel_mode());
        assert_eq!(v.transform().scale, saved.scale);
        assert!((v.transform().pan_offset - saved.pan_offset).length() < 0.01);
    }

    #[test]
    fn test_wheel_zoom_in_snaps_into_pixel_mode() {
        let mut v = loaded_viewer(10, 10);
        // Fit scale for 10x10 in 800x600 is 59.9; one notch crosses 63.
        let center = pos2(400.0, 300.0);
        v.wheel(center, 120.0, Modifiers::default(), 0.0);
        assert!(v.is_pixel_mode());
        assert_eq!(v.transform().scale, MAX_SCALE);
        assert!(v.materialized_len() > 0);
    }

    #[test]
    fn test_wheel_zoom_out_exits_pixel_mode_and_clears_tiles() {
        let mut v = loaded_viewer(10, 10);
        let center = pos2(400.0, 300.0);
        v.wheel(center, 120.0, Modifiers::default(), 0.0);
        assert!(v.is_pixel_mode());

        v.wheel(center, -120.0, Modifiers::default(), 0.1);
        assert!(matches!(v.mode(), ViewMode::Normal { .. }));
        assert_eq!(v.materialized_len(), 0);
    }

    #[test]
    fn test_modifier_scroll_pans_without_scaling() {
        let mut v = loaded_viewer(100, 100);
        let before = v.transform();
        let mods = Modifiers { ctrl: true, ..Default::default() };
        v.wheel(pos2(400.0, 300.0), 120.0, mods, 0.0);
        let after = v.transform();
        assert_eq!(after.scale, before.scale);
        assert!((after.pan_offset.y - before.pan_offset.y).abs() > 1.0);
    }

    #[test]
    fn test_resize_refits_while_auto_fit_active() {
        let mut v = loaded_viewer(100, 100);
        v.set_viewport(viewport(400.0, 400.0), 1.0);
        let expected = crate::view::fit_scale(vec2(400.0, 400.0), 100, 100);
        assert_eq!(v.transform().scale, expected);
    }

    #[test]
    fn test_resize_ignored_after_manual_zoom() {
        let mut v = loaded_viewer(100, 100);
        v.wheel(pos2(400.0, 300.0), 120.0, Modifiers::default(), 0.0);
        let zoomed = v.transform().scale;

        v.set_viewport(viewport(400.0, 400.0), 0.01);
        assert_eq!(v.transform().scale, zoomed);
        // Let zoom-idle and resize-settle both fire: auto-fit is off, so the
        // scale still does not change.
        v.tick(1.0);
        assert_eq!(v.transform().scale, zoomed);
    }

    #[test]
    fn test_pan_in_pixel_mode_updates_tiles_after_debounce() {
        let mut v = loaded_viewer(200, 200);
        v.wheel(pos2(400.0, 300.0), 20_000.0, Modifiers::default(), 0.0);
        assert!(v.is_pixel_mode());
        let before: HashSet<TileKey> = v.materialized().map(|(k, _)| *k).collect();

        v.pan_by(vec2(-5000.0, 0.0), 1.0);
        // Stale until the debounce fires.
        let stale: HashSet<TileKey> = v.materialized().map(|(k, _)| *k).collect();
        assert_eq!(before, stale);

        v.tick(1.061);
        let after: HashSet<TileKey> = v.materialized().map(|(k, _)| *k).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn test_double_click_exits_pixel_mode_and_refits() {
        let mut v = loaded_viewer(10, 10);
        v.wheel(pos2(400.0, 300.0), 120.0, Modifiers::default(), 0.0);
        assert!(v.is_pixel_mode());

        v.double_click(pos2(400.0, 300.0));
        assert_eq!(v.mode(), ViewMode::Normal { auto_fit: true });
        assert_eq!(v.materialized_len(), 0);
        let expected = crate::view::fit_scale(vec2(800.0, 600.0), 10, 10);
        assert_eq!(v.transform().scale, expected);
    }

    #[test]
    fn test_hotspot_press_emits_navigation() {
        let mut v = loaded_viewer(100, 100);
        assert!(v.pointer_pressed(pos2(10.0, 300.0)));
        assert!(v.pointer_pressed(pos2(790.0, 300.0)));
        assert!(!v.pointer_pressed(pos2(400.0, 300.0)));
        let navs: Vec<_> = v
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, ViewerEvent::Nav(_)))
            .collect();
        assert_eq!(
            navs,
            vec![
                ViewerEvent::Nav(NavSide::Prev),
                ViewerEvent::Nav(NavSide::Next)
            ]
        );
    }

    #[test]
    fn test_pointer_release_resamples_after_pan() {
        let mut v = loaded_viewer(100, 100);
        let pos = pos2(400.0, 300.0);
        v.pointer_moved(Some(pos));
        v.take_events();

        // Drag-pan moves the image under the stationary pointer.
        v.pan_by(vec2(60.0, 0.0), 0.0);
        v.pointer_released(pos);
        let events = v.take_events();
        // Fit scale is 6: the pixel under the cursor moved from 50 to 40.
        assert!(matches!(
            events.last(),
            Some(ViewerEvent::Sample(PixelSample::At { x: 40, .. }))
        ));
    }

    #[test]
    fn test_pointer_leave_emits_absent_sample() {
        let mut v = loaded_viewer(100, 100);
        v.pointer_moved(Some(pos2(400.0, 300.0)));
        v.pointer_moved(None);
        let samples: Vec<_> = v.take_events();
        assert!(matches!(samples.first(), Some(ViewerEvent::Sample(PixelSample::At { .. }))));
        assert_eq!(samples.last(), Some(&ViewerEvent::Sample(PixelSample::Absent)));
    }
}
