//! Application shell: window panels, input wiring, gallery bookkeeping and
//! texture management. All viewer logic lives in `viewer.rs`; this file
//! only adapts egui events into the core API and paints its outputs.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use eframe::egui;
use egui::{
    Align2, Color32, ColorImage, Pos2, Rect, RichText, TextureFilter, TextureHandle,
    TextureOptions, Vec2,
};
use image::RgbaImage;
use rayon::prelude::*;

use crate::io::{self, FileHandler};
use crate::picture::PixelValue;
use crate::probe::PixelSample;
use crate::settings::{AppSettings, ZoomFilterMode};
use crate::tiles::{TileAnnotator, TileKey};
use crate::viewer::{NavSide, Viewer, ViewerEvent, NAV_HOTSPOT_WIDTH};

/// Full-texture UV rectangle.
const UV_FULL: Rect = Rect {
    min: Pos2::ZERO,
    max: Pos2 { x: 1.0, y: 1.0 },
};

/// egui reports wheel scroll in points (~50 per notch); the viewer core
/// speaks Qt-style angle units (120 per notch).
const SCROLL_POINTS_TO_ANGLE: f32 = 2.4;

pub struct ViewerApp {
    viewer: Viewer,
    settings: AppSettings,
    files: FileHandler,

    /// Sorted image paths of the opened folder (empty for single files).
    gallery: Vec<PathBuf>,
    gallery_index: usize,
    current_path: Option<PathBuf>,

    /// CPU copy of the continuous image, kept so a texture-filter flip can
    /// re-upload without re-decoding.
    image_pixels: Option<ColorImage>,
    image_texture: Option<TextureHandle>,
    /// Filter mode of the currently uploaded image texture.
    texture_smooth: Option<bool>,
    /// GPU textures for the materialized tile set, synced every frame.
    tile_textures: HashMap<TileKey, TextureHandle>,

    last_sample: PixelSample,
    load_error: Option<String>,
    /// True while a left-drag that started outside the hotspots is panning.
    pan_active: bool,
}

impl ViewerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, startup_path: Option<PathBuf>) -> Self {
        let settings = AppSettings::load();
        let last_dir = (!settings.last_open_dir.is_empty())
            .then(|| PathBuf::from(&settings.last_open_dir));
        let mut app = Self {
            viewer: Viewer::new(TileAnnotator::with_system_font()),
            settings,
            files: FileHandler::new(last_dir),
            gallery: Vec::new(),
            gallery_index: 0,
            current_path: None,
            image_pixels: None,
            image_texture: None,
            texture_smooth: None,
            tile_textures: HashMap::new(),
            last_sample: PixelSample::Absent,
            load_error: None,
            pan_active: false,
        };
        if let Some(path) = startup_path {
            app.open_path(&path);
        }
        app
    }

    // ========================================================================
    // Opening images
    // ========================================================================

    /// Open a file or folder (CLI argument, drag-and-drop).
    fn open_path(&mut self, path: &Path) {
        if path.is_dir() {
            self.open_folder(path.to_path_buf());
        } else {
            self.open_single(path.to_path_buf());
        }
    }

    /// Open one image with no folder gallery around it.
    fn open_single(&mut self, path: PathBuf) {
        self.gallery.clear();
        self.gallery_index = 0;
        self.open_file(&path);
    }

    /// Open a folder: list its images and show the first one.
    fn open_folder(&mut self, folder: PathBuf) {
        match io::list_folder_images(&folder) {
            Ok(paths) if !paths.is_empty() => {
                crate::log_info!("Opened folder {:?} ({} images)", folder, paths.len());
                self.gallery = paths;
                self.gallery_index = 0;
                let first = self.gallery[0].clone();
                self.open_file(&first);
            }
            Ok(_) => {
                self.load_error = Some(format!(
                    "No images found in {}",
                    folder.display()
                ));
            }
            Err(e) => {
                crate::log_err!("Failed to read folder {:?}: {}", folder, e);
                self.load_error = Some(format!("Could not read folder: {}", e));
            }
        }
    }

    /// Decode and hand the image to the viewer. On failure the current
    /// image and view state stay untouched.
    fn open_file(&mut self, path: &Path) {
        match io::load_picture(path) {
            Ok(picture) => {
                self.image_pixels = Some(color_image_from_rgba(picture.pixels()));
                self.image_texture = None;
                self.texture_smooth = None;
                self.tile_textures.clear();
                self.last_sample = PixelSample::Absent;
                self.viewer.load(picture);
                self.current_path = Some(path.to_path_buf());
                self.files.remember_dir_of(path);
                if let Some(dir) = self.files.last_dir() {
                    self.settings.last_open_dir = dir.to_string_lossy().into_owned();
                    self.settings.save();
                }
            }
            Err(e) => {
                crate::log_err!("Failed to open {:?}: {}", path, e);
                self.load_error = Some(format!("Could not open {}: {}", path.display(), e));
            }
        }
    }

    fn handle_open_file(&mut self) {
        if let Some(path) = self.files.pick_image_path() {
            self.open_single(path);
        }
    }

    fn handle_open_folder(&mut self) {
        if let Some(folder) = self.files.pick_folder_path() {
            self.open_folder(folder);
        }
    }

    // ========================================================================
    // Gallery navigation (wrapping)
    // ========================================================================

    fn show_next(&mut self) {
        if self.gallery.is_empty() {
            return;
        }
        self.gallery_index = (self.gallery_index + 1) % self.gallery.len();
        let path = self.gallery[self.gallery_index].clone();
        self.open_file(&path);
    }

    fn show_prev(&mut self) {
        if self.gallery.is_empty() {
            return;
        }
        self.gallery_index = (self.gallery_index + self.gallery.len() - 1) % self.gallery.len();
        let path = self.gallery[self.gallery_index].clone();
        self.open_file(&path);
    }

    // ========================================================================
    // Painting helpers
    // ========================================================================

    /// Upload (or re-upload on a filter flip) the continuous image texture.
    fn ensure_image_texture(&mut self, ctx: &egui::Context, smooth: bool) {
        let Some(pixels) = &self.image_pixels else { return };
        let stale = self.image_texture.is_none() || self.texture_smooth != Some(smooth);
        if !stale {
            return;
        }
        match &mut self.image_texture {
            Some(tex) => tex.set(pixels.clone(), texture_options(smooth)),
            None => {
                self.image_texture =
                    Some(ctx.load_texture("image", pixels.clone(), texture_options(smooth)));
            }
        }
        self.texture_smooth = Some(smooth);
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, now: f64) {
        let sense = egui::Sense::click_and_drag().union(egui::Sense::hover());
        let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
        let rect = response.rect;
        self.viewer.set_viewport(rect, now);

        let modal_open = self.load_error.is_some();

        // ---- wheel: steal scroll when the pointer is over the canvas ----
        let mut wheel_points = 0.0;
        if !modal_open {
            ctx.input_mut(|i| {
                if i.scroll_delta.y.abs() > 0.1 {
                    let over_canvas = i
                        .pointer
                        .hover_pos()
                        .is_some_and(|pos| rect.contains(pos));
                    if over_canvas {
                        wheel_points = i.scroll_delta.y;
                        i.scroll_delta.y = 0.0;
                    }
                }
            });
        }
        if wheel_points != 0.0 {
            let modifiers = ctx.input(|i| i.modifiers);
            if let Some(pos) = ctx.input(|i| i.pointer.hover_pos()) {
                self.viewer
                    .wheel(pos, wheel_points * SCROLL_POINTS_TO_ANGLE, modifiers, now);
            }
        }

        // ---- pointer ----
        let hover = response.hover_pos();
        self.viewer.pointer_moved(hover);
        let hover_side = hover.and_then(|p| self.viewer.hotspot_at(p));

        if !modal_open {
            if response.drag_started_by(egui::PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.pan_active = self.viewer.hotspot_at(pos).is_none();
                }
            }
            if response.dragged_by(egui::PointerButton::Primary) && self.pan_active {
                let delta = response.drag_delta();
                if delta != Vec2::ZERO {
                    self.viewer.pan_by(delta, now);
                }
            }
            if response.drag_released() {
                self.pan_active = false;
                if let Some(pos) = response.interact_pointer_pos() {
                    self.viewer.pointer_released(pos);
                }
            }
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.viewer.pointer_pressed(pos);
                }
            }
            if response.double_clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.viewer.double_click(pos);
                }
            }
        }

        // Cursor feedback: hand over hotspots, grab while panning.
        if hover_side.is_some() {
            ctx.output_mut(|o| o.cursor_icon = egui::CursorIcon::PointingHand);
        } else if self.pan_active && response.dragged() {
            ctx.output_mut(|o| o.cursor_icon = egui::CursorIcon::Grabbing);
        }

        self.viewer.tick(now);

        // ---- drain core events ----
        for event in self.viewer.take_events() {
            match event {
                ViewerEvent::Sample(sample) => self.last_sample = sample,
                ViewerEvent::Nav(NavSide::Prev) => self.show_prev(),
                ViewerEvent::Nav(NavSide::Next) => self.show_next(),
            }
        }

        // ---- paint ----
        painter.rect_filled(rect, 0.0, Color32::from_gray(24));

        if self.viewer.picture().is_some() {
            if self.viewer.is_pixel_mode() {
                self.paint_tiles(ctx, &painter);
            } else {
                let smooth = self.settings.zoom_filter_mode == ZoomFilterMode::Linear
                    && self.viewer.wants_smooth_filter();
                self.ensure_image_texture(ctx, smooth);
                if let (Some(tex), Some(img_rect)) =
                    (&self.image_texture, self.viewer.image_rect_on_screen())
                {
                    painter.image(tex.id(), img_rect, UV_FULL, Color32::WHITE);
                }
            }
        }

        // ---- hotspot chevron cue ----
        if let Some(side) = hover_side {
            let (x, glyph) = match side {
                NavSide::Prev => (rect.min.x + NAV_HOTSPOT_WIDTH * 0.5, "<"),
                NavSide::Next => (rect.max.x - NAV_HOTSPOT_WIDTH * 0.5, ">"),
            };
            let pos = egui::pos2(x, rect.center().y);
            let font = egui::FontId::proportional(34.0);
            for off in [
                Vec2::new(-2.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(0.0, -2.0),
                Vec2::new(0.0, 2.0),
            ] {
                painter.text(pos + off, Align2::CENTER_CENTER, glyph, font.clone(), Color32::WHITE);
            }
            painter.text(pos, Align2::CENTER_CENTER, glyph, font, Color32::BLACK);
        }
    }

    /// Sync tile textures with the materialized set and paint them at their
    /// image-space positions. At pixel scale each bitmap maps 1:1 onto
    /// device pixels, so nearest filtering introduces no resampling.
    fn paint_tiles(&mut self, ctx: &egui::Context, painter: &egui::Painter) {
        let live: HashSet<TileKey> = self.viewer.materialized().map(|(k, _)| *k).collect();
        self.tile_textures.retain(|key, _| live.contains(key));

        for (key, bitmap) in self.viewer.materialized() {
            let tex = self.tile_textures.entry(*key).or_insert_with(|| {
                ctx.load_texture(
                    format!("tile_{}_{}", key.0, key.1),
                    color_image_from_rgba(bitmap),
                    texture_options(false),
                )
            });
            if let Some(tile_rect) = self.viewer.tile_screen_rect(*key, bitmap) {
                painter.image(tex.id(), tile_rect, UV_FULL, Color32::WHITE);
            }
        }
    }

    fn status_bar_ui(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.last_sample {
                PixelSample::Absent => {
                    ui.monospace("Pos: -   Val: -");
                }
                PixelSample::At { x, y, value } => {
                    ui.monospace(format!("Pos: {}, {}", x, y));
                    match value {
                        PixelValue::Gray(v) => {
                            ui.monospace(format!("Gray={}", v));
                        }
                        PixelValue::Rgb(r, g, b) => {
                            ui.monospace("RGB=");
                            ui.label(
                                RichText::new(format!("{}", r))
                                    .monospace()
                                    .strong()
                                    .color(Color32::from_rgb(204, 0, 0)),
                            );
                            ui.label(
                                RichText::new(format!("{}", g))
                                    .monospace()
                                    .strong()
                                    .color(Color32::from_rgb(0, 136, 0)),
                            );
                            ui.label(
                                RichText::new(format!("{}", b))
                                    .monospace()
                                    .strong()
                                    .color(Color32::from_rgb(0, 0, 204)),
                            );
                        }
                    }
                }
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if self.viewer.picture().is_some() {
                    ui.monospace(format!("{:.0}%", self.viewer.transform().scale * 100.0));
                    if self.viewer.is_pixel_mode() {
                        ui.label(RichText::new("Pixel Inspect").strong());
                    }
                }
            });
        });
    }

    fn toolbar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open Image…").clicked() {
                self.handle_open_file();
            }
            if ui.button("Open Folder…").clicked() {
                self.handle_open_folder();
            }
            ui.separator();
            let has_gallery = !self.gallery.is_empty();
            if ui.add_enabled(has_gallery, egui::Button::new("< Prev")).clicked() {
                self.show_prev();
            }
            if ui.add_enabled(has_gallery, egui::Button::new("Next >")).clicked() {
                self.show_next();
            }
            ui.separator();
            let mut smooth = self.settings.zoom_filter_mode == ZoomFilterMode::Linear;
            if ui.checkbox(&mut smooth, "Smooth scaling").changed() {
                self.settings.zoom_filter_mode = if smooth {
                    ZoomFilterMode::Linear
                } else {
                    ZoomFilterMode::Nearest
                };
                self.settings.save();
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(path) = &self.current_path {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    if self.gallery.len() > 1 {
                        ui.label(format!(
                            "{}  ({}/{})",
                            name,
                            self.gallery_index + 1,
                            self.gallery.len()
                        ));
                    } else {
                        ui.label(name);
                    }
                }
            });
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);
        let modal_open = self.load_error.is_some();

        // ---- drag-and-drop ----
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        for path in dropped {
            if path.is_dir() || io::is_image_file(&path) {
                self.open_path(&path);
                break;
            }
        }

        // ---- keyboard gallery navigation ----
        if !modal_open {
            if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) {
                self.show_prev();
            }
            if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
                self.show_next();
            }
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar_ui(ui);
        });
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.status_bar_ui(ui);
        });
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.canvas_ui(ui, ctx, now);
            });

        // ---- load-error dialog ----
        if let Some(msg) = self.load_error.clone() {
            egui::Window::new("Load failed")
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(msg);
                    if ui.button("OK").clicked() {
                        self.load_error = None;
                    }
                });
        }

        // Wake up for the next debounce deadline even without input.
        if let Some(deadline) = self.viewer.next_deadline() {
            let wait = (deadline - now).max(0.0) + 0.001;
            ctx.request_repaint_after(std::time::Duration::from_secs_f64(wait));
        }
    }
}

// ============================================================================
// Pixel conversion
// ============================================================================

/// Convert a decoded RGBA buffer into an egui `ColorImage`, flattening
/// alpha to opaque. Parallelized — this runs once per image load on
/// potentially very large buffers.
fn color_image_from_rgba(img: &RgbaImage) -> ColorImage {
    let (w, h) = img.dimensions();
    let pixels: Vec<Color32> = img
        .as_raw()
        .par_chunks_exact(4)
        .map(|p| Color32::from_rgb(p[0], p[1], p[2]))
        .collect();
    ColorImage {
        size: [w as usize, h as usize],
        pixels,
    }
}

fn texture_options(smooth: bool) -> TextureOptions {
    if smooth {
        TextureOptions {
            magnification: TextureFilter::Linear,
            minification: TextureFilter::Linear,
            ..Default::default()
        }
    } else {
        TextureOptions {
            magnification: TextureFilter::Nearest,
            minification: TextureFilter::Nearest,
            ..Default::default()
        }
    }
}
