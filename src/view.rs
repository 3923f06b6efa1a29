//! The view transform: uniform scale plus a pan offset relative to the
//! viewport center. All screen<->image mapping goes through here, and the
//! `anchor_to` primitive is what keeps a reference point pixel-stable
//! across zoom, fit and mode transitions.

use egui::{Pos2, Rect, Vec2};

/// Smallest permitted zoom-out scale.
pub const MIN_SCALE: f32 = 0.05;
/// Largest permitted scale; equals the pixel-cell size so pixel-inspection
/// tiles map 1:1 onto device pixels.
pub const MAX_SCALE: f32 = 64.0;

/// Uniform scale + translation. The image center sits at
/// `viewport.center() + pan_offset` in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub pan_offset: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { scale: 1.0, pan_offset: Vec2::ZERO }
    }
}

impl ViewTransform {
    /// Screen-space rectangle the image occupies under this transform.
    pub fn image_rect(&self, viewport: Rect, img_w: u32, img_h: u32) -> Rect {
        let size = Vec2::new(img_w as f32, img_h as f32) * self.scale;
        let center = viewport.center() + self.pan_offset;
        Rect::from_center_size(center, size)
    }

    /// Inverse-map a screen point to (fractional) image coordinates.
    /// Not clamped — points outside the image map to out-of-range values.
    pub fn screen_to_image(&self, pos: Pos2, viewport: Rect, img_w: u32, img_h: u32) -> Vec2 {
        let rect = self.image_rect(viewport, img_w, img_h);
        (pos - rect.min) / self.scale
    }

    /// Forward-map image coordinates to a screen point.
    pub fn image_to_screen(&self, img_pt: Vec2, viewport: Rect, img_w: u32, img_h: u32) -> Pos2 {
        let rect = self.image_rect(viewport, img_w, img_h);
        rect.min + img_pt * self.scale
    }

    /// Set the pan offset so that image point `img_pt` lands exactly on
    /// screen point `screen_pt`. This is the reference-point-preservation
    /// primitive: capture the image point under the cursor, change the
    /// scale, then anchor it back.
    pub fn anchor_to(
        &mut self,
        img_pt: Vec2,
        screen_pt: Pos2,
        viewport: Rect,
        img_w: u32,
        img_h: u32,
    ) {
        let half = Vec2::new(img_w as f32, img_h as f32) * 0.5;
        self.pan_offset = (screen_pt - viewport.center()) - (img_pt - half) * self.scale;
    }
}

/// Largest scale that fits the image inside the viewport on its
/// constraining dimension, with a 1px safety margin so rounding never
/// overflows the viewport. Clamped to the legal scale range.
pub fn fit_scale(viewport_size: Vec2, img_w: u32, img_h: u32) -> f32 {
    let vw = viewport_size.x.max(1.0);
    let vh = viewport_size.y.max(1.0);
    let iw = img_w.max(1) as f32;
    let ih = img_h.max(1) as f32;
    let mut s = (vw / iw).min(vh / ih);
    if iw * s > vw {
        s = (vw - 1.0) / iw;
    }
    if ih * s > vh {
        s = s.min((vh - 1.0) / ih);
    }
    s.clamp(MIN_SCALE, MAX_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn viewport(w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), Vec2::new(w, h))
    }

    #[test]
    fn test_identity_centers_image() {
        let t = ViewTransform::default();
        let rect = t.image_rect(viewport(100.0, 100.0), 10, 10);
        assert_eq!(rect.min, pos2(45.0, 45.0));
        assert_eq!(rect.max, pos2(55.0, 55.0));
    }

    #[test]
    fn test_round_trip_mapping() {
        let t = ViewTransform { scale: 3.0, pan_offset: Vec2::new(-17.0, 4.0) };
        let vp = viewport(800.0, 600.0);
        let img_pt = Vec2::new(12.25, 30.5);
        let screen = t.image_to_screen(img_pt, vp, 100, 80);
        let back = t.screen_to_image(screen, vp, 100, 80);
        assert!((back - img_pt).length() < 1e-4);
    }

    #[test]
    fn test_anchor_to_is_exact() {
        let mut t = ViewTransform { scale: 2.0, pan_offset: Vec2::new(5.0, 5.0) };
        let vp = viewport(640.0, 480.0);
        let anchor = pos2(100.0, 200.0);
        let img_pt = t.screen_to_image(anchor, vp, 321, 123);

        t.scale = 7.5;
        t.anchor_to(img_pt, anchor, vp, 321, 123);
        let after = t.image_to_screen(img_pt, vp, 321, 123);
        assert!((after - anchor).length() < 1e-3);
    }

    #[test]
    fn test_fit_scale_constraining_dimension() {
        // Wide viewport, square image: height constrains (500/100 exactly).
        let s = fit_scale(Vec2::new(1000.0, 500.0), 100, 100);
        assert_eq!(s, 5.0);
    }

    #[test]
    fn test_fit_scale_never_overflows_viewport() {
        for (vw, vh, iw, ih) in [
            (800.0, 600.0, 1920, 1080),
            (333.0, 777.0, 50, 50),
            (100.0, 100.0, 3, 7),
        ] {
            let s = fit_scale(Vec2::new(vw, vh), iw, ih);
            assert!(iw as f32 * s <= vw);
            assert!(ih as f32 * s <= vh);
        }
    }

    #[test]
    fn test_fit_scale_clamps_to_max() {
        // A tiny image in a huge viewport would fit far beyond MAX_SCALE.
        let s = fit_scale(Vec2::new(2000.0, 2000.0), 4, 4);
        assert_eq!(s, MAX_SCALE);
    }
}
